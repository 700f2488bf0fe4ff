//! Orion memory: a per-subject fact store with bounded retention, a tiered
//! recall cascade and the RPC service that exposes them.

pub mod answer;
pub mod config;
pub mod dashboard;
pub mod db;
pub mod error;
pub mod recall;
pub mod retention;
pub mod routes;
pub mod sentences;
pub mod store;

pub use config::{RetentionPolicy, ServiceConfig};
pub use error::{MemoryError, MemoryResult};
pub use recall::{recall, recall_ranked, render};
pub use store::FactStore;
