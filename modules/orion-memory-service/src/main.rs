//! Orion Memory Service — standalone binary for the memory assistant's fact store.
//!
//! Hosts both an RPC API and a dashboard UI on the same port.
//! Default: http://127.0.0.1:9104/

use orion_memory_service::routes::{self, AppState};
use orion_memory_service::{FactStore, ServiceConfig};
use std::sync::Arc;
use std::time::Instant;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    env_logger::init();

    let config = match ServiceConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Refusing to start: {}", e);
            std::process::exit(1);
        }
    };

    log::info!(
        "Opening database at: {} (limit {}, take {})",
        config.db_path,
        config.retention.limit,
        config.retention.take
    );
    let store = Arc::new(
        FactStore::open(&config.db_path, config.retention).expect("Failed to open database"),
    );

    let state = Arc::new(AppState {
        store,
        start_time: Instant::now(),
        default_subject: config.default_subject.clone(),
    });

    let cors = tower_http::cors::CorsLayer::permissive();
    let app = routes::router(state).layer(cors);

    let addr = format!("127.0.0.1:{}", config.port);
    log::info!("Orion Memory Service listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind");

    axum::serve(listener, app).await.expect("Server error");
}
