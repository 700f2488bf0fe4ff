//! Service configuration, read from the environment (after `.env` is loaded).

use crate::error::{MemoryError, MemoryResult};
use orion_memory_types::DEFAULT_SUBJECT;
use std::env;

/// Facts kept per subject before pruning kicks in
pub const DEFAULT_FACT_LIMIT: usize = 20;
/// Oldest facts folded into one summary per prune pass
pub const DEFAULT_PRUNE_TAKE: usize = 10;
/// Snippets embedded in one auto-summary
pub const DEFAULT_MAX_SNIPPETS: usize = 5;
/// Characters kept from each snippet's first sentence
pub const DEFAULT_SNIPPET_CHARS: usize = 140;

/// Bounded-size retention settings for the fact store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub limit: usize,
    pub take: usize,
    pub max_snippets: usize,
    pub snippet_chars: usize,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            limit: DEFAULT_FACT_LIMIT,
            take: DEFAULT_PRUNE_TAKE,
            max_snippets: DEFAULT_MAX_SNIPPETS,
            snippet_chars: DEFAULT_SNIPPET_CHARS,
        }
    }
}

impl RetentionPolicy {
    /// Build a policy with default snippet settings, rejecting combinations
    /// under which pruning could never shrink the store.
    pub fn new(limit: usize, take: usize) -> MemoryResult<Self> {
        let policy = Self {
            limit,
            take,
            ..Self::default()
        };
        policy.validate()?;
        Ok(policy)
    }

    pub fn validate(&self) -> MemoryResult<()> {
        if self.limit < 1 {
            return Err(MemoryError::config("fact limit must be at least 1"));
        }
        // Each pass removes `take` facts and adds one summary.
        if self.take <= 1 {
            return Err(MemoryError::config(format!(
                "prune take must be greater than 1 (got {})",
                self.take
            )));
        }
        if self.max_snippets == 0 {
            return Err(MemoryError::config("max snippets must be at least 1"));
        }
        if self.snippet_chars == 0 {
            return Err(MemoryError::config("snippet length must be at least 1"));
        }
        Ok(())
    }

    /// Upper bound on prune passes needed to bring `total` facts under the limit.
    pub fn passes_needed(&self, total: usize) -> usize {
        if total <= self.limit {
            return 0;
        }
        let excess = total - self.limit;
        let shrink = self.take - 1;
        excess.div_ceil(shrink)
    }
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub port: u16,
    pub db_path: String,
    pub default_subject: String,
    pub retention: RetentionPolicy,
}

impl ServiceConfig {
    pub fn from_env() -> MemoryResult<Self> {
        let port: u16 = env::var("ORION_MEMORY_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(9104);

        let db_path =
            env::var("ORION_MEMORY_DB_PATH").unwrap_or_else(|_| "./orion_memory.db".to_string());

        let default_subject =
            env::var("ORION_MEMORY_SUBJECT").unwrap_or_else(|_| DEFAULT_SUBJECT.to_string());

        let limit = usize_var("ORION_MEMORY_LIMIT", DEFAULT_FACT_LIMIT)?;
        let take = usize_var("ORION_MEMORY_TAKE", DEFAULT_PRUNE_TAKE)?;

        Ok(Self {
            port,
            db_path,
            default_subject,
            retention: RetentionPolicy::new(limit, take)?,
        })
    }
}

fn usize_var(name: &str, default: usize) -> MemoryResult<usize> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| {
            MemoryError::config(format!("{} must be a non-negative integer, got '{}'", name, raw))
        }),
        Err(_) => Ok(default),
    }
}
