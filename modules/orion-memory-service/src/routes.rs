//! Axum route handlers for the orion memory RPC API.

use crate::answer::{PROVENANCE_LIMIT, compose_answer, summarize};
use crate::error::MemoryError;
use crate::recall::recall_ranked;
use crate::store::FactStore;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use orion_memory_types::*;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

pub struct AppState {
    pub store: Arc<FactStore>,
    pub start_time: Instant,
    pub default_subject: String,
}

type RpcResult<T> = (StatusCode, Json<RpcResponse<T>>);

fn respond<T: Serialize>(result: Result<T, MemoryError>) -> RpcResult<T> {
    match result {
        Ok(data) => (StatusCode::OK, Json(RpcResponse::ok(data))),
        Err(e) => {
            if e.is_storage_unavailable() {
                log::error!("RPC failed: {}", e);
            } else {
                log::warn!("RPC rejected: {}", e);
            }
            (StatusCode::INTERNAL_SERVER_ERROR, Json(RpcResponse::err(e.to_string())))
        }
    }
}

// POST /rpc/facts/add
pub async fn facts_add(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AddFactRequest>,
) -> RpcResult<Option<Fact>> {
    respond(state.store.add_fact(&req.subject_id, &req.text, &req.origin))
}

// POST /rpc/facts/list
pub async fn facts_list(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SubjectRequest>,
) -> RpcResult<Vec<Fact>> {
    respond(state.store.get_facts(&req.subject_id))
}

// POST /rpc/facts/delete
pub async fn facts_delete(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DeleteFactsRequest>,
) -> RpcResult<usize> {
    respond(state.store.delete_ids(&req.ids))
}

// POST /rpc/facts/clear
pub async fn facts_clear(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SubjectRequest>,
) -> RpcResult<usize> {
    respond(state.store.clear(&req.subject_id))
}

// POST /rpc/recall
pub async fn recall(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RecallRequest>,
) -> RpcResult<RecallResponse> {
    respond(recall_for(&state, &req))
}

fn recall_for(state: &AppState, req: &RecallRequest) -> Result<RecallResponse, MemoryError> {
    let facts = state.store.get_facts(&req.subject_id)?;
    let style = match req.style {
        Some(style) => style,
        None => state.store.get_pref(&req.subject_id)?,
    };
    let (tier, matched) = recall_ranked(&facts, &req.query);
    log::debug!(
        "Recall for {} ({:?}): {} of {} facts",
        req.subject_id,
        tier,
        matched.len(),
        facts.len()
    );
    Ok(RecallResponse {
        tier,
        style,
        answer: compose_answer(&req.query, &matched, style),
        facts: matched,
    })
}

// POST /rpc/summarize
pub async fn summarize_memory(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SubjectRequest>,
) -> RpcResult<String> {
    respond(state.store.get_facts(&req.subject_id).map(|facts| summarize(&facts)))
}

// POST /rpc/decay
pub async fn decay(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SubjectRequest>,
) -> RpcResult<PruneReport> {
    respond(state.store.enforce_retention(&req.subject_id))
}

// POST /rpc/provenance
pub async fn provenance(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SubjectRequest>,
) -> RpcResult<Vec<Fact>> {
    respond(state.store.get_facts(&req.subject_id).map(|mut facts| {
        facts.truncate(PROVENANCE_LIMIT);
        facts
    }))
}

// POST /rpc/book/ingest
pub async fn book_ingest(
    State(state): State<Arc<AppState>>,
    Json(req): Json<IngestBookRequest>,
) -> RpcResult<Vec<Fact>> {
    respond(state.store.ingest_book(&req.subject_id, &req.text))
}

// POST /rpc/feedback
pub async fn feedback(
    State(state): State<Arc<AppState>>,
    Json(req): Json<FeedbackRequest>,
) -> RpcResult<Option<Fact>> {
    respond(state.store.record_feedback(&req.subject_id, &req.text, req.positive))
}

// POST /rpc/pref/get
pub async fn pref_get(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SubjectRequest>,
) -> RpcResult<AnswerStyle> {
    respond(state.store.get_pref(&req.subject_id))
}

// POST /rpc/pref/set
pub async fn pref_set(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SetPrefRequest>,
) -> RpcResult<bool> {
    respond(state.store.save_pref(&req.subject_id, req.style).map(|()| true))
}

// GET /rpc/stats
pub async fn stats(State(state): State<Arc<AppState>>) -> RpcResult<MemoryStats> {
    respond(state.store.stats())
}

// GET /rpc/status
pub async fn status(State(state): State<Arc<AppState>>) -> RpcResult<ServiceStatus> {
    (StatusCode::OK, Json(RpcResponse::ok(status_for(&state))))
}

/// Liveness stays up when storage is down; the fact count then reads 0.
fn status_for(state: &AppState) -> ServiceStatus {
    let total_facts = match state.store.stats() {
        Ok(stats) => stats.total_facts,
        Err(e) => {
            log::warn!("Status could not read fact stats: {}", e);
            0
        }
    };
    let policy = state.store.policy();
    ServiceStatus {
        running: true,
        uptime_secs: state.start_time.elapsed().as_secs(),
        total_facts,
        fact_limit: policy.limit,
        prune_take: policy.take,
    }
}

// POST /rpc/backup/export
pub async fn backup_export(State(state): State<Arc<AppState>>) -> RpcResult<Vec<BackupEntry>> {
    respond(state.store.export_all())
}

// POST /rpc/backup/restore
pub async fn backup_restore(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BackupRestoreRequest>,
) -> RpcResult<usize> {
    respond(state.store.clear_and_restore(&req.facts))
}

pub fn router(state: Arc<AppState>) -> axum::Router {
    use axum::routing::{get, post};

    axum::Router::new()
        .route("/", get(crate::dashboard::dashboard))
        // Facts
        .route("/rpc/facts/add", post(facts_add))
        .route("/rpc/facts/list", post(facts_list))
        .route("/rpc/facts/delete", post(facts_delete))
        .route("/rpc/facts/clear", post(facts_clear))
        // Recall and lifecycle
        .route("/rpc/recall", post(recall))
        .route("/rpc/summarize", post(summarize_memory))
        .route("/rpc/decay", post(decay))
        .route("/rpc/provenance", post(provenance))
        // Ingest
        .route("/rpc/book/ingest", post(book_ingest))
        .route("/rpc/feedback", post(feedback))
        // Preferences
        .route("/rpc/pref/get", post(pref_get))
        .route("/rpc/pref/set", post(pref_set))
        // Service
        .route("/rpc/stats", get(stats))
        .route("/rpc/status", get(status))
        .route("/rpc/backup/export", post(backup_export))
        .route("/rpc/backup/restore", post(backup_restore))
        .with_state(state)
}
