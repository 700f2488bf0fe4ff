//! Shared types for the orion memory service and its RPC clients.

use serde::{Deserialize, Serialize};

/// Row id of a stored fact. Assigned by the store, never reused.
pub type FactId = i64;

/// Subject used by the demo front-ends when none is given.
pub const DEFAULT_SUBJECT: &str = "demo";

/// Well-known provenance tags. Origins are free-form; these are the ones the
/// service itself writes.
pub mod origin {
    pub const MANUAL: &str = "manual";
    pub const BOOK_MODE: &str = "book_mode";
    pub const BOOK_MODE_SUMMARY: &str = "book_mode_summary";
    pub const AUTO_PRUNE: &str = "auto_prune";
    pub const FEEDBACK_UP: &str = "feedback_up";
    pub const FEEDBACK_DOWN: &str = "feedback_down";
}

// =====================================================
// Domain Types
// =====================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fact {
    pub id: FactId,
    pub subject_id: String,
    pub text: String,
    pub origin: String,
    pub created_at: String,
}

/// How recalled facts are rendered back to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AnswerStyle {
    /// First sentence, capped at 20 words
    #[default]
    Short,
    /// Full fact text
    Detailed,
}

impl AnswerStyle {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "short" | "brief" => Some(AnswerStyle::Short),
            "detailed" | "long" | "full" => Some(AnswerStyle::Detailed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AnswerStyle::Short => "short",
            AnswerStyle::Detailed => "detailed",
        }
    }
}

impl std::fmt::Display for AnswerStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which stage of the recall cascade produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecallTier {
    /// Subject has no facts at all
    NoMemory,
    /// Blank query, every fact returned
    All,
    /// Query found as a case-insensitive substring
    Substring,
    /// At least one query keyword matched
    Keyword,
    /// Nothing matched, newest facts returned instead
    Fallback,
}

/// Outcome of one retention run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PruneReport {
    /// Number of prune passes executed
    pub passes: u32,
    /// Number of facts folded into summaries and deleted
    pub summarized: usize,
    /// Ids of the auto-summary facts inserted
    pub summaries: Vec<FactId>,
    /// Ids of the facts deleted, summaries from earlier passes included
    pub pruned: Vec<FactId>,
}

impl PruneReport {
    pub fn is_noop(&self) -> bool {
        self.passes == 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OriginCount {
    pub origin: String,
    pub count: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MemoryStats {
    pub total_facts: i64,
    pub subject_count: i64,
    pub by_origin: Vec<OriginCount>,
}

// =====================================================
// RPC Request Types
// =====================================================

fn default_subject() -> String {
    DEFAULT_SUBJECT.to_string()
}

fn default_origin() -> String {
    origin::MANUAL.to_string()
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubjectRequest {
    #[serde(default = "default_subject")]
    pub subject_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AddFactRequest {
    #[serde(default = "default_subject")]
    pub subject_id: String,
    pub text: String,
    #[serde(default = "default_origin")]
    pub origin: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteFactsRequest {
    pub ids: Vec<FactId>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecallRequest {
    #[serde(default = "default_subject")]
    pub subject_id: String,
    #[serde(default)]
    pub query: String,
    /// Overrides the subject's saved preference for this call
    #[serde(default)]
    pub style: Option<AnswerStyle>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IngestBookRequest {
    #[serde(default = "default_subject")]
    pub subject_id: String,
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FeedbackRequest {
    #[serde(default = "default_subject")]
    pub subject_id: String,
    pub text: String,
    pub positive: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SetPrefRequest {
    #[serde(default = "default_subject")]
    pub subject_id: String,
    pub style: AnswerStyle,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BackupRestoreRequest {
    pub facts: Vec<BackupEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupEntry {
    pub subject_id: String,
    pub text: String,
    pub origin: String,
    pub created_at: String,
}

// =====================================================
// RPC Response Types
// =====================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct RpcResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> RpcResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecallResponse {
    pub tier: RecallTier,
    pub style: AnswerStyle,
    /// Display text composed from the matched facts
    pub answer: String,
    pub facts: Vec<Fact>,
}

// =====================================================
// Service Status
// =====================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub running: bool,
    pub uptime_secs: u64,
    pub total_facts: i64,
    pub fact_limit: usize,
    pub prune_take: usize,
}
