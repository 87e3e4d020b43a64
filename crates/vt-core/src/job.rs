use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::error::GenerationError;
use crate::product::ProductInput;

/// Opaque reference to one backend job
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobHandle {
    pub job_id: String,
}

impl JobHandle {
    pub fn new(job_id: impl Into<String>) -> Self {
        Self { job_id: job_id.into() }
    }
}

impl std::fmt::Display for JobHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.job_id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PayloadMetadata {
    pub model: Option<String>,
    pub usage: Option<Usage>,
}

/// What a successful job hands back: scene source plus whatever the backend reported about it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationPayload {
    pub source: String,
    pub metadata: Option<PayloadMetadata>,
}

impl GenerationPayload {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            metadata: None,
        }
    }
}

/// Status of a job as reported by the backend.
///
/// `Succeeded` and `Failed` are terminal: once a job id reports one of them it
/// keeps reporting the same one, so pollers stop at the first terminal value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Succeeded { payload: GenerationPayload },
    Failed { reason: String },
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded { .. } | Self::Failed { .. })
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Succeeded { .. } => "success",
            Self::Failed { .. } => "failed",
        }
    }
}

pub type GenerationOutcome = Result<GenerationPayload, GenerationError>;

/// One entry of a batch run, positionally matching its `ProductInput`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub product_id: String,
    pub title: String,
    pub description: String,
    pub outcome: GenerationOutcome,
    pub attempts: u32,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl GenerationResult {
    pub fn new(product: &ProductInput, outcome: GenerationOutcome, attempts: u32, started_at: DateTime<Utc>) -> Self {
        Self {
            product_id: product.id.clone(),
            title: product.title.clone(),
            description: product.description_or_default().to_string(),
            outcome,
            attempts,
            started_at,
            finished_at: Utc::now(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn payload(&self) -> Option<&GenerationPayload> {
        self.outcome.as_ref().ok()
    }

    pub fn error(&self) -> Option<&GenerationError> {
        self.outcome.as_ref().err()
    }

    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}
