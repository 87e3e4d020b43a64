use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a single product did not produce a payload.
///
/// Stored inside `GenerationResult`, so it is plain data rather than a wrapped source error.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GenerationError {
    #[error("transport error for product {product_id}: {message}")]
    Transport { product_id: String, message: String },

    #[error("protocol error for product {product_id}: {message}")]
    Protocol { product_id: String, message: String },

    #[error("job {job_id} for product {product_id} timed out after {elapsed_ms} ms")]
    Timeout { product_id: String, job_id: String, elapsed_ms: u64 },

    #[error("job {job_id} for product {product_id} failed: {reason}")]
    JobFailed { product_id: String, job_id: String, reason: String },

    #[error("generation cancelled for product {product_id}")]
    Cancelled { product_id: String, job_id: Option<String> },
}

impl GenerationError {
    pub fn product_id(&self) -> &str {
        match self {
            Self::Transport { product_id, .. }
            | Self::Protocol { product_id, .. }
            | Self::Timeout { product_id, .. }
            | Self::JobFailed { product_id, .. }
            | Self::Cancelled { product_id, .. } => product_id,
        }
    }

    pub fn job_id(&self) -> Option<&str> {
        match self {
            Self::Timeout { job_id, .. } | Self::JobFailed { job_id, .. } => Some(job_id),
            Self::Cancelled { job_id, .. } => job_id.as_deref(),
            Self::Transport { .. } | Self::Protocol { .. } => None,
        }
    }

    /// Short tag used in logs and placeholders
    pub fn kind(&self) -> &str {
        match self {
            Self::Transport { .. } => "transport",
            Self::Protocol { .. } => "protocol",
            Self::Timeout { .. } => "timeout",
            Self::JobFailed { .. } => "job_failed",
            Self::Cancelled { .. } => "cancelled",
        }
    }
}
