use vt_core::{GenerationError, GenerationResult};

/// Progress notifications published while a batch runs.
///
/// Purely informational: a batch produces the same results whether or not anyone listens.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    JobQueued {
        index: usize,
        product_id: String,
        job_id: String,
    },
    JobProgress {
        index: usize,
        job_id: String,
        attempt: u32,
        elapsed_ms: u64,
    },
    JobComplete {
        index: usize,
        product_id: String,
    },
    JobFailed {
        index: usize,
        product_id: String,
        error: GenerationError,
    },
    ItemReady(GenerationResult),
    BatchFinished {
        succeeded: usize,
        failed: usize,
    },
}
