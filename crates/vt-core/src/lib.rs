mod product;
pub mod error;
pub mod job;
pub mod scene_spec;

pub use error::GenerationError;
pub use job::{GenerationOutcome, GenerationPayload, GenerationResult, JobHandle, JobStatus, PayloadMetadata, Usage};
pub use product::{ProductInput, ShopTheme};
