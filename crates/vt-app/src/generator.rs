pub mod backend;
pub mod batch;
pub mod poll;

pub use backend::config::BackendConfig;
pub use backend::{HttpJobClient, JobClient, JobClientError};
pub use batch::{BatchConfig, BatchOrchestrator};
pub use poll::{PollConfig, PollError, PollLoop, PollState};
