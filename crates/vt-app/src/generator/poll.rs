use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use vt_core::{JobHandle, JobStatus};
use crate::generator::backend::{JobClient, JobClientError};

#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Pause between two status checks while the job is pending
    pub interval: Duration,
    /// Wall-clock budget for the whole poll sequence
    pub deadline: Duration,
    /// Consecutive transport failures tolerated before giving up. Zero means the first one is fatal.
    pub transient_retries: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(1000),
            deadline: Duration::from_millis(300_000),
            transient_retries: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Idle,
    Polling,
    Succeeded,
    Failed,
    TimedOut,
    Cancelled,
}

#[derive(Error, Debug)]
pub enum PollError {
    #[error("status check for job {job_id} failed: {source}")]
    Client {
        job_id: String,
        #[source]
        source: JobClientError,
    },

    #[error("job {job_id} still pending after {} ms", .elapsed.as_millis())]
    Timeout { job_id: String, elapsed: Duration },

    #[error("polling job {job_id} was cancelled")]
    Cancelled { job_id: String },
}

/// Drives a single job to a terminal status.
///
/// Elapsed time is always measured against the instant the loop started, so a
/// slow status call eats into the deadline just like the sleeps do.
pub struct PollLoop<'a, C: ?Sized> {
    client: &'a C,
    config: &'a PollConfig,
    cancel: CancellationToken,
    state: PollState,
    status_calls: u32,
}

impl<'a, C: JobClient + ?Sized> PollLoop<'a, C> {
    pub fn new(client: &'a C, config: &'a PollConfig, cancel: CancellationToken) -> Self {
        Self {
            client,
            config,
            cancel,
            state: PollState::Idle,
            status_calls: 0,
        }
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    pub fn status_calls(&self) -> u32 {
        self.status_calls
    }

    pub async fn poll(&mut self, handle: &JobHandle) -> Result<JobStatus, PollError> {
        self.poll_observed(handle, |_, _| {}).await
    }

    /// Like [`PollLoop::poll`], calling `observe(attempt, elapsed)` after every non-terminal check
    pub async fn poll_observed<F>(&mut self, handle: &JobHandle, mut observe: F) -> Result<JobStatus, PollError>
    where
        F: FnMut(u32, Duration) + Send,
    {
        let client = self.client;
        let cancel = self.cancel.clone();
        let interval = self.config.interval;
        let deadline = self.config.deadline;

        self.state = PollState::Polling;
        self.status_calls = 0;
        let started = Instant::now();
        let mut transient_failures = 0u32;

        loop {
            if cancel.is_cancelled() {
                return Err(self.cancelled(handle));
            }

            self.status_calls += 1;
            let attempt = self.status_calls;

            let fetched = tokio::select! {
                _ = cancel.cancelled() => None,
                result = client.fetch_status(handle) => Some(result),
            };
            let Some(result) = fetched else {
                return Err(self.cancelled(handle));
            };

            match result {
                Ok(JobStatus::Pending) => {
                    transient_failures = 0;
                }
                Ok(status) => {
                    self.state = match status {
                        JobStatus::Succeeded { .. } => PollState::Succeeded,
                        _ => PollState::Failed,
                    };
                    debug!(job_id = %handle, attempt, status = status.label(), "Job reached terminal state");
                    return Ok(status);
                }
                Err(e) if e.is_transport() && transient_failures < self.config.transient_retries => {
                    transient_failures += 1;
                    warn!(
                        job_id = %handle,
                        attempt,
                        error = %e,
                        "Status check failed, retrying ({}/{})",
                        transient_failures,
                        self.config.transient_retries,
                    );
                }
                Err(e) => {
                    self.state = PollState::Failed;
                    return Err(PollError::Client {
                        job_id: handle.job_id.clone(),
                        source: e,
                    });
                }
            }

            let elapsed = started.elapsed();
            debug!(job_id = %handle, attempt, elapsed_ms = elapsed.as_millis() as u64, "Job still pending");
            observe(attempt, elapsed);

            if elapsed >= deadline {
                self.state = PollState::TimedOut;
                return Err(PollError::Timeout {
                    job_id: handle.job_id.clone(),
                    elapsed,
                });
            }

            let nap = interval.min(deadline - elapsed);
            let woke = tokio::select! {
                _ = cancel.cancelled() => false,
                _ = tokio::time::sleep(nap) => true,
            };
            if !woke {
                return Err(self.cancelled(handle));
            }
        }
    }

    fn cancelled(&mut self, handle: &JobHandle) -> PollError {
        self.state = PollState::Cancelled;
        debug!(job_id = %handle, "Polling cancelled");
        PollError::Cancelled {
            job_id: handle.job_id.clone(),
        }
    }
}
