use chrono::Utc;
use futures::{stream, StreamExt};
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;
use vt_core::{GenerationError, GenerationOutcome, GenerationResult, JobHandle, JobStatus, ProductInput};
use crate::events::PipelineEvent;
use crate::generator::backend::{JobClient, JobClientError};
use crate::generator::poll::{PollConfig, PollError, PollLoop};

#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub poll: PollConfig,
    /// Extra submissions for a job the backend reported as failed
    pub job_retries: u32,
    /// Units in flight at once; 1 keeps the run strictly sequential
    pub max_concurrency: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            poll: PollConfig::default(),
            job_retries: 0,
            max_concurrency: 1,
        }
    }
}

/// Fire-and-forget event sink; a closed or missing receiver is not an error
#[derive(Clone, Copy)]
struct Publisher<'a>(Option<&'a UnboundedSender<PipelineEvent>>);

impl Publisher<'_> {
    fn send(&self, event: PipelineEvent) {
        if let Some(tx) = self.0 {
            let _ = tx.send(event);
        }
    }
}

/// Runs one submit + poll unit per product and collects the results in input order.
///
/// A failing product only ever produces an `Err` entry for itself; the run
/// always returns exactly one result per input, even when cancelled.
pub struct BatchOrchestrator<C> {
    client: C,
    config: BatchConfig,
    cancel: CancellationToken,
}

impl<C: JobClient> BatchOrchestrator<C> {
    pub fn new(client: C, config: BatchConfig) -> Self {
        Self {
            client,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Ties the run to an outside token, e.g. one shared with a signal handler
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token that tears down the whole run, including any poll currently sleeping
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub async fn run(&self, products: &[ProductInput]) -> Vec<GenerationResult> {
        self.run_inner(products, Publisher(None)).await
    }

    pub async fn run_with_events(
        &self,
        products: &[ProductInput],
        events: UnboundedSender<PipelineEvent>,
    ) -> Vec<GenerationResult> {
        self.run_inner(products, Publisher(Some(&events))).await
    }

    async fn run_inner(&self, products: &[ProductInput], publisher: Publisher<'_>) -> Vec<GenerationResult> {
        let run_id = Uuid::new_v4();
        let span = info_span!("batch", %run_id, items = products.len());

        async move {
            info!("Starting generation batch");

            let results: Vec<GenerationResult> = stream::iter(products.iter().enumerate())
                .map(|(index, product)| self.run_unit(index, product, publisher))
                .buffered(self.config.max_concurrency.max(1))
                .inspect(|result| publisher.send(PipelineEvent::ItemReady(result.clone())))
                .collect()
                .await;

            let succeeded = results.iter().filter(|r| r.is_ok()).count();
            let failed = results.len() - succeeded;
            info!(succeeded, failed, "Generation batch finished");
            publisher.send(PipelineEvent::BatchFinished { succeeded, failed });

            results
        }
        .instrument(span)
        .await
    }

    async fn run_unit(&self, index: usize, product: &ProductInput, publisher: Publisher<'_>) -> GenerationResult {
        let started_at = Utc::now();
        let cancel = self.cancel.child_token();
        let mut attempts = 0u32;

        let outcome = loop {
            if cancel.is_cancelled() {
                break Err(GenerationError::Cancelled {
                    product_id: product.id.clone(),
                    job_id: None,
                });
            }

            attempts += 1;
            let outcome = self.attempt(index, product, &cancel, publisher).await;
            match &outcome {
                Err(GenerationError::JobFailed { job_id, reason, .. }) if attempts <= self.config.job_retries => {
                    warn!(product_id = %product.id, %job_id, %reason, attempts, "Job failed, resubmitting");
                }
                _ => break outcome,
            }
        };

        match &outcome {
            Ok(_) => {
                info!(index, product_id = %product.id, attempts, "Product generated");
                publisher.send(PipelineEvent::JobComplete {
                    index,
                    product_id: product.id.clone(),
                });
            }
            Err(error) => {
                warn!(index, product_id = %product.id, kind = error.kind(), %error, "Product generation failed");
                publisher.send(PipelineEvent::JobFailed {
                    index,
                    product_id: product.id.clone(),
                    error: error.clone(),
                });
            }
        }

        GenerationResult::new(product, outcome, attempts, started_at)
    }

    async fn attempt(
        &self,
        index: usize,
        product: &ProductInput,
        cancel: &CancellationToken,
        publisher: Publisher<'_>,
    ) -> GenerationOutcome {
        let submitted = tokio::select! {
            _ = cancel.cancelled() => None,
            result = self.client.submit(product) => Some(result),
        };
        let handle = match submitted {
            None => {
                return Err(GenerationError::Cancelled {
                    product_id: product.id.clone(),
                    job_id: None,
                });
            }
            Some(Ok(handle)) => handle,
            Some(Err(e)) => return Err(client_error(product, "submission", e)),
        };

        publisher.send(PipelineEvent::JobQueued {
            index,
            product_id: product.id.clone(),
            job_id: handle.job_id.clone(),
        });

        let mut poll = PollLoop::new(&self.client, &self.config.poll, cancel.clone());
        let polled = poll
            .poll_observed(&handle, |attempt, elapsed| {
                publisher.send(PipelineEvent::JobProgress {
                    index,
                    job_id: handle.job_id.clone(),
                    attempt,
                    elapsed_ms: elapsed.as_millis() as u64,
                })
            })
            .await;

        match polled {
            Ok(JobStatus::Succeeded { payload }) => Ok(payload),
            Ok(JobStatus::Failed { reason }) => Err(GenerationError::JobFailed {
                product_id: product.id.clone(),
                job_id: handle.job_id.clone(),
                reason,
            }),
            Ok(JobStatus::Pending) => Err(GenerationError::Protocol {
                product_id: product.id.clone(),
                message: format!("job {} ended polling while still pending", handle),
            }),
            Err(PollError::Timeout { job_id, elapsed }) => {
                self.revoke(&handle).await;
                Err(GenerationError::Timeout {
                    product_id: product.id.clone(),
                    job_id,
                    elapsed_ms: elapsed.as_millis() as u64,
                })
            }
            Err(PollError::Cancelled { job_id }) => {
                self.revoke(&handle).await;
                Err(GenerationError::Cancelled {
                    product_id: product.id.clone(),
                    job_id: Some(job_id),
                })
            }
            Err(PollError::Client { job_id, source }) => {
                Err(client_error(product, &format!("status check for job {job_id}"), source))
            }
        }
    }

    async fn revoke(&self, handle: &JobHandle) {
        if let Err(e) = self.client.cancel(handle).await {
            warn!(job_id = %handle, error = %e, "Failed to cancel abandoned job");
        }
    }
}

fn client_error(product: &ProductInput, during: &str, error: JobClientError) -> GenerationError {
    let message = format!("{during}: {error}");
    if error.is_transport() {
        GenerationError::Transport {
            product_id: product.id.clone(),
            message,
        }
    } else {
        GenerationError::Protocol {
            product_id: product.id.clone(),
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;
    use async_trait::async_trait;
    use vt_core::GenerationPayload;

    /// Every job fails on its first submission and succeeds afterwards
    #[derive(Default)]
    struct FlakyJobs {
        submissions: Mutex<u32>,
        cancelled: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl JobClient for FlakyJobs {
        async fn submit(&self, _product: &ProductInput) -> Result<JobHandle, JobClientError> {
            let mut n = self.submissions.lock().unwrap();
            *n += 1;
            Ok(JobHandle::new(format!("job-{}", *n)))
        }

        async fn fetch_status(&self, handle: &JobHandle) -> Result<JobStatus, JobClientError> {
            if handle.job_id == "job-1" {
                Ok(JobStatus::Failed { reason: "model overloaded".into() })
            } else {
                Ok(JobStatus::Succeeded { payload: GenerationPayload::new("ok") })
            }
        }

        async fn cancel(&self, handle: &JobHandle) -> Result<(), JobClientError> {
            self.cancelled.lock().unwrap().push(handle.job_id.clone());
            Ok(())
        }
    }

    /// Never finishes a job
    #[derive(Default)]
    struct StuckJobs {
        cancelled: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl JobClient for StuckJobs {
        async fn submit(&self, product: &ProductInput) -> Result<JobHandle, JobClientError> {
            Ok(JobHandle::new(format!("job-{}", product.id)))
        }

        async fn fetch_status(&self, _handle: &JobHandle) -> Result<JobStatus, JobClientError> {
            Ok(JobStatus::Pending)
        }

        async fn cancel(&self, handle: &JobHandle) -> Result<(), JobClientError> {
            self.cancelled.lock().unwrap().push(handle.job_id.clone());
            Ok(())
        }
    }

    fn products(n: usize) -> Vec<ProductInput> {
        (1..=n).map(|i| ProductInput::new(format!("p{i}"), format!("Product {i}"))).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_reported_failure_is_not_retried_by_default() {
        let batch = BatchOrchestrator::new(FlakyJobs::default(), BatchConfig::default());

        let results = batch.run(&products(1)).await;

        assert!(matches!(results[0].outcome, Err(GenerationError::JobFailed { .. })));
        assert_eq!(results[0].attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_job_retries_resubmit_reported_failures() {
        let config = BatchConfig {
            job_retries: 1,
            ..Default::default()
        };
        let batch = BatchOrchestrator::new(FlakyJobs::default(), config);

        let results = batch.run(&products(1)).await;

        assert!(results[0].is_ok());
        assert_eq!(results[0].attempts, 2);
        assert_eq!(*batch.client().submissions.lock().unwrap(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_revokes_job() {
        let config = BatchConfig {
            poll: PollConfig {
                deadline: Duration::from_secs(3),
                ..Default::default()
            },
            ..Default::default()
        };
        let batch = BatchOrchestrator::new(StuckJobs::default(), config);

        let results = batch.run(&products(1)).await;

        match &results[0].outcome {
            Err(GenerationError::Timeout { job_id, elapsed_ms, .. }) => {
                assert_eq!(job_id, "job-p1");
                assert!(*elapsed_ms >= 3000);
            }
            other => panic!("expected timeout, got {other:?}"),
        }
        assert_eq!(*batch.client().cancelled.lock().unwrap(), vec!["job-p1".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_batch_still_returns_every_item() {
        let batch = BatchOrchestrator::new(StuckJobs::default(), BatchConfig::default());
        let cancel = batch.cancellation_token();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(1500)).await;
            cancel.cancel();
        });

        let results = batch.run(&products(3)).await;

        assert_eq!(results.len(), 3);
        assert_eq!(
            results[0].error(),
            Some(&GenerationError::Cancelled { product_id: "p1".into(), job_id: Some("job-p1".into()) })
        );
        for (result, id) in results[1..].iter().zip(["p2", "p3"]) {
            assert_eq!(
                result.error(),
                Some(&GenerationError::Cancelled { product_id: id.into(), job_id: None })
            );
            assert_eq!(result.attempts, 0);
        }
        assert_eq!(*batch.client().cancelled.lock().unwrap(), vec!["job-p1".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_events_follow_item_lifecycle() {
        let batch = BatchOrchestrator::new(FlakyJobs::default(), BatchConfig::default());
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        let results = batch.run_with_events(&products(2), tx).await;
        assert_eq!(results.len(), 2);

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }

        assert!(matches!(events[0], PipelineEvent::JobQueued { index: 0, .. }));
        assert!(matches!(events[1], PipelineEvent::JobFailed { index: 0, .. }));
        assert!(matches!(events[2], PipelineEvent::ItemReady(_)));
        assert!(matches!(events[3], PipelineEvent::JobQueued { index: 1, .. }));
        assert!(matches!(events[4], PipelineEvent::JobComplete { index: 1, .. }));
        assert!(matches!(events.last(), Some(PipelineEvent::BatchFinished { succeeded: 1, failed: 1 })));
    }
}
