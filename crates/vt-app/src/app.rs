use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use vt_core::GenerationResult;
use crate::catalog::CatalogSource;
use crate::config::AppConfig;
use crate::error::AppError;
use crate::events::PipelineEvent;
use crate::generator::{BatchOrchestrator, HttpJobClient};
use crate::scene::SceneGraph;
use crate::viewer::{ViewState, ViewerController};

/// Catalog in, generated scenes out
pub struct App {
    config: AppConfig,
    cancel: CancellationToken,
}

impl App {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            cancel: CancellationToken::new(),
        }
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub async fn generate(&self) -> Result<Vec<GenerationResult>, AppError> {
        let catalog = self.config.catalog.clone().into_source()?;
        self.generate_from(catalog.as_ref()).await
    }

    pub async fn generate_from(&self, catalog: &dyn CatalogSource) -> Result<Vec<GenerationResult>, AppError> {
        let products = catalog.fetch_products().await?;
        if products.is_empty() {
            warn!("Catalog is empty, nothing to generate");
            return Ok(Vec::new());
        }

        let client = HttpJobClient::new(self.config.backend.clone())?;
        if let Err(e) = client.health().await {
            warn!(error = %e, "Generation backend health check failed, trying anyway");
        }

        let orchestrator = BatchOrchestrator::new(client, self.config.batch.clone())
            .with_cancellation(self.cancel.clone());

        let (tx, rx) = mpsc::unbounded_channel();
        let logger = tokio::spawn(log_events(rx, products.len()));
        let results = orchestrator.run_with_events(&products, tx).await;
        if let Err(e) = logger.await {
            warn!(error = %e, "Event logger stopped unexpectedly");
        }

        Ok(results)
    }

    /// Walks the headless viewer through every result.
    /// Returns the number of items that ended up as a live scene.
    pub fn present(&self, results: Vec<GenerationResult>) -> usize {
        let mut graph = SceneGraph::new();
        let mut viewer = ViewerController::new(&mut graph, results, &self.config.viewer);
        let mut shown = 0;

        for index in 0..viewer.len() {
            let state = viewer.show(index).clone();
            let caption = viewer.caption().unwrap_or_default();
            match state {
                ViewState::Scene { nodes, meshes, .. } => {
                    shown += 1;
                    info!(%caption, nodes, meshes, "Scene ready");
                }
                ViewState::Placeholder { message, .. } => {
                    warn!(%caption, %message, "Showing placeholder");
                }
                ViewState::Empty => {}
            }
        }

        viewer.teardown();
        debug!(
            nodes = graph.live_nodes(),
            geometries = graph.live_geometries(),
            materials = graph.live_materials(),
            "Viewer torn down"
        );
        shown
    }
}

async fn log_events(mut rx: UnboundedReceiver<PipelineEvent>, total: usize) {
    while let Some(event) = rx.recv().await {
        match event {
            PipelineEvent::JobQueued { index, product_id, job_id } => {
                info!(product_id = %product_id, job_id = %job_id, "[{}/{}] Job queued", index + 1, total);
            }
            PipelineEvent::JobProgress { job_id, attempt, elapsed_ms, .. } => {
                debug!(job_id = %job_id, attempt, elapsed_ms, "Job pending");
            }
            PipelineEvent::JobComplete { index, product_id } => {
                info!(product_id = %product_id, "[{}/{}] Job complete", index + 1, total);
            }
            PipelineEvent::JobFailed { index, product_id, error } => {
                warn!(product_id = %product_id, kind = error.kind(), "[{}/{}] Job failed: {}", index + 1, total, error);
            }
            PipelineEvent::ItemReady(result) => {
                debug!(product_id = %result.product_id, duration_ms = result.duration_ms(), "Result recorded");
            }
            PipelineEvent::BatchFinished { succeeded, failed } => {
                info!(succeeded, failed, "All products processed");
            }
        }
    }
}
