use glam::Vec3;
use tracing::{debug, warn};
use vt_core::GenerationResult;
use crate::scene::{HydratedScene, NodeId, RenderLibrary, SceneHydrator, DEFAULT_ANCHOR};

#[derive(Debug, Clone, PartialEq)]
pub struct ViewerConfig {
    /// Where every hydrated scene's root is placed
    pub anchor: Vec3,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self { anchor: DEFAULT_ANCHOR }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViewState {
    /// Nothing shown yet, or no results at all
    Empty,
    Scene {
        product_id: String,
        title: String,
        root: NodeId,
        nodes: usize,
        meshes: usize,
    },
    /// Stands in for an item that failed to generate or to hydrate
    Placeholder {
        product_id: String,
        title: String,
        message: String,
    },
}

/// Steps through batch results, keeping at most one hydrated scene alive.
///
/// The active scene is always disposed before the next one is hydrated, and
/// again when the controller goes away.
pub struct ViewerController<'a, L: RenderLibrary + ?Sized> {
    library: &'a mut L,
    hydrator: SceneHydrator,
    results: Vec<GenerationResult>,
    index: usize,
    active: Option<HydratedScene>,
    state: ViewState,
}

impl<'a, L: RenderLibrary + ?Sized> ViewerController<'a, L> {
    pub fn new(library: &'a mut L, results: Vec<GenerationResult>, config: &ViewerConfig) -> Self {
        Self {
            library,
            hydrator: SceneHydrator::new(config.anchor),
            results,
            index: 0,
            active: None,
            state: ViewState::Empty,
        }
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn results(&self) -> &[GenerationResult] {
        &self.results
    }

    pub fn active_scene(&self) -> Option<&HydratedScene> {
        self.active.as_ref()
    }

    pub fn library(&self) -> &L {
        self.library
    }

    /// Shows item `index`, clamped to the last item
    pub fn show(&mut self, index: usize) -> &ViewState {
        self.dispose_active();

        if self.results.is_empty() {
            self.state = ViewState::Empty;
            return &self.state;
        }
        self.index = index.min(self.results.len() - 1);

        let item = &self.results[self.index];
        let product_id = item.product_id.clone();
        let title = item.title.clone();

        self.state = match &item.outcome {
            Err(error) => ViewState::Placeholder {
                product_id,
                title,
                message: error.to_string(),
            },
            Ok(payload) => match self.hydrator.hydrate(&payload.source, &mut *self.library) {
                Ok(scene) => {
                    let state = ViewState::Scene {
                        product_id,
                        title,
                        root: scene.root(),
                        nodes: scene.node_count(),
                        meshes: scene.mesh_count(),
                    };
                    self.active = Some(scene);
                    state
                }
                Err(e) => {
                    warn!(product_id = %product_id, error = %e, "Could not hydrate generated scene");
                    ViewState::Placeholder {
                        product_id,
                        title,
                        message: e.to_string(),
                    }
                }
            },
        };

        debug!(index = self.index, "Viewer switched item");
        &self.state
    }

    pub fn next(&mut self) -> &ViewState {
        let len = self.results.len().max(1);
        self.show((self.index + 1) % len)
    }

    pub fn previous(&mut self) -> &ViewState {
        let len = self.results.len().max(1);
        self.show((self.index + len - 1) % len)
    }

    pub fn reload(&mut self) -> &ViewState {
        self.show(self.index)
    }

    /// `"<title> (i/n)"`, 1-based
    pub fn caption(&self) -> Option<String> {
        let item = self.results.get(self.index)?;
        Some(format!("{} ({}/{})", item.title, self.index + 1, self.results.len()))
    }

    pub fn teardown(mut self) {
        self.dispose_active();
        self.state = ViewState::Empty;
    }

    fn dispose_active(&mut self) {
        if let Some(scene) = self.active.take() {
            scene.dispose(&mut *self.library);
        }
    }
}

impl<L: RenderLibrary + ?Sized> Drop for ViewerController<'_, L> {
    fn drop(&mut self) {
        self.dispose_active();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use vt_core::{GenerationError, GenerationPayload, ProductInput};
    use crate::scene::SceneGraph;

    fn ok(id: &str, source: &str) -> GenerationResult {
        let product = ProductInput::new(id, format!("Item {id}"));
        GenerationResult::new(&product, Ok(GenerationPayload::new(source)), 1, Utc::now())
    }

    fn failed(id: &str) -> GenerationResult {
        let product = ProductInput::new(id, format!("Item {id}"));
        let error = GenerationError::Transport {
            product_id: id.to_string(),
            message: "connection refused".to_string(),
        };
        GenerationResult::new(&product, Err(error), 1, Utc::now())
    }

    #[test]
    fn test_only_one_scene_is_ever_live() {
        let mut graph = SceneGraph::new();
        let results = vec![
            ok("a", r#"{"kind":"group","children":[{"kind":"box"},{"kind":"sphere"}]}"#),
            ok("b", r#"{"kind":"torus","radius":0.5,"tube":0.2}"#),
        ];
        let mut viewer = ViewerController::new(&mut graph, results, &ViewerConfig::default());

        assert!(matches!(viewer.show(0), ViewState::Scene { nodes: 3, meshes: 2, .. }));
        assert_eq!(viewer.library().live_nodes(), 3);

        assert!(matches!(viewer.next(), ViewState::Scene { nodes: 1, .. }));
        assert_eq!(viewer.library().live_nodes(), 1);
        assert_eq!(viewer.library().live_geometries(), 1);

        viewer.reload();
        assert_eq!(viewer.library().live_nodes(), 1);

        viewer.teardown();
        assert!(graph.is_empty());
    }

    #[test]
    fn test_failures_become_placeholders() {
        let mut graph = SceneGraph::new();
        let results = vec![failed("a"), ok("b", "definitely not a scene")];
        let mut viewer = ViewerController::new(&mut graph, results, &ViewerConfig::default());

        match viewer.show(0) {
            ViewState::Placeholder { product_id, message, .. } => {
                assert_eq!(product_id, "a");
                assert!(message.contains("connection refused"));
            }
            other => panic!("expected placeholder, got {other:?}"),
        }
        assert!(matches!(viewer.next(), ViewState::Placeholder { product_id, .. } if product_id == "b"));
        assert!(viewer.active_scene().is_none());

        drop(viewer);
        assert!(graph.is_empty());
    }

    #[test]
    fn test_navigation_wraps_and_captions() {
        let mut graph = SceneGraph::new();
        let results = vec![failed("a"), failed("b"), failed("c")];
        let mut viewer = ViewerController::new(&mut graph, results, &ViewerConfig::default());

        viewer.show(0);
        assert_eq!(viewer.caption().as_deref(), Some("Item a (1/3)"));
        viewer.previous();
        assert_eq!(viewer.index(), 2);
        assert_eq!(viewer.caption().as_deref(), Some("Item c (3/3)"));
        viewer.next();
        assert_eq!(viewer.index(), 0);

        viewer.show(99);
        assert_eq!(viewer.index(), 2);
    }

    #[test]
    fn test_empty_viewer() {
        let mut graph = SceneGraph::new();
        let mut viewer = ViewerController::new(&mut graph, Vec::new(), &ViewerConfig::default());

        assert_eq!(viewer.next(), &ViewState::Empty);
        assert_eq!(viewer.caption(), None);
    }

    #[test]
    fn test_drop_disposes_active_scene() {
        let mut graph = SceneGraph::new();
        {
            let mut viewer = ViewerController::new(
                &mut graph,
                vec![ok("a", r#"{"kind":"capsule","radius":0.2,"length":1}"#)],
                &ViewerConfig::default(),
            );
            viewer.show(0);
            assert_eq!(viewer.library().live_nodes(), 1);
        }
        assert!(graph.is_empty());
    }
}
