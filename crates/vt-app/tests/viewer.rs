use chrono::Utc;
use vt_app::scene::{
    GeometryId, LibraryError, MaterialId, Node, NodeId, RenderLibrary, SceneGraph,
};
use vt_app::viewer::{ViewState, ViewerConfig, ViewerController};
use vt_core::scene_spec::{MaterialSpec, Primitive};
use vt_core::{GenerationError, GenerationPayload, GenerationResult, ProductInput};

/// Wraps the arena and remembers the most nodes that were ever alive at once
#[derive(Default)]
struct PeakTracking {
    graph: SceneGraph,
    peak_nodes: usize,
}

impl PeakTracking {
    fn track(&mut self) {
        self.peak_nodes = self.peak_nodes.max(self.graph.live_nodes());
    }
}

impl RenderLibrary for PeakTracking {
    fn create_geometry(&mut self, shape: &Primitive) -> Result<GeometryId, LibraryError> {
        self.graph.create_geometry(shape)
    }

    fn create_material(&mut self, spec: &MaterialSpec) -> Result<MaterialId, LibraryError> {
        self.graph.create_material(spec)
    }

    fn create_mesh(&mut self, geometry: GeometryId, material: Option<MaterialId>) -> Result<NodeId, LibraryError> {
        let id = self.graph.create_mesh(geometry, material)?;
        self.track();
        Ok(id)
    }

    fn create_group(&mut self) -> Result<NodeId, LibraryError> {
        let id = self.graph.create_group()?;
        self.track();
        Ok(id)
    }

    fn add_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), LibraryError> {
        self.graph.add_child(parent, child)
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.graph.node(id)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.graph.node_mut(id)
    }

    fn release_node(&mut self, id: NodeId) {
        self.graph.release_node(id)
    }

    fn release_geometry(&mut self, id: GeometryId) {
        self.graph.release_geometry(id)
    }

    fn release_material(&mut self, id: MaterialId) {
        self.graph.release_material(id)
    }
}

fn result(id: &str, outcome: Result<&str, GenerationError>) -> GenerationResult {
    let product = ProductInput::new(id, format!("Product {id}"));
    GenerationResult::new(&product, outcome.map(GenerationPayload::new), 1, Utc::now())
}

fn catalog_results() -> Vec<GenerationResult> {
    let three_boxes = r#"{"kind":"group","children":[{"kind":"box"},{"kind":"box"},{"kind":"box"}]}"#;
    let fenced = "```javascript\n{\"kind\":\"group\",\"children\":[{\"kind\":\"sphere\",\"radius\":0.5}]}\n```";
    vec![
        result("boxes", Ok(three_boxes)),
        result(
            "timeout",
            Err(GenerationError::Timeout {
                product_id: "timeout".into(),
                job_id: "job-9".into(),
                elapsed_ms: 300_000,
            }),
        ),
        result("fenced", Ok(fenced)),
        result("unknown", Ok(r#"{"kind":"dodecahedron","radius":1}"#)),
    ]
}

#[test]
fn cycling_through_results_never_stacks_scenes() {
    let mut library = PeakTracking::default();
    let mut viewer = ViewerController::new(&mut library, catalog_results(), &ViewerConfig::default());

    viewer.show(0);
    for _ in 0..8 {
        viewer.next();
    }
    for _ in 0..5 {
        viewer.previous();
    }
    viewer.reload();
    viewer.teardown();

    // the largest single scene is the group with three boxes
    assert_eq!(library.peak_nodes, 4);
    assert!(library.graph.is_empty());
}

#[test]
fn each_item_renders_or_explains_itself() {
    let mut library = SceneGraph::new();
    let mut viewer = ViewerController::new(&mut library, catalog_results(), &ViewerConfig::default());

    assert!(matches!(viewer.show(0), ViewState::Scene { meshes: 3, .. }));
    assert_eq!(viewer.caption().as_deref(), Some("Product boxes (1/4)"));

    match viewer.next() {
        ViewState::Placeholder { product_id, message, .. } => {
            assert_eq!(product_id, "timeout");
            assert!(message.contains("job-9"), "{message}");
        }
        other => panic!("expected placeholder, got {other:?}"),
    }

    assert!(matches!(viewer.next(), ViewState::Scene { nodes: 2, meshes: 1, .. }));

    match viewer.next() {
        ViewState::Placeholder { message, .. } => assert!(message.contains("dodecahedron"), "{message}"),
        other => panic!("expected placeholder, got {other:?}"),
    }
    assert!(viewer.active_scene().is_none());
    assert_eq!(viewer.library().live_nodes(), 0);
}
