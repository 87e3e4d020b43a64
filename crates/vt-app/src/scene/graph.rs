use std::collections::HashMap;
use vt_core::scene_spec::{MaterialSpec, Primitive};
use crate::scene::{GeometryId, LibraryError, MaterialId, Node, NodeId, NodeKind, RenderLibrary};

/// In-memory render library.
///
/// Keeps every resource in a map so a test or the headless viewer can count
/// exactly what is alive at any moment.
#[derive(Debug, Default)]
pub struct SceneGraph {
    nodes: HashMap<NodeId, Node>,
    geometries: HashMap<GeometryId, Primitive>,
    materials: HashMap<MaterialId, MaterialSpec>,
    next_id: u32,
    budget: Option<usize>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuses allocations once `budget` resources of any kind are live
    pub fn with_budget(budget: usize) -> Self {
        Self {
            budget: Some(budget),
            ..Self::default()
        }
    }

    pub fn live_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn live_geometries(&self) -> usize {
        self.geometries.len()
    }

    pub fn live_materials(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.geometries.is_empty() && self.materials.is_empty()
    }

    pub fn geometry(&self, id: GeometryId) -> Option<&Primitive> {
        self.geometries.get(&id)
    }

    pub fn material(&self, id: MaterialId) -> Option<&MaterialSpec> {
        self.materials.get(&id)
    }

    /// `root` and everything below it, depth first
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if let Some(node) = self.nodes.get(&id) {
                out.push(id);
                stack.extend(node.children.iter().rev());
            }
        }
        out
    }

    fn allocate(&mut self) -> Result<u32, LibraryError> {
        if let Some(budget) = self.budget {
            let live = self.nodes.len() + self.geometries.len() + self.materials.len();
            if live >= budget {
                return Err(LibraryError(format!("allocation budget of {budget} resources exhausted")));
            }
        }
        self.next_id += 1;
        Ok(self.next_id)
    }
}

impl RenderLibrary for SceneGraph {
    fn create_geometry(&mut self, shape: &Primitive) -> Result<GeometryId, LibraryError> {
        let id = GeometryId(self.allocate()?);
        self.geometries.insert(id, *shape);
        Ok(id)
    }

    fn create_material(&mut self, spec: &MaterialSpec) -> Result<MaterialId, LibraryError> {
        let id = MaterialId(self.allocate()?);
        self.materials.insert(id, spec.clone());
        Ok(id)
    }

    fn create_mesh(&mut self, geometry: GeometryId, material: Option<MaterialId>) -> Result<NodeId, LibraryError> {
        if !self.geometries.contains_key(&geometry) {
            return Err(LibraryError(format!("unknown geometry {}", geometry.0)));
        }
        if let Some(m) = material.filter(|m| !self.materials.contains_key(m)) {
            return Err(LibraryError(format!("unknown material {}", m.0)));
        }

        let id = NodeId(self.allocate()?);
        let mut node = Node::new(NodeKind::Mesh { geometry });
        node.material = material;
        self.nodes.insert(id, node);
        Ok(id)
    }

    fn create_group(&mut self) -> Result<NodeId, LibraryError> {
        let id = NodeId(self.allocate()?);
        self.nodes.insert(id, Node::new(NodeKind::Group));
        Ok(id)
    }

    fn add_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), LibraryError> {
        let current = match self.nodes.get(&child) {
            Some(c) if parent != child => c.parent,
            _ => return Err(LibraryError(format!("cannot attach node {} to {}", child.0, parent.0))),
        };
        if current == Some(parent) {
            return Ok(());
        }
        let Some(p) = self.nodes.get_mut(&parent) else {
            return Err(LibraryError(format!("unknown parent node {}", parent.0)));
        };
        p.children.push(child);

        let previous = self.nodes.get_mut(&child).and_then(|c| c.parent.replace(parent));
        if let Some(old) = previous.and_then(|old| self.nodes.get_mut(&old)) {
            old.children.retain(|c| *c != child);
        }
        Ok(())
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    fn release_node(&mut self, id: NodeId) {
        let Some(node) = self.nodes.remove(&id) else {
            return;
        };
        if let Some(parent) = node.parent.and_then(|p| self.nodes.get_mut(&p)) {
            parent.children.retain(|c| *c != id);
        }
        for child in node.children {
            if let Some(c) = self.nodes.get_mut(&child) {
                c.parent = None;
            }
        }
    }

    fn release_geometry(&mut self, id: GeometryId) {
        self.geometries.remove(&id);
    }

    fn release_material(&mut self, id: MaterialId) {
        self.materials.remove(&id);
    }
}
