//! Turning a generated payload into live scene objects.
//!
//! Everything is created through a [`RenderLibrary`] handed in by the caller,
//! so the same hydration code drives a real renderer or the headless
//! [`SceneGraph`] arena.

mod graph;
mod hydrator;
mod shapes;

use glam::{Quat, Vec3};
use thiserror::Error;
use vt_core::scene_spec::{MaterialSpec, Primitive};

pub use graph::SceneGraph;
pub use hydrator::{
    dispose, extract_fenced, hydrate, HydratedScene, HydrationError, SceneHydrator, DEFAULT_ANCHOR, MAX_DEPTH,
    MAX_NODES, MIN_PAYLOAD_LEN,
};
pub use shapes::supported_kinds;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GeometryId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialId(pub u32);

#[derive(Error, Debug, Clone, PartialEq)]
#[error("render library: {0}")]
pub struct LibraryError(pub String);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeTransform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for NodeTransform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeKind {
    Group,
    Mesh { geometry: GeometryId },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub name: Option<String>,
    pub material: Option<MaterialId>,
    pub transform: NodeTransform,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub double_sided: bool,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
    pub frustum_culled: bool,
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            name: None,
            material: None,
            transform: NodeTransform::default(),
            parent: None,
            children: Vec::new(),
            double_sided: false,
            cast_shadow: false,
            receive_shadow: false,
            frustum_culled: true,
        }
    }

    pub fn is_mesh(&self) -> bool {
        matches!(self.kind, NodeKind::Mesh { .. })
    }
}

/// Constructors and release hooks of the rendering backend.
///
/// Ids are only meaningful to the library that issued them. Releasing an id
/// that is not live is a no-op.
pub trait RenderLibrary {
    fn create_geometry(&mut self, shape: &Primitive) -> Result<GeometryId, LibraryError>;
    fn create_material(&mut self, spec: &MaterialSpec) -> Result<MaterialId, LibraryError>;
    fn create_mesh(&mut self, geometry: GeometryId, material: Option<MaterialId>) -> Result<NodeId, LibraryError>;
    fn create_group(&mut self) -> Result<NodeId, LibraryError>;
    fn add_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), LibraryError>;

    fn node(&self, id: NodeId) -> Option<&Node>;
    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node>;

    fn release_node(&mut self, id: NodeId);
    fn release_geometry(&mut self, id: GeometryId);
    fn release_material(&mut self, id: MaterialId);
}
