use glam::{EulerRot, Quat, Vec3};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};
use vt_core::scene_spec::{MaterialSpec, Primitive, TransformSpec, GROUP_KIND};
use crate::scene::shapes;
use crate::scene::{GeometryId, LibraryError, MaterialId, NodeId, NodeTransform, RenderLibrary};

/// Length of `{"kind":"box"}`, the smallest complete scene
pub const MIN_PAYLOAD_LEN: usize = 14;
pub const MAX_DEPTH: usize = 32;
pub const MAX_NODES: usize = 4096;
pub const DEFAULT_ANCHOR: Vec3 = Vec3::new(0.0, 1.0, 0.0);

#[derive(Error, Debug, Clone, PartialEq)]
pub enum HydrationError {
    #[error("payload is empty")]
    Empty,

    #[error("payload is too short to describe a scene ({len} bytes)")]
    TooShort { len: usize },

    #[error("payload is not valid JSON: {0}")]
    Parse(String),

    #[error("unrecognized node kind {} at {path}", .kind.as_deref().unwrap_or("<missing>"))]
    UnrecognizedKind { kind: Option<String>, path: String },

    #[error("invalid {kind} at {path}: {reason}")]
    InvalidShape {
        kind: String,
        path: String,
        reason: String,
    },

    #[error("scene too large: {0}")]
    TooLarge(String),

    #[error(transparent)]
    Library(#[from] LibraryError),
}

/// The live objects built from one payload.
///
/// Must be handed back through [`dispose`]; dropping it leaves its resources
/// allocated in the library.
#[must_use = "a hydrated scene must be disposed"]
#[derive(Debug)]
pub struct HydratedScene {
    root: NodeId,
    resources: Resources,
    meshes: usize,
    disposed: bool,
}

impl HydratedScene {
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node_count(&self) -> usize {
        self.resources.nodes.len()
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes
    }

    pub fn geometry_count(&self) -> usize {
        self.resources.geometries.len()
    }

    pub fn material_count(&self) -> usize {
        self.resources.materials.len()
    }

    pub fn dispose<L: RenderLibrary + ?Sized>(mut self, library: &mut L) {
        std::mem::take(&mut self.resources).release(library);
        self.disposed = true;
        debug!(root = self.root.0, "Scene disposed");
    }
}

impl Drop for HydratedScene {
    fn drop(&mut self) {
        if !self.disposed {
            warn!(
                root = self.root.0,
                nodes = self.resources.nodes.len(),
                "Scene dropped without dispose, its resources are leaked"
            );
        }
    }
}

/// Everything allocated for one payload, in allocation order
#[derive(Debug, Default)]
struct Resources {
    nodes: Vec<NodeId>,
    geometries: Vec<GeometryId>,
    materials: Vec<MaterialId>,
}

impl Resources {
    fn release<L: RenderLibrary + ?Sized>(self, library: &mut L) {
        for id in self.nodes.into_iter().rev() {
            library.release_node(id);
        }
        for id in self.geometries {
            library.release_geometry(id);
        }
        for id in self.materials {
            library.release_material(id);
        }
    }
}

/// Validated node tree; building from it can only fail inside the library
enum Plan {
    Group {
        name: Option<String>,
        transform: NodeTransform,
        children: Vec<Plan>,
    },
    Mesh {
        name: Option<String>,
        shape: Primitive,
        material: Option<MaterialSpec>,
        transform: NodeTransform,
    },
}

#[derive(Debug, Clone)]
pub struct SceneHydrator {
    anchor: Vec3,
}

impl Default for SceneHydrator {
    fn default() -> Self {
        Self::new(DEFAULT_ANCHOR)
    }
}

impl SceneHydrator {
    pub fn new(anchor: Vec3) -> Self {
        Self { anchor }
    }

    pub fn anchor(&self) -> Vec3 {
        self.anchor
    }

    /// Interprets `payload` as a declarative scene and builds it in `library`.
    ///
    /// On error nothing built for this payload is left in the library.
    pub fn hydrate<L: RenderLibrary + ?Sized>(
        &self,
        payload: &str,
        library: &mut L,
    ) -> Result<HydratedScene, HydrationError> {
        let payload = payload.trim();
        if payload.is_empty() {
            return Err(HydrationError::Empty);
        }
        if payload.len() < MIN_PAYLOAD_LEN {
            return Err(HydrationError::TooShort { len: payload.len() });
        }

        let value = parse_payload(payload)?;

        let mut count = 0;
        let plan = plan_node(&value, "root", 1, &mut count)?;

        let mut resources = Resources::default();
        match self.build(&plan, library, &mut resources) {
            Ok((root, meshes)) => {
                debug!(nodes = resources.nodes.len(), meshes, "Scene hydrated");
                Ok(HydratedScene {
                    root,
                    resources,
                    meshes,
                    disposed: false,
                })
            }
            Err(e) => {
                warn!(error = %e, allocated = resources.nodes.len(), "Hydration failed mid-build, releasing");
                resources.release(library);
                Err(e.into())
            }
        }
    }

    fn build<L: RenderLibrary + ?Sized>(
        &self,
        plan: &Plan,
        library: &mut L,
        resources: &mut Resources,
    ) -> Result<(NodeId, usize), LibraryError> {
        let root = build_node(plan, library, resources)?;
        let meshes = normalize(root, library, resources)?;

        let node = library
            .node_mut(root)
            .ok_or_else(|| LibraryError(format!("root node {} vanished", root.0)))?;
        node.transform.translation = self.anchor;

        Ok((root, meshes))
    }
}

pub fn hydrate<L: RenderLibrary + ?Sized>(payload: &str, library: &mut L) -> Result<HydratedScene, HydrationError> {
    SceneHydrator::default().hydrate(payload, library)
}

pub fn dispose<L: RenderLibrary + ?Sized>(scene: HydratedScene, library: &mut L) {
    scene.dispose(library)
}

/// Plain JSON first; a fenced block only when the payload as a whole does not parse
fn parse_payload(payload: &str) -> Result<Value, HydrationError> {
    let err = match serde_json::from_str(payload) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };
    match extract_fenced(payload) {
        Some(body) => serde_json::from_str(body).map_err(|e| HydrationError::Parse(e.to_string())),
        None => Err(HydrationError::Parse(err.to_string())),
    }
}

/// Body of the first ``` fence, without its info string
pub fn extract_fenced(payload: &str) -> Option<&str> {
    let start = payload.find("```")?;
    let after = &payload[start + 3..];
    let inner = match after.find("```") {
        Some(end) => &after[..end],
        None => after,
    };
    // info string (`json`, `javascript`, ...) may sit on its own line or before the body
    let info = inner
        .find(|c: char| !c.is_ascii_alphanumeric())
        .unwrap_or(inner.len());
    Some(inner[info..].trim())
}

fn plan_node(value: &Value, path: &str, depth: usize, count: &mut usize) -> Result<Plan, HydrationError> {
    if depth > MAX_DEPTH {
        return Err(HydrationError::TooLarge(format!("nesting deeper than {MAX_DEPTH} at {path}")));
    }
    *count += 1;
    if *count > MAX_NODES {
        return Err(HydrationError::TooLarge(format!("more than {MAX_NODES} nodes")));
    }

    let Some(kind) = value.get("kind").and_then(Value::as_str) else {
        return Err(HydrationError::UnrecognizedKind {
            kind: value.get("kind").map(|k| k.to_string()),
            path: path.to_string(),
        });
    };

    let invalid = |reason: String| HydrationError::InvalidShape {
        kind: kind.to_string(),
        path: path.to_string(),
        reason,
    };

    let name = value.get("name").and_then(Value::as_str).map(str::to_string);
    let transform = match value.get("transform") {
        None | Some(Value::Null) => TransformSpec::default(),
        Some(t) => serde_json::from_value::<TransformSpec>(t.clone()).map_err(|e| invalid(format!("transform: {e}")))?,
    };
    if !transform.is_finite() {
        return Err(invalid("transform has non-finite components".to_string()));
    }
    let transform = node_transform(&transform);

    if kind == GROUP_KIND {
        let children = match value.get("children") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(i, child)| plan_node(child, &format!("{path}.children[{i}]"), depth + 1, count))
                .collect::<Result<_, _>>()?,
            Some(_) => return Err(invalid("children must be an array".to_string())),
        };
        return Ok(Plan::Group { name, transform, children });
    }

    let Some(build_shape) = shapes::builder(kind) else {
        return Err(HydrationError::UnrecognizedKind {
            kind: Some(kind.to_string()),
            path: path.to_string(),
        });
    };
    let shape = build_shape(value).map_err(invalid)?;
    shape.validate().map_err(invalid)?;

    let material = match value.get("material") {
        None | Some(Value::Null) => None,
        Some(m) => Some(
            serde_json::from_value::<MaterialSpec>(m.clone())
                .map_err(|e| invalid(format!("material: {e}")))?
                .sanitized(),
        ),
    };

    Ok(Plan::Mesh {
        name,
        shape,
        material,
        transform,
    })
}

fn node_transform(spec: &TransformSpec) -> NodeTransform {
    let [rx, ry, rz] = spec.rotation;
    NodeTransform {
        translation: Vec3::from_array(spec.position),
        rotation: Quat::from_euler(EulerRot::XYZ, rx, ry, rz),
        scale: Vec3::from_array(spec.scale),
    }
}

fn build_node<L: RenderLibrary + ?Sized>(
    plan: &Plan,
    library: &mut L,
    resources: &mut Resources,
) -> Result<NodeId, LibraryError> {
    let (id, name, transform) = match plan {
        Plan::Group { name, transform, children } => {
            let id = library.create_group()?;
            resources.nodes.push(id);
            for child in children {
                let child_id = build_node(child, library, resources)?;
                library.add_child(id, child_id)?;
            }
            (id, name, transform)
        }
        Plan::Mesh { name, shape, material, transform } => {
            let geometry = library.create_geometry(shape)?;
            resources.geometries.push(geometry);
            let material = match material {
                Some(spec) => {
                    let m = library.create_material(spec)?;
                    resources.materials.push(m);
                    Some(m)
                }
                None => None,
            };
            let id = library.create_mesh(geometry, material)?;
            resources.nodes.push(id);
            (id, name, transform)
        }
    };

    let node = library
        .node_mut(id)
        .ok_or_else(|| LibraryError(format!("node {} vanished", id.0)))?;
    node.name = name.clone();
    node.transform = *transform;
    Ok(id)
}

/// Gives every mesh a material and the lighting flags the viewer relies on.
/// Returns the number of meshes visited.
fn normalize<L: RenderLibrary + ?Sized>(
    root: NodeId,
    library: &mut L,
    resources: &mut Resources,
) -> Result<usize, LibraryError> {
    let mut fallback: Option<MaterialId> = None;
    let mut meshes = 0;
    let mut stack = vec![root];

    while let Some(id) = stack.pop() {
        let Some(node) = library.node(id) else {
            continue;
        };
        stack.extend(node.children.iter().copied());
        if !node.is_mesh() {
            continue;
        }
        meshes += 1;

        let needs_material = node.material.is_none();
        let material = if needs_material {
            match fallback {
                Some(m) => Some(m),
                None => {
                    let m = library.create_material(&MaterialSpec::default())?;
                    resources.materials.push(m);
                    fallback = Some(m);
                    Some(m)
                }
            }
        } else {
            None
        };

        if let Some(node) = library.node_mut(id) {
            if material.is_some() {
                node.material = material;
            }
            node.double_sided = true;
            node.cast_shadow = true;
            node.receive_shadow = true;
            node.frustum_culled = false;
        }
    }

    Ok(meshes)
}
