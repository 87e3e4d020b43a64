use serde_json::Value;
use vt_core::scene_spec::Primitive;

type ShapeBuilder = fn(&Value) -> Result<Primitive, String>;

/// Every shape a payload may name. Nothing outside this table is ever built.
const SHAPES: &[(&str, ShapeBuilder)] = &[
    ("box", build_box),
    ("sphere", build_sphere),
    ("cylinder", build_cylinder),
    ("cone", build_cone),
    ("torus", build_torus),
    ("plane", build_plane),
    ("capsule", build_capsule),
];

pub fn supported_kinds() -> impl Iterator<Item = &'static str> {
    SHAPES.iter().map(|(kind, _)| *kind)
}

pub(crate) fn builder(kind: &str) -> Option<ShapeBuilder> {
    SHAPES.iter().find(|(k, _)| *k == kind).map(|(_, b)| *b)
}

/// Numeric field, `default` when absent or null
fn dim(node: &Value, field: &str, default: f32) -> Result<f32, String> {
    match node.get(field) {
        None | Some(Value::Null) => Ok(default),
        Some(v) => v
            .as_f64()
            .map(|f| f as f32)
            .ok_or_else(|| format!("{field} must be a number, got {v}")),
    }
}

fn build_box(node: &Value) -> Result<Primitive, String> {
    Ok(Primitive::Box {
        width: dim(node, "width", 1.0)?,
        height: dim(node, "height", 1.0)?,
        depth: dim(node, "depth", 1.0)?,
    })
}

fn build_sphere(node: &Value) -> Result<Primitive, String> {
    Ok(Primitive::Sphere {
        radius: dim(node, "radius", 1.0)?,
    })
}

fn build_cylinder(node: &Value) -> Result<Primitive, String> {
    // a single `radius` sets both ends
    let radius = dim(node, "radius", 1.0)?;
    Ok(Primitive::Cylinder {
        radius_top: dim(node, "radius_top", radius)?,
        radius_bottom: dim(node, "radius_bottom", radius)?,
        height: dim(node, "height", 1.0)?,
    })
}

fn build_cone(node: &Value) -> Result<Primitive, String> {
    Ok(Primitive::Cone {
        radius: dim(node, "radius", 1.0)?,
        height: dim(node, "height", 1.0)?,
    })
}

fn build_torus(node: &Value) -> Result<Primitive, String> {
    Ok(Primitive::Torus {
        radius: dim(node, "radius", 1.0)?,
        tube: dim(node, "tube", 0.4)?,
    })
}

fn build_plane(node: &Value) -> Result<Primitive, String> {
    Ok(Primitive::Plane {
        width: dim(node, "width", 1.0)?,
        height: dim(node, "height", 1.0)?,
    })
}

fn build_capsule(node: &Value) -> Result<Primitive, String> {
    Ok(Primitive::Capsule {
        radius: dim(node, "radius", 1.0)?,
        length: dim(node, "length", 1.0)?,
    })
}
