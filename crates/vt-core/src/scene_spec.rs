//! Declarative description of generated content.
//!
//! The generator emits a JSON tree of primitives and groups instead of
//! executable code. These are the leaf value types of that tree; the tree
//! walk and the dispatch by `kind` live in the viewer.

use serde::{Deserialize, Serialize};

pub const GROUP_KIND: &str = "group";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialSpec {
    pub color: String,
    pub metalness: f32,
    pub roughness: f32,
    pub opacity: f32,
    pub emissive: Option<String>,
}

impl Default for MaterialSpec {
    fn default() -> Self {
        Self {
            color: "#cccccc".to_string(),
            metalness: 0.1,
            roughness: 0.6,
            opacity: 1.0,
            emissive: None,
        }
    }
}

impl MaterialSpec {
    /// Linear 0..1 RGB from a `#rrggbb` or `#rgb` string
    pub fn rgb(&self) -> Option<[f32; 3]> {
        parse_hex_color(&self.color)
    }

    /// Clamp factors into their valid ranges; unparseable colors fall back to the default
    pub fn sanitized(mut self) -> Self {
        self.metalness = clamp_unit(self.metalness, 0.1);
        self.roughness = clamp_unit(self.roughness, 0.6);
        self.opacity = clamp_unit(self.opacity, 1.0);
        if self.rgb().is_none() {
            self.color = Self::default().color;
        }
        if self.emissive.as_deref().and_then(parse_hex_color).is_none() {
            self.emissive = None;
        }
        self
    }
}

fn clamp_unit(v: f32, fallback: f32) -> f32 {
    if v.is_finite() { v.clamp(0.0, 1.0) } else { fallback }
}

fn parse_hex_color(s: &str) -> Option<[f32; 3]> {
    let hex = s.strip_prefix('#')?;
    let expanded: String = match hex.len() {
        3 => hex.chars().flat_map(|c| [c, c]).collect(),
        6 => hex.to_string(),
        _ => return None,
    };
    let value = u32::from_str_radix(&expanded, 16).ok()?;
    Some([
        ((value >> 16) & 0xff) as f32 / 255.0,
        ((value >> 8) & 0xff) as f32 / 255.0,
        (value & 0xff) as f32 / 255.0,
    ])
}

/// Local transform; rotation is XYZ euler angles in radians
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformSpec {
    pub position: [f32; 3],
    pub rotation: [f32; 3],
    pub scale: [f32; 3],
}

impl Default for TransformSpec {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            rotation: [0.0; 3],
            scale: [1.0; 3],
        }
    }
}

impl TransformSpec {
    pub fn is_finite(&self) -> bool {
        self.position.iter()
            .chain(self.rotation.iter())
            .chain(self.scale.iter())
            .all(|v| v.is_finite())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Primitive {
    Box { width: f32, height: f32, depth: f32 },
    Sphere { radius: f32 },
    Cylinder { radius_top: f32, radius_bottom: f32, height: f32 },
    Cone { radius: f32, height: f32 },
    Torus { radius: f32, tube: f32 },
    Plane { width: f32, height: f32 },
    Capsule { radius: f32, length: f32 },
}

impl Primitive {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Box { .. } => "box",
            Self::Sphere { .. } => "sphere",
            Self::Cylinder { .. } => "cylinder",
            Self::Cone { .. } => "cone",
            Self::Torus { .. } => "torus",
            Self::Plane { .. } => "plane",
            Self::Capsule { .. } => "capsule",
        }
    }

    fn dimensions(&self) -> Vec<(&'static str, f32)> {
        match *self {
            Self::Box { width, height, depth } => vec![("width", width), ("height", height), ("depth", depth)],
            Self::Sphere { radius } => vec![("radius", radius)],
            // one end of a cylinder may taper to a point
            Self::Cylinder { radius_top, radius_bottom, height } => vec![
                ("radius_top", radius_top.max(f32::MIN_POSITIVE)),
                ("radius_bottom", radius_bottom.max(f32::MIN_POSITIVE)),
                ("height", height),
            ],
            Self::Cone { radius, height } => vec![("radius", radius), ("height", height)],
            Self::Torus { radius, tube } => vec![("radius", radius), ("tube", tube)],
            Self::Plane { width, height } => vec![("width", width), ("height", height)],
            Self::Capsule { radius, length } => vec![("radius", radius), ("length", length)],
        }
    }

    /// Every dimension must be finite and strictly positive
    pub fn validate(&self) -> Result<(), String> {
        if let Self::Cylinder { radius_top, radius_bottom, .. } = *self {
            if radius_top <= 0.0 && radius_bottom <= 0.0 {
                return Err("cylinder needs at least one positive radius".to_string());
            }
            if radius_top < 0.0 || radius_bottom < 0.0 {
                return Err("cylinder radius must not be negative".to_string());
            }
        }
        for (name, value) in self.dimensions() {
            if !value.is_finite() || value <= 0.0 {
                return Err(format!("{} {} must be a positive number, got {}", self.kind(), name, value));
            }
        }
        Ok(())
    }

}
