//! Plain-language requests such as "make a red cube at (1, 2, 3)".
//!
//! Only primitive shapes are understood. Colors given as numbers here are
//! bytes (0-255), unlike `scene:` color values which are already 0-1.

use glam::{Vec3, Vec4};
use regex::Regex;
use std::fmt;
use tracing::debug;

const CREATION_KEYWORDS: &[&str] =
    &["create", "add", "make", "place", "spawn", "generate", "put", "instantiate", "build", "construct", "new"];

const INTENT_PRIMITIVES: &[&str] = &["cube", "sphere", "cylinder", "plane", "capsule", "quad"];

const SHAPE_WORDS: &[(&str, PrimitiveShape)] = &[
    ("cube", PrimitiveShape::Cube),
    ("box", PrimitiveShape::Cube),
    ("square", PrimitiveShape::Cube),
    ("sphere", PrimitiveShape::Sphere),
    ("ball", PrimitiveShape::Sphere),
    ("globe", PrimitiveShape::Sphere),
    ("cylinder", PrimitiveShape::Cylinder),
    ("tube", PrimitiveShape::Cylinder),
    ("pipe", PrimitiveShape::Cylinder),
    ("capsule", PrimitiveShape::Capsule),
    ("pill", PrimitiveShape::Capsule),
    ("plane", PrimitiveShape::Plane),
    ("floor", PrimitiveShape::Plane),
    ("ground", PrimitiveShape::Plane),
    ("quad", PrimitiveShape::Quad),
    ("panel", PrimitiveShape::Quad),
];

const NAMED_COLORS: &[(&str, Vec4)] = &[
    ("red", Vec4::new(1.0, 0.0, 0.0, 1.0)),
    ("green", Vec4::new(0.0, 1.0, 0.0, 1.0)),
    ("blue", Vec4::new(0.0, 0.0, 1.0, 1.0)),
    ("yellow", Vec4::new(1.0, 0.92, 0.016, 1.0)),
    ("cyan", Vec4::new(0.0, 1.0, 1.0, 1.0)),
    ("magenta", Vec4::new(1.0, 0.0, 1.0, 1.0)),
    ("white", Vec4::ONE),
    ("black", Vec4::new(0.0, 0.0, 0.0, 1.0)),
    ("grey", Vec4::new(0.5, 0.5, 0.5, 1.0)),
    ("gray", Vec4::new(0.5, 0.5, 0.5, 1.0)),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveShape {
    Cube,
    Sphere,
    Cylinder,
    Capsule,
    Plane,
    Quad,
}

impl PrimitiveShape {
    pub fn name(self) -> &'static str {
        match self {
            PrimitiveShape::Cube => "Cube",
            PrimitiveShape::Sphere => "Sphere",
            PrimitiveShape::Cylinder => "Cylinder",
            PrimitiveShape::Capsule => "Capsule",
            PrimitiveShape::Plane => "Plane",
            PrimitiveShape::Quad => "Quad",
        }
    }

    /// Collider the engine gives a freshly created primitive.
    pub fn collider(self) -> &'static str {
        match self {
            PrimitiveShape::Cube => "BoxCollider",
            PrimitiveShape::Sphere => "SphereCollider",
            PrimitiveShape::Cylinder | PrimitiveShape::Capsule => "CapsuleCollider",
            PrimitiveShape::Plane | PrimitiveShape::Quad => "MeshCollider",
        }
    }

    pub fn mesh_asset(self) -> String {
        format!("builtin:{}", self.name())
    }
}

impl fmt::Display for PrimitiveShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where the request wants the object. `Axes` fills in only the named axes
/// and leaves the rest at the default spawn point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Placement {
    Default,
    Exact(Vec3),
    Axes { x: Option<f32>, y: Option<f32>, z: Option<f32> },
}

impl Placement {
    pub fn resolve(self, default: Vec3) -> Vec3 {
        match self {
            Placement::Default => default,
            Placement::Exact(position) => position,
            Placement::Axes { x, y, z } => {
                Vec3::new(x.unwrap_or(default.x), y.unwrap_or(default.y), z.unwrap_or(default.z))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrimitiveRequest {
    pub shape: PrimitiveShape,
    pub placement: Placement,
    pub scale: Vec3,
    pub color: Vec4,
    pub name: String,
}

pub struct CreationIntentParser {
    keywords: Vec<(&'static str, Regex)>,
    position: Regex,
    axis: Regex,
    scale: Regex,
    uniform_scale: Regex,
    rgb: Regex,
    name: Regex,
}

impl CreationIntentParser {
    pub fn new() -> Result<Self, regex::Error> {
        let keywords = CREATION_KEYWORDS
            .iter()
            .map(|keyword| -> Result<(&'static str, Regex), regex::Error> {
                Ok((*keyword, Regex::new(&format!(r"\b{}\b", regex::escape(keyword)))?))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            keywords,
            position: Regex::new(r"(at|position|pos)\s*\(?(-?\d+\.?\d*)\s*,?\s*(-?\d+\.?\d*)\s*,?\s*(-?\d+\.?\d*)\)?")?,
            axis: Regex::new(r"(x|y|z)\s*=?\s*(-?\d+\.?\d*)")?,
            scale: Regex::new(r"(scale|size)\s*\(?(-?\d+\.?\d*)\s*,?\s*(-?\d+\.?\d*)\s*,?\s*(-?\d+\.?\d*)\)?")?,
            uniform_scale: Regex::new(r"(scale|size)\s*(-?\d+\.?\d*)")?,
            rgb: Regex::new(r"color\s*\(?(\d+\.?\d*)\s*,?\s*(\d+\.?\d*)\s*,?\s*(\d+\.?\d*)\)?")?,
            name: Regex::new(r#"(name|call|called|named)\s+(it|the)?\s*"?([a-zA-Z0-9_\s]+)"?"#)?,
        })
    }

    /// A creation verb plus either a primitive word or "<verb> a/an/object".
    pub fn has_creation_intent(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        self.keywords.iter().filter(|(_, pattern)| pattern.is_match(&query)).any(|(keyword, _)| {
            INTENT_PRIMITIVES.iter().any(|primitive| query.contains(*primitive))
                || query.contains(&format!("{keyword} object"))
                || query.contains(&format!("{keyword} a"))
        })
    }

    /// `None` when no shape word is present.
    pub fn parse(&self, query: &str) -> Option<PrimitiveRequest> {
        let query = query.trim().to_lowercase();
        let Some(shape) = SHAPE_WORDS.iter().find(|(word, _)| query.contains(*word)).map(|(_, shape)| *shape) else {
            debug!(target: "copilot::intent", query = %query, "no primitive shape named");
            return None;
        };
        Some(PrimitiveRequest {
            shape,
            placement: self.placement(&query),
            scale: self.scale(&query),
            color: self.color(&query),
            name: self.name(&query).unwrap_or_else(|| shape.name().to_string()),
        })
    }

    fn placement(&self, query: &str) -> Placement {
        if let Some(position) = self.position.captures(query).and_then(|caps| triple(&caps, 2)) {
            return Placement::Exact(position);
        }
        let mut axes = [None; 3];
        let mut found = false;
        for caps in self.axis.captures_iter(query) {
            let Some(value) = caps.get(2).and_then(|m| m.as_str().parse::<f32>().ok()) else {
                continue;
            };
            let slot = match caps.get(1).map(|m| m.as_str()) {
                Some("x") => 0,
                Some("y") => 1,
                _ => 2,
            };
            axes[slot] = Some(value);
            found = true;
        }
        if found {
            Placement::Axes { x: axes[0], y: axes[1], z: axes[2] }
        } else {
            Placement::Default
        }
    }

    fn scale(&self, query: &str) -> Vec3 {
        if let Some(scale) = self.scale.captures(query).and_then(|caps| triple(&caps, 2)) {
            return scale;
        }
        self.uniform_scale
            .captures(query)
            .and_then(|caps| caps.get(2)?.as_str().parse::<f32>().ok())
            .map(Vec3::splat)
            .unwrap_or(Vec3::ONE)
    }

    /// Named colors win over numbers; numbers are bytes.
    fn color(&self, query: &str) -> Vec4 {
        if let Some((_, color)) = NAMED_COLORS.iter().find(|(word, _)| query.contains(*word)) {
            return *color;
        }
        self.rgb
            .captures(query)
            .and_then(|caps| triple(&caps, 1))
            .map(|rgb| (rgb / 255.0).clamp(Vec3::ZERO, Vec3::ONE).extend(1.0))
            .unwrap_or(Vec4::ONE)
    }

    fn name(&self, query: &str) -> Option<String> {
        let name = self.name.captures(query)?.get(3)?.as_str().trim();
        (!name.is_empty()).then(|| name.to_string())
    }
}

fn triple(caps: &regex::Captures<'_>, first: usize) -> Option<Vec3> {
    let component = |i: usize| caps.get(first + i)?.as_str().parse::<f32>().ok();
    Some(Vec3::new(component(0)?, component(1)?, component(2)?))
}
