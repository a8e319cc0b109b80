use markerview_common::{NodeId, Transform};
use serde::{Deserialize, Serialize};

/// Procedural geometry description. Tessellation belongs to the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Geometry {
    Box {
        width: f32,
        height: f32,
        depth: f32,
    },
    TorusKnot {
        radius: f32,
        tube: f32,
        tubular_segments: u32,
        radial_segments: u32,
        p: u32,
        q: u32,
    },
}

impl Geometry {
    pub fn cube(size: f32) -> Self {
        Self::Box {
            width: size,
            height: size,
            depth: size,
        }
    }

    /// Torus knot with the common (2, 3) winding.
    pub fn torus_knot(radius: f32, tube: f32, tubular_segments: u32, radial_segments: u32) -> Self {
        Self::TorusKnot {
            radius,
            tube,
            tubular_segments,
            radial_segments,
            p: 2,
            q: 3,
        }
    }

    /// Extent along Y, used to rest a shape on the marker plane.
    pub fn height(&self) -> f32 {
        match *self {
            Self::Box { height, .. } => height,
            Self::TorusKnot { radius, tube, .. } => 2.0 * (radius + tube),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Box { .. } => "box",
            Self::TorusKnot { .. } => "torus_knot",
        }
    }
}

/// Which faces are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Side {
    #[default]
    Front,
    Back,
    Double,
}

/// Material that colours surfaces by their normal direction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalMaterial {
    pub transparent: bool,
    pub opacity: f32,
    pub side: Side,
}

impl Default for NormalMaterial {
    fn default() -> Self {
        Self {
            transparent: false,
            opacity: 1.0,
            side: Side::Front,
        }
    }
}

impl NormalMaterial {
    /// Effective alpha: opacity only applies to transparent materials.
    pub fn alpha(&self) -> f32 {
        if self.transparent {
            self.opacity.clamp(0.0, 1.0)
        } else {
            1.0
        }
    }
}

/// A drawable node: geometry + material + local transform.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshNode {
    pub id: NodeId,
    pub name: String,
    pub geometry: Geometry,
    pub material: NormalMaterial,
    pub transform: Transform,
}

impl MeshNode {
    pub fn new(name: impl Into<String>, geometry: Geometry, material: NormalMaterial) -> Self {
        Self {
            id: NodeId::new(),
            name: name.into(),
            geometry,
            material,
            transform: Transform::default(),
        }
    }
}
