use glam::{EulerRot, Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a node in the scene graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub Uuid);

impl NodeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

/// Spatial transform: position, Euler rotation (XYZ order, radians), scale.
///
/// Rotation is kept as Euler angles so per-axis spin can accumulate without
/// re-deriving angles from a quaternion every frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    pub fn quat(&self) -> Quat {
        Quat::from_euler(EulerRot::XYZ, self.rotation.x, self.rotation.y, self.rotation.z)
    }

    /// Local-to-parent matrix.
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.quat(), self.position)
    }
}

/// Width and height of an on-screen element, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementSize {
    pub width: u32,
    pub height: u32,
}

impl ElementSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl std::fmt::Display for ElementSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Placement of a source element inside the viewport.
///
/// Margins are negative when the element overflows the viewport and is
/// centred by cropping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementLayout {
    pub size: ElementSize,
    pub margin_left: i32,
    pub margin_top: i32,
}

impl ElementLayout {
    /// Layout that exactly matches `size` with no offset.
    pub fn fixed(size: ElementSize) -> Self {
        Self {
            size,
            margin_left: 0,
            margin_top: 0,
        }
    }

    /// Scale `native` to cover `viewport` while keeping its aspect ratio.
    ///
    /// The overflowing axis is centred with a negative margin.
    pub fn cover(native: ElementSize, viewport: ElementSize) -> Self {
        if native.is_empty() || viewport.is_empty() {
            return Self::fixed(viewport);
        }
        let source_aspect = native.width as f64 / native.height as f64;
        let screen_aspect = viewport.width as f64 / viewport.height as f64;

        if screen_aspect < source_aspect {
            let width = (source_aspect * viewport.height as f64).round() as u32;
            Self {
                size: ElementSize::new(width, viewport.height),
                margin_left: -((width as i32 - viewport.width as i32) / 2),
                margin_top: 0,
            }
        } else {
            let height = (viewport.width as f64 / source_aspect).round() as u32;
            Self {
                size: ElementSize::new(viewport.width, height),
                margin_left: 0,
                margin_top: -((height as i32 - viewport.height as i32) / 2),
            }
        }
    }
}

/// Anything whose on-screen size can be set from a source element:
/// the render surface, the detection canvas.
pub trait SizedElement {
    fn element_size(&self) -> ElementSize;
    fn set_element_size(&mut self, size: ElementSize);

    /// Take size and placement from another element's layout. Elements that
    /// have no notion of placement keep only the size.
    fn set_element_layout(&mut self, layout: ElementLayout) {
        self.set_element_size(layout.size);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_id_uniqueness() {
        assert_ne!(NodeId::new(), NodeId::new());
    }

    #[test]
    fn transform_default_is_identity() {
        let t = Transform::default();
        assert_eq!(t.matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn transform_matrix_applies_translation() {
        let t = Transform::from_position(Vec3::new(0.0, 0.5, 0.0));
        let p = t.matrix().transform_point3(Vec3::ZERO);
        assert_eq!(p, Vec3::new(0.0, 0.5, 0.0));
    }

    #[test]
    fn cover_wider_source_overflows_horizontally() {
        // 4:3 source in a tall 480x640 viewport
        let layout = ElementLayout::cover(ElementSize::new(640, 480), ElementSize::new(480, 640));
        assert_eq!(layout.size.height, 640);
        assert_eq!(layout.size.width, 853);
        assert!(layout.margin_left < 0);
        assert_eq!(layout.margin_top, 0);
    }

    #[test]
    fn cover_taller_source_overflows_vertically() {
        let layout = ElementLayout::cover(ElementSize::new(640, 480), ElementSize::new(1600, 900));
        assert_eq!(layout.size.width, 1600);
        assert_eq!(layout.size.height, 1200);
        assert_eq!(layout.margin_top, -150);
        assert_eq!(layout.margin_left, 0);
    }

    #[test]
    fn cover_same_aspect_is_exact() {
        let layout = ElementLayout::cover(ElementSize::new(640, 480), ElementSize::new(1280, 960));
        assert_eq!(layout, ElementLayout::fixed(ElementSize::new(1280, 960)));
    }

    #[test]
    fn cover_with_empty_native_falls_back_to_viewport() {
        let layout = ElementLayout::cover(ElementSize::new(0, 0), ElementSize::new(800, 600));
        assert_eq!(layout.size, ElementSize::new(800, 600));
    }
}
