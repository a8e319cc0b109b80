use std::f32::consts::PI;

use glam::Vec3;
use markerview_common::{NodeId, Transform};

use crate::{Geometry, MeshNode, NormalMaterial, Scene, Side};

/// The overlay shown on the marker: a half-transparent spinning cube and a
/// torus knot, both resting on the marker plane.
#[derive(Debug, Clone)]
pub struct MarkerScene {
    pub scene: Scene,
    pub cube: NodeId,
    pub knot: NodeId,
}

impl Default for MarkerScene {
    fn default() -> Self {
        Self::build()
    }
}

impl MarkerScene {
    /// Angular speed of the cube about X, radians per second.
    pub const SPIN_RATE: f32 = PI;

    pub fn build() -> Self {
        let mut scene = Scene::new();

        let cube_geometry = Geometry::cube(1.0);
        let mut cube = MeshNode::new(
            "cube",
            cube_geometry,
            NormalMaterial {
                transparent: true,
                opacity: 0.5,
                side: Side::Double,
            },
        );
        cube.transform = Transform::from_position(Vec3::new(0.0, cube_geometry.height() / 2.0, 0.0));
        let cube = scene.add(cube);

        let mut knot = MeshNode::new(
            "torus_knot",
            Geometry::torus_knot(0.3, 0.1, 64, 16),
            NormalMaterial::default(),
        );
        knot.transform = Transform::from_position(Vec3::new(0.0, 0.5, 0.0));
        let knot = scene.add(knot);

        // The camera is driven by the marker; until it is seen, show nothing.
        scene.visible = false;
        scene.camera.visible = false;

        Self { scene, cube, knot }
    }

    /// Advance the cube's rotation by one frame.
    pub fn spin(&mut self, delta: f64) {
        if let Some(cube) = self.scene.get_mut(self.cube) {
            cube.transform.rotation.x += Self::SPIN_RATE * delta as f32;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_two_nodes_invisible() {
        let demo = MarkerScene::build();
        assert_eq!(demo.scene.node_count(), 2);
        assert!(!demo.scene.visible);
        assert!(!demo.scene.camera.visible);
    }

    #[test]
    fn cube_rests_on_marker() {
        let demo = MarkerScene::build();
        let cube = demo.scene.get(demo.cube).unwrap();
        assert_eq!(cube.transform.position.y, 0.5);
        assert_eq!(cube.material.alpha(), 0.5);
        assert_eq!(cube.material.side, Side::Double);
    }

    #[test]
    fn knot_is_opaque() {
        let demo = MarkerScene::build();
        let knot = demo.scene.get(demo.knot).unwrap();
        assert_eq!(knot.material.alpha(), 1.0);
        assert_eq!(knot.transform.position.y, 0.5);
    }

    #[test]
    fn spin_accumulates_pi_per_second() {
        let mut demo = MarkerScene::build();
        for _ in 0..4 {
            demo.spin(0.25);
        }
        let x = demo.scene.get(demo.cube).unwrap().transform.rotation.x;
        assert!((x - PI).abs() < 1e-5);
        let knot = demo.scene.get(demo.knot).unwrap();
        assert_eq!(knot.transform.rotation, Vec3::ZERO);
    }
}
