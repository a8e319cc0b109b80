use glam::Mat4;

/// Camera whose pose is written by marker tracking.
///
/// `matrix` is the camera's world transform; the view matrix is its inverse.
/// `visible` mirrors whether the tracked marker was seen on the last update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneCamera {
    pub projection: Mat4,
    pub matrix: Mat4,
    pub visible: bool,
}

impl Default for SceneCamera {
    fn default() -> Self {
        Self {
            projection: Mat4::IDENTITY,
            matrix: Mat4::IDENTITY,
            visible: true,
        }
    }
}

impl SceneCamera {
    pub fn view_matrix(&self) -> Mat4 {
        self.matrix.inverse()
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view_matrix()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn default_camera_is_identity() {
        let cam = SceneCamera::default();
        assert_eq!(cam.view_projection(), Mat4::IDENTITY);
    }

    #[test]
    fn view_matrix_inverts_pose() {
        let cam = SceneCamera {
            matrix: Mat4::from_translation(Vec3::new(0.0, 0.0, 5.0)),
            ..SceneCamera::default()
        };
        let p = cam.view_matrix().transform_point3(Vec3::ZERO);
        assert!((p - Vec3::new(0.0, 0.0, -5.0)).length() < 1e-6);
    }
}
