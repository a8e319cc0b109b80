use markerview_common::NodeId;

use crate::{MeshNode, SceneCamera};

/// Root of the scene: one camera and a flat list of mesh nodes.
#[derive(Debug, Clone)]
pub struct Scene {
    /// Root visibility. When false nothing is drawn.
    pub visible: bool,
    pub camera: SceneCamera,
    nodes: Vec<MeshNode>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    pub fn new() -> Self {
        Self {
            visible: true,
            camera: SceneCamera::default(),
            nodes: Vec::new(),
        }
    }

    /// Add a node under the root. Returns its id.
    pub fn add(&mut self, node: MeshNode) -> NodeId {
        let id = node.id;
        tracing::debug!(name = %node.name, geometry = node.geometry.kind(), "scene node added");
        self.nodes.push(node);
        id
    }

    pub fn get(&self, id: NodeId) -> Option<&MeshNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut MeshNode> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> &[MeshNode] {
        &self.nodes
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Copy the camera's marker-visibility flag onto the root.
    pub fn sync_visibility(&mut self) {
        self.visible = self.camera.visible;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Geometry, NormalMaterial};

    #[test]
    fn scene_starts_empty_and_visible() {
        let scene = Scene::new();
        assert!(scene.visible);
        assert_eq!(scene.node_count(), 0);
    }

    #[test]
    fn nodes_keep_insertion_order() {
        let mut scene = Scene::new();
        let a = scene.add(MeshNode::new("a", Geometry::cube(1.0), NormalMaterial::default()));
        let b = scene.add(MeshNode::new("b", Geometry::cube(2.0), NormalMaterial::default()));
        let ids: Vec<_> = scene.nodes().iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![a, b]);
        assert_eq!(scene.get(b).map(|n| n.name.as_str()), Some("b"));
    }

    #[test]
    fn visibility_follows_camera() {
        let mut scene = Scene::new();
        scene.camera.visible = false;
        scene.sync_visibility();
        assert!(!scene.visible);
        scene.camera.visible = true;
        scene.sync_visibility();
        assert!(scene.visible);
    }
}
