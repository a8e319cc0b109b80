use std::fmt::Write as _;

use markerview_common::{ElementSize, SizedElement, VideoFrame};
use markerview_scene::Scene;

use crate::{RenderError, RendererConfig};

/// Renderer-agnostic interface. All renderers implement this trait.
///
/// A renderer owns its output surface, whose size is set through
/// [`SizedElement`]. It draws the optional video background first, then the
/// scene on top if the scene root is visible.
pub trait Renderer: SizedElement {
    fn name(&self) -> &'static str;

    fn config(&self) -> &RendererConfig;

    /// Draw one frame.
    fn render(&mut self, scene: &Scene, background: Option<&VideoFrame>) -> Result<(), RenderError>;
}

/// Text renderer for headless runs.
///
/// Each frame is rendered to a human-readable description of what a GPU
/// renderer would draw. Useful for CLI output, logging, and tests.
#[derive(Debug)]
pub struct DebugTextRenderer {
    config: RendererConfig,
    size: ElementSize,
    frames: u64,
    drawn: u64,
    output: String,
}

impl Default for DebugTextRenderer {
    fn default() -> Self {
        Self::new(RendererConfig::default())
    }
}

impl DebugTextRenderer {
    pub fn new(config: RendererConfig) -> Self {
        Self {
            size: config.size(),
            config,
            frames: 0,
            drawn: 0,
            output: String::new(),
        }
    }

    /// Frames rendered so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Frames in which the scene was visible and drawn.
    pub fn frames_with_scene(&self) -> u64 {
        self.drawn
    }

    /// Text of the last frame.
    pub fn output(&self) -> &str {
        &self.output
    }
}

impl SizedElement for DebugTextRenderer {
    fn element_size(&self) -> ElementSize {
        self.size
    }

    fn set_element_size(&mut self, size: ElementSize) {
        self.size = size;
    }
}

impl Renderer for DebugTextRenderer {
    fn name(&self) -> &'static str {
        "debug-text"
    }

    fn config(&self) -> &RendererConfig {
        &self.config
    }

    fn render(&mut self, scene: &Scene, background: Option<&VideoFrame>) -> Result<(), RenderError> {
        self.frames += 1;
        let mut out = String::new();
        let _ = writeln!(out, "=== frame {} ({}) ===", self.frames, self.size);
        match background {
            Some(frame) => {
                let _ = writeln!(out, "background: #{} {}", frame.index, frame.size());
            }
            None => out.push_str("background: none\n"),
        }

        if scene.visible {
            self.drawn += 1;
            let eye = scene.camera.matrix.w_axis;
            let _ = writeln!(out, "camera: eye=({:.2}, {:.2}, {:.2})", eye.x, eye.y, eye.z);
            for node in scene.nodes() {
                let t = &node.transform;
                let _ = writeln!(
                    out,
                    "  {} [{}] pos=({:.2}, {:.2}, {:.2}) rot.x={:.3} alpha={:.2}",
                    node.name,
                    node.geometry.kind(),
                    t.position.x,
                    t.position.y,
                    t.position.z,
                    t.rotation.x,
                    node.material.alpha()
                );
            }
        } else {
            out.push_str("scene: hidden\n");
        }

        self.output = out;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use markerview_scene::MarkerScene;

    #[test]
    fn hidden_scene_draws_only_background() {
        let demo = MarkerScene::build();
        let mut renderer = DebugTextRenderer::default();
        let frame = VideoFrame::solid(2, 2, [255, 0, 0, 255], 3);
        renderer.render(&demo.scene, Some(&frame)).unwrap();

        assert!(renderer.output().contains("background: #3 2x2"));
        assert!(renderer.output().contains("scene: hidden"));
        assert_eq!(renderer.frames(), 1);
        assert_eq!(renderer.frames_with_scene(), 0);
    }

    #[test]
    fn visible_scene_lists_nodes() {
        let mut demo = MarkerScene::build();
        demo.scene.visible = true;
        let mut renderer = DebugTextRenderer::default();
        renderer.render(&demo.scene, None).unwrap();

        let out = renderer.output();
        assert!(out.contains("background: none"));
        assert!(out.contains("[box]"));
        assert!(out.contains("[torus_knot]"));
        assert!(out.contains("alpha=0.50"));
        assert_eq!(renderer.frames_with_scene(), 1);
    }

    #[test]
    fn surface_resizes() {
        let mut renderer = DebugTextRenderer::default();
        assert_eq!(renderer.element_size(), ElementSize::new(640, 480));
        renderer.set_element_size(ElementSize::new(800, 600));
        renderer.render(&markerview_scene::Scene::new(), None).unwrap();
        assert!(renderer.output().contains("(800x600)"));
    }
}
