use markerview_common::ElementSize;
use serde::{Deserialize, Serialize};

/// CSS `lightgrey`, fully transparent so the video shows through.
pub const LIGHTGREY_TRANSPARENT: [f32; 4] = [211.0 / 255.0, 211.0 / 255.0, 211.0 / 255.0, 0.0];

/// Render surface options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    pub width: u32,
    pub height: u32,
    pub antialias: bool,
    /// Whether the surface carries an alpha channel over the background.
    pub alpha: bool,
    /// Linear RGBA clear colour.
    pub clear_color: [f32; 4],
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            antialias: true,
            alpha: true,
            clear_color: LIGHTGREY_TRANSPARENT,
        }
    }
}

impl RendererConfig {
    pub fn size(&self) -> ElementSize {
        ElementSize::new(self.width, self.height)
    }

    /// MSAA sample count implied by `antialias`.
    pub fn sample_count(&self) -> u32 {
        if self.antialias { 4 } else { 1 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = RendererConfig::default();
        assert_eq!(cfg.size(), ElementSize::new(640, 480));
        assert!(cfg.antialias && cfg.alpha);
        assert_eq!(cfg.clear_color[3], 0.0);
        assert_eq!(cfg.sample_count(), 4);
    }

    #[test]
    fn partial_yaml() {
        let cfg: RendererConfig = serde_yaml::from_str("width: 1280\nantialias: false\n").unwrap();
        assert_eq!(cfg.size(), ElementSize::new(1280, 480));
        assert_eq!(cfg.sample_count(), 1);
    }
}
