use serde::{Deserialize, Serialize};

fn default_width() -> u32 {
    640
}

fn default_height() -> u32 {
    480
}

/// Which source to acquire, chosen by configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    /// Live camera (needs the `ffmpeg` feature). `device` is platform
    /// specific (`/dev/video0`, `0`, ...).
    Webcam {
        #[serde(default)]
        device: String,
        #[serde(default = "default_width")]
        width: u32,
        #[serde(default = "default_height")]
        height: u32,
    },
    /// Still image, relative to the resource base.
    Image { url: String },
    /// Video played in a loop. GIFs decode with the `image` crate; other
    /// formats need the `ffmpeg` feature.
    Video { url: String },
    /// Generated test pattern; needs no device or file.
    Synthetic {
        #[serde(default = "default_width")]
        width: u32,
        #[serde(default = "default_height")]
        height: u32,
    },
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self::Webcam {
            device: String::new(),
            width: default_width(),
            height: default_height(),
        }
    }
}

impl SourceConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Webcam { .. } => "webcam",
            Self::Image { .. } => "image",
            Self::Video { .. } => "video",
            Self::Synthetic { .. } => "synthetic",
        }
    }
}
