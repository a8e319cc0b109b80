//! Video sources.
//!
//! A source acquires frames from a webcam, a still image, or a video file,
//! and owns the on-screen layout of its element. Readiness is reported once
//! through a completion callback, which may run on another thread; the
//! source's own [`SourceState`] flips before the callback runs.
//!
//! Webcams and non-GIF video files are decoded by FFmpeg and need the
//! `ffmpeg` feature. Without it, opening either fails with
//! [`CaptureError::Unsupported`]; still images, GIF animations and the
//! synthetic pattern always work.
//!
//! # Invariants
//! - A source reports readiness at most once.
//! - `current_frame` returns `None` until the source is ready.
//! - The frame only changes on `poll`, so every reader in a tick sees the
//!   same one.
//! - Element layout always preserves the native aspect ratio.

mod config;
mod error;
#[cfg(feature = "ffmpeg")]
mod ffmpeg;
mod still;
mod synthetic;

pub use config::SourceConfig;
pub use error::CaptureError;
#[cfg(feature = "ffmpeg")]
pub use ffmpeg::FfmpegSource;
pub use still::{AnimatedImageSource, ImageSource};
pub use synthetic::SyntheticSource;

use std::path::PathBuf;

use markerview_common::{ElementLayout, ElementSize, ResourceBase, SizedElement, VideoFrame};

/// Readiness of a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceState {
    NotReady,
    Ready,
}

/// Completion callback handed to [`VideoSource::init`]. Receives the native
/// frame size, or the error that stopped acquisition.
pub type OnReady = Box<dyn FnOnce(Result<ElementSize, CaptureError>) + Send>;

/// A video capture source.
pub trait VideoSource {
    /// Short name of the source kind, for logs.
    fn kind(&self) -> &'static str;

    fn state(&self) -> SourceState;

    fn is_ready(&self) -> bool {
        self.state() == SourceState::Ready
    }

    /// Start acquisition. `on_ready` is invoked exactly once, possibly before
    /// this returns. Calling `init` twice is an error.
    fn init(&mut self, on_ready: OnReady) -> Result<(), CaptureError>;

    /// Native frame size, known once ready.
    fn native_size(&self) -> Option<ElementSize>;

    /// Current on-screen layout of the source element.
    fn layout(&self) -> ElementLayout;

    /// Recompute the element layout for a viewport of the given size.
    fn on_resize_element(&mut self, viewport: ElementSize);

    /// Advance to the newest available frame. Called once per tick, before
    /// anything reads [`current_frame`](Self::current_frame).
    fn poll(&mut self) {}

    /// Frame selected by the last `poll`, or `None` before readiness.
    fn current_frame(&self) -> Option<&VideoFrame>;

    /// Propagate this element's size and margins to another element.
    fn copy_element_size_to(&self, target: &mut dyn SizedElement) {
        target.set_element_layout(self.layout());
    }
}

/// Build the source described by `config`, resolving media paths against
/// `base`.
pub fn open_source(config: &SourceConfig, base: &ResourceBase) -> Result<Box<dyn VideoSource>, CaptureError> {
    tracing::info!(source = config.kind(), "opening video source");
    match config {
        SourceConfig::Webcam { device, width, height } => open_webcam(device, ElementSize::new(*width, *height)),
        SourceConfig::Image { url } => Ok(Box::new(ImageSource::new(base.resolve(url)))),
        SourceConfig::Video { url } => {
            let path = base.resolve(url);
            if still::is_gif(&path) {
                Ok(Box::new(AnimatedImageSource::new(path)))
            } else {
                open_video_file(path)
            }
        }
        SourceConfig::Synthetic { width, height } => {
            Ok(Box::new(SyntheticSource::new(ElementSize::new(*width, *height))))
        }
    }
}

#[cfg(feature = "ffmpeg")]
fn open_webcam(device: &str, size: ElementSize) -> Result<Box<dyn VideoSource>, CaptureError> {
    Ok(Box::new(FfmpegSource::webcam(device, size)))
}

#[cfg(not(feature = "ffmpeg"))]
fn open_webcam(_device: &str, _size: ElementSize) -> Result<Box<dyn VideoSource>, CaptureError> {
    Err(CaptureError::Unsupported(
        "webcam capture requires the `ffmpeg` feature; rebuild with `--features ffmpeg` \
         or use the synthetic source (`--synthetic`)"
            .into(),
    ))
}

#[cfg(feature = "ffmpeg")]
fn open_video_file(path: PathBuf) -> Result<Box<dyn VideoSource>, CaptureError> {
    Ok(Box::new(FfmpegSource::file(path)))
}

#[cfg(not(feature = "ffmpeg"))]
fn open_video_file(path: PathBuf) -> Result<Box<dyn VideoSource>, CaptureError> {
    Err(CaptureError::Unsupported(format!(
        "playing {} requires the `ffmpeg` feature; without it only GIF animations play as video",
        path.display()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_synthetic_source() {
        let config = SourceConfig::Synthetic {
            width: 320,
            height: 240,
        };
        let source = open_source(&config, &ResourceBase::default()).unwrap();
        assert_eq!(source.kind(), "synthetic");
        assert!(!source.is_ready());
    }

    #[cfg(not(feature = "ffmpeg"))]
    #[test]
    fn webcam_without_ffmpeg_is_unsupported() {
        let Err(CaptureError::Unsupported(message)) = open_source(&SourceConfig::default(), &ResourceBase::default())
        else {
            panic!("webcam should be unsupported without ffmpeg");
        };
        assert!(message.contains("--features ffmpeg"), "{message}");
        assert!(message.contains("--synthetic"), "{message}");
    }

    #[cfg(not(feature = "ffmpeg"))]
    #[test]
    fn mp4_without_ffmpeg_is_unsupported() {
        let config = SourceConfig::Video {
            url: "data/videos/headtracking.mp4".into(),
        };
        let Err(CaptureError::Unsupported(message)) = open_source(&config, &ResourceBase::new("/srv")) else {
            panic!("mp4 should be unsupported without ffmpeg");
        };
        assert!(message.contains("headtracking.mp4"), "{message}");
        assert!(message.contains("ffmpeg"), "{message}");
    }

    #[cfg(feature = "ffmpeg")]
    #[test]
    fn mp4_opens_through_ffmpeg() {
        let config = SourceConfig::Video {
            url: "data/videos/headtracking.mp4".into(),
        };
        let source = open_source(&config, &ResourceBase::new("/srv")).unwrap();
        assert_eq!(source.kind(), "video");
        assert!(!source.is_ready());
    }

    #[test]
    fn gif_video_stays_on_the_image_decoder() {
        let config = SourceConfig::Video {
            url: "data/videos/headtracking.GIF".into(),
        };
        let source = open_source(&config, &ResourceBase::new("/srv")).unwrap();
        assert_eq!(source.kind(), "video");
        assert!(source.current_frame().is_none());
    }

    #[test]
    fn image_source_paths_resolve_against_base() {
        let config = SourceConfig::Image {
            url: "data/images/img.jpg".into(),
        };
        let source = open_source(&config, &ResourceBase::new("/srv")).unwrap();
        assert_eq!(source.kind(), "image");
    }
}
