use markerview_common::{ElementLayout, ElementSize, VideoFrame};

use crate::{CaptureError, OnReady, SourceState, VideoSource};

/// Generated gradient frames. Ready as soon as it is initialized; used for
/// headless runs and tests where no camera or media file exists.
#[derive(Debug)]
pub struct SyntheticSource {
    size: ElementSize,
    frame: Option<VideoFrame>,
    layout: ElementLayout,
}

impl SyntheticSource {
    pub fn new(size: ElementSize) -> Self {
        Self {
            size,
            frame: None,
            layout: ElementLayout::fixed(size),
        }
    }

    fn pattern(size: ElementSize) -> VideoFrame {
        let (w, h) = (size.width.max(1), size.height.max(1));
        let mut rgba = Vec::with_capacity(w as usize * h as usize * 4);
        for y in 0..h {
            for x in 0..w {
                rgba.extend_from_slice(&[
                    (x * 255 / w) as u8,
                    (y * 255 / h) as u8,
                    128,
                    255,
                ]);
            }
        }
        VideoFrame::new(w, h, rgba, 0)
    }
}

impl VideoSource for SyntheticSource {
    fn kind(&self) -> &'static str {
        "synthetic"
    }

    fn state(&self) -> SourceState {
        if self.frame.is_some() {
            SourceState::Ready
        } else {
            SourceState::NotReady
        }
    }

    fn init(&mut self, on_ready: OnReady) -> Result<(), CaptureError> {
        if self.frame.is_some() {
            return Err(CaptureError::AlreadyInitialized);
        }
        if self.size.is_empty() {
            on_ready(Err(CaptureError::Unsupported(format!(
                "synthetic source size {} is empty",
                self.size
            ))));
            return Ok(());
        }
        self.frame = Some(Self::pattern(self.size));
        tracing::info!(size = %self.size, "synthetic source ready");
        on_ready(Ok(self.size));
        Ok(())
    }

    fn native_size(&self) -> Option<ElementSize> {
        self.frame.as_ref().map(VideoFrame::size)
    }

    fn layout(&self) -> ElementLayout {
        self.layout
    }

    fn on_resize_element(&mut self, viewport: ElementSize) {
        if let Some(native) = self.native_size() {
            self.layout = ElementLayout::cover(native, viewport);
        }
    }

    fn poll(&mut self) {
        if let Some(frame) = &mut self.frame {
            frame.index += 1;
        }
    }

    fn current_frame(&self) -> Option<&VideoFrame> {
        self.frame.as_ref()
    }
}
