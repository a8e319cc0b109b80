use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use image::AnimationDecoder;
use image::codecs::gif::GifDecoder;
use markerview_common::{ElementLayout, ElementSize, VideoFrame};

use crate::{CaptureError, OnReady, SourceState, VideoSource};

fn decode_error(path: &Path, source: image::ImageError) -> CaptureError {
    CaptureError::Decode {
        path: path.to_path_buf(),
        source,
    }
}

fn load_still(path: &Path) -> Result<VideoFrame, CaptureError> {
    let img = image::open(path).map_err(|e| decode_error(path, e))?.to_rgba8();
    let (width, height) = img.dimensions();
    Ok(VideoFrame::new(width, height, img.into_raw(), 0))
}

fn load_gif(path: &Path) -> Result<Vec<(VideoFrame, Duration)>, CaptureError> {
    let file = File::open(path).map_err(|e| decode_error(path, image::ImageError::IoError(e)))?;
    let decoder = GifDecoder::new(BufReader::new(file)).map_err(|e| decode_error(path, e))?;
    let frames = decoder
        .into_frames()
        .collect_frames()
        .map_err(|e| decode_error(path, e))?;

    Ok(frames
        .into_iter()
        .enumerate()
        .map(|(i, frame)| {
            let (numer, denom) = frame.delay().numer_denom_ms();
            let delay = Duration::from_secs_f64(numer as f64 / denom.max(1) as f64 / 1000.0);
            let buffer = frame.into_buffer();
            let (width, height) = buffer.dimensions();
            (VideoFrame::new(width, height, buffer.into_raw(), i as u64), delay)
        })
        .collect())
}

pub(crate) fn is_gif(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("gif"))
}

/// A single still image shown as a frozen video.
#[derive(Debug)]
pub struct ImageSource {
    path: PathBuf,
    frame: Option<VideoFrame>,
    layout: ElementLayout,
    initialized: bool,
}

impl ImageSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            frame: None,
            layout: ElementLayout::fixed(ElementSize::new(0, 0)),
            initialized: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl VideoSource for ImageSource {
    fn kind(&self) -> &'static str {
        "image"
    }

    fn state(&self) -> SourceState {
        if self.frame.is_some() {
            SourceState::Ready
        } else {
            SourceState::NotReady
        }
    }

    fn init(&mut self, on_ready: OnReady) -> Result<(), CaptureError> {
        if self.initialized {
            return Err(CaptureError::AlreadyInitialized);
        }
        self.initialized = true;

        match load_still(&self.path) {
            Ok(frame) => {
                let size = frame.size();
                tracing::info!(path = %self.path.display(), %size, "image source ready");
                self.layout = ElementLayout::fixed(size);
                self.frame = Some(frame);
                on_ready(Ok(size));
            }
            Err(e) => on_ready(Err(e)),
        }
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

    fn current_frame(&self) -> Option<&VideoFrame> {
        self.frame.as_ref()
    }
}

/// An animated image file (GIF) played as a looping video, paced by the
/// per-frame delays stored in the file. Non-GIF files load as one frame.
#[derive(Debug)]
pub struct AnimatedImageSource {
    path: PathBuf,
    frames: Vec<(VideoFrame, Duration)>,
    current: usize,
    started: Option<Instant>,
    layout: ElementLayout,
    initialized: bool,
}

impl AnimatedImageSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            frames: Vec::new(),
            current: 0,
            started: None,
            layout: ElementLayout::fixed(ElementSize::new(0, 0)),
            initialized: false,
        }
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Index of the frame shown `elapsed` after playback started.
    fn index_at(&self, elapsed: Duration) -> usize {
        let total: Duration = self.frames.iter().map(|(_, d)| *d).sum();
        if total.is_zero() {
            return 0;
        }
        let mut t = Duration::from_nanos((elapsed.as_nanos() % total.as_nanos()) as u64);
        for (i, (_, delay)) in self.frames.iter().enumerate() {
            if t < *delay {
                return i;
            }
            t -= *delay;
        }
        self.frames.len() - 1
    }

    fn load(&self) -> Result<Vec<(VideoFrame, Duration)>, CaptureError> {
        let frames = if is_gif(&self.path) {
            load_gif(&self.path)?
        } else {
            vec![(load_still(&self.path)?, Duration::ZERO)]
        };
        if frames.is_empty() {
            return Err(CaptureError::NoFrames(self.path.clone()));
        }
        Ok(frames)
    }
}

impl VideoSource for AnimatedImageSource {
    fn kind(&self) -> &'static str {
        "video"
    }

    fn state(&self) -> SourceState {
        if self.frames.is_empty() {
            SourceState::NotReady
        } else {
            SourceState::Ready
        }
    }

    fn init(&mut self, on_ready: OnReady) -> Result<(), CaptureError> {
        if self.initialized {
            return Err(CaptureError::AlreadyInitialized);
        }
        self.initialized = true;

        match self.load() {
            Ok(frames) => {
                let size = frames[0].0.size();
                tracing::info!(
                    path = %self.path.display(),
                    %size,
                    frames = frames.len(),
                    "video source ready"
                );
                self.frames = frames;
                self.layout = ElementLayout::fixed(size);
                self.started = Some(Instant::now());
                on_ready(Ok(size));
            }
            Err(e) => on_ready(Err(e)),
        }
        Ok(())
    }

    fn native_size(&self) -> Option<ElementSize> {
        self.frames.first().map(|(f, _)| f.size())
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
        if let Some(started) = self.started {
            self.current = self.index_at(started.elapsed());
        }
    }

    fn current_frame(&self) -> Option<&VideoFrame> {
        self.started?;
        self.frames.get(self.current).map(|(f, _)| f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn capture_ready() -> (OnReady, Arc<Mutex<Option<Result<ElementSize, String>>>>) {
        let slot = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&slot);
        let cb: OnReady = Box::new(move |r| {
            *sink.lock().unwrap() = Some(r.map_err(|e| e.to_string()));
        });
        (cb, slot)
    }

    #[test]
    fn image_source_loads_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("img.png");
        image::RgbaImage::from_pixel(8, 6, image::Rgba([10, 20, 30, 255]))
            .save(&path)
            .unwrap();

        let mut source = ImageSource::new(&path);
        assert!(source.current_frame().is_none());
        let (cb, slot) = capture_ready();
        source.init(cb).unwrap();

        assert_eq!(*slot.lock().unwrap(), Some(Ok(ElementSize::new(8, 6))));
        assert!(source.is_ready());
        let frame = source.current_frame().unwrap();
        assert_eq!(&frame.rgba[..4], &[10, 20, 30, 255]);
    }

    #[test]
    fn missing_image_reports_failure_through_callback() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = ImageSource::new(dir.path().join("nope.png"));
        let (cb, slot) = capture_ready();
        source.init(cb).unwrap();
        assert!(matches!(*slot.lock().unwrap(), Some(Err(_))));
        assert!(!source.is_ready());
    }

    #[test]
    fn init_twice_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = ImageSource::new(dir.path().join("nope.png"));
        source.init(Box::new(|_| {})).unwrap();
        assert!(matches!(
            source.init(Box::new(|_| {})),
            Err(CaptureError::AlreadyInitialized)
        ));
    }

    #[test]
    fn resize_covers_viewport() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("img.png");
        image::RgbaImage::new(640, 480).save(&path).unwrap();
        let mut source = ImageSource::new(&path);
        source.init(Box::new(|_| {})).unwrap();
        source.on_resize_element(ElementSize::new(1600, 900));
        assert_eq!(source.layout().size, ElementSize::new(1600, 1200));
    }

    #[test]
    fn animated_source_falls_back_to_still() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");
        image::RgbaImage::new(4, 4).save(&path).unwrap();
        let mut source = AnimatedImageSource::new(&path);
        source.init(Box::new(|_| {})).unwrap();
        assert_eq!(source.frame_count(), 1);
        assert_eq!(source.current_frame().map(|f| f.width), Some(4));
    }

    #[test]
    fn animated_index_follows_delays() {
        let mut source = AnimatedImageSource::new("unused.gif");
        source.frames = vec![
            (VideoFrame::solid(1, 1, [0, 0, 0, 255], 0), Duration::from_millis(100)),
            (VideoFrame::solid(1, 1, [1, 1, 1, 255], 1), Duration::from_millis(50)),
        ];
        assert_eq!(source.index_at(Duration::from_millis(0)), 0);
        assert_eq!(source.index_at(Duration::from_millis(99)), 0);
        assert_eq!(source.index_at(Duration::from_millis(120)), 1);
        // Loops after 150 ms.
        assert_eq!(source.index_at(Duration::from_millis(160)), 0);
    }

    #[test]
    fn animated_frame_changes_only_on_poll() {
        let mut source = AnimatedImageSource::new("unused.gif");
        source.frames = vec![
            (VideoFrame::solid(1, 1, [0, 0, 0, 255], 0), Duration::from_millis(10)),
            (VideoFrame::solid(1, 1, [1, 1, 1, 255], 1), Duration::from_secs(10)),
        ];
        source.started = Some(Instant::now() - Duration::from_millis(15));
        assert_eq!(source.current_frame().map(|f| f.index), Some(0));
        source.poll();
        assert_eq!(source.current_frame().map(|f| f.index), Some(1));
    }
}
