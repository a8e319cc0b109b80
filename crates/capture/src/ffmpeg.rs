use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use ffmpeg_next as ffmpeg;
use ffmpeg_next::{format, media, software::scaling};
use markerview_common::{ElementLayout, ElementSize, VideoFrame};

use crate::{CaptureError, OnReady, SourceState, VideoSource};

/// Platform input-device format FFmpeg uses for cameras.
fn device_format_name() -> &'static str {
    if cfg!(target_os = "linux") {
        "v4l2"
    } else if cfg!(target_os = "macos") {
        "avfoundation"
    } else {
        "dshow"
    }
}

fn default_device() -> &'static str {
    if cfg!(target_os = "linux") {
        "/dev/video0"
    } else if cfg!(target_os = "macos") {
        "0"
    } else {
        "video=Integrated Camera"
    }
}

fn ffmpeg_error(context: &str, e: ffmpeg::Error) -> CaptureError {
    CaptureError::Device(format!("{context}: {e}"))
}

fn init_ffmpeg() -> Result<(), CaptureError> {
    ffmpeg::init().map_err(|e| ffmpeg_error("failed to initialise FFmpeg", e))
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Origin {
    Device { device: String, requested: ElementSize },
    /// Media file, looped and paced by its timestamps.
    File(PathBuf),
}

impl Origin {
    fn open(&self) -> Result<format::context::Input, CaptureError> {
        init_ffmpeg()?;
        match self {
            Self::Device { device, requested } => open_device(device, *requested),
            Self::File(path) => format::input(path)
                .map_err(|e| ffmpeg_error(&format!("could not open {}", path.display()), e)),
        }
    }
}

fn open_device(device: &str, requested: ElementSize) -> Result<format::context::Input, CaptureError> {
    ffmpeg::device::register_all();

    let name = device_format_name();
    let input_format = ffmpeg::device::input::video()
        .find(|f| f.name() == name)
        .ok_or_else(|| CaptureError::Device(format!("input device format {name} not available")))?;

    let mut options = ffmpeg::Dictionary::new();
    options.set("video_size", &format!("{}x{}", requested.width, requested.height));

    let context = format::open_with(&device, &input_format, options)
        .map_err(|e| ffmpeg_error(&format!("could not open {device}"), e))?;
    if !context.is_input() {
        return Err(CaptureError::Device(format!("{device} is not an input device")));
    }
    Ok(context.input())
}

#[derive(Default)]
struct Shared {
    latest: Mutex<Option<VideoFrame>>,
    ready: AtomicBool,
    stop: AtomicBool,
}

/// Sleeps the decode thread until a frame's presentation time.
struct Pacer {
    time_base: f64,
    start: Instant,
    first_pts: Option<i64>,
}

impl Pacer {
    fn new(time_base: f64) -> Self {
        Self {
            time_base,
            start: Instant::now(),
            first_pts: None,
        }
    }

    fn wait(&mut self, pts: Option<i64>, stop: &AtomicBool) {
        let Some(pts) = pts else {
            return;
        };
        let first = *self.first_pts.get_or_insert(pts);
        let due = Duration::from_secs_f64(((pts - first) as f64 * self.time_base).max(0.0));
        while !stop.load(Ordering::Relaxed) {
            let elapsed = self.start.elapsed();
            if elapsed >= due {
                break;
            }
            std::thread::sleep((due - elapsed).min(Duration::from_millis(50)));
        }
    }

    fn restart(&mut self) {
        self.start = Instant::now();
        self.first_pts = None;
    }
}

/// Video decoder plus RGBA conversion for one stream.
struct Decoder {
    decoder: ffmpeg::decoder::Video,
    to_rgba: scaling::Context,
    width: u32,
    height: u32,
    decoded: ffmpeg::frame::Video,
    rgba: ffmpeg::frame::Video,
    index: u64,
}

impl Decoder {
    fn open(parameters: ffmpeg::codec::Parameters) -> Result<Self, CaptureError> {
        let decoder = ffmpeg::codec::context::Context::from_parameters(parameters)
            .and_then(|ctx| ctx.decoder().video())
            .map_err(|e| ffmpeg_error("failed to open video decoder", e))?;
        let (width, height) = (decoder.width(), decoder.height());
        let to_rgba = scaling::Context::get(
            decoder.format(),
            width,
            height,
            format::Pixel::RGBA,
            width,
            height,
            scaling::Flags::BILINEAR,
        )
        .map_err(|e| ffmpeg_error("failed to create RGBA scaler", e))?;
        Ok(Self {
            decoder,
            to_rgba,
            width,
            height,
            decoded: ffmpeg::frame::Video::empty(),
            rgba: ffmpeg::frame::Video::empty(),
            index: 0,
        })
    }

    /// Publish every frame the decoder has ready.
    fn drain(&mut self, shared: &Shared, on_ready: &mut Option<OnReady>, mut pacer: Option<&mut Pacer>) {
        while self.decoder.receive_frame(&mut self.decoded).is_ok() {
            if let Some(pacer) = pacer.as_deref_mut() {
                pacer.wait(self.decoded.timestamp().or(self.decoded.pts()), &shared.stop);
            }
            if self.to_rgba.run(&self.decoded, &mut self.rgba).is_err() {
                continue;
            }
            // Compact rows: the scaler output may carry stride padding.
            let stride = self.rgba.stride(0);
            let raw = self.rgba.data(0);
            let row_bytes = self.width as usize * 4;
            let mut data = Vec::with_capacity(row_bytes * self.height as usize);
            for row in 0..self.height as usize {
                let start = row * stride;
                data.extend_from_slice(&raw[start..start + row_bytes]);
            }

            if let Ok(mut latest) = shared.latest.lock() {
                *latest = Some(VideoFrame::new(self.width, self.height, data, self.index));
            }
            self.index += 1;

            if !shared.ready.swap(true, Ordering::AcqRel) {
                tracing::info!(width = self.width, height = self.height, "ffmpeg source ready");
                if let Some(cb) = on_ready.take() {
                    cb(Ok(ElementSize::new(self.width, self.height)));
                }
            }
        }
    }
}

fn fail(on_ready: &mut Option<OnReady>, e: CaptureError) {
    tracing::error!("ffmpeg capture stopped: {e}");
    if let Some(cb) = on_ready.take() {
        cb(Err(e));
    }
}

/// Decode until stopped. Files rewind at end of stream and play again.
fn capture_loop(mut input: format::context::Input, shared: Arc<Shared>, on_ready: OnReady, looping: bool) {
    let mut on_ready = Some(on_ready);

    let opened = input
        .streams()
        .best(media::Type::Video)
        .ok_or_else(|| CaptureError::Device("no video stream in input".into()))
        .and_then(|stream| {
            let time_base = f64::from(stream.time_base());
            Decoder::open(stream.parameters()).map(|d| (stream.index(), time_base, d))
        });
    let (stream_index, time_base, mut decoder) = match opened {
        Ok(opened) => opened,
        Err(e) => return fail(&mut on_ready, e),
    };
    let mut pacer = looping.then(|| Pacer::new(time_base));

    loop {
        let decoded_before = decoder.index;
        for (stream, packet) in input.packets() {
            if shared.stop.load(Ordering::Relaxed) {
                return;
            }
            if stream.index() != stream_index || decoder.decoder.send_packet(&packet).is_err() {
                continue;
            }
            decoder.drain(&shared, &mut on_ready, pacer.as_mut());
        }
        if decoder.decoder.send_eof().is_ok() {
            decoder.drain(&shared, &mut on_ready, pacer.as_mut());
        }

        if !looping || shared.stop.load(Ordering::Relaxed) {
            break;
        }
        if decoder.index == decoded_before {
            return fail(&mut on_ready, CaptureError::Device("stream produced no frames".into()));
        }
        if let Err(e) = input.seek(0, ..) {
            return fail(&mut on_ready, ffmpeg_error("failed to rewind", e));
        }
        decoder.decoder.flush();
        if let Some(pacer) = &mut pacer {
            pacer.restart();
        }
        tracing::debug!(frames = decoder.index, "video file rewound");
    }
    tracing::debug!(frames = decoder.index, "ffmpeg capture loop finished");
}

/// Camera or media file decoded by FFmpeg on a worker thread. The UI thread
/// only ever sees the most recent frame.
pub struct FfmpegSource {
    origin: Origin,
    shared: Arc<Shared>,
    frame: Option<VideoFrame>,
    layout: ElementLayout,
    worker: Option<JoinHandle<()>>,
}

impl FfmpegSource {
    /// Live camera. An empty `device` picks the platform default.
    pub fn webcam(device: &str, requested: ElementSize) -> Self {
        let device = if device.is_empty() {
            default_device().to_string()
        } else {
            device.to_string()
        };
        Self::with_origin(
            Origin::Device { device, requested },
            ElementLayout::fixed(requested),
        )
    }

    /// Video file played in a loop at its native rate.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::with_origin(
            Origin::File(path.into()),
            ElementLayout::fixed(ElementSize::new(0, 0)),
        )
    }

    fn with_origin(origin: Origin, layout: ElementLayout) -> Self {
        Self {
            origin,
            shared: Arc::new(Shared::default()),
            frame: None,
            layout,
            worker: None,
        }
    }

    fn requested(&self) -> Option<ElementSize> {
        match &self.origin {
            Origin::Device { requested, .. } => Some(*requested),
            Origin::File(_) => None,
        }
    }
}

impl VideoSource for FfmpegSource {
    fn kind(&self) -> &'static str {
        match self.origin {
            Origin::Device { .. } => "webcam",
            Origin::File(_) => "video",
        }
    }

    fn state(&self) -> SourceState {
        if self.shared.ready.load(Ordering::Acquire) {
            SourceState::Ready
        } else {
            SourceState::NotReady
        }
    }

    fn init(&mut self, on_ready: OnReady) -> Result<(), CaptureError> {
        if self.worker.is_some() {
            return Err(CaptureError::AlreadyInitialized);
        }
        match &self.origin {
            Origin::Device { device, .. } => {
                tracing::info!(device = %device, format = device_format_name(), "opening webcam");
            }
            Origin::File(path) => tracing::info!(path = %path.display(), "opening video file"),
        }
        let input = self.origin.open()?;
        let looping = matches!(self.origin, Origin::File(_));
        let shared = Arc::clone(&self.shared);
        let worker = std::thread::Builder::new()
            .name(format!("markerview-{}", self.kind()))
            .spawn(move || capture_loop(input, shared, on_ready, looping))
            .map_err(|e| CaptureError::Device(format!("failed to spawn capture thread: {e}")))?;
        self.worker = Some(worker);
        Ok(())
    }

    fn native_size(&self) -> Option<ElementSize> {
        self.frame.as_ref().map(VideoFrame::size)
    }

    fn layout(&self) -> ElementLayout {
        self.layout
    }

    fn on_resize_element(&mut self, viewport: ElementSize) {
        if let Some(native) = self.native_size().or(self.requested()) {
            self.layout = ElementLayout::cover(native, viewport);
        }
    }

    fn poll(&mut self) {
        if let Ok(mut latest) = self.shared.latest.lock()
            && let Some(frame) = latest.take()
        {
            self.frame = Some(frame);
        }
    }

    fn current_frame(&self) -> Option<&VideoFrame> {
        self.frame.as_ref()
    }
}

impl Drop for FfmpegSource {
    fn drop(&mut self) {
        self.shared.stop.store(true, Ordering::Relaxed);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl std::fmt::Debug for FfmpegSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FfmpegSource")
            .field("origin", &self.origin)
            .field("ready", &self.shared.ready.load(Ordering::Relaxed))
            .finish()
    }
}
