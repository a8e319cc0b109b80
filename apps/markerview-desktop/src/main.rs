use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context as _, Result};
use clap::Parser;
use markerview_capture::{SourceConfig, SourceState};
use markerview_common::ElementSize;
use markerview_render_wgpu::{FrameOverlay, OverlayContext, WgpuRenderer};
use markerview_runtime::{AppConfig, MarkerState, Session};
use markerview_track::ContextState;
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

#[derive(Parser)]
#[command(name = "markerview-desktop", about = "Marker overlay viewer")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Config file; defaults apply when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Replace the configured source with a synthetic test pattern.
    /// Builds without the `ffmpeg` feature need this unless the config
    /// names an image source, since the default source is the webcam.
    #[arg(long)]
    synthetic: bool,
}

/// Snapshot of the session shown in the HUD.
#[derive(Clone)]
struct HudStatus {
    fps: f64,
    frames: u64,
    viewport: ElementSize,
    source: SourceState,
    context: ContextState,
    markers: MarkerState,
    detected: usize,
    overlay_visible: bool,
    render_failures: u64,
    failure: Option<String>,
}

impl HudStatus {
    fn from_session(session: &Session<WgpuRenderer>) -> Self {
        let state = session.state();
        let sequencer = session.sequencer();
        Self {
            fps: session.frame_loop().stats().fps(),
            frames: session.frame_loop().frame_count(),
            viewport: session.viewport(),
            source: sequencer.source(),
            context: sequencer.context(),
            markers: sequencer.markers(),
            detected: state.detected,
            overlay_visible: state.demo.scene.visible,
            render_failures: state.render_failures,
            failure: sequencer
                .failure()
                .map(|(stage, message)| format!("{stage}: {message}")),
        }
    }

    fn show(&self, ctx: &egui::Context) {
        egui::Window::new("markerview")
            .default_pos([12.0, 12.0])
            .resizable(false)
            .show(ctx, |ui| {
                ui.label(format!("{:.1} fps, {} frames", self.fps, self.frames));
                ui.label(format!("viewport: {}", self.viewport));
                ui.separator();
                ui.label(format!("source: {:?}", self.source));
                ui.label(format!("context: {:?}", self.context));
                ui.label(format!("markers: {:?}", self.markers));
                ui.label(format!(
                    "detected: {} (overlay {})",
                    self.detected,
                    if self.overlay_visible { "shown" } else { "hidden" }
                ));
                if self.render_failures > 0 {
                    ui.label(format!("render failures: {}", self.render_failures));
                }
                if let Some(failure) = &self.failure {
                    ui.colored_label(egui::Color32::LIGHT_RED, failure);
                }
                ui.separator();
                ui.small("F1: Toggle HUD | Esc: Quit");
            });
    }
}

struct Hud {
    ctx: egui::Context,
    winit: egui_winit::State,
    renderer: egui_wgpu::Renderer,
    window: Arc<Window>,
    status: Option<HudStatus>,
    visible: bool,
}

/// Draws the HUD into the renderer's frame, after the scene.
struct HudOverlay(Rc<RefCell<Hud>>);

impl FrameOverlay for HudOverlay {
    fn draw(&mut self, ctx: OverlayContext<'_>) {
        let OverlayContext {
            device,
            queue,
            encoder,
            view,
            size,
        } = ctx;
        let mut guard = self.0.borrow_mut();
        let hud = &mut *guard;

        let raw_input = hud.winit.take_egui_input(&hud.window);
        let status = hud.status.clone().filter(|_| hud.visible);
        let full_output = hud.ctx.run(raw_input, |ctx| {
            if let Some(status) = &status {
                status.show(ctx);
            }
        });
        hud.winit
            .handle_platform_output(&hud.window, full_output.platform_output);

        let paint_jobs = hud
            .ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);
        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [size.width, size.height],
            pixels_per_point: full_output.pixels_per_point,
        };

        for (id, image_delta) in &full_output.textures_delta.set {
            hud.renderer.update_texture(device, queue, *id, image_delta);
        }
        hud.renderer
            .update_buffers(device, queue, encoder, &paint_jobs, &screen_descriptor);
        {
            let mut pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("hud_pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    ..Default::default()
                })
                .forget_lifetime();
            hud.renderer.render(&mut pass, &paint_jobs, &screen_descriptor);
        }
        for id in &full_output.textures_delta.free {
            hud.renderer.free_texture(id);
        }
    }
}

struct App {
    config: AppConfig,
    started: Instant,
    window: Option<Arc<Window>>,
    session: Option<Session<WgpuRenderer>>,
    hud: Option<Rc<RefCell<Hud>>>,
    error: Option<anyhow::Error>,
}

impl App {
    fn new(config: AppConfig) -> Self {
        Self {
            config,
            started: Instant::now(),
            window: None,
            session: None,
            hud: None,
            error: None,
        }
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title("markerview")
            .with_inner_size(PhysicalSize::new(self.config.renderer.width, self.config.renderer.height));
        let window = Arc::new(event_loop.create_window(attrs).context("creating window")?);

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance
            .create_surface(window.clone())
            .context("creating surface")?;
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .context("no compatible GPU adapter")?;
        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("markerview_device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
            },
            None,
        ))
        .context("creating device")?;

        let size = window.inner_size();
        let viewport = ElementSize::new(size.width, size.height);
        let mut renderer = WgpuRenderer::new(
            surface,
            &adapter,
            device,
            queue,
            viewport,
            self.config.renderer.clone(),
        )?;

        let ctx = egui::Context::default();
        let egui_winit = egui_winit::State::new(
            ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        let egui_renderer = egui_wgpu::Renderer::new(renderer.device(), renderer.surface_format(), None, 1, false);
        let hud = Rc::new(RefCell::new(Hud {
            ctx,
            winit: egui_winit,
            renderer: egui_renderer,
            window: window.clone(),
            status: None,
            visible: true,
        }));
        renderer.set_overlay(Box::new(HudOverlay(hud.clone())));

        let mut session = Session::from_config(&self.config, renderer)?;
        session.start()?;
        session.resize(viewport);

        tracing::info!(
            backend = adapter.get_info().backend.to_str(),
            %viewport,
            "GPU initialized"
        );
        self.window = Some(window);
        self.session = Some(session);
        self.hud = Some(hud);
        Ok(())
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(session) = &mut self.session {
            session.teardown();
        }
        event_loop.exit();
    }

    fn handle_key(&mut self, event_loop: &ActiveEventLoop, key: KeyCode) {
        match key {
            KeyCode::F1 => {
                if let Some(hud) = &self.hud {
                    let mut hud = hud.borrow_mut();
                    hud.visible = !hud.visible;
                }
            }
            KeyCode::Escape => self.shutdown(event_loop),
            _ => {}
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(error) = self.init(event_loop) {
            tracing::error!("startup failed: {error:#}");
            self.error = Some(error);
            event_loop.exit();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        if let (Some(hud), Some(window)) = (&self.hud, &self.window) {
            let response = hud.borrow_mut().winit.on_window_event(window, &event);
            if response.consumed {
                return;
            }
        }

        match event {
            WindowEvent::CloseRequested => self.shutdown(event_loop),
            WindowEvent::Resized(new_size) => {
                if let Some(session) = &mut self.session {
                    let viewport = ElementSize::new(new_size.width, new_size.height);
                    session.renderer_mut().resize_surface(viewport);
                    session.resize(viewport);
                }
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key),
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => self.handle_key(event_loop, key),
            WindowEvent::RedrawRequested => {
                let Some(session) = &mut self.session else {
                    return;
                };
                if session.is_torn_down() {
                    return;
                }
                if let Some(hud) = &self.hud {
                    hud.borrow_mut().status = Some(HudStatus::from_session(session));
                }
                session.frame(self.started.elapsed().as_secs_f64() * 1000.0);
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    let mut config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    if cli.synthetic {
        config.source = SourceConfig::Synthetic {
            width: config.renderer.width,
            height: config.renderer.height,
        };
    }
    tracing::info!(source = config.source.kind(), "markerview-desktop starting");

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(error) => Err(error),
        None => Ok(()),
    }
}
