use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use markerview_capture::SourceConfig;
use markerview_common::ResourceBase;
use markerview_render::DebugTextRenderer;
use markerview_runtime::{AppConfig, Session};
use markerview_track::{CameraCalibration, Pattern, ReplayTrack};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "markerview-cli", about = "CLI tool for markerview")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and available backends
    Info,
    /// Load and validate a config file, then print it with defaults filled in
    CheckConfig {
        path: PathBuf,
    },
    /// Dump an ARToolKit camera parameter file
    Calib {
        /// Path to camera_para.dat
        path: PathBuf,
        /// Near clip plane for the printed projection
        #[arg(long, default_value = "0.1")]
        near: f64,
        /// Far clip plane for the printed projection
        #[arg(long, default_value = "1000")]
        far: f64,
        /// Write a nominal 640x480 file to `path` instead of reading it
        #[arg(long)]
        write_nominal: bool,
    },
    /// Dump an ARToolKit marker pattern file
    Pattern {
        /// Path to the .patt file
        path: PathBuf,
        /// Write the generated demo template to `path` instead of reading it
        #[arg(long)]
        write_demo: bool,
    },
    /// Write a generated marker track for the replay detector
    Track {
        /// Output JSON file
        out: PathBuf,
        /// Frames in which the marker is seen
        #[arg(long, default_value = "240")]
        visible: usize,
        /// Frames in which it is lost
        #[arg(long, default_value = "60")]
        hidden: usize,
    },
    /// Run a headless session with the text renderer
    Simulate {
        /// Config file; defaults apply when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Number of frames to run
        #[arg(short, long, default_value = "300")]
        frames: u32,
        /// Simulated refresh rate
        #[arg(long, default_value = "60")]
        fps: f64,
        /// Replace the configured source with a synthetic test pattern
        #[arg(long)]
        synthetic: bool,
        /// Print the text rendering of every Nth frame (0: last only)
        #[arg(long, default_value = "0")]
        dump_every: u32,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Info => info(),
        Commands::CheckConfig { path } => check_config(&path)?,
        Commands::Calib {
            path,
            near,
            far,
            write_nominal,
        } => calib(&path, near, far, write_nominal)?,
        Commands::Pattern { path, write_demo } => pattern(&path, write_demo)?,
        Commands::Track { out, visible, hidden } => {
            let track = ReplayTrack::orbit(visible, hidden);
            std::fs::write(&out, track.to_json()?).with_context(|| format!("writing {}", out.display()))?;
            println!("wrote {} frames to {}", track.frames.len(), out.display());
        }
        Commands::Simulate {
            config,
            frames,
            fps,
            synthetic,
            dump_every,
        } => simulate(config.as_deref(), frames, fps, synthetic, dump_every)?,
    }

    Ok(())
}

fn info() {
    println!("markerview-cli v{}", env!("CARGO_PKG_VERSION"));
    let webcam = if cfg!(feature = "ffmpeg") { "webcam, " } else { "" };
    println!("sources: {webcam}image, video, synthetic");
    println!("detector: replay");
    println!("renderers: wgpu (desktop), debug-text");
    let defaults = AppConfig::default();
    println!(
        "defaults: camera={} pattern={} resize_delay={}ms max_delta={}ms",
        defaults.camera_parameters_url, defaults.marker.pattern_url, defaults.resize_delay_ms, defaults.max_delta_ms
    );
}

fn check_config(path: &Path) -> anyhow::Result<()> {
    let config = AppConfig::load(path)?;
    let base = config.resource_base();
    println!("{}", config.to_yaml()?);

    let mut resources = vec![
        ("camera parameters", config.camera_parameters_url.as_str()),
        ("marker pattern", config.marker.pattern_url.as_str()),
    ];
    if let Some(track) = &config.track_url {
        resources.push(("replay track", track.as_str()));
    }
    match &config.source {
        SourceConfig::Image { url } | SourceConfig::Video { url } => resources.push(("source media", url.as_str())),
        SourceConfig::Webcam { .. } | SourceConfig::Synthetic { .. } => {}
    }

    let mut missing = 0;
    for (what, url) in resources {
        let resolved = base.resolve(url);
        let found = resolved.exists();
        if !found {
            missing += 1;
        }
        println!("{what}: {} [{}]", resolved.display(), if found { "ok" } else { "MISSING" });
    }
    anyhow::ensure!(missing == 0, "{missing} resource(s) missing");
    Ok(())
}

fn calib(path: &Path, near: f64, far: f64, write_nominal: bool) -> anyhow::Result<()> {
    if write_nominal {
        std::fs::write(path, CameraCalibration::nominal_640x480().to_bytes())
            .with_context(|| format!("writing {}", path.display()))?;
        println!("wrote nominal 640x480 camera parameters to {}", path.display());
        return Ok(());
    }

    let bytes = ResourceBase::default().read(path)?;
    let calibration = CameraCalibration::parse(&bytes)?;
    let (fx, fy, cx, cy) = calibration.intrinsics();
    println!("size: {}", calibration.size);
    println!("focal: fx={fx:.3} fy={fy:.3}");
    println!("principal point: cx={cx:.3} cy={cy:.3}");
    println!("distortion: {:?}", calibration.dist_factor);
    println!("projection (near={near}, far={far}):");
    let m = calibration.projection(near, far);
    for row in 0..4 {
        let r = m.row(row);
        println!("  [{:10.4} {:10.4} {:10.4} {:10.4}]", r.x, r.y, r.z, r.w);
    }
    Ok(())
}

fn pattern(path: &Path, write_demo: bool) -> anyhow::Result<()> {
    if write_demo {
        std::fs::write(path, Pattern::demo().to_text()).with_context(|| format!("writing {}", path.display()))?;
        println!("wrote demo marker pattern to {}", path.display());
        return Ok(());
    }

    let text = ResourceBase::default().read_to_string(path)?;
    let pattern = Pattern::parse(&text)?;
    println!("resolution: {0}x{0}", pattern.resolution);
    println!("orientation 0, first plane:");
    if let Some(plane) = pattern.plane(0, 0) {
        for row in plane.chunks(pattern.resolution) {
            let line: String = row.iter().map(|v| if *v < 128 { '#' } else { '.' }).collect();
            println!("  {line}");
        }
    }
    Ok(())
}

/// Run a headless session for `frames` ticks at `fps`, calling `each` after
/// every tick.
fn run_session(
    config: &AppConfig,
    frames: u32,
    fps: f64,
    mut each: impl FnMut(u32, &Session<DebugTextRenderer>),
) -> anyhow::Result<Session<DebugTextRenderer>> {
    anyhow::ensure!(fps > 0.0, "fps must be positive");
    let renderer = DebugTextRenderer::new(config.renderer.clone());
    let mut session = Session::from_config(config, renderer)?;
    session.start()?;

    let step_ms = 1000.0 / fps;
    for i in 0..frames {
        session.frame(i as f64 * step_ms);
        each(i, &session);
    }
    Ok(session)
}

fn simulate(config: Option<&Path>, frames: u32, fps: f64, synthetic: bool, dump_every: u32) -> anyhow::Result<()> {
    let mut config = match config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    if synthetic {
        config.source = SourceConfig::Synthetic {
            width: config.renderer.width,
            height: config.renderer.height,
        };
    }

    let session = run_session(&config, frames, fps, |i, session| {
        if dump_every > 0 && i % dump_every == 0 {
            print!("{}", session.renderer().output());
        }
    })?;
    if dump_every == 0 && frames > 0 {
        print!("{}", session.renderer().output());
    }

    let seq = session.sequencer();
    let stats = session.frame_loop().stats();
    println!("--- summary ---");
    println!("frames: {}", session.frame_loop().frame_count());
    println!("frames with overlay: {}", session.renderer().frames_with_scene());
    println!(
        "delta: avg={:.2}ms min={:.2}ms max={:.2}ms ({:.1} fps)",
        stats.average() * 1000.0,
        stats.min() * 1000.0,
        stats.max() * 1000.0,
        stats.fps()
    );
    println!(
        "init: source={:?} context={:?} markers={:?}",
        seq.source(),
        seq.context(),
        seq.markers()
    );
    if let Some((stage, message)) = seq.failure() {
        println!("failure ({stage}): {message}");
    }
    println!("render failures: {}", session.state().render_failures);
    Ok(())
}
