//! Perspective Tutor command-line entry point

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use pt_core::{CameraConfig, CubePose, Difficulty, PerspectiveMode};
use pt_critique::{Comparator, ComparisonClient, ComparisonStrategy, GeminiBackend};
use pt_frontend::overlay::{OverlayLayers, OverlayOptions, OverlayTarget, annotate, composite_overlay, legend};
use pt_frontend::{ConfigManager, CritiqueSession, LocalProgress, SessionState};
use pt_renderer::{CaptureConfig, CaptureController, CaptureSurface, OffscreenRenderer, SoftwareSurface};
use serde::Serialize;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Parser)]
#[command(name = "pt")]
#[command(about = "Perspective drawing practice: capture a cube and critique a drawing of it.")]
struct Cli {
    /// Config file (defaults to the OS config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Render a preset and write the capture images and geometry
    Capture {
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,
        /// Cube rotation about Y in degrees
        #[arg(long)]
        rotation: Option<f32>,
        #[arg(long, default_value = "capture")]
        out: PathBuf,
        /// Use the CPU rasterizer
        #[arg(long)]
        software: bool,
    },
    /// Capture, then grade a drawing against it
    Critique {
        /// The drawing to grade (PNG or JPEG)
        #[arg(long)]
        drawing: PathBuf,
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,
        #[arg(long)]
        rotation: Option<f32>,
        #[arg(long, value_enum)]
        difficulty: Option<DifficultyArg>,
        #[arg(long, value_enum)]
        strategy: Option<StrategyArg>,
        /// Stop waiting after this many seconds
        #[arg(long)]
        give_up_after: Option<u64>,
        /// Directory for the reference, composite and edge images
        #[arg(long)]
        out: Option<PathBuf>,
        #[arg(long)]
        software: bool,
        /// Draw corner-to-vanishing-point guides on the reference edge image
        #[arg(long)]
        guides: bool,
        #[arg(long)]
        hide_reference_edges: bool,
        #[arg(long)]
        hide_user_edges: bool,
    },
    /// Show the config path, writing defaults if there is no file yet
    Config {
        /// Overwrite the file with defaults
        #[arg(long)]
        reset: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    One,
    Two,
    Three,
    Free,
}

impl From<ModeArg> for PerspectiveMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::One => PerspectiveMode::OnePoint,
            ModeArg::Two => PerspectiveMode::TwoPoint,
            ModeArg::Three => PerspectiveMode::ThreePoint,
            ModeArg::Free => PerspectiveMode::Free,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DifficultyArg {
    Beginner,
    Intermediate,
    Advanced,
}

impl From<DifficultyArg> for Difficulty {
    fn from(difficulty: DifficultyArg) -> Self {
        match difficulty {
            DifficultyArg::Beginner => Difficulty::Beginner,
            DifficultyArg::Intermediate => Difficulty::Intermediate,
            DifficultyArg::Advanced => Difficulty::Advanced,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StrategyArg {
    SingleShot,
    TwoPhase,
}

impl From<StrategyArg> for ComparisonStrategy {
    fn from(strategy: StrategyArg) -> Self {
        match strategy {
            StrategyArg::SingleShot => ComparisonStrategy::SingleShot,
            StrategyArg::TwoPhase => ComparisonStrategy::TwoPhase,
        }
    }
}

/// Written next to the capture images
#[derive(Serialize)]
struct CaptureReport<'a> {
    mode: PerspectiveMode,
    crop: pt_core::PixelRect,
    cropped: bool,
    pose: &'a pt_core::CubePose,
    geometry: &'a pt_core::SceneGeometry<pt_core::CropPixels>,
}

fn main() -> Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pt_frontend=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let manager = match &cli.config {
        Some(path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };

    match cli.cmd {
        Command::Capture {
            mode,
            rotation,
            out,
            software,
        } => capture(&manager, mode, rotation, &out, software),
        Command::Critique {
            drawing,
            mode,
            rotation,
            difficulty,
            strategy,
            give_up_after,
            out,
            software,
            guides,
            hide_reference_edges,
            hide_user_edges,
        } => critique(
            &manager,
            CritiqueArgs {
                drawing,
                mode,
                rotation,
                difficulty,
                strategy,
                give_up_after,
                out,
                software,
                guides,
                hide_reference_edges,
                hide_user_edges,
            },
        ),
        Command::Config { reset } => show_config(manager, reset),
    }
}

fn open_surface(config: &CaptureConfig, software: bool) -> Box<dyn CaptureSurface> {
    if software {
        return Box::new(SoftwareSurface::new(config));
    }
    match OffscreenRenderer::new_blocking(config) {
        Ok(renderer) => Box::new(renderer),
        Err(e) => {
            tracing::warn!("GPU renderer unavailable ({}), using software rasterizer", e);
            Box::new(SoftwareSurface::new(config))
        }
    }
}

fn new_session(
    manager: &ConfigManager,
    comparator: Arc<dyn Comparator>,
    progress: LocalProgress,
    mode: Option<ModeArg>,
    rotation: Option<f32>,
) -> CritiqueSession {
    let config = manager.config();
    let mode = mode.map_or(config.practice.mode, PerspectiveMode::from);
    let mut session = CritiqueSession::new(comparator, Box::new(progress), config.session.clone(), mode);
    if let Some(degrees) = rotation {
        session.rotate_cube(degrees.to_radians() - session.pose().y_rotation);
    }
    session
}

fn write_png(image: &image::RgbaImage, path: &Path) -> Result<()> {
    image
        .save(path)
        .with_context(|| format!("write image: {path:?}"))
}

fn capture(
    manager: &ConfigManager,
    mode: Option<ModeArg>,
    rotation: Option<f32>,
    out: &Path,
    software: bool,
) -> Result<()> {
    let config = manager.config();
    let mut surface = open_surface(&config.capture, software);
    let controller = CaptureController::new(config.capture.clone());

    let mode = mode.map_or(config.practice.mode, PerspectiveMode::from);
    let mut pose = CubePose::preset(mode);
    if let Some(degrees) = rotation {
        pose.rotate(degrees.to_radians() - pose.y_rotation, mode);
    }
    let camera = CameraConfig::preset(mode);
    let capture = controller.capture(surface.as_mut(), &pose, &camera)?;

    std::fs::create_dir_all(out).with_context(|| format!("create output dir: {out:?}"))?;
    write_png(&capture.solid, &out.join("reference.png"))?;
    write_png(&capture.wireframe, &out.join("wireframe.png"))?;
    write_png(&capture.overlay, &out.join("overlay.png"))?;

    let report = CaptureReport {
        mode,
        crop: capture.crop,
        cropped: capture.cropped,
        pose: &capture.pose,
        geometry: &capture.geometry,
    };
    let json = serde_json::to_string_pretty(&report).context("serialize geometry")?;
    let path = out.join("geometry.json");
    std::fs::write(&path, json).with_context(|| format!("write geometry: {path:?}"))?;

    println!(
        "{} capture {}x{} written to {}",
        mode.name(),
        capture.crop.width,
        capture.crop.height,
        out.display()
    );
    Ok(())
}

struct CritiqueArgs {
    drawing: PathBuf,
    mode: Option<ModeArg>,
    rotation: Option<f32>,
    difficulty: Option<DifficultyArg>,
    strategy: Option<StrategyArg>,
    give_up_after: Option<u64>,
    out: Option<PathBuf>,
    software: bool,
    guides: bool,
    hide_reference_edges: bool,
    hide_user_edges: bool,
}

impl CritiqueArgs {
    fn overlay_options(&self, base: OverlayOptions) -> OverlayOptions {
        OverlayOptions {
            show_guides: base.show_guides || self.guides,
            show_reference_edges: base.show_reference_edges && !self.hide_reference_edges,
            show_user_edges: base.show_user_edges && !self.hide_user_edges,
            ..base
        }
    }
}

fn critique(manager: &ConfigManager, args: CritiqueArgs) -> Result<()> {
    let config = manager.config();
    let mut client_config = config.client.clone();
    if let Some(strategy) = args.strategy {
        client_config.strategy = strategy.into();
    }

    let backend = GeminiBackend::from_env(&client_config)?;
    let comparator: Arc<dyn Comparator> = Arc::new(ComparisonClient::new(backend, client_config));

    let mut progress = LocalProgress::load(
        ConfigManager::config_dir().join("progress.ron"),
        config.practice.difficulty,
    );
    if let Some(difficulty) = args.difficulty {
        progress.set_difficulty(difficulty.into());
    }

    let drawing = image::open(&args.drawing)
        .with_context(|| format!("read drawing: {:?}", args.drawing))?
        .to_rgba8();

    let mut surface = open_surface(&config.capture, args.software);
    let controller = CaptureController::new(config.capture.clone());
    let mut session = new_session(manager, comparator, progress, args.mode, args.rotation);

    session.capture_scene(surface.as_mut(), &controller)?;
    session.upload_drawing(drawing)?;
    if session.state() == SessionState::Cropping {
        tracing::info!("Drawing aspect differs from the capture, using the centred crop");
        session.confirm_crop(None)?;
    }

    let started = Instant::now();
    session.submit(started)?;
    let give_up = args.give_up_after.map(Duration::from_secs);
    let mut last_status = None;
    while session.state() == SessionState::Analyzing {
        session.poll();
        let now = Instant::now();
        let status = session
            .phase()
            .map(|p| p.label())
            .or_else(|| session.caption(now));
        if status != last_status
            && let Some(text) = status
        {
            println!("{text}");
            last_status = status;
        }
        if give_up.is_some_and(|limit| now.duration_since(started) >= limit) && session.can_cancel(now) {
            session.cancel(now)?;
            break;
        }
        std::thread::sleep(POLL_INTERVAL);
    }

    if let Some(out) = &args.out {
        save_images(&session, out, &args.overlay_options(config.overlay))?;
    }

    match session.state() {
        SessionState::Result => {
            let Some(result) = session.result() else {
                bail!("analysis finished without a result");
            };
            println!("\nGrade: {}\n\n{}\n", result.grade, result.feedback);
            for (class, count, _) in legend(&result.user_edges) {
                println!("  {:>8} edges found: {}", class.as_wire_str(), count);
            }
            if let Some(reward) = session.reward() {
                println!(
                    "\n+{} XP ({} critiques so far)",
                    reward.xp_gained, reward.total_critiques
                );
            }
            Ok(())
        }
        _ => match session.error() {
            Some(error) => bail!("{}", error.display_text()),
            None => bail!("analysis ended in the {} state", session.state()),
        },
    }
}

fn save_images(session: &CritiqueSession, out: &Path, options: &OverlayOptions) -> Result<()> {
    std::fs::create_dir_all(out).with_context(|| format!("create output dir: {out:?}"))?;
    let Some(capture) = session.capture() else {
        return Ok(());
    };
    write_png(&capture.solid, &out.join("reference.png"))?;
    let drawing = session.drawing();
    if let Some(drawing) = drawing {
        write_png(drawing, &out.join("drawing.png"))?;
        write_png(&composite_overlay(drawing, &capture.overlay), &out.join("composite.png"))?;
    }

    let Some(result) = session.result() else {
        return Ok(());
    };
    let layers = OverlayLayers {
        geometry: Some(&capture.geometry),
        reference_edges: &result.reference_edges,
        user_edges: &result.user_edges,
    };
    if options.show_reference_edges {
        let image = annotate(&capture.solid, OverlayTarget::Reference, &layers, options);
        write_png(&image, &out.join("reference_edges.png"))?;
    }
    if options.show_user_edges
        && let Some(drawing) = drawing
    {
        let image = annotate(drawing, OverlayTarget::Drawing, &layers, options);
        write_png(&image, &out.join("drawing_edges.png"))?;
    }
    Ok(())
}

fn show_config(mut manager: ConfigManager, reset: bool) -> Result<()> {
    let path = manager.config_file_path().to_path_buf();
    if reset || !path.exists() {
        manager.reset_to_defaults();
        manager.save()?;
        println!("Wrote default config to {}", path.display());
    } else {
        println!("{}", path.display());
    }
    let text = ron::ser::to_string_pretty(manager.config(), ron::ser::PrettyConfig::default())
        .context("serialize config")?;
    println!("{text}");
    Ok(())
}
