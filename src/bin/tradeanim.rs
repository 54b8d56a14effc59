use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "tradeanim", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print duration, frame count and scene contents.
    Info(InfoArgs),
    /// Render a single frame as a PNG.
    Frame(FrameArgs),
    /// Render an MP4 video (requires `ffmpeg` on PATH).
    Render(RenderArgs),
}

#[derive(Parser, Debug)]
struct InfoArgs {
    /// Input scene JSON.
    #[arg(long = "in")]
    in_path: PathBuf,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    /// Input scene JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Frame index (0-based).
    #[arg(long, conflicts_with = "time")]
    frame: Option<u64>,

    /// Sample time in seconds; rounded down to a frame.
    #[arg(long)]
    time: Option<f64>,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    #[command(flatten)]
    overrides: Overrides,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Input scene JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output MP4 path.
    #[arg(long)]
    out: PathBuf,

    /// Fail instead of overwriting an existing output file.
    #[arg(long)]
    no_overwrite: bool,

    /// Enable frame-level parallelism.
    #[arg(long, default_value_t = false)]
    parallel: bool,

    /// Override rayon worker threads (parallel mode only).
    #[arg(long)]
    threads: Option<usize>,

    /// Render chunk size (parallel mode only).
    #[arg(long, default_value_t = 64)]
    chunk_size: usize,

    /// ffmpeg executable.
    #[arg(long, default_value = "ffmpeg")]
    ffmpeg: PathBuf,

    /// Seconds to wait for ffmpeg to finish after the last frame.
    #[arg(long, default_value_t = 30)]
    close_timeout: u64,

    #[command(flatten)]
    overrides: Overrides,
}

/// Render config values that take precedence over the scene file.
#[derive(clap::Args, Debug, Default)]
struct Overrides {
    /// Output width in pixels.
    #[arg(long)]
    width: Option<u32>,
    /// Output height in pixels.
    #[arg(long)]
    height: Option<u32>,
    /// Integer frames per second.
    #[arg(long)]
    fps: Option<u32>,
    /// Constant rate factor.
    #[arg(long)]
    crf: Option<u8>,
    /// Encoder preset.
    #[arg(long)]
    preset: Option<String>,
    /// Theme preset name.
    #[arg(long)]
    theme: Option<String>,
    /// Global playback speed.
    #[arg(long)]
    speed: Option<f64>,
    /// Rasterize at N times the output size.
    #[arg(long)]
    supersample: Option<u32>,
    /// Draw the volume panel.
    #[arg(long, default_value_t = false)]
    volume: bool,
}

impl Overrides {
    fn apply(&self, config: &mut tradeanim::RenderConfig) -> anyhow::Result<()> {
        if let Some(w) = self.width {
            config.width = w;
        }
        if let Some(h) = self.height {
            config.height = h;
        }
        if let Some(fps) = self.fps {
            config.fps = tradeanim::Fps::new(fps, 1)?;
        }
        if let Some(crf) = self.crf {
            config.crf = crf;
        }
        if let Some(preset) = &self.preset {
            config.preset = preset.clone();
        }
        if let Some(name) = &self.theme {
            config.theme = tradeanim::Theme::preset(name)
                .with_context(|| format!("unknown theme preset '{name}'"))?;
        }
        if let Some(speed) = self.speed {
            config.speed_multiplier = speed;
        }
        if let Some(ss) = self.supersample {
            config.supersample = ss;
        }
        if self.volume {
            config.show_volume = true;
        }
        Ok(())
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Info(args) => cmd_info(args),
        Command::Frame(args) => cmd_frame(args),
        Command::Render(args) => cmd_render(args),
    }
}

fn load_scene(path: &Path, overrides: &Overrides) -> anyhow::Result<tradeanim::Scene> {
    let mut def = tradeanim::SceneDef::from_path(path)?;
    overrides.apply(&mut def.config)?;
    let scene = def
        .into_scene()
        .with_context(|| format!("build scene '{}'", path.display()))?;
    Ok(scene)
}

fn cmd_info(args: InfoArgs) -> anyhow::Result<()> {
    let scene = load_scene(&args.in_path, &Overrides::default())?;
    let cfg = scene.config();
    println!("size:       {}x{}", cfg.width, cfg.height);
    println!("fps:        {}/{}", cfg.fps.num, cfg.fps.den);
    println!("duration:   {:.3}s", scene.total_duration());
    println!("frames:     {}", scene.frame_count());
    println!("elements:   {}", scene.registry().len());
    println!("directives: {}", scene.timeline().len());
    for d in scene.timeline().directives() {
        println!(
            "  {:>8.3}s +{:<7.3} {} ({} targets)",
            d.start_time,
            d.duration,
            d.animation.name(),
            d.animation.targets().len()
        );
    }
    Ok(())
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let scene = load_scene(&args.in_path, &args.overrides)?;
    let director = tradeanim::Director::new(&scene, tradeanim::DirectorOpts::default())?;

    let idx = match (args.frame, args.time) {
        (Some(f), _) => f,
        (None, Some(t)) => (t.max(0.0) * scene.config().fps.as_f64()).floor() as u64,
        (None, None) => 0,
    };
    let frame = director.render_frame(tradeanim::FrameIndex(idx))?;

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }

    let data = if frame.premultiplied {
        unpremultiply(&frame.data)
    } else {
        frame.data.clone()
    };
    image::save_buffer_with_format(
        &args.out,
        &data,
        frame.width,
        frame.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {} (frame {idx})", args.out.display());
    Ok(())
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let scene = load_scene(&args.in_path, &args.overrides)?;
    let opts = tradeanim::DirectorOpts {
        parallel: args.parallel,
        threads: args.threads,
        chunk_size: args.chunk_size,
        ..tradeanim::DirectorOpts::default()
    };
    let director = tradeanim::Director::new(&scene, opts)?;

    let mut sink_opts = tradeanim::FfmpegSinkOpts::new(&args.out);
    sink_opts.overwrite = !args.no_overwrite;
    sink_opts.bg_rgba = scene.config().theme.background.to_rgba8();
    sink_opts.ffmpeg_bin = args.ffmpeg.clone();
    sink_opts.close_timeout = Duration::from_secs(args.close_timeout);
    let mut sink = tradeanim::FfmpegSink::new(sink_opts);

    let mut last_pct = 0;
    let stats = director.render_with_progress(&mut sink, |p| {
        let pct = (p.fraction() * 100.0).floor() as u32;
        if pct >= last_pct + 10 || p.done == p.total {
            last_pct = pct;
            let eta = p.eta().map_or(0.0, |d| d.as_secs_f64());
            eprintln!("{:>3}% ({}/{} frames, eta {eta:.1}s)", pct, p.done, p.total);
        }
    })?;

    eprintln!(
        "wrote {} ({} frames in {:.2}s)",
        args.out.display(),
        stats.frames,
        stats.elapsed.as_secs_f64()
    );
    Ok(())
}

fn unpremultiply(src: &[u8]) -> Vec<u8> {
    let mut out = src.to_vec();
    for px in out.chunks_exact_mut(4) {
        let a = u32::from(px[3]);
        if a == 0 || a == 255 {
            continue;
        }
        for c in &mut px[..3] {
            *c = ((u32::from(*c) * 255 + a / 2) / a).min(255) as u8;
        }
    }
    out
}
