use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};

use kinetype::{
    AudioFileNarration, Compositor, EstimatedMetrics, FfmpegCompositor, FfmpegCompositorOpts,
    FixedNarration, FontResolver, FrameRasterizer, GlyphMetricsProvider, InMemoryCompositor,
    KineticConfig, LoadedFont, LogProgress, ManifestCompositor, MetricsCache, NarrationSource,
    RenderRequest, ResolvedFont, ShapedMetrics, SystemFontResolver, Timeline,
};

#[derive(Parser, Debug)]
#[command(name = "kinetype", version)]
struct Cli {
    /// Log debug details (autoscale decisions, font resolution) to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write the timing and layout plan as JSON.
    Plan(PlanArgs),
    /// Render a single moment of the video as a PNG.
    Preview(PreviewArgs),
    /// Render an MP4 video (requires `ffmpeg` on PATH).
    Render(RenderArgs),
}

#[derive(Args, Debug)]
struct InputArgs {
    /// Script text file.
    #[arg(long, required_unless_present = "text", conflicts_with = "text")]
    script: Option<PathBuf>,

    /// Script text given inline.
    #[arg(long)]
    text: Option<String>,

    /// Configuration JSON (every field optional).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Font family name or font file path.
    #[arg(long)]
    font: Option<String>,

    /// Extra directory to search for fonts (repeatable).
    #[arg(long = "font-dir")]
    font_dirs: Vec<PathBuf>,

    /// Narration length in seconds.
    #[arg(long, conflicts_with_all = ["audio", "silent"])]
    duration: Option<f64>,

    /// Narration audio file; its length sets the pace and it is muxed into the video.
    #[arg(long, conflicts_with = "silent")]
    audio: Option<PathBuf>,

    /// No narration; words advance at the configured reading rate.
    #[arg(long)]
    silent: bool,
}

#[derive(Args, Debug)]
struct PlanArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Output JSON path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Args, Debug)]
struct PreviewArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Time in seconds to render.
    #[arg(long)]
    time: f64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Args, Debug)]
struct RenderArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Output MP4 path.
    #[arg(long)]
    out: PathBuf,

    /// Fail instead of overwriting an existing output.
    #[arg(long, default_value_t = false)]
    no_overwrite: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match cli.cmd {
        Command::Plan(args) => cmd_plan(args),
        Command::Preview(args) => cmd_preview(args),
        Command::Render(args) => cmd_render(args),
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_max_level(level)
        .try_init();
}

/// Everything a command needs before layout starts.
struct Prepared {
    config: KineticConfig,
    script: String,
    font: ResolvedFont,
    narration: Option<Box<dyn NarrationSource>>,
}

impl Prepared {
    fn load(input: &InputArgs) -> anyhow::Result<Self> {
        let mut config = match &input.config {
            Some(path) => KineticConfig::from_json_file(path)
                .with_context(|| format!("load config '{}'", path.display()))?,
            None => KineticConfig::default(),
        };
        if let Some(font) = &input.font {
            config.font = font.clone();
        }
        config.font_dirs.extend(input.font_dirs.iter().cloned());

        let narration: Option<Box<dyn NarrationSource>> = if input.silent {
            config.voice_enabled = false;
            None
        } else if let Some(d) = input.duration {
            config.voice_enabled = true;
            Some(Box::new(FixedNarration::new(d)))
        } else if let Some(path) = &input.audio {
            config.voice_enabled = true;
            Some(Box::new(AudioFileNarration::new(path)))
        } else {
            None
        };
        if config.voice_enabled && narration.is_none() {
            anyhow::bail!("voice mode needs --duration or --audio (or pass --silent)");
        }
        config.validate().context("invalid configuration")?;

        let script = match (&input.script, &input.text) {
            (Some(path), _) => std::fs::read_to_string(path)
                .with_context(|| format!("read script '{}'", path.display()))?,
            (None, Some(text)) => text.clone(),
            (None, None) => anyhow::bail!("one of --script or --text is required"),
        };

        let font = SystemFontResolver::new(&config.font_dirs).resolve(&config.font);
        Ok(Self {
            config,
            script,
            font,
            narration,
        })
    }

    fn metrics(&self) -> anyhow::Result<MetricsCache<Box<dyn GlyphMetricsProvider>>> {
        let inner: Box<dyn GlyphMetricsProvider> = match &self.font {
            ResolvedFont::Loaded(font) => Box::new(
                ShapedMetrics::new(font.clone()).context("prepare font for shaping")?,
            ),
            ResolvedFont::Fallback { .. } => Box::new(EstimatedMetrics::new()),
        };
        Ok(MetricsCache::new(inner))
    }

    fn raster_font(&self) -> anyhow::Result<LoadedFont> {
        match &self.font {
            ResolvedFont::Loaded(font) => Ok(font.clone()),
            ResolvedFont::Fallback { requested } => anyhow::bail!(
                "no usable font for '{requested}'; pass --font <file> or --font-dir <dir> to draw frames"
            ),
        }
    }

    fn run(&self, compositor: &mut dyn Compositor) -> anyhow::Result<Timeline> {
        let mut metrics = self.metrics()?;
        let timeline = kinetype::render(
            RenderRequest {
                script: &self.script,
                config: &self.config,
                narration: self.narration.as_deref(),
            },
            &mut metrics,
            compositor,
            &mut LogProgress::default(),
        )?;
        if !timeline.overflows.is_empty() {
            eprintln!(
                "warning: {} line(s) overflow the safe width at the minimum font size",
                timeline.overflows.len()
            );
        }
        Ok(timeline)
    }
}

fn cmd_plan(args: PlanArgs) -> anyhow::Result<()> {
    let prepared = Prepared::load(&args.input)?;
    let mut compositor = ManifestCompositor::new(&args.out);
    prepared.run(&mut compositor)?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_preview(args: PreviewArgs) -> anyhow::Result<()> {
    let prepared = Prepared::load(&args.input)?;
    let font = prepared.raster_font()?;
    let timeline = prepared.run(&mut InMemoryCompositor::new())?;

    let mut raster = FrameRasterizer::new(font, &prepared.config)?;
    let frame = raster.render_at(&timeline, args.time)?;
    frame
        .write_png(&args.out, prepared.config.background_rgb)
        .with_context(|| format!("write png '{}'", args.out.display()))?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let prepared = Prepared::load(&args.input)?;
    let font = prepared.raster_font()?;
    let raster = FrameRasterizer::new(font, &prepared.config)?;
    let opts = FfmpegCompositorOpts {
        out_path: args.out.clone(),
        overwrite: !args.no_overwrite,
    };
    prepared.run(&mut FfmpegCompositor::new(opts, raster))?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}
