use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use reelsmith::export::progress::{JobStatusFile, ProgressSink, ProgressUpdate, TracingProgress};
use reelsmith::{CancelToken, ExportConfig, ExportSession, Project};

#[derive(Parser, Debug)]
#[command(name = "reelsmith", version)]
struct Cli {
    /// Log at DEBUG instead of INFO.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render every frame and write the muxer package.
    Export(ExportArgs),
    /// Render the frame shown at one instant as a PNG.
    Frame(FrameArgs),
    /// Print the resolved timeline as JSON.
    Timeline(CommonArgs),
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// Project JSON.
    project: PathBuf,

    /// Export config JSON; defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Base directory for relative media URLs (defaults to the project's directory).
    #[arg(long)]
    assets_root: Option<PathBuf>,

    /// Render width.
    #[arg(long)]
    width: Option<u32>,

    /// Render height.
    #[arg(long)]
    height: Option<u32>,

    /// Frames per second.
    #[arg(long)]
    fps: Option<u32>,
}

#[derive(Args, Debug)]
struct ExportArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Output path; `.zip` is appended when archiving.
    #[arg(long)]
    out: PathBuf,

    /// Frames rendered concurrently.
    #[arg(long)]
    threads: Option<usize>,

    /// Leave the package as a directory.
    #[arg(long)]
    no_archive: bool,

    /// Replace an existing output.
    #[arg(long)]
    overwrite: bool,

    /// Also persist job progress as JSON at this path.
    #[arg(long)]
    status_file: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct FrameArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Time in seconds.
    #[arg(long)]
    time: f64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .with_writer(std::io::stderr)
        .init();

    match cli.cmd {
        Command::Export(args) => cmd_export(args),
        Command::Frame(args) => cmd_frame(args),
        Command::Timeline(args) => cmd_timeline(args),
    }
}

fn load(common: &CommonArgs) -> anyhow::Result<(Project, ExportConfig)> {
    let project = Project::from_path(&common.project)?;
    let mut cfg = match &common.config {
        Some(path) => ExportConfig::from_path(path)?,
        None => ExportConfig {
            assets_root: common
                .project
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."))
                .to_path_buf(),
            ..ExportConfig::default()
        },
    };
    if let Some(root) = &common.assets_root {
        cfg.assets_root = root.clone();
    }
    if let Some(w) = common.width {
        cfg.width = w;
    }
    if let Some(h) = common.height {
        cfg.height = h;
    }
    if let Some(fps) = common.fps {
        cfg.fps = fps;
    }
    Ok((project, cfg))
}

struct Fanout(Vec<Box<dyn ProgressSink>>);

impl ProgressSink for Fanout {
    fn report(&self, update: &ProgressUpdate) {
        for sink in &self.0 {
            sink.report(update);
        }
    }
}

fn cmd_export(args: ExportArgs) -> anyhow::Result<()> {
    let (project, mut cfg) = load(&args.common)?;
    if let Some(threads) = args.threads {
        cfg.concurrency = threads;
    }
    if args.no_archive {
        cfg.archive = false;
    }
    if args.overwrite {
        cfg.overwrite = true;
    }

    let mut sinks: Vec<Box<dyn ProgressSink>> = vec![Box::new(TracingProgress)];
    if let Some(path) = &args.status_file {
        sinks.push(Box::new(JobStatusFile::new(path, project.id.clone())));
    }
    let progress = Fanout(sinks);

    let mut session = ExportSession::new(project, cfg)?;
    let report = session.run(&args.out, &progress, &CancelToken::new())?;
    for (url, reason) in &report.skipped_assets {
        eprintln!("skipped overlay {url}: {reason}");
    }
    eprintln!(
        "wrote {} ({} frames, {} audio tracks)",
        report.package.display(),
        report.stats.frames_rendered,
        report.metadata.audio_tracks.len()
    );
    Ok(())
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let (project, cfg) = load(&args.common)?;
    let mut session = ExportSession::new(project, cfg)?;
    let frame = session.render_frame(args.time, &TracingProgress)?;
    let encoded = reelsmith::encode::png::encode_png(&frame)?;

    if let Some(parent) = args.out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    std::fs::write(&args.out, &encoded.png)
        .with_context(|| format!("write png '{}'", args.out.display()))?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_timeline(args: CommonArgs) -> anyhow::Result<()> {
    let (project, cfg) = load(&args)?;
    let session = ExportSession::new(project, cfg)?;
    let timeline = session.build_timeline();
    let items: Vec<_> = timeline
        .items()
        .iter()
        .map(|item| {
            serde_json::json!({
                "sentenceId": item.sentence.id,
                "startTime": item.start_time,
                "duration": item.duration,
                "endTime": item.end_time(),
                "durationSource": item.duration_source,
                "words": item.sentence.words.len(),
            })
        })
        .collect();
    let dump = serde_json::json!({
        "totalDuration": timeline.total_duration(),
        "items": items,
    });
    println!("{}", serde_json::to_string_pretty(&dump)?);
    Ok(())
}
