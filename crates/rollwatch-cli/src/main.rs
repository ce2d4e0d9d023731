use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rollwatch_core::{decode_feed, RootKind, StatusSnapshot};
use rollwatch_render::{DefaultGlyphs, Layout, Palette, TreeRenderer, View};
use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

mod watch;

const LOG_FILE_NAME: &str = "rollwatch.log";

#[derive(Parser, Debug)]
#[command(name = "rollwatch")]
#[command(about = "Status trees for progressive rollouts", long_about = None)]
struct Cli {
    /// Log at debug level
    #[arg(long, global = true, default_value_t = false)]
    debug: bool,
    #[arg(long, global = true, default_value = "")]
    log_dir: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show the status tree of a resource
    Get {
        #[command(subcommand)]
        target: GetTarget,
    },
}

#[derive(Subcommand, Debug)]
enum GetTarget {
    /// Show a rollout and its revisions
    #[command(visible_alias = "ro")]
    Rollout(GetArgs),
    /// Show an analysis run and its jobs
    #[command(name = "analysisrun", visible_alias = "ar")]
    AnalysisRun(GetArgs),
}

#[derive(clap::Args, Debug, Clone)]
struct GetArgs {
    /// Snapshot feed, or `-` for stdin. One JSON document per line or
    /// pretty-printed documents back to back
    source: String,
    /// Keep rendering as new snapshots arrive
    #[arg(short, long, default_value_t = false)]
    watch: bool,
    #[arg(long, default_value_t = false)]
    no_color: bool,
    /// Stop watching after this many seconds (0 waits forever)
    #[arg(long)]
    timeout_seconds: Option<u64>,
    /// Omit the summary header
    #[arg(long, default_value_t = false)]
    tree: bool,
    /// Tab-separated columns instead of aligned ones
    #[arg(long, default_value_t = false)]
    raw: bool,
    /// Re-render unchanged snapshots on every tick while watching
    #[arg(long, default_value_t = false)]
    heartbeat: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Source {
    Stdin,
    Path(PathBuf),
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Source::Stdin => f.write_str("<stdin>"),
            Source::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

#[derive(Debug, Clone)]
struct Config {
    kind: RootKind,
    source: Source,
    watch: bool,
    color: bool,
    view: View,
    layout: Layout,
    timeout: Option<Duration>,
    heartbeat: bool,
    debug: bool,
    log_dir: Option<PathBuf>,
    log_stderr: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = load_config(Cli::parse());
    init_logging(&config);
    debug!(event = "rollwatch_start", kind = %config.kind, source = %config.source, watch = config.watch);

    let result = if config.watch {
        watch::run(&config).await
    } else {
        show_once(&config).await
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(event = "rollwatch_error", error = %format!("{err:#}"));
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(cli: Cli) -> Config {
    let Commands::Get { target } = cli.command;
    let (kind, args) = match target {
        GetTarget::Rollout(args) => (RootKind::Rollout, args),
        GetTarget::AnalysisRun(args) => (RootKind::AnalysisRun, args),
    };
    Config {
        kind,
        source: resolve_source(&args.source),
        watch: args.watch,
        color: resolve_color(args.no_color),
        view: if args.tree { View::Tree } else { View::Describe },
        layout: if args.raw { Layout::Tabs } else { Layout::Aligned },
        timeout: resolve_timeout(args.timeout_seconds),
        heartbeat: args.heartbeat || env_true("ROLLWATCH_HEARTBEAT"),
        debug: cli.debug || env_true("ROLLWATCH_DEBUG"),
        log_dir: resolve_log_dir(&cli.log_dir),
        log_stderr: env_true("ROLLWATCH_LOG_STDERR"),
    }
}

fn resolve_source(value: &str) -> Source {
    if value.trim() == "-" {
        Source::Stdin
    } else {
        Source::Path(PathBuf::from(value))
    }
}

fn resolve_color(no_color_flag: bool) -> bool {
    if no_color_flag {
        return false;
    }
    match std::env::var("NO_COLOR") {
        Ok(value) => value.is_empty(),
        Err(_) => true,
    }
}

fn resolve_timeout(flag: Option<u64>) -> Option<Duration> {
    let seconds = match flag {
        Some(value) => value,
        None => std::env::var("ROLLWATCH_TIMEOUT_SECONDS")
            .ok()
            .and_then(|value| value.trim().parse::<u64>().ok())
            .unwrap_or(0),
    };
    if seconds == 0 {
        None
    } else {
        Some(Duration::from_secs(seconds))
    }
}

fn resolve_log_dir(log_dir_flag: &str) -> Option<PathBuf> {
    if !log_dir_flag.trim().is_empty() {
        return Some(PathBuf::from(log_dir_flag));
    }
    match std::env::var("ROLLWATCH_LOG_DIR") {
        Ok(value) if !value.trim().is_empty() => Some(PathBuf::from(value)),
        _ => None,
    }
}

fn env_true(key: &str) -> bool {
    match std::env::var(key) {
        Ok(value) => matches!(
            value.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        ),
        Err(_) => false,
    }
}

/// Stdout carries rendered trees, so logs go to a file, stderr, or nowhere.
fn init_logging(config: &Config) {
    let level = if config.debug {
        "debug".to_string()
    } else if let Ok(level) = std::env::var("ROLLWATCH_LOG_LEVEL") {
        level
    } else {
        "info".to_string()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if let Some(dir) = &config.log_dir {
        match open_log_file(dir) {
            Ok(file) => {
                let _ = tracing_subscriber::fmt()
                    .with_env_filter(filter)
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .try_init();
                return;
            }
            Err(err) => eprintln!("log_file_error: {err}"),
        }
    }
    if config.log_stderr {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .try_init();
    } else {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::sink)
            .try_init();
    }
}

fn open_log_file(dir: &Path) -> io::Result<std::fs::File> {
    std::fs::create_dir_all(dir)?;
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join(LOG_FILE_NAME))
}

async fn read_source(source: &Source) -> Result<String> {
    match source {
        Source::Stdin => {
            let mut input = String::new();
            tokio::io::stdin()
                .read_to_string(&mut input)
                .await
                .context("failed to read stdin")?;
            Ok(input)
        }
        Source::Path(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read {}", path.display())),
    }
}

fn ensure_kind(expected: RootKind, snapshot: &StatusSnapshot) -> Result<()> {
    if snapshot.kind != expected {
        bail!(
            "{} is a {} snapshot, expected {}",
            snapshot.meta.name,
            snapshot.kind,
            expected
        );
    }
    Ok(())
}

fn renderer<'a>(palette: &'a Palette, config: &Config) -> TreeRenderer<'a> {
    TreeRenderer::new(palette, &DefaultGlyphs).with_layout(config.layout)
}

/// Render the newest snapshot of the feed once.
async fn show_once(config: &Config) -> Result<()> {
    let input = read_source(&config.source).await?;
    let snapshots =
        decode_feed(&input).with_context(|| format!("failed to decode {}", config.source))?;
    let snapshot = snapshots
        .last()
        .with_context(|| format!("{} contains no snapshots", config.source))?;
    ensure_kind(config.kind, snapshot)?;
    debug!(
        event = "snapshot_loaded",
        name = %snapshot.meta.name,
        count = snapshots.len(),
        observed_at = %snapshot.observed_at
    );

    let palette = Palette::new(config.color);
    let stdout = io::stdout();
    let mut out = stdout.lock();
    renderer(&palette, config)
        .render(snapshot, config.view, &mut out)
        .context("failed to write output")
}
