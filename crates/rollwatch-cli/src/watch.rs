use crate::{renderer, Config, Source};
use anyhow::{bail, Context, Result};
use crossterm::cursor::MoveTo;
use crossterm::queue;
use crossterm::terminal::{Clear, ClearType};
use rollwatch_core::{RootKind, StatusSnapshot};
use rollwatch_merge::{MergeExit, MergerConfig, UpdateMerger};
use rollwatch_render::{Palette, TreeRenderer, View};
use std::io::{self, BufRead, BufReader, IsTerminal, Write};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;
use tracing::{debug, info, warn};

const FEED_BUFFER: usize = 64;

/// Follow the feed until it ends, Ctrl-C, or the timeout.
pub(crate) async fn run(config: &Config) -> Result<()> {
    let (tx, rx) = mpsc::channel::<StatusSnapshot>(FEED_BUFFER);
    let (stop_tx, stop_rx) = watch::channel(false);

    let reader_done = spawn_reader(&config.source, config.kind, tx)?;
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!(event = "watch_interrupted");
            let _ = stop_tx.send(true);
        }
    });

    let deadline = config.timeout.map(|timeout| Instant::now() + timeout);
    let merger = UpdateMerger::new(MergerConfig {
        heartbeat: config.heartbeat,
        ..MergerConfig::default()
    });
    let palette = Palette::new(config.color);
    let tree = renderer(&palette, config);
    let clear = io::stdout().is_terminal();

    let outcome = merger
        .run(rx, stop_rx, deadline, |snapshot: &StatusSnapshot| {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            draw(&tree, config.view, snapshot, clear, &mut out)
        })
        .await;
    info!(
        event = "watch_stopped",
        exit = ?outcome.exit,
        renders = outcome.renders,
        render_failures = outcome.render_failures,
        received = outcome.received
    );

    // The reader thread may still be parked in a blocking read; it is left
    // behind and dies with the process.
    if outcome.exit != MergeExit::SourceClosed {
        return Ok(());
    }
    reader_done
        .await
        .context("feed reader stopped unexpectedly")??;
    if outcome.received == 0 {
        bail!("{} contained no {} snapshots", config.source, config.kind);
    }
    Ok(())
}

fn draw<W: Write>(
    tree: &TreeRenderer<'_>,
    view: View,
    snapshot: &StatusSnapshot,
    clear: bool,
    out: &mut W,
) -> Result<()> {
    if clear {
        queue!(out, Clear(ClearType::All), MoveTo(0, 0)).context("failed to clear screen")?;
    }
    tree.render(snapshot, view, out)?;
    Ok(())
}

fn open_feed(source: &Source) -> Result<Box<dyn BufRead + Send>> {
    match source {
        Source::Stdin => Ok(Box::new(BufReader::new(io::stdin()))),
        Source::Path(path) => {
            let file = std::fs::File::open(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            Ok(Box::new(BufReader::new(file)))
        }
    }
}

/// Read the feed on a dedicated thread. The returned receiver yields the
/// reader's result once the feed is exhausted.
fn spawn_reader(
    source: &Source,
    kind: RootKind,
    tx: mpsc::Sender<StatusSnapshot>,
) -> Result<oneshot::Receiver<Result<()>>> {
    let reader = open_feed(source)?;
    let source = source.clone();
    let (done_tx, done_rx) = oneshot::channel();
    std::thread::Builder::new()
        .name("rollwatch-feed".to_string())
        .spawn(move || {
            let result = forward_feed(reader, &source, kind, tx);
            let _ = done_tx.send(result);
        })
        .context("failed to start feed reader")?;
    Ok(done_rx)
}

/// Forward every decoded snapshot of `kind`. Blocks; must run off the runtime.
fn forward_feed<R: BufRead>(
    reader: R,
    source: &Source,
    kind: RootKind,
    tx: mpsc::Sender<StatusSnapshot>,
) -> Result<()> {
    let mut decoder = FeedDecoder::default();
    for line in reader.lines() {
        let line = line.with_context(|| format!("failed to read {source}"))?;
        for snapshot in decoder.push_line(&line) {
            if snapshot.kind != kind {
                warn!(
                    event = "feed_kind_mismatch",
                    line = decoder.line_no,
                    name = %snapshot.meta.name,
                    found = %snapshot.kind,
                    expected = %kind
                );
                continue;
            }
            debug!(event = "snapshot_received", line = decoder.line_no, name = %snapshot.meta.name);
            if tx.blocking_send(snapshot).is_err() {
                return Ok(());
            }
        }
    }
    decoder.finish();
    Ok(())
}

/// Incremental snapshot decoder. Accepts one document per line as well as
/// documents spread over several lines; input that cannot become a snapshot
/// is dropped with a warning.
#[derive(Debug, Default)]
struct FeedDecoder {
    pending: String,
    line_no: usize,
}

impl FeedDecoder {
    fn push_line(&mut self, line: &str) -> Vec<StatusSnapshot> {
        self.line_no += 1;
        self.pending.push_str(line);
        self.pending.push('\n');

        let mut decoded = Vec::new();
        let mut consumed = 0;
        let mut stream =
            serde_json::Deserializer::from_str(&self.pending).into_iter::<StatusSnapshot>();
        loop {
            match stream.next() {
                Some(Ok(snapshot)) => {
                    decoded.push(snapshot);
                    consumed = stream.byte_offset();
                }
                // Document continues on a later line.
                Some(Err(err)) if err.is_eof() => break,
                Some(Err(err)) => {
                    warn!(event = "feed_input_skipped", line = self.line_no, error = %err);
                    consumed = self.pending.len();
                    break;
                }
                None => {
                    consumed = self.pending.len();
                    break;
                }
            }
        }
        drop(stream);
        self.pending.drain(..consumed);
        decoded
    }

    fn finish(&mut self) {
        if !self.pending.trim().is_empty() {
            warn!(event = "feed_truncated", line = self.line_no);
        }
        self.pending.clear();
    }
}
