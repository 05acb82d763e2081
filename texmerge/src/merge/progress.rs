//! Progress aggregation for parallel copies.
//!
//! Workers share a [`ProgressCounter`] and bump it once per copy attempt. A
//! dedicated monitor thread polls the counter, derives throughput from the
//! delta since its last poll, and hands a [`ProgressSnapshot`] to a
//! [`ProgressSink`] for display.
//!
//! ```text
//! worker ─┐
//! worker ─┼─► ProgressCounter (mutex) ◄── poll ── ProgressMonitor ──► ProgressSink
//! worker ─┘                                                           (log, bar, …)
//! ```
//!
//! The monitor only reads the counter and never holds the lock across a
//! render, so a slow sink cannot stall the copy workers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{info, warn};

/// Default interval between monitor polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Width of the text bar produced by [`render_bar`].
const BAR_WIDTH: usize = 30;

/// Shared count of completed copy attempts.
///
/// The total is fixed at construction. Increments go through a mutex so no
/// update is lost under concurrent writers.
#[derive(Debug)]
pub struct ProgressCounter {
    total: u64,
    completed: Mutex<u64>,
    done: AtomicBool,
}

impl ProgressCounter {
    /// Create a counter at zero with a fixed total.
    pub fn new(total: u64) -> Self {
        Self {
            total,
            completed: Mutex::new(0),
            done: AtomicBool::new(false),
        }
    }

    /// Add one completed attempt and return the new value.
    pub fn increment(&self) -> u64 {
        let mut completed = self.completed.lock();
        *completed += 1;
        *completed
    }

    /// Current number of completed attempts.
    pub fn completed(&self) -> u64 {
        *self.completed.lock()
    }

    /// Expected number of attempts.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Signal that no further increments will happen.
    pub fn signal_done(&self) {
        self.done.store(true, Ordering::SeqCst);
    }

    /// Whether the owning pipeline has finished.
    pub fn is_done(&self) -> bool {
        self.done.load(Ordering::SeqCst)
    }

    /// Whether every expected attempt has completed.
    pub fn is_complete(&self) -> bool {
        self.completed() >= self.total
    }
}

/// Point-in-time view of progress handed to a sink.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSnapshot {
    /// Completed copy attempts.
    pub completed: u64,

    /// Expected copy attempts.
    pub total: u64,

    /// Files per second since the previous snapshot.
    pub files_per_second: f64,

    /// Time since the monitor started.
    pub elapsed: Duration,

    /// Set on the single render performed at termination.
    pub is_final: bool,
}

impl ProgressSnapshot {
    /// Completion percentage in `[0, 100]`. An empty run counts as done.
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        (self.completed.min(self.total) as f64 / self.total as f64) * 100.0
    }
}

/// Receives progress snapshots from the monitor.
pub trait ProgressSink: Send + Sync {
    fn render(&self, snapshot: &ProgressSnapshot);
}

/// Sink that reports progress through the log.
#[derive(Debug, Default)]
pub struct LogProgressSink;

impl ProgressSink for LogProgressSink {
    fn render(&self, snapshot: &ProgressSnapshot) {
        info!(
            completed = snapshot.completed,
            total = snapshot.total,
            files_per_second = %format!("{:.1}", snapshot.files_per_second),
            "{}",
            render_bar(snapshot)
        );
    }
}

/// Sink that discards every snapshot.
#[derive(Debug, Default)]
pub struct NullProgressSink;

impl ProgressSink for NullProgressSink {
    fn render(&self, _snapshot: &ProgressSnapshot) {}
}

/// Render a fixed-width text bar, e.g. `[#########.....]  60.0% (6/10)`.
pub fn render_bar(snapshot: &ProgressSnapshot) -> String {
    let percent = snapshot.percent();
    let filled = ((percent / 100.0) * BAR_WIDTH as f64).round() as usize;
    format!(
        "[{}{}] {:5.1}% ({}/{})",
        "#".repeat(filled),
        ".".repeat(BAR_WIDTH - filled.min(BAR_WIDTH)),
        percent,
        snapshot.completed,
        snapshot.total
    )
}

/// Background thread that polls a [`ProgressCounter`] and renders snapshots.
///
/// The monitor stops once the counter reaches its total or the pipeline
/// signals completion, then performs exactly one final render.
pub struct ProgressMonitor {
    handle: Option<JoinHandle<()>>,
    counter: Arc<ProgressCounter>,
}

impl ProgressMonitor {
    /// Start monitoring `counter`, rendering every `poll_interval`.
    pub fn start(
        counter: Arc<ProgressCounter>,
        sink: Arc<dyn ProgressSink>,
        poll_interval: Duration,
    ) -> Self {
        let counter_clone = Arc::clone(&counter);

        let spawned = thread::Builder::new()
            .name("texmerge-progress".to_string())
            .spawn(move || {
                let started = Instant::now();
                let mut last_count = counter_clone.completed();
                let mut last_poll = started;

                loop {
                    thread::park_timeout(poll_interval);

                    let completed = counter_clone.completed();
                    if counter_clone.is_done() || completed >= counter_clone.total() {
                        break;
                    }

                    let now = Instant::now();
                    sink.render(&ProgressSnapshot {
                        completed,
                        total: counter_clone.total(),
                        files_per_second: rate(completed - last_count, now - last_poll),
                        elapsed: now - started,
                        is_final: false,
                    });
                    last_count = completed;
                    last_poll = now;
                }

                // Final report
                let completed = counter_clone.completed();
                let now = Instant::now();
                sink.render(&ProgressSnapshot {
                    completed,
                    total: counter_clone.total(),
                    files_per_second: rate(completed.saturating_sub(last_count), now - last_poll),
                    elapsed: now - started,
                    is_final: true,
                });
            });

        let handle = match spawned {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!(error = %e, "Failed to start progress monitor, progress will not be shown");
                None
            }
        };

        Self { handle, counter }
    }

    /// Signal completion and wait for the final render.
    pub fn finish(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.counter.signal_done();
        if let Some(handle) = self.handle.take() {
            handle.thread().unpark();
            handle.join().ok();
        }
    }
}

impl Drop for ProgressMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

fn rate(delta: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs <= f64::EPSILON {
        0.0
    } else {
        delta as f64 / secs
    }
}
