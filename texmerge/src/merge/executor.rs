//! Bounded-concurrency copy execution for a single tier.
//!
//! The executor owns a fixed-size rayon pool. For each tier the sequencer
//! hands over the tier's records; the pool drains them, and
//! [`CopyExecutor::execute`] returns only when every worker has finished.
//!
//! Per record:
//!
//! 1. Resolve the merge key (see [`PathResolver`]).
//! 2. Create the destination's parent directory if missing.
//! 3. Copy the file, overwriting any existing output entry.
//! 4. Bump the shared [`ProgressCounter`], whatever the outcome.
//!
//! Failures are logged with the offending path and the failed step; they
//! never stop the tier.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::progress::ProgressCounter;
use super::resolver::PathResolver;
use super::tier::{FileRecord, Tier};
use crate::error::{MergeError, MergeResult};

/// Result of one copy attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyOutcome {
    /// Copied under a structured key.
    Copied,
    /// Copied under a base-name fallback key.
    CopiedWithFallback,
    /// No key could be derived; nothing was written.
    Unresolved,
    /// Directory creation or copy failed.
    Failed,
}

/// Per-tier copy statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TierStats {
    /// Records handed to the executor.
    pub records: usize,
    /// Copy attempts issued (one progress increment each).
    pub attempted: usize,
    /// Files written to the output tree.
    pub copied: usize,
    /// Files written under a base-name fallback key (subset of `copied`).
    pub fallbacks: usize,
    /// Records skipped because no key could be derived.
    pub unresolved: usize,
    /// Records whose directory creation or copy failed.
    pub failed: usize,
    /// Records never attempted because the run was cancelled.
    pub cancelled: usize,
}

impl TierStats {
    /// Accumulate another tier's statistics.
    pub fn add(&mut self, other: &TierStats) {
        self.records += other.records;
        self.attempted += other.attempted;
        self.copied += other.copied;
        self.fallbacks += other.fallbacks;
        self.unresolved += other.unresolved;
        self.failed += other.failed;
        self.cancelled += other.cancelled;
    }
}

/// Lock-free counters updated by workers while a tier runs.
#[derive(Debug, Default)]
struct TierCounters {
    attempted: AtomicUsize,
    copied: AtomicUsize,
    fallbacks: AtomicUsize,
    unresolved: AtomicUsize,
    failed: AtomicUsize,
    cancelled: AtomicUsize,
}

impl TierCounters {
    fn record(&self, outcome: CopyOutcome) {
        self.attempted.fetch_add(1, Ordering::Relaxed);
        let counter = match outcome {
            CopyOutcome::Copied => &self.copied,
            CopyOutcome::CopiedWithFallback => {
                self.fallbacks.fetch_add(1, Ordering::Relaxed);
                &self.copied
            }
            CopyOutcome::Unresolved => &self.unresolved,
            CopyOutcome::Failed => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self, records: usize) -> TierStats {
        TierStats {
            records,
            attempted: self.attempted.load(Ordering::Relaxed),
            copied: self.copied.load(Ordering::Relaxed),
            fallbacks: self.fallbacks.load(Ordering::Relaxed),
            unresolved: self.unresolved.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
        }
    }
}

/// Copies tier records into the output tree through a bounded worker pool.
pub struct CopyExecutor {
    pool: ThreadPool,
    concurrency: usize,
    resolver: PathResolver,
    destination_root: PathBuf,
    counter: Arc<ProgressCounter>,
    cancellation: CancellationToken,
}

impl CopyExecutor {
    /// Create an executor with `concurrency` workers.
    ///
    /// `destination_root` is the output asset root: a record with key
    /// `armor/iron.dds` lands at `destination_root/armor/iron.dds`.
    pub fn new(
        concurrency: usize,
        resolver: PathResolver,
        destination_root: impl Into<PathBuf>,
        counter: Arc<ProgressCounter>,
        cancellation: CancellationToken,
    ) -> MergeResult<Self> {
        if concurrency == 0 {
            return Err(MergeError::InvalidThreadCount(concurrency));
        }

        let pool = ThreadPoolBuilder::new()
            .num_threads(concurrency)
            .thread_name(|i| format!("texmerge-copy-{}", i))
            .build()
            .map_err(|e| MergeError::WorkerPool(e.to_string()))?;

        Ok(Self {
            pool,
            concurrency,
            resolver,
            destination_root: destination_root.into(),
            counter,
            cancellation,
        })
    }

    /// Number of workers in the pool.
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Output asset root.
    pub fn destination_root(&self) -> &Path {
        &self.destination_root
    }

    /// Copy all records of `tier`, returning once every worker is done.
    ///
    /// After cancellation no new copies start; copies already running
    /// complete normally.
    pub fn execute(&self, tier: &Tier, records: Vec<FileRecord>) -> TierStats {
        let counters = TierCounters::default();
        let record_count = records.len();

        info!(tier = %tier, records = record_count, "Copying tier");

        self.pool.install(|| {
            records.par_iter().for_each(|record| {
                if self.cancellation.is_cancelled() {
                    counters.cancelled.fetch_add(1, Ordering::Relaxed);
                    return;
                }

                let outcome = self.copy_record(record);
                counters.record(outcome);
                self.counter.increment();
            });
        });

        let stats = counters.snapshot(record_count);
        info!(
            tier = %tier,
            copied = stats.copied,
            failed = stats.failed,
            unresolved = stats.unresolved,
            fallbacks = stats.fallbacks,
            cancelled = stats.cancelled,
            "Tier complete"
        );
        stats
    }

    /// Resolve, create the parent directory, and copy one record.
    pub fn copy_record(&self, record: &FileRecord) -> CopyOutcome {
        let resolution = match self.resolver.resolve(&record.path, &record.tier.root) {
            Ok(resolution) => resolution,
            Err(e) => {
                error!(
                    tier = %record.tier,
                    path = %record.path.display(),
                    error = %e,
                    "Skipping file: merge key resolution failed"
                );
                return CopyOutcome::Unresolved;
            }
        };

        let destination = self.destination_root.join(resolution.key.to_path());

        if let Some(parent) = destination.parent() {
            // create_dir_all tolerates a concurrent worker creating the same directory
            if let Err(e) = fs::create_dir_all(parent) {
                error!(
                    source = %record.path.display(),
                    directory = %parent.display(),
                    error = %e,
                    "Failed to create directory"
                );
                return CopyOutcome::Failed;
            }
        }

        if is_same_file(&record.path, &destination) {
            error!(
                source = %record.path.display(),
                destination = %destination.display(),
                "Refusing to copy file onto itself"
            );
            return CopyOutcome::Failed;
        }

        if let Err(e) = fs::copy(&record.path, &destination) {
            error!(
                source = %record.path.display(),
                destination = %destination.display(),
                error = %e,
                "Failed to copy file"
            );
            return CopyOutcome::Failed;
        }

        debug!(
            source = %record.path.display(),
            key = %resolution.key,
            "Copied"
        );

        if resolution.is_fallback() {
            CopyOutcome::CopiedWithFallback
        } else {
            CopyOutcome::Copied
        }
    }
}

/// Whether both paths name the same existing file.
fn is_same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
