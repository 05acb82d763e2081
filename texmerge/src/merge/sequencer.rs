//! Priority-ordered orchestration of a merge run.
//!
//! The [`OverlayMerger`] drives the run:
//!
//! 1. Load the mod order manifest and build the tier list.
//! 2. Enumerate every tier into a [`MergePlan`], fixing the progress total.
//! 3. Copy tiers strictly in increasing priority; a tier starts only after
//!    the previous one has fully drained.
//! 4. Prune empty output directories, count the output, log a summary.
//!
//! ```text
//! Idle → Enumerating(0..M) → Copying(0) → … → Copying(M) → Finalizing → Done
//!                                  └──── cancel ────┘            └→ Cancelled
//! ```

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::Local;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::enumerator::{ExtensionFilter, WorkEnumerator};
use super::executor::{CopyExecutor, TierStats};
use super::finalize::{count_files, prune_empty_dirs};
use super::progress::{LogProgressSink, ProgressCounter, ProgressMonitor, ProgressSink};
use super::resolver::PathResolver;
use super::summary::{MergeSummary, TierReport};
use super::tier::{FileRecord, Tier};
use crate::config::MergeConfig;
use crate::error::{MergeError, MergeResult};
use crate::manifest::ModOrderManifest;

/// Phase of a merge run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeState {
    Idle,
    /// Listing the files of the tier with this priority.
    Enumerating { tier: u32 },
    /// Copying the files of the tier with this priority.
    Copying { tier: u32 },
    /// Pruning and counting the output tree.
    Finalizing,
    Done,
    /// Stopped early on request; the output is partial.
    Cancelled,
}

impl MergeState {
    /// Get a human-readable name for the state.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Enumerating { .. } => "Enumerating",
            Self::Copying { .. } => "Copying",
            Self::Finalizing => "Finalizing",
            Self::Done => "Done",
            Self::Cancelled => "Cancelled",
        }
    }
}

/// Observer for state transitions.
pub type StateCallback = Box<dyn Fn(MergeState) + Send + Sync>;

/// Enumerated work for a run: every tier with its records.
#[derive(Debug, Clone)]
pub struct MergePlan {
    tiers: Vec<(Arc<Tier>, Vec<FileRecord>)>,
}

impl MergePlan {
    /// Progress total: records across all tiers, including ones that will
    /// be overwritten by later tiers.
    pub fn total(&self) -> u64 {
        self.tiers.iter().map(|(_, records)| records.len() as u64).sum()
    }

    /// Tiers in priority order with their record counts.
    pub fn tier_counts(&self) -> impl Iterator<Item = (&Tier, usize)> {
        self.tiers
            .iter()
            .map(|(tier, records)| (tier.as_ref(), records.len()))
    }

    pub fn tier_count(&self) -> usize {
        self.tiers.len()
    }

    /// Records of one tier.
    pub fn records(&self, priority: u32) -> Option<&[FileRecord]> {
        self.tiers
            .iter()
            .find(|(tier, _)| tier.priority == priority)
            .map(|(_, records)| records.as_slice())
    }
}

/// Runs the overlay merge described by a [`MergeConfig`].
pub struct OverlayMerger {
    config: MergeConfig,
    resolver: PathResolver,
    enumerator: WorkEnumerator,
    sink: Arc<dyn ProgressSink>,
    state_callback: Option<StateCallback>,
}

impl OverlayMerger {
    /// Create a merger, rejecting invalid configuration up front.
    pub fn new(config: MergeConfig) -> MergeResult<Self> {
        config.validate()?;

        let resolver = PathResolver::new(config.asset_dir.clone()).with_fold_case(config.fold_case);
        let enumerator = WorkEnumerator::new(ExtensionFilter::new(&config.extensions));

        Ok(Self {
            config,
            resolver,
            enumerator,
            sink: Arc::new(LogProgressSink),
            state_callback: None,
        })
    }

    /// Render progress through `sink` instead of the log.
    pub fn with_progress_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Observe state transitions.
    pub fn with_state_callback(mut self, callback: StateCallback) -> Self {
        self.state_callback = Some(callback);
        self
    }

    pub fn config(&self) -> &MergeConfig {
        &self.config
    }

    /// Load the configured manifest, if any.
    ///
    /// A configured manifest that cannot be loaded is fatal.
    pub fn load_manifest(&self) -> MergeResult<Option<ModOrderManifest>> {
        let Some(source) = &self.config.manifest else {
            return Ok(None);
        };

        let manifest = ModOrderManifest::load(&source.path, &source.format)?;
        info!(
            path = %source.path.display(),
            format = source.format.name(),
            rows = manifest.len(),
            active = manifest.active_rows().count(),
            "Loaded mod order manifest"
        );
        Ok(Some(manifest))
    }

    /// Build the tier list: the base tree first, then one tier per active
    /// manifest row in row order.
    pub fn build_tiers(&self, manifest: Option<&ModOrderManifest>) -> Vec<Arc<Tier>> {
        let mut tiers = vec![Arc::new(Tier::base(
            &self.config.base_dir,
            &self.config.asset_dir,
        ))];

        if let Some(manifest) = manifest {
            for (position, row) in manifest.active_rows().enumerate() {
                tiers.push(Arc::new(Tier::overlay(
                    position as u32 + 1,
                    row.name.clone(),
                    &row.path,
                )));
            }
        }

        tiers
    }

    /// Load the manifest and enumerate every tier without copying.
    pub fn plan(&self) -> MergeResult<MergePlan> {
        let manifest = self.load_manifest()?;
        let tiers = self.build_tiers(manifest.as_ref());

        let mut planned = Vec::with_capacity(tiers.len());
        for tier in tiers {
            self.transition(MergeState::Enumerating {
                tier: tier.priority,
            });
            let records: Vec<FileRecord> = self.enumerator.enumerate(Arc::clone(&tier)).collect();
            debug!(tier = %tier, records = records.len(), "Enumerated tier");
            planned.push((tier, records));
        }

        Ok(MergePlan { tiers: planned })
    }

    /// Run the merge to completion or until `cancellation` fires.
    ///
    /// Only configuration, manifest, output overlap, worker pool and output
    /// cleaning failures return `Err`, always before the first copy.
    /// Everything else is logged and counted in the summary.
    pub fn run(&self, cancellation: CancellationToken) -> MergeResult<MergeSummary> {
        self.transition(MergeState::Idle);

        let started = Instant::now();
        let started_at = Local::now();
        let output_root = self.config.output_asset_root();

        info!(
            base = %self.config.base_dir.display(),
            output = %output_root.display(),
            threads = self.config.threads,
            "Starting merge"
        );

        let plan = self.plan()?;
        let total = plan.total();
        info!(tiers = plan.tier_count(), total, "Merge planned");

        ensure_output_separate(&output_root, plan.tiers.iter().map(|(tier, _)| tier.as_ref()))?;

        let counter = Arc::new(ProgressCounter::new(total));
        let executor = CopyExecutor::new(
            self.config.threads,
            self.resolver.clone(),
            &output_root,
            Arc::clone(&counter),
            cancellation.clone(),
        )?;

        if self.config.clean_output {
            clean_output(&output_root)?;
        }

        let monitor = ProgressMonitor::start(
            Arc::clone(&counter),
            Arc::clone(&self.sink),
            self.config.progress_interval,
        );

        let mut reports = Vec::with_capacity(plan.tier_count());
        let mut totals = TierStats::default();

        for (tier, records) in plan.tiers {
            let stats = if cancellation.is_cancelled() {
                TierStats {
                    records: records.len(),
                    cancelled: records.len(),
                    ..Default::default()
                }
            } else {
                self.transition(MergeState::Copying {
                    tier: tier.priority,
                });
                executor.execute(&tier, records)
            };

            totals.add(&stats);
            reports.push(TierReport {
                priority: tier.priority,
                label: tier.label.clone(),
                stats,
            });
        }

        monitor.finish();

        let cancelled = cancellation.is_cancelled();
        if cancelled {
            warn!(
                completed = counter.completed(),
                total,
                "Merge cancelled, output tree is partial"
            );
        }

        self.transition(MergeState::Finalizing);
        let pruned_dirs = if self.config.prune_empty_dirs && !cancelled {
            prune_empty_dirs(&output_root).unwrap_or_else(|e| {
                warn!(path = %output_root.display(), error = %e, "Failed to prune empty directories");
                0
            })
        } else {
            0
        };

        let summary = MergeSummary {
            started_at,
            elapsed: started.elapsed(),
            tiers: reports,
            total_planned: total,
            totals,
            distinct_files: count_files(&output_root),
            pruned_dirs,
            cancelled,
        };
        summary.log();

        self.transition(if cancelled {
            MergeState::Cancelled
        } else {
            MergeState::Done
        });

        Ok(summary)
    }

    fn transition(&self, state: MergeState) {
        debug!(state = state.name(), ?state, "Merge state");
        if let Some(callback) = &self.state_callback {
            callback(state);
        }
    }
}

/// Reject an output asset root that is equal to, inside, or above the scan
/// root of any tier. Such a run would copy files onto themselves.
fn ensure_output_separate<'a>(
    output_root: &Path,
    tiers: impl IntoIterator<Item = &'a Tier>,
) -> MergeResult<()> {
    let output = resolve_existing(output_root);

    for tier in tiers {
        let scanned = resolve_existing(&tier.scan_root);
        if output.starts_with(&scanned) || scanned.starts_with(&output) {
            return Err(MergeError::InvalidConfig(format!(
                "output directory {} overlaps the input of {} at {}",
                output_root.display(),
                tier,
                tier.scan_root.display()
            )));
        }
    }

    Ok(())
}

/// Absolute, symlink-free form of `path`. Only the deepest existing
/// ancestor is canonicalized, so paths that do not exist yet still compare.
fn resolve_existing(path: &Path) -> PathBuf {
    let absolute = if path.is_relative() {
        env::current_dir()
            .map(|dir| dir.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    } else {
        path.to_path_buf()
    };

    let mut missing = Vec::new();
    let mut current = absolute.as_path();
    loop {
        if let Ok(canonical) = fs::canonicalize(current) {
            return missing
                .iter()
                .rev()
                .fold(canonical, |resolved, name| resolved.join(name));
        }
        match (current.parent(), current.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                current = parent;
            }
            _ => return absolute,
        }
    }
}

fn clean_output(output_root: &Path) -> MergeResult<()> {
    match fs::remove_dir_all(output_root) {
        Ok(()) => {
            info!(path = %output_root.display(), "Removed previous output");
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(MergeError::CleanOutput {
            path: output_root.to_path_buf(),
            source,
        }),
    }
}
