//! Merge run summary.

use std::time::Duration;

use chrono::{DateTime, Local};
use tracing::info;

use super::executor::TierStats;

/// Statistics for one tier of a finished run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierReport {
    pub priority: u32,
    pub label: String,
    pub stats: TierStats,
}

/// Outcome of a merge run.
#[derive(Debug, Clone)]
pub struct MergeSummary {
    /// When the run started
    pub started_at: DateTime<Local>,
    /// Wall time of the run
    pub elapsed: Duration,
    /// Tiers processed, in priority order
    pub tiers: Vec<TierReport>,
    /// Progress total fixed before tier 0
    pub total_planned: u64,
    /// Statistics over all tiers
    pub totals: TierStats,
    /// Files present in the output tree after the run
    pub distinct_files: usize,
    /// Empty directories removed from the output tree
    pub pruned_dirs: usize,
    /// Whether the run stopped early
    pub cancelled: bool,
}

impl MergeSummary {
    /// Copy attempts issued across all tiers.
    pub fn attempted(&self) -> usize {
        self.totals.attempted
    }

    /// Attempts whose output was replaced by a later write (or never
    /// produced a file).
    pub fn overwritten(&self) -> usize {
        self.totals.attempted.saturating_sub(self.distinct_files)
    }

    /// Whether any per-file problem was recorded.
    pub fn has_problems(&self) -> bool {
        self.totals.failed > 0 || self.totals.unresolved > 0
    }

    /// Emit the summary lines to the log.
    pub fn log(&self) {
        info!(
            "Merge summary: attempted={} distinct={}",
            self.attempted(),
            self.distinct_files
        );

        if self.attempted() != self.distinct_files {
            info!(
                overwritten = self.overwritten(),
                failed = self.totals.failed,
                unresolved = self.totals.unresolved,
                "Attempted and distinct counts differ: higher tiers replaced lower-tier files"
            );
        }

        info!(
            tiers = self.tiers.len(),
            copied = self.totals.copied,
            fallbacks = self.totals.fallbacks,
            pruned_dirs = self.pruned_dirs,
            cancelled = self.cancelled,
            elapsed_secs = self.elapsed.as_secs_f64(),
            "Merge finished"
        );
    }

    /// Human-readable report.
    pub fn to_text(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!(
            "Merge started {}",
            self.started_at.format("%Y-%m-%d %H:%M:%S")
        ));
        if self.cancelled {
            lines.push("Status:       cancelled (output is partial)".to_string());
        } else {
            lines.push("Status:       complete".to_string());
        }
        lines.push(String::new());

        lines.push(format!(
            "  {:>4}  {:<30} {:>8} {:>8} {:>8} {:>8} {:>8}",
            "tier", "label", "copied", "failed", "unres", "fallbk", "skipped"
        ));
        for tier in &self.tiers {
            lines.push(format!(
                "  {:>4}  {:<30} {:>8} {:>8} {:>8} {:>8} {:>8}",
                tier.priority,
                truncate(&tier.label, 30),
                tier.stats.copied,
                tier.stats.failed,
                tier.stats.unresolved,
                tier.stats.fallbacks,
                tier.stats.cancelled,
            ));
        }
        lines.push(String::new());

        lines.push(format!("Attempted:    {}", self.attempted()));
        lines.push(format!("Planned:      {}", self.total_planned));
        lines.push(format!("Distinct:     {}", self.distinct_files));
        lines.push(format!("Overwritten:  {}", self.overwritten()));
        lines.push(format!("Pruned dirs:  {}", self.pruned_dirs));
        lines.push(format!("Elapsed:      {:.1}s", self.elapsed.as_secs_f64()));

        lines.join("\n")
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}
