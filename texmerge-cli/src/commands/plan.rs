//! Plan command - show what a merge would copy.

use texmerge::logging::{init_logging, LoggingOptions};
use texmerge::merge::OverlayMerger;

use super::common::{resolve_merge_config, SourceArgs};
use crate::error::CliError;

/// Run the plan command.
pub fn run(source: SourceArgs, verbose: bool) -> Result<(), CliError> {
    let (_, config) = resolve_merge_config(&source)?;

    let _logging = init_logging(LoggingOptions {
        log_file: None,
        verbose,
        quiet_console: false,
    })?;

    let merger = OverlayMerger::new(config)?;
    let plan = merger.plan()?;

    println!("Merge plan ({} tiers)", plan.tier_count());
    println!();
    println!("  {:>4}  {:<30} {:>8}  Scanned directory", "Tier", "Label", "Files");
    for (tier, count) in plan.tier_counts() {
        println!(
            "  {:>4}  {:<30} {:>8}  {}",
            tier.priority,
            tier.label,
            count,
            tier.scan_root.display()
        );
    }
    println!();
    println!("Copy attempts: {}", plan.total());
    println!(
        "Output:        {}",
        merger.config().output_asset_root().display()
    );

    Ok(())
}
