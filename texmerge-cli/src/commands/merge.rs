//! Merge command - build the merged texture tree.

use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;

use texmerge::logging::{init_logging, LoggingOptions};
use texmerge::merge::{LogProgressSink, OverlayMerger, ProgressSink};
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::common::{resolve_merge_config, SourceArgs};
use crate::error::CliError;
use crate::ui::BarProgressSink;

/// Arguments for the merge command.
pub struct MergeArgs {
    pub source: SourceArgs,
    pub log_file: Option<PathBuf>,
    pub clean: bool,
    pub no_prune: bool,
    pub no_progress: bool,
    pub verbose: bool,
}

/// Run the merge command.
pub fn run(args: MergeArgs) -> Result<(), CliError> {
    let (file, mut config) = resolve_merge_config(&args.source)?;
    if args.clean {
        config = config.with_clean_output(true);
    }
    if args.no_prune {
        config = config.with_prune_empty_dirs(false);
    }

    let show_bar = !args.no_progress && std::io::stderr().is_terminal();
    let log_file = args.log_file.or_else(|| file.paths.log_file.clone());

    let _logging = init_logging(LoggingOptions {
        log_file: log_file.clone(),
        verbose: args.verbose,
        quiet_console: show_bar,
    })?;

    info!(version = texmerge::VERSION, "texmerge starting");

    println!("texmerge v{}", texmerge::VERSION);
    println!("=============");
    println!();
    println!("Base:     {}", config.base_dir.display());
    match &config.manifest {
        Some(source) => println!(
            "Manifest: {} ({})",
            source.path.display(),
            source.format.name()
        ),
        None => println!("Manifest: none (base tree only)"),
    }
    println!("Output:   {}", config.output_asset_root().display());
    println!("Threads:  {}", config.threads);
    if let Some(path) = &log_file {
        println!("Log file: {}", path.display());
    }
    println!();
    println!("Press Ctrl+C to stop after the files being copied");
    println!();

    let cancellation = CancellationToken::new();
    let cancel_on_signal = cancellation.clone();
    ctrlc::set_handler(move || {
        eprintln!();
        eprintln!("Received interrupt, finishing in-flight copies...");
        cancel_on_signal.cancel();
    })
    .map_err(|e| CliError::SignalHandler(e.to_string()))?;

    let sink: Arc<dyn ProgressSink> = if show_bar {
        Arc::new(BarProgressSink::new())
    } else {
        Arc::new(LogProgressSink)
    };

    let summary = OverlayMerger::new(config)?
        .with_progress_sink(sink)
        .run(cancellation)?;

    println!();
    println!("{}", summary.to_text());

    if summary.cancelled {
        println!();
        println!("Merge was cancelled; the output tree is incomplete.");
    } else if summary.has_problems() {
        println!();
        println!("Some files could not be merged; see the log for details.");
    }

    Ok(())
}
