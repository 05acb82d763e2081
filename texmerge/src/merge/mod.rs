//! Priority overlay merge engine.
//!
//! Merges a base asset tree and an ordered list of mod trees into one output
//! tree holding, for every merge key, the file from the highest-priority tier
//! that provides it.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       OverlayMerger                          │
//! │   tiers 0..M, strictly in order                              │
//! │                                                              │
//! │   WorkEnumerator ──► MergePlan ──► CopyExecutor (rayon)      │
//! │                                     │  PathResolver per file │
//! │                                     ▼                        │
//! │                              ProgressCounter ◄── Monitor     │
//! └──────────────────────────────────────────────────────────────┘
//!                                │
//!                                ▼
//!                   <output>/<asset_dir>/<key>
//! ```
//!
//! # Example
//!
//! ```ignore
//! use texmerge::config::MergeConfig;
//! use texmerge::manifest::ManifestFormat;
//! use texmerge::merge::OverlayMerger;
//! use tokio_util::sync::CancellationToken;
//!
//! let config = MergeConfig::new("/games/Skyrim/Data", "/mo2/mods/Merged")
//!     .with_manifest("/cfg/order.json", ManifestFormat::Json)
//!     .with_threads(8);
//!
//! let summary = OverlayMerger::new(config)?.run(CancellationToken::new())?;
//! println!("{} distinct files", summary.distinct_files);
//! ```

pub mod enumerator;
pub mod executor;
pub mod finalize;
pub mod progress;
pub mod resolver;
pub mod sequencer;
pub mod summary;
pub mod tier;

pub use enumerator::{ExtensionFilter, TierFiles, WorkEnumerator, DEFAULT_EXTENSIONS};
pub use executor::{CopyExecutor, CopyOutcome, TierStats};
pub use finalize::{count_files, prune_empty_dirs};
pub use progress::{
    render_bar, LogProgressSink, NullProgressSink, ProgressCounter, ProgressMonitor,
    ProgressSink, ProgressSnapshot, DEFAULT_POLL_INTERVAL,
};
pub use resolver::{
    KeySource, PathResolver, RelativeKey, Resolution, ResolveError, DEFAULT_ASSET_DIR,
};
pub use sequencer::{MergePlan, MergeState, OverlayMerger, StateCallback};
pub use summary::{MergeSummary, TierReport};
pub use tier::{FileRecord, Tier, BASE_PRIORITY};
