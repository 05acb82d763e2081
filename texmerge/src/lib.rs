//! texmerge - Priority-ordered texture overlay merging
//!
//! This library merges a base game asset tree and an ordered list of mod
//! trees into a single output tree where, for every asset path, the file
//! from the highest-priority mod wins. Files are copied in parallel within a
//! tier; tiers are applied strictly in priority order.

pub mod config;
pub mod error;
pub mod logging;
pub mod manifest;
pub mod merge;

pub use error::{MergeError, MergeResult};
pub use merge::{MergeSummary, OverlayMerger};

/// Version of the texmerge library.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
