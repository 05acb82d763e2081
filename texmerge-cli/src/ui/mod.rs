//! Terminal output for the texmerge CLI.

pub mod progress_bar;

pub use progress_bar::BarProgressSink;
