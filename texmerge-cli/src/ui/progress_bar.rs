//! Terminal progress bar for merge runs.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use texmerge::merge::{ProgressSink, ProgressSnapshot};

/// Progress sink drawing an `indicatif` bar on stderr.
pub struct BarProgressSink {
    bar: ProgressBar,
}

impl BarProgressSink {
    pub fn new() -> Self {
        let bar = ProgressBar::with_draw_target(Some(0), ProgressDrawTarget::stderr());
        let style = ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) | {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-");
        bar.set_style(style);
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar }
    }
}

impl Default for BarProgressSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for BarProgressSink {
    fn render(&self, snapshot: &ProgressSnapshot) {
        self.bar.set_length(snapshot.total);
        self.bar.set_position(snapshot.completed);

        if snapshot.is_final {
            self.bar.finish_with_message(format!(
                "{} files in {:.1}s",
                snapshot.completed,
                snapshot.elapsed.as_secs_f64()
            ));
        } else {
            self.bar
                .set_message(format!("{:.0} files/s", snapshot.files_per_second));
        }
    }
}

impl Drop for BarProgressSink {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.abandon();
        }
    }
}
