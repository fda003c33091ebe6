// file: src/pipeline/progress.rs
// description: progress tracking and statistics reporting for index rebuilds
// reference: uses indicatif for progress bars and tracks projection outcomes

use colored::Colorize;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PipelineStats {
    pub documents_indexed: usize,
    pub documents_unchanged: usize,
    pub documents_removed: usize,
    pub entities_skipped: usize,
    pub entities_failed: usize,
    pub duration_secs: u64,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entities_seen(&self) -> usize {
        self.documents_indexed
            + self.documents_unchanged
            + self.documents_removed
            + self.entities_skipped
            + self.entities_failed
    }

    pub fn entities_per_second(&self) -> f64 {
        if self.duration_secs == 0 {
            return 0.0;
        }
        self.entities_seen() as f64 / self.duration_secs as f64
    }

    pub fn success_rate(&self) -> f64 {
        let total = self.entities_seen();
        if total == 0 {
            return 0.0;
        }
        ((total - self.entities_failed) as f64 / total as f64) * 100.0
    }

    pub fn summary(&self) -> String {
        format!(
            "{} indexed, {} unchanged, {} removed, {} skipped, {}",
            self.documents_indexed.to_string().green(),
            self.documents_unchanged,
            self.documents_removed.to_string().yellow(),
            self.entities_skipped,
            format!("{} failed", self.entities_failed).red()
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Indexed,
    Unchanged,
    Removed,
    Skipped,
    Failed,
}

pub struct ProgressTracker {
    main_bar: ProgressBar,
    detail_bar: ProgressBar,
    counters: [AtomicUsize; 5],
    start_time: Instant,
}

impl ProgressTracker {
    pub fn new(total: usize) -> Self {
        Self::with_color(total, true)
    }

    pub fn with_color(total: usize, colored: bool) -> Self {
        Self::build(MultiProgress::new(), total, colored)
    }

    /// Tracker that counts without drawing.
    pub fn hidden(total: usize) -> Self {
        Self::build(
            MultiProgress::with_draw_target(ProgressDrawTarget::hidden()),
            total,
            false,
        )
    }

    fn build(multi_progress: MultiProgress, total: usize, colored: bool) -> Self {
        let main_bar = create_progress_bar(&multi_progress, total as u64, colored);
        let detail_bar = create_detail_bar(&multi_progress);

        Self {
            main_bar,
            detail_bar,
            counters: Default::default(),
            start_time: Instant::now(),
        }
    }

    pub fn record(&self, outcome: Outcome) {
        self.counter(outcome).fetch_add(1, Ordering::SeqCst);
        self.main_bar.inc(1);
        self.update_detail_bar();
    }

    pub fn set_message(&self, message: String) {
        self.main_bar.set_message(message);
    }

    pub fn finish(&self) {
        self.main_bar.finish_with_message("Projection complete");
        self.detail_bar.finish_and_clear();
    }

    pub fn get_stats(&self) -> PipelineStats {
        PipelineStats {
            documents_indexed: self.load(Outcome::Indexed),
            documents_unchanged: self.load(Outcome::Unchanged),
            documents_removed: self.load(Outcome::Removed),
            entities_skipped: self.load(Outcome::Skipped),
            entities_failed: self.load(Outcome::Failed),
            duration_secs: self.start_time.elapsed().as_secs(),
        }
    }

    fn counter(&self, outcome: Outcome) -> &AtomicUsize {
        let slot = match outcome {
            Outcome::Indexed => 0,
            Outcome::Unchanged => 1,
            Outcome::Removed => 2,
            Outcome::Skipped => 3,
            Outcome::Failed => 4,
        };
        &self.counters[slot]
    }

    fn load(&self, outcome: Outcome) -> usize {
        self.counter(outcome).load(Ordering::SeqCst)
    }

    fn update_detail_bar(&self) {
        let message = format!(
            "Indexed: {} | Removed: {} | Failed: {}",
            self.load(Outcome::Indexed),
            self.load(Outcome::Removed),
            self.load(Outcome::Failed)
        );

        self.detail_bar.set_message(message);
    }
}

impl Drop for ProgressTracker {
    fn drop(&mut self) {
        self.finish();
    }
}

fn create_progress_bar(multi_progress: &MultiProgress, total: u64, colored: bool) -> ProgressBar {
    let bar = multi_progress.add(ProgressBar::new(total));
    let (template, chars) = if colored {
        (
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}",
            "█▓▒░",
        )
    } else {
        (
            "{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({eta}) {msg}",
            "=>-",
        )
    };
    let style = ProgressStyle::default_bar()
        .template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars(chars);
    bar.set_style(style);
    bar
}

fn create_detail_bar(multi_progress: &MultiProgress) -> ProgressBar {
    let bar = multi_progress.add(ProgressBar::new(0));
    let style = ProgressStyle::default_bar()
        .template("{msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    bar.set_style(style);
    bar
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_stats_calculations() {
        let mut stats = PipelineStats::new();
        stats.documents_indexed = 80;
        stats.documents_removed = 10;
        stats.entities_failed = 10;
        stats.duration_secs = 10;

        assert_eq!(stats.entities_seen(), 100);
        assert_eq!(stats.entities_per_second(), 10.0);
        assert!((stats.success_rate() - 90.0).abs() < 0.01);
    }

    #[test]
    fn test_pipeline_stats_zero_duration() {
        let stats = PipelineStats::new();
        assert_eq!(stats.entities_per_second(), 0.0);
        assert_eq!(stats.success_rate(), 0.0);
    }

    #[test]
    fn test_progress_tracker_counts_outcomes() {
        let tracker = ProgressTracker::hidden(4);

        tracker.record(Outcome::Indexed);
        tracker.record(Outcome::Indexed);
        tracker.record(Outcome::Removed);
        tracker.record(Outcome::Failed);

        let stats = tracker.get_stats();
        assert_eq!(stats.documents_indexed, 2);
        assert_eq!(stats.documents_removed, 1);
        assert_eq!(stats.entities_failed, 1);
        assert_eq!(stats.entities_skipped, 0);
    }
}
