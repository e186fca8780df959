//! Progress and failure reporting for a variation pass.
//!
//! The store never logs on its own; it reports through a `Reporter` handed
//! to it by the caller. `main` wires a `TracingReporter`, optionally behind
//! a `ProgressReporter`, after the subscriber has been installed.

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, info, warn};

use crate::store::StoreError;

pub trait Reporter {
    /// Distinct values read from the source column, before filtering.
    fn found(&self, table: &str, count: usize);

    /// Called once per source value, skipped ones included.
    fn value_done(&self, _table: &str) {}

    /// A batch was committed; `processed` counts source values so far.
    fn batch_committed(&self, table: &str, processed: usize);

    /// A single variation row was rejected by a constraint. The pass continues.
    fn row_conflict(&self, table: &str, original: &str, variation: &str, err: &rusqlite::Error);

    /// Row count of the derived table after the final commit.
    fn finished(&self, table: &str, total_variations: u64);

    /// The pass for `table` was aborted.
    fn failed(&self, table: &str, err: &StoreError);

    /// Closing the connection failed after the pass.
    fn close_failed(&self, table: &str, err: &rusqlite::Error) {
        warn!(table, error = %err, "failed to close database connection");
    }
}

/// Emits structured `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn found(&self, table: &str, count: usize) {
        info!(table, count = count as u64, "found {} items in table {}", count, table);
    }

    fn batch_committed(&self, table: &str, processed: usize) {
        info!(table, processed = processed as u64, "processed {} items", processed);
    }

    fn row_conflict(&self, table: &str, original: &str, variation: &str, err: &rusqlite::Error) {
        warn!(
            table,
            original,
            variation,
            error = %err,
            "failed to insert variation '{}' for '{}'",
            variation,
            original
        );
    }

    fn finished(&self, table: &str, total_variations: u64) {
        info!(
            table,
            total_variations,
            "total variations generated and stored: {}",
            total_variations
        );
    }

    fn failed(&self, table: &str, err: &StoreError) {
        error!(table, error = %err, "failed to process table {}", table);
        debug!(table, error = ?err, "failure detail");
    }
}

/// Draws a progress bar over source values and forwards every event to
/// `inner` with the bar suspended, so log lines do not tear it.
pub struct ProgressReporter<R> {
    bar: ProgressBar,
    inner: R,
}

impl<R: Reporter> ProgressReporter<R> {
    pub fn new(inner: R) -> Self {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        bar.set_style(style);
        Self { bar, inner }
    }
}

impl<R: Reporter> Reporter for ProgressReporter<R> {
    fn found(&self, table: &str, count: usize) {
        self.bar.set_length(count as u64);
        self.bar.set_message(format!("Generating variations for {}...", table));
        self.bar.suspend(|| self.inner.found(table, count));
    }

    fn value_done(&self, table: &str) {
        self.bar.inc(1);
        self.inner.value_done(table);
    }

    fn batch_committed(&self, table: &str, processed: usize) {
        self.bar.suspend(|| self.inner.batch_committed(table, processed));
    }

    fn row_conflict(&self, table: &str, original: &str, variation: &str, err: &rusqlite::Error) {
        self.bar
            .suspend(|| self.inner.row_conflict(table, original, variation, err));
    }

    fn finished(&self, table: &str, total_variations: u64) {
        self.bar.finish_with_message("Done");
        self.inner.finished(table, total_variations);
    }

    fn failed(&self, table: &str, err: &StoreError) {
        self.bar.abandon_with_message("Failed");
        self.inner.failed(table, err);
    }

    fn close_failed(&self, table: &str, err: &rusqlite::Error) {
        self.inner.close_failed(table, err);
    }
}
