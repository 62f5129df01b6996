//! Progress display for import passes

use super::report::PassReport;
use crate::types::EntityType;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Instant;

/// Spinner for one entity-type pass
pub struct PassProgress {
    /// Spinner (None if running in quiet mode)
    progress_bar: Option<ProgressBar>,
    entity_type: EntityType,
    start_time: Instant,
}

impl PassProgress {
    pub fn new(entity_type: EntityType, quiet: bool) -> Self {
        let progress_bar = if !quiet {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} [{elapsed_precise}] {prefix:>9} {pos} items {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            pb.set_prefix(entity_type.as_str());
            Some(pb)
        } else {
            None
        };

        Self {
            progress_bar,
            entity_type,
            start_time: Instant::now(),
        }
    }

    /// Update after each record
    pub fn item_processed(&self, report: &PassReport) {
        if let Some(ref pb) = self.progress_bar {
            pb.set_position(report.processed as u64);

            let elapsed = self.start_time.elapsed().as_secs_f64();
            let rate = if elapsed > 0.0 {
                report.processed as f64 / elapsed
            } else {
                0.0
            };

            pb.set_message(format!(
                "| {:.1} items/s | {} failed",
                rate,
                report.failed.len()
            ));
        }
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.start_time.elapsed().as_secs_f64()
    }

    /// Finish the spinner
    pub fn finish(&self, report: &PassReport) {
        if let Some(ref pb) = self.progress_bar {
            let message = match report.stream_error {
                Some(_) => format!(
                    "stopped early: {} imported, {} failed",
                    report.imported,
                    report.failed.len()
                ),
                None => format!(
                    "done: {} imported, {} skipped, {} failed",
                    report.imported,
                    report.skipped,
                    report.failed.len()
                ),
            };
            pb.finish_with_message(message);
        }
    }
}

impl std::fmt::Debug for PassProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PassProgress")
            .field("entity_type", &self.entity_type)
            .field("quiet", &self.progress_bar.is_none())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_progress_tracks_time_only() {
        let progress = PassProgress::new(EntityType::Term, true);
        let mut report = PassReport::new(EntityType::Term);
        report.processed = 3;

        progress.item_processed(&report);
        progress.finish(&report);
        assert!(progress.elapsed_seconds() >= 0.0);
        assert!(progress.progress_bar.is_none());
    }
}
