//! Pass and run reports

use super::resolver::DeferredRelation;
use super::source::ImportError;
use crate::types::{EntityType, OriginId};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// A record that could not be imported
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemFailure {
    /// 1-based position of the record within its pass
    pub position: usize,
    /// Origin id, when the record got far enough to have one
    pub origin_id: Option<OriginId>,
    pub error: String,
}

/// Result of one entity-type pass
#[derive(Debug, Clone, Serialize)]
pub struct PassReport {
    pub entity_type: EntityType,
    /// Records read from the file (including failures)
    pub processed: usize,
    /// Records created in the host
    pub imported: usize,
    /// Records already imported by a previous run
    pub skipped: usize,
    /// Per-record failures in file order
    pub failed: Vec<ItemFailure>,
    /// Non-fatal problems (meta, translations, relations)
    pub warnings: Vec<String>,
    /// Set when the stream ended early
    pub stream_error: Option<String>,
    pub elapsed_seconds: f64,
}

impl PassReport {
    pub fn new(entity_type: EntityType) -> Self {
        Self {
            entity_type,
            processed: 0,
            imported: 0,
            skipped: 0,
            failed: Vec::new(),
            warnings: Vec::new(),
            stream_error: None,
            elapsed_seconds: 0.0,
        }
    }

    pub(crate) fn record_failure(
        &mut self,
        position: usize,
        origin_id: Option<OriginId>,
        error: &ImportError,
    ) {
        self.failed.push(ItemFailure {
            position,
            origin_id,
            error: error.to_string(),
        });
    }

    /// Records processed per second
    pub fn rate(&self) -> f64 {
        if self.elapsed_seconds > 0.0 {
            self.processed as f64 / self.elapsed_seconds
        } else {
            0.0
        }
    }
}

/// Aggregated result of a full run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub source_path: PathBuf,
    /// One report per pass, in pass order
    pub passes: Vec<PassReport>,
    /// Relations whose target never appeared
    pub unresolved: Vec<DeferredRelation>,
    /// Run-level warnings (final flush)
    pub warnings: Vec<String>,
    pub elapsed_seconds: f64,
}

impl RunReport {
    pub fn new(source_path: impl Into<PathBuf>) -> Self {
        Self {
            source_path: source_path.into(),
            passes: Vec::new(),
            unresolved: Vec::new(),
            warnings: Vec::new(),
            elapsed_seconds: 0.0,
        }
    }

    /// Report of one pass, if it ran
    pub fn pass(&self, entity_type: EntityType) -> Option<&PassReport> {
        self.passes.iter().find(|p| p.entity_type == entity_type)
    }

    pub fn total_imported(&self) -> usize {
        self.passes.iter().map(|p| p.imported).sum()
    }

    pub fn total_skipped(&self) -> usize {
        self.passes.iter().map(|p| p.skipped).sum()
    }

    pub fn total_failed(&self) -> usize {
        self.passes.iter().map(|p| p.failed.len()).sum()
    }

    /// No failures, no stream errors, nothing unresolved
    pub fn is_clean(&self) -> bool {
        self.total_failed() == 0
            && self.unresolved.is_empty()
            && self.passes.iter().all(|p| p.stream_error.is_none())
    }

    /// Write the report as pretty JSON
    pub fn save(&self, path: &Path) -> Result<(), ImportError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Print summary to console
    pub fn print_summary(&self) {
        println!("\nImport Summary");
        println!("==============");
        println!("Source: {}", self.source_path.display());
        for pass in &self.passes {
            println!(
                "{:<9} {:>6} imported {:>6} skipped {:>6} failed {:>6} warnings ({:.1} items/s)",
                pass.entity_type.as_str(),
                pass.imported,
                pass.skipped,
                pass.failed.len(),
                pass.warnings.len(),
                pass.rate()
            );
            if let Some(ref error) = pass.stream_error {
                println!("          stream ended early: {}", error);
            }
            for failure in pass.failed.iter().take(10) {
                let origin = failure
                    .origin_id
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| "?".to_string());
                println!(
                    "          #{} (origin {}): {}",
                    failure.position, origin, failure.error
                );
            }
            if pass.failed.len() > 10 {
                println!("          ... and {} more", pass.failed.len() - 10);
            }
        }
        println!("Unresolved relations: {}", self.unresolved.len());
        for relation in self.unresolved.iter().take(10) {
            println!("          {}", relation);
        }
        println!("Elapsed time:         {:.1}s", self.elapsed_seconds);
    }
}
