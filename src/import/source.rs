//! Core error and configuration types for the import pipeline

use crate::types::{EntityType, LocalId, OriginId};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Import configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Mapping checkpoint file (restored before the run, saved after each pass)
    #[serde(default)]
    pub mapping_path: Option<PathBuf>,
    /// Where to write the JSON run report
    #[serde(default)]
    pub report_path: Option<PathBuf>,
    /// Maximum items to process per pass (None = unlimited)
    #[serde(default)]
    pub max_items_per_pass: Option<usize>,
    /// Suppress progress output
    #[serde(default)]
    pub quiet: bool,
}

/// Errors that can occur during import
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed input at byte {position}: {message}")]
    MalformedInput { position: u64, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Conflicting {entity_type} mapping for origin id {origin_id}: already {existing}, got {attempted}")]
    Conflict {
        entity_type: EntityType,
        origin_id: OriginId,
        existing: LocalId,
        attempted: LocalId,
    },

    #[error("Duplicate {entity_type} origin id {origin_id}: already imported as {existing}")]
    Duplicate {
        entity_type: EntityType,
        origin_id: OriginId,
        existing: LocalId,
    },

    #[error("Host rejected {entity_type} {origin_id}: {source}")]
    HostImport {
        entity_type: EntityType,
        origin_id: OriginId,
        #[source]
        source: HostError,
    },

    #[error("Local id already assigned: {0}")]
    AlreadyAssigned(#[from] AlreadyAssigned),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ImportError {
    /// Whether this error ends the current pass rather than a single item
    pub fn is_stream_error(&self) -> bool {
        matches!(self, ImportError::Io(_) | ImportError::MalformedInput { .. })
    }
}

/// Error reported by a host primitive
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct HostError(pub String);

impl HostError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Returned when a value object already carries a local id
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("entity already has local id {existing}")]
pub struct AlreadyAssigned {
    pub existing: LocalId,
}
