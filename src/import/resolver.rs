//! Deferred relationship resolution
//!
//! Entities may reference others that appear later in the file (a post whose
//! parent is emitted after it) or in a later pass. References that cannot be
//! resolved yet are parked and replayed by [`AncestorResolver::flush_pending`].

use super::host::ImportHost;
use super::id_mapper::IdMapper;
use super::source::HostError;
use crate::types::{LocalId, OriginId, RelationKind};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// A relation waiting for its target to be imported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeferredRelation {
    pub kind: RelationKind,
    /// Local id of the entity holding the reference
    pub referencing: LocalId,
    /// Origin id of the entity being referenced
    pub referenced_origin: OriginId,
}

impl std::fmt::Display for DeferredRelation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} from {} {} to origin {} {}",
            self.kind,
            self.kind.source(),
            self.referencing,
            self.kind.target(),
            self.referenced_origin
        )
    }
}

/// What happened to a relation handed to the resolver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Applied,
    Deferred,
}

/// Outcome of one flush
#[derive(Debug, Default)]
pub struct FlushReport {
    pub applied: usize,
    /// Relations whose target was mapped but the host refused
    pub failed: Vec<(DeferredRelation, HostError)>,
}

/// Resolve-or-defer relation handling backed by the id mapper
#[derive(Debug)]
pub struct AncestorResolver {
    mapper: Arc<IdMapper>,
    pending: Vec<DeferredRelation>,
}

impl AncestorResolver {
    pub fn new(mapper: Arc<IdMapper>) -> Self {
        Self {
            mapper,
            pending: Vec::new(),
        }
    }

    /// Apply the relation now if its target is mapped, park it otherwise
    ///
    /// A host failure is returned to the caller; nothing is parked in that case.
    pub fn resolve_or_defer(
        &mut self,
        host: &mut dyn ImportHost,
        referencing: LocalId,
        referenced_origin: OriginId,
        kind: RelationKind,
    ) -> Result<Resolution, HostError> {
        match self.mapper.resolve(kind.target(), referenced_origin) {
            Some(referenced) => {
                host.set_relation(kind, referencing, referenced)?;
                debug!(
                    "Applied {} {} -> {} (origin {})",
                    kind, referencing, referenced, referenced_origin
                );
                Ok(Resolution::Applied)
            }
            None => {
                let relation = DeferredRelation {
                    kind,
                    referencing,
                    referenced_origin,
                };
                debug!("Deferring {}", relation);
                self.pending.push(relation);
                Ok(Resolution::Deferred)
            }
        }
    }

    /// Apply every pending relation whose target is now mapped
    ///
    /// Applied and failed records are removed; the rest stay pending in their
    /// original order.
    pub fn flush_pending(&mut self, host: &mut dyn ImportHost) -> FlushReport {
        let mut report = FlushReport::default();
        let mut still_pending = Vec::with_capacity(self.pending.len());

        for relation in self.pending.drain(..) {
            let Some(referenced) = self
                .mapper
                .resolve(relation.kind.target(), relation.referenced_origin)
            else {
                still_pending.push(relation);
                continue;
            };

            match host.set_relation(relation.kind, relation.referencing, referenced) {
                Ok(()) => report.applied += 1,
                Err(e) => {
                    warn!("Dropping {}: {}", relation, e);
                    report.failed.push((relation, e));
                }
            }
        }

        self.pending = still_pending;
        if report.applied > 0 {
            debug!(
                "Flushed {} deferred relations, {} still pending",
                report.applied,
                self.pending.len()
            );
        }
        report
    }

    /// Re-park relations carried over from an interrupted run
    ///
    /// Relations already pending are not added twice.
    pub fn restore_pending(&mut self, relations: &[DeferredRelation]) -> usize {
        let before = self.pending.len();
        for relation in relations {
            if !self.pending.contains(relation) {
                self.pending.push(*relation);
            }
        }
        self.pending.len() - before
    }

    /// Relations still waiting for their target
    pub fn pending(&self) -> &[DeferredRelation] {
        &self.pending
    }

    /// Drain whatever is left after the final flush
    pub fn take_unresolved(&mut self) -> Vec<DeferredRelation> {
        std::mem::take(&mut self.pending)
    }
}
