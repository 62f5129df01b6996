//! Origin id → local id registry
//!
//! Every successfully created entity is registered here so later passes can
//! translate origin references into local ids. The map is append-only for the
//! duration of a run and can be checkpointed to disk, together with the
//! relations still waiting for their target, so an interrupted run can be
//! resumed without re-creating entities or losing links.

use super::entity::ImportEntity;
use super::resolver::DeferredRelation;
use super::source::ImportError;
use crate::types::{EntityType, LocalId, OriginId};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// One origin → local association
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdMapping {
    pub entity_type: EntityType,
    pub origin_id: OriginId,
    pub local_id: LocalId,
}

/// Outcome of a successful registration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// First time this origin id was mapped
    New,
    /// Identical mapping already present
    Unchanged,
}

type Observer = Box<dyn Fn(&IdMapping) + Send + Sync>;

/// Per-entity-type identifier map
#[derive(Default)]
pub struct IdMapper {
    /// Entity type → (origin id → local id)
    maps: RwLock<HashMap<EntityType, HashMap<OriginId, LocalId>>>,
    /// Mappings restored from a checkpoint rather than created in this run
    restored: RwLock<HashSet<(EntityType, OriginId)>>,
    /// Callbacks invoked after every new registration
    observers: RwLock<Vec<Observer>>,
}

impl IdMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback fired synchronously for every new mapping
    pub fn on_register<F>(&self, observer: F)
    where
        F: Fn(&IdMapping) + Send + Sync + 'static,
    {
        self.observers.write().push(Box::new(observer));
    }

    /// Record that `origin_id` of `entity_type` now lives at `local_id`
    ///
    /// Re-registering the same mapping is accepted; a different local id for
    /// an already mapped origin id is a conflict.
    pub fn register(
        &self,
        entity_type: EntityType,
        origin_id: OriginId,
        local_id: LocalId,
    ) -> Result<Registration, ImportError> {
        {
            let mut maps = self.maps.write();
            let map = maps.entry(entity_type).or_default();

            match map.get(&origin_id) {
                Some(&existing) if existing == local_id => {
                    debug!(
                        "Ignoring repeated {} mapping {} -> {}",
                        entity_type, origin_id, local_id
                    );
                    return Ok(Registration::Unchanged);
                }
                Some(&existing) => {
                    return Err(ImportError::Conflict {
                        entity_type,
                        origin_id,
                        existing,
                        attempted: local_id,
                    });
                }
                None => {
                    map.insert(origin_id, local_id);
                }
            }
        }

        // Lock released: observers may query the mapper
        let mapping = IdMapping {
            entity_type,
            origin_id,
            local_id,
        };
        for observer in self.observers.read().iter() {
            observer(&mapping);
        }

        Ok(Registration::New)
    }

    /// Assign the local id to a value object and register the mapping
    pub fn assign<E: ImportEntity>(
        &self,
        entity: &mut E,
        local_id: LocalId,
    ) -> Result<Registration, ImportError> {
        if let Err(already) = entity.assign_local_id(local_id) {
            if already.existing != local_id {
                return Err(ImportError::Conflict {
                    entity_type: E::ENTITY_TYPE,
                    origin_id: entity.origin_id(),
                    existing: already.existing,
                    attempted: local_id,
                });
            }
        }

        self.register(E::ENTITY_TYPE, entity.origin_id(), local_id)
    }

    /// Local id for an origin id, or None when not (yet) mapped
    pub fn resolve(&self, entity_type: EntityType, origin_id: OriginId) -> Option<LocalId> {
        self.maps
            .read()
            .get(&entity_type)
            .and_then(|map| map.get(&origin_id))
            .copied()
    }

    /// Whether the mapping came from a restored checkpoint
    pub fn is_restored(&self, entity_type: EntityType, origin_id: OriginId) -> bool {
        self.restored.read().contains(&(entity_type, origin_id))
    }

    /// Number of mappings for one entity type
    pub fn len(&self, entity_type: EntityType) -> usize {
        self.maps
            .read()
            .get(&entity_type)
            .map(HashMap::len)
            .unwrap_or(0)
    }

    /// Total number of mappings
    pub fn total(&self) -> usize {
        self.maps.read().values().map(HashMap::len).sum()
    }

    /// All mappings, sorted by type then origin id
    pub fn mappings(&self) -> Vec<IdMapping> {
        let maps = self.maps.read();
        let mut all: Vec<IdMapping> = maps
            .iter()
            .flat_map(|(&entity_type, map)| {
                map.iter().map(move |(&origin_id, &local_id)| IdMapping {
                    entity_type,
                    origin_id,
                    local_id,
                })
            })
            .collect();
        all.sort_by_key(|m| (m.entity_type, m.origin_id));
        all
    }

    /// Load mappings from a checkpoint; they count as restored
    ///
    /// Observers are not notified for restored mappings.
    pub fn restore(&self, checkpoint: &MappingCheckpoint) -> Result<usize, ImportError> {
        let mut maps = self.maps.write();
        let mut restored = self.restored.write();

        for mapping in &checkpoint.mappings {
            let map = maps.entry(mapping.entity_type).or_default();
            match map.get(&mapping.origin_id) {
                Some(&existing) if existing != mapping.local_id => {
                    return Err(ImportError::Conflict {
                        entity_type: mapping.entity_type,
                        origin_id: mapping.origin_id,
                        existing,
                        attempted: mapping.local_id,
                    });
                }
                _ => {
                    map.insert(mapping.origin_id, mapping.local_id);
                    restored.insert((mapping.entity_type, mapping.origin_id));
                }
            }
        }

        info!("Restored {} id mappings", checkpoint.mappings.len());
        Ok(checkpoint.mappings.len())
    }

    /// Snapshot the current map
    pub fn checkpoint(&self, source_path: impl Into<PathBuf>) -> MappingCheckpoint {
        MappingCheckpoint {
            source_path: source_path.into(),
            timestamp: Utc::now(),
            mappings: self.mappings(),
            pending: Vec::new(),
        }
    }
}

impl std::fmt::Debug for IdMapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdMapper")
            .field("mappings", &self.total())
            .field("observers", &self.observers.read().len())
            .finish()
    }
}

/// Persisted id map for resuming interrupted runs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingCheckpoint {
    /// Export file the mappings were produced from
    pub source_path: PathBuf,
    /// When the checkpoint was written
    pub timestamp: DateTime<Utc>,
    /// All known mappings
    pub mappings: Vec<IdMapping>,
    /// Relations whose target was not imported yet
    #[serde(default)]
    pub pending: Vec<DeferredRelation>,
}

impl MappingCheckpoint {
    /// Number of mappings of one entity type
    pub fn count(&self, entity_type: EntityType) -> usize {
        self.mappings
            .iter()
            .filter(|m| m.entity_type == entity_type)
            .count()
    }

    /// Attach the relations still waiting for their target
    pub fn with_pending(mut self, pending: &[DeferredRelation]) -> Self {
        self.pending = pending.to_vec();
        self
    }

    /// Save checkpoint to file
    pub fn save(&self, path: &Path) -> Result<(), ImportError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load checkpoint from file
    pub fn load(path: &Path) -> Result<Self, ImportError> {
        let json = std::fs::read_to_string(path)?;
        let checkpoint = serde_json::from_str(&json)?;
        Ok(checkpoint)
    }
}
