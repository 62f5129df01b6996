//! Host primitives consumed by the pipeline
//!
//! The target installation is only reached through [`ImportHost`]. The
//! pipeline never persists anything itself; it hands value objects to the
//! host and records the identifiers the host assigns.

use super::entity::{
    ImportComment, ImportEntity, ImportPost, ImportTerm, ImportUser, LocaleRelation, MetaValue,
};
use super::source::HostError;
use crate::types::{EntityType, LocalId, OriginId, RelationKind};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Entity creation and relation primitives of the target installation
pub trait ImportHost {
    /// Persist a user and return its new identifier
    fn create_user(&mut self, user: &ImportUser) -> Result<LocalId, HostError>;

    /// Persist a term and return its new identifier
    fn create_term(&mut self, term: &ImportTerm) -> Result<LocalId, HostError>;

    /// Persist a post and return its new identifier
    fn create_post(&mut self, post: &ImportPost) -> Result<LocalId, HostError>;

    /// Persist a comment and return its new identifier
    fn create_comment(&mut self, comment: &ImportComment) -> Result<LocalId, HostError>;

    /// Point `referencing` at `referenced` (both local ids)
    fn set_relation(
        &mut self,
        kind: RelationKind,
        referencing: LocalId,
        referenced: LocalId,
    ) -> Result<(), HostError>;

    /// Store a (filtered) custom field
    fn set_meta(
        &mut self,
        entity_type: EntityType,
        local_id: LocalId,
        key: &str,
        value: &MetaValue,
    ) -> Result<(), HostError>;

    /// Connect an entity with its counterparts in other locales
    fn link_translations(
        &mut self,
        entity_type: EntityType,
        local_id: LocalId,
        relations: &[LocaleRelation],
    ) -> Result<(), HostError>;
}

/// An entity created in a [`MemoryHost`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedEntity {
    pub entity_type: EntityType,
    pub origin_id: OriginId,
    pub local_id: LocalId,
    /// Title, name or login, for display
    pub label: String,
}

/// A relation applied in a [`MemoryHost`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AppliedRelation {
    pub kind: RelationKind,
    pub referencing: LocalId,
    pub referenced: LocalId,
}

/// A custom field stored in a [`MemoryHost`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredMeta {
    pub entity_type: EntityType,
    pub local_id: LocalId,
    pub key: String,
    pub value: MetaValue,
}

/// A translation link recorded in a [`MemoryHost`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranslationLink {
    pub entity_type: EntityType,
    pub local_id: LocalId,
    pub relations: Vec<LocaleRelation>,
}

/// In-memory host used for dry runs and tests
///
/// Assigns sequential local ids per entity type and records every call.
#[derive(Debug, Default, Serialize)]
pub struct MemoryHost {
    #[serde(skip)]
    next_ids: HashMap<EntityType, u64>,
    #[serde(skip)]
    first_id: u64,
    created: Vec<CreatedEntity>,
    relations: Vec<AppliedRelation>,
    meta: Vec<StoredMeta>,
    translations: Vec<TranslationLink>,
    #[serde(skip)]
    rejected: HashSet<(EntityType, OriginId)>,
    #[serde(skip)]
    rejected_relations: HashSet<RelationKind>,
    #[serde(skip)]
    reject_translations: bool,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self {
            first_id: 1,
            ..Default::default()
        }
    }

    /// Start local id sequences at `first_id` (makes remapping visible)
    pub fn with_first_id(mut self, first_id: u64) -> Self {
        self.first_id = first_id.max(1);
        self
    }

    /// Fail creation of the given entity
    pub fn reject(mut self, entity_type: EntityType, origin_id: OriginId) -> Self {
        self.rejected.insert((entity_type, origin_id));
        self
    }

    /// Fail every relation of this kind
    pub fn reject_relations(mut self, kind: RelationKind) -> Self {
        self.rejected_relations.insert(kind);
        self
    }

    /// Fail every translation link
    pub fn reject_translations(mut self) -> Self {
        self.reject_translations = true;
        self
    }

    fn create<E: ImportEntity>(&mut self, entity: &E, label: &str) -> Result<LocalId, HostError> {
        let entity_type = E::ENTITY_TYPE;
        let origin_id = entity.origin_id();

        if self.rejected.contains(&(entity_type, origin_id)) {
            return Err(HostError::new(format!(
                "{} {} rejected by host",
                entity_type, origin_id
            )));
        }

        let first_id = self.first_id.max(1);
        let next = self.next_ids.entry(entity_type).or_insert(first_id);
        let local_id = LocalId(*next);
        *next += 1;

        self.created.push(CreatedEntity {
            entity_type,
            origin_id,
            local_id,
            label: label.to_string(),
        });

        Ok(local_id)
    }

    /// All created entities in creation order
    pub fn created(&self) -> &[CreatedEntity] {
        &self.created
    }

    /// Created entities of one type
    pub fn created_of(&self, entity_type: EntityType) -> Vec<&CreatedEntity> {
        self.created
            .iter()
            .filter(|e| e.entity_type == entity_type)
            .collect()
    }

    /// Local id the host assigned to an origin entity
    pub fn local_id_of(&self, entity_type: EntityType, origin_id: OriginId) -> Option<LocalId> {
        self.created
            .iter()
            .find(|e| e.entity_type == entity_type && e.origin_id == origin_id)
            .map(|e| e.local_id)
    }

    pub fn relations(&self) -> &[AppliedRelation] {
        &self.relations
    }

    pub fn meta(&self) -> &[StoredMeta] {
        &self.meta
    }

    /// Stored value of one custom field
    pub fn meta_value(
        &self,
        entity_type: EntityType,
        local_id: LocalId,
        key: &str,
    ) -> Option<&MetaValue> {
        self.meta
            .iter()
            .find(|m| m.entity_type == entity_type && m.local_id == local_id && m.key == key)
            .map(|m| &m.value)
    }

    pub fn translations(&self) -> &[TranslationLink] {
        &self.translations
    }
}

impl ImportHost for MemoryHost {
    fn create_user(&mut self, user: &ImportUser) -> Result<LocalId, HostError> {
        self.create(user, user.login())
    }

    fn create_term(&mut self, term: &ImportTerm) -> Result<LocalId, HostError> {
        self.create(term, term.name())
    }

    fn create_post(&mut self, post: &ImportPost) -> Result<LocalId, HostError> {
        self.create(post, post.title())
    }

    fn create_comment(&mut self, comment: &ImportComment) -> Result<LocalId, HostError> {
        self.create(comment, comment.author_name())
    }

    fn set_relation(
        &mut self,
        kind: RelationKind,
        referencing: LocalId,
        referenced: LocalId,
    ) -> Result<(), HostError> {
        if self.rejected_relations.contains(&kind) {
            return Err(HostError::new(format!("{} relations rejected by host", kind)));
        }
        self.relations.push(AppliedRelation {
            kind,
            referencing,
            referenced,
        });
        Ok(())
    }

    fn set_meta(
        &mut self,
        entity_type: EntityType,
        local_id: LocalId,
        key: &str,
        value: &MetaValue,
    ) -> Result<(), HostError> {
        self.meta.push(StoredMeta {
            entity_type,
            local_id,
            key: key.to_string(),
            value: value.clone(),
        });
        Ok(())
    }

    fn link_translations(
        &mut self,
        entity_type: EntityType,
        local_id: LocalId,
        relations: &[LocaleRelation],
    ) -> Result<(), HostError> {
        if self.reject_translations {
            return Err(HostError::new("translation linking unavailable"));
        }
        self.translations.push(TranslationLink {
            entity_type,
            local_id,
            relations: relations.to_vec(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::sanitize::{Attributes, TypeCastSanitizer};

    fn user(origin: i64, login: &str) -> ImportUser {
        let attrs = Attributes::new()
            .with("origin_id", origin)
            .with("login", login);
        ImportUser::new(attrs, &TypeCastSanitizer).unwrap()
    }

    #[test]
    fn test_sequential_ids_per_type() {
        let mut host = MemoryHost::new().with_first_id(100);

        assert_eq!(host.create_user(&user(1, "a")).unwrap(), LocalId(100));
        assert_eq!(host.create_user(&user(2, "b")).unwrap(), LocalId(101));
        assert_eq!(host.created_of(EntityType::User).len(), 2);
        assert_eq!(host.local_id_of(EntityType::User, OriginId(2)), Some(LocalId(101)));
    }

    #[test]
    fn test_rejected_entity_fails() {
        let mut host = MemoryHost::new().reject(EntityType::User, OriginId(2));

        assert!(host.create_user(&user(1, "a")).is_ok());
        assert!(host.create_user(&user(2, "b")).is_err());
        assert_eq!(host.created().len(), 1);
    }

    #[test]
    fn test_records_relations_and_meta() {
        let mut host = MemoryHost::new().reject_relations(RelationKind::PostTerm);

        host.set_relation(RelationKind::PostParent, LocalId(2), LocalId(1))
            .unwrap();
        assert!(host
            .set_relation(RelationKind::PostTerm, LocalId(2), LocalId(5))
            .is_err());
        host.set_meta(
            EntityType::Post,
            LocalId(2),
            "color",
            &MetaValue::Single("red".into()),
        )
        .unwrap();

        assert_eq!(host.relations().len(), 1);
        assert_eq!(
            host.meta_value(EntityType::Post, LocalId(2), "color"),
            Some(&MetaValue::Single("red".into()))
        );
    }
}
