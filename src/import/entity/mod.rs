//! Entity value objects produced by the parsers
//!
//! Each value object is built once from a sanitized attribute set and is
//! read-only afterwards, except for its local id which can be assigned
//! exactly once.

mod comment;
mod post;
mod term;
mod user;

pub use comment::ImportComment;
pub use post::ImportPost;
pub use term::ImportTerm;
pub use user::ImportUser;

use super::host::ImportHost;
use super::source::{AlreadyAssigned, HostError, ImportError};
use crate::types::{EntityType, LocalId, OriginId, Reference};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Behavior shared by all importable entities
pub trait ImportEntity: fmt::Debug {
    /// Entity type this value object represents
    const ENTITY_TYPE: EntityType;

    /// Identifier in the origin system
    fn origin_id(&self) -> OriginId;

    /// Identifier in the target system, once assigned
    fn local_id(&self) -> Option<LocalId>;

    /// Assign the local id; first write wins
    fn assign_local_id(&mut self, id: LocalId) -> Result<(), AlreadyAssigned>;

    /// Custom fields attached to the entity
    fn meta(&self) -> &[ImportMeta] {
        &[]
    }

    /// Counterparts of this entity in other locales
    fn locale_relations(&self) -> &[LocaleRelation] {
        &[]
    }

    /// Forward references to other entities, in origin ids
    fn references(&self) -> Vec<Reference> {
        Vec::new()
    }

    /// Hand the entity to the matching host creation primitive
    fn create_in(&self, host: &mut dyn ImportHost) -> Result<LocalId, HostError>;
}

/// Write-once storage for a local id
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LocalIdSlot(Option<LocalId>);

impl LocalIdSlot {
    pub fn get(&self) -> Option<LocalId> {
        self.0
    }

    /// Store `id` if empty; otherwise leave the existing id untouched
    pub fn assign(&mut self, id: LocalId) -> Result<(), AlreadyAssigned> {
        match self.0 {
            Some(existing) => Err(AlreadyAssigned { existing }),
            None => {
                self.0 = Some(id);
                Ok(())
            }
        }
    }
}

/// Read the required origin id out of sanitized attributes
///
/// `raw` is the value before sanitizing; it names the offending text when the
/// id is present but unusable.
pub(crate) fn require_origin_id(
    attributes: &mut super::sanitize::Attributes,
    raw: Option<super::sanitize::AttrValue>,
    entity_type: EntityType,
) -> Result<OriginId, ImportError> {
    use super::sanitize::AttrValue;

    if let Some(id) = attributes
        .take_int("origin_id")
        .and_then(OriginId::from_reference)
    {
        return Ok(id);
    }

    let message = match raw {
        None => format!("{} is missing its origin id", entity_type),
        Some(AttrValue::Str(text)) if text.trim().is_empty() => {
            format!("{} is missing its origin id", entity_type)
        }
        Some(AttrValue::Str(text)) => {
            format!("{} has an invalid origin id '{}'", entity_type, text.trim())
        }
        Some(AttrValue::Int(value)) => {
            format!("{} has an invalid origin id '{}'", entity_type, value)
        }
        Some(other) => format!("{} has an invalid origin id {:?}", entity_type, other),
    };
    Err(ImportError::Parse(message))
}

// ============================================================================
// Meta
// ============================================================================

/// Value of a custom field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Single(String),
    Multiple(Vec<String>),
}

impl MetaValue {
    /// All values in order (one for single-valued fields)
    pub fn values(&self) -> Vec<&str> {
        match self {
            MetaValue::Single(v) => vec![v.as_str()],
            MetaValue::Multiple(vs) => vs.iter().map(String::as_str).collect(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            MetaValue::Single(_) => 1,
            MetaValue::Multiple(vs) => vs.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A custom field attached to an entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportMeta {
    pub key: String,
    pub value: MetaValue,
}

impl ImportMeta {
    pub fn single(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: MetaValue::Single(value.into()),
        }
    }

    pub fn multiple(key: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            key: key.into(),
            value: MetaValue::Multiple(values),
        }
    }

    pub fn is_single(&self) -> bool {
        matches!(self.value, MetaValue::Single(_))
    }

    /// Group raw key/value pairs by key
    ///
    /// Keys keep their first-seen order; a key seen more than once becomes a
    /// multi-valued field with its values in source order.
    pub fn group<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Vec<ImportMeta>
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut grouped: Vec<(String, Vec<String>)> = Vec::new();

        for (key, value) in pairs {
            let key = key.into();
            match grouped.iter_mut().find(|(k, _)| *k == key) {
                Some((_, values)) => values.push(value.into()),
                None => grouped.push((key, vec![value.into()])),
            }
        }

        grouped
            .into_iter()
            .map(|(key, mut values)| {
                if values.len() == 1 {
                    ImportMeta::single(key, values.remove(0))
                } else {
                    ImportMeta::multiple(key, values)
                }
            })
            .collect()
    }
}

// ============================================================================
// Cross-entity references
// ============================================================================

/// Link to the same content in another locale
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocaleRelation {
    pub locale: String,
    pub origin_id: OriginId,
}

/// Term assigned to a post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermReference {
    pub taxonomy: String,
    pub slug: String,
    pub origin_id: OriginId,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::sanitize::{AttrValue, Attributes};

    #[test]
    fn test_invalid_origin_id_is_named_in_error() {
        let mut sanitized = Attributes::new();
        let err = require_origin_id(
            &mut sanitized,
            Some(AttrValue::Str(" seventy ".into())),
            EntityType::Post,
        )
        .unwrap_err();
        assert!(err.to_string().contains("invalid origin id 'seventy'"));

        let err = require_origin_id(&mut Attributes::new(), None, EntityType::User).unwrap_err();
        assert!(err.to_string().contains("user is missing its origin id"));

        let mut sanitized = Attributes::new().with("origin_id", 0i64);
        let err = require_origin_id(&mut sanitized, Some(AttrValue::Int(0)), EntityType::Term)
            .unwrap_err();
        assert!(err.to_string().contains("invalid origin id '0'"));
    }

    #[test]
    fn test_local_id_first_write_wins() {
        let mut slot = LocalIdSlot::default();
        assert_eq!(slot.get(), None);

        slot.assign(LocalId(15)).unwrap();
        let err = slot.assign(LocalId(16)).unwrap_err();

        assert_eq!(err.existing, LocalId(15));
        assert_eq!(slot.get(), Some(LocalId(15)));
    }

    #[test]
    fn test_meta_grouping() {
        let meta = ImportMeta::group(vec![
            ("color", "red"),
            ("size", "xl"),
            ("color", "blue"),
            ("color", "green"),
        ]);

        assert_eq!(meta.len(), 2);
        assert_eq!(meta[0].key, "color");
        assert!(!meta[0].is_single());
        assert_eq!(meta[0].value.values(), vec!["red", "blue", "green"]);
        assert_eq!(meta[1], ImportMeta::single("size", "xl"));
    }
}
