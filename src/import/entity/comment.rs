//! Comment value object

use super::{require_origin_id, ImportEntity, ImportMeta, LocalIdSlot};
use crate::import::host::ImportHost;
use crate::import::sanitize::{Attributes, FieldType, ParameterSanitizer, TypeSchema};
use crate::import::source::{AlreadyAssigned, HostError, ImportError};
use crate::types::{EntityType, LocalId, OriginId, Reference, RelationKind};
use chrono::{DateTime, Utc};

/// A comment on a post
#[derive(Debug, Clone, PartialEq)]
pub struct ImportComment {
    origin_id: OriginId,
    id: LocalIdSlot,
    origin_post_id: Option<OriginId>,
    author_name: String,
    author_email: String,
    author_url: String,
    author_ip: String,
    date: DateTime<Utc>,
    content: String,
    karma: i64,
    approved: String,
    agent: String,
    comment_type: String,
    origin_parent_comment_id: Option<OriginId>,
    origin_user_id: Option<OriginId>,
    meta: Vec<ImportMeta>,
}

impl ImportComment {
    pub const SCHEMA: &'static TypeSchema = &[
        ("origin_id", FieldType::Int),
        ("origin_post_id", FieldType::Int),
        ("author_name", FieldType::Str),
        ("author_email", FieldType::Str),
        ("author_url", FieldType::Str),
        ("author_ip", FieldType::Str),
        ("date", FieldType::Date),
        ("content", FieldType::Str),
        ("karma", FieldType::Int),
        ("approved", FieldType::Str),
        ("agent", FieldType::Str),
        ("type", FieldType::Str),
        ("origin_parent_comment_id", FieldType::Int),
        ("origin_user_id", FieldType::Int),
        ("meta", FieldType::Meta),
    ];

    pub fn new(
        attributes: Attributes,
        sanitizer: &dyn ParameterSanitizer,
    ) -> Result<Self, ImportError> {
        let raw_origin = attributes.get("origin_id").cloned();
        let mut a = sanitizer.sanitize(Self::SCHEMA, attributes);
        let origin_id = require_origin_id(&mut a, raw_origin, EntityType::Comment)?;

        Ok(Self {
            origin_id,
            id: LocalIdSlot::default(),
            origin_post_id: a.take_int("origin_post_id").and_then(OriginId::from_reference),
            author_name: a.take_string("author_name"),
            author_email: a.take_string("author_email"),
            author_url: a.take_string("author_url"),
            author_ip: a.take_string("author_ip"),
            date: a.take_date("date").unwrap_or_else(Utc::now),
            content: a.take_string("content"),
            karma: a.take_int("karma").unwrap_or(0),
            approved: a.take_string("approved"),
            agent: a.take_string("agent"),
            comment_type: a.take_string("type"),
            origin_parent_comment_id: a
                .take_int("origin_parent_comment_id")
                .and_then(OriginId::from_reference),
            origin_user_id: a.take_int("origin_user_id").and_then(OriginId::from_reference),
            meta: a.take_meta("meta"),
        })
    }

    pub fn origin_post_id(&self) -> Option<OriginId> {
        self.origin_post_id
    }

    pub fn author_name(&self) -> &str {
        &self.author_name
    }

    pub fn author_email(&self) -> &str {
        &self.author_email
    }

    pub fn author_url(&self) -> &str {
        &self.author_url
    }

    pub fn author_ip(&self) -> &str {
        &self.author_ip
    }

    pub fn date(&self) -> DateTime<Utc> {
        self.date
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn karma(&self) -> i64 {
        self.karma
    }

    /// Moderation state as exported (`1`, `0`, `spam`, ...)
    pub fn approved(&self) -> &str {
        &self.approved
    }

    pub fn agent(&self) -> &str {
        &self.agent
    }

    pub fn comment_type(&self) -> &str {
        &self.comment_type
    }

    pub fn origin_parent_comment_id(&self) -> Option<OriginId> {
        self.origin_parent_comment_id
    }

    pub fn origin_user_id(&self) -> Option<OriginId> {
        self.origin_user_id
    }
}

impl ImportEntity for ImportComment {
    const ENTITY_TYPE: EntityType = EntityType::Comment;

    fn origin_id(&self) -> OriginId {
        self.origin_id
    }

    fn local_id(&self) -> Option<LocalId> {
        self.id.get()
    }

    fn assign_local_id(&mut self, id: LocalId) -> Result<(), AlreadyAssigned> {
        self.id.assign(id)
    }

    fn meta(&self) -> &[ImportMeta] {
        &self.meta
    }

    fn references(&self) -> Vec<Reference> {
        [
            self.origin_post_id
                .map(|id| Reference::new(RelationKind::CommentPost, id)),
            self.origin_parent_comment_id
                .map(|id| Reference::new(RelationKind::CommentParent, id)),
            self.origin_user_id
                .map(|id| Reference::new(RelationKind::CommentAuthor, id)),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    fn create_in(&self, host: &mut dyn ImportHost) -> Result<LocalId, HostError> {
        host.create_comment(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::sanitize::TypeCastSanitizer;

    #[test]
    fn test_comment_references() {
        let attrs = Attributes::new()
            .with("origin_id", "77")
            .with("origin_post_id", "12")
            .with("origin_parent_comment_id", "0")
            .with("origin_user_id", "3")
            .with("content", "Nice post");

        let comment = ImportComment::new(attrs, &TypeCastSanitizer).unwrap();
        assert_eq!(comment.content(), "Nice post");
        assert_eq!(
            comment.references(),
            vec![
                Reference::new(RelationKind::CommentPost, OriginId(12)),
                Reference::new(RelationKind::CommentAuthor, OriginId(3)),
            ]
        );
    }

    #[test]
    fn test_unparseable_origin_id_is_parse_error() {
        let attrs = Attributes::new().with("origin_id", "seventy");
        assert!(matches!(
            ImportComment::new(attrs, &TypeCastSanitizer),
            Err(ImportError::Parse(_))
        ));
    }
}
