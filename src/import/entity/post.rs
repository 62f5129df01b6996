//! Post value object

use super::{
    require_origin_id, ImportEntity, ImportMeta, LocalIdSlot, LocaleRelation, TermReference,
};
use crate::import::host::ImportHost;
use crate::import::sanitize::{Attributes, FieldType, ParameterSanitizer, TypeSchema};
use crate::import::source::{AlreadyAssigned, HostError, ImportError};
use crate::types::{EntityType, LocalId, OriginId, Reference, RelationKind};
use chrono::{DateTime, Utc};

/// A post, page or custom content item
#[derive(Debug, Clone, PartialEq)]
pub struct ImportPost {
    origin_id: OriginId,
    id: LocalIdSlot,
    title: String,
    guid: String,
    date: DateTime<Utc>,
    comment_status: String,
    ping_status: String,
    post_type: String,
    status: String,
    is_sticky: bool,
    origin_link: String,
    excerpt: String,
    content: String,
    name: String,
    origin_author_id: Option<OriginId>,
    origin_parent_post_id: Option<OriginId>,
    menu_order: i64,
    password: String,
    terms: Vec<TermReference>,
    meta: Vec<ImportMeta>,
    locale_relations: Vec<LocaleRelation>,
}

impl ImportPost {
    pub const SCHEMA: &'static TypeSchema = &[
        ("origin_id", FieldType::Int),
        ("title", FieldType::Str),
        ("guid", FieldType::Str),
        ("date", FieldType::Date),
        ("comment_status", FieldType::Str),
        ("ping_status", FieldType::Str),
        ("type", FieldType::Str),
        ("status", FieldType::Str),
        ("is_sticky", FieldType::Bool),
        ("origin_link", FieldType::Str),
        ("excerpt", FieldType::Str),
        ("content", FieldType::Str),
        ("name", FieldType::Str),
        ("origin_author_id", FieldType::Int),
        ("origin_parent_post_id", FieldType::Int),
        ("menu_order", FieldType::Int),
        ("password", FieldType::Str),
        ("terms", FieldType::Terms),
        ("meta", FieldType::Meta),
        ("locale_relations", FieldType::Locales),
    ];

    /// Build from raw attributes; fails only without a valid origin id
    pub fn new(
        attributes: Attributes,
        sanitizer: &dyn ParameterSanitizer,
    ) -> Result<Self, ImportError> {
        let raw_origin = attributes.get("origin_id").cloned();
        let mut a = sanitizer.sanitize(Self::SCHEMA, attributes);
        let origin_id = require_origin_id(&mut a, raw_origin, EntityType::Post)?;

        let post_type = match a.take_string("type") {
            t if t.is_empty() => "post".to_string(),
            t => t,
        };

        Ok(Self {
            origin_id,
            id: LocalIdSlot::default(),
            title: a.take_string("title"),
            guid: a.take_string("guid"),
            date: a.take_date("date").unwrap_or_else(Utc::now),
            comment_status: a.take_string("comment_status"),
            ping_status: a.take_string("ping_status"),
            post_type,
            status: a.take_string("status"),
            is_sticky: a.take_bool("is_sticky"),
            origin_link: a.take_string("origin_link"),
            excerpt: a.take_string("excerpt"),
            content: a.take_string("content"),
            name: a.take_string("name"),
            origin_author_id: a.take_int("origin_author_id").and_then(OriginId::from_reference),
            origin_parent_post_id: a
                .take_int("origin_parent_post_id")
                .and_then(OriginId::from_reference),
            menu_order: a.take_int("menu_order").unwrap_or(0),
            password: a.take_string("password"),
            terms: a.take_terms("terms"),
            meta: a.take_meta("meta"),
            locale_relations: a.take_locales("locale_relations"),
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn guid(&self) -> &str {
        &self.guid
    }

    pub fn date(&self) -> DateTime<Utc> {
        self.date
    }

    pub fn comment_status(&self) -> &str {
        &self.comment_status
    }

    pub fn ping_status(&self) -> &str {
        &self.ping_status
    }

    /// Content type (`post`, `page`, `attachment`, ...)
    pub fn post_type(&self) -> &str {
        &self.post_type
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn is_sticky(&self) -> bool {
        self.is_sticky
    }

    pub fn origin_link(&self) -> &str {
        &self.origin_link
    }

    pub fn excerpt(&self) -> &str {
        &self.excerpt
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// URL slug
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn origin_author_id(&self) -> Option<OriginId> {
        self.origin_author_id
    }

    pub fn origin_parent_post_id(&self) -> Option<OriginId> {
        self.origin_parent_post_id
    }

    pub fn menu_order(&self) -> i64 {
        self.menu_order
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn terms(&self) -> &[TermReference] {
        &self.terms
    }
}

impl ImportEntity for ImportPost {
    const ENTITY_TYPE: EntityType = EntityType::Post;

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

    fn locale_relations(&self) -> &[LocaleRelation] {
        &self.locale_relations
    }

    fn references(&self) -> Vec<Reference> {
        let mut refs = Vec::with_capacity(2 + self.terms.len());
        if let Some(author) = self.origin_author_id {
            refs.push(Reference::new(RelationKind::PostAuthor, author));
        }
        if let Some(parent) = self.origin_parent_post_id {
            refs.push(Reference::new(RelationKind::PostParent, parent));
        }
        refs.extend(
            self.terms
                .iter()
                .map(|term| Reference::new(RelationKind::PostTerm, term.origin_id)),
        );
        refs
    }

    fn create_in(&self, host: &mut dyn ImportHost) -> Result<LocalId, HostError> {
        host.create_post(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::sanitize::{AttrValue, TypeCastSanitizer};

    fn attributes() -> Attributes {
        Attributes::new()
            .with("origin_id", "12")
            .with("title", "Hello World")
            .with("date", "2014-05-06 07:08:09")
            .with("is_sticky", "1")
            .with("origin_author_id", "3")
            .with("origin_parent_post_id", "0")
            .with("menu_order", "oops")
    }

    #[test]
    fn test_construction_coerces_fields() {
        let post = ImportPost::new(attributes(), &TypeCastSanitizer).unwrap();

        assert_eq!(post.origin_id(), OriginId(12));
        assert_eq!(post.title(), "Hello World");
        assert_eq!(post.post_type(), "post");
        assert!(post.is_sticky());
        assert_eq!(post.origin_author_id(), Some(OriginId(3)));
        assert_eq!(post.origin_parent_post_id(), None);
        assert_eq!(post.menu_order(), 0);
        assert_eq!(post.local_id(), None);
    }

    #[test]
    fn test_missing_origin_id_is_parse_error() {
        let attrs = Attributes::new().with("title", "No id");
        let result = ImportPost::new(attrs, &TypeCastSanitizer);
        assert!(matches!(result, Err(ImportError::Parse(_))));
    }

    #[test]
    fn test_absent_date_defaults_to_now() {
        let before = Utc::now();
        let post = ImportPost::new(Attributes::new().with("origin_id", 1_i64), &TypeCastSanitizer)
            .unwrap();
        assert!(post.date() >= before);
    }

    #[test]
    fn test_references_in_declaration_order() {
        let mut attrs = attributes().with("origin_parent_post_id", "40");
        attrs.insert(
            "terms",
            AttrValue::Terms(vec![TermReference {
                taxonomy: "category".into(),
                slug: "news".into(),
                origin_id: OriginId(5),
            }]),
        );

        let post = ImportPost::new(attrs, &TypeCastSanitizer).unwrap();
        let refs = post.references();

        assert_eq!(
            refs,
            vec![
                Reference::new(RelationKind::PostAuthor, OriginId(3)),
                Reference::new(RelationKind::PostParent, OriginId(40)),
                Reference::new(RelationKind::PostTerm, OriginId(5)),
            ]
        );
    }

    #[test]
    fn test_local_id_is_write_once() {
        let mut post = ImportPost::new(attributes(), &TypeCastSanitizer).unwrap();

        post.assign_local_id(LocalId(100)).unwrap();
        assert!(post.assign_local_id(LocalId(101)).is_err());
        assert_eq!(post.local_id(), Some(LocalId(100)));
    }
}
