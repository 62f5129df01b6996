//! Taxonomy term value object

use super::{require_origin_id, ImportEntity, ImportMeta, LocalIdSlot, LocaleRelation};
use crate::import::host::ImportHost;
use crate::import::sanitize::{Attributes, FieldType, ParameterSanitizer, TypeSchema};
use crate::import::source::{AlreadyAssigned, HostError, ImportError};
use crate::types::{EntityType, LocalId, OriginId, Reference, RelationKind};

/// A category or other taxonomy term
#[derive(Debug, Clone, PartialEq)]
pub struct ImportTerm {
    origin_id: OriginId,
    id: LocalIdSlot,
    taxonomy: String,
    name: String,
    slug: String,
    description: String,
    origin_parent_term_id: Option<OriginId>,
    meta: Vec<ImportMeta>,
    locale_relations: Vec<LocaleRelation>,
}

impl ImportTerm {
    pub const SCHEMA: &'static TypeSchema = &[
        ("origin_id", FieldType::Int),
        ("taxonomy", FieldType::Str),
        ("name", FieldType::Str),
        ("slug", FieldType::Str),
        ("description", FieldType::Str),
        ("origin_parent_term_id", FieldType::Int),
        ("meta", FieldType::Meta),
        ("locale_relations", FieldType::Locales),
    ];

    pub fn new(
        attributes: Attributes,
        sanitizer: &dyn ParameterSanitizer,
    ) -> Result<Self, ImportError> {
        let raw_origin = attributes.get("origin_id").cloned();
        let mut a = sanitizer.sanitize(Self::SCHEMA, attributes);
        let origin_id = require_origin_id(&mut a, raw_origin, EntityType::Term)?;

        let taxonomy = match a.take_string("taxonomy") {
            t if t.is_empty() => "category".to_string(),
            t => t,
        };

        Ok(Self {
            origin_id,
            id: LocalIdSlot::default(),
            taxonomy,
            name: a.take_string("name"),
            slug: a.take_string("slug"),
            description: a.take_string("description"),
            origin_parent_term_id: a
                .take_int("origin_parent_term_id")
                .and_then(OriginId::from_reference),
            meta: a.take_meta("meta"),
            locale_relations: a.take_locales("locale_relations"),
        })
    }

    pub fn taxonomy(&self) -> &str {
        &self.taxonomy
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn origin_parent_term_id(&self) -> Option<OriginId> {
        self.origin_parent_term_id
    }
}

impl ImportEntity for ImportTerm {
    const ENTITY_TYPE: EntityType = EntityType::Term;

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
        self.origin_parent_term_id
            .map(|parent| Reference::new(RelationKind::TermParent, parent))
            .into_iter()
            .collect()
    }

    fn create_in(&self, host: &mut dyn ImportHost) -> Result<LocalId, HostError> {
        host.create_term(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::sanitize::TypeCastSanitizer;

    #[test]
    fn test_defaults_to_category_taxonomy() {
        let attrs = Attributes::new()
            .with("origin_id", "8")
            .with("name", "News")
            .with("slug", "news");

        let term = ImportTerm::new(attrs, &TypeCastSanitizer).unwrap();
        assert_eq!(term.taxonomy(), "category");
        assert_eq!(term.name(), "News");
        assert!(term.references().is_empty());
    }

    #[test]
    fn test_parent_reference() {
        let attrs = Attributes::new()
            .with("origin_id", "9")
            .with("taxonomy", "post_tag")
            .with("origin_parent_term_id", "8");

        let term = ImportTerm::new(attrs, &TypeCastSanitizer).unwrap();
        assert_eq!(term.taxonomy(), "post_tag");
        assert_eq!(
            term.references(),
            vec![Reference::new(RelationKind::TermParent, OriginId(8))]
        );
    }

    #[test]
    fn test_zero_origin_id_is_rejected() {
        let attrs = Attributes::new().with("origin_id", "0");
        assert!(ImportTerm::new(attrs, &TypeCastSanitizer).is_err());
    }
}
