//! User value object

use super::{require_origin_id, ImportEntity, ImportMeta, LocalIdSlot};
use crate::import::host::ImportHost;
use crate::import::sanitize::{Attributes, FieldType, ParameterSanitizer, TypeSchema};
use crate::import::source::{AlreadyAssigned, HostError, ImportError};
use crate::types::{EntityType, LocalId, OriginId};

/// An author account
#[derive(Debug, Clone, PartialEq)]
pub struct ImportUser {
    origin_id: OriginId,
    id: LocalIdSlot,
    login: String,
    email: String,
    display_name: String,
    first_name: String,
    last_name: String,
    meta: Vec<ImportMeta>,
}

impl ImportUser {
    pub const SCHEMA: &'static TypeSchema = &[
        ("origin_id", FieldType::Int),
        ("login", FieldType::Str),
        ("email", FieldType::Str),
        ("display_name", FieldType::Str),
        ("first_name", FieldType::Str),
        ("last_name", FieldType::Str),
        ("meta", FieldType::Meta),
    ];

    pub fn new(
        attributes: Attributes,
        sanitizer: &dyn ParameterSanitizer,
    ) -> Result<Self, ImportError> {
        let raw_origin = attributes.get("origin_id").cloned();
        let mut a = sanitizer.sanitize(Self::SCHEMA, attributes);
        let origin_id = require_origin_id(&mut a, raw_origin, EntityType::User)?;

        Ok(Self {
            origin_id,
            id: LocalIdSlot::default(),
            login: a.take_string("login"),
            email: a.take_string("email"),
            display_name: a.take_string("display_name"),
            first_name: a.take_string("first_name"),
            last_name: a.take_string("last_name"),
            meta: a.take_meta("meta"),
        })
    }

    pub fn login(&self) -> &str {
        &self.login
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    pub fn last_name(&self) -> &str {
        &self.last_name
    }
}

impl ImportEntity for ImportUser {
    const ENTITY_TYPE: EntityType = EntityType::User;

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

    fn create_in(&self, host: &mut dyn ImportHost) -> Result<LocalId, HostError> {
        host.create_user(self)
    }
}
