//! Core identifier and classification types shared across the import pipeline

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Identifiers
// ============================================================================

/// Identifier of an entity in the system being migrated from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OriginId(pub u64);

impl OriginId {
    /// Parse an origin id from export text. Zero and negative values are not ids.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().parse::<u64>() {
            Ok(0) | Err(_) => None,
            Ok(id) => Some(OriginId(id)),
        }
    }

    /// Build from an integer field, treating 0 as "no reference"
    pub fn from_reference(value: i64) -> Option<Self> {
        if value > 0 {
            Some(OriginId(value as u64))
        } else {
            None
        }
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for OriginId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier assigned by the target system on creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalId(pub u64);

impl LocalId {
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Entity Types
// ============================================================================

/// The four kinds of entity carried by an export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    User,
    Term,
    Post,
    Comment,
}

impl EntityType {
    /// Dependency order in which passes must run
    pub const PASS_ORDER: [EntityType; 4] = [
        EntityType::User,
        EntityType::Term,
        EntityType::Post,
        EntityType::Comment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Term => "term",
            Self::Post => "post",
            Self::Comment => "comment",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "user" => Ok(Self::User),
            "term" => Ok(Self::Term),
            "post" => Ok(Self::Post),
            "comment" => Ok(Self::Comment),
            other => Err(format!("unknown entity type '{}'", other)),
        }
    }
}

// ============================================================================
// Relations
// ============================================================================

/// A cross-entity reference carried by an imported entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    /// Term → parent term
    TermParent,
    /// Post → parent post
    PostParent,
    /// Post → author user
    PostAuthor,
    /// Post → assigned term
    PostTerm,
    /// Comment → commented post
    CommentPost,
    /// Comment → parent comment
    CommentParent,
    /// Comment → registered user who wrote it
    CommentAuthor,
}

impl RelationKind {
    /// Entity type of the referencing side
    pub fn source(&self) -> EntityType {
        match self {
            Self::TermParent => EntityType::Term,
            Self::PostParent | Self::PostAuthor | Self::PostTerm => EntityType::Post,
            Self::CommentPost | Self::CommentParent | Self::CommentAuthor => EntityType::Comment,
        }
    }

    /// Entity type the reference points at
    pub fn target(&self) -> EntityType {
        match self {
            Self::TermParent | Self::PostTerm => EntityType::Term,
            Self::PostParent | Self::CommentPost => EntityType::Post,
            Self::PostAuthor | Self::CommentAuthor => EntityType::User,
            Self::CommentParent => EntityType::Comment,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TermParent => "term_parent",
            Self::PostParent => "post_parent",
            Self::PostAuthor => "post_author",
            Self::PostTerm => "post_term",
            Self::CommentPost => "comment_post",
            Self::CommentParent => "comment_parent",
            Self::CommentAuthor => "comment_author",
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A forward reference to another entity, expressed in origin ids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reference {
    pub kind: RelationKind,
    pub origin_id: OriginId,
}

impl Reference {
    pub fn new(kind: RelationKind, origin_id: OriginId) -> Self {
        Self { kind, origin_id }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_id_parsing() {
        assert_eq!(OriginId::parse("42"), Some(OriginId(42)));
        assert_eq!(OriginId::parse(" 7 \n"), Some(OriginId(7)));
        assert_eq!(OriginId::parse("0"), None);
        assert_eq!(OriginId::parse("-3"), None);
        assert_eq!(OriginId::parse("abc"), None);
        assert_eq!(OriginId::from_reference(0), None);
        assert_eq!(OriginId::from_reference(5), Some(OriginId(5)));
    }

    #[test]
    fn test_relation_targets() {
        assert_eq!(RelationKind::PostParent.target(), EntityType::Post);
        assert_eq!(RelationKind::PostAuthor.target(), EntityType::User);
        assert_eq!(RelationKind::PostTerm.target(), EntityType::Term);
        assert_eq!(RelationKind::CommentPost.source(), EntityType::Comment);
        assert_eq!(RelationKind::CommentParent.target(), EntityType::Comment);
    }

    #[test]
    fn test_entity_type_round_trip_from_str() {
        for ty in EntityType::PASS_ORDER {
            assert_eq!(ty.as_str().parse::<EntityType>().unwrap(), ty);
        }
        assert!("page".parse::<EntityType>().is_err());
    }
}
