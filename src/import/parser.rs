//! Export record → value object parsers
//!
//! One parser per entity type. A parser maps the WXR sub-fields of a record
//! onto the attribute names of its value object, collects repeated sub-fields
//! (meta, translations, post terms) in source order and leaves type coercion
//! to the value object's sanitizer.

use super::entity::{
    ImportComment, ImportEntity, ImportMeta, ImportPost, ImportTerm, ImportUser, LocaleRelation,
    TermReference,
};
use super::item::Item;
use super::sanitize::{parse_date, AttrValue, Attributes, ParameterSanitizer, TypeCastSanitizer};
use super::source::ImportError;
use crate::types::OriginId;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::debug;

/// Export element name → value object attribute name
type FieldMap = [(&'static str, &'static str)];

/// Converts one wrapped export record into a value object
pub trait EntityParser {
    type Entity: ImportEntity;

    /// Element name of the records this parser understands
    fn element(&self) -> &'static str;

    /// Build the value object; fails only on a missing or invalid origin id
    fn parse(&self, item: &Item<'_>) -> Result<Self::Entity, ImportError>;
}

/// Copy every mapped sub-field that is present
fn map_fields(item: &Item<'_>, map: &FieldMap) -> Attributes {
    let mut attributes = Attributes::new();
    for &(element, key) in map {
        attributes.insert_opt(key, item.field(element));
    }
    attributes
}

/// Group `<meta_element>` children into meta entries
fn collect_meta(item: &Item<'_>, meta_element: &str) -> AttrValue {
    let pairs = item.children(meta_element).filter_map(|meta| {
        let key = meta.field_trimmed("wp:meta_key")?;
        Some((key, meta.field("wp:meta_value").unwrap_or_default()))
    });
    AttrValue::Meta(ImportMeta::group(pairs))
}

/// Collect `<wp:translation>` children
fn collect_locales(item: &Item<'_>) -> AttrValue {
    let relations = item
        .children("wp:translation")
        .filter_map(|translation| {
            let locale = translation.field_trimmed("wp:locale")?;
            let origin_id = translation
                .field_trimmed("wp:element_id")
                .and_then(OriginId::parse)?;
            Some(LocaleRelation {
                locale: locale.to_string(),
                origin_id,
            })
        })
        .collect();
    AttrValue::Locales(relations)
}

/// First parseable date among `candidates`, else now
fn first_date(item: &Item<'_>, candidates: &[&str]) -> DateTime<Utc> {
    candidates
        .iter()
        .filter_map(|name| item.field_trimmed(name))
        .find_map(parse_date)
        .unwrap_or_else(Utc::now)
}

// ============================================================================
// Users
// ============================================================================

/// Parses `<wp:author>` records
#[derive(Clone)]
pub struct WpUserParser {
    sanitizer: Arc<dyn ParameterSanitizer>,
}

impl WpUserParser {
    const FIELDS: &'static FieldMap = &[
        ("wp:author_id", "origin_id"),
        ("wp:author_login", "login"),
        ("wp:author_email", "email"),
        ("wp:author_display_name", "display_name"),
        ("wp:author_first_name", "first_name"),
        ("wp:author_last_name", "last_name"),
    ];

    pub fn new(sanitizer: Arc<dyn ParameterSanitizer>) -> Self {
        Self { sanitizer }
    }
}

impl Default for WpUserParser {
    fn default() -> Self {
        Self::new(Arc::new(TypeCastSanitizer))
    }
}

impl EntityParser for WpUserParser {
    type Entity = ImportUser;

    fn element(&self) -> &'static str {
        "wp:author"
    }

    fn parse(&self, item: &Item<'_>) -> Result<ImportUser, ImportError> {
        let mut attributes = map_fields(item, Self::FIELDS);
        attributes.insert("meta", collect_meta(item, "wp:usermeta"));

        ImportUser::new(attributes, self.sanitizer.as_ref())
    }
}

// ============================================================================
// Terms
// ============================================================================

/// Parses `<wp:category>` records (any taxonomy)
#[derive(Clone)]
pub struct WpTermParser {
    sanitizer: Arc<dyn ParameterSanitizer>,
}

impl WpTermParser {
    const FIELDS: &'static FieldMap = &[
        ("wp:term_id", "origin_id"),
        ("wp:term_taxonomy", "taxonomy"),
        ("wp:cat_name", "name"),
        ("wp:category_nicename", "slug"),
        ("wp:category_description", "description"),
    ];

    pub fn new(sanitizer: Arc<dyn ParameterSanitizer>) -> Self {
        Self { sanitizer }
    }
}

impl Default for WpTermParser {
    fn default() -> Self {
        Self::new(Arc::new(TypeCastSanitizer))
    }
}

impl EntityParser for WpTermParser {
    type Entity = ImportTerm;

    fn element(&self) -> &'static str {
        "wp:category"
    }

    fn parse(&self, item: &Item<'_>) -> Result<ImportTerm, ImportError> {
        let mut attributes = map_fields(item, Self::FIELDS);

        // Plain WXR stores the parent slug here; only numeric ids are references
        if let Some(parent) = item.field_trimmed("wp:category_parent") {
            match OriginId::parse(parent).map(|id| i64::try_from(id.get())) {
                Some(Ok(id)) => attributes.insert("origin_parent_term_id", id),
                Some(Err(_)) => debug!("Ignoring out-of-range term parent '{}'", parent),
                None => debug!("Ignoring non-numeric term parent '{}'", parent),
            }
        }

        attributes.insert("meta", collect_meta(item, "wp:termmeta"));
        attributes.insert("locale_relations", collect_locales(item));

        ImportTerm::new(attributes, self.sanitizer.as_ref())
    }
}

// ============================================================================
// Posts
// ============================================================================

/// Parses `<item>` records (posts, pages, attachments, custom types)
#[derive(Clone)]
pub struct WpPostParser {
    sanitizer: Arc<dyn ParameterSanitizer>,
}

impl WpPostParser {
    const FIELDS: &'static FieldMap = &[
        ("wp:post_id", "origin_id"),
        ("title", "title"),
        ("guid", "guid"),
        ("wp:comment_status", "comment_status"),
        ("wp:ping_status", "ping_status"),
        ("wp:post_type", "type"),
        ("wp:status", "status"),
        ("wp:is_sticky", "is_sticky"),
        ("link", "origin_link"),
        ("excerpt:encoded", "excerpt"),
        ("content:encoded", "content"),
        ("wp:post_name", "name"),
        ("wp:post_author", "origin_author_id"),
        ("wp:post_parent", "origin_parent_post_id"),
        ("wp:menu_order", "menu_order"),
        ("wp:post_password", "password"),
    ];

    pub fn new(sanitizer: Arc<dyn ParameterSanitizer>) -> Self {
        Self { sanitizer }
    }

    /// `<category domain=".." nicename=".." term_id="..">` references
    fn terms(item: &Item<'_>) -> AttrValue {
        let terms = item
            .children("category")
            .filter_map(|category| {
                let slug = category.attr("nicename").unwrap_or_default();
                let Some(origin_id) = category.attr("term_id").and_then(OriginId::parse) else {
                    debug!("Skipping post term '{}' without term id", slug);
                    return None;
                };
                Some(TermReference {
                    taxonomy: category.attr("domain").unwrap_or("category").to_string(),
                    slug: slug.to_string(),
                    origin_id,
                })
            })
            .collect();
        AttrValue::Terms(terms)
    }
}

impl Default for WpPostParser {
    fn default() -> Self {
        Self::new(Arc::new(TypeCastSanitizer))
    }
}

impl EntityParser for WpPostParser {
    type Entity = ImportPost;

    fn element(&self) -> &'static str {
        "item"
    }

    fn parse(&self, item: &Item<'_>) -> Result<ImportPost, ImportError> {
        let mut attributes = map_fields(item, Self::FIELDS);
        attributes.insert(
            "date",
            AttrValue::Date(first_date(
                item,
                &["wp:post_date_gmt", "wp:post_date", "pubDate"],
            )),
        );
        attributes.insert("terms", Self::terms(item));
        attributes.insert("meta", collect_meta(item, "wp:postmeta"));
        attributes.insert("locale_relations", collect_locales(item));

        ImportPost::new(attributes, self.sanitizer.as_ref())
    }
}

// ============================================================================
// Comments
// ============================================================================

/// Parses `<wp:comment>` records
#[derive(Clone)]
pub struct WpCommentParser {
    sanitizer: Arc<dyn ParameterSanitizer>,
}

impl WpCommentParser {
    const FIELDS: &'static FieldMap = &[
        ("wp:comment_id", "origin_id"),
        ("wp:comment_post_id", "origin_post_id"),
        ("wp:comment_author", "author_name"),
        ("wp:comment_author_email", "author_email"),
        ("wp:comment_author_url", "author_url"),
        ("wp:comment_author_IP", "author_ip"),
        ("wp:comment_content", "content"),
        ("wp:comment_karma", "karma"),
        ("wp:comment_approved", "approved"),
        ("wp:comment_agent", "agent"),
        ("wp:comment_type", "type"),
        ("wp:comment_parent", "origin_parent_comment_id"),
        ("wp:comment_user_id", "origin_user_id"),
    ];

    pub fn new(sanitizer: Arc<dyn ParameterSanitizer>) -> Self {
        Self { sanitizer }
    }
}

impl Default for WpCommentParser {
    fn default() -> Self {
        Self::new(Arc::new(TypeCastSanitizer))
    }
}

impl EntityParser for WpCommentParser {
    type Entity = ImportComment;

    fn element(&self) -> &'static str {
        "wp:comment"
    }

    fn parse(&self, item: &Item<'_>) -> Result<ImportComment, ImportError> {
        let mut attributes = map_fields(item, Self::FIELDS);
        attributes.insert(
            "date",
            AttrValue::Date(first_date(item, &["wp:comment_date_gmt", "wp:comment_date"])),
        );
        attributes.insert("meta", collect_meta(item, "wp:commentmeta"));

        ImportComment::new(attributes, self.sanitizer.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::entity::MetaValue;
    use crate::import::reader::XmlNodeReader;
    use crate::types::{Reference, RelationKind};
    use chrono::{Datelike, Timelike};
    use std::io::Cursor;

    fn parse_first<P: EntityParser>(parser: &P, xml: &str) -> Result<P::Entity, ImportError> {
        let mut reader = XmlNodeReader::new(Cursor::new(xml.as_bytes().to_vec()), parser.element());
        let node = reader.next().unwrap().unwrap();
        parser.parse(&Item::new(&node))
    }

    #[test]
    fn test_parse_user_with_meta() {
        let user = parse_first(
            &WpUserParser::default(),
            r#"<rss><wp:author>
                <wp:author_id>3</wp:author_id>
                <wp:author_login><![CDATA[editor]]></wp:author_login>
                <wp:author_email>ed@example.com</wp:author_email>
                <wp:usermeta><wp:meta_key>nickname</wp:meta_key><wp:meta_value>Ed</wp:meta_value></wp:usermeta>
            </wp:author></rss>"#,
        )
        .unwrap();

        assert_eq!(user.origin_id(), OriginId(3));
        assert_eq!(user.login(), "editor");
        assert_eq!(user.meta(), &[ImportMeta::single("nickname", "Ed")]);
    }

    #[test]
    fn test_parse_term_parent_and_translations() {
        let term = parse_first(
            &WpTermParser::default(),
            r#"<rss><wp:category>
                <wp:term_id>9</wp:term_id>
                <wp:category_nicename>sub</wp:category_nicename>
                <wp:category_parent>8</wp:category_parent>
                <wp:cat_name><![CDATA[Sub]]></wp:cat_name>
                <wp:translation><wp:locale>de_DE</wp:locale><wp:element_id>19</wp:element_id></wp:translation>
                <wp:translation><wp:locale>fr_FR</wp:locale><wp:element_id>29</wp:element_id></wp:translation>
            </wp:category></rss>"#,
        )
        .unwrap();

        assert_eq!(term.slug(), "sub");
        assert_eq!(term.origin_parent_term_id(), Some(OriginId(8)));
        let locales: Vec<_> = term
            .locale_relations()
            .iter()
            .map(|r| (r.locale.as_str(), r.origin_id))
            .collect();
        assert_eq!(locales, vec![("de_DE", OriginId(19)), ("fr_FR", OriginId(29))]);
    }

    #[test]
    fn test_slug_parent_is_ignored() {
        let term = parse_first(
            &WpTermParser::default(),
            r#"<rss><wp:category>
                <wp:term_id>9</wp:term_id>
                <wp:category_parent>news</wp:category_parent>
            </wp:category></rss>"#,
        )
        .unwrap();

        assert_eq!(term.origin_parent_term_id(), None);
        assert!(term.references().is_empty());
    }

    #[test]
    fn test_out_of_range_parent_is_ignored() {
        let term = parse_first(
            &WpTermParser::default(),
            r#"<rss><wp:category>
                <wp:term_id>9</wp:term_id>
                <wp:category_parent>18446744073709551615</wp:category_parent>
            </wp:category></rss>"#,
        )
        .unwrap();

        assert_eq!(term.origin_parent_term_id(), None);
        assert!(term.references().is_empty());
    }

    #[test]
    fn test_unparseable_term_id_is_reported_verbatim() {
        let err = parse_first(
            &WpTermParser::default(),
            r#"<rss><wp:category><wp:term_id>seventy</wp:term_id></wp:category></rss>"#,
        )
        .unwrap_err();

        assert!(matches!(err, ImportError::Parse(_)));
        assert!(err.to_string().contains("'seventy'"));
    }

    #[test]
    fn test_parse_post() {
        let post = parse_first(
            &WpPostParser::default(),
            r#"<rss><channel><item>
                <title>Hello</title>
                <pubDate>Mon, 10 Nov 2014 09:15:01 +0000</pubDate>
                <content:encoded><![CDATA[<p>Body</p>]]></content:encoded>
                <wp:post_id>12</wp:post_id>
                <wp:post_date>2014-11-10 10:15:01</wp:post_date>
                <wp:post_date_gmt>2014-11-10 09:15:01</wp:post_date_gmt>
                <wp:post_type>page</wp:post_type>
                <wp:is_sticky>1</wp:is_sticky>
                <wp:post_author>3</wp:post_author>
                <wp:post_parent>0</wp:post_parent>
                <category domain="category" nicename="news" term_id="8"><![CDATA[News]]></category>
                <category domain="post_tag" nicename="rust"><![CDATA[Rust]]></category>
                <wp:postmeta><wp:meta_key>color</wp:meta_key><wp:meta_value>red</wp:meta_value></wp:postmeta>
                <wp:postmeta><wp:meta_key>color</wp:meta_key><wp:meta_value>blue</wp:meta_value></wp:postmeta>
            </item></channel></rss>"#,
        )
        .unwrap();

        assert_eq!(post.origin_id(), OriginId(12));
        assert_eq!(post.title(), "Hello");
        assert_eq!(post.content(), "<p>Body</p>");
        assert_eq!(post.post_type(), "page");
        assert!(post.is_sticky());
        assert_eq!((post.date().hour(), post.date().minute()), (9, 15));
        assert_eq!(
            post.meta()[0].value,
            MetaValue::Multiple(vec!["red".into(), "blue".into()])
        );
        // Parent 0 means none; the term without an id is skipped
        assert_eq!(
            post.references(),
            vec![
                Reference::new(RelationKind::PostAuthor, OriginId(3)),
                Reference::new(RelationKind::PostTerm, OriginId(8)),
            ]
        );
    }

    #[test]
    fn test_post_date_fallbacks() {
        let post = parse_first(
            &WpPostParser::default(),
            r#"<rss><item>
                <wp:post_id>1</wp:post_id>
                <wp:post_date_gmt>0000-00-00 00:00:00</wp:post_date_gmt>
                <pubDate>Tue, 02 Jun 2015 08:00:00 +0000</pubDate>
            </item></rss>"#,
        )
        .unwrap();
        assert_eq!(post.date().year(), 2015);

        let before = Utc::now();
        let undated = parse_first(
            &WpPostParser::default(),
            "<rss><item><wp:post_id>2</wp:post_id></item></rss>",
        )
        .unwrap();
        assert!(undated.date() >= before);
    }

    #[test]
    fn test_parse_comment() {
        let comment = parse_first(
            &WpCommentParser::default(),
            r#"<rss><item><wp:post_id>12</wp:post_id><wp:comment>
                <wp:comment_id>77</wp:comment_id>
                <wp:comment_post_id>12</wp:comment_post_id>
                <wp:comment_author><![CDATA[Ann]]></wp:comment_author>
                <wp:comment_date_gmt>2014-11-11 08:00:00</wp:comment_date_gmt>
                <wp:comment_content>Nice</wp:comment_content>
                <wp:comment_approved>1</wp:comment_approved>
                <wp:comment_parent>76</wp:comment_parent>
                <wp:comment_user_id>0</wp:comment_user_id>
            </wp:comment></item></rss>"#,
        )
        .unwrap();

        assert_eq!(comment.origin_id(), OriginId(77));
        assert_eq!(comment.author_name(), "Ann");
        assert_eq!(comment.date().day(), 11);
        assert_eq!(
            comment.references(),
            vec![
                Reference::new(RelationKind::CommentPost, OriginId(12)),
                Reference::new(RelationKind::CommentParent, OriginId(76)),
            ]
        );
    }

    #[test]
    fn test_missing_origin_id_is_parse_error() {
        let result = parse_first(
            &WpPostParser::default(),
            "<rss><item><title>No id</title></item></rss>",
        );
        assert!(matches!(result, Err(ImportError::Parse(_))));
    }
}
