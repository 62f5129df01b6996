//! Schema-driven attribute coercion for entity construction
//!
//! Parsers collect loosely typed attributes from an export record; value
//! objects declare a [`TypeSchema`] and run the attributes through a
//! [`ParameterSanitizer`] before reading them. Unknown keys are dropped and
//! values that cannot be coerced are dropped too, so the field keeps its
//! declared default.

use super::entity::{ImportMeta, LocaleRelation, TermReference};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use std::collections::HashMap;
use tracing::debug;

/// Declared type of an entity field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Int,
    Str,
    Bool,
    Date,
    Terms,
    Meta,
    Locales,
}

/// Field name → declared type
pub type TypeSchema = [(&'static str, FieldType)];

/// A loosely typed attribute value
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Int(i64),
    Str(String),
    Bool(bool),
    Date(DateTime<Utc>),
    Terms(Vec<TermReference>),
    Meta(Vec<ImportMeta>),
    Locales(Vec<LocaleRelation>),
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Str(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Str(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        AttrValue::Int(value)
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        AttrValue::Bool(value)
    }
}

/// Attribute set handed to a value object constructor
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes {
    values: HashMap<String, AttrValue>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<AttrValue>) {
        self.values.insert(key.into(), value.into());
    }

    /// Insert only when a value is present
    pub fn insert_opt(&mut self, key: impl Into<String>, value: Option<impl Into<AttrValue>>) {
        if let Some(value) = value {
            self.insert(key, value);
        }
    }

    pub fn get(&self, key: &str) -> Option<&AttrValue> {
        self.values.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn take(&mut self, key: &str) -> Option<AttrValue> {
        self.values.remove(key)
    }

    pub fn take_int(&mut self, key: &str) -> Option<i64> {
        match self.take(key) {
            Some(AttrValue::Int(v)) => Some(v),
            _ => None,
        }
    }

    pub fn take_string(&mut self, key: &str) -> String {
        match self.take(key) {
            Some(AttrValue::Str(v)) => v,
            _ => String::new(),
        }
    }

    pub fn take_bool(&mut self, key: &str) -> bool {
        matches!(self.take(key), Some(AttrValue::Bool(true)))
    }

    pub fn take_date(&mut self, key: &str) -> Option<DateTime<Utc>> {
        match self.take(key) {
            Some(AttrValue::Date(v)) => Some(v),
            _ => None,
        }
    }

    pub fn take_terms(&mut self, key: &str) -> Vec<TermReference> {
        match self.take(key) {
            Some(AttrValue::Terms(v)) => v,
            _ => Vec::new(),
        }
    }

    pub fn take_meta(&mut self, key: &str) -> Vec<ImportMeta> {
        match self.take(key) {
            Some(AttrValue::Meta(v)) => v,
            _ => Vec::new(),
        }
    }

    pub fn take_locales(&mut self, key: &str) -> Vec<LocaleRelation> {
        match self.take(key) {
            Some(AttrValue::Locales(v)) => v,
            _ => Vec::new(),
        }
    }
}

impl<K: Into<String>> FromIterator<(K, AttrValue)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, AttrValue)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// Validates an attribute set against a schema
pub trait ParameterSanitizer: Send + Sync {
    /// Returns only schema keys, each holding a value of its declared type
    fn sanitize(&self, schema: &TypeSchema, attributes: Attributes) -> Attributes;
}

/// Default sanitizer: casts between scalar representations where lossless
#[derive(Debug, Clone, Copy, Default)]
pub struct TypeCastSanitizer;

impl TypeCastSanitizer {
    fn coerce(field: FieldType, value: AttrValue) -> Option<AttrValue> {
        use AttrValue as V;

        match (field, value) {
            (FieldType::Int, V::Int(v)) => Some(V::Int(v)),
            (FieldType::Int, V::Str(s)) => s.trim().parse().ok().map(V::Int),
            (FieldType::Int, V::Bool(b)) => Some(V::Int(b as i64)),

            (FieldType::Str, V::Str(s)) => Some(V::Str(s)),
            (FieldType::Str, V::Int(v)) => Some(V::Str(v.to_string())),
            (FieldType::Str, V::Bool(b)) => Some(V::Str(if b { "1" } else { "0" }.to_string())),
            (FieldType::Str, V::Date(d)) => Some(V::Str(d.format(WXR_DATE_FORMAT).to_string())),

            (FieldType::Bool, V::Bool(b)) => Some(V::Bool(b)),
            (FieldType::Bool, V::Int(v)) => Some(V::Bool(v != 0)),
            (FieldType::Bool, V::Str(s)) => parse_bool(&s).map(V::Bool),

            (FieldType::Date, V::Date(d)) => Some(V::Date(d)),
            (FieldType::Date, V::Str(s)) => parse_date(&s).map(V::Date),
            (FieldType::Date, V::Int(secs)) => DateTime::from_timestamp(secs, 0).map(V::Date),

            (FieldType::Terms, V::Terms(t)) => Some(V::Terms(t)),
            (FieldType::Meta, V::Meta(m)) => Some(V::Meta(m)),
            (FieldType::Locales, V::Locales(l)) => Some(V::Locales(l)),

            _ => None,
        }
    }
}

impl ParameterSanitizer for TypeCastSanitizer {
    fn sanitize(&self, schema: &TypeSchema, mut attributes: Attributes) -> Attributes {
        let mut valid = Attributes::new();

        for &(key, field) in schema {
            let Some(value) = attributes.take(key) else {
                continue;
            };
            match Self::coerce(field, value) {
                Some(coerced) => valid.insert(key, coerced),
                None => debug!("Dropping attribute '{}': not coercible to {:?}", key, field),
            }
        }

        valid
    }
}

/// Date layout used by WXR exports
pub const WXR_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parse an export date; the zero date and unparseable input yield None
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() || raw.starts_with("0000-00-00") {
        return None;
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, WXR_DATE_FORMAT) {
        return Some(Utc.from_utc_datetime(&naive));
    }

    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_rfc2822(raw))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    const SCHEMA: &TypeSchema = &[
        ("origin_id", FieldType::Int),
        ("title", FieldType::Str),
        ("is_sticky", FieldType::Bool),
        ("date", FieldType::Date),
    ];

    #[test]
    fn test_unknown_keys_are_dropped() {
        let attrs = Attributes::new()
            .with("origin_id", 3_i64)
            .with("unexpected", "value");

        let valid = TypeCastSanitizer.sanitize(SCHEMA, attrs);
        assert_eq!(valid.len(), 1);
        assert!(!valid.contains_key("unexpected"));
    }

    #[test]
    fn test_scalar_coercion() {
        let attrs = Attributes::new()
            .with("origin_id", " 42 ")
            .with("title", 7_i64)
            .with("is_sticky", "1")
            .with("date", "2015-03-04 12:30:00");

        let mut valid = TypeCastSanitizer.sanitize(SCHEMA, attrs);
        assert_eq!(valid.take_int("origin_id"), Some(42));
        assert_eq!(valid.take_string("title"), "7");
        assert!(valid.take_bool("is_sticky"));

        let date = valid.take_date("date").unwrap();
        assert_eq!((date.year(), date.month(), date.day()), (2015, 3, 4));
    }

    #[test]
    fn test_uncoercible_values_fall_back_to_defaults() {
        let attrs = Attributes::new()
            .with("origin_id", "not-a-number")
            .with("is_sticky", "maybe")
            .with("date", "yesterday-ish");

        let mut valid = TypeCastSanitizer.sanitize(SCHEMA, attrs);
        assert!(valid.is_empty());
        assert_eq!(valid.take_int("origin_id"), None);
        assert!(!valid.take_bool("is_sticky"));
        assert_eq!(valid.take_date("date"), None);
        assert_eq!(valid.take_string("title"), "");
    }

    #[test]
    fn test_date_parsing_variants() {
        assert!(parse_date("2014-11-10 09:15:01").is_some());
        assert!(parse_date("Mon, 10 Nov 2014 09:15:01 +0000").is_some());
        assert!(parse_date("2014-11-10T09:15:01Z").is_some());
        assert!(parse_date("0000-00-00 00:00:00").is_none());
        assert!(parse_date("").is_none());
    }
}
