//! Custom field value filtering
//!
//! Custom fields often embed identifiers or site-specific strings that must be
//! rewritten for the target installation. Filters are configured per
//! (entity type, meta key) and run as an ordered chain over every value.

use super::entity::{ImportMeta, MetaValue};
use super::id_mapper::IdMapper;
use crate::types::{EntityType, LocalId, OriginId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// One value transformation in a filter chain
pub trait ValueFilter: Send + Sync + fmt::Debug {
    /// Short name used in diagnostics
    fn name(&self) -> &str;

    /// Whether `value` can be filtered for the object at `object_id`
    fn is_filterable(&self, value: &str, object_id: LocalId) -> bool;

    /// Transform `value`; only called when `is_filterable` returned true
    fn filter(&self, value: &str, object_id: LocalId) -> String;
}

/// Rewrites an origin id stored in a custom field to the mapped local id
#[derive(Debug)]
pub struct OriginIdFilter {
    target: EntityType,
    mapper: Arc<IdMapper>,
}

impl OriginIdFilter {
    pub fn new(target: EntityType, mapper: Arc<IdMapper>) -> Self {
        Self { target, mapper }
    }

    fn lookup(&self, value: &str) -> Option<LocalId> {
        OriginId::parse(value.trim()).and_then(|origin| self.mapper.resolve(self.target, origin))
    }
}

impl ValueFilter for OriginIdFilter {
    fn name(&self) -> &str {
        "origin_id"
    }

    fn is_filterable(&self, value: &str, _object_id: LocalId) -> bool {
        self.lookup(value).is_some()
    }

    fn filter(&self, value: &str, _object_id: LocalId) -> String {
        match self.lookup(value) {
            Some(local) => local.to_string(),
            None => value.to_string(),
        }
    }
}

/// Strips surrounding whitespace
#[derive(Debug, Clone, Copy, Default)]
pub struct TrimFilter;

impl ValueFilter for TrimFilter {
    fn name(&self) -> &str {
        "trim"
    }

    fn is_filterable(&self, _value: &str, _object_id: LocalId) -> bool {
        true
    }

    fn filter(&self, value: &str, _object_id: LocalId) -> String {
        value.trim().to_string()
    }
}

/// Plain substring replacement, e.g. for rewriting the site URL
#[derive(Debug, Clone)]
pub struct ReplaceFilter {
    from: String,
    to: String,
}

impl ReplaceFilter {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

impl ValueFilter for ReplaceFilter {
    fn name(&self) -> &str {
        "replace"
    }

    fn is_filterable(&self, value: &str, _object_id: LocalId) -> bool {
        !self.from.is_empty() && value.contains(&self.from)
    }

    fn filter(&self, value: &str, _object_id: LocalId) -> String {
        value.replace(&self.from, &self.to)
    }
}

/// Source of filter chains, read-only during a run
pub trait MetaFilterList: Send + Sync {
    /// Ordered filters for one custom field of one entity type
    fn filters(&self, entity_type: EntityType, key: &str) -> Vec<Arc<dyn ValueFilter>>;
}

/// Built-in filter selection as written in configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FilterKind {
    OriginId { target: EntityType },
    Trim,
    Replace { from: String, to: String },
}

/// One configured filter: entity type + meta key + filter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterRule {
    pub entity: EntityType,
    pub key: String,
    pub filter: FilterKind,
}

/// Filter chains keyed by (entity type, meta key)
#[derive(Debug, Default)]
pub struct FilterRegistry {
    chains: HashMap<(EntityType, String), Vec<Arc<dyn ValueFilter>>>,
}

impl FilterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build chains from configured rules, in rule order
    pub fn from_rules(rules: &[FilterRule], mapper: Arc<IdMapper>) -> Self {
        let mut registry = Self::new();
        for rule in rules {
            let filter: Arc<dyn ValueFilter> = match &rule.filter {
                FilterKind::OriginId { target } => {
                    Arc::new(OriginIdFilter::new(*target, mapper.clone()))
                }
                FilterKind::Trim => Arc::new(TrimFilter),
                FilterKind::Replace { from, to } => Arc::new(ReplaceFilter::new(from, to)),
            };
            registry.add(rule.entity, rule.key.clone(), filter);
        }
        registry
    }

    /// Append a filter to the chain of one field
    pub fn add(
        &mut self,
        entity_type: EntityType,
        key: impl Into<String>,
        filter: Arc<dyn ValueFilter>,
    ) {
        self.chains
            .entry((entity_type, key.into()))
            .or_default()
            .push(filter);
    }

    /// Number of configured chains
    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}

impl MetaFilterList for FilterRegistry {
    fn filters(&self, entity_type: EntityType, key: &str) -> Vec<Arc<dyn ValueFilter>> {
        self.chains
            .get(&(entity_type, key.to_string()))
            .cloned()
            .unwrap_or_default()
    }
}

/// Applies the configured chains to the custom fields of one entity type
pub struct MetaFilter {
    list: Arc<dyn MetaFilterList>,
    entity_type: EntityType,
}

impl MetaFilter {
    pub fn new(list: Arc<dyn MetaFilterList>, entity_type: EntityType) -> Self {
        Self { list, entity_type }
    }

    /// Filtered value of a custom field, with the input's cardinality
    pub fn filter_value(&self, meta: &ImportMeta, object_id: LocalId) -> MetaValue {
        let chain = self.list.filters(self.entity_type, &meta.key);
        if chain.is_empty() {
            return meta.value.clone();
        }

        match &meta.value {
            MetaValue::Single(value) => {
                MetaValue::Single(self.apply(&chain, &meta.key, value, object_id))
            }
            MetaValue::Multiple(values) => MetaValue::Multiple(
                values
                    .iter()
                    .map(|value| self.apply(&chain, &meta.key, value, object_id))
                    .collect(),
            ),
        }
    }

    fn apply(
        &self,
        chain: &[Arc<dyn ValueFilter>],
        key: &str,
        value: &str,
        object_id: LocalId,
    ) -> String {
        let mut current = value.to_string();
        for filter in chain {
            if !filter.is_filterable(&current, object_id) {
                debug!(
                    entity = %self.entity_type,
                    key,
                    filter = filter.name(),
                    object_id = object_id.get(),
                    "Skipping inapplicable meta filter"
                );
                continue;
            }
            current = filter.filter(&current, object_id);
        }
        current
    }
}

impl fmt::Debug for MetaFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetaFilter")
            .field("entity_type", &self.entity_type)
            .finish()
    }
}
