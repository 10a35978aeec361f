//! Read-only entity collections consumed by the mappers.
//!
//! The engine only needs "all entities" as an iterable of
//! `(URI, attribute -> set of values)`. `MemoryCache` is the in-process
//! implementation used by the CLI and by tests; other backends implement
//! `Cache` directly.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::error::BoxError;

/// An entity: a URI plus multi-valued attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub uri: String,
    #[serde(default)]
    pub properties: BTreeMap<String, BTreeSet<String>>,
}

impl Entity {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            properties: BTreeMap::new(),
        }
    }

    /// Builder-style helper: add one value for `property`.
    pub fn with_value(mut self, property: &str, value: &str) -> Self {
        self.add_value(property, value);
        self
    }

    pub fn add_value(&mut self, property: &str, value: &str) {
        self.properties
            .entry(property.to_string())
            .or_default()
            .insert(value.to_string());
    }

    /// Values of `property`; empty when the entity lacks the attribute.
    pub fn values(&self, property: &str) -> impl Iterator<Item = &str> {
        self.properties
            .get(property)
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }
}

/// A collection of entities the engine can read.
pub trait Cache: Sync {
    /// Number of entities (used by cost estimators).
    fn size(&self) -> usize;

    /// Iterate all entities. Backends that can fail mid-iteration yield `Err`.
    fn entities(&self) -> Box<dyn Iterator<Item = Result<&Entity, BoxError>> + '_>;
}

/// In-memory cache keyed by URI, iterated in insertion order.
#[derive(Debug, Clone, Default)]
pub struct MemoryCache {
    entities: Vec<Entity>,
    by_uri: AHashMap<String, usize>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `(uri, property, value)`, creating the entity on first use.
    pub fn add_triple(&mut self, uri: &str, property: &str, value: &str) {
        let idx = self.slot(uri);
        self.entities[idx].add_value(property, value);
    }

    /// Insert an entity, merging its values into an existing one with the same URI.
    pub fn insert(&mut self, entity: Entity) {
        let idx = self.slot(&entity.uri);
        let existing = &mut self.entities[idx];
        for (property, values) in entity.properties {
            existing.properties.entry(property).or_default().extend(values);
        }
    }

    pub fn get(&self, uri: &str) -> Option<&Entity> {
        self.by_uri.get(uri).map(|&idx| &self.entities[idx])
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Parse a JSON array of entities: `[{"uri": "...", "properties": {"name": ["..."]}}]`.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        let entities: Vec<Entity> = serde_json::from_str(json)?;
        Ok(entities.into_iter().collect())
    }

    pub fn from_json_file(path: &Path) -> Result<Self, BoxError> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::from_json_str(&text)?)
    }

    fn slot(&mut self, uri: &str) -> usize {
        if let Some(&idx) = self.by_uri.get(uri) {
            return idx;
        }
        let idx = self.entities.len();
        self.entities.push(Entity::new(uri));
        self.by_uri.insert(uri.to_string(), idx);
        idx
    }
}

impl FromIterator<Entity> for MemoryCache {
    fn from_iter<I: IntoIterator<Item = Entity>>(iter: I) -> Self {
        let mut cache = MemoryCache::new();
        for entity in iter {
            cache.insert(entity);
        }
        cache
    }
}

impl Cache for MemoryCache {
    fn size(&self) -> usize {
        self.entities.len()
    }

    fn entities(&self) -> Box<dyn Iterator<Item = Result<&Entity, BoxError>> + '_> {
        Box::new(self.entities.iter().map(Ok))
    }
}
