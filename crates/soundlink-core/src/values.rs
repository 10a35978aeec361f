//! Value aggregation: deduplicate attribute values per side.
//!
//! Each distinct value gets a dense index `0..n` in first-seen order and the
//! set of entities carrying it. Entity URIs are interned so owner sets are
//! Roaring bitmaps of `u32` ids instead of string sets.
//!
//! Indexes are only meaningful within one `compute_mapping` call.

use ahash::AHashMap;
use roaring::RoaringBitmap;

use crate::cache::Cache;
use crate::error::{Collaborator, MapperError};
use crate::{Interner, StrId};

#[derive(Debug, Default, Clone)]
pub struct DistinctValues {
    values: Vec<String>,
    owners: Vec<RoaringBitmap>,
    uris: Interner,
}

impl DistinctValues {
    /// Read `attribute` from every entity in `cache`.
    ///
    /// Entities without the attribute contribute nothing. A failing cache
    /// aborts aggregation with `CollaboratorFailure` tagged with `side`.
    pub fn aggregate(
        cache: &dyn Cache,
        attribute: &str,
        side: Collaborator,
    ) -> Result<Self, MapperError> {
        let mut out = DistinctValues::default();
        let mut index_of: AHashMap<String, u32> = AHashMap::new();

        for entity in cache.entities() {
            let entity = entity.map_err(|e| MapperError::collaborator(side, e))?;
            let mut values = entity.values(attribute).peekable();
            if values.peek().is_none() {
                continue;
            }
            let owner = out.uris.intern(&entity.uri).raw();
            for value in values {
                let idx = match index_of.get(value) {
                    Some(&idx) => idx,
                    None => {
                        let idx = out.values.len() as u32;
                        index_of.insert(value.to_string(), idx);
                        out.values.push(value.to_string());
                        out.owners.push(RoaringBitmap::new());
                        idx
                    }
                };
                out.owners[idx as usize].insert(owner);
            }
        }

        Ok(out)
    }

    /// Number of distinct values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn value(&self, index: u32) -> Option<&str> {
        self.values.get(index as usize).map(String::as_str)
    }

    /// Interned ids of the entities carrying distinct value `index`.
    pub fn owners(&self, index: u32) -> Option<&RoaringBitmap> {
        self.owners.get(index as usize)
    }

    pub fn uri(&self, id: u32) -> Option<&str> {
        self.uris.lookup(StrId::new(id))
    }

    /// Number of entities that contributed at least one value.
    pub fn entity_count(&self) -> usize {
        self.uris.len()
    }
}
