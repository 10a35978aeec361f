//! Soundlink: Phonetic Blocking for Link Discovery
//!
//! Given two collections of entities (source and target), a pair of comparable
//! attributes and a similarity threshold, Soundlink produces every
//! cross-collection entity pair whose attribute values are phonetically
//! similar enough, together with a score.
//!
//! Comparing every source value with every target value is quadratic. Instead:
//!
//! 1. **Value aggregation**: deduplicate values per side (`values`)
//! 2. **Blocking**: group distinct values by fixed-length phonetic code (`inverted`)
//! 3. **Trie index**: prefix tree over target codes (`trie`)
//! 4. **Bounded search**: substitution-only traversal within a distance budget (`search`)
//! 5. **Assembly**: expand matched code groups into entity pairs, keeping the
//!    maximum score per pair (`assemble`, `mapping`)
//!
//! The work is proportional to the number of *distinct* codes and the allowed
//! distance, not to `|source| * |target|`.
//!
//! ## Module Organization
//!
//! - `mapper`: the `Mapper` contract, `SoundexMapper`, cancellation, registry
//! - `temporal`: begin-date blocking strategy behind the same contract
//! - `encoder`: pluggable fixed-length phonetic encoders (Soundex by default)
//! - `cache`: read-only entity collections

pub mod assemble;
pub mod attribute;
pub mod cache;
pub mod config;
pub mod cost;
pub mod encoder;
pub mod error;
pub mod inverted;
pub mod mapper;
pub mod mapping;
pub mod search;
pub mod temporal;
pub mod trie;
pub mod values;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

// Re-export key types
pub use attribute::{resolve_property_label, AttributePair, SimilarityInvocation};
pub use cache::{Cache, Entity, MemoryCache};
pub use config::SoundexMapperConfig;
pub use cost::CostModel;
pub use encoder::{code_similarity, PhoneticEncoder, Soundex};
pub use error::{BoxError, Collaborator, MapperError};
pub use mapper::{
    CancelFlag, Completion, Diagnostics, Mapper, MapperRegistry, MappingOutcome, SoundexMapper,
};
pub use mapping::Mapping;
pub use search::{max_distance, BoundedSearcher, MatchGroup};
pub use temporal::TemporalMapper;
pub use trie::TrieIndex;

// ============================================================================
// URI Interning (Compact Entity Ids)
// ============================================================================

/// Interned string ID (4 bytes instead of 24+ for String)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct StrId(u32);

impl StrId {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// String interner: maps entity URIs to dense ids.
///
/// One interner is owned by each side of a single `compute_mapping` call, so
/// ids are dense (`0..len`) and assigned in first-seen order.
#[derive(Debug, Default, Clone)]
pub struct Interner {
    /// String to ID mapping
    str_to_id: AHashMap<String, StrId>,
    /// ID to string mapping (for reverse lookup)
    id_to_str: Vec<String>,
}

impl Interner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a string, returning its ID
    pub fn intern(&mut self, s: &str) -> StrId {
        if let Some(id) = self.str_to_id.get(s) {
            return *id;
        }

        let id = StrId(self.id_to_str.len() as u32);
        self.str_to_id.insert(s.to_string(), id);
        self.id_to_str.push(s.to_string());
        id
    }

    /// Look up an existing ID for a string without inserting.
    pub fn id_of(&self, s: &str) -> Option<StrId> {
        self.str_to_id.get(s).copied()
    }

    /// Look up string by ID
    pub fn lookup(&self, id: StrId) -> Option<&str> {
        self.id_to_str.get(id.0 as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.id_to_str.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_to_str.is_empty()
    }
}
