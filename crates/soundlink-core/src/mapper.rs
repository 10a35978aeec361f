//! The `Mapper` contract and the phonetic-trie strategy.
//!
//! A query planner holds several `Mapper`s, compares their cost estimates and
//! calls `compute_mapping` on the one it picks. `SoundexMapper` is the
//! blocking + bounded trie search engine:
//!
//! ```text
//! source cache ─► DistinctValues ─► InvertedList ───────────────┐
//!                                                                ├─► BoundedSearcher ─► MappingAssembler ─► Mapping
//! target cache ─► DistinctValues ─► InvertedList ─► TrieIndex ──┘
//! ```
//!
//! All state lives inside one call; nothing is cached between calls.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rayon::prelude::*;

use crate::assemble::MappingAssembler;
use crate::attribute::AttributePair;
use crate::cache::Cache;
use crate::config::SoundexMapperConfig;
use crate::encoder::{PhoneticEncoder, Soundex};
use crate::error::{Collaborator, MapperError};
use crate::inverted::InvertedList;
use crate::mapping::Mapping;
use crate::search::{max_distance, BoundedSearcher};
use crate::temporal::TemporalMapper;
use crate::trie::TrieIndex;
use crate::values::DistinctValues;

// ============================================================================
// Cancellation & Outcome
// ============================================================================

/// Shared cancellation signal, checked between source-code searches.
///
/// A flag built with `CancelFlag::after` also cancels itself once its work
/// limit is spent.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    cancelled: Arc<AtomicBool>,
    remaining: Option<Arc<AtomicUsize>>,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flag that lets `units` units of work start, then cancels.
    pub fn after(units: usize) -> Self {
        Self {
            cancelled: Arc::default(),
            remaining: Some(Arc::new(AtomicUsize::new(units))),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Claim one unit of work; `false` once cancelled or out of units.
    pub fn checkpoint(&self) -> bool {
        if self.is_cancelled() {
            return false;
        }
        if let Some(remaining) = &self.remaining {
            let claimed = remaining.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                n.checked_sub(1)
            });
            if claimed.is_err() {
                self.cancel();
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Complete,
    /// Cancelled after `searched` of `total` units of work; the mapping holds
    /// every pair found by the finished units.
    Cancelled { searched: usize, total: usize },
}

/// Counters describing one `compute_mapping` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    pub source_values: usize,
    pub target_values: usize,
    pub source_codes: usize,
    pub target_codes: usize,
    pub trie_nodes: usize,
    pub match_groups: usize,
    /// Values that could not be interpreted and were skipped.
    pub skipped_values: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MappingOutcome {
    pub mapping: Mapping,
    pub completion: Completion,
    pub diagnostics: Diagnostics,
}

impl MappingOutcome {
    pub fn complete(mapping: Mapping, diagnostics: Diagnostics) -> Self {
        Self {
            mapping,
            completion: Completion::Complete,
            diagnostics,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.completion == Completion::Complete
    }

    pub fn into_mapping(self) -> Mapping {
        self.mapping
    }
}

// ============================================================================
// Mapper Contract
// ============================================================================

/// A link discovery strategy.
pub trait Mapper: Send + Sync {
    /// Stable identifier used for diagnostics and strategy selection.
    fn name(&self) -> &str;

    /// Every `(source, target)` pair with similarity >= `threshold`.
    ///
    /// `threshold` must lie in `[0, 1]`. When `cancel` fires, the outcome is
    /// `Completion::Cancelled` and carries the pairs found so far.
    fn compute_mapping_with_cancel(
        &self,
        source: &dyn Cache,
        target: &dyn Cache,
        attributes: &AttributePair,
        threshold: f64,
        cancel: &CancelFlag,
    ) -> Result<MappingOutcome, MapperError>;

    fn compute_mapping(
        &self,
        source: &dyn Cache,
        target: &dyn Cache,
        attributes: &AttributePair,
        threshold: f64,
    ) -> Result<MappingOutcome, MapperError> {
        self.compute_mapping_with_cancel(source, target, attributes, threshold, &CancelFlag::new())
    }

    /// Whether this strategy evaluates the similarity function `function`.
    fn supports(&self, function: &str) -> bool {
        function.eq_ignore_ascii_case(self.name())
    }

    /// Sizes are distinct-value counts per side.
    fn estimate_runtime(&self, source_size: usize, target_size: usize, threshold: f64) -> Duration;

    fn estimate_result_size(&self, source_size: usize, target_size: usize, threshold: f64) -> f64;
}

pub fn validate_threshold(threshold: f64) -> Result<(), MapperError> {
    if (0.0..=1.0).contains(&threshold) {
        Ok(())
    } else {
        Err(MapperError::InvalidThreshold(threshold))
    }
}

// ============================================================================
// SoundexMapper
// ============================================================================

/// Phonetic blocking + bounded-distance trie search.
///
/// The encoder is a construction parameter: its `code_length` fixes `L` for
/// every call on this mapper.
#[derive(Clone)]
pub struct SoundexMapper {
    encoder: Arc<dyn PhoneticEncoder>,
    config: SoundexMapperConfig,
}

impl SoundexMapper {
    pub fn new(encoder: Arc<dyn PhoneticEncoder>, config: SoundexMapperConfig) -> Self {
        Self { encoder, config }
    }

    /// Classic 4-character Soundex with the default configuration.
    pub fn soundex() -> Self {
        Self::new(Arc::new(Soundex::new()), SoundexMapperConfig::default())
    }

    pub fn with_config(mut self, config: SoundexMapperConfig) -> Self {
        self.config = config;
        self
    }

    pub fn encoder(&self) -> &dyn PhoneticEncoder {
        self.encoder.as_ref()
    }

    pub fn config(&self) -> &SoundexMapperConfig {
        &self.config
    }
}

impl Default for SoundexMapper {
    fn default() -> Self {
        Self::soundex()
    }
}

impl std::fmt::Debug for SoundexMapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoundexMapper")
            .field("encoder", &self.encoder.name())
            .field("code_length", &self.encoder.code_length())
            .field("config", &self.config)
            .finish()
    }
}

impl Mapper for SoundexMapper {
    fn name(&self) -> &str {
        "soundex"
    }

    fn compute_mapping_with_cancel(
        &self,
        source: &dyn Cache,
        target: &dyn Cache,
        attributes: &AttributePair,
        threshold: f64,
        cancel: &CancelFlag,
    ) -> Result<MappingOutcome, MapperError> {
        validate_threshold(threshold)?;
        let code_length = self.encoder.code_length();
        if code_length == 0 {
            return Err(MapperError::ZeroCodeLength {
                encoder: self.encoder.name().to_string(),
            });
        }
        let max_distance = max_distance(code_length, threshold);

        tracing::info!(
            mapper = self.name(),
            encoder = self.encoder.name(),
            code_length,
            threshold,
            max_distance,
            source_attribute = %attributes.source,
            target_attribute = %attributes.target,
            "computing mapping"
        );

        let source_values =
            DistinctValues::aggregate(source, &attributes.source, Collaborator::SourceCache)?;
        let target_values =
            DistinctValues::aggregate(target, &attributes.target, Collaborator::TargetCache)?;

        let mut diagnostics = Diagnostics {
            source_values: source_values.len(),
            target_values: target_values.len(),
            ..Diagnostics::default()
        };
        if source_values.is_empty() || target_values.is_empty() {
            tracing::debug!(
                source_values = source_values.len(),
                target_values = target_values.len(),
                "no candidate values on one side"
            );
            return Ok(MappingOutcome::complete(Mapping::new(), diagnostics));
        }

        let parallel = self.config.parallel;
        let source_codes =
            InvertedList::build(source_values.values(), self.encoder.as_ref(), parallel)?;
        let target_codes =
            InvertedList::build(target_values.values(), self.encoder.as_ref(), parallel)?;

        let trie = if self.config.partitioned_trie {
            TrieIndex::build_partitioned(&target_codes)
        } else {
            TrieIndex::build(&target_codes)
        };
        diagnostics.source_codes = source_codes.len();
        diagnostics.target_codes = target_codes.len();
        diagnostics.trie_nodes = trie.node_count();
        tracing::debug!(
            source_values = diagnostics.source_values,
            target_values = diagnostics.target_values,
            source_codes = diagnostics.source_codes,
            target_codes = diagnostics.target_codes,
            trie_nodes = diagnostics.trie_nodes,
            "built blocking index"
        );

        let searcher = BoundedSearcher::new(&trie, max_distance);
        let assembler = MappingAssembler::new(&source_values, &target_values, code_length);
        let searched = AtomicUsize::new(0);
        let groups = AtomicUsize::new(0);

        let search_one = |(code, indexes): &(String, Vec<u32>)| {
            if !cancel.checkpoint() {
                return;
            }
            let found = searcher.search(code, indexes);
            for group in &found {
                assembler.add_group(group);
            }
            groups.fetch_add(found.len(), Ordering::Relaxed);
            searched.fetch_add(1, Ordering::Relaxed);
        };
        if parallel {
            source_codes.entries().par_iter().for_each(search_one);
        } else {
            source_codes.entries().iter().for_each(search_one);
        }

        let searched = searched.into_inner();
        let total = source_codes.len();
        diagnostics.match_groups = groups.into_inner();
        let completion = if searched < total {
            tracing::warn!(searched, total, "mapping cancelled; returning partial result");
            Completion::Cancelled { searched, total }
        } else {
            Completion::Complete
        };

        let mapping = assembler.finish();
        tracing::debug!(
            match_groups = diagnostics.match_groups,
            links = mapping.len(),
            "assembled mapping"
        );

        Ok(MappingOutcome {
            mapping,
            completion,
            diagnostics,
        })
    }

    fn estimate_runtime(&self, source_size: usize, target_size: usize, threshold: f64) -> Duration {
        self.config
            .cost
            .runtime(self.encoder.code_length(), source_size, target_size, threshold)
    }

    fn estimate_result_size(&self, source_size: usize, target_size: usize, threshold: f64) -> f64 {
        self.config
            .cost
            .result_size(self.encoder.code_length(), source_size, target_size, threshold)
    }
}

// ============================================================================
// Strategy Registry
// ============================================================================

/// Named strategies for lookup and cost-based selection.
#[derive(Clone, Default)]
pub struct MapperRegistry {
    mappers: Vec<Arc<dyn Mapper>>,
}

impl MapperRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Soundex and temporal strategies with default settings.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(SoundexMapper::soundex()));
        registry.register(Arc::new(TemporalMapper::new()));
        registry
    }

    /// Register `mapper`, replacing any strategy with the same name.
    pub fn register(&mut self, mapper: Arc<dyn Mapper>) {
        if let Some(slot) = self.mappers.iter_mut().find(|m| m.name() == mapper.name()) {
            *slot = mapper;
        } else {
            self.mappers.push(mapper);
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Mapper>> {
        self.mappers.iter().find(|m| m.name() == name).cloned()
    }

    pub fn names(&self) -> Vec<&str> {
        self.mappers.iter().map(|m| m.name()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Mapper>> {
        self.mappers.iter()
    }

    /// Cheapest strategy that supports `function`; ties go to the earliest registered.
    ///
    /// Sizes are distinct-value counts, as for `Mapper::estimate_runtime`.
    pub fn cheapest(
        &self,
        function: &str,
        source_size: usize,
        target_size: usize,
        threshold: f64,
    ) -> Option<Arc<dyn Mapper>> {
        let mut best: Option<(&Arc<dyn Mapper>, Duration)> = None;
        for mapper in self.mappers.iter().filter(|m| m.supports(function)) {
            let cost = mapper.estimate_runtime(source_size, target_size, threshold);
            if best.map_or(true, |(_, c)| cost < c) {
                best = Some((mapper, cost));
            }
        }
        best.map(|(m, _)| Arc::clone(m))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;

    fn people(names: &[(&str, &str)]) -> MemoryCache {
        let mut cache = MemoryCache::new();
        for (uri, name) in names {
            cache.add_triple(uri, "name", name);
        }
        cache
    }

    #[test]
    fn rejects_out_of_range_thresholds() {
        let mapper = SoundexMapper::soundex();
        let cache = people(&[("a", "Ann")]);
        let attrs = AttributePair::new("name", "name");
        for bad in [-0.1, 1.5, f64::NAN] {
            let err = mapper.compute_mapping(&cache, &cache, &attrs, bad).unwrap_err();
            assert!(matches!(err, MapperError::InvalidThreshold(_)));
        }
    }

    #[test]
    fn soundex_duplicates_link_at_full_score() {
        let source = people(&[("s1", "Robert"), ("s2", "Ashcraft")]);
        let target = people(&[("t1", "Rupert"), ("t2", "Ashcroft"), ("t3", "Tymczak")]);
        let outcome = SoundexMapper::soundex()
            .compute_mapping(&source, &target, &AttributePair::new("name", "name"), 1.0)
            .unwrap();

        assert!(outcome.is_complete());
        let pairs: Vec<(&str, &str, f64)> = outcome.mapping.iter().collect();
        assert_eq!(pairs, vec![("s1", "t1", 1.0), ("s2", "t2", 1.0)]);
        assert_eq!(outcome.diagnostics.source_values, 2);
        assert_eq!(outcome.diagnostics.target_values, 3);
    }

    #[test]
    fn pre_cancelled_call_returns_empty_partial_result() {
        let source = people(&[("s1", "Robert")]);
        let target = people(&[("t1", "Rupert")]);
        let cancel = CancelFlag::new();
        cancel.cancel();

        let outcome = SoundexMapper::soundex()
            .compute_mapping_with_cancel(
                &source,
                &target,
                &AttributePair::new("name", "name"),
                0.5,
                &cancel,
            )
            .unwrap();

        assert_eq!(outcome.completion, Completion::Cancelled { searched: 0, total: 1 });
        assert!(outcome.mapping.is_empty());
    }

    #[test]
    fn registry_lookup_and_replacement() {
        let mut registry = MapperRegistry::with_defaults();
        assert_eq!(registry.names(), vec!["soundex", "temporal_same_begin"]);
        assert!(registry.get("soundex").is_some());
        assert!(registry.get("levenshtein").is_none());

        registry.register(Arc::new(
            SoundexMapper::soundex().with_config(SoundexMapperConfig::sequential()),
        ));
        assert_eq!(registry.names().len(), 2);
        assert!(registry.cheapest("soundex", 100, 100, 0.9).is_some());
        assert!(MapperRegistry::new().cheapest("soundex", 1, 1, 1.0).is_none());
    }

    #[test]
    fn cheapest_only_considers_strategies_for_the_function() {
        let registry = MapperRegistry::with_defaults();
        let temporal = TemporalMapper::new();
        let soundex = SoundexMapper::soundex();
        // Large inputs make the temporal estimate the lower one.
        assert!(
            temporal.estimate_runtime(1000, 1000, 0.5) < soundex.estimate_runtime(1000, 1000, 0.5)
        );

        for (s, t, threshold) in [(1000, 1000, 0.5), (10, 10, 1.0), (1, 100_000, 0.0)] {
            let picked = registry.cheapest("soundex", s, t, threshold).unwrap();
            assert_eq!(picked.name(), "soundex");
        }
        let picked = registry.cheapest("Temporal_Same_Begin", 1000, 1000, 0.5).unwrap();
        assert_eq!(picked.name(), "temporal_same_begin");
        assert!(registry.cheapest("levenshtein", 1000, 1000, 0.5).is_none());
    }

    #[test]
    fn work_limited_flag_cancels_after_its_units() {
        let flag = CancelFlag::after(2);
        assert!(flag.checkpoint());
        assert!(flag.checkpoint());
        assert!(!flag.is_cancelled());
        assert!(!flag.checkpoint());
        assert!(flag.is_cancelled());

        let shared = CancelFlag::new();
        let clone = shared.clone();
        assert!(shared.checkpoint());
        clone.cancel();
        assert!(!shared.checkpoint());
    }
}
