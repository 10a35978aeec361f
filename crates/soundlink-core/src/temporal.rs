//! Temporal blocking: link entities that begin at the same instant.
//!
//! Entities are bucketed by the epoch milliseconds of their begin-date values
//! (RFC 3339, e.g. `2015-04-22T11:29:51+02:00`). Every source/target pair that
//! shares a bucket is linked with score 1.0.
//!
//! The attribute may name a `begin|end` pair; only the begin part is used.
//! Values that do not parse are skipped and counted in
//! `Diagnostics::skipped_values`; they never abort the pass.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::DateTime;
use roaring::RoaringBitmap;

use crate::attribute::AttributePair;
use crate::cache::Cache;
use crate::error::{Collaborator, MapperError};
use crate::mapper::{validate_threshold, CancelFlag, Completion, Diagnostics, Mapper, MappingOutcome};
use crate::mapping::Mapping;
use crate::{Interner, StrId};

/// Begin-date part of a `begin|end` attribute label.
pub fn begin_property(label: &str) -> &str {
    match label.split_once('|') {
        Some((begin, _)) => begin,
        None => label,
    }
}

/// Parse an RFC 3339 timestamp into epoch milliseconds.
pub fn parse_instant(value: &str) -> Option<i64> {
    DateTime::parse_from_rfc3339(value.trim())
        .ok()
        .map(|dt| dt.timestamp_millis())
}

/// Entities grouped by begin instant.
#[derive(Debug, Default, Clone)]
pub struct BeginDateBlocks {
    blocks: BTreeMap<i64, RoaringBitmap>,
    uris: Interner,
    skipped: usize,
}

impl BeginDateBlocks {
    pub fn build(cache: &dyn Cache, property: &str, side: Collaborator) -> Result<Self, MapperError> {
        let mut out = BeginDateBlocks::default();
        for entity in cache.entities() {
            let entity = entity.map_err(|e| MapperError::collaborator(side, e))?;
            for value in entity.values(property) {
                let Some(instant) = parse_instant(value) else {
                    out.skipped += 1;
                    continue;
                };
                let id = out.uris.intern(&entity.uri).raw();
                out.blocks.entry(instant).or_default().insert(id);
            }
        }
        if out.skipped > 0 {
            tracing::warn!(
                side = %side,
                property,
                skipped = out.skipped,
                "skipped unparseable begin-date values"
            );
        }
        Ok(out)
    }

    /// Number of distinct instants.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn block(&self, instant: i64) -> Option<&RoaringBitmap> {
        self.blocks.get(&instant)
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    fn uri(&self, id: u32) -> Option<&str> {
        self.uris.lookup(StrId::new(id))
    }
}

/// Links entities whose begin dates denote the same instant.
#[derive(Debug, Clone)]
pub struct TemporalMapper {
    /// Nanoseconds to parse one date value (cost model).
    pub parse_nanos: f64,
    /// Nanoseconds per emitted link (cost model).
    pub link_nanos: f64,
}

impl TemporalMapper {
    pub fn new() -> Self {
        Self {
            parse_nanos: 400.0,
            link_nanos: 50.0,
        }
    }
}

impl Default for TemporalMapper {
    fn default() -> Self {
        Self::new()
    }
}

impl Mapper for TemporalMapper {
    fn name(&self) -> &str {
        "temporal_same_begin"
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
        let source_property = begin_property(&attributes.source);
        let target_property = begin_property(&attributes.target);
        tracing::info!(
            mapper = self.name(),
            source_property,
            target_property,
            threshold,
            "computing mapping"
        );

        let source_blocks = BeginDateBlocks::build(source, source_property, Collaborator::SourceCache)?;
        let target_blocks = BeginDateBlocks::build(target, target_property, Collaborator::TargetCache)?;

        let mut diagnostics = Diagnostics {
            source_values: source_blocks.len(),
            target_values: target_blocks.len(),
            skipped_values: source_blocks.skipped() + target_blocks.skipped(),
            ..Diagnostics::default()
        };

        let mut mapping = Mapping::new();
        let total = source_blocks.len();
        let mut searched = 0;
        for (instant, sources) in &source_blocks.blocks {
            if !cancel.checkpoint() {
                break;
            }
            searched += 1;
            let Some(targets) = target_blocks.block(*instant) else {
                continue;
            };
            diagnostics.match_groups += 1;
            for s in sources {
                let Some(source_uri) = source_blocks.uri(s) else {
                    continue;
                };
                for t in targets {
                    if let Some(target_uri) = target_blocks.uri(t) {
                        mapping.add(source_uri, target_uri, 1.0);
                    }
                }
            }
        }

        let completion = if searched < total {
            tracing::warn!(searched, total, "mapping cancelled; returning partial result");
            Completion::Cancelled { searched, total }
        } else {
            Completion::Complete
        };
        Ok(MappingOutcome {
            mapping,
            completion,
            diagnostics,
        })
    }

    fn estimate_runtime(&self, source_size: usize, target_size: usize, _threshold: f64) -> Duration {
        let parse = self.parse_nanos * (source_size + target_size) as f64;
        let links = self.link_nanos * source_size.min(target_size) as f64;
        Duration::from_nanos((parse + links) as u64)
    }

    fn estimate_result_size(&self, source_size: usize, target_size: usize, _threshold: f64) -> f64 {
        source_size.min(target_size) as f64
    }
}
