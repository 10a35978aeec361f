//! Mapping assembly: expand match groups into entity pairs.
//!
//! A group `(d, source values, target values)` yields every
//! `(source entity, target entity)` pair whose values are in the group, scored
//! `1 - d / L`. Workers call `add_group` concurrently; each pair is a per-key
//! compare-and-update that keeps the maximum score, so the final mapping does
//! not depend on the order groups arrive in.

use dashmap::DashMap;

use crate::mapping::Mapping;
use crate::search::MatchGroup;
use crate::values::DistinctValues;

pub struct MappingAssembler<'v> {
    source: &'v DistinctValues,
    target: &'v DistinctValues,
    code_length: usize,
    // (source entity id, target entity id) -> best score
    scores: DashMap<(u32, u32), f64, ahash::RandomState>,
}

impl<'v> MappingAssembler<'v> {
    pub fn new(source: &'v DistinctValues, target: &'v DistinctValues, code_length: usize) -> Self {
        Self {
            source,
            target,
            code_length,
            scores: DashMap::with_hasher(ahash::RandomState::new()),
        }
    }

    pub fn add_group(&self, group: &MatchGroup<'_>) {
        let score = group.score(self.code_length);
        for &i in group.source {
            let Some(source_owners) = self.source.owners(i) else {
                continue;
            };
            for &j in group.target {
                let Some(target_owners) = self.target.owners(j) else {
                    continue;
                };
                for s in source_owners {
                    for t in target_owners {
                        self.scores
                            .entry((s, t))
                            .and_modify(|best| {
                                if score > *best {
                                    *best = score;
                                }
                            })
                            .or_insert(score);
                    }
                }
            }
        }
    }

    /// Number of distinct entity pairs collected so far.
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Resolve entity ids back to URIs.
    pub fn finish(self) -> Mapping {
        let mut mapping = Mapping::new();
        for ((s, t), score) in self.scores {
            let (Some(source), Some(target)) = (self.source.uri(s), self.target.uri(t)) else {
                continue;
            };
            mapping.add(source, target, score);
        }
        mapping
    }
}
