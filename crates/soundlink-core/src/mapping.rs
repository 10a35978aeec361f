//! Mapping: a sparse weighted relation between source and target URIs.
//!
//! Each `(source, target)` pair appears at most once. Adding a pair that is
//! already present keeps the larger score, so merging partial mappings is
//! commutative and associative.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Mapping {
    links: BTreeMap<String, BTreeMap<String, f64>>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a link, keeping the maximum score if the pair already exists.
    pub fn add(&mut self, source: &str, target: &str, score: f64) {
        let targets = self.links.entry(source.to_string()).or_default();
        match targets.get_mut(target) {
            Some(existing) => {
                if score > *existing {
                    *existing = score;
                }
            }
            None => {
                targets.insert(target.to_string(), score);
            }
        }
    }

    pub fn get(&self, source: &str, target: &str) -> Option<f64> {
        self.links.get(source)?.get(target).copied()
    }

    pub fn contains(&self, source: &str, target: &str) -> bool {
        self.get(source, target).is_some()
    }

    /// Number of `(source, target)` pairs.
    pub fn len(&self) -> usize {
        self.links.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Pairs ordered by source URI, then target URI.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, f64)> {
        self.links.iter().flat_map(|(source, targets)| {
            targets
                .iter()
                .map(move |(target, score)| (source.as_str(), target.as_str(), *score))
        })
    }

    /// Targets linked from `source`.
    pub fn targets(&self, source: &str) -> impl Iterator<Item = (&str, f64)> {
        self.links
            .get(source)
            .into_iter()
            .flat_map(|targets| targets.iter().map(|(t, s)| (t.as_str(), *s)))
    }

    /// Pairwise-max union with `other`.
    pub fn merge(&mut self, other: &Mapping) {
        for (source, target, score) in other.iter() {
            self.add(source, target, score);
        }
    }

    /// Pairs whose score is at least `threshold`.
    pub fn filter(&self, threshold: f64) -> Mapping {
        let mut out = Mapping::new();
        for (source, target, score) in self.iter() {
            if score >= threshold {
                out.add(source, target, score);
            }
        }
        out
    }

    /// True if every pair of `self` is in `other` (scores ignored).
    pub fn is_subset_of(&self, other: &Mapping) -> bool {
        self.iter().all(|(s, t, _)| other.contains(s, t))
    }
}

impl<'a> FromIterator<(&'a str, &'a str, f64)> for Mapping {
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a str, f64)>>(iter: I) -> Self {
        let mut out = Mapping::new();
        for (source, target, score) in iter {
            out.add(source, target, score);
        }
        out
    }
}
