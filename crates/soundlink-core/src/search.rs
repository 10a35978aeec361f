//! Bounded-distance search over a `TrieIndex`.
//!
//! Distance is substitution-only: trie depth tracks code position exactly, so
//! a transition either consumes the query character for free (exact match) or
//! spends one unit of budget (substitution). There are no insertions or
//! deletions.
//!
//! A match at distance `d` on codes of length `L` scores `1 - d / L`. For a
//! threshold `t` the budget is the largest `d` whose score is still `>= t`.
//!
//! Traversal uses an explicit stack. The order in which `MatchGroup`s come out
//! is therefore depth-first, but the *set* of groups does not depend on it;
//! the assembler resolves duplicates by maximum score.

use crate::trie::{TrieIndex, TrieNode};

/// Substitution budget for codes of `code_length` at `threshold`.
///
/// Compares scores rather than flooring `L * (1 - t)`: `10 * (1 - 0.9)` is
/// `0.999...` in f64, while `1 - 1/10 >= 0.9` holds.
pub fn max_distance(code_length: usize, threshold: f64) -> usize {
    (0..=code_length)
        .rev()
        .find(|&d| score_for(d, code_length) >= threshold)
        .unwrap_or(0)
}

/// Score of a match at `distance` for codes of `code_length`.
pub fn score_for(distance: usize, code_length: usize) -> f64 {
    1.0 - distance as f64 / code_length as f64
}

/// Source and target distinct-value indexes whose codes are `distance` apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchGroup<'a> {
    pub distance: usize,
    pub source: &'a [u32],
    pub target: &'a [u32],
}

impl MatchGroup<'_> {
    pub fn score(&self, code_length: usize) -> f64 {
        score_for(self.distance, code_length)
    }
}

struct SearchState<'t> {
    distance: usize,
    position: usize,
    node: &'t TrieNode,
}

/// Read-only searcher; cheap to share across rayon workers.
#[derive(Debug, Clone, Copy)]
pub struct BoundedSearcher<'t> {
    trie: &'t TrieIndex,
    max_distance: usize,
}

impl<'t> BoundedSearcher<'t> {
    pub fn new(trie: &'t TrieIndex, max_distance: usize) -> Self {
        Self { trie, max_distance }
    }

    pub fn max_distance(&self) -> usize {
        self.max_distance
    }

    /// All `(distance, target indexes)` within budget of `code`.
    ///
    /// Codes whose length differs from the trie's code length match nothing.
    pub fn hits(&self, code: &str) -> Vec<(usize, &'t [u32])> {
        let code: Vec<char> = code.chars().collect();
        let code_length = self.trie.code_length();
        let mut out = Vec::new();
        if code.len() != code_length {
            return out;
        }

        let mut stack = vec![SearchState {
            distance: 0,
            position: 0,
            node: self.trie.root(),
        }];

        while let Some(state) = stack.pop() {
            if state.position == code_length {
                if !state.node.values().is_empty() {
                    out.push((state.distance, state.node.values()));
                }
                continue;
            }

            let wanted = code[state.position];
            for (c, child) in state.node.children() {
                if c == wanted {
                    stack.push(SearchState {
                        distance: state.distance,
                        position: state.position + 1,
                        node: child,
                    });
                } else if state.distance < self.max_distance {
                    stack.push(SearchState {
                        distance: state.distance + 1,
                        position: state.position + 1,
                        node: child,
                    });
                }
            }
        }

        out
    }

    /// One `MatchGroup` per trie leaf reached from `code`.
    pub fn search<'a>(&self, code: &str, source: &'a [u32]) -> Vec<MatchGroup<'a>>
    where
        't: 'a,
    {
        self.hits(code)
            .into_iter()
            .map(|(distance, target)| MatchGroup {
                distance,
                source,
                target,
            })
            .collect()
    }
}
