//! TrieIndex: prefix tree over the target side's phonetic codes.
//!
//! One level per code position. Only nodes at depth `L` (full codes) carry
//! distinct-value indexes. The index is built once per `compute_mapping` call
//! and is read-only afterwards, so searches can share it across threads.
//!
//! `build_partitioned` splits codes by first character and builds each
//! subtree independently on the rayon pool; subtrees are attached under the
//! root at the end, so insertion never takes a lock.

use std::collections::BTreeMap;

use rayon::prelude::*;

use crate::inverted::InvertedList;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TrieNode {
    children: BTreeMap<char, TrieNode>,
    values: Vec<u32>,
}

impl TrieNode {
    /// Child edges in character order.
    pub fn children(&self) -> impl Iterator<Item = (char, &TrieNode)> {
        self.children.iter().map(|(c, node)| (*c, node))
    }

    pub fn child(&self, c: char) -> Option<&TrieNode> {
        self.children.get(&c)
    }

    /// Distinct-value indexes terminating here (empty unless depth == L).
    pub fn values(&self) -> &[u32] {
        &self.values
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    fn insert(&mut self, code: impl Iterator<Item = char>, values: &[u32]) {
        let mut node = self;
        for c in code {
            node = node.children.entry(c).or_default();
        }
        node.values.extend_from_slice(values);
    }

    fn node_count(&self) -> usize {
        1 + self.children.values().map(TrieNode::node_count).sum::<usize>()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrieIndex {
    root: TrieNode,
    code_length: usize,
    codes: usize,
}

impl TrieIndex {
    /// Sequential build: O(total code characters).
    pub fn build(list: &InvertedList) -> Self {
        let mut root = TrieNode::default();
        for (code, values) in list.iter() {
            root.insert(code.chars(), values);
        }
        Self {
            root,
            code_length: list.code_length(),
            codes: list.len(),
        }
    }

    /// Parallel build, one independent subtree per first character.
    pub fn build_partitioned(list: &InvertedList) -> Self {
        let mut partitions: BTreeMap<char, Vec<(&str, &[u32])>> = BTreeMap::new();
        for (code, values) in list.iter() {
            // Codes are validated non-empty by `InvertedList::build`.
            let Some(first) = code.chars().next() else {
                continue;
            };
            partitions.entry(first).or_default().push((code, values));
        }

        let partitions: Vec<(char, Vec<(&str, &[u32])>)> = partitions.into_iter().collect();
        let subtrees: Vec<(char, TrieNode)> = partitions
            .into_par_iter()
            .map(|(first, entries)| {
                let mut subtree = TrieNode::default();
                for (code, values) in entries {
                    subtree.insert(code.chars().skip(1), values);
                }
                (first, subtree)
            })
            .collect();

        let root = TrieNode {
            children: subtrees.into_iter().collect(),
            values: Vec::new(),
        };
        Self {
            root,
            code_length: list.code_length(),
            codes: list.len(),
        }
    }

    pub fn root(&self) -> &TrieNode {
        &self.root
    }

    pub fn code_length(&self) -> usize {
        self.code_length
    }

    /// Number of distinct codes indexed.
    pub fn len(&self) -> usize {
        self.codes
    }

    pub fn is_empty(&self) -> bool {
        self.codes == 0
    }

    /// Exact lookup of a full code.
    pub fn lookup(&self, code: &str) -> Option<&[u32]> {
        let mut node = &self.root;
        let mut depth = 0;
        for c in code.chars() {
            node = node.child(c)?;
            depth += 1;
        }
        if depth == self.code_length && !node.values.is_empty() {
            Some(&node.values)
        } else {
            None
        }
    }

    /// Total nodes including the root.
    pub fn node_count(&self) -> usize {
        self.root.node_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::Soundex;

    fn list(values: &[&str]) -> InvertedList {
        let values: Vec<String> = values.iter().map(|s| s.to_string()).collect();
        InvertedList::build(&values, &Soundex::new(), false).unwrap()
    }

    #[test]
    fn shared_prefixes_diverge_at_first_difference() {
        // R163, R150, K420
        let trie = TrieIndex::build(&list(&["Robert", "Rubin", "Klaus"]));

        assert_eq!(trie.len(), 3);
        // root, R -> 1 -> {6 -> 3, 5 -> 0}, K -> 4 -> 2 -> 0
        assert_eq!(trie.node_count(), 1 + 6 + 4);
        let r = trie.root().child('R').unwrap();
        assert_eq!(r.children().count(), 1);
        let r1 = r.child('1').unwrap();
        assert_eq!(r1.children().map(|(c, _)| c).collect::<Vec<_>>(), vec!['5', '6']);
        assert!(r1.values().is_empty());
    }

    #[test]
    fn only_full_depth_nodes_carry_values() {
        let trie = TrieIndex::build(&list(&["Robert", "Rupert", "Klaus"]));
        assert_eq!(trie.lookup("R163"), Some(&[0u32, 1][..]));
        assert_eq!(trie.lookup("K420"), Some(&[2u32][..]));
        assert_eq!(trie.lookup("R16"), None);
        assert_eq!(trie.lookup("C420"), None);
    }

    #[test]
    fn partitioned_build_matches_sequential() {
        let names: Vec<String> = (0..300)
            .map(|i| format!("{}{}", ["Ka", "Ro", "Mi", "Su", "Ba"][i % 5], "lmnrstdk".repeat(i % 4 + 1)))
            .collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let inv = list(&refs);

        assert_eq!(TrieIndex::build(&inv), TrieIndex::build_partitioned(&inv));
    }

    #[test]
    fn empty_list_builds_empty_trie() {
        let inv = list(&[]);
        let trie = TrieIndex::build_partitioned(&inv);
        assert!(trie.is_empty());
        assert!(trie.root().is_leaf());
        assert_eq!(trie.node_count(), 1);
    }
}
