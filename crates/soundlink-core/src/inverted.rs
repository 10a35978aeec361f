//! Inverted lists: phonetic code -> distinct-value indexes.
//!
//! Encoding is the expensive, embarrassingly parallel step; it runs on the
//! rayon pool and is collected in index order. Grouping by code is then a
//! sequential merge, so entry order (first-seen code) and per-code index order
//! are identical whether encoding ran in parallel or not.
//!
//! Every code must have exactly `encoder.code_length()` chars. A mismatch is a
//! configuration error reported before any search begins.

use ahash::AHashMap;
use rayon::prelude::*;

use crate::encoder::PhoneticEncoder;
use crate::error::{BoxError, Collaborator, MapperError};

#[derive(Debug, Default, Clone)]
pub struct InvertedList {
    entries: Vec<(String, Vec<u32>)>,
    code_length: usize,
}

impl InvertedList {
    pub fn build(
        values: &[String],
        encoder: &dyn PhoneticEncoder,
        parallel: bool,
    ) -> Result<Self, MapperError> {
        let code_length = encoder.code_length();
        if code_length == 0 {
            return Err(MapperError::ZeroCodeLength {
                encoder: encoder.name().to_string(),
            });
        }

        let codes: Vec<Result<String, BoxError>> = if parallel {
            values.par_iter().map(|v| encoder.encode(v)).collect()
        } else {
            values.iter().map(|v| encoder.encode(v)).collect()
        };

        let mut out = InvertedList {
            entries: Vec::new(),
            code_length,
        };
        let mut slot_of: AHashMap<String, usize> = AHashMap::new();

        for (idx, (value, code)) in values.iter().zip(codes).enumerate() {
            let code = code.map_err(|e| MapperError::collaborator(Collaborator::Encoder, e))?;
            let actual = code.chars().count();
            if actual != code_length {
                return Err(MapperError::InconsistentCodeLength {
                    encoder: encoder.name().to_string(),
                    value: value.clone(),
                    code,
                    expected: code_length,
                    actual,
                });
            }

            match slot_of.get(&code) {
                Some(&slot) => out.entries[slot].1.push(idx as u32),
                None => {
                    slot_of.insert(code.clone(), out.entries.len());
                    out.entries.push((code, vec![idx as u32]));
                }
            }
        }

        Ok(out)
    }

    /// `(code, indexes)` pairs in first-seen code order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u32])> {
        self.entries
            .iter()
            .map(|(code, idx)| (code.as_str(), idx.as_slice()))
    }

    pub fn entries(&self) -> &[(String, Vec<u32>)] {
        &self.entries
    }

    pub fn get(&self, code: &str) -> Option<&[u32]> {
        self.entries
            .iter()
            .find(|(c, _)| c == code)
            .map(|(_, idx)| idx.as_slice())
    }

    /// Number of distinct codes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn code_length(&self) -> usize {
        self.code_length
    }
}
