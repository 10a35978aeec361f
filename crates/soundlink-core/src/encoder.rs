//! Fixed-length phonetic encoders.
//!
//! The matching engine treats the encoder as a pluggable collaborator: it must
//! be deterministic, defined for every input (including the empty string), and
//! produce codes of exactly `code_length()` characters.

use crate::error::BoxError;

/// A deterministic, fixed-length string encoder used as the blocking key.
pub trait PhoneticEncoder: Send + Sync {
    /// Stable name used in logs and error messages.
    fn name(&self) -> &str;

    /// Length `L` (in chars) of every code this encoder produces.
    fn code_length(&self) -> usize;

    fn encode(&self, value: &str) -> Result<String, BoxError>;
}

// Soundex digit per letter A..Z; '0' marks vowels and the H/W/Y separators.
const SOUNDEX_MAPPING: &[u8; 26] = b"01230120022455012623010202";

/// American Soundex: first letter followed by consonant-class digits,
/// zero-padded (or truncated) to `code_length` characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Soundex {
    code_length: usize,
}

impl Soundex {
    pub const DEFAULT_CODE_LENGTH: usize = 4;

    pub fn new() -> Self {
        Self::with_code_length(Self::DEFAULT_CODE_LENGTH)
    }

    pub fn with_code_length(code_length: usize) -> Self {
        Self { code_length }
    }

    /// Infallible encoding; `PhoneticEncoder::encode` wraps this.
    pub fn code(&self, value: &str) -> String {
        let mut letters = value
            .chars()
            .filter(char::is_ascii_alphabetic)
            .map(|c| c.to_ascii_uppercase());

        let mut out = String::with_capacity(self.code_length);
        let Some(first) = letters.next() else {
            out.extend(std::iter::repeat('0').take(self.code_length));
            return out;
        };
        if self.code_length == 0 {
            return out;
        }
        out.push(first);

        let mut prev = digit_of(first);
        let mut len = 1;
        for c in letters {
            if len == self.code_length {
                break;
            }
            let digit = digit_of(c);
            if digit != b'0' && digit != prev {
                out.push(digit as char);
                len += 1;
            }
            // H and W do not separate letters with the same code; vowels do.
            if digit != b'0' || (c != 'H' && c != 'W') {
                prev = digit;
            }
        }

        while len < self.code_length {
            out.push('0');
            len += 1;
        }
        out
    }
}

impl Default for Soundex {
    fn default() -> Self {
        Self::new()
    }
}

impl PhoneticEncoder for Soundex {
    fn name(&self) -> &str {
        "soundex"
    }

    fn code_length(&self) -> usize {
        self.code_length
    }

    fn encode(&self, value: &str) -> Result<String, BoxError> {
        Ok(self.code(value))
    }
}

fn digit_of(upper: char) -> u8 {
    SOUNDEX_MAPPING[(upper as u8 - b'A') as usize]
}

/// Number of same-position mismatches between two codes of equal length.
pub fn code_distance(a: &str, b: &str) -> Option<usize> {
    let mut ai = a.chars();
    let mut bi = b.chars();
    let mut mismatches = 0;
    loop {
        match (ai.next(), bi.next()) {
            (Some(x), Some(y)) => {
                if x != y {
                    mismatches += 1;
                }
            }
            (None, None) => return Some(mismatches),
            _ => return None,
        }
    }
}

/// Similarity of two codes: `1 - mismatches / L`.
///
/// Returns `None` when the codes differ in length or are empty. This is the
/// measure `SoundexMapper` reproduces without comparing all pairs.
pub fn code_similarity(a: &str, b: &str) -> Option<f64> {
    let len = a.chars().count();
    if len == 0 {
        return None;
    }
    let distance = code_distance(a, b)?;
    Some(1.0 - distance as f64 / len as f64)
}
