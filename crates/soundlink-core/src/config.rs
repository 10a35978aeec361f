//! Mapper configuration.
//!
//! Loadable from JSON; omitted fields take their defaults:
//!
//! ```json
//! { "parallel": true, "partitioned_trie": true, "cost": { "alphabet_size": 7 } }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::cost::CostModel;
use crate::error::BoxError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoundexMapperConfig {
    /// Encode values and search source codes on the rayon pool.
    pub parallel: bool,
    /// Build the trie as independent first-character subtrees.
    pub partitioned_trie: bool,
    pub cost: CostModel,
}

impl Default for SoundexMapperConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            partitioned_trie: true,
            cost: CostModel::default(),
        }
    }
}

impl SoundexMapperConfig {
    /// Single-threaded configuration, mostly useful for debugging and tests.
    pub fn sequential() -> Self {
        Self {
            parallel: false,
            partitioned_trie: false,
            ..Self::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, BoxError> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::from_json_str(&text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let cfg = SoundexMapperConfig::from_json_str(r#"{"parallel": false, "cost": {"step_nanos": 5.0}}"#)
            .unwrap();
        assert!(!cfg.parallel);
        assert!(cfg.partitioned_trie);
        assert_eq!(cfg.cost.step_nanos, 5.0);
        assert_eq!(cfg.cost.alphabet_size, CostModel::default().alphabet_size);
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mapper.json");
        std::fs::write(&path, "{}").unwrap();
        assert_eq!(
            SoundexMapperConfig::from_json_file(&path).unwrap(),
            SoundexMapperConfig::default()
        );
    }
}
