//! Property tests: trie search against a brute-force all-pairs oracle.
//!
//! Values are short strings over a three-letter alphabet and the encoder is
//! the identity (padded to four chars), so codes collide often and every
//! distance from 0 to 4 is exercised.

use std::sync::Arc;

use proptest::prelude::*;
use soundlink_core::encoder::code_distance;
use soundlink_core::{
    code_similarity, max_distance, AttributePair, BoxError, Entity, Mapper, Mapping, MemoryCache,
    PhoneticEncoder, SoundexMapper, SoundexMapperConfig,
};

const CODE_LENGTH: usize = 4;

/// First four chars, right-padded with '_'.
struct PadEncoder;

impl PhoneticEncoder for PadEncoder {
    fn name(&self) -> &str {
        "pad4"
    }

    fn code_length(&self) -> usize {
        CODE_LENGTH
    }

    fn encode(&self, value: &str) -> Result<String, BoxError> {
        let mut code: String = value.chars().take(CODE_LENGTH).collect();
        while code.chars().count() < CODE_LENGTH {
            code.push('_');
        }
        Ok(code)
    }
}

fn mapper(config: SoundexMapperConfig) -> SoundexMapper {
    SoundexMapper::new(Arc::new(PadEncoder), config)
}

fn cache(prefix: &str, rows: &[Vec<String>]) -> MemoryCache {
    rows.iter()
        .enumerate()
        .map(|(i, values)| {
            let mut e = Entity::new(format!("{prefix}{i}"));
            for v in values {
                e.add_value("name", v);
            }
            e
        })
        .collect()
}

fn brute_force(source: &[Vec<String>], target: &[Vec<String>], threshold: f64) -> Mapping {
    let budget = max_distance(CODE_LENGTH, threshold);
    let mut out = Mapping::new();
    for (i, sv) in source.iter().enumerate() {
        for (j, tv) in target.iter().enumerate() {
            for a in sv {
                for b in tv {
                    let ca = PadEncoder.encode(a).unwrap();
                    let cb = PadEncoder.encode(b).unwrap();
                    let d = code_distance(&ca, &cb).unwrap();
                    if d <= budget {
                        let score = code_similarity(&ca, &cb).unwrap();
                        out.add(&format!("s{i}"), &format!("t{j}"), score);
                    }
                }
            }
        }
    }
    out
}

fn rows_strategy() -> impl Strategy<Value = Vec<Vec<String>>> {
    prop::collection::vec(prop::collection::vec("[abc]{0,5}", 0..3), 0..12)
}

fn threshold_strategy() -> impl Strategy<Value = f64> {
    prop_oneof![Just(0.0), Just(0.25), Just(0.5), Just(0.75), Just(1.0), 0.0f64..=1.0]
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        failure_persistence: None,
        ..ProptestConfig::default()
    })]

    #[test]
    fn mapping_matches_all_pairs_oracle(
        source in rows_strategy(),
        target in rows_strategy(),
        threshold in threshold_strategy(),
    ) {
        let attrs = AttributePair::new("name", "name");
        let got = mapper(SoundexMapperConfig::default())
            .compute_mapping(&cache("s", &source), &cache("t", &target), &attrs, threshold)
            .unwrap();
        prop_assert!(got.is_complete());
        prop_assert_eq!(got.mapping, brute_force(&source, &target, threshold));
    }

    #[test]
    fn parallel_and_sequential_runs_agree(
        source in rows_strategy(),
        target in rows_strategy(),
        threshold in threshold_strategy(),
    ) {
        let attrs = AttributePair::new("name", "name");
        let (s, t) = (cache("s", &source), cache("t", &target));
        let par = mapper(SoundexMapperConfig::default())
            .compute_mapping(&s, &t, &attrs, threshold)
            .unwrap();
        let seq = mapper(SoundexMapperConfig::sequential())
            .compute_mapping(&s, &t, &attrs, threshold)
            .unwrap();
        prop_assert_eq!(par.mapping, seq.mapping);
    }

    #[test]
    fn raising_threshold_never_adds_pairs(
        source in rows_strategy(),
        target in rows_strategy(),
        a in 0.0f64..=1.0,
        b in 0.0f64..=1.0,
    ) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        let attrs = AttributePair::new("name", "name");
        let (s, t) = (cache("s", &source), cache("t", &target));
        let m = mapper(SoundexMapperConfig::default());
        let loose = m.compute_mapping(&s, &t, &attrs, low).unwrap().mapping;
        let strict = m.compute_mapping(&s, &t, &attrs, high).unwrap().mapping;
        prop_assert!(strict.is_subset_of(&loose));
    }

    #[test]
    fn scores_follow_the_distance_formula(
        source in rows_strategy(),
        target in rows_strategy(),
        threshold in threshold_strategy(),
    ) {
        let attrs = AttributePair::new("name", "name");
        let mapping = mapper(SoundexMapperConfig::default())
            .compute_mapping(&cache("s", &source), &cache("t", &target), &attrs, threshold)
            .unwrap()
            .mapping;
        let budget = max_distance(CODE_LENGTH, threshold);
        for (_, _, score) in mapping.iter() {
            let allowed = (0..=budget).any(|d| score == 1.0 - d as f64 / CODE_LENGTH as f64);
            prop_assert!(allowed, "score {} outside formula for budget {}", score, budget);
            prop_assert!(score <= 1.0);
            prop_assert!(score >= threshold, "score {} below threshold {}", score, threshold);
        }
    }
}
