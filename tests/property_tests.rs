//! Property-based tests for signatures, similarity, and the LSH index.
//!
//! These tests verify invariants that should hold regardless of input:
//! - Estimated Jaccard is reflexive, symmetric and bounded
//! - Exact Jaccard is symmetric, bounded, and hits 0/1 exactly at disjoint/equal sets
//! - Documents with identical token multisets are always mutual candidates
//! - Index builds are reproducible for a fixed seed

use std::collections::HashSet;

use nearsketch::{
    approximate_jaccard, exact_jaccard, Error, LshIndex, MinHash, MinHashSignature,
    SignatureMatrix,
};
use proptest::prelude::*;

fn sig(values: Vec<u64>) -> MinHashSignature {
    MinHashSignature { values }
}

prop_compose! {
    fn arb_signature_pair()(n in 1usize..64)(
        a in prop::collection::vec(0u64..4, n),
        b in prop::collection::vec(0u64..4, n),
    ) -> (Vec<u64>, Vec<u64>) {
        (a, b)
    }
}

fn arb_token_set() -> impl Strategy<Value = HashSet<String>> {
    prop::collection::hash_set("[a-f]{1,3}", 0..12)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn approximate_jaccard_is_reflexive(values in prop::collection::vec(any::<u64>(), 1..128)) {
        let s = sig(values);
        prop_assert_eq!(approximate_jaccard(&s, &s).unwrap(), 1.0);
    }

    #[test]
    fn approximate_jaccard_is_symmetric_and_bounded((a, b) in arb_signature_pair()) {
        let (a, b) = (sig(a), sig(b));
        let ab = approximate_jaccard(&a, &b).unwrap();
        let ba = approximate_jaccard(&b, &a).unwrap();
        prop_assert_eq!(ab, ba);
        prop_assert!((0.0..=1.0).contains(&ab));
        prop_assert_eq!(ab == 1.0, a == b);
    }

    #[test]
    fn exact_jaccard_properties(a in arb_token_set(), b in arb_token_set()) {
        match exact_jaccard(&a, &b) {
            Err(Error::UndefinedSimilarity) => {
                prop_assert!(a.is_empty() && b.is_empty());
            }
            Err(e) => prop_assert!(false, "unexpected error: {e}"),
            Ok(ab) => {
                let ba = exact_jaccard(&b, &a).unwrap();
                prop_assert_eq!(ab, ba);
                prop_assert!((0.0..=1.0).contains(&ab));
                prop_assert_eq!(ab == 1.0, a == b);
                prop_assert_eq!(ab == 0.0, a.is_disjoint(&b));
            }
        }
    }

    #[test]
    fn identical_multisets_are_mutual_candidates(
        tokens in prop::collection::vec("[a-z]{3,8}", 0..20),
        other in prop::collection::vec("[a-z]{3,8}", 1..20),
        bands in prop::sample::select(vec![1usize, 2, 4, 8, 16]),
        seed in any::<u64>(),
    ) {
        let mh = MinHash::with_modulus(16, 65_537, seed).unwrap();
        let mut reversed = tokens.clone();
        reversed.reverse();

        let mut m = SignatureMatrix::new(16).unwrap();
        m.push("a", mh.signature(&tokens)).unwrap();
        m.push("other", mh.signature(&other)).unwrap();
        m.push("b", mh.signature(&reversed)).unwrap();

        let ix = LshIndex::build(m, bands, seed).unwrap();
        prop_assert!(ix.near_duplicates_of("a").unwrap().contains(&"b"));
        prop_assert!(ix.near_duplicates_of("b").unwrap().contains(&"a"));
    }

    #[test]
    fn rebuild_is_idempotent(
        docs in prop::collection::vec(prop::collection::vec("[a-z]{3,6}", 0..10), 1..12),
        seed in any::<u64>(),
    ) {
        let mh = MinHash::with_modulus(24, 65_537, seed).unwrap();
        let mut m = SignatureMatrix::new(24).unwrap();
        for (i, tokens) in docs.iter().enumerate() {
            m.push(format!("doc{i}"), mh.signature(tokens)).unwrap();
        }
        let ix1 = LshIndex::build(m.clone(), 6, seed).unwrap();
        let ix2 = LshIndex::build(m, 6, seed).unwrap();
        prop_assert_eq!(ix1.bucket_table(), ix2.bucket_table());
        prop_assert_eq!(ix1.candidate_pairs(), ix2.candidate_pairs());
    }
}
