//! Property tests for the merging digest
//!
//! Run with: cargo test --test properties

use flowdigest::quantiles::{stable_sort_by_mean, Centroid, MergingDigest};
use proptest::prelude::*;

/// Finite sample values of moderate magnitude.
fn samples(max_len: usize) -> impl Strategy<Value = Vec<f64>> {
    proptest::collection::vec(-1e6f64..1e6, 1..=max_len)
}

/// Weighted samples with small positive weights.
fn weighted_samples(max_len: usize) -> impl Strategy<Value = Vec<(f64, i64)>> {
    proptest::collection::vec((-1e3f64..1e3, 1i64..=20), 1..=max_len)
}

fn build(compression: f64, limit: usize, input: &[(f64, i64)]) -> MergingDigest {
    let mut digest = MergingDigest::new(compression).with_pending_limit(limit);
    for &(v, w) in input {
        digest.add(v, w).unwrap();
    }
    digest
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn weight_conservation(
        input in weighted_samples(3000),
        compression in 1.0f64..500.0,
        limit in 1usize..700,
    ) {
        let mut digest = build(compression, limit, &input);
        digest.compress();
        let expected: i64 = input.iter().map(|&(_, w)| w).sum();
        let total: i64 = digest.summary().iter().map(|c| c.count).sum();
        prop_assert_eq!(total, expected);
        prop_assert_eq!(digest.total_weight(), expected);
    }

    #[test]
    fn summary_non_decreasing(input in weighted_samples(3000), limit in 1usize..700) {
        let digest = build(100.0, limit, &input);
        let summary = digest.summary();
        for pair in summary.windows(2) {
            prop_assert!(pair[0].mean <= pair[1].mean, "{:?} before {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn compress_twice_is_identical(input in weighted_samples(2000)) {
        let mut digest = build(100.0, 64, &input);
        digest.compress();
        let first = digest.summary();
        digest.compress();
        prop_assert_eq!(first, digest.summary());
    }

    #[test]
    fn sort_matches_reference(
        input in proptest::collection::vec((-8i8..8, any::<bool>(), 1i64..100), 0..2500),
    ) {
        // a coarse mean range forces ties, and the sign flag mixes -0.0 with 0.0
        let mut ours: Vec<Centroid> = input
            .iter()
            .map(|&(m, negate, c)| {
                let mean = m as f64;
                Centroid::new(if negate { -mean } else { mean }, c)
            })
            .collect();
        let mut reference = ours.clone();

        stable_sort_by_mean(&mut ours);
        reference.sort_by(|a, b| a.mean.partial_cmp(&b.mean).unwrap());

        // compare bit patterns, since -0.0 == 0.0 would hide a swapped pair
        let bits = |cs: &[Centroid]| -> Vec<(u64, i64)> {
            cs.iter().map(|c| (c.mean.to_bits(), c.count)).collect()
        };
        prop_assert_eq!(bits(&ours), bits(&reference));
    }

    #[test]
    fn quantile_monotonic(input in samples(5000), a in 0.0f64..=1.0, b in 0.0f64..=1.0) {
        let mut digest = MergingDigest::new(100.0);
        for v in input {
            digest.add(v, 1).unwrap();
        }
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let (qlo, qhi) = (digest.quantile(lo), digest.quantile(hi));
        prop_assert!(qlo <= qhi, "quantile({})={} > quantile({})={}", lo, qlo, hi, qhi);
    }

    #[test]
    fn quantile_within_sample_range(input in samples(2000), q in 0.0f64..=1.0) {
        let mut digest = MergingDigest::new(100.0);
        for &v in &input {
            digest.add(v, 1).unwrap();
        }
        let lo = input.iter().cloned().fold(f64::INFINITY, f64::min);
        let hi = input.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let estimate = digest.quantile(q);
        // Leaving the sample range takes extrapolation past the last
        // centroid's position (p > 1). Unit weights keep that centroid a
        // singleton at position total_weight, so q = 1 lands on it exactly.
        let slack = 1e-6 * (hi - lo).abs().max(1.0);
        prop_assert!(estimate >= lo - slack && estimate <= hi + slack,
            "estimate {} outside [{}, {}]", estimate, lo, hi);
    }

    #[test]
    fn rejected_weight_leaves_digest_untouched(
        input in weighted_samples(300),
        bad in -1000i64..=0,
    ) {
        let mut digest = build(100.0, 512, &input);
        let weight = digest.total_weight();
        let pending = digest.pending_len();
        prop_assert!(digest.add(1.0, bad).is_err());
        prop_assert!(digest.merge(Centroid::new(1.0, bad)).is_err());
        prop_assert_eq!(digest.total_weight(), weight);
        prop_assert_eq!(digest.pending_len(), pending);
    }
}
