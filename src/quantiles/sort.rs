//! Stable ordering of centroids by mean

use super::Centroid;

/// Inputs up to this length are insertion sorted in place.
const INSERTION_SORT_MAX: usize = 1024;

/// Sort centroids by mean, preserving the input order of equal means
///
/// Ordering is identical to a stable comparison sort keyed on `mean`;
/// `-0.0` and `0.0` count as equal. NaN means are ordered with
/// [`f64::total_cmp`] on the fallback path, so callers should not rely on
/// where they land.
pub fn stable_sort_by_mean(centroids: &mut [Centroid]) {
    if centroids.len() <= INSERTION_SORT_MAX {
        insertion_sort(centroids);
    } else {
        // `+ 0.0` folds -0.0 into 0.0, which total_cmp would otherwise split
        centroids.sort_by(|a, b| (a.mean + 0.0).total_cmp(&(b.mean + 0.0)));
    }
}

fn insertion_sort(centroids: &mut [Centroid]) {
    for i in 1..centroids.len() {
        let current = centroids[i];
        let mut j = i;
        // strict `<` keeps equal means in arrival order
        while j > 0 && current.mean < centroids[j - 1].mean {
            centroids[j] = centroids[j - 1];
            j -= 1;
        }
        centroids[j] = current;
    }
}
