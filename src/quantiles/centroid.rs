//! Weighted summary points

use crate::traits::DigestError;

/// A centroid in the merging digest
///
/// A centroid stands in for one or more samples by their total count and
/// running mean. Centroids only ever grow: another centroid can be folded
/// in, but a centroid is never split.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Centroid {
    /// Mean value of the centroid
    pub mean: f64,
    /// Total weight folded into the centroid
    pub count: i64,
}

impl Centroid {
    /// Create a new centroid
    ///
    /// The count is not validated here; [`MergingDigest::merge`] rejects
    /// centroids whose count is not positive.
    ///
    /// [`MergingDigest::merge`]: super::MergingDigest::merge
    pub fn new(mean: f64, count: i64) -> Self {
        Self { mean, count }
    }

    /// Add a sample `value` with weight `count`, updating the running mean
    pub fn add(&mut self, value: f64, count: i64) -> Result<(), DigestError> {
        self.fold(&Centroid::new(value, count))
    }

    /// Fold another centroid into this one
    ///
    /// Returns an error (and leaves `self` untouched) if `other.count` is
    /// not positive or the combined count would overflow.
    pub fn fold(&mut self, other: &Centroid) -> Result<(), DigestError> {
        if other.count <= 0 {
            return Err(DigestError::NonPositiveWeight {
                weight: other.count,
            });
        }
        if self.count.checked_add(other.count).is_none() {
            return Err(DigestError::WeightOverflow {
                total: self.count,
                weight: other.count,
            });
        }
        self.fold_unchecked(other);
        Ok(())
    }

    /// Incremental weighted mean.
    ///
    /// `mean += w * (x - mean) / n` keeps the result between the two input
    /// means without forming `mean * count` products. The combined count
    /// must fit in `i64`; inside a digest it is bounded by the total weight.
    #[inline]
    pub(crate) fn fold_unchecked(&mut self, other: &Centroid) {
        self.count += other.count;
        self.mean += other.count as f64 * (other.mean - self.mean) / self.count as f64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_single_sample() {
        let mut c = Centroid::new(10.0, 1);
        c.add(20.0, 1).unwrap();
        assert_eq!(c.count, 2);
        assert_eq!(c.mean, 15.0);
    }

    #[test]
    fn test_fold_weighted() {
        let mut c = Centroid::new(0.0, 3);
        c.fold(&Centroid::new(4.0, 1)).unwrap();
        assert_eq!(c.count, 4);
        assert_eq!(c.mean, 1.0);
    }

    #[test]
    fn test_mean_stays_between_inputs() {
        let mut c = Centroid::new(1e15, 1_000_000_000);
        c.fold(&Centroid::new(1e15 + 2.0, 1_000_000_000)).unwrap();
        assert!(c.mean >= 1e15 && c.mean <= 1e15 + 2.0, "mean={}", c.mean);
        assert_eq!(c.count, 2_000_000_000);
    }

    #[test]
    fn test_rejects_non_positive_weight() {
        let mut c = Centroid::new(5.0, 2);
        assert_eq!(
            c.add(1.0, 0),
            Err(DigestError::NonPositiveWeight { weight: 0 })
        );
        assert_eq!(
            c.fold(&Centroid::new(1.0, -1)),
            Err(DigestError::NonPositiveWeight { weight: -1 })
        );
        assert_eq!(c, Centroid::new(5.0, 2));
    }

    #[test]
    fn test_rejects_count_overflow() {
        let mut c = Centroid::new(1.0, i64::MAX);
        assert_eq!(
            c.add(2.0, 1),
            Err(DigestError::WeightOverflow {
                total: i64::MAX,
                weight: 1
            })
        );
        assert_eq!(c, Centroid::new(1.0, i64::MAX));
    }
}
