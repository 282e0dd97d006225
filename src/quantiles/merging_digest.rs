//! Merging t-digest quantile estimator
//!
//! Incoming samples are staged in a small pending buffer and folded into a
//! sorted, size-bounded summary in batches. Batching amortizes the cost of
//! compression across many insertions instead of paying it per sample.
//!
//! # Read Path
//!
//! Queries (`quantile()`, `rank()`, `summary()`) must see every sample, so
//! they compress the pending buffer first. The buffers live behind a
//! `RefCell` so that this happens on `&self`.
//!
//! # Thread Safety
//!
//! `MergingDigest` is `Send` but **not `Sync`**. Because every read may
//! mutate the buffers, reads and writes must be serialized by the caller,
//! e.g. with `Arc<Mutex<_>>`.

use super::sort::stable_sort_by_mean;
use super::Centroid;
use crate::traits::{DigestError, QuantileSketch, Sketch};
use core::cell::RefCell;

#[cfg(feature = "std")]
use std::vec::Vec;

#[cfg(not(feature = "std"))]
extern crate alloc;
#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

/// Default number of pending centroids that triggers a compression
pub const DEFAULT_PENDING_LIMIT: usize = 512;

/// Compression used by [`MergingDigest::default`]
pub const DEFAULT_COMPRESSION: f64 = 100.0;

/// The three centroid collections owned by a digest.
///
/// `summary` and `scratch` trade places on every compression, so neither
/// is reallocated in steady state.
#[derive(Clone, Debug)]
struct Buffers {
    /// Unsorted centroids not yet folded into the summary
    pending: Vec<Centroid>,
    /// Sorted by mean; the queryable state
    summary: Vec<Centroid>,
    /// Rebuilt from scratch on each compression, then promoted
    scratch: Vec<Centroid>,
}

impl Buffers {
    /// Fold `pending` into `summary`.
    ///
    /// `total_weight` must already include every pending centroid.
    fn compress(&mut self, total_weight: i64, compression: f64) {
        if self.pending.is_empty() {
            return;
        }

        let Buffers {
            pending,
            summary,
            scratch,
        } = self;

        let pending_len = pending.len();
        let summary_before = summary.len();

        stable_sort_by_mean(pending);
        scratch.clear();

        // cumulative weight of every scratch centroid before the last one
        let mut sum: i64 = 0;
        let (mut i, mut j) = (0, 0);

        while i < summary.len() && j < pending.len() {
            // ties go to the existing summary
            let next = if summary[i].mean <= pending[j].mean {
                i += 1;
                summary[i - 1]
            } else {
                j += 1;
                pending[j - 1]
            };
            collapse(scratch, &mut sum, next, total_weight, compression);
        }
        for &c in &summary[i..] {
            collapse(scratch, &mut sum, c, total_weight, compression);
        }
        for &c in &pending[j..] {
            collapse(scratch, &mut sum, c, total_weight, compression);
        }

        core::mem::swap(summary, scratch);
        pending.clear();

        tracing::trace!(
            target: "flowdigest",
            pending = pending_len,
            summary_before,
            summary_after = summary.len(),
            total_weight,
            "digest_compressed"
        );
    }

    fn clear(&mut self) {
        self.pending.clear();
        self.summary.clear();
        self.scratch.clear();
    }
}

/// Append `b` to `merged`, or fold it into the last centroid if the pair
/// stays under the scale bound at its position in the distribution.
#[inline]
fn collapse(
    merged: &mut Vec<Centroid>,
    sum: &mut i64,
    b: Centroid,
    total_weight: i64,
    compression: f64,
) {
    let Some(&a) = merged.last() else {
        merged.push(b);
        return;
    };

    let denom = (total_weight - 1) as f64;
    let qa = (*sum as f64 + (a.count - 1) as f64 * 0.5) / denom;
    let qb = ((*sum + a.count) as f64 + (b.count - 1) as f64 * 0.5) / denom;
    // the end nearer a tail bounds the pair
    let err = (qa * (1.0 - qa)).min(qb * (1.0 - qb));
    let k = 4.0 * total_weight as f64 * err / compression;

    if (a.count + b.count) as f64 <= k {
        let last = merged.len() - 1;
        merged[last].fold_unchecked(&b);
    } else {
        *sum += a.count;
        merged.push(b);
    }
}

/// Merging t-digest quantile sketch
///
/// The digest keeps a bounded set of weighted centroids approximating the
/// distribution of everything added so far. It provides:
///
/// - O(1) amortized time per insertion
/// - Accurate estimation at the tails (p01, p99), coarser near the median
/// - A summary of roughly O(compression) centroids, growing only logarithmically
///   with stream length
///
/// # Compression Parameter
///
/// For two adjacent centroids at quantile positions `qa` and `qb`, the
/// pair is folded together while their combined count stays within
///
/// ```text
/// k = 4 * total_weight * min(qa * (1 - qa), qb * (1 - qb)) / compression
/// ```
///
/// - Higher compression = more, smaller centroids = better accuracy = more memory
/// - Typical values: 100-500
/// - Default: 100
///
/// # Pending Limit
///
/// Ingested centroids are buffered until [`DEFAULT_PENDING_LIMIT`] (512) of
/// them are waiting, then compressed as a batch. The limit can be tuned per
/// instance with [`with_pending_limit`](Self::with_pending_limit).
///
/// # Example
///
/// ```
/// use flowdigest::quantiles::MergingDigest;
///
/// let mut digest = MergingDigest::new(100.0);
///
/// for i in 1..=1000 {
///     digest.add(i as f64, 1).unwrap();
/// }
///
/// let p50 = digest.quantile(0.5);
/// let p99 = digest.quantile(0.99);
/// assert!(p50 < p99);
///
/// // Non-positive weights are rejected without touching the digest
/// assert!(digest.add(1.0, 0).is_err());
/// assert_eq!(digest.total_weight(), 1000);
/// ```
#[derive(Clone, Debug)]
pub struct MergingDigest {
    /// Compression parameter (higher = more accuracy, more memory)
    compression: f64,
    /// Pending buffer length that forces compression
    pending_limit: usize,
    /// Interior mutable state: pending, summary and scratch buffers
    buffers: RefCell<Buffers>,
    /// Sum of every count ever merged
    total_weight: i64,
    /// Minimum mean seen
    min: f64,
    /// Maximum mean seen
    max: f64,
}

impl MergingDigest {
    /// Create a new digest with the given compression parameter
    ///
    /// # Arguments
    ///
    /// * `compression` - Controls accuracy vs memory tradeoff. Typical values: 100-500.
    ///   Must be finite and positive.
    ///
    /// # Panics
    ///
    /// Panics if `compression` is not finite or not positive. Use
    /// [`try_new`](Self::try_new) to get an error instead.
    pub fn new(compression: f64) -> Self {
        assert!(
            compression.is_finite() && compression > 0.0,
            "compression must be finite and positive, got {}",
            compression
        );
        Self::build(compression)
    }

    /// Create a new digest, rejecting an invalid compression parameter
    pub fn try_new(compression: f64) -> Result<Self, DigestError> {
        if !(compression.is_finite() && compression > 0.0) {
            return Err(DigestError::InvalidCompression { compression });
        }
        Ok(Self::build(compression))
    }

    fn build(compression: f64) -> Self {
        tracing::debug!(
            target: "flowdigest",
            compression,
            pending_limit = DEFAULT_PENDING_LIMIT,
            "digest_created"
        );

        Self {
            compression,
            pending_limit: DEFAULT_PENDING_LIMIT,
            buffers: RefCell::new(Buffers {
                pending: Vec::with_capacity(DEFAULT_PENDING_LIMIT),
                summary: Vec::new(),
                scratch: Vec::new(),
            }),
            total_weight: 0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    /// Set the pending buffer limit
    ///
    /// # Panics
    ///
    /// Panics if `limit` is zero.
    pub fn with_pending_limit(mut self, limit: usize) -> Self {
        assert!(limit > 0, "pending limit must be positive");
        self.apply_pending_limit(limit);
        self
    }

    /// Set the pending buffer limit, rejecting zero
    pub fn try_with_pending_limit(mut self, limit: usize) -> Result<Self, DigestError> {
        self.set_pending_limit(limit)?;
        Ok(self)
    }

    /// Change the pending buffer limit
    ///
    /// If more centroids than the new limit are already waiting, they are
    /// compressed immediately.
    pub fn set_pending_limit(&mut self, limit: usize) -> Result<(), DigestError> {
        if limit == 0 {
            return Err(DigestError::InvalidPendingLimit);
        }
        self.apply_pending_limit(limit);
        Ok(())
    }

    fn apply_pending_limit(&mut self, limit: usize) {
        self.pending_limit = limit;
        if self.buffers.get_mut().pending.len() >= limit {
            self.compress();
        }
    }

    /// Get the compression parameter
    pub fn compression(&self) -> f64 {
        self.compression
    }

    /// Get the pending buffer limit
    pub fn pending_limit(&self) -> usize {
        self.pending_limit
    }

    /// Sum of the counts of every sample and centroid merged so far
    pub fn total_weight(&self) -> i64 {
        self.total_weight
    }

    /// Get the current number of compressed centroids
    ///
    /// Note: this does not include centroids still in the pending buffer.
    /// Call `compress()` first if you need the fully compressed count.
    pub fn num_centroids(&self) -> usize {
        self.buffers.borrow().summary.len()
    }

    /// Number of centroids waiting for the next compression
    pub fn pending_len(&self) -> usize {
        self.buffers.borrow().pending.len()
    }

    /// Add a sample `value` with weight `weight`
    ///
    /// Returns [`DigestError::NonPositiveWeight`] if `weight <= 0`.
    pub fn add(&mut self, value: f64, weight: i64) -> Result<(), DigestError> {
        self.merge(Centroid::new(value, weight))
    }

    /// Merge an externally built centroid into the digest
    ///
    /// The centroid is staged in the pending buffer; reaching the pending
    /// limit compresses the buffer before this call returns.
    ///
    /// Returns [`DigestError::NonPositiveWeight`] if `centroid.count <= 0`
    /// and [`DigestError::WeightOverflow`] if the total weight would no
    /// longer fit in `i64`. Either way the digest is left unchanged.
    pub fn merge(&mut self, centroid: Centroid) -> Result<(), DigestError> {
        if centroid.count <= 0 {
            tracing::debug!(target: "flowdigest", weight = centroid.count, "weight_rejected");
            return Err(DigestError::NonPositiveWeight {
                weight: centroid.count,
            });
        }
        let Some(total_weight) = self.total_weight.checked_add(centroid.count) else {
            tracing::debug!(
                target: "flowdigest",
                weight = centroid.count,
                total_weight = self.total_weight,
                "weight_overflow"
            );
            return Err(DigestError::WeightOverflow {
                total: self.total_weight,
                weight: centroid.count,
            });
        };
        self.push(centroid, total_weight);
        Ok(())
    }

    /// Stage a validated centroid; `total_weight` already includes it
    fn push(&mut self, centroid: Centroid, total_weight: i64) {
        // get_mut() bypasses RefCell runtime checks since we have &mut self
        let buffers = self.buffers.get_mut();
        buffers.pending.push(centroid);
        self.total_weight = total_weight;
        self.min = self.min.min(centroid.mean);
        self.max = self.max.max(centroid.mean);

        if buffers.pending.len() >= self.pending_limit {
            buffers.compress(self.total_weight, self.compression);
        }
    }

    /// Fold any pending centroids into the summary
    ///
    /// A no-op when nothing is pending, so repeated calls leave the summary
    /// unchanged.
    pub fn compress(&mut self) {
        self.buffers
            .get_mut()
            .compress(self.total_weight, self.compression);
    }

    /// Compress through the `RefCell` for `&self` queries.
    fn ensure_compressed(&self) {
        if self.buffers.borrow().pending.is_empty() {
            return;
        }
        self.buffers
            .borrow_mut()
            .compress(self.total_weight, self.compression);
    }

    /// Snapshot of the compressed summary, sorted by mean
    ///
    /// Pending data is compressed first. The returned vector is an
    /// independent copy; later insertions do not affect it.
    pub fn summary(&self) -> Vec<Centroid> {
        self.ensure_compressed();
        self.buffers.borrow().summary.clone()
    }

    /// Estimate the value at quantile `q`
    ///
    /// Returns `f64::NAN` if the digest is empty or `q` is outside `[0, 1]`.
    pub fn quantile(&self, q: f64) -> f64 {
        self.ensure_compressed();
        let buffers = self.buffers.borrow();
        Self::quantile_impl(&buffers.summary, self.total_weight, q)
    }

    /// Estimate the fraction of weight at or below `value`
    ///
    /// Returns `f64::NAN` if the digest is empty or `value` is NaN.
    pub fn rank(&self, value: f64) -> f64 {
        self.ensure_compressed();
        let buffers = self.buffers.borrow();
        Self::rank_impl(&buffers.summary, self.total_weight, value)
    }

    /// Quantile query by interpolating between centroid positions.
    ///
    /// A centroid sits at `1 + weight_before + (count - 1) / 2` on the
    /// cumulative weight axis; the walk starts from `(0, first mean)`.
    fn quantile_impl(summary: &[Centroid], total_weight: i64, q: f64) -> f64 {
        if summary.is_empty() || !(0.0..=1.0).contains(&q) {
            return f64::NAN;
        }
        if summary.len() == 1 {
            return summary[0].mean;
        }

        let index = total_weight as f64 * q;

        let mut sum: i64 = 1;
        let mut a_mean = summary[0].mean;
        let mut a_index = 0.0_f64;
        let mut b_mean = summary[0].mean;
        let mut b_index = sum as f64 + (summary[0].count - 1) as f64 * 0.5;

        for (prev, next) in summary.iter().zip(&summary[1..]) {
            if index <= b_index {
                break;
            }
            sum += prev.count;
            a_mean = b_mean;
            a_index = b_index;
            b_mean = next.mean;
            b_index = sum as f64 + (next.count - 1) as f64 * 0.5;
        }

        if a_mean == b_mean {
            return a_mean;
        }

        // consecutive positions are at least 1 apart, so this never divides by zero
        let p = (index - a_index) / (b_index - a_index);
        let value = a_mean * (1.0 - p) + b_mean * p;
        if p <= 1.0 {
            // rounding must not step outside the bracket, or the estimate
            // could decrease across a segment boundary
            value.max(a_mean).min(b_mean)
        } else {
            value
        }
    }

    /// Rank query on the same piecewise linear model as `quantile_impl`.
    fn rank_impl(summary: &[Centroid], total_weight: i64, value: f64) -> f64 {
        let (first, last) = match (summary.first(), summary.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return f64::NAN,
        };
        if value.is_nan() {
            return f64::NAN;
        }
        if value < first.mean {
            return 0.0;
        }
        if value >= last.mean {
            return 1.0;
        }

        let mut sum: i64 = 1;
        let mut prev_index = 0.0_f64;
        let mut prev_mean = first.mean;

        for c in summary {
            let index = sum as f64 + (c.count - 1) as f64 * 0.5;
            if value < c.mean {
                // prev_mean <= value < c.mean, so the span is positive
                let t = (value - prev_mean) / (c.mean - prev_mean);
                let r = prev_index + t * (index - prev_index);
                return (r / total_weight as f64).clamp(0.0, 1.0);
            }
            sum += c.count;
            prev_index = index;
            prev_mean = c.mean;
        }

        1.0
    }
}

impl Default for MergingDigest {
    fn default() -> Self {
        Self::new(DEFAULT_COMPRESSION)
    }
}

impl Sketch for MergingDigest {
    type Item = f64;

    /// Unit-weight ingestion; a sample that would overflow the total
    /// weight is dropped.
    fn update(&mut self, item: &f64) {
        let _ = self.merge(Centroid::new(*item, 1));
    }

    fn clear(&mut self) {
        self.buffers.get_mut().clear();
        self.total_weight = 0;
        self.min = f64::INFINITY;
        self.max = f64::NEG_INFINITY;
    }

    fn size_bytes(&self) -> usize {
        let buffers = self.buffers.borrow();
        let centroids =
            buffers.pending.capacity() + buffers.summary.capacity() + buffers.scratch.capacity();
        core::mem::size_of::<Self>() + centroids * core::mem::size_of::<Centroid>()
    }

    fn count(&self) -> u64 {
        self.total_weight as u64
    }
}

impl QuantileSketch for MergingDigest {
    fn insert(&mut self, value: f64) {
        let _ = self.merge(Centroid::new(value, 1));
    }

    fn quantile(&self, rank: f64) -> f64 {
        MergingDigest::quantile(self, rank)
    }

    fn rank(&self, value: f64) -> f64 {
        MergingDigest::rank(self, value)
    }

    fn min(&self) -> Option<f64> {
        if self.total_weight == 0 {
            None
        } else {
            Some(self.min)
        }
    }

    fn max(&self) -> Option<f64> {
        if self.total_weight == 0 {
            None
        } else {
            Some(self.max)
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
