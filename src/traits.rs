//! Core traits for streaming quantile sketches
//!
//! Sketches implement the base [`Sketch`] trait, with [`QuantileSketch`]
//! layering the percentile queries on top.

use core::fmt::Debug;

#[cfg(feature = "std")]
use std::vec::Vec;

#[cfg(not(feature = "std"))]
extern crate alloc;
#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

/// Error returned when a digest rejects its input
///
/// Every rejection happens before any internal buffer is touched, so the
/// digest is left exactly as it was.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DigestError {
    /// A sample weight or centroid count was zero or negative
    NonPositiveWeight {
        weight: i64,
    },
    /// Compression must be finite and strictly positive
    InvalidCompression {
        compression: f64,
    },
    /// The pending buffer needs room for at least one centroid
    InvalidPendingLimit,
    /// Folding `weight` into `total` would overflow `i64`
    WeightOverflow {
        total: i64,
        weight: i64,
    },
}

impl core::fmt::Display for DigestError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            DigestError::NonPositiveWeight { weight } => {
                write!(f, "non-positive weight: expected >= 1, found {}", weight)
            }
            DigestError::InvalidCompression { compression } => {
                write!(
                    f,
                    "invalid compression: expected finite and positive, found {}",
                    compression
                )
            }
            DigestError::InvalidPendingLimit => write!(f, "pending limit must be positive"),
            DigestError::WeightOverflow { total, weight } => {
                write!(f, "weight overflow: adding {} to total {}", weight, total)
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for DigestError {}

/// Core trait for all streaming sketches
pub trait Sketch: Clone + Debug {
    /// The type of item this sketch processes
    type Item: ?Sized;

    /// Add an item to the sketch
    fn update(&mut self, item: &Self::Item);

    /// Reset sketch to empty state
    fn clear(&mut self);

    /// Memory usage in bytes
    fn size_bytes(&self) -> usize;

    /// Number of items processed (total weight for weighted sketches)
    fn count(&self) -> u64;

    /// Check if sketch is empty
    fn is_empty(&self) -> bool {
        self.count() == 0
    }
}

/// Quantile estimation sketches
///
/// Undefined results (empty sketch, rank outside `[0, 1]`) are reported as
/// `f64::NAN` rather than as errors, so callers can poll a sketch before any
/// data has arrived.
pub trait QuantileSketch: Sketch {
    /// Add a single unit-weight value to the sketch
    fn insert(&mut self, value: f64);

    /// Get quantile value at given rank (0.0 to 1.0)
    ///
    /// rank=0.5 returns the median
    fn quantile(&self, rank: f64) -> f64;

    /// Get rank of a value (0.0 to 1.0)
    fn rank(&self, value: f64) -> f64;

    /// Get CDF value at given point
    fn cdf(&self, value: f64) -> f64 {
        self.rank(value)
    }

    /// Get minimum value seen
    fn min(&self) -> Option<f64>;

    /// Get maximum value seen
    fn max(&self) -> Option<f64>;

    /// Get median (50th percentile)
    fn median(&self) -> f64 {
        self.quantile(0.5)
    }

    /// Get multiple quantiles at once
    fn quantiles(&self, ranks: &[f64]) -> Vec<f64> {
        ranks.iter().map(|&r| self.quantile(r)).collect()
    }
}
