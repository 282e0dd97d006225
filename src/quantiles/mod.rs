//! Quantile estimation
//!
//! This module provides a merging t-digest for estimating quantiles
//! (percentiles) of a data stream without storing every sample.
//!
//! # Types
//!
//! - [`MergingDigest`]: batched digest with high accuracy at the extremes
//! - [`Centroid`]: weighted summary point `(mean, count)`
//! - [`stable_sort_by_mean`]: the ordering used on the pending buffer
//!
//! # Example
//!
//! ```
//! use flowdigest::quantiles::MergingDigest;
//!
//! let mut digest = MergingDigest::new(100.0);
//!
//! for value in [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0] {
//!     digest.add(value, 1).unwrap();
//! }
//!
//! assert_eq!(digest.quantile(0.5), 5.0);
//! assert!(digest.quantile(1.5).is_nan());
//! ```

mod centroid;
mod merging_digest;
mod sort;

pub use centroid::Centroid;
pub use merging_digest::{MergingDigest, DEFAULT_COMPRESSION, DEFAULT_PENDING_LIMIT};
pub use sort::stable_sort_by_mean;
