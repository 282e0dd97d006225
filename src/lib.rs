//! # Flowdigest
//!
//! Streaming quantile estimation for Rust.
//!
//! Flowdigest tracks approximate percentiles of high-volume streams (latency
//! histograms, monitoring, batch analytics) with a merging t-digest: a
//! bounded, adaptively sized set of weighted centroids that stays precise at
//! the tails and coarse near the median.
//!
//! ## Features
//!
//! - **Bounded Memory**: summary size is governed by the compression parameter
//! - **Batched Ingestion**: samples are buffered and compressed in amortized batches
//! - **Tail Accuracy**: centroids near q=0 and q=1 stay small
//! - **Weighted Input**: samples and pre-aggregated centroids carry integer weights
//!
//! ## Quick Start
//!
//! ```rust
//! use flowdigest::prelude::*;
//!
//! let mut digest = MergingDigest::new(100.0);
//! for latency_ms in [12.0, 15.0, 11.0, 240.0, 13.0] {
//!     digest.add(latency_ms, 1).unwrap();
//! }
//! println!("p50 latency: ~{}", digest.quantile(0.5));
//! ```
//!
//! ## Undefined Results
//!
//! Querying an empty digest, or asking for a rank outside `[0, 1]`, returns
//! `f64::NAN` instead of failing:
//!
//! ```rust
//! use flowdigest::MergingDigest;
//!
//! let digest = MergingDigest::new(100.0);
//! assert!(digest.quantile(0.5).is_nan());
//! ```
//!
//! ## Feature Flags
//!
//! - `std` (default): Standard library support. Without it the crate
//!   builds on `core` + `alloc`.
//!
//! ## Diagnostics
//!
//! Construction, compression and rejected input emit [`tracing`] events
//! under the `flowdigest` target. Install a subscriber to see them.

#![cfg_attr(not(feature = "std"), no_std)]
#![cfg_attr(docsrs, feature(doc_cfg))]

#[cfg(not(feature = "std"))]
extern crate alloc;

// Core traits always available
pub mod traits;

pub mod quantiles;

pub mod prelude {
    pub use crate::traits::*;

    pub use crate::quantiles::{Centroid, MergingDigest};
}

pub use quantiles::{Centroid, MergingDigest};
pub use traits::DigestError;
