//! Progress Tracking
//!
//! Per-task sample history and rate/ETA estimation over it.

#![warn(missing_docs)]

pub mod history;
pub mod estimator;

pub use history::ProgressHistory;
pub use estimator::{CompletionEstimate, CompletionEstimator, ProgressSummary};
