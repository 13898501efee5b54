//! Correlator error types.

use std::time::Duration;
use thiserror::Error;

/// Why a correlator settled without a payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CorrelatorError {
    /// `reject` was called before any `resolve`.
    #[error("correlator rejected: {0}")]
    Rejected(String),

    /// Every resolver was dropped without settling (listener detached).
    #[error("correlator abandoned before any matching callback")]
    Abandoned,

    /// A bounded wait elapsed.
    #[error("no matching callback within {0:?}")]
    TimedOut(Duration),
}

/// A predicate set failed to classify samples into exactly one state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PartitionError {
    /// More than one predicate matched the same payload.
    #[error("sample {sample} matches several predicates: {matched:?}")]
    Overlap { sample: usize, matched: Vec<String> },

    /// No predicate matched.
    #[error("sample {sample} matches no predicate")]
    Unmatched { sample: usize },
}
