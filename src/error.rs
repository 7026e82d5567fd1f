// ============================================================
// Typed Errors
// ============================================================
// Conditions the training core reports explicitly instead of
// letting NaN/Inf leak into the logs. Everything else (missing
// files, device problems) travels as anyhow::Error with context.

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum TrainError {
    /// An epoch produced no shifted targets, so accuracy/RMSE/MAE
    /// would divide by zero (e.g. only single-event sequences).
    #[error("degenerate epoch: no predictable events (every sequence has at most one event)")]
    NoPredictions,

    /// An epoch saw no events at all, so the per-event log-likelihood
    /// has no denominator (e.g. every validation batch was skipped).
    #[error("degenerate epoch: no events were accumulated")]
    NoEvents,

    /// The exogenous-aware variant was selected but the batch carries
    /// no endogenous mask.
    #[error("exogenous variant requires an endogenous mask in every batch")]
    MissingEndoMask,

    #[error("invalid sequence {index}: {reason}")]
    InvalidSequence { index: usize, reason: String },

    #[error("malformed dataset archive: {0}")]
    MalformedArchive(String),
}
