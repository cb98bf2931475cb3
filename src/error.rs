use thiserror::Error;

use crate::model::state::StateId;

/// Error taxonomy for the truncation engine. Every fallible public operation
/// returns `Result<T, StaminaError>`.
#[derive(Debug, Error)]
pub enum StaminaError {
    /// A caller-supplied argument or configuration value is out of range or
    /// otherwise nonsensical. Propagates immediately.
    #[error("invalid input: {reason}")]
    InputInvalid { reason: String },

    /// The oracle violated its contract (nondeterminism, a negative or zero
    /// rate, a state that round-trips to a different compressed value, etc).
    #[error("oracle inconsistency at state {state}: {reason}")]
    OracleInconsistency { state: StateId, reason: String },

    /// The iteration coordinator exhausted `max_approx_count` refinements
    /// without driving pi_hat below the window. Callers can still recover the
    /// best-so-far truncation from `TruncationOutcome::Partial`.
    #[error("budget exceeded after {refinements} refinements (pi_hat = {pi_hat})")]
    BudgetExceeded { refinements: u32, pi_hat: f64 },

    /// The run was cancelled cooperatively (caller-supplied cancellation
    /// token). Carries no partial data itself; the driver exposes its
    /// staging buffer separately if the caller wants to inspect it.
    #[error("truncation run cancelled")]
    Cancelled,

    /// An internal invariant was violated. Should never happen; if it does,
    /// it indicates a bug in this crate rather than bad input or a bad
    /// oracle.
    #[error("internal invariant violated: {reason}")]
    InternalInvariant { reason: String },
}
