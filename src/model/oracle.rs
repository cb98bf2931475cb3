//! The Next-State Oracle contract (spec §6): an external, pure function from
//! a compressed state to its outgoing CTMC transitions. The core never
//! constructs states on its own; it only ever asks the oracle to expand one
//! it has already discovered.

use super::state::CompressedState;

/// A single outgoing transition as reported by the oracle: the successor
/// state and its rate. Rates must be strictly positive; a zero or negative
/// rate is an oracle contract violation (`StaminaError::OracleInconsistency`).
#[derive(Clone, Debug)]
pub struct Successor {
    pub state: CompressedState,
    pub rate: f64,
}

/// The result of expanding one state: its successors plus whatever reward
/// the oracle wants to attach (unused by the truncation core itself, carried
/// through for downstream consumers).
#[derive(Clone, Debug, Default)]
pub struct Expansion {
    pub successors: Vec<Successor>,
    pub state_reward: f64,
}

impl Expansion {
    pub fn is_deadlock(&self) -> bool {
        self.successors.is_empty()
    }

    pub fn total_rate(&self) -> f64 {
        self.successors.iter().map(|s| s.rate).sum()
    }
}

/// The Next-State Oracle contract. Implementations must be deterministic:
/// calling `expand` twice on states with equal bits must return the same
/// successor set, since the common expansion step may call it more than
/// once (e.g. at absorbing-sink finalization) for the same state.
pub trait StateOracle {
    fn expand(&self, state: &CompressedState) -> Expansion;
}
