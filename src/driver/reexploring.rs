//! Re-exploring strategy (spec §4.6): unlike the iterative strategy, every
//! pass starts from a fresh state index and probability table and performs
//! a full breadth-first traversal from the initial state with the pass's
//! kappa threshold, discarding the previous pass's exploration entirely.

use crate::driver::progress::ProgressReporter;
use crate::driver::{expand_common, ExpandOutcome};
use crate::error::StaminaError;
use crate::frontier::{FifoFrontier, Frontier};
use crate::model::oracle::StateOracle;
use crate::model::state::CompressedState;
use crate::priority::{PiPriority, StatePriority};
use crate::prob_table::{ProbabilityState, ProbabilityTable};
use crate::property::BoundedUntilPredicate;
use crate::staging::TransitionStagingBuffer;
use crate::state_index::StateIndex;

pub struct PassOutcome {
    pub index: StateIndex,
    pub table: ProbabilityTable,
    pub staging: TransitionStagingBuffer,
    pub pi_hat: f64,
}

pub struct ReExploringDriver {
    absorbing_state: CompressedState,
    initial_state: CompressedState,
}

impl ReExploringDriver {
    pub fn new(absorbing_state: CompressedState, initial_state: CompressedState) -> Self {
        ReExploringDriver {
            absorbing_state,
            initial_state,
        }
    }

    pub fn run_pass(
        &self,
        kappa: f64,
        oracle: &dyn StateOracle,
        property: Option<&BoundedUntilPredicate>,
        progress: &mut ProgressReporter,
    ) -> Result<PassOutcome, StaminaError> {
        let mut index = StateIndex::new(self.absorbing_state.clone());
        let (initial_id, _) = index.find_or_add(self.initial_state.clone());
        let mut table = ProbabilityTable::new();
        table.insert_if_absent(ProbabilityState::initial(initial_id));
        let mut staging = TransitionStagingBuffer::new();

        let priority_fn: &dyn StatePriority = &PiPriority;
        let mut frontier = FifoFrontier::new();
        frontier.push(initial_id, self.initial_state.clone(), 0.0);
        if let Some(meta) = table.get_mut(initial_id) {
            meta.iteration_last_seen = 1;
        }

        let mut explored = 0usize;
        while let Some((id, state)) = frontier.pop() {
            let (pi, still_terminal) = {
                let meta = table
                    .get(id)
                    .ok_or_else(|| StaminaError::InternalInvariant {
                        reason: format!("state {id} missing from table mid-pass"),
                    })?;
                (meta.pi, meta.terminal)
            };
            if !still_terminal {
                continue;
            }
            if pi < kappa && id != initial_id {
                continue;
            }
            let outcome = expand_common(
                &mut index,
                &mut table,
                &mut staging,
                oracle,
                property,
                &mut frontier,
                priority_fn,
                1,
                id,
                &state,
            )?;
            if let ExpandOutcome::Expanded { .. } = outcome {
                explored += 1;
                progress.tick(explored);
            }
        }

        let pi_hat = table.pi_hat(0);
        Ok(PassOutcome {
            index,
            table,
            staging,
            pi_hat,
        })
    }
}
