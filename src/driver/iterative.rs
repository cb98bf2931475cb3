//! Iterative strategy (spec §4.5): carries the state index, probability
//! table and staging buffer forward across passes, shrinking kappa between
//! passes so previously-truncated states become eligible for expansion.

use crate::driver::progress::ProgressReporter;
use crate::driver::{expand_common, ExpandOutcome};
use crate::error::StaminaError;
use crate::frontier::{FifoFrontier, Frontier};
use crate::model::oracle::StateOracle;
use crate::model::state::{CompressedState, StateId};
use crate::priority::{PiPriority, StatePriority};
use crate::prob_table::{ProbabilityState, ProbabilityTable};
use crate::property::BoundedUntilPredicate;
use crate::staging::TransitionStagingBuffer;
use crate::state_index::StateIndex;

pub struct IterativeDriver {
    pub index: StateIndex,
    pub table: ProbabilityTable,
    pub staging: TransitionStagingBuffer,
    initial_id: StateId,
    pass: u64,
}

pub struct PassOutcome {
    pub pi_hat: f64,
    pub states_explored: usize,
}

impl IterativeDriver {
    pub fn new(absorbing_state: CompressedState, initial_state: CompressedState) -> Self {
        let mut index = StateIndex::new(absorbing_state);
        let (initial_id, _) = index.find_or_add(initial_state);
        let mut table = ProbabilityTable::new();
        table.insert_if_absent(ProbabilityState::initial(initial_id));
        IterativeDriver {
            index,
            table,
            staging: TransitionStagingBuffer::new(),
            initial_id,
            pass: 0,
        }
    }

    /// Runs one pass with the given kappa: every state still terminal
    /// (never expanded) is dequeued; it expands if its pi is at least
    /// kappa, otherwise it is left terminal for a future, lower-kappa pass.
    pub fn run_pass(
        &mut self,
        kappa: f64,
        oracle: &dyn StateOracle,
        property: Option<&BoundedUntilPredicate>,
        progress: &mut ProgressReporter,
    ) -> Result<PassOutcome, StaminaError> {
        self.pass += 1;
        let priority_fn: &dyn StatePriority = &PiPriority;
        let mut frontier = FifoFrontier::new();

        let seeds: Vec<StateId> = self
            .table
            .iter()
            .filter(|(_, s)| s.terminal && !s.deadlock && !s.property_absorbed)
            .map(|(&id, _)| id)
            .collect();
        for id in seeds {
            if let Some(state) = self.index.state_of(id).cloned() {
                if let Some(meta) = self.table.get_mut(id) {
                    meta.iteration_last_seen = self.pass;
                }
                frontier.push(id, state, 0.0);
            }
        }

        let mut explored = 0usize;
        while let Some((id, state)) = frontier.pop() {
            let (pi, still_terminal) = {
                let meta = self
                    .table
                    .get(id)
                    .ok_or_else(|| StaminaError::InternalInvariant {
                        reason: format!("state {id} missing from table mid-pass"),
                    })?;
                (meta.pi, meta.terminal)
            };
            if !still_terminal {
                continue;
            }
            if pi < kappa {
                continue;
            }
            let outcome = expand_common(
                &mut self.index,
                &mut self.table,
                &mut self.staging,
                oracle,
                property,
                &mut frontier,
                priority_fn,
                self.pass,
                id,
                &state,
            )?;
            if let ExpandOutcome::Expanded { .. } = outcome {
                explored += 1;
                progress.tick(explored);
            }
        }

        Ok(PassOutcome {
            pi_hat: self.table.pi_hat(0),
            states_explored: self.table.len(),
        })
    }

    pub fn initial_id(&self) -> StateId {
        self.initial_id
    }
}
