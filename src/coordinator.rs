//! Iteration Coordinator: drives the chosen strategy through successive
//! kappa refinements (or a single pass, for the priority strategy) until
//! pi_hat drops below `prob_win / approx_factor` or the refinement budget
//! is exhausted.

use std::time::Duration;

use crate::absorb::AbsorbingSinkSynthesizer;
use crate::config::{Method, RunOptions};
use crate::driver::iterative::IterativeDriver;
use crate::driver::priority::PriorityDriver;
use crate::driver::progress::ProgressReporter;
use crate::driver::reexploring::ReExploringDriver;
use crate::error::StaminaError;
use crate::model::oracle::StateOracle;
use crate::model::state::{CompressedState, StateId};
use crate::priority::{EventStatePriority, PiPriority, StatePriority};
use crate::property::BoundedUntilPredicate;
use crate::staging::SparseMatrix;
use crate::state_index::ABSORBING_ID;

#[derive(Debug)]
pub struct TruncationResult {
    pub matrix: SparseMatrix,
    pub pi_hat: f64,
    pub deadlock_states: Vec<StateId>,
    pub initial_state: StateId,
    pub absorbing_id: StateId,
    pub states_explored: usize,
}

#[derive(Debug)]
pub enum TruncationOutcome {
    Complete(TruncationResult),
    Partial {
        result: TruncationResult,
        refinements: u32,
    },
}

impl TruncationOutcome {
    pub fn result(&self) -> &TruncationResult {
        match self {
            TruncationOutcome::Complete(r) => r,
            TruncationOutcome::Partial { result, .. } => result,
        }
    }
}

pub struct IterationCoordinator {
    pub options: RunOptions,
}

impl IterationCoordinator {
    pub fn new(options: RunOptions) -> Result<Self, StaminaError> {
        options.validate()?;
        Ok(IterationCoordinator { options })
    }

    pub fn run_iterative(
        &self,
        oracle: &dyn StateOracle,
        absorbing_state: CompressedState,
        initial_state: CompressedState,
        property: Option<&BoundedUntilPredicate>,
    ) -> Result<TruncationOutcome, StaminaError> {
        if self.options.max_approx_count == 0 {
            return Err(StaminaError::BudgetExceeded {
                refinements: 0,
                pi_hat: 1.0,
            });
        }
        let mut driver = IterativeDriver::new(absorbing_state, initial_state);
        let mut kappa = self.options.kappa;
        let mut progress = ProgressReporter::new(Duration::from_secs(5), true);
        let stop_threshold = self.options.prob_win / self.options.approx_factor;
        let mut refinements = 0u32;
        let mut pi_hat = 1.0;

        loop {
            let outcome = driver.run_pass(kappa, oracle, property, &mut progress)?;
            pi_hat = outcome.pi_hat;
            refinements += 1;
            if pi_hat < stop_threshold {
                break;
            }
            if refinements >= self.options.max_approx_count {
                let result = self.finalize_iterative(&mut driver, oracle, pi_hat)?;
                return Ok(TruncationOutcome::Partial {
                    result,
                    refinements,
                });
            }
            kappa /= self.options.reduce_kappa;
        }

        let result = self.finalize_iterative(&mut driver, oracle, pi_hat)?;
        Ok(TruncationOutcome::Complete(result))
    }

    fn finalize_iterative(
        &self,
        driver: &mut IterativeDriver,
        oracle: &dyn StateOracle,
        pi_hat: f64,
    ) -> Result<TruncationResult, StaminaError> {
        AbsorbingSinkSynthesizer::finalize(&driver.index, &mut driver.table, &mut driver.staging, oracle);
        let deadlock_states = driver
            .table
            .iter()
            .filter(|(_, s)| s.deadlock)
            .map(|(&id, _)| id)
            .collect();
        let num_rows = driver.index.len();
        let matrix = std::mem::take(&mut driver.staging).finalize(num_rows);
        Ok(TruncationResult {
            matrix,
            pi_hat,
            deadlock_states,
            initial_state: driver.initial_id(),
            absorbing_id: ABSORBING_ID,
            states_explored: driver.table.len(),
        })
    }

    pub fn run_re_exploring(
        &self,
        oracle: &dyn StateOracle,
        absorbing_state: CompressedState,
        initial_state: CompressedState,
        property: Option<&BoundedUntilPredicate>,
    ) -> Result<TruncationOutcome, StaminaError> {
        if self.options.max_approx_count == 0 {
            return Err(StaminaError::BudgetExceeded {
                refinements: 0,
                pi_hat: 1.0,
            });
        }
        let initial_state_key = initial_state.clone();
        let driver = ReExploringDriver::new(absorbing_state, initial_state);
        let mut kappa = self.options.kappa;
        let mut progress = ProgressReporter::new(Duration::from_secs(5), true);
        let stop_threshold = self.options.prob_win / self.options.approx_factor;
        let mut refinements = 0u32;

        loop {
            let mut pass = driver.run_pass(kappa, oracle, property, &mut progress)?;
            refinements += 1;
            let budget_exhausted = refinements >= self.options.max_approx_count;
            if pass.pi_hat < stop_threshold || budget_exhausted {
                AbsorbingSinkSynthesizer::finalize(&pass.index, &mut pass.table, &mut pass.staging, oracle);
                let deadlock_states = pass
                    .table
                    .iter()
                    .filter(|(_, s)| s.deadlock)
                    .map(|(&id, _)| id)
                    .collect();
                let initial_id = pass.index.get(&initial_state_key).unwrap_or(0);
                let num_rows = pass.index.len();
                let result = TruncationResult {
                    matrix: pass.staging.finalize(num_rows),
                    pi_hat: pass.pi_hat,
                    deadlock_states,
                    initial_state: initial_id,
                    absorbing_id: ABSORBING_ID,
                    states_explored: pass.table.len(),
                };
                return if budget_exhausted && pass.pi_hat >= stop_threshold {
                    Ok(TruncationOutcome::Partial {
                        result,
                        refinements,
                    })
                } else {
                    Ok(TruncationOutcome::Complete(result))
                };
            }
            kappa /= self.options.reduce_kappa;
        }
    }

    pub fn run_priority(
        &self,
        oracle: &dyn StateOracle,
        absorbing_state: CompressedState,
        initial_state: CompressedState,
        property: Option<&BoundedUntilPredicate>,
        event_tree: Option<EventStatePriority>,
    ) -> Result<TruncationOutcome, StaminaError> {
        let mut driver = PriorityDriver::new(
            absorbing_state,
            initial_state,
            self.options.prob_win,
            self.options.approx_factor,
            self.options.fudge_factor,
            self.options.preterminate,
        );
        let mut progress = ProgressReporter::new(Duration::from_secs(5), true);
        let priority_fn: Box<dyn StatePriority> = match &event_tree {
            Some(tree) => Box::new(EventStatePriorityOwned(
                tree.layout.clone(),
                tree.tree.clone(),
                tree.rare_event,
            )),
            None => Box::new(PiPriority),
        };
        let run_outcome = driver.run(oracle, priority_fn.as_ref(), property, &mut progress)?;

        AbsorbingSinkSynthesizer::finalize(&driver.index, &mut driver.table, &mut driver.staging, oracle);
        let deadlock_states = driver
            .table
            .iter()
            .filter(|(_, s)| s.deadlock)
            .map(|(&id, _)| id)
            .collect();
        let num_rows = driver.index.len();
        let initial_state = driver.initial_id();
        let result = TruncationResult {
            matrix: driver.staging.finalize(num_rows),
            pi_hat: run_outcome.pi_hat,
            deadlock_states,
            initial_state,
            absorbing_id: ABSORBING_ID,
            states_explored: run_outcome.states_explored,
        };
        Ok(TruncationOutcome::Complete(result))
    }

    pub fn method(&self) -> Method {
        self.options.method
    }
}

struct EventStatePriorityOwned(
    std::sync::Arc<crate::model::state::VariableLayout>,
    crate::priority::DistanceExpr,
    bool,
);
impl StatePriority for EventStatePriorityOwned {
    fn priority(
        &self,
        _table: &crate::prob_table::ProbabilityTable,
        _id: StateId,
        state: &CompressedState,
    ) -> f64 {
        let distance = self.1.accumulate(&self.0, state);
        if self.2 {
            -distance
        } else {
            distance
        }
    }
}
