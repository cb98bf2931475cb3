//! Priority strategy (spec §4.7): a single pass over a priority-ordered
//! frontier, with pre-termination of low-weight newly discovered successors
//! so their exploration can be deferred rather than ever performed, unless
//! enough incoming probability mass accumulates to justify promoting them.

use std::collections::HashSet;

use crate::driver::progress::ProgressReporter;
use crate::error::StaminaError;
use crate::frontier::{Frontier, PriorityFrontier};
use crate::model::oracle::StateOracle;
use crate::model::state::{CompressedState, StateId};
use crate::priority::{PreterminatedSet, StatePriority};
use crate::prob_table::{DeferredTransition, ProbabilityState, ProbabilityTable};
use crate::property::BoundedUntilPredicate;
use crate::staging::TransitionStagingBuffer;
use crate::state_index::{StateIndex, ABSORBING_ID};

pub struct PriorityDriver {
    pub index: StateIndex,
    pub table: ProbabilityTable,
    pub staging: TransitionStagingBuffer,
    pub preterminated: PreterminatedSet,
    initial_id: StateId,
    enqueued: HashSet<StateId>,
    prob_win: f64,
    approx_factor: f64,
    fudge_factor: f64,
    preterminate_enabled: bool,
}

pub struct RunOutcome {
    pub pi_hat: f64,
    pub states_explored: usize,
}

impl PriorityDriver {
    pub fn new(
        absorbing_state: CompressedState,
        initial_state: CompressedState,
        prob_win: f64,
        approx_factor: f64,
        fudge_factor: f64,
        preterminate_enabled: bool,
    ) -> Self {
        let mut index = StateIndex::new(absorbing_state);
        let (initial_id, _) = index.find_or_add(initial_state);
        let mut table = ProbabilityTable::new();
        table.insert_if_absent(ProbabilityState::initial(initial_id));
        PriorityDriver {
            index,
            table,
            staging: TransitionStagingBuffer::new(),
            preterminated: PreterminatedSet::new(),
            initial_id,
            enqueued: HashSet::new(),
            prob_win,
            approx_factor,
            fudge_factor,
            preterminate_enabled,
        }
    }

    fn window_power(&self, explored: usize) -> f64 {
        let n = (explored.max(2)) as f64;
        self.prob_win.powf(self.fudge_factor * n.log10())
    }

    fn should_preterminate(&self, contribution: f64, explored: usize) -> bool {
        if !self.preterminate_enabled {
            return false;
        }
        let threshold = self.window_power(explored) / (explored.max(1) as f64);
        (contribution / 2.0) < threshold
    }

    pub fn run(
        &mut self,
        oracle: &dyn StateOracle,
        priority_fn: &dyn StatePriority,
        property: Option<&BoundedUntilPredicate>,
        progress: &mut ProgressReporter,
    ) -> Result<RunOutcome, StaminaError> {
        let mut frontier = PriorityFrontier::new();
        let initial_state = self.index.state_of(self.initial_id).unwrap().clone();
        frontier.push(self.initial_id, initial_state, 1.0);
        self.enqueued.insert(self.initial_id);

        let mut explored = 0usize;
        let mut hold = true;
        let stop_threshold = self.prob_win / self.approx_factor;

        loop {
            let pi_hat = self.table.pi_hat(ABSORBING_ID);
            if frontier.is_empty() || (!hold && pi_hat < stop_threshold) {
                break;
            }
            let Some((id, state)) = frontier.pop() else {
                break;
            };
            hold = false;

            let pred_pi = self
                .table
                .get(id)
                .map(|m| m.pi)
                .ok_or_else(|| StaminaError::InternalInvariant {
                    reason: format!("state {id} missing from table mid-pass"),
                })?;

            if let Some(pred) = property {
                if pred.should_absorb(&state) {
                    let meta = self.table.get_mut(id).unwrap();
                    meta.property_absorbed = true;
                    if meta.is_new {
                        self.staging.add(id, id, 1.0);
                        meta.is_new = false;
                    }
                    continue;
                }
            }

            let expansion = oracle.expand(&state);
            if expansion.is_deadlock() {
                let meta = self.table.get_mut(id).unwrap();
                meta.deadlock = true;
                meta.terminal = true;
                if meta.is_new {
                    self.staging.add(id, id, 1.0);
                    meta.is_new = false;
                }
                continue;
            }

            let total_rate = expansion.total_rate();
            let mut seen_targets = HashSet::new();
            for successor in &expansion.successors {
                if successor.rate <= 0.0 {
                    return Err(StaminaError::OracleInconsistency {
                        state: id,
                        reason: format!("non-positive rate {}", successor.rate),
                    });
                }
                if !seen_targets.insert(successor.state.clone()) {
                    return Err(StaminaError::OracleInconsistency {
                        state: id,
                        reason: "model was not deterministic: duplicate successor".to_string(),
                    });
                }
            }

            for successor in &expansion.successors {
                let (succ_id, is_new_state) = self.index.find_or_add(successor.state.clone());
                if is_new_state {
                    self.table
                        .insert_if_absent(ProbabilityState::discovered(succ_id));
                }

                let contribution = if pred_pi > 0.0 {
                    pred_pi * (successor.rate / total_rate)
                } else {
                    0.0
                };
                if pred_pi > 0.0 {
                    if let Some(m) = self.table.get_mut(succ_id) {
                        m.pi += contribution;
                    }
                }

                let already_preterminated = self.preterminated.contains(succ_id);
                if already_preterminated {
                    if let Some(m) = self.table.get_mut(succ_id) {
                        m.deferred_transitions.push(DeferredTransition {
                            from: id,
                            rate: successor.rate,
                        });
                    }
                    if !self.should_preterminate(contribution, explored.max(1)) {
                        self.promote(succ_id, &mut frontier, priority_fn);
                    }
                    continue;
                }

                if is_new_state && self.should_preterminate(contribution, explored.max(1)) {
                    self.preterminated.insert(succ_id, successor.state.clone());
                    if let Some(m) = self.table.get_mut(succ_id) {
                        m.pre_terminated = true;
                        m.deferred_transitions.push(DeferredTransition {
                            from: id,
                            rate: successor.rate,
                        });
                    }
                    continue;
                }

                self.staging.add(id, succ_id, successor.rate);
                if self.enqueued.insert(succ_id) {
                    let prio = priority_fn.priority(&self.table, succ_id, &successor.state);
                    frontier.push(succ_id, successor.state.clone(), prio);
                }
            }

            let meta = self.table.get_mut(id).unwrap();
            meta.terminal = false;
            meta.is_new = false;
            meta.pi = 0.0;
            explored += 1;
            progress.tick(explored);
        }

        Ok(RunOutcome {
            pi_hat: self.table.pi_hat(ABSORBING_ID),
            states_explored: self.table.len(),
        })
    }

    pub fn initial_id(&self) -> StateId {
        self.initial_id
    }

    /// Un-pre-terminates a successor whose accumulated incoming mass now
    /// justifies full exploration: flushes its deferred incoming edges as
    /// real transitions and enqueues it.
    fn promote(
        &mut self,
        succ_id: StateId,
        frontier: &mut PriorityFrontier,
        priority_fn: &dyn StatePriority,
    ) {
        self.preterminated.remove(succ_id);
        let deferred = self
            .table
            .get_mut(succ_id)
            .map(|m| {
                m.pre_terminated = false;
                std::mem::take(&mut m.deferred_transitions)
            })
            .unwrap_or_default();
        for edge in deferred {
            self.staging.add(edge.from, succ_id, edge.rate);
        }
        if self.enqueued.insert(succ_id) {
            if let Some(state) = self.index.state_of(succ_id).cloned() {
                let prio = priority_fn.priority(&self.table, succ_id, &state);
                frontier.push(succ_id, state, prio);
            }
        }
    }
}
