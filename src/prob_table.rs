//! Probability Metadata Table: one `ProbabilityState` record per discovered
//! state, tracking the reachability-probability estimate pi and the
//! bookkeeping flags the truncation drivers need across passes.

use std::collections::HashMap;

use crate::model::state::StateId;

/// A deferred outgoing edge recorded against a pre-terminated predecessor in
/// the priority strategy, replayed or redirected to the sink when the
/// predecessor is un-pre-terminated or finalized.
#[derive(Clone, Copy, Debug)]
pub struct DeferredTransition {
    pub from: StateId,
    pub rate: f64,
}

#[derive(Clone, Debug)]
pub struct ProbabilityState {
    pub id: StateId,
    /// Reachability-probability estimate accumulated so far.
    pub pi: f64,
    /// True while this state has not yet been expanded in the current pass.
    pub terminal: bool,
    /// True forever once the oracle reports this state has no successors.
    pub deadlock: bool,
    /// True forever once the property predicate absorbs this state: it got
    /// a unit self-loop instead of being expanded, and must never be routed
    /// to the sink at finalization.
    pub property_absorbed: bool,
    /// True while this state is withheld from expansion by the priority
    /// strategy's pre-termination rule.
    pub pre_terminated: bool,
    /// Transitions into this state recorded while it was pre-terminated,
    /// replayed on un-pre-termination or redirected to the sink at
    /// finalization.
    pub deferred_transitions: Vec<DeferredTransition>,
    /// True until this state's own outgoing transitions have been written
    /// to the staging buffer for the first time.
    pub is_new: bool,
    /// The iteration (pass) index in which this state was last enqueued,
    /// used to avoid double-enqueueing within a pass.
    pub iteration_last_seen: u64,
}

impl ProbabilityState {
    /// The record for the initial state: certain to be occupied, expanded
    /// for the first time.
    pub fn initial(id: StateId) -> Self {
        ProbabilityState {
            id,
            pi: 1.0,
            terminal: true,
            deadlock: false,
            property_absorbed: false,
            pre_terminated: false,
            deferred_transitions: Vec::new(),
            is_new: true,
            iteration_last_seen: 0,
        }
    }

    /// The record for a state discovered as someone else's successor: not
    /// yet assigned any probability mass of its own.
    pub fn discovered(id: StateId) -> Self {
        ProbabilityState {
            id,
            pi: 0.0,
            terminal: true,
            deadlock: false,
            property_absorbed: false,
            pre_terminated: false,
            deferred_transitions: Vec::new(),
            is_new: true,
            iteration_last_seen: 0,
        }
    }
}

#[derive(Default)]
pub struct ProbabilityTable {
    states: HashMap<StateId, ProbabilityState>,
}

impl ProbabilityTable {
    pub fn new() -> Self {
        ProbabilityTable {
            states: HashMap::new(),
        }
    }

    pub fn insert_if_absent(&mut self, state: ProbabilityState) {
        self.states.entry(state.id).or_insert(state);
    }

    pub fn get(&self, id: StateId) -> Option<&ProbabilityState> {
        self.states.get(&id)
    }

    pub fn get_mut(&mut self, id: StateId) -> Option<&mut ProbabilityState> {
        self.states.get_mut(&id)
    }

    pub fn contains(&self, id: StateId) -> bool {
        self.states.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&StateId, &ProbabilityState)> {
        self.states.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&StateId, &mut ProbabilityState)> {
        self.states.iter_mut()
    }

    /// Sum of pi across every state still marked terminal, excluding the
    /// absorbing sink: the pi_hat escape-mass estimate at a pass boundary.
    pub fn pi_hat(&self, absorbing_id: StateId) -> f64 {
        self.states
            .values()
            .filter(|s| s.terminal && s.id != absorbing_id && !s.deadlock && !s.property_absorbed)
            .map(|s| s.pi)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pi_hat_sums_terminal_states_only() {
        let mut table = ProbabilityTable::new();
        let mut s1 = ProbabilityState::discovered(1);
        s1.pi = 0.2;
        let mut s2 = ProbabilityState::discovered(2);
        s2.pi = 0.3;
        s2.terminal = false;
        table.insert_if_absent(s1);
        table.insert_if_absent(s2);
        assert!((table.pi_hat(0) - 0.2).abs() < 1e-12);
    }
}
