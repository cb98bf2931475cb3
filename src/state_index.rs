//! State Index: the content-addressed table mapping a `CompressedState` to
//! its dense `StateId`, with id 0 reserved for the synthetic absorbing state
//! before any real state is ever registered.

use std::collections::HashMap;

use crate::model::state::{CompressedState, StateId};

pub const ABSORBING_ID: StateId = 0;

pub struct StateIndex {
    forward: HashMap<CompressedState, StateId>,
    reverse: Vec<CompressedState>,
}

impl StateIndex {
    /// Reserves id 0 for `absorbing_state` immediately; `find_or_add` never
    /// returns 0 for any other state.
    pub fn new(absorbing_state: CompressedState) -> Self {
        let mut forward = HashMap::new();
        forward.insert(absorbing_state.clone(), ABSORBING_ID);
        StateIndex {
            forward,
            reverse: vec![absorbing_state],
        }
    }

    /// Returns the id for `state`, assigning a fresh one if this is the
    /// first time it has been seen. The bool is `true` when a new id was
    /// assigned.
    pub fn find_or_add(&mut self, state: CompressedState) -> (StateId, bool) {
        if let Some(&id) = self.forward.get(&state) {
            return (id, false);
        }
        let id = self.reverse.len() as StateId;
        self.forward.insert(state.clone(), id);
        self.reverse.push(state);
        (id, true)
    }

    pub fn get(&self, state: &CompressedState) -> Option<StateId> {
        self.forward.get(state).copied()
    }

    pub fn state_of(&self, id: StateId) -> Option<&CompressedState> {
        self.reverse.get(id as usize)
    }

    pub fn len(&self) -> usize {
        self.reverse.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reverse.is_empty()
    }
}
