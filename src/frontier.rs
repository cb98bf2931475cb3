//! Exploration Frontier: the queue of discovered-but-not-yet-expanded
//! states. The iterative and re-exploring strategies use plain FIFO order;
//! the priority strategy orders by `State Priority` via a binary heap.

use std::collections::VecDeque;

use ordered_float::OrderedFloat;
use priority_queue::PriorityQueue;

use crate::model::state::{CompressedState, StateId};

pub trait Frontier {
    fn push(&mut self, id: StateId, state: CompressedState, priority: f64);
    fn pop(&mut self) -> Option<(StateId, CompressedState)>;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Default)]
pub struct FifoFrontier {
    queue: VecDeque<(StateId, CompressedState)>,
}

impl FifoFrontier {
    pub fn new() -> Self {
        FifoFrontier {
            queue: VecDeque::new(),
        }
    }
}

impl Frontier for FifoFrontier {
    fn push(&mut self, id: StateId, state: CompressedState, _priority: f64) {
        self.queue.push_back((id, state));
    }

    fn pop(&mut self) -> Option<(StateId, CompressedState)> {
        self.queue.pop_front()
    }

    fn len(&self) -> usize {
        self.queue.len()
    }
}

#[derive(Default)]
pub struct PriorityFrontier {
    queue: PriorityQueue<(StateId, CompressedState), OrderedFloat<f64>>,
}

impl PriorityFrontier {
    pub fn new() -> Self {
        PriorityFrontier {
            queue: PriorityQueue::new(),
        }
    }

    /// Re-scores an already-queued item in place, used when a state's
    /// priority changes (e.g. pi was updated) before it is dequeued.
    pub fn change_priority(&mut self, id: StateId, state: &CompressedState, priority: f64) {
        self.queue
            .change_priority(&(id, state.clone()), OrderedFloat(priority));
    }
}

impl Frontier for PriorityFrontier {
    fn push(&mut self, id: StateId, state: CompressedState, priority: f64) {
        self.queue.push((id, state), OrderedFloat(priority));
    }

    fn pop(&mut self) -> Option<(StateId, CompressedState)> {
        self.queue.pop().map(|(item, _)| item)
    }

    fn len(&self) -> usize {
        self.queue.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_preserves_insertion_order() {
        let mut f = FifoFrontier::new();
        f.push(1, CompressedState::zeros(8), 0.0);
        f.push(2, CompressedState::from_words(vec![1]), 0.0);
        assert_eq!(f.pop().unwrap().0, 1);
        assert_eq!(f.pop().unwrap().0, 2);
    }

    #[test]
    fn priority_frontier_pops_highest_first() {
        let mut f = PriorityFrontier::new();
        f.push(1, CompressedState::zeros(8), 0.1);
        f.push(2, CompressedState::from_words(vec![1]), 0.9);
        assert_eq!(f.pop().unwrap().0, 2);
        assert_eq!(f.pop().unwrap().0, 1);
    }
}
