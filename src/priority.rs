//! State Priority: orders the frontier in the priority strategy. Plain
//! `PiPriority` ranks purely by reachability-probability estimate; when a
//! rare or common event is named on the CLI, `EventStatePriority` biases the
//! ranking by distance to that event's threshold, mirroring
//! `EventStatePriority.h`'s `PriorityTree`.

use std::collections::HashMap;
use std::sync::Arc;

use crate::model::state::{CompressedState, StateId, VariableLayout};
use crate::prob_table::ProbabilityTable;

#[derive(Clone, Debug)]
pub enum DistanceExpr {
    IntVar(usize),
    Const(f64),
    LessThanEq(Box<DistanceExpr>, f64),
    GreaterThanEq(Box<DistanceExpr>, f64),
    Equal(Box<DistanceExpr>, f64),
    And(Box<DistanceExpr>, Box<DistanceExpr>),
    Or(Box<DistanceExpr>, Box<DistanceExpr>),
    Not(Box<DistanceExpr>),
}

impl DistanceExpr {
    /// Distance-to-threshold scalar: positive means comfortably satisfied,
    /// negative means comfortably violated, near zero means close to the
    /// event boundary. `And`/`Or` take the min/max of their operands the
    /// same way the original `PriorityTree::accumulate` combined child
    /// distances.
    pub fn accumulate(&self, layout: &VariableLayout, state: &CompressedState) -> f64 {
        match self {
            DistanceExpr::IntVar(field) => layout.get_int(state, *field) as f64,
            DistanceExpr::Const(c) => *c,
            DistanceExpr::LessThanEq(inner, threshold) => {
                threshold - inner.accumulate(layout, state)
            }
            DistanceExpr::GreaterThanEq(inner, threshold) => {
                inner.accumulate(layout, state) - threshold
            }
            DistanceExpr::Equal(inner, threshold) => {
                -((inner.accumulate(layout, state) - threshold).abs())
            }
            DistanceExpr::And(a, b) => a
                .accumulate(layout, state)
                .min(b.accumulate(layout, state)),
            DistanceExpr::Or(a, b) => a
                .accumulate(layout, state)
                .max(b.accumulate(layout, state)),
            DistanceExpr::Not(a) => -a.accumulate(layout, state),
        }
    }
}

pub trait StatePriority {
    fn priority(&self, table: &ProbabilityTable, id: StateId, state: &CompressedState) -> f64;
}

/// Priority reduces to pi alone: the default when no rare/common event is
/// named.
pub struct PiPriority;

impl StatePriority for PiPriority {
    fn priority(&self, table: &ProbabilityTable, id: StateId, _state: &CompressedState) -> f64 {
        table.get(id).map(|s| s.pi).unwrap_or(0.0)
    }
}

/// Biases ranking by distance to a named event's threshold. `rare_event`
/// true ranks states closer to the event higher (explore toward it first);
/// false inverts the sign, ranking states further from the event higher.
pub struct EventStatePriority {
    pub layout: Arc<VariableLayout>,
    pub tree: DistanceExpr,
    pub rare_event: bool,
}

impl StatePriority for EventStatePriority {
    fn priority(&self, _table: &ProbabilityTable, _id: StateId, state: &CompressedState) -> f64 {
        let distance = self.tree.accumulate(&self.layout, state);
        if self.rare_event {
            -distance
        } else {
            distance
        }
    }
}

/// Side index over pre-terminated states, mirroring the original's
/// `preTerminatedStates` hash map: lets the priority driver iterate "every
/// currently pre-terminated state" cheaply at pass finalization without
/// scanning the whole probability table.
#[derive(Default)]
pub struct PreterminatedSet {
    ids: HashMap<StateId, CompressedState>,
}

impl PreterminatedSet {
    pub fn new() -> Self {
        PreterminatedSet {
            ids: HashMap::new(),
        }
    }

    pub fn insert(&mut self, id: StateId, state: CompressedState) {
        self.ids.insert(id, state);
    }

    pub fn remove(&mut self, id: StateId) -> Option<CompressedState> {
        self.ids.remove(&id)
    }

    pub fn contains(&self, id: StateId) -> bool {
        self.ids.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&StateId, &CompressedState)> {
        self.ids.iter()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rare_event_prefers_small_distance() {
        let layout = Arc::new(VariableLayout::builder().int_var("n", 8, false).build());
        let field = layout.field_id("n").unwrap();
        let near = layout.pack_ints(&[9]);
        let far = layout.pack_ints(&[1]);
        let esp = EventStatePriority {
            layout: layout.clone(),
            tree: DistanceExpr::GreaterThanEq(Box::new(DistanceExpr::IntVar(field)), 10.0),
            rare_event: true,
        };
        let table = ProbabilityTable::new();
        assert!(esp.priority(&table, 0, &near) > esp.priority(&table, 0, &far));
    }
}
