//! Property Predicate: the bounded-until property contract, phi1/phi2,
//! consumed by the common expansion step for early termination. The atomic
//! predicates are a small expression tree over `VariableLayout` fields
//! rather than a bespoke bitfield reader, since `CompressedState` is
//! otherwise fully opaque to the core.

use std::sync::Arc;

use crate::model::state::{CompressedState, VariableLayout};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cmp {
    Le,
    Ge,
    Eq,
}

#[derive(Clone, Debug)]
pub enum BoolExpr {
    True,
    False,
    IntCmp(usize, Cmp, i64),
    BoolVar(usize),
    And(Box<BoolExpr>, Box<BoolExpr>),
    Or(Box<BoolExpr>, Box<BoolExpr>),
    Not(Box<BoolExpr>),
}

impl BoolExpr {
    pub fn eval(&self, layout: &VariableLayout, state: &CompressedState) -> bool {
        match self {
            BoolExpr::True => true,
            BoolExpr::False => false,
            BoolExpr::IntCmp(field, cmp, threshold) => {
                let value = layout.get_int(state, *field);
                match cmp {
                    Cmp::Le => value <= *threshold,
                    Cmp::Ge => value >= *threshold,
                    Cmp::Eq => value == *threshold,
                }
            }
            BoolExpr::BoolVar(field) => layout.get_bool(state, *field),
            BoolExpr::And(a, b) => a.eval(layout, state) && b.eval(layout, state),
            BoolExpr::Or(a, b) => a.eval(layout, state) || b.eval(layout, state),
            BoolExpr::Not(a) => !a.eval(layout, state),
        }
    }
}

/// `phi1 U phi2`: while phi1 holds and phi2 hasn't yet, exploration
/// continues; the moment phi1 fails or phi2 holds, the state is absorbed
/// (its future is irrelevant to the property and exploring past it wastes
/// budget). `should_absorb` implements exactly that early-termination rule.
#[derive(Clone)]
pub struct BoundedUntilPredicate {
    pub layout: Arc<VariableLayout>,
    pub phi1: BoolExpr,
    pub phi2: BoolExpr,
}

impl BoundedUntilPredicate {
    pub fn new(layout: Arc<VariableLayout>, phi1: BoolExpr, phi2: BoolExpr) -> Self {
        BoundedUntilPredicate { layout, phi1, phi2 }
    }

    pub fn satisfies_phi1(&self, state: &CompressedState) -> bool {
        self.phi1.eval(&self.layout, state)
    }

    pub fn satisfies_phi2(&self, state: &CompressedState) -> bool {
        self.phi2.eval(&self.layout, state)
    }

    /// True when the state has left the `phi1 U phi2` frontier (either
    /// because phi1 no longer holds, or because phi2 already does) and
    /// should be treated as terminal regardless of kappa.
    pub fn should_absorb(&self, state: &CompressedState) -> bool {
        !self.satisfies_phi1(state) || self.satisfies_phi2(state)
    }
}
