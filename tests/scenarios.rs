//! End-to-end truncation scenarios against small in-memory oracles: a
//! deadlock state, a finite birth chain, a branching chain cut short by a
//! property, and a two-state cycle. These exercise the full pipeline
//! (state index, probability table, staging buffer, absorbing sink) the way
//! unit tests on individual modules can't.

use std::sync::Arc;

use stamina_core::config::{Method, RunOptions};
use stamina_core::coordinator::{IterationCoordinator, TruncationOutcome};
use stamina_core::model::oracle::{Expansion, StateOracle, Successor};
use stamina_core::model::state::{CompressedState, VariableLayout};
use stamina_core::property::{BoolExpr, BoundedUntilPredicate, Cmp};

/// n -> n+1 at rate `rate`, stopping (deadlock) at `max`.
struct BirthChain {
    layout: Arc<VariableLayout>,
    rate: f64,
    max: i64,
}

impl StateOracle for BirthChain {
    fn expand(&self, state: &CompressedState) -> Expansion {
        let field = self.layout.field_id("n").unwrap();
        let n = self.layout.get_int(state, field);
        if n >= self.max {
            return Expansion::default();
        }
        Expansion {
            successors: vec![Successor {
                state: self.layout.pack_ints(&[n + 1]),
                rate: self.rate,
            }],
            state_reward: 0.0,
        }
    }
}

/// n -> n+1 at rate `up`, n -> max(n-1, 0) at rate `down`; never deadlocks.
struct BranchingChain {
    layout: Arc<VariableLayout>,
    up: f64,
    down: f64,
}

impl StateOracle for BranchingChain {
    fn expand(&self, state: &CompressedState) -> Expansion {
        let field = self.layout.field_id("n").unwrap();
        let n = self.layout.get_int(state, field);
        let mut successors = vec![Successor {
            state: self.layout.pack_ints(&[n + 1]),
            rate: self.up,
        }];
        if n > 0 {
            successors.push(Successor {
                state: self.layout.pack_ints(&[n - 1]),
                rate: self.down,
            });
        }
        Expansion {
            successors,
            state_reward: 0.0,
        }
    }
}

/// A <-> B, a two-state cycle.
struct TwoStateCycle {
    layout: Arc<VariableLayout>,
}

impl StateOracle for TwoStateCycle {
    fn expand(&self, state: &CompressedState) -> Expansion {
        let field = self.layout.field_id("which").unwrap();
        let which = self.layout.get_int(state, field);
        let next = 1 - which;
        Expansion {
            successors: vec![Successor {
                state: self.layout.pack_ints(&[next]),
                rate: 1.0,
            }],
            state_reward: 0.0,
        }
    }
}

fn n_layout() -> Arc<VariableLayout> {
    Arc::new(VariableLayout::builder().int_var("n", 16, false).build())
}

#[test]
fn deadlock_initial_state_has_trivial_matrix() {
    let layout = n_layout();
    let oracle = BirthChain {
        layout: layout.clone(),
        rate: 1.0,
        max: 0,
    };
    let coordinator = IterationCoordinator::new(RunOptions::default()).unwrap();
    let absorbing = CompressedState::absorbing_sentinel();
    let initial = layout.pack_ints(&[0]);
    let outcome = coordinator
        .run_iterative(&oracle, absorbing, initial, None)
        .unwrap();
    let result = match outcome {
        TruncationOutcome::Complete(r) => r,
        TruncationOutcome::Partial { result, .. } => result,
    };
    assert_eq!(result.deadlock_states, vec![result.initial_state]);
    assert!((result.matrix.row_sum(result.initial_state) - 1.0).abs() < 1e-9);
}

#[test]
fn iterative_strategy_explores_finite_birth_chain_fully() {
    let layout = n_layout();
    let oracle = BirthChain {
        layout: layout.clone(),
        rate: 2.0,
        max: 4,
    };
    let mut options = RunOptions::default();
    options.kappa = 0.0;
    options.method = Method::Iterative;
    let coordinator = IterationCoordinator::new(options).unwrap();
    let absorbing = CompressedState::absorbing_sentinel();
    let initial = layout.pack_ints(&[0]);
    let outcome = coordinator
        .run_iterative(&oracle, absorbing, initial, None)
        .unwrap();
    let result = match outcome {
        TruncationOutcome::Complete(r) => r,
        TruncationOutcome::Partial { result, .. } => result,
    };
    // states 0..=4 plus the absorbing sink.
    assert_eq!(result.states_explored, 5);
    assert_eq!(result.deadlock_states.len(), 1);
    for state_id in 1..result.states_explored as u32 {
        if result.deadlock_states.contains(&state_id) {
            continue;
        }
        assert!((result.matrix.row_sum(state_id) - 2.0).abs() < 1e-9);
    }
}

#[test]
fn property_predicate_absorbs_before_full_exploration() {
    let layout = n_layout();
    let field = layout.field_id("n").unwrap();
    let oracle = BranchingChain {
        layout: layout.clone(),
        up: 1.0,
        down: 1.0,
    };
    let property = BoundedUntilPredicate::new(
        layout.clone(),
        BoolExpr::True,
        BoolExpr::IntCmp(field, Cmp::Ge, 3),
    );
    let mut options = RunOptions::default();
    options.kappa = 0.0;
    options.max_approx_count = 5;
    let coordinator = IterationCoordinator::new(options).unwrap();
    let absorbing = CompressedState::absorbing_sentinel();
    let initial = layout.pack_ints(&[0]);
    let outcome = coordinator
        .run_iterative(&oracle, absorbing, initial, Some(&property))
        .unwrap();
    let result = outcome.result();
    // states 0,1,2,3 reached; 3 satisfies phi2 and is absorbed without
    // expanding further, so the chain never grows past it.
    assert_eq!(result.states_explored, 4);
}

#[test]
fn two_state_cycle_does_not_loop_forever() {
    let layout = Arc::new(VariableLayout::builder().int_var("which", 2, false).build());
    let oracle = TwoStateCycle {
        layout: layout.clone(),
    };
    let mut options = RunOptions::default();
    options.kappa = 0.0;
    let coordinator = IterationCoordinator::new(options).unwrap();
    let absorbing = CompressedState::absorbing_sentinel();
    let initial = layout.pack_ints(&[0]);
    let outcome = coordinator
        .run_iterative(&oracle, absorbing, initial, None)
        .unwrap();
    let result = outcome.result();
    // states A and B, both fully explored, cycling into each other.
    assert_eq!(result.states_explored, 2);
    assert!((result.matrix.row_sum(result.initial_state) - 1.0).abs() < 1e-9);
}

#[test]
fn priority_strategy_reaches_and_absorbs_into_sink() {
    let layout = n_layout();
    let oracle = BirthChain {
        layout: layout.clone(),
        rate: 1.0,
        max: 20,
    };
    let mut options = RunOptions::default();
    options.method = Method::Priority;
    options.preterminate = false;
    options.prob_win = 0.5;
    options.approx_factor = 1.0;
    let coordinator = IterationCoordinator::new(options).unwrap();
    let absorbing = CompressedState::absorbing_sentinel();
    let initial = layout.pack_ints(&[0]);
    let outcome = coordinator
        .run_priority(&oracle, absorbing, initial, None, None)
        .unwrap();
    let result = outcome.result();
    assert!(result.states_explored >= 1);
    assert!((result.matrix.row_sum(result.initial_state) - 1.0).abs() < 1e-9);
}

#[test]
fn re_exploring_strategy_matches_iterative_on_small_chain() {
    let layout = n_layout();
    let oracle = BirthChain {
        layout: layout.clone(),
        rate: 3.0,
        max: 2,
    };
    let mut options = RunOptions::default();
    options.kappa = 0.0;
    options.method = Method::ReExploring;
    let coordinator = IterationCoordinator::new(options).unwrap();
    let absorbing = CompressedState::absorbing_sentinel();
    let initial = layout.pack_ints(&[0]);
    let outcome = coordinator
        .run_re_exploring(&oracle, absorbing, initial, None)
        .unwrap();
    let result = outcome.result();
    assert_eq!(result.states_explored, 3);
}
