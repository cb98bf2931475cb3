//! The handful of properties any truncation, under any strategy, must
//! satisfy: well-formed rows, idempotent state identity, the absorbing
//! sink's self-loop, oracle contract enforcement, and pi_hat tracking the
//! true escape mass correctly.

use std::sync::Arc;

use stamina_core::config::RunOptions;
use stamina_core::coordinator::IterationCoordinator;
use stamina_core::model::oracle::{Expansion, StateOracle, Successor};
use stamina_core::model::state::{CompressedState, VariableLayout};
use stamina_core::property::{BoolExpr, BoundedUntilPredicate, Cmp};
use stamina_core::state_index::{StateIndex, ABSORBING_ID};
use stamina_core::StaminaError;

fn layout() -> Arc<VariableLayout> {
    Arc::new(VariableLayout::builder().int_var("n", 16, false).build())
}

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

#[test]
fn every_row_sums_to_its_true_exit_rate_or_one_for_the_sink() {
    let layout = layout();
    let oracle = BirthChain {
        layout: layout.clone(),
        rate: 1.5,
        max: 3,
    };
    let mut options = RunOptions::default();
    options.kappa = 0.0;
    let coordinator = IterationCoordinator::new(options).unwrap();
    let outcome = coordinator
        .run_iterative(
            &oracle,
            CompressedState::absorbing_sentinel(),
            layout.pack_ints(&[0]),
            None,
        )
        .unwrap();
    let result = outcome.result();
    assert!((result.matrix.row_sum(ABSORBING_ID) - 1.0).abs() < 1e-9);
    for id in 1..=result.states_explored as u32 {
        if result.deadlock_states.contains(&id) {
            assert!((result.matrix.row_sum(id) - 1.0).abs() < 1e-9);
        } else {
            assert!((result.matrix.row_sum(id) - 1.5).abs() < 1e-9);
        }
    }
}

#[test]
fn state_index_is_idempotent_under_repeated_discovery() {
    let sink = CompressedState::absorbing_sentinel();
    let mut index = StateIndex::new(sink);
    let layout = layout();
    let s = layout.pack_ints(&[7]);
    let (id_a, fresh_a) = index.find_or_add(s.clone());
    let (id_b, fresh_b) = index.find_or_add(s);
    assert_eq!(id_a, id_b);
    assert!(fresh_a && !fresh_b);
}

#[test]
fn absorbing_state_is_always_a_self_loop_of_rate_one() {
    let layout = layout();
    let oracle = BirthChain {
        layout: layout.clone(),
        rate: 4.0,
        max: 1,
    };
    let coordinator = IterationCoordinator::new(RunOptions::default()).unwrap();
    let outcome = coordinator
        .run_iterative(
            &oracle,
            CompressedState::absorbing_sentinel(),
            layout.pack_ints(&[0]),
            None,
        )
        .unwrap();
    let result = outcome.result();
    assert_eq!(result.matrix.row(ABSORBING_ID), &[ABSORBING_ID]);
    assert!((result.matrix.row_values(ABSORBING_ID)[0] - 1.0).abs() < 1e-9);
}

struct NondeterministicOracle {
    layout: Arc<VariableLayout>,
}

impl StateOracle for NondeterministicOracle {
    fn expand(&self, state: &CompressedState) -> Expansion {
        // Two "choices" landing on the same successor: a contract
        // violation the common expansion step must reject.
        Expansion {
            successors: vec![
                Successor {
                    state: state.clone(),
                    rate: 1.0,
                },
                Successor {
                    state: state.clone(),
                    rate: 2.0,
                },
            ],
            state_reward: 0.0,
        }
    }
}

#[test]
fn duplicate_successor_is_rejected_as_oracle_inconsistency() {
    let layout = layout();
    let oracle = NondeterministicOracle {
        layout: layout.clone(),
    };
    let coordinator = IterationCoordinator::new(RunOptions::default()).unwrap();
    let err = coordinator
        .run_iterative(
            &oracle,
            CompressedState::absorbing_sentinel(),
            layout.pack_ints(&[0]),
            None,
        )
        .unwrap_err();
    assert!(matches!(err, StaminaError::OracleInconsistency { .. }));
}

struct NegativeRateOracle;

impl StateOracle for NegativeRateOracle {
    fn expand(&self, state: &CompressedState) -> Expansion {
        Expansion {
            successors: vec![Successor {
                state: CompressedState::from_words(vec![state.words().first().copied().unwrap_or(0) + 1]),
                rate: -1.0,
            }],
            state_reward: 0.0,
        }
    }
}

#[test]
fn non_positive_rate_is_rejected_as_oracle_inconsistency() {
    let coordinator = IterationCoordinator::new(RunOptions::default()).unwrap();
    let err = coordinator
        .run_iterative(
            &NegativeRateOracle,
            CompressedState::absorbing_sentinel(),
            CompressedState::from_words(vec![0]),
            None,
        )
        .unwrap_err();
    assert!(matches!(err, StaminaError::OracleInconsistency { .. }));
}

#[test]
fn property_absorbed_state_gets_a_unit_self_loop_not_a_sink_edge() {
    let layout = layout();
    let field = layout.field_id("n").unwrap();
    let oracle = BirthChain {
        layout: layout.clone(),
        rate: 3.0,
        max: 100,
    };
    let property = BoundedUntilPredicate::new(
        layout.clone(),
        BoolExpr::True,
        BoolExpr::IntCmp(field, Cmp::Ge, 2),
    );
    let mut options = RunOptions::default();
    options.kappa = 0.0;
    let coordinator = IterationCoordinator::new(options).unwrap();
    let outcome = coordinator
        .run_iterative(
            &oracle,
            CompressedState::absorbing_sentinel(),
            layout.pack_ints(&[0]),
            Some(&property),
        )
        .unwrap();
    let result = outcome.result();
    // n=2 satisfies phi2 and is absorbed: exactly one outgoing edge, a
    // self-loop of rate 1, never a sink edge. Discovery order is 0,1,2, so
    // the absorbed state is the last one discovered.
    let absorbed_id = result.states_explored as u32 - 1;
    assert_eq!(result.matrix.row(absorbed_id), &[absorbed_id]);
    assert!((result.matrix.row_values(absorbed_id)[0] - 1.0).abs() < 1e-9);
    assert_eq!(result.matrix.row(ABSORBING_ID), &[ABSORBING_ID]);
}

#[test]
fn expanding_a_state_resets_its_pi_to_zero() {
    let layout = layout();
    let oracle = BirthChain {
        layout: layout.clone(),
        rate: 1.0,
        max: 1,
    };
    let mut index = StateIndex::new(CompressedState::absorbing_sentinel());
    let (id, _) = index.find_or_add(layout.pack_ints(&[0]));
    let mut table = stamina_core::prob_table::ProbabilityTable::new();
    table.insert_if_absent(stamina_core::prob_table::ProbabilityState::initial(id));
    let mut staging = stamina_core::staging::TransitionStagingBuffer::new();
    let mut frontier = stamina_core::frontier::FifoFrontier::new();
    let priority_fn = stamina_core::priority::PiPriority;
    let state = index.state_of(id).unwrap().clone();
    stamina_core::driver::expand_common(
        &mut index,
        &mut table,
        &mut staging,
        &oracle,
        None,
        &mut frontier,
        &priority_fn,
        1,
        id,
        &state,
    )
    .unwrap();
    assert_eq!(table.get(id).unwrap().pi, 0.0);
}

#[test]
fn zero_refinement_budget_is_rejected_before_any_exploration() {
    let mut options = RunOptions::default();
    options.max_approx_count = 0;
    let coordinator = IterationCoordinator::new(options).unwrap();
    let layout = layout();
    let oracle = BirthChain {
        layout: layout.clone(),
        rate: 1.0,
        max: 1,
    };
    let err = coordinator
        .run_iterative(
            &oracle,
            CompressedState::absorbing_sentinel(),
            layout.pack_ints(&[0]),
            None,
        )
        .unwrap_err();
    assert!(matches!(err, StaminaError::BudgetExceeded { .. }));
}
