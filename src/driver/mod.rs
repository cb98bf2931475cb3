//! Truncation Driver: the common single-state expansion step (spec §4.4),
//! shared by the iterative and re-exploring strategies. The priority
//! strategy (`driver::priority`) has enough extra bookkeeping
//! (pre-termination, windowPower) that it reimplements this step directly
//! rather than reusing it.

pub mod iterative;
pub mod priority;
pub mod progress;
pub mod reexploring;

use crate::error::StaminaError;
use crate::frontier::Frontier;
use crate::model::oracle::StateOracle;
use crate::model::state::{CompressedState, StateId};
use crate::priority::StatePriority;
use crate::prob_table::{ProbabilityState, ProbabilityTable};
use crate::property::BoundedUntilPredicate;
use crate::staging::TransitionStagingBuffer;
use crate::state_index::{StateIndex, ABSORBING_ID};

pub enum ExpandOutcome {
    /// Absorbed by the property predicate or never queried: the oracle was
    /// not called, `state` stays terminal.
    PropertyAbsorbed,
    /// The oracle reported no successors: a genuine model deadlock.
    Deadlock,
    /// Expanded normally; `discovered` is how many brand new states were
    /// found among its successors.
    Expanded { discovered: u32 },
}

/// Runs spec §4.4's common expansion step against a single dequeued state.
/// Callers are responsible for the kappa/terminal skip check before calling
/// this (both strategies that share it apply that check identically).
#[allow(clippy::too_many_arguments)]
pub fn expand_common(
    index: &mut StateIndex,
    table: &mut ProbabilityTable,
    staging: &mut TransitionStagingBuffer,
    oracle: &dyn StateOracle,
    property: Option<&BoundedUntilPredicate>,
    frontier: &mut dyn Frontier,
    priority_fn: &dyn StatePriority,
    iteration: u64,
    id: StateId,
    state: &CompressedState,
) -> Result<ExpandOutcome, StaminaError> {
    if id == ABSORBING_ID {
        return Err(StaminaError::InternalInvariant {
            reason: "attempted to expand the absorbing state".to_string(),
        });
    }

    let (pred_pi, pred_is_new) = {
        let meta = table.get(id).ok_or_else(|| StaminaError::InternalInvariant {
            reason: format!("state {id} missing from probability table at expansion"),
        })?;
        (meta.pi, meta.is_new)
    };

    if let Some(pred) = property {
        if pred.should_absorb(state) {
            let meta = table.get_mut(id).unwrap();
            meta.property_absorbed = true;
            if pred_is_new {
                staging.add(id, id, 1.0);
                meta.is_new = false;
            }
            return Ok(ExpandOutcome::PropertyAbsorbed);
        }
    }

    let expansion = oracle.expand(state);

    if expansion.is_deadlock() {
        let meta = table.get_mut(id).unwrap();
        meta.deadlock = true;
        meta.terminal = true;
        if pred_is_new {
            staging.add(id, id, 1.0);
            meta.is_new = false;
        }
        return Ok(ExpandOutcome::Deadlock);
    }

    let total_rate = expansion.total_rate();
    let mut seen_targets = std::collections::HashSet::new();
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

    let mut discovered = 0u32;
    for successor in &expansion.successors {
        let (succ_id, is_new_state) = index.find_or_add(successor.state.clone());
        if is_new_state {
            table.insert_if_absent(ProbabilityState::discovered(succ_id));
            discovered += 1;
        }

        let enqueue_all = pred_pi == 0.0;
        if !enqueue_all {
            if let Some(succ_meta) = table.get_mut(succ_id) {
                succ_meta.pi += pred_pi * (successor.rate / total_rate);
            }
        }

        let should_push = table
            .get(succ_id)
            .map(|m| m.iteration_last_seen != iteration)
            .unwrap_or(false);
        if should_push {
            if let Some(succ_meta) = table.get_mut(succ_id) {
                succ_meta.iteration_last_seen = iteration;
            }
            let prio = priority_fn.priority(table, succ_id, &successor.state);
            frontier.push(succ_id, successor.state.clone(), prio);
        }

        if pred_is_new {
            staging.add(id, succ_id, successor.rate);
        }
    }

    let meta = table.get_mut(id).unwrap();
    meta.terminal = false;
    meta.is_new = false;
    meta.pi = 0.0;

    Ok(ExpandOutcome::Expanded { discovered })
}
