//! Absorbing-Sink Synthesizer: at finalization, redirects every still-
//! terminal, non-deadlock state's unexplored future to the sink, weighted by
//! its true oracle exit rate, and flushes any deferred transitions left
//! behind by pre-terminated states.

use crate::model::oracle::StateOracle;
use crate::model::state::StateId;
use crate::prob_table::ProbabilityTable;
use crate::staging::TransitionStagingBuffer;
use crate::state_index::{StateIndex, ABSORBING_ID};

pub struct AbsorbingSinkSynthesizer;

impl AbsorbingSinkSynthesizer {
    /// Closes the model: self-loops the sink, and for every remaining
    /// terminal state either flushes its deferred incoming transitions (if
    /// it was pre-terminated) or routes its own unexplored exit rate to the
    /// sink (if it was simply never expanded).
    pub fn finalize(
        index: &StateIndex,
        table: &mut ProbabilityTable,
        staging: &mut TransitionStagingBuffer,
        oracle: &dyn StateOracle,
    ) {
        staging.add(ABSORBING_ID, ABSORBING_ID, 1.0);

        let ids: Vec<StateId> = table.iter().map(|(&id, _)| id).collect();
        for id in ids {
            if id == ABSORBING_ID {
                continue;
            }
            let Some(meta) = table.get_mut(id) else {
                continue;
            };
            if meta.deadlock || meta.property_absorbed {
                continue;
            }
            if meta.pre_terminated {
                let deferred = std::mem::take(&mut meta.deferred_transitions);
                for edge in deferred {
                    staging.add(edge.from, ABSORBING_ID, edge.rate);
                }
                meta.pre_terminated = false;
                staging.add(id, id, 1.0);
                continue;
            }
            if meta.terminal {
                let Some(state) = index.state_of(id) else {
                    continue;
                };
                let expansion = oracle.expand(state);
                let rate = expansion.total_rate();
                let residual = if rate > 0.0 { rate } else { 1.0 };
                staging.add(id, ABSORBING_ID, residual);
            }
        }
    }
}
