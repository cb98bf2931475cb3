//! Threaded variant (spec §5): partitions each round of the iterative
//! strategy's frontier across `rayon` worker threads. The state index is
//! shared behind one `RwLock` (content-addressing is inherently global);
//! the probability table is sharded by `id % num_shards`, one `RwLock` per
//! shard, so workers touching disjoint shards don't contend. A worker that
//! touches more than one shard in a single expansion (its own plus each
//! newly discovered successor's) locks them in ascending shard order, which
//! is enough to avoid deadlock without a bespoke mutex type, unlike
//! `StaminaThreadedIterativeModelBuilder.cpp`'s `ModelBuilderMutex`.

use std::collections::BTreeSet;
use std::sync::RwLock;

use rayon::prelude::*;

use crate::error::StaminaError;
use crate::frontier::{FifoFrontier, Frontier};
use crate::model::oracle::StateOracle;
use crate::model::state::{CompressedState, StateId};
use crate::prob_table::{ProbabilityState, ProbabilityTable};
use crate::property::BoundedUntilPredicate;
use crate::staging::TransitionStagingBuffer;
use crate::state_index::StateIndex;

pub struct ThreadedDriver {
    index: RwLock<StateIndex>,
    shards: Vec<RwLock<ProbabilityTable>>,
    staging: RwLock<TransitionStagingBuffer>,
    num_shards: usize,
    initial_id: StateId,
}

impl ThreadedDriver {
    pub fn new(
        absorbing_state: CompressedState,
        initial_state: CompressedState,
        num_shards: usize,
    ) -> Self {
        let num_shards = num_shards.max(1);
        let mut index = StateIndex::new(absorbing_state);
        let (initial_id, _) = index.find_or_add(initial_state);
        let mut shards = Vec::with_capacity(num_shards);
        for _ in 0..num_shards {
            shards.push(RwLock::new(ProbabilityTable::new()));
        }
        shards[Self::shard_of(initial_id, num_shards)]
            .write()
            .unwrap()
            .insert_if_absent(ProbabilityState::initial(initial_id));
        ThreadedDriver {
            index: RwLock::new(index),
            shards,
            staging: RwLock::new(TransitionStagingBuffer::new()),
            num_shards,
            initial_id,
        }
    }

    fn shard_of(id: StateId, num_shards: usize) -> usize {
        (id as usize) % num_shards
    }

    fn pi_of(&self, id: StateId) -> Option<f64> {
        self.shards[Self::shard_of(id, self.num_shards)]
            .read()
            .unwrap()
            .get(id)
            .map(|s| s.pi)
    }

    /// Runs rounds of the iterative strategy until the frontier empties.
    /// Each round drains the current frontier in parallel and collects the
    /// next round's frontier from every worker's local discoveries.
    pub fn run_pass(
        &self,
        kappa: f64,
        oracle: &(dyn StateOracle + Sync),
        property: Option<&BoundedUntilPredicate>,
    ) -> Result<f64, StaminaError> {
        let mut current: Vec<(StateId, CompressedState)> = Vec::new();
        {
            let index = self.index.read().unwrap();
            for shard in &self.shards {
                for (&id, meta) in shard.read().unwrap().iter() {
                    if meta.terminal && !meta.deadlock && !meta.property_absorbed {
                        if let Some(state) = index.state_of(id) {
                            current.push((id, state.clone()));
                        }
                    }
                }
            }
        }

        while !current.is_empty() {
            let results: Vec<Result<Vec<(StateId, CompressedState)>, StaminaError>> = current
                .par_iter()
                .map(|(id, state)| self.expand_one(*id, state, kappa, oracle, property))
                .collect();

            let mut next = Vec::new();
            for r in results {
                next.extend(r?);
            }
            current = next;
        }

        let mut pi_hat = 0.0;
        for shard in &self.shards {
            pi_hat += shard.read().unwrap().pi_hat(0);
        }
        Ok(pi_hat)
    }

    fn expand_one(
        &self,
        id: StateId,
        state: &CompressedState,
        kappa: f64,
        oracle: &(dyn StateOracle + Sync),
        property: Option<&BoundedUntilPredicate>,
    ) -> Result<Vec<(StateId, CompressedState)>, StaminaError> {
        let pi = self.pi_of(id).unwrap_or(0.0);
        if pi < kappa {
            return Ok(Vec::new());
        }

        if let Some(pred) = property {
            if pred.should_absorb(state) {
                let mut shard = self.shards[Self::shard_of(id, self.num_shards)].write().unwrap();
                let meta = shard.get_mut(id).ok_or_else(|| StaminaError::InternalInvariant {
                    reason: format!("state {id} missing from table mid-pass"),
                })?;
                meta.property_absorbed = true;
                if meta.is_new {
                    self.staging.write().unwrap().add(id, id, 1.0);
                    meta.is_new = false;
                }
                return Ok(Vec::new());
            }
        }

        let expansion = oracle.expand(state);

        let mut index = self.index.write().unwrap();
        let mut staging = self.staging.write().unwrap();

        if expansion.is_deadlock() {
            let mut shard = self.shards[Self::shard_of(id, self.num_shards)].write().unwrap();
            let meta = shard.get_mut(id).ok_or_else(|| StaminaError::InternalInvariant {
                reason: format!("state {id} missing from table mid-pass"),
            })?;
            meta.deadlock = true;
            meta.terminal = true;
            if meta.is_new {
                staging.add(id, id, 1.0);
                meta.is_new = false;
            }
            return Ok(Vec::new());
        }

        let total_rate = expansion.total_rate();
        let mut resolved: Vec<(StateId, bool, CompressedState, f64)> = Vec::new();
        let mut seen = std::collections::HashSet::new();
        for successor in &expansion.successors {
            if successor.rate <= 0.0 {
                return Err(StaminaError::OracleInconsistency {
                    state: id,
                    reason: format!("non-positive rate {}", successor.rate),
                });
            }
            if !seen.insert(successor.state.clone()) {
                return Err(StaminaError::OracleInconsistency {
                    state: id,
                    reason: "model was not deterministic: duplicate successor".to_string(),
                });
            }
            let (succ_id, is_new) = index.find_or_add(successor.state.clone());
            resolved.push((succ_id, is_new, successor.state.clone(), successor.rate));
        }
        drop(index);

        let mut touched: BTreeSet<usize> = resolved
            .iter()
            .map(|(succ_id, ..)| Self::shard_of(*succ_id, self.num_shards))
            .collect();
        touched.insert(Self::shard_of(id, self.num_shards));

        let mut guards = Vec::new();
        for shard_idx in &touched {
            guards.push((*shard_idx, self.shards[*shard_idx].write().unwrap()));
        }
        fn locate<'a, 'b>(
            guards: &'a mut Vec<(usize, std::sync::RwLockWriteGuard<'b, ProbabilityTable>)>,
            idx: usize,
        ) -> &'a mut std::sync::RwLockWriteGuard<'b, ProbabilityTable> {
            guards.iter_mut().find(|(i, _)| *i == idx).map(|(_, g)| g).unwrap()
        }

        let pred_is_new = {
            let pred_shard = Self::shard_of(id, self.num_shards);
            locate(&mut guards, pred_shard)
                .get(id)
                .map(|m| m.is_new)
                .unwrap_or(false)
        };

        let mut discovered = Vec::new();
        for (succ_id, is_new, succ_state, rate) in &resolved {
            let shard_idx = Self::shard_of(*succ_id, self.num_shards);
            let guard = locate(&mut guards, shard_idx);
            if *is_new {
                guard.insert_if_absent(ProbabilityState::discovered(*succ_id));
                discovered.push((*succ_id, succ_state.clone()));
            }
            if pi > 0.0 {
                if let Some(m) = guard.get_mut(*succ_id) {
                    m.pi += pi * (rate / total_rate);
                }
            }
            if pred_is_new {
                staging.add(id, *succ_id, *rate);
            }
        }

        let pred_shard = Self::shard_of(id, self.num_shards);
        let pred_meta = locate(&mut guards, pred_shard)
            .get_mut(id)
            .ok_or_else(|| StaminaError::InternalInvariant {
                reason: format!("state {id} missing from table mid-pass"),
            })?;
        pred_meta.terminal = false;
        pred_meta.is_new = false;
        pred_meta.pi = 0.0;

        Ok(discovered)
    }

    pub fn into_parts(self) -> (StateIndex, ProbabilityTable, TransitionStagingBuffer) {
        let index = self.index.into_inner().unwrap();
        let staging = self.staging.into_inner().unwrap();
        let mut table = ProbabilityTable::new();
        for shard in self.shards {
            let shard = shard.into_inner().unwrap();
            for (_, state) in shard.iter() {
                table.insert_if_absent(state.clone());
            }
        }
        (index, table, staging)
    }

    pub fn initial_id(&self) -> StateId {
        self.initial_id
    }
}
