//! Transition Staging Buffer: accumulates `(from, to, rate)` edges in
//! whatever order the drivers discover them and compacts them into a CSR
//! sparse matrix at finalization. Supports out-of-order insertion,
//! duplicate-edge summation, and `rewrite_target` for redirecting an edge's
//! destination after the fact (used when a pre-terminated successor is later
//! merged into the absorbing sink).

use std::collections::HashMap;

use crate::model::state::StateId;

#[derive(Clone, Copy, Debug)]
pub struct TransitionRecord {
    pub from: StateId,
    pub to: StateId,
    pub rate: f64,
}

/// Row-compressed sparse transition matrix: `row_ptr[i]..row_ptr[i+1]`
/// indexes into `col_idx`/`values` for the outgoing edges of state `i`.
#[derive(Clone, Debug)]
pub struct SparseMatrix {
    pub num_rows: usize,
    pub row_ptr: Vec<usize>,
    pub col_idx: Vec<StateId>,
    pub values: Vec<f64>,
}

impl SparseMatrix {
    pub fn row(&self, state: StateId) -> &[StateId] {
        let i = state as usize;
        &self.col_idx[self.row_ptr[i]..self.row_ptr[i + 1]]
    }

    pub fn row_values(&self, state: StateId) -> &[f64] {
        let i = state as usize;
        &self.values[self.row_ptr[i]..self.row_ptr[i + 1]]
    }

    pub fn row_sum(&self, state: StateId) -> f64 {
        self.row_values(state).iter().sum()
    }
}

#[derive(Default)]
pub struct TransitionStagingBuffer {
    dedup: HashMap<(StateId, StateId), usize>,
    records: Vec<TransitionRecord>,
}

impl TransitionStagingBuffer {
    pub fn new() -> Self {
        TransitionStagingBuffer {
            dedup: HashMap::new(),
            records: Vec::new(),
        }
    }

    /// Adds `rate` to the `(from, to)` edge, summing with any existing edge
    /// between the same pair.
    pub fn add(&mut self, from: StateId, to: StateId, rate: f64) {
        if let Some(&idx) = self.dedup.get(&(from, to)) {
            self.records[idx].rate += rate;
        } else {
            let idx = self.records.len();
            self.records.push(TransitionRecord { from, to, rate });
            self.dedup.insert((from, to), idx);
        }
    }

    /// Redirects every staged edge `from -> old_to` to `from -> new_to`,
    /// merging into an existing `(from, new_to)` edge if one is already
    /// present.
    pub fn rewrite_target(&mut self, from: StateId, old_to: StateId, new_to: StateId) {
        let Some(idx) = self.dedup.remove(&(from, old_to)) else {
            return;
        };
        let rate = self.records[idx].rate;
        self.records[idx].rate = 0.0;
        self.add(from, new_to, rate);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Compacts staged edges into row-sorted CSR form over `num_rows` rows
    /// (the absorbing state plus every discovered state). Zero-rate records
    /// left behind by `rewrite_target` are dropped.
    pub fn finalize(self, num_rows: usize) -> SparseMatrix {
        let mut rows: Vec<Vec<(StateId, f64)>> = vec![Vec::new(); num_rows];
        for record in self.records {
            if record.rate == 0.0 {
                continue;
            }
            rows[record.from as usize].push((record.to, record.rate));
        }
        let mut row_ptr = Vec::with_capacity(num_rows + 1);
        let mut col_idx = Vec::new();
        let mut values = Vec::new();
        row_ptr.push(0);
        for mut row in rows {
            row.sort_by_key(|(to, _)| *to);
            for (to, rate) in row {
                col_idx.push(to);
                values.push(rate);
            }
            row_ptr.push(col_idx.len());
        }
        SparseMatrix {
            num_rows,
            row_ptr,
            col_idx,
            values,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_edges_sum() {
        let mut buf = TransitionStagingBuffer::new();
        buf.add(1, 2, 0.4);
        buf.add(1, 2, 0.6);
        let matrix = buf.finalize(3);
        assert_eq!(matrix.row(1), &[2]);
        assert!((matrix.row_sum(1) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn rewrite_target_merges_into_existing_edge() {
        let mut buf = TransitionStagingBuffer::new();
        buf.add(1, 5, 0.3);
        buf.add(1, 0, 0.2);
        buf.rewrite_target(1, 5, 0);
        let matrix = buf.finalize(6);
        assert_eq!(matrix.row(1), &[0]);
        assert!((matrix.row_sum(1) - 0.5).abs() < 1e-12);
    }
}
