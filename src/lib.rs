#![allow(dead_code)]

pub mod absorb;
pub mod config;
pub mod coordinator;
pub mod driver;
pub mod error;
pub mod frontier;
pub mod logging;
pub mod model;
pub mod priority;
pub mod prob_table;
pub mod property;
pub mod staging;
pub mod state_index;
pub mod threaded;

pub use config::{EventMode, Method, RunOptions};
pub use coordinator::{IterationCoordinator, TruncationOutcome, TruncationResult};
pub use error::StaminaError;
pub use model::oracle::{Expansion, StateOracle, Successor};
pub use model::state::{CompressedState, StateId, VariableLayout};
pub use property::BoundedUntilPredicate;
pub use staging::SparseMatrix;
