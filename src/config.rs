//! Validated, typed configuration consumed by the core, distinct from the
//! raw `clap`-parsed CLI args: `StaminaArgs::into_run_options` performs the
//! range checks here and turns violations into `StaminaError::InputInvalid`
//! the same way `Options::checkOptions` did in the original tool.

use crate::error::StaminaError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    Iterative,
    ReExploring,
    Priority,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventMode {
    Rare,
    Common,
}

#[derive(Clone, Debug)]
pub struct RunOptions {
    pub kappa: f64,
    pub reduce_kappa: f64,
    pub approx_factor: f64,
    pub prob_win: f64,
    pub max_approx_count: u32,
    pub no_prop_refine: bool,
    pub rank_transitions: bool,
    pub method: Method,
    pub event: Option<EventMode>,
    pub fudge_factor: f64,
    pub preterminate: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions {
            kappa: 1.0,
            reduce_kappa: 2.0,
            approx_factor: 2.0,
            prob_win: 1e-3,
            max_approx_count: 10,
            no_prop_refine: false,
            rank_transitions: false,
            method: Method::Iterative,
            event: None,
            fudge_factor: 1.0,
            preterminate: true,
        }
    }
}

impl RunOptions {
    pub fn validate(&self) -> Result<(), StaminaError> {
        if self.kappa < 0.0 {
            return Err(StaminaError::InputInvalid {
                reason: format!("kappa should be >= 0.0, got {}", self.kappa),
            });
        }
        if self.reduce_kappa < 1.0 {
            return Err(StaminaError::InputInvalid {
                reason: format!("reduce_kappa should be >= 1.0, got {}", self.reduce_kappa),
            });
        }
        if self.approx_factor <= 0.0 {
            return Err(StaminaError::InputInvalid {
                reason: format!("approx_factor should be > 0.0, got {}", self.approx_factor),
            });
        }
        if !(self.prob_win > 0.0 && self.prob_win <= 1.0) {
            return Err(StaminaError::InputInvalid {
                reason: format!("prob_win should be in (0, 1], got {}", self.prob_win),
            });
        }
        Ok(())
    }
}
