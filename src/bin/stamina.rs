use clap::Parser;
use stamina_core::config::{EventMode, Method, RunOptions};
use stamina_core::coordinator::{IterationCoordinator, TruncationOutcome};
use stamina_core::model::oracle::StateOracle;
use stamina_core::model::state::CompressedState;
use stamina_core::priority::EventStatePriority;
use stamina_core::property::BoundedUntilPredicate;
use stamina_core::{message, warning};

/// STochastic Approximation and Model-checking of Infinite-state/iNtractable-
/// state Analysis: on-the-fly CTMC state-space truncation.
#[derive(Parser, Debug)]
#[command(name = "stamina", version, about)]
struct StaminaArgs {
    /// PRISM/`.sm` model file. Parsing is out of scope for this crate; this
    /// flag is accepted and threaded through for front-end tooling that
    /// wraps this engine.
    #[arg(long)]
    model_file: String,

    /// CSL properties file, same scope note as `model_file`.
    #[arg(long)]
    properties_file: String,

    #[arg(long, default_value_t = 1.0)]
    kappa: f64,

    #[arg(long, default_value_t = 2.0)]
    reduce_kappa: f64,

    #[arg(long, default_value_t = 2.0)]
    approx_factor: f64,

    #[arg(long, default_value_t = 1e-3)]
    prob_win: f64,

    #[arg(long, default_value_t = 10)]
    max_approx_count: u32,

    #[arg(long)]
    no_prop_refine: bool,

    #[arg(long)]
    export_filename: Option<String>,

    #[arg(long)]
    export_perimeter_states: Option<String>,

    #[arg(long)]
    export_trans: Option<String>,

    #[arg(long)]
    rank_transitions: bool,

    #[arg(long, default_value_t = 10_000)]
    max_iterations: u64,

    #[arg(long, default_value = "iterative")]
    method: String,

    /// Constants definition string, passed through to the (out-of-scope)
    /// external model parser unexamined.
    #[arg(long)]
    consts: Option<String>,

    /// "rare" or "common"; priority strategy only.
    #[arg(long)]
    event: Option<String>,

    #[arg(long, default_value_t = 1.0)]
    fudge_factor: f64,

    #[arg(long, default_value_t = true)]
    preterminate: bool,
}

impl StaminaArgs {
    fn into_run_options(self) -> Result<RunOptions, stamina_core::StaminaError> {
        let method = match self.method.as_str() {
            "iterative" => Method::Iterative,
            "re-exploring" => Method::ReExploring,
            "priority" => Method::Priority,
            other => {
                return Err(stamina_core::StaminaError::InputInvalid {
                    reason: format!("unknown method '{other}'"),
                })
            }
        };
        let event = match self.event.as_deref() {
            None => None,
            Some("rare") => Some(EventMode::Rare),
            Some("common") => Some(EventMode::Common),
            Some(other) => {
                return Err(stamina_core::StaminaError::InputInvalid {
                    reason: format!("unknown event mode '{other}'"),
                })
            }
        };
        let options = RunOptions {
            kappa: self.kappa,
            reduce_kappa: self.reduce_kappa,
            approx_factor: self.approx_factor,
            prob_win: self.prob_win,
            max_approx_count: self.max_approx_count,
            no_prop_refine: self.no_prop_refine,
            rank_transitions: self.rank_transitions,
            method,
            event,
            fudge_factor: self.fudge_factor,
            preterminate: self.preterminate,
        };
        options.validate()?;
        Ok(options)
    }
}

/// Loading a PRISM/`.sm` model and a CSL property into a `StateOracle` and a
/// `BoundedUntilPredicate` is a front-end concern this crate does not own;
/// wiring it up is the only piece left for a caller embedding this binary.
fn load_oracle(_model_file: &str, _consts: Option<&str>) -> Box<dyn StateOracle> {
    unimplemented!("no PRISM/.sm front-end is wired up in this crate; construct a StateOracle and call the library directly")
}

fn load_property(
    _properties_file: &str,
) -> Option<(BoundedUntilPredicate, Option<EventStatePriority>)> {
    unimplemented!("no CSL front-end is wired up in this crate; construct a BoundedUntilPredicate and call the library directly")
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = StaminaArgs::parse();
    if !args.model_file.ends_with(".prism") && !args.model_file.ends_with(".sm") {
        warning!("model file does not appear to have the proper extension (.sm or .prism)");
    }
    if !args.properties_file.ends_with(".csl") {
        warning!("properties file does not appear to have the proper extension (.csl)");
    }

    let model_file = args.model_file.clone();
    let properties_file = args.properties_file.clone();
    let consts = args.consts.clone();

    let options = match args.into_run_options() {
        Ok(o) => o,
        Err(e) => {
            stamina_core::error!("{e}");
            std::process::exit(1);
        }
    };

    let coordinator = match IterationCoordinator::new(options.clone()) {
        Ok(c) => c,
        Err(e) => {
            stamina_core::error!("{e}");
            std::process::exit(1);
        }
    };

    message!("loading model from {}", model_file);
    let oracle = load_oracle(&model_file, consts.as_deref());
    let property_and_priority = load_property(&properties_file);
    let (absorbing_state, initial_state) =
        (CompressedState::absorbing_sentinel(), CompressedState::zeros(0));
    let property = property_and_priority.as_ref().map(|(p, _)| p.clone());
    let event_tree = property_and_priority.and_then(|(_, e)| e);

    let outcome = match options.method {
        Method::Iterative => coordinator.run_iterative(
            oracle.as_ref(),
            absorbing_state,
            initial_state,
            property.as_ref(),
        ),
        Method::ReExploring => coordinator.run_re_exploring(
            oracle.as_ref(),
            absorbing_state,
            initial_state,
            property.as_ref(),
        ),
        Method::Priority => coordinator.run_priority(
            oracle.as_ref(),
            absorbing_state,
            initial_state,
            property.as_ref(),
            event_tree,
        ),
    };

    match outcome {
        Ok(TruncationOutcome::Complete(result)) => {
            message!(
                "truncation complete: {} states explored, pi_hat = {:.6}",
                result.states_explored,
                result.pi_hat
            );
        }
        Ok(TruncationOutcome::Partial { result, refinements }) => {
            warning!(
                "budget exhausted after {refinements} refinements; pi_hat = {:.6} ({} states)",
                result.pi_hat,
                result.states_explored
            );
        }
        Err(e) => {
            stamina_core::error!("{e}");
            std::process::exit(1);
        }
    }
}
