//! Experiment orchestration: the base-train / adapt lifecycle and the
//! end-to-end driver

pub mod driver;
pub mod orchestrator;

pub use driver::{
    run_experiment, ExperimentConfig, ExperimentReport, GroupOutcome, OddsComparison,
};
pub use orchestrator::{
    base_model_key, fine_tuned_model_key, AdaptationOutcome, TrainingOrchestrator,
};
