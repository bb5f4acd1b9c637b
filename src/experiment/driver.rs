//! End-to-end experiment run
//!
//! Explicit driver over the whole protocol: base-train once on the reference
//! cohort, then adapt and fairness-compare on each minority cohort. Takes the
//! record set and group definitions as parameters and returns a structured
//! aggregate; no process-wide state.

use crate::data::{encode_cohort, filter_cohort, GroupSpec};
use crate::error::Result;
use crate::eval::{equalized_odds, EqualizedOddsReport, MetricReport, DEFAULT_FOLDS};
use crate::experiment::orchestrator::TrainingOrchestrator;
use crate::models::FineTuneOverrides;
use crate::store::ModelStore;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Parameters of one experiment run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentConfig {
    /// Cross-validation fold count
    pub folds: usize,
    /// Fixed per-classifier adaptation overrides
    pub overrides: FineTuneOverrides,
    /// Reference population for base training
    pub reference: GroupSpec,
    /// Minority populations, adapted in order
    pub targets: Vec<GroupSpec>,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            folds: DEFAULT_FOLDS,
            overrides: FineTuneOverrides::default(),
            reference: GroupSpec::reference(),
            targets: GroupSpec::minority_groups(),
        }
    }
}

/// Equalized Odds for the two model variants evaluated on one cohort
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OddsComparison {
    pub base_model: EqualizedOddsReport,
    pub fine_tuned_model: EqualizedOddsReport,
}

/// Everything measured for one minority group
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupOutcome {
    /// Group display name
    pub group: String,
    /// Cohort size after filtering
    pub cohort_size: usize,
    /// Base-configuration scores per classifier, cross-validated on this cohort
    pub base_metrics: BTreeMap<String, MetricReport>,
    /// Fine-tuned-configuration scores per classifier
    pub fine_tuned_metrics: BTreeMap<String, MetricReport>,
    /// Per-classifier Equalized Odds for both variants
    pub equalized_odds: BTreeMap<String, OddsComparison>,
}

/// Aggregate result of a full experiment run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentReport {
    /// Reference population name
    pub reference_group: String,
    /// Reference cohort size after filtering
    pub reference_size: usize,
    /// Base-training scores per classifier on the reference cohort
    pub reference_metrics: BTreeMap<String, MetricReport>,
    /// Per-minority-group outcomes, in adaptation order
    pub groups: Vec<GroupOutcome>,
}

/// Run the full experiment protocol over `records`.
pub fn run_experiment<S: ModelStore>(
    records: &DataFrame,
    store: &S,
    config: &ExperimentConfig,
) -> Result<ExperimentReport> {
    let orchestrator = TrainingOrchestrator::new(store).with_folds(config.folds);

    tracing::info!(group = %config.reference.name, "base training stage");
    let reference = filter_cohort(records, &config.reference)?;
    let reference = encode_cohort(&reference)?;
    let reference_metrics = orchestrator.train_base(&reference)?;

    let mut groups = Vec::with_capacity(config.targets.len());
    for spec in &config.targets {
        tracing::info!(group = %spec.name, "adaptation stage");
        let cohort = filter_cohort(records, spec)?;
        let cohort = encode_cohort(&cohort)?;

        let outcomes = orchestrator.adapt(&cohort, &config.overrides)?;

        let mut base_metrics = BTreeMap::new();
        let mut fine_tuned_metrics = BTreeMap::new();
        let mut odds = BTreeMap::new();
        for (classifier, outcome) in outcomes {
            let base_model =
                equalized_odds(&cohort.y, &outcome.base_predictions.labels, &cohort.sensitive)?;
            let fine_tuned_model = equalized_odds(
                &cohort.y,
                &outcome.fine_tuned_predictions.labels,
                &cohort.sensitive,
            )?;

            base_metrics.insert(classifier.clone(), outcome.base_report);
            fine_tuned_metrics.insert(classifier.clone(), outcome.fine_tuned_report);
            odds.insert(
                classifier,
                OddsComparison {
                    base_model,
                    fine_tuned_model,
                },
            );
        }

        groups.push(GroupOutcome {
            group: spec.name.clone(),
            cohort_size: cohort.len(),
            base_metrics,
            fine_tuned_metrics,
            equalized_odds: odds,
        });
    }

    Ok(ExperimentReport {
        reference_group: config.reference.name.clone(),
        reference_size: reference.len(),
        reference_metrics,
        groups,
    })
}
