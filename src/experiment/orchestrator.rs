//! Base-training and adaptation lifecycle
//!
//! Per classifier type the lifecycle is: default-construct, base-train on the
//! reference cohort, persist; then for each minority cohort reload the
//! pristine base artifact, override the fixed hyperparameter subset, re-fit,
//! and persist the fine-tuned artifact. Reported metrics always come from
//! out-of-fold cross-validation; the persisted artifact is separately re-fit
//! on the full cohort.

use crate::data::EncodedCohort;
use crate::error::Result;
use crate::eval::{evaluate, MetricReport, OutOfFoldPredictions, DEFAULT_FOLDS};
use crate::models::{Classifier, ClassifierKind, ClassifierModel, FineTuneOverrides};
use crate::store::ModelStore;
use std::collections::BTreeMap;

/// Persistence key for a classifier's base artifact
pub fn base_model_key(kind: ClassifierKind) -> String {
    format!("{}_base_model", kind.name())
}

/// Persistence key for a classifier's fine-tuned artifact
pub fn fine_tuned_model_key(kind: ClassifierKind) -> String {
    format!("{}_fine_tuned_model", kind.name())
}

/// Result of adapting one classifier to one minority cohort
#[derive(Debug, Clone)]
pub struct AdaptationOutcome {
    /// Scores of the base configuration, cross-validated on the target cohort
    pub base_report: MetricReport,
    /// Scores of the fine-tuned configuration on the same cohort
    pub fine_tuned_report: MetricReport,
    /// Out-of-fold predictions of the base configuration
    pub base_predictions: OutOfFoldPredictions,
    /// Out-of-fold predictions of the fine-tuned configuration
    pub fine_tuned_predictions: OutOfFoldPredictions,
}

/// Sequences the base-train / persist / reload / adapt lifecycle against an
/// injected model store.
pub struct TrainingOrchestrator<'a, S: ModelStore> {
    store: &'a S,
    folds: usize,
}

impl<'a, S: ModelStore> TrainingOrchestrator<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            folds: DEFAULT_FOLDS,
        }
    }

    /// Set the cross-validation fold count
    pub fn with_folds(mut self, folds: usize) -> Self {
        self.folds = folds;
        self
    }

    /// Base-train all four classifier types on the reference cohort.
    ///
    /// Each type is default-constructed, cross-validated for its report, then
    /// re-fit on the full reference matrix and persisted under its base key.
    pub fn train_base(&self, cohort: &EncodedCohort) -> Result<BTreeMap<String, MetricReport>> {
        let mut reports = BTreeMap::new();

        for kind in ClassifierKind::ALL {
            tracing::info!(classifier = kind.name(), cohort = %cohort.name, "base training");

            let model = ClassifierModel::with_defaults(kind);
            let evaluation = evaluate(&model, &cohort.x, &cohort.y, self.folds)?;

            let mut fitted = model.fresh();
            fitted.fit(&cohort.x, &cohort.y)?;
            self.store.save(&base_model_key(kind), &fitted)?;

            reports.insert(kind.name().to_string(), evaluation.report);
        }

        Ok(reports)
    }

    /// Adapt every classifier to one minority cohort.
    ///
    /// Each adaptation reloads the base artifact — never a previous group's
    /// fine-tuning — so sequential adaptations all start from identical base
    /// parameters. A missing base artifact is fatal.
    pub fn adapt(
        &self,
        cohort: &EncodedCohort,
        overrides: &FineTuneOverrides,
    ) -> Result<BTreeMap<String, AdaptationOutcome>> {
        let mut outcomes = BTreeMap::new();

        for kind in ClassifierKind::ALL {
            tracing::info!(classifier = kind.name(), cohort = %cohort.name, "adapting");

            let base = self.store.load(&base_model_key(kind))?;
            let base_evaluation = evaluate(&base, &cohort.x, &cohort.y, self.folds)?;

            let mut tuned = base;
            tuned.retune(overrides);
            let tuned_evaluation = evaluate(&tuned, &cohort.x, &cohort.y, self.folds)?;

            tuned.fit(&cohort.x, &cohort.y)?;
            self.store.save(&fine_tuned_model_key(kind), &tuned)?;

            outcomes.insert(
                kind.name().to_string(),
                AdaptationOutcome {
                    base_report: base_evaluation.report,
                    fine_tuned_report: tuned_evaluation.report,
                    base_predictions: base_evaluation.predictions,
                    fine_tuned_predictions: tuned_evaluation.predictions,
                },
            );
        }

        Ok(outcomes)
    }
}
