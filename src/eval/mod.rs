//! Cross-validated metric and fairness evaluation

pub mod cross_validation;
pub mod fairness;
pub mod metrics;

pub use cross_validation::{cross_val_predict, KFold, OutOfFoldPredictions, DEFAULT_FOLDS};
pub use fairness::{equalized_odds, EqualizedOddsReport, GroupRates};
pub use metrics::MetricReport;

use crate::error::Result;
use crate::models::ClassifierModel;
use ndarray::{Array1, Array2};

/// Out-of-fold predictions together with the scores computed from them
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub predictions: OutOfFoldPredictions,
    pub report: MetricReport,
}

/// Cross-validate `model`'s configuration on (`x`, `y`) and score the
/// out-of-fold predictions.
pub fn evaluate(
    model: &ClassifierModel,
    x: &Array2<f64>,
    y: &Array1<f64>,
    folds: usize,
) -> Result<Evaluation> {
    let predictions = cross_val_predict(model, x, y, folds)?;
    let report = MetricReport::from_predictions(y, &predictions.labels, &predictions.probabilities);
    Ok(Evaluation {
        predictions,
        report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ClassifierKind;

    #[test]
    fn test_evaluate_scores_are_in_range() {
        let n = 30;
        let x = Array2::from_shape_fn((n, 3), |(i, j)| ((i + 1) * (j + 2)) as f64 * 0.05);
        let y: Array1<f64> = (0..n).map(|i| if i % 3 == 0 { 1.0 } else { 0.0 }).collect();

        let model = ClassifierModel::with_defaults(ClassifierKind::LogisticRegression);
        let evaluation = evaluate(&model, &x, &y, 5).unwrap();

        for (name, value) in evaluation.report.entries() {
            assert!((0.0..=1.0).contains(&value), "{name} = {value}");
        }
        assert_eq!(evaluation.predictions.labels.len(), n);
    }
}
