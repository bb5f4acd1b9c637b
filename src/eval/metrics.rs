//! Classification metrics over out-of-fold predictions

use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Immutable report of the scores for one (predictor, cohort) evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricReport {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub roc_auc: f64,
    pub aucpr: f64,
}

impl MetricReport {
    /// Compute all scores from hard labels and positive-class probabilities.
    ///
    /// Zero positive predictions or zero positive labels are conventions,
    /// not errors: the affected score is 0.0.
    pub fn from_predictions(
        y_true: &Array1<f64>,
        y_pred: &Array1<f64>,
        y_prob: &Array1<f64>,
    ) -> Self {
        let n = y_true.len();
        let (tp, fp, tn, fn_) = confusion_counts(y_true, y_pred);

        let accuracy = if n > 0 {
            (tp + tn) as f64 / n as f64
        } else {
            0.0
        };
        let precision = if tp + fp > 0 {
            tp as f64 / (tp + fp) as f64
        } else {
            0.0
        };
        let recall = if tp + fn_ > 0 {
            tp as f64 / (tp + fn_) as f64
        } else {
            0.0
        };
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        Self {
            accuracy,
            precision,
            recall,
            f1,
            roc_auc: roc_auc(y_true, y_prob),
            aucpr: aucpr(y_true, y_prob),
        }
    }

    /// All scores as (name, value) pairs, in report order
    pub fn entries(&self) -> [(&'static str, f64); 6] {
        [
            ("Accuracy", self.accuracy),
            ("Precision", self.precision),
            ("Recall", self.recall),
            ("F1", self.f1),
            ("ROC-AUC", self.roc_auc),
            ("AUCPR", self.aucpr),
        ]
    }
}

pub(crate) fn confusion_counts(
    y_true: &Array1<f64>,
    y_pred: &Array1<f64>,
) -> (usize, usize, usize, usize) {
    let mut tp = 0;
    let mut fp = 0;
    let mut tn = 0;
    let mut fn_ = 0;

    for (t, p) in y_true.iter().zip(y_pred.iter()) {
        match (*t > 0.5, *p > 0.5) {
            (true, true) => tp += 1,
            (false, true) => fp += 1,
            (false, false) => tn += 1,
            (true, false) => fn_ += 1,
        }
    }

    (tp, fp, tn, fn_)
}

/// Area under the ROC curve via the rank statistic, with tie-averaged ranks.
///
/// Degenerate label sets (no positives or no negatives) score 0.5: the
/// ranking carries no information either way.
pub fn roc_auc(y_true: &Array1<f64>, scores: &Array1<f64>) -> f64 {
    let n = y_true.len();
    let n_pos = y_true.iter().filter(|&&t| t > 0.5).count();
    let n_neg = n - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return 0.5;
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        scores[a]
            .partial_cmp(&scores[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    // Average ranks across tied scores
    let mut ranks = vec![0.0f64; n];
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j + 1 < n && scores[order[j + 1]] == scores[order[i]] {
            j += 1;
        }
        let avg_rank = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            ranks[idx] = avg_rank;
        }
        i = j + 1;
    }

    let rank_sum_pos: f64 = y_true
        .iter()
        .zip(ranks.iter())
        .filter(|(&t, _)| t > 0.5)
        .map(|(_, &r)| r)
        .sum();

    let auc =
        (rank_sum_pos - (n_pos * (n_pos + 1)) as f64 / 2.0) / (n_pos as f64 * n_neg as f64);
    auc.clamp(0.0, 1.0)
}

/// (recall, precision) pairs from a descending threshold sweep, in ascending
/// recall order, starting at the conventional (0, 1) anchor.
pub fn precision_recall_curve(y_true: &Array1<f64>, scores: &Array1<f64>) -> Vec<(f64, f64)> {
    let n = y_true.len();
    let total_pos = y_true.iter().filter(|&&t| t > 0.5).count();

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        scores[b]
            .partial_cmp(&scores[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut points = vec![(0.0, 1.0)];
    let mut tp = 0usize;
    let mut fp = 0usize;
    let mut i = 0;
    while i < n {
        // Consume every record sharing this threshold before emitting a point
        let threshold = scores[order[i]];
        while i < n && scores[order[i]] == threshold {
            if y_true[order[i]] > 0.5 {
                tp += 1;
            } else {
                fp += 1;
            }
            i += 1;
        }

        let precision = if tp + fp > 0 {
            tp as f64 / (tp + fp) as f64
        } else {
            0.0
        };
        let recall = if total_pos > 0 {
            tp as f64 / total_pos as f64
        } else {
            0.0
        };
        points.push((recall, precision));

        // Full recall reached; lower thresholds only dilute precision
        if total_pos > 0 && tp == total_pos {
            break;
        }
    }

    points
}

/// Area under the precision-recall curve, trapezoid rule over ascending
/// recall. 0.0 when the cohort has no positive labels.
pub fn aucpr(y_true: &Array1<f64>, scores: &Array1<f64>) -> f64 {
    let total_pos = y_true.iter().filter(|&&t| t > 0.5).count();
    if total_pos == 0 {
        return 0.0;
    }

    let points = precision_recall_curve(y_true, scores);
    let mut area = 0.0;
    for pair in points.windows(2) {
        let (r0, p0) = pair[0];
        let (r1, p1) = pair[1];
        area += (r1 - r0) * (p0 + p1) / 2.0;
    }
    area.clamp(0.0, 1.0)
}
