//! Equalized Odds fairness evaluation

use crate::error::{FairtuneError, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// TPR/FPR point estimates for one sensitive-attribute group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupRates {
    /// Number of records in this group
    pub group_size: usize,
    /// TP / (TP + FN); 0.0 when the group has no positive labels
    pub true_positive_rate: f64,
    /// FP / (FP + TN); 0.0 when the group has no negative labels
    pub false_positive_rate: f64,
}

/// Equalized Odds report: per-group TPR/FPR, keyed by the sensitive-attribute
/// value, in stable value order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EqualizedOddsReport {
    pub groups: BTreeMap<String, GroupRates>,
}

impl EqualizedOddsReport {
    /// Largest pairwise TPR gap across groups
    pub fn tpr_gap(&self) -> f64 {
        spread(self.groups.values().map(|g| g.true_positive_rate))
    }

    /// Largest pairwise FPR gap across groups
    pub fn fpr_gap(&self) -> f64 {
        spread(self.groups.values().map(|g| g.false_positive_rate))
    }
}

fn spread(values: impl Iterator<Item = f64>) -> f64 {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for v in values {
        min = min.min(v);
        max = max.max(v);
    }
    if min.is_finite() {
        max - min
    } else {
        0.0
    }
}

/// Compute Equalized Odds rates from predictions and a per-record
/// sensitive-attribute value.
///
/// Records are partitioned by distinct attribute value; each group gets raw
/// point estimates with the 0.0-on-empty-denominator convention. No
/// smoothing, no confidence intervals.
pub fn equalized_odds(
    y_true: &Array1<f64>,
    y_pred: &Array1<f64>,
    sensitive: &[String],
) -> Result<EqualizedOddsReport> {
    let n = y_true.len();
    if y_pred.len() != n {
        return Err(FairtuneError::ValidationError(format!(
            "predictions length {} does not match labels length {}",
            y_pred.len(),
            n
        )));
    }
    if sensitive.len() != n {
        return Err(FairtuneError::ValidationError(format!(
            "sensitive attribute has {} values, expected {}",
            sensitive.len(),
            n
        )));
    }

    #[derive(Default)]
    struct Counts {
        tp: usize,
        fp: usize,
        tn: usize,
        fn_: usize,
    }

    let mut per_group: BTreeMap<&str, Counts> = BTreeMap::new();
    for i in 0..n {
        let counts = per_group.entry(sensitive[i].as_str()).or_default();
        match (y_pred[i] > 0.5, y_true[i] > 0.5) {
            (true, true) => counts.tp += 1,
            (true, false) => counts.fp += 1,
            (false, false) => counts.tn += 1,
            (false, true) => counts.fn_ += 1,
        }
    }

    let groups = per_group
        .into_iter()
        .map(|(value, c)| {
            let tpr = if c.tp + c.fn_ > 0 {
                c.tp as f64 / (c.tp + c.fn_) as f64
            } else {
                0.0
            };
            let fpr = if c.fp + c.tn > 0 {
                c.fp as f64 / (c.fp + c.tn) as f64
            } else {
                0.0
            };
            (
                value.to_string(),
                GroupRates {
                    group_size: c.tp + c.fp + c.tn + c.fn_,
                    true_positive_rate: tpr,
                    false_positive_rate: fpr,
                },
            )
        })
        .collect();

    Ok(EqualizedOddsReport { groups })
}
