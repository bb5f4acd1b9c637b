//! Per-cohort categorical encoding

use crate::error::{FairtuneError, Result};
use ndarray::{Array1, Array2};
use std::collections::HashMap;

use super::{Cohort, FEATURE_COLUMNS, OUTCOME_COLUMN};

/// The numeric projection of one cohort.
///
/// Codes are assigned per column in order of first occurrence within this
/// cohort's encoding pass. They are intentionally not shared across cohorts:
/// every cohort is encoded independently, and fairness comparisons only ever
/// operate inside a single cohort's encoding.
#[derive(Debug, Clone)]
pub struct EncodedCohort {
    /// Group display name
    pub name: String,
    /// Feature matrix, one column per feature field
    pub x: Array2<f64>,
    /// Outcome vector, Yes = 1.0 / No = 0.0
    pub y: Array1<f64>,
    /// Raw sensitive-attribute value per record (race, or ethnicity for an
    /// ethnicity-only group)
    pub sensitive: Vec<String>,
}

impl EncodedCohort {
    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }
}

/// Encode a filtered cohort into a feature matrix and label vector.
pub fn encode_cohort(cohort: &Cohort) -> Result<EncodedCohort> {
    let n = cohort.len();
    if n == 0 {
        return Err(FairtuneError::EmptyCohort {
            group: cohort.spec.name.clone(),
        });
    }

    let mut x = Array2::<f64>::zeros((n, FEATURE_COLUMNS.len()));
    for (j, name) in FEATURE_COLUMNS.iter().enumerate() {
        let column = cohort.frame.column(name)?;
        let values = column.str()?;

        let mut codes: HashMap<&str, u32> = HashMap::new();
        let mut next = 0u32;
        for (i, value) in values.into_iter().enumerate() {
            let value = value.ok_or_else(|| {
                FairtuneError::DataError(format!("null in column '{name}' after filtering"))
            })?;
            let code = *codes.entry(value).or_insert_with(|| {
                let assigned = next;
                next += 1;
                assigned
            });
            x[[i, j]] = f64::from(code);
        }
    }

    let outcome = cohort.frame.column(OUTCOME_COLUMN)?;
    let mut y = Array1::<f64>::zeros(n);
    for (i, value) in outcome.str()?.into_iter().enumerate() {
        y[i] = match value {
            Some("Yes") => 1.0,
            Some("No") => 0.0,
            other => {
                return Err(FairtuneError::DataError(format!(
                    "unexpected outcome value {other:?} after filtering"
                )))
            }
        };
    }

    let sensitive_column = cohort.frame.column(cohort.spec.sensitive_column())?;
    let sensitive: Vec<String> = sensitive_column
        .str()?
        .into_iter()
        .map(|v| v.unwrap_or_default().to_string())
        .collect();

    Ok(EncodedCohort {
        name: cohort.spec.name.clone(),
        x,
        y,
        sensitive,
    })
}
