//! Demographic cohort selection

use crate::error::{FairtuneError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use super::{
    ETHNICITY_COLUMN, FEATURE_COLUMNS, HISPANIC_LATINO, LAB_CONFIRMED, MISSING_SENTINELS,
    OUTCOME_COLUMN, RACE_COLUMN, STATUS_COLUMN,
};

/// Definition of one demographic group.
///
/// When `ethnicity` is "Hispanic/Latino" the group is ethnicity-only: the
/// race labels are ignored and membership is decided by the ethnicity column
/// alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupSpec {
    /// Display name for reports and error messages
    pub name: String,
    /// Race labels admitted into the group
    pub races: Vec<String>,
    /// Required ethnicity label
    pub ethnicity: String,
}

impl GroupSpec {
    pub fn new(
        name: impl Into<String>,
        races: impl IntoIterator<Item = &'static str>,
        ethnicity: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            races: races.into_iter().map(String::from).collect(),
            ethnicity: ethnicity.into(),
        }
    }

    /// The reference population: non-Hispanic White records.
    pub fn reference() -> Self {
        Self::new("Non-Hispanic White", ["White"], "Non-Hispanic/Latino")
    }

    /// The four minority groups, in adaptation order.
    pub fn minority_groups() -> Vec<Self> {
        vec![
            Self::new("Black", ["Black"], "Non-Hispanic/Latino"),
            Self::new(HISPANIC_LATINO, [], HISPANIC_LATINO),
            Self::new(
                "American Indian/Alaska Native",
                ["American Indian/Alaska Native"],
                "Non-Hispanic/Latino",
            ),
            Self::new(
                "Asian/Pacific Islander",
                ["Asian", "Native Hawaiian/Other Pacific Islander"],
                "Non-Hispanic/Latino",
            ),
        ]
    }

    /// Whether membership is decided by ethnicity alone.
    pub fn is_ethnicity_only(&self) -> bool {
        self.ethnicity == HISPANIC_LATINO
    }

    /// Column used as the sensitive attribute for fairness stratification.
    pub fn sensitive_column(&self) -> &'static str {
        if self.is_ethnicity_only() {
            ETHNICITY_COLUMN
        } else {
            RACE_COLUMN
        }
    }
}

/// A filtered, validity-checked subset of the record set for one group.
#[derive(Debug, Clone)]
pub struct Cohort {
    pub spec: GroupSpec,
    pub frame: DataFrame,
}

impl Cohort {
    pub fn len(&self) -> usize {
        self.frame.height()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.height() == 0
    }
}

/// Select the cohort for `spec` from the full record set.
///
/// A record survives when it matches the group's race/ethnicity definition,
/// is laboratory-confirmed, has a resolved outcome, and carries no missing or
/// unknown value in any feature or outcome field. An empty result is an
/// error: training on a degenerate matrix would silently produce a useless
/// model.
pub fn filter_cohort(records: &DataFrame, spec: &GroupSpec) -> Result<Cohort> {
    let mut keep = demographic_expr(spec)
        .and(col(STATUS_COLUMN).eq(lit(LAB_CONFIRMED)))
        .and(
            col(OUTCOME_COLUMN)
                .eq(lit("Yes"))
                .or(col(OUTCOME_COLUMN).eq(lit("No"))),
        );

    for column in FEATURE_COLUMNS.iter().chain([&OUTCOME_COLUMN]) {
        keep = keep.and(col(*column).is_not_null());
        for sentinel in MISSING_SENTINELS {
            keep = keep.and(col(*column).neq(lit(sentinel)));
        }
    }

    let frame = records.clone().lazy().filter(keep).collect()?;

    tracing::info!(
        group = %spec.name,
        records = frame.height(),
        "cohort filtered"
    );

    if frame.height() == 0 {
        return Err(FairtuneError::EmptyCohort {
            group: spec.name.clone(),
        });
    }

    Ok(Cohort {
        spec: spec.clone(),
        frame,
    })
}

fn demographic_expr(spec: &GroupSpec) -> Expr {
    if spec.is_ethnicity_only() {
        // Hispanic/Latino is ethnicity-only; race is ignored
        return col(ETHNICITY_COLUMN).eq(lit(HISPANIC_LATINO));
    }

    let race = spec
        .races
        .iter()
        .map(|r| col(RACE_COLUMN).eq(lit(r.clone())))
        .reduce(|a, b| a.or(b))
        .unwrap_or(lit(false));

    race.and(col(ETHNICITY_COLUMN).eq(lit(spec.ethnicity.clone())))
}
