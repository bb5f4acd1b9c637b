//! Surveillance record loading, cohort selection, and encoding
//!
//! The record set is a concatenation of same-schema CSV files: 21 categorical
//! clinical/demographic feature columns, the demographic stratification
//! columns, the case-status column, and the binary mortality outcome.

mod cohort;
mod encoder;
mod loader;

pub use cohort::{filter_cohort, Cohort, GroupSpec};
pub use encoder::{encode_cohort, EncodedCohort};
pub use loader::load_directory;

/// The fixed clinical/demographic feature columns used for prediction.
pub const FEATURE_COLUMNS: [&str; 21] = [
    "sex",
    "age_group",
    "hosp_yn",
    "icu_yn",
    "pna_yn",
    "abxchest_yn",
    "acuterespdistress_yn",
    "mechvent_yn",
    "fever_yn",
    "sfever_yn",
    "chills_yn",
    "myalgia_yn",
    "runnose_yn",
    "sthroat_yn",
    "cough_yn",
    "sob_yn",
    "nauseavomit_yn",
    "headache_yn",
    "abdom_yn",
    "diarrhea_yn",
    "medcond_yn",
];

/// Race stratification column.
pub const RACE_COLUMN: &str = "race";

/// Ethnicity stratification column.
pub const ETHNICITY_COLUMN: &str = "ethnicity";

/// Case-status column; only laboratory-confirmed cases enter a cohort.
pub const STATUS_COLUMN: &str = "current_status";

/// Binary mortality outcome column.
pub const OUTCOME_COLUMN: &str = "death_yn";

/// The only case status admitted into a cohort.
pub const LAB_CONFIRMED: &str = "Laboratory-confirmed case";

/// Ethnicity label that switches cohort selection to ethnicity-only matching.
pub const HISPANIC_LATINO: &str = "Hispanic/Latino";

/// Values treated as unresolved/missing in any feature or outcome field.
pub const MISSING_SENTINELS: [&str; 4] = ["Missing", "N/A", "NA", "Unknown"];

/// Every column the input schema must provide.
pub fn required_columns() -> Vec<&'static str> {
    let mut cols: Vec<&'static str> = FEATURE_COLUMNS.to_vec();
    cols.extend([RACE_COLUMN, ETHNICITY_COLUMN, STATUS_COLUMN, OUTCOME_COLUMN]);
    cols
}
