//! Integration test: experiment pipeline end-to-end

use fairtune::data::{
    encode_cohort, filter_cohort, required_columns, GroupSpec, FEATURE_COLUMNS, LAB_CONFIRMED,
    MISSING_SENTINELS, OUTCOME_COLUMN, STATUS_COLUMN,
};
use fairtune::experiment::{
    base_model_key, fine_tuned_model_key, run_experiment, ExperimentConfig, TrainingOrchestrator,
};
use fairtune::models::ClassifierKind;
use fairtune::store::{MemoryStore, ModelStore};
use polars::prelude::*;

/// Column-wise builder for synthetic surveillance records
struct RecordSet {
    columns: Vec<(String, Vec<String>)>,
}

impl RecordSet {
    fn new() -> Self {
        Self {
            columns: required_columns()
                .into_iter()
                .map(|name| (name.to_string(), Vec::new()))
                .collect(),
        }
    }

    fn push(&mut self, race: &str, ethnicity: &str, status: &str, death: &str, seed: usize) {
        for (name, values) in &mut self.columns {
            let value = match name.as_str() {
                "race" => race.to_string(),
                "ethnicity" => ethnicity.to_string(),
                "current_status" => status.to_string(),
                "death_yn" => death.to_string(),
                "sex" => {
                    if seed % 2 == 0 {
                        "Male".to_string()
                    } else {
                        "Female".to_string()
                    }
                }
                "age_group" => match seed % 4 {
                    0 => "20 - 29 Years".to_string(),
                    1 => "40 - 49 Years".to_string(),
                    2 => "60 - 69 Years".to_string(),
                    _ => "80+ Years".to_string(),
                },
                // Hospitalization and ICU flags track the outcome so the
                // classifiers have signal to learn
                "hosp_yn" => {
                    if death == "Yes" || seed % 7 == 0 {
                        "Yes".to_string()
                    } else {
                        "No".to_string()
                    }
                }
                "icu_yn" => {
                    if death == "Yes" && seed % 3 != 0 {
                        "Yes".to_string()
                    } else {
                        "No".to_string()
                    }
                }
                "medcond_yn" => {
                    if (death == "Yes") == (seed % 5 != 4) {
                        "Yes".to_string()
                    } else {
                        "No".to_string()
                    }
                }
                other => {
                    // Symptom flags vary with a per-column phase
                    let phase = other.len();
                    if (seed + phase) % 3 == 0 {
                        "Yes".to_string()
                    } else {
                        "No".to_string()
                    }
                }
            };
            values.push(value);
        }
    }

    /// Push `n` valid laboratory-confirmed records, `positives` of them fatal
    fn push_group(&mut self, race: &str, ethnicity: &str, n: usize, positives: usize) {
        for i in 0..n {
            let death = if i < positives { "Yes" } else { "No" };
            self.push(race, ethnicity, LAB_CONFIRMED, death, i);
        }
    }

    fn frame(self) -> DataFrame {
        let columns: Vec<Column> = self
            .columns
            .into_iter()
            .map(|(name, values)| Column::new(name.into(), values))
            .collect();
        DataFrame::new(columns).unwrap()
    }
}

fn surveillance_frame() -> DataFrame {
    let mut records = RecordSet::new();

    // Reference population: 100 records, 40 fatal / 60 non-fatal
    records.push_group("White", "Non-Hispanic/Latino", 100, 40);

    // Minority populations
    records.push_group("Black", "Non-Hispanic/Latino", 60, 20);
    records.push_group("White", "Hispanic/Latino", 30, 10);
    records.push_group("Black", "Hispanic/Latino", 30, 12);
    records.push_group("American Indian/Alaska Native", "Non-Hispanic/Latino", 50, 18);
    records.push_group("Asian", "Non-Hispanic/Latino", 30, 10);
    records.push_group(
        "Native Hawaiian/Other Pacific Islander",
        "Non-Hispanic/Latino",
        30,
        12,
    );

    // Records that must never survive filtering
    records.push("White", "Non-Hispanic/Latino", "Probable Case", "No", 1);
    records.push("White", "Non-Hispanic/Latino", LAB_CONFIRMED, "Missing", 2);
    records.push("White", "Non-Hispanic/Latino", LAB_CONFIRMED, "Unknown", 3);
    records.push("Black", "Non-Hispanic/Latino", LAB_CONFIRMED, "N/A", 4);

    records.frame()
}

fn test_config() -> ExperimentConfig {
    ExperimentConfig {
        folds: 5,
        ..ExperimentConfig::default()
    }
}

#[test]
fn test_cohorts_are_clean_after_filtering() {
    let records = surveillance_frame();

    let mut specs = vec![GroupSpec::reference()];
    specs.extend(GroupSpec::minority_groups());

    for spec in specs {
        let cohort = filter_cohort(&records, &spec).unwrap();
        assert!(!cohort.is_empty(), "{} is empty", spec.name);

        for name in FEATURE_COLUMNS.iter().chain([&OUTCOME_COLUMN]) {
            let column = cohort.frame.column(name).unwrap();
            for value in column.str().unwrap().into_iter() {
                let value = value.expect("no nulls after filtering");
                assert!(
                    !MISSING_SENTINELS.contains(&value),
                    "{}: sentinel '{}' in {}",
                    spec.name,
                    value,
                    name
                );
            }
        }

        let status = cohort.frame.column(STATUS_COLUMN).unwrap();
        for value in status.str().unwrap().into_iter().flatten() {
            assert_eq!(value, LAB_CONFIRMED);
        }
    }
}

#[test]
fn test_base_training_metrics_are_in_range() {
    // Reference cohort of 100 records (40 positive / 60 negative), ten folds
    let records = surveillance_frame();
    let cohort = filter_cohort(&records, &GroupSpec::reference()).unwrap();
    assert_eq!(cohort.len(), 100);

    let encoded = encode_cohort(&cohort).unwrap();
    assert_eq!(encoded.y.iter().filter(|&&y| y == 1.0).count(), 40);

    let store = MemoryStore::new();
    let orchestrator = TrainingOrchestrator::new(&store).with_folds(10);
    let reports = orchestrator.train_base(&encoded).unwrap();

    assert_eq!(reports.len(), 4);
    for (classifier, report) in &reports {
        for (name, value) in report.entries() {
            assert!(
                (0.0..=1.0).contains(&value),
                "{classifier}: {name} = {value}"
            );
        }
    }
}

#[test]
fn test_full_experiment_report_structure() {
    let records = surveillance_frame();
    let store = MemoryStore::new();
    let report = run_experiment(&records, &store, &test_config()).unwrap();

    assert_eq!(report.reference_group, "Non-Hispanic White");
    assert_eq!(report.reference_size, 100);
    assert_eq!(report.reference_metrics.len(), 4);
    assert_eq!(report.groups.len(), 4);

    let expected_order = [
        "Black",
        "Hispanic/Latino",
        "American Indian/Alaska Native",
        "Asian/Pacific Islander",
    ];
    for (outcome, expected) in report.groups.iter().zip(expected_order) {
        assert_eq!(outcome.group, expected);
        assert_eq!(outcome.base_metrics.len(), 4);
        assert_eq!(outcome.fine_tuned_metrics.len(), 4);
        assert_eq!(outcome.equalized_odds.len(), 4);

        for (classifier, comparison) in &outcome.equalized_odds {
            for odds in [&comparison.base_model, &comparison.fine_tuned_model] {
                assert!(!odds.groups.is_empty(), "{classifier}: no groups");
                for rates in odds.groups.values() {
                    assert!((0.0..=1.0).contains(&rates.true_positive_rate));
                    assert!((0.0..=1.0).contains(&rates.false_positive_rate));
                }
            }
        }
    }

    // The combined Asian/Pacific Islander cohort stratifies into both races
    let api = &report.groups[3];
    let odds = &api.equalized_odds["Decision Tree"].base_model;
    assert_eq!(odds.groups.len(), 2);
    assert!(odds.groups.contains_key("Asian"));
    assert!(odds
        .groups
        .contains_key("Native Hawaiian/Other Pacific Islander"));
}

#[test]
fn test_experiment_persists_base_and_fine_tuned_artifacts() {
    let records = surveillance_frame();
    let store = MemoryStore::new();
    run_experiment(&records, &store, &test_config()).unwrap();

    for kind in ClassifierKind::ALL {
        assert!(store.load(&base_model_key(kind)).is_ok(), "{kind} base");
        assert!(
            store.load(&fine_tuned_model_key(kind)).is_ok(),
            "{kind} fine-tuned"
        );
    }
    assert_eq!(store.keys().len(), 8);
}

#[test]
fn test_adaptations_always_start_from_the_base_artifact() {
    let records = surveillance_frame();
    let store = MemoryStore::new();
    let config = test_config();

    run_experiment(&records, &store, &config).unwrap();

    // After four sequential adaptations the base artifacts are untouched:
    // re-running base training on the same cohort reproduces them bit for bit
    let base_after: Vec<Vec<u8>> = ClassifierKind::ALL
        .iter()
        .map(|&k| store.snapshot(&base_model_key(k)).unwrap())
        .collect();

    let reference = filter_cohort(&records, &config.reference).unwrap();
    let reference = encode_cohort(&reference).unwrap();
    let fresh_store = MemoryStore::new();
    TrainingOrchestrator::new(&fresh_store)
        .with_folds(config.folds)
        .train_base(&reference)
        .unwrap();

    for (kind, after) in ClassifierKind::ALL.iter().zip(base_after) {
        let expected = fresh_store.snapshot(&base_model_key(*kind)).unwrap();
        assert_eq!(after, expected, "{kind} base artifact drifted");
    }
}

#[test]
fn test_missing_group_fails_with_named_cohort() {
    let mut records = RecordSet::new();
    records.push_group("White", "Non-Hispanic/Latino", 40, 15);
    // No Black records at all
    records.push_group("Asian", "Non-Hispanic/Latino", 40, 15);
    let frame = records.frame();

    let store = MemoryStore::new();
    let err = run_experiment(&frame, &store, &test_config()).unwrap_err();
    assert!(err.to_string().contains("Black"), "got: {err}");
}
