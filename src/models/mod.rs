//! Classifier implementations and the capability trait they satisfy
//!
//! The pipeline treats every classifier as a black box with a
//! fit / predict / predict_proba contract; the four concrete types live in
//! the submodules and are dispatched through [`ClassifierModel`].

pub mod decision_tree;
pub mod gradient_boosting;
pub mod logistic;
pub mod random_forest;

pub use decision_tree::{DecisionTree, SplitCriterion, TreeNode};
pub use gradient_boosting::{GradientBoosting, GradientBoostingConfig};
pub use logistic::LogisticRegression;
pub use random_forest::{MaxFeatures, RandomForest};

use crate::error::Result;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Capability contract every classifier satisfies
pub trait Classifier {
    /// Fit on a feature matrix and binary label vector
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    /// Hard class labels (0.0 / 1.0)
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    /// Positive-class probabilities
    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>>;
}

/// The four classifier types in the experiment protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ClassifierKind {
    DecisionTree,
    RandomForest,
    GradientBoosting,
    LogisticRegression,
}

impl ClassifierKind {
    /// All kinds, in protocol order
    pub const ALL: [ClassifierKind; 4] = [
        ClassifierKind::DecisionTree,
        ClassifierKind::RandomForest,
        ClassifierKind::GradientBoosting,
        ClassifierKind::LogisticRegression,
    ];

    /// Display name, also used to build persistence keys
    pub fn name(self) -> &'static str {
        match self {
            ClassifierKind::DecisionTree => "Decision Tree",
            ClassifierKind::RandomForest => "Random Forest",
            ClassifierKind::GradientBoosting => "Gradient Boosting",
            ClassifierKind::LogisticRegression => "Logistic Regression",
        }
    }
}

impl fmt::Display for ClassifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Fine-tune override for the decision tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeTuning {
    pub max_depth: usize,
    pub min_samples_split: usize,
}

/// Fine-tune override for the random forest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestTuning {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
}

/// Fine-tune override for gradient boosting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoostingTuning {
    pub learning_rate: f64,
    pub n_estimators: usize,
    pub max_depth: usize,
}

/// The fixed per-classifier hyperparameter overrides applied before a model
/// is re-fit on a minority cohort. Logistic regression is adapted without
/// any override.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FineTuneOverrides {
    pub decision_tree: TreeTuning,
    pub random_forest: ForestTuning,
    pub gradient_boosting: BoostingTuning,
}

impl Default for FineTuneOverrides {
    fn default() -> Self {
        Self {
            decision_tree: TreeTuning {
                max_depth: 10,
                min_samples_split: 5,
            },
            random_forest: ForestTuning {
                n_estimators: 50,
                max_depth: 10,
                min_samples_split: 5,
            },
            gradient_boosting: BoostingTuning {
                learning_rate: 0.05,
                n_estimators: 50,
                max_depth: 4,
            },
        }
    }
}

/// A classifier instance of one of the four types.
///
/// Serializable in full (hyperparameters and fitted state), so a stored
/// artifact restores to exactly the model that was saved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ClassifierModel {
    DecisionTree(DecisionTree),
    RandomForest(RandomForest),
    GradientBoosting(GradientBoosting),
    LogisticRegression(LogisticRegression),
}

impl ClassifierModel {
    /// Default-constructed (untrained) instance of `kind`
    pub fn with_defaults(kind: ClassifierKind) -> Self {
        match kind {
            ClassifierKind::DecisionTree => Self::DecisionTree(DecisionTree::classifier()),
            ClassifierKind::RandomForest => Self::RandomForest(RandomForest::default()),
            ClassifierKind::GradientBoosting => Self::GradientBoosting(GradientBoosting::default()),
            ClassifierKind::LogisticRegression => {
                Self::LogisticRegression(LogisticRegression::new())
            }
        }
    }

    pub fn kind(&self) -> ClassifierKind {
        match self {
            Self::DecisionTree(_) => ClassifierKind::DecisionTree,
            Self::RandomForest(_) => ClassifierKind::RandomForest,
            Self::GradientBoosting(_) => ClassifierKind::GradientBoosting,
            Self::LogisticRegression(_) => ClassifierKind::LogisticRegression,
        }
    }

    /// Untrained copy preserving the hyperparameters; cross-validation fits
    /// one of these per fold
    pub fn fresh(&self) -> Self {
        match self {
            Self::DecisionTree(m) => Self::DecisionTree(m.fresh()),
            Self::RandomForest(m) => Self::RandomForest(m.fresh()),
            Self::GradientBoosting(m) => Self::GradientBoosting(m.fresh()),
            Self::LogisticRegression(m) => Self::LogisticRegression(m.fresh()),
        }
    }

    /// Apply the fixed fine-tune override for this classifier type
    pub fn retune(&mut self, overrides: &FineTuneOverrides) {
        match self {
            Self::DecisionTree(m) => {
                m.max_depth = Some(overrides.decision_tree.max_depth);
                m.min_samples_split = overrides.decision_tree.min_samples_split;
            }
            Self::RandomForest(m) => {
                m.n_estimators = overrides.random_forest.n_estimators;
                m.max_depth = Some(overrides.random_forest.max_depth);
                m.min_samples_split = overrides.random_forest.min_samples_split;
            }
            Self::GradientBoosting(m) => {
                m.config.learning_rate = overrides.gradient_boosting.learning_rate;
                m.config.n_estimators = overrides.gradient_boosting.n_estimators;
                m.config.max_depth = overrides.gradient_boosting.max_depth;
            }
            Self::LogisticRegression(_) => {}
        }
    }
}

impl Classifier for ClassifierModel {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        match self {
            Self::DecisionTree(m) => m.fit(x, y),
            Self::RandomForest(m) => m.fit(x, y),
            Self::GradientBoosting(m) => m.fit(x, y),
            Self::LogisticRegression(m) => m.fit(x, y),
        }
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        match self {
            Self::DecisionTree(m) => m.predict(x),
            Self::RandomForest(m) => m.predict(x),
            Self::GradientBoosting(m) => m.predict(x),
            Self::LogisticRegression(m) => m.predict(x),
        }
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        match self {
            Self::DecisionTree(m) => m.predict_value(x),
            Self::RandomForest(m) => m.predict_proba(x),
            Self::GradientBoosting(m) => m.predict_proba(x),
            Self::LogisticRegression(m) => m.predict_proba(x),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_kind_names_are_fixed() {
        let names: Vec<&str> = ClassifierKind::ALL.iter().map(|k| k.name()).collect();
        assert_eq!(
            names,
            vec![
                "Decision Tree",
                "Random Forest",
                "Gradient Boosting",
                "Logistic Regression"
            ]
        );
    }

    #[test]
    fn test_every_kind_fits_and_predicts() {
        let x = array![
            [0.0, 0.0],
            [0.0, 1.0],
            [0.5, 0.5],
            [1.0, 0.0],
            [1.0, 1.0],
            [1.5, 1.5],
        ];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];

        for kind in ClassifierKind::ALL {
            let mut model = ClassifierModel::with_defaults(kind);
            model.fit(&x, &y).unwrap();

            let labels = model.predict(&x).unwrap();
            let proba = model.predict_proba(&x).unwrap();
            assert_eq!(labels.len(), 6, "{kind}");
            for (&l, &p) in labels.iter().zip(proba.iter()) {
                assert!(l == 0.0 || l == 1.0, "{kind} label {l}");
                assert!((0.0..=1.0).contains(&p), "{kind} probability {p}");
            }
        }
    }

    #[test]
    fn test_retune_applies_per_kind_overrides() {
        let overrides = FineTuneOverrides::default();

        let mut forest = ClassifierModel::with_defaults(ClassifierKind::RandomForest);
        forest.retune(&overrides);
        match &forest {
            ClassifierModel::RandomForest(m) => {
                assert_eq!(m.n_estimators, 50);
                assert_eq!(m.max_depth, Some(10));
                assert_eq!(m.min_samples_split, 5);
            }
            _ => unreachable!(),
        }

        let mut boosting = ClassifierModel::with_defaults(ClassifierKind::GradientBoosting);
        boosting.retune(&overrides);
        match &boosting {
            ClassifierModel::GradientBoosting(m) => {
                assert_eq!(m.config.learning_rate, 0.05);
                assert_eq!(m.config.n_estimators, 50);
                assert_eq!(m.config.max_depth, 4);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_retune_leaves_logistic_regression_unchanged() {
        let mut model = ClassifierModel::with_defaults(ClassifierKind::LogisticRegression);
        let before = serde_json::to_vec(&model).unwrap();
        model.retune(&FineTuneOverrides::default());
        let after = serde_json::to_vec(&model).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_serde_round_trip_preserves_fit() {
        let x = array![[0.0], [0.2], [0.8], [1.0]];
        let y = array![0.0, 0.0, 1.0, 1.0];

        let mut model = ClassifierModel::with_defaults(ClassifierKind::DecisionTree);
        model.fit(&x, &y).unwrap();

        let bytes = serde_json::to_vec(&model).unwrap();
        let restored: ClassifierModel = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            model.predict(&x).unwrap(),
            restored.predict(&x).unwrap()
        );
    }
}
