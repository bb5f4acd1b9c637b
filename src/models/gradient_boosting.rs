//! Gradient boosting implementation
//!
//! Binary gradient boosted trees: regression trees fit to the log-loss
//! residuals, with row/column subsampling per boosting round.

use crate::error::{FairtuneError, Result};
use ndarray::{Array1, Array2, Axis};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

use super::decision_tree::DecisionTree;

/// Gradient boosting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostingConfig {
    /// Number of boosting rounds (trees)
    pub n_estimators: usize,
    /// Shrinkage applied to each tree's contribution
    pub learning_rate: f64,
    /// Maximum tree depth
    pub max_depth: usize,
    /// Minimum samples per leaf
    pub min_samples_leaf: usize,
    /// Row subsample ratio per round
    pub subsample: f64,
    /// Column subsample ratio per round
    pub colsample: f64,
    /// Random seed for subsampling
    pub random_state: Option<u64>,
}

impl Default for GradientBoostingConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 6,
            min_samples_leaf: 1,
            subsample: 0.8,
            colsample: 0.8,
            random_state: Some(42),
        }
    }
}

/// Binary gradient boosting classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoosting {
    /// Boosting hyperparameters
    pub config: GradientBoostingConfig,
    trees: Vec<DecisionTree>,
    tree_columns: Vec<Vec<usize>>,
    initial_log_odds: f64,
    is_fitted: bool,
}

impl Default for GradientBoosting {
    fn default() -> Self {
        Self::new(GradientBoostingConfig::default())
    }
}

impl GradientBoosting {
    pub fn new(config: GradientBoostingConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            tree_columns: Vec::new(),
            initial_log_odds: 0.0,
            is_fitted: false,
        }
    }

    /// Untrained copy preserving the hyperparameters
    pub fn fresh(&self) -> Self {
        Self::new(self.config.clone())
    }

    /// Fit on binary labels
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() {
            return Err(FairtuneError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 {
            return Err(FairtuneError::ValidationError(
                "cannot fit boosting on zero samples".to_string(),
            ));
        }

        self.trees.clear();
        self.tree_columns.clear();

        let prior = y.mean().unwrap_or(0.5);
        self.initial_log_odds = (prior / (1.0 - prior + 1e-10) + 1e-10).ln();

        let mut log_odds = Array1::from_elem(n_samples, self.initial_log_odds);
        let mut rng =
            Xoshiro256PlusPlus::seed_from_u64(self.config.random_state.unwrap_or(42));

        for _ in 0..self.config.n_estimators {
            let probs = log_odds.mapv(sigmoid);
            let residuals: Array1<f64> = y - &probs;

            let row_indices = sample_indices(n_samples, self.config.subsample, &mut rng);
            let col_indices = sample_indices(n_features, self.config.colsample, &mut rng);

            let x_rows = x.select(Axis(0), &row_indices);
            let x_sub = x_rows.select(Axis(1), &col_indices);
            let r_sub: Array1<f64> =
                Array1::from_vec(row_indices.iter().map(|&i| residuals[i]).collect());

            let mut tree = DecisionTree::regressor()
                .with_max_depth(self.config.max_depth)
                .with_min_samples_leaf(self.config.min_samples_leaf);
            tree.fit(&x_sub, &r_sub)?;

            // Update every row, not just the sampled ones, so the next
            // round's residuals are never stale
            let full_sub = x.select(Axis(1), &col_indices);
            let contribution = tree.predict_value(&full_sub)?;
            log_odds = log_odds + &contribution * self.config.learning_rate;

            self.trees.push(tree);
            self.tree_columns.push(col_indices);
        }

        self.is_fitted = true;
        Ok(())
    }

    /// Positive-class probability
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if !self.is_fitted {
            return Err(FairtuneError::ModelNotFitted);
        }

        let mut log_odds = Array1::from_elem(x.nrows(), self.initial_log_odds);
        for (tree, cols) in self.trees.iter().zip(self.tree_columns.iter()) {
            let x_sub = x.select(Axis(1), cols);
            let contribution = tree.predict_value(&x_sub)?;
            log_odds = log_odds + &contribution * self.config.learning_rate;
        }

        Ok(log_odds.mapv(sigmoid))
    }

    /// Hard class labels
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let proba = self.predict_proba(x)?;
        Ok(proba.mapv(|p| if p >= 0.5 { 1.0 } else { 0.0 }))
    }
}

fn sigmoid(log_odds: f64) -> f64 {
    1.0 / (1.0 + (-log_odds).exp())
}

fn sample_indices(n: usize, ratio: f64, rng: &mut Xoshiro256PlusPlus) -> Vec<usize> {
    let size = ((n as f64) * ratio).ceil().max(1.0) as usize;
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(rng);
    indices.truncate(size.min(n));
    indices.sort_unstable();
    indices
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classification_data() -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_vec((40, 2), (0..80).map(|i| f64::from(i) * 0.1).collect())
            .unwrap();
        let y: Array1<f64> = x
            .rows()
            .into_iter()
            .map(|row| if row[0] + row[1] > 8.0 { 1.0 } else { 0.0 })
            .collect();
        (x, y)
    }

    #[test]
    fn test_classifier_learns_threshold() {
        let (x, y) = classification_data();
        let config = GradientBoostingConfig {
            n_estimators: 20,
            max_depth: 3,
            ..Default::default()
        };

        let mut model = GradientBoosting::new(config);
        model.fit(&x, &y).unwrap();

        let predictions = model.predict(&x).unwrap();
        let correct = y
            .iter()
            .zip(predictions.iter())
            .filter(|(a, p)| (*a - *p).abs() < 0.5)
            .count();
        let accuracy = correct as f64 / y.len() as f64;
        assert!(accuracy > 0.8, "accuracy {accuracy} too low");
    }

    #[test]
    fn test_probabilities_in_unit_interval() {
        let (x, y) = classification_data();
        let mut model = GradientBoosting::new(GradientBoostingConfig {
            n_estimators: 10,
            ..Default::default()
        });
        model.fit(&x, &y).unwrap();

        let proba = model.predict_proba(&x).unwrap();
        for &p in proba.iter() {
            assert!((0.0..=1.0).contains(&p));
        }
    }

    #[test]
    fn test_seeded_fit_is_reproducible() {
        let (x, y) = classification_data();
        let config = GradientBoostingConfig {
            n_estimators: 5,
            random_state: Some(11),
            ..Default::default()
        };
        let mut a = GradientBoosting::new(config.clone());
        let mut b = GradientBoosting::new(config);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();

        assert_eq!(a.predict_proba(&x).unwrap(), b.predict_proba(&x).unwrap());
    }

    #[test]
    fn test_unfitted_model_errors() {
        let model = GradientBoosting::default();
        let x = Array2::zeros((1, 2));
        assert!(matches!(
            model.predict(&x),
            Err(FairtuneError::ModelNotFitted)
        ));
    }
}
