//! Decision tree implementation
//!
//! A CART-style binary tree. Classification leaves hold the positive-class
//! fraction of their training samples, so one structure serves both hard
//! labels (threshold at 0.5) and probabilities. Variance-criterion trees are
//! also used internally as the base learner for gradient boosting.

use crate::error::{FairtuneError, Result};
use ndarray::{Array1, Array2};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Decision tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf node; `value` is the mean of the training targets reaching it
    /// (the positive-class fraction under the Gini criterion)
    Leaf { value: f64, n_samples: usize },
    /// Internal node with a threshold split
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
    },
}

/// Split quality criterion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SplitCriterion {
    /// Gini impurity; targets are 0/1 class labels
    Gini,
    /// Variance reduction; targets are continuous (boosting residuals)
    Variance,
}

/// Decision tree model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    root: Option<TreeNode>,
    /// Maximum depth; unlimited when absent
    pub max_depth: Option<usize>,
    /// Minimum samples required to attempt a split
    pub min_samples_split: usize,
    /// Minimum samples per leaf
    pub min_samples_leaf: usize,
    /// Split criterion
    pub criterion: SplitCriterion,
    n_features: usize,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::classifier()
    }
}

impl DecisionTree {
    /// Create a classification tree (Gini criterion, probability leaves)
    pub fn classifier() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            criterion: SplitCriterion::Gini,
            n_features: 0,
        }
    }

    /// Create a regression tree for fitting continuous targets
    pub fn regressor() -> Self {
        Self {
            criterion: SplitCriterion::Variance,
            ..Self::classifier()
        }
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Set minimum samples to split
    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples;
        self
    }

    /// Set minimum samples in leaf
    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples;
        self
    }

    /// Untrained copy preserving the hyperparameters
    pub fn fresh(&self) -> Self {
        Self {
            root: None,
            n_features: 0,
            ..self.clone()
        }
    }

    /// Fit the tree to training data
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let n_samples = x.nrows();

        if n_samples != y.len() {
            return Err(FairtuneError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 {
            return Err(FairtuneError::ValidationError(
                "cannot fit a tree on zero samples".to_string(),
            ));
        }

        self.n_features = x.ncols();
        let indices: Vec<usize> = (0..n_samples).collect();
        self.root = Some(self.build_node(x, y, &indices, 0));
        Ok(())
    }

    fn build_node(&self, x: &Array2<f64>, y: &Array1<f64>, indices: &[usize], depth: usize) -> TreeNode {
        let n_samples = indices.len();
        let leaf_value = mean_of(y, indices);

        let should_stop = n_samples < self.min_samples_split
            || self.max_depth.map_or(false, |d| depth >= d)
            || is_constant(y, indices);

        if should_stop {
            return TreeNode::Leaf {
                value: leaf_value,
                n_samples,
            };
        }

        match self.find_best_split(x, y, indices) {
            Some((feature_idx, threshold)) => {
                let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
                    .iter()
                    .partition(|&&i| x[[i, feature_idx]] <= threshold);

                if left_indices.len() < self.min_samples_leaf
                    || right_indices.len() < self.min_samples_leaf
                {
                    return TreeNode::Leaf {
                        value: leaf_value,
                        n_samples,
                    };
                }

                let left = Box::new(self.build_node(x, y, &left_indices, depth + 1));
                let right = Box::new(self.build_node(x, y, &right_indices, depth + 1));
                TreeNode::Split {
                    feature_idx,
                    threshold,
                    left,
                    right,
                    n_samples,
                }
            }
            None => TreeNode::Leaf {
                value: leaf_value,
                n_samples,
            },
        }
    }

    fn find_best_split(&self, x: &Array2<f64>, y: &Array1<f64>, indices: &[usize]) -> Option<(usize, f64)> {
        let parent_impurity = self.impurity(stats_of(y, indices));
        let n = indices.len() as f64;

        // Each feature independently scans its candidate thresholds
        let per_feature: Vec<Option<(usize, f64, f64)>> = (0..x.ncols())
            .into_par_iter()
            .map(|feature_idx| {
                let mut values: Vec<f64> = indices.iter().map(|&i| x[[i, feature_idx]]).collect();
                values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
                values.dedup();

                let mut best_gain = 0.0f64;
                let mut best_threshold = None;

                for window in values.windows(2) {
                    let threshold = (window[0] + window[1]) / 2.0;

                    let mut left = SplitStats::default();
                    let mut right = SplitStats::default();
                    for &idx in indices {
                        let target = y[idx];
                        if x[[idx, feature_idx]] <= threshold {
                            left.push(target);
                        } else {
                            right.push(target);
                        }
                    }

                    if left.count < self.min_samples_leaf || right.count < self.min_samples_leaf {
                        continue;
                    }

                    let weighted = (left.count as f64 * self.impurity(left)
                        + right.count as f64 * self.impurity(right))
                        / n;
                    let gain = parent_impurity - weighted;
                    if gain > best_gain {
                        best_gain = gain;
                        best_threshold = Some(threshold);
                    }
                }

                best_threshold.map(|t| (feature_idx, t, best_gain))
            })
            .collect();

        per_feature
            .into_iter()
            .flatten()
            .max_by(|a, b| a.2.partial_cmp(&b.2).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(feature_idx, threshold, _)| (feature_idx, threshold))
    }

    fn impurity(&self, stats: SplitStats) -> f64 {
        if stats.count == 0 {
            return 0.0;
        }
        let n = stats.count as f64;
        match self.criterion {
            SplitCriterion::Gini => {
                // Binary targets: sum counts the positives
                let p = stats.sum / n;
                2.0 * p * (1.0 - p)
            }
            SplitCriterion::Variance => stats.sq_sum / n - (stats.sum / n).powi(2),
        }
    }

    /// Per-sample leaf value: positive-class probability under Gini, raw
    /// regression output under Variance
    pub fn predict_value(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let root = self.root.as_ref().ok_or(FairtuneError::ModelNotFitted)?;
        let values: Vec<f64> = (0..x.nrows())
            .map(|i| leaf_value(root, &x.row(i).to_vec()))
            .collect();
        Ok(Array1::from_vec(values))
    }

    /// Hard class labels (classification trees)
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let proba = self.predict_value(x)?;
        Ok(proba.mapv(|p| if p >= 0.5 { 1.0 } else { 0.0 }))
    }

    /// Tree depth (number of levels)
    pub fn depth(&self) -> usize {
        fn node_depth(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => 1 + node_depth(left).max(node_depth(right)),
            }
        }
        self.root.as_ref().map_or(0, node_depth)
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct SplitStats {
    count: usize,
    sum: f64,
    sq_sum: f64,
}

impl SplitStats {
    fn push(&mut self, target: f64) {
        self.count += 1;
        self.sum += target;
        self.sq_sum += target * target;
    }
}

fn stats_of(y: &Array1<f64>, indices: &[usize]) -> SplitStats {
    let mut stats = SplitStats::default();
    for &i in indices {
        stats.push(y[i]);
    }
    stats
}

fn mean_of(y: &Array1<f64>, indices: &[usize]) -> f64 {
    if indices.is_empty() {
        return 0.0;
    }
    indices.iter().map(|&i| y[i]).sum::<f64>() / indices.len() as f64
}

fn is_constant(y: &Array1<f64>, indices: &[usize]) -> bool {
    match indices.first() {
        None => true,
        Some(&first) => indices.iter().all(|&i| (y[i] - y[first]).abs() < 1e-12),
    }
}

fn leaf_value(node: &TreeNode, sample: &[f64]) -> f64 {
    match node {
        TreeNode::Leaf { value, .. } => *value,
        TreeNode::Split {
            feature_idx,
            threshold,
            left,
            right,
            ..
        } => {
            if sample[*feature_idx] <= *threshold {
                leaf_value(left, sample)
            } else {
                leaf_value(right, sample)
            }
        }
    }
}
