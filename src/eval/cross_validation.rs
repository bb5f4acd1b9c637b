//! K-fold cross-validated prediction

use crate::error::{FairtuneError, Result};
use crate::models::{Classifier, ClassifierModel};
use ndarray::{Array1, Array2, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

/// Default number of folds used by the evaluator
pub const DEFAULT_FOLDS: usize = 10;

/// A single train/test split
#[derive(Debug, Clone)]
pub struct FoldSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    pub fold_idx: usize,
}

/// Plain k-fold splitter.
///
/// Unshuffled by default: folds are contiguous index ranges, so repeated runs
/// produce identical out-of-fold predictions.
#[derive(Debug, Clone)]
pub struct KFold {
    n_splits: usize,
    shuffle_seed: Option<u64>,
}

impl KFold {
    pub fn new(n_splits: usize) -> Self {
        Self {
            n_splits,
            shuffle_seed: None,
        }
    }

    /// Shuffle record order with a fixed seed before partitioning
    pub fn with_shuffle(mut self, seed: u64) -> Self {
        self.shuffle_seed = Some(seed);
        self
    }

    /// Partition `n_samples` records into train/test splits.
    ///
    /// The test sets form a complete, non-overlapping cover: every index
    /// appears in exactly one test set.
    pub fn split(&self, n_samples: usize) -> Result<Vec<FoldSplit>> {
        if self.n_splits < 2 {
            return Err(FairtuneError::ValidationError(
                "n_splits must be at least 2".to_string(),
            ));
        }
        if n_samples < self.n_splits {
            return Err(FairtuneError::ValidationError(format!(
                "n_samples ({}) must be >= n_splits ({})",
                n_samples, self.n_splits
            )));
        }

        let mut indices: Vec<usize> = (0..n_samples).collect();
        if let Some(seed) = self.shuffle_seed {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            indices.shuffle(&mut rng);
        }

        let fold_sizes: Vec<usize> = (0..self.n_splits)
            .map(|i| {
                let base = n_samples / self.n_splits;
                let remainder = n_samples % self.n_splits;
                if i < remainder {
                    base + 1
                } else {
                    base
                }
            })
            .collect();

        let mut splits = Vec::with_capacity(self.n_splits);
        let mut current = 0;
        for fold_idx in 0..self.n_splits {
            let fold_size = fold_sizes[fold_idx];
            let test_indices: Vec<usize> = indices[current..current + fold_size].to_vec();
            let train_indices: Vec<usize> = indices[..current]
                .iter()
                .chain(indices[current + fold_size..].iter())
                .copied()
                .collect();

            splits.push(FoldSplit {
                train_indices,
                test_indices,
                fold_idx,
            });
            current += fold_size;
        }

        Ok(splits)
    }
}

/// Out-of-fold predictions covering every record exactly once
#[derive(Debug, Clone)]
pub struct OutOfFoldPredictions {
    /// Hard labels per record
    pub labels: Array1<f64>,
    /// Positive-class probabilities per record
    pub probabilities: Array1<f64>,
}

/// Cross-validated prediction.
///
/// Each fold fits a fresh untrained instance of `model`'s configuration on
/// the training portion, then records held-out hard labels and positive-class
/// probabilities. Folds run in parallel; each record's prediction is written
/// by exactly the fold holding it out.
pub fn cross_val_predict(
    model: &ClassifierModel,
    x: &Array2<f64>,
    y: &Array1<f64>,
    folds: usize,
) -> Result<OutOfFoldPredictions> {
    let n = x.nrows();
    if n != y.len() {
        return Err(FairtuneError::ShapeError {
            expected: format!("y length = {}", n),
            actual: format!("y length = {}", y.len()),
        });
    }

    let splits = KFold::new(folds).split(n)?;

    let fold_results: Vec<(Vec<usize>, Array1<f64>, Array1<f64>)> = splits
        .into_par_iter()
        .map(|split| {
            let x_train = x.select(Axis(0), &split.train_indices);
            let y_train: Array1<f64> =
                Array1::from_vec(split.train_indices.iter().map(|&i| y[i]).collect());
            let x_test = x.select(Axis(0), &split.test_indices);

            let mut fold_model = model.fresh();
            fold_model.fit(&x_train, &y_train)?;
            let labels = fold_model.predict(&x_test)?;
            let probabilities = fold_model.predict_proba(&x_test)?;
            Ok((split.test_indices, labels, probabilities))
        })
        .collect::<Result<_>>()?;

    let mut labels = Array1::<f64>::zeros(n);
    let mut probabilities = Array1::<f64>::zeros(n);
    for (test_indices, fold_labels, fold_probabilities) in fold_results {
        for (pos, &record) in test_indices.iter().enumerate() {
            labels[record] = fold_labels[pos];
            probabilities[record] = fold_probabilities[pos];
        }
    }

    Ok(OutOfFoldPredictions {
        labels,
        probabilities,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ClassifierKind;

    #[test]
    fn test_k_fold_covers_every_index_exactly_once() {
        let splits = KFold::new(5).split(103).unwrap();
        assert_eq!(splits.len(), 5);

        let mut all_test: Vec<usize> = splits.iter().flat_map(|s| s.test_indices.clone()).collect();
        all_test.sort_unstable();
        assert_eq!(all_test, (0..103).collect::<Vec<_>>());

        for split in &splits {
            assert_eq!(split.train_indices.len() + split.test_indices.len(), 103);
            for idx in &split.test_indices {
                assert!(!split.train_indices.contains(idx));
            }
        }
    }

    #[test]
    fn test_k_fold_rejects_too_few_samples() {
        assert!(KFold::new(10).split(5).is_err());
        assert!(KFold::new(1).split(100).is_err());
    }

    #[test]
    fn test_shuffled_split_still_covers() {
        let splits = KFold::new(4).split(20).unwrap();
        let shuffled = KFold::new(4).with_shuffle(42).split(20).unwrap();

        let cover = |splits: &[FoldSplit]| {
            let mut v: Vec<usize> = splits.iter().flat_map(|s| s.test_indices.clone()).collect();
            v.sort_unstable();
            v
        };
        assert_eq!(cover(&splits), cover(&shuffled));
    }

    #[test]
    fn test_cross_val_predict_covers_all_records() {
        let n = 40;
        let x = Array2::from_shape_fn((n, 2), |(i, j)| (i * 2 + j) as f64 * 0.1);
        let y: Array1<f64> = (0..n).map(|i| if i >= n / 2 { 1.0 } else { 0.0 }).collect();

        let model = ClassifierModel::with_defaults(ClassifierKind::DecisionTree);
        let oof = cross_val_predict(&model, &x, &y, 4).unwrap();

        assert_eq!(oof.labels.len(), n);
        assert_eq!(oof.probabilities.len(), n);
        for (&l, &p) in oof.labels.iter().zip(oof.probabilities.iter()) {
            assert!(l == 0.0 || l == 1.0);
            assert!((0.0..=1.0).contains(&p));
        }
    }
}
