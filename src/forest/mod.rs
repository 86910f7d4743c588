mod tree;

pub use tree::RegressionTree;

use nalgebra::{DMatrix, DVector};
use rand::{Rng, SeedableRng, rngs::StdRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fewest rows a forest can be fit on.
pub const MIN_SAMPLES: usize = 1;

#[derive(Debug, Error, PartialEq)]
pub enum ForestError {
    #[error("expected at least {required} samples but got {rows}")]
    NotEnoughSamples { rows: usize, required: usize },
    #[error("inputs have {inputs} rows but outputs have {outputs}")]
    RowMismatch { inputs: usize, outputs: usize },
    #[error("expected {expected} input features but got {actual}")]
    FeatureMismatch { expected: usize, actual: usize },
    #[error("invalid forest configuration: {0}")]
    InvalidConfig(&'static str),
}

/// Parameters of a [`RandomForest`] fit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestConfig {
    /// Number of trees in the ensemble.
    pub n_trees: usize,

    /// Grow trees no deeper than this. Unlimited if `None`.
    pub max_depth: Option<usize>,

    /// Nodes with fewer samples become leaves.
    pub min_samples_split: usize,

    /// Every leaf keeps at least this many samples.
    pub min_samples_leaf: usize,

    /// Features considered at each split. All features if `None`.
    pub max_features: Option<usize>,

    /// Fit each tree on a bootstrap sample instead of every row.
    pub bootstrap: bool,

    /// Seed of the first tree. Tree `t` uses `seed + t`.
    pub seed: u64,

    /// Grow the trees on the rayon thread pool. The fitted forest is the same
    /// either way.
    pub parallel: bool,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            bootstrap: true,
            seed: 0,
            parallel: false,
        }
    }
}

impl ForestConfig {
    fn validate(&self) -> Result<(), ForestError> {
        if self.n_trees == 0 {
            return Err(ForestError::InvalidConfig("n_trees must be at least 1"));
        }
        if self.min_samples_split < 2 {
            return Err(ForestError::InvalidConfig(
                "min_samples_split must be at least 2",
            ));
        }
        if self.min_samples_leaf == 0 {
            return Err(ForestError::InvalidConfig(
                "min_samples_leaf must be at least 1",
            ));
        }
        if self.max_features == Some(0) {
            return Err(ForestError::InvalidConfig("max_features must be at least 1"));
        }
        Ok(())
    }
}

/// An ensemble of regression trees whose predictions are averaged.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    inputs: usize,
    outputs: usize,
    trees: Vec<RegressionTree>,
}

impl RandomForest {
    /// Fit a forest mapping each row of `x` to the same row of `y`.
    pub fn fit(
        x: &DMatrix<f64>,
        y: &DMatrix<f64>,
        config: &ForestConfig,
    ) -> Result<Self, ForestError> {
        config.validate()?;

        let rows = x.nrows();
        if rows != y.nrows() {
            return Err(ForestError::RowMismatch {
                inputs: rows,
                outputs: y.nrows(),
            });
        }
        if rows < MIN_SAMPLES {
            return Err(ForestError::NotEnoughSamples {
                rows,
                required: MIN_SAMPLES,
            });
        }

        let grow = |t: usize| {
            let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(t as u64));
            let samples: Vec<usize> = match config.bootstrap {
                true => (0..rows).map(|_| rng.random_range(0..rows)).collect(),
                false => (0..rows).collect(),
            };
            RegressionTree::fit(x, y, samples, config, &mut rng)
        };
        let trees: Vec<RegressionTree> = match config.parallel {
            true => (0..config.n_trees).into_par_iter().map(grow).collect(),
            false => (0..config.n_trees).map(grow).collect(),
        };

        Ok(Self {
            inputs: x.ncols(),
            outputs: y.ncols(),
            trees,
        })
    }

    pub fn inputs(&self) -> usize {
        self.inputs
    }

    pub fn outputs(&self) -> usize {
        self.outputs
    }

    pub fn trees(&self) -> &[RegressionTree] {
        &self.trees
    }

    /// Predict the output for a single input row.
    pub fn predict_row(&self, row: &[f64]) -> Result<DVector<f64>, ForestError> {
        if row.len() != self.inputs {
            return Err(ForestError::FeatureMismatch {
                expected: self.inputs,
                actual: row.len(),
            });
        }

        let mut sum = DVector::zeros(self.outputs);
        for tree in &self.trees {
            sum += DVector::from_vec(tree.predict_row(row).to_vec());
        }
        Ok(sum / self.trees.len() as f64)
    }

    /// Predict the output for every row of `x`.
    pub fn predict(&self, x: &DMatrix<f64>) -> Result<DMatrix<f64>, ForestError> {
        if x.ncols() != self.inputs {
            return Err(ForestError::FeatureMismatch {
                expected: self.inputs,
                actual: x.ncols(),
            });
        }

        let rows: Vec<DVector<f64>> = x
            .row_iter()
            .map(|row| {
                let row: Vec<f64> = row.iter().copied().collect();
                self.predict_row(&row)
            })
            .collect::<Result<_, _>>()?;

        Ok(DMatrix::from_fn(x.nrows(), self.outputs, |r, c| rows[r][c]))
    }
}

/// Mean over rows of the squared Euclidean distance between `predicted` and `target`.
///
/// Returns NaN when both matrices have no rows.
///
/// # Panics
///
/// Panics if the shapes differ.
pub fn mean_squared_error(predicted: &DMatrix<f64>, target: &DMatrix<f64>) -> f64 {
    assert_eq!(predicted.shape(), target.shape());
    let diff = predicted - target;
    diff.row_iter().map(|row| row.norm_squared()).sum::<f64>() / diff.nrows() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    /// Noiseless `after = before + offset` data.
    fn offset_data(rows: usize) -> (DMatrix<f64>, DMatrix<f64>) {
        let x = DMatrix::from_fn(rows, 2, |r, c| [0.01 * r as f64, 0.5 - 0.007 * r as f64][c]);
        let y = DMatrix::from_fn(rows, 2, |r, c| x[(r, c)] + [0.003, -0.002][c]);
        (x, y)
    }

    #[test]
    fn fits_training_data_without_bootstrap() {
        let (x, y) = offset_data(30);
        let config = ForestConfig {
            n_trees: 10,
            bootstrap: false,
            ..ForestConfig::default()
        };
        let forest = RandomForest::fit(&x, &y, &config).unwrap();

        let predicted = forest.predict(&x).unwrap();
        assert!(mean_squared_error(&predicted, &y) < 1e-12);
    }

    #[test]
    fn bootstrap_fit_is_close() {
        let (x, y) = offset_data(60);
        let forest = RandomForest::fit(&x, &y, &ForestConfig::default()).unwrap();

        let predicted = forest.predict(&x).unwrap();
        assert!(mean_squared_error(&predicted, &y) < 1e-3);
    }

    #[test]
    fn same_seed_same_forest() {
        let (x, y) = offset_data(25);
        let config = ForestConfig {
            n_trees: 8,
            max_features: Some(1),
            seed: 42,
            ..ForestConfig::default()
        };
        let a = RandomForest::fit(&x, &y, &config).unwrap();
        let b = RandomForest::fit(&x, &y, &config).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn parallel_fit_matches_sequential() {
        let (x, y) = offset_data(40);
        let sequential = ForestConfig {
            n_trees: 12,
            seed: 7,
            ..ForestConfig::default()
        };
        let parallel = ForestConfig {
            parallel: true,
            ..sequential.clone()
        };

        let a = RandomForest::fit(&x, &y, &sequential).unwrap();
        let b = RandomForest::fit(&x, &y, &parallel).unwrap();
        assert_eq!(a.trees().len(), 12);
        assert_eq!(a, b);
    }

    #[test]
    fn single_row() {
        let x = DMatrix::from_row_slice(1, 3, &[1.0, 2.0, 3.0]);
        let y = DMatrix::from_row_slice(1, 3, &[4.0, 5.0, 6.0]);
        let forest = RandomForest::fit(&x, &y, &ForestConfig::default()).unwrap();

        let predicted = forest.predict_row(&[0.0, 0.0, 0.0]).unwrap();
        assert_relative_eq!(predicted, DVector::from_vec(vec![4.0, 5.0, 6.0]));
    }

    #[test]
    fn empty_table() {
        let x = DMatrix::<f64>::zeros(0, 2);
        let y = DMatrix::<f64>::zeros(0, 2);
        assert_eq!(
            RandomForest::fit(&x, &y, &ForestConfig::default()),
            Err(ForestError::NotEnoughSamples {
                rows: 0,
                required: MIN_SAMPLES
            })
        );
    }

    #[test]
    fn row_mismatch() {
        let x = DMatrix::<f64>::zeros(3, 2);
        let y = DMatrix::<f64>::zeros(2, 2);
        assert!(matches!(
            RandomForest::fit(&x, &y, &ForestConfig::default()),
            Err(ForestError::RowMismatch { inputs: 3, outputs: 2 })
        ));
    }

    #[test]
    fn predict_checks_width() {
        let (x, y) = offset_data(5);
        let forest = RandomForest::fit(&x, &y, &ForestConfig::default()).unwrap();
        assert_eq!(
            forest.predict_row(&[1.0]),
            Err(ForestError::FeatureMismatch {
                expected: 2,
                actual: 1
            })
        );
    }

    #[rstest]
    #[case(ForestConfig { n_trees: 0, ..ForestConfig::default() })]
    #[case(ForestConfig { min_samples_split: 1, ..ForestConfig::default() })]
    #[case(ForestConfig { min_samples_leaf: 0, ..ForestConfig::default() })]
    #[case(ForestConfig { max_features: Some(0), ..ForestConfig::default() })]
    fn rejects_invalid_config(#[case] config: ForestConfig) {
        let (x, y) = offset_data(5);
        assert!(matches!(
            RandomForest::fit(&x, &y, &config),
            Err(ForestError::InvalidConfig(_))
        ));
    }

    #[test]
    fn mean_squared_error_is_per_row() {
        let predicted = DMatrix::from_row_slice(2, 2, &[0.0, 0.0, 1.0, 1.0]);
        let target = DMatrix::from_row_slice(2, 2, &[3.0, 4.0, 1.0, 1.0]);
        assert_relative_eq!(mean_squared_error(&predicted, &target), 12.5);
    }

    #[test]
    fn mean_squared_error_of_no_rows_is_nan() {
        let empty = DMatrix::<f64>::zeros(0, 3);
        assert!(mean_squared_error(&empty, &empty).is_nan());
    }

    #[test]
    #[should_panic]
    fn mean_squared_error_panics_on_shape_mismatch() {
        mean_squared_error(&DMatrix::zeros(2, 2), &DMatrix::zeros(2, 3));
    }

    #[test]
    fn config_defaults_fill_missing_fields() {
        let config: ForestConfig = serde_json::from_str(r#"{"n_trees": 7}"#).unwrap();
        assert_eq!(
            config,
            ForestConfig {
                n_trees: 7,
                ..ForestConfig::default()
            }
        );
    }
}
