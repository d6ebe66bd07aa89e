//! Ridge regression (L2 regularization) with a reproducible hold-out split.
//!
//! Minimizes: ||y - ȳ - Zw||² + α||w||²  where Z are the standardized features.
//! The intercept is not penalized, so it equals the mean training target.

use ndarray::{Array1, Array2, ArrayView1};

use super::metrics::Metrics;
use super::scaler::StandardScaler;
use super::{ModelConfig, ModelError};
use crate::data::model::{Dataset, Observation, Variable};
use crate::rng::SimpleRng;

/// Fitted model. Immutable; inference never retrains.
#[derive(Debug, Clone, PartialEq)]
pub struct RidgeModel {
    features: Vec<Variable>,
    target: Variable,
    alpha: f64,
    scaler: StandardScaler,
    weights: Array1<f64>,
    bias: f64,
}

impl RidgeModel {
    pub fn features(&self) -> &[Variable] {
        &self.features
    }

    pub fn target(&self) -> Variable {
        self.target
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    /// Coefficients in standardized feature space.
    pub fn weights(&self) -> &Array1<f64> {
        &self.weights
    }

    pub fn bias(&self) -> f64 {
        self.bias
    }

    /// Predict the target for one feature vector, given in the order of
    /// [`RidgeModel::features`].
    pub fn predict(&self, features: &[f64]) -> Result<f64, ModelError> {
        if features.len() != self.features.len() {
            return Err(ModelError::InvalidInput {
                expected: self.features.len(),
                got: features.len(),
            });
        }
        if let Some(index) = features.iter().position(|v| !v.is_finite()) {
            return Err(ModelError::NonFiniteInput { index });
        }
        let z = self.scaler.transform_row(ArrayView1::from(features));
        Ok(z.dot(&self.weights) + self.bias)
    }

    /// The model's feature vector for an observation, if all cells are present.
    pub fn feature_vector(&self, obs: &Observation) -> Option<Vec<f64>> {
        self.features.iter().map(|&f| obs.value(f)).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvaluationPoint {
    pub actual: f64,
    pub predicted: f64,
}

impl EvaluationPoint {
    pub fn residual(&self) -> f64 {
        self.actual - self.predicted
    }
}

/// Everything produced by one training run.
#[derive(Debug, Clone, PartialEq)]
pub struct FitOutcome {
    pub model: RidgeModel,
    /// Computed on the evaluation partition.
    pub metrics: Metrics,
    /// Dataset positions of the training rows, ascending.
    pub train_rows: Vec<usize>,
    /// `target - prediction` for each entry of `train_rows`.
    pub train_residuals: Vec<f64>,
    /// Dataset positions of the evaluation rows, ascending.
    pub test_rows: Vec<usize>,
    /// Actual vs predicted for each entry of `test_rows`.
    pub evaluation: Vec<EvaluationPoint>,
}

impl FitOutcome {
    /// Held-out residuals, in `test_rows` order. These are the residuals the
    /// reported metrics describe.
    pub fn evaluation_residuals(&self) -> Vec<f64> {
        self.evaluation.iter().map(EvaluationPoint::residual).collect()
    }
}

struct CompleteRow {
    position: usize,
    features: Vec<f64>,
    target: f64,
}

fn complete_rows(dataset: &Dataset, config: &ModelConfig) -> Vec<CompleteRow> {
    dataset
        .iter()
        .enumerate()
        .filter_map(|(position, obs)| {
            let features = config
                .features
                .iter()
                .map(|&f| obs.value(f))
                .collect::<Option<Vec<f64>>>()?;
            Some(CompleteRow {
                position,
                features,
                target: obs.value(config.target)?,
            })
        })
        .collect()
}

/// Reproducible partition of `n` rows into (train, test) positions, each
/// sorted ascending. The test side gets `ceil(n * fraction)` rows, and both
/// sides keep at least one row.
pub fn split_indices(n: usize, test_fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut order: Vec<usize> = (0..n).collect();
    SimpleRng::new(seed).shuffle(&mut order);

    let n_test = ((n as f64 * test_fraction).ceil() as usize).clamp(1, n.saturating_sub(1).max(1));
    let mut test = order[..n_test.min(n)].to_vec();
    let mut train = order[n_test.min(n)..].to_vec();
    test.sort_unstable();
    train.sort_unstable();
    (train, test)
}

fn design_matrix(rows: &[&CompleteRow], n_features: usize) -> (Array2<f64>, Array1<f64>) {
    let mut x = Array2::zeros((rows.len(), n_features));
    for (i, row) in rows.iter().enumerate() {
        for (j, &v) in row.features.iter().enumerate() {
            x[[i, j]] = v;
        }
    }
    let y = rows.iter().map(|r| r.target).collect();
    (x, y)
}

/// Train on the complete rows of `dataset` and evaluate on the held-out part.
pub fn fit(dataset: &Dataset, config: &ModelConfig) -> Result<FitOutcome, ModelError> {
    config.validate()?;

    let rows = complete_rows(dataset, config);
    if rows.len() < 2 {
        return Err(ModelError::InsufficientData {
            required: 2,
            actual: rows.len(),
        });
    }
    let dropped = dataset.len() - rows.len();
    if dropped > 0 {
        log::warn!("Dropped {dropped} rows with missing model inputs");
    }

    let (train_idx, test_idx) = split_indices(rows.len(), config.test_split_fraction, config.seed);
    let train: Vec<&CompleteRow> = train_idx.iter().map(|&i| &rows[i]).collect();
    let test: Vec<&CompleteRow> = test_idx.iter().map(|&i| &rows[i]).collect();

    let p = config.features.len();
    let (x_train, y_train) = design_matrix(&train, p);
    let scaler = StandardScaler::fit(&x_train);
    let z = scaler.transform(&x_train);

    let y_mean = y_train.mean().unwrap_or(0.0);
    let y_centered = &y_train - y_mean;

    // Z'Z + αI
    let mut gram = z.t().dot(&z);
    for i in 0..p {
        gram[[i, i]] += config.ridge_alpha;
    }
    let weights = cholesky_solve(&gram, &z.t().dot(&y_centered))?;

    let model = RidgeModel {
        features: config.features.clone(),
        target: config.target,
        alpha: config.ridge_alpha,
        scaler,
        weights,
        bias: y_mean,
    };

    let train_residuals = train
        .iter()
        .map(|r| model.predict(&r.features).map(|p| r.target - p))
        .collect::<Result<Vec<f64>, ModelError>>()?;
    let evaluation = test
        .iter()
        .map(|r| {
            model.predict(&r.features).map(|predicted| EvaluationPoint {
                actual: r.target,
                predicted,
            })
        })
        .collect::<Result<Vec<_>, ModelError>>()?;

    let actual: Vec<f64> = evaluation.iter().map(|e| e.actual).collect();
    let predicted: Vec<f64> = evaluation.iter().map(|e| e.predicted).collect();
    let metrics = Metrics::calculate(&actual, &predicted, train.len());

    log::info!(
        "Fitted ridge model (alpha {}) on {} rows, held out {}: MAE {:.3}, RMSE {:.3}, R² {:.4}",
        config.ridge_alpha,
        metrics.n_train,
        metrics.n_test,
        metrics.mae,
        metrics.rmse,
        metrics.r2
    );

    Ok(FitOutcome {
        model,
        metrics,
        train_rows: train.iter().map(|r| r.position).collect(),
        train_residuals,
        test_rows: test.iter().map(|r| r.position).collect(),
        evaluation,
    })
}

/// Solve `a x = b` for symmetric positive definite `a` via Cholesky
/// decomposition.
fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Result<Array1<f64>, ModelError> {
    let n = a.nrows();
    let mut l = Array2::<f64>::zeros((n, n));

    for i in 0..n {
        for j in 0..=i {
            let mut sum = 0.0;
            for k in 0..j {
                sum += l[[i, k]] * l[[j, k]];
            }

            if i == j {
                let diag = a[[i, i]] - sum;
                if diag <= 1e-12 {
                    return Err(ModelError::ComputationError(
                        "normal equations are not positive definite".to_string(),
                    ));
                }
                l[[i, j]] = diag.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }

    // Forward substitution: L z = b
    let mut z = Array1::<f64>::zeros(n);
    for i in 0..n {
        let mut sum = 0.0;
        for j in 0..i {
            sum += l[[i, j]] * z[j];
        }
        z[i] = (b[i] - sum) / l[[i, i]];
    }

    // Backward substitution: L' x = z
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut sum = 0.0;
        for j in (i + 1)..n {
            sum += l[[j, i]] * x[j];
        }
        x[i] = (z[i] - sum) / l[[i, i]];
    }

    Ok(x)
}
