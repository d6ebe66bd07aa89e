//! Evaluation metrics for the held-out partition.

use serde::Serialize;

/// Collection of regression metrics
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Metrics {
    /// Mean Absolute Error
    pub mae: f64,
    /// Root Mean Squared Error
    pub rmse: f64,
    /// R-squared (coefficient of determination)
    pub r2: f64,
    pub n_train: usize,
    pub n_test: usize,
}

impl Metrics {
    /// Compute all metrics from paired actual/predicted values.
    pub fn calculate(y_true: &[f64], y_pred: &[f64], n_train: usize) -> Self {
        Self {
            mae: mean_absolute_error(y_true, y_pred),
            rmse: root_mean_squared_error(y_true, y_pred),
            r2: r_squared(y_true, y_pred),
            n_train,
            n_test: y_true.len(),
        }
    }
}

/// Mean Absolute Error: (1/n) * Σ|y_true - y_pred|
pub fn mean_absolute_error(y_true: &[f64], y_pred: &[f64]) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    y_true
        .iter()
        .zip(y_pred)
        .map(|(&t, &p)| (t - p).abs())
        .sum::<f64>()
        / y_true.len() as f64
}

/// Root Mean Squared Error
pub fn root_mean_squared_error(y_true: &[f64], y_pred: &[f64]) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let mse = y_true
        .iter()
        .zip(y_pred)
        .map(|(&t, &p)| (t - p).powi(2))
        .sum::<f64>()
        / y_true.len() as f64;
    mse.sqrt()
}

/// R² = 1 - SS_res / SS_tot
///
/// A constant target has no variance to explain: a perfect fit scores 1,
/// anything else 0.
pub fn r_squared(y_true: &[f64], y_pred: &[f64]) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let mean = y_true.iter().sum::<f64>() / y_true.len() as f64;
    let ss_res: f64 = y_true
        .iter()
        .zip(y_pred)
        .map(|(&t, &p)| (t - p).powi(2))
        .sum();
    let ss_tot: f64 = y_true.iter().map(|&t| (t - mean).powi(2)).sum();

    if ss_tot < 1e-12 {
        return if ss_res < 1e-12 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_values() {
        let y_true = [3.0, -0.5, 2.0, 7.0];
        let y_pred = [2.5, 0.0, 2.0, 8.0];
        let m = Metrics::calculate(&y_true, &y_pred, 10);

        assert!((m.mae - 0.5).abs() < 1e-12);
        assert!((m.rmse - 0.375f64.sqrt()).abs() < 1e-12);
        assert!((m.r2 - 0.9486081370449679).abs() < 1e-12);
        assert_eq!((m.n_train, m.n_test), (10, 4));
    }

    #[test]
    fn test_rmse_dominates_mae() {
        let y_true = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y_pred = [1.1, 2.5, 2.0, 4.0, 7.0];
        let m = Metrics::calculate(&y_true, &y_pred, 0);
        assert!(m.mae >= 0.0 && m.rmse >= 0.0);
        assert!(m.rmse >= m.mae);
    }

    #[test]
    fn test_constant_target() {
        assert_eq!(r_squared(&[2.0, 2.0], &[2.0, 2.0]), 1.0);
        assert_eq!(r_squared(&[2.0, 2.0], &[1.0, 3.0]), 0.0);
    }
}
