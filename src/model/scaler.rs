use ndarray::{Array1, Array2, ArrayView1, Axis};

/// Per-column standardization `(x - mean) / scale`.
///
/// Uses the population standard deviation; a constant column gets scale 1 so
/// it maps to zero instead of dividing by zero.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    pub means: Array1<f64>,
    pub scales: Array1<f64>,
}

impl StandardScaler {
    /// Fit on the rows of `x`. `x` must have at least one row.
    pub fn fit(x: &Array2<f64>) -> Self {
        let means = x
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::zeros(x.ncols()));
        let scales = x
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s < 1e-12 { 1.0 } else { s });
        Self { means, scales }
    }

    pub fn transform(&self, x: &Array2<f64>) -> Array2<f64> {
        (x - &self.means) / &self.scales
    }

    pub fn transform_row(&self, row: ArrayView1<'_, f64>) -> Array1<f64> {
        (&row - &self.means) / &self.scales
    }
}
