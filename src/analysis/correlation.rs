use std::fmt;

use super::AggregateView;
use crate::data::model::{Dataset, Variable};

/// Pairwise Pearson correlations over a column set.
///
/// Undefined entries (zero variance, fewer than two paired rows) are stored as
/// `NaN` and surface as `None` from [`CorrelationMatrix::get`].
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    pub columns: Vec<Variable>,
    values: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    pub fn size(&self) -> usize {
        self.columns.len()
    }

    pub fn get(&self, i: usize, j: usize) -> Option<f64> {
        let v = *self.values.get(i)?.get(j)?;
        (!v.is_nan()).then_some(v)
    }

    /// Upper-triangle pairs ordered by absolute correlation, strongest first;
    /// undefined pairs go last.
    pub fn pairs(&self) -> Vec<CorrelationPair> {
        let mut pairs = Vec::new();
        for i in 0..self.size() {
            for j in (i + 1)..self.size() {
                let r = self.get(i, j);
                pairs.push(CorrelationPair {
                    first: self.columns[i],
                    second: self.columns[j],
                    r,
                    strength: Strength::of(r),
                });
            }
        }
        pairs.sort_by(|a, b| {
            let key = |p: &CorrelationPair| p.r.map_or(-1.0, f64::abs);
            key(b).total_cmp(&key(a))
        });
        pairs
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strength {
    Strong,
    Moderate,
    Weak,
    Undefined,
}

impl Strength {
    pub fn of(r: Option<f64>) -> Strength {
        match r.map(f64::abs) {
            None => Strength::Undefined,
            Some(a) if a > 0.5 => Strength::Strong,
            Some(a) if a > 0.3 => Strength::Moderate,
            Some(_) => Strength::Weak,
        }
    }
}

impl fmt::Display for Strength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Strength::Strong => "Strong",
            Strength::Moderate => "Moderate",
            Strength::Weak => "Weak",
            Strength::Undefined => "Undefined",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationPair {
    pub first: Variable,
    pub second: Variable,
    pub r: Option<f64>,
    pub strength: Strength,
}

fn is_constant(values: &[f64]) -> bool {
    values.windows(2).all(|w| w[0] == w[1])
}

/// Pearson correlation of two equally long samples. `None` when either side
/// is constant or there are fewer than two points.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    let n = xs.len().min(ys.len());
    if n < 2 || is_constant(&xs[..n]) || is_constant(&ys[..n]) {
        return None;
    }
    let mean_x = xs[..n].iter().sum::<f64>() / n as f64;
    let mean_y = ys[..n].iter().sum::<f64>() / n as f64;

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (&x, &y) in xs[..n].iter().zip(&ys[..n]) {
        let (dx, dy) = (x - mean_x, y - mean_y);
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    let denom = (sxx * syy).sqrt();
    if denom == 0.0 || !denom.is_finite() {
        return None;
    }
    Some((sxy / denom).clamp(-1.0, 1.0))
}

/// Correlation matrix using, for each pair, the rows where both cells are
/// present. The diagonal is exactly 1.0 for any non-constant column.
pub fn correlation_matrix(dataset: &Dataset, columns: &[Variable]) -> AggregateView<CorrelationMatrix> {
    if dataset.is_empty() || columns.is_empty() {
        return AggregateView::NoData;
    }

    let k = columns.len();
    let mut values = vec![vec![f64::NAN; k]; k];
    for i in 0..k {
        let own = dataset.column(columns[i]);
        if own.len() >= 2 && !is_constant(&own) {
            values[i][i] = 1.0;
        }
        for j in (i + 1)..k {
            let (xs, ys): (Vec<f64>, Vec<f64>) = dataset
                .iter()
                .filter_map(|o| Some((o.value(columns[i])?, o.value(columns[j])?)))
                .unzip();
            let r = pearson(&xs, &ys).unwrap_or(f64::NAN);
            values[i][j] = r;
            values[j][i] = r;
        }
    }

    AggregateView::Ready(CorrelationMatrix {
        columns: columns.to_vec(),
        values,
    })
}
