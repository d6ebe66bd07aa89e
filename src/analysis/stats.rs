use std::collections::BTreeSet;

use super::AggregateView;
use crate::rng::SimpleRng;

/// Added to the range in min-max scaling so a constant column maps to 0.
pub const NORMALIZE_EPSILON: f64 = 1e-9;

// ---------------------------------------------------------------------------
// Scaling
// ---------------------------------------------------------------------------

/// `(v - min) / (max - min + ε)`. Non-finite inputs come out as `NaN` and do
/// not take part in the min/max.
pub fn min_max_normalize(values: &[f64]) -> Vec<f64> {
    let (lo, hi) = values
        .iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    values
        .iter()
        .map(|&v| {
            if v.is_finite() {
                (v - lo) / (hi - lo + NORMALIZE_EPSILON)
            } else {
                f64::NAN
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Descriptive statistics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation; `None` for a single value.
    pub std: Option<f64>,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}

/// Linear interpolation between closest ranks.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

pub fn summarize(values: &[f64]) -> AggregateView<Summary> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return AggregateView::NoData;
    }
    sorted.sort_by(f64::total_cmp);

    let n = sorted.len();
    let mean = sorted.iter().sum::<f64>() / n as f64;
    let std = (n > 1).then(|| {
        let ss: f64 = sorted.iter().map(|v| (v - mean).powi(2)).sum();
        (ss / (n - 1) as f64).sqrt()
    });

    AggregateView::Ready(Summary {
        count: n,
        mean,
        std,
        min: sorted[0],
        q25: quantile(&sorted, 0.25),
        median: quantile(&sorted, 0.5),
        q75: quantile(&sorted, 0.75),
        max: sorted[n - 1],
    })
}

// ---------------------------------------------------------------------------
// Trend line
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trend {
    pub slope: f64,
    pub intercept: f64,
}

impl Trend {
    pub fn at(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}

/// Degree-1 least-squares fit through `[x, y]` points.
pub fn linear_trend(points: &[[f64; 2]]) -> Option<Trend> {
    if points.len() < 2 {
        return None;
    }
    let n = points.len() as f64;
    let mean_x = points.iter().map(|p| p[0]).sum::<f64>() / n;
    let mean_y = points.iter().map(|p| p[1]).sum::<f64>() / n;
    let sxx: f64 = points.iter().map(|p| (p[0] - mean_x).powi(2)).sum();
    if sxx == 0.0 {
        return None;
    }
    let sxy: f64 = points
        .iter()
        .map(|p| (p[0] - mean_x) * (p[1] - mean_y))
        .sum();
    let slope = sxy / sxx;
    Some(Trend {
        slope,
        intercept: mean_y - slope * mean_x,
    })
}

// ---------------------------------------------------------------------------
// Distributions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    pub start: f64,
    pub bin_width: f64,
    pub counts: Vec<usize>,
}

impl Histogram {
    pub fn bin_center(&self, i: usize) -> f64 {
        self.start + (i as f64 + 0.5) * self.bin_width
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }
}

/// Equal-width bins spanning the data; a single distinct value gets a unit
/// wide range centred on it.
pub fn histogram(values: &[f64], bins: usize) -> AggregateView<Histogram> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() || bins == 0 {
        return AggregateView::NoData;
    }
    let (mut lo, mut hi) = finite
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if lo == hi {
        lo -= 0.5;
        hi += 0.5;
    }
    let bin_width = (hi - lo) / bins as f64;
    let mut counts = vec![0usize; bins];
    for v in finite {
        let idx = (((v - lo) / bin_width) as usize).min(bins - 1);
        counts[idx] += 1;
    }
    AggregateView::Ready(Histogram {
        start: lo,
        bin_width,
        counts,
    })
}

/// Gaussian kernel density estimate on `points` evenly spaced positions
/// between the sample min and max, using Scott's bandwidth rule.
pub fn gaussian_kde(values: &[f64], points: usize) -> AggregateView<Vec<[f64; 2]>> {
    let data: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    let Some(summary) = summarize(&data).into_ready() else {
        return AggregateView::NoData;
    };
    let Some(std) = summary.std.filter(|s| *s > 0.0) else {
        return AggregateView::NoData;
    };
    if points < 2 {
        return AggregateView::NoData;
    }

    let n = data.len() as f64;
    let bandwidth = std * n.powf(-0.2);
    let norm = 1.0 / (n * bandwidth * (2.0 * std::f64::consts::PI).sqrt());
    let step = (summary.max - summary.min) / (points - 1) as f64;

    let curve = (0..points)
        .map(|i| {
            let x = summary.min + step * i as f64;
            let density: f64 = data
                .iter()
                .map(|&xi| (-0.5 * ((x - xi) / bandwidth).powi(2)).exp())
                .sum();
            [x, density * norm]
        })
        .collect();
    AggregateView::Ready(curve)
}

/// Histogram plus its density curve, for one column.
#[derive(Debug, Clone, PartialEq)]
pub struct Distribution {
    pub histogram: Histogram,
    /// `None` when the spread is zero.
    pub density: Option<Vec<[f64; 2]>>,
}

impl Distribution {
    /// The density curve scaled to bar counts so both share one axis.
    pub fn density_as_counts(&self) -> Option<Vec<[f64; 2]>> {
        let scale = self.histogram.total() as f64 * self.histogram.bin_width;
        self.density
            .as_ref()
            .map(|curve| curve.iter().map(|[x, d]| [*x, d * scale]).collect())
    }
}

pub fn distribution(values: &[f64], bins: usize, points: usize) -> AggregateView<Distribution> {
    histogram(values, bins).map(|histogram| Distribution {
        histogram,
        density: gaussian_kde(values, points).into_ready(),
    })
}

// ---------------------------------------------------------------------------
// Subsampling
// ---------------------------------------------------------------------------

/// Distinct years in ascending order, thinned by an even stride when there
/// are more than `max` of them.
pub fn sample_years(years: impl IntoIterator<Item = i32>, max: usize) -> Vec<i32> {
    let distinct: Vec<i32> = years.into_iter().collect::<BTreeSet<_>>().into_iter().collect();
    if max == 0 || distinct.len() <= max {
        return distinct;
    }
    let step = (distinct.len() / max).max(1);
    distinct.into_iter().step_by(step).collect()
}

/// Up to `max` row positions out of `0..n`, chosen reproducibly from `seed`
/// and returned in ascending order.
pub fn sample_indices(n: usize, max: usize, seed: u64) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..n).collect();
    if n <= max {
        return indices;
    }
    SimpleRng::new(seed).shuffle(&mut indices);
    indices.truncate(max);
    indices.sort_unstable();
    indices
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_min_max_normalize_range() {
        let out = min_max_normalize(&[2.0, 4.0, 6.0, 3.0]);
        assert!(out.iter().all(|v| (0.0..=1.0).contains(v)));
        assert_eq!(out[0], 0.0);
        assert!((out[2] - 1.0).abs() < 1e-6);
        assert!((out[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_min_max_normalize_constant_and_nan() {
        assert_eq!(min_max_normalize(&[7.0, 7.0, 7.0]), vec![0.0, 0.0, 0.0]);
        let out = min_max_normalize(&[1.0, f64::NAN, 3.0]);
        assert!(out[1].is_nan());
        assert_eq!(out[0], 0.0);
        assert!(min_max_normalize(&[]).is_empty());
    }

    #[test]
    fn test_summarize_quartiles() {
        let s = summarize(&[4.0, 1.0, 3.0, 2.0, 5.0]).into_ready().unwrap();
        assert_eq!(s.count, 5);
        assert_eq!(s.mean, 3.0);
        assert_eq!((s.min, s.q25, s.median, s.q75, s.max), (1.0, 2.0, 3.0, 4.0, 5.0));
        assert!((s.std.unwrap() - 2.5f64.sqrt()).abs() < 1e-12);

        let single = summarize(&[9.0]).into_ready().unwrap();
        assert_eq!(single.std, None);
        assert_eq!(single.median, 9.0);

        assert!(summarize(&[]).is_no_data());
    }

    #[test]
    fn test_linear_trend() {
        let pts: Vec<[f64; 2]> = (0..5).map(|i| [2000.0 + i as f64, 3.0 + 0.5 * i as f64]).collect();
        let t = linear_trend(&pts).unwrap();
        assert!((t.slope - 0.5).abs() < 1e-9);
        assert!((t.at(2002.0) - 4.0).abs() < 1e-9);
        assert_eq!(linear_trend(&[[1.0, 2.0]]), None);
        assert_eq!(linear_trend(&[[1.0, 2.0], [1.0, 3.0]]), None);
    }

    #[test]
    fn test_histogram_counts() {
        let h = histogram(&[0.0, 1.0, 2.0, 3.0, 4.0, 10.0], 5).into_ready().unwrap();
        assert_eq!(h.counts, vec![2, 2, 1, 0, 1]);
        assert_eq!(h.total(), 6);
        assert_eq!(h.bin_center(0), 1.0);

        let flat = histogram(&[3.0, 3.0], 4).into_ready().unwrap();
        assert_eq!(flat.total(), 2);
        assert!(histogram(&[], 10).is_no_data());
    }

    #[test]
    fn test_kde_integrates_to_about_one() {
        let mut rng = SimpleRng::new(1);
        let data: Vec<f64> = (0..500).map(|_| rng.gauss(0.0, 1.0)).collect();
        let curve = gaussian_kde(&data, 400).into_ready().unwrap();
        assert_eq!(curve.len(), 400);
        let dx = curve[1][0] - curve[0][0];
        let area: f64 = curve.iter().map(|p| p[1] * dx).sum();
        // Tails beyond the sample range are cut off.
        assert!(area > 0.9 && area < 1.01, "area = {area}");

        assert!(gaussian_kde(&[1.0, 1.0, 1.0], 10).is_no_data());
    }

    #[test]
    fn test_distribution_counts_overlay() {
        let values: Vec<f64> = (0..100).map(|i| (i % 10) as f64).collect();
        let dist = distribution(&values, 10, 50).into_ready().unwrap();
        assert_eq!(dist.histogram.total(), 100);
        let curve = dist.density_as_counts().unwrap();
        assert_eq!(curve.len(), 50);
        // Peak density in count units is on the scale of one bar.
        let peak = curve.iter().map(|p| p[1]).fold(0.0, f64::max);
        assert!(peak > 5.0 && peak < 20.0, "peak {peak}");

        let flat = distribution(&[3.0, 3.0], 10, 50).into_ready().unwrap();
        assert!(flat.density.is_none());
        assert!(distribution(&[], 10, 50).is_no_data());
    }

    #[test]
    fn test_sample_years() {
        assert_eq!(sample_years([2003, 2001, 2001, 2002], 6), vec![2001, 2002, 2003]);
        let years: Vec<i32> = (2000..2024).collect();
        assert_eq!(sample_years(years, 6), vec![2000, 2004, 2008, 2012, 2016, 2020]);
    }

    #[test]
    fn test_sample_indices_deterministic() {
        assert_eq!(sample_indices(3, 10, 42), vec![0, 1, 2]);
        let a = sample_indices(5000, 2000, 42);
        let b = sample_indices(5000, 2000, 42);
        assert_eq!(a, b);
        assert_eq!(a.len(), 2000);
        assert!(a.windows(2).all(|w| w[0] < w[1]));
    }
}
