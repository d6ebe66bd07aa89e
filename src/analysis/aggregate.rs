use std::collections::BTreeMap;

use super::stats::{
    linear_trend, sample_indices, sample_years, summarize, Summary, Trend, NORMALIZE_EPSILON,
};
use super::AggregateView;
use crate::data::model::{month_abbreviation, Dataset, Observation, Variable};

// ---------------------------------------------------------------------------
// Grouped means by year / month
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Year,
    Month,
}

/// Group label. Ordering is the natural order of the dimension: ascending
/// year, calendar month order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GroupKey {
    Year(i32),
    /// 1..=12
    Month(u32),
}

impl GroupKey {
    fn of(dimension: Dimension, obs: &Observation) -> Option<GroupKey> {
        match dimension {
            Dimension::Year => obs.year().map(GroupKey::Year),
            Dimension::Month => obs.month().map(GroupKey::Month),
        }
    }

    /// Axis position for plotting.
    pub fn as_f64(self) -> f64 {
        match self {
            GroupKey::Year(y) => y as f64,
            GroupKey::Month(m) => m as f64,
        }
    }

    pub fn label(self) -> String {
        match self {
            GroupKey::Year(y) => y.to_string(),
            GroupKey::Month(m) => month_abbreviation(m).unwrap_or("?").to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupRow {
    pub key: GroupKey,
    /// One entry per column of [`GroupedMeans::columns`]; `None` when the
    /// group has no value for that column.
    pub means: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupedMeans {
    pub dimension: Dimension,
    pub columns: Vec<Variable>,
    pub rows: Vec<GroupRow>,
}

impl GroupedMeans {
    pub fn get(&self, key: GroupKey, column: Variable) -> Option<f64> {
        let col = self.columns.iter().position(|&c| c == column)?;
        self.rows
            .iter()
            .find(|r| r.key == key)
            .and_then(|r| r.means[col])
    }

    /// `(key, mean)` pairs of one column, skipping groups without a value.
    pub fn series(&self, column: Variable) -> Vec<(GroupKey, f64)> {
        let Some(col) = self.columns.iter().position(|&c| c == column) else {
            return Vec::new();
        };
        self.rows
            .iter()
            .filter_map(|r| r.means[col].map(|m| (r.key, m)))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Accumulator {
    sum: f64,
    count: usize,
}

impl Accumulator {
    fn push(&mut self, v: f64) {
        self.sum += v;
        self.count += 1;
    }

    fn mean(self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

/// Mean of each column per group. Rows missing the grouping key are skipped.
pub fn group_mean(
    dataset: &Dataset,
    dimension: Dimension,
    columns: &[Variable],
) -> AggregateView<GroupedMeans> {
    let mut groups: BTreeMap<GroupKey, Vec<Accumulator>> = BTreeMap::new();
    for obs in dataset {
        let Some(key) = GroupKey::of(dimension, obs) else {
            continue;
        };
        let accs = groups
            .entry(key)
            .or_insert_with(|| vec![Accumulator::default(); columns.len()]);
        for (acc, &col) in accs.iter_mut().zip(columns) {
            if let Some(v) = obs.value(col) {
                acc.push(v);
            }
        }
    }

    if groups.is_empty() {
        return AggregateView::NoData;
    }

    let rows = groups
        .into_iter()
        .map(|(key, accs)| GroupRow {
            key,
            means: accs.into_iter().map(Accumulator::mean).collect(),
        })
        .collect();
    AggregateView::Ready(GroupedMeans {
        dimension,
        columns: columns.to_vec(),
        rows,
    })
}

// ---------------------------------------------------------------------------
// Per-country rankings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct CountryMean {
    pub country: String,
    pub mean: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankOrder {
    Descending,
    Ascending,
}

/// Mean of `column` per country, in ascending country-name order.
/// Countries without any value for the column are left out.
pub fn country_means(dataset: &Dataset, column: Variable) -> Vec<CountryMean> {
    let mut groups: BTreeMap<&str, Accumulator> = BTreeMap::new();
    for obs in dataset {
        if let Some(v) = obs.value(column) {
            groups.entry(obs.country.as_str()).or_default().push(v);
        }
    }
    groups
        .into_iter()
        .filter_map(|(country, acc)| {
            acc.mean().map(|mean| CountryMean {
                country: country.to_string(),
                mean,
            })
        })
        .collect()
}

/// First `k` entries after a stable sort, so equal means keep the grouped
/// (alphabetical) order.
pub fn rank(means: &[CountryMean], k: usize, order: RankOrder) -> AggregateView<Vec<CountryMean>> {
    if means.is_empty() {
        return AggregateView::NoData;
    }
    let mut ranked = means.to_vec();
    match order {
        RankOrder::Descending => ranked.sort_by(|a, b| b.mean.total_cmp(&a.mean)),
        RankOrder::Ascending => ranked.sort_by(|a, b| a.mean.total_cmp(&b.mean)),
    }
    ranked.truncate(k);
    AggregateView::Ready(ranked)
}

/// Countries with the highest mean of `column`.
pub fn top_k(dataset: &Dataset, column: Variable, k: usize) -> AggregateView<Vec<CountryMean>> {
    rank(&country_means(dataset, column), k, RankOrder::Descending)
}

/// Countries with the lowest mean of `column`.
pub fn bottom_k(dataset: &Dataset, column: Variable, k: usize) -> AggregateView<Vec<CountryMean>> {
    rank(&country_means(dataset, column), k, RankOrder::Ascending)
}

/// A country's column means, each min-max scaled against the whole dataset's
/// range of that column. Used for the comparison radar.
pub fn country_profile(
    dataset: &Dataset,
    country: &str,
    columns: &[Variable],
) -> AggregateView<Vec<Option<f64>>> {
    let mut ranges = vec![(f64::INFINITY, f64::NEG_INFINITY); columns.len()];
    let mut accs = vec![Accumulator::default(); columns.len()];
    let mut seen = false;

    for obs in dataset {
        let is_country = obs.country == country;
        seen |= is_country;
        for (i, &col) in columns.iter().enumerate() {
            if let Some(v) = obs.value(col) {
                ranges[i].0 = ranges[i].0.min(v);
                ranges[i].1 = ranges[i].1.max(v);
                if is_country {
                    accs[i].push(v);
                }
            }
        }
    }

    if !seen {
        return AggregateView::NoData;
    }
    let profile = accs
        .into_iter()
        .zip(ranges)
        .map(|(acc, (lo, hi))| acc.mean().map(|m| (m - lo) / (hi - lo + NORMALIZE_EPSILON)))
        .collect();
    AggregateView::Ready(profile)
}

// ---------------------------------------------------------------------------
// Per-year spread and paired columns
// ---------------------------------------------------------------------------

/// Summary of `column` for each of at most `max_years` years, spread evenly
/// over the years present.
pub fn yearly_summaries(
    dataset: &Dataset,
    column: Variable,
    max_years: usize,
) -> AggregateView<Vec<(i32, Summary)>> {
    let years = sample_years(dataset.iter().filter_map(Observation::year), max_years);
    let mut by_year: BTreeMap<i32, Vec<f64>> = years.into_iter().map(|y| (y, Vec::new())).collect();
    for obs in dataset {
        let (Some(year), Some(v)) = (obs.year(), obs.value(column)) else {
            continue;
        };
        if let Some(values) = by_year.get_mut(&year) {
            values.push(v);
        }
    }
    let rows: Vec<(i32, Summary)> = by_year
        .into_iter()
        .filter_map(|(year, values)| summarize(&values).into_ready().map(|s| (year, s)))
        .collect();
    (!rows.is_empty()).then_some(rows).into()
}

/// Rows where both columns are present, thinned for plotting. The trend and
/// x range are taken over every pair, not just the sample.
#[derive(Debug, Clone, PartialEq)]
pub struct PairedSample {
    pub points: Vec<[f64; 2]>,
    pub total: usize,
    pub trend: Option<Trend>,
    pub x_range: (f64, f64),
}

pub fn paired_sample(
    dataset: &Dataset,
    x: Variable,
    y: Variable,
    max_points: usize,
    seed: u64,
) -> AggregateView<PairedSample> {
    let pairs: Vec<[f64; 2]> = dataset
        .iter()
        .filter_map(|obs| Some([obs.value(x)?, obs.value(y)?]))
        .collect();
    if pairs.is_empty() {
        return AggregateView::NoData;
    }
    let x_range = pairs
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
            (lo.min(p[0]), hi.max(p[0]))
        });
    let points = sample_indices(pairs.len(), max_points, seed)
        .into_iter()
        .map(|i| pairs[i])
        .collect();
    AggregateView::Ready(PairedSample {
        points,
        total: pairs.len(),
        trend: linear_trend(&pairs),
        x_range,
    })
}
