use std::collections::HashMap;

use super::aggregate::{
    country_means, country_profile, group_mean, paired_sample, yearly_summaries, CountryMean,
    Dimension, GroupedMeans, PairedSample,
};
use super::correlation::{correlation_matrix, CorrelationMatrix};
use super::stats::{distribution, min_max_normalize, summarize, Distribution, Summary};
use super::AggregateView;
use crate::data::model::{Dataset, Variable};

/// Entries kept per table before it is cleared.
const MAX_ENTRIES: usize = 64;

type GroupKey = (u64, Dimension, Vec<Variable>);
type ColumnsKey = (u64, Vec<Variable>);
type ColumnKey = (u64, Variable);
/// Column plus a count parameter.
type SizedKey = (u64, Variable, usize);
type ProfileKey = (u64, String, Vec<Variable>);
type PairKey = (u64, Variable, Variable, usize, u64);

/// Content-addressed cache of aggregation results.
///
/// Keys start with the dataset fingerprint, so a changed filter simply misses
/// and stale entries are never served. The UI redraws every frame; this keeps
/// a single interaction from recomputing the same aggregate over and over.
#[derive(Debug, Default)]
pub struct AggregateMemo {
    group_means: HashMap<GroupKey, AggregateView<GroupedMeans>>,
    correlations: HashMap<ColumnsKey, AggregateView<CorrelationMatrix>>,
    country_means: HashMap<ColumnKey, Vec<CountryMean>>,
    summaries: HashMap<ColumnKey, AggregateView<Summary>>,
    normalized_summaries: HashMap<ColumnKey, AggregateView<Summary>>,
    distributions: HashMap<(u64, Variable, usize, usize), AggregateView<Distribution>>,
    yearly: HashMap<SizedKey, AggregateView<Vec<(i32, Summary)>>>,
    profiles: HashMap<ProfileKey, AggregateView<Vec<Option<f64>>>>,
    pairs: HashMap<PairKey, AggregateView<PairedSample>>,
    hits: u64,
    misses: u64,
}

fn cached<K, V, F>(table: &mut HashMap<K, V>, key: K, hits: &mut u64, misses: &mut u64, compute: F) -> V
where
    K: std::hash::Hash + Eq,
    V: Clone,
    F: FnOnce() -> V,
{
    if let Some(v) = table.get(&key) {
        *hits += 1;
        return v.clone();
    }
    *misses += 1;
    if table.len() >= MAX_ENTRIES {
        table.clear();
    }
    let value = compute();
    table.insert(key, value.clone());
    value
}

impl AggregateMemo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn group_mean(
        &mut self,
        dataset: &Dataset,
        dimension: Dimension,
        columns: &[Variable],
    ) -> AggregateView<GroupedMeans> {
        let key = (dataset.fingerprint(), dimension, columns.to_vec());
        cached(&mut self.group_means, key, &mut self.hits, &mut self.misses, || {
            group_mean(dataset, dimension, columns)
        })
    }

    pub fn correlation_matrix(
        &mut self,
        dataset: &Dataset,
        columns: &[Variable],
    ) -> AggregateView<CorrelationMatrix> {
        let key = (dataset.fingerprint(), columns.to_vec());
        cached(&mut self.correlations, key, &mut self.hits, &mut self.misses, || {
            correlation_matrix(dataset, columns)
        })
    }

    pub fn country_means(&mut self, dataset: &Dataset, column: Variable) -> Vec<CountryMean> {
        let key = (dataset.fingerprint(), column);
        cached(&mut self.country_means, key, &mut self.hits, &mut self.misses, || {
            country_means(dataset, column)
        })
    }

    pub fn summary(&mut self, dataset: &Dataset, column: Variable) -> AggregateView<Summary> {
        let key = (dataset.fingerprint(), column);
        cached(&mut self.summaries, key, &mut self.hits, &mut self.misses, || {
            summarize(&dataset.column(column))
        })
    }

    /// Summary of the column after min-max scaling.
    pub fn normalized_summary(
        &mut self,
        dataset: &Dataset,
        column: Variable,
    ) -> AggregateView<Summary> {
        let key = (dataset.fingerprint(), column);
        cached(&mut self.normalized_summaries, key, &mut self.hits, &mut self.misses, || {
            summarize(&min_max_normalize(&dataset.column(column)))
        })
    }

    pub fn distribution(
        &mut self,
        dataset: &Dataset,
        column: Variable,
        bins: usize,
        points: usize,
    ) -> AggregateView<Distribution> {
        let key = (dataset.fingerprint(), column, bins, points);
        cached(&mut self.distributions, key, &mut self.hits, &mut self.misses, || {
            distribution(&dataset.column(column), bins, points)
        })
    }

    pub fn yearly_summaries(
        &mut self,
        dataset: &Dataset,
        column: Variable,
        max_years: usize,
    ) -> AggregateView<Vec<(i32, Summary)>> {
        let key = (dataset.fingerprint(), column, max_years);
        cached(&mut self.yearly, key, &mut self.hits, &mut self.misses, || {
            yearly_summaries(dataset, column, max_years)
        })
    }

    pub fn country_profile(
        &mut self,
        dataset: &Dataset,
        country: &str,
        columns: &[Variable],
    ) -> AggregateView<Vec<Option<f64>>> {
        let key = (dataset.fingerprint(), country.to_string(), columns.to_vec());
        cached(&mut self.profiles, key, &mut self.hits, &mut self.misses, || {
            country_profile(dataset, country, columns)
        })
    }

    pub fn paired_sample(
        &mut self,
        dataset: &Dataset,
        x: Variable,
        y: Variable,
        max_points: usize,
        seed: u64,
    ) -> AggregateView<PairedSample> {
        let key = (dataset.fingerprint(), x, y, max_points, seed);
        cached(&mut self.pairs, key, &mut self.hits, &mut self.misses, || {
            paired_sample(dataset, x, y, max_points, seed)
        })
    }

    /// `(hits, misses)` since construction.
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }
}
