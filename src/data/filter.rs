use std::collections::BTreeSet;

use super::model::{Dataset, Observation};

// ---------------------------------------------------------------------------
// Filter predicate: year range plus an optional country allow-list
// ---------------------------------------------------------------------------

/// The active view: inclusive year bounds and the selected countries.
/// An empty `countries` set means "no restriction" (show all).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterSpec {
    pub year_min: i32,
    pub year_max: i32,
    pub countries: BTreeSet<String>,
}

impl FilterSpec {
    /// Build a spec; swapped bounds are put back in order.
    pub fn new(year_min: i32, year_max: i32, countries: BTreeSet<String>) -> Self {
        Self {
            year_min: year_min.min(year_max),
            year_max: year_min.max(year_max),
            countries,
        }
    }

    /// The widest spec for a dataset: its full year span, every country.
    /// A dataset without any parseable date gets an empty range `0..=0`.
    pub fn covering(dataset: &Dataset) -> Self {
        let (lo, hi) = dataset.year_bounds().unwrap_or((0, 0));
        Self::new(lo, hi, BTreeSet::new())
    }

    /// Whether a single observation passes the filter.
    ///
    /// Rows without a parseable date never pass the year bound.
    pub fn matches(&self, obs: &Observation) -> bool {
        let in_range = obs
            .year()
            .is_some_and(|y| self.year_min <= y && y <= self.year_max);
        in_range && (self.countries.is_empty() || self.countries.contains(&obs.country))
    }
}

/// Return indices of observations that pass the filter, in input order.
pub fn filtered_indices(dataset: &Dataset, spec: &FilterSpec) -> Vec<usize> {
    dataset
        .iter()
        .enumerate()
        .filter(|(_, obs)| spec.matches(obs))
        .map(|(i, _)| i)
        .collect()
}

/// Apply the filter, producing a new dataset with the surviving rows in
/// their original order. An empty result is a valid dataset.
pub fn filter(dataset: &Dataset, spec: &FilterSpec) -> Dataset {
    let rows: Vec<Observation> = filtered_indices(dataset, spec)
        .into_iter()
        .map(|i| dataset.observations()[i].clone())
        .collect();
    log::debug!(
        "Filter {}..={} over {} countries kept {}/{} rows",
        spec.year_min,
        spec.year_max,
        spec.countries.len(),
        rows.len(),
        dataset.len()
    );
    Dataset::new(rows)
}
