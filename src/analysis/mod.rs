/// Aggregation layer: read-only summaries computed from a (filtered) dataset.
///
/// Every operation is pure and reports [`AggregateView::NoData`] for an empty
/// input instead of failing, so an over-restrictive filter degrades to empty
/// charts.

pub mod aggregate;
pub mod correlation;
pub mod memo;
pub mod stats;

pub use aggregate::{
    bottom_k, country_means, country_profile, group_mean, paired_sample, rank, top_k,
    yearly_summaries, CountryMean, Dimension, GroupKey, GroupRow, GroupedMeans, PairedSample,
    RankOrder,
};
pub use correlation::{correlation_matrix, pearson, CorrelationMatrix, CorrelationPair, Strength};
pub use memo::AggregateMemo;
pub use stats::{
    distribution, gaussian_kde, histogram, linear_trend, min_max_normalize, sample_indices,
    sample_years, summarize, Distribution, Histogram, Summary, Trend, NORMALIZE_EPSILON,
};

/// A derived summary, or an explicit "no data" state when the input had
/// nothing to aggregate.
#[derive(Debug, Clone, PartialEq)]
pub enum AggregateView<T> {
    Ready(T),
    NoData,
}

impl<T> AggregateView<T> {
    pub fn ready(&self) -> Option<&T> {
        match self {
            AggregateView::Ready(v) => Some(v),
            AggregateView::NoData => None,
        }
    }

    pub fn into_ready(self) -> Option<T> {
        match self {
            AggregateView::Ready(v) => Some(v),
            AggregateView::NoData => None,
        }
    }

    pub fn is_no_data(&self) -> bool {
        matches!(self, AggregateView::NoData)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> AggregateView<U> {
        match self {
            AggregateView::Ready(v) => AggregateView::Ready(f(v)),
            AggregateView::NoData => AggregateView::NoData,
        }
    }
}

impl<T> From<Option<T>> for AggregateView<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => AggregateView::Ready(v),
            None => AggregateView::NoData,
        }
    }
}
