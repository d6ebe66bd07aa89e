//! End-to-end runs of load → filter → aggregate / fit → predict on a small
//! synthetic dataset: 3 countries × 2 years × 12 months.

use std::collections::BTreeSet;
use std::sync::Arc;

use climate_insights::analysis::{group_mean, min_max_normalize, Dimension, GroupKey};
use climate_insights::data::export::to_csv_bytes;
use climate_insights::data::loader::parse_csv;
use climate_insights::rng::SimpleRng;
use climate_insights::{
    filter, Dataset, FilterSpec, ModelConfig, Observation, SessionCache, Variable,
};

const COUNTRIES: [&str; 3] = ["Chad", "Fiji", "Peru"];
const YEARS: [i32; 2] = [2010, 2011];

fn synthetic() -> Dataset {
    let mut rng = SimpleRng::new(7);
    let mut rows = Vec::new();
    for country in COUNTRIES {
        for year in YEARS {
            for month in 1..=12u32 {
                let co2 = 350.0 + rng.gauss(0.0, 20.0);
                let sea = rng.gauss(0.0, 1.0);
                let precip = 50.0 + rng.gauss(0.0, 10.0);
                let humidity = 60.0 + rng.gauss(0.0, 8.0);
                let wind = 5.0 + rng.gauss(0.0, 2.0);
                let temp = 0.05 * co2 + 1.5 * sea + 0.02 * precip - 0.1 * humidity
                    + rng.gauss(0.0, 0.5);
                rows.push(Observation::new(
                    country,
                    format!("{year}-{month:02}-01"),
                    [
                        Some(temp),
                        Some(co2),
                        Some(sea),
                        Some(precip),
                        Some(humidity),
                        Some(wind),
                    ],
                ));
            }
        }
    }
    Dataset::new(rows)
}

fn countries(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|s| s.to_string()).collect()
}

#[test]
fn single_country_single_year_mean() {
    let ds = synthetic();
    assert_eq!(ds.len(), 72);

    let expected: f64 = ds
        .iter()
        .filter(|o| o.country == "Fiji" && o.year() == Some(2011))
        .filter_map(|o| o.value(Variable::Temperature))
        .sum::<f64>()
        / 12.0;

    let view = filter(&ds, &FilterSpec::new(2011, 2011, countries(&["Fiji"])));
    assert_eq!(view.len(), 12);

    let grouped = group_mean(&view, Dimension::Year, &[Variable::Temperature])
        .into_ready()
        .unwrap();
    assert_eq!(grouped.rows.len(), 1);
    assert_eq!(grouped.rows[0].key, GroupKey::Year(2011));
    let mean = grouped.get(GroupKey::Year(2011), Variable::Temperature).unwrap();
    assert!((mean - expected).abs() < 1e-9);
}

#[test]
fn empty_allow_list_keeps_everything() {
    let ds = synthetic();
    let spec = FilterSpec::new(2010, 2011, BTreeSet::new());
    let view = filter(&ds, &spec);
    assert_eq!(view, ds);
    assert_eq!(filter(&view, &spec), view);
    assert_eq!(FilterSpec::covering(&ds), spec);
}

#[test]
fn over_restrictive_filter_degrades_to_no_data() {
    let ds = synthetic();
    let view = filter(&ds, &FilterSpec::new(1990, 1995, BTreeSet::new()));
    assert!(view.is_empty());
    assert!(group_mean(&view, Dimension::Month, &Variable::ALL).is_no_data());
}

#[test]
fn mean_features_predict_near_mean_target() {
    let mut cache = SessionCache::new(ModelConfig::default());
    let session = cache.get_or_fit(synthetic());
    let outcome = session.outcome().unwrap();

    let inputs: Vec<f64> = session
        .feature_means()
        .into_iter()
        .map(|m| m.unwrap())
        .collect();
    let predicted = outcome.model.predict(&inputs).unwrap();
    let target_mean = session.dataset.column_means(&[Variable::Temperature])[0].unwrap();

    assert!((predicted - target_mean).abs() <= outcome.metrics.mae);
}

#[test]
fn residuals_and_metrics_are_consistent() {
    let ds = synthetic();
    let mut cache = SessionCache::new(ModelConfig::default());
    let session = cache.get_or_fit(ds.clone());
    let outcome = session.outcome().unwrap();
    let metrics = &outcome.metrics;

    assert!(metrics.mae >= 0.0);
    assert!(metrics.rmse >= metrics.mae);
    assert_eq!(metrics.n_train + metrics.n_test, 72);
    assert_eq!(metrics.n_test, 15);

    for (&pos, &residual) in outcome.train_rows.iter().zip(&outcome.train_residuals) {
        let obs = &ds.observations()[pos];
        let features = outcome.model.feature_vector(obs).unwrap();
        let predicted = outcome.model.predict(&features).unwrap();
        let actual = obs.value(Variable::Temperature).unwrap();
        assert!((actual - predicted - residual).abs() < 1e-9);
    }
}

#[test]
fn exported_rows_reload_into_the_same_session() {
    let ds = synthetic();
    let mut cache = SessionCache::new(ModelConfig::default());
    let first = cache.get_or_fit(ds.clone());

    let bytes = to_csv_bytes(&ds).unwrap();
    let reloaded = parse_csv(bytes.as_slice()).unwrap();
    assert_eq!(reloaded, ds);

    let second = cache.get_or_fit(reloaded);
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(cache.len(), 1);
}

#[test]
fn normalized_yearly_means_stay_in_unit_range() {
    let ds = synthetic();
    let grouped = group_mean(&ds, Dimension::Year, &Variable::ALL)
        .into_ready()
        .unwrap();
    for var in Variable::ALL {
        let means: Vec<f64> = grouped.series(var).into_iter().map(|(_, m)| m).collect();
        assert_eq!(means.len(), 2);
        for v in min_max_normalize(&means) {
            assert!((0.0..=1.0).contains(&v));
        }
    }
}
