use std::collections::HashMap;
use std::sync::Arc;

use crate::data::model::{Dataset, Variable};
use crate::model::{fit, FitOutcome, ModelConfig, ModelError};

/// A loaded dataset together with the model trained on it.
///
/// A failed fit is kept as its error: it is just as deterministic as a
/// successful one, and exploring the data does not depend on it.
#[derive(Debug)]
pub struct Session {
    pub dataset: Arc<Dataset>,
    pub features: Vec<Variable>,
    pub fit: Result<FitOutcome, ModelError>,
}

impl Session {
    pub fn outcome(&self) -> Option<&FitOutcome> {
        self.fit.as_ref().ok()
    }

    /// Mean of each model feature over the full dataset, in model order.
    /// Used as the starting point for interactive predictions.
    pub fn feature_means(&self) -> Vec<Option<f64>> {
        self.dataset.column_means(&self.features)
    }
}

/// Owns one [`Session`] per dataset version, keyed by the dataset content
/// fingerprint. Training happens on the first request for a dataset; every
/// later request, whatever the active filter, reuses the same model.
#[derive(Debug)]
pub struct SessionCache {
    config: ModelConfig,
    sessions: HashMap<u64, Arc<Session>>,
}

impl SessionCache {
    pub fn new(config: ModelConfig) -> Self {
        Self {
            config,
            sessions: HashMap::new(),
        }
    }

    /// Session for `dataset`, fitting the model only on a cache miss.
    pub fn get_or_fit(&mut self, dataset: Dataset) -> Arc<Session> {
        let key = dataset.fingerprint();
        if let Some(session) = self.sessions.get(&key) {
            log::debug!("Reusing fitted model for dataset {key:016x}");
            return Arc::clone(session);
        }

        let fit = fit(&dataset, &self.config);
        if let Err(e) = &fit {
            log::warn!("Model training failed: {e}");
        }
        let session = Arc::new(Session {
            dataset: Arc::new(dataset),
            features: self.config.features.clone(),
            fit,
        });
        self.sessions.insert(key, Arc::clone(&session));
        log::info!("Cached session for dataset {key:016x}");
        session
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Observation;

    fn dataset(offset: f64) -> Dataset {
        Dataset::new(
            (0..20)
                .map(|i| {
                    let x = i as f64;
                    let values = [
                        Some(offset + 2.0 * x),
                        Some(x),
                        Some(x * 0.5),
                        Some((x * 3.0) % 7.0),
                        Some(50.0 + x),
                        Some((x * 1.7) % 5.0),
                    ];
                    Observation::new("Chad", "2001-02-03", values)
                })
                .collect(),
        )
    }

    #[test]
    fn test_same_content_reuses_session() {
        let mut cache = SessionCache::new(ModelConfig::default());
        let first = cache.get_or_fit(dataset(0.0));
        let second = cache.get_or_fit(dataset(0.0));
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
        assert!(first.outcome().is_some());
    }

    #[test]
    fn test_new_content_fits_again() {
        let mut cache = SessionCache::new(ModelConfig::default());
        let a = cache.get_or_fit(dataset(0.0));
        let b = cache.get_or_fit(dataset(10.0));
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 2);
        let bias = |s: &Session| s.outcome().unwrap().model.bias();
        assert!((bias(&b) - bias(&a) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_feature_means_follow_model_order() {
        let mut cache = SessionCache::new(ModelConfig::default());
        let session = cache.get_or_fit(dataset(0.0));
        let means = session.feature_means();
        assert_eq!(means.len(), 5);
        // CO2 Emissions is x over 0..20.
        assert_eq!(means[0], Some(9.5));
        assert_eq!(session.features[0], Variable::Co2Emissions);
    }

    #[test]
    fn test_fit_failure_keeps_dataset() {
        let mut cache = SessionCache::new(ModelConfig::default());
        let session = cache.get_or_fit(Dataset::new(Vec::new()));
        assert!(matches!(session.fit, Err(ModelError::InsufficientData { .. })));
        assert!(session.outcome().is_none());
        assert_eq!(session.feature_means(), vec![None; 5]);
        assert_eq!(cache.len(), 1);
    }
}
