use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::loader::DatasetSource;
use crate::model::ModelConfig;

/// Environment variable naming a JSON config file.
pub const CONFIG_ENV: &str = "CLIMATE_INSIGHTS_CONFIG";
/// Config file picked up from the working directory when present.
pub const DEFAULT_CONFIG_FILE: &str = "climate_insights.json";

pub const DEFAULT_REMOTE_URL: &str =
    "https://www.kaggle.com/api/v1/datasets/download/goyaladi/climate-insights-dataset";

/// Dashboard settings. Every field is optional in the JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Local dataset copy; written after a successful remote fetch.
    pub data_path: PathBuf,
    /// Archive fetched when `data_path` is missing. `null` disables fetching.
    pub remote_url: Option<String>,
    /// Length of the top/bottom country rankings.
    pub top_k: usize,
    /// Soft cap on countries in the comparison chart.
    pub compare_cap: usize,
    pub model: ModelConfig,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("climate_change_data.csv"),
            remote_url: Some(DEFAULT_REMOTE_URL.to_string()),
            top_k: 15,
            compare_cap: 5,
            model: ModelConfig::default(),
        }
    }
}

impl DashboardConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: DashboardConfig = serde_json::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config
            .model
            .validate()
            .with_context(|| format!("invalid model settings in {}", path.display()))?;
        Ok(config)
    }

    /// Resolve the config: the file named by `CLIMATE_INSIGHTS_CONFIG`, else
    /// `climate_insights.json` if it exists, else defaults.
    pub fn discover() -> Result<Self> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            log::info!("Using config from ${CONFIG_ENV}: {path}");
            return Self::from_file(Path::new(&path));
        }
        let local = Path::new(DEFAULT_CONFIG_FILE);
        if local.exists() {
            log::info!("Using config {DEFAULT_CONFIG_FILE}");
            return Self::from_file(local);
        }
        Ok(Self::default())
    }

    pub fn source(&self) -> DatasetSource {
        DatasetSource::new(&self.data_path, self.remote_url.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Variable;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"data_path": "data/climate.parquet", "remote_url": null, "model": {"ridge_alpha": 2.5}}"#,
        )
        .unwrap();

        let config = DashboardConfig::from_file(&path).unwrap();
        assert_eq!(config.data_path, PathBuf::from("data/climate.parquet"));
        assert_eq!(config.remote_url, None);
        assert_eq!(config.top_k, 15);
        assert_eq!(config.model.ridge_alpha, 2.5);
        assert_eq!(config.model.target, Variable::Temperature);
        assert!(config.source().remote_url.is_none());
    }

    #[test]
    fn test_invalid_model_settings_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"model": {"test_split_fraction": 0.0}}"#).unwrap();
        let err = DashboardConfig::from_file(&path).unwrap_err();
        assert!(format!("{err:#}").contains("test_split_fraction"));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(DashboardConfig::from_file(Path::new("/nonexistent/climate.json")).is_err());
    }
}
