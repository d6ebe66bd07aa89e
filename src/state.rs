use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use climate_insights::analysis::AggregateMemo;
use climate_insights::data::export::to_csv_bytes;
use climate_insights::{
    filter, DashboardConfig, Dataset, FilterSpec, ModelError, Session, SessionCache, Variable,
};

use crate::color::ColorMap;

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Trends,
    Correlation,
    Countries,
    Distributions,
    Prediction,
}

impl Tab {
    pub const ALL: [Tab; 5] = [
        Tab::Trends,
        Tab::Correlation,
        Tab::Countries,
        Tab::Distributions,
        Tab::Prediction,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Tab::Trends => "Trends & Time Series",
            Tab::Correlation => "Correlation & Heatmaps",
            Tab::Countries => "Country Analysis",
            Tab::Distributions => "Distributions",
            Tab::Prediction => "Prediction",
        }
    }
}

/// The full UI state, independent of rendering.
pub struct AppState {
    pub config: DashboardConfig,

    /// Owns the loaded dataset and its fitted model.
    cache: SessionCache,

    /// Current dataset + model (None until loading succeeded).
    pub session: Option<Arc<Session>>,

    /// Set when the dataset could not be obtained; nothing else is rendered.
    pub fatal_error: Option<String>,

    /// Active year range / country selection.
    pub filter: FilterSpec,

    /// Rows passing the current filter (cached).
    pub view: Dataset,

    /// Aggregates over `view`, memoized across frames.
    pub memo: AggregateMemo,

    /// Primary variable for the single-variable charts.
    pub variable: Variable,

    pub tab: Tab,

    pub scatter_x: Variable,
    pub scatter_y: Variable,

    /// Countries shown in the comparison radar.
    pub compare: Vec<String>,

    /// Colours per country for the comparison chart.
    pub color_map: Option<ColorMap>,

    /// Prediction inputs, in model feature order.
    pub prediction_inputs: Vec<f64>,

    pub prediction: Option<Result<f64, ModelError>>,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    fn empty(config: DashboardConfig) -> Self {
        Self {
            cache: SessionCache::new(config.model.clone()),
            config,
            session: None,
            fatal_error: None,
            filter: FilterSpec::new(0, 0, Default::default()),
            view: Dataset::new(Vec::new()),
            memo: AggregateMemo::new(),
            variable: Variable::Temperature,
            tab: Tab::Trends,
            scatter_x: Variable::Temperature,
            scatter_y: Variable::Co2Emissions,
            compare: Vec::new(),
            color_map: None,
            prediction_inputs: Vec::new(),
            prediction: None,
            status_message: None,
        }
    }

    /// Resolve the config, load the dataset and fit the model.
    ///
    /// Any failure to obtain the dataset leaves the state in the fatal
    /// error mode.
    pub fn bootstrap(data_path_override: Option<&Path>) -> Self {
        let mut config = match DashboardConfig::discover() {
            Ok(config) => config,
            Err(e) => {
                log::error!("Failed to read configuration: {e:#}");
                let mut state = Self::empty(DashboardConfig::default());
                state.fatal_error = Some(format!("Configuration error: {e:#}"));
                return state;
            }
        };
        if let Some(path) = data_path_override {
            config.data_path = path.to_path_buf();
        }

        let mut state = Self::empty(config);
        match state.config.source().load() {
            Ok(dataset) => {
                let session = state.cache.get_or_fit(dataset);
                state.set_session(session);
            }
            Err(e) => {
                log::error!("Failed to load dataset: {e}");
                state.fatal_error = Some(format!("Could not load dataset. Error: {e}"));
            }
        }
        state
    }

    /// Ingest a session, reset filters and prediction inputs.
    pub fn set_session(&mut self, session: Arc<Session>) {
        let dataset = &session.dataset;
        self.filter = FilterSpec::covering(dataset);
        self.color_map = Some(ColorMap::new(dataset.countries()));
        self.compare = dataset
            .countries()
            .iter()
            .take(3.min(self.config.compare_cap))
            .cloned()
            .collect();
        self.prediction_inputs = session
            .feature_means()
            .into_iter()
            .map(|m| m.unwrap_or(0.0))
            .collect();
        self.prediction = None;
        self.status_message = None;

        log::info!(
            "Dataset ready: {} rows, {} countries, years {}..={}",
            dataset.len(),
            dataset.countries().len(),
            self.filter.year_min,
            self.filter.year_max
        );
        self.session = Some(session);
        self.refilter();
    }

    /// Recompute `view` after a filter change.
    pub fn refilter(&mut self) {
        if let Some(session) = &self.session {
            self.view = filter(&session.dataset, &self.filter);
        }
    }

    pub fn set_year_range(&mut self, year_min: i32, year_max: i32) {
        let spec = FilterSpec::new(year_min, year_max, self.filter.countries.clone());
        if spec != self.filter {
            self.filter = spec;
            self.refilter();
        }
    }

    /// Toggle a single country in the allow-list.
    pub fn toggle_country(&mut self, country: &str) {
        if !self.filter.countries.remove(country) {
            self.filter.countries.insert(country.to_string());
        }
        self.refilter();
    }

    /// Clear the allow-list, i.e. show every country.
    pub fn select_all_countries(&mut self) {
        if !self.filter.countries.is_empty() {
            self.filter.countries.clear();
            self.refilter();
        }
    }

    /// Add or remove a country from the comparison, respecting the cap.
    pub fn toggle_compare(&mut self, country: &str) {
        if let Some(pos) = self.compare.iter().position(|c| c == country) {
            self.compare.remove(pos);
        } else if self.compare.len() < self.config.compare_cap {
            self.compare.push(country.to_string());
        } else {
            self.status_message = Some(format!(
                "At most {} countries can be compared",
                self.config.compare_cap
            ));
        }
    }

    /// Run the fitted model on the current inputs.
    pub fn predict(&mut self) {
        let Some(outcome) = self.session.as_ref().and_then(|s| s.outcome()) else {
            return;
        };
        let result = outcome.model.predict(&self.prediction_inputs);
        match &result {
            Ok(v) => log::info!("Predicted {} = {v:.2}", outcome.model.target()),
            Err(e) => log::warn!("Prediction rejected: {e}"),
        }
        self.prediction = Some(result);
    }

    /// Write the filtered rows as CSV.
    pub fn export_filtered(&self, path: &Path) -> Result<()> {
        let bytes = to_csv_bytes(&self.view).context("serializing filtered rows")?;
        std::fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))?;
        log::info!("Exported {} rows to {}", self.view.len(), path.display());
        Ok(())
    }
}
