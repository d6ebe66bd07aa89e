//! Climate dataset exploration pipeline.
//!
//! The dashboard binary consumes this library; nothing in here knows about
//! rendering.
//!
//! ```text
//!  data::loader ──► data::filter ──┬──► analysis  (grouped means, correlation, rankings)
//!                                  └──► model     (ridge regression, metrics, inference)
//! ```
//!
//! [`session::SessionCache`] owns the loaded dataset together with the model
//! fitted on it.

pub mod analysis;
pub mod config;
pub mod data;
pub mod model;
pub mod rng;
pub mod session;

pub use analysis::AggregateView;
pub use config::DashboardConfig;
pub use data::filter::{filter, FilterSpec};
pub use data::loader::{DataError, DatasetSource};
pub use data::model::{Dataset, Observation, Variable};
pub use model::{FitOutcome, Metrics, ModelConfig, ModelError, RidgeModel};
pub use session::{Session, SessionCache};
