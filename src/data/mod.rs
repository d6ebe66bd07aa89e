/// Data layer: core types, loading, filtering and export.
///
/// Architecture:
/// ```text
///  local .csv / .json / .parquet      remote zip archive
///        │                                   │
///        └──────────────┬────────────────────┘
///                       ▼
///                 ┌──────────┐
///                 │  loader   │  parse rows, derive year/month → Dataset
///                 └──────────┘
///                       │
///                       ▼
///               ┌───────────────┐
///               │    Dataset     │  Vec<Observation>, fingerprint, countries
///               └───────────────┘
///                       │
///                       ▼
///                 ┌──────────┐
///                 │  filter   │  year range + country allow-list → Dataset
///                 └──────────┘
///                       │
///                       ▼
///                 ┌──────────┐
///                 │  export   │  filtered Dataset → CSV bytes
///                 └──────────┘
/// ```

pub mod export;
pub mod filter;
pub mod loader;
pub mod model;
