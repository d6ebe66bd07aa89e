use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Variable – one of the six numeric measurement columns
// ---------------------------------------------------------------------------

/// A numeric climate measurement column.
///
/// Declaration order is the column order of the input file, and serde uses
/// the CSV header label so config files read naturally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Variable {
    #[serde(rename = "Temperature")]
    Temperature,
    #[serde(rename = "CO2 Emissions")]
    Co2Emissions,
    #[serde(rename = "Sea Level Rise")]
    SeaLevelRise,
    #[serde(rename = "Precipitation")]
    Precipitation,
    #[serde(rename = "Humidity")]
    Humidity,
    #[serde(rename = "Wind Speed")]
    WindSpeed,
}

impl Variable {
    pub const COUNT: usize = 6;

    pub const ALL: [Variable; Variable::COUNT] = [
        Variable::Temperature,
        Variable::Co2Emissions,
        Variable::SeaLevelRise,
        Variable::Precipitation,
        Variable::Humidity,
        Variable::WindSpeed,
    ];

    /// Header label as it appears in the dataset file.
    pub fn label(self) -> &'static str {
        match self {
            Variable::Temperature => "Temperature",
            Variable::Co2Emissions => "CO2 Emissions",
            Variable::SeaLevelRise => "Sea Level Rise",
            Variable::Precipitation => "Precipitation",
            Variable::Humidity => "Humidity",
            Variable::WindSpeed => "Wind Speed",
        }
    }

    /// Position in [`Variable::ALL`] and in [`Observation::values`].
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_label(label: &str) -> Option<Variable> {
        Variable::ALL.into_iter().find(|v| v.label() == label)
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Dates
// ---------------------------------------------------------------------------

pub const MONTH_ABBREVIATIONS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Three-letter English abbreviation for a 1-based month number.
pub fn month_abbreviation(month: u32) -> Option<&'static str> {
    MONTH_ABBREVIATIONS.get(month.checked_sub(1)? as usize).copied()
}

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// Parse the date cell of a row. Unrecognised text yields `None`, never an error.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok().map(|dt| dt.date()))
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        })
}

// ---------------------------------------------------------------------------
// Observation – one row of the dataset
// ---------------------------------------------------------------------------

/// A single row: country, date and the six measurements.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub country: String,
    /// Date cell exactly as read, kept for export.
    pub date_text: String,
    /// `None` when `date_text` did not parse.
    pub date: Option<NaiveDate>,
    /// Indexed by [`Variable::index`]; `None` marks a missing or non-numeric cell.
    pub values: [Option<f64>; Variable::COUNT],
}

impl Observation {
    pub fn new(
        country: impl Into<String>,
        date_text: impl Into<String>,
        values: [Option<f64>; Variable::COUNT],
    ) -> Self {
        let date_text = date_text.into();
        let date = parse_date(&date_text);
        Self {
            country: country.into(),
            date_text,
            date,
            values,
        }
    }

    pub fn value(&self, var: Variable) -> Option<f64> {
        self.values[var.index()]
    }

    pub fn year(&self) -> Option<i32> {
        self.date.map(|d| d.year())
    }

    /// Month number, 1..=12.
    pub fn month(&self) -> Option<u32> {
        self.date.map(|d| d.month())
    }

    pub fn month_abbreviation(&self) -> Option<&'static str> {
        self.month().and_then(month_abbreviation)
    }

    fn hash_into<H: Hasher>(&self, state: &mut H) {
        self.country.hash(state);
        self.date_text.hash(state);
        for v in &self.values {
            v.map(f64::to_bits).hash(state);
        }
    }
}

// ---------------------------------------------------------------------------
// Dataset – the loaded (or filtered) table
// ---------------------------------------------------------------------------

/// An ordered, immutable collection of observations.
#[derive(Debug, Clone)]
pub struct Dataset {
    observations: Vec<Observation>,
    /// Content hash over every cell, used as the cache key.
    fingerprint: u64,
    /// Sorted distinct non-empty country names.
    countries: BTreeSet<String>,
}

impl Dataset {
    /// Build the dataset and its derived indices.
    pub fn new(observations: Vec<Observation>) -> Self {
        let mut hasher = DefaultHasher::new();
        observations.len().hash(&mut hasher);
        let mut countries = BTreeSet::new();
        for obs in &observations {
            obs.hash_into(&mut hasher);
            if !obs.country.is_empty() && !countries.contains(&obs.country) {
                countries.insert(obs.country.clone());
            }
        }
        Dataset {
            observations,
            fingerprint: hasher.finish(),
            countries,
        }
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Observation> {
        self.observations.iter()
    }

    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    pub fn countries(&self) -> &BTreeSet<String> {
        &self.countries
    }

    /// Number of observations.
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    /// Whether the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Smallest and largest parsed year, if any row has a valid date.
    pub fn year_bounds(&self) -> Option<(i32, i32)> {
        self.iter().filter_map(Observation::year).fold(None, |acc, y| match acc {
            None => Some((y, y)),
            Some((lo, hi)) => Some((lo.min(y), hi.max(y))),
        })
    }

    /// Present (non-missing) values of one column, in row order.
    pub fn column(&self, var: Variable) -> Vec<f64> {
        self.iter().filter_map(|o| o.value(var)).collect()
    }

    /// Mean of each requested column over the present cells.
    pub fn column_means(&self, vars: &[Variable]) -> Vec<Option<f64>> {
        vars.iter()
            .map(|&v| {
                let col = self.column(v);
                if col.is_empty() {
                    None
                } else {
                    Some(col.iter().sum::<f64>() / col.len() as f64)
                }
            })
            .collect()
    }
}

impl PartialEq for Dataset {
    fn eq(&self, other: &Self) -> bool {
        self.fingerprint == other.fingerprint && self.observations == other.observations
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a Observation;
    type IntoIter = std::slice::Iter<'a, Observation>;

    fn into_iter(self) -> Self::IntoIter {
        self.observations.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(country: &str, date: &str, temp: f64) -> Observation {
        let mut values = [None; Variable::COUNT];
        values[Variable::Temperature.index()] = Some(temp);
        Observation::new(country, date, values)
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2003, 7, 14);
        assert_eq!(parse_date("2003-07-14"), expected);
        assert_eq!(parse_date("2003-07-14 00:00:00.000000000"), expected);
        assert_eq!(parse_date("2003-07-14T12:30:00"), expected);
        assert_eq!(parse_date("2003/07/14"), expected);
        assert_eq!(parse_date("07/14/2003"), expected);
        assert_eq!(parse_date(" 2003-07-14 "), expected);
    }

    #[test]
    fn test_parse_date_invalid() {
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("not a date"), None);
        assert_eq!(parse_date("2003-13-01"), None);
        assert_eq!(parse_date("2003-02-30"), None);
    }

    #[test]
    fn test_derived_fields() {
        let o = obs("Chad", "2010-03-05", 1.0);
        assert_eq!(o.year(), Some(2010));
        assert_eq!(o.month(), Some(3));
        assert_eq!(o.month_abbreviation(), Some("Mar"));

        let bad = obs("Chad", "yesterday", 1.0);
        assert_eq!(bad.year(), None);
        assert_eq!(bad.month_abbreviation(), None);
    }

    #[test]
    fn test_month_abbreviation_bounds() {
        assert_eq!(month_abbreviation(0), None);
        assert_eq!(month_abbreviation(1), Some("Jan"));
        assert_eq!(month_abbreviation(12), Some("Dec"));
        assert_eq!(month_abbreviation(13), None);
    }

    #[test]
    fn test_variable_labels_round_trip() {
        for v in Variable::ALL {
            assert_eq!(Variable::from_label(v.label()), Some(v));
        }
        assert_eq!(Variable::from_label("Pressure"), None);
        let json = serde_json::to_string(&Variable::Co2Emissions).unwrap();
        assert_eq!(json, "\"CO2 Emissions\"");
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let a = Dataset::new(vec![obs("Chad", "2010-01-01", 1.0)]);
        let b = Dataset::new(vec![obs("Chad", "2010-01-01", 1.0)]);
        let c = Dataset::new(vec![obs("Chad", "2010-01-01", 1.5)]);
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
        assert_eq!(a, b);
    }

    #[test]
    fn test_countries_and_year_bounds() {
        let ds = Dataset::new(vec![
            obs("Peru", "2001-01-01", 1.0),
            obs("", "2004-01-01", 1.0),
            obs("Chad", "1999-06-01", 1.0),
            obs("Peru", "garbage", 1.0),
        ]);
        let countries: Vec<_> = ds.countries().iter().cloned().collect();
        assert_eq!(countries, vec!["Chad".to_string(), "Peru".to_string()]);
        assert_eq!(ds.year_bounds(), Some((1999, 2004)));
        assert_eq!(Dataset::new(Vec::new()).year_bounds(), None);
    }

    #[test]
    fn test_column_means_skip_missing() {
        let mut missing = obs("Chad", "2010-01-01", 0.0);
        missing.values[Variable::Temperature.index()] = None;
        let ds = Dataset::new(vec![obs("Chad", "2010-01-01", 2.0), missing, obs("Chad", "2010-01-01", 4.0)]);
        let means = ds.column_means(&[Variable::Temperature, Variable::Humidity]);
        assert_eq!(means, vec![Some(3.0), None]);
    }
}
