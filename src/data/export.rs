use super::loader::DataError;
use super::model::{Dataset, Variable};

/// Serialize a dataset as CSV: the input column layout followed by the
/// derived `Year` and `Month` columns. Missing cells are written empty.
pub fn to_csv_bytes(dataset: &Dataset) -> Result<Vec<u8>, DataError> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut header = vec!["Date", "Country"];
    header.extend(Variable::ALL.iter().map(|v| v.label()));
    header.extend(["Year", "Month"]);
    writer.write_record(&header)?;

    for obs in dataset {
        let mut record = Vec::with_capacity(header.len());
        record.push(obs.date_text.clone());
        record.push(obs.country.clone());
        for var in Variable::ALL {
            record.push(obs.value(var).map(|v| v.to_string()).unwrap_or_default());
        }
        record.push(obs.year().map(|y| y.to_string()).unwrap_or_default());
        record.push(obs.month().map(|m| m.to_string()).unwrap_or_default());
        writer.write_record(&record)?;
    }

    writer
        .into_inner()
        .map_err(|e| DataError::Io(e.into_error()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::parse_csv;
    use crate::data::model::Observation;

    #[test]
    fn test_export_layout() {
        let mut values = [Some(1.5); Variable::COUNT];
        values[Variable::Humidity.index()] = None;
        let ds = Dataset::new(vec![
            Observation::new("Chad", "2004-09-01", values),
            Observation::new("Peru, Rep.", "n/a", [Some(2.0); Variable::COUNT]),
        ]);

        let bytes = to_csv_bytes(&ds).unwrap();
        let text = String::from_utf8(bytes.clone()).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("Date,Country,Temperature,CO2 Emissions,Sea Level Rise,Precipitation,Humidity,Wind Speed,Year,Month")
        );
        assert_eq!(lines.next(), Some("2004-09-01,Chad,1.5,1.5,1.5,1.5,,1.5,2004,9"));
        assert_eq!(lines.next(), Some("n/a,\"Peru, Rep.\",2,2,2,2,2,2,,"));

        // The export is itself a loadable dataset.
        let reloaded = parse_csv(bytes.as_slice()).unwrap();
        assert_eq!(reloaded, ds);
    }

    #[test]
    fn test_export_empty_has_header_only() {
        let bytes = to_csv_bytes(&Dataset::new(Vec::new())).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap().lines().count(), 1);
    }
}
