use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{
    Array, Date32Array, Float32Array, Float64Array, Int32Array, Int64Array, LargeStringArray,
    StringArray,
};
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;
use thiserror::Error;

use super::model::{Dataset, Observation, Variable};

const DATE_COLUMN: &str = "Date";
const COUNTRY_COLUMN: &str = "Country";
const USER_AGENT: &str = concat!("climate-insights/", env!("CARGO_PKG_VERSION"));

/// Errors raised while obtaining or parsing the dataset.
#[derive(Debug, Error)]
pub enum DataError {
    /// No local copy and the remote fetch failed. Fatal for the run.
    #[error("dataset unavailable: {0}")]
    DataUnavailable(String),

    #[error("missing required column '{0}'")]
    MissingColumn(String),

    #[error("unsupported file extension: .{0}")]
    UnsupportedFormat(String),

    #[error("malformed input: {0}")]
    Malformed(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error(transparent)]
    Arrow(#[from] arrow::error::ArrowError),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Archive(#[from] zip::result::ZipError),
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Where the dataset comes from: a local file, with an optional remote
/// archive used once to populate it.
#[derive(Debug, Clone)]
pub struct DatasetSource {
    pub local_path: PathBuf,
    pub remote_url: Option<String>,
}

impl DatasetSource {
    pub fn new(local_path: impl Into<PathBuf>, remote_url: Option<String>) -> Self {
        Self {
            local_path: local_path.into(),
            remote_url,
        }
    }

    /// Where a fetched table is saved. The remote payload is CSV, so a
    /// non-CSV `local_path` gets a `.csv` sibling.
    pub fn persisted_path(&self) -> PathBuf {
        let is_csv = self
            .local_path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
        if is_csv {
            self.local_path.clone()
        } else {
            self.local_path.with_extension("csv")
        }
    }

    /// Load the dataset, fetching and persisting it first if no local copy
    /// exists. Repeated calls read the persisted copy.
    pub fn load(&self) -> Result<Dataset, DataError> {
        if self.local_path.exists() {
            log::info!("Loading dataset from {}", self.local_path.display());
            return load_file(&self.local_path);
        }

        let persisted = self.persisted_path();
        if persisted != self.local_path && persisted.exists() {
            log::info!("Loading saved copy from {}", persisted.display());
            return load_file(&persisted);
        }

        let Some(url) = self.remote_url.as_deref() else {
            return Err(DataError::DataUnavailable(format!(
                "{} does not exist and no remote source is configured",
                self.local_path.display()
            )));
        };

        log::info!(
            "{} not found, fetching dataset from {url}",
            self.local_path.display()
        );
        self.fetch_remote(url)
            .map_err(|e| match e {
                unavailable @ DataError::DataUnavailable(_) => unavailable,
                other => DataError::DataUnavailable(format!("fetching {url}: {other}")),
            })
    }

    fn fetch_remote(&self, url: &str) -> Result<Dataset, DataError> {
        let payload = download(url)?;
        let csv_bytes = extract_first_csv(&payload)?;
        let dataset = parse_csv(csv_bytes.as_slice())?;
        if dataset.is_empty() {
            return Err(DataError::DataUnavailable(format!(
                "{url} yielded an empty table"
            )));
        }

        let target = self.persisted_path();
        match persist(&target, &csv_bytes) {
            Ok(()) => log::info!("Saved {} rows to {}", dataset.len(), target.display()),
            Err(e) => log::warn!("Could not save local copy to {}: {e}", target.display()),
        }
        Ok(dataset)
    }
}

/// Load a climate dataset from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row with `Date`, `Country` and the six measurements
/// * `.json`    – `[{ "Date": "...", "Country": "...", "Temperature": 1.0, ... }, ...]`
/// * `.parquet` – flat columns with the same names
pub fn load_file(path: &Path) -> Result<Dataset, DataError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let dataset = match ext.as_str() {
        "csv" => parse_csv(std::fs::File::open(path)?)?,
        "json" => load_json(path)?,
        "parquet" | "pq" => load_parquet(path)?,
        other => return Err(DataError::UnsupportedFormat(other.to_string())),
    };
    log::info!(
        "Loaded {} observations covering {} countries",
        dataset.len(),
        dataset.countries().len()
    );
    Ok(dataset)
}

// ---------------------------------------------------------------------------
// Remote fetch
// ---------------------------------------------------------------------------

fn download(url: &str) -> Result<Vec<u8>, DataError> {
    let client = reqwest::blocking::Client::builder()
        .user_agent(USER_AGENT)
        .build()?;
    let response = client.get(url).send()?.error_for_status()?;
    Ok(response.bytes()?.to_vec())
}

/// Return the first `.csv` entry of a ZIP payload. A payload that is not a
/// ZIP archive is assumed to be CSV text already.
pub fn extract_first_csv(payload: &[u8]) -> Result<Vec<u8>, DataError> {
    if !payload.starts_with(b"PK\x03\x04") {
        return Ok(payload.to_vec());
    }

    let mut archive = zip::ZipArchive::new(Cursor::new(payload))?;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if entry.is_file() && entry.name().to_ascii_lowercase().ends_with(".csv") {
            log::debug!("Using archive entry {}", entry.name());
            let mut bytes = Vec::new();
            entry.read_to_end(&mut bytes)?;
            return Ok(bytes);
        }
    }
    Err(DataError::DataUnavailable(
        "archive contains no CSV file".to_string(),
    ))
}

fn persist(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, bytes)
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// Parse a CSV table. Extra columns are ignored; unparseable numeric cells
/// become missing values and unparseable dates leave the derived fields empty.
pub fn parse_csv<R: Read>(reader: R) -> Result<Dataset, DataError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();

    let date_idx = column_index(&headers, DATE_COLUMN)?;
    let country_idx = column_index(&headers, COUNTRY_COLUMN)?;
    let mut value_idx = [0usize; Variable::COUNT];
    for var in Variable::ALL {
        value_idx[var.index()] = column_index(&headers, var.label())?;
    }

    let mut observations = Vec::new();
    let mut undated = 0usize;
    for result in reader.records() {
        let record = result?;
        let cell = |idx: usize| record.get(idx).unwrap_or("");

        let mut values = [None; Variable::COUNT];
        for (slot, &idx) in values.iter_mut().zip(value_idx.iter()) {
            *slot = parse_number(cell(idx));
        }

        let obs = Observation::new(cell(country_idx), cell(date_idx), values);
        if obs.date.is_none() {
            undated += 1;
        }
        observations.push(obs);
    }

    if undated > 0 {
        log::warn!("{undated} rows have an unparseable date");
    }
    Ok(Dataset::new(observations))
}

fn column_index(headers: &[String], name: &str) -> Result<usize, DataError> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| DataError::MissingColumn(name.to_string()))
}

fn parse_number(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Records-oriented JSON, as written by `df.to_json(orient='records')`.
/// Numbers may also be given as numeric strings.
fn load_json(path: &Path) -> Result<Dataset, DataError> {
    let text = std::fs::read_to_string(path)?;
    parse_json(&text)
}

pub fn parse_json(text: &str) -> Result<Dataset, DataError> {
    let root: JsonValue = serde_json::from_str(text)?;
    let records = root
        .as_array()
        .ok_or_else(|| DataError::Malformed("expected top-level JSON array".to_string()))?;

    let mut observations = Vec::with_capacity(records.len());
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .ok_or_else(|| DataError::Malformed(format!("row {i} is not a JSON object")))?;

        let text_field = |key: &str| match obj.get(key) {
            Some(JsonValue::String(s)) => s.clone(),
            Some(JsonValue::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };

        let mut values = [None; Variable::COUNT];
        for var in Variable::ALL {
            values[var.index()] = obj.get(var.label()).and_then(json_number);
        }
        observations.push(Observation::new(
            text_field(COUNTRY_COLUMN),
            text_field(DATE_COLUMN),
            values,
        ));
    }
    Ok(Dataset::new(observations))
}

fn json_number(val: &JsonValue) -> Option<f64> {
    match val {
        JsonValue::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        JsonValue::String(s) => parse_number(s),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file with flat columns.
///
/// Expected schema:
/// - `Date`: Utf8, LargeUtf8 or Date32
/// - `Country`: Utf8 or LargeUtf8
/// - measurement columns: Float64, Float32, Int64 or Int32 (nullable)
fn load_parquet(path: &Path) -> Result<Dataset, DataError> {
    let file = std::fs::File::open(path)?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;

    let mut observations = Vec::new();

    for batch_result in reader {
        let batch = batch_result?;
        let schema = batch.schema();
        let index_of = |name: &str| {
            schema
                .index_of(name)
                .map_err(|_| DataError::MissingColumn(name.to_string()))
        };

        let date_col = batch.column(index_of(DATE_COLUMN)?);
        let country_col = batch.column(index_of(COUNTRY_COLUMN)?);
        let mut value_cols = Vec::with_capacity(Variable::COUNT);
        for var in Variable::ALL {
            value_cols.push(batch.column(index_of(var.label())?));
        }

        for row in 0..batch.num_rows() {
            let mut values = [None; Variable::COUNT];
            for (slot, col) in values.iter_mut().zip(&value_cols) {
                *slot = numeric_at(col, row);
            }
            observations.push(Observation::new(
                text_at(country_col, row).unwrap_or_default(),
                text_at(date_col, row).unwrap_or_default(),
                values,
            ));
        }
    }

    Ok(Dataset::new(observations))
}

// -- Parquet / Arrow helpers --

/// Read a text-like cell; Date32 cells are rendered as `YYYY-MM-DD`.
fn text_at(col: &Arc<dyn Array>, row: usize) -> Option<String> {
    if col.is_null(row) {
        return None;
    }
    match col.data_type() {
        DataType::Utf8 => col
            .as_any()
            .downcast_ref::<StringArray>()
            .map(|a| a.value(row).to_string()),
        DataType::LargeUtf8 => col
            .as_any()
            .downcast_ref::<LargeStringArray>()
            .map(|a| a.value(row).to_string()),
        DataType::Date32 => col
            .as_any()
            .downcast_ref::<Date32Array>()
            .and_then(|a| a.value_as_date(row))
            .map(|d| d.format("%Y-%m-%d").to_string()),
        _ => None,
    }
}

/// Read a numeric cell as `f64`; nulls and non-numeric columns are missing.
fn numeric_at(col: &Arc<dyn Array>, row: usize) -> Option<f64> {
    if col.is_null(row) {
        return None;
    }
    let value = match col.data_type() {
        DataType::Float64 => col
            .as_any()
            .downcast_ref::<Float64Array>()
            .map(|a| a.value(row)),
        DataType::Float32 => col
            .as_any()
            .downcast_ref::<Float32Array>()
            .map(|a| a.value(row) as f64),
        DataType::Int64 => col
            .as_any()
            .downcast_ref::<Int64Array>()
            .map(|a| a.value(row) as f64),
        DataType::Int32 => col
            .as_any()
            .downcast_ref::<Int32Array>()
            .map(|a| a.value(row) as f64),
        _ => None,
    };
    value.filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::net::TcpListener;

    const CSV: &str = "\
Date,Country,Temperature,CO2 Emissions,Sea Level Rise,Precipitation,Humidity,Wind Speed
2000-01-01 00:00:00.000000000,Chad,10.5,400,0.1,50,60,5
2000-02-01,Peru,abc,410,0.2,55,61,6
not-a-date,Chad,12.0,,0.3,60,62,7
";

    fn zip_with(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default();
        for (name, data) in entries {
            writer.start_file(*name, options).unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    /// Answer a single HTTP request with `body`.
    fn serve_once(body: Vec<u8>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let mut buf = [0u8; 4096];
                let _ = stream.read(&mut buf);
                let header = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/zip\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    body.len()
                );
                let _ = stream.write_all(header.as_bytes());
                let _ = stream.write_all(&body);
            }
        });
        format!("http://{addr}/climate.zip")
    }

    #[test]
    fn test_parse_csv_missing_cells() {
        let ds = parse_csv(CSV.as_bytes()).unwrap();
        assert_eq!(ds.len(), 3);

        let rows = ds.observations();
        assert_eq!(rows[0].year(), Some(2000));
        assert_eq!(rows[0].value(Variable::Temperature), Some(10.5));
        assert_eq!(rows[1].value(Variable::Temperature), None);
        assert_eq!(rows[1].value(Variable::Co2Emissions), Some(410.0));
        assert_eq!(rows[2].year(), None);
        assert_eq!(rows[2].value(Variable::Co2Emissions), None);
        assert_eq!(rows[2].value(Variable::WindSpeed), Some(7.0));
    }

    #[test]
    fn test_parse_csv_missing_column() {
        let err = parse_csv("Date,Country,Temperature\n2000-01-01,Chad,1\n".as_bytes()).unwrap_err();
        assert!(matches!(err, DataError::MissingColumn(ref c) if c == "CO2 Emissions"));
    }

    #[test]
    fn test_parse_json_records() {
        let text = r#"[
            {"Date": "2001-05-01", "Country": "Chad", "Temperature": 14.2, "CO2 Emissions": "390.5",
             "Sea Level Rise": null, "Precipitation": 20, "Humidity": 40, "Wind Speed": 3}
        ]"#;
        let ds = parse_json(text).unwrap();
        let row = &ds.observations()[0];
        assert_eq!(row.month(), Some(5));
        assert_eq!(row.value(Variable::Co2Emissions), Some(390.5));
        assert_eq!(row.value(Variable::SeaLevelRise), None);
        assert_eq!(row.value(Variable::Precipitation), Some(20.0));

        assert!(matches!(parse_json("{}"), Err(DataError::Malformed(_))));
    }

    #[test]
    fn test_extract_first_csv_from_archive() {
        let archive = zip_with(&[
            ("README.txt", b"not data"),
            ("data/climate.CSV", CSV.as_bytes()),
            ("data/other.csv", b"ignored"),
        ]);
        let bytes = extract_first_csv(&archive).unwrap();
        assert_eq!(bytes, CSV.as_bytes());

        let plain = extract_first_csv(CSV.as_bytes()).unwrap();
        assert_eq!(plain, CSV.as_bytes());

        let no_csv = zip_with(&[("README.txt", b"nothing")]);
        assert!(matches!(
            extract_first_csv(&no_csv),
            Err(DataError::DataUnavailable(_))
        ));
    }

    #[test]
    fn test_archive_entry_size_header_is_not_trusted() {
        let mut archive = zip_with(&[("climate.csv", CSV.as_bytes())]);
        // Uncompressed size field of the central directory record.
        let central = archive
            .windows(4)
            .position(|w| w == b"PK\x01\x02")
            .unwrap();
        archive[central + 24..central + 28].copy_from_slice(&0xFFFF_FFF0u32.to_le_bytes());

        match extract_first_csv(&archive) {
            Ok(bytes) => assert_eq!(bytes, CSV.as_bytes()),
            Err(e) => assert!(matches!(e, DataError::Io(_) | DataError::Archive(_))),
        }
    }

    #[test]
    fn test_load_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("climate.csv");
        std::fs::write(&path, CSV).unwrap();

        let ds = DatasetSource::new(&path, None).load().unwrap();
        assert_eq!(ds.len(), 3);
        assert_eq!(ds.countries().len(), 2);
    }

    #[test]
    fn test_missing_local_without_remote_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let source = DatasetSource::new(dir.path().join("absent.csv"), None);
        assert!(matches!(source.load(), Err(DataError::DataUnavailable(_))));
    }

    #[test]
    fn test_unreachable_remote_is_unavailable() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("climate.csv");
        let source = DatasetSource::new(&local, Some(format!("http://{addr}/climate.zip")));
        assert!(matches!(source.load(), Err(DataError::DataUnavailable(_))));
        assert!(!local.exists());
    }

    #[test]
    fn test_remote_fetch_persists_local_copy() {
        let url = serve_once(zip_with(&[("climate.csv", CSV.as_bytes())]));
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("cache").join("climate.csv");
        let source = DatasetSource::new(&local, Some(url));

        let fetched = source.load().unwrap();
        assert_eq!(fetched.len(), 3);
        assert!(local.exists());

        // The one-shot server is gone; this must come from disk.
        let reloaded = source.load().unwrap();
        assert_eq!(reloaded, fetched);
    }

    #[test]
    fn test_remote_fetch_with_parquet_path_reloads_csv_copy() {
        let url = serve_once(zip_with(&[("climate.csv", CSV.as_bytes())]));
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("climate.parquet");
        let source = DatasetSource::new(&local, Some(url));
        assert_eq!(source.persisted_path(), dir.path().join("climate.csv"));

        let fetched = source.load().unwrap();
        assert!(!local.exists());
        assert!(dir.path().join("climate.csv").exists());

        let reloaded = source.load().unwrap();
        assert_eq!(reloaded, fetched);
    }

    #[test]
    fn test_remote_empty_table_is_unavailable() {
        let header_only = CSV.lines().next().unwrap().to_string() + "\n";
        let url = serve_once(zip_with(&[("climate.csv", header_only.as_bytes())]));
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("climate.csv");

        let err = DatasetSource::new(&local, Some(url)).load().unwrap_err();
        assert!(matches!(err, DataError::DataUnavailable(_)));
        assert!(!local.exists());
    }

    #[test]
    fn test_load_parquet() {
        use arrow::datatypes::{Field, Schema};
        use arrow::record_batch::RecordBatch;
        use parquet::arrow::ArrowWriter;

        let mut fields = vec![
            Field::new(DATE_COLUMN, DataType::Utf8, true),
            Field::new(COUNTRY_COLUMN, DataType::Utf8, true),
        ];
        let mut columns: Vec<Arc<dyn Array>> = vec![
            Arc::new(StringArray::from(vec![Some("2010-04-01"), Some("bad")])),
            Arc::new(StringArray::from(vec![Some("Chad"), Some("Peru")])),
        ];
        for var in Variable::ALL {
            fields.push(Field::new(var.label(), DataType::Float64, true));
            columns.push(Arc::new(Float64Array::from(vec![Some(1.0), None])));
        }
        let schema = Arc::new(Schema::new(fields));
        let batch = RecordBatch::try_new(schema.clone(), columns).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("climate.parquet");
        let file = std::fs::File::create(&path).unwrap();
        let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let ds = load_file(&path).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.observations()[0].year(), Some(2010));
        assert_eq!(ds.observations()[0].value(Variable::Humidity), Some(1.0));
        assert_eq!(ds.observations()[1].year(), None);
        assert_eq!(ds.observations()[1].value(Variable::Humidity), None);
    }

    #[test]
    fn test_unsupported_extension() {
        let err = load_file(Path::new("climate.xlsx")).unwrap_err();
        assert!(matches!(err, DataError::UnsupportedFormat(ref e) if e == "xlsx"));
    }
}
