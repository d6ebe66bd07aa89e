//! Writes a synthetic climate dataset as `climate_change_data.csv` and
//! `climate_change_data.parquet` in the given directory (default: `.`).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

use climate_insights::rng::SimpleRng;
use climate_insights::Variable;

const FIRST_YEAR: i32 = 2000;
const LAST_YEAR: i32 = 2022;
/// Share of measurement cells left empty.
const MISSING_RATE: f64 = 0.02;

/// (country, base temperature, base CO2, base precipitation, base humidity)
const COUNTRIES: [(&str, f64, f64, f64, f64); 8] = [
    ("Argentina", 17.0, 320.0, 60.0, 65.0),
    ("Canada", 3.0, 420.0, 55.0, 70.0),
    ("Chad", 28.0, 280.0, 25.0, 35.0),
    ("Finland", 4.5, 390.0, 50.0, 78.0),
    ("India", 25.0, 410.0, 90.0, 68.0),
    ("Norway", 5.5, 360.0, 80.0, 75.0),
    ("Peru", 19.0, 300.0, 70.0, 72.0),
    ("Vietnam", 24.5, 350.0, 150.0, 82.0),
];

struct Row {
    date: String,
    country: &'static str,
    values: [Option<f64>; Variable::COUNT],
}

fn generate(rng: &mut SimpleRng) -> Vec<Row> {
    let mut rows = Vec::new();
    for (country, base_temp, base_co2, base_precip, base_humidity) in COUNTRIES {
        for year in FIRST_YEAR..=LAST_YEAR {
            let elapsed = (year - FIRST_YEAR) as f64;
            for month in 1..=12u32 {
                let season = (std::f64::consts::TAU * (month as f64 - 1.0) / 12.0).cos();
                let co2 = base_co2 + 2.1 * elapsed + rng.gauss(0.0, 15.0);
                let sea_level = 0.32 * elapsed + rng.gauss(0.0, 0.6);
                let precipitation = (base_precip * (1.0 - 0.3 * season) + rng.gauss(0.0, 12.0)).max(0.0);
                let humidity = (base_humidity + rng.gauss(0.0, 6.0)).clamp(5.0, 100.0);
                let wind = (8.0 + rng.gauss(0.0, 3.0)).max(0.0);
                let temperature = base_temp
                    + 6.0 * season
                    + 0.004 * (co2 - base_co2)
                    + 0.6 * sea_level
                    - 0.05 * (humidity - base_humidity)
                    + rng.gauss(0.0, 1.2);

                let mut values = [
                    Some(temperature),
                    Some(co2),
                    Some(sea_level),
                    Some(precipitation),
                    Some(humidity),
                    Some(wind),
                ];
                for value in &mut values {
                    if rng.next_f64() < MISSING_RATE {
                        *value = None;
                    }
                }

                rows.push(Row {
                    date: format!("{year}-{month:02}-15"),
                    country,
                    values,
                });
            }
        }
    }
    rows
}

fn header() -> Vec<&'static str> {
    let mut header = vec!["Date", "Country"];
    header.extend(Variable::ALL.iter().map(|v| v.label()));
    header
}

fn write_csv(path: &Path, rows: &[Row]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    writer.write_record(header())?;
    for row in rows {
        let mut record = vec![row.date.clone(), row.country.to_string()];
        record.extend(
            row.values
                .iter()
                .map(|v| v.map(|v| format!("{v:.4}")).unwrap_or_default()),
        );
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_parquet(path: &Path, rows: &[Row]) -> Result<()> {
    let mut fields = vec![
        Field::new("Date", DataType::Utf8, false),
        Field::new("Country", DataType::Utf8, false),
    ];
    fields.extend(
        Variable::ALL
            .iter()
            .map(|v| Field::new(v.label(), DataType::Float64, true)),
    );
    let schema = Arc::new(Schema::new(fields));

    let mut columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.date.as_str()))),
        Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.country))),
    ];
    for var in Variable::ALL {
        let values: Float64Array = rows.iter().map(|r| r.values[var.index()]).collect();
        columns.push(Arc::new(values));
    }

    let batch = RecordBatch::try_new(schema.clone(), columns).context("building record batch")?;
    let file = std::fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    let out_dir = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("creating {}", out_dir.display()))?;

    let mut rng = SimpleRng::new(42);
    let rows = generate(&mut rng);

    let csv_path = out_dir.join("climate_change_data.csv");
    write_csv(&csv_path, &rows)?;
    let parquet_path = out_dir.join("climate_change_data.parquet");
    write_parquet(&parquet_path, &rows)?;

    println!(
        "Wrote {} rows for {} countries to {} and {}",
        rows.len(),
        COUNTRIES.len(),
        csv_path.display(),
        parquet_path.display()
    );
    Ok(())
}
