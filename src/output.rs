//! # Series Export Module
//!
//! Turns the extracted annual series into a Polars DataFrame and writes it
//! to Parquet or CSV. The format follows the output extension; `s3://`
//! targets are written to a temporary file first and uploaded through the
//! storage layer.
//!
//! The exported table carries one row per day: the date, the temperature in
//! Celsius and a summer-day flag, which is the tabular equivalent of the
//! chart the interactive tutorial drew.

use crate::series::AnnualSeries;
use crate::storage::{StorageBackend, StorageFactory};
use log::debug;
use polars::prelude::*;
use std::fs::File;

/// Builds the export table for an annual series.
///
/// Columns: `date` (ISO string), `tasmax_celsius` (f64), `summer_day`
/// (bool, strict threshold exceedance).
pub fn series_to_dataframe(
    series: &AnnualSeries,
    threshold: f64,
) -> Result<DataFrame, Box<dyn std::error::Error>> {
    let dates: Vec<String> = series.samples.iter().map(|s| s.date.to_string()).collect();
    let values: Vec<f64> = series.samples.iter().map(|s| s.celsius).collect();
    let flags: Vec<bool> = series.samples.iter().map(|s| s.celsius > threshold).collect();

    let df = DataFrame::new(vec![
        Series::new("date".into(), dates).into(),
        Series::new("tasmax_celsius".into(), values).into(),
        Series::new("summer_day".into(), flags).into(),
    ])?;
    Ok(df)
}

/// Writes the series table to `output_path`.
///
/// `.csv` writes CSV, anything else writes Parquet. Remote `s3://` targets
/// are staged through a temporary file.
pub async fn write_series(
    series: &AnnualSeries,
    threshold: f64,
    output_path: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let df = series_to_dataframe(series, threshold)?;

    debug!(
        "Writing {} rows for year {} to {}",
        df.height(),
        series.year,
        output_path
    );

    if StorageFactory::is_s3_path(output_path) {
        let temp_file = tempfile::NamedTempFile::new()?;
        let temp_path = temp_file
            .path()
            .to_str()
            .ok_or("Temporary path is not valid UTF-8")?
            .to_string();

        write_local(&df, &temp_path, output_path)?;

        let storage = StorageFactory::from_path(output_path).await?;
        let data = tokio::fs::read(&temp_path).await?;
        storage.write(output_path, &data).await?;

        debug!("Uploaded series to {}", output_path);
    } else {
        write_local(&df, output_path, output_path)?;
    }

    Ok(())
}

/// Writes to a local path; `format_hint` carries the original target so
/// staged S3 uploads still honor the requested extension.
fn write_local(
    df: &DataFrame,
    local_path: &str,
    format_hint: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let file = File::create(local_path)?;
    let mut df_clone = df.clone();

    if format_hint.ends_with(".csv") {
        CsvWriter::new(file).finish(&mut df_clone)?;
    } else {
        ParquetWriter::new(file).finish(&mut df_clone)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::{CfDate, Sample};
    use tempfile::TempDir;

    fn sample_series() -> AnnualSeries {
        AnnualSeries {
            year: 2050,
            samples: vec![
                Sample {
                    date: CfDate::noon(2050, 7, 1),
                    celsius: 24.0,
                },
                Sample {
                    date: CfDate::noon(2050, 7, 2),
                    celsius: 25.0,
                },
                Sample {
                    date: CfDate::noon(2050, 7, 3),
                    celsius: 27.5,
                },
            ],
        }
    }

    #[test]
    fn test_series_to_dataframe() {
        let df = series_to_dataframe(&sample_series(), 25.0).unwrap();

        assert_eq!(df.shape(), (3, 3));
        let names: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(names, vec!["date", "tasmax_celsius", "summer_day"]);

        // Strict threshold: 25.0 itself is not a summer day.
        let flags = df.column("summer_day").unwrap().bool().unwrap();
        let flags: Vec<bool> = flags.into_no_null_iter().collect();
        assert_eq!(flags, vec![false, false, true]);
    }

    #[tokio::test]
    async fn test_write_series_csv() -> Result<(), Box<dyn std::error::Error>> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("series.csv");
        let path_str = path.to_str().unwrap();

        write_series(&sample_series(), 25.0, path_str).await?;

        let content = std::fs::read_to_string(path_str)?;
        assert!(content.starts_with("date,tasmax_celsius,summer_day"));
        assert!(content.contains("2050-07-03"));

        Ok(())
    }

    #[tokio::test]
    async fn test_write_series_parquet() -> Result<(), Box<dyn std::error::Error>> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("series.parquet");
        let path_str = path.to_str().unwrap();

        write_series(&sample_series(), 25.0, path_str).await?;

        let file = File::open(path_str)?;
        let df = ParquetReader::new(file).finish()?;
        assert_eq!(df.shape(), (3, 3));

        Ok(())
    }
}
