//! # summerdays
//!
//! A Rust library and CLI for computing the "summer days" climate index
//! from CMIP-style data archives: query a catalog for a daily-maximum
//! temperature dataset, pick the file covering a target year, resolve the
//! model grid cell nearest a place of interest, extract the annual series
//! in Celsius and count the days above a threshold.
//!
//! ## Features
//!
//! - **Catalog search**: CSV dataset index queried by model/experiment/
//!   member/variable/frequency facets, with deterministic year selection
//! - **Geocoding**: free-text place names resolved through Nominatim, with
//!   ambiguity surfaced instead of silently swallowed
//! - **Nearest cell**: separable Chebyshev search over regular grids, plus
//!   a great-circle fallback for curvilinear ones
//! - **Calendar aware**: standard, 365-day and 360-day model calendars
//! - **Storage**: local paths, S3 objects and HTTPS URLs behind one seam
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use summerdays::{process_request, input::RequestConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RequestConfig::from_file("request.json")?;
//!     let report = process_request(&config).await?;
//!     println!("{} summer days", report.count);
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod cli;
pub mod geocode;
pub mod grid;
pub mod info;
pub mod input;
pub mod output;
pub mod report;
pub mod series;
pub mod stats;
pub mod storage;

#[cfg(test)]
mod tests;

use crate::catalog::{select_for_year, Catalog};
use crate::geocode::Geocoder;
use crate::grid::{cell_bounds, nearest_cell, CellBounds, CellIndex};
use crate::input::{LocationSpec, RequestConfig};
use crate::series::{coordinate_axis, extract_annual_series};
use crate::stats::count_summer_days;
use crate::storage::{StorageBackend, StorageFactory};
use log::{debug, info};
use serde::Serialize;

/// Result of one summer-day request.
#[derive(Debug, Clone, Serialize)]
pub struct SummerDaysReport {
    /// Number of days strictly above the threshold
    pub count: usize,
    pub year: i32,
    pub threshold_celsius: f64,
    /// Resolved display name, or formatted coordinates
    pub place: String,
    pub target_lat: f64,
    pub target_lon: f64,
    /// Indices of the chosen grid cell
    pub cell: CellIndex,
    /// Center coordinates of the chosen cell
    pub cell_lat: f64,
    pub cell_lon: f64,
    /// Bounding rectangle of the chosen cell
    pub bounds: CellBounds,
    /// Storage locator of the dataset file used
    pub dataset_path: String,
    /// Number of daily samples in the extracted series
    pub days_in_series: usize,
}

/// Runs the full pipeline for one request.
///
/// Steps: resolve the location, discover and select the dataset, stage it
/// locally, find the nearest grid cell, extract the annual Celsius series,
/// count summer days and optionally export the series. Each step's failure
/// is typed and fatal; there are no retries.
pub async fn process_request(
    config: &RequestConfig,
) -> Result<SummerDaysReport, Box<dyn std::error::Error>> {
    config.validate()?;

    // 1. Location
    let (target_lat, target_lon, place) = match &config.location {
        LocationSpec::Coords { lat, lon } => (*lat, *lon, format!("{:.4}, {:.4}", lat, lon)),
        LocationSpec::Place { place } => {
            let resolved = Geocoder::new().resolve(place).await?;
            info!(
                "Resolved '{}' to {:.4}, {:.4} ({})",
                place, resolved.lat, resolved.lon, resolved.display_name
            );
            (resolved.lat, resolved.lon, resolved.display_name)
        }
    };

    // 2. Discovery and selection
    let catalog = Catalog::load(&config.catalog).await?;
    let candidates = catalog.search(&config.query);
    let record = select_for_year(&candidates, config.year)?;
    info!(
        "Selected dataset {} ({}-{})",
        record.path, record.start_year, record.end_year
    );

    // 3. Stage the dataset locally if needed
    let (_temp_file, local_path) = if StorageFactory::is_remote_path(&record.path) {
        let storage = StorageFactory::from_path(&record.path).await?;
        let data = storage.read(&record.path).await?;

        let temp_file = tempfile::NamedTempFile::new()?;
        tokio::fs::write(temp_file.path(), data).await?;
        debug!("Staged {} to {:?}", record.path, temp_file.path());

        let path = temp_file.path().to_string_lossy().to_string();
        (Some(temp_file), path)
    } else {
        (None, record.path.clone())
    };

    let file = netcdf::open(&local_path)?;

    // 4. Nearest grid cell, using the variable's own coordinate axes
    let var = file
        .variable(&config.query.variable)
        .ok_or_else(|| format!("Variable '{}' not found in dataset", config.query.variable))?;
    let dims = var.dimensions();
    if dims.len() != 3 {
        return Err(format!(
            "Variable '{}' has {} dimension(s), expected time/lat/lon",
            config.query.variable,
            dims.len()
        )
        .into());
    }
    let lat_name = dims[1].name().to_string();
    let lon_name = dims[2].name().to_string();

    let lats = coordinate_axis(&file, &lat_name)?;
    let lons = coordinate_axis(&file, &lon_name)?;

    let cell = nearest_cell(&lats, &lons, target_lat, target_lon)?;
    let bounds = cell_bounds(&lats, &lons, cell)?;
    debug!(
        "Nearest cell for {:.4}, {:.4} is ({}, {})",
        target_lat, target_lon, cell.row, cell.col
    );

    // 5. Annual series in Celsius
    let series = extract_annual_series(
        &file,
        &config.query.variable,
        cell.row,
        cell.col,
        config.year,
    )?;

    // 6. The statistic itself
    let count = count_summer_days(&series.values(), config.threshold_celsius);

    // 7. Optional export
    if let Some(output_path) = &config.output {
        output::write_series(&series, config.threshold_celsius, output_path).await?;
        info!("Exported annual series to {}", output_path);
    }

    let report = SummerDaysReport {
        count,
        year: config.year,
        threshold_celsius: config.threshold_celsius,
        place,
        target_lat,
        target_lon,
        cell,
        cell_lat: lats[cell.row],
        cell_lon: lons[cell.col],
        bounds,
        dataset_path: record.path.clone(),
        days_in_series: series.len(),
    };

    file.close()?;
    Ok(report)
}
