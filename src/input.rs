//! # Request Configuration Module
//!
//! Configuration parsing and validation for summer-day requests. A request
//! names the catalog to search, the dataset facets to match, the location
//! of interest and the target year; it is the single immutable value that
//! threads through the whole pipeline.
//!
//! ## Configuration Structure
//!
//! - **catalog**: locator of the CSV catalog index (local path, s3:// or https://)
//! - **query**: dataset facets (model, experiment, member, variable, frequency)
//! - **location**: a free-text place name or explicit coordinates
//! - **year**: target calendar year (2015-2100)
//! - **threshold_celsius**: summer-day threshold, default 25.0
//! - **output**: optional path for the exported annual series
//!
//! ## Example Usage
//!
//! ```rust
//! use summerdays::input::RequestConfig;
//!
//! let json = r#"
//! {
//!   "catalog": "https://example.org/cmip6-catalog.csv",
//!   "query": {
//!     "model": "MPI-ESM1-2-HR",
//!     "experiment": "ssp585",
//!     "member": "r1i1p1f1",
//!     "variable": "tasmax",
//!     "frequency": "day"
//!   },
//!   "location": { "place": "Hamburg" },
//!   "year": 2050
//! }"#;
//! let config = RequestConfig::from_json(json)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::stats::DEFAULT_THRESHOLD_CELSIUS;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// First year selectable in a request; matches the scenario span of the
/// CMIP6 projection experiments this tool targets.
pub const MIN_YEAR: i32 = 2015;
/// Last selectable year.
pub const MAX_YEAR: i32 = 2100;

/// Dataset facets used to filter the catalog.
///
/// These are the five filter keys the catalog search accepts; records match
/// on exact string equality of every facet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogQuery {
    /// Source model identifier, e.g. "MPI-ESM1-2-HR"
    pub model: String,
    /// Experiment identifier, e.g. "ssp585"
    pub experiment: String,
    /// Ensemble member identifier, e.g. "r1i1p1f1"
    pub member: String,
    /// Variable identifier, e.g. "tasmax"
    pub variable: String,
    /// Temporal resolution identifier, e.g. "day"
    pub frequency: String,
}

/// Where the user wants the statistic computed.
///
/// Either a free-text place name that the geocoder resolves, or explicit
/// coordinates that skip geocoding entirely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LocationSpec {
    /// Free-text place name, resolved through the geocoder
    Place { place: String },
    /// Explicit coordinates in degrees
    Coords { lat: f64, lon: f64 },
}

/// Complete configuration for one summer-day request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestConfig {
    /// Locator of the CSV catalog index
    pub catalog: String,
    /// Dataset facets to match in the catalog
    pub query: CatalogQuery,
    /// Place name or coordinates
    pub location: LocationSpec,
    /// Target calendar year
    pub year: i32,
    /// Summer-day threshold in degrees Celsius
    #[serde(default = "default_threshold")]
    pub threshold_celsius: f64,
    /// Optional path for the exported annual series (.parquet or .csv)
    #[serde(default)]
    pub output: Option<String>,
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD_CELSIUS
}

impl RequestConfig {
    /// Loads a request configuration from a JSON or YAML file, chosen by
    /// file extension (`.yaml`/`.yml` parse as YAML, everything else as
    /// JSON).
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;

        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        );
        if is_yaml {
            Self::from_yaml(&content)
        } else {
            Self::from_json(&content)
        }
    }

    /// Parses a request configuration from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config: RequestConfig = serde_json::from_str(json_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Parses a request configuration from a YAML string.
    pub fn from_yaml(yaml_str: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config: RequestConfig = serde_yaml::from_str(yaml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the bounds the rest of the pipeline assumes.
    pub fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        if self.catalog.trim().is_empty() {
            return Err("Catalog locator must not be empty".into());
        }
        if self.year < MIN_YEAR || self.year > MAX_YEAR {
            return Err(format!(
                "Year {} outside supported range {}-{}",
                self.year, MIN_YEAR, MAX_YEAR
            )
            .into());
        }
        if !self.threshold_celsius.is_finite() {
            return Err("Threshold must be a finite number".into());
        }
        if let LocationSpec::Coords { lat, lon } = self.location {
            if !(-90.0..=90.0).contains(&lat) {
                return Err(format!("Latitude {} outside [-90, 90]", lat).into());
            }
            if !(-180.0..=180.0).contains(&lon) {
                return Err(format!("Longitude {} outside [-180, 180]", lon).into());
            }
        }
        if let LocationSpec::Place { place } = &self.location {
            if place.trim().is_empty() {
                return Err("Place name must not be empty".into());
            }
        }
        Ok(())
    }
}
