//! # Catalog Module
//!
//! Loading and querying the dataset catalog: a CSV index with one row per
//! physical dataset file, carrying the dataset facets, the calendar-year
//! interval the file covers and its storage locator.
//!
//! The index is fetched through the storage layer, so it can live on a
//! local disk, an S3 bucket or behind an HTTPS URL. Records are read-only
//! and fetched fresh per query; nothing is cached between runs.
//!
//! Expected CSV header:
//!
//! ```text
//! model,experiment,member,variable,frequency,start_year,end_year,path
//! ```

use crate::input::CatalogQuery;
use crate::storage::{StorageBackend, StorageError, StorageFactory};
use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to fetch catalog '{uri}': {source}")]
    Fetch {
        uri: String,
        #[source]
        source: StorageError,
    },

    #[error("Failed to parse catalog row {row}: {source}")]
    Parse {
        row: usize,
        #[source]
        source: csv::Error,
    },

    #[error("Catalog row {row} has an invalid interval: start_year {start} > end_year {end}")]
    InvalidInterval { row: usize, start: i32, end: i32 },

    #[error("No catalog record covers year {year} (searched {candidates} candidate(s))")]
    NoRecordForYear { year: i32, candidates: usize },
}

/// One row of the catalog: a physical dataset file and its coverage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogRecord {
    pub model: String,
    pub experiment: String,
    pub member: String,
    pub variable: String,
    pub frequency: String,
    /// First calendar year covered by the file (inclusive)
    pub start_year: i32,
    /// Last calendar year covered by the file (inclusive)
    pub end_year: i32,
    /// Storage locator of the file (local path, s3:// or https://)
    pub path: String,
}

impl CatalogRecord {
    /// True when the record's coverage interval contains the year,
    /// inclusive on both ends.
    pub fn covers(&self, year: i32) -> bool {
        self.start_year <= year && year <= self.end_year
    }

    fn matches(&self, query: &CatalogQuery) -> bool {
        self.model == query.model
            && self.experiment == query.experiment
            && self.member == query.member
            && self.variable == query.variable
            && self.frequency == query.frequency
    }
}

/// An in-memory catalog index.
#[derive(Debug, Clone)]
pub struct Catalog {
    records: Vec<CatalogRecord>,
}

impl Catalog {
    /// Fetches and parses the catalog behind the given locator.
    pub async fn load(uri: &str) -> Result<Self, CatalogError> {
        let storage = StorageFactory::from_path(uri)
            .await
            .map_err(|source| CatalogError::Fetch {
                uri: uri.to_string(),
                source,
            })?;
        let bytes = storage
            .read(uri)
            .await
            .map_err(|source| CatalogError::Fetch {
                uri: uri.to_string(),
                source,
            })?;

        let catalog = Self::from_csv_bytes(&bytes)?;
        debug!("Loaded catalog '{}' with {} records", uri, catalog.len());
        Ok(catalog)
    }

    /// Parses a catalog from raw CSV bytes.
    pub fn from_csv_bytes(bytes: &[u8]) -> Result<Self, CatalogError> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(bytes);

        let mut records = Vec::new();
        for (idx, result) in reader.deserialize::<CatalogRecord>().enumerate() {
            // Row numbers are 1-based and skip the header line.
            let row = idx + 2;
            let record = result.map_err(|source| CatalogError::Parse { row, source })?;
            if record.start_year > record.end_year {
                return Err(CatalogError::InvalidInterval {
                    row,
                    start: record.start_year,
                    end: record.end_year,
                });
            }
            records.push(record);
        }

        Ok(Catalog { records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[CatalogRecord] {
        &self.records
    }

    /// Returns every record matching all five query facets.
    ///
    /// Matches are sorted lexicographically by `path` so the result order
    /// is a property of the data, not of row order in the index file.
    pub fn search(&self, query: &CatalogQuery) -> Vec<CatalogRecord> {
        let mut matches: Vec<CatalogRecord> = self
            .records
            .iter()
            .filter(|r| r.matches(query))
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.path.cmp(&b.path));

        debug!(
            "Catalog search for {}/{}/{}/{}/{} matched {} record(s)",
            query.model,
            query.experiment,
            query.member,
            query.variable,
            query.frequency,
            matches.len()
        );
        matches
    }
}

/// Picks the record whose coverage interval contains the year.
///
/// When several records qualify the first one in the given order wins; fed
/// from [`Catalog::search`] that order is lexicographic by path, which makes
/// the tie-break explicit and stable. No qualifying record is an error, not
/// a silent empty answer.
pub fn select_for_year(
    records: &[CatalogRecord],
    year: i32,
) -> Result<&CatalogRecord, CatalogError> {
    records
        .iter()
        .find(|r| r.covers(year))
        .ok_or(CatalogError::NoRecordForYear {
            year,
            candidates: records.len(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_query() -> CatalogQuery {
        CatalogQuery {
            model: "MPI-ESM1-2-HR".to_string(),
            experiment: "ssp585".to_string(),
            member: "r1i1p1f1".to_string(),
            variable: "tasmax".to_string(),
            frequency: "day".to_string(),
        }
    }

    const SAMPLE_CSV: &str = "\
model,experiment,member,variable,frequency,start_year,end_year,path
MPI-ESM1-2-HR,ssp585,r1i1p1f1,tasmax,day,2015,2039,data/tasmax_2015-2039.nc
MPI-ESM1-2-HR,ssp585,r1i1p1f1,tasmax,day,2040,2069,data/tasmax_2040-2069.nc
MPI-ESM1-2-HR,ssp585,r1i1p1f1,tasmax,day,2070,2100,data/tasmax_2070-2100.nc
MPI-ESM1-2-HR,historical,r1i1p1f1,tasmax,day,1990,2014,data/tasmax_hist.nc
CanESM5,ssp585,r1i1p1f1,tasmax,day,2015,2100,data/canesm5_tasmax.nc
";

    #[test]
    fn test_parse_catalog_csv() {
        let catalog = Catalog::from_csv_bytes(SAMPLE_CSV.as_bytes()).unwrap();
        assert_eq!(catalog.len(), 5);

        let first = &catalog.records()[0];
        assert_eq!(first.model, "MPI-ESM1-2-HR");
        assert_eq!(first.start_year, 2015);
        assert_eq!(first.end_year, 2039);
        assert_eq!(first.path, "data/tasmax_2015-2039.nc");
    }

    #[test]
    fn test_parse_rejects_invalid_interval() {
        let csv = "\
model,experiment,member,variable,frequency,start_year,end_year,path
MPI-ESM1-2-HR,ssp585,r1i1p1f1,tasmax,day,2069,2040,data/bad.nc
";
        let err = Catalog::from_csv_bytes(csv.as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            CatalogError::InvalidInterval {
                row: 2,
                start: 2069,
                end: 2040
            }
        ));
    }

    #[test]
    fn test_parse_rejects_malformed_row() {
        let csv = "\
model,experiment,member,variable,frequency,start_year,end_year,path
MPI-ESM1-2-HR,ssp585,r1i1p1f1,tasmax,day,not_a_year,2040,data/bad.nc
";
        let err = Catalog::from_csv_bytes(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, CatalogError::Parse { row: 2, .. }));
    }

    #[test]
    fn test_search_matches_all_facets() {
        let catalog = Catalog::from_csv_bytes(SAMPLE_CSV.as_bytes()).unwrap();
        let matches = catalog.search(&sample_query());

        assert_eq!(matches.len(), 3);
        assert!(matches.iter().all(|r| r.experiment == "ssp585"));
        assert!(matches.iter().all(|r| r.model == "MPI-ESM1-2-HR"));
    }

    #[test]
    fn test_search_orders_by_path() {
        // Rows reversed relative to SAMPLE_CSV; search output must not care.
        let csv = "\
model,experiment,member,variable,frequency,start_year,end_year,path
MPI-ESM1-2-HR,ssp585,r1i1p1f1,tasmax,day,2070,2100,data/tasmax_2070-2100.nc
MPI-ESM1-2-HR,ssp585,r1i1p1f1,tasmax,day,2015,2039,data/tasmax_2015-2039.nc
";
        let catalog = Catalog::from_csv_bytes(csv.as_bytes()).unwrap();
        let matches = catalog.search(&sample_query());

        assert_eq!(matches[0].path, "data/tasmax_2015-2039.nc");
        assert_eq!(matches[1].path, "data/tasmax_2070-2100.nc");
    }

    #[test]
    fn test_select_for_year_containment() {
        let catalog = Catalog::from_csv_bytes(SAMPLE_CSV.as_bytes()).unwrap();
        let matches = catalog.search(&sample_query());

        let record = select_for_year(&matches, 2050).unwrap();
        assert_eq!(record.path, "data/tasmax_2040-2069.nc");

        // Interval ends are inclusive.
        let record = select_for_year(&matches, 2039).unwrap();
        assert_eq!(record.path, "data/tasmax_2015-2039.nc");
        let record = select_for_year(&matches, 2040).unwrap();
        assert_eq!(record.path, "data/tasmax_2040-2069.nc");
        let record = select_for_year(&matches, 2100).unwrap();
        assert_eq!(record.path, "data/tasmax_2070-2100.nc");
    }

    #[test]
    fn test_select_for_year_not_found() {
        let catalog = Catalog::from_csv_bytes(SAMPLE_CSV.as_bytes()).unwrap();
        let matches = catalog.search(&sample_query());

        let err = select_for_year(&matches, 2014).unwrap_err();
        assert!(matches!(
            err,
            CatalogError::NoRecordForYear {
                year: 2014,
                candidates: 3
            }
        ));

        let err = select_for_year(&[], 2050).unwrap_err();
        assert!(matches!(
            err,
            CatalogError::NoRecordForYear {
                year: 2050,
                candidates: 0
            }
        ));
    }

    #[test]
    fn test_select_overlapping_records_first_in_path_order() {
        let csv = "\
model,experiment,member,variable,frequency,start_year,end_year,path
MPI-ESM1-2-HR,ssp585,r1i1p1f1,tasmax,day,2015,2100,data/b_full.nc
MPI-ESM1-2-HR,ssp585,r1i1p1f1,tasmax,day,2040,2069,data/a_mid.nc
";
        let catalog = Catalog::from_csv_bytes(csv.as_bytes()).unwrap();
        let matches = catalog.search(&sample_query());

        let record = select_for_year(&matches, 2050).unwrap();
        assert_eq!(record.path, "data/a_mid.nc");
    }
}
