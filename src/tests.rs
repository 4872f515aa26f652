use crate::catalog::Catalog;
use crate::grid::nearest_cell;
use crate::input::{CatalogQuery, LocationSpec, RequestConfig};
use crate::process_request;
use crate::series::{coordinate_axis, extract_annual_series, to_kelvin};
use crate::stats::count_summer_days;
use std::path::Path;
use tempfile::tempdir;

const FIXTURE_LATS: [f64; 3] = [52.0, 53.0, 54.0];
const FIXTURE_LONS: [f64; 3] = [9.0, 10.0, 11.0];

/// Days strictly above 25 °C at cell (1, 1) in the noleap fixture.
const FIXTURE_HOT_DAYS: usize = 40;

/// Writes a small tasmax dataset: a 3x3 grid, one value per day at local
/// noon, 365-day calendar, covering the single year 2050.
///
/// Cell (1, 1) carries a designed series: 40 days at 30 °C, one day at
/// exactly 25 °C, the rest at 20 °C. Every other cell sits at a constant
/// cold value.
fn create_noleap_fixture(path: &Path) {
    let mut file = netcdf::create(path).unwrap();

    file.add_dimension("time", 365).unwrap();
    file.add_dimension("lat", 3).unwrap();
    file.add_dimension("lon", 3).unwrap();

    let mut lat = file.add_variable::<f64>("lat", &["lat"]).unwrap();
    lat.put_values(&FIXTURE_LATS, ..).unwrap();

    let mut lon = file.add_variable::<f64>("lon", &["lon"]).unwrap();
    lon.put_values(&FIXTURE_LONS, ..).unwrap();

    let mut time = file.add_variable::<f64>("time", &["time"]).unwrap();
    let offsets: Vec<f64> = (0..365).map(|i| i as f64 + 0.5).collect();
    time.put_values(&offsets, ..).unwrap();
    time.put_attribute("units", "days since 2050-01-01 00:00:00")
        .unwrap();
    time.put_attribute("calendar", "noleap").unwrap();

    let mut tasmax = file
        .add_variable::<f64>("tasmax", &["time", "lat", "lon"])
        .unwrap();
    tasmax.put_attribute("units", "K").unwrap();

    let mut data = Vec::with_capacity(365 * 9);
    for t in 0..365 {
        for row in 0..3 {
            for col in 0..3 {
                let celsius = if (row, col) == (1, 1) {
                    if t < FIXTURE_HOT_DAYS {
                        30.0
                    } else if t == FIXTURE_HOT_DAYS {
                        25.0
                    } else {
                        20.0
                    }
                } else {
                    7.0
                };
                data.push(to_kelvin(celsius));
            }
        }
    }
    tasmax.put_values(&data, ..).unwrap();
}

/// Writes a standard-calendar fixture covering the leap year 2016: 366
/// values, all below any sensible threshold.
fn create_leap_fixture(path: &Path) {
    let mut file = netcdf::create(path).unwrap();

    file.add_dimension("time", 366).unwrap();
    file.add_dimension("lat", 2).unwrap();
    file.add_dimension("lon", 2).unwrap();

    let mut lat = file.add_variable::<f64>("lat", &["lat"]).unwrap();
    lat.put_values(&[40.0, 41.0], ..).unwrap();

    let mut lon = file.add_variable::<f64>("lon", &["lon"]).unwrap();
    lon.put_values(&[-3.0, -2.0], ..).unwrap();

    let mut time = file.add_variable::<f64>("time", &["time"]).unwrap();
    let offsets: Vec<f64> = (0..366).map(|i| i as f64 + 0.5).collect();
    time.put_values(&offsets, ..).unwrap();
    time.put_attribute("units", "days since 2016-01-01 00:00:00")
        .unwrap();
    time.put_attribute("calendar", "standard").unwrap();

    let mut tasmax = file
        .add_variable::<f64>("tasmax", &["time", "lat", "lon"])
        .unwrap();
    tasmax.put_attribute("units", "K").unwrap();

    let data = vec![to_kelvin(10.0); 366 * 4];
    tasmax.put_values(&data, ..).unwrap();
}

fn fixture_query() -> CatalogQuery {
    CatalogQuery {
        model: "MPI-ESM1-2-HR".to_string(),
        experiment: "ssp585".to_string(),
        member: "r1i1p1f1".to_string(),
        variable: "tasmax".to_string(),
        frequency: "day".to_string(),
    }
}

fn write_catalog(path: &Path, records: &[(i32, i32, &str)]) {
    let mut content =
        String::from("model,experiment,member,variable,frequency,start_year,end_year,path\n");
    for (start, end, data_path) in records {
        content.push_str(&format!(
            "MPI-ESM1-2-HR,ssp585,r1i1p1f1,tasmax,day,{},{},{}\n",
            start, end, data_path
        ));
    }
    std::fs::write(path, content).unwrap();
}

#[cfg(test)]
mod extraction_tests {
    use super::*;

    #[test]
    fn test_extract_series_from_noleap_fixture() {
        let dir = tempdir().unwrap();
        let nc_path = dir.path().join("tasmax_2050.nc");
        create_noleap_fixture(&nc_path);

        let file = netcdf::open(&nc_path).unwrap();
        let series = extract_annual_series(&file, "tasmax", 1, 1, 2050).unwrap();

        assert_eq!(series.len(), 365);
        let values = series.values();
        assert!((values[0] - 30.0).abs() < 1e-9);
        assert!((values[FIXTURE_HOT_DAYS] - 25.0).abs() < 1e-9);
        assert!((values[364] - 20.0).abs() < 1e-9);

        // Dates span the whole year in order
        assert_eq!(series.samples.first().unwrap().date.to_string(), "2050-01-01");
        assert_eq!(series.samples.last().unwrap().date.to_string(), "2050-12-31");
    }

    #[test]
    fn test_extract_series_leap_year_has_366_days() {
        let dir = tempdir().unwrap();
        let nc_path = dir.path().join("tasmax_2016.nc");
        create_leap_fixture(&nc_path);

        let file = netcdf::open(&nc_path).unwrap();
        let series = extract_annual_series(&file, "tasmax", 0, 0, 2016).unwrap();

        assert_eq!(series.len(), 366);
        assert_eq!(series.samples[59].date.to_string(), "2016-02-29");
    }

    #[test]
    fn test_extract_series_year_not_covered_is_empty_window() {
        let dir = tempdir().unwrap();
        let nc_path = dir.path().join("tasmax_2050.nc");
        create_noleap_fixture(&nc_path);

        let file = netcdf::open(&nc_path).unwrap();
        let result = extract_annual_series(&file, "tasmax", 1, 1, 2051);
        assert!(result.is_err());
    }

    #[test]
    fn test_coordinate_axes_round_trip() {
        let dir = tempdir().unwrap();
        let nc_path = dir.path().join("tasmax_2050.nc");
        create_noleap_fixture(&nc_path);

        let file = netcdf::open(&nc_path).unwrap();
        let lats = coordinate_axis(&file, "lat").unwrap();
        let lons = coordinate_axis(&file, "lon").unwrap();
        assert_eq!(lats, FIXTURE_LATS.to_vec());
        assert_eq!(lons, FIXTURE_LONS.to_vec());

        let cell = nearest_cell(&lats, &lons, 53.4, 10.1).unwrap();
        assert_eq!((cell.row, cell.col), (1, 1));
    }

    #[test]
    fn test_count_on_extracted_series() {
        let dir = tempdir().unwrap();
        let nc_path = dir.path().join("tasmax_2050.nc");
        create_noleap_fixture(&nc_path);

        let file = netcdf::open(&nc_path).unwrap();
        let series = extract_annual_series(&file, "tasmax", 1, 1, 2050).unwrap();

        // The exactly-25.0 day must not be counted
        assert_eq!(count_summer_days(&series.values(), 25.0), FIXTURE_HOT_DAYS);
        // The cold neighbor cell never crosses the threshold
        let cold = extract_annual_series(&file, "tasmax", 0, 0, 2050).unwrap();
        assert_eq!(count_summer_days(&cold.values(), 25.0), 0);
    }
}

#[cfg(test)]
mod catalog_integration_tests {
    use super::*;

    #[tokio::test]
    async fn test_catalog_load_from_local_file() {
        let dir = tempdir().unwrap();
        let catalog_path = dir.path().join("catalog.csv");
        write_catalog(
            &catalog_path,
            &[
                (2015, 2049, "data/tasmax_2015_2049.nc"),
                (2050, 2100, "data/tasmax_2050_2100.nc"),
            ],
        );

        let catalog = Catalog::load(catalog_path.to_str().unwrap()).await.unwrap();
        assert_eq!(catalog.len(), 2);

        let records = catalog.search(&fixture_query());
        assert_eq!(records.len(), 2);

        let record = crate::catalog::select_for_year(&records, 2050).unwrap();
        assert_eq!(record.path, "data/tasmax_2050_2100.nc");
    }

    #[tokio::test]
    async fn test_catalog_load_missing_file_fails() {
        let result = Catalog::load("/nonexistent/catalog.csv").await;
        assert!(result.is_err());
    }
}

#[cfg(test)]
mod pipeline_tests {
    use super::*;

    #[tokio::test]
    async fn test_process_request_end_to_end() {
        let dir = tempdir().unwrap();
        let nc_path = dir.path().join("tasmax_2050.nc");
        create_noleap_fixture(&nc_path);

        let catalog_path = dir.path().join("catalog.csv");
        write_catalog(&catalog_path, &[(2050, 2050, nc_path.to_str().unwrap())]);

        let config = RequestConfig {
            catalog: catalog_path.to_str().unwrap().to_string(),
            query: fixture_query(),
            location: LocationSpec::Coords {
                lat: 53.4,
                lon: 10.1,
            },
            year: 2050,
            threshold_celsius: 25.0,
            output: None,
        };

        let report = process_request(&config).await.unwrap();

        assert_eq!(report.count, FIXTURE_HOT_DAYS);
        assert_eq!(report.year, 2050);
        assert_eq!((report.cell.row, report.cell.col), (1, 1));
        assert_eq!(report.cell_lat, 53.0);
        assert_eq!(report.cell_lon, 10.0);
        assert_eq!(report.days_in_series, 365);
        assert!(report.bounds.lat_min < 53.0 && report.bounds.lat_max > 53.0);
    }

    #[tokio::test]
    async fn test_process_request_higher_threshold_counts_nothing() {
        let dir = tempdir().unwrap();
        let nc_path = dir.path().join("tasmax_2050.nc");
        create_noleap_fixture(&nc_path);

        let catalog_path = dir.path().join("catalog.csv");
        write_catalog(&catalog_path, &[(2050, 2050, nc_path.to_str().unwrap())]);

        let config = RequestConfig {
            catalog: catalog_path.to_str().unwrap().to_string(),
            query: fixture_query(),
            location: LocationSpec::Coords {
                lat: 53.4,
                lon: 10.1,
            },
            year: 2050,
            threshold_celsius: 35.0,
            output: None,
        };

        let report = process_request(&config).await.unwrap();
        assert_eq!(report.count, 0);
    }

    #[tokio::test]
    async fn test_process_request_exports_series() {
        let dir = tempdir().unwrap();
        let nc_path = dir.path().join("tasmax_2050.nc");
        create_noleap_fixture(&nc_path);

        let catalog_path = dir.path().join("catalog.csv");
        write_catalog(&catalog_path, &[(2050, 2050, nc_path.to_str().unwrap())]);

        let output_path = dir.path().join("series.csv");
        let config = RequestConfig {
            catalog: catalog_path.to_str().unwrap().to_string(),
            query: fixture_query(),
            location: LocationSpec::Coords {
                lat: 53.4,
                lon: 10.1,
            },
            year: 2050,
            threshold_celsius: 25.0,
            output: Some(output_path.to_str().unwrap().to_string()),
        };

        process_request(&config).await.unwrap();

        let exported = std::fs::read_to_string(&output_path).unwrap();
        // Header plus one line per day
        assert_eq!(exported.lines().count(), 366);
        assert!(exported.starts_with("date,tasmax_celsius,summer_day"));
    }

    #[tokio::test]
    async fn test_process_request_no_record_for_year() {
        let dir = tempdir().unwrap();
        let nc_path = dir.path().join("tasmax_2050.nc");
        create_noleap_fixture(&nc_path);

        let catalog_path = dir.path().join("catalog.csv");
        write_catalog(&catalog_path, &[(2050, 2050, nc_path.to_str().unwrap())]);

        let config = RequestConfig {
            catalog: catalog_path.to_str().unwrap().to_string(),
            query: fixture_query(),
            location: LocationSpec::Coords {
                lat: 53.4,
                lon: 10.1,
            },
            year: 2071,
            threshold_celsius: 25.0,
            output: None,
        };

        let result = process_request(&config).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_process_request_rejects_invalid_year() {
        let config = RequestConfig {
            catalog: "catalog.csv".to_string(),
            query: fixture_query(),
            location: LocationSpec::Coords {
                lat: 53.4,
                lon: 10.1,
            },
            year: 1999,
            threshold_celsius: 25.0,
            output: None,
        };

        let result = process_request(&config).await;
        assert!(result.is_err());
    }
}

#[cfg(test)]
mod request_file_tests {
    use super::*;

    #[test]
    fn test_request_round_trip_through_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("request.yaml");

        let config = RequestConfig {
            catalog: "catalog.csv".to_string(),
            query: fixture_query(),
            location: LocationSpec::Place {
                place: "Hamburg".to_string(),
            },
            year: 2050,
            threshold_celsius: 27.5,
            output: Some("series.parquet".to_string()),
        };

        std::fs::write(&path, serde_yaml::to_string(&config).unwrap()).unwrap();
        let loaded = RequestConfig::from_file(&path).unwrap();

        assert_eq!(loaded.catalog, config.catalog);
        assert_eq!(loaded.query, config.query);
        assert_eq!(loaded.location, config.location);
        assert_eq!(loaded.year, 2050);
        assert_eq!(loaded.threshold_celsius, 27.5);
    }

    #[test]
    fn test_json_request_without_threshold_uses_default() {
        let json = r#"
        {
            "catalog": "catalog.csv",
            "query": {
                "model": "MPI-ESM1-2-HR",
                "experiment": "ssp585",
                "member": "r1i1p1f1",
                "variable": "tasmax",
                "frequency": "day"
            },
            "location": { "lat": 53.55, "lon": 9.99 },
            "year": 2050
        }"#;

        let config = RequestConfig::from_json(json).unwrap();
        assert_eq!(
            config.threshold_celsius,
            crate::stats::DEFAULT_THRESHOLD_CELSIUS
        );
        assert!(config.output.is_none());
    }
}

#[cfg(test)]
mod info_tests {
    use super::*;
    use crate::info::dataset_info;

    #[tokio::test]
    async fn test_dataset_info_reads_structure() {
        let dir = tempdir().unwrap();
        let nc_path = dir.path().join("tasmax_2050.nc");
        create_noleap_fixture(&nc_path);

        let info = dataset_info(nc_path.to_str().unwrap(), None, false)
            .await
            .unwrap();

        let dim_names: Vec<&str> = info.dimensions.iter().map(|d| d.name.as_str()).collect();
        assert!(dim_names.contains(&"time"));
        assert!(dim_names.contains(&"lat"));
        assert!(dim_names.contains(&"lon"));

        let var_names: Vec<&str> = info.variables.iter().map(|v| v.name.as_str()).collect();
        assert!(var_names.contains(&"tasmax"));
    }

    #[tokio::test]
    async fn test_dataset_info_single_variable() {
        let dir = tempdir().unwrap();
        let nc_path = dir.path().join("tasmax_2050.nc");
        create_noleap_fixture(&nc_path);

        let info = dataset_info(nc_path.to_str().unwrap(), Some("tasmax"), true)
            .await
            .unwrap();

        assert_eq!(info.variables.len(), 1);
        assert_eq!(info.variables[0].name, "tasmax");
        assert_eq!(info.variables[0].dimensions, vec!["time", "lat", "lon"]);
    }
}
