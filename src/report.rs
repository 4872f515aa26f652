//! Console presentation of requests and results.

use crate::catalog::CatalogRecord;
use crate::input::{LocationSpec, RequestConfig};
use crate::SummerDaysReport;

/// The one-line result summary.
pub fn summary_line(report: &SummerDaysReport) -> String {
    format!(
        "{} summer days for {} in {}",
        report.count, report.place, report.year
    )
}

pub fn echo_request(config: &RequestConfig) {
    println!("Request:");
    println!("  Catalog: {}", config.catalog);
    println!(
        "  Dataset: {}/{}/{}/{}/{}",
        config.query.model,
        config.query.experiment,
        config.query.member,
        config.query.variable,
        config.query.frequency
    );
    match &config.location {
        LocationSpec::Place { place } => println!("  Location: {}", place),
        LocationSpec::Coords { lat, lon } => println!("  Location: {:.4}, {:.4}", lat, lon),
    }
    println!("  Year: {}", config.year);
    println!("  Threshold: {:.1} °C", config.threshold_celsius);
}

pub fn print_report(report: &SummerDaysReport) {
    println!();
    println!("{}", summary_line(report));
    println!();
    println!("  Resolved location: {:.4}, {:.4}", report.target_lat, report.target_lon);
    println!(
        "  Grid cell: ({}, {}) centered at {:.4}, {:.4}",
        report.cell.row, report.cell.col, report.cell_lat, report.cell_lon
    );
    println!(
        "  Cell bounds: lat [{:.4}, {:.4}], lon [{:.4}, {:.4}]",
        report.bounds.lat_min, report.bounds.lat_max, report.bounds.lon_min, report.bounds.lon_max
    );
    println!("  Dataset: {}", report.dataset_path);
    println!("  Days in series: {}", report.days_in_series);
}

pub fn print_search_results(records: &[CatalogRecord]) {
    if records.is_empty() {
        println!("No catalog records matched the query.");
        return;
    }

    println!("Matched {} record(s):", records.len());
    for record in records {
        println!(
            "  {}-{}  {}",
            record.start_year, record.end_year, record.path
        );
    }
}
