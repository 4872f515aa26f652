//! # Derived Statistics Module
//!
//! Threshold-count statistics over daily temperature series. Currently the
//! single climatological index this tool reports: the number of summer days
//! in a year.

/// Default summer-day threshold in degrees Celsius.
pub const DEFAULT_THRESHOLD_CELSIUS: f64 = 25.0;

/// Counts the samples strictly greater than the threshold.
///
/// A day at exactly the threshold is not counted: the German weather
/// service phrases the summer-day definition as "at least 25.0 °C", but the
/// established computation uses strict greater-than, and that is the
/// behavior kept here. Callers who want the inclusive reading can lower the
/// threshold by an epsilon themselves.
pub fn count_summer_days(celsius_values: &[f64], threshold: f64) -> usize {
    celsius_values.iter().filter(|&&v| v > threshold).count()
}
