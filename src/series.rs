//! # Series Extraction Module
//!
//! Pulls the daily time series for one grid cell and one calendar year out
//! of a NetCDF file and converts it from Kelvin to Celsius.
//!
//! Climate model output does not always use the real-world calendar: the
//! CF conventions allow 365-day ("noleap") and 360-day model calendars next
//! to the standard one, and the time axis is stored as numeric offsets from
//! a base date given in the `units` attribute. [`CfCalendar`] and
//! [`CfDate`] handle that decoding, so the annual window selection works
//! the same regardless of how many days the source file puts in a year.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use log::debug;
use std::fmt;
use thiserror::Error;

const SECONDS_PER_DAY: i64 = 86_400;

/// Cumulative days before each month in a non-leap year.
const CUMULATIVE_DAYS_NOLEAP: [i64; 12] = [0, 31, 59, 90, 120, 151, 181, 212, 243, 273, 304, 334];
/// Days per month in a non-leap year.
const DAYS_IN_MONTH_NOLEAP: [i64; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

#[derive(Error, Debug)]
pub enum SeriesError {
    #[error("Variable '{0}' not found in dataset")]
    VariableNotFound(String),

    #[error("Variable '{name}' has {actual} dimension(s), expected time/lat/lon")]
    DimensionMismatch { name: String, actual: usize },

    #[error("Coordinate variable '{0}' not found in dataset")]
    CoordinateNotFound(String),

    #[error("Time variable has no usable 'units' attribute")]
    MissingTimeUnits,

    #[error("Unsupported time units '{0}', expected '<days|hours|seconds> since <date>'")]
    UnsupportedUnits(String),

    #[error("Unsupported calendar '{0}'")]
    UnsupportedCalendar(String),

    #[error("Cannot parse base date '{0}' from time units")]
    BadBaseDate(String),

    #[error("Cell index ({row}, {col}) outside grid {rows}x{cols}")]
    CellOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("No samples for year {year} in dataset (file covers a different span)")]
    EmptyWindow { year: i32 },

    #[error("NetCDF error: {0}")]
    Netcdf(#[from] netcdf::Error),
}

/// Converts a temperature from Kelvin to Celsius.
pub fn to_celsius(kelvin: f64) -> f64 {
    kelvin - 273.15
}

/// Converts a temperature from Celsius to Kelvin.
pub fn to_kelvin(celsius: f64) -> f64 {
    celsius + 273.15
}

/// Model calendar of a CF time axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CfCalendar {
    /// Real-world (proleptic Gregorian) calendar with leap years
    Standard,
    /// Fixed 365-day years
    NoLeap,
    /// Twelve 30-day months
    Day360,
}

impl CfCalendar {
    /// Parses the NetCDF `calendar` attribute; absence means standard.
    pub fn parse(attr: Option<&str>) -> Result<Self, SeriesError> {
        match attr {
            None => Ok(CfCalendar::Standard),
            Some(s) => match s.to_lowercase().as_str() {
                "standard" | "gregorian" | "proleptic_gregorian" => Ok(CfCalendar::Standard),
                "noleap" | "365_day" => Ok(CfCalendar::NoLeap),
                "360_day" => Ok(CfCalendar::Day360),
                other => Err(SeriesError::UnsupportedCalendar(other.to_string())),
            },
        }
    }
}

/// A calendar timestamp that is valid under any supported CF calendar.
///
/// Ordering is plain lexicographic over (year, month, day, second), which
/// is exactly calendar order within a single file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct CfDate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    /// Seconds since midnight
    pub second: u32,
}

impl CfDate {
    pub fn new(year: i32, month: u32, day: u32, second: u32) -> Self {
        CfDate {
            year,
            month,
            day,
            second,
        }
    }

    /// Noon of the given day, the conventional timestamp of daily model output.
    pub fn noon(year: i32, month: u32, day: u32) -> Self {
        Self::new(year, month, day, 43_200)
    }
}

impl fmt::Display for CfDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

/// Decoded `units` attribute of a time axis: a tick length and a base date.
#[derive(Debug, Clone, Copy)]
pub struct TimeUnits {
    seconds_per_tick: f64,
    base: CfDate,
}

impl TimeUnits {
    /// Parses strings like `days since 1850-01-01` or
    /// `hours since 2015-01-01T00:00:00`.
    pub fn parse(units: &str) -> Result<Self, SeriesError> {
        let mut parts = units.splitn(3, ' ');
        let tick = parts.next().unwrap_or_default().to_lowercase();
        let since = parts.next().unwrap_or_default().to_lowercase();
        let base_str = parts.next().unwrap_or_default().trim().to_string();

        if since != "since" || base_str.is_empty() {
            return Err(SeriesError::UnsupportedUnits(units.to_string()));
        }

        let seconds_per_tick = match tick.as_str() {
            "days" | "day" => SECONDS_PER_DAY as f64,
            "hours" | "hour" => 3600.0,
            "seconds" | "second" => 1.0,
            _ => return Err(SeriesError::UnsupportedUnits(units.to_string())),
        };

        let base = parse_base_date(&base_str)?;
        Ok(TimeUnits {
            seconds_per_tick,
            base,
        })
    }

    /// Decodes one offset value into a calendar timestamp under the given
    /// calendar.
    ///
    /// The base date is only fully validated here, not at parse time: a
    /// base like `2015-02-30` is impossible under the standard calendar
    /// but a legitimate day under the 360-day one, so which days exist
    /// depends on the calendar.
    pub fn decode(&self, offset: f64, calendar: CfCalendar) -> Result<CfDate, SeriesError> {
        let total_seconds = (offset * self.seconds_per_tick).round() as i64;
        match calendar {
            CfCalendar::Standard => decode_standard(self.base, total_seconds),
            CfCalendar::NoLeap => Ok(decode_fixed(self.base, total_seconds, false)),
            CfCalendar::Day360 => Ok(decode_fixed(self.base, total_seconds, true)),
        }
    }
}

/// Parses `YYYY-MM-DD`, `YYYY-MM-DD hh:mm:ss` or `YYYY-MM-DDThh:mm:ss`.
fn parse_base_date(s: &str) -> Result<CfDate, SeriesError> {
    let normalized = s.replace('T', " ");
    let mut parts = normalized.splitn(2, ' ');
    let date_part = parts.next().unwrap_or_default();
    let time_part = parts.next().unwrap_or("0:0:0");

    let date_fields: Vec<&str> = date_part.split('-').collect();
    if date_fields.len() != 3 {
        return Err(SeriesError::BadBaseDate(s.to_string()));
    }
    let year = date_fields[0]
        .parse::<i32>()
        .map_err(|_| SeriesError::BadBaseDate(s.to_string()))?;
    let month = date_fields[1]
        .parse::<u32>()
        .map_err(|_| SeriesError::BadBaseDate(s.to_string()))?;
    let day = date_fields[2]
        .parse::<u32>()
        .map_err(|_| SeriesError::BadBaseDate(s.to_string()))?;
    if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return Err(SeriesError::BadBaseDate(s.to_string()));
    }

    let time_fields: Vec<&str> = time_part.split(':').collect();
    let mut second: u32 = 0;
    for (i, field) in time_fields.iter().take(3).enumerate() {
        let v = field
            .trim()
            .parse::<f64>()
            .map_err(|_| SeriesError::BadBaseDate(s.to_string()))?;
        let scale = [3600, 60, 1][i];
        second += (v as u32) * scale;
    }

    Ok(CfDate::new(year, month, day, second))
}

fn decode_standard(base: CfDate, offset_seconds: i64) -> Result<CfDate, SeriesError> {
    let base_date = NaiveDate::from_ymd_opt(base.year, base.month, base.day)
        .ok_or_else(|| SeriesError::BadBaseDate(base.to_string()))?;
    let base_dt = base_date.and_time(NaiveTime::MIN) + Duration::seconds(base.second as i64);
    let dt: NaiveDateTime = base_dt + Duration::seconds(offset_seconds);

    Ok(CfDate::new(
        dt.year(),
        dt.month(),
        dt.day(),
        dt.num_seconds_from_midnight(),
    ))
}

/// Decodes under a fixed-length calendar: 360-day (all months 30 days) or
/// noleap (365-day years, real month lengths, no Feb 29).
fn decode_fixed(base: CfDate, offset_seconds: i64, is_360: bool) -> CfDate {
    let days_per_year: i64 = if is_360 { 360 } else { 365 };

    let base_day_number = if is_360 {
        base.year as i64 * 360 + (base.month as i64 - 1) * 30 + (base.day as i64 - 1)
    } else {
        base.year as i64 * 365
            + CUMULATIVE_DAYS_NOLEAP[(base.month - 1) as usize]
            + (base.day as i64 - 1)
    };

    let total_seconds = base_day_number * SECONDS_PER_DAY + base.second as i64 + offset_seconds;
    let day_number = total_seconds.div_euclid(SECONDS_PER_DAY);
    let second = total_seconds.rem_euclid(SECONDS_PER_DAY) as u32;

    let year = day_number.div_euclid(days_per_year);
    let day_of_year = day_number.rem_euclid(days_per_year);

    let (month, day) = if is_360 {
        ((day_of_year / 30) as u32 + 1, (day_of_year % 30) as u32 + 1)
    } else {
        let mut month = 0usize;
        let mut remaining = day_of_year;
        while remaining >= DAYS_IN_MONTH_NOLEAP[month] {
            remaining -= DAYS_IN_MONTH_NOLEAP[month];
            month += 1;
        }
        (month as u32 + 1, remaining as u32 + 1)
    };

    CfDate::new(year as i32, month, day, second)
}

/// One day of the extracted series.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub date: CfDate,
    pub celsius: f64,
}

/// The annual time series at one grid cell, in Celsius.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnualSeries {
    pub year: i32,
    pub samples: Vec<Sample>,
}

impl AnnualSeries {
    pub fn values(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.celsius).collect()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Reads a 1-D coordinate variable as f64 values.
pub fn coordinate_axis(file: &netcdf::File, name: &str) -> Result<Vec<f64>, SeriesError> {
    let var = file
        .variable(name)
        .ok_or_else(|| SeriesError::CoordinateNotFound(name.to_string()))?;
    let values = var.get::<f64, _>(..)?;
    Ok(values.iter().cloned().collect())
}

fn string_attribute(var: &netcdf::Variable, name: &str) -> Option<String> {
    let attr = var.attribute(name)?;
    match attr.value() {
        Ok(netcdf::AttributeValue::Str(s)) => Some(s),
        _ => None,
    }
}

/// Extracts the daily series of `var_name` at cell (`row`, `col`) for one
/// calendar year, converted to Celsius.
///
/// The variable must be laid out as (time, lat, lon). The window is
/// [`year`-01-01T12:00, `year`-12-31T12:00] inclusive, decoded under the
/// file's own calendar, so 365-day and leap-calendar sources yield whatever
/// day count they actually contain. Samples come back in time order.
pub fn extract_annual_series(
    file: &netcdf::File,
    var_name: &str,
    row: usize,
    col: usize,
    year: i32,
) -> Result<AnnualSeries, SeriesError> {
    let var = file
        .variable(var_name)
        .ok_or_else(|| SeriesError::VariableNotFound(var_name.to_string()))?;

    let dims = var.dimensions();
    if dims.len() != 3 {
        return Err(SeriesError::DimensionMismatch {
            name: var_name.to_string(),
            actual: dims.len(),
        });
    }
    let time_dim = dims[0].name().to_string();
    let rows = dims[1].len();
    let cols = dims[2].len();
    if row >= rows || col >= cols {
        return Err(SeriesError::CellOutOfBounds {
            row,
            col,
            rows,
            cols,
        });
    }

    let time_var = file
        .variable(&time_dim)
        .ok_or_else(|| SeriesError::CoordinateNotFound(time_dim.clone()))?;
    let units_str = string_attribute(&time_var, "units").ok_or(SeriesError::MissingTimeUnits)?;
    let units = TimeUnits::parse(&units_str)?;
    let calendar = CfCalendar::parse(string_attribute(&time_var, "calendar").as_deref())?;

    let time_values = time_var.get::<f64, _>(..)?;

    let window_start = CfDate::noon(year, 1, 1);
    let window_end = CfDate::noon(year, 12, 31);

    let mut samples = Vec::new();
    for (t_idx, &offset) in time_values.iter().enumerate() {
        let date = units.decode(offset, calendar)?;
        if date < window_start || date > window_end {
            continue;
        }

        let value_array = var.get::<f64, _>((t_idx, row, col))?;
        let kelvin = value_array[[]];
        samples.push(Sample {
            date,
            celsius: to_celsius(kelvin),
        });
    }

    if samples.is_empty() {
        return Err(SeriesError::EmptyWindow { year });
    }

    debug!(
        "Extracted {} sample(s) for year {} at cell ({}, {})",
        samples.len(),
        year,
        row,
        col
    );

    Ok(AnnualSeries { year, samples })
}
