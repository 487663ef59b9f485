//! Dates embedded in NASA product file names.
//!
//! AppEEARS and LP DAAC name their granules with a `_doy<YYYY><DDD>` marker,
//! optionally followed by the time of day as `HHMMSS` for sub-daily products, e.g.
//! `MOD11A2.061_LST_Day_1km_doy2025001_aid0001.tif` or
//! `SPL4SMGP.008_Geophysical_Data_sm_rootzone_doy2025032013000_aid0001.tif`.
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;

static DOY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"_doy([0-9A-Za-z]+)").unwrap());

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DateParseError {
    #[error("no '_doy' date marker in '{0}'")]
    MissingMarker(String),
    #[error("date marker 'doy{marker}' in '{name}' is too short, expected doyYYYYDDD")]
    MarkerTooShort { name: String, marker: String },
    #[error("date marker 'doy{marker}' in '{name}' is not numeric")]
    NonNumeric { name: String, marker: String },
    #[error("day of year {day} is not valid for year {year}")]
    DayOutOfRange { year: i32, day: u32 },
    #[error("time of day '{0}' is not a valid HHMMSS time")]
    InvalidTime(String),
}

/// Extract the calendar date from a file name containing `doy<YYYY><DDD>`.
///
/// Only the file name part of a path is examined. Any time-of-day digits after the
/// day of year are ignored.
pub fn parse_doy_date(name: &str) -> Result<NaiveDate, DateParseError> {
    let (date, _) = parse_marker(name)?;
    Ok(date)
}

/// Like [`parse_doy_date`], but also reads the `HHMMSS` time of day following the
/// day of year. A marker without time digits gives midnight.
pub fn parse_doy_datetime(name: &str) -> Result<NaiveDateTime, DateParseError> {
    let (date, time_digits) = parse_marker(name)?;
    let time = if time_digits.len() >= 6 {
        let hms = &time_digits[..6];
        let hour = hms[0..2].parse::<u32>().ok();
        let minute = hms[2..4].parse::<u32>().ok();
        let second = hms[4..6].parse::<u32>().ok();
        match (hour, minute, second) {
            (Some(h), Some(m), Some(s)) => NaiveTime::from_hms_opt(h, m, s)
                .ok_or_else(|| DateParseError::InvalidTime(hms.to_string()))?,
            _ => return Err(DateParseError::InvalidTime(hms.to_string())),
        }
    } else {
        NaiveTime::MIN
    };
    Ok(date.and_time(time))
}

/// Convenience wrapper to parse the date from the file name of a path.
pub fn parse_doy_date_from_path(path: &Path) -> Result<NaiveDate, DateParseError> {
    let name = path.file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_else(|| path.to_string_lossy());
    parse_doy_date(&name)
}

/// Convenience wrapper to parse the date and time from the file name of a path.
pub fn parse_doy_datetime_from_path(path: &Path) -> Result<NaiveDateTime, DateParseError> {
    let name = path.file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_else(|| path.to_string_lossy());
    parse_doy_datetime(&name)
}

fn parse_marker(name: &str) -> Result<(NaiveDate, &str), DateParseError> {
    let marker = DOY_RE.captures(name)
        .and_then(|c| c.get(1))
        .ok_or_else(|| DateParseError::MissingMarker(name.to_string()))?
        .as_str();

    if marker.len() < 7 {
        return Err(DateParseError::MarkerTooShort { name: name.to_string(), marker: marker.to_string() });
    }

    let non_numeric = || DateParseError::NonNumeric { name: name.to_string(), marker: marker.to_string() };
    // The regex only admits ASCII, so byte slicing is safe
    let year = marker[0..4].parse::<i32>().map_err(|_| non_numeric())?;
    let day = marker[4..7].parse::<u32>().map_err(|_| non_numeric())?;

    if !(1..=366).contains(&day) {
        return Err(DateParseError::DayOutOfRange { year, day });
    }

    let date = NaiveDate::from_yo_opt(year, day)
        .ok_or(DateParseError::DayOutOfRange { year, day })?;
    Ok((date, &marker[7..]))
}
