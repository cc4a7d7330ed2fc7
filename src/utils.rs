use crate::error::{Result, SpendingForecastError};
use chrono::{DateTime, Days, NaiveDate, NaiveDateTime};

pub fn days_between(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days()
}

pub fn add_days(date: NaiveDate, days: u64) -> Result<NaiveDate> {
    date.checked_add_days(Days::new(days)).ok_or_else(|| {
        SpendingForecastError::DateError(format!("{} + {} days is out of range", date, days))
    })
}

/// Parses a transaction date. Accepts a plain `YYYY-MM-DD` date, an RFC 3339
/// timestamp, or a naive `YYYY-MM-DDTHH:MM:SS[.fff]` timestamp. Time of day is
/// discarded.
pub fn parse_transaction_date(raw: &str) -> Result<NaiveDate> {
    let raw = raw.trim();

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.date_naive());
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(ts.date());
    }

    Err(SpendingForecastError::DateError(format!(
        "Invalid transaction date: '{}'. Expected YYYY-MM-DD or an RFC 3339 timestamp",
        raw
    )))
}

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}
