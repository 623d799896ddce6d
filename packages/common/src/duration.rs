//! Fieldwork duration arithmetic.
//!
//! Hours are rounded to two decimal places, half-up. All rounding happens in
//! integer hundredths of an hour so that summing entries one at a time and
//! summing them all at once always produce the same total.

use chrono::{NaiveDate, NaiveTime, TimeDelta};
use thiserror::Error;

const SECONDS_PER_HOUR: i64 = 3600;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DurationError {
    #[error("Invalid work date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("Invalid time '{0}', expected HH:MM")]
    InvalidTime(String),
    /// Overnight spans are not supported; log them as two entries.
    #[error("End time {end} is earlier than start time {start}")]
    EndBeforeStart { start: NaiveTime, end: NaiveTime },
}

/// Parse a `YYYY-MM-DD` work date.
pub fn parse_work_date(input: &str) -> Result<NaiveDate, DurationError> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map_err(|_| DurationError::InvalidDate(input.to_string()))
}

/// Parse a wall-clock time as `HH:MM` or `HH:MM:SS`.
pub fn parse_clock_time(input: &str) -> Result<NaiveTime, DurationError> {
    let trimmed = input.trim();
    NaiveTime::parse_from_str(trimmed, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
        .map_err(|_| DurationError::InvalidTime(input.to_string()))
}

/// Elapsed hours between `start` and `end` on `work_date`, rounded to 2 dp.
pub fn compute_duration(
    work_date: NaiveDate,
    start: NaiveTime,
    end: NaiveTime,
) -> Result<f64, DurationError> {
    let elapsed = work_date.and_time(end) - work_date.and_time(start);
    if elapsed < TimeDelta::zero() {
        return Err(DurationError::EndBeforeStart { start, end });
    }
    Ok(from_hundredths(seconds_to_hundredths(elapsed.num_seconds())))
}

// Non-negative input only: integer division truncates toward zero.
fn seconds_to_hundredths(seconds: i64) -> i64 {
    (seconds * 100 + SECONDS_PER_HOUR / 2) / SECONDS_PER_HOUR
}

/// Convert a stored 2 dp hour value back to integer hundredths.
pub fn to_hundredths(hours: f64) -> i64 {
    (hours * 100.0).round() as i64
}

pub fn from_hundredths(hundredths: i64) -> f64 {
    hundredths as f64 / 100.0
}

/// Sum of 2 dp hour values, exact to the hundredth.
pub fn sum_hours<I>(hours: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    from_hundredths(hours.into_iter().map(to_hundredths).sum())
}

/// `total + hours`, using the same arithmetic as [`sum_hours`].
pub fn add_hours(total: f64, hours: f64) -> f64 {
    from_hundredths(to_hundredths(total) + to_hundredths(hours))
}
