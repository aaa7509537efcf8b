use chrono::{NaiveDate, NaiveDateTime, Timelike};

use crate::error::{ProcessingError, Result};
use crate::models::SamplingDuration;

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

/// Parse an observation timestamp, inferring its sampling duration from
/// the shape of the text.
///
/// # Examples
/// ```
/// use station_qc::models::SamplingDuration;
/// use station_qc::utils::parse_timestamp;
///
/// let (ts, duration) = parse_timestamp("2024-01-15 13:45").unwrap();
/// assert_eq!(ts.to_string(), "2024-01-15 13:00:00");
/// assert_eq!(duration, SamplingDuration::Hourly);
/// ```
pub fn parse_timestamp(text: &str) -> Result<(NaiveDateTime, SamplingDuration)> {
    let trimmed = text.trim();

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok((start_of_day(date), SamplingDuration::Daily));
    }

    for format in DATETIME_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok((truncate_to_hour(ts), SamplingDuration::Hourly));
        }
    }

    Err(ProcessingError::InvalidFormat(format!(
        "Unrecognised timestamp: '{}'",
        text
    )))
}

/// Parse a timestamp whose sampling duration is already known.
pub fn parse_timestamp_as(text: &str, duration: SamplingDuration) -> Result<NaiveDateTime> {
    let (ts, _) = parse_timestamp(text)?;
    Ok(normalize(ts, duration))
}

/// Snap a timestamp onto the table index for a series of the given duration.
pub fn normalize(ts: NaiveDateTime, duration: SamplingDuration) -> NaiveDateTime {
    match duration {
        SamplingDuration::Daily => start_of_day(ts.date()),
        SamplingDuration::Hourly => truncate_to_hour(ts),
    }
}

pub fn start_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(chrono::NaiveTime::MIN)
}

pub fn truncate_to_hour(ts: NaiveDateTime) -> NaiveDateTime {
    ts.date().and_hms_opt(ts.hour(), 0, 0).unwrap_or(ts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_daily() {
        let (ts, duration) = parse_timestamp("2024-02-29").unwrap();
        assert_eq!(duration, SamplingDuration::Daily);
        assert_eq!(ts.to_string(), "2024-02-29 00:00:00");
    }

    #[test]
    fn test_parse_hourly_variants() {
        for text in ["2024-02-29 06:30", "2024-02-29T06:30:15", "2024-02-29 06:59:59"] {
            let (ts, duration) = parse_timestamp(text).unwrap();
            assert_eq!(duration, SamplingDuration::Hourly);
            assert_eq!(ts.to_string(), "2024-02-29 06:00:00", "input {}", text);
        }
    }

    #[test]
    fn test_parse_invalid() {
        assert!(parse_timestamp("29/02/2024").is_err());
        assert!(parse_timestamp("").is_err());
    }

    #[test]
    fn test_daily_duration_drops_time() {
        let ts = parse_timestamp_as("2024-02-29 06:30", SamplingDuration::Daily).unwrap();
        assert_eq!(ts.to_string(), "2024-02-29 00:00:00");
    }
}
