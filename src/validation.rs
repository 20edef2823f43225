// Validation utilities module
// Custom validator functions and parsers for the date/time formats accepted by the API

use chrono::{NaiveDate, NaiveTime};
use regex::Regex;
use std::sync::OnceLock;
use validator::ValidationError;

use crate::error::{BookingError, BookingResult};

fn month_day_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(0[1-9]|1[0-2])-(0[1-9]|[12][0-9]|3[01])$").expect("month-day pattern")
    })
}

/// Parses a `YYYY-MM-DD` date
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

/// Parses `HH:MM`, also accepting `HH:MM:SS`
pub fn parse_time(value: &str) -> Option<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .ok()
}

/// Parses a date field, producing a field-level validation error on failure
pub fn require_date(field: &str, value: &str) -> BookingResult<NaiveDate> {
    parse_date(value)
        .ok_or_else(|| BookingError::field(field, format!("Invalid date format: {}", value)))
}

/// Parses a time field, producing a field-level validation error on failure
pub fn require_time(field: &str, value: &str) -> BookingResult<NaiveTime> {
    parse_time(value)
        .ok_or_else(|| BookingError::field(field, format!("Invalid time format: {}", value)))
}

/// Validates a `YYYY-MM-DD` date string
pub fn validate_date(value: &str) -> Result<(), ValidationError> {
    match parse_date(value) {
        Some(_) => Ok(()),
        None => Err(ValidationError::new("invalid_date_format")),
    }
}

/// Validates an `HH:MM` time string
pub fn validate_time(value: &str) -> Result<(), ValidationError> {
    match parse_time(value) {
        Some(_) => Ok(()),
        None => Err(ValidationError::new("invalid_time_format")),
    }
}

/// Validates an `MM-DD` month-day string
pub fn validate_month_day(value: &str) -> Result<(), ValidationError> {
    if month_day_pattern().is_match(value) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_month_day"))
    }
}

/// Serde adapter writing `NaiveTime` as `HH:MM`
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_time(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid time: {}", raw)))
    }

    pub mod option {
        use chrono::NaiveTime;
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            time: &Option<NaiveTime>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match time {
                Some(t) => serializer.serialize_str(&t.format("%H:%M").to_string()),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<NaiveTime>, D::Error> {
            match Option::<String>::deserialize(deserializer)? {
                Some(raw) => crate::validation::parse_time(&raw)
                    .map(Some)
                    .ok_or_else(|| serde::de::Error::custom(format!("invalid time: {}", raw))),
                None => Ok(None),
            }
        }
    }
}
