use std::{fmt, sync::LazyLock};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    schema::{ColumnType, DATE_FORMAT, DATETIME_FORMAT, TIME_FORMAT},
};

/// Upper bound on fractional digits when rendering a double without stored text.
pub const MAX_FRACTION_DIGITS: usize = 10;

// chrono accepts unpadded fields and leap seconds; these pin the exact shape.
static DATE_SHAPE: LazyLock<Regex> = LazyLock::new(|| regex("^[0-9]{4}-[0-9]{2}-[0-9]{2}$"));
static TIME_SHAPE: LazyLock<Regex> = LazyLock::new(|| regex("^[0-9]{2}:[0-9]{2}:[0-9]{2}$"));
static DATETIME_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| regex("^[0-9]{4}-[0-9]{2}-[0-9]{2}T[0-9]{2}:[0-9]{2}:[0-9]{2}$"));

pub(crate) fn regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("patterns are valid literals")
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Value {
    String(String),
    Integer(i64),
    Double(f64),
    Boolean(bool),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
}

impl Value {
    pub fn column_type(&self) -> ColumnType {
        match self {
            Value::String(_) => ColumnType::String,
            Value::Integer(_) => ColumnType::Integer,
            Value::Double(_) => ColumnType::Double,
            Value::Boolean(_) => ColumnType::Boolean,
            Value::Date(_) => ColumnType::Date,
            Value::Time(_) => ColumnType::Time,
            Value::DateTime(_) => ColumnType::DateTime,
        }
    }

    pub fn as_display(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Integer(i) => i.to_string(),
            Value::Double(f) => format_double(*f),
            Value::Boolean(b) => b.to_string(),
            Value::Date(d) => d.format(DATE_FORMAT).to_string(),
            Value::Time(t) => t.format(TIME_FORMAT).to_string(),
            Value::DateTime(dt) => dt.format(DATETIME_FORMAT).to_string(),
        }
    }

    /// Natural default for a type; temporal types have none.
    pub fn default_for(ty: ColumnType) -> Option<Value> {
        match ty {
            ColumnType::String => Some(Value::String(String::new())),
            ColumnType::Integer => Some(Value::Integer(0)),
            ColumnType::Double => Some(Value::Double(0.0)),
            ColumnType::Boolean => Some(Value::Boolean(false)),
            ColumnType::Date | ColumnType::Time | ColumnType::DateTime => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<NaiveDate> for Value {
    fn from(value: NaiveDate) -> Self {
        Value::Date(value)
    }
}

impl From<NaiveTime> for Value {
    fn from(value: NaiveTime) -> Self {
        Value::Time(value)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(value: NaiveDateTime) -> Self {
        Value::DateTime(value)
    }
}

pub fn parse_naive_date(value: &str) -> Result<NaiveDate> {
    DATE_SHAPE
        .is_match(value)
        .then(|| NaiveDate::parse_from_str(value, DATE_FORMAT).ok())
        .flatten()
        .ok_or_else(|| Error::conversion(value, ColumnType::Date))
}

pub fn parse_naive_time(value: &str) -> Result<NaiveTime> {
    TIME_SHAPE
        .is_match(value)
        .then(|| NaiveTime::parse_from_str(value, TIME_FORMAT).ok())
        .flatten()
        .filter(|time| !is_leap_second(time))
        .ok_or_else(|| Error::conversion(value, ColumnType::Time))
}

pub fn parse_naive_datetime(value: &str) -> Result<NaiveDateTime> {
    DATETIME_SHAPE
        .is_match(value)
        .then(|| NaiveDateTime::parse_from_str(value, DATETIME_FORMAT).ok())
        .flatten()
        .filter(|datetime| !is_leap_second(datetime))
        .ok_or_else(|| Error::conversion(value, ColumnType::DateTime))
}

fn is_leap_second(value: &impl Timelike) -> bool {
    value.nanosecond() >= 1_000_000_000
}

pub fn parse_boolean(value: &str) -> Result<bool> {
    if value.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if value.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(Error::conversion(value, ColumnType::Boolean))
    }
}

/// Converts external text into a typed value.
///
/// String columns keep the input verbatim, including the empty string. For
/// every other type an empty (or all-whitespace) input yields `None`, and
/// non-empty input is trimmed before parsing.
pub fn parse_typed_value(value: &str, ty: ColumnType) -> Result<Option<Value>> {
    let trimmed = value.trim();
    let parsed = match ty {
        ColumnType::String => return Ok(Some(Value::String(value.to_string()))),
        _ if trimmed.is_empty() => return Ok(None),
        ColumnType::Integer => {
            let parsed: i64 = trimmed
                .parse()
                .map_err(|_| Error::conversion(trimmed, ty))?;
            Value::Integer(parsed)
        }
        ColumnType::Double => {
            let parsed: f64 = trimmed
                .parse()
                .map_err(|_| Error::conversion(trimmed, ty))?;
            Value::Double(parsed)
        }
        ColumnType::Boolean => Value::Boolean(parse_boolean(trimmed)?),
        ColumnType::Date => Value::Date(parse_naive_date(trimmed)?),
        ColumnType::Time => Value::Time(parse_naive_time(trimmed)?),
        ColumnType::DateTime => Value::DateTime(parse_naive_datetime(trimmed)?),
    };
    Ok(Some(parsed))
}

/// True when text ingested into a double column must be kept verbatim.
pub fn retains_original_text(ty: ColumnType, raw: &str) -> bool {
    ty == ColumnType::Double && raw.contains('.')
}

/// Renders a double using the shortest text that reads back to the same value,
/// rounded to at most [`MAX_FRACTION_DIGITS`] fractional digits.
pub fn format_double(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    let shortest = value.to_string();
    match shortest.split_once('.') {
        Some((_, fraction)) if fraction.len() > MAX_FRACTION_DIGITS => {
            let rounded = format!("{value:.prec$}", prec = MAX_FRACTION_DIGITS);
            let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
            match trimmed {
                "-0" => "0".to_string(),
                other => other.to_string(),
            }
        }
        _ => shortest,
    }
}

pub fn format_value(value: &Value) -> String {
    value.as_display()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_typed_value_keeps_empty_strings_only_for_string_type() {
        assert_eq!(
            parse_typed_value("", ColumnType::String).unwrap(),
            Some(Value::String(String::new()))
        );
        assert_eq!(parse_typed_value("", ColumnType::Integer).unwrap(), None);
        assert_eq!(parse_typed_value("  ", ColumnType::Date).unwrap(), None);
    }

    #[test]
    fn parse_typed_value_reports_expected_pattern() {
        let err = parse_typed_value("2023-13-01", ColumnType::Date).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to parse '2023-13-01' as date (expected yyyy-MM-dd)"
        );
        let err = parse_typed_value("abc", ColumnType::Integer).unwrap_err();
        assert_eq!(err.to_string(), "Failed to parse 'abc' as int");
    }

    #[test]
    fn temporal_parsing_requires_padded_fields() {
        assert!(parse_typed_value("2023-5-1", ColumnType::Date).is_err());
        assert!(parse_typed_value("9:05:00", ColumnType::Time).is_err());
        assert!(parse_typed_value("2023-05-01T9:05:00", ColumnType::DateTime).is_err());
        assert_eq!(
            parse_naive_date("2023-05-01").unwrap(),
            NaiveDate::from_ymd_opt(2023, 5, 1).unwrap()
        );
    }

    #[test]
    fn leap_seconds_are_rejected() {
        let err = parse_typed_value("23:59:60", ColumnType::Time).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to parse '23:59:60' as time (expected HH:mm:ss)"
        );
        assert!(parse_naive_datetime("2016-12-31T23:59:60").is_err());
        assert!(parse_naive_time("23:59:59").is_ok());
    }

    #[test]
    fn boolean_parsing_is_case_insensitive_and_strict() {
        assert_eq!(parse_boolean("TRUE").unwrap(), true);
        assert_eq!(parse_boolean("False").unwrap(), false);
        assert!(parse_boolean("yes").is_err());
        assert!(parse_boolean("1").is_err());
    }

    #[test]
    fn format_double_prefers_shortest_form() {
        assert_eq!(format_double(30000.0), "30000");
        assert_eq!(format_double(123.4), "123.4");
        assert_eq!(format_double(0.1 + 0.2), "0.3");
        assert_eq!(format_double(1.0 / 3.0), "0.3333333333");
        assert_eq!(format_double(f64::NAN), "NaN");
        assert_eq!(format_double(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn temporal_values_render_with_iso_patterns() {
        let dt = parse_naive_datetime("2023-05-20T14:30:00").unwrap();
        assert_eq!(Value::DateTime(dt).as_display(), "2023-05-20T14:30:00");
        let t = parse_naive_time("07:05:09").unwrap();
        assert_eq!(Value::Time(t).to_string(), "07:05:09");
    }

    #[test]
    fn only_fractional_double_text_is_retained() {
        assert!(retains_original_text(ColumnType::Double, "30000.00"));
        assert!(!retains_original_text(ColumnType::Double, "30000"));
        assert!(!retains_original_text(ColumnType::String, "1.50"));
    }
}
