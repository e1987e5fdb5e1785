//! Type inference for untyped text.
//!
//! [`infer_type`] classifies a single value with an ordered rule cascade where
//! the first matching rule wins. [`infer_column_types`] applies it across a
//! sample of rows and widens disagreeing observations per column.

use std::sync::LazyLock;

use regex::Regex;

use crate::{
    data::{parse_naive_date, parse_naive_datetime, parse_naive_time, regex},
    schema::ColumnType,
};

static INTEGER: LazyLock<Regex> = LazyLock::new(|| regex("^-?[0-9]+$"));
static DOUBLE_PATTERNS: LazyLock<[Regex; 4]> = LazyLock::new(|| {
    [
        regex(r"^[-+]?[0-9]+\.[0-9]*$"),
        regex(r"^[-+]?\.[0-9]+$"),
        regex(r"^[-+]?[0-9]+\.?[0-9]*[eE][-+]?[0-9]+$"),
        regex(r"^[-+]?\.[0-9]+[eE][-+]?[0-9]+$"),
    ]
});

const NON_FINITE_TOKENS: &[&str] = &["nan", "infinity", "+infinity", "-infinity"];

/// Classifies `raw` into a semantic type.
///
/// A leading `+` never yields [`ColumnType::Integer`]: `"+12"` is a string,
/// while `"+12.0"` and `"+1e3"` are doubles.
pub fn infer_type(raw: &str) -> ColumnType {
    let value = raw.trim();
    if value.is_empty() {
        return ColumnType::String;
    }
    if INTEGER.is_match(value) {
        return ColumnType::Integer;
    }
    if DOUBLE_PATTERNS.iter().any(|pattern| pattern.is_match(value)) {
        return ColumnType::Double;
    }
    if value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("false") {
        return ColumnType::Boolean;
    }
    let lowered = value.to_ascii_lowercase();
    if NON_FINITE_TOKENS.contains(&lowered.as_str()) {
        return ColumnType::Double;
    }
    if parse_naive_date(value).is_ok() {
        return ColumnType::Date;
    }
    if parse_naive_time(value).is_ok() {
        return ColumnType::Time;
    }
    if parse_naive_datetime(value).is_ok() {
        return ColumnType::DateTime;
    }
    ColumnType::String
}

#[derive(Debug, Clone, Copy, Default)]
struct TypeCandidate {
    observed: Option<ColumnType>,
}

impl TypeCandidate {
    fn observe(&mut self, value: &str) {
        if value.trim().is_empty() {
            return;
        }
        let inferred = infer_type(value);
        self.observed = Some(match self.observed {
            None => inferred,
            Some(current) => widen(current, inferred),
        });
    }

    fn decide(&self) -> ColumnType {
        self.observed.unwrap_or(ColumnType::String)
    }
}

fn widen(current: ColumnType, next: ColumnType) -> ColumnType {
    match (current, next) {
        (a, b) if a == b => a,
        (ColumnType::Integer, ColumnType::Double) | (ColumnType::Double, ColumnType::Integer) => {
            ColumnType::Double
        }
        _ => ColumnType::String,
    }
}

/// Infers one type per column from sample rows.
///
/// The column count is the widest row in the sample. Empty cells carry no
/// evidence; a column with no evidence at all is a string column.
pub fn infer_column_types<R>(rows: &[R]) -> Vec<ColumnType>
where
    R: AsRef<[String]>,
{
    let width = rows.iter().map(|row| row.as_ref().len()).max().unwrap_or(0);
    let mut candidates = vec![TypeCandidate::default(); width];
    for row in rows {
        for (idx, value) in row.as_ref().iter().enumerate() {
            candidates[idx].observe(value);
        }
    }
    candidates.iter().map(TypeCandidate::decide).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cascade_matches_documented_examples() {
        assert_eq!(infer_type("123"), ColumnType::Integer);
        assert_eq!(infer_type("-42"), ColumnType::Integer);
        assert_eq!(infer_type("+123"), ColumnType::String);
        assert_eq!(infer_type("+123.0"), ColumnType::Double);
        assert_eq!(infer_type("123.40"), ColumnType::Double);
        assert_eq!(infer_type("true"), ColumnType::Boolean);
        assert_eq!(infer_type("2023-05-20"), ColumnType::Date);
        assert_eq!(infer_type("14:30:00"), ColumnType::Time);
        assert_eq!(infer_type("2023-05-20T14:30:00"), ColumnType::DateTime);
        assert_eq!(infer_type("hello"), ColumnType::String);
        assert_eq!(infer_type(""), ColumnType::String);
    }

    #[test]
    fn exponent_and_non_finite_forms_are_doubles() {
        assert_eq!(infer_type("1e10"), ColumnType::Double);
        assert_eq!(infer_type("-.5E-3"), ColumnType::Double);
        assert_eq!(infer_type(".25"), ColumnType::Double);
        assert_eq!(infer_type("7."), ColumnType::Double);
        assert_eq!(infer_type("NaN"), ColumnType::Double);
        assert_eq!(infer_type("-infinity"), ColumnType::Double);
        assert_eq!(infer_type("inf"), ColumnType::String);
    }

    #[test]
    fn invalid_calendar_values_fall_through_to_string() {
        assert_eq!(infer_type("2023-13-01"), ColumnType::String);
        assert_eq!(infer_type("25:00:00"), ColumnType::String);
        assert_eq!(infer_type("2023-02-30T10:00:00"), ColumnType::String);
    }

    #[test]
    fn leap_seconds_and_unpadded_fields_are_strings() {
        assert_eq!(infer_type("23:59:60"), ColumnType::String);
        assert_eq!(infer_type("2016-12-31T23:59:60"), ColumnType::String);
        assert_eq!(infer_type("2023-5-1"), ColumnType::String);
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        assert_eq!(infer_type("  12  "), ColumnType::Integer);
        assert_eq!(infer_type(" FALSE "), ColumnType::Boolean);
    }

    #[test]
    fn column_inference_widens_numbers_and_skips_blanks() {
        let rows = vec![
            vec!["1".to_string(), "a".to_string(), "".to_string()],
            vec!["2.5".to_string(), "3".to_string(), "".to_string()],
            vec!["".to_string(), "b".to_string()],
        ];
        assert_eq!(
            infer_column_types(&rows),
            vec![ColumnType::Double, ColumnType::String, ColumnType::String]
        );
    }
}
