//! Per-row mapping resolution.
//!
//! Every reader and writer goes through the same two functions:
//!
//! - [`resolve_row`] turns one raw source row into typed target values.
//! - [`resolve_outbound_row`] turns one table row into raw target values.
//!
//! For each mapping a value is looked up by header name or position. An
//! absent or empty value is replaced by the mapping default when there is one.
//! Whatever text remains is converted to the target type, and a conversion
//! failure rejects the whole row with an error naming the mapping.

use std::collections::{BTreeMap, HashMap};

use log::trace;

use crate::{
    data::{Value, parse_typed_value, retains_original_text},
    error::{Error, Result},
    mapping::{ColumnMapping, MappingConfiguration, SourceSelector},
    table::Table,
};

/// Header name to position lookup. The first occurrence of a repeated
/// header wins.
#[derive(Debug, Clone, Default)]
pub struct HeaderIndex {
    positions: HashMap<String, usize>,
}

impl HeaderIndex {
    pub fn new(headers: Option<&[String]>) -> Self {
        let mut positions = HashMap::new();
        for (idx, name) in headers.unwrap_or_default().iter().enumerate() {
            positions.entry(name.clone()).or_insert(idx);
        }
        Self { positions }
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Raw text a mapping selects from `raw`, or `None` when it is absent.
pub fn lookup<'a>(
    mapping: &ColumnMapping,
    headers: &HeaderIndex,
    raw: &'a [String],
) -> Option<&'a str> {
    let position = match mapping.source() {
        SourceSelector::ByName(name) => headers.position(name)?,
        SourceSelector::ByIndex(index) => *index,
    };
    raw.get(position).map(String::as_str)
}

/// One converted target value.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedValue {
    pub target: String,
    pub value: Option<Value>,
    /// Input text kept for exact re-serialisation of fractional doubles.
    pub original: Option<String>,
}

/// A source value that failed to convert and was replaced by the mapping
/// default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recovered {
    pub mapping: String,
    pub rejected: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedRow {
    pub values: Vec<ResolvedValue>,
    /// Mappings whose source was absent and fell back to their default.
    pub defaulted: Vec<String>,
    /// Mappings whose source was absent and that have no default.
    pub missing: Vec<String>,
    pub recovered: Vec<Recovered>,
}

impl ResolvedRow {
    pub fn get(&self, target: &str) -> Option<&ResolvedValue> {
        self.values.iter().find(|v| v.target == target)
    }

    pub fn contains(&self, target: &str) -> bool {
        self.get(target).is_some()
    }

    /// Splits into the typed values and retained texts a table insert takes.
    pub fn into_parts(self) -> (BTreeMap<String, Option<Value>>, Vec<(String, String)>) {
        let mut values = BTreeMap::new();
        let mut originals = Vec::new();
        for resolved in self.values {
            if let Some(text) = resolved.original {
                originals.push((resolved.target.clone(), text));
            }
            values.insert(resolved.target, resolved.value);
        }
        (values, originals)
    }
}

fn conversion_failure(mapping: &ColumnMapping, err: Error) -> Error {
    Error::Mapping {
        mapping: mapping.to_string(),
        source: Box::new(err),
    }
}

/// Resolves one raw source row against every mapping in `config`.
///
/// Targets with neither a value nor a default are left out of the result so
/// that the table's default-fill policy decides what happens to them. With
/// `allowEmptyValues` set, an empty source value without a default is kept
/// instead. A value that fails to convert falls back to the mapping default
/// when there is one; otherwise the whole row fails.
pub fn resolve_row(
    config: &MappingConfiguration,
    headers: &HeaderIndex,
    raw: &[String],
) -> Result<ResolvedRow> {
    let allow_empty = config.allow_empty_values();
    let mut resolved = ResolvedRow::default();
    for mapping in config.column_mappings() {
        let found = lookup(mapping, headers, raw);
        if found.is_none() {
            match mapping.default_value() {
                Some(_) => resolved.defaulted.push(mapping.to_string()),
                None => resolved.missing.push(mapping.to_string()),
            }
        }
        let text = match (found, mapping.default_value()) {
            (Some(value), _) if !value.is_empty() => Some(value),
            (_, Some(default)) => Some(default),
            (Some(_), None) if allow_empty => Some(""),
            (_, None) => None,
        };
        let Some(text) = text else {
            trace!("No value for {mapping}; leaving target unset");
            continue;
        };
        let ty = mapping.target_type();
        let (text, value) = match parse_typed_value(text, ty) {
            Ok(value) => (text, value),
            Err(err) => {
                let default = fallback(mapping, text, err)?;
                resolved.recovered.push(Recovered {
                    mapping: mapping.to_string(),
                    rejected: text.to_string(),
                });
                let value = parse_typed_value(default, ty)
                    .map_err(|err| conversion_failure(mapping, err))?;
                (default, value)
            }
        };
        resolved.values.push(ResolvedValue {
            target: mapping.target_name().to_string(),
            value,
            original: retains_original_text(ty, text).then(|| text.to_string()),
        });
    }
    Ok(resolved)
}

/// The mapping default to use after `text` failed to convert, or the
/// conversion error when there is nothing different to fall back to.
fn fallback<'m>(mapping: &'m ColumnMapping, text: &str, err: Error) -> Result<&'m str> {
    match mapping.default_value() {
        Some(default) if default != text => Ok(default),
        _ => Err(conversion_failure(mapping, err)),
    }
}

/// Name of the table column a mapping reads in the reverse direction.
pub fn table_source<'t>(mapping: &ColumnMapping, table: &'t Table) -> Option<&'t str> {
    match mapping.source() {
        SourceSelector::ByName(name) => table.column(name).map(|c| c.name()),
        SourceSelector::ByIndex(index) => table.columns().get(*index).map(|c| c.name()),
    }
}

/// One external row produced from a table row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutboundRow {
    pub fields: Vec<String>,
    pub recovered: Vec<Recovered>,
}

/// Produces one external row from table row `row`, one field per mapping.
///
/// Table text is emitted verbatim once it is known to convert to the target
/// type, so retained double text survives. Text that does not convert is
/// replaced by the mapping default when there is one. Fields with neither a
/// value nor a default are written empty.
pub fn resolve_outbound_row(
    config: &MappingConfiguration,
    table: &Table,
    row: usize,
) -> Result<OutboundRow> {
    let mut outbound = OutboundRow {
        fields: Vec::with_capacity(config.column_mappings().len()),
        recovered: Vec::new(),
    };
    for mapping in config.column_mappings() {
        let text = match table_source(mapping, table) {
            Some(column) => table.get_value_at(row, column)?,
            None => String::new(),
        };
        let mut text = match (text.is_empty(), mapping.default_value()) {
            (true, Some(default)) => default.to_string(),
            _ => text,
        };
        if !text.is_empty() {
            if let Err(err) = parse_typed_value(&text, mapping.target_type()) {
                let default = fallback(mapping, &text, err)?;
                outbound.recovered.push(Recovered {
                    mapping: mapping.to_string(),
                    rejected: std::mem::replace(&mut text, default.to_string()),
                });
            }
        }
        outbound.fields.push(text);
    }
    Ok(outbound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{mapping::options, schema::ColumnType};

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn lookup_by_name_and_index() {
        let headers = strings(&["Name", "Age"]);
        let index = HeaderIndex::new(Some(&headers));
        let row = strings(&["Alice", "30"]);
        let by_name = ColumnMapping::by_name("Age", "Years", ColumnType::Integer);
        let by_index = ColumnMapping::by_index(0, "FullName", ColumnType::String);
        let missing = ColumnMapping::by_index(5, "X", ColumnType::String);
        assert_eq!(lookup(&by_name, &index, &row), Some("30"));
        assert_eq!(lookup(&by_index, &index, &row), Some("Alice"));
        assert_eq!(lookup(&missing, &index, &row), None);
    }

    #[test]
    fn repeated_headers_resolve_to_first_position() {
        let headers = strings(&["a", "b", "a"]);
        let index = HeaderIndex::new(Some(&headers));
        assert_eq!(index.position("a"), Some(0));
        assert!(HeaderIndex::new(None).is_empty());
    }

    #[test]
    fn empty_values_take_defaults_without_being_reported_absent() {
        let config = MappingConfiguration::builder("x.csv")
            .mapping(ColumnMapping::by_index(0, "Job", ColumnType::String).with_default("Unknown"))
            .build()
            .unwrap();
        let resolved = resolve_row(&config, &HeaderIndex::default(), &strings(&[""])).unwrap();
        assert_eq!(
            resolved.get("Job").unwrap().value,
            Some(Value::from("Unknown"))
        );
        assert!(resolved.defaulted.is_empty());
        assert!(resolved.missing.is_empty());
    }

    #[test]
    fn empty_values_without_default_are_omitted_unless_allowed() {
        let config = MappingConfiguration::builder("x.csv")
            .map_index(0, "Note", ColumnType::String)
            .map_index(1, "Count", ColumnType::Integer)
            .build()
            .unwrap();
        let raw = strings(&["", ""]);
        let resolved = resolve_row(&config, &HeaderIndex::default(), &raw).unwrap();
        assert!(resolved.values.is_empty());

        let permissive = config.with_option(options::ALLOW_EMPTY_VALUES, true);
        let resolved = resolve_row(&permissive, &HeaderIndex::default(), &raw).unwrap();
        assert_eq!(resolved.get("Note").unwrap().value, Some(Value::from("")));
        assert_eq!(resolved.get("Count").unwrap().value, None);
    }

    #[test]
    fn conversion_failures_identify_the_mapping() {
        let config = MappingConfiguration::builder("x.csv")
            .map_index(0, "Years", ColumnType::Integer)
            .build()
            .unwrap();
        let err = resolve_row(&config, &HeaderIndex::default(), &strings(&["old"])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Mapping #0 -> 'Years' (int): Failed to parse 'old' as int"
        );
    }

    #[test]
    fn fractional_doubles_keep_their_text() {
        let config = MappingConfiguration::builder("x.csv")
            .map_index(0, "Salary", ColumnType::Double)
            .build()
            .unwrap();
        let resolved =
            resolve_row(&config, &HeaderIndex::default(), &strings(&["30000.00"])).unwrap();
        let (values, originals) = resolved.into_parts();
        assert_eq!(values["Salary"], Some(Value::Double(30000.0)));
        assert_eq!(
            originals,
            vec![("Salary".to_string(), "30000.00".to_string())]
        );
    }

    #[test]
    fn absent_sources_are_recorded_with_or_without_default() {
        let config = MappingConfiguration::builder("x.csv")
            .map_index(5, "Extra", ColumnType::Integer)
            .mapping(ColumnMapping::by_index(6, "Team", ColumnType::String).with_default("Core"))
            .build()
            .unwrap();
        let raw = strings(&["Alice", "30", "Engineer"]);
        let resolved = resolve_row(&config, &HeaderIndex::default(), &raw).unwrap();
        assert!(!resolved.contains("Extra"));
        assert_eq!(resolved.get("Team").unwrap().value, Some(Value::from("Core")));
        assert_eq!(resolved.missing, vec!["#5 -> 'Extra' (int)"]);
        assert_eq!(resolved.defaulted, vec!["#6 -> 'Team' (string)"]);
    }

    #[test]
    fn unconvertible_values_fall_back_to_the_default() {
        let config = MappingConfiguration::builder("x.csv")
            .mapping(ColumnMapping::by_index(0, "Years", ColumnType::Integer).with_default("0"))
            .build()
            .unwrap();
        let resolved = resolve_row(&config, &HeaderIndex::default(), &strings(&["old"])).unwrap();
        assert_eq!(resolved.get("Years").unwrap().value, Some(Value::Integer(0)));
        assert_eq!(
            resolved.recovered,
            vec![Recovered {
                mapping: "#0 -> 'Years' (int)".to_string(),
                rejected: "old".to_string(),
            }]
        );
    }
}
