//! Declarative column mappings.
//!
//! A [`MappingConfiguration`] describes one conversion pass: where the data
//! lives, an ordered list of [`ColumnMapping`] rules, and an options bag that
//! only row sources and sinks interpret. Configurations are immutable once
//! built; overriding a field returns a new configuration.
//!
//! The persisted shape (YAML or JSON) is:
//!
//! ```yaml
//! sourceLocation: people.csv
//! columnMappings:
//!   - sourceColumnName: Name
//!     targetColumnName: FullName
//!     targetColumnType: string
//!   - sourceColumnIndex: 1
//!     targetColumnName: Years
//!     targetColumnType: int
//!     defaultValue: "0"
//! options:
//!   hasHeaderRow: true
//! ```

use std::{
    collections::{BTreeMap, HashSet},
    fmt,
    fs::File,
    io::{BufReader, BufWriter},
    path::Path,
};

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value as OptionValue;

use crate::{
    column::Column,
    error::{Error, Result},
    infer::infer_column_types,
    schema::ColumnType,
    table::Table,
};

/// Option keys understood by row sources, sinks and the resolver.
pub mod options {
    pub const HAS_HEADER_ROW: &str = "hasHeaderRow";
    pub const WITH_HEADER_ROW: &str = "withHeaderRow";
    pub const ALLOW_EMPTY_VALUES: &str = "allowEmptyValues";
    pub const TABLE_NAME: &str = "tableName";
    pub const CREATE_TABLE: &str = "createTable";
    pub const USERNAME: &str = "username";
    pub const PASSWORD: &str = "password";
    pub const QUERY: &str = "query";
    pub const DELIMITER: &str = "delimiter";
    pub const ENCODING: &str = "encoding";
}

/// How a mapping finds its source column.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SourceSelector {
    ByName(String),
    ByIndex(usize),
}

impl fmt::Display for SourceSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceSelector::ByName(name) => write!(f, "'{name}'"),
            SourceSelector::ByIndex(index) => write!(f, "#{index}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ColumnMappingRepr", into = "ColumnMappingRepr")]
pub struct ColumnMapping {
    source: SourceSelector,
    target_name: String,
    target_type: ColumnType,
    default_value: Option<String>,
}

impl ColumnMapping {
    pub fn new(source: SourceSelector, target_name: impl Into<String>, target_type: ColumnType) -> Self {
        Self {
            source,
            target_name: target_name.into(),
            target_type,
            default_value: None,
        }
    }

    pub fn by_name(
        source: impl Into<String>,
        target_name: impl Into<String>,
        target_type: ColumnType,
    ) -> Self {
        Self::new(SourceSelector::ByName(source.into()), target_name, target_type)
    }

    pub fn by_index(index: usize, target_name: impl Into<String>, target_type: ColumnType) -> Self {
        Self::new(SourceSelector::ByIndex(index), target_name, target_type)
    }

    #[must_use]
    pub fn with_default(mut self, default_value: impl Into<String>) -> Self {
        self.default_value = Some(default_value.into());
        self
    }

    pub fn source(&self) -> &SourceSelector {
        &self.source
    }

    pub fn source_name(&self) -> Option<&str> {
        match &self.source {
            SourceSelector::ByName(name) => Some(name),
            SourceSelector::ByIndex(_) => None,
        }
    }

    pub fn source_index(&self) -> Option<usize> {
        match self.source {
            SourceSelector::ByIndex(index) => Some(index),
            SourceSelector::ByName(_) => None,
        }
    }

    pub fn target_name(&self) -> &str {
        &self.target_name
    }

    pub fn target_type(&self) -> ColumnType {
        self.target_type
    }

    pub fn default_value(&self) -> Option<&str> {
        self.default_value.as_deref()
    }

    /// Builds the target column; the mapping default becomes the column default.
    pub fn target_column(&self) -> Result<Column> {
        let column = Column::new(self.target_name.clone(), self.target_type);
        match &self.default_value {
            None => Ok(column),
            Some(raw) => {
                let default = column.convert_from_string(raw).map_err(|err| {
                    Error::configuration(format!("Default for mapping {self}: {err}"))
                })?;
                column.with_default(default)
            }
        }
    }
}

impl fmt::Display for ColumnMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> '{}' ({})",
            self.source, self.target_name, self.target_type
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ColumnMappingRepr {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    source_column_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    source_column_index: Option<usize>,
    target_column_name: String,
    target_column_type: ColumnType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default_value: Option<String>,
}

impl TryFrom<ColumnMappingRepr> for ColumnMapping {
    type Error = Error;

    fn try_from(repr: ColumnMappingRepr) -> Result<Self> {
        let source = match (repr.source_column_name, repr.source_column_index) {
            (Some(name), None) => SourceSelector::ByName(name),
            (None, Some(index)) => SourceSelector::ByIndex(index),
            (Some(_), Some(_)) => {
                return Err(Error::configuration(format!(
                    "Mapping for '{}' sets both sourceColumnName and sourceColumnIndex",
                    repr.target_column_name
                )));
            }
            (None, None) => {
                return Err(Error::configuration(format!(
                    "Mapping for '{}' needs sourceColumnName or sourceColumnIndex",
                    repr.target_column_name
                )));
            }
        };
        Ok(ColumnMapping {
            source,
            target_name: repr.target_column_name,
            target_type: repr.target_column_type,
            default_value: repr.default_value,
        })
    }
}

impl From<ColumnMapping> for ColumnMappingRepr {
    fn from(mapping: ColumnMapping) -> Self {
        let (source_column_name, source_column_index) = match mapping.source {
            SourceSelector::ByName(name) => (Some(name), None),
            SourceSelector::ByIndex(index) => (None, Some(index)),
        };
        ColumnMappingRepr {
            source_column_name,
            source_column_index,
            target_column_name: mapping.target_name,
            target_column_type: mapping.target_type,
            default_value: mapping.default_value,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingConfiguration {
    source_location: String,
    column_mappings: Vec<ColumnMapping>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    options: BTreeMap<String, OptionValue>,
}

impl MappingConfiguration {
    pub fn builder(source_location: impl Into<String>) -> MappingConfigurationBuilder {
        MappingConfigurationBuilder::new(source_location)
    }

    /// Builds an identity configuration from headers and sample rows.
    ///
    /// With headers every column is mapped by name onto itself; without, by
    /// position onto generated names `field_0`, `field_1`, ....
    pub fn infer(
        source_location: impl Into<String>,
        headers: Option<&[String]>,
        sample: &[Vec<String>],
    ) -> Result<Self> {
        let mut types = infer_column_types(sample);
        let width = headers.map_or(types.len(), |h| h.len().max(types.len()));
        types.resize(width, ColumnType::String);
        let mut builder = Self::builder(source_location)
            .option(options::HAS_HEADER_ROW, headers.is_some());
        for (idx, ty) in types.into_iter().enumerate() {
            let mapping = match headers.and_then(|h| h.get(idx)) {
                Some(name) => ColumnMapping::by_name(name.clone(), name.clone(), ty),
                None => ColumnMapping::by_index(idx, format!("field_{idx}"), ty),
            };
            builder = builder.mapping(mapping);
        }
        builder.build()
    }

    pub fn source_location(&self) -> &str {
        &self.source_location
    }

    pub fn column_mappings(&self) -> &[ColumnMapping] {
        &self.column_mappings
    }

    pub fn options(&self) -> &BTreeMap<String, OptionValue> {
        &self.options
    }

    pub fn option(&self, key: &str) -> Option<&OptionValue> {
        self.options.get(key)
    }

    /// Boolean option; accepts JSON booleans and the strings `true`/`false`.
    pub fn option_bool(&self, key: &str) -> Option<bool> {
        match self.options.get(key)? {
            OptionValue::Bool(flag) => Some(*flag),
            OptionValue::String(text) => crate::data::parse_boolean(text).ok(),
            _ => None,
        }
    }

    pub fn option_str(&self, key: &str) -> Option<&str> {
        self.options.get(key).and_then(OptionValue::as_str)
    }

    /// `hasHeaderRow`, falling back to `withHeaderRow`, defaulting to true.
    pub fn has_header_row(&self) -> bool {
        self.option_bool(options::HAS_HEADER_ROW)
            .or_else(|| self.option_bool(options::WITH_HEADER_ROW))
            .unwrap_or(true)
    }

    pub fn allow_empty_values(&self) -> bool {
        self.option_bool(options::ALLOW_EMPTY_VALUES)
            .unwrap_or(false)
    }

    pub fn target_names(&self) -> Vec<String> {
        self.column_mappings
            .iter()
            .map(|m| m.target_name().to_string())
            .collect()
    }

    #[must_use]
    pub fn with_source_location(&self, source_location: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.source_location = source_location.into();
        next
    }

    #[must_use]
    pub fn with_option(&self, key: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        let mut next = self.clone();
        next.options.insert(key.into(), value.into());
        next
    }

    /// Checks everything that must hold before a single row is processed.
    pub fn validate(&self) -> Result<()> {
        if self.source_location.trim().is_empty() {
            return Err(Error::configuration("Source location must not be blank"));
        }
        if self.column_mappings.is_empty() {
            return Err(Error::configuration(
                "At least one column mapping is required",
            ));
        }
        let mut seen = HashSet::with_capacity(self.column_mappings.len());
        for mapping in &self.column_mappings {
            if mapping.target_name().trim().is_empty() {
                return Err(Error::configuration(format!(
                    "Mapping from {} has a blank target column name",
                    mapping.source()
                )));
            }
            if let SourceSelector::ByName(name) = mapping.source()
                && name.trim().is_empty()
            {
                return Err(Error::configuration(format!(
                    "Mapping for '{}' has a blank source column name",
                    mapping.target_name()
                )));
            }
            if !seen.insert(mapping.target_name()) {
                return Err(Error::configuration(format!(
                    "Target column '{}' is mapped more than once",
                    mapping.target_name()
                )));
            }
            mapping.target_column()?;
        }
        Ok(())
    }

    /// Target columns in mapping order.
    pub fn columns(&self) -> Result<Vec<Column>> {
        self.column_mappings
            .iter()
            .map(ColumnMapping::target_column)
            .collect()
    }

    /// An empty table whose schema is the mapping targets.
    pub fn create_table(&self) -> Result<Table> {
        Table::with_columns(self.columns()?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let config: MappingConfiguration = if is_json(path) {
            serde_json::from_reader(reader)?
        } else {
            serde_yaml::from_reader(reader)?
        };
        config.validate()?;
        debug!(
            "Loaded {} mapping(s) from {path:?}",
            config.column_mappings.len()
        );
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        if is_json(path) {
            serde_json::to_writer_pretty(writer, self)?;
        } else {
            serde_yaml::to_writer(writer, self)?;
        }
        Ok(())
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn from_yaml_str(input: &str) -> Result<Self> {
        let config: MappingConfiguration = serde_yaml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

/// Fluent construction of a [`MappingConfiguration`]; `build` validates.
#[derive(Debug, Clone)]
pub struct MappingConfigurationBuilder {
    source_location: String,
    column_mappings: Vec<ColumnMapping>,
    options: BTreeMap<String, OptionValue>,
}

impl MappingConfigurationBuilder {
    pub fn new(source_location: impl Into<String>) -> Self {
        Self {
            source_location: source_location.into(),
            column_mappings: Vec::new(),
            options: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn mapping(mut self, mapping: ColumnMapping) -> Self {
        self.column_mappings.push(mapping);
        self
    }

    #[must_use]
    pub fn map(
        self,
        source: impl Into<String>,
        target: impl Into<String>,
        target_type: ColumnType,
    ) -> Self {
        self.mapping(ColumnMapping::by_name(source, target, target_type))
    }

    #[must_use]
    pub fn map_index(
        self,
        index: usize,
        target: impl Into<String>,
        target_type: ColumnType,
    ) -> Self {
        self.mapping(ColumnMapping::by_index(index, target, target_type))
    }

    #[must_use]
    pub fn option(mut self, key: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    pub fn build(self) -> Result<MappingConfiguration> {
        let config = MappingConfiguration {
            source_location: self.source_location,
            column_mappings: self.column_mappings,
            options: self.options,
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn people() -> MappingConfiguration {
        MappingConfiguration::builder("people.csv")
            .map("Name", "FullName", ColumnType::String)
            .map("Age", "Years", ColumnType::Integer)
            .mapping(
                ColumnMapping::by_name("Occupation", "Job", ColumnType::String)
                    .with_default("Unknown"),
            )
            .option(options::HAS_HEADER_ROW, true)
            .build()
            .expect("valid configuration")
    }

    #[test]
    fn build_rejects_blank_location_and_empty_mappings() {
        assert!(matches!(
            MappingConfiguration::builder("  ")
                .map("a", "b", ColumnType::String)
                .build(),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            MappingConfiguration::builder("x.csv").build(),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn build_rejects_duplicate_targets_and_bad_defaults() {
        let dup = MappingConfiguration::builder("x.csv")
            .map("a", "t", ColumnType::String)
            .map_index(2, "t", ColumnType::Integer)
            .build();
        assert!(matches!(dup, Err(Error::Configuration(msg)) if msg.contains("'t'")));

        let bad_default = MappingConfiguration::builder("x.csv")
            .mapping(ColumnMapping::by_index(0, "n", ColumnType::Integer).with_default("many"))
            .build();
        assert!(matches!(bad_default, Err(Error::Configuration(_))));
    }

    #[test]
    fn overrides_leave_the_original_untouched() {
        let config = people();
        let other = config
            .with_source_location("other.csv")
            .with_option(options::TABLE_NAME, "PEOPLE");
        assert_eq!(config.source_location(), "people.csv");
        assert!(config.option(options::TABLE_NAME).is_none());
        assert_eq!(other.source_location(), "other.csv");
        assert_eq!(other.option_str(options::TABLE_NAME), Some("PEOPLE"));
    }

    #[test]
    fn header_flag_reads_either_key() {
        let base = MappingConfiguration::builder("x.csv")
            .map("a", "a", ColumnType::String)
            .build()
            .unwrap();
        assert!(base.has_header_row());
        assert!(!base.with_option(options::WITH_HEADER_ROW, false).has_header_row());
        assert!(!base.with_option(options::HAS_HEADER_ROW, "false").has_header_row());
    }

    #[test]
    fn create_table_uses_mapping_order_and_defaults() {
        let table = people().create_table().unwrap();
        assert_eq!(table.column_names(), vec!["FullName", "Years", "Job"]);
        assert_eq!(
            table.column("Job").and_then(Column::default_value),
            Some(&crate::data::Value::from("Unknown"))
        );
    }

    #[test]
    fn yaml_round_trip_preserves_selectors() {
        let config = MappingConfiguration::builder("db://people")
            .map("Name", "FullName", ColumnType::String)
            .mapping(ColumnMapping::by_index(3, "Score", ColumnType::Double).with_default("0.0"))
            .build()
            .unwrap();
        let yaml = config.to_yaml_string().unwrap();
        assert!(yaml.contains("sourceColumnIndex: 3"));
        assert!(yaml.contains("targetColumnType: double"));
        let restored = MappingConfiguration::from_yaml_str(&yaml).unwrap();
        assert_eq!(restored.column_mappings(), config.column_mappings());
    }

    #[test]
    fn deserialization_enforces_exactly_one_selector() {
        let both = r#"
sourceLocation: x.csv
columnMappings:
  - sourceColumnName: a
    sourceColumnIndex: 0
    targetColumnName: a
    targetColumnType: string
"#;
        let err = MappingConfiguration::from_yaml_str(both).unwrap_err();
        assert!(err.to_string().contains("both"));

        let neither = r#"
sourceLocation: x.csv
columnMappings:
  - targetColumnName: a
    targetColumnType: string
"#;
        assert!(MappingConfiguration::from_yaml_str(neither).is_err());
    }

    #[test]
    fn infer_builds_identity_mappings() {
        let headers = vec!["id".to_string(), "when".to_string()];
        let sample = vec![vec!["1".to_string(), "2024-01-02".to_string()]];
        let config = MappingConfiguration::infer("in.csv", Some(&headers), &sample).unwrap();
        let mappings = config.column_mappings();
        assert_eq!(mappings[0].source_name(), Some("id"));
        assert_eq!(mappings[0].target_type(), ColumnType::Integer);
        assert_eq!(mappings[1].target_type(), ColumnType::Date);
        assert!(config.has_header_row());

        let headerless = MappingConfiguration::infer("in.csv", None, &sample).unwrap();
        assert_eq!(headerless.column_mappings()[1].source_index(), Some(1));
        assert_eq!(headerless.column_mappings()[1].target_name(), "field_1");
        assert!(!headerless.has_header_row());
    }
}
