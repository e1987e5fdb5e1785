//! Conversion passes between row sources/sinks and tables.
//!
//! A pass validates its configuration before reading anything. Each row is
//! then resolved and inserted (or emitted) as a unit: a row that fails is
//! never half-written. What happens next depends on [`RowErrorPolicy`], and
//! every rejected row is listed in the returned [`ConversionReport`].

use std::collections::{BTreeSet, HashSet};

use clap::ValueEnum;
use log::{debug, info, warn};

use crate::{
    error::{Error, Result},
    io_utils::{RowSink, RowSource},
    mapping::{ColumnMapping, MappingConfiguration, SourceSelector},
    resolve::{HeaderIndex, Recovered, resolve_outbound_row, resolve_row, table_source},
    table::Table,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum RowErrorPolicy {
    /// Stop at the first failing row and return its error
    #[default]
    Abort,
    /// Drop failing rows, log them and list them in the report
    Skip,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowRejection {
    /// 1-based data row number (header rows are not counted)
    pub row: usize,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversionReport {
    pub rows_read: usize,
    pub rows_written: usize,
    pub rejected: Vec<RowRejection>,
    pub warnings: BTreeSet<String>,
}

impl ConversionReport {
    /// True when every row made it through.
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }

    fn warn(&mut self, message: String) {
        if !self.warnings.contains(&message) {
            warn!("{message}");
            self.warnings.insert(message);
        }
    }

    fn row_failed(&mut self, row: usize, err: Error, policy: RowErrorPolicy) -> Result<()> {
        match policy {
            RowErrorPolicy::Abort => Err(Error::Row {
                row,
                source: Box::new(err),
            }),
            RowErrorPolicy::Skip => {
                warn!("Skipping row {row}: {err}");
                self.rejected.push(RowRejection {
                    row,
                    message: err.to_string(),
                });
                Ok(())
            }
        }
    }
}

/// Installs the mapping schema on an empty table, or checks that an existing
/// schema has every target column with the mapped type.
fn prepare_table(config: &MappingConfiguration, table: &mut Table) -> Result<()> {
    if table.column_count() == 0 {
        return table.set_column_definitions(config.columns()?);
    }
    for mapping in config.column_mappings() {
        let column = table
            .column(mapping.target_name())
            .ok_or_else(|| Error::ColumnNotFound(mapping.target_name().to_string()))?;
        if column.datatype() != mapping.target_type() {
            return Err(Error::TypeMismatch {
                column: column.name().to_string(),
                table: column.datatype(),
                mapping: mapping.target_type(),
            });
        }
    }
    Ok(())
}

fn missing_source_warning(mapping: &ColumnMapping, origin: &str) -> String {
    match mapping.default_value() {
        Some(default) => format!(
            "Source column {} is missing from {origin}; '{}' uses default '{default}'",
            mapping.source(),
            mapping.target_name()
        ),
        None => format!(
            "Source column {} is missing from {origin}; '{}' has no default",
            mapping.source(),
            mapping.target_name()
        ),
    }
}

/// Reads every row of `source` into `table` through `config`.
///
/// Rows already in `table` are kept. When the pass aborts, every row it
/// added is removed again, so the table is left as it was handed in.
pub fn import_rows<S>(
    source: &mut S,
    config: &MappingConfiguration,
    table: &mut Table,
    policy: RowErrorPolicy,
) -> Result<ConversionReport>
where
    S: RowSource + ?Sized,
{
    config.validate()?;
    prepare_table(config, table)?;
    let headers = HeaderIndex::new(source.header_names());
    let mut report = ConversionReport::default();

    let mut unheaded = HashSet::new();
    for mapping in config.column_mappings() {
        if let SourceSelector::ByName(name) = mapping.source()
            && headers.position(name).is_none()
        {
            report.warn(missing_source_warning(mapping, "the source header"));
            unheaded.insert(mapping.to_string());
        }
    }

    let start = table.row_count();
    if let Err(err) = fill_rows(source, config, &headers, &unheaded, table, policy, &mut report) {
        table.truncate_rows(start);
        return Err(err);
    }

    info!(
        "Imported {} of {} row(s) from '{}'",
        report.rows_written,
        report.rows_read,
        config.source_location()
    );
    Ok(report)
}

fn fill_rows<S>(
    source: &mut S,
    config: &MappingConfiguration,
    headers: &HeaderIndex,
    unheaded: &HashSet<String>,
    table: &mut Table,
    policy: RowErrorPolicy,
    report: &mut ConversionReport,
) -> Result<()>
where
    S: RowSource + ?Sized,
{
    while let Some(raw) = source.next_raw_row()? {
        report.rows_read += 1;
        let row_number = report.rows_read;
        let outcome = resolve_row(config, headers, &raw).and_then(|resolved| {
            for mapping in resolved.defaulted.iter().filter(|m| !unheaded.contains(*m)) {
                debug!("Row {row_number}: {mapping} absent, default applied");
                report.warn(format!("{mapping}: source value absent from some rows; default applied"));
            }
            for mapping in resolved.missing.iter().filter(|m| !unheaded.contains(*m)) {
                debug!("Row {row_number}: {mapping} absent, no default");
                report.warn(format!("{mapping}: source value absent from some rows; no default"));
            }
            report_recovered(report, row_number, &resolved.recovered);
            let (values, originals) = resolved.into_parts();
            table.insert_row(values, originals)
        });
        match outcome {
            Ok(_) => report.rows_written += 1,
            Err(err) => report.row_failed(row_number, err, policy)?,
        }
    }
    Ok(())
}

fn report_recovered(report: &mut ConversionReport, row_number: usize, recovered: &[Recovered]) {
    for Recovered { mapping, rejected } in recovered {
        debug!("Row {row_number}: {mapping} could not convert '{rejected}', default applied");
        report.warn(format!("{mapping}: unconvertible values replaced by the default"));
    }
}

/// Convenience wrapper: a fresh table built from `config` and filled from `source`.
pub fn read_table<S>(
    source: &mut S,
    config: &MappingConfiguration,
    policy: RowErrorPolicy,
) -> Result<(Table, ConversionReport)>
where
    S: RowSource + ?Sized,
{
    config.validate()?;
    let mut table = config.create_table()?;
    let report = import_rows(source, config, &mut table, policy)?;
    Ok((table, report))
}

/// Writes every row of `table` to `sink` through `config`.
///
/// Mapping sources name (or index) table columns; targets name the external
/// fields. A header row is written when the configuration asks for one.
pub fn export_rows<K>(
    table: &Table,
    config: &MappingConfiguration,
    sink: &mut K,
    policy: RowErrorPolicy,
) -> Result<ConversionReport>
where
    K: RowSink + ?Sized,
{
    config.validate()?;
    let mut report = ConversionReport::default();
    for mapping in config.column_mappings() {
        if table_source(mapping, table).is_none() {
            report.warn(missing_source_warning(mapping, "the table"));
        }
    }

    if config.has_header_row() {
        sink.write_header(&config.target_names())?;
    }
    for row in 0..table.row_count() {
        report.rows_read += 1;
        match resolve_outbound_row(config, table, row) {
            Ok(outbound) => {
                report_recovered(&mut report, row + 1, &outbound.recovered);
                sink.write_row(&outbound.fields)?;
                report.rows_written += 1;
            }
            Err(err) => report.row_failed(row + 1, err, policy)?,
        }
    }
    sink.finish()?;

    info!(
        "Exported {} of {} row(s) to '{}'",
        report.rows_written,
        report.rows_read,
        config.source_location()
    );
    Ok(report)
}

/// A configuration that exports every table column under its own name.
pub fn identity_configuration(
    table: &Table,
    location: impl Into<String>,
) -> Result<MappingConfiguration> {
    table
        .columns()
        .iter()
        .fold(MappingConfiguration::builder(location), |builder, column| {
            builder.map(column.name(), column.name(), column.datatype())
        })
        .build()
}
