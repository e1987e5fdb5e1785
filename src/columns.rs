//! Column listing from a mapping configuration.
//!
//! Renders each mapping's source selector, target name, target type and
//! default as an ASCII table.

use anyhow::{Context, Result};
use log::info;

use crate::{cli::ColumnsArgs, mapping::MappingConfiguration, render};

pub fn execute(args: &ColumnsArgs) -> Result<()> {
    let config = MappingConfiguration::load(&args.mapping)
        .with_context(|| format!("Loading mapping from {:?}", args.mapping))?;

    let rows = config
        .column_mappings()
        .iter()
        .enumerate()
        .map(|(idx, mapping)| {
            vec![
                (idx + 1).to_string(),
                mapping.source().to_string(),
                mapping.target_name().to_string(),
                mapping.target_type().to_string(),
                mapping.default_value().unwrap_or_default().to_string(),
            ]
        })
        .collect::<Vec<_>>();

    let headers = ["#", "source", "target", "type", "default"]
        .map(String::from)
        .to_vec();
    render::print_rows(&headers, &rows);
    info!(
        "Listed {} mapping(s) reading from '{}'",
        rows.len(),
        config.source_location()
    );
    Ok(())
}
