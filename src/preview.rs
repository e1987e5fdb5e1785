use anyhow::{Context, Result};
use log::info;

use crate::{
    cli::PreviewArgs,
    convert::{RowErrorPolicy, read_table},
    io_utils::CsvRowSource,
    load_mapping, render,
};

pub fn execute(args: &PreviewArgs) -> Result<()> {
    let config = load_mapping(&args.mapping, args.input.as_deref())?;
    let mut source = CsvRowSource::from_config(&config, args.delimiter)
        .with_context(|| format!("Opening {:?}", config.source_location()))?;
    let (table, report) = read_table(&mut source, &config, RowErrorPolicy::Skip)
        .with_context(|| format!("Reading {:?}", config.source_location()))?;

    print!("{}", render::render(&table, Some(args.rows))?);
    info!(
        "Displayed {} of {} row(s) from '{}'",
        table.row_count().min(args.rows),
        table.row_count(),
        config.source_location()
    );
    if !report.is_clean() {
        info!("{} row(s) could not be converted", report.rejected.len());
    }
    Ok(())
}
