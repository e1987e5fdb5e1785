pub mod cli;
pub mod column;
pub mod columns;
pub mod convert;
pub mod data;
pub mod error;
pub mod infer;
pub mod io_utils;
pub mod mapping;
pub mod preview;
pub mod render;
pub mod resolve;
pub mod rows;
pub mod schema;
pub mod table;

use std::{
    env,
    path::{Path, PathBuf},
    sync::OnceLock,
};

use anyhow::{Context, Result, bail};
use clap::Parser;
use itertools::Itertools;
use log::{LevelFilter, debug, info};

use crate::{
    cli::{Cli, Commands},
    convert::{export_rows, identity_configuration, read_table},
    io_utils::{CsvRowSink, CsvRowSource, RowSource},
    mapping::{MappingConfiguration, options},
};

pub use crate::error::Error;

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("tabmap", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Probe(args) => handle_probe(&args),
        Commands::Columns(args) => columns::execute(&args),
        Commands::Convert(args) => handle_convert(&args),
        Commands::Preview(args) => preview::execute(&args),
    }
}

/// Loads a mapping file, pointing it at `input` when one is given.
pub(crate) fn load_mapping(path: &Path, input: Option<&Path>) -> Result<MappingConfiguration> {
    let config = MappingConfiguration::load(path)
        .with_context(|| format!("Loading mapping from {path:?}"))?;
    Ok(match input {
        Some(input) => config.with_source_location(input.display().to_string()),
        None => config,
    })
}

fn handle_probe(args: &cli::ProbeArgs) -> Result<()> {
    let delimiter = io_utils::resolve_input_delimiter(&args.input, args.delimiter);
    info!(
        "Probing '{}' with delimiter '{}'",
        args.input.display(),
        printable_delimiter(delimiter)
    );
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let mut source = CsvRowSource::from_path(&args.input, delimiter, !args.no_header, encoding)
        .with_context(|| format!("Opening {:?}", args.input))?;

    let mut sample = Vec::new();
    while args.sample_rows == 0 || sample.len() < args.sample_rows {
        match source
            .next_raw_row()
            .with_context(|| format!("Reading {:?}", args.input))?
        {
            Some(row) => sample.push(row),
            None => break,
        }
    }
    if let Some(headers) = source.header_names() {
        debug!("Header columns: {}", headers.iter().join(", "));
    }

    let mut config = MappingConfiguration::infer(
        args.input.display().to_string(),
        source.header_names(),
        &sample,
    )
    .with_context(|| format!("Inferring mapping from {:?}", args.input))?;
    if delimiter != io_utils::DEFAULT_CSV_DELIMITER {
        config = config.with_option(options::DELIMITER, printable_delimiter(delimiter));
    }
    if let Some(label) = &args.input_encoding {
        config = config.with_option(options::ENCODING, label.clone());
    }
    config
        .save(&args.output)
        .with_context(|| format!("Writing mapping to {:?}", args.output))?;
    info!(
        "Inferred {} column mapping(s) from {} sampled row(s) written to {:?}",
        config.column_mappings().len(),
        sample.len(),
        args.output
    );
    Ok(())
}

fn handle_convert(args: &cli::ConvertArgs) -> Result<()> {
    let mut config = load_mapping(&args.mapping, args.input.as_deref())?;
    if let Some(label) = &args.input_encoding {
        config = config.with_option(options::ENCODING, label.clone());
    }
    let input = PathBuf::from(config.source_location());
    let input_delimiter = match args.delimiter {
        Some(d) => d,
        None => match config.option_str(options::DELIMITER) {
            Some(token) => io_utils::parse_delimiter(token)?,
            None => io_utils::resolve_input_delimiter(&input, None),
        },
    };
    info!(
        "Converting '{}' with delimiter '{}'",
        input.display(),
        printable_delimiter(input_delimiter)
    );

    let mut source = CsvRowSource::from_config(&config, Some(input_delimiter))
        .with_context(|| format!("Opening {input:?}"))?;
    let (table, read_report) = read_table(&mut source, &config, args.on_error)
        .with_context(|| format!("Reading {input:?}"))?;

    let output_location = args
        .output
        .as_ref()
        .map_or_else(|| "-".to_string(), |p| p.display().to_string());
    let output_config = match &args.output_mapping {
        Some(path) => load_mapping(path, None)?.with_source_location(output_location),
        None => identity_configuration(&table, output_location)?,
    };
    let mut sink = CsvRowSink::from_path(
        args.output.as_deref(),
        args.output_delimiter.unwrap_or(input_delimiter),
    )
    .with_context(|| format!("Opening output {:?}", output_config.source_location()))?;
    let write_report = export_rows(&table, &output_config, &mut sink, args.on_error)
        .with_context(|| format!("Writing {:?}", output_config.source_location()))?;

    let rejected = read_report.rejected.len() + write_report.rejected.len();
    if rejected > 0 {
        info!("{rejected} row(s) were skipped; see warnings above");
    }
    if write_report.rows_written == 0 && read_report.rows_read > 0 {
        bail!("No rows could be converted from {input:?}");
    }
    Ok(())
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        other => (other as char).to_string(),
    }
}
