use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::{convert::RowErrorPolicy, io_utils};

#[derive(Debug, Parser)]
#[command(author, version, about = "Convert tabular data through declarative column mappings", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Infer an identity mapping configuration from a CSV file
    Probe(ProbeArgs),
    /// List the column mappings of a configuration file
    Columns(ColumnsArgs),
    /// Read a CSV file through a mapping and write the converted rows
    Convert(ConvertArgs),
    /// Read a CSV file through a mapping and show the typed table
    Preview(PreviewArgs),
}

#[derive(Debug, Args)]
pub struct ProbeArgs {
    /// Input CSV file to inspect
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Destination mapping file (.yml/.yaml or .json)
    #[arg(short = 'o', long = "output")]
    pub output: PathBuf,
    /// Number of rows to sample when inferring types (0 means full scan)
    #[arg(long, default_value_t = 100)]
    pub sample_rows: usize,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Treat the first row as data rather than a header
    #[arg(long = "no-header")]
    pub no_header: bool,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct ColumnsArgs {
    /// Mapping configuration file
    #[arg(short = 'm', long = "mapping")]
    pub mapping: PathBuf,
}

#[derive(Debug, Args)]
pub struct ConvertArgs {
    /// Input CSV file (overrides the mapping's source location)
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,
    /// Mapping configuration applied while reading
    #[arg(short = 'm', long = "mapping")]
    pub mapping: PathBuf,
    /// Output CSV file (stdout if omitted or '-')
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Mapping configuration applied while writing (defaults to every table column)
    #[arg(long = "output-mapping")]
    pub output_mapping: Option<PathBuf>,
    /// What to do with rows that fail conversion
    #[arg(long = "on-error", value_enum, default_value_t = RowErrorPolicy::Abort)]
    pub on_error: RowErrorPolicy,
    /// Input delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Output delimiter character (defaults to the input delimiter)
    #[arg(long = "output-delimiter", value_parser = parse_delimiter)]
    pub output_delimiter: Option<u8>,
    /// Character encoding of the input file (overrides the mapping's encoding option)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct PreviewArgs {
    /// Input CSV file (overrides the mapping's source location)
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,
    /// Mapping configuration applied while reading
    #[arg(short = 'm', long = "mapping")]
    pub mapping: PathBuf,
    /// Number of rows to display
    #[arg(long, default_value_t = 10)]
    pub rows: usize,
    /// Input delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
}

fn parse_delimiter(value: &str) -> Result<u8, String> {
    io_utils::parse_delimiter(value).map_err(|err| err.to_string())
}
