//! Row sources and sinks.
//!
//! The mapping engine never touches files or connections directly. It reads
//! raw text rows from a [`RowSource`] and writes them to a [`RowSink`]. This
//! module provides CSV implementations (via the `csv` crate, decoding input
//! with `encoding_rs`) and in-memory ones for tests and embedding.
//!
//! - **Delimiter resolution**: an explicit delimiter wins, then the
//!   configuration's `delimiter` option, then the file extension (`.tsv` is
//!   tab, everything else comma).
//! - **stdin/stdout**: the `-` path routes through the standard streams.

use std::{
    collections::VecDeque,
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

use csv::{ByteRecord, QuoteStyle};
use encoding_rs::{Encoding, UTF_8};
use log::debug;

use crate::{
    error::{Error, Result},
    mapping::{MappingConfiguration, options},
};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

/// Forward-direction boundary: something that yields raw text rows.
pub trait RowSource {
    fn has_header(&self) -> bool;

    /// Header names when the source has a header row.
    fn header_names(&self) -> Option<&[String]>;

    /// The next data row, or `None` at end of input.
    fn next_raw_row(&mut self) -> Result<Option<Vec<String>>>;
}

/// Reverse-direction boundary: something that accepts raw text rows.
pub trait RowSink {
    fn write_header(&mut self, names: &[String]) -> Result<()>;

    fn write_row(&mut self, values: &[String]) -> Result<()>;

    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    match label {
        Some(value) => Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| Error::configuration(format!("Unknown encoding '{value}'"))),
        None => Ok(UTF_8),
    }
}

pub fn resolve_input_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    })
}

/// Parses a delimiter token: a single character, or `tab`/`comma`/`semicolon`/`pipe`.
pub fn parse_delimiter(value: &str) -> Result<u8> {
    match value.to_ascii_lowercase().as_str() {
        "tab" | "\\t" => Ok(b'\t'),
        "comma" => Ok(b','),
        "semicolon" => Ok(b';'),
        "pipe" => Ok(b'|'),
        _ if value.len() == 1 => Ok(value.as_bytes()[0]),
        _ => Err(Error::configuration(format!(
            "Delimiter must be a single character, got '{value}'"
        ))),
    }
}

fn configured_delimiter(config: &MappingConfiguration) -> Result<Option<u8>> {
    config
        .option_str(options::DELIMITER)
        .map(parse_delimiter)
        .transpose()
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(Error::Decode(encoding.name()))
    } else {
        Ok(text.into_owned())
    }
}

pub fn decode_record(record: &ByteRecord, encoding: &'static Encoding) -> Result<Vec<String>> {
    record
        .iter()
        .map(|field| decode_bytes(field, encoding))
        .collect()
}

fn open_csv_reader<R: Read>(reader: R, delimiter: u8) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(true)
        .from_reader(reader)
}

/// CSV-backed [`RowSource`]. Rows may be ragged; short rows simply leave
/// trailing positions absent.
pub struct CsvRowSource<R: Read> {
    reader: csv::Reader<R>,
    headers: Option<Vec<String>>,
    encoding: &'static Encoding,
    record: ByteRecord,
}

impl<R: Read> CsvRowSource<R> {
    pub fn new(
        reader: R,
        delimiter: u8,
        has_header: bool,
        encoding: &'static Encoding,
    ) -> Result<Self> {
        let mut source = Self {
            reader: open_csv_reader(reader, delimiter),
            headers: None,
            encoding,
            record: ByteRecord::new(),
        };
        if has_header {
            let headers = source.read_record()?.unwrap_or_default();
            debug!("CSV header: {headers:?}");
            source.headers = Some(headers);
        }
        Ok(source)
    }

    fn read_record(&mut self) -> Result<Option<Vec<String>>> {
        if !self.reader.read_byte_record(&mut self.record)? {
            return Ok(None);
        }
        decode_record(&self.record, self.encoding).map(Some)
    }
}

impl CsvRowSource<Box<dyn Read>> {
    pub fn from_path(
        path: &Path,
        delimiter: u8,
        has_header: bool,
        encoding: &'static Encoding,
    ) -> Result<Self> {
        let reader: Box<dyn Read> = if is_dash(path) {
            Box::new(std::io::stdin().lock())
        } else {
            Box::new(BufReader::new(File::open(path)?))
        };
        Self::new(reader, delimiter, has_header, encoding)
    }

    /// Opens the configuration's source location, honouring its header,
    /// delimiter and encoding options. `delimiter` overrides the option.
    pub fn from_config(config: &MappingConfiguration, delimiter: Option<u8>) -> Result<Self> {
        let path = Path::new(config.source_location());
        let delimiter = match delimiter {
            Some(d) => d,
            None => resolve_input_delimiter(path, configured_delimiter(config)?),
        };
        let encoding = resolve_encoding(config.option_str(options::ENCODING))?;
        Self::from_path(path, delimiter, config.has_header_row(), encoding)
    }
}

impl<R: Read> RowSource for CsvRowSource<R> {
    fn has_header(&self) -> bool {
        self.headers.is_some()
    }

    fn header_names(&self) -> Option<&[String]> {
        self.headers.as_deref()
    }

    fn next_raw_row(&mut self) -> Result<Option<Vec<String>>> {
        self.read_record()
    }
}

/// CSV-backed [`RowSink`]; fields are quoted only when necessary.
pub struct CsvRowSink<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> CsvRowSink<W> {
    pub fn new(writer: W, delimiter: u8) -> Self {
        let writer = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .quote_style(QuoteStyle::Necessary)
            .double_quote(true)
            .flexible(true)
            .from_writer(writer);
        Self { writer }
    }

    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|err| Error::Io(err.into_error()))
    }
}

impl CsvRowSink<Box<dyn Write>> {
    pub fn from_path(path: Option<&Path>, delimiter: u8) -> Result<Self> {
        let writer: Box<dyn Write> = match path {
            Some(p) if !is_dash(p) => Box::new(BufWriter::new(File::create(p)?)),
            _ => Box::new(std::io::stdout()),
        };
        Ok(Self::new(writer, delimiter))
    }
}

impl<W: Write> RowSink for CsvRowSink<W> {
    fn write_header(&mut self, names: &[String]) -> Result<()> {
        self.writer.write_record(names)?;
        Ok(())
    }

    fn write_row(&mut self, values: &[String]) -> Result<()> {
        self.writer.write_record(values)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// In-memory [`RowSource`].
#[derive(Debug, Clone, Default)]
pub struct MemoryRowSource {
    headers: Option<Vec<String>>,
    rows: VecDeque<Vec<String>>,
}

impl MemoryRowSource {
    pub fn new(headers: Option<Vec<String>>, rows: Vec<Vec<String>>) -> Self {
        Self {
            headers,
            rows: rows.into(),
        }
    }

    /// Convenience constructor from string slices.
    pub fn from_strs(headers: Option<&[&str]>, rows: &[&[&str]]) -> Self {
        Self::new(
            headers.map(owned_row),
            rows.iter().map(|row| owned_row(row)).collect(),
        )
    }
}

impl RowSource for MemoryRowSource {
    fn has_header(&self) -> bool {
        self.headers.is_some()
    }

    fn header_names(&self) -> Option<&[String]> {
        self.headers.as_deref()
    }

    fn next_raw_row(&mut self) -> Result<Option<Vec<String>>> {
        Ok(self.rows.pop_front())
    }
}

fn owned_row(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

/// In-memory [`RowSink`].
#[derive(Debug, Clone, Default)]
pub struct MemoryRowSink {
    pub header: Option<Vec<String>>,
    pub rows: Vec<Vec<String>>,
}

impl RowSink for MemoryRowSink {
    fn write_header(&mut self, names: &[String]) -> Result<()> {
        self.header = Some(names.to_vec());
        Ok(())
    }

    fn write_row(&mut self, values: &[String]) -> Result<()> {
        self.rows.push(values.to_vec());
        Ok(())
    }
}
