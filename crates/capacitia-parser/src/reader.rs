use csv::ReaderBuilder;
use tracing::{debug, warn};

use crate::errors::ParserError;
use crate::model::{Delimiter, RawTable, SourceSchema};
use crate::registry::decode_source;
use crate::schema::{detect_delimiter, find_header_row, normalize_header, normalize_label};

pub const DEFAULT_HEADER_SEARCH_ROWS: usize = 15;

#[derive(Debug, Clone)]
pub struct DetectOptions {
    /// Header labels (any spelling; normalized on use) that identify the header row.
    pub required_labels: Vec<String>,
    pub header_search_rows: usize,
}

impl Default for DetectOptions {
    fn default() -> Self {
        Self {
            required_labels: vec!["evento".to_string(), "event".to_string()],
            header_search_rows: DEFAULT_HEADER_SEARCH_ROWS,
        }
    }
}

/// Detects encoding, delimiter and header of a delimited export and returns
/// its records keyed by normalized column label.
///
/// The delimiter comes from the first non-blank line. When that line is a title
/// and no header row turns up with its delimiter, the other delimiter is tried
/// before giving up.
pub fn parse_raw_table(bytes: &[u8], options: &DetectOptions) -> Result<RawTable, ParserError> {
    let (encoding, text) = decode_source(bytes)?;
    let mut delimiter = detect_delimiter(&text);
    debug!(%encoding, %delimiter, "detected source format");

    let mut records = read_records(&text, delimiter)?;
    if records.is_empty() {
        return Err(ParserError::EmptySource);
    }

    let required: Vec<String> = options
        .required_labels
        .iter()
        .map(|label| normalize_label(label))
        .collect();
    let mut header_row = find_header_row(&records, &required, options.header_search_rows);

    if header_row.is_none() {
        let alternate = delimiter.alternate();
        if let Ok(alternate_records) = read_records(&text, alternate) {
            if let Some(row) =
                find_header_row(&alternate_records, &required, options.header_search_rows)
            {
                debug!(
                    detected = %delimiter,
                    %alternate,
                    header_row = row,
                    "header row only found with the alternate delimiter"
                );
                delimiter = alternate;
                records = alternate_records;
                header_row = Some(row);
            }
        }
    }

    let header_row = header_row.ok_or(ParserError::MissingHeader {
        searched_rows: options.header_search_rows.min(records.len()),
        expected: required.clone(),
    })?;

    let mut body = records.split_off(header_row + 1);
    let labels: Vec<String> = records
        .pop()
        .unwrap_or_default()
        .into_iter()
        .map(|label| label.trim().to_string())
        .collect();
    let (columns, renamed) = normalize_header(&labels);
    if !renamed.is_empty() {
        warn!(columns = ?renamed, "duplicate header labels were suffixed");
    }

    body.retain(|record| record.iter().any(|value| !value.trim().is_empty()));

    Ok(RawTable {
        schema: SourceSchema {
            encoding,
            delimiter,
            header_row,
            labels,
            columns,
        },
        records: body,
    })
}

fn reader_builder(delimiter: Delimiter) -> ReaderBuilder {
    let mut builder = ReaderBuilder::new();
    builder
        .delimiter(delimiter.as_byte())
        .has_headers(false)
        .flexible(true);
    builder
}

fn read_records(text: &str, delimiter: Delimiter) -> Result<Vec<Vec<String>>, ParserError> {
    let mut reader = reader_builder(delimiter).from_reader(text.as_bytes());
    let mut records = Vec::new();

    for record in reader.records() {
        let record = record.map_err(|source| ParserError::Csv { source })?;
        records.push(record.iter().map(str::to_string).collect());
    }

    Ok(records)
}
