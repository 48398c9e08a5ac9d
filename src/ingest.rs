//! CSV ingestion
//!
//! Turns an uploaded delimited text table into a [`Dataset`]. The first
//! record is the header row. Parsing is lenient: stray quotes are kept as
//! text, leading whitespace is trimmed from every field, and records of any
//! width are accepted. Records that cannot be decoded are skipped and
//! counted rather than failing the whole upload.

use std::io::Read;

use csv::{ReaderBuilder, StringRecord};
use tracing::{debug, warn};

use crate::models::{Dataset, Row};

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("missing or unreadable header row")]
    MissingHeaders,

    #[error("failed to read upload: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to read CSV input: {0}")]
    Read(#[source] csv::Error),
}

/// A parsed upload plus the number of records that were dropped.
#[derive(Debug)]
pub struct ParsedCsv {
    pub dataset: Dataset,
    pub skipped_rows: usize,
}

pub fn parse_csv<R: Read>(mut input: R) -> Result<ParsedCsv, IngestError> {
    let mut raw = Vec::new();
    input.read_to_end(&mut raw)?;
    let trimmed = trim_leading_space(&raw);

    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(trimmed.as_slice());
    let mut records = rdr.records();

    let headers: Vec<String> = match records.next() {
        Some(Ok(record)) => record.iter().map(str::to_string).collect(),
        Some(Err(e)) => {
            warn!(error = %e, "Failed to read CSV header row");
            return Err(IngestError::MissingHeaders);
        }
        None => return Err(IngestError::MissingHeaders),
    };

    let mut rows = Vec::new();
    let mut skipped_rows = 0;

    for (line, result) in records.enumerate() {
        match result {
            Ok(record) => rows.push(to_row(&headers, &record)),
            Err(e) if e.is_io_error() => return Err(IngestError::Read(e)),
            Err(e) => {
                // header is record 1
                debug!(record = line + 2, error = %e, "Skipping malformed CSV record");
                skipped_rows += 1;
            }
        }
    }

    Ok(ParsedCsv {
        dataset: Dataset::new(headers, rows),
        skipped_rows,
    })
}

/// Zip a record against the headers. Values past the last header are
/// dropped; a short record yields a sparse row.
fn to_row(headers: &[String], record: &StringRecord) -> Row {
    headers
        .iter()
        .zip(record.iter())
        .map(|(header, value)| (header.clone(), value.to_string()))
        .collect()
}

#[derive(Clone, Copy)]
enum FieldState {
    Start,
    Unquoted,
    Quoted,
    // a quote seen inside a quoted field: either an escape or the close
    QuoteInQuoted,
}

/// Drop spaces and tabs at the start of every field outside quotes, so a
/// quoted field written after `, ` is still read as quoted.
fn trim_leading_space(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len());
    let mut state = FieldState::Start;

    for &b in input {
        let ends_field = matches!(b, b',' | b'\n' | b'\r');
        state = match state {
            FieldState::Start => match b {
                b' ' | b'\t' => continue,
                b'"' => FieldState::Quoted,
                _ if ends_field => FieldState::Start,
                _ => FieldState::Unquoted,
            },
            FieldState::Unquoted if ends_field => FieldState::Start,
            FieldState::Unquoted => FieldState::Unquoted,
            FieldState::Quoted if b == b'"' => FieldState::QuoteInQuoted,
            FieldState::Quoted => FieldState::Quoted,
            FieldState::QuoteInQuoted if b == b'"' => FieldState::Quoted,
            FieldState::QuoteInQuoted if ends_field => FieldState::Start,
            FieldState::QuoteInQuoted => FieldState::Unquoted,
        };
        out.push(b);
    }

    out
}
