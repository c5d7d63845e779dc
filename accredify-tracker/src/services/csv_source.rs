//! CSV text to logical rows
//!
//! Accepts UTF-8 with or without a byte-order mark. Headers and cells are
//! trimmed; short records are padded with empty cells so every row carries
//! every header.

use accredify_common::{Error, Result};
use std::collections::HashMap;

const UTF8_BOM: char = '\u{feff}';

/// Parsed CSV: header names plus one string map per data record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub rows: Vec<HashMap<String, String>>,
}

/// Parse CSV text into a [`CsvTable`]
///
/// Fails with `Validation` when the text cannot be read as a table, e.g. a
/// record with more fields than the header.
pub fn parse_csv(text: &str) -> Result<CsvTable> {
    let text = text.strip_prefix(UTF8_BOM).unwrap_or(text);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| Error::Validation(format!("Unreadable CSV header: {}", e)))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record
            .map_err(|e| Error::Validation(format!("Malformed CSV record {}: {}", index + 1, e)))?;

        if record.len() > headers.len() {
            return Err(Error::Validation(format!(
                "CSV record {} has {} fields but the header has {}",
                index + 1,
                record.len(),
                headers.len()
            )));
        }

        let row = headers
            .iter()
            .enumerate()
            .map(|(i, header)| {
                let cell = record.get(i).unwrap_or("").trim().to_string();
                (header.clone(), cell)
            })
            .collect();
        rows.push(row);
    }

    tracing::debug!(headers = headers.len(), rows = rows.len(), "Parsed CSV text");

    Ok(CsvTable { headers, rows })
}
