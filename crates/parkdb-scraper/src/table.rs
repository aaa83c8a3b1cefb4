//! CSV and XLSX decoding into a header row plus data rows.

use std::io::Cursor;
use std::path::Path;

use calamine::{Reader, Xlsx};

use crate::error::ScraperError;

/// Delimiters tried by [`sniff_delimiter`], in tie-break order.
const CANDIDATE_DELIMITERS: &[u8] = b";,\t";

/// Zip local file header; every XLSX workbook starts with it.
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// A decoded table. The header row is consumed once to build a field
/// mapper; rows are left as raw strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Splits the first row off as header.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::EmptySource`] when there is no header row.
    pub fn from_rows(source_id: &str, mut rows: Vec<Vec<String>>) -> Result<Self, ScraperError> {
        if rows.is_empty() {
            return Err(ScraperError::EmptySource {
                source_id: source_id.to_string(),
            });
        }
        let mut header = rows.remove(0);
        if let Some(first) = header.first_mut() {
            *first = first.trim_start_matches('\u{feff}').to_string();
        }
        Ok(Self { header, rows })
    }
}

/// Picks the delimiter that occurs most often in the first line.
///
/// German exports use `;` because `,` is the decimal separator.
#[must_use]
pub fn sniff_delimiter(bytes: &[u8]) -> u8 {
    let first_line = bytes.split(|b| *b == b'\n').next().unwrap_or_default();
    CANDIDATE_DELIMITERS
        .iter()
        .copied()
        .map(|d| (d, first_line.iter().filter(|b| **b == d).count()))
        .fold((b',', 0), |best, candidate| {
            if candidate.1 > best.1 {
                candidate
            } else {
                best
            }
        })
        .0
}

/// Reads delimited text. Invalid UTF-8 is replaced rather than rejected,
/// and rows with only blank cells are skipped.
///
/// # Errors
///
/// Returns [`ScraperError::Table`] when the CSV reader fails.
pub fn read_csv(context: &str, bytes: &[u8], delimiter: u8) -> Result<Vec<Vec<String>>, ScraperError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut rows = Vec::new();
    for result in reader.byte_records() {
        let record = result.map_err(|e| ScraperError::Table {
            context: context.to_string(),
            reason: e.to_string(),
        })?;
        let row: Vec<String> = record
            .iter()
            .map(|field| String::from_utf8_lossy(field).into_owned())
            .collect();
        if row.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        rows.push(row);
    }
    Ok(rows)
}

/// Reads the first worksheet of an XLSX workbook.
///
/// # Errors
///
/// Returns [`ScraperError::Table`] when the workbook cannot be opened or has
/// no worksheet.
pub fn read_xlsx(context: &str, bytes: &[u8]) -> Result<Vec<Vec<String>>, ScraperError> {
    let table_error = |reason: String| ScraperError::Table {
        context: context.to_string(),
        reason,
    };

    let mut workbook = Xlsx::new(Cursor::new(bytes.to_vec()))
        .map_err(|e: calamine::XlsxError| table_error(e.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| table_error("workbook has no worksheet".to_string()))?
        .map_err(|e| table_error(e.to_string()))?;

    Ok(range
        .rows()
        .map(|row| row.iter().map(ToString::to_string).collect::<Vec<_>>())
        .filter(|row| row.iter().any(|cell| !cell.trim().is_empty()))
        .collect())
}

/// Decodes `bytes` read from `location` as XLSX or CSV.
///
/// XLSX is chosen by file extension or, for extension-less URLs, by the zip
/// signature.
///
/// # Errors
///
/// Returns [`ScraperError::Table`] on decoding failures and
/// [`ScraperError::EmptySource`] when the table has no rows at all.
pub fn decode_table(source_id: &str, location: &str, bytes: &[u8]) -> Result<Table, ScraperError> {
    let rows = if is_xlsx(location, bytes) {
        read_xlsx(location, bytes)?
    } else {
        read_csv(location, bytes, sniff_delimiter(bytes))?
    };
    tracing::debug!(source = source_id, location, rows = rows.len(), "decoded table");
    Table::from_rows(source_id, rows)
}

fn is_xlsx(location: &str, bytes: &[u8]) -> bool {
    let extension = Path::new(location.split(['?', '#']).next().unwrap_or(location))
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase);
    match extension.as_deref() {
        Some("xlsx" | "xlsm") => true,
        Some("csv" | "txt") => false,
        _ => bytes.starts_with(ZIP_MAGIC),
    }
}
