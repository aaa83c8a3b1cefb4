//! Field mapping from a source's native columns to canonical field names.
//!
//! Two strategies:
//! - **positional**: a fixed canonical list zipped against row values. Only
//!   safe for sources that never reorder columns.
//! - **header-driven**: every actual header cell is looked up in a translation
//!   table, so reordered or partially present columns still map correctly.

use std::collections::HashMap;

use thiserror::Error;

/// One raw record keyed by canonical field name.
pub type RawRecord = HashMap<String, String>;

/// An entry in a header translation table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderColumn {
    /// Header text as the provider writes it (matched case-insensitively).
    pub source_name: &'static str,
    pub canonical: &'static str,
    /// Mapping fails when a mandatory column is absent from the header.
    pub mandatory: bool,
}

impl HeaderColumn {
    #[must_use]
    pub const fn required(source_name: &'static str, canonical: &'static str) -> Self {
        Self {
            source_name,
            canonical,
            mandatory: true,
        }
    }

    #[must_use]
    pub const fn optional(source_name: &'static str, canonical: &'static str) -> Self {
        Self {
            source_name,
            canonical,
            mandatory: false,
        }
    }
}

/// Structural header problems. These abort the batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    #[error("header is missing mandatory column '{source_name}' (canonical '{canonical}')")]
    MissingColumn {
        source_name: String,
        canonical: String,
    },

    #[error("header columns '{first}' and '{second}' both map to '{canonical}'")]
    DuplicateColumn {
        first: String,
        second: String,
        canonical: String,
    },
}

/// Position → canonical-name correspondence for one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMapper {
    columns: Vec<Option<&'static str>>,
}

impl FieldMapper {
    /// Maps row position `i` to `canonical[i]`.
    #[must_use]
    pub fn positional(canonical: &[&'static str]) -> Self {
        Self {
            columns: canonical.iter().copied().map(Some).collect(),
        }
    }

    /// Builds the mapping from the source's actual header row.
    ///
    /// Header cells not present in `table` are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::MissingColumn`] when a mandatory column is
    /// absent and [`MappingError::DuplicateColumn`] when two header cells
    /// resolve to the same canonical field.
    pub fn header_driven(table: &[HeaderColumn], header: &[String]) -> Result<Self, MappingError> {
        let mut columns = Vec::with_capacity(header.len());
        let mut seen: HashMap<&'static str, &str> = HashMap::new();

        for actual in header {
            let key = normalize_header(actual);
            let canonical = table
                .iter()
                .find(|column| column.source_name.eq_ignore_ascii_case(&key))
                .map(|column| column.canonical);

            if let Some(canonical) = canonical {
                if let Some(first) = seen.insert(canonical, actual.as_str()) {
                    return Err(MappingError::DuplicateColumn {
                        first: first.to_string(),
                        second: actual.clone(),
                        canonical: canonical.to_string(),
                    });
                }
            }
            columns.push(canonical);
        }

        if let Some(missing) = table
            .iter()
            .find(|column| column.mandatory && !seen.contains_key(column.canonical))
        {
            return Err(MappingError::MissingColumn {
                source_name: missing.source_name.to_string(),
                canonical: missing.canonical.to_string(),
            });
        }

        Ok(Self { columns })
    }

    /// Maps one row. Values are trimmed; cells beyond the known columns are
    /// dropped and missing trailing cells are simply absent.
    #[must_use]
    pub fn map_row(&self, row: &[String]) -> RawRecord {
        self.columns
            .iter()
            .zip(row)
            .filter_map(|(canonical, value)| {
                canonical.map(|name| (name.to_string(), value.trim().to_string()))
            })
            .collect()
    }

    /// Canonical fields this mapper produces, in column order.
    pub fn canonical_fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns.iter().filter_map(|c| *c)
    }
}

/// Trims whitespace and a UTF-8 byte-order mark, which spreadsheet exports
/// like to prepend to the first header cell.
fn normalize_header(raw: &str) -> String {
    raw.trim_start_matches('\u{feff}').trim().to_string()
}
