//! Batch aggregation with per-record error isolation.
//!
//! Each record is converted on its own. Record-level failures become
//! [`ImportRecordError`] entries and processing moves on; only
//! configuration defects abort the batch. The success and error sequences
//! together account for every input record exactly once.

use std::collections::HashSet;

use parkdb_core::{ImportErrorKind, ImportRecordError, ImportSourceResult};
use thiserror::Error;

use crate::error::ScraperError;
use crate::mapping::{FieldMapper, RawRecord};
use crate::normalize::{UnknownBucketError, VocabularyError};
use crate::table::Table;
use crate::validate::RecordValidationError;

/// Why a single record could not be converted.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error(transparent)]
    Validation(#[from] RecordValidationError),

    #[error(transparent)]
    UnknownBucket(#[from] UnknownBucketError),

    #[error("{0}")]
    Normalization(String),

    /// Provider rules exclude the record.
    #[error("{0}")]
    Ignored(String),

    /// Escalated to [`ScraperError::Configuration`]; never recorded per row.
    #[error(transparent)]
    Configuration(#[from] VocabularyError),
}

impl RecordError {
    /// Turns a recoverable failure into its batch entry. Configuration
    /// failures are handed back instead.
    fn into_import_error(self, uid: Option<String>) -> Result<ImportRecordError, VocabularyError> {
        let kind = match &self {
            RecordError::Configuration(err) => return Err(err.clone()),
            RecordError::Validation(_) => ImportErrorKind::Validation,
            RecordError::UnknownBucket(_) | RecordError::Normalization(_) => {
                ImportErrorKind::Normalization
            }
            RecordError::Ignored(_) => ImportErrorKind::Ignored,
        };
        Ok(ImportRecordError {
            uid,
            kind,
            message: self.to_string(),
        })
    }
}

/// Converts every record independently into one [`ImportSourceResult`].
///
/// `key_of` recovers the record's source uid for error reporting before
/// conversion consumes the record.
///
/// # Errors
///
/// Returns [`ScraperError::Configuration`] as soon as any record hits a
/// vocabulary gap. No partial result is returned in that case.
pub fn aggregate<R, T, K, C>(
    records: impl IntoIterator<Item = R>,
    key_of: K,
    mut convert: C,
) -> Result<ImportSourceResult<T>, ScraperError>
where
    K: Fn(&R) -> Option<String>,
    C: FnMut(R) -> Result<T, RecordError>,
{
    let mut result = ImportSourceResult::new();

    for record in records {
        let uid = key_of(&record);
        match convert(record) {
            Ok(item) => result.items.push(item),
            Err(err) => {
                let entry = err.into_import_error(uid)?;
                tracing::debug!(
                    uid = entry.uid.as_deref().unwrap_or("-"),
                    kind = %entry.kind,
                    error = %entry.message,
                    "record rejected"
                );
                result.errors.push(entry);
            }
        }
    }

    Ok(result)
}

/// Like [`aggregate`], additionally rejecting items whose id was already
/// accepted earlier in the batch.
///
/// # Errors
///
/// See [`aggregate`].
pub fn aggregate_unique<R, T, K, C, I>(
    records: impl IntoIterator<Item = R>,
    key_of: K,
    mut convert: C,
    id_of: I,
) -> Result<ImportSourceResult<T>, ScraperError>
where
    K: Fn(&R) -> Option<String>,
    C: FnMut(R) -> Result<T, RecordError>,
    I: Fn(&T) -> &str,
{
    let mut seen = HashSet::new();
    aggregate(records, key_of, |record| {
        let item = convert(record)?;
        if seen.insert(id_of(&item).to_string()) {
            Ok(item)
        } else {
            Err(RecordValidationError::single("id", format!("duplicate lot id {}", id_of(&item))).into())
        }
    })
}

/// Maps every table row through `mapper` and aggregates the conversions.
///
/// `key_field` names the canonical field carrying the row's uid. Uniqueness
/// is checked on the converted item's id, so differently spelled uids that
/// produce the same id are rejected too.
///
/// # Errors
///
/// See [`aggregate`].
pub fn import_table<T, C, I>(
    table: &Table,
    mapper: &FieldMapper,
    key_field: &str,
    convert: C,
    id_of: I,
) -> Result<ImportSourceResult<T>, ScraperError>
where
    C: FnMut(RawRecord) -> Result<T, RecordError>,
    I: Fn(&T) -> &str,
{
    aggregate_unique(
        table.rows.iter().map(|row| mapper.map_row(row)),
        |record: &RawRecord| {
            record
                .get(key_field)
                .filter(|uid| !uid.is_empty())
                .cloned()
        },
        convert,
        id_of,
    )
}
