use thiserror::Error;

use crate::mapping::MappingError;
use crate::normalize::VocabularyError;

/// Failures that abort a whole batch.
///
/// Per-record problems never surface here; they are collected into
/// [`parkdb_core::ImportSourceResult::errors`] by the batch aggregator.
#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("rate limited by {domain} (retry after {retry_after_secs}s)")]
    RateLimited {
        domain: String,
        retry_after_secs: u64,
    },

    #[error("endpoint not found: {url}")]
    NotFound { url: String },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("response from {url} has no `{container}` container")]
    MissingContainer { url: String, container: String },

    #[error("source {source_id} returned no data")]
    EmptySource { source_id: String },

    #[error("header mapping failed: {0}")]
    Mapping(#[from] MappingError),

    #[error("table decoding failed for {context}: {reason}")]
    Table { context: String, reason: String },

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration error: {0}")]
    Configuration(#[from] VocabularyError),
}
