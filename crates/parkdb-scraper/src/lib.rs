//! Ingestion pipeline: field mapping, value normalization, record
//! validation, and batch aggregation, plus the provider adapters built on
//! them.

pub mod batch;
pub mod client;
pub mod error;
pub mod mapping;
pub mod normalize;
pub(crate) mod rate_limit;
pub mod sources;
pub mod status;
pub mod table;
pub mod validate;

pub use batch::{aggregate, aggregate_unique, import_table, RecordError};
pub use client::HttpClient;
pub use error::ScraperError;
pub use mapping::{FieldMapper, HeaderColumn, MappingError, RawRecord};
pub use normalize::{UnknownBucketError, VocabularyError};
pub use sources::{SkippedSource, SourceAdapter, SourceFuture, SourceRegistry};
pub use status::{derive_occupancy, Occupancy};
pub use table::{decode_table, Table};
pub use validate::{validate_record, RecordValidationError};
