//! Source adapters: one value per provider, all behind [`SourceAdapter`].

pub mod bahn;
pub mod neckarsulm;
mod registry;

use std::future::Future;
use std::pin::Pin;

use parkdb_core::{ImportSourceResult, LotData, LotInfo, PoolInfo};

use crate::error::ScraperError;

pub use registry::{SkippedSource, SourceRegistry};

/// Boxed future returned by adapter operations, so adapters stay object safe.
pub type SourceFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ScraperError>> + Send + 'a>>;

/// What every provider adapter can do.
///
/// `Err` means the whole batch failed (transport, missing container,
/// unmappable header, vocabulary gap). Rejected records are reported inside
/// the `Ok` result instead.
pub trait SourceAdapter: Send + Sync {
    fn pool(&self) -> &PoolInfo;

    fn fetch_lot_infos(&self) -> SourceFuture<'_, ImportSourceResult<LotInfo>>;

    /// Live occupancy. Sources without realtime data return an empty result.
    fn fetch_lot_data(&self) -> SourceFuture<'_, ImportSourceResult<LotData>>;
}
