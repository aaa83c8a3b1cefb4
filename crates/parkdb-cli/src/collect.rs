//! Import orchestration for the `lot-infos` and `lot-data` commands.
//!
//! Sources run concurrently, bounded by
//! `PARKDB_SCRAPER_MAX_CONCURRENT_REQUESTS`. Accepted batches are printed to
//! stdout as one JSON object keyed by pool id; logs go to stderr.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::Serialize;

use parkdb_core::{AppConfig, ImportRecordError, ImportSourceResult, LotData, LotInfo};
use parkdb_scraper::{ScraperError, SourceAdapter, SourceRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Feed {
    LotInfos,
    LotData,
}

impl Feed {
    fn as_str(self) -> &'static str {
        match self {
            Feed::LotInfos => "lot-infos",
            Feed::LotData => "lot-data",
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Batch {
    LotInfos(ImportSourceResult<LotInfo>),
    LotData(ImportSourceResult<LotData>),
}

impl Batch {
    fn item_count(&self) -> usize {
        match self {
            Batch::LotInfos(result) => result.items.len(),
            Batch::LotData(result) => result.items.len(),
        }
    }

    fn errors(&self) -> &[ImportRecordError] {
        match self {
            Batch::LotInfos(result) => &result.errors,
            Batch::LotData(result) => &result.errors,
        }
    }
}

/// Prints the pool of every registered source as a JSON array.
pub(crate) fn print_pools(registry: &SourceRegistry) -> anyhow::Result<()> {
    let pools: Vec<_> = registry.adapters().iter().map(|a| a.pool()).collect();
    println!("{}", serde_json::to_string_pretty(&pools)?);
    Ok(())
}

/// Resolves `--source` against the registry.
///
/// A source that is configured but skipped at startup is reported with the
/// reason it was skipped.
fn select_adapters(
    registry: &SourceRegistry,
    filter: Option<&str>,
) -> anyhow::Result<Vec<Arc<dyn SourceAdapter>>> {
    let Some(id) = filter else {
        return Ok(registry.adapters().to_vec());
    };

    if let Some(adapter) = registry.get(id) {
        return Ok(vec![adapter]);
    }
    if let Some(skipped) = registry.skipped().iter().find(|s| s.id.as_str() == id) {
        anyhow::bail!("source '{id}' is disabled: {}", skipped.reason);
    }
    anyhow::bail!("source '{id}' is not configured");
}

async fn fetch(adapter: Arc<dyn SourceAdapter>, feed: Feed) -> Result<Batch, ScraperError> {
    match feed {
        Feed::LotInfos => adapter.fetch_lot_infos().await.map(Batch::LotInfos),
        Feed::LotData => adapter.fetch_lot_data().await.map(Batch::LotData),
    }
}

fn report(source: &str, batch: &Batch) {
    for error in batch.errors() {
        tracing::warn!(
            source,
            uid = error.uid.as_deref().unwrap_or("-"),
            kind = %error.kind,
            "{}",
            error.message
        );
    }
    tracing::info!(
        source,
        items = batch.item_count(),
        errors = batch.errors().len(),
        "source imported"
    );
}

/// Imports `feed` from the selected sources and prints the accepted batches.
///
/// # Errors
///
/// Returns an error if `--source` does not name a registered source, or if
/// any source fails structurally. Batches from the sources that succeeded
/// are still printed in that case.
pub(crate) async fn run_import(
    registry: &SourceRegistry,
    config: &AppConfig,
    filter: Option<&str>,
    feed: Feed,
) -> anyhow::Result<()> {
    let adapters = select_adapters(registry, filter)?;
    if adapters.is_empty() {
        tracing::warn!("no sources registered; nothing to import");
    }

    let source_count = adapters.len();
    let outcomes: Vec<(String, Result<Batch, ScraperError>)> = stream::iter(adapters)
        .map(|adapter| async move {
            let id = adapter.pool().id.clone();
            tracing::info!(source = %id, feed = feed.as_str(), "importing source");
            (id, fetch(adapter, feed).await)
        })
        .buffer_unordered(config.scraper_max_concurrent_requests.max(1))
        .collect()
        .await;

    let mut batches = BTreeMap::new();
    let mut failed_sources: usize = 0;
    for (id, outcome) in outcomes {
        match outcome {
            Ok(batch) => {
                report(&id, &batch);
                batches.insert(id, batch);
            }
            Err(e) => {
                tracing::error!(source = %id, error = %e, "source import failed");
                failed_sources += 1;
            }
        }
    }

    println!("{}", serde_json::to_string_pretty(&batches)?);

    if failed_sources > 0 {
        anyhow::bail!("{failed_sources} of {source_count} sources failed {}", feed.as_str());
    }
    Ok(())
}

#[cfg(test)]
#[path = "collect_test.rs"]
mod tests;
