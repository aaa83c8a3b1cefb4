use std::sync::Arc;

use parkdb_core::{AppConfig, SourceKind, SourcesFile};

use super::bahn::{BahnOptions, BahnSource};
use super::neckarsulm::NeckarsulmSource;
use super::SourceAdapter;
use crate::client::HttpClient;
use crate::error::ScraperError;

/// A configured source that was not registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedSource {
    pub id: SourceKind,
    pub reason: String,
}

/// The adapters available for this run, in configuration order.
#[derive(Default)]
pub struct SourceRegistry {
    adapters: Vec<Arc<dyn SourceAdapter>>,
    skipped: Vec<SkippedSource>,
}

impl SourceRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers every enabled source whose requirements are met.
    ///
    /// Sources lacking credentials are skipped and reported once here with
    /// a warning; they never surface later as a runtime failure.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the shared HTTP client cannot be built.
    pub fn from_config(config: &AppConfig, sources: &SourcesFile) -> Result<Self, ScraperError> {
        let client = HttpClient::from_app_config(config)?;
        let mut registry = Self::new();

        for source in sources.enabled() {
            match source.id {
                SourceKind::Bahn => match &config.bahn_credentials {
                    Some(credentials) => registry.register(Arc::new(BahnSource::new(
                        client.clone(),
                        credentials.clone(),
                        BahnOptions::from_source_config(source, config),
                    ))),
                    None => registry.skip(
                        source.id,
                        "DB_CLIENT_ID and DB_API_KEY must be set in the environment",
                    ),
                },
                SourceKind::Neckarsulm => match &source.location {
                    Some(location) => registry.register(Arc::new(NeckarsulmSource::new(
                        client.clone(),
                        location.clone(),
                        source.timeout_secs,
                    ))),
                    None => registry.skip(source.id, "no location configured"),
                },
            }
        }

        tracing::info!(
            registered = registry.adapters.len(),
            skipped = registry.skipped.len(),
            "source registry ready"
        );
        Ok(registry)
    }

    pub fn register(&mut self, adapter: Arc<dyn SourceAdapter>) {
        tracing::debug!(source = %adapter.pool().id, "registered source");
        self.adapters.push(adapter);
    }

    fn skip(&mut self, id: SourceKind, reason: &str) {
        tracing::warn!(source = %id, reason, "source disabled");
        self.skipped.push(SkippedSource {
            id,
            reason: reason.to_string(),
        });
    }

    /// Looks up an adapter by pool id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Arc<dyn SourceAdapter>> {
        self.adapters
            .iter()
            .find(|adapter| adapter.pool().id == id)
            .cloned()
    }

    #[must_use]
    pub fn adapters(&self) -> &[Arc<dyn SourceAdapter>] {
        &self.adapters
    }

    #[must_use]
    pub fn skipped(&self) -> &[SkippedSource] {
        &self.skipped
    }
}
