//! Canonical parking model and configuration shared by the parkdb crates.

mod app_config;
mod config;
pub mod model;
mod sources;

pub use app_config::{AppConfig, BahnCredentials, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use model::{
    lot_id, ImportErrorKind, ImportRecordError, ImportSourceResult, LotData, LotInfo, LotStatus,
    LotType, PoolInfo, OPEN_24_7,
};
pub use sources::{load_sources, parse_sources, SourceConfig, SourceKind, SourcesFile};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read sources file {path}: {source}")]
    SourcesFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse sources file: {0}")]
    SourcesFileParse(#[source] serde_yaml::Error),

    #[error("invalid sources configuration: {0}")]
    Validation(String),
}
