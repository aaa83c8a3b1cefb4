mod collect;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use parkdb_scraper::SourceRegistry;

#[derive(Debug, Parser)]
#[command(name = "parkdb-cli")]
#[command(about = "Import parking facility data from the configured sources")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List the pools of every registered source
    Pools,
    /// Import static lot attributes
    LotInfos {
        /// Only import this source (e.g. `bahn`)
        #[arg(long)]
        source: Option<String>,
    },
    /// Import current occupancy observations
    LotData {
        /// Only import this source (e.g. `bahn`)
        #[arg(long)]
        source: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = parkdb_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let sources = parkdb_core::load_sources(&config.sources_path)?;
    let registry = SourceRegistry::from_config(&config, &sources)?;

    match cli.command {
        Commands::Pools => collect::print_pools(&registry)?,
        Commands::LotInfos { source } => {
            collect::run_import(&registry, &config, source.as_deref(), collect::Feed::LotInfos)
                .await?;
        }
        Commands::LotData { source } => {
            collect::run_import(&registry, &config, source.as_deref(), collect::Feed::LotData)
                .await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests;
