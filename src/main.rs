use crate::config::Config;
use crate::error::Result;
use crate::infrastructure::FileSystemStore;
use crate::services::WikiService;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod domain;
mod error;
mod infrastructure;
mod services;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::new()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.args.log_level))
        .with_target(false)
        .init();

    config.ensure_directories()?;

    let store = Arc::new(FileSystemStore::new(
        &config.args.data_dir,
        &config.args.cache_dir,
    ));
    let service = WikiService::new(config, store);
    service.run().await?;

    info!("Scraping completed successfully!");
    Ok(())
}
