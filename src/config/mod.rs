use crate::config::cli::Args;
use crate::domain::Chronicle;
use crate::error::Result;
use clap::Parser;
use reqwest::Client;
use std::time::Duration;
use tracing::info;

pub(crate) mod cli;

pub struct Config {
    pub args: Args,
    pub chronicle: Chronicle,
    pub http_client: Client,
}

/// Knobs shared by every listing and detail run.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub chronicle: Chronicle,
    pub page_size: u32,
    pub max_pages: u32,
    pub offset: usize,
    pub limit: Option<usize>,
    pub wait: Duration,
    pub checkpoint_every: usize,
    pub skip_cache: bool,
}

impl Config {
    pub fn new() -> Result<Self> {
        let args = Args::parse();
        Self::from_args(args)
    }

    pub fn from_args(args: Args) -> Result<Self> {
        let chronicle = Chronicle::resolve(args.server, args.chronicle.as_deref());

        let http_client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
            )
            .cookie_store(true)
            .build()?;

        Ok(Self {
            args,
            chronicle,
            http_client,
        })
    }

    pub fn settings(&self) -> RunSettings {
        RunSettings {
            chronicle: self.chronicle.clone(),
            page_size: self.args.page_size.max(1),
            max_pages: self.args.max_pages.max(1),
            offset: self.args.offset,
            limit: self.args.limit,
            wait: Duration::from_millis(self.args.wait_ms),
            checkpoint_every: self.args.checkpoint_every,
            skip_cache: self.args.skip_cache,
        }
    }

    pub fn ensure_directories(&self) -> Result<()> {
        if !self.args.data_dir.exists() {
            std::fs::create_dir_all(&self.args.data_dir)?;
        }
        if !self.args.cache_dir.exists() {
            std::fs::create_dir_all(&self.args.cache_dir)?;
        }

        info!("Data and cache dirs exist");
        Ok(())
    }
}
