use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Table error: {0}")]
    Table(#[from] csv::Error),
    #[error("Selector error: {0}")]
    Selector(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("HTTP {status} for {url}")]
    Http { status: u16, url: String },
    #[error("Rate limited after reload: {0}")]
    RateLimited(String),
    #[error("Page not found: {0}")]
    NotFound(String),
    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, ScrapeError>;
