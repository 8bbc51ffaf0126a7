use super::Chronicle;
use chrono::Local;
use serde::{Deserialize, Serialize};

/// Summary written next to every exported dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub dataset: String,
    pub chronicle: String,
    pub server_id: u32,
    pub records: usize,
    pub output: String,
    pub generated_at: String,
    pub version: String,
}

impl RunManifest {
    pub fn new(dataset: &str, chronicle: &Chronicle, records: usize, output: String) -> Self {
        Self {
            dataset: dataset.to_string(),
            chronicle: chronicle.name.clone(),
            server_id: chronicle.server_id,
            records,
            output,
            generated_at: Local::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
