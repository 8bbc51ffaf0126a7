use crate::config::RunSettings;
use crate::domain::storage::{PageKey, Storage};
use crate::domain::{Chronicle, RunManifest};
use crate::error::{Result, ScrapeError};
use crate::infrastructure::export::{Cells, Table, TableFormat};
use crate::infrastructure::scrapers::ListingParser;
use crate::infrastructure::WikiClient;
use indicatif::{ProgressBar, ProgressStyle};
use scraper::Html;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Page access through the on-disk cache. Only network fetches are
/// followed by the configured pause.
pub struct PageSource {
    client: Arc<WikiClient>,
    store: Arc<dyn Storage>,
    wait: Duration,
    skip_cache: bool,
}

impl PageSource {
    pub fn new(client: Arc<WikiClient>, store: Arc<dyn Storage>, settings: &RunSettings) -> Self {
        Self {
            client,
            store,
            wait: settings.wait,
            skip_cache: settings.skip_cache,
        }
    }

    pub fn client(&self) -> &WikiClient {
        &self.client
    }

    pub fn store(&self) -> &dyn Storage {
        self.store.as_ref()
    }

    pub fn wait(&self) -> Duration {
        self.wait
    }

    pub async fn page(&self, key: &PageKey, url: &str) -> Result<String> {
        self.page_if(key, url, |_| true).await
    }

    /// Like [`PageSource::page`], refetching cached copies that fail `reusable`.
    pub async fn page_if(
        &self,
        key: &PageKey,
        url: &str,
        reusable: impl Fn(&str) -> bool,
    ) -> Result<String> {
        if !self.skip_cache {
            if let Some(html) = self.store.load_page(key)? {
                if reusable(&html) {
                    debug!("Cache hit for {}/{}", key.kind, key.key);
                    return Ok(html);
                }
                debug!("Cached {}/{} is incomplete, refetching", key.kind, key.key);
            }
        }

        let html = self.fetch(url).await?;
        self.store.save_page(key, &html)?;
        Ok(html)
    }

    /// Uncached GET followed by the pause.
    pub async fn fetch(&self, url: &str) -> Result<String> {
        let html = self.client.fetch_page(url).await;
        sleep(self.wait).await;
        html
    }
}

/// Walks listing pages `1..=max_pages` until one is empty, marked as the
/// end, or has no "next" link.
pub async fn scrape_listing<P: ListingParser>(
    source: &PageSource,
    parser: &P,
    settings: &RunSettings,
    page_url: impl Fn(u32) -> String,
) -> Result<Vec<P::Entry>> {
    let mut entries = Vec::new();

    for page in 1..=settings.max_pages {
        let url = page_url(page);
        info!("Fetching listing page {page}: {url}");

        let html = match source.fetch(&url).await {
            Ok(html) => html,
            Err(e) if page > 1 => {
                warn!("Stopping listing at page {page}: {e}");
                break;
            }
            Err(e) => return Err(e),
        };

        let listing = parser.parse_page(&Html::parse_document(&html))?;
        let last = listing.is_last();
        info!("Page {page}: {} entries", listing.entries.len());
        entries.extend(listing.entries);

        if last {
            break;
        }
    }

    info!("Listing finished with {} entries", entries.len());
    Ok(entries)
}

/// Turns one list entry into output records, fetching through the cache.
#[allow(async_fn_in_trait)]
pub trait DetailJob {
    type Entry;
    type Record: Serialize;

    fn describe(&self, entry: &Self::Entry) -> String;

    async fn visit(&self, source: &PageSource, entry: &Self::Entry) -> Result<Vec<Self::Record>>;
}

/// Where and how a dataset table is written.
#[derive(Debug, Clone)]
pub struct TableOutput {
    pub stem: String,
    pub format: TableFormat,
    pub cells: Cells,
    pub quoted: bool,
}

impl TableOutput {
    pub fn new(stem: impl Into<String>, format: TableFormat, cells: Cells) -> Self {
        Self {
            stem: stem.into(),
            format,
            cells,
            quoted: true,
        }
    }

    pub fn unquoted(mut self) -> Self {
        self.quoted = false;
        self
    }

    pub fn file_name(&self) -> String {
        format!("{}.{}", self.stem, self.format.extension())
    }

    pub fn checkpoint_name(&self, offset: usize) -> String {
        format!(
            "{}_checkpoint_from{offset}.{}",
            self.stem,
            self.format.extension()
        )
    }

    pub fn write<R: Serialize>(&self, path: &std::path::Path, records: &[R]) -> Result<usize> {
        let table = Table::from_records(records, self.cells)?;
        if self.quoted {
            table.write(path, self.format)?;
        } else {
            table.write_unquoted(path, self.format)?;
        }
        Ok(table.len())
    }
}

fn progress_bar(len: usize) -> Result<ProgressBar> {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
            .map_err(|e| ScrapeError::Other(e.to_string()))?,
    );
    Ok(pb)
}

/// Visits `entries[offset..offset + limit]`. Failed entries are logged and
/// skipped; every `checkpoint_every` entries the records so far are written
/// to the checkpoint table.
pub async fn harvest<J: DetailJob>(
    source: &PageSource,
    settings: &RunSettings,
    job: &J,
    entries: &[J::Entry],
    output: &TableOutput,
) -> Result<Vec<J::Record>> {
    let window: Vec<&J::Entry> = entries
        .iter()
        .skip(settings.offset)
        .take(settings.limit.unwrap_or(usize::MAX))
        .collect();
    info!(
        "Harvesting {} of {} entries starting at {}",
        window.len(),
        entries.len(),
        settings.offset
    );

    let checkpoint = source
        .store()
        .data_path(&output.checkpoint_name(settings.offset));
    let pb = progress_bar(window.len())?;
    let mut records = Vec::new();
    let mut skipped = 0usize;

    for (done, entry) in window.into_iter().enumerate() {
        let label = job.describe(entry);
        pb.set_message(label.clone());

        match job.visit(source, entry).await {
            Ok(found) => records.extend(found),
            Err(e) => {
                warn!("Skipping {label}: {e}");
                skipped += 1;
            }
        }
        pb.inc(1);

        if settings.checkpoint_every > 0 && (done + 1) % settings.checkpoint_every == 0 {
            let rows = output.write(&checkpoint, &records)?;
            info!("Checkpoint: {rows} records -> {}", checkpoint.display());
        }
    }

    pb.finish_with_message(format!("{} records, {skipped} skipped", records.len()));
    Ok(records)
}

/// Writes the final table and its run manifest.
pub fn export<R: Serialize>(
    store: &dyn Storage,
    output: &TableOutput,
    dataset: &str,
    chronicle: &Chronicle,
    records: &[R],
) -> Result<PathBuf> {
    let path = store.data_path(&output.file_name());
    let rows = output.write(&path, records)?;

    let manifest = RunManifest::new(dataset, chronicle, rows, path.display().to_string());
    store.save_manifest(&output.stem, &manifest)?;

    info!("Saved {rows} {dataset} records to {}", path.display());
    Ok(path)
}

/// Path of a list table under the data directory, failing early when the
/// list stage has not been run.
pub fn list_table(store: &dyn Storage, output: &TableOutput) -> Result<PathBuf> {
    let path = store.data_path(&output.file_name());
    if !path.exists() {
        return Err(ScrapeError::NotFound(format!(
            "{} (run the list stage first)",
            path.display()
        )));
    }
    Ok(path)
}

/// Manifest for an output that is not a table, such as XML.
pub fn file_manifest(
    store: &dyn Storage,
    stem: &str,
    chronicle: &Chronicle,
    records: usize,
    path: &std::path::Path,
) -> Result<()> {
    let manifest = RunManifest::new(stem, chronicle, records, path.display().to_string());
    store.save_manifest(stem, &manifest)
}
