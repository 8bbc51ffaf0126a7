use super::pipeline::{export, harvest, list_table, scrape_listing, DetailJob, PageSource, TableOutput};
use super::wiki_service::WikiService;
use crate::domain::storage::{PageKey, StorageKeys};
use crate::domain::{Chronicle, NpcDetails, NpcListEntry};
use crate::error::Result;
use crate::infrastructure::export::{read_records, Cells, TableFormat};
use crate::infrastructure::scrapers::npcs::{self, NpcListing};
use crate::infrastructure::scrapers::text::{entity_id, item_slug};
use scraper::Html;
use tracing::info;

fn list_output(chronicle: &Chronicle) -> TableOutput {
    TableOutput::new(
        format!("npcs_list_{}", chronicle.name),
        TableFormat::Csv,
        Cells::Plain,
    )
}

/// Cells are flattened so the details table needs no quoting.
fn details_output(chronicle: &Chronicle) -> TableOutput {
    TableOutput::new(
        format!("npcs_details_{}", chronicle.name),
        TableFormat::Tsv,
        Cells::Sanitized,
    )
    .unquoted()
}

pub async fn list(service: &WikiService) -> Result<()> {
    let settings = service.settings();
    let base = service.base_url();
    let parser = NpcListing {
        base_url: base.to_string(),
    };

    let entries = scrape_listing(service.source(), &parser, settings, |page| {
        format!(
            "{base}/search/npc?query=&sub%5BlevelMin%5D=1&sub%5BlevelMax%5D=99&sub%5Brace%5D=\
             &page={page}&limit={size}&per-page={size}",
            size = settings.page_size
        )
    })
    .await?;

    export(
        service.store(),
        &list_output(&settings.chronicle),
        "npcs_list",
        &settings.chronicle,
        &entries,
    )?;
    Ok(())
}

struct NpcJob {
    chronicle: Chronicle,
}

impl NpcJob {
    fn cache_key(url: &str) -> String {
        entity_id(url, "npc")
            .map(|id| id.to_string())
            .unwrap_or_else(|| item_slug(url))
    }
}

impl DetailJob for NpcJob {
    type Entry = NpcListEntry;
    type Record = NpcDetails;

    fn describe(&self, entry: &NpcListEntry) -> String {
        format!("npc {} (Lv. {})", entry.name, entry.level)
    }

    async fn visit(&self, source: &PageSource, entry: &NpcListEntry) -> Result<Vec<NpcDetails>> {
        let url = npcs::detail_url(&entry.url, self.chronicle.url_segment());
        let key = PageKey::new(StorageKeys::NPC_DETAILS, &self.chronicle.name, Self::cache_key(&url));
        let html = source.page(&key, &url).await?;
        let details =
            npcs::parse_details(&Html::parse_document(&html), entry, &url, &self.chronicle.name)?;
        Ok(vec![details])
    }
}

pub async fn details(service: &WikiService) -> Result<()> {
    let settings = service.settings();
    let list_path = list_table(service.store(), &list_output(&settings.chronicle))?;
    let entries: Vec<NpcListEntry> = read_records(&list_path, TableFormat::Csv)?;
    info!("Loaded {} npcs from {}", entries.len(), list_path.display());

    let job = NpcJob {
        chronicle: settings.chronicle.clone(),
    };
    let output = details_output(&settings.chronicle);
    let records = harvest(service.source(), settings, &job, &entries, &output).await?;

    export(service.store(), &output, "npcs_details", &settings.chronicle, &records)?;
    Ok(())
}
