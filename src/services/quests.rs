use super::pipeline::{export, harvest, list_table, scrape_listing, DetailJob, PageSource, TableOutput};
use super::wiki_service::WikiService;
use crate::domain::storage::{PageKey, StorageKeys};
use crate::domain::{Chronicle, QuestDetails, QuestListEntry};
use crate::error::Result;
use crate::infrastructure::export::{read_records, Cells, TableFormat};
use crate::infrastructure::scrapers::quests::{self, QuestListing};
use crate::infrastructure::scrapers::text::item_slug;
use scraper::Html;
use tracing::info;

fn list_output(chronicle: &Chronicle) -> TableOutput {
    TableOutput::new(
        format!("quests_list_{}", chronicle.name),
        TableFormat::Tsv,
        Cells::Plain,
    )
}

fn details_output(chronicle: &Chronicle) -> TableOutput {
    TableOutput::new(
        format!("quests_details_{}", chronicle.name),
        TableFormat::Tsv,
        Cells::Plain,
    )
}

pub async fn list(service: &WikiService) -> Result<()> {
    let settings = service.settings();
    let base = service.base_url();
    let parser = QuestListing {
        base_url: base.to_string(),
    };

    let entries = scrape_listing(service.source(), &parser, settings, |page| {
        format!(
            "{base}/search/quest?query=&sub[levelMin]=1&sub[levelMax]=99&sub[race]=&page={page}&limit={}",
            settings.page_size
        )
    })
    .await?;

    export(
        service.store(),
        &list_output(&settings.chronicle),
        "quests_list",
        &settings.chronicle,
        &entries,
    )?;
    Ok(())
}

struct QuestJob {
    chronicle: Chronicle,
}

impl DetailJob for QuestJob {
    type Entry = QuestListEntry;
    type Record = QuestDetails;

    fn describe(&self, entry: &QuestListEntry) -> String {
        format!(
            "quest {} {}",
            entry.id.as_deref().unwrap_or("?"),
            entry.name.as_deref().unwrap_or_default()
        )
    }

    async fn visit(&self, source: &PageSource, entry: &QuestListEntry) -> Result<Vec<QuestDetails>> {
        let url = quests::detail_url(entry, self.chronicle.url_segment());
        let cache_key = entry
            .id
            .clone()
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| item_slug(&url));
        let key = PageKey::new(StorageKeys::QUEST_DETAILS, &self.chronicle.name, cache_key);

        let html = source.page(&key, &url).await?;
        let details =
            quests::parse_details(&Html::parse_document(&html), entry, &url, &self.chronicle.name)?;
        Ok(vec![details])
    }
}

pub async fn details(service: &WikiService) -> Result<()> {
    let settings = service.settings();
    let list_path = list_table(service.store(), &list_output(&settings.chronicle))?;
    let entries: Vec<QuestListEntry> = read_records(&list_path, TableFormat::Tsv)?;
    info!("Loaded {} quests from {}", entries.len(), list_path.display());

    let job = QuestJob {
        chronicle: settings.chronicle.clone(),
    };
    let output = details_output(&settings.chronicle);
    let records = harvest(service.source(), settings, &job, &entries, &output).await?;

    export(service.store(), &output, "quests_details", &settings.chronicle, &records)?;
    Ok(())
}
