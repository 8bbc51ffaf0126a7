use super::pipeline::{export, harvest, list_table, scrape_listing, DetailJob, PageSource, TableOutput};
use super::wiki_service::WikiService;
use crate::domain::storage::{PageKey, StorageKeys};
use crate::domain::{Chronicle, RecipeDetails, RecipeListEntry};
use crate::error::Result;
use crate::infrastructure::export::{read_records, Cells, TableFormat};
use crate::infrastructure::scrapers::recipes::{self, RecipeListing};
use crate::infrastructure::scrapers::text::item_slug;
use scraper::Html;
use tracing::info;

fn list_output(chronicle: &Chronicle) -> TableOutput {
    TableOutput::new(
        format!("recipes_list_{}", chronicle.name),
        TableFormat::Tsv,
        Cells::Plain,
    )
}

fn details_output(chronicle: &Chronicle) -> TableOutput {
    TableOutput::new(
        format!("recipes_details_{}", chronicle.name),
        TableFormat::Tsv,
        Cells::Plain,
    )
}

pub async fn list(service: &WikiService) -> Result<()> {
    let settings = service.settings();
    let base = service.base_url();
    let parser = RecipeListing {
        base_url: base.to_string(),
    };

    let entries = scrape_listing(service.source(), &parser, settings, |page| {
        format!(
            "{base}/search?query=&type=recipe&sub[levelMin]=1&sub[levelMax]=99&sub[race]=&page={page}&limit={}",
            settings.page_size
        )
    })
    .await?;

    export(
        service.store(),
        &list_output(&settings.chronicle),
        "recipes_list",
        &settings.chronicle,
        &entries,
    )?;
    Ok(())
}

struct RecipeJob {
    chronicle: String,
}

impl DetailJob for RecipeJob {
    type Entry = RecipeListEntry;
    type Record = RecipeDetails;

    fn describe(&self, entry: &RecipeListEntry) -> String {
        format!("recipe {} {}", entry.id, entry.name)
    }

    async fn visit(&self, source: &PageSource, entry: &RecipeListEntry) -> Result<Vec<RecipeDetails>> {
        let cache_key = if entry.id.is_empty() {
            item_slug(&entry.link)
        } else {
            entry.id.clone()
        };
        let key = PageKey::new(StorageKeys::RECIPE_DETAILS, &self.chronicle, cache_key);

        let html = source.page(&key, &entry.link).await?;
        let details = recipes::parse_details(&Html::parse_document(&html), entry)?;
        Ok(vec![details])
    }
}

pub async fn details(service: &WikiService) -> Result<()> {
    let settings = service.settings();
    let list_path = list_table(service.store(), &list_output(&settings.chronicle))?;
    let entries: Vec<RecipeListEntry> = read_records(&list_path, TableFormat::Tsv)?;
    info!("Loaded {} recipes from {}", entries.len(), list_path.display());

    let job = RecipeJob {
        chronicle: settings.chronicle.name.clone(),
    };
    let output = details_output(&settings.chronicle);
    let records = harvest(service.source(), settings, &job, &entries, &output).await?;

    export(service.store(), &output, "recipes_details", &settings.chronicle, &records)?;
    Ok(())
}
