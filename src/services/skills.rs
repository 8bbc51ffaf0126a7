use super::pipeline::{export, harvest, list_table, scrape_listing, DetailJob, PageSource, TableOutput};
use super::wiki_service::WikiService;
use crate::domain::storage::{PageKey, StorageKeys};
use crate::domain::{Chronicle, SkillLevelRecord, SkillListEntry};
use crate::error::Result;
use crate::infrastructure::export::{read_records, Cells, TableFormat};
use crate::infrastructure::scrapers::skills::{self, SkillListing};
use crate::infrastructure::scrapers::text::safe_name;
use scraper::Html;
use tracing::{info, warn};

pub(crate) fn list_output(chronicle: &Chronicle) -> TableOutput {
    TableOutput::new(
        format!("skills_list_{}", chronicle.name),
        TableFormat::Tsv,
        Cells::Plain,
    )
}

fn details_output(chronicle: &Chronicle) -> TableOutput {
    TableOutput::new(
        format!("skills_details_{}", chronicle.name),
        TableFormat::Tsv,
        Cells::Plain,
    )
}

pub async fn list(service: &WikiService) -> Result<()> {
    let settings = service.settings();
    let base = service.base_url();
    let parser = SkillListing {
        base_url: base.to_string(),
        chronicle: settings.chronicle.name.clone(),
    };

    let entries = scrape_listing(service.source(), &parser, settings, |page| {
        format!(
            "{base}/search?query=&type=skill&sub[levelMin]=1&sub[levelMax]=99&sub[race]=&limit={}&page={page}",
            settings.page_size
        )
    })
    .await?;

    export(
        service.store(),
        &list_output(&settings.chronicle),
        "skills_list",
        &settings.chronicle,
        &entries,
    )?;
    Ok(())
}

struct SkillJob {
    chronicle: String,
}

impl SkillJob {
    fn page_key(&self, entry: &SkillListEntry, suffix: &str) -> PageKey {
        PageKey::new(
            StorageKeys::SKILL_DETAILS,
            &self.chronicle,
            format!("{}_{}_{suffix}", safe_name(&entry.skill_name), entry.skill_id),
        )
    }
}

impl DetailJob for SkillJob {
    type Entry = SkillListEntry;
    type Record = SkillLevelRecord;

    fn describe(&self, entry: &SkillListEntry) -> String {
        format!("skill {} {}", entry.skill_id, entry.skill_name)
    }

    /// One record per level; a level page that fails is skipped on its own.
    async fn visit(&self, source: &PageSource, entry: &SkillListEntry) -> Result<Vec<SkillLevelRecord>> {
        let main_html = source
            .page(&self.page_key(entry, "main"), &entry.skill_link)
            .await?;
        let (main, levels) = {
            let document = Html::parse_document(&main_html);
            let main = skills::parse_main(&document, entry)?;
            let levels = skills::level_links(&document, &main, &entry.skill_link);
            (main, levels)
        };

        let mut records = Vec::with_capacity(levels.len());
        for level in &levels {
            let html = if level.link == entry.skill_link {
                main_html.clone()
            } else {
                let suffix = format!("lv{}", level.level.unwrap_or_default());
                match source.page(&self.page_key(entry, &suffix), &level.link).await {
                    Ok(html) => html,
                    Err(e) => {
                        warn!("Skipping {} level {:?}: {e}", entry.skill_name, level.level);
                        continue;
                    }
                }
            };

            let props = skills::parse_level_props(&Html::parse_document(&html));
            records.push(skills::level_record(entry, &main, level, props));
        }

        Ok(records)
    }
}

pub async fn details(service: &WikiService) -> Result<()> {
    let settings = service.settings();
    let list_path = list_table(service.store(), &list_output(&settings.chronicle))?;
    let entries: Vec<SkillListEntry> = read_records(&list_path, TableFormat::Tsv)?;
    info!("Loaded {} skills from {}", entries.len(), list_path.display());

    let job = SkillJob {
        chronicle: settings.chronicle.name.clone(),
    };
    let output = details_output(&settings.chronicle);
    let records = harvest(service.source(), settings, &job, &entries, &output).await?;

    export(service.store(), &output, "skills_details", &settings.chronicle, &records)?;
    Ok(())
}
