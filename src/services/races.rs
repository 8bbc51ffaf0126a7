use super::pipeline::{export, file_manifest, harvest, list_table, DetailJob, PageSource, TableOutput};
use super::wiki_service::WikiService;
use crate::config::RunSettings;
use crate::domain::storage::{PageKey, Storage, StorageKeys};
use crate::domain::{Chronicle, ClassDetails, ClassTree, LevelSkills, RaceListEntry, SkillsSummary};
use crate::error::{Result, ScrapeError};
use crate::infrastructure::export::xml::{class_tree_xml, split_classes, write_xml};
use crate::infrastructure::export::{read_records, Cells, TableFormat};
use crate::infrastructure::scrapers::html::site_root;
use crate::infrastructure::scrapers::races;
use crate::infrastructure::scrapers::text::safe_filename;
use indicatif::{ProgressBar, ProgressStyle};
use scraper::Html;
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{info, warn};

fn list_output(chronicle: &Chronicle) -> TableOutput {
    TableOutput::new(
        format!("races_list_{}", chronicle.name),
        TableFormat::Tsv,
        Cells::Plain,
    )
}

fn details_output(chronicle: &Chronicle) -> TableOutput {
    TableOutput::new(
        format!("races_details_{}", chronicle.name),
        TableFormat::Tsv,
        Cells::Plain,
    )
}

pub async fn list(service: &WikiService) -> Result<()> {
    let settings = service.settings();
    let base = service.base_url();
    let url = format!("{base}/races");
    info!("Fetching races page {url}");

    let html = service.source().fetch(&url).await?;
    let entries = races::parse_races(
        &Html::parse_document(&html),
        base,
        &settings.chronicle.name,
        settings.chronicle.server_id,
    );

    export(
        service.store(),
        &list_output(&settings.chronicle),
        "races_list",
        &settings.chronicle,
        &entries,
    )?;
    Ok(())
}

/// Class detail pages. The first page that renders the class list sidebar
/// also yields the race/class tree.
struct ClassDetailsJob {
    chronicle: String,
    base_url: String,
    tree: RefCell<Option<ClassTree>>,
}

impl DetailJob for ClassDetailsJob {
    type Entry = RaceListEntry;
    type Record = ClassDetails;

    fn describe(&self, entry: &RaceListEntry) -> String {
        format!("{} {}", entry.race_name, entry.subtype_name)
    }

    async fn visit(&self, source: &PageSource, entry: &RaceListEntry) -> Result<Vec<ClassDetails>> {
        let cache_key = format!(
            "{}_{}",
            safe_filename(&entry.race_name),
            safe_filename(&entry.subtype_name)
        );
        let key = PageKey::new(StorageKeys::CLASS_DETAILS, &self.chronicle, cache_key);
        let html = source.page(&key, &entry.subtype_link).await?;

        let document = Html::parse_document(&html);
        if self.tree.borrow().is_none() {
            if let Some(tree) = races::parse_class_tree(&document, &self.base_url) {
                info!("Class tree found with {} races", tree.races.len());
                *self.tree.borrow_mut() = Some(tree);
            }
        }
        Ok(vec![races::parse_class_details(&document, entry, &self.base_url)])
    }
}

fn tree_xml_path(store: &dyn Storage, key: &str, chronicle: &Chronicle) -> PathBuf {
    store.data_path(&format!("{key}_{}.xml", chronicle.name))
}

/// `--offset`/`--limit` select races of the class tree here, so every
/// subtype page is visited.
fn all_entries(settings: &RunSettings) -> RunSettings {
    RunSettings {
        offset: 0,
        limit: None,
        ..settings.clone()
    }
}

pub async fn details(service: &WikiService) -> Result<()> {
    let settings = service.settings();
    let list_path = list_table(service.store(), &list_output(&settings.chronicle))?;
    let entries: Vec<RaceListEntry> = read_records(&list_path, TableFormat::Tsv)?;
    info!("Loaded {} race subtypes from {}", entries.len(), list_path.display());

    let job = ClassDetailsJob {
        chronicle: settings.chronicle.name.clone(),
        base_url: service.base_url().to_string(),
        tree: RefCell::new(None),
    };
    let output = details_output(&settings.chronicle);
    let records = harvest(
        service.source(),
        &all_entries(settings),
        &job,
        &entries,
        &output,
    )
    .await?;
    export(service.store(), &output, "races_details", &settings.chronicle, &records)?;

    let Some(mut tree) = job.tree.into_inner() else {
        warn!("No page carried the class list; class tree not written");
        return Ok(());
    };
    select_races(&mut tree, settings);
    save_tree(service.store(), StorageKeys::CLASS_TREE, &settings.chronicle, &tree)
}

fn select_races(tree: &mut ClassTree, settings: &RunSettings) {
    tree.races.drain(..settings.offset.min(tree.races.len()));
    if let Some(limit) = settings.limit {
        tree.truncate(limit);
    }
}

fn save_tree(store: &dyn Storage, key: &str, chronicle: &Chronicle, tree: &ClassTree) -> Result<()> {
    store.save_class_tree(key, &chronicle.name, tree)?;
    let path = tree_xml_path(store, key, chronicle);
    write_xml(&path, &class_tree_xml(tree)?)?;
    let stem = format!("{key}_{}", chronicle.name);
    file_manifest(store, &stem, chronicle, tree.class_count(), &path)?;
    info!(
        "Saved {} classes of {} races to {}",
        tree.class_count(),
        tree.races.len(),
        path.display()
    );
    Ok(())
}

enum ClassOutcome {
    Skills(SkillsSummary, Option<Vec<LevelSkills>>),
    NotFound,
}

async fn class_skills(
    source: &PageSource,
    chronicle: &str,
    name: &str,
    link: &str,
) -> Result<ClassOutcome> {
    let safe = safe_filename(name);
    let key = PageKey::new(StorageKeys::CLASS_SKILLS, chronicle, format!("class_{safe}"));
    let html = match source
        .page_if(&key, link, races::is_complete_class_page)
        .await
    {
        Ok(html) => html,
        Err(ScrapeError::NotFound(_)) => return Ok(ClassOutcome::NotFound),
        Err(e) => return Err(e),
    };

    if races::is_not_found(&html) {
        return Ok(ClassOutcome::NotFound);
    }

    let site = site_root(link);
    let (summary, level_links) = {
        let document = Html::parse_document(&html);
        (
            races::parse_skills_summary(&document, site),
            races::class_level_links(&document, site),
        )
    };

    let mut levels = Vec::new();
    for (number, url) in level_links {
        let key = PageKey::new(
            StorageKeys::CLASS_SKILLS,
            chronicle,
            format!("class_{safe}_level_{number}"),
        );
        let level_html = match source.page(&key, &url).await {
            Ok(html) => html,
            Err(e) => {
                warn!("Skipping {name} level {number}: {e}");
                continue;
            }
        };

        let skills = races::parse_level_skills(&Html::parse_document(&level_html), site);
        if !skills.is_empty() {
            levels.push(LevelSkills { number, skills });
        }
    }

    let levels = (!levels.is_empty()).then_some(levels);
    Ok(ClassOutcome::Skills(summary, levels))
}

pub async fn skills(service: &WikiService) -> Result<()> {
    enrich_class_tree(service.source(), &service.settings().chronicle).await
}

/// Adds summary and per-level skills to every class of the saved tree and
/// drops classes whose page is gone.
async fn enrich_class_tree(source: &PageSource, chronicle: &Chronicle) -> Result<()> {
    let store = source.store();
    let mut tree = store
        .load_class_tree(StorageKeys::CLASS_TREE, &chronicle.name)?
        .ok_or_else(|| {
            ScrapeError::NotFound(format!(
                "class tree for {} (run `races details` first)",
                chronicle.name
            ))
        })?;

    let purged = store.purge_pages(
        StorageKeys::CLASS_SKILLS,
        &chronicle.name,
        &races::is_rate_limited,
    )?;
    if purged > 0 {
        info!("Removed {purged} rate-limited pages from the cache");
    }

    let classes: Vec<(String, String)> = tree
        .placements()
        .iter()
        .map(|p| (p.class.name.clone(), p.class.link.clone()))
        .collect();

    let pb = ProgressBar::new(classes.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
            .map_err(|e| ScrapeError::Other(e.to_string()))?,
    );

    let mut found = HashMap::new();
    let mut missing = Vec::new();
    for (name, link) in &classes {
        pb.set_message(name.clone());
        match class_skills(source, &chronicle.name, name, link).await {
            Ok(ClassOutcome::Skills(summary, levels)) => {
                found.insert(link.clone(), (summary, levels));
            }
            Ok(ClassOutcome::NotFound) => {
                warn!("{name} answers 404, dropping it from the tree");
                missing.push(link.clone());
            }
            Err(e) => warn!("Skipping class {name}: {e}"),
        }
        pb.inc(1);
    }
    pb.finish_with_message(format!("{} classes with skills", found.len()));

    for link in &missing {
        tree.remove_class(link);
    }
    tree.for_each_class_mut(|class| {
        if let Some((summary, levels)) = found.remove(&class.link) {
            class.skills_summary = Some(summary);
            class.skills = levels;
        }
    });

    save_tree(store, StorageKeys::CLASS_SKILLS_TREE, chronicle, &tree)
}

pub async fn split(service: &WikiService) -> Result<()> {
    let chronicle = &service.settings().chronicle;
    let tree = service
        .store()
        .load_class_tree(StorageKeys::CLASS_SKILLS_TREE, &chronicle.name)?
        .ok_or_else(|| {
            ScrapeError::NotFound(format!(
                "class skills for {} (run `races skills` first)",
                chronicle.name
            ))
        })?;

    let dir = service
        .store()
        .data_path(StorageKeys::SPLIT_DIR)
        .join(&chronicle.name);
    let written = split_classes(&tree, &dir)?;
    info!("Exported {} classes to {}", written.len(), dir.display());
    Ok(())
}
