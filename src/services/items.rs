use super::pipeline::{export, harvest, list_table, scrape_listing, DetailJob, PageSource, TableOutput};
use super::wiki_service::WikiService;
use crate::domain::storage::{PageKey, StorageKeys};
use crate::domain::{Chronicle, ItemDetails, ItemListEntry, ITEM_NUMERIC_COLUMNS};
use crate::error::Result;
use crate::infrastructure::export::{read_records, Cells, TableFormat};
use crate::infrastructure::scrapers::items::{self, ItemListing};
use crate::infrastructure::scrapers::text::item_slug;
use scraper::Html;
use serde_json::{Map, Value};
use tracing::info;

fn list_output(chronicle: &Chronicle) -> TableOutput {
    TableOutput::new(
        format!("items_list_{}", chronicle.name),
        TableFormat::Tsv,
        Cells::Plain,
    )
}

fn details_output(chronicle: &Chronicle) -> TableOutput {
    TableOutput::new(
        format!("items_details_{}", chronicle.name),
        TableFormat::Tsv,
        Cells::NullMarker,
    )
}

pub async fn list(service: &WikiService) -> Result<()> {
    let settings = service.settings();
    let base = service.base_url();
    let parser = ItemListing {
        base_url: base.to_string(),
        chronicle: settings.chronicle.name.clone(),
    };

    let entries = scrape_listing(service.source(), &parser, settings, |page| {
        format!(
            "{base}/search?query=&type=item&sub[levelMin]=1&sub[levelMax]=99&sub[race]=&limit={}&page={page}",
            settings.page_size
        )
    })
    .await?;

    export(
        service.store(),
        &list_output(&settings.chronicle),
        "items_list",
        &settings.chronicle,
        &entries,
    )?;
    Ok(())
}

struct ItemJob {
    chronicle: String,
}

impl DetailJob for ItemJob {
    type Entry = ItemListEntry;
    type Record = Map<String, Value>;

    fn describe(&self, entry: &ItemListEntry) -> String {
        format!("item {} {}", entry.id, entry.name)
    }

    async fn visit(&self, source: &PageSource, entry: &ItemListEntry) -> Result<Vec<Self::Record>> {
        let key = PageKey::new(StorageKeys::ITEM_DETAILS, &self.chronicle, item_slug(&entry.link));
        let html = source.page(&key, &entry.link).await?;
        let details = items::parse_details(&Html::parse_document(&html), entry)?;
        Ok(vec![table_row(&details)?])
    }
}

/// Flattens a detail record and rounds the numeric columns to whole
/// numbers, with 0 and unparsable values becoming null.
fn table_row(details: &ItemDetails) -> Result<Map<String, Value>> {
    let Value::Object(mut row) = serde_json::to_value(details)? else {
        return Ok(Map::new());
    };

    for column in ITEM_NUMERIC_COLUMNS {
        if let Some(value) = row.get_mut(*column) {
            let number = match value {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            };
            *value = match number.map(f64::round) {
                Some(n) if n != 0.0 => Value::from(n as i64),
                _ => Value::Null,
            };
        }
    }
    Ok(row)
}

pub async fn details(service: &WikiService) -> Result<()> {
    let settings = service.settings();
    let list_path = list_table(service.store(), &list_output(&settings.chronicle))?;
    let entries: Vec<ItemListEntry> = read_records(&list_path, TableFormat::Tsv)?;
    info!("Loaded {} items from {}", entries.len(), list_path.display());

    let job = ItemJob {
        chronicle: settings.chronicle.name.clone(),
    };
    let output = details_output(&settings.chronicle);
    let rows = harvest(service.source(), settings, &job, &entries, &output).await?;

    export(service.store(), &output, "items_details", &settings.chronicle, &rows)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn details() -> ItemDetails {
        let mut stats = Map::new();
        stats.insert("p_atk".into(), json!(8.6));
        stats.insert("weight".into(), json!(0));
        stats.insert("crit_rate".into(), json!("n/a"));
        stats.insert("type".into(), json!("Weapon"));

        ItemDetails {
            item_id: "1".into(),
            item_name: Some("Short Sword".into()),
            item_grade: None,
            item_icon: None,
            item_description: None,
            item_description_json: Vec::new(),
            item_skills: Vec::new(),
            item_set: Vec::new(),
            chronicle: Some("lu4".into()),
            stats,
            recipes: Vec::new(),
            link: "https://wiki.mw2.wiki/item/1-short-sword/lu4".into(),
            restrictions: BTreeMap::new(),
            drops: Vec::new(),
            quest_rewards: Vec::new(),
            quest_goal: Vec::new(),
            contained: Vec::new(),
            crystals: Vec::new(),
            soul_crystals: Vec::new(),
        }
    }

    #[test]
    fn numeric_columns_are_rounded_and_zero_is_null() {
        let row = table_row(&details()).unwrap();
        assert_eq!(row["item_id"], json!(1));
        assert_eq!(row["p_atk"], json!(9));
        assert_eq!(row["weight"], Value::Null);
        assert_eq!(row["crit_rate"], Value::Null);
        assert_eq!(row["type"], json!("Weapon"));
    }

    #[test]
    fn outputs_are_named_per_chronicle() {
        let chronicle = Chronicle::from_server(1);
        assert_eq!(list_output(&chronicle).file_name(), "items_list_eternal.tsv");
        assert_eq!(
            details_output(&chronicle).checkpoint_name(100),
            "items_details_eternal_checkpoint_from100.tsv"
        );
    }
}
