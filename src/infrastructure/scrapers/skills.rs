use super::html::{absolute_url, attr, css, require, site_root, text, text_sep};
use super::text::{entity_id, icon_basename, snake_case};
use super::{ListingPage, ListingParser};
use crate::domain::{
    AvailableFor, SkillLevelLink, SkillLevelRecord, SkillListEntry, SkillMain, UsesExtra,
};
use crate::error::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html};
use serde_json::{Map, Value};

static FIRST_INT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)").unwrap());
static MP_COST: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(\d+)\s*MP").unwrap());
static PIECES: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(.+?),\s*(\d+)\s*pcs").unwrap());
static RANGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+)\s*\((\d+)\)").unwrap());
static CLASS_LEVEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z\s]+)\s*Lv\.\s*(\d+)").unwrap());
static ICON_PATH: Lazy<Regex> = Lazy::new(|| Regex::new(r"^/icon64/|\.png$").unwrap());

pub struct SkillListing {
    pub base_url: String,
    pub chronicle: String,
}

impl ListingParser for SkillListing {
    type Entry = SkillListEntry;

    fn parse_page(&self, document: &Html) -> Result<ListingPage<SkillListEntry>> {
        if let Some(cell) = document.select(css!("td.text-center")).next() {
            if text(cell).to_lowercase().contains("empty") {
                return Ok(ListingPage::exhausted());
            }
        }

        let entries = document
            .select(css!("table.table-vcenter a.item-name"))
            .map(|link| {
                let href = attr(link, "href");
                SkillListEntry {
                    skill_id: entity_id(&href, "skill")
                        .map(|id| id.to_string())
                        .unwrap_or_default(),
                    skill_name: link
                        .select(css!(".item-name__content"))
                        .next()
                        .map(text)
                        .unwrap_or_default(),
                    skill_icon: link
                        .select(css!("img"))
                        .next()
                        .map(|img| attr(img, "src"))
                        .filter(|src| !src.is_empty())
                        .map(|src| icon_basename(&src))
                        .unwrap_or_default(),
                    skill_link: absolute_url(&self.base_url, &href),
                    chronicle: self.chronicle.clone(),
                    skill_icon_panel: None,
                }
            })
            .collect();

        Ok(ListingPage::new(entries))
    }
}

/// Header of the skill page; a page without it is not a skill page.
pub fn parse_main(document: &Html, entry: &SkillListEntry) -> Result<SkillMain> {
    let title = require(document, "div#result-title")?;
    let part = |selector: &scraper::Selector| {
        title
            .select(selector)
            .next()
            .map(|el| text_sep(el, " "))
    };

    Ok(SkillMain {
        icon_src: title
            .select(css!("img"))
            .next()
            .map(|img| attr(img, "src"))
            .unwrap_or_default(),
        name: part(css!(".item-name__content")).unwrap_or_else(|| entry.skill_name.clone()),
        level: part(css!(".item-name__additional")).unwrap_or_default(),
        description: part(css!("div p")).unwrap_or_default(),
    })
}

/// Links to every level of the skill, or the page itself when it has a
/// single level.
pub fn level_links(document: &Html, main: &SkillMain, skill_link: &str) -> Vec<SkillLevelLink> {
    let Some(table) = document
        .select(css!("table.table-stripped.table-vcenter"))
        .next()
    else {
        let level = FIRST_INT
            .captures(&main.level)
            .and_then(|c| c[1].parse().ok())
            .unwrap_or(1);
        return vec![SkillLevelLink {
            level: Some(level),
            link: skill_link.to_string(),
            description: main.description.clone(),
        }];
    };

    let root = site_root(skill_link);
    table
        .select(css!("tr"))
        .filter_map(|tr| {
            let link = tr.select(css!("a.item-name")).next()?;
            let href = attr(link, "href");
            let level = link
                .select(css!(".item-name__additional"))
                .next()
                .and_then(|l| FIRST_INT.captures(&text_sep(l, " ")).and_then(|c| c[1].parse().ok()));
            let description = tr
                .select(css!("td"))
                .nth(1)
                .map(|td| text_sep(td, " "))
                .unwrap_or_default();

            Some(SkillLevelLink {
                level,
                link: absolute_url(root, &href),
                description,
            })
        })
        .collect()
}

/// Property table of a level page.
pub fn parse_level_props(document: &Html) -> Map<String, Value> {
    let mut props = Map::new();
    let Some(table) = document
        .select(css!("table.table-vcenter:not(.table-stripped)"))
        .next()
        .or_else(|| document.select(css!("table.table-vcenter")).next())
    else {
        return props;
    };

    for tr in table.select(css!("tr")) {
        let cells: Vec<_> = tr.select(css!("td")).collect();
        let [label, value, ..] = cells.as_slice() else {
            continue;
        };
        let key = snake_case(&text_sep(*label, " "));
        let raw = text_sep(*value, " ");

        let parsed = match key.as_str() {
            "uses" => {
                let extra = uses_extra(*value);
                if !extra.is_empty() {
                    props.insert("uses_extra".into(), serde_json::to_value(extra).unwrap_or_default());
                }
                int_or_null(MP_COST.captures(&raw).map(|c| c[1].to_string()))
            }
            "cooldown_time" => int_or_null(FIRST_INT.captures(&raw).map(|c| c[1].to_string())),
            "can_it_be_used_at_the_olympiad" => Value::Bool(raw.trim().eq_ignore_ascii_case("yes")),
            "trait" => Value::String(
                raw.trim_matches(['{', '}'])
                    .replace("trait_", "")
                    .trim()
                    .to_string(),
            ),
            "range_of_use" => match RANGE.captures(&raw) {
                Some(c) => {
                    props.insert("range_min".into(), int_or_null(Some(c[1].to_string())));
                    props.insert("range_max".into(), int_or_null(Some(c[2].to_string())));
                    continue;
                }
                None => Value::String(raw.clone()),
            },
            "available_for" => {
                let classes: Vec<AvailableFor> = value
                    .select(css!("a"))
                    .map(|a| {
                        let label = text_sep(a, " ");
                        match CLASS_LEVEL.captures(&label) {
                            Some(c) => AvailableFor {
                                class: c[1].trim().to_string(),
                                level: c[2].parse().ok(),
                            },
                            None => AvailableFor {
                                class: label,
                                level: None,
                            },
                        }
                    })
                    .collect();
                serde_json::to_value(classes).unwrap_or_default()
            }
            _ => Value::String(raw),
        };
        props.insert(key, parsed);
    }

    props
}

fn int_or_null(digits: Option<String>) -> Value {
    digits
        .and_then(|d| d.parse::<i64>().ok())
        .map(Value::from)
        .unwrap_or(Value::Null)
}

fn uses_extra(cell: ElementRef<'_>) -> Vec<UsesExtra> {
    cell.select(css!("a.item-name"))
        .map(|a| {
            let (item_name, item_count) = match a.select(css!(".item-name__content")).next() {
                Some(content) => {
                    let label = text_sep(content, " ");
                    match PIECES.captures(&label) {
                        Some(c) => (Some(c[1].trim().to_string()), c[2].parse().ok()),
                        None => (Some(label.trim().to_string()), None),
                    }
                }
                None => (None, None),
            };
            UsesExtra {
                item_id: entity_id(&attr(a, "href"), "item"),
                item_name,
                item_count,
            }
        })
        .collect()
}

pub fn level_record(
    entry: &SkillListEntry,
    main: &SkillMain,
    level: &SkillLevelLink,
    props: Map<String, Value>,
) -> SkillLevelRecord {
    let icon_src = if main.icon_src.is_empty() {
        entry.skill_icon.as_str()
    } else {
        main.icon_src.as_str()
    };

    SkillLevelRecord {
        skill_id: entry.skill_id.trim().parse().ok().or_else(|| {
            FIRST_INT
                .captures(&entry.skill_id)
                .and_then(|c| c[1].parse().ok())
        }),
        skill_name: entry.skill_name.clone(),
        skill_icon: ICON_PATH.replace_all(icon_src, "").into_owned(),
        skill_level: level.level,
        skill_description: level.description.clone(),
        skill_link: level.link.clone(),
        chronicle: entry.chronicle.clone(),
        props,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const MAIN: &str = r#"
        <div id="result-title"><img src="/icon64/skill0003.png">
          <span class="item-name__content">Power Strike</span>
          <span class="item-name__additional">Lv. 1</span>
          <div><p>Gathers power for a fierce strike.</p></div>
        </div>
        <table class="table table-stripped table-vcenter">
          <tr><td><a class="item-name" href="/skill/3-power-strike/lu4?level=1">
            <span class="item-name__additional">Lv. 1</span></a></td><td>Power 25</td></tr>
          <tr><td><a class="item-name" href="/skill/3-power-strike/lu4?level=2">
            <span class="item-name__additional">Lv. 2</span></a></td><td>Power 27</td></tr>
        </table>"#;

    const LEVEL: &str = r#"
        <table class="table table-stripped table-vcenter"><tr><td>levels</td><td>x</td></tr></table>
        <table class="table table-vcenter">
          <tr><td>Type</td><td>Physical</td></tr>
          <tr><td>Uses</td><td>12 MP <a class="item-name" href="/item/1785-soul-ore/lu4">
            <span class="item-name__content">Soul Ore, 2 pcs</span></a></td></tr>
          <tr><td>Cooldown time</td><td>13 sec.</td></tr>
          <tr><td>Can it be used at the Olympiad?</td><td>Yes</td></tr>
          <tr><td>Trait</td><td>{trait_sword}</td></tr>
          <tr><td>Range of use</td><td>40 (400)</td></tr>
          <tr><td>Available for</td><td><a href="/class/1">Warrior Lv. 20</a><a href="/class/2">Gladiator</a></td></tr>
        </table>"#;

    fn entry() -> SkillListEntry {
        SkillListEntry {
            skill_id: "3".into(),
            skill_name: "Power Strike".into(),
            skill_icon: "skill0003".into(),
            skill_link: "https://wiki.mw2.wiki/skill/3-power-strike/lu4".into(),
            chronicle: "lu4".into(),
            skill_icon_panel: None,
        }
    }

    #[test]
    fn listing_and_empty_marker() {
        let html = r#"<table class="table-vcenter"><tr><td>
            <a class="item-name" href="/skill/3-power-strike/lu4"><img src="/icon64/skill0003.png">
            <span class="item-name__content">Power Strike</span></a></td></tr></table>"#;
        let listing = SkillListing {
            base_url: "https://wiki.mw2.wiki".into(),
            chronicle: "lu4".into(),
        };
        let page = listing.parse_page(&Html::parse_document(html)).unwrap();
        assert_eq!(page.entries, vec![entry()]);

        let empty = r#"<table><tr><td class="text-center">Table is empty</td></tr></table>"#;
        let page = listing.parse_page(&Html::parse_document(empty)).unwrap();
        assert!(page.exhausted);
    }

    #[test]
    fn main_page_requires_title() {
        assert!(parse_main(&Html::parse_document("<p>429</p>"), &entry()).is_err());

        let main = parse_main(&Html::parse_document(MAIN), &entry()).unwrap();
        assert_eq!(main.icon_src, "/icon64/skill0003.png");
        assert_eq!(main.level, "Lv. 1");
        assert_eq!(main.description, "Gathers power for a fierce strike.");
    }

    #[test]
    fn levels_from_table_or_single_page() {
        let doc = Html::parse_document(MAIN);
        let main = parse_main(&doc, &entry()).unwrap();
        let links = level_links(&doc, &main, &entry().skill_link);
        assert_eq!(links.len(), 2);
        assert_eq!(links[1].level, Some(2));
        assert_eq!(links[1].link, "https://wiki.mw2.wiki/skill/3-power-strike/lu4?level=2");
        assert_eq!(links[1].description, "Power 27");

        let single = Html::parse_document(r#"<div id="result-title"><span class="item-name__additional">Lv. 4</span></div>"#);
        let main = parse_main(&single, &entry()).unwrap();
        let links = level_links(&single, &main, &entry().skill_link);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].level, Some(4));
        assert_eq!(links[0].link, entry().skill_link);
    }

    #[test]
    fn level_properties() {
        let props = parse_level_props(&Html::parse_document(LEVEL));
        assert_eq!(props["type"], json!("Physical"));
        assert_eq!(props["uses"], json!(12));
        assert_eq!(
            props["uses_extra"],
            json!([{"item_id": 1785, "item_name": "Soul Ore", "item_count": 2}])
        );
        assert_eq!(props["cooldown_time"], json!(13));
        assert_eq!(props["can_it_be_used_at_the_olympiad"], json!(true));
        assert_eq!(props["trait"], json!("sword"));
        assert_eq!(props["range_min"], json!(40));
        assert_eq!(props["range_max"], json!(400));
        assert!(!props.contains_key("range_of_use"));
        assert_eq!(
            props["available_for"],
            json!([{"class": "Warrior", "level": 20}, {"class": "Gladiator", "level": null}])
        );
    }

    #[test]
    fn record_cleans_icon() {
        let main = parse_main(&Html::parse_document(MAIN), &entry()).unwrap();
        let level = SkillLevelLink {
            level: Some(1),
            link: entry().skill_link,
            description: "Power 25".into(),
        };
        let record = level_record(&entry(), &main, &level, Map::new());
        assert_eq!(record.skill_id, Some(3));
        assert_eq!(record.skill_icon, "skill0003");
        assert_eq!(record.skill_level, Some(1));
    }
}
