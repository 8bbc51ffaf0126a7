use super::html::{absolute_url, attr, css, first_text, own_text, style_offset, text};
use super::text::{entity_id, normalize_value, snake_case};
use super::{ListingPage, ListingParser};
use crate::domain::{NpcDetails, NpcDrop, NpcListEntry, NpcSkill, SpawnPoint};
use crate::error::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html};
use serde_json::{Map, Value};

static DETAIL_TAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/npc/(\d+-[^/]+)/[^/]+/?$").unwrap());
static GROUP_CHANCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Group chance:\s*([\d\.]+)%").unwrap());
static DEFENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"([A-Za-z]+)[^\d]*(\d+)").unwrap());
static PNG_STEM: Lazy<Regex> = Lazy::new(|| Regex::new(r"/([^/]+)\.png").unwrap());
static ITEM_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"/item/(\d+)").unwrap());
static SKILL_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"/skill/(\d+)").unwrap());

pub struct NpcListing {
    pub base_url: String,
}

impl ListingParser for NpcListing {
    type Entry = NpcListEntry;

    fn parse_page(&self, document: &Html) -> Result<ListingPage<NpcListEntry>> {
        let entries = document
            .select(css!("table.table-vcenter tbody tr"))
            .filter_map(|row| {
                let link = row.select(css!("a")).next()?;
                let name = row.select(css!(".item-name__content")).next()?;
                let level = row.select(css!(".item-name__additional")).next()?;

                Some(NpcListEntry {
                    name: first_text(name).unwrap_or_default(),
                    level: text(level).replace("Lv.", "").trim().parse().unwrap_or(0),
                    url: absolute_url(&self.base_url, &attr(link, "href")),
                })
            })
            .collect();

        let mut page = ListingPage::new(entries);
        page.has_next = Some(
            document
                .select(css!("ul.pagination li.next a"))
                .next()
                .is_some(),
        );
        Ok(page)
    }
}

/// Listing link rewritten to the chronicle being scraped.
pub fn detail_url(list_url: &str, chronicle: &str) -> String {
    DETAIL_TAIL
        .replace(list_url, format!("/npc/${{1}}/{chronicle}"))
        .into_owned()
}

pub fn parse_details(
    document: &Html,
    entry: &NpcListEntry,
    url: &str,
    chronicle: &str,
) -> Result<NpcDetails> {
    let title_div = document.select(css!("#result-title")).next();
    let title = title_div
        .map(text)
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| entry.name.clone());
    let icon_url = title_div
        .and_then(|t| t.select(css!("img")).next())
        .map(|img| attr(img, "src"))
        .filter(|src| !src.is_empty())
        .map(|src| absolute_url(url, &src))
        .unwrap_or_default();

    let (map_image, spawn_points) = parse_map(document, url);

    Ok(NpcDetails {
        npc_id: entity_id(url, "npc"),
        chronicle: chronicle.to_string(),
        name: entry.name.clone(),
        url: url.to_string(),
        title,
        icon_url,
        stats: parse_stats(document),
        drops: table(document, css!("#drop table"))
            .map(|t| parse_drop_table(t, url))
            .unwrap_or_default(),
        spoils: table(document, css!("#spoil table"))
            .map(|t| parse_drop_table(t, url))
            .unwrap_or_default(),
        skills: table(document, css!("#skills table"))
            .map(|t| parse_skills(t, url))
            .unwrap_or_default(),
        map_image,
        spawn_points,
    })
}

fn table<'a>(document: &'a Html, selector: &scraper::Selector) -> Option<ElementRef<'a>> {
    document.select(selector).next()
}

fn parse_stats(document: &Html) -> Map<String, Value> {
    let mut stats = Map::new();
    let Some(table) = table(document, css!("#result-stats table")) else {
        return stats;
    };

    for tr in table.select(css!("tr")) {
        let cells: Vec<_> = tr.select(css!("td")).collect();
        for pair in cells.chunks_exact(2) {
            stats.insert(snake_case(&text(pair[0])), normalize_value(&text(pair[1])));
        }
    }

    let defence = stats
        .get("defence_attribute")
        .and_then(Value::as_str)
        .map(str::to_string);
    if let Some(defence) = defence {
        for c in DEFENCE.captures_iter(&defence) {
            if let Ok(value) = c[2].parse::<i64>() {
                stats.insert(snake_case(&format!("def_{}", &c[1])), value.into());
            }
        }
    }

    stats
}

fn png_stem(src: &str) -> Option<String> {
    PNG_STEM.captures(src).map(|c| c[1].to_string())
}

fn parse_drop_table(table: ElementRef<'_>, base: &str) -> Vec<NpcDrop> {
    let mut drops = Vec::new();
    let mut group_chance = None;

    for tr in table.select(css!("tbody tr")) {
        let row_text: String = tr.text().collect();
        if row_text.contains("Group chance") {
            group_chance = GROUP_CHANCE
                .captures(&row_text)
                .and_then(|c| c[1].parse::<f64>().ok());
            continue;
        }

        let Some(link) = tr.select(css!("a.item-name")).next() else {
            continue;
        };

        let grade = link
            .select(css!(".item-grade"))
            .next()
            .map(text)
            .unwrap_or_default();
        let name = link
            .select(css!(".item-name__content"))
            .next()
            .map(own_text)
            .map(|n| {
                n.split_whitespace()
                    .filter(|word| grade.is_empty() || *word != grade)
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .unwrap_or_default();
        let url = absolute_url(base, &attr(link, "href"));
        let icon = link
            .select(css!("img"))
            .next()
            .and_then(|img| png_stem(&attr(img, "src")));
        let cell_value = |selector: &scraper::Selector| {
            tr.select(selector)
                .next()
                .map(|td| normalize_value(&text(td)))
                .unwrap_or(Value::Null)
        };

        drops.push(NpcDrop {
            id: ITEM_ID.captures(&url).map(|c| c[1].to_string()),
            name,
            grade,
            icon,
            amount: cell_value(css!("td.text-center")),
            chance_percent: cell_value(css!("td.text-end")),
            group_chance_percent: group_chance,
            url,
        });
    }

    drops
}

fn parse_skills(table: ElementRef<'_>, base: &str) -> Vec<NpcSkill> {
    table
        .select(css!("tbody tr"))
        .filter_map(|tr| tr.select(css!("a.item-name")).next())
        .map(|link| {
            let name = match link.select(css!(".item-name__content")).next() {
                Some(content) => own_text(content),
                None => text(link),
            };
            let url = absolute_url(base, &attr(link, "href"));
            let icon = link
                .select(css!("img"))
                .next()
                .and_then(|img| png_stem(&attr(img, "src")));

            NpcSkill {
                id: SKILL_ID.captures(&url).map(|c| c[1].to_string()),
                name,
                url,
                icon,
            }
        })
        .collect()
}

fn parse_map(document: &Html, base: &str) -> (String, Vec<SpawnPoint>) {
    let map_image = document
        .select(css!("#map img#bg"))
        .next()
        .map(|img| absolute_url(base, &attr(img, "src")))
        .unwrap_or_default();

    let points = document
        .select(css!("#map .spawn-point"))
        .filter_map(|span| style_offset(&attr(span, "style")))
        .map(|(top, left)| SpawnPoint { top, left })
        .collect();

    (map_image, points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const BASE: &str = "https://wiki.mw2.wiki";

    const DETAILS: &str = r#"
        <div id="result-title"><img src="/img/npc/gremlin.png">Gremlin</div>
        <div id="result-stats"><table>
          <tr><td>Level</td><td>1</td><td>Type</td><td>Monster</td></tr>
          <tr><td>HP</td><td>2,444</td><td>Exp.</td><td>29.5</td></tr>
          <tr><td>Defence attribute</td><td>Fire 20, Water 35</td></tr>
        </table></div>
        <div id="drop"><table><tbody>
          <tr><td colspan="3">Group chance: 70.5%</td></tr>
          <tr><td><a class="item-name" href="/item/57-adena/lu4"><img src="/img/etc_adena_i00.png">
            <span class="item-name__content">Adena<span class="item-grade">NG</span></span></a></td>
            <td class="text-center">10-20</td><td class="text-end">70%</td></tr>
        </tbody></table></div>
        <div id="spoil"><table><tbody>
          <tr><td><a class="item-name" href="/item/1864-stem/lu4"><span class="item-name__content">Stem D</span>
            <span class="item-grade">D</span></a></td>
            <td class="text-center">1</td><td class="text-end">12.5%</td></tr>
        </tbody></table></div>
        <div id="skills"><table><tbody>
          <tr><td><a class="item-name" href="/skill/4416-race/lu4"><img src="/icon64/skill4416.png">
            <span class="item-name__content">Race <span>Lv. 1</span></span></a></td></tr>
        </tbody></table></div>
        <div id="map"><img id="bg" src="/img/map.jpg">
          <span class="spawn-point" style="top: 10.5px; left: 20px"></span>
          <span class="spawn-point" style="top: 30px; left: 40.25px"></span>
        </div>"#;

    fn entry() -> NpcListEntry {
        NpcListEntry {
            name: "Gremlin".into(),
            level: 1,
            url: "https://wiki.mw2.wiki/npc/20001-gremlin/interlude".into(),
        }
    }

    #[test]
    fn listing_reads_rows_and_next_link() {
        let html = r#"
            <table class="table-vcenter"><tbody>
              <tr><td><a href="/npc/20001-gremlin/lu4"><span class="item-name__content">Gremlin<span>x</span></span>
                <span class="item-name__additional">Lv. 1</span></a></td></tr>
              <tr><td>broken</td></tr>
            </tbody></table>
            <ul class="pagination"><li class="next"><a href="?page=2">»</a></li></ul>"#;
        let listing = NpcListing {
            base_url: BASE.into(),
        };
        let page = listing.parse_page(&Html::parse_document(html)).unwrap();
        assert_eq!(
            page.entries,
            vec![NpcListEntry {
                name: "Gremlin".into(),
                level: 1,
                url: "https://wiki.mw2.wiki/npc/20001-gremlin/lu4".into(),
            }]
        );
        assert_eq!(page.has_next, Some(true));
        assert!(!page.is_last());
    }

    #[test]
    fn listing_without_next_link_is_last() {
        let html = r#"<table class="table-vcenter"><tbody>
            <tr><td><a href="/npc/1-a/lu4"><span class="item-name__content">A</span>
            <span class="item-name__additional">Lv. 5</span></a></td></tr></tbody></table>"#;
        let listing = NpcListing {
            base_url: BASE.into(),
        };
        let page = listing.parse_page(&Html::parse_document(html)).unwrap();
        assert_eq!(page.entries[0].level, 5);
        assert!(page.is_last());
    }

    #[test]
    fn detail_url_swaps_chronicle() {
        assert_eq!(
            detail_url("https://wiki.mw2.wiki/npc/20001-gremlin/interlude", "lu4"),
            "https://wiki.mw2.wiki/npc/20001-gremlin/lu4"
        );
        assert_eq!(
            detail_url("https://wiki.mw2.wiki/npc/20001-gremlin/interlude/", "lu4"),
            "https://wiki.mw2.wiki/npc/20001-gremlin/lu4"
        );
    }

    #[test]
    fn details_stats_and_defence() {
        let url = detail_url(&entry().url, "lu4");
        let npc = parse_details(&Html::parse_document(DETAILS), &entry(), &url, "lu4").unwrap();
        assert_eq!(npc.npc_id, Some(20001));
        assert_eq!(npc.title, "Gremlin");
        assert_eq!(npc.icon_url, "https://wiki.mw2.wiki/img/npc/gremlin.png");
        assert_eq!(npc.stats["level"], json!(1));
        assert_eq!(npc.stats["type"], json!("Monster"));
        assert_eq!(npc.stats["hp"], json!(2444));
        assert_eq!(npc.stats["exp"], json!(29.5));
        assert_eq!(npc.stats["def_fire"], json!(20));
        assert_eq!(npc.stats["def_water"], json!(35));
    }

    #[test]
    fn details_drop_spoil_and_skills() {
        let url = detail_url(&entry().url, "lu4");
        let npc = parse_details(&Html::parse_document(DETAILS), &entry(), &url, "lu4").unwrap();

        let adena = &npc.drops[0];
        assert_eq!(npc.drops.len(), 1);
        assert_eq!(adena.id.as_deref(), Some("57"));
        assert_eq!(adena.name, "Adena");
        assert_eq!(adena.grade, "NG");
        assert_eq!(adena.icon.as_deref(), Some("etc_adena_i00"));
        assert_eq!(adena.amount, json!("10-20"));
        assert_eq!(adena.chance_percent, json!(70));
        assert_eq!(adena.group_chance_percent, Some(70.5));

        let stem = &npc.spoils[0];
        assert_eq!(stem.name, "Stem");
        assert_eq!(stem.chance_percent, json!(12.5));
        assert_eq!(stem.group_chance_percent, None);

        assert_eq!(npc.skills[0].id.as_deref(), Some("4416"));
        assert_eq!(npc.skills[0].name, "Race");
        assert_eq!(npc.skills[0].icon.as_deref(), Some("skill4416"));
    }

    #[test]
    fn details_map() {
        let url = detail_url(&entry().url, "lu4");
        let npc = parse_details(&Html::parse_document(DETAILS), &entry(), &url, "lu4").unwrap();
        assert_eq!(npc.map_image, "https://wiki.mw2.wiki/img/map.jpg");
        assert_eq!(
            npc.spawn_points,
            vec![
                SpawnPoint { top: 10.5, left: 20.0 },
                SpawnPoint { top: 30.0, left: 40.25 },
            ]
        );
    }
}
