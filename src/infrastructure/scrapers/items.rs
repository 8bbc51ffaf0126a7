use super::html::{absolute_url, attr, css, label_cell, text, text_lines, text_sep};
use super::text::{
    clean_number, entity_id, icon_basename, level_of, snake_case, strip_grade_suffix, strip_level,
};
use super::{ListingPage, ListingParser};
use crate::domain::{
    AugmentationItem, ContainedItem, CrystalMaterial, CrystalRow, DescriptionBlock,
    DescriptionEffect, ItemDetails, ItemDrop, ItemListEntry, ItemRecipe, ItemSet, ItemSkill,
    QuestReference, SoulCrystal,
};
use crate::error::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;

static RECIPES_LABEL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)Recipes").unwrap());
static SKILLS_LABEL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)Item skills").unwrap());
static SOUL_CRYSTALS_LABEL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)Soul Crystals").unwrap());
static SET_LABEL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)Set part").unwrap());

static RECIPE_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^Recipe:\s*").unwrap());
static PERCENT_IN_PARENS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(\d+%?\)").unwrap());
static CHANCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\((\d+)%\)").unwrap());
static GRADE_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(NG|D|C|B|A|S)\b$").unwrap());
static SKILL_GRADE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\(Grade\s+[A-D|S\d+]*\)").unwrap());
static FIRST_INT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)").unwrap());
static SHIELD_PERCENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(([\d.,]+)%\)").unwrap());
static EFFECT_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(.*?):\s*(.*)$").unwrap());
static AMOUNT_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\d\- ]").unwrap());
static CONTAINED_CHANCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(([\d.,]+)\)").unwrap());
static PIECES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\(([\d,.]+)\s*pcs\)").unwrap());
static SET_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)[\-–]\s*Set").unwrap());
static SET_GRADE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s*\b(NG|D|C|B|A|S)\b$").unwrap());
static SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Stat labels whose column name is not their snake_case form.
const STAT_NAMES: &[(&str, &str)] = &[
    ("Шанс Физ. Крит. Атк.", "chance_of_phys_crit_atk"),
    ("Chance of Phys. Crit. Atk.", "chance_of_phys_crit_atk"),
    ("P. Atk.", "p_atk"),
    ("M. Atk.", "m_atk"),
    ("P.Def.", "p_def"),
    ("M.Def.", "m_def"),
    ("Crit. Rate", "crit_rate"),
    ("Accuracy", "accuracy"),
    ("Evasion", "evasion"),
    ("Shield Def.", "shield_defence"),
    ("Shield Rate", "shield_rate"),
    ("MP Consumption", "mp_consume"),
    ("Soul/Spiritshot Consumption", "soul_spirit_shots_consumption"),
    ("Selling price NPC", "selling_price_npc"),
    ("Weight", "weight"),
];

/// Stat keys that are parsed into their own columns instead.
const RESERVED_STATS: &[&str] = &[
    "item_skills",
    "recipes",
    "restrictions",
    "soul_crystals",
    "item_set",
    "set_part",
    "chronicle",
    "link",
];

pub struct ItemListing {
    pub base_url: String,
    pub chronicle: String,
}

impl ListingParser for ItemListing {
    type Entry = ItemListEntry;

    fn parse_page(&self, document: &Html) -> Result<ListingPage<ItemListEntry>> {
        if let Some(cell) = document
            .select(css!("table.table tbody tr td.text-center"))
            .next()
        {
            if text(cell).contains("Empty") {
                return Ok(ListingPage::exhausted());
            }
        }

        let entries = document
            .select(css!("table.table tbody tr"))
            .filter_map(|row| row.select(css!("a.item-name")).next())
            .map(|link| {
                let href = attr(link, "href");
                let grade = first(link, css!(".item-grade")).map(text).unwrap_or_default();
                let name = first(link, css!(".item-name__content"))
                    .map(|n| strip_grade_suffix(&text(n), &grade))
                    .unwrap_or_default();
                let icon = first(link, css!("img"))
                    .map(|img| icon_basename(&attr(img, "src")))
                    .unwrap_or_default();

                ItemListEntry {
                    id: entity_id(&href, "item")
                        .map(|id| id.to_string())
                        .unwrap_or_default(),
                    name,
                    icon,
                    grade,
                    link: absolute_url(&self.base_url, &href),
                    chronicle: self.chronicle.clone(),
                }
            })
            .collect();

        Ok(ListingPage::new(entries))
    }
}

fn first<'a>(el: ElementRef<'a>, selector: &scraper::Selector) -> Option<ElementRef<'a>> {
    el.select(selector).next()
}

fn icon_of(el: ElementRef<'_>) -> Option<String> {
    first(el, css!("img")).map(|img| icon_basename(&attr(img, "src")))
}

fn grade_of(el: ElementRef<'_>) -> Option<String> {
    first(el, css!(".item-grade")).map(text)
}

fn content_of(el: ElementRef<'_>) -> Option<String> {
    first(el, css!(".item-name__content")).map(|c| text_sep(c, " "))
}

pub fn parse_details(document: &Html, entry: &ItemListEntry) -> Result<ItemDetails> {
    let root = document.root_element();

    let item_grade = document
        .select(css!("#result-title .item-grade"))
        .next()
        .map(text);
    let item_name = document
        .select(css!("#result-title .item-name__content"))
        .next()
        .map(|n| strip_grade_suffix(&text(n), item_grade.as_deref().unwrap_or_default()));
    let item_icon = document
        .select(css!("#result-title .item-icon img"))
        .next()
        .map(|img| attr(img, "src"))
        .filter(|src| !src.is_empty())
        .map(|src| icon_basename(&src));
    let chronicle = document
        .select(css!("#server-tabs .nav-link.active"))
        .next()
        .map(text)
        .filter(|c| !c.is_empty())
        .or_else(|| Some(entry.chronicle.clone()).filter(|c| !c.is_empty()));

    let (item_description, item_description_json) = parse_description(document);

    Ok(ItemDetails {
        item_id: entry.id.clone(),
        item_name,
        item_grade,
        item_icon,
        item_description,
        item_description_json,
        item_skills: parse_item_skills(root),
        item_set: parse_sets(root),
        chronicle,
        stats: parse_stats(document),
        recipes: parse_recipes(root),
        link: entry.link.clone(),
        restrictions: parse_restrictions(document),
        drops: parse_drops(document),
        quest_rewards: parse_quest_table(document, css!("#questreward table tbody tr")),
        quest_goal: parse_quest_table(document, css!("#questGoal table tbody tr")),
        contained: parse_contained(document),
        crystals: parse_crystals(document),
        soul_crystals: parse_soul_crystals(root),
    })
}

fn stat_key(label: &str) -> String {
    STAT_NAMES
        .iter()
        .find(|(l, _)| *l == label)
        .map(|(_, key)| key.to_string())
        .unwrap_or_else(|| snake_case(label))
}

fn positive_or_null(n: i64) -> Value {
    if n > 0 {
        Value::from(n)
    } else {
        Value::Null
    }
}

fn parse_stats(document: &Html) -> Map<String, Value> {
    let mut stats = Map::new();

    for tr in document.select(css!("#result-stats table tr")) {
        let cells: Vec<_> = tr.select(css!("td")).collect();
        let [label, value] = cells.as_slice() else {
            continue;
        };

        let key = stat_key(&text(*label));
        let raw = text_sep(*value, " ");

        match key.as_str() {
            k if RESERVED_STATS.contains(&k) => {}
            "soul_spirit_shots_consumption" => {
                let parts: Vec<Option<i64>> =
                    raw.split('/').map(|p| p.trim().parse().ok()).collect();
                let (soul, spirit) = match parts.as_slice() {
                    [Some(soul), Some(spirit)] => (positive_or_null(*soul), positive_or_null(*spirit)),
                    _ => (Value::Null, Value::Null),
                };
                stats.insert("soulshot_consumption".into(), soul);
                stats.insert("spiritshot_consumption".into(), spirit);
            }
            "shield_defence" => {
                if let Some(n) = FIRST_INT
                    .captures(&raw)
                    .and_then(|c| c[1].parse::<i64>().ok())
                {
                    stats.insert("shield_defence_value".into(), n.into());
                }
                let percent = SHIELD_PERCENT
                    .captures(&raw)
                    .and_then(|c| c[1].replace(',', ".").parse::<f64>().ok())
                    .map(|p| Value::from(p.trunc() as i64))
                    .unwrap_or(Value::Null);
                stats.insert("shield_defence_percent".into(), percent);
            }
            _ => {
                let value = clean_number(&raw)
                    .map(Value::Number)
                    .unwrap_or_else(|| Value::String(raw));
                stats.insert(key, value);
            }
        }
    }

    let type_text = stats.get("type").and_then(Value::as_str).map(str::to_string);
    let (main, sub) = match type_text {
        Some(t) => {
            let mut parts = t.split('/').map(str::trim);
            (
                parts.next().map(str::to_string),
                parts.next().map(|s| s.trim_matches(['{', '}']).to_lowercase()),
            )
        }
        None => (None, None),
    };
    stats.insert("type".into(), main.map(Value::String).unwrap_or(Value::Null));
    stats.insert("subtype".into(), sub.map(Value::String).unwrap_or(Value::Null));

    stats
}

fn parse_recipes(root: ElementRef<'_>) -> Vec<ItemRecipe> {
    let Some(cell) = label_cell(root, &RECIPES_LABEL) else {
        return Vec::new();
    };

    cell.select(css!("a.item-name"))
        .map(|link| {
            let href = attr(link, "href");
            let recipe_name = content_of(link).map(|raw| {
                let name = RECIPE_PREFIX.replace(&raw, "");
                let name = PERCENT_IN_PARENS.replace_all(&name, "");
                GRADE_WORD.replace(name.trim(), "").trim().to_string()
            });
            let all_text: String = link.text().collect();

            ItemRecipe {
                recipe_id: entity_id(&href, "item"),
                recipe_name,
                recipe_icon: icon_of(link),
                recipe_grade: grade_of(link),
                recipe_chance: CHANCE.captures(&all_text).and_then(|c| c[1].parse().ok()),
                recipe_link: href,
            }
        })
        .collect()
}

fn parse_item_skills(root: ElementRef<'_>) -> Vec<ItemSkill> {
    let Some(cell) = label_cell(root, &SKILLS_LABEL) else {
        return Vec::new();
    };

    cell.select(css!("a.item-name"))
        .map(|link| {
            let href = attr(link, "href");
            let full = content_of(link).unwrap_or_default();
            let level = level_of(&full);
            let name = SKILL_GRADE
                .replace_all(&strip_level(&full), "")
                .trim()
                .to_string();

            ItemSkill {
                id: entity_id(&href, "skill"),
                name,
                icon: icon_of(link),
                level,
                link: href,
            }
        })
        .collect()
}

/// Effects listed after the first `<Header>` line, gathered into a single
/// block labelled with the last header seen.
fn parse_description(document: &Html) -> (Option<String>, Vec<DescriptionBlock>) {
    let Some(p) = document
        .select(css!("#result-title div[style*='margin-left'] p"))
        .next()
    else {
        return (None, Vec::new());
    };

    let lines = text_lines(p);
    let description = Some(lines.join("\n")).filter(|d| !d.is_empty());

    let mut stat_type: Option<String> = None;
    let mut list = Vec::new();
    for line in &lines {
        if line.starts_with('<') && line.ends_with('>') {
            stat_type = Some(line.trim_matches(['<', '>']).trim().to_string());
            continue;
        }
        if stat_type.is_none() {
            continue;
        }

        let (kind, desc) = match EFFECT_LINE.captures(line) {
            Some(c) => (Some(c[1].trim().to_string()), c[2].trim().to_string()),
            None => (None, line.clone()),
        };
        if desc.is_empty() || desc.to_lowercase().starts_with("<font") {
            continue;
        }
        list.push(DescriptionEffect {
            kind,
            description: desc,
        });
    }

    let blocks = match stat_type {
        Some(stat_type) if !list.is_empty() => vec![DescriptionBlock { stat_type, list }],
        _ => Vec::new(),
    };
    (description, blocks)
}

fn parse_restrictions(document: &Html) -> BTreeMap<String, bool> {
    let row = document
        .select(css!("#result-stats table tr"))
        .find(|tr| {
            tr.select(css!("td"))
                .next()
                .is_some_and(|td| td.text().collect::<String>().contains("Restrictions"))
        });

    let mut restrictions = BTreeMap::new();
    if let Some(row) = row {
        for span in row.select(css!("td span")) {
            let label = text(span);
            if label.is_empty() {
                continue;
            }
            let allowed = span.select(css!(".fa-check")).next().is_some();
            restrictions.insert(snake_case(&label), allowed);
        }
    }
    restrictions
}

fn parse_drops(document: &Html) -> Vec<ItemDrop> {
    document
        .select(css!("#drop table tbody tr"))
        .filter_map(|tr| {
            let cells: Vec<_> = tr.select(css!("td")).collect();
            let [npc, amount, chance] = cells.as_slice() else {
                return None;
            };

            let npc_link = first(*npc, css!("a.item-name")).map(|a| attr(a, "href"));
            let npc_level = first(*npc, css!(".item-name__additional"))
                .and_then(|lvl| level_of(&text(lvl)));
            let amount = AMOUNT_CHARS
                .replace_all(&text(*amount), "")
                .trim()
                .to_string();

            Some(ItemDrop {
                npc_id: npc_link.as_deref().and_then(|l| entity_id(l, "npc")),
                npc_name: content_of(*npc).map(|n| strip_level(&n)),
                npc_level,
                npc_link,
                amount: Some(amount).filter(|a| !a.is_empty()),
                chance: clean_number(&text(*chance).replace('%', "")),
            })
        })
        .collect()
}

fn parse_crystals(document: &Html) -> Vec<CrystalRow> {
    document
        .select(css!("#crystals table tbody tr"))
        .filter_map(|tr| {
            let cells: Vec<_> = tr.select(css!("td")).collect();
            let [modification, crystallization, fail] = cells.as_slice() else {
                return None;
            };
            Some(CrystalRow {
                modification: clean_number(&text(*modification)),
                crystallization: clean_number(&text(*crystallization)),
                fail: clean_number(&text(*fail)),
            })
        })
        .collect()
}

fn level_bounds(text: &str) -> (Option<Number>, Option<Number>) {
    if text.contains('~') {
        let parts: Vec<_> = text.split('~').map(str::trim).collect();
        match parts.as_slice() {
            [min, max] => (clean_number(min), clean_number(max)),
            _ => (None, None),
        }
    } else {
        (clean_number(text), None)
    }
}

fn parse_quest_table(document: &Html, rows: &scraper::Selector) -> Vec<QuestReference> {
    document
        .select(rows)
        .filter_map(|tr| {
            let cells: Vec<_> = tr.select(css!("td")).collect();
            let [quest, level] = cells.as_slice() else {
                return None;
            };
            let quest_link = first(*quest, css!("a.item-name")).map(|a| attr(a, "href"));
            let (level_min, level_max) = level_bounds(&text(*level));

            Some(QuestReference {
                quest_id: quest_link.as_deref().and_then(|l| entity_id(l, "quest")),
                quest_name: text_sep(*quest, " "),
                quest_link,
                level_min,
                level_max,
            })
        })
        .collect()
}

fn parse_contained(document: &Html) -> Vec<ContainedItem> {
    document
        .select(css!("#contained table tbody tr"))
        .filter_map(|tr| tr.select(css!("td")).next())
        .map(|td| {
            let link = first(td, css!("a.item-name"));
            let href = link.map(|a| attr(a, "href"));
            let grade = link.and_then(grade_of);
            let name = link
                .and_then(content_of)
                .map(|n| strip_grade_suffix(&n, grade.as_deref().unwrap_or_default()));
            let all_text: String = td.text().collect();

            ContainedItem {
                id: href.as_deref().and_then(|h| entity_id(h, "item")),
                name,
                grade,
                icon: icon_of(td),
                chance: CONTAINED_CHANCE
                    .captures(&all_text)
                    .and_then(|c| clean_number(&c[1])),
                link: href,
            }
        })
        .collect()
}

fn parse_soul_crystals(root: ElementRef<'_>) -> Vec<SoulCrystal> {
    let Some(cell) = label_cell(root, &SOUL_CRYSTALS_LABEL) else {
        return Vec::new();
    };

    let mut crystals = Vec::new();
    for collapser in cell.select(css!("div.collapser")) {
        let blocks: Vec<_> = collapser
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|e| e.value().name() == "div")
            .collect();

        let mut i = 0;
        while i < blocks.len() {
            let block = blocks[i];
            i += 1;
            let Some(main) = first(block, css!("a.item-name")) else {
                continue;
            };

            // Materials follow their augmentation item in a margin-styled div.
            let materials = match blocks.get(i) {
                Some(next) if attr(*next, "style").contains("margin") => {
                    i += 1;
                    parse_materials(*next)
                }
                _ => Vec::new(),
            };

            let href = attr(main, "href");
            crystals.push(SoulCrystal {
                augmentation_item: AugmentationItem {
                    id: entity_id(&href, "item"),
                    name: content_of(main),
                    icon: icon_of(main),
                    link: href,
                    effect: first(main, css!(".item-name__additional")).map(text),
                    grade: grade_of(main),
                },
                materials,
            });
        }
    }
    crystals
}

fn parse_materials(container: ElementRef<'_>) -> Vec<CrystalMaterial> {
    container
        .select(css!("a.item-name"))
        .map(|link| {
            let href = attr(link, "href");
            let raw_name = content_of(link);
            let amount = raw_name.as_deref().and_then(|n| {
                PIECES
                    .captures(n)
                    .and_then(|c| c[1].replace([',', '.'], "").parse().ok())
            });

            CrystalMaterial {
                id: entity_id(&href, "item"),
                name: raw_name.map(|n| PIECES.replace(&n, "").trim().to_string()),
                icon: icon_of(link),
                link: href,
                grade: grade_of(link),
                amount,
            }
        })
        .collect()
}

fn parse_sets(root: ElementRef<'_>) -> Vec<ItemSet> {
    let Some(cell) = label_cell(root, &SET_LABEL) else {
        return Vec::new();
    };

    cell.select(css!("a.item-name"))
        .map(|link| {
            let href = attr(link, "href");
            let raw_name = content_of(link);
            let pvp = raw_name.as_deref().is_some_and(|n| n.contains("{PvP}"));
            let set_name = raw_name.map(|n| {
                let name = n.replace("{PvP}", "");
                let name = SET_SUFFIX.replace_all(&name, "");
                let name = SET_GRADE.replace(&name, "");
                SPACES.replace_all(&name, " ").trim().to_string()
            });

            ItemSet {
                set_id: entity_id(&href, "set"),
                set_name,
                set_icon: icon_of(link),
                set_grade: grade_of(link),
                set_class: first(link, css!(".item-class")).map(text),
                set_full_link: href,
                pvp,
            }
        })
        .filter(|set| !set.is_blank())
        .collect()
}
