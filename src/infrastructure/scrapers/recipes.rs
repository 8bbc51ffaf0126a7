use super::html::{absolute_url, attr, br_lines, css, text, text_excluding, text_sep};
use super::text::{entity_id, icon_basename, level_of, strip_grade_suffix};
use super::{ListingPage, ListingParser};
use crate::domain::{
    CraftDetails, DropNpc, RecipeDetails, RecipeDrop, RecipeListEntry, RequiredItem,
};
use crate::error::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html};
use std::collections::BTreeMap;

static NON_DIGIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\d]").unwrap());
static RESTRICTION_KEY: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-zA-Z0-9]+").unwrap());
static RESULT_QUANTITY: Lazy<Regex> = Lazy::new(|| Regex::new(r"x(\d+)").unwrap());

pub struct RecipeListing {
    pub base_url: String,
}

impl ListingParser for RecipeListing {
    type Entry = RecipeListEntry;

    fn parse_page(&self, document: &Html) -> Result<ListingPage<RecipeListEntry>> {
        let entries = document
            .select(css!("table.table tbody tr"))
            .filter_map(|row| {
                let link = row.select(css!("a.item-name")).next()?;
                let href = attr(link, "href");

                Some(RecipeListEntry {
                    icon: row
                        .select(css!("img"))
                        .next()
                        .map(|img| icon_basename(&attr(img, "src")))
                        .unwrap_or_default(),
                    name: row
                        .select(css!(".item-name__content"))
                        .next()
                        .map(|n| text_excluding(n, "item-grade", ""))
                        .unwrap_or_default(),
                    id: id_of(&href),
                    grade: grade_of(row),
                    link: absolute_url(&self.base_url, &href),
                })
            })
            .collect();

        Ok(ListingPage::new(entries))
    }
}

fn id_of(href: &str) -> String {
    entity_id(href, "item")
        .map(|id| id.to_string())
        .unwrap_or_default()
}

fn grade_of(el: ElementRef<'_>) -> String {
    el.select(css!(".item-grade"))
        .next()
        .map(text)
        .unwrap_or_default()
}

fn first_cell<'a>(tr: ElementRef<'a>) -> Option<ElementRef<'a>> {
    tr.select(css!("td")).next()
}

fn last_cell<'a>(tr: ElementRef<'a>) -> Option<ElementRef<'a>> {
    tr.select(css!("td")).last()
}

/// Tables placed after the `h5` heading containing `title`, up to the next `h5`.
fn tables_after<'a>(document: &'a Html, title: &str) -> Vec<ElementRef<'a>> {
    let Some(heading) = document
        .select(css!("h5"))
        .find(|h| text(*h).contains(title))
    else {
        return Vec::new();
    };

    heading
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .take_while(|e| e.value().name() != "h5")
        .filter(|e| e.value().name() == "table")
        .collect()
}

pub fn parse_details(document: &Html, entry: &RecipeListEntry) -> Result<RecipeDetails> {
    let grade = document
        .select(css!("#result-title .item-grade"))
        .next()
        .map(text)
        .unwrap_or_default();
    let name = document
        .select(css!("#result-title .item-name__content"))
        .next()
        .map(|n| strip_grade_suffix(&text_excluding(n, "item-grade", ""), &grade))
        .unwrap_or_default();
    let description = document
        .select(css!("#result-title p"))
        .next()
        .map(br_lines)
        .unwrap_or_default();

    let mut details = RecipeDetails {
        id: entry.id.clone(),
        name,
        grade,
        description,
        price_npc: String::new(),
        weight: String::new(),
        olympiad_usable: String::new(),
        restrictions: BTreeMap::new(),
        required_items: parse_required_items(document, &entry.link),
        craft: parse_craft(document, &entry.link),
        drop_list: parse_drops(document, css!("#drop tbody tr")),
        spoil_list: parse_drops(document, css!("#spoil tbody tr")),
    };

    for tr in document.select(css!("#result-stats table tr")) {
        let (Some(label), Some(value)) = (first_cell(tr), last_cell(tr)) else {
            continue;
        };
        let label = text(label);
        let value = text_sep(value, " ");

        if label.contains("Selling price") {
            details.price_npc = NON_DIGIT.replace_all(&value, "").into_owned();
        } else if label.contains("Weight") {
            details.weight = value;
        } else if label.contains("Olympiad") {
            details.olympiad_usable = value;
        } else if label.contains("Restrictions") {
            for span in tr.select(css!("span")) {
                let key = RESTRICTION_KEY
                    .replace_all(&text(span), "_")
                    .to_lowercase();
                let allowed = span
                    .select(css!("i"))
                    .next()
                    .is_some_and(|i| i.value().classes().any(|c| c == "fa-check"));
                details.restrictions.insert(key, allowed);
            }
        }
    }

    Ok(details)
}

fn parse_required_items(document: &Html, base: &str) -> Vec<RequiredItem> {
    tables_after(document, "Required items")
        .into_iter()
        .flat_map(|table| table.select(css!("tr")))
        .filter_map(|tr| {
            let link = tr.select(css!("a.item-name")).next()?;
            let href = attr(link, "href");
            let grade = grade_of(tr);

            Some(RequiredItem {
                id: id_of(&href),
                name: tr
                    .select(css!(".item-name__content"))
                    .next()
                    .map(|n| strip_grade_suffix(&text(n), &grade))
                    .unwrap_or_default(),
                icon: tr
                    .select(css!(".item-icon img"))
                    .next()
                    .map(|img| icon_basename(&attr(img, "src")))
                    .unwrap_or_default(),
                grade,
                quantity: tr
                    .select(css!("td.text-end"))
                    .next()
                    .map(text)
                    .unwrap_or_default(),
                link: absolute_url(base, &href),
            })
        })
        .collect()
}

fn parse_craft(document: &Html, base: &str) -> CraftDetails {
    let mut craft = CraftDetails::default();

    for tr in tables_after(document, "Details")
        .into_iter()
        .flat_map(|table| table.select(css!("tr")))
    {
        let (Some(label), Some(value)) = (first_cell(tr), last_cell(tr)) else {
            continue;
        };
        let label = text(label);

        match label.as_str() {
            "Level" => craft.craft_level = text_sep(value, " "),
            "MP Consumption" => craft.mp_consumption = text_sep(value, " "),
            "Result" => {
                if let Some(link) = value.select(css!("a.item-name")).next() {
                    let href = attr(link, "href");
                    craft.result_item_id = id_of(&href);
                    craft.result_item_link = absolute_url(base, &href);
                }
                if let Some(content) = value.select(css!(".item-name__content")).next() {
                    craft.result_item_grade = grade_of(content);
                    let name = text_excluding(content, "item-grade", " ");
                    craft.result_quantity = RESULT_QUANTITY
                        .captures(&name)
                        .map(|c| c[1].to_string())
                        .unwrap_or_default();
                    craft.result_item_name =
                        RESULT_QUANTITY.replace_all(&name, "").trim().to_string();
                }
            }
            l if l.contains("Chance") => {
                craft.chance_of_success = text_sep(value, " ").replace('%', "").trim().to_string();
            }
            _ => {}
        }
    }

    craft
}

fn parse_drops(document: &Html, rows: &scraper::Selector) -> Vec<RecipeDrop> {
    document
        .select(rows)
        .map(|tr| {
            let href = tr
                .select(css!("a.item-name"))
                .next()
                .map(|a| attr(a, "href"))
                .unwrap_or_default();
            let name = tr
                .select(css!(".item-name__content"))
                .next()
                .map(|n| {
                    let full = text_sep(n, " ");
                    full.split("Lv.").next().unwrap_or_default().trim().to_string()
                })
                .unwrap_or_default();
            let level = tr
                .select(css!(".item-name__additional"))
                .next()
                .and_then(|l| level_of(&text_sep(l, " ")));
            let cell = |selector: &scraper::Selector| {
                tr.select(selector).next().map(text).unwrap_or_default()
            };

            RecipeDrop {
                npc: DropNpc {
                    id: entity_id(&href, "npc")
                        .map(|id| id.to_string())
                        .unwrap_or_default(),
                    name,
                    level,
                },
                amount: cell(css!("td.text-center")),
                chance: cell(css!("td.text-end"))
                    .replace('%', "")
                    .trim()
                    .parse()
                    .unwrap_or(0.0),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const DETAILS: &str = r#"
        <div id="result-title">
          <span class="item-name__content">Recipe: Soulshot (B) <span class="item-grade">B</span></span>
          <p>Used to craft <b>Soulshot</b>.<br>Success rate 100%.</p>
        </div>
        <div id="result-stats"><table>
          <tr><td>Selling price NPC</td><td>1.200 Adena</td></tr>
          <tr><td>Weight</td><td>30</td></tr>
          <tr><td>Can it be used at the Olympiad?</td><td>Yes</td></tr>
          <tr><td>Restrictions</td><td>
            <span><i class="fa fa-check"></i> Drop</span>
            <span><i class="fa fa-times"></i> Private store</span></td></tr>
        </table></div>
        <div>
          <h5>Required items</h5>
          <table>
            <tr><th>Item</th><th>Qty</th></tr>
            <tr><td><a class="item-name" href="/item/1864-stem/lu4"><span class="item-icon"><img src="/img/etc_stem_i00.png"></span>
              <span class="item-name__content">Stem<span class="item-grade">NG</span></span></a></td>
              <td class="text-end">10</td></tr>
          </table>
          <h5>Details</h5>
          <table>
            <tr><td>Level</td><td>5</td></tr>
            <tr><td>MP Consumption</td><td>60</td></tr>
            <tr><td>Result</td><td><a class="item-name" href="/item/1463-soulshot-b/lu4">
              <span class="item-name__content">Soulshot: B-grade <span class="item-grade">B</span> x100</span></a></td></tr>
            <tr><td>Chance</td><td>100%</td></tr>
          </table>
        </div>
        <div id="drop"><table><tbody>
          <tr><td><a class="item-name" href="/npc/20201-orc/lu4"><span class="item-name__content">Orc
            <span class="item-name__additional">Lv. 42</span></span></a></td>
            <td class="text-center">1</td><td class="text-end">0.85%</td></tr>
        </tbody></table></div>
        <div id="spoil"><table><tbody>
          <tr><td>Group</td><td class="text-center">-</td><td class="text-end">n/a</td></tr>
        </tbody></table></div>"#;

    fn entry() -> RecipeListEntry {
        RecipeListEntry {
            icon: "etc_recipe_blue_i00".into(),
            name: "Recipe: Soulshot (B)".into(),
            id: "1804".into(),
            grade: "B".into(),
            link: "https://wiki.mw2.wiki/item/1804-recipe-soulshot-b/lu4".into(),
        }
    }

    #[test]
    fn listing_drops_grade_from_name() {
        let html = r#"<table class="table"><tbody>
            <tr><td><a class="item-name" href="/item/1804-recipe-soulshot-b/lu4">
              <img src="/img/etc_recipe_blue_i00.png">
              <span class="item-name__content">Recipe: Soulshot (B)<span class="item-grade">B</span></span></a></td></tr>
            </tbody></table>"#;
        let listing = RecipeListing {
            base_url: "https://wiki.mw2.wiki".into(),
        };
        let page = listing.parse_page(&Html::parse_document(html)).unwrap();
        assert_eq!(page.entries, vec![entry()]);
    }

    #[test]
    fn details_header_and_stats() {
        let recipe = parse_details(&Html::parse_document(DETAILS), &entry()).unwrap();
        assert_eq!(recipe.name, "Recipe: Soulshot (B)");
        assert_eq!(recipe.grade, "B");
        assert_eq!(recipe.description, ["Used to craft Soulshot.", "Success rate 100%."]);
        assert_eq!(recipe.price_npc, "1200");
        assert_eq!(recipe.weight, "30");
        assert_eq!(recipe.olympiad_usable, "Yes");
        assert_eq!(recipe.restrictions.get("drop"), Some(&true));
        assert_eq!(recipe.restrictions.get("private_store"), Some(&false));
    }

    #[test]
    fn required_items_stop_at_next_heading() {
        let recipe = parse_details(&Html::parse_document(DETAILS), &entry()).unwrap();
        assert_eq!(
            recipe.required_items,
            vec![RequiredItem {
                id: "1864".into(),
                name: "Stem".into(),
                icon: "etc_stem_i00".into(),
                grade: "NG".into(),
                quantity: "10".into(),
                link: "https://wiki.mw2.wiki/item/1864-stem/lu4".into(),
            }]
        );
    }

    #[test]
    fn craft_details() {
        let recipe = parse_details(&Html::parse_document(DETAILS), &entry()).unwrap();
        let craft = &recipe.craft;
        assert_eq!(craft.craft_level, "5");
        assert_eq!(craft.mp_consumption, "60");
        assert_eq!(craft.result_item_id, "1463");
        assert_eq!(craft.result_item_grade, "B");
        assert_eq!(craft.result_item_name, "Soulshot: B-grade");
        assert_eq!(craft.result_quantity, "100");
        assert_eq!(craft.chance_of_success, "100");
    }

    #[test]
    fn drop_and_spoil_lists() {
        let recipe = parse_details(&Html::parse_document(DETAILS), &entry()).unwrap();
        let drop = &recipe.drop_list[0];
        assert_eq!(drop.npc.id, "20201");
        assert_eq!(drop.npc.name, "Orc");
        assert_eq!(drop.npc.level, Some(42));
        assert_eq!(drop.amount, "1");
        assert_eq!(drop.chance, 0.85);

        let spoil = &recipe.spoil_list[0];
        assert_eq!(spoil.npc.id, "");
        assert_eq!(spoil.chance, 0.0);
    }
}
