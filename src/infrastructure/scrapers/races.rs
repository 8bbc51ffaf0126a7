use super::html::{absolute_url, attr, css, style_url, text, text_sep};
use super::text::{entity_id, icon_basename, strip_query};
use crate::domain::{
    ClassDetails, ClassLevelSkill, ClassNode, ClassTree, Race, RaceListEntry, SkillCategory,
    SkillsSummary, Subtype, SummarySkill,
};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Node};
use serde_json::Value;

static CHART_DATA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"data\s*:\s*\[\s*([\d,\s]+)\s*\]").unwrap());
static CLASS_DATA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)window\._classData\s*=\s*(\[.*?\]);").unwrap());

/// Rate-limit page body the wiki serves instead of content.
pub const RATE_LIMITED_MARKER: &str = "429 Too Many Requests";
/// A complete class page contains its per-level tab.
const LEVELS_TAB_MARKER: &str = "By levels";
const MIN_CLASS_PAGE_BYTES: usize = 5000;

fn absolute_clean(base: &str, src: &str) -> String {
    strip_query(&absolute_url(base, src))
}

/// Every subtype link on the races page, one row per subtype.
pub fn parse_races(
    document: &Html,
    base_url: &str,
    chronicle: &str,
    server_id: u32,
) -> Vec<RaceListEntry> {
    let mut rows = Vec::new();

    for race in document.select(css!("div#races-row > div.race")) {
        let race_name = race
            .select(css!(".race-name p"))
            .next()
            .map(text)
            .unwrap_or_default();
        let race_icon = race
            .select(css!(".race-name img"))
            .next()
            .map(|img| absolute_clean(base_url, &attr(img, "src")))
            .unwrap_or_default();
        let race_background = style_url(&attr(race, "style"))
            .map(|u| absolute_clean(base_url, &u))
            .unwrap_or_default();

        for subtype in race.select(css!(".race-row a.race-type")) {
            rows.push(RaceListEntry {
                race_name: race_name.clone(),
                race_icon: race_icon.clone(),
                race_background: race_background.clone(),
                subtype_name: subtype
                    .select(css!("span"))
                    .next()
                    .map(text)
                    .unwrap_or_default(),
                subtype_background: style_url(&attr(subtype, "style"))
                    .map(|u| absolute_clean(base_url, &u))
                    .unwrap_or_default(),
                subtype_link: absolute_url(base_url, &attr(subtype, "href")),
                chronicle: chronicle.to_string(),
                server_id,
            });
        }
    }

    rows
}

/// Base stats of the class chart and the raw `_classData` array.
fn chart_stats(document: &Html) -> (Vec<Option<u32>>, Value) {
    let mut stats = Vec::new();
    let mut class_data = Value::Array(Vec::new());

    for script in document.select(css!("script")) {
        let body: String = script.text().collect();
        if let Some(c) = CHART_DATA.captures(&body) {
            stats = c[1]
                .split(',')
                .filter_map(|n| n.trim().parse::<u32>().ok())
                .map(Some)
                .collect();
        }
        if let Some(c) = CLASS_DATA.captures(&body) {
            class_data = serde_json::from_str(&c[1]).unwrap_or_else(|_| Value::Array(Vec::new()));
        }
        let found_data = class_data.as_array().is_some_and(|a| !a.is_empty());
        if !stats.is_empty() || found_data {
            break;
        }
    }

    stats.resize(6, None);
    (stats, class_data)
}

pub fn parse_class_details(document: &Html, entry: &RaceListEntry, base_url: &str) -> ClassDetails {
    let heading = document.select(css!("#class-heading h1")).next();

    let mut summary = std::collections::HashMap::new();
    for tr in document.select(css!("#class-summary__table tr")) {
        let Some(key) = tr.select(css!("td b")).next() else {
            continue;
        };
        let Some(value) = tr.select(css!("td")).nth(1) else {
            continue;
        };
        let key = text(key).trim_end_matches(':').to_lowercase();
        summary.insert(key, text_sep(value, " "));
    }
    let mut field = |name: &str| summary.remove(name).unwrap_or_default();

    let (stats, class_data) = chart_stats(document);

    ClassDetails {
        race_name: entry.race_name.clone(),
        subtype_name: entry.subtype_name.clone(),
        class_name: heading.map(text).unwrap_or_default(),
        race_icon: heading
            .and_then(|h| h.select(css!("img")).next())
            .map(|img| absolute_clean(base_url, &attr(img, "src")))
            .unwrap_or_default(),
        class_image: document
            .select(css!("#class-image img"))
            .next()
            .map(|img| absolute_clean(base_url, &attr(img, "src")))
            .unwrap_or_default(),
        description: document
            .select(css!("#class-desc__text"))
            .next()
            .map(|d| text_sep(d, " "))
            .unwrap_or_default(),
        role: field("role"),
        weapon: field("weapon"),
        armor: field("armor"),
        str_: stats[0],
        dex: stats[1],
        con: stats[2],
        int: stats[3],
        wit: stats[4],
        men: stats[5],
        class_data,
        chronicle: entry.chronicle.clone(),
        server_id: entry.server_id,
        link: entry.subtype_link.clone(),
    }
}

fn child_elements<'a>(el: ElementRef<'a>, tag: &'a str) -> impl Iterator<Item = ElementRef<'a>> {
    el.children()
        .filter_map(ElementRef::wrap)
        .filter(move |e| e.value().name() == tag)
}

fn child_list<'a>(el: ElementRef<'a>, class: &str) -> Option<ElementRef<'a>> {
    el.children()
        .filter_map(ElementRef::wrap)
        .find(|e| e.value().name() == "ul" && e.value().classes().any(|c| c == class))
}

/// Race name is the text right after the race icon, else the first
/// direct text of the item.
fn race_name(li: ElementRef<'_>) -> String {
    let after_icon = li
        .select(css!("img"))
        .next()
        .and_then(|img| img.next_sibling())
        .and_then(|n| match n.value() {
            Node::Text(t) => Some(t.trim().to_string()),
            _ => None,
        })
        .filter(|t| !t.is_empty());

    after_icon
        .or_else(|| {
            li.children().find_map(|n| match n.value() {
                Node::Text(t) if !t.trim().is_empty() => Some(t.trim().to_string()),
                _ => None,
            })
        })
        .unwrap_or_else(|| "Unknown".to_string())
}

fn class_node(li: ElementRef<'_>, base_url: &str) -> Option<ClassNode> {
    let link = li.select(css!("a")).next()?;
    let is_final = link.value().classes().any(|c| c == "no-child");

    let children = if is_final {
        Vec::new()
    } else {
        child_list(li, "race-class__ul")
            .map(|ul| {
                child_elements(ul, "li")
                    .filter_map(|child| class_node(child, base_url))
                    .collect()
            })
            .unwrap_or_default()
    };

    Some(ClassNode {
        name: text(link),
        link: absolute_url(base_url, &attr(link, "href")),
        is_final,
        skills_summary: None,
        skills: None,
        children,
    })
}

/// Race/subtype/class hierarchy from the class list sidebar, if the page has one.
pub fn parse_class_tree(document: &Html, base_url: &str) -> Option<ClassTree> {
    let list = document.select(css!("div#race-class__list")).next()?;
    let root = list.select(css!("ul")).next()?;

    let races = child_elements(root, "li")
        .map(|li| {
            let icon = li
                .select(css!("img"))
                .next()
                .map(|img| attr(img, "src"))
                .filter(|src| !src.is_empty())
                .map(|src| absolute_clean(base_url, &src))
                .unwrap_or_default();

            let subtypes = li
                .select(css!("ul.race-class__first-ul"))
                .next()
                .map(|ul| {
                    child_elements(ul, "li")
                        .map(|sub| {
                            let link = sub.select(css!("a")).next();
                            Subtype {
                                name: link.map(text).unwrap_or_else(|| "Unknown".to_string()),
                                link: link
                                    .map(|a| attr(a, "href"))
                                    .filter(|h| h.starts_with('/'))
                                    .map(|h| absolute_url(base_url, &h))
                                    .unwrap_or_default(),
                                classes: child_list(sub, "race-class__ul")
                                    .map(|cls| {
                                        child_elements(cls, "li")
                                            .filter_map(|c| class_node(c, base_url))
                                            .collect()
                                    })
                                    .unwrap_or_default(),
                            }
                        })
                        .collect()
                })
                .unwrap_or_default();

            Race {
                name: race_name(li),
                icon,
                subtypes,
            }
        })
        .collect();

    Some(ClassTree { races })
}

pub fn is_rate_limited(html: &str) -> bool {
    html.contains(RATE_LIMITED_MARKER)
}

/// A cached class page worth reusing.
pub fn is_complete_class_page(html: &str) -> bool {
    html.len() >= MIN_CLASS_PAGE_BYTES && html.contains(LEVELS_TAB_MARKER)
}

pub fn is_not_found(html: &str) -> bool {
    let lower = html.to_lowercase();
    lower.contains("404") && lower.contains("not found")
}

/// `(level, absolute url)` of every numeric `a.skill-level-link`.
pub fn class_level_links(document: &Html, site: &str) -> Vec<(String, String)> {
    document
        .select(css!("a.skill-level-link"))
        .filter_map(|a| {
            let level = text(a);
            if level.is_empty() || !level.chars().all(|c| c.is_ascii_digit()) {
                return None;
            }
            Some((level, absolute_url(site, &attr(a, "href"))))
        })
        .collect()
}

pub fn parse_level_skills(document: &Html, site: &str) -> Vec<ClassLevelSkill> {
    let Some(table) = document.select(css!("table.table-skills")).next() else {
        return Vec::new();
    };

    table
        .select(css!("tbody tr"))
        .filter_map(|tr| {
            let link = tr.select(css!("a.item-name")).next()?;
            let full_name = link
                .select(css!("span.item-name__content"))
                .next()
                .map(text)
                .unwrap_or_default();
            let (name, level) = match full_name.split_once("Lv.") {
                Some((name, level)) => (
                    name.trim().to_string(),
                    level.trim_matches([' ', '.']).to_string(),
                ),
                None => (full_name.clone(), "1".to_string()),
            };
            let url = absolute_url(site, &attr(link, "href"));
            let img_src = link.select(css!("img")).next().map(|img| attr(img, "src"));

            Some(ClassLevelSkill {
                id: entity_id(&url, "skill")
                    .map(|id| id.to_string())
                    .unwrap_or_default(),
                name,
                level,
                icon_name: img_src.as_deref().map(icon_basename).unwrap_or_default(),
                icon: img_src
                    .map(|src| absolute_url(site, &src))
                    .unwrap_or_default(),
                note: tr
                    .select(css!("td.text-end"))
                    .next()
                    .map(text)
                    .unwrap_or_default(),
                url,
            })
        })
        .collect()
}

fn summary_tab(document: &Html, tab: &scraper::Selector, site: &str) -> Vec<SkillCategory> {
    let Some(tab) = document.select(tab).next() else {
        return Vec::new();
    };

    tab.select(css!("table tbody tr"))
        .filter_map(|tr| {
            let toggler = tr.select(css!("div.class-simple__toggler")).next()?;
            let content = tr.select(css!("div.class-simple__content")).next()?;

            let skills = content
                .select(css!("a.item-name"))
                .map(|a| {
                    let href = attr(a, "href");
                    let icon_block = a.select(css!("span.item-icon")).next();
                    let icon = icon_block
                        .and_then(|b| {
                            b.select(css!("img"))
                                .find(|img| img.value().attr("class").is_none())
                        })
                        .map(|img| icon_basename(&attr(img, "src")))
                        .unwrap_or_default();
                    let icon_panel = icon_block
                        .and_then(|b| b.select(css!("img.item-icon__panel")).next())
                        .map(|img| icon_basename(&attr(img, "src")))
                        .unwrap_or_default();

                    SummarySkill {
                        id: entity_id(&href, "skill")
                            .map(|id| id.to_string())
                            .unwrap_or_default(),
                        name: a
                            .select(css!(".item-tooltip__title"))
                            .next()
                            .map(text)
                            .unwrap_or_else(|| text(a)),
                        level: "1".to_string(),
                        icon,
                        icon_panel,
                        url: absolute_url(site, &href),
                        description: a
                            .select(css!(".item-tooltip > div:nth-of-type(2)"))
                            .next()
                            .map(|d| text_sep(d, " "))
                            .unwrap_or_default(),
                    }
                })
                .collect();

            Some(SkillCategory {
                name: text(toggler),
                skills,
            })
        })
        .collect()
}

/// "All skills" tabs of a class page.
pub fn parse_skills_summary(document: &Html, site: &str) -> SkillsSummary {
    SkillsSummary {
        active: summary_tab(document, css!("div#active"), site),
        passive: summary_tab(document, css!("div#passive"), site),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://wiki.mw2.wiki";

    const RACES: &str = r#"
        <div id="races-row">
          <div class="race" style="background-image: url('/img/races/human.jpg?2')">
            <div class="race-name"><img src="/img/races/human_icon.png?1"><p>Human</p></div>
            <div class="race-row">
              <a class="race-type" href="/race/human-fighter" style="background: url(/img/hf.jpg)"><span>Fighter</span></a>
              <a class="race-type" href="/race/human-mystic"><span>Mystic</span></a>
            </div>
          </div>
        </div>"#;

    const CLASS_PAGE: &str = r#"
        <div id="class-heading"><h1><img src="/img/human.png?3">Human Fighter</h1></div>
        <div id="class-desc__text"><p>Brave</p><p>warriors.</p></div>
        <table id="class-summary__table">
          <tr><td><b>Role:</b></td><td>Melee</td></tr>
          <tr><td><b>Weapon:</b></td><td>Swords, Blunts</td></tr>
          <tr><td><b>Armor:</b></td><td>Heavy</td></tr>
        </table>
        <div id="class-image"><img src="/img/classes/hf.png?9"></div>
        <script>var chart = { data: [40, 30, 43, 21, 11, 25] };</script>
        <script>window._classData = [{"id": 0, "name": "Fighter"}];</script>
        <div id="race-class__list"><ul>
          <li><img src="/img/human.png">Human
            <ul class="race-class__first-ul">
              <li><a href="/race/human-fighter">Fighter</a>
                <ul class="race-class__ul">
                  <li><a href="/class/warrior">Warrior</a>
                    <ul class="race-class__ul">
                      <li><a class="no-child" href="/class/gladiator">Gladiator</a></li>
                    </ul>
                  </li>
                  <li><a class="no-child" href="/class/knight">Knight</a></li>
                </ul>
              </li>
            </ul>
          </li>
          <li><img src="/img/elf.png"><span>x</span>Elf</li>
        </ul></div>"#;

    fn entry() -> RaceListEntry {
        parse_races(&Html::parse_document(RACES), BASE, "lu4", 10).remove(0)
    }

    #[test]
    fn races_page_rows() {
        let rows = parse_races(&Html::parse_document(RACES), BASE, "lu4", 10);
        assert_eq!(rows.len(), 2);
        let fighter = &rows[0];
        assert_eq!(fighter.race_name, "Human");
        assert_eq!(fighter.race_icon, "https://wiki.mw2.wiki/img/races/human_icon.png");
        assert_eq!(fighter.race_background, "https://wiki.mw2.wiki/img/races/human.jpg");
        assert_eq!(fighter.subtype_name, "Fighter");
        assert_eq!(fighter.subtype_background, "https://wiki.mw2.wiki/img/hf.jpg");
        assert_eq!(fighter.subtype_link, "https://wiki.mw2.wiki/race/human-fighter");
        assert_eq!(rows[1].subtype_background, "");
    }

    #[test]
    fn class_details_with_chart() {
        let details = parse_class_details(&Html::parse_document(CLASS_PAGE), &entry(), BASE);
        assert_eq!(details.class_name, "Human Fighter");
        assert_eq!(details.race_icon, "https://wiki.mw2.wiki/img/human.png");
        assert_eq!(details.class_image, "https://wiki.mw2.wiki/img/classes/hf.png");
        assert_eq!(details.description, "Brave warriors.");
        assert_eq!(details.role, "Melee");
        assert_eq!(details.weapon, "Swords, Blunts");
        assert_eq!(details.armor, "Heavy");
        assert_eq!(details.str_, Some(40));
        assert_eq!(details.men, Some(25));
    }

    #[test]
    fn missing_chart_pads_with_none() {
        let details = parse_class_details(&Html::parse_document("<div></div>"), &entry(), BASE);
        assert_eq!(details.str_, None);
        assert_eq!(details.men, None);
        assert_eq!(details.class_data, Value::Array(Vec::new()));
    }

    #[test]
    fn class_tree_recurses_until_final() {
        let tree = parse_class_tree(&Html::parse_document(CLASS_PAGE), BASE).unwrap();
        assert_eq!(tree.races.len(), 2);
        let human = &tree.races[0];
        assert_eq!(human.name, "Human");
        assert_eq!(human.icon, "https://wiki.mw2.wiki/img/human.png");
        assert_eq!(tree.races[1].name, "Elf");

        let fighter = &human.subtypes[0];
        assert_eq!(fighter.link, "https://wiki.mw2.wiki/race/human-fighter");
        let names: Vec<_> = tree.placements().iter().map(|p| p.class.name.clone()).collect();
        assert_eq!(names, ["Warrior", "Gladiator", "Knight"]);
        assert!(fighter.classes[1].is_final);
        assert!(!fighter.classes[0].is_final);

        assert!(parse_class_tree(&Html::parse_document("<div></div>"), BASE).is_none());
    }

    #[test]
    fn page_markers() {
        assert!(is_rate_limited("<title>429 Too Many Requests</title>"));
        assert!(is_not_found("<h1>404</h1><p>Page Not Found</p>"));
        assert!(!is_not_found("<p>Level 404 reward</p>"));
        assert!(!is_complete_class_page("<p>By levels</p>"));
        let long = format!("{}By levels", " ".repeat(MIN_CLASS_PAGE_BYTES));
        assert!(is_complete_class_page(&long));
    }

    #[test]
    fn level_pages_and_summary() {
        let class_page = Html::parse_document(
            r##"<a class="skill-level-link" href="/class/warrior?level=20">20</a>
                <a class="skill-level-link" href="#">All</a>
                <div id="active"><table><tbody><tr><td>
                  <div class="class-simple__toggler">Physical skills</div>
                  <div class="class-simple__content">
                    <a class="item-name" href="/skill/3-power-strike/lu4">
                      <span class="item-icon"><img src="/icon64/skill0003.png"><img class="item-icon__panel" src="/icon64/panel_2.png"></span>
                      <span class="item-tooltip"><span class="item-tooltip__title">Power Strike</span><div>Active</div><div>Strikes hard.</div></span>
                    </a>
                  </div></td></tr></tbody></table></div>"##,
        );
        assert_eq!(
            class_level_links(&class_page, BASE),
            vec![("20".to_string(), "https://wiki.mw2.wiki/class/warrior?level=20".to_string())]
        );

        let summary = parse_skills_summary(&class_page, BASE);
        assert!(summary.passive.is_empty());
        let category = &summary.active[0];
        assert_eq!(category.name, "Physical skills");
        let skill = &category.skills[0];
        assert_eq!(skill.id, "3");
        assert_eq!(skill.name, "Power Strike");
        assert_eq!(skill.icon, "skill0003");
        assert_eq!(skill.icon_panel, "panel_2");
        assert_eq!(skill.description, "Strikes hard.");

        let level_page = Html::parse_document(
            r#"<table class="table-skills"><tbody>
                <tr><td><a class="item-name" href="/skill/3-power-strike/lu4"><img src="/icon64/skill0003.png">
                  <span class="item-name__content">Power Strike Lv. 2</span></a></td><td class="text-end">SP 500</td></tr>
                <tr><td><a class="item-name" href="/skill/56-mastery/lu4"><span class="item-name__content">Mastery</span></a></td></tr>
              </tbody></table>"#,
        );
        let skills = parse_level_skills(&level_page, BASE);
        assert_eq!(skills.len(), 2);
        assert_eq!(skills[0].name, "Power Strike");
        assert_eq!(skills[0].level, "2");
        assert_eq!(skills[0].icon_name, "skill0003");
        assert_eq!(skills[0].icon, "https://wiki.mw2.wiki/icon64/skill0003.png");
        assert_eq!(skills[0].note, "SP 500");
        assert_eq!(skills[1].level, "1");
        assert_eq!(skills[1].id, "56");
    }
}
