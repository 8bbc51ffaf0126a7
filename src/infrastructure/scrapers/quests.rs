use super::html::{
    absolute_url, attr, css, first_text, label_sibling, site_root, style_offset, text, text_sep,
};
use super::text::{entity_id, icon_basename, level_range, quest_slug, strip_grade_suffix};
use super::{ListingPage, ListingParser};
use crate::domain::{
    QuestDetails, QuestListEntry, QuestReward, QuestStep, SpawnPoint, StepItem, StepNpc,
};
use crate::error::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html};

static START_NPC: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)Start NPC").unwrap());
static LEVEL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)Level").unwrap());
static STEP_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+\s*:\s*").unwrap());
static DETAIL_TAIL: Lazy<Regex> = Lazy::new(|| Regex::new(r"/quest/[^/]+/[^/]+$").unwrap());

const REWARD_LABELS: &[&str] = &["Награды", "Rewards"];
/// Links looked at after a step heading.
const STEP_LINKS: usize = 5;

pub struct QuestListing {
    pub base_url: String,
}

impl ListingParser for QuestListing {
    type Entry = QuestListEntry;

    fn parse_page(&self, document: &Html) -> Result<ListingPage<QuestListEntry>> {
        let entries = document
            .select(css!("a.item-name"))
            .map(|link| {
                let href = attr(link, "href");
                let (level_min, level_max) = link
                    .select(css!(".item-name__additional"))
                    .next()
                    .and_then(|lvl| level_range(&text(lvl)))
                    .unzip();
                let id = href
                    .split_once("/quest/")
                    .and_then(|(_, rest)| rest.split('-').next())
                    .map(str::to_string);

                QuestListEntry {
                    id,
                    name: link
                        .select(css!(".item-name__content"))
                        .next()
                        .and_then(first_text),
                    level_min,
                    level_max,
                    link: absolute_url(&self.base_url, &href),
                }
            })
            .collect();

        Ok(ListingPage::new(entries))
    }
}

/// Detail link rebuilt from id and name for the chronicle being scraped.
pub fn detail_url(entry: &QuestListEntry, chronicle: &str) -> String {
    let id = entry.id.as_deref().unwrap_or_default();
    let slug = quest_slug(entry.name.as_deref().unwrap_or_default());
    let tail = format!("/quest/{id}-{slug}/{chronicle}");

    if DETAIL_TAIL.is_match(&entry.link) {
        DETAIL_TAIL
            .replace(&entry.link, regex::NoExpand(&tail))
            .into_owned()
    } else {
        format!("{}{}", site_root(&entry.link), tail)
    }
}

pub fn parse_details(
    document: &Html,
    entry: &QuestListEntry,
    url: &str,
    chronicle: &str,
) -> Result<QuestDetails> {
    let root = document.root_element();

    let name = document
        .select(css!("#result-title .item-name__content"))
        .next()
        .map(text)
        .or_else(|| entry.name.clone())
        .unwrap_or_default();
    let description = document
        .select(css!("#result-title p"))
        .next()
        .map(text)
        .unwrap_or_default();

    let start_npc = label_sibling(root, &START_NPC);
    let start_npc_id = start_npc
        .and_then(|cell| cell.select(css!("a.item-name")).next())
        .and_then(|a| entity_id(&attr(a, "href"), "npc"))
        .map(|id| id.to_string());

    let location = document
        .select(css!(".spawn-point"))
        .filter_map(|sp| style_offset(&attr(sp, "style")))
        .map(|(top, left)| SpawnPoint { top, left })
        .collect();

    let (level_min, level_max) = label_sibling(root, &LEVEL)
        .and_then(|cell| level_range(&text(cell)))
        .unzip();

    Ok(QuestDetails {
        id: entry.id.clone(),
        name,
        description,
        start_npc_id,
        start_npc_name: start_npc.and_then(npc_name),
        start_npc_additional: start_npc.and_then(npc_additional),
        start_npc_icon: start_npc.and_then(icon),
        location,
        level_min,
        level_max,
        rewards: parse_rewards(document),
        steps: parse_steps(document),
        chronicle: chronicle.to_string(),
        link: url.to_string(),
    })
}

fn npc_name(el: ElementRef<'_>) -> Option<String> {
    el.select(css!(".item-name__content"))
        .next()
        .and_then(first_text)
}

fn npc_additional(el: ElementRef<'_>) -> Option<String> {
    el.select(css!(".item-name__additional")).next().map(text)
}

fn icon(el: ElementRef<'_>) -> Option<String> {
    el.select(css!("img"))
        .next()
        .map(|img| icon_basename(&attr(img, "src")))
}

fn grade(el: ElementRef<'_>) -> Option<String> {
    el.select(css!(".item-grade")).next().map(text)
}

fn parse_rewards(document: &Html) -> Vec<QuestReward> {
    document
        .select(css!("a.item-name"))
        .filter(|link| {
            let Some(td) = link
                .ancestors()
                .filter_map(ElementRef::wrap)
                .find(|e| e.value().name() == "td")
            else {
                return false;
            };
            td.prev_siblings()
                .filter_map(ElementRef::wrap)
                .find(|e| e.value().name() == "td")
                .is_some_and(|label| {
                    let label = text(label);
                    REWARD_LABELS.iter().any(|l| label.contains(l))
                })
        })
        .map(|link| QuestReward {
            name: link
                .select(css!(".item-name__content"))
                .next()
                .map(text)
                .unwrap_or_default(),
            icon: icon(link).unwrap_or_default(),
            grade: grade(link).unwrap_or_default(),
        })
        .collect()
}

/// Steps are the `h5` headings of the quest body; each step owns the
/// links that follow its heading up to the next one.
fn parse_steps(document: &Html) -> Vec<QuestStep> {
    let mut steps: Vec<(QuestStep, usize)> = Vec::new();

    for el in document.select(css!("#quest-row h5, #quest-row a.item-name")) {
        if el.value().name() == "h5" {
            let description = el
                .next_siblings()
                .filter_map(ElementRef::wrap)
                .find(|e| e.value().name() == "div")
                .map(|div| text_sep(div, " "))
                .unwrap_or_default();
            steps.push((
                QuestStep {
                    number: steps.len() + 1,
                    title: STEP_NUMBER.replace(&text(el), "").trim().to_string(),
                    description,
                    npc: None,
                    item: None,
                },
                0,
            ));
            continue;
        }

        let Some((step, seen)) = steps.last_mut() else {
            continue;
        };
        if *seen >= STEP_LINKS {
            continue;
        }
        *seen += 1;

        let href = attr(el, "href");
        if href.starts_with("/npc/") && step.npc.is_none() {
            step.npc = Some(StepNpc {
                id: entity_id(&href, "npc").map(|id| id.to_string()),
                name: npc_name(el),
                additional: npc_additional(el),
                icon: icon(el),
            });
        } else if href.starts_with("/item/") && step.item.is_none() {
            let grade = grade(el);
            let name = el
                .select(css!(".item-name__content"))
                .next()
                .map(text)
                .map(|n| strip_grade_suffix(&n, grade.as_deref().unwrap_or_default()));
            step.item = Some(StepItem {
                id: entity_id(&href, "item").map(|id| id.to_string()),
                name,
                icon: icon(el),
                grade,
            });
        }
    }

    steps.into_iter().map(|(step, _)| step).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const DETAILS: &str = r#"
        <div id="result-title"><span class="item-name__content">Letters of Love</span>
          <p>Deliver the letter.</p></div>
        <table>
          <tr><td>Start NPC</td><td><a class="item-name" href="/npc/30048-darin/lu4">
            <img src="/img/npc.png"><span class="item-name__content">Darin<span>x</span></span>
            <span class="item-name__additional">Gatekeeper</span></a></td></tr>
          <tr><td>Level</td><td>2 ~ 5</td></tr>
          <tr><td>Rewards</td><td><a class="item-name" href="/item/57-adena/lu4">
            <img src="/img/etc_adena_i00.png"><span class="item-name__content">Adena</span>
            <span class="item-grade">NG</span></a></td></tr>
        </table>
        <span class="spawn-point" style="top: 5px; left: 6px"></span>
        <div id="quest-row">
          <h5>1: Meet Darin</h5><div>Talk to Darin.</div>
          <a class="item-name" href="/npc/30048-darin/lu4"><span class="item-name__content">Darin</span></a>
          <h5>2: Bring the letter</h5><div>Give <b>Letter</b> to Roxxy.</div>
          <a class="item-name" href="/item/687-darins-letter/lu4"><img src="/img/letter.png">
            <span class="item-name__content">Darin's Letter<span class="item-grade">NG</span></span></a>
          <a class="item-name" href="/npc/30006-roxxy/lu4"><span class="item-name__content">Roxxy</span></a>
        </div>"#;

    fn entry() -> QuestListEntry {
        QuestListEntry {
            id: Some("1".into()),
            name: Some("Letters of Love".into()),
            level_min: Some("2".into()),
            level_max: Some("5".into()),
            link: "https://wiki.mw2.wiki/quest/1-letters-of-love/interlude".into(),
        }
    }

    #[test]
    fn listing_links() {
        let html = r#"<a class="item-name" href="/quest/1-letters-of-love/lu4">
            <span class="item-name__content">Letters of Love<span>q</span></span>
            <span class="item-name__additional">2 ~ 5</span></a>"#;
        let listing = QuestListing {
            base_url: "https://wiki.mw2.wiki".into(),
        };
        let page = listing.parse_page(&Html::parse_document(html)).unwrap();
        assert_eq!(page.entries.len(), 1);
        let quest = &page.entries[0];
        assert_eq!(quest.id.as_deref(), Some("1"));
        assert_eq!(quest.name.as_deref(), Some("Letters of Love"));
        assert_eq!(quest.level_max.as_deref(), Some("5"));
        assert_eq!(quest.link, "https://wiki.mw2.wiki/quest/1-letters-of-love/lu4");
    }

    #[test]
    fn detail_url_uses_slug_and_chronicle() {
        let mut quest = entry();
        quest.name = Some("Spirit's Call!".into());
        assert_eq!(
            detail_url(&quest, "lu4"),
            "https://wiki.mw2.wiki/quest/1-spirits-call/lu4"
        );
    }

    #[test]
    fn details_header() {
        let url = detail_url(&entry(), "lu4");
        let quest = parse_details(&Html::parse_document(DETAILS), &entry(), &url, "lu4").unwrap();
        assert_eq!(quest.name, "Letters of Love");
        assert_eq!(quest.description, "Deliver the letter.");
        assert_eq!(quest.start_npc_id.as_deref(), Some("30048"));
        assert_eq!(quest.start_npc_name.as_deref(), Some("Darin"));
        assert_eq!(quest.start_npc_additional.as_deref(), Some("Gatekeeper"));
        assert_eq!(quest.start_npc_icon.as_deref(), Some("npc"));
        assert_eq!(quest.level_min.as_deref(), Some("2"));
        assert_eq!(quest.level_max.as_deref(), Some("5"));
        assert_eq!(quest.location, vec![SpawnPoint { top: 5.0, left: 6.0 }]);
        assert_eq!(
            quest.rewards,
            vec![QuestReward {
                name: "Adena".into(),
                icon: "etc_adena_i00".into(),
                grade: "NG".into()
            }]
        );
        assert_eq!(quest.link, "https://wiki.mw2.wiki/quest/1-letters-of-love/lu4");
    }

    #[test]
    fn steps_keep_their_own_links() {
        let quest =
            parse_details(&Html::parse_document(DETAILS), &entry(), "u", "lu4").unwrap();
        assert_eq!(quest.steps.len(), 2);

        let first = &quest.steps[0];
        assert_eq!(first.number, 1);
        assert_eq!(first.title, "Meet Darin");
        assert_eq!(first.description, "Talk to Darin.");
        assert_eq!(first.npc.as_ref().and_then(|n| n.id.as_deref()), Some("30048"));
        assert!(first.item.is_none());

        let second = &quest.steps[1];
        assert_eq!(second.description, "Give Letter to Roxxy.");
        let item = second.item.as_ref().unwrap();
        assert_eq!(item.name.as_deref(), Some("Darin's Letter"));
        assert_eq!(item.grade.as_deref(), Some("NG"));
        assert_eq!(second.npc.as_ref().and_then(|n| n.name.as_deref()), Some("Roxxy"));
    }
}
