use crate::error::{Result, ScrapeError};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};

static STYLE_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"url\(\s*["']?([^"')]*)["']?\s*\)"#).unwrap());
static STYLE_TOP: Lazy<Regex> = Lazy::new(|| Regex::new(r"top:\s*(-?[\d.]+)px").unwrap());
static STYLE_LEFT: Lazy<Regex> = Lazy::new(|| Regex::new(r"left:\s*(-?[\d.]+)px").unwrap());

/// Compiles a CSS selector literal once per call site.
macro_rules! css {
    ($selector:literal) => {{
        static SELECTOR: once_cell::sync::Lazy<scraper::Selector> =
            once_cell::sync::Lazy::new(|| scraper::Selector::parse($selector).unwrap());
        &*SELECTOR
    }};
}
pub(crate) use css;

pub fn try_css(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| ScrapeError::Selector(e.to_string()))
}

/// First match of a selector the page cannot be parsed without.
pub fn require<'a>(document: &'a Html, selector: &str) -> Result<ElementRef<'a>> {
    let parsed = try_css(selector)?;
    document
        .select(&parsed)
        .next()
        .ok_or_else(|| ScrapeError::Selector(format!("no element matches `{selector}`")))
}

/// Text of all descendants, each piece trimmed, empty pieces dropped.
pub fn text(el: ElementRef<'_>) -> String {
    text_sep(el, "")
}

pub fn text_sep(el: ElementRef<'_>, sep: &str) -> String {
    el.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(sep)
}

/// Only the text nodes that are direct children of `el`.
pub fn own_text(el: ElementRef<'_>) -> String {
    el.children()
        .filter_map(|child| match child.value() {
            Node::Text(t) => Some(&**t),
            _ => None,
        })
        .collect::<String>()
        .trim()
        .to_string()
}

/// The first child node when it is text, trimmed.
pub fn first_text(el: ElementRef<'_>) -> Option<String> {
    match el.children().next()?.value() {
        Node::Text(t) => Some(t.trim().to_string()),
        _ => None,
    }
}

/// Text with every descendant of a `class` element left out.
pub fn text_excluding(el: ElementRef<'_>, class: &str, sep: &str) -> String {
    el.descendants()
        .filter_map(|node| {
            let Node::Text(t) = node.value() else {
                return None;
            };
            let excluded = node
                .ancestors()
                .take_while(|a| a.id() != el.id())
                .filter_map(ElementRef::wrap)
                .any(|a| a.value().classes().any(|c| c == class));
            (!excluded).then(|| t.trim())
        })
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(sep)
}

/// Text split on `<br>` and newlines, one trimmed entry per visual line.
pub fn text_lines(el: ElementRef<'_>) -> Vec<String> {
    el.text()
        .flat_map(|t| t.split('\n'))
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

/// Like [`text_lines`] but inline elements stay on their line; only `<br>`
/// and literal newlines break.
pub fn br_lines(el: ElementRef<'_>) -> Vec<String> {
    let mut raw = String::new();
    for node in el.descendants() {
        match node.value() {
            Node::Text(t) => raw.push_str(t),
            Node::Element(e) if e.name() == "br" => raw.push('\n'),
            _ => {}
        }
    }
    raw.split(['\n', '\r'])
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

/// String content of a cell that holds exactly one chain of single children.
fn single_string(el: ElementRef<'_>) -> Option<String> {
    let mut node = *el;
    loop {
        let mut children = node.children();
        let only = children.next()?;
        if children.next().is_some() {
            return None;
        }
        match only.value() {
            Node::Text(t) => return Some(String::from(&**t)),
            Node::Element(_) => node = only,
            _ => return None,
        }
    }
}

/// The `td` that follows a `td` whose only string matches `label`.
pub fn label_cell<'a>(root: ElementRef<'a>, label: &Regex) -> Option<ElementRef<'a>> {
    let cells: Vec<ElementRef<'a>> = root.select(css!("td")).collect();
    let pos = cells
        .iter()
        .position(|td| single_string(*td).is_some_and(|s| label.is_match(&s)))?;
    cells.get(pos + 1).copied()
}

/// Like [`label_cell`] but the value must be the label's next `td` sibling.
pub fn label_sibling<'a>(root: ElementRef<'a>, label: &Regex) -> Option<ElementRef<'a>> {
    root.select(css!("td"))
        .find(|td| single_string(*td).is_some_and(|s| label.is_match(&s)))
        .and_then(|td| next_sibling(td, "td"))
}

pub fn next_sibling<'a>(el: ElementRef<'a>, tag: &str) -> Option<ElementRef<'a>> {
    el.next_siblings()
        .filter_map(ElementRef::wrap)
        .find(|e| e.value().name() == tag)
}

pub fn attr(el: ElementRef<'_>, name: &str) -> String {
    el.value().attr(name).unwrap_or_default().trim().to_string()
}

pub fn style_url(style: &str) -> Option<String> {
    STYLE_URL
        .captures(style)
        .map(|c| c[1].trim().to_string())
        .filter(|u| !u.is_empty())
}

/// `top` and `left` pixel offsets of an absolutely placed marker.
pub fn style_offset(style: &str) -> Option<(f64, f64)> {
    let top = STYLE_TOP.captures(style)?[1].parse().ok()?;
    let left = STYLE_LEFT.captures(style)?[1].parse().ok()?;
    Some((top, left))
}

pub fn absolute_url(base: &str, href: &str) -> String {
    let href = href.trim();
    if href.is_empty() || href.starts_with("http://") || href.starts_with("https://") {
        href.to_string()
    } else if let Some(rest) = href.strip_prefix("//") {
        format!("https://{rest}")
    } else if href.starts_with('/') {
        format!("{}{}", site_root(base), href)
    } else {
        format!("{}/{}", base.trim_end_matches('/'), href)
    }
}

/// `https://host/a/b` -> `https://host`
pub fn site_root(url: &str) -> &str {
    let after_scheme = url.find("://").map_or(0, |i| i + 3);
    match url[after_scheme..].find('/') {
        Some(slash) => &url[..after_scheme + slash],
        None => url,
    }
}
