use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Number, Value};
use sha2::{Digest, Sha256};
use unicode_normalization::UnicodeNormalization;

static NON_ALNUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").unwrap());
static PLAIN_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?\d+(\.\d+)?$").unwrap());
static LEVEL: Lazy<Regex> = Lazy::new(|| Regex::new(r"Lv\.\s*(\d+)").unwrap());
static LEVEL_RANGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)\s*~\s*(\d+)").unwrap());
static ITEM_SLUG: Lazy<Regex> = Lazy::new(|| Regex::new(r"/item/([^/]+)/").unwrap());
static UNSAFE_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-zA-Z0-9_]+").unwrap());
static UNSAFE_FILENAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-zA-Z0-9_-]+").unwrap());
static TRAILING_GRADE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(NG|D|C|B|A|S)$").unwrap());

/// Parses wiki number formatting (`1.104.850`, `12,5`, `1 000 Adena`).
pub fn clean_number(text: &str) -> Option<Number> {
    let chars: Vec<char> = text
        .trim()
        .chars()
        .filter(|c| *c != ' ' && *c != '\u{a0}')
        .map(|c| if c == ',' { '.' } else { c })
        .collect();

    let digits: String = chars
        .iter()
        .enumerate()
        .filter(|(i, c)| !(**c == '.' && is_thousands_separator(&chars, *i)))
        .map(|(_, c)| *c)
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    if digits.is_empty() {
        return None;
    }

    let value: f64 = digits.parse().ok()?;
    number_from_f64(value)
}

/// A dot after a digit and before exactly three digits that end the run.
fn is_thousands_separator(chars: &[char], i: usize) -> bool {
    if i == 0 || !chars[i - 1].is_ascii_digit() {
        return false;
    }
    let group = chars.get(i + 1..i + 4);
    let group_is_digits = group.is_some_and(|g| g.iter().all(char::is_ascii_digit));
    let ends = chars.get(i + 4).map_or(true, |c| !c.is_ascii_digit());
    group_is_digits && ends
}

pub fn number_from_f64(value: f64) -> Option<Number> {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Some(Number::from(value as i64))
    } else {
        Number::from_f64(value)
    }
}

/// Stat cell value: plain numbers (optionally with `%`) become numbers,
/// everything else stays text.
pub fn normalize_value(text: &str) -> Value {
    let val = text.trim().replace(',', "");
    let bare = val.replace('%', "");

    if PLAIN_NUMBER.is_match(&bare) {
        if val.contains('.') {
            if let Some(n) = bare.parse::<f64>().ok().and_then(Number::from_f64) {
                return Value::Number(n);
            }
        } else if let Ok(n) = bare.parse::<i64>() {
            return Value::Number(n.into());
        }
    }
    Value::String(val)
}

pub fn snake_case(text: &str) -> String {
    let lower = text.trim().to_lowercase();
    NON_ALNUM.replace_all(&lower, "_").trim_matches('_').to_string()
}

pub fn strip_grade_suffix(name: &str, grade: &str) -> String {
    if !grade.is_empty() && name.ends_with(grade) {
        name[..name.len() - grade.len()].trim().to_string()
    } else {
        name.to_string()
    }
}

/// Removes a trailing grade letter glued to a name (`Sword of ValhallaS`).
pub fn strip_trailing_grade(name: &str) -> String {
    TRAILING_GRADE.replace(name, "").trim().to_string()
}

/// `/img/items/sword_i00.png?1` -> `sword_i00`
pub fn icon_basename(src: &str) -> String {
    let path = src.split(['?', '#']).next().unwrap_or_default();
    let file = path.rsplit('/').next().unwrap_or_default();
    match file.rfind('.') {
        Some(dot) if dot > 0 => file[..dot].to_string(),
        _ => file.to_string(),
    }
}

/// Numeric id following `/<kind>/` in a link.
pub fn entity_id(href: &str, kind: &str) -> Option<u64> {
    let marker = format!("/{kind}/");
    let start = href.find(&marker)? + marker.len();
    let digits: String = href[start..]
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

pub fn level_of(text: &str) -> Option<u32> {
    LEVEL.captures(text).and_then(|c| c[1].parse().ok())
}

pub fn strip_level(text: &str) -> String {
    LEVEL.replace_all(text, "").trim().to_string()
}

pub fn level_range(text: &str) -> Option<(String, String)> {
    LEVEL_RANGE
        .captures(text)
        .map(|c| (c[1].to_string(), c[2].to_string()))
}

/// Cache key of an item page; falls back to a digest of the URL.
pub fn item_slug(url: &str) -> String {
    match ITEM_SLUG.captures(url) {
        Some(c) => c[1].to_string(),
        None => hex::encode(Sha256::digest(url.as_bytes())),
    }
}

/// URL slug the wiki uses for quest names.
pub fn quest_slug(name: &str) -> String {
    name.nfd()
        .collect::<String>()
        .to_lowercase()
        .replace(' ', "-")
        .replace(['\u{2019}', '\''], "")
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-')
        .collect()
}

pub fn safe_name(name: &str) -> String {
    UNSAFE_NAME
        .replace_all(&name.to_lowercase(), "_")
        .trim_matches('_')
        .to_string()
}

pub fn safe_filename(name: &str) -> String {
    UNSAFE_FILENAME.replace_all(name, "_").to_string()
}

pub fn strip_query(url: &str) -> String {
    url.split('?').next().unwrap_or_default().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn clean_number_handles_separators() {
        assert_eq!(clean_number("1.104.850"), Some(1104850.into()));
        assert_eq!(clean_number("12,5"), Number::from_f64(12.5));
        assert_eq!(clean_number("1 000 Adena"), Some(1000.into()));
        assert_eq!(clean_number("3.000"), Some(3000.into()));
        assert_eq!(clean_number("3.0001"), Number::from_f64(3.0001));
        assert_eq!(clean_number("0.5%"), Number::from_f64(0.5));
        assert_eq!(clean_number("none"), None);
        assert_eq!(clean_number("1.2.3"), None);
    }

    #[test]
    fn normalize_value_keeps_text() {
        assert_eq!(normalize_value(" 1,234 "), json!(1234));
        assert_eq!(normalize_value("12.5%"), json!(12.5));
        assert_eq!(normalize_value("-3"), json!(-3));
        assert_eq!(normalize_value("Fire 20"), json!("Fire 20"));
    }

    #[test]
    fn snake_case_collapses_symbols() {
        assert_eq!(snake_case("P. Atk."), "p_atk");
        assert_eq!(snake_case("Can it be used at the Olympiad?"), "can_it_be_used_at_the_olympiad");
        assert_eq!(snake_case("Шанс"), "");
    }

    #[test]
    fn grade_suffixes() {
        assert_eq!(strip_grade_suffix("Draconic Bow S", "S"), "Draconic Bow");
        assert_eq!(strip_grade_suffix("Draconic Bow", ""), "Draconic Bow");
        assert_eq!(strip_trailing_grade("Tallum BladeA"), "Tallum BladeA");
        assert_eq!(strip_trailing_grade("Tallum Blade A"), "Tallum Blade");
    }

    #[test]
    fn ids_and_slugs() {
        assert_eq!(icon_basename("/icon64/skill0001.png?3"), "skill0001");
        assert_eq!(icon_basename("weapon_sword"), "weapon_sword");
        assert_eq!(entity_id("/npc/20001-gremlin/lu4", "npc"), Some(20001));
        assert_eq!(entity_id("/item/57/lu4", "item"), Some(57));
        assert_eq!(entity_id("/item/x", "item"), None);
        assert_eq!(item_slug("https://wiki.mw2.wiki/item/57-adena/lu4"), "57-adena");
        assert_eq!(item_slug("https://wiki.mw2.wiki/search").len(), 64);
    }

    #[test]
    fn quest_slug_drops_punctuation() {
        assert_eq!(quest_slug("Trial of the Challenger"), "trial-of-the-challenger");
        assert_eq!(quest_slug("Spirit's Call!"), "spirits-call");
        assert_eq!(quest_slug("Café Étude"), "cafe-etude");
    }

    #[test]
    fn cache_names() {
        assert_eq!(safe_name("Power Strike (Lv. 2)"), "power_strike_lv_2");
        assert_eq!(safe_filename("Dark Elf"), "Dark_Elf");
        assert_eq!(safe_filename("Orc-Mystic"), "Orc-Mystic");
    }

    #[test]
    fn levels() {
        assert_eq!(level_of("Power Strike Lv. 9"), Some(9));
        assert_eq!(strip_level("Gremlin Lv. 1"), "Gremlin");
        assert_eq!(
            level_range("20 ~ 35"),
            Some(("20".to_string(), "35".to_string()))
        );
        assert_eq!(level_range("20"), None);
    }
}
