use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillListEntry {
    pub skill_id: String,
    pub skill_name: String,
    pub skill_icon: String,
    pub skill_link: String,
    pub chronicle: String,
    /// Only present in lists produced from the class skill summaries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skill_icon_panel: Option<String>,
}

/// Header block of a skill's main page.
#[derive(Debug, Clone, PartialEq)]
pub struct SkillMain {
    pub icon_src: String,
    pub name: String,
    pub level: String,
    pub description: String,
}

/// One level of a skill and the page that describes it.
#[derive(Debug, Clone, PartialEq)]
pub struct SkillLevelLink {
    pub level: Option<u32>,
    pub link: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsesExtra {
    pub item_id: Option<u64>,
    pub item_name: Option<String>,
    pub item_count: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailableFor {
    pub class: String,
    pub level: Option<u32>,
}

/// One output row per skill level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillLevelRecord {
    pub skill_id: Option<u64>,
    pub skill_name: String,
    pub skill_icon: String,
    pub skill_level: Option<u32>,
    pub skill_description: String,
    pub skill_link: String,
    pub chronicle: String,
    #[serde(flatten)]
    pub props: Map<String, Value>,
}
