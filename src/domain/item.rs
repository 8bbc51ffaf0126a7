use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;

/// Row of the item search listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemListEntry {
    pub id: String,
    pub name: String,
    pub icon: String,
    pub grade: String,
    pub link: String,
    #[serde(default)]
    pub chronicle: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecipe {
    pub recipe_id: Option<u64>,
    pub recipe_name: Option<String>,
    pub recipe_icon: Option<String>,
    pub recipe_grade: Option<String>,
    pub recipe_chance: Option<u32>,
    pub recipe_link: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemSkill {
    pub id: Option<u64>,
    pub name: String,
    pub icon: Option<String>,
    pub level: Option<u32>,
    pub link: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DescriptionEffect {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub description: String,
}

/// Effects listed under one `<Header>` line of an item description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DescriptionBlock {
    pub stat_type: String,
    pub list: Vec<DescriptionEffect>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDrop {
    pub npc_id: Option<u64>,
    pub npc_name: Option<String>,
    pub npc_level: Option<u32>,
    pub npc_link: Option<String>,
    pub amount: Option<String>,
    pub chance: Option<Number>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrystalRow {
    pub modification: Option<Number>,
    pub crystallization: Option<Number>,
    pub fail: Option<Number>,
}

/// Quest that rewards or requires the item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestReference {
    pub quest_id: Option<u64>,
    pub quest_name: String,
    pub quest_link: Option<String>,
    pub level_min: Option<Number>,
    pub level_max: Option<Number>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainedItem {
    pub id: Option<u64>,
    pub name: Option<String>,
    pub grade: Option<String>,
    pub icon: Option<String>,
    pub chance: Option<Number>,
    pub link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AugmentationItem {
    pub id: Option<u64>,
    pub name: Option<String>,
    pub icon: Option<String>,
    pub link: String,
    pub effect: Option<String>,
    pub grade: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrystalMaterial {
    pub id: Option<u64>,
    pub name: Option<String>,
    pub icon: Option<String>,
    pub link: String,
    pub grade: Option<String>,
    pub amount: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoulCrystal {
    pub augmentation_item: AugmentationItem,
    pub materials: Vec<CrystalMaterial>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemSet {
    pub set_id: Option<u64>,
    pub set_name: Option<String>,
    pub set_icon: Option<String>,
    pub set_grade: Option<String>,
    pub set_class: Option<String>,
    pub set_full_link: String,
    pub pvp: bool,
}

impl ItemSet {
    pub fn is_blank(&self) -> bool {
        self.set_id.is_none()
            && self.set_name.as_deref().map_or(true, |n| n.trim().is_empty())
            && self.set_icon.is_none()
            && self.set_grade.is_none()
    }
}

/// One parsed item detail page. `stats` carries the open-ended stat
/// columns and is flattened into the row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDetails {
    pub item_id: String,
    pub item_name: Option<String>,
    pub item_grade: Option<String>,
    pub item_icon: Option<String>,
    pub item_description: Option<String>,
    pub item_description_json: Vec<DescriptionBlock>,
    pub item_skills: Vec<ItemSkill>,
    pub item_set: Vec<ItemSet>,
    pub chronicle: Option<String>,
    #[serde(flatten)]
    pub stats: Map<String, Value>,
    pub recipes: Vec<ItemRecipe>,
    pub link: String,
    pub restrictions: BTreeMap<String, bool>,
    pub drops: Vec<ItemDrop>,
    pub quest_rewards: Vec<QuestReference>,
    pub quest_goal: Vec<QuestReference>,
    pub contained: Vec<ContainedItem>,
    pub crystals: Vec<CrystalRow>,
    pub soul_crystals: Vec<SoulCrystal>,
}

/// Columns exported as whole numbers, with 0 meaning "no value".
pub const ITEM_NUMERIC_COLUMNS: &[&str] = &[
    "item_id",
    "p_atk",
    "m_atk",
    "selling_price_npc",
    "weight",
    "mp_consume",
    "p_def",
    "m_def",
    "crit_rate",
    "accuracy",
    "evasion",
    "shield_defence_value",
    "shield_defence_percent",
    "shield_rate",
    "chance_of_phys_crit_atk",
    "soulshot_consumption",
    "spiritshot_consumption",
];
