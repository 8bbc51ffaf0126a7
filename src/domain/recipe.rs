use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeListEntry {
    pub icon: String,
    pub name: String,
    pub id: String,
    pub grade: String,
    pub link: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequiredItem {
    pub id: String,
    pub name: String,
    pub icon: String,
    pub grade: String,
    pub quantity: String,
    pub link: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropNpc {
    pub id: String,
    pub name: String,
    pub level: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeDrop {
    pub npc: DropNpc,
    pub amount: String,
    pub chance: f64,
}

/// Result block of the "Details" table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CraftDetails {
    pub craft_level: String,
    pub mp_consumption: String,
    pub result_item_name: String,
    pub result_item_grade: String,
    pub result_item_id: String,
    pub result_item_link: String,
    pub result_quantity: String,
    pub chance_of_success: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeDetails {
    pub id: String,
    pub name: String,
    pub grade: String,
    pub description: Vec<String>,
    pub price_npc: String,
    pub weight: String,
    pub olympiad_usable: String,
    pub restrictions: BTreeMap<String, bool>,
    pub required_items: Vec<RequiredItem>,
    #[serde(flatten)]
    pub craft: CraftDetails,
    pub drop_list: Vec<RecipeDrop>,
    pub spoil_list: Vec<RecipeDrop>,
}
