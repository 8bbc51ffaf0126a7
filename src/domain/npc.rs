use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NpcListEntry {
    pub name: String,
    pub level: u32,
    pub url: String,
}

/// Drop or spoil line. `group_chance_percent` comes from the last
/// "Group chance" row seen above it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NpcDrop {
    pub id: Option<String>,
    pub name: String,
    pub grade: String,
    pub url: String,
    pub icon: Option<String>,
    pub amount: Value,
    pub chance_percent: Value,
    pub group_chance_percent: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NpcSkill {
    pub id: Option<String>,
    pub name: String,
    pub url: String,
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnPoint {
    pub top: f64,
    pub left: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NpcDetails {
    pub npc_id: Option<u64>,
    pub chronicle: String,
    pub name: String,
    pub url: String,
    pub title: String,
    pub icon_url: String,
    #[serde(flatten)]
    pub stats: Map<String, Value>,
    pub drops: Vec<NpcDrop>,
    pub spoils: Vec<NpcDrop>,
    pub skills: Vec<NpcSkill>,
    pub map_image: String,
    pub spawn_points: Vec<SpawnPoint>,
}
