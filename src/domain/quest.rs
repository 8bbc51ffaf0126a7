use super::npc::SpawnPoint;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestListEntry {
    #[serde(rename = "ID")]
    pub id: Option<String>,
    #[serde(rename = "Name")]
    pub name: Option<String>,
    #[serde(rename = "LevelMin")]
    pub level_min: Option<String>,
    #[serde(rename = "LevelMax")]
    pub level_max: Option<String>,
    #[serde(rename = "Link")]
    pub link: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestReward {
    pub name: String,
    pub icon: String,
    pub grade: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepNpc {
    pub id: Option<String>,
    pub name: Option<String>,
    pub additional: Option<String>,
    pub icon: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepItem {
    pub id: Option<String>,
    pub name: Option<String>,
    pub icon: Option<String>,
    pub grade: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestStep {
    pub number: usize,
    pub title: String,
    pub description: String,
    pub npc: Option<StepNpc>,
    pub item: Option<StepItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestDetails {
    pub id: Option<String>,
    pub name: String,
    pub description: String,
    pub start_npc_id: Option<String>,
    pub start_npc_name: Option<String>,
    pub start_npc_additional: Option<String>,
    pub start_npc_icon: Option<String>,
    pub location: Vec<SpawnPoint>,
    pub level_min: Option<String>,
    pub level_max: Option<String>,
    pub rewards: Vec<QuestReward>,
    pub steps: Vec<QuestStep>,
    pub chronicle: String,
    pub link: String,
}
