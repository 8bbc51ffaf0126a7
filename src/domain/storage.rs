use super::{ClassTree, RunManifest};
use crate::error::Result;
use std::path::PathBuf;

/// Address of one cached HTML page: `<cache>/<kind>/<chronicle>/<key>.html`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageKey {
    pub kind: &'static str,
    pub chronicle: String,
    pub key: String,
}

impl PageKey {
    pub fn new(kind: &'static str, chronicle: &str, key: impl Into<String>) -> Self {
        Self {
            kind,
            chronicle: chronicle.to_string(),
            key: key.into(),
        }
    }
}

pub trait Storage: Send + Sync {
    fn load_page(&self, key: &PageKey) -> Result<Option<String>>;
    fn save_page(&self, key: &PageKey, html: &str) -> Result<()>;
    /// Deletes cached pages under `kind/chronicle` whose body matches.
    fn purge_pages(&self, kind: &str, chronicle: &str, matches: &dyn Fn(&str) -> bool)
        -> Result<usize>;
    /// `key` is one of the class tree stems in [`StorageKeys`].
    fn load_class_tree(&self, key: &str, chronicle: &str) -> Result<Option<ClassTree>>;
    fn save_class_tree(&self, key: &str, chronicle: &str, tree: &ClassTree) -> Result<()>;
    fn save_manifest(&self, stem: &str, manifest: &RunManifest) -> Result<()>;
    /// Path of an output file inside the data directory.
    fn data_path(&self, name: &str) -> PathBuf;
}

pub struct StorageKeys;

impl StorageKeys {
    // Page cache kinds
    pub const ITEM_DETAILS: &'static str = "item_details";
    pub const NPC_DETAILS: &'static str = "npc_details";
    pub const QUEST_DETAILS: &'static str = "quest_details";
    pub const RECIPE_DETAILS: &'static str = "recipe_details";
    pub const SKILL_DETAILS: &'static str = "skills_details";
    pub const CLASS_DETAILS: &'static str = "classes_details";
    pub const CLASS_SKILLS: &'static str = "classes_skills";

    // Data directory layout
    pub const MANIFESTS_DIR: &'static str = "manifests";
    pub const ICONS_DIR: &'static str = "icons";
    pub const SPLIT_DIR: &'static str = "splited";
    pub const CLASS_TREE: &'static str = "class_tree";
    pub const CLASS_SKILLS_TREE: &'static str = "races_classes_skills";
}
