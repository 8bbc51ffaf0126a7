use crate::domain::storage::{PageKey, Storage, StorageKeys};
use crate::domain::{ClassTree, RunManifest};
use crate::error::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

#[derive(Clone)]
pub struct FileSystemStore {
    data_dir: PathBuf,
    cache_dir: PathBuf,
}

impl FileSystemStore {
    pub fn new(data_dir: impl Into<PathBuf>, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            cache_dir: cache_dir.into(),
        }
    }

    fn page_path(&self, key: &PageKey) -> PathBuf {
        self.cache_dir
            .join(key.kind)
            .join(&key.chronicle)
            .join(format!("{}.html", key.key))
    }

    fn json_path(&self, name: &str, subdir: Option<&str>) -> PathBuf {
        match subdir {
            Some(dir) => self.data_dir.join(dir).join(format!("{name}.json")),
            None => self.data_dir.join(format!("{name}.json")),
        }
    }

    fn ensure_dir(&self, dir: &Path) -> Result<()> {
        if !dir.exists() {
            fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    fn write_json_file<T: serde::Serialize + ?Sized>(
        &self,
        name: &str,
        subdir: Option<&str>,
        data: &T,
    ) -> Result<()> {
        let path = self.json_path(name, subdir);
        if let Some(parent) = path.parent() {
            self.ensure_dir(parent)?;
        }

        let content = serde_json::to_string_pretty(data)?;
        fs::write(path, content)?;
        Ok(())
    }

    fn read_json_file<T: serde::de::DeserializeOwned>(
        &self,
        name: &str,
        subdir: Option<&str>,
    ) -> Result<Option<T>> {
        let path = self.json_path(name, subdir);
        if path.exists() {
            let content = fs::read_to_string(path)?;
            Ok(Some(serde_json::from_str(&content)?))
        } else {
            Ok(None)
        }
    }
}

impl Storage for FileSystemStore {
    fn load_page(&self, key: &PageKey) -> Result<Option<String>> {
        let path = self.page_path(key);
        if !path.exists() {
            return Ok(None);
        }
        // Pages are not always valid UTF-8; keep what we can read.
        let bytes = fs::read(&path)?;
        Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
    }

    fn save_page(&self, key: &PageKey, html: &str) -> Result<()> {
        let path = self.page_path(key);
        if let Some(parent) = path.parent() {
            self.ensure_dir(parent)?;
        }
        fs::write(path, html)?;
        Ok(())
    }

    fn purge_pages(
        &self,
        kind: &str,
        chronicle: &str,
        matches: &dyn Fn(&str) -> bool,
    ) -> Result<usize> {
        let dir = self.cache_dir.join(kind).join(chronicle);
        if !dir.exists() {
            return Ok(0);
        }

        let mut removed = 0;
        for entry in WalkDir::new(&dir).into_iter().filter_map(|e| e.ok()) {
            let path = entry.path();
            let is_page = path.extension().and_then(|e| e.to_str()) == Some("html");
            if !entry.file_type().is_file() || !is_page {
                continue;
            }
            let body = String::from_utf8_lossy(&fs::read(path)?).into_owned();
            if matches(&body) {
                fs::remove_file(path)?;
                debug!("Purged cached page {}", path.display());
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn load_class_tree(&self, key: &str, chronicle: &str) -> Result<Option<ClassTree>> {
        self.read_json_file(&format!("{key}_{chronicle}"), None)
    }

    fn save_class_tree(&self, key: &str, chronicle: &str, tree: &ClassTree) -> Result<()> {
        self.write_json_file(&format!("{key}_{chronicle}"), None, tree)
    }

    fn save_manifest(&self, stem: &str, manifest: &RunManifest) -> Result<()> {
        self.write_json_file(stem, Some(StorageKeys::MANIFESTS_DIR), manifest)
    }

    fn data_path(&self, name: &str) -> PathBuf {
        self.data_dir.join(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Chronicle, Race};
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> FileSystemStore {
        FileSystemStore::new(dir.path().join("data"), dir.path().join("cache"))
    }

    #[test]
    fn pages_live_under_kind_and_chronicle() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let key = PageKey::new(StorageKeys::NPC_DETAILS, "lu4", "20001-gremlin");

        assert_eq!(store.load_page(&key).unwrap(), None);
        store.save_page(&key, "<html>gremlin</html>").unwrap();

        let expected = dir.path().join("cache/npc_details/lu4/20001-gremlin.html");
        assert!(expected.exists());
        assert_eq!(
            store.load_page(&key).unwrap().as_deref(),
            Some("<html>gremlin</html>")
        );
    }

    #[test]
    fn purge_only_touches_matching_pages() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let kind = StorageKeys::CLASS_SKILLS;
        store
            .save_page(&PageKey::new(kind, "lu4", "class_warrior"), "429 Too Many Requests")
            .unwrap();
        store
            .save_page(&PageKey::new(kind, "lu4", "class_knight"), "<p>By levels</p>")
            .unwrap();
        store
            .save_page(&PageKey::new(kind, "eternal", "class_warrior"), "429 Too Many Requests")
            .unwrap();

        let removed = store
            .purge_pages(kind, "lu4", &|body| body.contains("429"))
            .unwrap();
        assert_eq!(removed, 1);
        assert!(store
            .load_page(&PageKey::new(kind, "lu4", "class_knight"))
            .unwrap()
            .is_some());
        assert!(store
            .load_page(&PageKey::new(kind, "eternal", "class_warrior"))
            .unwrap()
            .is_some());
        assert_eq!(store.purge_pages(kind, "interlude", &|_| true).unwrap(), 0);
    }

    #[test]
    fn class_tree_and_manifest_are_json() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let tree = ClassTree {
            races: vec![Race {
                name: "Orc".into(),
                icon: String::new(),
                subtypes: Vec::new(),
            }],
        };

        assert!(store.load_class_tree(StorageKeys::CLASS_TREE, "lu4").unwrap().is_none());
        store.save_class_tree(StorageKeys::CLASS_TREE, "lu4", &tree).unwrap();
        assert_eq!(
            store.load_class_tree(StorageKeys::CLASS_TREE, "lu4").unwrap(),
            Some(tree)
        );

        let manifest = RunManifest::new("npcs", &Chronicle::from_server(10), 3, "npcs.tsv".into());
        store.save_manifest("npcs_details_lu4", &manifest).unwrap();
        assert!(dir.path().join("data/manifests/npcs_details_lu4.json").exists());
    }
}
