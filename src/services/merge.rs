use crate::error::{Result, ScrapeError};
use crate::infrastructure::export::{Table, TableFormat};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::info;
use walkdir::WalkDir;

#[derive(Debug, PartialEq, Eq)]
pub struct MergeReport {
    pub files: usize,
    pub rows_before: usize,
    pub rows_after: usize,
    pub output: PathBuf,
}

/// `<stem>…_checkpoint….tsv` files directly inside `dir`, sorted by name.
fn checkpoint_files(dir: &Path, stem: &str) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            let name = e.file_name().to_string_lossy();
            name.starts_with(stem) && name.contains("_checkpoint") && name.ends_with(".tsv")
        })
        .map(|e| e.into_path())
        .collect();
    files.sort();
    files
}

/// Concatenates the checkpoint tables and keeps the last row per `key`.
pub fn merge_checkpoints(dir: &Path, stem: &str, key: &str) -> Result<MergeReport> {
    let files = checkpoint_files(dir, stem);
    if files.is_empty() {
        return Err(ScrapeError::NotFound(format!(
            "no {stem}*_checkpoint*.tsv files in {}",
            dir.display()
        )));
    }

    let mut columns: Vec<String> = Vec::new();
    let mut rows: Vec<HashMap<String, String>> = Vec::new();
    for file in &files {
        let table = Table::read(file, TableFormat::Tsv)?;
        info!("{}: {} rows", file.display(), table.len());
        for column in &table.columns {
            if !columns.contains(column) {
                columns.push(column.clone());
            }
        }
        rows.extend(
            table
                .rows
                .into_iter()
                .map(|row| table.columns.iter().cloned().zip(row).collect()),
        );
    }

    if !columns.iter().any(|c| c == key) {
        return Err(ScrapeError::Parse(format!("checkpoints have no `{key}` column")));
    }

    let rows_before = rows.len();
    let mut last_seen: HashMap<String, usize> = HashMap::new();
    for (i, row) in rows.iter().enumerate() {
        last_seen.insert(row.get(key).cloned().unwrap_or_default(), i);
    }

    let merged = Table {
        rows: rows
            .iter()
            .enumerate()
            .filter(|(i, row)| last_seen.get(row.get(key).map_or("", String::as_str)) == Some(i))
            .map(|(_, row)| {
                columns
                    .iter()
                    .map(|c| row.get(c).cloned().unwrap_or_default())
                    .collect()
            })
            .collect(),
        columns,
    };

    let output = dir.join(format!("{stem}_merged.tsv"));
    merged.write(&output, TableFormat::Tsv)?;

    info!("Rows before merge: {rows_before}");
    info!(
        "Unique rows after merge: {} ({} duplicates removed)",
        merged.len(),
        rows_before - merged.len()
    );

    Ok(MergeReport {
        files: files.len(),
        rows_before,
        rows_after: merged.len(),
        output,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn keeps_the_last_row_per_key() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("items_details_lu4_checkpoint_from0.tsv"),
            "item_id\tname\n1\tSword\n2\tShield\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("items_details_lu4_checkpoint_from100.tsv"),
            "item_id\tname\tweight\n2\tTower Shield\t1500\n3\tBow\t900\n",
        )
        .unwrap();
        fs::write(dir.path().join("items_details_lu4.tsv"), "item_id\n9\n").unwrap();

        let report = merge_checkpoints(dir.path(), "items_details", "item_id").unwrap();
        assert_eq!(report.files, 2);
        assert_eq!(report.rows_before, 4);
        assert_eq!(report.rows_after, 3);

        let merged = Table::read(&report.output, TableFormat::Tsv).unwrap();
        assert_eq!(merged.columns, ["item_id", "name", "weight"]);
        assert_eq!(
            merged.rows,
            [
                ["1", "Sword", ""],
                ["2", "Tower Shield", "1500"],
                ["3", "Bow", "900"],
            ]
        );
    }

    #[test]
    fn missing_checkpoints_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            merge_checkpoints(dir.path(), "items_details", "item_id"),
            Err(ScrapeError::NotFound(_))
        ));
    }
}
