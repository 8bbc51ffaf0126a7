use crate::error::{Result, ScrapeError};
use csv::{QuoteStyle, ReaderBuilder, WriterBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Tsv,
    Csv,
}

impl TableFormat {
    pub fn delimiter(self) -> u8 {
        match self {
            TableFormat::Tsv => b'\t',
            TableFormat::Csv => b',',
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            TableFormat::Tsv => "tsv",
            TableFormat::Csv => "csv",
        }
    }
}

/// How record values become cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cells {
    /// Null is an empty cell.
    Plain,
    /// Null and empty lists or objects are written as `Null`.
    NullMarker,
    /// Like `Plain`, with strings trimmed and tabs and newlines flattened
    /// so the table can be written without quoting.
    Sanitized,
}

impl Cells {
    fn render(self, value: &Value) -> String {
        match (self, value) {
            (Cells::NullMarker, Value::Null) => "Null".to_string(),
            (Cells::NullMarker, Value::Array(a)) if a.is_empty() => "Null".to_string(),
            (Cells::NullMarker, Value::Object(o)) if o.is_empty() => "Null".to_string(),
            (_, Value::Null) => String::new(),
            (Cells::Sanitized, Value::String(s)) => flatten_whitespace(s.trim()),
            (_, Value::String(s)) => s.clone(),
            (_, Value::Number(n)) => n.to_string(),
            (_, Value::Bool(b)) => b.to_string(),
            (Cells::Sanitized, nested) => flatten_whitespace(&nested.to_string()),
            (_, nested) => nested.to_string(),
        }
    }
}

fn flatten_whitespace(text: &str) -> String {
    text.replace(['\t', '\r', '\n'], " ")
}

/// A rectangular string table with named columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Columns are the union of every record's keys in first-seen order;
    /// nested values are JSON-encoded into one cell.
    pub fn from_records<T: Serialize>(records: &[T], cells: Cells) -> Result<Self> {
        let objects = records
            .iter()
            .map(|record| match serde_json::to_value(record)? {
                Value::Object(map) => Ok(map),
                other => Err(ScrapeError::Parse(format!(
                    "record is not an object: {other}"
                ))),
            })
            .collect::<Result<Vec<_>>>()?;

        let mut columns: Vec<String> = Vec::new();
        for map in &objects {
            for key in map.keys() {
                if !columns.contains(key) {
                    columns.push(key.clone());
                }
            }
        }

        let rows = objects
            .iter()
            .map(|map| {
                columns
                    .iter()
                    .map(|c| cells.render(map.get(c).unwrap_or(&Value::Null)))
                    .collect()
            })
            .collect();

        Ok(Self { columns, rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn write(&self, path: &Path, format: TableFormat) -> Result<()> {
        self.write_with(path, format, QuoteStyle::Necessary)
    }

    /// Writes without any quoting; cells must not contain the delimiter.
    pub fn write_unquoted(&self, path: &Path, format: TableFormat) -> Result<()> {
        self.write_with(path, format, QuoteStyle::Never)
    }

    fn write_with(&self, path: &Path, format: TableFormat, quoting: QuoteStyle) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut writer = WriterBuilder::new()
            .delimiter(format.delimiter())
            .quote_style(quoting)
            .from_path(path)?;
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Reads a table back; short rows are padded with empty cells.
    pub fn read(path: &Path, format: TableFormat) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .delimiter(format.delimiter())
            .flexible(true)
            .from_path(path)?;

        let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let mut rows = Vec::new();
        for record in reader.records() {
            let mut row: Vec<String> = record?.iter().map(str::to_string).collect();
            row.resize(columns.len(), String::new());
            rows.push(row);
        }

        Ok(Self { columns, rows })
    }
}

/// Typed rows of a list table written by an earlier stage.
pub fn read_records<T: DeserializeOwned>(path: &Path, format: TableFormat) -> Result<Vec<T>> {
    let mut reader = ReaderBuilder::new()
        .delimiter(format.delimiter())
        .from_path(path)?;

    reader
        .deserialize()
        .map(|row| row.map_err(ScrapeError::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;
    use tempfile::TempDir;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Row {
        id: u32,
        name: String,
        note: Option<String>,
    }

    #[test]
    fn columns_are_the_union_in_first_seen_order() {
        let records = vec![
            json!({"id": 1, "name": "Sword"}),
            json!({"id": 2, "weight": 1500, "tags": ["a", "b"]}),
        ];
        let table = Table::from_records(&records, Cells::Plain).unwrap();
        assert_eq!(table.columns, ["id", "name", "weight", "tags"]);
        assert_eq!(table.rows[0], ["1", "Sword", "", ""]);
        assert_eq!(table.rows[1], ["2", "", "1500", r#"["a","b"]"#]);
    }

    #[test]
    fn null_marker_covers_empty_collections() {
        let records = vec![json!({"a": null, "b": [], "c": {}, "d": [1], "e": ""})];
        let table = Table::from_records(&records, Cells::NullMarker).unwrap();
        assert_eq!(table.rows[0], ["Null", "Null", "Null", "[1]", ""]);
    }

    #[test]
    fn sanitized_cells_have_no_tabs() {
        let records = vec![json!({"title": "  Gate\tKeeper \n", "n": 3})];
        let table = Table::from_records(&records, Cells::Sanitized).unwrap();
        assert_eq!(table.rows[0], ["Gate Keeper", "3"]);
    }

    #[test]
    fn tsv_round_trips_through_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out/rows.tsv");
        let rows = vec![
            Row { id: 7, name: "Adena".into(), note: None },
            Row { id: 8, name: "Soulshot, D".into(), note: Some("x".into()) },
        ];

        Table::from_records(&rows, Cells::Plain)
            .unwrap()
            .write(&path, TableFormat::Tsv)
            .unwrap();

        let back: Vec<Row> = read_records(&path, TableFormat::Tsv).unwrap();
        assert_eq!(back, rows);

        let table = Table::read(&path, TableFormat::Tsv).unwrap();
        assert_eq!(table.column("note"), Some(2));
        assert_eq!(table.len(), 2);
    }
}
