use crate::error::AppError;
use serde::Serialize;
use std::path::Path;
use tabled::{settings::Style, Table, Tabled};

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), AppError> {
    let mut wtr = csv::Writer::from_path(path).map_err(|e| AppError::Output(e.to_string()))?;
    for r in rows {
        wtr.serialize(r).map_err(|e| AppError::Output(e.to_string()))?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), AppError> {
    let s = serde_json::to_string_pretty(value).map_err(|e| AppError::Output(e.to_string()))?;
    std::fs::write(path, s)?;
    Ok(())
}

/// Markdown table of at most `max_rows` rows, or `(sin filas)` when empty.
pub fn markdown_table<T>(rows: &[T], max_rows: usize) -> String
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().take(max_rows).cloned().collect();
    if slice.is_empty() {
        return "(sin filas)".to_string();
    }
    Table::new(slice).with(Style::markdown()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabled::Tabled;

    #[derive(Debug, Clone, Serialize, Tabled)]
    struct Row {
        #[serde(rename = "Ciudad")]
        #[tabled(rename = "Ciudad")]
        city: &'static str,
        #[serde(rename = "Casos")]
        #[tabled(rename = "Casos")]
        cases: u32,
    }

    fn rows() -> Vec<Row> {
        vec![
            Row { city: "Cali", cases: 3 },
            Row { city: "Pasto", cases: 9 },
        ]
    }

    #[test]
    fn csv_uses_renamed_headers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        write_csv(&path, &rows()).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "Ciudad,Casos\nCali,3\nPasto,9\n");
    }

    #[test]
    fn json_is_pretty_printed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        write_json(&path, &serde_json::json!({"a": 1})).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{\n  \"a\": 1\n}");
    }

    #[test]
    fn table_is_truncated_and_handles_empty() {
        let text = markdown_table(&rows(), 1);
        assert!(text.contains("Cali"));
        assert!(!text.contains("Pasto"));
        assert_eq!(markdown_table::<Row>(&[], 5), "(sin filas)");
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no/such/dir/out.csv");
        assert!(write_csv(&path, &rows()).is_err());
    }
}
