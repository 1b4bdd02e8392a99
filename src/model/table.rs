//! Table types.

use serde::{Deserialize, Serialize};

/// A table as a row-major grid of cell strings.
///
/// Row and column counts are derived from the grid when the table is
/// built. Rows are not padded, so a row may be shorter than
/// `column_count`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredTable")]
pub struct Table {
    id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    page_number: Option<u32>,
    row_count: usize,
    column_count: usize,
    data: Vec<Vec<String>>,
}

#[derive(Deserialize)]
struct StoredTable {
    id: String,
    #[serde(default)]
    page_number: Option<u32>,
    data: Vec<Vec<String>>,
}

impl From<StoredTable> for Table {
    fn from(stored: StoredTable) -> Self {
        Self::new(stored.id, stored.page_number, stored.data)
    }
}

impl Table {
    /// Create a table from its cell grid.
    pub fn new(id: impl Into<String>, page_number: Option<u32>, data: Vec<Vec<String>>) -> Self {
        let row_count = data.len();
        let column_count = data.first().map(|r| r.len()).unwrap_or(0);
        Self {
            id: id.into(),
            page_number,
            row_count,
            column_count,
            data,
        }
    }

    /// Table identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Originating page (PDF only).
    pub fn page_number(&self) -> Option<u32> {
        self.page_number
    }

    /// Get the number of rows.
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Get the number of columns (based on first row).
    pub fn column_count(&self) -> usize {
        self.column_count
    }

    /// Row-major cell grid.
    pub fn data(&self) -> &[Vec<String>] {
        &self.data
    }

    /// Get a cell by row and column index.
    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.data.get(row)?.get(col).map(|s| s.as_str())
    }

    /// Check if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Whether every row has `column_count` cells.
    pub fn is_rectangular(&self) -> bool {
        self.data.iter().all(|r| r.len() == self.column_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_counts_follow_grid() {
        let table = Table::new("table-1", None, grid(&[&["Name", "Age"], &["Alice", "30"]]));
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.column_count(), 2);
        assert_eq!(table.cell(1, 0), Some("Alice"));
        assert!(table.is_rectangular());
    }

    #[test]
    fn test_short_rows_not_padded() {
        let table = Table::new("pdf-table-1-1", Some(1), grid(&[&["a", "b", "c"], &["d"]]));
        assert_eq!(table.column_count(), 3);
        assert_eq!(table.data()[1].len(), 1);
        assert!(!table.is_rectangular());
        assert_eq!(table.cell(1, 2), None);
    }

    #[test]
    fn test_page_number_omitted_for_docx() {
        let table = Table::new("table-1", None, grid(&[&["x"]]));
        let json = serde_json::to_string(&table).unwrap();
        assert!(!json.contains("page_number"));
        assert!(json.contains("\"row_count\":1"));
    }

    #[test]
    fn test_counts_derived_when_read_back() {
        let json = r#"{"id":"table-1","row_count":7,"column_count":9,"data":[["a","b"]]}"#;
        let table: Table = serde_json::from_str(json).unwrap();
        assert_eq!(table.row_count(), 1);
        assert_eq!(table.column_count(), 2);
    }
}
