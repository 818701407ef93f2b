//! Extraction output models.

use serde::{Deserialize, Serialize};

use super::geometry::TableGeometry;

/// A table in header + body form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableData {
    /// Column headers, deduplicated (`h`, `h_1`, `h_2`, ...).
    pub headers: Vec<String>,
    /// Body rows.
    pub rows: Vec<Vec<String>>,
    pub row_count: usize,
    pub column_count: usize,
}

impl TableData {
    /// Build a table from a grid whose first row is the header.
    ///
    /// Returns `None` when the grid has no body rows.
    pub fn from_grid(grid: &[Vec<String>]) -> Option<Self> {
        let (header, body) = grid.split_first()?;
        if body.is_empty() {
            return None;
        }

        let headers = dedupe_headers(header);
        Some(Self {
            row_count: body.len(),
            column_count: headers.len(),
            headers,
            rows: body.to_vec(),
        })
    }
}

/// Give repeated header names a numeric suffix.
fn dedupe_headers(header: &[String]) -> Vec<String> {
    let mut seen: std::collections::HashMap<&str, usize> = std::collections::HashMap::new();
    header
        .iter()
        .map(|h| match seen.get_mut(h.as_str()) {
            Some(count) => {
                *count += 1;
                format!("{}_{}", h, count)
            }
            None => {
                seen.insert(h.as_str(), 0);
                h.clone()
            }
        })
        .collect()
}

/// Everything extracted from one page region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// File name of the source PDF.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,

    /// Page index (0-based).
    pub page_num: u32,

    /// Logical-order, normalized text; lines separated by `\n`.
    pub text: String,

    /// Table found in the region.
    pub table: Option<TableData>,

    /// Approximate cell geometry of the table grid.
    pub geometry: Option<TableGeometry>,
}

impl ExtractionResult {
    /// Result for a region that produced nothing.
    pub fn empty(page_num: u32) -> Self {
        Self {
            source_file: None,
            page_num,
            text: String::new(),
            table: None,
            geometry: None,
        }
    }

    /// Whether neither path produced anything.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.table.is_none() && self.geometry.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn grid(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|r| r.iter().map(|s| s.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_from_grid_dedupes_headers() {
        let table = TableData::from_grid(&grid(&[
            &["مبلغ", "تاریخ", "مبلغ", "مبلغ"],
            &["1", "2", "3", "4"],
        ]))
        .unwrap();

        assert_eq!(table.headers, vec!["مبلغ", "تاریخ", "مبلغ_1", "مبلغ_2"]);
        assert_eq!(table.row_count, 1);
        assert_eq!(table.column_count, 4);
    }

    #[test]
    fn test_header_only_grid_is_none() {
        assert!(TableData::from_grid(&grid(&[&["a", "b"]])).is_none());
        assert!(TableData::from_grid(&[]).is_none());
    }

    #[test]
    fn test_empty_result_serializes_nulls() {
        let json = serde_json::to_value(ExtractionResult::empty(0)).unwrap();
        assert_eq!(json["text"], "");
        assert!(json["table"].is_null());
        assert!(json["geometry"].is_null());
        assert!(json.get("source_file").is_none());
    }
}
