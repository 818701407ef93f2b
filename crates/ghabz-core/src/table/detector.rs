//! Table detection using alignment analysis.
//!
//! Words are banded into rows, each row is split into cells at wide
//! horizontal gaps, and runs of consecutive multi-cell rows become table
//! blocks. Columns of a block are found by merging the horizontal extents of
//! all its cells, so a cell that lines up with a column in any row lands in
//! that column in every row.

use tracing::{debug, trace};

use super::{TableCandidate, TableDetector};
use crate::models::config::{LayoutConfig, TableConfig};
use crate::models::geometry::BBox;
use crate::pdf::{Result, Word};
use crate::text::{Line, LineReconstructor};

/// A run of words within one row separated from its neighbours by whitespace.
#[derive(Debug, Clone)]
struct RowCell {
    text: String,
    x0: f64,
    x1: f64,
}

#[derive(Debug, Clone)]
struct Row {
    cells: Vec<RowCell>,
    top: f64,
    bottom: f64,
    bbox: Option<BBox>,
}

/// Detects tables from word alignment alone (no ruling lines needed).
#[derive(Debug, Clone)]
pub struct AlignmentTableDetector {
    rows: LineReconstructor,
    word_gap: f64,
    config: TableConfig,
}

impl AlignmentTableDetector {
    pub fn new(layout: &LayoutConfig, config: TableConfig) -> Self {
        let banding = LayoutConfig {
            line_tolerance: config.row_tolerance,
            ..layout.clone()
        };
        Self {
            rows: LineReconstructor::new(&banding),
            word_gap: layout.word_gap,
            config,
        }
    }

    fn split_row(&self, line: &Line) -> Row {
        let mut cells: Vec<RowCell> = Vec::new();
        let mut pending: Vec<Word> = Vec::new();

        for word in &line.words {
            if let Some(prev) = pending.last() {
                if word.x0 - prev.x1 > self.config.column_gap {
                    cells.push(self.make_cell(&pending, line.top));
                    pending.clear();
                }
            }
            pending.push(word.clone());
        }
        if !pending.is_empty() {
            cells.push(self.make_cell(&pending, line.top));
        }

        let bbox = line.bbox();
        Row {
            cells,
            top: bbox.map_or(line.top, |b| b.y0),
            bottom: bbox.map_or(line.top, |b| b.y1),
            bbox,
        }
    }

    fn make_cell(&self, words: &[Word], top: f64) -> RowCell {
        let line = Line {
            top,
            words: words.to_vec(),
        };
        RowCell {
            text: line.text(self.word_gap),
            x0: words.iter().map(|w| w.x0).fold(f64::INFINITY, f64::min),
            x1: words.iter().map(|w| w.x1).fold(f64::NEG_INFINITY, f64::max),
        }
    }

    /// Split rows into blocks of consecutive multi-cell rows.
    fn find_blocks(&self, rows: Vec<Row>) -> Vec<Vec<Row>> {
        let mut blocks: Vec<Vec<Row>> = Vec::new();
        let mut current: Vec<Row> = Vec::new();

        for row in rows {
            let tabular = row.cells.len() >= self.config.min_cols;
            let detached = current
                .last()
                .is_some_and(|prev| row.top - prev.bottom > self.config.block_gap);

            if !tabular || detached {
                if !current.is_empty() {
                    blocks.push(std::mem::take(&mut current));
                }
            }
            if tabular {
                current.push(row);
            }
        }
        if !current.is_empty() {
            blocks.push(current);
        }

        blocks
            .into_iter()
            .filter(|b| b.len() >= self.config.min_rows)
            .collect()
    }

    /// Lay a block out on a common column grid.
    fn build_candidate(&self, block: &[Row]) -> Option<TableCandidate> {
        let columns = column_spans(block);
        if columns.len() < self.config.min_cols {
            trace!("Block with {} columns rejected", columns.len());
            return None;
        }

        let rows: Vec<Vec<String>> = block
            .iter()
            .map(|row| {
                let mut grid = vec![String::new(); columns.len()];
                for cell in &row.cells {
                    if let Some(col) = columns
                        .iter()
                        .position(|&(x0, x1)| cell.x0 >= x0 && cell.x0 <= x1)
                    {
                        if grid[col].is_empty() {
                            grid[col] = cell.text.clone();
                        } else {
                            grid[col].push(' ');
                            grid[col].push_str(&cell.text);
                        }
                    }
                }
                grid
            })
            .collect();

        let bbox = BBox::union_all(block.iter().filter_map(|r| r.bbox));
        Some(TableCandidate::new(rows, bbox))
    }
}

impl Default for AlignmentTableDetector {
    fn default() -> Self {
        Self::new(&LayoutConfig::default(), TableConfig::default())
    }
}

/// Merge the horizontal extents of every cell into disjoint column spans.
fn column_spans(block: &[Row]) -> Vec<(f64, f64)> {
    let mut extents: Vec<(f64, f64)> = block
        .iter()
        .flat_map(|row| row.cells.iter().map(|c| (c.x0, c.x1)))
        .collect();
    extents.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut spans: Vec<(f64, f64)> = Vec::new();
    for (x0, x1) in extents {
        match spans.last_mut() {
            Some(last) if x0 <= last.1 => last.1 = last.1.max(x1),
            _ => spans.push((x0, x1)),
        }
    }
    spans
}

impl TableDetector for AlignmentTableDetector {
    fn name(&self) -> &str {
        "alignment"
    }

    fn detect(&self, words: &[Word], region: &BBox) -> Result<Vec<TableCandidate>> {
        if words.is_empty() {
            return Ok(Vec::new());
        }

        let rows: Vec<Row> = self
            .rows
            .group_lines(words)
            .iter()
            .map(|line| self.split_row(line))
            .collect();

        let candidates: Vec<TableCandidate> = self
            .find_blocks(rows)
            .iter()
            .filter_map(|block| self.build_candidate(block))
            .collect();

        debug!(
            "Alignment detector found {} table candidates in {:?}",
            candidates.len(),
            region
        );
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn word(text: &str, x0: f64, top: f64) -> Word {
        let width = 6.0 * text.chars().count() as f64;
        Word::new(text, x0, top, x0 + width, top + 10.0)
    }

    fn region() -> BBox {
        BBox::new(0.0, 0.0, 595.0, 842.0)
    }

    fn detect(words: &[Word]) -> Vec<TableCandidate> {
        AlignmentTableDetector::default().detect(words, &region()).unwrap()
    }

    #[test]
    fn test_no_words_no_tables() {
        assert!(detect(&[]).is_empty());
    }

    #[test]
    fn test_simple_grid() {
        let words = vec![
            word("Item", 50.0, 100.0),
            word("Qty", 200.0, 100.0),
            word("Price", 300.0, 100.0),
            word("Water", 50.0, 115.0),
            word("2", 200.0, 115.0),
            word("1200", 300.0, 115.0),
            word("Power", 50.0, 130.0),
            word("5", 200.0, 130.0),
            word("300", 300.0, 130.0),
        ];
        let tables = detect(&words);
        assert_eq!(tables.len(), 1);
        assert_eq!(
            tables[0].rows,
            vec![
                vec!["Item", "Qty", "Price"],
                vec!["Water", "2", "1200"],
                vec!["Power", "5", "300"],
            ]
        );
        let bbox = tables[0].bbox.unwrap();
        assert_eq!(bbox.x0, 50.0);
        assert_eq!(bbox.y0, 100.0);
        assert_eq!(bbox.y1, 140.0);
    }

    #[test]
    fn test_missing_cell_left_empty() {
        let words = vec![
            word("a", 50.0, 100.0),
            word("b", 200.0, 100.0),
            word("c", 300.0, 100.0),
            word("d", 50.0, 115.0),
            word("f", 300.0, 115.0),
        ];
        let tables = detect(&words);
        assert_eq!(tables[0].rows[1], vec!["d", "", "f"]);
    }

    #[test]
    fn test_words_close_together_share_a_cell() {
        let words = vec![
            word("Total", 50.0, 100.0),
            word("due", 84.0, 100.0),
            word("10", 300.0, 100.0),
            word("Tax", 50.0, 115.0),
            word("2", 300.0, 115.0),
        ];
        let tables = detect(&words);
        assert_eq!(tables[0].rows[0], vec!["Total due", "10"]);
    }

    #[test]
    fn test_prose_is_not_a_table() {
        let words = vec![
            word("just", 50.0, 100.0),
            word("a", 80.0, 100.0),
            word("sentence", 90.0, 100.0),
            word("another", 50.0, 115.0),
        ];
        assert!(detect(&words).is_empty());
    }

    #[test]
    fn test_blocks_split_by_prose_and_gaps() {
        let words = vec![
            word("a", 50.0, 100.0),
            word("b", 200.0, 100.0),
            word("c", 50.0, 115.0),
            word("d", 200.0, 115.0),
            word("heading", 50.0, 130.0),
            word("e", 50.0, 145.0),
            word("f", 200.0, 145.0),
            word("g", 50.0, 160.0),
            word("h", 200.0, 160.0),
            word("i", 50.0, 300.0),
            word("j", 200.0, 300.0),
        ];
        let tables = detect(&words);
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].row_count(), 2);
        assert_eq!(tables[1].rows[0], vec!["e", "f"]);
        assert_eq!(tables[1].row_count(), 2);
    }
}
