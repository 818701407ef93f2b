//! Approximate cell geometry for a table grid.
//!
//! The table bbox is divided uniformly: every column gets the same width and
//! every row the same height. Cells of ragged rows are simply absent.

use tracing::debug;

use crate::models::config::GeometryConfig;
use crate::models::geometry::{BBox, Cell, TableGeometry};

/// Builds [`TableGeometry`] from a grid and the table's bounding box.
#[derive(Debug, Clone)]
pub struct GeometryEstimator {
    config: GeometryConfig,
}

impl GeometryEstimator {
    pub fn new(config: GeometryConfig) -> Self {
        Self { config }
    }

    /// Estimate geometry, `None` for an empty grid.
    pub fn estimate(&self, grid: &[Vec<String>], bbox: &BBox) -> Option<TableGeometry> {
        let num_rows = grid.len();
        let num_cols = grid.iter().map(Vec::len).max().unwrap_or(0);
        if num_rows == 0 || num_cols == 0 {
            return None;
        }

        let cell_width = bbox.width() / num_cols as f64;
        let cell_height = bbox.height() / num_rows as f64;

        if cell_width < self.config.min_cell_width || cell_height < self.config.min_cell_height {
            debug!(
                "Estimated cells of {:.1}x{:.1} are below the {:.1}x{:.1} minimum",
                cell_width, cell_height, self.config.min_cell_width, self.config.min_cell_height
            );
        }

        let cells = if self.config.extract_cell_bounds {
            grid.iter()
                .enumerate()
                .flat_map(|(row, values)| {
                    values.iter().enumerate().map(move |(col, text)| Cell {
                        row,
                        col,
                        x0: bbox.x0 + col as f64 * cell_width,
                        y0: bbox.y0 + row as f64 * cell_height,
                        x1: bbox.x0 + (col + 1) as f64 * cell_width,
                        y1: bbox.y0 + (row + 1) as f64 * cell_height,
                        text: text.clone(),
                        rowspan: 1,
                        colspan: 1,
                    })
                })
                .collect()
        } else {
            Vec::new()
        };

        Some(TableGeometry {
            num_rows,
            num_cols,
            bbox: *bbox,
            cells,
        })
    }
}

impl Default for GeometryEstimator {
    fn default() -> Self {
        Self::new(GeometryConfig::default())
    }
}
