//! Page-space geometry: boxes, table cells and table geometry.
//!
//! All coordinates are PDF points with the origin at the top-left corner of
//! the page and y growing downward.

use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle `(x0, y0, x1, y1)`.
///
/// Serialized as a four-element array.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct BBox {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl BBox {
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Get the width of the box.
    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    /// Get the height of the box.
    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    /// Whether the box has no area.
    pub fn is_empty(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }

    /// Smallest box containing both boxes.
    pub fn union(&self, other: &BBox) -> BBox {
        BBox {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    /// Whether `other` lies entirely inside this box (edges inclusive).
    pub fn contains(&self, other: &BBox) -> bool {
        self.x0 <= other.x0 && other.x1 <= self.x1 && self.y0 <= other.y0 && other.y1 <= self.y1
    }

    /// Whether the two boxes share any area.
    pub fn overlaps(&self, other: &BBox) -> bool {
        self.x0 < other.x1 && self.x1 > other.x0 && self.y0 < other.y1 && self.y1 > other.y0
    }

    /// Overlapping part of two boxes, `None` when they are disjoint.
    pub fn intersect(&self, other: &BBox) -> Option<BBox> {
        if !self.overlaps(other) {
            return None;
        }
        Some(BBox {
            x0: self.x0.max(other.x0),
            y0: self.y0.max(other.y0),
            x1: self.x1.min(other.x1),
            y1: self.y1.min(other.y1),
        })
    }

    /// Clamp this box into `bounds`, keeping `x0 <= x1` and `y0 <= y1`.
    pub fn clamp_to(&self, bounds: &BBox) -> BBox {
        let x0 = self.x0.clamp(bounds.x0, bounds.x1);
        let y0 = self.y0.clamp(bounds.y0, bounds.y1);
        let x1 = self.x1.clamp(x0, bounds.x1.max(x0));
        let y1 = self.y1.clamp(y0, bounds.y1.max(y0));
        BBox { x0, y0, x1, y1 }
    }

    /// Union of an iterator of boxes, `None` when empty.
    pub fn union_all<I>(boxes: I) -> Option<BBox>
    where
        I: IntoIterator<Item = BBox>,
    {
        boxes.into_iter().reduce(|acc, b| acc.union(&b))
    }
}

impl From<[f64; 4]> for BBox {
    fn from(v: [f64; 4]) -> Self {
        BBox::new(v[0], v[1], v[2], v[3])
    }
}

impl From<BBox> for [f64; 4] {
    fn from(b: BBox) -> Self {
        [b.x0, b.y0, b.x1, b.y1]
    }
}

impl std::str::FromStr for BBox {
    type Err = String;

    /// Parse `"x0,y0,x1,y1"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<f64> = s
            .split(',')
            .map(|p| p.trim().parse::<f64>().map_err(|e| format!("{}: {}", p.trim(), e)))
            .collect::<Result<_, _>>()?;

        match parts.as_slice() {
            [x0, y0, x1, y1] if x0 <= x1 && y0 <= y1 => Ok(BBox::new(*x0, *y0, *x1, *y1)),
            [_, _, _, _] => Err(format!("inverted box: {}", s)),
            _ => Err(format!("expected x0,y0,x1,y1 but got {} values", parts.len())),
        }
    }
}

fn is_one(v: &usize) -> bool {
    *v == 1
}

fn one() -> usize {
    1
}

/// A table cell with estimated geometry and content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    /// Row index (0-based).
    pub row: usize,
    /// Column index (0-based).
    pub col: usize,
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
    /// Normalized cell text.
    pub text: String,
    /// Number of rows this cell spans.
    #[serde(default = "one", skip_serializing_if = "is_one")]
    pub rowspan: usize,
    /// Number of columns this cell spans.
    #[serde(default = "one", skip_serializing_if = "is_one")]
    pub colspan: usize,
}

impl Cell {
    /// Get the cell bounding box.
    pub fn bbox(&self) -> BBox {
        BBox::new(self.x0, self.y0, self.x1, self.y1)
    }
}

/// Estimated geometry of a detected table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableGeometry {
    pub num_rows: usize,
    pub num_cols: usize,
    /// Bounding box of the whole table.
    pub bbox: BBox,
    pub cells: Vec<Cell>,
}

impl TableGeometry {
    /// Get the cell at a grid position.
    pub fn cell_at(&self, row: usize, col: usize) -> Option<&Cell> {
        self.cells.iter().find(|c| {
            row >= c.row && row < c.row + c.rowspan && col >= c.col && col < c.col + c.colspan
        })
    }
}
