//! Table path: detection, candidate selection and cell geometry.
//!
//! Detection sits behind the [`TableDetector`] trait so the default
//! alignment-based detector can be swapped for another backend without
//! touching the orchestrator.

mod detector;
mod geometry;
mod selector;

pub use detector::AlignmentTableDetector;
pub use geometry::GeometryEstimator;
pub use selector::{Selection, TableCandidateSelector};

use crate::models::geometry::BBox;
use crate::pdf::{Result, Word};

/// A table found by a detector: rows of cell strings plus its extent.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TableCandidate {
    /// Cell text, row by row; rows may be ragged.
    pub rows: Vec<Vec<String>>,
    /// Bounding box reported by the detector, if known.
    pub bbox: Option<BBox>,
}

impl TableCandidate {
    pub fn new(rows: Vec<Vec<String>>, bbox: Option<BBox>) -> Self {
        Self { rows, bbox }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// Trait for table detection backends.
pub trait TableDetector: Send + Sync {
    /// Short backend name used in diagnostics.
    fn name(&self) -> &str;

    /// Find table candidates among the words of a region, top to bottom.
    ///
    /// # Arguments
    /// * `words` - Words already filtered to the region
    /// * `region` - The region in top-left page space
    fn detect(&self, words: &[Word], region: &BBox) -> Result<Vec<TableCandidate>>;
}
