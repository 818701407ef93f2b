//! Core library for invoice PDF region extraction.
//!
//! This crate provides:
//! - PDF access (crop boxes, positioned words) on top of lopdf and pdf-extract
//! - Reading-order line reconstruction
//! - Persian text normalization with bidi reordering
//! - Table detection, candidate reconciliation and cell geometry
//! - The region extractor tying these together

pub mod error;
pub mod extract;
pub mod models;
pub mod pdf;
pub mod table;
pub mod text;

pub use error::{GhabzError, PdfError, Result};
pub use extract::{RegionExtractor, output_base_name, save_result};
pub use models::config::GhabzConfig;
pub use models::extraction::{ExtractionResult, TableData};
pub use models::geometry::{BBox, Cell, TableGeometry};
pub use pdf::{CropBoxResolver, CropState, PdfDocument, Word, WordCollector, apply_crop};
pub use table::{
    AlignmentTableDetector, GeometryEstimator, Selection, TableCandidate, TableCandidateSelector,
    TableDetector,
};
pub use text::{BidiNormalizer, Line, LineReconstructor};
