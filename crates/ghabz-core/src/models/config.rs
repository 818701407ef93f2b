//! Configuration structures for the extraction pipeline.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{GhabzError, Result};

/// Main configuration for the ghabz pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GhabzConfig {
    /// Extraction switches.
    pub extraction: ExtractionConfig,

    /// Word and line grouping tolerances.
    pub layout: LayoutConfig,

    /// Text normalization configuration.
    pub normalization: NormalizationConfig,

    /// Table geometry configuration.
    pub geometry: GeometryConfig,

    /// Alignment table detector configuration.
    pub table: TableConfig,

    /// Output configuration used by the CLI.
    pub output: OutputConfig,
}

/// Extraction switches.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Run the table path in addition to the text path.
    pub extract_tables: bool,

    /// Keep only words that lie entirely inside the region.
    /// When false, words are kept if they merely overlap it.
    pub strict_region_filter: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            extract_tables: true,
            strict_region_filter: true,
        }
    }
}

/// Tolerances used when turning glyphs into words and words into lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Maximum horizontal gap between glyphs of one word (points).
    pub x_tolerance: f64,

    /// Maximum baseline shift between glyphs of one word (points).
    pub y_tolerance: f64,

    /// Maximum `top` difference for words sharing a line (points).
    pub line_tolerance: f64,

    /// Gap above which a space is inserted between words of a line (points).
    pub word_gap: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            x_tolerance: 3.0,
            y_tolerance: 3.0,
            line_tolerance: 5.0,
            word_gap: 2.0,
        }
    }
}

/// Text normalization configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizationConfig {
    /// Map exotic whitespace to plain spaces and drop zero-width joiners.
    pub normalize_whitespace: bool,

    /// Collapse runs of spaces and trim around line breaks.
    pub remove_extra_spaces: bool,

    /// Convert Persian and Arabic-Indic digits to ASCII.
    pub normalize_persian_numbers: bool,

    /// Reorder visual-order RTL text into logical order.
    pub handle_bidi: bool,
}

impl Default for NormalizationConfig {
    fn default() -> Self {
        Self {
            normalize_whitespace: true,
            remove_extra_spaces: true,
            normalize_persian_numbers: true,
            handle_bidi: true,
        }
    }
}

/// Table geometry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryConfig {
    /// Emit per-cell bounding boxes.
    pub extract_cell_bounds: bool,

    /// Emit table geometry at all.
    pub extract_table_structure: bool,

    /// Cells narrower than this are reported in diagnostics (points).
    pub min_cell_width: f64,

    /// Cells shorter than this are reported in diagnostics (points).
    pub min_cell_height: f64,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            extract_cell_bounds: true,
            extract_table_structure: true,
            min_cell_width: 10.0,
            min_cell_height: 10.0,
        }
    }
}

/// Alignment table detector configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    /// Maximum `top` difference for words sharing a table row (points).
    pub row_tolerance: f64,

    /// Minimum horizontal whitespace separating two columns (points).
    pub column_gap: f64,

    /// Minimum number of rows for a block to count as a table.
    pub min_rows: usize,

    /// Minimum number of columns for a block to count as a table.
    pub min_cols: usize,

    /// Vertical gap that splits one table block from the next (points).
    pub block_gap: f64,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            row_tolerance: 5.0,
            column_gap: 8.0,
            min_rows: 2,
            min_cols: 2,
            block_gap: 24.0,
        }
    }
}

/// Output configuration used by the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Files written per processed PDF: any of "json", "txt", "csv".
    pub formats: Vec<String>,

    /// Glob pattern of input file names to skip in batch mode.
    pub exclude_pattern: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            formats: vec!["json".to_string()],
            exclude_pattern: "*_cropped_cropped.pdf".to_string(),
        }
    }
}

impl GhabzConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| GhabzError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        self.validate()?;
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Reject values the pipeline cannot work with.
    pub fn validate(&self) -> Result<()> {
        let distances = [
            ("layout.x_tolerance", self.layout.x_tolerance),
            ("layout.y_tolerance", self.layout.y_tolerance),
            ("layout.line_tolerance", self.layout.line_tolerance),
            ("layout.word_gap", self.layout.word_gap),
            ("geometry.min_cell_width", self.geometry.min_cell_width),
            ("geometry.min_cell_height", self.geometry.min_cell_height),
            ("table.row_tolerance", self.table.row_tolerance),
            ("table.column_gap", self.table.column_gap),
            ("table.block_gap", self.table.block_gap),
        ];
        for (key, value) in distances {
            if !value.is_finite() || value < 0.0 {
                return Err(GhabzError::Config(format!(
                    "{} must be a non-negative number, got {}",
                    key, value
                )));
            }
        }

        if self.table.min_rows == 0 || self.table.min_cols == 0 {
            return Err(GhabzError::Config(
                "table.min_rows and table.min_cols must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}
