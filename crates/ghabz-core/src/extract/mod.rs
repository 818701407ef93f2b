//! Region extraction: text, table and cell geometry from one page region.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::models::config::GhabzConfig;
use crate::models::extraction::{ExtractionResult, TableData};
use crate::models::geometry::{BBox, TableGeometry};
use crate::pdf::{self, CropBoxResolver, PdfDocument, Word, WordCollector};
use crate::table::{
    AlignmentTableDetector, GeometryEstimator, TableCandidate, TableCandidateSelector,
    TableDetector,
};
use crate::text::{BidiNormalizer, LineReconstructor};

/// Extracts normalized text, a table and table geometry from a page region.
///
/// The extractor holds no document state; each call opens the PDF, works on
/// one page and drops the document before returning. It can be shared
/// across threads.
pub struct RegionExtractor {
    config: GhabzConfig,
    words: WordCollector,
    lines: LineReconstructor,
    normalizer: BidiNormalizer,
    crop: CropBoxResolver,
    detector: Box<dyn TableDetector>,
    selector: TableCandidateSelector,
    geometry: GeometryEstimator,
}

impl RegionExtractor {
    /// Create an extractor using the alignment table detector.
    pub fn new(config: GhabzConfig) -> Self {
        let detector = AlignmentTableDetector::new(&config.layout, config.table.clone());
        Self {
            words: WordCollector::new(&config.layout)
                .with_strict_filter(config.extraction.strict_region_filter),
            lines: LineReconstructor::new(&config.layout),
            normalizer: BidiNormalizer::new(config.normalization),
            crop: CropBoxResolver::new(),
            detector: Box::new(detector),
            selector: TableCandidateSelector::new(),
            geometry: GeometryEstimator::new(config.geometry.clone()),
            config,
        }
    }

    /// Replace the table detection backend.
    pub fn with_detector(mut self, detector: Box<dyn TableDetector>) -> Self {
        self.detector = detector;
        self
    }

    /// Get the configuration.
    pub fn config(&self) -> &GhabzConfig {
        &self.config
    }

    /// Extract everything from a page, limited to its crop box when it has one.
    pub fn extract_all(&self, path: &Path, page_index: u32) -> Result<ExtractionResult> {
        self.extract_region(path, page_index, None)
    }

    /// Extract everything from a page region.
    ///
    /// The region is `explicit_crop` (clamped to the page) when given, else
    /// the page's crop box, else the whole page. Only a document that cannot
    /// be opened is an error; every other failure degrades to empty output.
    pub fn extract_region(
        &self,
        path: &Path,
        page_index: u32,
        explicit_crop: Option<BBox>,
    ) -> Result<ExtractionResult> {
        let doc = PdfDocument::open(path)?;

        let mut result = ExtractionResult::empty(page_index);
        result.source_file = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());

        if page_index >= doc.page_count() {
            warn!(
                "Page {} out of range for {} ({} pages)",
                page_index,
                path.display(),
                doc.page_count()
            );
            return Ok(result);
        }

        let region = match self.resolve_region(&doc, page_index, explicit_crop) {
            Ok(region) => region,
            Err(e) => {
                warn!("Could not determine region of {}: {}", path.display(), e);
                return Ok(result);
            }
        };
        debug!("Extracting page {} region {:?}", page_index, region);

        // A text failure does not block the table path; it sees no words.
        let words = match self.words.collect(&doc, page_index, &region) {
            Ok(words) => {
                result.text = self
                    .normalizer
                    .normalize(&self.lines.reconstruct(&words), true);
                words
            }
            Err(e) => {
                warn!("Text extraction failed for {}: {}", path.display(), e);
                Vec::new()
            }
        };

        if self.config.extraction.extract_tables {
            match self.extract_table(&words, &region) {
                Ok((table, geometry)) => {
                    result.table = table;
                    result.geometry = geometry;
                }
                Err(e) => warn!("Table extraction failed for {}: {}", path.display(), e),
            }
        }

        info!(
            "Extracted {} chars, table: {}, geometry: {} from {}",
            result.text.chars().count(),
            result.table.is_some(),
            result.geometry.is_some(),
            path.display()
        );
        Ok(result)
    }

    fn resolve_region(
        &self,
        doc: &PdfDocument,
        page_index: u32,
        explicit_crop: Option<BBox>,
    ) -> pdf::Result<BBox> {
        let page = doc.page_bbox(page_index)?;

        if let Some(crop) = explicit_crop {
            return Ok(crop.clamp_to(&page));
        }

        Ok(self
            .crop
            .resolve(doc, page_index)?
            .region()
            .unwrap_or(page))
    }

    fn extract_table(
        &self,
        words: &[Word],
        region: &BBox,
    ) -> pdf::Result<(Option<TableData>, Option<TableGeometry>)> {
        let candidates = self.detector.detect(words, region)?;
        debug!(
            "Detector '{}' returned {} candidates",
            self.detector.name(),
            candidates.len()
        );

        let Some(selection) = self.selector.select(&candidates) else {
            return Ok((None, None));
        };

        let grid: Vec<Vec<String>> = selection
            .rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| self.normalizer.normalize_cell(cell))
                    .collect()
            })
            .collect();

        let Some(table) = TableData::from_grid(&grid) else {
            debug!("Selected table has no body rows");
            return Ok((None, None));
        };

        let geometry = if self.config.geometry.extract_table_structure {
            let bbox = table_bbox(&candidates, &selection.sources, words, region);
            self.geometry.estimate(&grid, &bbox)
        } else {
            None
        };

        Ok((Some(table), geometry))
    }
}

/// Extent of the selected table: detector boxes, else the words, else the region.
fn table_bbox(candidates: &[TableCandidate], sources: &[usize], words: &[Word], region: &BBox) -> BBox {
    BBox::union_all(
        sources
            .iter()
            .filter_map(|&i| candidates.get(i).and_then(|c| c.bbox)),
    )
    .or_else(|| BBox::union_all(words.iter().map(Word::bbox)))
    .unwrap_or(*region)
}

/// Output base name for a section PDF: `{parent dir}_{file stem}`.
pub fn output_base_name(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());

    match path.parent().and_then(|p| p.file_name()) {
        Some(parent) => format!("{}_{}", parent.to_string_lossy(), stem),
        None => stem,
    }
}

/// Write a result to `output_dir` in each of `formats` ("json", "txt", "csv").
///
/// Text is written only when non-empty and CSV only when a table exists.
/// Returns the paths written.
pub fn save_result(
    result: &ExtractionResult,
    output_dir: &Path,
    base_name: &str,
    formats: &[String],
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(output_dir)?;
    let wants = |format: &str| formats.iter().any(|f| f.eq_ignore_ascii_case(format));
    let mut written = Vec::new();

    if wants("txt") && !result.text.is_empty() {
        let path = output_dir.join(format!("{}.txt", base_name));
        fs::write(&path, &result.text)?;
        written.push(path);
    }

    if wants("csv") {
        if let Some(table) = &result.table {
            let path = output_dir.join(format!("{}.csv", base_name));
            write_table_csv(table, &path)?;
            written.push(path);
        }
    }

    if wants("json") {
        let path = output_dir.join(format!("{}.json", base_name));
        fs::write(&path, serde_json::to_string_pretty(result)?)?;
        written.push(path);
    }

    for path in &written {
        info!("Saved {}", path.display());
    }
    Ok(written)
}

/// Write a table as UTF-8 CSV with a byte order mark for spreadsheet tools.
fn write_table_csv(table: &TableData, path: &Path) -> Result<()> {
    let mut file = File::create(path)?;
    file.write_all(b"\xEF\xBB\xBF")?;

    let mut writer = csv::WriterBuilder::new().flexible(true).from_writer(file);
    writer
        .write_record(&table.headers)
        .map_err(std::io::Error::from)?;
    for row in &table.rows {
        writer.write_record(row).map_err(std::io::Error::from)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{GhabzError, PdfError};
    use crate::pdf::testing::*;
    use pretty_assertions::assert_eq;

    fn write_pdf(dir: &Path, name: &str, data: Vec<u8>) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, data).unwrap();
        path
    }

    fn grid_items() -> Vec<Placed<'static>> {
        vec![
            placed("Item", 50.0, 700.0),
            placed("Qty", 200.0, 700.0),
            placed("Price", 300.0, 700.0),
            placed("Water", 50.0, 685.0),
            placed("2", 200.0, 685.0),
            placed("1200", 300.0, 685.0),
            placed("Power", 50.0, 670.0),
            placed("5", 200.0, 670.0),
            placed("300", 300.0, 670.0),
        ]
    }

    struct NoTables;

    impl TableDetector for NoTables {
        fn name(&self) -> &str {
            "none"
        }

        fn detect(&self, _words: &[Word], _region: &BBox) -> pdf::Result<Vec<TableCandidate>> {
            Err(PdfError::TableDetection("backend unavailable".to_string()))
        }
    }

    /// Returns the same single candidate for every region.
    struct FixedTable(Vec<Vec<&'static str>>);

    impl TableDetector for FixedTable {
        fn name(&self) -> &str {
            "fixed"
        }

        fn detect(&self, _words: &[Word], _region: &BBox) -> pdf::Result<Vec<TableCandidate>> {
            let rows = self
                .0
                .iter()
                .map(|row| row.iter().map(|cell| cell.to_string()).collect())
                .collect();
            Ok(vec![TableCandidate::new(rows, None)])
        }
    }

    #[test]
    fn test_extractor_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RegionExtractor>();
    }

    #[test]
    fn test_extract_text_and_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_pdf(dir.path(), "bill.pdf", build_pdf(A4, None, &grid_items()));

        let result = RegionExtractor::new(GhabzConfig::default())
            .extract_all(&path, 0)
            .unwrap();

        assert_eq!(result.source_file.as_deref(), Some("bill.pdf"));
        assert_eq!(result.text, "Item Qty Price\nWater 2 1200\nPower 5 300");

        let table = result.table.unwrap();
        assert_eq!(table.headers, vec!["Item", "Qty", "Price"]);
        assert_eq!(table.rows, vec![vec!["Water", "2", "1200"], vec!["Power", "5", "300"]]);

        let geometry = result.geometry.unwrap();
        assert_eq!(geometry.num_rows, 3);
        assert_eq!(geometry.num_cols, 3);
        assert_eq!(geometry.cells.len(), 9);
        assert_eq!(geometry.cell_at(1, 2).unwrap().text, "1200");
    }

    #[test]
    fn test_crop_box_limits_region() {
        let dir = tempfile::tempdir().unwrap();
        let items = [placed("inside", 100.0, 700.0), placed("outside", 100.0, 300.0)];
        // Crop covers the top band of the page only.
        let path = write_pdf(
            dir.path(),
            "section.pdf",
            build_pdf(A4, Some([0.0, 600.0, 595.0, 842.0]), &items),
        );

        let result = RegionExtractor::new(GhabzConfig::default())
            .extract_all(&path, 0)
            .unwrap();
        assert_eq!(result.text, "inside");
        assert!(result.table.is_none());
    }

    #[test]
    fn test_explicit_crop_overrides_crop_box() {
        let dir = tempfile::tempdir().unwrap();
        let items = [placed("inside", 100.0, 700.0), placed("outside", 100.0, 300.0)];
        let path = write_pdf(
            dir.path(),
            "section.pdf",
            build_pdf(A4, Some([0.0, 600.0, 595.0, 842.0]), &items),
        );

        let lower = BBox::new(0.0, 500.0, 595.0, 600.0);
        let result = RegionExtractor::new(GhabzConfig::default())
            .extract_region(&path, 0, Some(lower))
            .unwrap();
        assert_eq!(result.text, "outside");
    }

    #[test]
    fn test_empty_region_gives_empty_result() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_pdf(dir.path(), "bill.pdf", build_pdf(A4, None, &grid_items()));

        let nothing_here = BBox::new(0.0, 600.0, 595.0, 842.0);
        let result = RegionExtractor::new(GhabzConfig::default())
            .extract_region(&path, 0, Some(nothing_here))
            .unwrap();

        assert_eq!(result.text, "");
        assert!(result.table.is_none());
        assert!(result.geometry.is_none());

        let json = serde_json::to_value(&result).unwrap();
        assert!(json["table"].is_null());
        assert!(json["geometry"].is_null());
    }

    #[test]
    fn test_page_out_of_range_gives_empty_result() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_pdf(dir.path(), "bill.pdf", build_pdf(A4, None, &grid_items()));

        let result = RegionExtractor::new(GhabzConfig::default())
            .extract_all(&path, 4)
            .unwrap();
        assert_eq!(result.page_num, 4);
        assert!(result.is_empty());
    }

    #[test]
    fn test_unreadable_document_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_pdf(dir.path(), "broken.pdf", b"%PDF-1.5 nope".to_vec());

        let err = RegionExtractor::new(GhabzConfig::default())
            .extract_all(&path, 0)
            .unwrap_err();
        assert!(matches!(err, GhabzError::Pdf(ref e) if e.is_fatal()));
    }

    #[test]
    fn test_table_failure_degrades() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_pdf(dir.path(), "bill.pdf", build_pdf(A4, None, &grid_items()));

        let result = RegionExtractor::new(GhabzConfig::default())
            .with_detector(Box::new(NoTables))
            .extract_all(&path, 0)
            .unwrap();
        assert!(!result.text.is_empty());
        assert!(result.table.is_none());
        assert!(result.geometry.is_none());
    }

    #[test]
    fn test_text_failure_still_runs_table_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_pdf(
            dir.path(),
            "bad_font.pdf",
            build_pdf_missing_font(&[placed("Total", 100.0, 700.0)]),
        );

        let result = RegionExtractor::new(GhabzConfig::default())
            .with_detector(Box::new(FixedTable(vec![vec!["h"], vec!["v"]])))
            .extract_all(&path, 0)
            .unwrap();

        assert_eq!(result.text, "");
        let table = result.table.unwrap();
        assert_eq!(table.headers, vec!["h"]);
        assert_eq!(table.rows, vec![vec!["v"]]);

        // No words, so the geometry spans the whole region.
        let geometry = result.geometry.unwrap();
        assert_eq!(geometry.bbox, BBox::new(0.0, 0.0, 595.0, 842.0));
    }

    #[test]
    fn test_header_only_table_has_no_geometry() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_pdf(dir.path(), "bill.pdf", build_pdf(A4, None, &grid_items()));

        let result = RegionExtractor::new(GhabzConfig::default())
            .with_detector(Box::new(FixedTable(vec![vec!["a", "b"]])))
            .extract_all(&path, 0)
            .unwrap();

        assert!(!result.text.is_empty());
        assert!(result.table.is_none());
        assert!(result.geometry.is_none());
    }

    #[test]
    fn test_zero_page_document_gives_empty_result() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_pdf(dir.path(), "empty.pdf", build_empty_pdf());

        let result = RegionExtractor::new(GhabzConfig::default())
            .extract_all(&path, 0)
            .unwrap();
        assert_eq!(result.page_num, 0);
        assert!(result.is_empty());
    }

    #[test]
    fn test_tables_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_pdf(dir.path(), "bill.pdf", build_pdf(A4, None, &grid_items()));

        let mut config = GhabzConfig::default();
        config.extraction.extract_tables = false;
        let result = RegionExtractor::new(config).extract_all(&path, 0).unwrap();
        assert!(result.table.is_none());
        assert!(!result.text.is_empty());
    }

    #[test]
    fn test_table_bbox_fallbacks() {
        let region = BBox::new(0.0, 0.0, 100.0, 100.0);
        let words = [Word::new("a", 10.0, 10.0, 20.0, 20.0)];
        let with_box = TableCandidate::new(vec![], Some(BBox::new(1.0, 2.0, 3.0, 4.0)));
        let without = TableCandidate::new(vec![], None);

        assert_eq!(
            table_bbox(&[with_box], &[0], &words, &region),
            BBox::new(1.0, 2.0, 3.0, 4.0)
        );
        assert_eq!(
            table_bbox(&[without.clone()], &[0], &words, &region),
            BBox::new(10.0, 10.0, 20.0, 20.0)
        );
        assert_eq!(table_bbox(&[without], &[0], &[], &region), region);
    }

    #[test]
    fn test_output_base_name() {
        assert_eq!(
            output_base_name(Path::new("template1/4_510/bill_summary.pdf")),
            "4_510_bill_summary"
        );
        assert_eq!(output_base_name(Path::new("bill.pdf")), "bill");
    }

    #[test]
    fn test_save_result_formats() {
        let dir = tempfile::tempdir().unwrap();
        let result = ExtractionResult {
            source_file: Some("bill.pdf".to_string()),
            page_num: 0,
            text: "مبلغ 1200".to_string(),
            table: TableData::from_grid(&[
                vec!["شرح".to_string(), "مبلغ".to_string()],
                vec!["آب".to_string(), "1200".to_string()],
            ]),
            geometry: None,
        };
        let formats = vec!["json".to_string(), "txt".to_string(), "csv".to_string()];

        let written = save_result(&result, dir.path(), "1_summary", &formats).unwrap();
        assert_eq!(written.len(), 3);

        let json = fs::read_to_string(dir.path().join("1_summary.json")).unwrap();
        assert!(json.contains("مبلغ 1200"));
        let back: ExtractionResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back, result);

        let csv = fs::read(dir.path().join("1_summary.csv")).unwrap();
        assert!(csv.starts_with(b"\xEF\xBB\xBF"));
        let csv = String::from_utf8(csv[3..].to_vec()).unwrap();
        assert_eq!(csv, "شرح,مبلغ\nآب,1200\n");

        let txt = fs::read_to_string(dir.path().join("1_summary.txt")).unwrap();
        assert_eq!(txt, "مبلغ 1200");
    }

    #[test]
    fn test_save_result_skips_empty_parts() {
        let dir = tempfile::tempdir().unwrap();
        let formats = vec!["json".to_string(), "txt".to_string(), "csv".to_string()];
        let written = save_result(&ExtractionResult::empty(0), dir.path(), "empty", &formats).unwrap();
        assert_eq!(written, vec![dir.path().join("empty.json")]);
    }
}
