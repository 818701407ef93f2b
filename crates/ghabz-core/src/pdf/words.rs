//! Positioned word collection from a page's content stream.
//!
//! Glyphs are obtained from pdf-extract's content interpreter through a
//! custom [`OutputDev`], converted to top-left page space and grouped into
//! words the way pdfplumber's `extract_words` does (whitespace or a gap
//! larger than `x_tolerance` ends a word).

use std::panic::{AssertUnwindSafe, catch_unwind};

use pdf_extract::{MediaBox, OutputDev, OutputError, Transform};
use tracing::{debug, trace, warn};

use super::{PdfDocument, Result};
use crate::error::PdfError;
use crate::models::config::LayoutConfig;
use crate::models::geometry::BBox;

/// Portion of the font size that sits below the baseline.
const DESCENT_RATIO: f64 = 0.2;

/// A word token with its bounding box in top-left page space.
#[derive(Debug, Clone, PartialEq)]
pub struct Word {
    pub text: String,
    pub x0: f64,
    pub top: f64,
    pub x1: f64,
    pub bottom: f64,
}

impl Word {
    pub fn new(text: impl Into<String>, x0: f64, top: f64, x1: f64, bottom: f64) -> Self {
        Self {
            text: text.into(),
            x0,
            top,
            x1,
            bottom,
        }
    }

    /// Get the word bounding box.
    pub fn bbox(&self) -> BBox {
        BBox::new(self.x0, self.top, self.x1, self.bottom)
    }
}

/// One painted glyph.
#[derive(Debug, Clone)]
pub(crate) struct Glyph {
    pub text: String,
    pub x0: f64,
    pub x1: f64,
    pub top: f64,
    pub bottom: f64,
    pub baseline: f64,
}

/// Receives glyphs from the pdf-extract interpreter.
struct GlyphSink {
    left: f64,
    top: f64,
    glyphs: Vec<Glyph>,
}

impl GlyphSink {
    fn new() -> Self {
        Self {
            left: 0.0,
            top: 0.0,
            glyphs: Vec::new(),
        }
    }
}

impl OutputDev for GlyphSink {
    fn begin_page(
        &mut self,
        page_num: u32,
        media_box: &MediaBox,
        _art_box: Option<(f64, f64, f64, f64)>,
    ) -> std::result::Result<(), OutputError> {
        trace!("Collecting glyphs on page {}", page_num);
        self.left = media_box.llx.min(media_box.urx);
        self.top = media_box.ury.max(media_box.lly);
        Ok(())
    }

    fn end_page(&mut self) -> std::result::Result<(), OutputError> {
        Ok(())
    }

    fn output_character(
        &mut self,
        trm: &Transform,
        width: f64,
        _spacing: f64,
        font_size: f64,
        char: &str,
    ) -> std::result::Result<(), OutputError> {
        // Size of a font-size square after the text rendering matrix.
        let vx = font_size * (trm.m11 + trm.m21);
        let vy = font_size * (trm.m12 + trm.m22);
        let size = (vx * vy).abs().sqrt();

        let x0 = trm.m31 - self.left;
        let baseline = self.top - trm.m32;
        let bottom = baseline + size * DESCENT_RATIO;

        self.glyphs.push(Glyph {
            text: char.to_string(),
            x0,
            x1: x0 + width * size,
            top: bottom - size,
            bottom,
            baseline,
        });
        Ok(())
    }

    fn begin_word(&mut self) -> std::result::Result<(), OutputError> {
        Ok(())
    }

    fn end_word(&mut self) -> std::result::Result<(), OutputError> {
        Ok(())
    }

    fn end_line(&mut self) -> std::result::Result<(), OutputError> {
        Ok(())
    }
}

/// Collects positioned words from a page region.
#[derive(Debug, Clone)]
pub struct WordCollector {
    x_tolerance: f64,
    y_tolerance: f64,
    strict: bool,
}

impl WordCollector {
    /// Create a collector with the layout tolerances.
    pub fn new(layout: &LayoutConfig) -> Self {
        Self {
            x_tolerance: layout.x_tolerance,
            y_tolerance: layout.y_tolerance,
            strict: true,
        }
    }

    /// Keep only words fully inside the region (default) or any overlapping word.
    pub fn with_strict_filter(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Collect the words of a page that fall inside `region`.
    ///
    /// The region must already be clipped to the page; an empty region
    /// yields an empty vector.
    pub fn collect(&self, doc: &PdfDocument, page_index: u32, region: &BBox) -> Result<Vec<Word>> {
        if region.is_empty() {
            debug!("Region {:?} is empty, no words collected", region);
            return Ok(Vec::new());
        }

        let words: Vec<Word> = self
            .page_words(doc, page_index)?
            .into_iter()
            .filter(|w| {
                if self.strict {
                    region.contains(&w.bbox())
                } else {
                    region.overlaps(&w.bbox())
                }
            })
            .collect();

        debug!("Collected {} words in region {:?}", words.len(), region);
        Ok(words)
    }

    /// Collect every word of a page.
    ///
    /// Interpreter panics become `TextExtraction` errors. The process panic
    /// hook still runs for them, so binaries that want quiet output install
    /// their own hook.
    pub fn page_words(&self, doc: &PdfDocument, page_index: u32) -> Result<Vec<Word>> {
        let page_number = doc.page_number(page_index)?;
        let mut sink = GlyphSink::new();

        // The interpreter panics on some malformed fonts and streams.
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::output_doc_page(doc.document(), &mut sink, page_number)
        }));

        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(PdfError::TextExtraction(e.to_string())),
            Err(_) => {
                warn!("Content interpreter panicked on page {}", page_index);
                return Err(PdfError::TextExtraction(format!(
                    "content interpreter panicked on page {}",
                    page_index
                )));
            }
        }

        trace!("Page {} produced {} glyphs", page_index, sink.glyphs.len());
        Ok(self.group_glyphs(&sink.glyphs))
    }

    /// Group glyphs, in painting order, into words.
    pub(crate) fn group_glyphs(&self, glyphs: &[Glyph]) -> Vec<Word> {
        let mut words = Vec::new();
        let mut current: Vec<&Glyph> = Vec::new();
        let mut end_x = 0.0;

        for glyph in glyphs {
            if glyph.text.chars().all(char::is_whitespace) {
                finish_word(&mut current, &mut words);
                continue;
            }

            if let Some(last) = current.last() {
                let same_line = (glyph.baseline - last.baseline).abs() <= self.y_tolerance;

                // A zero-width glyph still occupies space up to the next pen position.
                if last.x1 <= last.x0 && same_line {
                    end_x = glyph.x0.max(end_x);
                }

                let gap = glyph.x0 - end_x;
                let backwards = glyph.x0 + self.x_tolerance < last.x0;
                if !same_line || gap > self.x_tolerance || backwards {
                    finish_word(&mut current, &mut words);
                }
            }

            end_x = if current.is_empty() {
                glyph.x1
            } else {
                end_x.max(glyph.x1)
            };
            current.push(glyph);
        }

        finish_word(&mut current, &mut words);
        words
    }
}

fn finish_word(current: &mut Vec<&Glyph>, words: &mut Vec<Word>) {
    if current.is_empty() {
        return;
    }

    let text: String = current.iter().map(|g| g.text.as_str()).collect();
    let x0 = current.iter().map(|g| g.x0).fold(f64::INFINITY, f64::min);
    let x1 = current.iter().map(|g| g.x1).fold(f64::NEG_INFINITY, f64::max);
    let top = current.iter().map(|g| g.top).fold(f64::INFINITY, f64::min);
    let bottom = current.iter().map(|g| g.bottom).fold(f64::NEG_INFINITY, f64::max);

    words.push(Word::new(text, x0, top, x1.max(x0), bottom));
    current.clear();
}
