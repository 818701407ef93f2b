//! Crop box lookup and the crop writer.

use std::path::Path;

use tracing::{debug, info};

use super::{PdfDocument, PdfRect, Result};
use crate::models::geometry::BBox;

/// Tolerance when comparing crop and media boxes (points).
const BOX_EPSILON: f64 = 0.01;

/// Whether a page carries a crop box distinct from its media box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CropState {
    /// Crop box in top-left page space, clamped to the media box.
    HasCropBox(BBox),
    NoCropBox,
}

impl CropState {
    /// The crop region, if any.
    pub fn region(&self) -> Option<BBox> {
        match self {
            CropState::HasCropBox(bbox) => Some(*bbox),
            CropState::NoCropBox => None,
        }
    }
}

/// Reads the effective crop region of a page.
#[derive(Debug, Clone, Copy, Default)]
pub struct CropBoxResolver;

impl CropBoxResolver {
    pub fn new() -> Self {
        Self
    }

    /// Resolve the crop state of a page (0-based index).
    pub fn resolve(&self, doc: &PdfDocument, page_index: u32) -> Result<CropState> {
        let media = doc.media_box(page_index)?;

        let Some(crop) = doc.crop_box(page_index)? else {
            return Ok(CropState::NoCropBox);
        };

        if same_rect(&crop, &media) {
            debug!("Page {} crop box equals its media box", page_index);
            return Ok(CropState::NoCropBox);
        }

        let page = media.to_page_space(&media);
        let bbox = crop.to_page_space(&media).clamp_to(&page);
        debug!("Page {} crop box {:?}", page_index, bbox);
        Ok(CropState::HasCropBox(bbox))
    }
}

fn same_rect(a: &PdfRect, b: &PdfRect) -> bool {
    (a.llx - b.llx).abs() < BOX_EPSILON
        && (a.lly - b.lly).abs() < BOX_EPSILON
        && (a.urx - b.urx).abs() < BOX_EPSILON
        && (a.ury - b.ury).abs() < BOX_EPSILON
}

/// Clamp a top-left-space box onto a page of size `width` x `height`.
///
/// Each coordinate is pulled into the page and the far edges are kept at or
/// beyond the near edges, so the result is never inverted.
pub(crate) fn clamp_to_page(bbox: &BBox, width: f64, height: f64) -> BBox {
    let x0 = bbox.x0.min(width).max(0.0);
    let y0 = bbox.y0.min(height).max(0.0);
    let x1 = bbox.x1.min(width).max(x0);
    let y1 = bbox.y1.min(height).max(y0);
    BBox::new(x0, y0, x1, y1)
}

/// Write a crop box on one page of `input` and save the result to `output`.
///
/// `bbox` is in top-left page space. Returns the box actually applied after
/// clamping to the page.
pub fn apply_crop(input: &Path, output: &Path, page_index: u32, bbox: &BBox) -> Result<BBox> {
    let mut doc = PdfDocument::open(input)?;
    let media = doc.media_box(page_index)?;

    let applied = clamp_to_page(bbox, media.width(), media.height());
    doc.set_crop_box(page_index, PdfRect::from_page_space(&applied, &media))?;
    doc.save(output)?;

    info!(
        "Cropped page {} of {} to ({:.1}, {:.1}, {:.1}, {:.1})",
        page_index,
        input.display(),
        applied.x0,
        applied.y0,
        applied.x1,
        applied.y1
    );
    Ok(applied)
}
