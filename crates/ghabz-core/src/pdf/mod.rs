//! PDF document access: scoped document handle, word collection and crop boxes.

mod crop;
mod words;

pub use crop::{CropBoxResolver, CropState, apply_crop};
pub use words::{Word, WordCollector};

use std::path::Path;

use lopdf::{Document, Object, ObjectId};
use tracing::debug;

use crate::error::PdfError;
use crate::models::geometry::BBox;

/// Result type for PDF operations.
pub type Result<T> = std::result::Result<T, PdfError>;

/// A page rectangle in native PDF user space (`llx, lly, urx, ury`, y up).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PdfRect {
    pub llx: f64,
    pub lly: f64,
    pub urx: f64,
    pub ury: f64,
}

impl PdfRect {
    /// Build from any two opposite corners.
    pub fn from_corners(a: f64, b: f64, c: f64, d: f64) -> Self {
        Self {
            llx: a.min(c),
            lly: b.min(d),
            urx: a.max(c),
            ury: b.max(d),
        }
    }

    pub fn width(&self) -> f64 {
        self.urx - self.llx
    }

    pub fn height(&self) -> f64 {
        self.ury - self.lly
    }

    /// Express this rectangle in the top-left page space of `media`.
    pub fn to_page_space(&self, media: &PdfRect) -> BBox {
        BBox::new(
            self.llx - media.llx,
            media.ury - self.ury,
            self.urx - media.llx,
            media.ury - self.lly,
        )
    }

    /// Inverse of [`PdfRect::to_page_space`].
    pub fn from_page_space(bbox: &BBox, media: &PdfRect) -> Self {
        Self::from_corners(
            bbox.x0 + media.llx,
            media.ury - bbox.y1,
            bbox.x1 + media.llx,
            media.ury - bbox.y0,
        )
    }

    fn to_object(self) -> Object {
        Object::Array(vec![
            Object::Real(self.llx as f32),
            Object::Real(self.lly as f32),
            Object::Real(self.urx as f32),
            Object::Real(self.ury as f32),
        ])
    }
}

/// An open PDF document.
///
/// The handle owns the parsed document; dropping it releases everything, so
/// holding it in a local scope ties its lifetime to one extraction call.
pub struct PdfDocument {
    document: Document,
}

impl PdfDocument {
    /// Open and parse a PDF file.
    pub fn open(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)
            .map_err(|e| PdfError::Open(format!("{}: {}", path.display(), e)))?;
        Self::load(&data)
    }

    /// Parse a PDF from bytes.
    pub fn load(data: &[u8]) -> Result<Self> {
        let mut document = Document::load_mem(data).map_err(|e| PdfError::Open(e.to_string()))?;

        // Handle PDFs with empty password encryption
        if document.is_encrypted() {
            if document.decrypt("").is_err() {
                return Err(PdfError::Encrypted);
            }
            debug!("Decrypted PDF with empty password");
        }

        debug!("Loaded PDF with {} pages", document.get_pages().len());
        Ok(Self { document })
    }

    /// Get the number of pages.
    pub fn page_count(&self) -> u32 {
        self.document.get_pages().len() as u32
    }

    /// Get the underlying lopdf document.
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Convert a 0-based page index into lopdf's 1-based page number.
    pub fn page_number(&self, page_index: u32) -> Result<u32> {
        let count = self.page_count();
        if count == 0 {
            return Err(PdfError::NoPages);
        }
        if page_index >= count {
            return Err(PdfError::InvalidPage(page_index));
        }
        Ok(page_index + 1)
    }

    /// Object id of a page (0-based index).
    pub fn page_id(&self, page_index: u32) -> Result<ObjectId> {
        let number = self.page_number(page_index)?;
        self.document
            .get_pages()
            .get(&number)
            .copied()
            .ok_or(PdfError::InvalidPage(page_index))
    }

    /// Media box of a page, following page-tree inheritance.
    pub fn media_box(&self, page_index: u32) -> Result<PdfRect> {
        let page_id = self.page_id(page_index)?;
        self.inherited_rect(page_id, b"MediaBox")
            .ok_or_else(|| PdfError::Crop(format!("page {} has no MediaBox", page_index)))
    }

    /// Declared crop box of a page, following page-tree inheritance.
    pub fn crop_box(&self, page_index: u32) -> Result<Option<PdfRect>> {
        let page_id = self.page_id(page_index)?;
        Ok(self.inherited_rect(page_id, b"CropBox"))
    }

    /// Media box of a page in top-left page space, i.e. `(0, 0, w, h)`.
    pub fn page_bbox(&self, page_index: u32) -> Result<BBox> {
        let media = self.media_box(page_index)?;
        Ok(media.to_page_space(&media))
    }

    /// Write `/CropBox` on a page.
    pub fn set_crop_box(&mut self, page_index: u32, rect: PdfRect) -> Result<()> {
        let page_id = self.page_id(page_index)?;
        let page = self
            .document
            .get_object_mut(page_id)
            .and_then(|o| o.as_dict_mut())
            .map_err(|e| PdfError::Crop(e.to_string()))?;
        page.set("CropBox", rect.to_object());
        Ok(())
    }

    /// Save the document to a file.
    pub fn save(&mut self, path: &Path) -> Result<()> {
        self.document
            .save(path)
            .map(|_| ())
            .map_err(|e| PdfError::Crop(format!("failed to save {}: {}", path.display(), e)))
    }

    fn inherited_rect(&self, node_id: ObjectId, key: &[u8]) -> Option<PdfRect> {
        let dict = self.document.get_dictionary(node_id).ok()?;

        if let Ok(value) = dict.get(key) {
            if let Some(rect) = self.rect_from_object(value) {
                return Some(rect);
            }
        }

        // Continue up the tree
        match dict.get(b"Parent") {
            Ok(Object::Reference(parent_id)) => self.inherited_rect(*parent_id, key),
            _ => None,
        }
    }

    fn rect_from_object(&self, obj: &Object) -> Option<PdfRect> {
        let (_, obj) = self.document.dereference(obj).ok()?;
        let items = obj.as_array().ok()?;
        if items.len() != 4 {
            return None;
        }

        let mut values = [0.0f64; 4];
        for (slot, item) in values.iter_mut().zip(items) {
            let (_, item) = self.document.dereference(item).ok()?;
            *slot = item.as_float().ok()? as f64;
        }

        Some(PdfRect::from_corners(values[0], values[1], values[2], values[3]))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory PDF fixtures for tests.

    use lopdf::content::{Content, Operation};
    use lopdf::{Document, Object, Stream, dictionary};

    /// A piece of text placed on a fixture page (PDF user space, y up).
    pub struct Placed<'a> {
        pub text: &'a str,
        pub x: f64,
        pub y: f64,
        pub size: f64,
    }

    pub fn placed(text: &str, x: f64, y: f64) -> Placed<'_> {
        Placed { text, x, y, size: 10.0 }
    }

    /// Build a one-page Helvetica PDF with the given text and optional crop box.
    pub fn build_pdf(media: [f64; 4], crop: Option<[f64; 4]>, items: &[Placed<'_>]) -> Vec<u8> {
        build_page(media, crop, "F1", items)
    }

    /// Like `build_pdf`, but the text selects a font missing from the page resources.
    pub fn build_pdf_missing_font(items: &[Placed<'_>]) -> Vec<u8> {
        build_page(A4, None, "F9", items)
    }

    /// A document whose page tree has no pages.
    pub fn build_empty_pdf() -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.add_object(dictionary! {
            "Type" => "Pages",
            "Kids" => Vec::<Object>::new(),
            "Count" => 0,
        });
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).expect("save fixture");
        buffer
    }

    fn build_page(
        media: [f64; 4],
        crop: Option<[f64; 4]>,
        font_key: &str,
        items: &[Placed<'_>],
    ) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                "F1" => font_id,
            },
        });

        let mut operations = Vec::new();
        for item in items {
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new(
                "Tf",
                vec![Object::Name(font_key.as_bytes().to_vec()), (item.size as f32).into()],
            ));
            operations.push(Operation::new(
                "Td",
                vec![(item.x as f32).into(), (item.y as f32).into()],
            ));
            operations.push(Operation::new("Tj", vec![Object::string_literal(item.text)]));
            operations.push(Operation::new("ET", vec![]));
        }
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("encode content"),
        ));

        let to_array = |r: [f64; 4]| -> Object {
            Object::Array(r.iter().map(|v| Object::Real(*v as f32)).collect())
        };

        let mut page = dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => to_array(media),
        };
        if let Some(crop) = crop {
            page.set("CropBox", to_array(crop));
        }
        let page_id = doc.add_object(page);

        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).expect("save fixture");
        buffer
    }

    pub const A4: [f64; 4] = [0.0, 0.0, 595.0, 842.0];
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[test]
    fn test_load_rejects_garbage() {
        let err = PdfDocument::load(b"definitely not a pdf").err().unwrap();
        assert!(matches!(err, PdfError::Open(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_page_index_bounds() {
        let doc = PdfDocument::load(&build_pdf(A4, None, &[])).unwrap();
        assert_eq!(doc.page_count(), 1);
        assert_eq!(doc.page_number(0).unwrap(), 1);
        assert!(matches!(doc.page_number(1), Err(PdfError::InvalidPage(1))));
    }

    #[test]
    fn test_zero_page_document_loads() {
        let doc = PdfDocument::load(&build_empty_pdf()).unwrap();
        assert_eq!(doc.page_count(), 0);

        let err = doc.page_number(0).unwrap_err();
        assert!(matches!(err, PdfError::NoPages));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_media_box_to_page_space() {
        let doc = PdfDocument::load(&build_pdf(A4, None, &[])).unwrap();
        assert_eq!(doc.page_bbox(0).unwrap(), BBox::new(0.0, 0.0, 595.0, 842.0));
        assert_eq!(doc.crop_box(0).unwrap(), None);
    }

    #[test]
    fn test_page_space_round_trip() {
        let media = PdfRect::from_corners(0.0, 0.0, 595.0, 842.0);
        let crop = PdfRect::from_corners(5.0, 580.0, 595.0, 752.0);
        let bbox = crop.to_page_space(&media);
        assert_eq!(bbox, BBox::new(5.0, 90.0, 595.0, 262.0));
        assert_eq!(PdfRect::from_page_space(&bbox, &media), crop);
    }
}
