//! Document writer capability and its lopdf-backed implementation.
//!
//! Strategies talk to [`DocumentWriter`] in page millimetres measured from the
//! top-left corner, the same frame the layout code uses. The lopdf writer
//! converts to PDF user space (points, origin bottom-left) when it emits
//! content operations.

use crate::error::WriterError;
use crate::typography::{Font, FontStyle, MM_PER_PT};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};
use tracing::debug;

/// MIME type of every artifact produced by this crate.
pub const PDF_MIME: &str = "application/pdf";

/// Page dimensions in millimetres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageFormat {
    pub width_mm: f32,
    pub height_mm: f32,
}

impl PageFormat {
    pub const A4: PageFormat = PageFormat {
        width_mm: 210.0,
        height_mm: 297.0,
    };

    /// Height-to-width ratio.
    pub fn aspect_ratio(&self) -> f32 {
        self.height_mm / self.width_mm
    }

    fn width_pt(&self) -> f32 {
        self.width_mm / MM_PER_PT
    }

    fn height_pt(&self) -> f32 {
        self.height_mm / MM_PER_PT
    }
}

impl Default for PageFormat {
    fn default() -> Self {
        Self::A4
    }
}

/// Opaque 8-bit RGB pixels, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Bitmap {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
}

impl Bitmap {
    pub fn new(width: u32, height: u32, rgb: Vec<u8>) -> Result<Self, WriterError> {
        let expected = width as usize * height as usize * 3;
        if rgb.len() != expected {
            return Err(WriterError::Image(format!(
                "expected {expected} bytes for {width}x{height} RGB, got {}",
                rgb.len()
            )));
        }
        Ok(Self { width, height, rgb })
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Height-to-width ratio.
    pub fn aspect_ratio(&self) -> f32 {
        self.height as f32 / self.width as f32
    }
}

/// Where an image lands on the page, in millimetres from the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x_mm: f32,
    pub y_mm: f32,
    pub width_mm: f32,
    pub height_mm: f32,
}

/// Incremental page-based document builder.
///
/// A fresh writer already holds one empty page; `add_page` appends another
/// and makes it current.
pub trait DocumentWriter: Send {
    fn format(&self) -> PageFormat;

    fn page_count(&self) -> usize;

    fn add_page(&mut self);

    /// Draws a single line of text with its baseline at `baseline_mm`.
    fn draw_text(
        &mut self,
        text: &str,
        font: Font,
        x_mm: f32,
        baseline_mm: f32,
    ) -> Result<(), WriterError>;

    fn draw_image(&mut self, bitmap: &Bitmap, placement: Placement) -> Result<(), WriterError>;

    /// Serializes the document. The writer is left empty afterwards.
    fn finish(&mut self) -> Result<Vec<u8>, WriterError>;
}

/// Creates one writer per export attempt.
pub trait WriterFactory: Send + Sync {
    fn create(&self, format: PageFormat) -> Box<dyn DocumentWriter>;
}

/// Factory for [`LopdfWriter`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LopdfWriterFactory;

impl WriterFactory for LopdfWriterFactory {
    fn create(&self, format: PageFormat) -> Box<dyn DocumentWriter> {
        Box::new(LopdfWriter::new(format))
    }
}

#[derive(Default)]
struct PageState {
    operations: Vec<Operation>,
    /// Resource name and index into `LopdfWriter::images`.
    images: Vec<(String, usize)>,
}

/// PDF writer using the base-14 Helvetica faces, so no fonts are embedded.
pub struct LopdfWriter {
    format: PageFormat,
    pages: Vec<PageState>,
    images: Vec<Stream>,
}

impl LopdfWriter {
    pub fn new(format: PageFormat) -> Self {
        Self {
            format,
            pages: vec![PageState::default()],
            images: Vec::new(),
        }
    }

    fn current_page(&mut self) -> &mut PageState {
        if self.pages.is_empty() {
            self.pages.push(PageState::default());
        }
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    fn to_pdf_y(&self, y_mm: f32) -> f32 {
        self.format.height_pt() - y_mm / MM_PER_PT
    }
}

fn font_resource(style: FontStyle) -> &'static str {
    match style {
        FontStyle::Regular => "F1",
        FontStyle::Bold => "F2",
    }
}

/// Characters WinAnsiEncoding places in 0x80-0x9F.
const WIN_ANSI_HIGH: [(char, u8); 27] = [
    ('€', 0x80),
    ('‚', 0x82),
    ('ƒ', 0x83),
    ('„', 0x84),
    ('…', 0x85),
    ('†', 0x86),
    ('‡', 0x87),
    ('ˆ', 0x88),
    ('‰', 0x89),
    ('Š', 0x8A),
    ('‹', 0x8B),
    ('Œ', 0x8C),
    ('Ž', 0x8E),
    ('‘', 0x91),
    ('’', 0x92),
    ('“', 0x93),
    ('”', 0x94),
    ('•', 0x95),
    ('–', 0x96),
    ('—', 0x97),
    ('˜', 0x98),
    ('™', 0x99),
    ('š', 0x9A),
    ('›', 0x9B),
    ('œ', 0x9C),
    ('ž', 0x9E),
    ('Ÿ', 0x9F),
];

/// Encodes text for the base-14 fonts. Characters WinAnsi has no glyph for
/// print as `?`.
fn to_win_ansi(s: &str) -> Vec<u8> {
    s.chars()
        .map(|c| match c as u32 {
            0x20..=0x7E | 0xA0..=0xFF => c as u8,
            _ => WIN_ANSI_HIGH
                .iter()
                .find(|(glyph, _)| *glyph == c)
                .map_or(b'?', |&(_, code)| code),
        })
        .collect()
}

impl DocumentWriter for LopdfWriter {
    fn format(&self) -> PageFormat {
        self.format
    }

    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn add_page(&mut self) {
        self.pages.push(PageState::default());
    }

    fn draw_text(
        &mut self,
        text: &str,
        font: Font,
        x_mm: f32,
        baseline_mm: f32,
    ) -> Result<(), WriterError> {
        if text.trim().is_empty() {
            return Ok(());
        }
        let x = x_mm / MM_PER_PT;
        let y = self.to_pdf_y(baseline_mm);
        let page = self.current_page();
        page.operations.extend([
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![
                    Object::Name(font_resource(font.style).as_bytes().to_vec()),
                    font.size_pt.into(),
                ],
            ),
            Operation::new("Td", vec![x.into(), y.into()]),
            Operation::new(
                "Tj",
                vec![Object::String(to_win_ansi(text), StringFormat::Literal)],
            ),
            Operation::new("ET", vec![]),
        ]);
        Ok(())
    }

    fn draw_image(&mut self, bitmap: &Bitmap, placement: Placement) -> Result<(), WriterError> {
        if bitmap.is_empty() {
            return Err(WriterError::Image("bitmap has no pixels".to_string()));
        }
        let image = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => i64::from(bitmap.width),
                "Height" => i64::from(bitmap.height),
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
            },
            bitmap.rgb.clone(),
        );
        self.images.push(image);
        let index = self.images.len() - 1;
        let name = format!("Im{}", self.images.len());

        let width = placement.width_mm / MM_PER_PT;
        let height = placement.height_mm / MM_PER_PT;
        let x = placement.x_mm / MM_PER_PT;
        let y = self.to_pdf_y(placement.y_mm + placement.height_mm);

        let page = self.current_page();
        page.operations.extend([
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![width.into(), 0.into(), 0.into(), height.into(), x.into(), y.into()],
            ),
            Operation::new("Do", vec![Object::Name(name.as_bytes().to_vec())]),
            Operation::new("Q", vec![]),
        ]);
        page.images.push((name, index));
        Ok(())
    }

    fn finish(&mut self) -> Result<Vec<u8>, WriterError> {
        let mut doc = Document::with_version("1.5");
        let pages = std::mem::take(&mut self.pages);
        let image_ids: Vec<ObjectId> = std::mem::take(&mut self.images)
            .into_iter()
            .map(|image| doc.add_object(image))
            .collect();

        let regular_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => FontStyle::Regular.postscript_name(),
            "Encoding" => "WinAnsiEncoding",
        });
        let bold_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => FontStyle::Bold.postscript_name(),
            "Encoding" => "WinAnsiEncoding",
        });

        let pages_id = doc.new_object_id();
        let media_box: Vec<Object> = vec![
            0.into(),
            0.into(),
            self.format.width_pt().into(),
            self.format.height_pt().into(),
        ];

        let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
        for page in pages {
            let content = Content {
                operations: page.operations,
            };
            let encoded = content
                .encode()
                .map_err(|e| WriterError::Encode(e.to_string()))?;
            let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));

            let mut xobjects = lopdf::Dictionary::new();
            for (name, index) in page.images {
                xobjects.set(name, image_ids[index]);
            }
            let resources = dictionary! {
                "Font" => dictionary! {
                    font_resource(FontStyle::Regular) => regular_id,
                    font_resource(FontStyle::Bold) => bold_id,
                },
                "XObject" => xobjects,
            };
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => media_box.clone(),
                "Contents" => content_id,
                "Resources" => resources,
            });
            kids.push(page_id.into());
        }

        let page_count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => page_count,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.compress();

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes)
            .map_err(|e| WriterError::Encode(e.to_string()))?;
        self.pages.push(PageState::default());

        debug!(pages = page_count, bytes = bytes.len(), "PDF document serialized");
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_win_ansi_keeps_typographic_punctuation() {
        assert_eq!(
            to_win_ansi("2020 – 2022 “v2”"),
            b"2020 \x96 2022 \x93v2\x94".to_vec()
        );
        assert_eq!(to_win_ansi("— • € café"), b"\x97 \x95 \x80 caf\xE9".to_vec());
        // C1 controls and characters outside the code page have no glyph.
        assert_eq!(to_win_ansi("\u{0096}→"), b"??".to_vec());
    }

    #[test]
    fn test_drawn_text_decodes_to_win_ansi_bytes() {
        let mut writer = LopdfWriter::new(PageFormat::A4);
        writer
            .draw_text("2020 – 2022 “v2”", Font::new(FontStyle::Regular, 10.0), 20.0, 20.0)
            .unwrap();
        let bytes = writer.finish().unwrap();

        let doc = Document::load_mem(&bytes).unwrap();
        let page_id = *doc.get_pages().values().next().unwrap();
        let content = Content::decode(&doc.get_page_content(page_id).unwrap()).unwrap();
        let shown: Vec<&[u8]> = content
            .operations
            .iter()
            .filter(|op| op.operator == "Tj")
            .filter_map(|op| op.operands.first())
            .filter_map(|operand| operand.as_str().ok())
            .collect();

        assert_eq!(shown, vec![&b"2020 \x96 2022 \x93v2\x94"[..]]);
    }

    #[test]
    fn test_bitmap_rejects_wrong_length() {
        assert!(Bitmap::new(2, 2, vec![0; 12]).is_ok());
        assert!(Bitmap::new(2, 2, vec![0; 11]).is_err());
    }

    #[test]
    fn test_writes_multi_page_document() {
        let mut writer = LopdfWriter::new(PageFormat::A4);
        let font = Font::new(FontStyle::Regular, 10.0);

        writer.draw_text("first page", font, 20.0, 20.0).unwrap();
        writer.add_page();
        writer
            .draw_text("second page", Font::new(FontStyle::Bold, 14.0), 20.0, 20.0)
            .unwrap();
        assert_eq!(writer.page_count(), 2);

        let bytes = writer.finish().unwrap();
        assert!(bytes.starts_with(b"%PDF-1.5"));

        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 2);
    }

    #[test]
    fn test_embeds_image() {
        let mut writer = LopdfWriter::new(PageFormat::A4);
        let bitmap = Bitmap::new(4, 2, vec![255; 24]).unwrap();
        let placement = Placement {
            x_mm: 0.0,
            y_mm: 100.0,
            width_mm: 210.0,
            height_mm: 105.0,
        };

        writer.draw_image(&bitmap, placement).unwrap();
        let bytes = writer.finish().unwrap();

        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
        let has_image = doc.objects.values().any(|obj| match obj {
            Object::Stream(stream) => stream
                .dict
                .get(b"Subtype")
                .and_then(|s| s.as_name())
                .map(|name| name == b"Image")
                .unwrap_or(false),
            _ => false,
        });
        assert!(has_image);
    }

    #[test]
    fn test_empty_bitmap_is_rejected() {
        let mut writer = LopdfWriter::new(PageFormat::A4);
        let bitmap = Bitmap::new(0, 0, vec![]).unwrap();
        let placement = Placement {
            x_mm: 0.0,
            y_mm: 0.0,
            width_mm: 1.0,
            height_mm: 1.0,
        };
        assert!(writer.draw_image(&bitmap, placement).is_err());
    }
}
