//! Document assembly on top of lopdf.
//!
//! `DocumentBuilder` accumulates pages, fonts and images, then writes the
//! object graph (page tree, shared resources, catalog, info) in one pass.

use crate::archival::{self, ArchivalProfile};
use crate::error::CoreError;
use crate::fonts::{encode_winansi, Font};
use crate::images::ImageData;
use crate::page::{DocumentInfo, PageSize};
use chrono::Utc;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, Stream};

/// Handle to a font registered with a builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FontId(usize);

/// Handle to an image registered with a builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageId(usize);

struct PageDraft {
    size: PageSize,
    ops: Vec<Operation>,
}

/// Builds a PDF document from pages, text, and images.
pub struct DocumentBuilder {
    version: String,
    pages: Vec<PageDraft>,
    fonts: Vec<Font>,
    images: Vec<ImageData>,
    info: DocumentInfo,
    archival: Option<ArchivalProfile>,
}

impl DocumentBuilder {
    /// Start a document with the given PDF version, e.g. "1.7".
    pub fn new(version: &str) -> Self {
        Self {
            version: version.to_string(),
            pages: Vec::new(),
            fonts: Vec::new(),
            images: Vec::new(),
            info: DocumentInfo::default(),
            archival: None,
        }
    }

    pub fn set_info(&mut self, info: DocumentInfo) {
        self.info = info;
    }

    /// Attach an archival (PDF/A-style) profile: output intent, XMP
    /// metadata, and a file identifier. Applied when the document is
    /// finished.
    pub fn set_archival_profile(&mut self, profile: ArchivalProfile) {
        self.archival = Some(profile);
    }

    /// Append a page and return its 1-indexed page number.
    pub fn add_page(&mut self, size: PageSize) -> u32 {
        self.pages.push(PageDraft {
            size,
            ops: Vec::new(),
        });
        self.pages.len() as u32
    }

    /// Register a font for use on any page.
    pub fn add_font(&mut self, font: impl Into<Font>) -> FontId {
        self.fonts.push(font.into());
        FontId(self.fonts.len() - 1)
    }

    /// Register an image for use on any page.
    pub fn add_image_data(&mut self, image: ImageData) -> ImageId {
        self.images.push(image);
        ImageId(self.images.len() - 1)
    }

    pub fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn page_mut(&mut self, page: u32) -> Result<&mut PageDraft, CoreError> {
        if page == 0 {
            return Err(CoreError::PageNotFound(0));
        }
        self.pages
            .get_mut(page as usize - 1)
            .ok_or(CoreError::PageNotFound(page))
    }

    fn check_font(&self, font: FontId) -> Result<(), CoreError> {
        if font.0 >= self.fonts.len() {
            return Err(CoreError::Font("Unknown font handle".into()));
        }
        Ok(())
    }

    /// Place a single line of text with its baseline at (x, y).
    pub fn add_text(
        &mut self,
        page: u32,
        font: FontId,
        size: f64,
        x: f64,
        y: f64,
        text: &str,
    ) -> Result<(), CoreError> {
        if text.is_empty() {
            return Ok(());
        }
        self.check_font(font)?;
        let draft = self.page_mut(page)?;
        draft.ops.push(Operation::new("BT", vec![]));
        draft.ops.push(Operation::new(
            "Tf",
            vec![
                Object::Name(font_res_name(font.0).into_bytes()),
                Object::Real(size as f32),
            ],
        ));
        draft.ops.push(Operation::new(
            "Td",
            vec![Object::Real(x as f32), Object::Real(y as f32)],
        ));
        draft.ops.push(Operation::new(
            "Tj",
            vec![Object::String(
                encode_winansi(text),
                lopdf::StringFormat::Literal,
            )],
        ));
        draft.ops.push(Operation::new("ET", vec![]));
        Ok(())
    }

    /// Place a word-wrapped paragraph. The first baseline sits at (x, y) and
    /// subsequent lines advance downward by `leading`. Returns the vertical
    /// extent consumed.
    #[allow(clippy::too_many_arguments)]
    pub fn add_paragraph(
        &mut self,
        page: u32,
        font: FontId,
        size: f64,
        x: f64,
        y: f64,
        wrap_width: f64,
        leading: f64,
        text: &str,
    ) -> Result<f64, CoreError> {
        if text.trim().is_empty() {
            return Ok(0.0);
        }
        self.check_font(font)?;
        let lines = wrap_text(&self.fonts[font.0], size, wrap_width, text);

        let draft = self.page_mut(page)?;
        draft.ops.push(Operation::new("BT", vec![]));
        draft.ops.push(Operation::new(
            "Tf",
            vec![
                Object::Name(font_res_name(font.0).into_bytes()),
                Object::Real(size as f32),
            ],
        ));
        draft
            .ops
            .push(Operation::new("TL", vec![Object::Real(leading as f32)]));
        draft.ops.push(Operation::new(
            "Td",
            vec![Object::Real(x as f32), Object::Real(y as f32)],
        ));
        for (i, line) in lines.iter().enumerate() {
            if i > 0 {
                draft.ops.push(Operation::new("T*", vec![]));
            }
            draft.ops.push(Operation::new(
                "Tj",
                vec![Object::String(
                    encode_winansi(line),
                    lopdf::StringFormat::Literal,
                )],
            ));
        }
        draft.ops.push(Operation::new("ET", vec![]));
        Ok(leading * lines.len() as f64)
    }

    /// Draw a registered image with its lower-left corner at (x, y), scaled
    /// to the given width and height in points.
    pub fn add_image(
        &mut self,
        page: u32,
        image: ImageId,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    ) -> Result<(), CoreError> {
        if image.0 >= self.images.len() {
            return Err(CoreError::Image("Unknown image handle".into()));
        }
        let draft = self.page_mut(page)?;
        draft.ops.push(Operation::new("q", vec![]));
        draft.ops.push(Operation::new(
            "cm",
            vec![
                Object::Real(width as f32),
                Object::Real(0.0),
                Object::Real(0.0),
                Object::Real(height as f32),
                Object::Real(x as f32),
                Object::Real(y as f32),
            ],
        ));
        draft.ops.push(Operation::new(
            "Do",
            vec![Object::Name(image_res_name(image.0).into_bytes())],
        ));
        draft.ops.push(Operation::new("Q", vec![]));
        Ok(())
    }

    /// Serialize the document to bytes.
    pub fn finish(self) -> Result<Vec<u8>, CoreError> {
        if self.pages.is_empty() {
            return Err(CoreError::Pdf("Document has no pages".into()));
        }

        let mut doc = Document::with_version(self.version.clone());
        let pages_id = doc.new_object_id();

        // Shared resources: every page references the same dictionary.
        let mut resources = Dictionary::new();
        if !self.fonts.is_empty() {
            let mut font_dict = Dictionary::new();
            for (i, font) in self.fonts.iter().enumerate() {
                let font_ref = write_font(&mut doc, font)?;
                font_dict.set(font_res_name(i), Object::Reference(font_ref));
            }
            resources.set("Font", Object::Dictionary(font_dict));
        }
        if !self.images.is_empty() {
            let mut xobjects = Dictionary::new();
            for (i, image) in self.images.iter().enumerate() {
                let image_ref = write_image(&mut doc, image);
                xobjects.set(image_res_name(i), Object::Reference(image_ref));
            }
            resources.set("XObject", Object::Dictionary(xobjects));
        }
        let resources_id = doc.add_object(Object::Dictionary(resources));

        let mut kids = Vec::with_capacity(self.pages.len());
        for draft in &self.pages {
            let content = Content {
                operations: draft.ops.clone(),
            };
            let encoded = content
                .encode()
                .map_err(|e| CoreError::Pdf(format!("Failed to encode content: {}", e)))?;
            let content_id = doc.add_object(Stream::new(Dictionary::new(), encoded));

            let mb = draft.size.media_box();
            let page_dict = Dictionary::from_iter(vec![
                ("Type", Object::Name(b"Page".to_vec())),
                ("Parent", Object::Reference(pages_id)),
                (
                    "MediaBox",
                    Object::Array(vec![
                        Object::Real(mb[0] as f32),
                        Object::Real(mb[1] as f32),
                        Object::Real(mb[2] as f32),
                        Object::Real(mb[3] as f32),
                    ]),
                ),
                ("Contents", Object::Reference(content_id)),
                ("Resources", Object::Reference(resources_id)),
            ]);
            kids.push(Object::Reference(doc.add_object(page_dict)));
        }

        let pages_dict = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Count", Object::Integer(kids.len() as i64)),
            ("Kids", Object::Array(kids)),
        ]);
        doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

        let mut catalog = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(pages_id)),
        ]);

        if let Some(profile) = &self.archival {
            archival::apply(&mut doc, &mut catalog, profile, &self.info)?;
        }

        let catalog_id = doc.add_object(Object::Dictionary(catalog));
        doc.trailer.set("Root", Object::Reference(catalog_id));

        let info_id = doc.add_object(Object::Dictionary(build_info_dict(&self.info)));
        doc.trailer.set("Info", Object::Reference(info_id));

        doc.compress();

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer)
            .map_err(|e| CoreError::Pdf(format!("Failed to save PDF: {}", e)))?;
        Ok(buffer)
    }

    /// Serialize and write the document to a file, creating parent
    /// directories as needed.
    pub fn save(self, path: impl AsRef<std::path::Path>) -> Result<(), CoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let bytes = self.finish()?;
        std::fs::write(path, bytes)?;
        Ok(())
    }
}

fn font_res_name(index: usize) -> String {
    format!("F{}", index + 1)
}

fn image_res_name(index: usize) -> String {
    format!("Im{}", index + 1)
}

/// Greedy word wrap against measured widths. A word longer than the wrap
/// width gets a line of its own.
fn wrap_text(font: &Font, size: f64, wrap_width: f64, text: &str) -> Vec<String> {
    let space_width = font.text_width(" ", size);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_width = 0.0;

    for word in text.split_whitespace() {
        let word_width = font.text_width(word, size);
        if current.is_empty() {
            current.push_str(word);
            current_width = word_width;
        } else if current_width + space_width + word_width <= wrap_width {
            current.push(' ');
            current.push_str(word);
            current_width += space_width + word_width;
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
            current_width = word_width;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

fn build_info_dict(info: &DocumentInfo) -> Dictionary {
    let mut dict = Dictionary::new();
    if let Some(title) = &info.title {
        dict.set(
            "Title",
            Object::String(title.clone().into_bytes(), lopdf::StringFormat::Literal),
        );
    }
    if let Some(author) = &info.author {
        dict.set(
            "Author",
            Object::String(author.clone().into_bytes(), lopdf::StringFormat::Literal),
        );
    }
    if let Some(subject) = &info.subject {
        dict.set(
            "Subject",
            Object::String(subject.clone().into_bytes(), lopdf::StringFormat::Literal),
        );
    }
    if let Some(creator) = &info.creator {
        dict.set(
            "Creator",
            Object::String(creator.clone().into_bytes(), lopdf::StringFormat::Literal),
        );
    }
    let date = Utc::now().format("D:%Y%m%d%H%M%S+00'00'").to_string();
    dict.set(
        "CreationDate",
        Object::String(date.into_bytes(), lopdf::StringFormat::Literal),
    );
    dict
}

fn write_font(doc: &mut Document, font: &Font) -> Result<lopdf::ObjectId, CoreError> {
    match font {
        Font::Standard(standard) => {
            let dict = Dictionary::from_iter(vec![
                ("Type", Object::Name(b"Font".to_vec())),
                ("Subtype", Object::Name(b"Type1".to_vec())),
                (
                    "BaseFont",
                    Object::Name(standard.base_name().as_bytes().to_vec()),
                ),
                ("Encoding", Object::Name(b"WinAnsiEncoding".to_vec())),
            ]);
            Ok(doc.add_object(dict))
        }
        Font::TrueType(ttf) => {
            let file_dict = Dictionary::from_iter(vec![(
                "Length1",
                Object::Integer(ttf.data.len() as i64),
            )]);
            let file_id = doc.add_object(Stream::new(file_dict, ttf.data.clone()));

            let descriptor = Dictionary::from_iter(vec![
                ("Type", Object::Name(b"FontDescriptor".to_vec())),
                (
                    "FontName",
                    Object::Name(ttf.base_name.as_bytes().to_vec()),
                ),
                ("Flags", Object::Integer(32)), // nonsymbolic
                (
                    "FontBBox",
                    Object::Array(
                        ttf.bbox
                            .iter()
                            .map(|v| Object::Integer(v.round() as i64))
                            .collect(),
                    ),
                ),
                ("ItalicAngle", Object::Integer(0)),
                ("Ascent", Object::Integer(ttf.ascent.round() as i64)),
                ("Descent", Object::Integer(ttf.descent.round() as i64)),
                ("CapHeight", Object::Integer(ttf.ascent.round() as i64)),
                ("StemV", Object::Integer(80)),
                ("FontFile2", Object::Reference(file_id)),
            ]);
            let descriptor_id = doc.add_object(descriptor);

            let dict = Dictionary::from_iter(vec![
                ("Type", Object::Name(b"Font".to_vec())),
                ("Subtype", Object::Name(b"TrueType".to_vec())),
                (
                    "BaseFont",
                    Object::Name(ttf.base_name.as_bytes().to_vec()),
                ),
                ("FirstChar", Object::Integer(32)),
                ("LastChar", Object::Integer(255)),
                (
                    "Widths",
                    Object::Array(ttf.widths.iter().map(|w| Object::Integer(*w)).collect()),
                ),
                ("Encoding", Object::Name(b"WinAnsiEncoding".to_vec())),
                ("FontDescriptor", Object::Reference(descriptor_id)),
            ]);
            Ok(doc.add_object(dict))
        }
    }
}

fn write_image(doc: &mut Document, image: &ImageData) -> lopdf::ObjectId {
    let dict = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"XObject".to_vec())),
        ("Subtype", Object::Name(b"Image".to_vec())),
        ("Width", Object::Integer(image.width as i64)),
        ("Height", Object::Integer(image.height as i64)),
        (
            "ColorSpace",
            Object::Name(image.color_space.pdf_name().to_vec()),
        ),
        (
            "BitsPerComponent",
            Object::Integer(image.bits_per_component as i64),
        ),
        ("Filter", Object::Name(image.filter.pdf_name().to_vec())),
    ]);
    doc.add_object(Stream::new(dict, image.data.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fonts::StandardFont;
    use pretty_assertions::assert_eq;

    fn helvetica() -> Font {
        Font::Standard(StandardFont::Helvetica)
    }

    #[test]
    fn test_empty_document_fails() {
        let builder = DocumentBuilder::new("1.7");
        assert!(builder.finish().is_err());
    }

    #[test]
    fn test_single_page_roundtrips() {
        let mut builder = DocumentBuilder::new("1.7");
        let font = builder.add_font(StandardFont::Helvetica);
        let page = builder.add_page(PageSize::A4);
        builder
            .add_text(page, font, 12.0, 50.0, 700.0, "Hello")
            .unwrap();
        let bytes = builder.finish().unwrap();

        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn test_multiple_pages_counted() {
        let mut builder = DocumentBuilder::new("1.5");
        for _ in 0..4 {
            builder.add_page(PageSize::LETTER);
        }
        let bytes = builder.finish().unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 4);
    }

    #[test]
    fn test_text_on_missing_page_fails() {
        let mut builder = DocumentBuilder::new("1.7");
        let font = builder.add_font(StandardFont::Helvetica);
        builder.add_page(PageSize::A4);
        let result = builder.add_text(2, font, 12.0, 0.0, 0.0, "nope");
        assert!(matches!(result, Err(CoreError::PageNotFound(2))));
    }

    #[test]
    fn test_page_zero_fails() {
        let mut builder = DocumentBuilder::new("1.7");
        let font = builder.add_font(StandardFont::Helvetica);
        builder.add_page(PageSize::A4);
        let result = builder.add_text(0, font, 12.0, 0.0, 0.0, "nope");
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_text_is_noop() {
        let mut builder = DocumentBuilder::new("1.7");
        let font = builder.add_font(StandardFont::Helvetica);
        let page = builder.add_page(PageSize::A4);
        builder.add_text(page, font, 12.0, 0.0, 0.0, "").unwrap();
        // No ops were appended
        assert!(builder.pages[0].ops.is_empty());
    }

    #[test]
    fn test_info_dictionary_written() {
        let mut builder = DocumentBuilder::new("1.7");
        builder.add_page(PageSize::A4);
        builder.set_info(DocumentInfo::new().title("Sample").author("pdfsmith"));
        let bytes = builder.finish().unwrap();

        let doc = Document::load_mem(&bytes).unwrap();
        let info_ref = doc.trailer.get(b"Info").unwrap().as_reference().unwrap();
        let info = doc.get_object(info_ref).unwrap().as_dict().unwrap();
        let title = info.get(b"Title").unwrap().as_str().unwrap();
        assert_eq!(title, b"Sample");
        assert!(info.get(b"CreationDate").is_ok());
    }

    #[test]
    fn test_wrap_text_respects_width() {
        let font = helvetica();
        let text = "the quick brown fox jumps over the lazy dog again and again";
        let lines = wrap_text(&font, 12.0, 120.0, text);
        assert!(lines.len() > 1);
        for line in &lines {
            // A small tolerance: the first word of a line may exceed the width
            if line.split_whitespace().count() > 1 {
                assert!(font.text_width(line, 12.0) <= 120.0 + 1.0, "line: {}", line);
            }
        }
        // No words lost
        let rejoined: Vec<&str> = lines.iter().flat_map(|l| l.split_whitespace()).collect();
        let original: Vec<&str> = text.split_whitespace().collect();
        assert_eq!(rejoined, original);
    }

    #[test]
    fn test_wrap_single_long_word() {
        let font = helvetica();
        let lines = wrap_text(&font, 12.0, 10.0, "supercalifragilistic");
        assert_eq!(lines.len(), 1);
    }

    #[test]
    fn test_paragraph_returns_height() {
        let mut builder = DocumentBuilder::new("1.7");
        let font = builder.add_font(StandardFont::Helvetica);
        let page = builder.add_page(PageSize::A4);
        let height = builder
            .add_paragraph(
                page,
                font,
                12.0,
                50.0,
                700.0,
                150.0,
                14.0,
                "the quick brown fox jumps over the lazy dog",
            )
            .unwrap();
        assert!(height >= 14.0);
        assert_eq!(height % 14.0, 0.0);
    }

    #[test]
    fn test_image_embedding_roundtrips() {
        let mut builder = DocumentBuilder::new("1.7");
        let page = builder.add_page(PageSize::A4);

        let mut png_bytes = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut png_bytes, 2, 2);
            encoder.set_color(png::ColorType::Rgb);
            encoder.set_depth(png::BitDepth::Eight);
            let mut writer = encoder.write_header().unwrap();
            writer.write_image_data(&[0u8; 12]).unwrap();
        }
        let image = ImageData::from_bytes(&png_bytes).unwrap();
        let image_id = builder.add_image_data(image);
        builder
            .add_image(page, image_id, 100.0, 100.0, 50.0, 50.0)
            .unwrap();
        let bytes = builder.finish().unwrap();

        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
        // The XObject must exist somewhere in the object graph
        let has_image = doc.objects.values().any(|obj| {
            obj.as_stream()
                .ok()
                .and_then(|s| s.dict.get(b"Subtype").ok())
                .and_then(|o| o.as_name().ok())
                .map(|n| n == b"Image")
                .unwrap_or(false)
        });
        assert!(has_image);
    }
}
