//! Fakes and fixtures shared by unit and integration tests

use std::io::{Cursor, Write};
use std::thread;
use std::time::Duration;

use image::{Rgba, RgbaImage};
use log::LevelFilter;
use simplelog::{Config, TestLogger};
use zip::ZipWriter;
use zip::write::FileOptions;

use crate::format::Document;
use crate::pdf::{EngineError, PdfDocument, PdfEngine};

const FAKE_PDF_HEADER: &str = "%PDF-fake\n";

/// Route `log` output to the test harness; safe to call from every test
pub fn init_test_logging() {
    let _ = TestLogger::init(LevelFilter::Debug, Config::default());
}

/// Payload understood by [`FakePdfEngine`]
pub fn fake_pdf_bytes(pages: usize) -> Vec<u8> {
    format!("{FAKE_PDF_HEADER}pages={pages}\n").into_bytes()
}

pub fn pdf_document(pages: usize) -> Document {
    Document::new("fake.pdf", Some("application/pdf"), fake_pdf_bytes(pages))
}

/// Deterministic engine: every page is 100x50 pt, transparent except for a
/// single black ink pixel at (`INK_X`, `INK_Y`).
#[derive(Clone, Debug, Default)]
pub struct FakePdfEngine {
    render_delay: Option<Duration>,
    failing_page: Option<usize>,
    title: Option<String>,
}

impl FakePdfEngine {
    pub const PAGE_WIDTH: f32 = 100.0;
    pub const PAGE_HEIGHT: f32 = 50.0;
    pub const INK_X: u32 = 1;
    pub const INK_Y: u32 = 1;

    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep before every rasterization
    pub fn with_render_delay(mut self, delay: Duration) -> Self {
        self.render_delay = Some(delay);
        self
    }

    /// Fail rasterization of this 1-indexed page
    pub fn failing_page(mut self, page: usize) -> Self {
        self.failing_page = Some(page);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

impl PdfEngine for FakePdfEngine {
    fn open(&self, bytes: &[u8]) -> Result<Box<dyn PdfDocument>, EngineError> {
        let text = std::str::from_utf8(bytes)
            .map_err(|_| EngineError::InvalidDocument("binary payload".into()))?;
        let rest = text
            .strip_prefix(FAKE_PDF_HEADER)
            .ok_or_else(|| EngineError::InvalidDocument("missing header".into()))?;
        let pages = rest
            .trim()
            .strip_prefix("pages=")
            .and_then(|n| n.parse().ok())
            .ok_or_else(|| EngineError::InvalidDocument("missing page count".into()))?;

        Ok(Box::new(FakePdfDocument {
            pages,
            engine: self.clone(),
        }))
    }
}

struct FakePdfDocument {
    pages: usize,
    engine: FakePdfEngine,
}

impl PdfDocument for FakePdfDocument {
    fn page_count(&self) -> usize {
        self.pages
    }

    fn title(&self) -> Option<String> {
        self.engine.title.clone()
    }

    fn page_size(&self, index: usize) -> Result<(f32, f32), EngineError> {
        if index >= self.pages {
            return Err(EngineError::MissingPage(index));
        }
        Ok((FakePdfEngine::PAGE_WIDTH, FakePdfEngine::PAGE_HEIGHT))
    }

    fn render(&self, index: usize, scale: f32) -> Result<RgbaImage, EngineError> {
        let (w, h) = self.page_size(index)?;
        if let Some(delay) = self.engine.render_delay {
            thread::sleep(delay);
        }
        if self.engine.failing_page == Some(index + 1) {
            return Err(EngineError::Backend(format!("page {} is damaged", index + 1)));
        }

        let width = (w * scale).round().max(1.0) as u32;
        let height = (h * scale).round().max(1.0) as u32;
        let mut image = RgbaImage::new(width, height);
        if FakePdfEngine::INK_X < width && FakePdfEngine::INK_Y < height {
            image.put_pixel(
                FakePdfEngine::INK_X,
                FakePdfEngine::INK_Y,
                Rgba([0, 0, 0, 255]),
            );
        }
        Ok(image)
    }
}

const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const R_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const HYPERLINK_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink";

/// Builds minimal `.docx` packages in memory
#[derive(Clone, Debug, Default)]
pub struct DocxBuilder {
    body: String,
    styles: Option<String>,
    numbering: Option<String>,
    hyperlinks: Vec<(String, String)>,
    omit_document: bool,
}

impl DocxBuilder {
    /// `body` is the inner XML of `<w:body>`; `w:` and `r:` prefixes are bound
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            ..Self::default()
        }
    }

    /// Inner XML of `<w:styles>`
    pub fn styles(mut self, xml: impl Into<String>) -> Self {
        self.styles = Some(xml.into());
        self
    }

    /// Inner XML of `<w:numbering>`
    pub fn numbering(mut self, xml: impl Into<String>) -> Self {
        self.numbering = Some(xml.into());
        self
    }

    pub fn hyperlink(mut self, id: impl Into<String>, target: impl Into<String>) -> Self {
        self.hyperlinks.push((id.into(), target.into()));
        self
    }

    /// Leave out `word/document.xml`
    pub fn without_document(mut self) -> Self {
        self.omit_document = true;
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let mut add = |name: &str, content: String| {
            zip.start_file(name, FileOptions::default())
                .expect("start zip entry");
            zip.write_all(content.as_bytes()).expect("write zip entry");
        };

        add(
            "[Content_Types].xml",
            r#"<?xml version="1.0" encoding="UTF-8"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"/>"#
                .to_string(),
        );
        if !self.omit_document {
            add(
                "word/document.xml",
                format!(
                    r#"<?xml version="1.0" encoding="UTF-8"?><w:document xmlns:w="{W_NS}" xmlns:r="{R_NS}"><w:body>{}</w:body></w:document>"#,
                    self.body
                ),
            );
        }
        if let Some(styles) = self.styles {
            add(
                "word/styles.xml",
                format!(r#"<w:styles xmlns:w="{W_NS}">{styles}</w:styles>"#),
            );
        }
        if let Some(numbering) = self.numbering {
            add(
                "word/numbering.xml",
                format!(r#"<w:numbering xmlns:w="{W_NS}">{numbering}</w:numbering>"#),
            );
        }
        if !self.hyperlinks.is_empty() {
            let rels: String = self
                .hyperlinks
                .iter()
                .map(|(id, target)| {
                    format!(
                        r#"<Relationship Id="{id}" Type="{HYPERLINK_TYPE}" Target="{target}" TargetMode="External"/>"#
                    )
                })
                .collect();
            add(
                "word/_rels/document.xml.rels",
                format!(
                    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{rels}</Relationships>"#
                ),
            );
        }

        zip.finish().expect("finish zip").into_inner()
    }
}

pub fn docx_bytes(body: &str) -> Vec<u8> {
    DocxBuilder::new(body).build()
}

pub fn word_document(body: &str) -> Document {
    Document::new(
        "report.docx",
        Some("application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
        docx_bytes(body),
    )
}

pub fn text_document(name: &str, text: &str) -> Document {
    Document::new(name, Some("text/plain"), text.as_bytes().to_vec())
}
