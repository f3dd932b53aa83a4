//! PDF decoding backend boundary
//!
//! The viewer only orchestrates an engine: it opens documents, asks for page
//! geometry and rasterizes pages. Document handles are opened per thread, so
//! they need not be `Send`; the engine itself is shared.

use image::RgbaImage;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("not a valid PDF: {0}")]
    InvalidDocument(String),

    #[error("page index {0} does not exist")]
    MissingPage(usize),

    #[error("{0}")]
    Backend(String),
}

pub trait PdfEngine: Send + Sync {
    fn open(&self, bytes: &[u8]) -> Result<Box<dyn PdfDocument>, EngineError>;
}

/// An opened document. Page indices are 0-based.
pub trait PdfDocument {
    fn page_count(&self) -> usize;

    fn title(&self) -> Option<String> {
        None
    }

    /// Page size in points
    fn page_size(&self, index: usize) -> Result<(f32, f32), EngineError>;

    /// Rasterize at `scale` pixels per point. Unpainted areas are transparent.
    fn render(&self, index: usize, scale: f32) -> Result<RgbaImage, EngineError>;
}

#[cfg(feature = "pdf")]
pub use self::mupdf_backend::MupdfEngine;

#[cfg(feature = "pdf")]
mod mupdf_backend {
    use image::RgbaImage;
    use mupdf::{Colorspace, Document, Matrix, Pixmap};

    use super::{EngineError, PdfDocument, PdfEngine};

    const PDF_MAGIC: &str = "application/pdf";

    /// MuPDF-backed engine
    #[derive(Debug, Default, Clone, Copy)]
    pub struct MupdfEngine;

    impl PdfEngine for MupdfEngine {
        fn open(&self, bytes: &[u8]) -> Result<Box<dyn PdfDocument>, EngineError> {
            let doc = Document::from_bytes(bytes, PDF_MAGIC)
                .map_err(|e| EngineError::InvalidDocument(e.to_string()))?;
            let page_count = doc
                .page_count()
                .map_err(|e| EngineError::InvalidDocument(e.to_string()))?;
            Ok(Box::new(MupdfDocument {
                doc,
                page_count: usize::try_from(page_count).unwrap_or(0),
            }))
        }
    }

    struct MupdfDocument {
        doc: Document,
        page_count: usize,
    }

    impl MupdfDocument {
        fn load_page(&self, index: usize) -> Result<mupdf::Page, EngineError> {
            if index >= self.page_count {
                return Err(EngineError::MissingPage(index));
            }
            self.doc
                .load_page(index as i32)
                .map_err(|e| EngineError::Backend(e.to_string()))
        }
    }

    impl PdfDocument for MupdfDocument {
        fn page_count(&self) -> usize {
            self.page_count
        }

        fn title(&self) -> Option<String> {
            self.doc
                .metadata(mupdf::MetadataName::Title)
                .ok()
                .filter(|t| !t.is_empty())
        }

        fn page_size(&self, index: usize) -> Result<(f32, f32), EngineError> {
            let bounds = self
                .load_page(index)?
                .bounds()
                .map_err(|e| EngineError::Backend(e.to_string()))?;
            Ok((bounds.x1 - bounds.x0, bounds.y1 - bounds.y0))
        }

        fn render(&self, index: usize, scale: f32) -> Result<RgbaImage, EngineError> {
            let page = self.load_page(index)?;
            let pixmap = page
                .to_pixmap(
                    &Matrix::new_scale(scale, scale),
                    &Colorspace::device_rgb(),
                    true,
                    false,
                )
                .map_err(|e| EngineError::Backend(e.to_string()))?;
            pixmap_to_rgba(&pixmap)
        }
    }

    /// Copy premultiplied RGBA samples into a straight-alpha image
    fn pixmap_to_rgba(pixmap: &Pixmap) -> Result<RgbaImage, EngineError> {
        let n = pixmap.n() as usize;
        if n != 4 {
            return Err(EngineError::Backend(format!(
                "Unsupported pixmap format: {n} channels"
            )));
        }

        let width = pixmap.width() as usize;
        let height = pixmap.height() as usize;
        let stride = pixmap.stride() as usize;
        let samples = pixmap.samples();
        let row_bytes = width * n;
        if samples.len() < stride.saturating_mul(height) || row_bytes > stride {
            return Err(EngineError::Backend("Pixmap buffer size mismatch".into()));
        }

        let mut out = Vec::with_capacity(width * height * 4);
        for y in 0..height {
            let row = &samples[y * stride..y * stride + row_bytes];
            for px in row.chunks_exact(4) {
                let alpha = px[3];
                if alpha == 0 {
                    out.extend_from_slice(&[0, 0, 0, 0]);
                    continue;
                }
                for &c in &px[..3] {
                    out.push(((u16::from(c) * 255 + u16::from(alpha) / 2) / u16::from(alpha)).min(255) as u8);
                }
                out.push(alpha);
            }
        }

        RgbaImage::from_raw(width as u32, height as u32, out)
            .ok_or_else(|| EngineError::Backend("Pixmap buffer size mismatch".into()))
    }
}
