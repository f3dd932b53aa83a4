//! Documents and format detection

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::error::{Result, ViewerError};

const PDF_MEDIA_TYPE: &str = "application/pdf";
const DOCX_MEDIA_TYPE: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
const DOC_MEDIA_TYPE: &str = "application/msword";
const TEXT_MEDIA_TYPE: &str = "text/plain";

/// A user-selected file: payload plus its declared name and media type.
///
/// Cloning is cheap; the payload is shared and never mutated.
#[derive(Clone)]
pub struct Document {
    name: String,
    media_type: Option<String>,
    bytes: Arc<[u8]>,
}

impl Document {
    pub fn new(
        name: impl Into<String>,
        media_type: Option<&str>,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Self {
        Self {
            name: name.into(),
            media_type: media_type
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(str::to_string),
            bytes: bytes.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn media_type(&self) -> Option<&str> {
        self.media_type.as_deref()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn shared_bytes(&self) -> Arc<[u8]> {
        Arc::clone(&self.bytes)
    }

    /// Lowercase filename extension without the dot
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("name", &self.name)
            .field("media_type", &self.media_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Format {
    Pdf,
    Word,
    Text,
}

impl Format {
    pub fn name(&self) -> &'static str {
        match self {
            Format::Pdf => "PDF",
            Format::Word => "Word",
            Format::Text => "Text",
        }
    }

    /// Whether the format has discrete pages the user can step through
    pub fn is_paginated(&self) -> bool {
        matches!(self, Format::Pdf)
    }

    fn from_media_type(media_type: &str) -> Option<Self> {
        let essence = media_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            PDF_MEDIA_TYPE => Some(Format::Pdf),
            DOCX_MEDIA_TYPE | DOC_MEDIA_TYPE => Some(Format::Word),
            TEXT_MEDIA_TYPE => Some(Format::Text),
            _ => None,
        }
    }

    fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "pdf" => Some(Format::Pdf),
            "docx" | "doc" => Some(Format::Word),
            "txt" => Some(Format::Text),
            _ => None,
        }
    }
}

/// Classify a document. Declared media type wins; the extension is the fallback.
pub fn detect(document: &Document) -> Result<Format> {
    document
        .media_type()
        .and_then(Format::from_media_type)
        .or_else(|| document.extension().as_deref().and_then(Format::from_extension))
        .ok_or_else(|| ViewerError::UnsupportedFormat {
            name: document.name().to_string(),
            media_type: document.media_type().map(str::to_string),
        })
}
