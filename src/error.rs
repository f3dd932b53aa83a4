//! Error types shared by the viewer host and its rendering strategies

use crate::format::Format;

/// Errors surfaced by the viewer for the active document session.
///
/// None of these are fatal: each is scoped to a single document and is
/// cleared when a new document is selected.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ViewerError {
    #[error("unsupported file \"{name}\" ({})", media_type.as_deref().unwrap_or("no media type"))]
    UnsupportedFormat {
        name: String,
        media_type: Option<String>,
    },

    #[error("could not load document: {0}")]
    Load(String),

    #[error("could not convert Word document: {0}")]
    Conversion(String),

    #[error("could not read text file: {0}")]
    Read(String),

    #[error("page {page} is outside 1..={total}")]
    Range { page: usize, total: usize },

    #[error("{format:?} strategy cannot {action} while {phase}")]
    InvalidState {
        format: Format,
        action: &'static str,
        phase: &'static str,
    },

    #[error("render failed: {0}")]
    Engine(String),
}

impl ViewerError {
    /// Whether the chrome should show this error to the user.
    ///
    /// Range errors are clamped by the host and never surfaced.
    #[must_use]
    pub fn is_user_visible(&self) -> bool {
        !matches!(self, Self::Range { .. })
    }
}

pub type Result<T> = std::result::Result<T, ViewerError>;
