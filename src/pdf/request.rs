//! Messages exchanged with the render worker

use std::fmt;
use std::sync::Arc;

use super::engine::EngineError;
use super::types::PageData;
use crate::theme::{PixelTransform, Rgb, ThemeId};
use crate::view_state::Rotation;

/// Monotonic tag; only the newest id issued by a service is live
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub u64);

impl RequestId {
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Everything the worker needs to produce finished pixels
#[derive(Clone, Debug, PartialEq)]
pub struct RenderParams {
    pub zoom: f32,
    /// Pixels per PDF point before zoom
    pub render_scale: f32,
    pub rotation: Rotation,
    pub theme: ThemeId,
    /// Painted beneath transparent page areas
    pub page_fill: Rgb,
    pub transform: PixelTransform,
}

impl RenderParams {
    pub fn raster_scale(&self) -> f32 {
        self.render_scale * self.zoom
    }
}

#[derive(Debug)]
pub enum RenderRequest {
    /// Rasterize a 1-indexed page
    Page {
        id: RequestId,
        page: usize,
        params: RenderParams,
    },
    Shutdown,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WorkerFault {
    #[error("PDF engine: {0}")]
    Pdf(#[from] EngineError),

    #[error("page {0} does not exist")]
    NoSuchPage(usize),

    #[error("page {0} rendered to an empty surface")]
    EmptyRaster(usize),
}

#[derive(Debug)]
pub enum RenderResponse {
    Rendered { id: RequestId, data: Arc<PageData> },
    Failed {
        id: RequestId,
        page: usize,
        fault: WorkerFault,
    },
}

impl RenderResponse {
    pub fn id(&self) -> RequestId {
        match self {
            RenderResponse::Rendered { id, .. } | RenderResponse::Failed { id, .. } => *id,
        }
    }
}
