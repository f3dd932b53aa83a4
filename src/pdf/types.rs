//! Core types for PDF rendering

use image::RgbaImage;

use crate::theme::ThemeId;
use crate::view_state::Rotation;

/// Complete rendered page: themed, post-processed and rotated pixels
#[derive(Clone)]
pub struct PageData {
    pub image: RgbaImage,
    /// Page number (1-indexed)
    pub page_num: usize,
    /// Effective raster scale (render scale x zoom)
    pub scale_factor: f32,
    pub rotation: Rotation,
    pub theme: ThemeId,
}

impl PageData {
    pub fn width_px(&self) -> u32 {
        self.image.width()
    }

    pub fn height_px(&self) -> u32 {
        self.image.height()
    }
}

impl std::fmt::Debug for PageData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageData")
            .field("page_num", &self.page_num)
            .field("width_px", &self.image.width())
            .field("height_px", &self.image.height())
            .field("scale_factor", &self.scale_factor)
            .field("rotation", &self.rotation)
            .field("theme", &self.theme)
            .finish_non_exhaustive()
    }
}

/// Document metadata reported on load
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentInfo {
    pub page_count: usize,
    pub title: Option<String>,
}
