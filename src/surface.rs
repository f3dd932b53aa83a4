//! Rendered output and the display contract shared by all formats

use crate::pdf::PageData;
use crate::text::TextSurface;
use crate::theme::Rgb;
use crate::word::MarkupSurface;

/// Borrowed view of whatever the active strategy last produced
#[derive(Clone, Copy, Debug)]
pub enum Surface<'a> {
    /// Rasterized PDF page, zoom and rotation already applied
    Raster(&'a PageData),
    /// Converted Word flow with its scoped stylesheet
    Markup(&'a MarkupSurface),
    /// Formatted plain text
    Text(&'a TextSurface),
}

impl Surface<'_> {
    pub fn as_raster(&self) -> Option<&PageData> {
        match self {
            Surface::Raster(page) => Some(page),
            _ => None,
        }
    }

    pub fn as_markup(&self) -> Option<&MarkupSurface> {
        match self {
            Surface::Markup(markup) => Some(markup),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&TextSurface> {
        match self {
            Surface::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// How the chrome should display a surface.
///
/// Every surface arrives already zoomed: raster pages in their pixels, flow
/// content through the `transform: scale(..)` and font size of its scoped
/// stylesheet. `scale` is therefore always 1.0 today and names an extra
/// display scale the chrome must apply on top.
#[derive(Clone, Debug, PartialEq)]
pub struct Presentation {
    pub background: Rgb,
    pub css_filter: String,
    pub scale: f32,
    pub transform_origin: &'static str,
}

/// Escape text for inclusion in markup content or a quoted attribute
pub(crate) fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
