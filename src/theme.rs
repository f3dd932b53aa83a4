//! Theme palettes and visual-effect resolution
//!
//! Every strategy consumes the same [`ResolvedTheme`]: PDF uses the page fill
//! and pixel transform, Word and Text turn the palette into style rules, and
//! all of them share the display-time CSS filter.

use std::fmt;

use serde::{Deserialize, Serialize};

pub const MIN_CONTRAST: f32 = 0.5;
pub const MAX_CONTRAST: f32 = 2.0;
pub const MIN_BRIGHTNESS: f32 = 0.5;
pub const MAX_BRIGHTNESS: f32 = 1.5;

const HEADING_OPACITY: OpacityCurve = OpacityCurve {
    base: 0.9,
    slope: 0.2,
};
const BODY_OPACITY: OpacityCurve = OpacityCurve {
    base: 0.8,
    slope: 0.3,
};

const HIGH_CONTRAST_SATURATION: f32 = 1.5;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThemeId {
    #[default]
    Dark,
    Sepia,
    HighContrast,
}

impl ThemeId {
    pub fn name(&self) -> &'static str {
        match self {
            ThemeId::Dark => "Dark",
            ThemeId::Sepia => "Sepia",
            ThemeId::HighContrast => "High Contrast",
        }
    }

    pub fn all() -> &'static [ThemeId] {
        &[ThemeId::Dark, ThemeId::Sepia, ThemeId::HighContrast]
    }

    /// Next theme in picker order, wrapping around
    pub fn next(self) -> Self {
        match self {
            ThemeId::Dark => ThemeId::Sepia,
            ThemeId::Sepia => ThemeId::HighContrast,
            ThemeId::HighContrast => ThemeId::Dark,
        }
    }

    fn palette(self) -> &'static Palette {
        match self {
            ThemeId::Dark => &DARK_PALETTE,
            ThemeId::Sepia => &SEPIA_PALETTE,
            ThemeId::HighContrast => &HIGH_CONTRAST_PALETTE,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb::from_hex(0xFFFFFF);

    pub const fn from_hex(hex: u32) -> Self {
        Self {
            r: ((hex >> 16) & 0xFF) as u8,
            g: ((hex >> 8) & 0xFF) as u8,
            b: (hex & 0xFF) as u8,
        }
    }

    pub fn with_alpha(self, alpha: f32) -> Rgba {
        Rgba {
            rgb: self,
            alpha: alpha.clamp(0.0, 1.0),
        }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Rgba {
    pub rgb: Rgb,
    pub alpha: f32,
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rgba({}, {}, {}, {})",
            self.rgb.r,
            self.rgb.g,
            self.rgb.b,
            css_number(self.alpha)
        )
    }
}

/// Post-processing applied to rasterized PDF pixels
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum PixelTransform {
    None,
    /// Difference composite against white
    Invert,
    Sepia,
}

struct Palette {
    background: Rgb,
    text: Rgb,
    border: Rgb,
    accent: Rgb,
    /// Canvas fill painted under a rasterized page
    page_fill: Rgb,
    pixel_transform: PixelTransform,
}

static DARK_PALETTE: Palette = Palette {
    background: Rgb::from_hex(0x1E1E1E),
    text: Rgb::from_hex(0xE8E8E8),
    border: Rgb::from_hex(0x3A3A3A),
    accent: Rgb::from_hex(0x6699CC),
    page_fill: Rgb::WHITE,
    pixel_transform: PixelTransform::Invert,
};

static SEPIA_PALETTE: Palette = Palette {
    background: Rgb::from_hex(0xF4ECD8),
    text: Rgb::from_hex(0x5B4636),
    border: Rgb::from_hex(0xD8C8A8),
    accent: Rgb::from_hex(0x8B5A2B),
    page_fill: Rgb::from_hex(0xF4ECD8),
    pixel_transform: PixelTransform::Sepia,
};

static HIGH_CONTRAST_PALETTE: Palette = Palette {
    background: Rgb::from_hex(0x000000),
    text: Rgb::from_hex(0xFFFFFF),
    border: Rgb::from_hex(0xFFFF00),
    accent: Rgb::from_hex(0xFFFF00),
    page_fill: Rgb::WHITE,
    pixel_transform: PixelTransform::None,
};

#[derive(Clone, Copy, Debug)]
struct OpacityCurve {
    base: f32,
    slope: f32,
}

impl OpacityCurve {
    fn at(self, contrast: f32) -> f32 {
        (self.base + (contrast - 1.0) * self.slope).clamp(0.0, 1.0)
    }
}

/// Rendering directives for one `{theme, contrast, brightness}` combination
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedTheme {
    pub theme: ThemeId,
    pub contrast: f32,
    pub brightness: f32,
    pub background: Rgb,
    pub border: Rgb,
    pub accent: Rgb,
    pub page_fill: Rgb,
    pub pixel_transform: PixelTransform,
    pub heading_opacity: f32,
    pub body_opacity: f32,
    /// Display-time filter, e.g. `contrast(1.2) brightness(0.9)`
    pub css_filter: String,
    text: Rgb,
}

impl ResolvedTheme {
    /// Text color at the given opacity
    pub fn text_color(&self, opacity: f32) -> Rgba {
        self.text.with_alpha(opacity)
    }

    pub fn heading_color(&self) -> Rgba {
        self.text_color(self.heading_opacity)
    }

    pub fn body_color(&self) -> Rgba {
        self.text_color(self.body_opacity)
    }
}

pub fn clamp_contrast(contrast: f32) -> f32 {
    clamp_finite(contrast, MIN_CONTRAST, MAX_CONTRAST)
}

pub fn clamp_brightness(brightness: f32) -> f32 {
    clamp_finite(brightness, MIN_BRIGHTNESS, MAX_BRIGHTNESS)
}

/// Clamp to `[min, max]`, mapping NaN/Inf to the neutral value 1.0
pub(crate) fn clamp_finite(value: f32, min: f32, max: f32) -> f32 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        1.0_f32.clamp(min, max)
    }
}

pub fn resolve(theme: ThemeId, contrast: f32, brightness: f32) -> ResolvedTheme {
    let contrast = clamp_contrast(contrast);
    let brightness = clamp_brightness(brightness);
    let palette = theme.palette();

    let mut css_filter = format!(
        "contrast({}) brightness({})",
        css_number(contrast),
        css_number(brightness)
    );
    if theme == ThemeId::HighContrast {
        css_filter.push_str(&format!(
            " saturate({})",
            css_number(HIGH_CONTRAST_SATURATION)
        ));
    }

    ResolvedTheme {
        theme,
        contrast,
        brightness,
        background: palette.background,
        border: palette.border,
        accent: palette.accent,
        page_fill: palette.page_fill,
        pixel_transform: palette.pixel_transform,
        heading_opacity: HEADING_OPACITY.at(contrast),
        body_opacity: BODY_OPACITY.at(contrast),
        css_filter,
        text: palette.text,
    }
}

/// Format a number for CSS without trailing zeros (`1`, `1.25`, `0.9`)
pub(crate) fn css_number(value: f32) -> String {
    let s = format!("{value:.3}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s.is_empty() || s == "-" {
        "0".to_string()
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contrast_samples() -> impl Iterator<Item = f32> {
        (0..=150).map(|i| MIN_CONTRAST + i as f32 * 0.01)
    }

    #[test]
    fn text_opacity_stays_in_unit_range() {
        for &theme in ThemeId::all() {
            for contrast in contrast_samples() {
                let resolved = resolve(theme, contrast, 1.0);
                assert!((0.0..=1.0).contains(&resolved.heading_opacity));
                assert!((0.0..=1.0).contains(&resolved.body_opacity));
            }
        }
    }

    #[test]
    fn text_opacity_is_monotonic_in_contrast() {
        for &theme in ThemeId::all() {
            let mut prev_heading = 0.0;
            let mut prev_body = 0.0;
            for contrast in contrast_samples() {
                let resolved = resolve(theme, contrast, 1.0);
                assert!(resolved.heading_opacity >= prev_heading);
                assert!(resolved.body_opacity >= prev_body);
                prev_heading = resolved.heading_opacity;
                prev_body = resolved.body_opacity;
            }
        }
    }

    #[test]
    fn opacity_saturates_at_full() {
        let resolved = resolve(ThemeId::Dark, MAX_CONTRAST, 1.0);
        assert_eq!(resolved.heading_opacity, 1.0);
        assert_eq!(resolved.body_opacity, 1.0);

        let neutral = resolve(ThemeId::Dark, 1.0, 1.0);
        assert!((neutral.heading_opacity - 0.9).abs() < 1e-6);
        assert!((neutral.body_opacity - 0.8).abs() < 1e-6);
    }

    #[test]
    fn filter_composes_contrast_and_brightness() {
        let resolved = resolve(ThemeId::Sepia, 1.25, 0.9);
        assert_eq!(resolved.css_filter, "contrast(1.25) brightness(0.9)");

        let resolved = resolve(ThemeId::HighContrast, 1.0, 1.0);
        assert_eq!(
            resolved.css_filter,
            "contrast(1) brightness(1) saturate(1.5)"
        );
    }

    #[test]
    fn inputs_are_clamped() {
        let resolved = resolve(ThemeId::Dark, 10.0, -3.0);
        assert_eq!(resolved.contrast, MAX_CONTRAST);
        assert_eq!(resolved.brightness, MIN_BRIGHTNESS);

        let resolved = resolve(ThemeId::Dark, f32::NAN, f32::INFINITY);
        assert_eq!(resolved.contrast, 1.0);
        assert_eq!(resolved.brightness, 1.0);
    }

    #[test]
    fn themes_pick_their_pixel_transform() {
        assert_eq!(
            resolve(ThemeId::Dark, 1.0, 1.0).pixel_transform,
            PixelTransform::Invert
        );
        assert_eq!(
            resolve(ThemeId::Sepia, 1.0, 1.0).pixel_transform,
            PixelTransform::Sepia
        );
        assert_eq!(
            resolve(ThemeId::HighContrast, 1.0, 1.0).pixel_transform,
            PixelTransform::None
        );
    }

    #[test]
    fn colors_render_as_css() {
        assert_eq!(Rgb::from_hex(0x6699CC).to_string(), "#6699cc");
        assert_eq!(
            Rgb::from_hex(0xFFFFFF).with_alpha(0.85).to_string(),
            "rgba(255, 255, 255, 0.85)"
        );
    }

    #[test]
    fn theme_cycle_visits_every_theme() {
        let mut theme = ThemeId::Dark;
        for _ in 0..ThemeId::all().len() {
            theme = theme.next();
        }
        assert_eq!(theme, ThemeId::Dark);
    }
}
