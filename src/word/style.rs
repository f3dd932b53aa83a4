//! Scoped stylesheet for converted Word content
//!
//! Regenerated on every theme, contrast, brightness or zoom change; the
//! converted markup itself never changes.

use std::fmt::Write;

use crate::theme::{ResolvedTheme, css_number};

pub const SCOPE_CLASS: &str = "docview-word";

const BASE_FONT_PX: f32 = 16.0;
const LINE_HEIGHT: f32 = 1.6;

pub fn stylesheet(theme: &ResolvedTheme, zoom: f32) -> String {
    let scope = SCOPE_CLASS;
    let mut css = String::new();

    let _ = writeln!(
        css,
        ".{scope} {{ background: {bg}; color: {body}; line-height: {lh}; \
         font-size: {size}px; font-weight: 400; filter: {filter}; \
         transform: scale({zoom}); transform-origin: top center; }}",
        bg = theme.background,
        body = theme.body_color(),
        lh = css_number(LINE_HEIGHT),
        size = css_number(BASE_FONT_PX * zoom),
        filter = theme.css_filter,
        zoom = css_number(zoom),
    );
    let _ = writeln!(
        css,
        ".{scope} h1, .{scope} h2, .{scope} h3, .{scope} h4, .{scope} h5, .{scope} h6 \
         {{ color: {heading}; font-weight: 700; }}",
        heading = theme.heading_color(),
    );
    let _ = writeln!(css, ".{scope} a {{ color: {}; }}", theme.accent);
    let _ = writeln!(
        css,
        ".{scope} table {{ border-collapse: collapse; }} \
         .{scope} td {{ border: 1px solid {}; padding: 0.25em 0.5em; vertical-align: top; }}",
        theme.border
    );
    let _ = writeln!(css, ".{scope} .tab {{ white-space: pre; }}");
    for level in 1..=8 {
        let _ = writeln!(
            css,
            ".{scope} li.level-{level} {{ margin-left: {}em; }}",
            css_number(level as f32 * 1.5)
        );
    }
    css
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::{self, ThemeId};

    #[test]
    fn stylesheet_carries_palette_and_filter() {
        let resolved = theme::resolve(ThemeId::Sepia, 1.5, 0.8);
        let css = stylesheet(&resolved, 1.0);
        assert!(css.contains("background: #f4ecd8"));
        assert!(css.contains(&format!("color: {}", resolved.body_color())));
        assert!(css.contains(&format!("color: {}", resolved.heading_color())));
        assert!(css.contains("filter: contrast(1.5) brightness(0.8)"));
        assert!(css.contains("line-height: 1.6"));
    }

    #[test]
    fn zoom_scales_around_top_center() {
        let css = stylesheet(&theme::resolve(ThemeId::Dark, 1.0, 1.0), 1.5);
        assert!(css.contains("transform: scale(1.5); transform-origin: top center;"));
        assert!(css.contains("font-size: 24px"));
    }

    #[test]
    fn rules_are_scoped() {
        let css = stylesheet(&theme::resolve(ThemeId::HighContrast, 1.0, 1.0), 1.0);
        for rule in css.lines() {
            assert!(rule.starts_with(".docview-word"), "unscoped rule: {rule}");
        }
    }
}
