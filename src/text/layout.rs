//! Plain text decoding and line layout

use std::fmt::Write;

use crate::error::{Result, ViewerError};
use crate::settings::TextSettings;
use crate::surface::escape_html;
use crate::theme::{ResolvedTheme, css_number};

pub const SCOPE_CLASS: &str = "docview-text";

const BASE_FONT_PX: f32 = 14.0;
/// Gutter numbers are dimmer than body text
const GUTTER_OPACITY: f32 = 0.5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextOptions {
    pub monospace: bool,
    pub line_numbers: bool,
    pub word_wrap: bool,
}

impl TextOptions {
    /// Defaults for a file: source-like extensions get monospace and line numbers
    pub fn for_extension(extension: Option<&str>, settings: &TextSettings) -> Self {
        let code = extension.is_some_and(|ext| settings.is_code_extension(ext));
        Self {
            monospace: code,
            line_numbers: code,
            word_wrap: settings.word_wrap,
        }
    }

    /// CSS `white-space` for the body
    pub fn white_space(&self) -> &'static str {
        if self.word_wrap { "pre-wrap" } else { "pre" }
    }
}

/// Decode UTF-8, dropping a leading BOM and normalising line endings
pub fn decode(bytes: &[u8]) -> Result<String> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let text = std::str::from_utf8(bytes).map_err(|e| {
        ViewerError::Read(format!(
            "not valid UTF-8 at byte {}",
            e.valid_up_to()
        ))
    })?;
    Ok(text.replace("\r\n", "\n").replace('\r', "\n"))
}

/// Split into display lines; a final newline does not open an extra line
pub fn split_lines(text: &str) -> Vec<String> {
    let body = text.strip_suffix('\n').unwrap_or(text);
    body.split('\n').map(str::to_string).collect()
}

/// Gutter width in characters: digits of the last line number
pub fn gutter_width(line_count: usize) -> usize {
    line_count.max(1).to_string().len()
}

/// Formatted text ready for display
#[derive(Clone, Debug, PartialEq)]
pub struct TextSurface {
    lines: Vec<String>,
    pub options: TextOptions,
    pub stylesheet: String,
}

impl TextSurface {
    pub fn new(lines: Vec<String>, options: TextOptions) -> Self {
        Self {
            lines,
            options,
            stylesheet: String::new(),
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Zero when line numbers are hidden
    pub fn gutter_width(&self) -> usize {
        if self.options.line_numbers {
            gutter_width(self.lines.len())
        } else {
            0
        }
    }

    /// Each line with its right-aligned gutter label, if shown
    pub fn rows(&self) -> impl Iterator<Item = (Option<String>, &str)> + '_ {
        let width = self.gutter_width();
        self.lines.iter().enumerate().map(move |(i, line)| {
            let label = (width > 0).then(|| format!("{:>width$}", i + 1));
            (label, line.as_str())
        })
    }

    pub fn to_html(&self) -> String {
        let mut html = String::new();
        let _ = write!(html, "<div class=\"{SCOPE_CLASS}\">");
        for (label, line) in self.rows() {
            html.push_str("<div class=\"line\">");
            if let Some(label) = label {
                let _ = write!(html, "<span class=\"gutter\">{label}</span>");
            }
            let _ = write!(html, "<span class=\"body\">{}</span>", escape_html(line));
            html.push_str("</div>");
        }
        html.push_str("</div>");
        html
    }

    pub(crate) fn restyle(&mut self, theme: &ResolvedTheme, zoom: f32) {
        self.stylesheet = stylesheet(theme, zoom, self.options, self.gutter_width());
    }
}

pub fn stylesheet(theme: &ResolvedTheme, zoom: f32, options: TextOptions, gutter: usize) -> String {
    let scope = SCOPE_CLASS;
    let font = if options.monospace {
        "ui-monospace, monospace"
    } else {
        "inherit"
    };
    let wrap = if options.word_wrap {
        " overflow-wrap: break-word;"
    } else {
        ""
    };

    let mut css = String::new();
    let _ = writeln!(
        css,
        ".{scope} {{ background: {bg}; color: {body}; font-family: {font}; \
         font-size: {size}px; filter: {filter}; \
         transform: scale({zoom}); transform-origin: top center; }}",
        bg = theme.background,
        body = theme.body_color(),
        size = css_number(BASE_FONT_PX * zoom),
        filter = theme.css_filter,
        zoom = css_number(zoom),
    );
    let _ = writeln!(css, ".{scope} .line {{ display: flex; }}");
    let _ = writeln!(
        css,
        ".{scope} .body {{ white-space: {};{wrap} min-width: 0; }}",
        options.white_space()
    );
    if gutter > 0 {
        let _ = writeln!(
            css,
            ".{scope} .gutter {{ min-width: {gutter}ch; text-align: right; \
             padding-right: 1ch; margin-right: 1ch; color: {}; \
             border-right: 1px solid {}; user-select: none; font-family: ui-monospace, monospace; }}",
            theme.text_color(GUTTER_OPACITY),
            theme.border,
        );
    }
    css
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::{self, ThemeId};

    fn options(line_numbers: bool, word_wrap: bool) -> TextOptions {
        TextOptions {
            monospace: false,
            line_numbers,
            word_wrap,
        }
    }

    #[test]
    fn decode_strips_bom_and_normalises_newlines() {
        let text = decode(b"\xEF\xBB\xBFa\r\nb\rc\n").unwrap();
        assert_eq!(text, "a\nb\nc\n");
        assert_eq!(split_lines(&text), vec!["a", "b", "c"]);
    }

    #[test]
    fn invalid_utf8_is_a_read_error() {
        let err = decode(b"ok\xFF\xFE").unwrap_err();
        assert_eq!(err, ViewerError::Read("not valid UTF-8 at byte 2".into()));
    }

    #[test]
    fn empty_text_is_one_empty_line() {
        assert_eq!(split_lines(""), vec![""]);
        assert_eq!(split_lines("\n\n"), vec!["", ""]);
    }

    #[test]
    fn gutter_width_counts_digits_of_last_line() {
        assert_eq!(gutter_width(0), 1);
        assert_eq!(gutter_width(9), 1);
        assert_eq!(gutter_width(10), 2);
        assert_eq!(gutter_width(999), 3);
        assert_eq!(gutter_width(1000), 4);
    }

    #[test]
    fn rows_right_align_labels() {
        let lines: Vec<String> = (1..=10).map(|i| format!("line {i}")).collect();
        let surface = TextSurface::new(lines, options(true, false));
        let rows: Vec<_> = surface.rows().collect();
        assert_eq!(rows[0], (Some(" 1".to_string()), "line 1"));
        assert_eq!(rows[9], (Some("10".to_string()), "line 10"));
    }

    #[test]
    fn hidden_gutter_has_no_labels() {
        let surface = TextSurface::new(vec!["x".into()], options(false, false));
        assert_eq!(surface.gutter_width(), 0);
        assert_eq!(surface.to_html(), "<div class=\"docview-text\"><div class=\"line\"><span class=\"body\">x</span></div></div>");
    }

    #[test]
    fn body_is_escaped() {
        let surface = TextSurface::new(vec!["<b>&</b>".into()], options(true, false));
        assert!(surface.to_html().contains("<span class=\"gutter\">1</span><span class=\"body\">&lt;b&gt;&amp;&lt;/b&gt;</span>"));
    }

    #[test]
    fn wrap_and_monospace_are_independent_of_gutter() {
        let resolved = theme::resolve(ThemeId::Dark, 1.0, 1.0);
        let wrapped = stylesheet(&resolved, 1.0, options(false, true), 0);
        assert!(wrapped.contains("white-space: pre-wrap; overflow-wrap: break-word;"));
        assert!(!wrapped.contains(".gutter"));

        let mono = TextOptions {
            monospace: true,
            ..options(true, false)
        };
        let css = stylesheet(&resolved, 1.0, mono, 3);
        assert!(css.contains("white-space: pre; min-width: 0;"));
        assert!(css.contains("font-family: ui-monospace, monospace; font-size"));
        assert!(css.contains("min-width: 3ch"));
    }

    #[test]
    fn code_extensions_switch_defaults() {
        let settings = TextSettings::default();
        let code = TextOptions::for_extension(Some("rs"), &settings);
        assert!(code.monospace && code.line_numbers);
        let prose = TextOptions::for_extension(Some("txt"), &settings);
        assert!(!prose.monospace && !prose.line_numbers);
        assert!(!TextOptions::for_extension(None, &settings).line_numbers);
    }
}
