//! Block tree produced by Word conversion and its HTML rendering

use std::fmt::Write;

use crate::surface::escape_html;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunStyle {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Inline {
    Text { text: String, style: RunStyle },
    Break,
    Tab,
    Link { href: String, children: Vec<Inline> },
}

/// A table cell holds its own paragraphs
pub type Cell = Vec<Block>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Block {
    /// Level 1-6
    Heading { level: u8, inlines: Vec<Inline> },
    Paragraph(Vec<Inline>),
    ListItem {
        ordered: bool,
        /// Nesting depth, 0 for top level
        level: u8,
        inlines: Vec<Inline>,
    },
    Table(Vec<Vec<Cell>>),
}

impl Block {
    /// Concatenated text content, without markup
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        match self {
            Block::Heading { inlines, .. }
            | Block::Paragraph(inlines)
            | Block::ListItem { inlines, .. } => push_plain(&mut out, inlines),
            Block::Table(rows) => {
                for cell in rows.iter().flatten() {
                    for block in cell {
                        out.push_str(&block.plain_text());
                    }
                }
            }
        }
        out
    }
}

fn push_plain(out: &mut String, inlines: &[Inline]) {
    for inline in inlines {
        match inline {
            Inline::Text { text, .. } => out.push_str(text),
            Inline::Break => out.push('\n'),
            Inline::Tab => out.push('\t'),
            Inline::Link { children, .. } => push_plain(out, children),
        }
    }
}

/// Render blocks as HTML. Consecutive list items are grouped into lists.
pub fn to_html(blocks: &[Block]) -> String {
    let mut html = String::new();
    let mut open_list: Option<bool> = None;

    for block in blocks {
        let ordered = match block {
            Block::ListItem { ordered, .. } => Some(*ordered),
            _ => None,
        };
        if open_list.is_some() && open_list != ordered {
            close_list(&mut html, open_list);
            open_list = None;
        }
        if open_list.is_none() {
            if let Some(ordered) = ordered {
                html.push_str(if ordered { "<ol>" } else { "<ul>" });
                open_list = Some(ordered);
            }
        }
        write_block(&mut html, block);
    }
    close_list(&mut html, open_list);
    html
}

fn close_list(html: &mut String, open_list: Option<bool>) {
    match open_list {
        Some(true) => html.push_str("</ol>"),
        Some(false) => html.push_str("</ul>"),
        None => {}
    }
}

fn write_block(html: &mut String, block: &Block) {
    match block {
        Block::Heading { level, inlines } => {
            let level = (*level).clamp(1, 6);
            let _ = write!(html, "<h{level}>");
            write_inlines(html, inlines);
            let _ = write!(html, "</h{level}>");
        }
        Block::Paragraph(inlines) => {
            html.push_str("<p>");
            write_inlines(html, inlines);
            html.push_str("</p>");
        }
        Block::ListItem { level, inlines, .. } => {
            if *level > 0 {
                let _ = write!(html, "<li class=\"level-{level}\">");
            } else {
                html.push_str("<li>");
            }
            write_inlines(html, inlines);
            html.push_str("</li>");
        }
        Block::Table(rows) => {
            html.push_str("<table>");
            for row in rows {
                html.push_str("<tr>");
                for cell in row {
                    html.push_str("<td>");
                    html.push_str(&to_html(cell));
                    html.push_str("</td>");
                }
                html.push_str("</tr>");
            }
            html.push_str("</table>");
        }
    }
}

fn write_inlines(html: &mut String, inlines: &[Inline]) {
    for inline in inlines {
        match inline {
            Inline::Text { text, style } => {
                if style.bold {
                    html.push_str("<strong>");
                }
                if style.italic {
                    html.push_str("<em>");
                }
                if style.underline {
                    html.push_str("<u>");
                }
                html.push_str(&escape_html(text));
                if style.underline {
                    html.push_str("</u>");
                }
                if style.italic {
                    html.push_str("</em>");
                }
                if style.bold {
                    html.push_str("</strong>");
                }
            }
            Inline::Break => html.push_str("<br>"),
            Inline::Tab => html.push_str("<span class=\"tab\">\t</span>"),
            Inline::Link { href, children } => {
                if is_safe_href(href) {
                    let _ = write!(html, "<a href=\"{}\">", escape_html(href));
                    write_inlines(html, children);
                    html.push_str("</a>");
                } else {
                    write_inlines(html, children);
                }
            }
        }
    }
}

/// Only web, mail and in-document targets become live links
fn is_safe_href(href: &str) -> bool {
    let lower = href.trim_start().to_ascii_lowercase();
    lower.starts_with("http://")
        || lower.starts_with("https://")
        || lower.starts_with("mailto:")
        || lower.starts_with('#')
}
