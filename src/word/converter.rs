//! Word-to-markup conversion
//!
//! The viewer consumes conversion through [`WordConverter`]. The built-in
//! [`DocxConverter`] reads the OOXML package directly: `word/document.xml`
//! for content, plus the optional styles, numbering and relationship parts
//! for heading names, list kinds and hyperlink targets.

use std::collections::HashMap;
use std::io::{Cursor, Read, Seek};

use log::debug;
use roxmltree::Node;
use zip::ZipArchive;
use zip::result::ZipError;

use super::markup::{Block, Cell, Inline, RunStyle};

const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const R_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

const DOCUMENT_PART: &str = "word/document.xml";
const STYLES_PART: &str = "word/styles.xml";
const NUMBERING_PART: &str = "word/numbering.xml";
const RELS_PART: &str = "word/_rels/document.xml.rels";

/// Decompressed size cap for any single package part
pub const MAX_PART_BYTES: u64 = 64 * 1024 * 1024;

/// Compound File Binary signature used by legacy `.doc` files
const CFB_MAGIC: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConversionError {
    #[error("legacy binary Word documents are not supported")]
    LegacyFormat,

    #[error("not a Word document: {0}")]
    NotAnArchive(String),

    #[error("missing {0}")]
    MissingPart(&'static str),

    #[error("malformed {part}: {detail}")]
    Xml { part: &'static str, detail: String },
}

/// Converted content plus non-fatal problems met along the way
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Conversion {
    pub blocks: Vec<Block>,
    pub warnings: Vec<String>,
}

pub trait WordConverter: Send + Sync {
    fn convert(&self, bytes: &[u8]) -> Result<Conversion, ConversionError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DocxConverter;

impl WordConverter for DocxConverter {
    fn convert(&self, bytes: &[u8]) -> Result<Conversion, ConversionError> {
        convert_package(bytes, MAX_PART_BYTES)
    }
}

fn convert_package(bytes: &[u8], part_limit: u64) -> Result<Conversion, ConversionError> {
    if bytes.starts_with(&CFB_MAGIC) {
        return Err(ConversionError::LegacyFormat);
    }

    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| ConversionError::NotAnArchive(e.to_string()))?;

    let document = read_part(&mut archive, DOCUMENT_PART, part_limit)?
        .ok_or(ConversionError::MissingPart(DOCUMENT_PART))?;
    let links = match read_part(&mut archive, RELS_PART, part_limit)? {
        Some(xml) => parse_hyperlinks(&xml)?,
        None => HashMap::new(),
    };
    let styles = match read_part(&mut archive, STYLES_PART, part_limit)? {
        Some(xml) => parse_styles(&xml)?,
        None => HashMap::new(),
    };
    let numbering = match read_part(&mut archive, NUMBERING_PART, part_limit)? {
        Some(xml) => Numbering::parse(&xml)?,
        None => Numbering::default(),
    };

    let doc = roxmltree::Document::parse(&document).map_err(xml_error(DOCUMENT_PART))?;
    let body = doc
        .root_element()
        .children()
        .find(|n| is_w(n, "body"))
        .ok_or(ConversionError::MissingPart("document body"))?;

    let mut walker = Walker {
        links: &links,
        styles: &styles,
        numbering: &numbering,
        warnings: Vec::new(),
    };
    let blocks = walker.blocks(body);

    debug!(
        "Converted Word document: {} blocks, {} warnings",
        blocks.len(),
        walker.warnings.len()
    );
    Ok(Conversion {
        blocks,
        warnings: walker.warnings,
    })
}

fn read_part<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &'static str,
    limit: u64,
) -> Result<Option<String>, ConversionError> {
    let file = match archive.by_name(name) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(ConversionError::NotAnArchive(e.to_string())),
    };

    let part_error = |detail: String| ConversionError::Xml { part: name, detail };

    // One byte past the cap tells an oversized part from one exactly at it.
    let mut raw = Vec::new();
    file.take(limit.saturating_add(1))
        .read_to_end(&mut raw)
        .map_err(|e| part_error(e.to_string()))?;
    if raw.len() as u64 > limit {
        return Err(part_error(format!(
            "part exceeds {limit} bytes when decompressed"
        )));
    }
    String::from_utf8(raw)
        .map(Some)
        .map_err(|e| part_error(e.to_string()))
}

fn xml_error(part: &'static str) -> impl Fn(roxmltree::Error) -> ConversionError {
    move |e| ConversionError::Xml {
        part,
        detail: e.to_string(),
    }
}

/// Relationship id -> external hyperlink target
fn parse_hyperlinks(xml: &str) -> Result<HashMap<String, String>, ConversionError> {
    let doc = roxmltree::Document::parse(xml).map_err(xml_error(RELS_PART))?;
    Ok(doc
        .root_element()
        .children()
        .filter(|n| n.tag_name().name() == "Relationship")
        .filter(|n| n.attribute("Type").is_some_and(|t| t.ends_with("/hyperlink")))
        .filter_map(|n| Some((n.attribute("Id")?.to_string(), n.attribute("Target")?.to_string())))
        .collect())
}

/// Style id -> display name
fn parse_styles(xml: &str) -> Result<HashMap<String, String>, ConversionError> {
    let doc = roxmltree::Document::parse(xml).map_err(xml_error(STYLES_PART))?;
    Ok(doc
        .root_element()
        .children()
        .filter(|n| is_w(n, "style"))
        .filter_map(|style| {
            let id = style.attribute((W_NS, "styleId"))?;
            let name = child(style, "name").and_then(w_val).unwrap_or(id);
            Some((id.to_string(), name.to_string()))
        })
        .collect())
}

/// List definitions: which (numId, level) pairs are numbered vs bulleted
#[derive(Debug, Default)]
struct Numbering {
    /// abstractNumId -> level -> ordered
    abstract_levels: HashMap<String, HashMap<u8, bool>>,
    /// numId -> abstractNumId
    instances: HashMap<String, String>,
}

impl Numbering {
    fn parse(xml: &str) -> Result<Self, ConversionError> {
        let doc = roxmltree::Document::parse(xml).map_err(xml_error(NUMBERING_PART))?;
        let mut numbering = Numbering::default();

        for node in doc.root_element().children().filter(Node::is_element) {
            if is_w(&node, "abstractNum") {
                let Some(id) = node.attribute((W_NS, "abstractNumId")) else {
                    continue;
                };
                let levels = node
                    .children()
                    .filter(|n| is_w(n, "lvl"))
                    .filter_map(|lvl| {
                        let level = lvl.attribute((W_NS, "ilvl"))?.parse().ok()?;
                        let format = child(lvl, "numFmt").and_then(w_val).unwrap_or("bullet");
                        Some((level, !matches!(format, "bullet" | "none")))
                    })
                    .collect();
                numbering.abstract_levels.insert(id.to_string(), levels);
            } else if is_w(&node, "num") {
                let num_id = node.attribute((W_NS, "numId"));
                let abstract_id = child(node, "abstractNumId").and_then(w_val);
                if let (Some(num_id), Some(abstract_id)) = (num_id, abstract_id) {
                    numbering
                        .instances
                        .insert(num_id.to_string(), abstract_id.to_string());
                }
            }
        }
        Ok(numbering)
    }

    /// Unknown definitions render as bullets
    fn is_ordered(&self, num_id: &str, level: u8) -> bool {
        self.instances
            .get(num_id)
            .and_then(|abstract_id| self.abstract_levels.get(abstract_id))
            .and_then(|levels| levels.get(&level))
            .copied()
            .unwrap_or(false)
    }
}

struct Walker<'c> {
    links: &'c HashMap<String, String>,
    styles: &'c HashMap<String, String>,
    numbering: &'c Numbering,
    warnings: Vec<String>,
}

impl Walker<'_> {
    fn warn(&mut self, message: String) {
        if !self.warnings.contains(&message) {
            self.warnings.push(message);
        }
    }

    fn blocks(&mut self, container: Node<'_, '_>) -> Vec<Block> {
        let mut blocks = Vec::new();
        for node in container.children().filter(Node::is_element) {
            self.block(node, &mut blocks);
        }
        blocks
    }

    fn block(&mut self, node: Node<'_, '_>, out: &mut Vec<Block>) {
        if node.tag_name().namespace() != Some(W_NS) {
            self.warn(format!("unsupported element <{}> skipped", node.tag_name().name()));
            return;
        }
        match node.tag_name().name() {
            "p" => out.push(self.paragraph(node)),
            "tbl" => out.push(self.table(node)),
            "sdt" => {
                for content in node.children().filter(|n| is_w(n, "sdtContent")) {
                    for inner in content.children().filter(Node::is_element) {
                        self.block(inner, out);
                    }
                }
            }
            "sectPr" | "sdtPr" | "tcPr" | "bookmarkStart" | "bookmarkEnd" | "proofErr" => {}
            other => self.warn(format!("unsupported element <w:{other}> skipped")),
        }
    }

    fn paragraph(&mut self, p: Node<'_, '_>) -> Block {
        let props = child(p, "pPr");
        let style = props.and_then(|pr| child(pr, "pStyle")).and_then(w_val);
        let list = props
            .and_then(|pr| child(pr, "numPr"))
            .and_then(|num| {
                let id = child(num, "numId").and_then(w_val)?;
                // numId 0 removes numbering inherited from a style
                if id == "0" {
                    return None;
                }
                let level = child(num, "ilvl")
                    .and_then(w_val)
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(0);
                Some((id, level))
            });

        let mut inlines = Vec::new();
        self.inlines(p, &mut inlines);

        if let Some(style) = style {
            if let Some(level) = self.heading_level(style) {
                return Block::Heading { level, inlines };
            }
            if !self.styles.contains_key(style) && style != "Normal" {
                self.warn(format!("unknown style '{style}' rendered as body text"));
            }
        }

        match list {
            Some((id, level)) => Block::ListItem {
                ordered: self.numbering.is_ordered(id, level),
                level,
                inlines,
            },
            None => Block::Paragraph(inlines),
        }
    }

    /// `Heading1..6` and `Title`, by style id or display name
    fn heading_level(&self, style_id: &str) -> Option<u8> {
        let names = [Some(style_id), self.styles.get(style_id).map(String::as_str)];
        names.into_iter().flatten().find_map(|name| {
            let key: String = name
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect::<String>()
                .to_ascii_lowercase();
            if key == "title" {
                return Some(1);
            }
            key.strip_prefix("heading")
                .and_then(|n| n.parse::<u8>().ok())
                .filter(|n| (1..=6).contains(n))
        })
    }

    fn table(&mut self, tbl: Node<'_, '_>) -> Block {
        let rows = tbl
            .children()
            .filter(|n| is_w(n, "tr"))
            .map(|tr| {
                tr.children()
                    .filter(|n| is_w(n, "tc"))
                    .map(|tc| self.blocks(tc))
                    .collect::<Vec<Cell>>()
            })
            .collect();
        Block::Table(rows)
    }

    fn inlines(&mut self, container: Node<'_, '_>, out: &mut Vec<Inline>) {
        for node in container.children().filter(Node::is_element) {
            if node.tag_name().namespace() != Some(W_NS) {
                self.warn(format!("unsupported element <{}> skipped", node.tag_name().name()));
                continue;
            }
            match node.tag_name().name() {
                "r" => self.run(node, out),
                "hyperlink" => self.hyperlink(node, out),
                "ins" | "smartTag" | "customXml" => self.inlines(node, out),
                "fldSimple" => {
                    self.warn("fields are shown as their last computed value".into());
                    self.inlines(node, out);
                }
                "pPr" | "del" | "bookmarkStart" | "bookmarkEnd" | "proofErr"
                | "commentRangeStart" | "commentRangeEnd" => {}
                other => self.warn(format!("unsupported element <w:{other}> skipped")),
            }
        }
    }

    fn hyperlink(&mut self, node: Node<'_, '_>, out: &mut Vec<Inline>) {
        let href = node
            .attribute((R_NS, "id"))
            .and_then(|id| self.links.get(id).cloned())
            .or_else(|| node.attribute((W_NS, "anchor")).map(|a| format!("#{a}")));

        let mut children = Vec::new();
        self.inlines(node, &mut children);
        match href {
            Some(href) => out.push(Inline::Link { href, children }),
            None => {
                self.warn("hyperlink without a target rendered as text".into());
                out.extend(children);
            }
        }
    }

    fn run(&mut self, r: Node<'_, '_>, out: &mut Vec<Inline>) {
        let props = child(r, "rPr");
        let style = RunStyle {
            bold: toggle(props, "b"),
            italic: toggle(props, "i"),
            underline: toggle(props, "u"),
        };

        for node in r.children().filter(Node::is_element) {
            match node.tag_name().name() {
                "t" => push_text(out, node.text().unwrap_or_default(), style),
                "tab" => out.push(Inline::Tab),
                "br" | "cr" => out.push(Inline::Break),
                "noBreakHyphen" => push_text(out, "-", style),
                "rPr" | "lastRenderedPageBreak" | "softHyphen" => {}
                "drawing" | "pict" | "object" => {
                    self.warn("images and embedded objects are not displayed".into());
                }
                "fldChar" | "instrText" => {
                    self.warn("fields are shown as their last computed value".into());
                }
                other => self.warn(format!("unsupported run content <w:{other}> skipped")),
            }
        }
    }
}

/// Append text, merging with a preceding run of the same style
fn push_text(out: &mut Vec<Inline>, text: &str, style: RunStyle) {
    if text.is_empty() {
        return;
    }
    if let Some(Inline::Text {
        text: last,
        style: last_style,
    }) = out.last_mut()
    {
        if *last_style == style {
            last.push_str(text);
            return;
        }
    }
    out.push(Inline::Text {
        text: text.to_string(),
        style,
    });
}

/// On/off run property: present means on unless its value turns it off
fn toggle(props: Option<Node<'_, '_>>, name: &str) -> bool {
    props
        .and_then(|p| child(p, name))
        .is_some_and(|n| !matches!(w_val(n), Some("0" | "false" | "off" | "none")))
}

fn is_w(node: &Node<'_, '_>, name: &str) -> bool {
    node.has_tag_name((W_NS, name))
}

fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|c| is_w(c, name))
}

fn w_val<'a>(node: Node<'a, '_>) -> Option<&'a str> {
    node.attribute((W_NS, "val"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{DocxBuilder, docx_bytes};

    fn convert(bytes: &[u8]) -> Conversion {
        DocxConverter.convert(bytes).unwrap()
    }

    fn para(inner: &str) -> String {
        format!("<w:p>{inner}</w:p>")
    }

    fn run(props: &str, text: &str) -> String {
        format!(r#"<w:r><w:rPr>{props}</w:rPr><w:t xml:space="preserve">{text}</w:t></w:r>"#)
    }

    #[test]
    fn paragraphs_and_runs() {
        let body = para(&format!(
            "{}{}<w:r><w:tab/><w:t>c</w:t><w:br/></w:r>",
            run("", "plain "),
            run("<w:b/><w:i w:val=\"0\"/>", "bold"),
        ));
        let conversion = convert(&docx_bytes(&body));
        assert!(conversion.warnings.is_empty());
        assert_eq!(
            conversion.blocks,
            vec![Block::Paragraph(vec![
                Inline::Text {
                    text: "plain ".into(),
                    style: RunStyle::default(),
                },
                Inline::Text {
                    text: "bold".into(),
                    style: RunStyle {
                        bold: true,
                        ..RunStyle::default()
                    },
                },
                Inline::Tab,
                Inline::Text {
                    text: "c".into(),
                    style: RunStyle::default(),
                },
                Inline::Break,
            ])]
        );
    }

    #[test]
    fn heading_styles_by_id_and_name() {
        let body = [
            para(&format!(r#"<w:pPr><w:pStyle w:val="Heading2"/></w:pPr>{}"#, run("", "a"))),
            para(&format!(r#"<w:pPr><w:pStyle w:val="Title"/></w:pPr>{}"#, run("", "b"))),
            para(&format!(r#"<w:pPr><w:pStyle w:val="Berschrift3"/></w:pPr>{}"#, run("", "c"))),
        ]
        .concat();
        let bytes = DocxBuilder::new(body)
            .styles(r#"<w:style w:type="paragraph" w:styleId="Berschrift3"><w:name w:val="heading 3"/></w:style>"#)
            .build();

        let levels: Vec<_> = convert(&bytes)
            .blocks
            .iter()
            .map(|b| match b {
                Block::Heading { level, .. } => *level,
                other => panic!("expected heading, got {other:?}"),
            })
            .collect();
        assert_eq!(levels, vec![2, 1, 3]);
    }

    #[test]
    fn lists_follow_numbering_definitions() {
        let item = |num: &str, text: &str| {
            para(&format!(
                r#"<w:pPr><w:numPr><w:ilvl w:val="0"/><w:numId w:val="{num}"/></w:numPr></w:pPr>{}"#,
                run("", text)
            ))
        };
        let body = [item("1", "bullet"), item("2", "numbered"), item("9", "unknown")].concat();
        let bytes = DocxBuilder::new(body)
            .numbering(
                r#"<w:abstractNum w:abstractNumId="0"><w:lvl w:ilvl="0"><w:numFmt w:val="bullet"/></w:lvl></w:abstractNum>
                   <w:abstractNum w:abstractNumId="1"><w:lvl w:ilvl="0"><w:numFmt w:val="decimal"/></w:lvl></w:abstractNum>
                   <w:num w:numId="1"><w:abstractNumId w:val="0"/></w:num>
                   <w:num w:numId="2"><w:abstractNumId w:val="1"/></w:num>"#,
            )
            .build();

        let ordered: Vec<_> = convert(&bytes)
            .blocks
            .iter()
            .map(|b| matches!(b, Block::ListItem { ordered: true, .. }))
            .collect();
        assert_eq!(ordered, vec![false, true, false]);
    }

    #[test]
    fn hyperlinks_resolve_through_relationships() {
        let body = para(&format!(
            r#"<w:hyperlink r:id="rId7">{}</w:hyperlink><w:hyperlink w:anchor="intro">{}</w:hyperlink>"#,
            run("", "site"),
            run("", "jump")
        ));
        let bytes = DocxBuilder::new(body)
            .hyperlink("rId7", "https://example.com")
            .build();

        let Block::Paragraph(inlines) = &convert(&bytes).blocks[0] else {
            panic!("expected paragraph");
        };
        let hrefs: Vec<_> = inlines
            .iter()
            .filter_map(|i| match i {
                Inline::Link { href, .. } => Some(href.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(hrefs, vec!["https://example.com", "#intro"]);
    }

    #[test]
    fn tables_keep_cell_paragraphs() {
        let cell = |text: &str| format!("<w:tc><w:tcPr/>{}</w:tc>", para(&run("", text)));
        let body = format!(
            "<w:tbl><w:tblPr/><w:tr>{}{}</w:tr></w:tbl>",
            cell("a"),
            cell("b")
        );
        let conversion = convert(&docx_bytes(&body));
        let Block::Table(rows) = &conversion.blocks[0] else {
            panic!("expected table");
        };
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].len(), 2);
        assert_eq!(rows[0][1][0].plain_text(), "b");
    }

    #[test]
    fn unsupported_content_warns_once_without_failing() {
        let body = [
            para(&format!("<w:r><w:drawing/></w:r>{}", run("", "x"))),
            para("<w:r><w:drawing/></w:r>"),
            para(r#"<w:pPr><w:pStyle w:val="Fancy"/></w:pPr>"#),
        ]
        .concat();
        let conversion = convert(&docx_bytes(&body));
        assert_eq!(conversion.blocks.len(), 3);
        assert_eq!(
            conversion.warnings,
            vec![
                "images and embedded objects are not displayed".to_string(),
                "unknown style 'Fancy' rendered as body text".to_string(),
            ]
        );
    }

    #[test]
    fn legacy_binary_doc_is_rejected() {
        let mut bytes = CFB_MAGIC.to_vec();
        bytes.extend_from_slice(&[0; 504]);
        assert_eq!(
            DocxConverter.convert(&bytes).unwrap_err(),
            ConversionError::LegacyFormat
        );
    }

    #[test]
    fn garbage_is_not_an_archive() {
        let err = DocxConverter.convert(b"hello world").unwrap_err();
        assert!(matches!(err, ConversionError::NotAnArchive(_)));
    }

    #[test]
    fn archive_without_document_part_is_rejected() {
        let bytes = DocxBuilder::new("").without_document().build();
        assert_eq!(
            DocxConverter.convert(&bytes).unwrap_err(),
            ConversionError::MissingPart(DOCUMENT_PART)
        );
    }

    #[test]
    fn oversized_part_is_rejected_without_full_inflation() {
        // Highly repetitive text deflates to a small archive entry.
        let body = para(&run("", &"a".repeat(256 * 1024)));
        let bytes = docx_bytes(&body);
        assert!(bytes.len() < 16 * 1024);

        let err = convert_package(&bytes, 4096).unwrap_err();
        assert!(matches!(
            err,
            ConversionError::Xml { part: DOCUMENT_PART, ref detail } if detail.contains("4096")
        ));
        assert!(convert_package(&bytes, MAX_PART_BYTES).is_ok());
    }
}
