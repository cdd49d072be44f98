//! Minimal WordprocessingML writer.
//!
//! Covers paragraphs, headings, bullet items, preformatted blocks, table rows
//! (cells separated by tabs) and bold/italic/code runs. Images are replaced
//! by their alt text.
use std::io::{Cursor, Write};

use ego_tree::NodeRef;
use scraper::node::Node;
use scraper::{ElementRef, Html};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::ConversionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct RunStyle {
    bold: bool,
    italic: bool,
    code: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Segment {
    Text { text: String, style: RunStyle },
    Break,
    Tab,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ParagraphStyle {
    Normal,
    Heading1,
    Heading2,
    Heading3,
    Bullet,
    CodeBlock,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Paragraph {
    pub(crate) style: ParagraphStyle,
    pub(crate) segments: Vec<Segment>,
}

impl Paragraph {
    fn new(style: ParagraphStyle) -> Self {
        Self {
            style,
            segments: Vec::new(),
        }
    }

    fn has_content(&self) -> bool {
        self.segments.iter().any(|segment| match segment {
            Segment::Text { text, .. } => !text.trim().is_empty(),
            Segment::Break | Segment::Tab => false,
        })
    }

    #[cfg(test)]
    pub(crate) fn plain_text(&self) -> String {
        self.segments
            .iter()
            .map(|segment| match segment {
                Segment::Text { text, .. } => text.as_str(),
                Segment::Break => "\n",
                Segment::Tab => "\t",
            })
            .collect()
    }
}

/// Builds the `.docx` package for an HTML document.
pub fn build_docx(document: &Html) -> Result<Vec<u8>, ConversionError> {
    let paragraphs = paragraphs_from_document(document);
    let document_xml = build_document_xml(&paragraphs);
    write_package(&document_xml)
}

pub(crate) fn paragraphs_from_document(document: &Html) -> Vec<Paragraph> {
    let mut ctx = ParagraphBuilder::new();
    for child in document.tree.root().children() {
        visit_node(child, RunStyle::default(), false, &mut ctx);
    }
    ctx.finish()
}

fn visit_node(node: NodeRef<'_, Node>, style: RunStyle, pre: bool, ctx: &mut ParagraphBuilder) {
    match node.value() {
        Node::Text(text) => ctx.append_text(text, style, pre),
        Node::Element(_) => {
            if let Some(element) = ElementRef::wrap(node) {
                visit_element(element, style, pre, ctx);
            }
        }
        Node::Document | Node::Fragment => visit_children(node, style, pre, ctx),
        _ => {}
    }
}

fn visit_children(node: NodeRef<'_, Node>, style: RunStyle, pre: bool, ctx: &mut ParagraphBuilder) {
    for child in node.children() {
        visit_node(child, style, pre, ctx);
    }
}

fn visit_element(element: ElementRef<'_>, style: RunStyle, pre: bool, ctx: &mut ParagraphBuilder) {
    let node = *element;
    let tag = element.value().name().to_ascii_lowercase();
    match tag.as_str() {
        "head" | "script" | "style" | "noscript" | "template" | "iframe" => {}
        "br" => ctx.push(Segment::Break),
        "hr" => ctx.flush(),
        "h1" => block(node, ParagraphStyle::Heading1, style, pre, ctx),
        "h2" => block(node, ParagraphStyle::Heading2, style, pre, ctx),
        "h3" | "h4" | "h5" | "h6" => block(node, ParagraphStyle::Heading3, style, pre, ctx),
        "li" => {
            ctx.start(ParagraphStyle::Bullet);
            ctx.append_text("\u{2022} ", RunStyle::default(), false);
            visit_children(node, style, pre, ctx);
            ctx.flush();
        }
        "pre" => {
            let code = RunStyle { code: true, ..style };
            block(node, ParagraphStyle::CodeBlock, code, true, ctx);
        }
        "p" | "div" | "section" | "article" | "main" | "aside" | "header" | "footer" | "nav"
        | "figure" | "figcaption" | "blockquote" | "address" | "tr" | "ul" | "ol" | "table"
        | "dl" | "dt" | "dd" => block(node, ParagraphStyle::Normal, style, pre, ctx),
        "td" | "th" => {
            if ctx.current.has_content() {
                ctx.push(Segment::Tab);
            }
            let cell_style = RunStyle {
                bold: style.bold || tag == "th",
                ..style
            };
            visit_children(node, cell_style, pre, ctx);
        }
        "strong" | "b" => visit_children(node, RunStyle { bold: true, ..style }, pre, ctx),
        "em" | "i" => visit_children(node, RunStyle { italic: true, ..style }, pre, ctx),
        "code" | "kbd" | "samp" => visit_children(node, RunStyle { code: true, ..style }, pre, ctx),
        "img" => {
            if let Some(alt) = element.value().attr("alt").map(str::trim) {
                if !alt.is_empty() {
                    ctx.append_text(&format!("[{alt}]"), style, false);
                }
            }
        }
        _ => visit_children(node, style, pre, ctx),
    }
}

fn block(
    node: NodeRef<'_, Node>,
    paragraph_style: ParagraphStyle,
    style: RunStyle,
    pre: bool,
    ctx: &mut ParagraphBuilder,
) {
    ctx.start(paragraph_style);
    visit_children(node, style, pre, ctx);
    ctx.flush();
}

struct ParagraphBuilder {
    paragraphs: Vec<Paragraph>,
    current: Paragraph,
    /// Style restored after a nested block closes inside a bullet or heading.
    outer: Vec<ParagraphStyle>,
}

impl ParagraphBuilder {
    fn new() -> Self {
        Self {
            paragraphs: Vec::new(),
            current: Paragraph::new(ParagraphStyle::Normal),
            outer: Vec::new(),
        }
    }

    fn start(&mut self, style: ParagraphStyle) {
        let previous = self.current.style;
        self.flush_current();
        self.outer.push(previous);
        self.current.style = style;
    }

    fn flush(&mut self) {
        self.flush_current();
        self.current.style = self.outer.pop().unwrap_or(ParagraphStyle::Normal);
    }

    fn flush_current(&mut self) {
        let style = self.current.style;
        let mut paragraph = std::mem::replace(&mut self.current, Paragraph::new(style));
        if paragraph.style != ParagraphStyle::CodeBlock {
            if let Some(Segment::Text { text, .. }) = paragraph.segments.last_mut() {
                let trimmed = text.trim_end().len();
                text.truncate(trimmed);
            }
            while matches!(paragraph.segments.last(), Some(Segment::Break | Segment::Tab)) {
                paragraph.segments.pop();
            }
        }
        if paragraph.has_content() {
            self.paragraphs.push(paragraph);
        }
    }

    fn push(&mut self, segment: Segment) {
        self.current.segments.push(segment);
    }

    fn append_text(&mut self, raw: &str, style: RunStyle, pre: bool) {
        if pre {
            let normalized = raw.replace("\r\n", "\n");
            for (idx, line) in normalized.split('\n').enumerate() {
                if idx > 0 {
                    self.push(Segment::Break);
                }
                if !line.is_empty() {
                    self.push_text(line, style);
                }
            }
            return;
        }

        let mut collapsed = String::with_capacity(raw.len());
        let mut last_space = self.ends_with_space();
        for ch in raw.chars() {
            if ch.is_whitespace() {
                if !last_space {
                    collapsed.push(' ');
                }
                last_space = true;
            } else {
                collapsed.push(ch);
                last_space = false;
            }
        }
        if !collapsed.is_empty() {
            self.push_text(&collapsed, style);
        }
    }

    /// True at paragraph start and after whitespace, breaks and tabs.
    fn ends_with_space(&self) -> bool {
        match self.current.segments.last() {
            None => true,
            Some(Segment::Text { text, .. }) => text.ends_with(' ') || text.is_empty(),
            Some(Segment::Break | Segment::Tab) => true,
        }
    }

    fn push_text(&mut self, text: &str, style: RunStyle) {
        if let Some(Segment::Text {
            text: existing,
            style: existing_style,
        }) = self.current.segments.last_mut()
        {
            if *existing_style == style {
                existing.push_str(text);
                return;
            }
        }
        self.push(Segment::Text {
            text: text.to_string(),
            style,
        });
    }

    fn finish(mut self) -> Vec<Paragraph> {
        self.flush_current();
        self.paragraphs
    }
}

/// Characters XML 1.0 does not allow anywhere in a document.
fn is_forbidden_xml_char(ch: char) -> bool {
    matches!(ch, '\u{0}'..='\u{8}' | '\u{b}' | '\u{c}' | '\u{e}'..='\u{1f}' | '\u{fffe}' | '\u{ffff}')
}

fn xml_escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            ch if is_forbidden_xml_char(ch) => {}
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

pub(crate) fn build_document_xml(paragraphs: &[Paragraph]) -> String {
    let mut body = String::new();
    for paragraph in paragraphs {
        body.push_str("<w:p>");
        let style_id = match paragraph.style {
            ParagraphStyle::Normal => None,
            ParagraphStyle::Heading1 => Some("Heading1"),
            ParagraphStyle::Heading2 => Some("Heading2"),
            ParagraphStyle::Heading3 => Some("Heading3"),
            ParagraphStyle::Bullet => Some("ListBullet"),
            ParagraphStyle::CodeBlock => Some("CodeBlock"),
        };
        if let Some(id) = style_id {
            body.push_str(&format!(r#"<w:pPr><w:pStyle w:val="{id}"/></w:pPr>"#));
        }

        for segment in &paragraph.segments {
            match segment {
                Segment::Break => body.push_str("<w:r><w:br/></w:r>"),
                Segment::Tab => body.push_str("<w:r><w:tab/></w:r>"),
                Segment::Text { text, style } => {
                    if text.is_empty() {
                        continue;
                    }
                    body.push_str("<w:r>");
                    if style.bold || style.italic || style.code {
                        body.push_str("<w:rPr>");
                        if style.code {
                            body.push_str(
                                r#"<w:rFonts w:ascii="Consolas" w:hAnsi="Consolas" w:cs="Consolas"/>"#,
                            );
                        }
                        if style.bold {
                            body.push_str("<w:b/>");
                        }
                        if style.italic {
                            body.push_str("<w:i/>");
                        }
                        body.push_str("</w:rPr>");
                    }
                    body.push_str(r#"<w:t xml:space="preserve">"#);
                    body.push_str(&xml_escape_text(text));
                    body.push_str("</w:t></w:r>");
                }
            }
        }
        body.push_str("</w:p>");
    }

    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"
 xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    {body}
    <w:sectPr>
      <w:pgSz w:w="12240" w:h="15840"/>
      <w:pgMar w:top="1440" w:right="1440" w:bottom="1440" w:left="1440" w:header="708" w:footer="708" w:gutter="0"/>
    </w:sectPr>
  </w:body>
</w:document>"#
    )
}

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="xml" ContentType="application/xml"/>
  <Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
  <Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/>
</Types>"#;

const RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>
</Relationships>"#;

const DOCUMENT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
</Relationships>"#;

const STYLES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:style w:type="paragraph" w:default="1" w:styleId="Normal">
    <w:name w:val="Normal"/>
    <w:qFormat/>
  </w:style>
  <w:style w:type="paragraph" w:styleId="Heading1">
    <w:name w:val="heading 1"/>
    <w:basedOn w:val="Normal"/>
    <w:next w:val="Normal"/>
    <w:qFormat/>
    <w:pPr><w:keepNext/><w:spacing w:before="240" w:after="120"/></w:pPr>
    <w:rPr><w:b/><w:sz w:val="32"/></w:rPr>
  </w:style>
  <w:style w:type="paragraph" w:styleId="Heading2">
    <w:name w:val="heading 2"/>
    <w:basedOn w:val="Normal"/>
    <w:next w:val="Normal"/>
    <w:qFormat/>
    <w:pPr><w:keepNext/><w:spacing w:before="200" w:after="100"/></w:pPr>
    <w:rPr><w:b/><w:sz w:val="28"/></w:rPr>
  </w:style>
  <w:style w:type="paragraph" w:styleId="Heading3">
    <w:name w:val="heading 3"/>
    <w:basedOn w:val="Normal"/>
    <w:next w:val="Normal"/>
    <w:qFormat/>
    <w:pPr><w:keepNext/><w:spacing w:before="160" w:after="80"/></w:pPr>
    <w:rPr><w:b/><w:sz w:val="24"/></w:rPr>
  </w:style>
  <w:style w:type="paragraph" w:styleId="ListBullet">
    <w:name w:val="List Bullet"/>
    <w:basedOn w:val="Normal"/>
    <w:pPr><w:ind w:left="360"/></w:pPr>
  </w:style>
  <w:style w:type="paragraph" w:styleId="CodeBlock">
    <w:name w:val="Code Block"/>
    <w:basedOn w:val="Normal"/>
    <w:pPr><w:spacing w:before="120" w:after="120"/></w:pPr>
    <w:rPr><w:rFonts w:ascii="Consolas" w:hAnsi="Consolas" w:cs="Consolas"/><w:sz w:val="20"/></w:rPr>
  </w:style>
</w:styles>"#;

fn write_package(document_xml: &str) -> Result<Vec<u8>, ConversionError> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let opt = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let parts = [
        ("[Content_Types].xml", CONTENT_TYPES_XML),
        ("_rels/.rels", RELS_XML),
        ("word/document.xml", document_xml),
        ("word/_rels/document.xml.rels", DOCUMENT_RELS_XML),
        ("word/styles.xml", STYLES_XML),
    ];
    for (name, content) in parts {
        zip.start_file(name, opt)?;
        zip.write_all(content.as_bytes())?;
    }

    Ok(zip.finish()?.into_inner())
}
