use std::collections::HashSet;

use ego_tree::{NodeId, NodeRef};
use scraper::node::Node;
use scraper::{ElementRef, Html};

/// Builds a navigable document tree from raw HTML text.
pub trait DocumentFactory: Send + Sync {
    fn create_document_from_string(&self, html: &str) -> Html;
}

/// html5ever-backed factory.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScraperDocumentFactory;

impl DocumentFactory for ScraperDocumentFactory {
    fn create_document_from_string(&self, html: &str) -> Html {
        Html::parse_document(html)
    }
}

/// Tree id of an element, used to mark subtrees for skipping.
pub fn node_id(element: ElementRef<'_>) -> NodeId {
    let node: NodeRef<'_, Node> = *element;
    node.id()
}

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Serializes `node` and its descendants back to HTML, leaving out every
/// subtree rooted at an id in `skip`.
pub fn serialize_node(node: NodeRef<'_, Node>, skip: &HashSet<NodeId>) -> String {
    let mut out = String::new();
    write_node(node, skip, false, &mut out);
    out
}

fn write_node(node: NodeRef<'_, Node>, skip: &HashSet<NodeId>, raw_text: bool, out: &mut String) {
    if skip.contains(&node.id()) {
        return;
    }
    match node.value() {
        Node::Text(text) => {
            if raw_text {
                out.push_str(text);
            } else {
                escape_into(text, false, out);
            }
        }
        Node::Element(element) => {
            let name = element.name();
            out.push('<');
            out.push_str(name);
            for (attr, value) in element.attrs() {
                out.push(' ');
                out.push_str(attr);
                out.push_str("=\"");
                escape_into(value, true, out);
                out.push('"');
            }
            out.push('>');
            if VOID_ELEMENTS.contains(&name) {
                return;
            }
            let raw = RAW_TEXT_ELEMENTS.contains(&name);
            for child in node.children() {
                write_node(child, skip, raw, out);
            }
            out.push_str("</");
            out.push_str(name);
            out.push('>');
        }
        Node::Doctype(_) => out.push_str("<!DOCTYPE html>"),
        Node::Comment(_) | Node::ProcessingInstruction(_) => {}
        Node::Document | Node::Fragment => {
            for child in node.children() {
                write_node(child, skip, raw_text, out);
            }
        }
    }
}

fn escape_into(text: &str, attribute: bool, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' if !attribute => out.push_str("&lt;"),
            '>' if !attribute => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
}
