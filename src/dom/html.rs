//! HTML5 parser implementation using html5ever

use super::document::{Document, NodeId};
use crate::utils::{DomError, Result};
use html5ever::tendril::TendrilSink;
use html5ever::tree_builder::TreeBuilderOpts;
use html5ever::{ParseOpts, parse_document};
use markup5ever_rcdom::{Handle, NodeData, RcDom};

/// HTML5 parser producing arena [`Document`]s
pub struct HtmlParser {
    opts: ParseOpts,
}

impl HtmlParser {
    /// Create a new HTML parser
    pub fn new() -> Self {
        Self {
            opts: ParseOpts {
                tree_builder: TreeBuilderOpts {
                    drop_doctype: false,
                    ..Default::default()
                },
                ..Default::default()
            },
        }
    }

    /// Parse HTML content into a DOM document
    pub fn parse(&self, content: &str) -> Result<Document> {
        if content.trim().is_empty() {
            return Ok(Document::new());
        }

        let dom = parse_document(RcDom::default(), self.opts.clone())
            .from_utf8()
            .read_from(&mut content.as_bytes())
            .map_err(|e| DomError::HtmlParse(e.to_string()))?;

        let mut document = Document::new();
        convert_tree(&mut document, &dom.document);
        log::debug!(
            "parsed document with {} elements",
            document.element_count()
        );
        Ok(document)
    }
}

impl Default for HtmlParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Copy the children of an rcdom document into the arena, in tree order
fn convert_tree(document: &mut Document, rcdom_root: &Handle) {
    let root = document.root();
    let mut pending: Vec<(NodeId, Handle)> = rcdom_root
        .children
        .borrow()
        .iter()
        .rev()
        .map(|child| (root, child.clone()))
        .collect();

    while let Some((parent, handle)) = pending.pop() {
        let node = match &handle.data {
            NodeData::Element { name, attrs, .. } => {
                let id = document.create_element(name.local.as_ref());
                if let Some(element) = document.element_mut(id) {
                    for attr in attrs.borrow().iter() {
                        element.set_attribute(attr.name.local.to_string(), attr.value.to_string());
                    }
                }
                id
            }
            NodeData::Text { contents } => document.create_text(contents.borrow().to_string()),
            NodeData::Comment { contents } => document.create_comment(contents.to_string()),
            NodeData::Doctype { name, .. } => document.create_doctype(name.to_string()),
            NodeData::Document | NodeData::ProcessingInstruction { .. } => continue,
        };
        document.append_child(parent, node);
        pending.extend(
            handle
                .children
                .borrow()
                .iter()
                .rev()
                .map(|child| (node, child.clone())),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty_html() {
        let parser = HtmlParser::new();
        let doc = parser.parse("").unwrap();
        assert!(doc.document_element().is_none());
        assert_eq!(doc.element_count(), 0);
    }

    #[test]
    fn test_parse_builds_implied_structure() {
        let parser = HtmlParser::new();
        let doc = parser.parse("<p>Hello</p>").unwrap();
        // html, head, body, p
        assert_eq!(doc.element_count(), 4);
        let html = doc.document_element().unwrap();
        assert_eq!(doc.element(html).unwrap().tag_name, "html");
    }

    #[test]
    fn test_parse_with_attributes() {
        let parser = HtmlParser::new();
        let doc = parser
            .parse(r#"<img data-src="hero.webp" class="lazy" alt="Hero">"#)
            .unwrap();
        let imgs = doc.query_selector_all("img[data-src]").unwrap();
        assert_eq!(imgs.len(), 1);
        let img = doc.element(imgs[0]).unwrap();
        assert_eq!(img.get_attribute("data-src"), Some("hero.webp"));
        assert!(img.has_class("lazy"));
    }

    #[test]
    fn test_doctype_not_part_of_document_element() {
        let parser = HtmlParser::new();
        let doc = parser
            .parse("<!DOCTYPE html><html><head></head><body><p>x</p></body></html>")
            .unwrap();
        let html = doc.document_element().unwrap();
        assert_eq!(
            doc.outer_html(html),
            "<html><head></head><body><p>x</p></body></html>"
        );
        assert!(doc.outer_html(doc.root()).starts_with("<!DOCTYPE html>"));
    }

    #[test]
    fn test_parse_deeply_nested_markup() {
        let depth = 10_000;
        let html = format!("{}{}", "<div>".repeat(depth), "</div>".repeat(depth));
        let doc = HtmlParser::new().parse(&html).unwrap();
        // html, head, body and the nested divs
        assert_eq!(doc.element_count(), depth + 3);

        let markup = doc.outer_html(doc.document_element().unwrap());
        assert!(markup.ends_with(&format!("{}</body></html>", "</div>".repeat(depth))));
    }

    #[test]
    fn test_parse_malformed_html() {
        // html5ever should handle malformed HTML gracefully
        let parser = HtmlParser::new();
        let doc = parser.parse("<p>Unclosed paragraph<div>Another").unwrap();
        assert_eq!(doc.query_selector_all("div").unwrap().len(), 1);
    }
}
