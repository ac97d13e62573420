//! Arena-backed DOM document

use super::geometry::Rect;
use super::selector::Selector;
use crate::utils::Result;
use cssparser::{Delimiter, ParseError, Parser, ParserInput};
use std::collections::HashMap;

/// Handle to a node in a [`Document`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Node types in the DOM
#[derive(Debug, Clone, PartialEq)]
pub enum NodeType {
    /// Document root
    Document,
    /// Element node (e.g., <img>)
    Element(ElementData),
    /// Text node
    Text(String),
    /// Comment node
    Comment(String),
    /// `<!DOCTYPE name>`
    Doctype(String),
}

/// Data for element nodes
#[derive(Debug, Clone, PartialEq)]
pub struct ElementData {
    /// Lowercase tag name (e.g., "img", "iframe")
    pub tag_name: String,
    /// Attributes in source order
    attributes: Vec<(String, String)>,
}

impl ElementData {
    /// Create a new element
    pub fn new(tag_name: impl Into<String>) -> Self {
        Self {
            tag_name: tag_name.into().to_ascii_lowercase(),
            attributes: Vec::new(),
        }
    }

    /// Get an attribute value
    pub fn get_attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.iter().any(|(k, _)| k == name)
    }

    /// Set an attribute value, keeping the original position when replacing
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == name) {
            Some((_, existing)) => *existing = value,
            None => self.attributes.push((name, value)),
        }
    }

    /// Remove an attribute, returning its previous value
    pub fn remove_attribute(&mut self, name: &str) -> Option<String> {
        let pos = self.attributes.iter().position(|(k, _)| k == name)?;
        Some(self.attributes.remove(pos).1)
    }

    /// All attributes in source order
    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    /// Get the ID attribute
    pub fn id(&self) -> Option<&str> {
        self.get_attribute("id")
    }

    /// Get class names
    pub fn classes(&self) -> Vec<&str> {
        self.get_attribute("class")
            .map(|c| c.split_whitespace().collect())
            .unwrap_or_default()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().contains(&class)
    }

    /// Add a class if it is not present yet
    pub fn add_class(&mut self, class: &str) {
        if self.has_class(class) {
            return;
        }
        let joined = match self.get_attribute("class") {
            Some(existing) if !existing.trim().is_empty() => {
                format!("{} {}", existing.trim(), class)
            }
            _ => class.to_string(),
        };
        self.set_attribute("class", joined);
    }

    /// Remove every occurrence of a class
    pub fn remove_class(&mut self, class: &str) {
        if !self.has_class(class) {
            return;
        }
        let remaining: Vec<&str> = self.classes().into_iter().filter(|c| *c != class).collect();
        let joined = remaining.join(" ");
        self.set_attribute("class", joined);
    }

    /// Flip a class, returning whether it is present afterwards
    pub fn toggle_class(&mut self, class: &str) -> bool {
        if self.has_class(class) {
            self.remove_class(class);
            false
        } else {
            self.add_class(class);
            true
        }
    }
}

#[derive(Debug, Clone)]
struct NodeRecord {
    node_type: NodeType,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Elements serialized without a closing tag
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// Elements laid out as blocks when no inline style says otherwise
const BLOCK_ELEMENTS: &[&str] = &[
    "html", "body", "div", "section", "article", "header", "footer", "main", "nav", "aside",
    "p", "ul", "ol", "li", "h1", "h2", "h3", "h4", "h5", "h6", "figure", "form", "table",
];

/// Elements never rendered
const HIDDEN_ELEMENTS: &[&str] = &["head", "script", "style", "template", "meta", "link", "title"];

/// The DOM document
///
/// Nodes live in an arena and are addressed by [`NodeId`]. Layout is not
/// computed here: embedders attach a rectangle (in document coordinates) to
/// the elements they care about with [`Document::set_layout_rect`].
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<NodeRecord>,
    layout: HashMap<NodeId, Rect>,
}

impl Document {
    /// Create a new empty document
    pub fn new() -> Self {
        Self {
            nodes: vec![NodeRecord {
                node_type: NodeType::Document,
                parent: None,
                children: Vec::new(),
            }],
            layout: HashMap::new(),
        }
    }

    /// The document node itself
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    fn push(&mut self, node_type: NodeType) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeRecord {
            node_type,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    /// Create a detached element
    pub fn create_element(&mut self, tag_name: &str) -> NodeId {
        self.push(NodeType::Element(ElementData::new(tag_name)))
    }

    /// Create a detached text node
    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeType::Text(text.into()))
    }

    pub fn create_comment(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeType::Comment(text.into()))
    }

    pub fn create_doctype(&mut self, name: impl Into<String>) -> NodeId {
        self.push(NodeType::Doctype(name.into()))
    }

    /// Append `child` as the last child of `parent`, detaching it first
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if parent == child || child == self.root() {
            return;
        }
        if let Some(old) = self.nodes[child.0].parent {
            self.nodes[old.0].children.retain(|c| *c != child);
        }
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    pub fn node_type(&self, node: NodeId) -> Option<&NodeType> {
        self.nodes.get(node.0).map(|n| &n.node_type)
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node.0).and_then(|n| n.parent)
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.nodes
            .get(node.0)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    /// Get element data if the node is an element
    pub fn element(&self, node: NodeId) -> Option<&ElementData> {
        match self.node_type(node)? {
            NodeType::Element(data) => Some(data),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, node: NodeId) -> Option<&mut ElementData> {
        match &mut self.nodes.get_mut(node.0)?.node_type {
            NodeType::Element(data) => Some(data),
            _ => None,
        }
    }

    /// The `<html>` element (first element child of the document)
    pub fn document_element(&self) -> Option<NodeId> {
        self.children(self.root())
            .iter()
            .copied()
            .find(|c| self.element(*c).is_some())
    }

    /// Descendants of `node` in tree order, `node` excluded
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(node).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    /// Every connected element in tree order
    pub fn elements(&self) -> Vec<NodeId> {
        self.descendants(self.root())
            .into_iter()
            .filter(|n| self.element(*n).is_some())
            .collect()
    }

    /// Equivalent of `getElementsByTagName('*').length`
    pub fn element_count(&self) -> usize {
        self.elements().len()
    }

    /// Connected elements matching a compiled selector
    pub fn select(&self, selector: &Selector) -> Vec<NodeId> {
        self.elements()
            .into_iter()
            .filter(|n| self.element(*n).is_some_and(|e| selector.matches(e)))
            .collect()
    }

    /// Parse `selector` and return the matching elements
    pub fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>> {
        let compiled = Selector::parse(selector)?;
        Ok(self.select(&compiled))
    }

    /// Attach a layout box (document coordinates) to an element
    pub fn set_layout_rect(&mut self, node: NodeId, rect: Rect) {
        self.layout.insert(node, rect);
    }

    /// Layout box of an element; unlaid-out elements sit empty at the origin
    pub fn layout_rect(&self, node: NodeId) -> Rect {
        self.layout.get(&node).copied().unwrap_or_default()
    }

    /// Rendered width, rounded like `clientWidth`
    pub fn client_width(&self, node: NodeId) -> u32 {
        self.layout_rect(node).width.max(0.0).round() as u32
    }

    /// Value of the `display` property for an element.
    ///
    /// Only the element's own inline style and `hidden` attribute are
    /// consulted on top of a per-tag default.
    pub fn computed_display(&self, node: NodeId) -> String {
        let Some(element) = self.element(node) else {
            return "none".to_string();
        };

        if let Some(display) = element.get_attribute("style").and_then(inline_display) {
            return display;
        }
        if element.has_attribute("hidden") || HIDDEN_ELEMENTS.contains(&element.tag_name.as_str())
        {
            return "none".to_string();
        }
        if BLOCK_ELEMENTS.contains(&element.tag_name.as_str()) {
            "block".to_string()
        } else {
            "inline".to_string()
        }
    }

    /// Serialize a node and its subtree as HTML
    pub fn outer_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        let mut stack = vec![Step::Open(node)];

        while let Some(step) = stack.pop() {
            let id = match step {
                Step::Open(id) => id,
                Step::Close(id) => {
                    if let Some(element) = self.element(id) {
                        out.push_str("</");
                        out.push_str(&element.tag_name);
                        out.push('>');
                    }
                    continue;
                }
            };
            let Some(record) = self.nodes.get(id.0) else {
                continue;
            };
            match &record.node_type {
                NodeType::Document => {}
                NodeType::Doctype(name) => {
                    out.push_str("<!DOCTYPE ");
                    out.push_str(name);
                    out.push('>');
                }
                NodeType::Comment(text) => {
                    out.push_str("<!--");
                    out.push_str(text);
                    out.push_str("-->");
                }
                NodeType::Text(text) => {
                    let raw = self
                        .parent(id)
                        .and_then(|p| self.element(p))
                        .is_some_and(|p| matches!(p.tag_name.as_str(), "script" | "style"));
                    if raw {
                        out.push_str(text);
                    } else {
                        escape_text(text, &mut out);
                    }
                }
                NodeType::Element(element) => {
                    out.push('<');
                    out.push_str(&element.tag_name);
                    for (name, value) in element.attributes() {
                        out.push(' ');
                        out.push_str(name);
                        out.push_str("=\"");
                        escape_attribute(value, &mut out);
                        out.push('"');
                    }
                    out.push('>');
                    if VOID_ELEMENTS.contains(&element.tag_name.as_str()) {
                        continue;
                    }
                    stack.push(Step::Close(id));
                }
            }
            stack.extend(record.children.iter().rev().map(|c| Step::Open(*c)));
        }
        out
    }
}

/// Pending serializer work
enum Step {
    Open(NodeId),
    Close(NodeId),
}

/// Last `display` declaration of an inline style attribute
fn inline_display(style: &str) -> Option<String> {
    let mut input = ParserInput::new(style);
    let mut parser = Parser::new(&mut input);
    let mut display = None;

    while !parser.is_exhausted() {
        let declaration: std::result::Result<Option<String>, ParseError<'_, ()>> = parser
            .parse_until_after(Delimiter::Semicolon, |p| {
                let property = p.expect_ident()?.clone();
                p.expect_colon()?;
                let value = p.expect_ident()?.to_ascii_lowercase();
                // `!important` and anything else trailing the keyword
                while p.next().is_ok() {}
                Ok(property.eq_ignore_ascii_case("display").then_some(value))
            });
        if let Ok(Some(value)) = declaration {
            display = Some(value);
        }
    }
    display
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
}

fn escape_attribute(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
}
