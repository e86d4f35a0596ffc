//! The post-conversion (HTML) tree.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Root {
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Node {
    Element(Element),
    Text { value: String },
    /// Markup emitted verbatim.
    Raw { value: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub tag: String,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    #[serde(default)]
    pub children: Vec<Node>,
}

const VOID_ELEMENTS: &[&str] = &["br", "hr", "img", "input", "meta", "link", "source", "wbr"];

impl Root {
    /// Calls `f` on every element, parents before children.
    pub fn visit_elements_mut<F: FnMut(&mut Element)>(&mut self, mut f: F) {
        fn visit<F: FnMut(&mut Element)>(nodes: &mut [Node], f: &mut F) {
            for node in nodes {
                if let Node::Element(element) = node {
                    f(element);
                    visit(&mut element.children, f);
                }
            }
        }

        visit(&mut self.children, &mut f)
    }

    /// Calls `f` on every element, parents before children.
    pub fn visit_elements<F: FnMut(&Element)>(&self, mut f: F) {
        fn visit<F: FnMut(&Element)>(nodes: &[Node], f: &mut F) {
            for node in nodes {
                if let Node::Element(element) = node {
                    f(element);
                    visit(&element.children, f);
                }
            }
        }

        visit(&self.children, &mut f)
    }

    pub fn text_content(&self) -> String {
        let mut string = String::new();
        self.children.iter().for_each(|c| c.write_text(&mut string));
        string
    }

    pub fn to_html(&self) -> String {
        self.to_string()
    }
}

impl Node {
    pub fn text<S: Into<String>>(value: S) -> Node {
        Node::Text { value: value.into() }
    }

    pub fn raw<S: Into<String>>(value: S) -> Node {
        Node::Raw { value: value.into() }
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(e) => Some(e),
            _ => None,
        }
    }

    pub fn text_content(&self) -> String {
        let mut string = String::new();
        self.write_text(&mut string);
        string
    }

    fn write_text(&self, out: &mut String) {
        match self {
            Node::Text { value } => out.push_str(value),
            Node::Element(e) => e.children.iter().for_each(|c| c.write_text(out)),
            Node::Raw { .. } => {}
        }
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Node::Element(element)
    }
}

impl Element {
    pub fn new<T: Into<String>>(tag: T) -> Self {
        Element { tag: tag.into(), properties: BTreeMap::new(), children: vec![] }
    }

    pub fn with<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.set(key, value);
        self
    }

    pub fn with_children<I: IntoIterator<Item = Node>>(mut self, children: I) -> Self {
        self.children.extend(children);
        self
    }

    pub fn child<N: Into<Node>>(mut self, child: N) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(|v| v.as_str())
    }

    pub fn set<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) {
        self.properties.insert(key.into(), value.into());
    }

    pub fn is(&self, tag: &str) -> bool {
        self.tag.eq_ignore_ascii_case(tag)
    }

    /// `h1`..`h6` as `1..=6`.
    pub fn heading_depth(&self) -> Option<u8> {
        match self.tag.as_bytes() {
            [b'h', d @ b'1'..=b'6'] => Some(d - b'0'),
            _ => None,
        }
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> + '_ {
        self.get("class").unwrap_or_default().split_whitespace()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }

    pub fn add_class(&mut self, class: &str) {
        if self.has_class(class) {
            return;
        }

        let classes = match self.get("class") {
            Some(existing) if !existing.trim().is_empty() => format!("{existing} {class}"),
            _ => class.to_string(),
        };

        self.set("class", classes);
    }

    pub fn text_content(&self) -> String {
        let mut string = String::new();
        self.children.iter().for_each(|c| c.write_text(&mut string));
        string
    }
}

fn escape(string: &str, attribute: bool, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut last = 0;
    for (i, b) in string.bytes().enumerate() {
        let replacement = match b {
            b'&' => "&amp;",
            b'<' => "&lt;",
            b'>' => "&gt;",
            b'"' if attribute => "&quot;",
            _ => continue,
        };

        f.write_str(&string[last..i])?;
        f.write_str(replacement)?;
        last = i + 1;
    }

    f.write_str(&string[last..])
}

impl fmt::Display for Root {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.children.iter().try_for_each(|c| c.fmt(f))
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Element(e) => e.fmt(f),
            Node::Text { value } => escape(value, false, f),
            Node::Raw { value } => f.write_str(value),
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}", self.tag)?;
        for (key, value) in &self.properties {
            if value.is_empty() {
                write!(f, " {key}")?;
            } else {
                write!(f, " {key}=\"")?;
                escape(value, true, f)?;
                f.write_str("\"")?;
            }
        }

        f.write_str(">")?;
        if VOID_ELEMENTS.contains(&self.tag.as_str()) {
            return Ok(());
        }

        self.children.iter().try_for_each(|c| c.fmt(f))?;
        write!(f, "</{}>", self.tag)
    }
}
