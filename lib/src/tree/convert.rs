use rustc_hash::FxHashMap;

use crate::tree::mdast::{self, Align};
use crate::tree::hast::{self, Element};

#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Heading of the generated footnotes section.
    pub footnote_label: String,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        ConvertOptions { footnote_label: "Footnotes".into() }
    }
}

/// Converts a markdown tree into an HTML tree. There is no way back.
///
/// Raw HTML is kept as [`hast::Node::Raw`] and front matter is dropped.
/// Footnote references are numbered in order of first use, and referenced
/// definitions are gathered into a trailing `section.footnotes`.
pub fn to_hast(root: mdast::Root, options: &ConvertOptions) -> hast::Root {
    let mut converter = Converter::default();
    let mut children = converter.all(root.children);
    if let Some(section) = converter.footnotes(options) {
        children.push(section.into());
    }

    hast::Root { children }
}

#[derive(Default)]
struct Converter {
    order: Vec<String>,
    definitions: FxHashMap<String, Vec<mdast::Node>>,
    in_head: bool,
}

fn id(label: &str) -> String {
    crate::util::slugify(label)
}

impl Converter {
    fn all(&mut self, nodes: Vec<mdast::Node>) -> Vec<hast::Node> {
        nodes.into_iter().filter_map(|n| self.one(n)).collect()
    }

    fn element(&mut self, tag: &str, children: Vec<mdast::Node>) -> Element {
        let children = self.all(children);
        Element::new(tag).with_children(children)
    }

    fn one(&mut self, node: mdast::Node) -> Option<hast::Node> {
        use mdast::Node::*;

        let element = match node {
            Frontmatter { .. } => return None,
            Text { value } => return Some(hast::Node::Text { value }),
            Html { value } => return Some(hast::Node::Raw { value }),
            FootnoteDefinition { label, children } => {
                self.definitions.entry(label).or_insert(children);
                return None;
            }
            Paragraph { children } => self.element("p", children),
            Heading { depth, id, classes, children } => {
                let mut h = self.element(&format!("h{depth}"), children);
                if let Some(id) = id {
                    h.set("id", id);
                }

                if !classes.is_empty() {
                    h.set("class", classes.join(" "));
                }

                h
            }
            BlockQuote { children } => self.element("blockquote", children),
            Code { lang, value } => {
                let mut code = Element::new("code").child(hast::Node::text(value));
                if let Some(lang) = lang {
                    code.set("class", format!("language-{lang}"));
                }

                Element::new("pre").child(code)
            }
            List { ordered, start, children } => {
                let mut list = self.element(if ordered { "ol" } else { "ul" }, children);
                if let Some(start) = start.filter(|&s| s != 1) {
                    list.set("start", start.to_string());
                }

                if list.children.iter().any(|c| c.as_element().is_some_and(|li| li.has_class("task-list-item"))) {
                    list.add_class("contains-task-list");
                }

                list
            }
            ListItem { checked, children } => {
                let mut li = Element::new("li");
                if let Some(checked) = checked {
                    li.add_class("task-list-item");
                    let mut input = Element::new("input")
                        .with("type", "checkbox")
                        .with("disabled", "");

                    if checked {
                        input.set("checked", "");
                    }

                    li.children.push(input.into());
                    li.children.push(hast::Node::text(" "));
                }

                let children = self.all(children);
                li.with_children(children)
            }
            Table { align, children } => self.table(align, children),
            TableRow { children, .. } => self.element("tr", children),
            TableCell { children } => {
                let tag = if self.in_head { "th" } else { "td" };
                self.element(tag, children)
            }
            ThematicBreak => Element::new("hr"),
            FootnoteReference { label } => self.reference(label),
            InlineCode { value } => Element::new("code").child(hast::Node::text(value)),
            Emphasis { children } => self.element("em", children),
            Strong { children } => self.element("strong", children),
            Delete { children } => self.element("del", children),
            Link { url, title, children } => {
                let mut a = self.element("a", children).with("href", url);
                if let Some(title) = title {
                    a.set("title", title);
                }

                a
            }
            Image { url, title, children } => {
                let alt = children.iter().map(|c| c.text_content()).collect::<String>();
                let mut img = Element::new("img").with("src", url).with("alt", alt);
                if let Some(title) = title {
                    img.set("title", title);
                }

                img
            }
            Break => Element::new("br"),
        };

        Some(element.into())
    }

    fn table(&mut self, align: Vec<Align>, rows: Vec<mdast::Node>) -> Element {
        let mut thead = Element::new("thead");
        let mut tbody = Element::new("tbody");
        for row in rows {
            let head = matches!(row, mdast::Node::TableRow { head: true, .. });
            self.in_head = head;
            let Some(hast::Node::Element(mut tr)) = self.one(row) else { continue };
            let cells = tr.children.iter_mut().filter_map(|c| match c {
                hast::Node::Element(e) => Some(e),
                _ => None,
            });

            for (cell, align) in cells.zip(align.iter()) {
                match align {
                    Align::Left => cell.set("align", "left"),
                    Align::Center => cell.set("align", "center"),
                    Align::Right => cell.set("align", "right"),
                    Align::None => {}
                }
            }

            if head { thead.children.push(tr.into()) } else { tbody.children.push(tr.into()) }
        }

        self.in_head = false;
        let mut table = Element::new("table").child(thead);
        if !tbody.children.is_empty() {
            table.children.push(tbody.into());
        }

        table
    }

    fn reference(&mut self, label: String) -> Element {
        let index = match self.order.iter().position(|l| *l == label) {
            Some(i) => i,
            None => {
                self.order.push(label.clone());
                self.order.len() - 1
            }
        };

        let id = id(&label);
        let a = Element::new("a")
            .with("href", format!("#user-content-fn-{id}"))
            .with("id", format!("user-content-fnref-{id}"))
            .with("data-footnote-ref", "")
            .with("aria-describedby", "footnote-label")
            .child(hast::Node::text((index + 1).to_string()));

        Element::new("sup").child(a)
    }

    fn footnotes(&mut self, options: &ConvertOptions) -> Option<Element> {
        let mut items = vec![];
        let mut i = 0;
        // Definitions may reference further footnotes, growing `order`.
        while i < self.order.len() {
            let label = self.order[i].clone();
            i += 1;

            let Some(definition) = self.definitions.remove(&label) else { continue };
            let id = id(&label);
            let backref = Element::new("a")
                .with("href", format!("#user-content-fnref-{id}"))
                .with("data-footnote-backref", "")
                .with("class", "data-footnote-backref")
                .with("aria-label", "Back to reference")
                .child(hast::Node::text("↩"));

            let mut children = self.all(definition);
            match children.last_mut() {
                Some(hast::Node::Element(p)) if p.is("p") => {
                    p.children.push(hast::Node::text(" "));
                    p.children.push(backref.into());
                }
                _ => children.push(backref.into()),
            }

            let li = Element::new("li")
                .with("id", format!("user-content-fn-{id}"))
                .with_children(children);

            items.push(hast::Node::from(li));
        }

        if items.is_empty() {
            return None;
        }

        let heading = Element::new("h2")
            .with("id", "footnote-label")
            .with("class", "sr-only")
            .child(hast::Node::text(options.footnote_label.clone()));

        let section = Element::new("section")
            .with("data-footnotes", "")
            .with("class", "footnotes")
            .child(heading)
            .child(Element::new("ol").with_children(items));

        Some(section)
    }
}
