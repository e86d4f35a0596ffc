//! The pre-conversion (markdown) tree.

use pulldown_cmark::{Alignment, CodeBlockKind, Event, MetadataBlockKind, Options, Parser, Tag};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Root {
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrontmatterKind {
    Yaml,
    Toml,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    None,
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Node {
    Frontmatter { kind: FrontmatterKind, value: String },
    Paragraph { children: Vec<Node> },
    Heading { depth: u8, id: Option<String>, classes: Vec<String>, children: Vec<Node> },
    BlockQuote { children: Vec<Node> },
    Code { lang: Option<String>, value: String },
    Html { value: String },
    List { ordered: bool, start: Option<u64>, children: Vec<Node> },
    ListItem { checked: Option<bool>, children: Vec<Node> },
    Table { align: Vec<Align>, children: Vec<Node> },
    TableRow { head: bool, children: Vec<Node> },
    TableCell { children: Vec<Node> },
    ThematicBreak,
    FootnoteDefinition { label: String, children: Vec<Node> },
    FootnoteReference { label: String },
    Text { value: String },
    InlineCode { value: String },
    Emphasis { children: Vec<Node> },
    Strong { children: Vec<Node> },
    Delete { children: Vec<Node> },
    Link { url: String, title: Option<String>, children: Vec<Node> },
    Image { url: String, title: Option<String>, children: Vec<Node> },
    Break,
}

/// The base grammar: CommonMark, tables, footnotes, strikethrough, task
/// lists, heading attributes, and YAML/TOML front matter blocks.
pub fn base_options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_HEADING_ATTRIBUTES
        | Options::ENABLE_YAML_STYLE_METADATA_BLOCKS
        | Options::ENABLE_PLUSES_DELIMITED_METADATA_BLOCKS
}

impl Root {
    pub fn parse(text: &str) -> Root {
        Root::parse_with(text, base_options())
    }

    pub fn parse_with(text: &str, options: Options) -> Root {
        let mut builder = Builder::default();
        for event in Parser::new_ext(text, options) {
            builder.push(event);
        }

        builder.finish()
    }

    /// Calls `f` on every node, parents before children.
    pub fn visit_mut<F: FnMut(&mut Node)>(&mut self, mut f: F) {
        fn visit<F: FnMut(&mut Node)>(nodes: &mut [Node], f: &mut F) {
            for node in nodes {
                f(node);
                if let Some(children) = node.children_mut() {
                    visit(children, f);
                }
            }
        }

        visit(&mut self.children, &mut f)
    }

    /// Calls `f` on every node, parents before children.
    pub fn visit<F: FnMut(&Node)>(&self, mut f: F) {
        fn visit<F: FnMut(&Node)>(nodes: &[Node], f: &mut F) {
            for node in nodes {
                f(node);
                if let Some(children) = node.children() {
                    visit(children, f);
                }
            }
        }

        visit(&self.children, &mut f)
    }
}

impl Node {
    pub fn text<S: Into<String>>(value: S) -> Node {
        Node::Text { value: value.into() }
    }

    pub fn children(&self) -> Option<&Vec<Node>> {
        use Node::*;

        match self {
            Paragraph { children } | Heading { children, .. } | BlockQuote { children }
            | List { children, .. } | ListItem { children, .. } | Table { children, .. }
            | TableRow { children, .. } | TableCell { children }
            | FootnoteDefinition { children, .. } | Emphasis { children }
            | Strong { children } | Delete { children } | Link { children, .. }
            | Image { children, .. } => Some(children),
            _ => None,
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<Node>> {
        use Node::*;

        match self {
            Paragraph { children } | Heading { children, .. } | BlockQuote { children }
            | List { children, .. } | ListItem { children, .. } | Table { children, .. }
            | TableRow { children, .. } | TableCell { children }
            | FootnoteDefinition { children, .. } | Emphasis { children }
            | Strong { children } | Delete { children } | Link { children, .. }
            | Image { children, .. } => Some(children),
            _ => None,
        }
    }

    /// The concatenated literal text of `self` and its descendants.
    pub fn text_content(&self) -> String {
        let mut string = String::new();
        self.write_text(&mut string);
        string
    }

    fn write_text(&self, out: &mut String) {
        match self {
            Node::Text { value } | Node::InlineCode { value } | Node::Code { value, .. } => {
                out.push_str(value);
            }
            Node::Break => out.push('\n'),
            node => if let Some(children) = node.children() {
                children.iter().for_each(|c| c.write_text(out));
            }
        }
    }
}

/// An element whose end event hasn't been seen yet.
#[derive(Debug)]
enum Open {
    Root,
    Paragraph,
    Heading { depth: u8, id: Option<String>, classes: Vec<String> },
    BlockQuote,
    Code { lang: Option<String> },
    Html,
    Frontmatter { kind: FrontmatterKind },
    List { start: Option<u64> },
    ListItem { checked: Option<bool> },
    Table { align: Vec<Align> },
    TableRow { head: bool },
    TableCell,
    FootnoteDefinition { label: String },
    Emphasis,
    Strong,
    Delete,
    Link { url: String, title: Option<String> },
    Image { url: String, title: Option<String> },
    Unknown,
}

#[derive(Debug)]
struct Frame {
    open: Open,
    children: Vec<Node>,
}

#[derive(Debug)]
struct Builder {
    stack: Vec<Frame>,
}

impl Default for Builder {
    fn default() -> Self {
        Builder { stack: vec![Frame { open: Open::Root, children: vec![] }] }
    }
}

fn literal(children: &[Node]) -> String {
    children.iter().map(Node::text_content).collect()
}

fn title(title: &str) -> Option<String> {
    (!title.is_empty()).then(|| title.to_string())
}

impl Builder {
    fn push(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => {
                let open = match tag {
                    Tag::Paragraph => Open::Paragraph,
                    Tag::Heading { level, id, classes, .. } => Open::Heading {
                        depth: level as u8,
                        id: id.map(|id| id.to_string()),
                        classes: classes.iter().map(|c| c.to_string()).collect(),
                    },
                    Tag::BlockQuote => Open::BlockQuote,
                    Tag::CodeBlock(CodeBlockKind::Fenced(info)) => Open::Code {
                        lang: info.split(|c: char| c == ',' || c.is_whitespace())
                            .next()
                            .filter(|lang| !lang.is_empty())
                            .map(|lang| lang.to_string()),
                    },
                    Tag::CodeBlock(CodeBlockKind::Indented) => Open::Code { lang: None },
                    Tag::HtmlBlock => Open::Html,
                    Tag::MetadataBlock(MetadataBlockKind::YamlStyle) => {
                        Open::Frontmatter { kind: FrontmatterKind::Yaml }
                    }
                    Tag::MetadataBlock(MetadataBlockKind::PlusesStyle) => {
                        Open::Frontmatter { kind: FrontmatterKind::Toml }
                    }
                    Tag::List(start) => Open::List { start },
                    Tag::Item => Open::ListItem { checked: None },
                    Tag::Table(align) => Open::Table {
                        align: align.into_iter().map(|a| match a {
                            Alignment::None => Align::None,
                            Alignment::Left => Align::Left,
                            Alignment::Center => Align::Center,
                            Alignment::Right => Align::Right,
                        }).collect()
                    },
                    Tag::TableHead => Open::TableRow { head: true },
                    Tag::TableRow => Open::TableRow { head: false },
                    Tag::TableCell => Open::TableCell,
                    Tag::FootnoteDefinition(label) => Open::FootnoteDefinition {
                        label: label.to_string()
                    },
                    Tag::Emphasis => Open::Emphasis,
                    Tag::Strong => Open::Strong,
                    Tag::Strikethrough => Open::Delete,
                    Tag::Link { dest_url, title: t, .. } => Open::Link {
                        url: dest_url.to_string(),
                        title: title(&t),
                    },
                    Tag::Image { dest_url, title: t, .. } => Open::Image {
                        url: dest_url.to_string(),
                        title: title(&t),
                    },
                    #[allow(unreachable_patterns)]
                    _ => Open::Unknown,
                };

                self.stack.push(Frame { open, children: vec![] });
            }
            Event::End(_) => self.close(),
            Event::Text(text) => self.push_text(&text),
            Event::Code(code) => self.push_node(Node::InlineCode { value: code.to_string() }),
            Event::Html(html) | Event::InlineHtml(html) => {
                if matches!(self.top().open, Open::Html) {
                    self.push_text(&html);
                } else {
                    self.push_node(Node::Html { value: html.to_string() });
                }
            }
            Event::FootnoteReference(label) => {
                self.push_node(Node::FootnoteReference { label: label.to_string() })
            }
            Event::SoftBreak => self.push_text("\n"),
            Event::HardBreak => self.push_node(Node::Break),
            Event::Rule => self.push_node(Node::ThematicBreak),
            Event::TaskListMarker(checked) => {
                let item = self.stack.iter_mut().rev().find_map(|frame| match frame.open {
                    Open::ListItem { checked: ref mut slot } => Some(slot),
                    _ => None,
                });

                if let Some(item) = item {
                    *item = Some(checked);
                }
            }
            #[allow(unreachable_patterns)]
            _ => {}
        }
    }

    fn top(&mut self) -> &mut Frame {
        let last = self.stack.len() - 1;
        &mut self.stack[last]
    }

    fn push_node(&mut self, node: Node) {
        self.top().children.push(node);
    }

    fn push_text(&mut self, text: &str) {
        let children = &mut self.top().children;
        match children.last_mut() {
            Some(Node::Text { value }) => value.push_str(text),
            _ => children.push(Node::text(text)),
        }
    }

    fn close(&mut self) {
        // The root frame is never closed by an event.
        if self.stack.len() <= 1 {
            return;
        }

        let Some(Frame { open, children }) = self.stack.pop() else { return };
        let node = match open {
            Open::Root => return,
            Open::Paragraph => Node::Paragraph { children },
            Open::Heading { depth, id, classes } => Node::Heading { depth, id, classes, children },
            Open::BlockQuote => Node::BlockQuote { children },
            Open::Code { lang } => Node::Code { lang, value: literal(&children) },
            Open::Html => Node::Html { value: literal(&children) },
            Open::Frontmatter { kind } => Node::Frontmatter { kind, value: literal(&children) },
            Open::List { start } => Node::List { ordered: start.is_some(), start, children },
            Open::ListItem { checked } => Node::ListItem { checked, children },
            Open::Table { align } => Node::Table { align, children },
            Open::TableRow { head } => Node::TableRow { head, children },
            Open::TableCell => Node::TableCell { children },
            Open::FootnoteDefinition { label } => Node::FootnoteDefinition { label, children },
            Open::Emphasis => Node::Emphasis { children },
            Open::Strong => Node::Strong { children },
            Open::Delete => Node::Delete { children },
            Open::Link { url, title } => Node::Link { url, title, children },
            Open::Image { url, title } => Node::Image { url, title, children },
            Open::Unknown => {
                self.top().children.extend(children);
                return;
            }
        };

        self.push_node(node);
    }

    fn finish(mut self) -> Root {
        while self.stack.len() > 1 {
            self.close();
        }

        Root { children: self.stack.pop().map(|f| f.children).unwrap_or_default() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_front_matter_blocks() {
        let root = Root::parse("---\ntitle: Hi\n---\n\n# Hello");
        match &root.children[0] {
            Node::Frontmatter { kind, value } => {
                assert_eq!(*kind, FrontmatterKind::Yaml);
                assert_eq!(value.trim(), "title: Hi");
            }
            other => panic!("unexpected node: {other:?}"),
        }

        let root = Root::parse("+++\ntitle = \"Hi\"\n+++\n\nbody");
        assert!(matches!(&root.children[0], Node::Frontmatter { kind: FrontmatterKind::Toml, .. }));
    }

    #[test]
    fn builds_nested_structure() {
        let root = Root::parse("# Title {#custom}\n\nSome *emph* and [a link](x.md \"T\").\n\n- [x] done\n- [ ] todo");
        match &root.children[0] {
            Node::Heading { depth, id, children, .. } => {
                assert_eq!(*depth, 1);
                assert_eq!(id.as_deref(), Some("custom"));
                assert_eq!(children[0].text_content().trim(), "Title");
            }
            other => panic!("unexpected node: {other:?}"),
        }

        let mut links = vec![];
        root.visit(|node| if let Node::Link { url, title, .. } = node {
            links.push((url.clone(), title.clone()));
        });
        assert_eq!(links, [("x.md".to_string(), Some("T".to_string()))]);

        let mut checks = vec![];
        root.visit(|node| if let Node::ListItem { checked, .. } = node {
            checks.push(*checked);
        });
        assert_eq!(checks, [Some(true), Some(false)]);
    }

    #[test]
    fn code_and_html_keep_literal_text() {
        let root = Root::parse("```rust,ignore\nfn main() {}\n```\n\n<div>raw</div>\n");
        assert_eq!(root.children[0], Node::Code {
            lang: Some("rust".into()),
            value: "fn main() {}\n".into(),
        });
        assert!(matches!(&root.children[1], Node::Html { value } if value.contains("<div>raw</div>")));
    }

    #[test]
    fn footnotes_and_tables() {
        let root = Root::parse("Text[^1].\n\n[^1]: Note.\n\n| a | b |\n|---|:-:|\n| 1 | 2 |\n");
        let mut refs = 0;
        let mut defs = 0;
        let mut heads = 0;
        root.visit(|node| match node {
            Node::FootnoteReference { label } if label == "1" => refs += 1,
            Node::FootnoteDefinition { label, .. } if label == "1" => defs += 1,
            Node::TableRow { head: true, .. } => heads += 1,
            _ => {}
        });

        assert_eq!((refs, defs, heads), (1, 1, 1));
    }
}
