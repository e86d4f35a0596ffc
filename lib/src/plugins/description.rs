use std::sync::Arc;

use serde::Deserialize;

use crate::ctx::BuildCtx;
use crate::error::Result;
use crate::file::{self, SourceFile, Text};
use crate::plugin::{Hooks, HtmlPass, Transformer};
use crate::tree::hast;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DescriptionOptions {
    /// Longest generated description, in characters, before the ellipsis.
    pub description_length: usize,
}

impl Default for DescriptionOptions {
    fn default() -> Self {
        DescriptionOptions { description_length: 150 }
    }
}

/// Sets `data.description` and `data.text` from the rendered document.
#[derive(Debug, Clone, Default)]
pub struct Description {
    options: DescriptionOptions,
}

impl Description {
    pub const NAME: &'static str = "Description";

    pub fn new(options: DescriptionOptions) -> Self {
        Description { options }
    }
}

const BLOCK_TAGS: &[&str] = &[
    "p", "h1", "h2", "h3", "h4", "h5", "h6", "li", "blockquote", "pre",
    "table", "tr", "td", "th", "section", "div", "br", "hr",
];

/// Text content with block boundaries kept as spaces.
fn plain_text(nodes: &[hast::Node], out: &mut String) {
    for node in nodes {
        match node {
            hast::Node::Text { value } => out.push_str(value),
            hast::Node::Element(e) => {
                plain_text(&e.children, out);
                if BLOCK_TAGS.contains(&e.tag.as_str()) {
                    out.push(' ');
                }
            }
            hast::Node::Raw { .. } => {}
        }
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cuts `text` to at most `max` characters at a word boundary, adding `...`
/// when anything was cut.
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }

    let mut out = String::new();
    for word in text.split(' ') {
        let len = out.chars().count() + word.chars().count() + usize::from(!out.is_empty());
        if len > max {
            break;
        }

        if !out.is_empty() {
            out.push(' ');
        }

        out.push_str(word);
    }

    // A single word longer than `max`.
    if out.is_empty() {
        out = text.chars().take(max).collect();
    }

    let trimmed = out.trim_end_matches(|c: char| c.is_ascii_punctuation()).len();
    out.truncate(trimmed);
    out.push_str("...");
    out
}

fn describe(options: &DescriptionOptions, tree: &hast::Root, file: &mut SourceFile) {
    let mut text = String::new();
    plain_text(&tree.children, &mut text);
    let text = collapse_whitespace(&text);
    let description = file.data.frontmatter("description")
        .and_then(|v| v.as_str())
        .map(collapse_whitespace)
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| truncate(&text, options.description_length));

    file.data.insert(file::Description, Arc::<str>::from(description));
    file.data.insert(Text, Arc::<str>::from(text));
}

impl Transformer for Description {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn hooks(&self) -> Hooks {
        Hooks::HTML
    }

    fn html_plugins(&self, _: &BuildCtx) -> Result<Vec<HtmlPass>> {
        let options = self.options.clone();
        let pass: HtmlPass = Box::new(move |tree: &mut hast::Root, file: &mut SourceFile| {
            describe(&options, tree, file);
            Ok(())
        });

        Ok(vec![pass])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::Frontmatter;
    use crate::tree::{mdast, to_hast, ConvertOptions};

    fn run(markdown: &str, file: &mut SourceFile, length: usize) {
        let tree = to_hast(mdast::Root::parse(markdown), &ConvertOptions::default());
        describe(&DescriptionOptions { description_length: length }, &tree, file);
    }

    #[test]
    fn truncates_at_word_boundaries() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("one two three four", 10), "one two...");
        assert_eq!(truncate("one two, three", 8), "one two...");
        assert_eq!(truncate("abcdefghijkl", 5), "abcde...");
    }

    #[test]
    fn describes_from_text() {
        let mut file = SourceFile::new("a.md", "");
        run("# Title\n\nSome *body* text\nacross lines.", &mut file, 150);

        let text = file.data.get(Text).unwrap().unwrap();
        assert_eq!(&*text, "Title Some body text across lines.");

        let description = file.data.get(file::Description).unwrap().unwrap();
        assert_eq!(&*description, "Title Some body text across lines.");
    }

    #[test]
    fn front_matter_wins() {
        let mut file = SourceFile::new("a.md", "");
        let fm = crate::dict! { "description" => "Given  here." };
        file.data.insert(Frontmatter, Arc::new(fm));
        run("Body text that is long enough.", &mut file, 4);

        let description = file.data.get(file::Description).unwrap().unwrap();
        assert_eq!(&*description, "Given here.");
        assert_eq!(&*file.data.get(Text).unwrap().unwrap(), "Body text that is long enough.");
    }
}
