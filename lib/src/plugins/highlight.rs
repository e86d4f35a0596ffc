use once_cell::sync::Lazy;
use serde::Deserialize;
use syntect::html::{ClassedHTMLGenerator, ClassStyle};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;

use crate::ctx::BuildCtx;
use crate::error::Result;
use crate::file::SourceFile;
use crate::plugin::{Hooks, HtmlPass, Transformer};
use crate::tree::hast::{self, Element};

static SYNTAX_SET: Lazy<SyntaxSet> = Lazy::new(SyntaxSet::load_defaults_newlines);

static DEFAULT_SYNTAX: Lazy<&'static SyntaxReference>
    = Lazy::new(|| SYNTAX_SET.find_syntax_plain_text());

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HighlightOptions {
    /// Render a line number gutter next to the code.
    pub line_numbers: bool,
}

impl Default for HighlightOptions {
    fn default() -> Self {
        HighlightOptions { line_numbers: false }
    }
}

/// Highlights `pre > code.language-*` blocks into class-annotated spans.
#[derive(Debug, Clone, Default)]
pub struct SyntaxHighlighting {
    options: HighlightOptions,
}

impl SyntaxHighlighting {
    pub const NAME: &'static str = "SyntaxHighlighting";

    pub fn new(options: HighlightOptions) -> Self {
        SyntaxHighlighting { options }
    }

    /// Loads the syntax definitions in the background.
    #[inline]
    pub fn warm_up() {
        rayon::spawn(|| { Lazy::force(&SYNTAX_SET); });
        rayon::spawn(|| { Lazy::force(&DEFAULT_SYNTAX); });
    }
}

fn html_generator(syntax: &SyntaxReference) -> ClassedHTMLGenerator<'_> {
    ClassedHTMLGenerator::new_with_class_style(syntax, &SYNTAX_SET, ClassStyle::Spaced)
}

#[allow(unused_must_use)]
fn code_div(lines: usize, code: &str) -> String {
    use std::fmt::Write;

    let mut div = String::new();
    write!(&mut div, "<div class=\"code\" style=\"display: flex;\">");

    write!(&mut div, "<pre class=\"line-nums\">");
    for i in 1..=lines {
        if i < lines { write!(&mut div, "{}\n", i); }
        else { write!(&mut div, "{}", i); }
    }
    write!(&mut div, "</pre>");

    write!(&mut div, "<pre class=\"code\">{}</pre>", code);
    write!(&mut div, "</div>");

    div
}

/// The language of a `pre` holding a single `code.language-*`.
fn code_language(pre: &Element) -> Option<String> {
    if !pre.is("pre") || pre.children.len() != 1 {
        return None;
    }

    let code = pre.children[0].as_element().filter(|c| c.is("code"))?;
    code.classes()
        .find_map(|c| c.strip_prefix("language-"))
        .map(|lang| lang.to_string())
}

pub fn highlight(lang: &str, code: &str) -> Result<String> {
    let syntax = SYNTAX_SET.find_syntax_by_token(lang).unwrap_or(*DEFAULT_SYNTAX);
    let mut generator = html_generator(syntax);
    for line in LinesWithEndings::from(code) {
        generator.parse_html_for_line_which_includes_newline(line)
            .map_err(|e| error!("syntax highlighting failed", "language" => lang, e))?;
    }

    Ok(generator.finalize())
}

fn highlight_all(nodes: &mut [hast::Node], line_numbers: bool) -> Result<()> {
    for node in nodes {
        let hast::Node::Element(pre) = node else { continue };
        let Some(lang) = code_language(pre) else {
            highlight_all(&mut pre.children, line_numbers)?;
            continue;
        };

        let source = pre.text_content();
        let html = highlight(&lang, &source)?;
        if line_numbers {
            let lines = memchr::memchr_iter(b'\n', source.as_bytes()).count().max(1);
            *node = hast::Node::raw(code_div(lines, &html));
        } else {
            let code = Element::new("code")
                .with("class", format!("language-{lang}"))
                .with("data-language", lang)
                .child(hast::Node::raw(html));

            pre.children = vec![code.into()];
        }
    }

    Ok(())
}

impl Transformer for SyntaxHighlighting {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn hooks(&self) -> Hooks {
        Hooks::HTML
    }

    fn html_plugins(&self, _: &BuildCtx) -> Result<Vec<HtmlPass>> {
        let line_numbers = self.options.line_numbers;
        let pass: HtmlPass = Box::new(move |tree: &mut hast::Root, _: &mut SourceFile| {
            highlight_all(&mut tree.children, line_numbers)
        });

        Ok(vec![pass])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{mdast, to_hast, ConvertOptions};

    fn html(markdown: &str, line_numbers: bool) -> String {
        let mut tree = to_hast(mdast::Root::parse(markdown), &ConvertOptions::default());
        highlight_all(&mut tree.children, line_numbers).unwrap();
        tree.to_html()
    }

    #[test]
    fn highlights_known_languages() {
        let out = html("```rust\nfn main() {}\n```", false);
        assert!(out.starts_with("<pre><code class=\"language-rust\" data-language=\"rust\">"));
        assert!(out.contains("<span class=\"source rust\">"));
        assert!(out.contains("main"));
    }

    #[test]
    fn unknown_languages_fall_back_to_plain_text() {
        let out = html("```nonsense\na < b\n```", false);
        assert!(out.contains("a &lt; b"));
    }

    #[test]
    fn untagged_code_is_left_alone() {
        assert_eq!(html("    plain\n", false), "<pre><code>plain\n</code></pre>");
    }

    #[test]
    fn line_number_gutter() {
        let out = html("- item\n\n  ```rust\n  let a = 1;\n  let b = 2;\n  ```\n", true);
        assert!(out.contains("<pre class=\"line-nums\">1\n2</pre>"));
    }
}
