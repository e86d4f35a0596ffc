use serde::Deserialize;

use crate::ctx::BuildCtx;
use crate::error::Result;
use crate::file::SourceFile;
use crate::plugin::{Hooks, HtmlPass, Transformer};
use crate::tree::hast::{self, Element};
use crate::util::Slugger;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HeadingOptions {
    /// Append an empty `a.anchor` linking to the heading.
    pub anchor: bool,
}

/// Gives every heading without an id a unique, GitHub-style one.
#[derive(Debug, Clone, Default)]
pub struct HeadingIds {
    options: HeadingOptions,
}

impl HeadingIds {
    pub const NAME: &'static str = "HeadingIds";

    pub fn new(options: HeadingOptions) -> Self {
        HeadingIds { options }
    }
}

fn anchor(id: &str) -> Element {
    Element::new("a")
        .with("class", "anchor")
        .with("title", "anchor")
        .with("href", format!("#{id}"))
}

pub fn assign_ids(tree: &mut hast::Root, with_anchor: bool) {
    let mut slugger = Slugger::default();
    tree.visit_elements_mut(|e| {
        if e.heading_depth().is_none() {
            return;
        }

        let id = match e.get("id") {
            Some(id) => id.to_string(),
            None => {
                let id = slugger.slug(e.text_content().trim());
                e.set("id", id.clone());
                id
            }
        };

        let anchored = e.children.iter()
            .filter_map(|c| c.as_element())
            .any(|c| c.is("a") && c.has_class("anchor"));

        if with_anchor && !anchored {
            e.children.push(anchor(&id).into());
        }
    });
}

impl Transformer for HeadingIds {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn hooks(&self) -> Hooks {
        Hooks::HTML
    }

    fn html_plugins(&self, _: &BuildCtx) -> Result<Vec<HtmlPass>> {
        let with_anchor = self.options.anchor;
        let pass: HtmlPass = Box::new(move |tree: &mut hast::Root, _: &mut SourceFile| {
            assign_ids(tree, with_anchor);
            Ok(())
        });

        Ok(vec![pass])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{mdast, to_hast, ConvertOptions};

    fn html(markdown: &str, with_anchor: bool) -> String {
        let mut tree = to_hast(mdast::Root::parse(markdown), &ConvertOptions::default());
        assign_ids(&mut tree, with_anchor);
        tree.to_html()
    }

    #[test]
    fn ids_are_unique() {
        let out = html("# Hello World\n\n## Hello World\n\n### Kept {#kept}", false);
        assert!(out.contains("<h1 id=\"hello-world\">"));
        assert!(out.contains("<h2 id=\"hello-world-1\">"));
        assert!(out.contains("<h3 id=\"kept\">"));
    }

    #[test]
    fn optional_anchor() {
        let out = html("## Section", true);
        assert_eq!(out, "<h2 id=\"section\">Section<a class=\"anchor\" href=\"#section\" title=\"anchor\"></a></h2>");
    }
}
