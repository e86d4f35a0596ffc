use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::ctx::BuildCtx;
use crate::error::Result;
use crate::file::{SourceFile, Toc};
use crate::plugin::{Hooks, MarkdownPass, Transformer};
use crate::tree::mdast;
use crate::util::Slugger;
use crate::value::{Dict, Value};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TocOptions {
    /// Deepest heading level included.
    pub max_depth: u8,
    /// Fewer entries than this and no table is recorded.
    pub min_entries: usize,
}

impl Default for TocOptions {
    fn default() -> Self {
        TocOptions { max_depth: 3, min_entries: 1 }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Entry {
    /// Depth relative to the shallowest heading in the document.
    pub depth: u8,
    pub text: String,
    pub slug: String,
}

/// Records the document's headings in `data.toc`.
#[derive(Debug, Clone, Default)]
pub struct TableOfContents {
    options: TocOptions,
}

impl TableOfContents {
    pub const NAME: &'static str = "TableOfContents";

    pub fn new(options: TocOptions) -> Self {
        TableOfContents { options }
    }
}

/// Collects headings up to `max_depth`. Slugs match the ids `HeadingIds`
/// assigns: explicit ids are kept, every other heading draws from one
/// slugger in document order.
pub fn entries(tree: &mdast::Root, max_depth: u8) -> Vec<Entry> {
    let mut slugger = Slugger::default();
    let mut entries = vec![];
    tree.visit(|node| {
        if let mdast::Node::Heading { depth, id, children, .. } = node {
            let text = children.iter().map(|c| c.text_content()).collect::<String>();
            let text = text.trim().to_string();
            let slug = match id {
                Some(id) => id.clone(),
                None => slugger.slug(&text),
            };

            if *depth <= max_depth {
                entries.push(Entry { depth: *depth, text, slug });
            }
        }
    });

    if let Some(highest) = entries.iter().map(|e| e.depth).min() {
        entries.iter_mut().for_each(|e| e.depth -= highest);
    }

    entries
}

fn record(options: &TocOptions, tree: &mdast::Root, file: &mut SourceFile) -> Result<()> {
    let disabled = file.data.frontmatter("enableToc").and_then(|v| v.to_bool()) == Some(false);
    if disabled {
        return Ok(());
    }

    let entries = entries(tree, options.max_depth);
    if entries.is_empty() || entries.len() < options.min_entries {
        return Ok(());
    }

    let toc = entries.iter().map(Value::from).collect::<Vec<_>>();
    file.data.insert(Toc, Arc::new(toc));
    Ok(())
}

impl Transformer for TableOfContents {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn hooks(&self) -> Hooks {
        Hooks::MARKDOWN
    }

    fn markdown_plugins(&self, _: &BuildCtx) -> Result<Vec<MarkdownPass>> {
        let options = self.options.clone();
        let pass: MarkdownPass = Box::new(move |tree: &mut mdast::Root, file: &mut SourceFile| {
            record(&options, tree, file)
        });

        Ok(vec![pass])
    }
}

impl From<&Entry> for Value {
    fn from(value: &Entry) -> Self {
        let dict: Dict = crate::dict![
            "depth" => value.depth,
            "text" => value.text.as_str(),
            "slug" => value.slug.as_str(),
        ];

        Value::from(dict)
    }
}
