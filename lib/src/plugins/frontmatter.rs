use std::sync::Arc;

use crate::ctx::BuildCtx;
use crate::error::{Chainable, Result};
use crate::file::{Frontmatter, SourceFile};
use crate::plugin::{Hooks, MarkdownPass, Transformer};
use crate::tree::mdast::{self, FrontmatterKind};
use crate::util::slugify;
use crate::value::{Dict, Format, Toml, Value, Yaml};

/// Parses the YAML (`---`) or TOML (`+++`) block at the top of a document
/// into `data.frontmatter`.
#[derive(Debug, Default, Clone)]
pub struct FrontMatter;

impl FrontMatter {
    pub const NAME: &'static str = "FrontMatter";
}

fn parse(kind: FrontmatterKind, source: &str) -> Result<Dict> {
    if source.trim().is_empty() {
        return Ok(Dict::new());
    }

    let value: Value = match kind {
        FrontmatterKind::Yaml => Yaml::from_str(source)?,
        FrontmatterKind::Toml => Value::from(Toml::from_str::<toml::Value>(source)?),
    };

    match value {
        Value::Null => Ok(Dict::new()),
        Value::Dict(dict) => Ok(Arc::unwrap_or_clone(dict)),
        value => err! {
            "front matter must be a table of key/value pairs",
            "found" => value.kind(),
        }
    }
}

/// A string or a list of strings, as a list. Comma-separated strings split.
fn coerce_to_list(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => s.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        Value::Array(values) => values.iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Num(n) => Some(n.to_f64().to_string()),
                _ => None,
            })
            .filter(|s| !s.is_empty())
            .collect(),
        _ => vec![],
    }
}

/// `Project/Big Idea` becomes `project/big-idea`.
fn slug_tag(tag: &str) -> String {
    tag.split('/')
        .map(slugify)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

fn extract(tree: &mdast::Root, file: &mut SourceFile) -> Result<()> {
    let block = tree.children.iter().find_map(|node| match node {
        mdast::Node::Frontmatter { kind, value } => Some((*kind, value.as_str())),
        _ => None,
    });

    let mut frontmatter = match block {
        Some((kind, source)) => parse(kind, source).chain_with(|| error! {
            "invalid front matter",
            "file path" => file.path.display(),
        })?,
        None => Dict::new(),
    };

    let has_title = frontmatter.get("title")
        .and_then(|t| t.as_str())
        .is_some_and(|t| !t.trim().is_empty());

    if !has_title {
        frontmatter.insert("title".into(), file.stem().into());
    }

    let tags = frontmatter.get("tags").or_else(|| frontmatter.get("tag")).map(coerce_to_list);
    if let Some(tags) = tags {
        let mut tags: Vec<String> = tags.iter().map(|t| slug_tag(t)).collect();
        tags.dedup();
        frontmatter.remove("tag");
        frontmatter.insert("tags".into(), tags.into());
    }

    let aliases = frontmatter.get("aliases").or_else(|| frontmatter.get("alias")).map(coerce_to_list);
    if let Some(aliases) = aliases {
        frontmatter.remove("alias");
        frontmatter.insert("aliases".into(), aliases.into());
    }

    file.data.insert(Frontmatter, Arc::new(frontmatter));
    Ok(())
}

impl Transformer for FrontMatter {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn hooks(&self) -> Hooks {
        Hooks::MARKDOWN
    }

    fn markdown_plugins(&self, _: &BuildCtx) -> Result<Vec<MarkdownPass>> {
        let pass: MarkdownPass = Box::new(|tree: &mut mdast::Root, file: &mut SourceFile| {
            extract(tree, file)
        });

        Ok(vec![pass])
    }
}
