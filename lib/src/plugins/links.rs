use std::sync::Arc;

use serde::Deserialize;

use crate::ctx::BuildCtx;
use crate::error::Result;
use crate::file::{Links, SourceFile};
use crate::plugin::{Hooks, HtmlPass, Transformer};
use crate::tree::hast;
use crate::util::{self, FullSlug, SlugSet};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    /// Targets are paths from the content root.
    #[default]
    Absolute,
    /// Targets are paths relative to the linking file.
    Relative,
    /// A bare file name resolves to the one file with that name, if unique.
    Shortest,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LinkOptions {
    pub markdown_link_resolution: Resolution,
    /// Rewrite `src` of embedded media the same way as link targets.
    pub rewrite_media: bool,
}

impl Default for LinkOptions {
    fn default() -> Self {
        LinkOptions { markdown_link_resolution: Resolution::Absolute, rewrite_media: true }
    }
}

/// Classifies and resolves links, and records each file's outgoing links.
#[derive(Debug, Clone, Default)]
pub struct CrawlLinks {
    options: LinkOptions,
}

impl CrawlLinks {
    pub const NAME: &'static str = "CrawlLinks";

    pub fn new(options: LinkOptions) -> Self {
        CrawlLinks { options }
    }
}

/// Splits `href` into its path and its `#fragment`, if any.
fn split_anchor(href: &str) -> (&str, Option<&str>) {
    match href.split_once('#') {
        Some((path, anchor)) => (path, Some(anchor)),
        None => (href, None),
    }
}

/// Whether `href` starts with a URL scheme such as `https:`, `mailto:` or
/// `tel:`. Single letters are drive letters, not schemes.
fn has_scheme(href: &str) -> bool {
    let Some((scheme, _)) = href.split_once(':') else { return false };
    let mut chars = scheme.chars();
    scheme.len() > 1
        && chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

fn decode_spaces(path: &str) -> String {
    path.replace("%20", " ")
}

/// Resolves an internal link target written in `current` to a full slug.
pub fn resolve(
    resolution: Resolution,
    current: &str,
    target: &str,
    all_slugs: &SlugSet,
) -> FullSlug {
    let target = decode_spaces(target);
    let absolute = |path: &str| -> FullSlug {
        let normalized = util::normalize_segments(path);
        let mut slug = util::slugify_file_path(&normalized).to_string();
        if normalized.is_empty() || path.ends_with('/') {
            slug = util::join_segments([slug.as_str(), "index"]);
        }

        FullSlug::from(slug)
    };

    match resolution {
        Resolution::Absolute => absolute(&target),
        Resolution::Relative => {
            let dir = FullSlug::from(current).dir().to_string();
            absolute(&util::join_segments([dir.as_str(), target.as_str()]))
        }
        Resolution::Shortest => {
            let candidate = absolute(&target);
            if candidate.contains('/') {
                return candidate;
            }

            let mut matches = all_slugs.iter().filter(|s| s.file_name() == candidate.as_str());
            match (matches.next(), matches.next()) {
                (Some(unique), None) => unique.clone(),
                _ => candidate,
            }
        }
    }
}

fn crawl(options: &LinkOptions, all_slugs: &SlugSet, tree: &mut hast::Root, file: &mut SourceFile) {
    let current = file.slug().to_string();
    let mut outgoing: Vec<Arc<str>> = vec![];
    tree.visit_elements_mut(|e| {
        if e.is("a") {
            let Some(href) = e.get("href").map(|s| s.to_string()) else { return };
            if has_scheme(&href) {
                e.add_class("external");
                return;
            }

            e.add_class("internal");
            if href.starts_with('#') {
                return;
            }

            let (path, anchor) = split_anchor(&href);
            let target = resolve(options.markdown_link_resolution, &current, path, all_slugs);
            if !all_slugs.contains(target.as_str()) {
                e.add_class("broken");
            }

            let mut rewritten = util::resolve_relative(&current, &target);
            if let Some(anchor) = anchor {
                rewritten.push('#');
                rewritten.push_str(anchor);
            }

            e.set("href", rewritten);
            e.set("data-slug", target.as_str());
            if !outgoing.iter().any(|l| **l == *target) {
                outgoing.push(target.into());
            }
        } else if options.rewrite_media && ["img", "video", "audio", "iframe"].iter().any(|t| e.is(t)) {
            let Some(src) = e.get("src").map(|s| s.to_string()) else { return };
            if has_scheme(&src) || src.starts_with('/') {
                return;
            }

            let target = resolve(options.markdown_link_resolution, &current, &src, all_slugs);
            e.set("src", util::resolve_relative(&current, &target));
        }
    });

    file.data.insert(Links, outgoing);
}

impl Transformer for CrawlLinks {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn hooks(&self) -> Hooks {
        Hooks::HTML
    }

    fn html_plugins(&self, ctx: &BuildCtx) -> Result<Vec<HtmlPass>> {
        let options = self.options.clone();
        let all_slugs = ctx.all_slugs.clone();
        let pass: HtmlPass = Box::new(move |tree: &mut hast::Root, file: &mut SourceFile| {
            crawl(&options, &all_slugs, tree, file);
            Ok(())
        });

        Ok(vec![pass])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::Slug;
    use crate::tree::{mdast, to_hast, ConvertOptions};

    fn slugs() -> SlugSet {
        ["index", "notes/a", "notes/deep/b", "other/c", "img/cat.png"]
            .into_iter()
            .map(FullSlug::from)
            .collect()
    }

    fn crawl_md(resolution: Resolution, slug: &str, markdown: &str) -> (String, Vec<Arc<str>>) {
        let mut tree = to_hast(mdast::Root::parse(markdown), &ConvertOptions::default());
        let mut file = SourceFile::new(format!("{slug}.md"), markdown);
        file.data.insert(Slug, slug);

        let options = LinkOptions { markdown_link_resolution: resolution, rewrite_media: true };
        crawl(&options, &slugs(), &mut tree, &mut file);
        (tree.to_html(), file.data.get(Links).unwrap().unwrap())
    }

    #[test]
    fn resolves_targets() {
        let all = slugs();
        assert_eq!(&*resolve(Resolution::Absolute, "x", "notes/a.md", &all), "notes/a");
        assert_eq!(&*resolve(Resolution::Absolute, "x", "./notes/My%20Page", &all), "notes/My-Page");
        assert_eq!(&*resolve(Resolution::Absolute, "x", "notes/", &all), "notes/index");
        assert_eq!(&*resolve(Resolution::Relative, "notes/a", "deep/b", &all), "notes/deep/b");
        assert_eq!(&*resolve(Resolution::Relative, "notes/deep/b", "../a", &all), "notes/a");
        assert_eq!(&*resolve(Resolution::Shortest, "other/c", "b", &all), "notes/deep/b");
        assert_eq!(&*resolve(Resolution::Shortest, "other/c", "missing", &all), "missing");
    }

    #[test]
    fn classifies_and_rewrites_links() {
        let markdown = "[a](notes/a) [b](b#Part) [x](https://x.org) [gone](nope) [top](#top) [again](notes/a.md)";
        let (html, links) = crawl_md(Resolution::Shortest, "other/c", markdown);

        assert!(html.contains("<a class=\"internal\" data-slug=\"notes/a\" href=\"../notes/a\">a</a>"));
        assert!(html.contains("href=\"../notes/deep/b#Part\""));
        assert!(html.contains("<a class=\"external\" href=\"https://x.org\">x</a>"));
        assert!(html.contains("<a class=\"internal broken\" data-slug=\"nope\" href=\"../nope\">gone</a>"));
        assert!(html.contains("<a class=\"internal\" href=\"#top\">top</a>"));

        let links: Vec<_> = links.iter().map(|l| &**l).collect();
        assert_eq!(links, ["notes/a", "notes/deep/b", "nope"]);
    }

    #[test]
    fn other_schemes_are_external() {
        let markdown = "[mail](mailto:me@x.org) [call](tel:+15550100) [feed](feed:x) [n](notes/a)";
        let (html, links) = crawl_md(Resolution::Absolute, "index", markdown);

        assert!(html.contains("<a class=\"external\" href=\"mailto:me@x.org\">mail</a>"));
        assert!(html.contains("<a class=\"external\" href=\"tel:+15550100\">call</a>"));
        assert!(html.contains("<a class=\"external\" href=\"feed:x\">feed</a>"));
        assert!(!html.contains("broken"));
        assert_eq!(links.iter().map(|l| &**l).collect::<Vec<_>>(), ["notes/a"]);

        assert!(has_scheme("https://x.org"));
        assert!(!has_scheme("C:/notes/a"));
        assert!(!has_scheme("notes/a#x:y"));
    }

    #[test]
    fn rewrites_media_sources() {
        let (html, links) = crawl_md(Resolution::Absolute, "notes/a", "![cat](img/cat.png)");
        assert!(html.contains("src=\"../img/cat.png\""));
        assert!(links.is_empty());
    }
}
