use std::sync::Arc;

use crate::ctx::BuildCtx;
use crate::error::{Chainable, Result};
use crate::file::SourceFile;
use crate::plugin::{HtmlPass, MarkdownPass, Transformer};
use crate::tree::hast::{self, Element, Node};
use crate::tree::{mdast, to_hast, ConvertOptions};

pub const EXTERNAL_LINK_TARGET: &str = "_blank";
pub const EXTERNAL_LINK_REL: &str = "noopener noreferrer nofollow";

const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";
const EXTERNAL_LINK_ICON_VIEWBOX: &str = "0 0 512 512";
const EXTERNAL_LINK_ICON_PATH: &str = "M320 0c-17.7 0-32 14.3-32 32s14.3 32 32 32h82.7L201.4 265.4c-12.5 12.5-12.5 32.8 0 45.3s32.8 12.5 45.3 0L448 109.3V192c0 17.7 14.3 32 32 32s32-14.3 32-32V32c0-17.7-14.3-32-32-32H320zM80 32C35.8 32 0 67.8 0 112V432c0 44.2 35.8 80 80 80H400c44.2 0 80-35.8 80-80V320c0-17.7-14.3-32-32-32s-32 14.3-32 32V432c0 8.8-7.2 16-16 16H80c-8.8 0-16-7.2-16-16V112c0-8.8 7.2-16 16-16H192c17.7 0 32-14.3 32-32s-14.3-32-32-32H80z";

/// A composed transform pipeline for one execution context.
///
/// Stages, in order: text transforms (applied by the caller before parsing),
/// markdown passes, the fixed structural conversion, external link
/// decoration, and HTML passes. Within a phase, passes run in configured
/// transformer order.
#[derive(derive_more::Debug)]
pub struct Processor {
    ctx: BuildCtx,
    #[debug(ignore)]
    text: Vec<Arc<dyn Transformer>>,
    #[debug(ignore)]
    markdown: Vec<MarkdownPass>,
    #[debug(ignore)]
    html: Vec<HtmlPass>,
    convert: ConvertOptions,
}

impl Processor {
    /// Instantiates the configured transformers and collects their passes.
    ///
    /// Transformers are consulted only for the phases they declare. Any
    /// failure here is a composition error for the whole context.
    pub fn new(ctx: &BuildCtx) -> Result<Self> {
        let mut text = vec![];
        let mut markdown = vec![];
        let mut html = vec![];

        for spec in &ctx.cfg.plugins.transformers {
            let plugin = ctx.registry.instantiate(spec).chain_with(|| error! {
                "failed to build content pipeline",
                "transformer" => &spec.name,
            })?;

            let hooks = plugin.hooks();
            if hooks.text {
                text.push(plugin.clone());
            }

            if hooks.markdown {
                let passes = plugin.markdown_plugins(ctx).chain_with(|| error! {
                    "transformer failed to build markdown passes",
                    "transformer" => plugin.name(),
                })?;

                markdown.extend(passes);
            }

            if hooks.html {
                let passes = plugin.html_plugins(ctx).chain_with(|| error! {
                    "transformer failed to build html passes",
                    "transformer" => plugin.name(),
                })?;

                html.extend(passes);
            }
        }

        let convert = ConvertOptions {
            footnote_label: ctx.cfg.configuration.footnote_label.clone(),
        };

        Ok(Processor { ctx: ctx.clone(), text, markdown, html, convert })
    }

    pub fn ctx(&self) -> &BuildCtx {
        &self.ctx
    }

    /// Applies every text transform, in order.
    pub fn transform_text(&self, mut text: String) -> Result<String> {
        for plugin in &self.text {
            text = plugin.text_transform(&self.ctx, text).chain_with(|| error! {
                "text transform failed",
                "transformer" => plugin.name(),
            })?;
        }

        Ok(text)
    }

    /// Parses `text` with the base grammar only.
    pub fn parse(&self, text: &str) -> mdast::Root {
        mdast::Root::parse(text)
    }

    /// Runs the tree stages of the pipeline over `tree` against `file`.
    pub fn run(&self, mut tree: mdast::Root, file: &mut SourceFile) -> Result<hast::Root> {
        for pass in &self.markdown {
            pass(&mut tree, file)?;
        }

        let mut tree = to_hast(tree, &self.convert);
        decorate_external_links(&mut tree);

        for pass in &self.html {
            pass(&mut tree, file)?;
        }

        Ok(tree)
    }
}

pub fn is_external(href: &str) -> bool {
    let scheme = href.split_once("://").map(|(scheme, _)| scheme);
    matches!(scheme, Some(s) if s.eq_ignore_ascii_case("http") || s.eq_ignore_ascii_case("https"))
}

fn external_link_icon() -> Element {
    let path = Element::new("path").with("d", EXTERNAL_LINK_ICON_PATH);
    Element::new("svg")
        .with("xmlns", SVG_NAMESPACE)
        .with("height", "0.8rem")
        .with("width", "0.8rem")
        .with("viewBox", EXTERNAL_LINK_ICON_VIEWBOX)
        .with("fill", "currentColor")
        .child(path)
}

fn is_external_link_icon(node: &Node) -> bool {
    node.as_element().is_some_and(|e| {
        e.is("svg")
            && e.get("viewBox") == Some(EXTERNAL_LINK_ICON_VIEWBOX)
            && e.children.first()
                .and_then(|c| c.as_element())
                .is_some_and(|p| p.get("d") == Some(EXTERNAL_LINK_ICON_PATH))
    })
}

/// Opens absolute `http(s)` links in a new tab and marks them with an icon.
pub fn decorate_external_links(tree: &mut hast::Root) {
    tree.visit_elements_mut(|e| {
        if !e.is("a") || !e.get("href").is_some_and(is_external) {
            return;
        }

        e.set("target", EXTERNAL_LINK_TARGET);
        e.set("rel", EXTERNAL_LINK_REL);
        if !e.children.last().is_some_and(is_external_link_icon) {
            e.children.push(external_link_icon().into());
        }
    });
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::config::{Config, PluginSpec};
    use crate::ctx::Argv;
    use crate::plugin::{Hooks, Registry};
    use crate::util::SlugSet;

    struct Shout;

    impl Transformer for Shout {
        fn name(&self) -> &str { "Shout" }
        fn hooks(&self) -> Hooks { Hooks::TEXT }
        fn text_transform(&self, _: &BuildCtx, text: String) -> Result<String> {
            Ok(text.to_uppercase())
        }
    }

    static TREE_CALLS: AtomicUsize = AtomicUsize::new(0);

    /// Declares only the HTML phase but would count any markdown call.
    struct HtmlOnly;

    impl Transformer for HtmlOnly {
        fn name(&self) -> &str { "HtmlOnly" }
        fn hooks(&self) -> Hooks { Hooks::HTML }

        fn markdown_plugins(&self, _: &BuildCtx) -> Result<Vec<MarkdownPass>> {
            TREE_CALLS.fetch_add(1, Ordering::SeqCst);
            Ok(vec![])
        }

        fn html_plugins(&self, _: &BuildCtx) -> Result<Vec<HtmlPass>> {
            let pass: HtmlPass = Box::new(|tree: &mut hast::Root, _: &mut SourceFile| {
                tree.children.push(hast::Node::text("!"));
                Ok(())
            });

            Ok(vec![pass])
        }
    }

    fn ctx(names: &[&str]) -> BuildCtx {
        let mut registry = Registry::new();
        registry.register("Shout", |_| Ok(Arc::new(Shout)));
        registry.register("HtmlOnly", |_| Ok(Arc::new(HtmlOnly)));

        let cfg = Config::default().with_transformers(names.iter().copied().map(PluginSpec::new));
        BuildCtx::new(cfg, Argv::new("content"), SlugSet::default()).with_registry(registry)
    }

    #[test]
    fn phases_follow_declared_hooks() {
        let processor = Processor::new(&ctx(&["Shout", "HtmlOnly"])).unwrap();
        let text = processor.transform_text("hello".into()).unwrap();
        assert_eq!(text, "HELLO");

        let mut file = SourceFile::new("a.md", text.clone());
        let tree = processor.run(processor.parse(&text), &mut file).unwrap();
        assert_eq!(tree.to_html(), "<p>HELLO</p>!");
        assert_eq!(TREE_CALLS.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unknown_transformers_fail_composition() {
        let error = Processor::new(&ctx(&["Shout", "Nope"])).unwrap_err();
        assert_eq!(error.message(), "failed to build content pipeline");
    }

    #[test]
    fn external_links_are_decorated() {
        let processor = Processor::new(&ctx(&[])).unwrap();
        let text = "[out](https://example.com) [in](notes/a) [mail](mailto:a@b.c)";
        let mut file = SourceFile::new("a.md", text);
        let html = processor.run(processor.parse(text), &mut file).unwrap().to_html();

        assert!(html.contains("<a href=\"https://example.com\" rel=\"noopener noreferrer nofollow\" target=\"_blank\">out<svg"));
        assert!(html.contains(
            "<svg fill=\"currentColor\" height=\"0.8rem\" viewBox=\"0 0 512 512\" \
             width=\"0.8rem\" xmlns=\"http://www.w3.org/2000/svg\"><path d=\"M320 0c"
        ));

        let tree = processor.parse(text);
        let mut file = SourceFile::new("a.md", text);
        let mut tree = processor.run(tree, &mut file).unwrap();
        decorate_external_links(&mut tree);
        assert_eq!(tree.to_html().matches("<svg").count(), 1);
        assert!(html.contains("<a href=\"notes/a\">in</a>"));
        assert!(html.contains("<a href=\"mailto:a@b.c\">mail</a>"));
    }
}
