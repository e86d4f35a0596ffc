//! The built-in transformers.
//!
//! Each is registered under its `NAME` by [`register_builtins()`] and
//! configured from the options table of its `[[plugins.transformers]]` entry.

mod dates;
mod description;
mod frontmatter;
mod headings;
mod highlight;
mod links;
mod toc;
mod wikilinks;

pub use dates::{CreatedModifiedDate, DateOptions, DateSource, format_date, get_date, parse_date};
pub use description::{Description, DescriptionOptions, truncate};
pub use frontmatter::FrontMatter;
pub use headings::{HeadingIds, HeadingOptions, assign_ids};
pub use highlight::{HighlightOptions, SyntaxHighlighting, highlight};
pub use links::{CrawlLinks, LinkOptions, Resolution, resolve};
pub use toc::{Entry as TocEntry, TableOfContents, TocOptions, entries as toc_entries};
pub use wikilinks::WikiLinks;

use std::sync::Arc;

use serde::de::{DeserializeOwned, IgnoredAny};

use crate::plugin::{Registry, Transformer};

fn register<T, O, F>(registry: &mut Registry, name: &'static str, make: F)
    where T: Transformer + 'static,
          O: DeserializeOwned,
          F: Fn(O) -> T + Send + Sync + 'static
{
    registry.register(name, move |spec| {
        let transformer: Arc<dyn Transformer> = Arc::new(make(spec.options()?));
        Ok(transformer)
    });
}

pub fn register_builtins(registry: &mut Registry) {
    register(registry, FrontMatter::NAME, |_: IgnoredAny| FrontMatter);
    register(registry, CreatedModifiedDate::NAME, CreatedModifiedDate::new);
    register(registry, WikiLinks::NAME, |_: IgnoredAny| WikiLinks);
    register(registry, TableOfContents::NAME, TableOfContents::new);
    register(registry, HeadingIds::NAME, HeadingIds::new);
    register(registry, SyntaxHighlighting::NAME, SyntaxHighlighting::new);
    register(registry, CrawlLinks::NAME, CrawlLinks::new);
    register(registry, Description::NAME, Description::new);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Plugins, PluginSpec};

    #[test]
    fn every_default_transformer_is_registered() {
        let registry = Registry::builtin();
        for spec in Plugins::default().transformers {
            let transformer = registry.instantiate(&spec).unwrap();
            assert_eq!(transformer.name(), &*spec.name);
        }
    }

    #[test]
    fn options_are_decoded() {
        let registry = Registry::builtin();
        let spec = PluginSpec::new(TableOfContents::NAME).with("max_depth", 2);
        assert!(registry.instantiate(&spec).is_ok());

        let spec = PluginSpec::new(TableOfContents::NAME).with("max_depth", "deep");
        let error = registry.instantiate(&spec).err().unwrap();
        assert!(error.to_string().contains("invalid transformer options"));

        let spec = PluginSpec::new(WikiLinks::NAME).with("anything", true);
        assert!(registry.instantiate(&spec).is_ok());
    }
}
