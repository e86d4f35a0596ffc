use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::plugin::Registry;
use crate::plugins::FrontMatter;
use crate::util::SlugSet;

/// Command-line-derived arguments of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Argv {
    /// The content root. Slugs are derived relative to it.
    pub directory: PathBuf,
    #[serde(default)]
    pub verbose: bool,
    /// Overrides the worker count heuristic when set.
    #[serde(default)]
    pub concurrency: Option<usize>,
}

impl Argv {
    pub fn new<P: Into<PathBuf>>(directory: P) -> Self {
        Argv { directory: directory.into(), verbose: false, concurrency: None }
    }
}

/// The immutable bundle every execution context builds its pipeline from.
///
/// Cloning is cheap: every part is reference counted. Nothing here is mutated
/// after construction; modes such as front-matter-only derive a new context.
#[derive(derive_more::Debug, Clone)]
pub struct BuildCtx {
    pub cfg: Arc<Config>,
    pub argv: Arc<Argv>,
    pub all_slugs: Arc<SlugSet>,
    #[debug(ignore)]
    pub registry: Arc<Registry>,
}

impl BuildCtx {
    pub fn new(cfg: Config, argv: Argv, all_slugs: SlugSet) -> Self {
        BuildCtx {
            cfg: Arc::new(cfg),
            argv: Arc::new(argv),
            all_slugs: Arc::new(all_slugs),
            registry: Arc::new(Registry::builtin()),
        }
    }

    pub fn with_registry(mut self, registry: Registry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    /// A view of `self` whose transformer list holds only the front matter
    /// extractor. `self` is left untouched.
    pub fn front_matter_only(&self) -> BuildCtx {
        let transformers = self.cfg.plugins.transformers.iter()
            .filter(|spec| &*spec.name == FrontMatter::NAME)
            .cloned();

        let cfg = (*self.cfg).clone().with_transformers(transformers);
        BuildCtx { cfg: Arc::new(cfg), ..self.clone() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static_assertions::assert_impl_all!(BuildCtx: Send, Sync);
    static_assertions::assert_impl_all!(Argv: Send, Sync);

    #[test]
    fn front_matter_only_derives_a_view() {
        let ctx = BuildCtx::new(Config::default(), Argv::new("content"), SlugSet::default());
        let fm = ctx.front_matter_only();

        let names: Vec<_> = fm.cfg.transformer_names().collect();
        assert_eq!(names, [FrontMatter::NAME]);
        assert!(ctx.cfg.plugins.transformers.len() > 1);
        assert!(Arc::ptr_eq(&ctx.all_slugs, &fm.all_slugs));
        assert!(Arc::ptr_eq(&ctx.registry, &fm.registry));
    }
}
