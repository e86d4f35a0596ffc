use std::fmt;
use std::ops::BitOr;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::ctx::BuildCtx;
use crate::config::PluginSpec;
use crate::error::Result;
use crate::file::SourceFile;
use crate::tree::{hast, mdast};

/// A tree operation run against one file.
pub type Pass<T> = Box<dyn Fn(&mut T, &mut SourceFile) -> Result<()> + Send + Sync>;

/// Runs on the markdown tree, before conversion.
pub type MarkdownPass = Pass<mdast::Root>;

/// Runs on the HTML tree, after conversion.
pub type HtmlPass = Pass<hast::Root>;

/// The phases a transformer takes part in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Hooks {
    pub text: bool,
    pub markdown: bool,
    pub html: bool,
}

impl Hooks {
    pub const NONE: Hooks = Hooks { text: false, markdown: false, html: false };
    pub const TEXT: Hooks = Hooks { text: true, ..Hooks::NONE };
    pub const MARKDOWN: Hooks = Hooks { markdown: true, ..Hooks::NONE };
    pub const HTML: Hooks = Hooks { html: true, ..Hooks::NONE };

    pub fn contains(self, other: Hooks) -> bool {
        (self | other) == self
    }
}

impl BitOr for Hooks {
    type Output = Hooks;

    fn bitor(self, rhs: Hooks) -> Hooks {
        Hooks {
            text: self.text || rhs.text,
            markdown: self.markdown || rhs.markdown,
            html: self.html || rhs.html,
        }
    }
}

/// A content transformer.
///
/// A transformer declares the phases it takes part in through [`hooks()`].
/// Only the hook methods of declared phases are ever called; the rest keep
/// their no-op defaults.
///
/// [`hooks()`]: Transformer::hooks
pub trait Transformer: Send + Sync {
    fn name(&self) -> &str;

    fn hooks(&self) -> Hooks;

    /// Rewrites a file's text before it is parsed.
    fn text_transform(&self, _ctx: &BuildCtx, text: String) -> Result<String> {
        Ok(text)
    }

    /// Builds the passes run on the markdown tree. Called once per pipeline.
    fn markdown_plugins(&self, _ctx: &BuildCtx) -> Result<Vec<MarkdownPass>> {
        Ok(vec![])
    }

    /// Builds the passes run on the HTML tree. Called once per pipeline.
    fn html_plugins(&self, _ctx: &BuildCtx) -> Result<Vec<HtmlPass>> {
        Ok(vec![])
    }
}

pub type Factory = Box<dyn Fn(&PluginSpec) -> Result<Arc<dyn Transformer>> + Send + Sync>;

/// Maps transformer names to the code that instantiates them.
///
/// Every execution context shares the registry. What travels to a worker is
/// only the list of [`PluginSpec`]s naming entries in it.
#[derive(Default)]
pub struct Registry {
    factories: FxHashMap<Arc<str>, Factory>,
}

impl Registry {
    pub fn new() -> Self {
        Registry::default()
    }

    /// A registry holding every built-in transformer.
    pub fn builtin() -> Self {
        let mut registry = Registry::new();
        crate::plugins::register_builtins(&mut registry);
        registry
    }

    /// Registers `factory` under `name`, replacing any existing entry.
    pub fn register<N, F>(&mut self, name: N, factory: F) -> &mut Self
        where N: Into<Arc<str>>,
              F: Fn(&PluginSpec) -> Result<Arc<dyn Transformer>> + Send + Sync + 'static
    {
        self.factories.insert(name.into(), Box::new(factory));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.factories.keys().map(|k| &**k)
    }

    pub fn instantiate(&self, spec: &PluginSpec) -> Result<Arc<dyn Transformer>> {
        match self.factories.get(&*spec.name) {
            Some(factory) => factory(spec),
            None => err! {
                "unknown transformer",
                "name" => &spec.name,
                "hint" => "register it with `Registry::register()`",
            }
        }
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.names().collect();
        names.sort_unstable();
        f.debug_struct("Registry").field("factories", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;

    impl Transformer for Noop {
        fn name(&self) -> &str { "Noop" }
        fn hooks(&self) -> Hooks { Hooks::NONE }
    }

    #[test]
    fn hooks_combine() {
        let hooks = Hooks::TEXT | Hooks::HTML;
        assert!(hooks.contains(Hooks::TEXT));
        assert!(hooks.contains(Hooks::HTML));
        assert!(!hooks.contains(Hooks::MARKDOWN));
        assert!(hooks.contains(Hooks::NONE));
    }

    #[test]
    fn registry_instantiates_by_name() {
        let mut registry = Registry::new();
        registry.register("Noop", |_| Ok(Arc::new(Noop)));

        let plugin = registry.instantiate(&PluginSpec::new("Noop")).unwrap();
        assert_eq!(plugin.name(), "Noop");

        let error = registry.instantiate(&PluginSpec::new("Missing")).err().unwrap();
        assert!(error.to_string().contains("Missing"));
    }

    #[test]
    fn builtins_are_registered() {
        let registry = Registry::builtin();
        for name in crate::config::Config::default().transformer_names() {
            assert!(registry.contains(name), "{name} missing");
        }
    }
}
