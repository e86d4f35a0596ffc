use std::path::Path;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Chainable, Result};
use crate::value::{Dict, Format, Toml, Value};

/// The global configuration of a build. Read-only for the duration of a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub configuration: GlobalConfiguration,
    pub plugins: Plugins,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalConfiguration {
    pub page_title: String,
    pub base_url: Option<String>,
    pub ignore_patterns: Vec<String>,
    pub default_date_type: Option<DateType>,
    pub footnote_label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateType {
    Created,
    Modified,
    Published,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Plugins {
    /// Applied in this order, per phase.
    pub transformers: Vec<PluginSpec>,
}

/// Names a transformer and carries its free-form options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginSpec {
    pub name: Arc<str>,
    #[serde(default)]
    pub options: Dict,
}

impl Config {
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        Toml::read(path).chain_with(|| error! {
            "failed to load configuration",
            "config file" => path.display(),
        })
    }

    pub fn with_transformers<I: IntoIterator<Item = PluginSpec>>(mut self, specs: I) -> Self {
        self.plugins.transformers = specs.into_iter().collect();
        self
    }

    pub fn transformer_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.plugins.transformers.iter().map(|spec| &*spec.name)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            configuration: GlobalConfiguration::default(),
            plugins: Plugins::default(),
        }
    }
}

impl Default for GlobalConfiguration {
    fn default() -> Self {
        GlobalConfiguration {
            page_title: "Quill".into(),
            base_url: None,
            ignore_patterns: vec!["private".into(), "templates".into(), ".obsidian".into()],
            default_date_type: Some(DateType::Created),
            footnote_label: "Footnotes".into(),
        }
    }
}

impl Default for Plugins {
    fn default() -> Self {
        use crate::plugins::*;

        let transformers = [
            FrontMatter::NAME,
            CreatedModifiedDate::NAME,
            WikiLinks::NAME,
            TableOfContents::NAME,
            HeadingIds::NAME,
            SyntaxHighlighting::NAME,
            CrawlLinks::NAME,
            Description::NAME,
        ];

        Plugins { transformers: transformers.into_iter().map(PluginSpec::new).collect() }
    }
}

impl PluginSpec {
    pub fn new<N: Into<Arc<str>>>(name: N) -> Self {
        PluginSpec { name: name.into(), options: Dict::new() }
    }

    pub fn with<K: Into<Arc<str>>, V: Into<Value>>(mut self, key: K, value: V) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Decodes the options into a plugin's typed options struct.
    pub fn options<T: DeserializeOwned>(&self) -> Result<T> {
        let value = serde_json::to_value(&self.options)?;
        serde_json::from_value(value).chain_with(|| error! {
            "invalid transformer options",
            "transformer" => &self.name,
        })
    }
}
