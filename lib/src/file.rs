use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::tree::hast;
use crate::value::{Dict, Value};

/// A typed key into a file's [`Data`] bag.
pub trait MetaKey: 'static {
    const KEY: &'static str;

    type Value: TryFrom<Value> + Into<Value> + fmt::Debug;
}

#[macro_export]
macro_rules! define_meta_key {
    ($($v:vis $T:ident : $key:literal => $V:ty),+ $(,)?) => {
        $(
            #[derive(Debug, Clone, Copy)]
            $v struct $T;

            impl $crate::file::MetaKey for $T {
                const KEY: &'static str = $key;
                type Value = $V;
            }
        )+
    }
}

define_meta_key! {
    pub Slug : "slug" => Arc<str>,
    pub FilePath : "file_path" => Arc<str>,
    pub Frontmatter : "frontmatter" => Arc<Dict>,
    pub Dates : "dates" => Arc<Dict>,
    pub Links : "links" => Vec<Arc<str>>,
    pub Toc : "toc" => Arc<Vec<Value>>,
    pub Description : "description" => Arc<str>,
    pub Text : "text" => Arc<str>,
}

/// The metadata bag each pipeline stage may read from and attach fields to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Data {
    map: Dict,
}

impl Data {
    pub fn new() -> Self {
        Data::default()
    }

    #[inline(always)]
    pub fn get_raw(&self, key: &str) -> Option<&Value> {
        self.map.get(key)
    }

    #[inline(always)]
    pub fn contains_key(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.map.keys().map(|k| &**k)
    }

    pub fn insert_raw<K, V>(&mut self, key: K, value: V) -> Option<Value>
        where K: Into<Arc<str>>, V: Into<Value>
    {
        self.map.insert(key.into(), value.into())
    }

    pub fn remove_raw(&mut self, key: &str) -> Option<Value> {
        self.map.remove(key)
    }

    /// Returns the value for `K`, or the raw value if it has the wrong type.
    #[inline]
    pub fn get<K: MetaKey>(&self, _: K) -> Option<Result<K::Value, Value>> {
        let value = self.get_raw(K::KEY)?.clone();
        Some(value.clone().try_into().map_err(|_| value))
    }

    #[inline(always)]
    pub fn contains<K: MetaKey>(&self, _: K) -> bool {
        self.contains_key(K::KEY)
    }

    pub fn insert<K, V>(&mut self, _: K, value: V) -> Option<Value>
        where K: MetaKey, V: Into<K::Value>
    {
        self.insert_raw(K::KEY, value.into().into())
    }

    pub fn remove<K: MetaKey>(&mut self, _: K) -> Option<Value> {
        self.remove_raw(K::KEY)
    }

    /// Looks up `key` inside the parsed front matter.
    pub fn frontmatter(&self, key: &str) -> Option<&Value> {
        self.get_raw(Frontmatter::KEY)?.get(key)
    }

    pub fn as_dict(&self) -> &Dict {
        &self.map
    }
}

impl fmt::Display for Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#?}", self.map)
    }
}

/// A source document: where it came from, its (progressively transformed)
/// text, and the metadata attached to it by pipeline stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceFile {
    pub path: PathBuf,
    pub value: String,
    pub data: Data,
}

impl SourceFile {
    pub fn new<P: Into<PathBuf>, S: Into<String>>(path: P, value: S) -> Self {
        SourceFile { path: path.into(), value: value.into(), data: Data::new() }
    }

    /// Reads the file at `path`.
    pub fn read<P: Into<PathBuf>>(path: P) -> Result<Self> {
        use crate::error::Chainable;

        let path = path.into();
        let bytes = std::fs::read(&path).chain_with(|| error! {
            "failed to read source file",
            "file path" => path.display(),
        })?;

        let value = String::from_utf8(bytes).chain_with(|| error! {
            "source file is not valid UTF-8",
            "file path" => path.display(),
        })?;

        Ok(SourceFile::new(path, value))
    }

    /// The slug assigned by the parser, or `""` before one is assigned.
    pub fn slug(&self) -> &str {
        self.data.get_raw(Slug::KEY).and_then(|v| v.as_str()).unwrap_or_default()
    }

    /// The file name without its extension.
    pub fn stem(&self) -> String {
        self.path.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// A successfully processed document: the final tree and the file with all
/// of its metadata. This is what the pipeline hands to emission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedContent {
    pub tree: hast::Root,
    pub file: SourceFile,
}

impl ProcessedContent {
    pub fn into_parts(self) -> (hast::Root, SourceFile) {
        (self.tree, self.file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_keys_round_trip() {
        let mut data = Data::new();
        data.insert(Slug, "notes/a");
        data.insert(Links, vec![Arc::<str>::from("b"), Arc::from("c")]);

        assert_eq!(data.get(Slug).unwrap().unwrap().as_ref(), "notes/a");
        assert_eq!(data.get(Links).unwrap().unwrap().len(), 2);
        assert!(data.get(Dates).is_none());
    }

    #[test]
    fn wrong_type_returns_raw_value() {
        let mut data = Data::new();
        data.insert_raw("slug", 5);
        assert_eq!(data.get(Slug), Some(Err(Value::from(5))));
    }

    #[test]
    fn frontmatter_lookup() {
        let mut data = Data::new();
        data.insert(Frontmatter, Arc::new(crate::dict! { "title" => "Hi" }));
        assert_eq!(data.frontmatter("title").and_then(|v| v.as_str()), Some("Hi"));
        assert!(data.frontmatter("tags").is_none());
    }

    #[test]
    fn unreadable_files_are_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.md");
        std::fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();
        assert!(SourceFile::read(&path).is_err());
        assert!(SourceFile::read(dir.path().join("missing.md")).is_err());
    }
}
