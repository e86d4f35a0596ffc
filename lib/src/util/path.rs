use std::borrow::Borrow;
use std::fmt;
use std::ops::Deref;
use std::path::{Component, Path};
use std::sync::Arc;

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

/// A canonical, path-derived identifier for a document: `notes/my-page`,
/// `index`, `img/cover.png`. Used as the unit of cross-document linking.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FullSlug(Arc<str>);

/// The closed world of every slug a build can link to.
pub type SlugSet = FxHashSet<FullSlug>;

impl FullSlug {
    pub fn new<S: Into<Arc<str>>>(slug: S) -> Self {
        FullSlug(slug.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The last segment: `c` for `a/b/c`.
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or_default()
    }

    /// Everything before the last segment: `a/b` for `a/b/c`, `""` for `c`.
    pub fn dir(&self) -> &str {
        self.0.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
    }

    pub fn is_index(&self) -> bool {
        &*self.0 == "index" || self.0.ends_with("/index")
    }
}

impl Deref for FullSlug {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for FullSlug {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FullSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for FullSlug {
    fn from(value: &str) -> Self {
        FullSlug(value.into())
    }
}

impl From<String> for FullSlug {
    fn from(value: String) -> Self {
        FullSlug(value.into())
    }
}

impl From<FullSlug> for Arc<str> {
    fn from(value: FullSlug) -> Self {
        value.0
    }
}

/// Joins the normal components of `path` with `/`, regardless of platform.
pub fn to_slash_path(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Derives the slug of a file from its path relative to the content root.
///
/// ```rust
/// use quill::util::slugify_file_path;
///
/// assert_eq!(&*slugify_file_path("notes/My Page.md"), "notes/My-Page");
/// assert_eq!(&*slugify_file_path("a/_index.md"), "a/index");
/// assert_eq!(&*slugify_file_path("img/cat pic.png"), "img/cat-pic.png");
/// assert_eq!(&*slugify_file_path("Q&A?.md"), "Q-and-A-q");
/// ```
pub fn slugify_file_path<P: AsRef<Path>>(path: P) -> FullSlug {
    let path = to_slash_path(path.as_ref());
    let (stem, ext) = match extension(&path) {
        Some(ext) if ext.eq_ignore_ascii_case("md") || ext.eq_ignore_ascii_case("html") => {
            (&path[..path.len() - ext.len() - 1], "")
        }
        Some(ext) => (&path[..path.len() - ext.len() - 1], &path[path.len() - ext.len() - 1..]),
        None => (&*path, ""),
    };

    let mut slug = sluggify(stem);
    if slug == "_index" || slug.ends_with("/_index") {
        slug.truncate(slug.len() - "_index".len());
        slug.push_str("index");
    }

    slug.push_str(ext);
    FullSlug::from(slug)
}

/// The trailing alphanumeric extension of the last segment, without the dot.
fn extension(path: &str) -> Option<&str> {
    let name = path.rsplit('/').next()?;
    let (stem, ext) = name.rsplit_once('.')?;
    let valid = !stem.is_empty()
        && !ext.is_empty()
        && ext.bytes().all(|b| b.is_ascii_alphanumeric());

    valid.then_some(ext)
}

fn sluggify(path: &str) -> String {
    let mut output = String::with_capacity(path.len());
    for (i, segment) in path.split('/').enumerate() {
        if i > 0 {
            output.push('/');
        }

        for c in segment.chars() {
            match c {
                c if c.is_whitespace() => output.push('-'),
                '&' => output.push_str("-and-"),
                '%' => output.push_str("-percent"),
                '?' => output.push_str("-q"),
                '#' => {}
                c => output.push(c),
            }
        }
    }

    output.trim_end_matches('/').to_string()
}

/// Drops a trailing `index` so that `a/index` becomes `a/` and `index` becomes `""`.
pub fn simplify_slug(slug: &str) -> &str {
    let simple = if slug == "index" {
        ""
    } else {
        slug.strip_suffix("/index").map(|s| &slug[..s.len() + 1]).unwrap_or(slug)
    };

    simple.trim_start_matches('/')
}

/// The relative path from the page at `slug` back to the site root: `.` for
/// top-level pages, `..` for `a/b`, `../..` for `a/b/c`.
pub fn path_to_root(slug: &str) -> String {
    let depth = slug.split('/').filter(|s| !s.is_empty()).count().saturating_sub(1);
    match depth {
        0 => ".".into(),
        n => vec![".."; n].join("/"),
    }
}

/// Joins segments with `/`, skipping empty ones and collapsing repeated slashes.
pub fn join_segments<'a, I: IntoIterator<Item = &'a str>>(segments: I) -> String {
    let joined = segments.into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/");

    let mut output = String::with_capacity(joined.len());
    for c in joined.chars() {
        if c == '/' && output.ends_with('/') {
            continue;
        }

        output.push(c);
    }

    output
}

/// A link from the page at `current` to the page at `target`, relative to `current`.
pub fn resolve_relative(current: &str, target: &str) -> String {
    let root = path_to_root(current);
    join_segments([root.as_str(), simplify_slug(target)])
}

/// Resolves `.` and `..` segments. `..` past the root is dropped.
pub fn normalize_segments(path: &str) -> String {
    let mut stack: Vec<&str> = vec![];
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => { stack.pop(); }
            segment => stack.push(segment),
        }
    }

    let mut output = stack.join("/");
    if path.ends_with('/') && !output.is_empty() {
        output.push('/');
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugs_from_paths() {
        assert_eq!(&*slugify_file_path("index.md"), "index");
        assert_eq!(&*slugify_file_path("notes/index.md"), "notes/index");
        assert_eq!(&*slugify_file_path("notes/_index.md"), "notes/index");
        assert_eq!(&*slugify_file_path("notes/a b.md"), "notes/a-b");
        assert_eq!(&*slugify_file_path("notes/50%.md"), "notes/50-percent");
        assert_eq!(&*slugify_file_path("notes/#tag.md"), "notes/tag");
        assert_eq!(&*slugify_file_path("page.html"), "page");
        assert_eq!(&*slugify_file_path("data/file.json"), "data/file.json");
        assert_eq!(&*slugify_file_path(".hidden"), ".hidden");
        assert_eq!(&*slugify_file_path("./a/b.md"), "a/b");
    }

    #[test]
    fn slug_parts() {
        let slug = FullSlug::from("a/b/c");
        assert_eq!(slug.file_name(), "c");
        assert_eq!(slug.dir(), "a/b");
        assert!(!slug.is_index());
        assert!(FullSlug::from("a/index").is_index());
        assert_eq!(FullSlug::from("c").dir(), "");
    }

    #[test]
    fn relative_links() {
        assert_eq!(path_to_root("index"), ".");
        assert_eq!(path_to_root("a/b"), "..");
        assert_eq!(path_to_root("a/b/c"), "../..");

        assert_eq!(simplify_slug("index"), "");
        assert_eq!(simplify_slug("a/index"), "a/");
        assert_eq!(simplify_slug("a/b"), "a/b");

        assert_eq!(resolve_relative("index", "a/b"), "./a/b");
        assert_eq!(resolve_relative("a/b", "c"), "../c");
        assert_eq!(resolve_relative("a/b", "a/index"), "../a/");
        assert_eq!(resolve_relative("a/b", "index"), "..");
    }

    #[test]
    fn normalizes_dot_segments() {
        assert_eq!(normalize_segments("a/./b/../c"), "a/c");
        assert_eq!(normalize_segments("../../x"), "x");
        assert_eq!(normalize_segments("a/b/"), "a/b/");
        assert_eq!(join_segments(["a/", "/b", "", "c"]), "a/b/c");
    }

    #[test]
    fn slug_sets_accept_str_lookups() {
        let set: SlugSet = ["a/b", "index"].into_iter().map(FullSlug::from).collect();
        assert!(set.contains("a/b"));
        assert!(!set.contains("a"));
    }
}
