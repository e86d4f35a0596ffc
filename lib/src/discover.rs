use std::path::{Path, PathBuf};

use jwalk::WalkDir;

use crate::error::Result;
use crate::util::{self, FullSlug, SlugSet};

/// The input of a build: the markdown files to parse, and the slug of every
/// file under the content root.
#[derive(Debug, Default, Clone)]
pub struct Discovery {
    /// Markdown files, in sorted walk order.
    pub markdown: Vec<PathBuf>,
    pub all_slugs: SlugSet,
}

/// Whether the slash-separated `path` matches `pattern`. A pattern matches
/// a whole path, or any run of whole segments in it. `*` within a segment
/// matches any run of characters.
fn is_ignored(path: &str, pattern: &str) -> bool {
    fn segment_matches(segment: &str, pattern: &str) -> bool {
        match pattern.split_once('*') {
            None => segment == pattern,
            Some((prefix, rest)) => {
                let Some(segment) = segment.strip_prefix(prefix) else { return false };
                (0..=segment.len())
                    .filter(|&i| segment.is_char_boundary(i))
                    .any(|i| segment_matches(&segment[i..], rest))
            }
        }
    }

    let pattern = pattern.trim_matches('/');
    if pattern.is_empty() {
        return false;
    }

    let segments: Vec<&str> = path.split('/').collect();
    let wanted: Vec<&str> = pattern.split('/').collect();
    segments.windows(wanted.len()).any(|window| {
        window.iter().zip(&wanted).all(|(s, p)| segment_matches(s, p))
    })
}

fn is_markdown(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("md"))
}

/// Walks `directory`, skipping hidden entries and those matching any of
/// `ignore_patterns`.
pub fn discover<P: AsRef<Path>>(directory: P, ignore_patterns: &[String]) -> Result<Discovery> {
    let root = directory.as_ref();
    if !root.is_dir() {
        return err! {
            "content directory does not exist or is not a directory",
            "directory" => root.display(),
        };
    }

    let walker = WalkDir::new(root)
        .sort(true)
        .skip_hidden(true)
        .follow_links(true);

    let mut discovery = Discovery::default();
    for entry in walker {
        let entry = entry.map_err(|e| error!(
            "failed to walk content directory",
            "directory" => root.display(),
            e.to_string(),
        ))?;

        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = util::to_slash_path(path.strip_prefix(root).unwrap_or(&path));
        if ignore_patterns.iter().any(|p| is_ignored(&relative, p)) {
            tracing::debug!(path = %relative, "ignored");
            continue;
        }

        discovery.all_slugs.insert(util::slugify_file_path(&relative));
        if is_markdown(&path) {
            discovery.markdown.push(path);
        }
    }

    tracing::debug!(
        markdown = discovery.markdown.len(),
        slugs = discovery.all_slugs.len(),
        "discovered content"
    );

    Ok(discovery)
}

impl Discovery {
    pub fn contains(&self, slug: &FullSlug) -> bool {
        self.all_slugs.contains(slug)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn tempdir() -> tempfile::TempDir {
        tempfile::Builder::new().prefix("quill-discover").tempdir().unwrap()
    }

    #[test]
    fn matches_ignore_patterns() {
        assert!(is_ignored("private/a.md", "private"));
        assert!(is_ignored("notes/private/a.md", "private"));
        assert!(is_ignored("templates/x.md", "templates/"));
        assert!(is_ignored("notes/draft-1.md", "draft-*"));
        assert!(is_ignored("notes/a.tmp", "*.tmp"));
        assert!(is_ignored("a/b/c.md", "a/b"));
        assert!(!is_ignored("privateer/a.md", "private"));
        assert!(!is_ignored("a/x/b.md", "a/b"));
        assert!(!is_ignored("notes/a.md", ""));
    }

    #[test]
    fn discovers_markdown_and_slugs() {
        let dir = tempdir();
        let root = dir.path();
        fs::create_dir_all(root.join("notes/deep")).unwrap();
        fs::create_dir_all(root.join("private")).unwrap();
        fs::create_dir_all(root.join(".obsidian")).unwrap();
        fs::write(root.join("index.md"), "# Home").unwrap();
        fs::write(root.join("notes/My Page.md"), "x").unwrap();
        fs::write(root.join("notes/deep/b.md"), "x").unwrap();
        fs::write(root.join("notes/cat.png"), [0u8]).unwrap();
        fs::write(root.join("private/secret.md"), "x").unwrap();
        fs::write(root.join(".obsidian/app.md"), "x").unwrap();

        let ignore = vec!["private".to_string()];
        let discovery = discover(root, &ignore).unwrap();

        let markdown: Vec<_> = discovery.markdown.iter()
            .map(|p| util::to_slash_path(p.strip_prefix(root).unwrap()))
            .collect();

        assert_eq!(markdown, ["index.md", "notes/My Page.md", "notes/deep/b.md"]);

        let mut slugs: Vec<_> = discovery.all_slugs.iter().map(|s| s.as_str()).collect();
        slugs.sort();
        assert_eq!(slugs, ["index", "notes/My-Page", "notes/cat.png", "notes/deep/b"]);
        assert!(discovery.contains(&FullSlug::from("notes/cat.png")));
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempdir();
        let error = discover(dir.path().join("nope"), &[]).unwrap_err();
        assert!(error.to_string().contains("does not exist"));
    }
}
