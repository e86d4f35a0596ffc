use memchr::memmem;

use crate::ctx::BuildCtx;
use crate::error::Result;
use crate::plugin::{Hooks, Transformer};
use crate::util::slugify;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "svg", "webp", "avif"];

/// Rewrites Obsidian-style `[[target#anchor|alias]]` links and `![[embed]]`
/// embeds into standard markdown before parsing.
#[derive(Debug, Default, Clone)]
pub struct WikiLinks;

impl WikiLinks {
    pub const NAME: &'static str = "WikiLinks";
}

#[derive(Debug, PartialEq)]
struct WikiLink<'a> {
    embed: bool,
    target: &'a str,
    anchor: Option<&'a str>,
    alias: Option<&'a str>,
}

impl<'a> WikiLink<'a> {
    /// Parses the text between `[[` and `]]`.
    fn parse(inner: &'a str, embed: bool) -> Option<Self> {
        if inner.contains(['\n', '[', ']']) {
            return None;
        }

        let (link, alias) = match inner.split_once('|') {
            Some((link, alias)) => (link.trim_end_matches('\\'), Some(alias.trim())),
            None => (inner, None),
        };

        let (target, anchor) = match link.split_once('#') {
            Some((target, anchor)) => (target.trim(), Some(anchor.trim_start_matches('#').trim())),
            None => (link.trim(), None),
        };

        if target.is_empty() && anchor.is_none() {
            return None;
        }

        Some(WikiLink { embed, target, anchor, alias: alias.filter(|a| !a.is_empty()) })
    }

    fn is_image(&self) -> bool {
        let ext = self.target.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase());
        ext.is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
    }

    fn write(&self, out: &mut String) {
        let mut href = self.target.to_string();
        if let Some(anchor) = self.anchor {
            href.push('#');
            href.push_str(&slugify(anchor));
        }

        if self.embed && self.is_image() {
            let alt = self.alias.unwrap_or(self.target);
            out.push_str(&format!("![{alt}](<{href}>)"));
            return;
        }

        let text = match (self.alias, self.anchor) {
            (Some(alias), _) => alias.to_string(),
            (None, Some(anchor)) if self.target.is_empty() => anchor.to_string(),
            (None, Some(anchor)) => format!("{} > {anchor}", self.target),
            (None, None) => self.target.to_string(),
        };

        out.push_str(&format!("[{text}](<{href}>)"));
    }
}

fn rewrite_line(line: &str, out: &mut String) {
    let bytes = line.as_bytes();
    let mut last = 0;
    for start in memmem::find_iter(bytes, b"[[") {
        if start < last {
            continue;
        }

        let Some(len) = memmem::find(&bytes[start + 2..], b"]]") else { break };
        let end = start + 2 + len;
        let embed = start > 0 && bytes[start - 1] == b'!';
        let Some(link) = WikiLink::parse(&line[start + 2..end], embed) else { continue };

        let begin = if embed { start - 1 } else { start };
        out.push_str(&line[last..begin]);
        link.write(out);
        last = end + 2;
    }

    out.push_str(&line[last..]);
}

/// Rewrites every wikilink in `text` outside of fenced code blocks.
pub fn rewrite(text: &str) -> String {
    if memmem::find(text.as_bytes(), b"[[").is_none() {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut fence: Option<&str> = None;
    for line in text.split_inclusive('\n') {
        let trimmed = line.trim_start();
        let marker = ["```", "~~~"].into_iter().find(|m| trimmed.starts_with(m));
        match (fence, marker) {
            (None, Some(marker)) => fence = Some(marker),
            (Some(open), Some(marker)) if open == marker => fence = None,
            _ => {}
        }

        if fence.is_some() || marker.is_some() {
            out.push_str(line);
        } else {
            rewrite_line(line, &mut out);
        }
    }

    out
}

impl Transformer for WikiLinks {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn hooks(&self) -> Hooks {
        Hooks::TEXT
    }

    fn text_transform(&self, _: &BuildCtx, text: String) -> Result<String> {
        Ok(rewrite(&text))
    }
}
