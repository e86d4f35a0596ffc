use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde::Deserialize;

use crate::config::{Config, DateType};
use crate::ctx::BuildCtx;
use crate::error::Result;
use crate::file::{Data, Dates, SourceFile};
use crate::plugin::{Hooks, MarkdownPass, Transformer};
use crate::tree::mdast;
use crate::value::{Dict, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateSource {
    Frontmatter,
    Filesystem,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DateOptions {
    /// Sources consulted in order; earlier sources win.
    pub priority: Vec<DateSource>,
}

impl Default for DateOptions {
    fn default() -> Self {
        DateOptions { priority: vec![DateSource::Frontmatter, DateSource::Filesystem] }
    }
}

/// Fills `data.dates` with `created`, `modified` and `published` timestamps.
#[derive(Debug, Clone, Default)]
pub struct CreatedModifiedDate {
    options: DateOptions,
}

impl CreatedModifiedDate {
    pub const NAME: &'static str = "CreatedModifiedDate";

    pub fn new(options: DateOptions) -> Self {
        CreatedModifiedDate { options }
    }
}

/// Parses RFC 3339 timestamps, `YYYY-MM-DD`, and `YYYY-MM-DD HH:MM:SS`.
pub fn parse_date(string: &str) -> Option<DateTime<Utc>> {
    let string = string.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(string) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(string, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    let date = NaiveDate::parse_from_str(string, "%Y-%m-%d").ok()?;
    Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?))
}

fn frontmatter_date(data: &Data, keys: &[&str], file: &Path) -> Option<DateTime<Utc>> {
    let (key, value) = keys.iter().find_map(|k| Some((*k, data.frontmatter(k)?)))?;
    let string = match value {
        Value::String(s) => s.to_string(),
        Value::Num(n) => n.to_f64().to_string(),
        _ => return None,
    };

    let date = parse_date(&string);
    if date.is_none() {
        tracing::warn!(path = %file.display(), key, value = %string, "ignoring unparseable date");
    }

    date
}

#[derive(Default)]
struct Found {
    created: Option<DateTime<Utc>>,
    modified: Option<DateTime<Utc>>,
    published: Option<DateTime<Utc>>,
}

fn collect(options: &DateOptions, file: &mut SourceFile) -> Result<()> {
    let mut found = Found::default();
    for source in &options.priority {
        match source {
            DateSource::Frontmatter => {
                let data = &file.data;
                let path = file.path.as_path();
                found.created = found.created
                    .or_else(|| frontmatter_date(data, &["created", "date"], path));
                found.modified = found.modified
                    .or_else(|| frontmatter_date(data, &["modified", "lastmod", "updated", "last-modified"], path));
                found.published = found.published
                    .or_else(|| frontmatter_date(data, &["published", "publishDate"], path));
            }
            DateSource::Filesystem => {
                let Ok(metadata) = std::fs::metadata(&file.path) else { continue };
                let modified = metadata.modified().ok().map(DateTime::<Utc>::from);
                let created = metadata.created().ok().map(DateTime::<Utc>::from).or(modified);
                found.created = found.created.or(created);
                found.modified = found.modified.or(modified);
            }
        }
    }

    let published = found.published.or(found.created);
    let dates = [("created", found.created), ("modified", found.modified), ("published", published)]
        .into_iter()
        .filter_map(|(k, v)| Some((Arc::<str>::from(k), v?.to_rfc3339_opts(SecondsFormat::Secs, true).into())))
        .collect::<Dict>();

    file.data.insert(Dates, Arc::new(dates));
    Ok(())
}

/// The date of kind `cfg.configuration.default_date_type` recorded in `data`.
///
/// Fails when no default date type is configured.
pub fn get_date(cfg: &Config, data: &Data) -> Result<Option<DateTime<Utc>>> {
    let Some(kind) = cfg.configuration.default_date_type else {
        return err! {
            "no default date type configured",
            "hint" => "set `configuration.default_date_type`",
        };
    };

    let key = match kind {
        DateType::Created => "created",
        DateType::Modified => "modified",
        DateType::Published => "published",
    };

    let date = data.get(Dates)
        .and_then(|dates| dates.ok())
        .and_then(|dates| dates.get(key)?.as_str().and_then(parse_date));

    Ok(date)
}

/// `YYYY-MM-DD`.
pub fn format_date(date: &DateTime<Utc>) -> String {
    date.format("%Y-%m-%d").to_string()
}

impl Transformer for CreatedModifiedDate {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn hooks(&self) -> Hooks {
        Hooks::MARKDOWN
    }

    fn markdown_plugins(&self, _: &BuildCtx) -> Result<Vec<MarkdownPass>> {
        let options = self.options.clone();
        let pass: MarkdownPass = Box::new(move |_: &mut mdast::Root, file: &mut SourceFile| {
            collect(&options, file)
        });

        Ok(vec![pass])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::Frontmatter;

    fn file_with(frontmatter: Dict) -> SourceFile {
        let mut file = SourceFile::new("does/not/exist.md", "");
        file.data.insert(Frontmatter, Arc::new(frontmatter));
        file
    }

    #[test]
    fn parses_common_formats() {
        let day = parse_date("2024-03-01").unwrap();
        assert_eq!(format_date(&day), "2024-03-01");
        assert_eq!(parse_date("2024-03-01T10:20:30Z").unwrap().to_rfc3339(), "2024-03-01T10:20:30+00:00");
        assert_eq!(parse_date("2024-03-01T23:00:00-02:00").map(|d| format_date(&d)).as_deref(), Some("2024-03-02"));
        assert!(parse_date("2024-03-01 08:00:00").is_some());
        assert!(parse_date("yesterday").is_none());
    }

    #[test]
    fn front_matter_dates_win_in_priority_order() {
        let mut file = file_with(crate::dict! { "date" => "2023-01-02", "updated" => "2023-02-03" });
        collect(&DateOptions::default(), &mut file).unwrap();

        let config = Config::default();
        let created = get_date(&config, &file.data).unwrap().unwrap();
        assert_eq!(format_date(&created), "2023-01-02");

        let dates = file.data.get(Dates).unwrap().unwrap();
        assert_eq!(dates.get("modified").and_then(|v| v.as_str()), Some("2023-02-03T00:00:00Z"));
        assert_eq!(dates.get("published"), dates.get("created"));
    }

    #[test]
    fn filesystem_dates_fill_the_gaps() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.md");
        std::fs::write(&path, "x").unwrap();

        let mut file = SourceFile::new(&path, "x");
        file.data.insert(Frontmatter, Arc::new(crate::dict! { "date" => "2020-05-05" }));
        collect(&DateOptions::default(), &mut file).unwrap();

        let dates = file.data.get(Dates).unwrap().unwrap();
        assert_eq!(dates.get("created").and_then(|v| v.as_str()), Some("2020-05-05T00:00:00Z"));
        assert!(dates.get("modified").is_some());
    }

    #[test]
    fn get_date_requires_a_date_type() {
        let mut config = Config::default();
        config.configuration.default_date_type = None;
        assert!(get_date(&config, &Data::new()).is_err());

        config.configuration.default_date_type = Some(DateType::Published);
        assert_eq!(get_date(&config, &Data::new()).unwrap(), None);
    }
}
