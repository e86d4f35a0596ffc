use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::ctx::BuildCtx;
use crate::error::Result;
use crate::file::{FilePath, ProcessedContent, Slug, SourceFile};
use crate::pipeline::Processor;
use crate::util::{slugify_file_path, PerfTimer};

/// Processes a bounded list of files against one pipeline, sequentially.
#[derive(Debug, Clone)]
pub struct FileParser {
    ctx: BuildCtx,
    fps: Vec<PathBuf>,
}

pub fn create_file_parser(ctx: &BuildCtx, fps: Vec<PathBuf>) -> FileParser {
    FileParser { ctx: ctx.clone(), fps }
}

impl FileParser {
    pub fn len(&self) -> usize {
        self.fps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fps.is_empty()
    }

    /// Processes every file in order, returning only those that succeed.
    ///
    /// A failing file is logged with its path and the location the failure
    /// was raised from, then dropped. A transformer that panics on a file
    /// fails only that file. Nothing of it reaches the output.
    pub fn parse(&self, processor: &Processor) -> Vec<ProcessedContent> {
        let mut res = Vec::with_capacity(self.fps.len());
        for fp in &self.fps {
            let timer = PerfTimer::new();
            let result = catch_unwind(AssertUnwindSafe(|| process_file(&self.ctx, processor, fp)));
            let result = match result {
                Ok(result) => result,
                Err(payload) => {
                    tracing::error!(
                        path = %fp.display(),
                        "failed to process `{}`: transformer panicked: {}",
                        fp.display(), panic_message(&*payload),
                    );

                    continue;
                }
            };

            match result {
                Ok(content) => {
                    if self.ctx.argv.verbose {
                        tracing::info!(
                            path = %fp.display(),
                            slug = content.file.slug(),
                            elapsed = %timer,
                            "[process] {} -> {} ({timer})", fp.display(), content.file.slug(),
                        );
                    }

                    res.push(content);
                }
                Err(e) => {
                    tracing::error!(
                        path = %fp.display(),
                        location = %e.location(),
                        "failed to process `{}`\n{e}", fp.display(),
                    );
                }
            }
        }

        res
    }
}

/// The message a panic was raised with, if it was raised with one.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload.downcast_ref::<&str>().map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "panicked".into())
}

/// The path of `fp` relative to `root`, or `fp` itself if it isn't under it.
fn relative_path(root: &Path, fp: &Path) -> PathBuf {
    if let Ok(path) = fp.strip_prefix(root) {
        return path.to_path_buf();
    }

    crate::util::diff_paths(fp, root)
        .filter(|p| !p.starts_with(".."))
        .unwrap_or_else(|| fp.to_path_buf())
}

fn process_file(ctx: &BuildCtx, processor: &Processor, fp: &Path) -> Result<ProcessedContent> {
    let mut file = SourceFile::read(fp)?;
    file.value = file.value.trim().to_string();
    file.value = processor.transform_text(std::mem::take(&mut file.value))?;

    let relative = relative_path(&ctx.argv.directory, fp);
    let slug = slugify_file_path(&relative);
    file.data.insert(Slug, Arc::<str>::from(slug));
    file.data.insert(FilePath, Arc::<str>::from(fp.to_string_lossy()));

    let tree = processor.parse(&file.value);
    let tree = processor.run(tree, &mut file)?;
    Ok(ProcessedContent { tree, file })
}
