use std::fmt;
use std::path::PathBuf;

use crate::ctx::{Argv, BuildCtx};
use crate::error::{Error, Result};
use crate::file::ProcessedContent;
use crate::parser::create_file_parser;
use crate::pipeline::Processor;
use crate::util::PerfTimer;
use crate::worker::{ParseRequest, WorkerPool};

/// Files per dispatched chunk.
pub const CHUNK_SIZE: usize = 128;

/// Upper bound of the worker count heuristic.
pub const MAX_WORKERS: usize = 4;

/// How a batch will be executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// One pipeline, built and run inline on the calling thread.
    SingleThreaded,
    /// A pool of `workers` threads processing `chunks` chunks.
    Pooled { workers: usize, chunks: usize },
}

/// A failure of the batch as a whole.
#[derive(Debug)]
pub enum BatchError {
    /// The inline pipeline could not be built.
    Pipeline(Error),
    /// A worker could not be spawned (`chunk` is `None`) or a dispatched
    /// chunk failed as a whole.
    Worker { chunk: Option<usize>, message: String },
}

/// The explicit worker count if there is one, else `round(n / 128)` clamped
/// to `1..=4`. An explicit `0` means `1`.
///
/// ```rust
/// use quill::ctx::Argv;
/// use quill::scheduler::concurrency;
///
/// let argv = Argv::new("content");
/// assert_eq!(concurrency(&argv, 50), 1);
/// assert_eq!(concurrency(&argv, 300), 2);
/// assert_eq!(concurrency(&argv, 10_000), 4);
///
/// let argv = Argv { concurrency: Some(8), ..argv };
/// assert_eq!(concurrency(&argv, 50), 8);
/// ```
pub fn concurrency(argv: &Argv, n: usize) -> usize {
    match argv.concurrency {
        Some(c) => c.max(1),
        None => ((n as f64 / CHUNK_SIZE as f64).round() as usize).clamp(1, MAX_WORKERS),
    }
}

pub fn plan(argv: &Argv, n: usize) -> Strategy {
    match concurrency(argv, n) {
        1 => Strategy::SingleThreaded,
        workers => Strategy::Pooled { workers, chunks: n.div_ceil(CHUNK_SIZE) },
    }
}

/// Parses every file in `fps`.
///
/// The result holds one entry per successfully processed file. Its order is
/// unspecified: callers must not rely on it matching `fps`.
pub fn try_parse_markdown(
    ctx: &BuildCtx,
    fps: Vec<PathBuf>,
    front_matter_only: bool,
) -> Result<Vec<ProcessedContent>, BatchError> {
    let timer = PerfTimer::new();
    let strategy = plan(&ctx.argv, fps.len());
    let threads = match strategy {
        Strategy::SingleThreaded => 1,
        Strategy::Pooled { workers, .. } => workers,
    };

    tracing::info!(threads, files = fps.len(), "Parsing input files using {threads} threads");
    let res = match strategy {
        Strategy::SingleThreaded => {
            let ctx = if front_matter_only { ctx.front_matter_only() } else { ctx.clone() };
            let processor = Processor::new(&ctx).map_err(BatchError::Pipeline)?;
            create_file_parser(&ctx, fps).parse(&processor)
        }
        Strategy::Pooled { workers, chunks } => {
            let pool = WorkerPool::new(workers, ctx.registry.clone())
                .map_err(|e| BatchError::Worker { chunk: None, message: e.to_string() })?;

            let requests = fps.chunks(CHUNK_SIZE)
                .map(|chunk| ParseRequest::new(ctx, chunk.to_vec(), front_matter_only))
                .collect::<Vec<_>>();

            debug_assert_eq!(requests.len(), chunks);
            let mut res = Vec::with_capacity(fps.len());
            for (chunk, result) in pool.exec(requests).into_iter().enumerate() {
                match result {
                    Ok(contents) => res.extend(contents),
                    Err(message) => return Err(BatchError::Worker { chunk: Some(chunk), message }),
                }
            }

            res
        }
    };

    tracing::info!(files = res.len(), elapsed = %timer, "Parsed {} Markdown files in {timer}", res.len());
    Ok(res)
}

/// Like [`try_parse_markdown()`], but a worker failure ends the process.
///
/// A failing worker means the execution environment is broken, so nothing
/// downstream can use the batch: the error is printed and the process exits
/// with status 1 after the pool has shut down. A pipeline composition error
/// in single-threaded mode is returned.
pub fn parse_markdown(
    ctx: &BuildCtx,
    fps: Vec<PathBuf>,
    front_matter_only: bool,
) -> Result<Vec<ProcessedContent>> {
    match try_parse_markdown(ctx, fps, front_matter_only) {
        Ok(res) => Ok(res),
        Err(BatchError::Pipeline(e)) => Err(e),
        Err(e) => {
            tracing::error!(%e, "worker failed, aborting");
            eprintln!("{}", strip_error_prefix(&e.to_string()));
            std::process::exit(1);
        }
    }
}

/// Drops a leading generic `Error:` from `message`.
pub fn strip_error_prefix(message: &str) -> &str {
    let trimmed = message.trim_start();
    match trimmed.get(..6) {
        Some(prefix) if prefix.eq_ignore_ascii_case("error:") => trimmed[6..].trim_start(),
        _ => trimmed,
    }
}

impl fmt::Display for BatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchError::Pipeline(e) => e.fmt(f),
            BatchError::Worker { message, .. } => f.write_str(message),
        }
    }
}

impl std::error::Error for BatchError { }

impl From<BatchError> for Error {
    #[track_caller]
    fn from(e: BatchError) -> Self {
        match e {
            BatchError::Pipeline(e) => e,
            BatchError::Worker { chunk: Some(chunk), message } => error! {
                "worker failed",
                "chunk" => chunk,
                message,
            },
            BatchError::Worker { chunk: None, message } => error!("worker failed", message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concurrency_heuristic() {
        let argv = Argv::new("content");
        for (n, expected) in [(0, 1), (50, 1), (191, 1), (192, 2), (300, 2), (1000, 4), (10_000, 4)] {
            assert_eq!(concurrency(&argv, n), expected, "n = {n}");
        }

        let zero = Argv { concurrency: Some(0), ..argv.clone() };
        assert_eq!(concurrency(&zero, 1000), 1);
    }

    #[test]
    fn plans() {
        let argv = Argv::new("content");
        assert_eq!(plan(&argv, 100), Strategy::SingleThreaded);
        assert_eq!(plan(&argv, 300), Strategy::Pooled { workers: 2, chunks: 3 });

        let forced = Argv { concurrency: Some(2), ..argv };
        assert_eq!(plan(&forced, 10), Strategy::Pooled { workers: 2, chunks: 1 });
        assert_eq!(plan(&forced, 0), Strategy::Pooled { workers: 2, chunks: 0 });
    }

    #[test]
    fn strips_generic_prefix() {
        assert_eq!(strip_error_prefix("Error: disk full"), "disk full");
        assert_eq!(strip_error_prefix("error:broken"), "broken");
        assert_eq!(strip_error_prefix("unknown transformer"), "unknown transformer");
        assert_eq!(strip_error_prefix("Err"), "Err");
    }
}
