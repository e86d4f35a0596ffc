use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::ctx::{Argv, BuildCtx};
use crate::error::{Chainable, Result};
use crate::file::ProcessedContent;
use crate::parser::{create_file_parser, panic_message};
use crate::pipeline::Processor;
use crate::plugin::Registry;
use crate::util::SlugSet;
use crate::value::{Format, Json};

/// Everything a worker needs to process one chunk. Crosses the worker
/// boundary serialized; nothing is shared with the dispatcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseRequest {
    pub cfg: Config,
    pub argv: Argv,
    pub all_slugs: SlugSet,
    pub fps: Vec<PathBuf>,
    pub front_matter_only: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParseResponse {
    Parsed(Vec<ProcessedContent>),
    /// The chunk could not be processed at all.
    Failed(String),
}

impl ParseRequest {
    pub fn new(ctx: &BuildCtx, fps: Vec<PathBuf>, front_matter_only: bool) -> Self {
        ParseRequest {
            cfg: (*ctx.cfg).clone(),
            argv: (*ctx.argv).clone(),
            all_slugs: (*ctx.all_slugs).clone(),
            fps,
            front_matter_only,
        }
    }
}

fn encode<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).chain_with(|| error!("failed to encode worker message"))
}

fn decode<T: serde::de::DeserializeOwned>(message: &str) -> Result<T> {
    Json::from_str(message).chain_with(|| error!("failed to decode worker message"))
}

/// Runs one request inside a worker: rebuilds the context and the pipeline
/// from the request alone, then parses the chunk.
pub fn handle(registry: &Arc<Registry>, request: ParseRequest) -> ParseResponse {
    let ParseRequest { cfg, argv, all_slugs, fps, front_matter_only } = request;
    let ctx = BuildCtx {
        cfg: Arc::new(cfg),
        argv: Arc::new(argv),
        all_slugs: Arc::new(all_slugs),
        registry: registry.clone(),
    };

    let ctx = if front_matter_only { ctx.front_matter_only() } else { ctx };
    match Processor::new(&ctx) {
        Ok(processor) => ParseResponse::Parsed(create_file_parser(&ctx, fps).parse(&processor)),
        Err(e) => ParseResponse::Failed(e.to_string()),
    }
}

/// [`handle()`] over encoded messages. Never panics.
pub fn handle_message(registry: &Arc<Registry>, message: &str) -> String {
    let response = catch_unwind(AssertUnwindSafe(|| match decode::<ParseRequest>(message) {
        Ok(request) => handle(registry, request),
        Err(e) => ParseResponse::Failed(e.to_string()),
    }));

    let response = response.unwrap_or_else(|payload| {
        ParseResponse::Failed(format!("Error: {}", panic_message(&*payload)))
    });

    encode(&response).unwrap_or_else(|e| {
        let failed = ParseResponse::Failed(e.to_string());
        serde_json::to_string(&failed).unwrap_or_default()
    })
}

/// A fixed-size pool of worker threads.
///
/// Workers are stateless: each invocation carries all of its inputs and
/// returns all of its outputs as encoded messages. The pool shuts down when
/// dropped.
#[derive(derive_more::Debug)]
pub struct WorkerPool {
    #[debug(ignore)]
    pool: rayon::ThreadPool,
    registry: Arc<Registry>,
    workers: usize,
}

impl WorkerPool {
    pub fn new(workers: usize, registry: Arc<Registry>) -> Result<Self> {
        let workers = workers.max(1);
        tracing::debug!(workers, "spawning worker pool");
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("quill-worker-{i}"))
            .build()
            .chain_with(|| error! {
                "failed to spawn worker pool",
                "workers" => workers,
            })?;

        Ok(WorkerPool { pool, registry, workers })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Dispatches every request and waits for all of them. Results are in
    /// dispatch order; a chunk that failed as a whole is an `Err`.
    pub fn exec(&self, requests: Vec<ParseRequest>) -> Vec<Result<Vec<ProcessedContent>, String>> {
        tracing::debug!(chunks = requests.len(), "dispatching to worker pool");
        let registry = &self.registry;
        let responses: Vec<String> = self.pool.install(|| {
            requests.into_par_iter()
                .map(|request| match encode(&request) {
                    Ok(message) => handle_message(registry, &message),
                    Err(e) => encode(&ParseResponse::Failed(e.to_string())).unwrap_or_default(),
                })
                .collect()
        });

        tracing::debug!(chunks = responses.len(), "draining worker responses");
        responses.iter()
            .map(|message| match decode::<ParseResponse>(message) {
                Ok(ParseResponse::Parsed(contents)) => Ok(contents),
                Ok(ParseResponse::Failed(message)) => Err(message),
                Err(e) => Err(e.to_string()),
            })
            .collect()
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        tracing::debug!(workers = self.workers, "terminating worker pool");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PluginSpec;
    use crate::plugin::{Hooks, Transformer};

    static_assertions::assert_impl_all!(ParseRequest: Send, Sync);
    static_assertions::assert_impl_all!(ParseResponse: Send, Sync);
    static_assertions::assert_impl_all!(WorkerPool: Send, Sync);

    struct Boom;

    impl Transformer for Boom {
        fn name(&self) -> &str { "Boom" }
        fn hooks(&self) -> Hooks { Hooks::TEXT }
        fn text_transform(&self, _: &BuildCtx, _: String) -> Result<String> {
            panic!("boom")
        }
    }

    fn request(dir: &std::path::Path, names: &[&str]) -> ParseRequest {
        std::fs::write(dir.join("a.md"), "# A").unwrap();
        let cfg = Config::default().with_transformers(names.iter().copied().map(PluginSpec::new));
        let ctx = BuildCtx::new(cfg, Argv::new(dir), SlugSet::default());
        ParseRequest::new(&ctx, vec![dir.join("a.md")], false)
    }

    #[test]
    fn requests_are_handled_from_messages_alone() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Arc::new(Registry::builtin());
        let message = serde_json::to_string(&request(dir.path(), &["FrontMatter"])).unwrap();

        let response: ParseResponse = serde_json::from_str(&handle_message(&registry, &message)).unwrap();
        match response {
            ParseResponse::Parsed(contents) => {
                assert_eq!(contents.len(), 1);
                assert_eq!(contents[0].file.slug(), "a");
            }
            ParseResponse::Failed(e) => panic!("unexpected failure: {e}"),
        }
    }

    #[test]
    fn failures_become_responses() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = Registry::builtin();
        registry.register("Boom", |_| Ok(Arc::new(Boom)));
        let registry = Arc::new(registry);

        let unknown = serde_json::to_string(&request(dir.path(), &["Unknown"])).unwrap();
        let response: ParseResponse = serde_json::from_str(&handle_message(&registry, &unknown)).unwrap();
        assert!(matches!(response, ParseResponse::Failed(ref e) if e.contains("Unknown")));

        let garbage: ParseResponse = serde_json::from_str(&handle_message(&registry, "{")).unwrap();
        assert!(matches!(garbage, ParseResponse::Failed(_)));
    }

    #[test]
    fn per_file_panics_drop_only_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = Registry::builtin();
        registry.register("Boom", |_| Ok(Arc::new(Boom)));

        let pool = WorkerPool::new(2, Arc::new(registry)).unwrap();
        let results = pool.exec(vec![request(dir.path(), &["Boom"]), request(dir.path(), &[])]);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].as_ref().map(|c| c.len()), Ok(0));
        assert_eq!(results[1].as_ref().map(|c| c.len()), Ok(1));
    }

    #[test]
    fn pipeline_panics_fail_the_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = Registry::builtin();
        registry.register("Broken", |_| -> Result<Arc<dyn Transformer>> { panic!("no pipeline") });

        let pool = WorkerPool::new(2, Arc::new(registry)).unwrap();
        let results = pool.exec(vec![request(dir.path(), &["Broken"]), request(dir.path(), &[])]);
        assert!(matches!(&results[0], Err(e) if e.contains("no pipeline")));
        assert_eq!(results[1].as_ref().map(|c| c.len()), Ok(1));
    }
}
