use std::path::PathBuf;

use rustc_hash::FxHashMap;
use tracing_subscriber::EnvFilter;

use quill::error::Result;
use quill::file::{Links, ProcessedContent};
use quill::plugins::{format_date, get_date, SyntaxHighlighting};
use quill::util::PerfTimer;
use quill::{discover, Argv, BuildCtx};

mod config;

#[derive(Debug)]
struct Flags {
    directory: PathBuf,
    verbose: bool,
    concurrency: Option<usize>,
    config: Option<PathBuf>,
    front_matter_only: bool,
}

fn flags() -> Flags {
    let flags = xflags::parse_or_exit! {
        /// Log every processed file and list the results.
        optional -v,--verbose
        /// Number of worker threads. Defaults to a heuristic on input size.
        optional -c,--concurrency n: usize
        /// Configuration file. Defaults to `wren.toml` in the content directory.
        optional --config path: PathBuf
        /// Only extract front matter.
        optional --front-matter-only
        /// The content directory.
        required directory: PathBuf
    };

    Flags {
        directory: flags.directory,
        verbose: flags.verbose,
        concurrency: flags.concurrency,
        config: flags.config,
        front_matter_only: flags.front_matter_only,
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stdout)
        .with_target(false)
        .init();
}

fn report(ctx: &BuildCtx, contents: &[ProcessedContent]) {
    let mut tags: FxHashMap<&str, usize> = FxHashMap::default();
    for content in contents {
        let file_tags = content.file.data.frontmatter("tags")
            .and_then(|t| t.as_slice())
            .unwrap_or_default();

        for tag in file_tags.iter().filter_map(|t| t.as_str()) {
            *tags.entry(tag).or_default() += 1;
        }

        let date = get_date(&ctx.cfg, &content.file.data).ok().flatten();
        let links = content.file.data.get(Links).and_then(|l| l.ok()).map_or(0, |l| l.len());
        println!(
            "{:<10}  {:>3} links  {}",
            date.as_ref().map(format_date).unwrap_or_else(|| "-".into()),
            links,
            content.file.slug(),
        );
    }

    let mut tags: Vec<_> = tags.into_iter().collect();
    tags.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
    for (tag, count) in tags {
        println!("#{tag} ({count})");
    }
}

fn run(flags: Flags) -> Result<()> {
    let timer = PerfTimer::new();
    let cfg = config::load(&flags.directory, flags.config.as_deref())?;
    let discovery = discover(&flags.directory, &cfg.configuration.ignore_patterns)?;
    tracing::info!(
        "discovered {} markdown files, {} files total in {timer}",
        discovery.markdown.len(),
        discovery.all_slugs.len(),
    );

    let argv = Argv {
        directory: flags.directory,
        verbose: flags.verbose,
        concurrency: flags.concurrency,
    };

    let total = discovery.markdown.len();
    let ctx = BuildCtx::new(cfg, argv, discovery.all_slugs);
    let mut contents = quill::parse_markdown(&ctx, discovery.markdown, flags.front_matter_only)?;
    contents.sort_by(|a, b| a.file.slug().cmp(b.file.slug()));
    if flags.verbose {
        report(&ctx, &contents);
    }

    println!("processed {} of {total} files in {timer}", contents.len());
    Ok(())
}

pub fn main() {
    let flags = flags();
    init_logging(flags.verbose);
    SyntaxHighlighting::warm_up();

    if let Err(e) = run(flags) {
        println!("error: {e}");
        std::process::exit(1);
    }
}
