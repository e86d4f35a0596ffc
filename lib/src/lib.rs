#![doc = svgbobdoc::transform!(
//! A parallel markdown content pipeline for static site generators.
//!
//! # Overview
//!
//! Quill turns a directory of markdown files into processed content: an HTML
//! tree per file plus a bag of metadata (front matter, dates, links, a table
//! of contents, a description) attached by a configurable chain of
//! transformers. It does not render pages, themes or navigation; it produces
//! the content those are built from.
//!
//! A build flows through the following stages:
//!
//! ```svgbob
//!   +-----------+     +---------+     +-------------------------------------+
//!   | discover  |---->| plan    |---->| single-threaded: FileParser         |
//!   | (jwalk)   |     | Strategy|     |   or                                |
//!   +-----------+     +---------+     | pooled: chunks -> WorkerPool        |
//!                                     +------------------+------------------+
//!                                                        |
//!                                                        v
//!   +------------------------------------------------------------------------+
//!   | per file:                                                              |
//!   |  read -> text transforms -> parse (mdast) -> markdown passes           |
//!   |       -> convert (hast) -> external links -> html passes               |
//!   +------------------------------------------------------------------------+
//!                                                        |
//!                                                        v
//!                                             +---------------------+
//!                                             | ProcessedContent[]  |
//!                                             +---------------------+
//! ```
//!
//! ## Transformers
//!
//! A [`Transformer`](plugin::Transformer) takes part in any of three phases,
//! declared through its [`Hooks`](plugin::Hooks):
//!
//!   * **text**: rewrites raw file text before parsing.
//!   * **markdown**: passes over the markdown syntax tree.
//!   * **html**: passes over the HTML syntax tree.
//!
//! Transformers are named in [`Config`](config::Config) and instantiated by a
//! [`Registry`](plugin::Registry). A [`Processor`](pipeline::Processor) is
//! composed once per batch of files and reused for every file in it.
//!
//! ## Scheduling
//!
//! [`parse_markdown()`](scheduler::parse_markdown) runs small inputs on the
//! calling thread. Larger inputs are split into chunks of
//! [`CHUNK_SIZE`](scheduler::CHUNK_SIZE) files and dispatched to a
//! [`WorkerPool`](worker::WorkerPool). Each worker rebuilds its own pipeline
//! from the serialized configuration it is sent. A file that fails is logged
//! and dropped; a chunk that fails aborts the batch.
)]

#[macro_use]
pub mod error;
pub mod util;
pub mod value;
pub mod file;
pub mod config;
pub mod ctx;
pub mod tree;
pub mod plugin;
pub mod plugins;
pub mod pipeline;
pub mod parser;
pub mod worker;
pub mod scheduler;
pub mod discover;

pub use config::Config;
pub use ctx::{Argv, BuildCtx};
pub use discover::{discover, Discovery};
pub use file::{Data, ProcessedContent, SourceFile};
pub use pipeline::Processor;
pub use plugin::{Registry, Transformer};
pub use scheduler::{parse_markdown, try_parse_markdown, BatchError};

pub use rayon;
