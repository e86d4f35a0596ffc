pub mod mdast;
pub mod hast;
mod convert;

pub use convert::{to_hast, ConvertOptions};
