use std::path::Path;

use crate::error::{Chainable, ErrorDetail, Result};

/// A textual data format that can be deserialized with serde.
pub trait Format: Sized {
    /// The data format's error type.
    type Error: serde::de::Error + ErrorDetail + 'static;

    /// The name used in error messages.
    const NAME: &'static str;

    /// Parses `string` in this format as a `T`.
    fn from_str<T: serde::de::DeserializeOwned>(string: &str) -> Result<T, Self::Error>;

    /// Reads the file at `path` and parses it as a `T`.
    fn read<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
        let string = std::fs::read_to_string(path).chain_with(|| error! {
            "failed to open file for reading",
            "file path" => path.display(),
        })?;

        Self::from_str(&string).chain_with(|| error! {
            format!("invalid {}", Self::NAME),
            "file path" => path.display(),
        })
    }
}

macro_rules! impl_format {
    ($name:ident ($display:literal) : $func:expr, $E:ty) => (
        pub struct $name;

        impl Format for $name {
            type Error = $E;

            const NAME: &'static str = $display;

            fn from_str<T: serde::de::DeserializeOwned>(s: &str) -> Result<T, $E> {
                $func(s)
            }
        }
    );
}

impl_format!(Toml("TOML"): toml::from_str, toml::de::Error);
impl_format!(Json("JSON"): serde_json::from_str, serde_json::error::Error);
impl_format!(Yaml("YAML"): serde_yaml::from_str, serde_yaml::Error);
