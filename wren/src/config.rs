use std::path::Path;

use quill::config::Config;
use quill::error::Result;

/// Looked up in the content directory when no `--config` is given.
pub const CONFIG_FILE: &str = "wren.toml";

/// Reads `explicit` if given, else `CONFIG_FILE` in `directory` if it exists,
/// else the default configuration.
pub fn load(directory: &Path, explicit: Option<&Path>) -> Result<Config> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let path = directory.join(CONFIG_FILE);
            if !path.is_file() {
                tracing::debug!("no {CONFIG_FILE} in {}, using defaults", directory.display());
                return Ok(Config::default());
            }

            path
        }
    };

    let config = Config::read(&path)?;

    let transformers = config.transformer_names().collect::<Vec<_>>();
    tracing::debug!(path = %path.display(), ?transformers, "loaded configuration");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_defaults() {
        let dir = tempfile::Builder::new().prefix("wren-config").tempdir().unwrap();
        let config = load(dir.path(), None).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn reads_the_directory_config() {
        let dir = tempfile::Builder::new().prefix("wren-config").tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), r#"
            [configuration]
            page_title = "Garden"

            [[plugins.transformers]]
            name = "FrontMatter"
        "#).unwrap();

        let config = load(dir.path(), None).unwrap();
        assert_eq!(&*config.configuration.page_title, "Garden");
        assert_eq!(config.transformer_names().collect::<Vec<_>>(), ["FrontMatter"]);
    }

    #[test]
    fn explicit_config_must_exist() {
        let dir = tempfile::Builder::new().prefix("wren-config").tempdir().unwrap();
        let error = load(dir.path(), Some(&dir.path().join("missing.toml"))).unwrap_err();
        assert!(error.to_string().contains("failed to load configuration"));
    }
}
