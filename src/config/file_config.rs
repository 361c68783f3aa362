//! Loading configuration from TOML files and the environment.

use std::path::{Path, PathBuf};

use super::Config;

/// File name searched for in the working and user config directories
pub const CONFIG_FILE_NAME: &str = "catalog-search.toml";

/// Prefix of environment overrides
pub const ENV_PREFIX: &str = "CATALOG_SEARCH";

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config error: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Serialize error: {0}")]
    Serialize(String),
}

/// Find the config file: `./catalog-search.toml`, then the user config dir
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.is_file() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join("catalog-search").join(CONFIG_FILE_NAME))
        .filter(|path| path.is_file())
}

/// Load configuration from `path` (or the discovered file) plus environment
/// overrides. Missing keys take their defaults.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut builder = config::Config::builder();

    let path = path.map(Path::to_path_buf).or_else(find_config_file);
    if let Some(path) = &path {
        tracing::debug!("Loading config from {}", path.display());
        builder = builder.add_source(config::File::from(path.as_path()));
    }

    let settings = builder
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_config_file_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let toml_content = r#"
[catalog]
host = "library.example.ac.uk"
database = "MAIN*BIB"

[availability]
url = "http://aleph.example/X"
timeout_seconds = 4

[cache]
ttl_seconds = 60

[query]
stop_words = ["the", "of"]

[logging]
level = "debug"
"#;

        let mut file = File::create(&path).unwrap();
        file.write_all(toml_content.as_bytes()).unwrap();

        let config = load_config(Some(path.as_path())).unwrap();

        assert_eq!(config.catalog.host, "library.example.ac.uk");
        assert_eq!(config.catalog.port, 210);
        assert_eq!(
            config.availability.url.as_deref(),
            Some("http://aleph.example/X")
        );
        assert_eq!(config.availability.timeout_seconds, 4);
        assert_eq!(config.cache.ttl_seconds, 60);
        assert_eq!(
            config.query.stop_words(),
            ["the", "of"].into_iter().collect::<crate::models::StopWords>()
        );
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_config_file_nonexistent() {
        let path = PathBuf::from("/nonexistent/catalog-search.toml");
        assert!(load_config(Some(path.as_path())).is_err());
    }

    #[test]
    fn test_config_file_invalid_toml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("invalid.toml");

        std::fs::write(&path, "invalid = toml = content").unwrap();

        assert!(load_config(Some(path.as_path())).is_err());
    }
}
