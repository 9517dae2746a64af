//! Configuration file parser.
//!
//! Everything the pipeline needs — credentials, feed metadata, the cache
//! location — comes in through one explicit [`Config`] value; no component
//! reads ambient state. Unlike a preferences file, there are no usable
//! defaults for credentials, so a missing config file is an error.

use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level application configuration.
///
/// ```toml
/// cache_file = "overcast.opml"   # optional
///
/// [account]
/// email = "user@example.com"
/// password = "..."
///
/// [feed]
/// title = "Listening activity"
/// href = "https://example.com/activity.xml"
/// filename = "activity.xml"
/// ```
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Where the downloaded export is cached between runs.
    #[serde(default = "default_cache_file")]
    pub cache_file: PathBuf,
    pub account: Account,
    pub feed: FeedConfig,
}

/// Overcast account credentials.
///
/// The password is a [`SecretString`], so Debug output and logs show it
/// redacted.
#[derive(Debug, Deserialize)]
pub struct Account {
    pub email: String,
    pub password: SecretString,
}

/// Published feed metadata.
#[derive(Debug, Deserialize)]
pub struct FeedConfig {
    /// Channel title, also used as the channel description.
    pub title: String,
    /// Public URL of the published feed; used as the `atom:link` self URL
    /// and as the reconciliation fetch target.
    pub href: String,
    /// Path the feed document is written to.
    pub filename: PathBuf,
}

fn default_cache_file() -> PathBuf {
    PathBuf::from("overcast.opml")
}

impl Config {
    /// Loads configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        tracing::debug!(
            path = %path.display(),
            feed = %config.feed.title,
            "Loaded configuration"
        );
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    const FULL_CONFIG: &str = r#"
cache_file = "cache/export.opml"

[account]
email = "user@example.com"
password = "hunter2"

[feed]
title = "Listening activity"
href = "https://example.com/activity.xml"
filename = "out/activity.xml"
"#;

    fn write_config(name: &str, content: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(name);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("castlog.toml");
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_full_config() {
        let path = write_config("castlog_config_test_full", FULL_CONFIG);

        let config = Config::load(&path).unwrap();
        assert_eq!(config.cache_file, PathBuf::from("cache/export.opml"));
        assert_eq!(config.account.email, "user@example.com");
        assert_eq!(config.account.password.expose_secret(), "hunter2");
        assert_eq!(config.feed.title, "Listening activity");
        assert_eq!(config.feed.href, "https://example.com/activity.xml");
        assert_eq!(config.feed.filename, PathBuf::from("out/activity.xml"));

        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }

    #[test]
    fn test_cache_file_defaults() {
        let content = r#"
[account]
email = "user@example.com"
password = "hunter2"

[feed]
title = "Activity"
href = "https://example.com/a.xml"
filename = "a.xml"
"#;
        let path = write_config("castlog_config_test_default_cache", content);

        let config = Config::load(&path).unwrap();
        assert_eq!(config.cache_file, PathBuf::from("overcast.opml"));

        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }

    #[test]
    fn test_missing_file_is_error() {
        let result = Config::load(Path::new("/tmp/castlog_config_test_nonexistent.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_invalid_toml_is_error() {
        let path = write_config("castlog_config_test_invalid", "this is not [valid toml");

        let result = Config::load(&path);
        assert!(matches!(result, Err(ConfigError::Parse(_))));

        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }

    #[test]
    fn test_missing_credentials_is_error() {
        let content = r#"
[feed]
title = "Activity"
href = "https://example.com/a.xml"
filename = "a.xml"
"#;
        let path = write_config("castlog_config_test_no_account", content);

        assert!(matches!(Config::load(&path), Err(ConfigError::Parse(_))));

        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }

    #[test]
    fn test_debug_redacts_password() {
        let path = write_config("castlog_config_test_redact", FULL_CONFIG);

        let config = Config::load(&path).unwrap();
        let debug_output = format!("{config:?}");
        assert!(
            !debug_output.contains("hunter2"),
            "Debug output should not contain the password: {debug_output}"
        );

        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }
}
