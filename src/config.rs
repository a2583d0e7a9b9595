//! Configuration loader and validator for the Prep101 client.
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::error::ClientError;

pub const DEFAULT_MAX_FILE_BYTES: u64 = 10 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub api: Api,
    pub app: App,
    #[serde(default)]
    pub upload: Upload,
}

/// Backend connection settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Api {
    pub base_url: String,
    #[serde(default = "default_generate_timeout")]
    pub generate_timeout_seconds: u64,
}

/// Local directories and delivery pacing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    pub data_dir: String,
    pub output_dir: String,
    #[serde(default = "default_child_delay")]
    pub child_guide_delay_ms: u64,
    /// Hand finished guides to the desktop's default viewer.
    #[serde(default)]
    pub launch_viewer: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Upload {
    pub max_file_bytes: u64,
}

impl Default for Upload {
    fn default() -> Self {
        Self {
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
        }
    }
}

fn default_generate_timeout() -> u64 {
    300
}

fn default_child_delay() -> u64 {
    1000
}

impl Config {
    /// Ensure required directories exist.
    pub fn ensure_dirs(&self) -> Result<(), std::io::Error> {
        fs::create_dir_all(&self.app.data_dir)?;
        fs::create_dir_all(&self.app.output_dir)
    }

    /// Base URL with a trailing slash so relative joins keep any path prefix.
    pub fn api_base_url(&self) -> Result<Url, ClientError> {
        let mut raw = self.api.base_url.trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        Url::parse(&raw).map_err(|_| ClientError::Invalid("api.base_url is not a valid URL"))
    }

    pub fn generate_timeout(&self) -> Duration {
        Duration::from_secs(self.api.generate_timeout_seconds)
    }

    pub fn child_guide_delay(&self) -> Duration {
        Duration::from_millis(self.app.child_guide_delay_ms)
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&content)?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.api.base_url.trim().is_empty() {
        return Err(ConfigError::Invalid("api.base_url must be non-empty"));
    }
    if cfg.api_base_url().is_err() {
        return Err(ConfigError::Invalid("api.base_url must be a valid URL"));
    }
    if cfg.api.generate_timeout_seconds == 0 {
        return Err(ConfigError::Invalid("api.generate_timeout_seconds must be > 0"));
    }
    if cfg.app.data_dir.trim().is_empty() {
        return Err(ConfigError::Invalid("app.data_dir must be non-empty"));
    }
    if cfg.app.output_dir.trim().is_empty() {
        return Err(ConfigError::Invalid("app.output_dir must be non-empty"));
    }
    if cfg.upload.max_file_bytes == 0 {
        return Err(ConfigError::Invalid("upload.max_file_bytes must be > 0"));
    }
    Ok(())
}

/// Example YAML written by `prep101 init`.
pub fn example() -> &'static str {
    r#"api:
  base_url: "http://localhost:3001/"
  generate_timeout_seconds: 300

app:
  data_dir: "./data"
  output_dir: "./guides"
  child_guide_delay_ms: 1000
  launch_viewer: false

upload:
  max_file_bytes: 10485760
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn parse_example_ok() {
        let cfg: Config = serde_yaml::from_str(example()).unwrap();
        validate(&cfg).unwrap();
        assert_eq!(cfg.generate_timeout(), Duration::from_secs(300));
        assert_eq!(cfg.child_guide_delay(), Duration::from_secs(1));
        assert_eq!(cfg.upload.max_file_bytes, DEFAULT_MAX_FILE_BYTES);
    }

    #[test]
    fn defaults_apply_when_omitted() {
        let cfg: Config = serde_yaml::from_str(
            "api:\n  base_url: \"https://prep101.test\"\napp:\n  data_dir: d\n  output_dir: o\n",
        )
        .unwrap();
        validate(&cfg).unwrap();
        assert_eq!(cfg.api.generate_timeout_seconds, 300);
        assert_eq!(cfg.app.child_guide_delay_ms, 1000);
        assert!(!cfg.app.launch_viewer);
        assert_eq!(cfg.upload.max_file_bytes, DEFAULT_MAX_FILE_BYTES);
    }

    #[test]
    fn base_url_gets_trailing_slash() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.api.base_url = "https://prep101.test/backend".into();
        let url = cfg.api_base_url().unwrap();
        assert_eq!(
            url.join("api/upload").unwrap().as_str(),
            "https://prep101.test/backend/api/upload"
        );
    }

    #[test]
    fn invalid_base_url() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.api.base_url = "".into();
        let err = validate(&cfg).unwrap_err();
        match err { ConfigError::Invalid(msg) => assert!(msg.contains("api.base_url")), _ => panic!("wrong error") }

        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.api.base_url = "not a url".into();
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn invalid_limits() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.api.generate_timeout_seconds = 0;
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));

        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.upload.max_file_bytes = 0;
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));

        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.app.output_dir = " ".into();
        let err = validate(&cfg).unwrap_err();
        match err { ConfigError::Invalid(msg) => assert!(msg.contains("output_dir")), _ => panic!("wrong error") }
    }

    #[test]
    fn ensure_dirs_creates_both() {
        let td = tempdir().unwrap();
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.app.data_dir = td.path().join("data").to_string_lossy().to_string();
        cfg.app.output_dir = td.path().join("guides").to_string_lossy().to_string();
        cfg.ensure_dirs().unwrap();
        assert!(td.path().join("data").exists());
        assert!(td.path().join("guides").exists());
    }

    #[test]
    fn load_from_file_ok() {
        let td = tempdir().unwrap();
        let p = td.path().join("config.yaml");
        fs::write(&p, example()).unwrap();
        let cfg = load(Some(&p)).unwrap();
        assert_eq!(cfg.api.base_url, "http://localhost:3001/");
    }
}
