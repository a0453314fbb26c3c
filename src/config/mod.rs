//! Configuration for moneta
//!
//! Settings live in `<config_dir>/moneta/config.toml`; a missing file means
//! defaults. API keys can also come from `MONETA_API_KEY` /
//! `MONETA_REMOTE_KEY`, which take precedence over the file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub llm: LlmSettings,
    pub remote: RemoteSettings,
    pub data: DataSettings,
}

/// Chat-completions endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub max_tokens: usize,
    pub temperature: f32,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            model: "gpt-4o-mini".to_string(),
            max_tokens: 4096,
            temperature: 0.7,
        }
    }
}

/// Hosted fuzzy-search backend settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RemoteSettings {
    pub base_url: String,
    pub api_key: String,
    pub enabled: bool,
}

/// Local data feed settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DataSettings {
    pub transactions_path: Option<PathBuf>,
    pub year: Option<i32>,
}

impl Config {
    /// Load from the default location, tolerating an absent file
    pub fn load() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default().with_env_overrides()),
        }
    }

    /// Load from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: Config = toml::from_str(&raw)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        Ok(config.with_env_overrides())
    }

    pub fn default_path() -> Option<PathBuf> {
        Some(dirs::config_dir()?.join("moneta").join("config.toml"))
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(key) = std::env::var("MONETA_API_KEY") {
            if !key.is_empty() {
                self.llm.api_key = key;
            }
        }
        if let Ok(key) = std::env::var("MONETA_REMOTE_KEY") {
            if !key.is_empty() {
                self.remote.api_key = key;
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert!((config.llm.temperature - 0.7).abs() < f32::EPSILON);
        assert!(!config.remote.enabled);
        assert!(config.data.transactions_path.is_none());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[llm]\nmodel = \"qwen-plus\"\nbase_url = \"https://dashscope.example.com/v1\"\n\n[remote]\nenabled = true"
        )
        .unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.llm.model, "qwen-plus");
        assert_eq!(config.llm.max_tokens, 4096);
        assert!(config.remote.enabled);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[llm\nmodel=").unwrap();
        assert!(Config::load_from(file.path()).is_err());
    }
}
