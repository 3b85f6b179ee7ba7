use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use khata_store::{FetchLimits, UploadConfig};
use serde::Deserialize;

/// Runtime configuration, from a TOML file with environment overrides.
/// Every field has a default, so a bare `khata import file.csv --dry-run`
/// works with no config at all.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub classifier: ClassifierConfig,
    pub import: ImportSettings,
    pub fetch: FetchSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub token: String,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            token: String::new(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// No endpoint means the import runs on heuristic categories alone.
    pub endpoint: Option<String>,
    pub token: Option<String>,
    pub timeout_secs: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            token: None,
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ImportSettings {
    pub chunk_rows: usize,
    pub upload_chunk_size: usize,
    pub upload_concurrency: usize,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            chunk_rows: 500,
            upload_chunk_size: 500,
            upload_concurrency: 4,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    pub page_size: u32,
    pub max_rows: Option<u64>,
    pub max_duration_secs: u64,
    pub page_timeout_secs: u64,
    pub cache_ttl_secs: u64,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            page_size: 1000,
            max_rows: Some(100_000),
            max_duration_secs: 30,
            page_timeout_secs: 10,
            cache_ttl_secs: 60,
        }
    }
}

impl Config {
    /// Load from `path` when given, otherwise start from defaults; then
    /// apply `KHATA_*` environment overrides.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config {}", path.display()))?;
                toml::from_str(&text)
                    .with_context(|| format!("parsing config {}", path.display()))?
            }
            None => Config::default(),
        };

        if let Ok(url) = std::env::var("KHATA_API_URL") {
            config.api.base_url = url;
        }
        if let Ok(token) = std::env::var("KHATA_API_TOKEN") {
            config.api.token = token;
        }
        if let Ok(endpoint) = std::env::var("KHATA_CLASSIFIER_URL") {
            config.classifier.endpoint = Some(endpoint);
        }
        if let Ok(token) = std::env::var("KHATA_CLASSIFIER_TOKEN") {
            config.classifier.token = Some(token);
        }

        Ok(config)
    }

    pub fn fetch_limits(&self) -> FetchLimits {
        FetchLimits {
            page_size: self.fetch.page_size,
            max_rows: self.fetch.max_rows,
            max_pages: None,
            max_duration: Some(Duration::from_secs(self.fetch.max_duration_secs)),
            page_timeout: Duration::from_secs(self.fetch.page_timeout_secs),
        }
    }

    pub fn upload_config(&self) -> UploadConfig {
        UploadConfig {
            chunk_size: self.import.upload_chunk_size,
            concurrency: self.import.upload_concurrency,
        }
    }

    pub fn classifier_timeout(&self) -> Duration {
        Duration::from_secs(self.classifier.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_usable_without_a_file() {
        let config = Config::default();
        assert_eq!(config.import.upload_concurrency, 4);
        assert_eq!(config.fetch.page_size, 1000);
        assert!(config.classifier.endpoint.is_none());
    }

    #[test]
    fn partial_toml_keeps_defaults_for_the_rest() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[import]\nupload_chunk_size = 2000\n\n[api]\nbase_url = \"https://api.example.com\""
        )
        .unwrap();
        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.import.upload_chunk_size, 2000);
        assert_eq!(config.import.upload_concurrency, 4);
        assert_eq!(config.api.base_url, "https://api.example.com");
    }

    #[test]
    fn malformed_toml_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "not [valid toml").unwrap();
        assert!(Config::load(Some(file.path())).is_err());
    }
}
