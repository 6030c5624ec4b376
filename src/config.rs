//! Application configuration (§6's ambient config note): built-in defaults,
//! merged with an optional `scholar.toml` in the working directory, then
//! overridden by `SCHOLAR_*` environment variables. Scaled-down version of
//! the teacher's `ProbeConfig`/`ResolvedConfig` split — partial, all-Option
//! raw config merged in increasing priority, then resolved into a plain
//! struct with every field filled in.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ScholarConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paths: Option<PathsConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<ServerConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crawler: Option<CrawlerConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PathsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classifier_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corpus_file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ServerConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bind_addr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_origins: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CrawlerConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_delay_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
}

/// Fully-resolved configuration: every field has a concrete value.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub index_file: PathBuf,
    pub classifier_file: PathBuf,
    pub corpus_file: PathBuf,
    pub bind_addr: String,
    pub allowed_origins: Vec<String>,
    pub crawl_concurrency: usize,
    pub crawl_min_delay_secs: u64,
    pub crawl_max_retries: u32,
}

impl ScholarConfig {
    /// Loads `scholar.toml` from the working directory (if present), then
    /// applies `SCHOLAR_*` environment variable overrides, then resolves to
    /// a `ResolvedConfig` with every default filled in. A missing or
    /// unreadable TOML file is not an error — only a malformed one is.
    pub fn load() -> Result<ResolvedConfig> {
        let mut merged = match Self::load_from_file(Path::new("scholar.toml")) {
            Ok(Some(config)) => config,
            Ok(None) => ScholarConfig::default(),
            Err(e) => return Err(e),
        };

        merged.apply_env_overrides();
        Ok(merged.resolve_with_defaults())
    }

    fn load_from_file(path: &Path) -> Result<Option<ScholarConfig>> {
        if !path.is_file() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {path:?}"))?;
        let config: ScholarConfig =
            toml::from_str(&raw).with_context(|| format!("parsing config file {path:?}"))?;
        Ok(Some(config))
    }

    fn apply_env_overrides(&mut self) {
        let paths = self.paths.get_or_insert(PathsConfig::default());
        if let Ok(val) = env::var("SCHOLAR_INDEX_FILE") {
            paths.index_file = Some(val);
        }
        if let Ok(val) = env::var("SCHOLAR_CLASSIFIER_FILE") {
            paths.classifier_file = Some(val);
        }
        if let Ok(val) = env::var("SCHOLAR_CORPUS_FILE") {
            paths.corpus_file = Some(val);
        }

        let server = self.server.get_or_insert(ServerConfig::default());
        if let Ok(val) = env::var("SCHOLAR_BIND_ADDR") {
            server.bind_addr = Some(val);
        }
        if let Ok(val) = env::var("SCHOLAR_ALLOWED_ORIGINS") {
            server.allowed_origins = Some(val.split(',').map(|s| s.trim().to_string()).collect());
        }

        let crawler = self.crawler.get_or_insert(CrawlerConfig::default());
        if let Ok(val) = env::var("SCHOLAR_CRAWL_CONCURRENCY") {
            if let Ok(n) = val.parse() {
                crawler.concurrency = Some(n);
            }
        }
        if let Ok(val) = env::var("SCHOLAR_CRAWL_MIN_DELAY_SECS") {
            if let Ok(n) = val.parse() {
                crawler.min_delay_secs = Some(n);
            }
        }
        if let Ok(val) = env::var("SCHOLAR_CRAWL_MAX_RETRIES") {
            if let Ok(n) = val.parse() {
                crawler.max_retries = Some(n);
            }
        }
    }

    fn resolve_with_defaults(self) -> ResolvedConfig {
        let paths = self.paths.unwrap_or_default();
        let server = self.server.unwrap_or_default();
        let crawler = self.crawler.unwrap_or_default();

        ResolvedConfig {
            index_file: PathBuf::from(paths.index_file.unwrap_or_else(|| "index.bin".to_string())),
            classifier_file: PathBuf::from(
                paths.classifier_file.unwrap_or_else(|| "classifier.bin".to_string()),
            ),
            corpus_file: PathBuf::from(paths.corpus_file.unwrap_or_else(|| "corpus.json".to_string())),
            bind_addr: server.bind_addr.unwrap_or_else(|| "127.0.0.1:8080".to_string()),
            allowed_origins: server.allowed_origins.unwrap_or_default(),
            crawl_concurrency: crawler.concurrency.unwrap_or(4),
            crawl_min_delay_secs: crawler.min_delay_secs.unwrap_or(2),
            crawl_max_retries: crawler.max_retries.unwrap_or(3),
        }
    }
}

impl ResolvedConfig {
    pub fn crawl_options(&self) -> crate::crawler::CrawlOptions {
        crate::crawler::CrawlOptions {
            concurrency: self.crawl_concurrency,
            min_delay: std::time::Duration::from_secs(self.crawl_min_delay_secs),
            max_retries: self.crawl_max_retries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_with_no_file_and_no_env() {
        let config = ScholarConfig::default().resolve_with_defaults();
        assert_eq!(config.index_file, PathBuf::from("index.bin"));
        assert_eq!(config.bind_addr, "127.0.0.1:8080");
        assert_eq!(config.crawl_concurrency, 4);
        assert_eq!(config.crawl_min_delay_secs, 2);
    }

    #[test]
    fn toml_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scholar.toml");
        std::fs::write(
            &path,
            "[paths]\nindex_file = \"custom_index.bin\"\n\n[server]\nbind_addr = \"0.0.0.0:9000\"\n",
        )
        .unwrap();

        let config = ScholarConfig::load_from_file(&path).unwrap().unwrap().resolve_with_defaults();
        assert_eq!(config.index_file, PathBuf::from("custom_index.bin"));
        assert_eq!(config.bind_addr, "0.0.0.0:9000");
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let result = ScholarConfig::load_from_file(Path::new("/nonexistent/scholar.toml")).unwrap();
        assert!(result.is_none());
    }
}
