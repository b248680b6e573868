//! File and environment based configuration of a sync run.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::core::cache::DEFAULT_CACHE_SIZE;
use crate::core::options::{
    SyncOptionsBuilder, DEFAULT_BATCH_SIZE, DEFAULT_MAX_RETRIES, DEFAULT_PARALLELISM,
};
use crate::core::service::ResourceKind;

/// Numeric settings of a sync run.
///
/// ```yaml
/// batch_size: 50
/// cache_size: 20000
/// max_retries: 2
/// parallelism: 4
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_cache_size")]
    pub cache_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_cache_size() -> usize {
    DEFAULT_CACHE_SIZE
}

fn default_max_retries() -> usize {
    DEFAULT_MAX_RETRIES
}

fn default_parallelism() -> usize {
    DEFAULT_PARALLELISM
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            cache_size: default_cache_size(),
            max_retries: default_max_retries(),
            parallelism: default_parallelism(),
        }
    }
}

impl SyncConfig {
    /// Loads a YAML file, or JSON when the extension is `.json`.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read sync config {}", path.display()))?;

        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        if is_json {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse sync config {}", path.display()))
        } else {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse sync config {}", path.display()))
        }
    }

    /// Applies `CTSYNC_*` variables from the process environment.
    pub fn apply_env_overrides(self) -> Result<Self> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Applies overrides from `lookup`, keyed by variable name.
    pub fn apply_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let parse = |name: &str| -> Result<Option<usize>> {
            lookup(name)
                .map(|value| {
                    value
                        .trim()
                        .parse::<usize>()
                        .with_context(|| format!("{name} must be a positive integer, got '{value}'"))
                })
                .transpose()
        };

        if let Some(value) = parse("CTSYNC_BATCH_SIZE")? {
            self.batch_size = value;
        }
        if let Some(value) = parse("CTSYNC_CACHE_SIZE")? {
            self.cache_size = value;
        }
        if let Some(value) = parse("CTSYNC_MAX_RETRIES")? {
            self.max_retries = value;
        }
        if let Some(value) = parse("CTSYNC_PARALLELISM")? {
            self.parallelism = value;
        }
        Ok(self)
    }

    /// Options builder preset with these settings.
    pub fn to_builder<R: ResourceKind>(&self) -> SyncOptionsBuilder<R> {
        SyncOptionsBuilder::new()
            .batch_size(self.batch_size)
            .cache_size(self.cache_size)
            .max_retries(self.max_retries)
            .parallelism(self.parallelism)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::CategoryResource;
    use std::collections::HashMap;

    fn write_temp(name: &str, content: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("ctsync-{}-{name}", std::process::id()));
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn yaml_with_partial_settings_uses_defaults() {
        let path = write_temp("partial.yaml", "batch_size: 50\nparallelism: 4\n");
        let config = SyncConfig::load_from_file(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(config.batch_size, 50);
        assert_eq!(config.parallelism, 4);
        assert_eq!(config.cache_size, 10_000);
        assert_eq!(config.max_retries, 1);
    }

    #[test]
    fn json_by_extension() {
        let path = write_temp("config.json", r#"{"max_retries": 3}"#);
        let config = SyncConfig::load_from_file(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(config.max_retries, 3);
        assert_eq!(config.batch_size, 30);
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = SyncConfig::load_from_file(Path::new("/nonexistent/ctsync.yaml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/ctsync.yaml"));
    }

    #[test]
    fn overrides_replace_values() {
        let env: HashMap<&str, &str> = [("CTSYNC_BATCH_SIZE", "10"), ("CTSYNC_CACHE_SIZE", " 64 ")]
            .into_iter()
            .collect();
        let config = SyncConfig::default()
            .apply_overrides(|name| env.get(name).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.batch_size, 10);
        assert_eq!(config.cache_size, 64);
        assert_eq!(config.parallelism, 1);
    }

    #[test]
    fn invalid_override_is_an_error() {
        let result = SyncConfig::default().apply_overrides(|name| {
            (name == "CTSYNC_PARALLELISM").then(|| "many".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn builder_ignores_zero_from_config() {
        let config = SyncConfig {
            batch_size: 0,
            ..SyncConfig::default()
        };
        let options = config.to_builder::<CategoryResource>().build();
        assert_eq!(options.batch_size, 30);
    }
}
