use anyhow::{Context, Result};
use graphkit::{Cloud, GraphConfig, RetryConfig};
use reconcile::OverwritePolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_FILE: &str = "config.toml";

/// Get the config directory path
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".config").join("intune-import"))
}

/// Resolve the config file path, honoring an explicit override
pub fn config_path(explicit: Option<&str>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(PathBuf::from(shellexpand::tilde(path).as_ref())),
        None => Ok(config_dir()?.join(CONFIG_FILE)),
    }
}

// ============================================================================
// Application Config
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub graph: GraphSection,
    pub import: ImportSection,
    pub retry: RetrySection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphSection {
    pub cloud: Cloud,
    pub api_version: String,
    /// Environment variable holding the bearer token
    pub token_env: String,
    pub timeout_secs: u64,
}

impl Default for GraphSection {
    fn default() -> Self {
        Self {
            cloud: Cloud::Global,
            api_version: "beta".to_string(),
            token_env: "GRAPH_TOKEN".to_string(),
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportSection {
    pub policy: OverwritePolicy,
    pub jobs: usize,
}

impl Default for ImportSection {
    fn default() -> Self {
        Self {
            policy: OverwritePolicy::Discard,
            jobs: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySection {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
        }
    }
}

impl AppConfig {
    /// Load the config file, falling back to defaults when it does not exist
    pub fn load(explicit: Option<&str>) -> Result<Self> {
        let path = config_path(explicit)?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Invalid config format in {}", path.display()))
    }

    /// Render the effective configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }

    pub fn graph_config(&self) -> GraphConfig {
        GraphConfig {
            cloud: self.graph.cloud,
            api_version: self.graph.api_version.clone(),
            timeout: Duration::from_secs(self.graph.timeout_secs),
        }
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::new(
            self.retry.max_attempts,
            Duration::from_millis(self.retry.base_delay_ms),
            Duration::from_millis(self.retry.max_delay_ms),
        )
    }

    /// Read the access token from the configured environment variable
    pub fn token(&self) -> Result<String> {
        let var = &self.graph.token_env;
        std::env::var(var)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .with_context(|| format!("No access token found: set the {} environment variable", var))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = AppConfig::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.graph.token_env, "GRAPH_TOKEN");
        assert_eq!(config.import.policy, OverwritePolicy::Discard);
        assert_eq!(config.import.jobs, 1);
        assert_eq!(config.retry.max_attempts, 4);
    }

    #[test]
    fn test_partial_file_merges_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
[graph]
cloud = "us-government"

[import]
policy = "overwrite-by-name"
jobs = 4
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.graph.cloud, Cloud::UsGovernment);
        assert_eq!(config.graph.api_version, "beta");
        assert_eq!(config.import.policy, OverwritePolicy::OverwriteByName);
        assert_eq!(config.import.jobs, 4);
        assert_eq!(config.retry, RetrySection::default());
        assert_eq!(
            config.graph_config().base_url(),
            "https://graph.microsoft.us/beta"
        );
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[import]\npolicy = \"sometimes\"\n").unwrap();

        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Invalid config format"));
    }

    #[test]
    fn test_round_trips_through_toml() {
        let config = AppConfig::default();
        let text = config.to_toml().unwrap();
        assert!(text.contains("token_env = \"GRAPH_TOKEN\""));
        assert_eq!(toml::from_str::<AppConfig>(&text).unwrap(), config);
    }

    #[test]
    fn test_retry_config_conversion() {
        let retry = AppConfig::default().retry_config();
        assert_eq!(retry.max_attempts, 4);
        assert_eq!(retry.base_delay, Duration::from_secs(1));
        assert_eq!(retry.max_delay, Duration::from_secs(30));
    }

    #[test]
    fn test_explicit_path_is_used() {
        let path = config_path(Some("/tmp/custom.toml")).unwrap();
        assert_eq!(path, PathBuf::from("/tmp/custom.toml"));
    }
}
