//! Agentflow Configuration
//!
//! Loads the client configuration once at startup from
//! `~/.agentflow/agentflow.json`, then applies `AGENTFLOW_*` environment
//! overrides. Components receive the resulting struct by reference and
//! never read the environment themselves.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Config file name within the agentflow directory.
const CONFIG_FILENAME: &str = "agentflow.json";

/// Default poll interval for run status checks, in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Project endpoint URL of the agent service.
    pub endpoint: String,
    /// API key sent in the Authorization header.
    pub api_key: String,
    /// Model deployment name used when creating agents.
    pub model_deployment: String,
    /// Interval between run status fetches.
    pub poll_interval_ms: u64,
    /// Optional ceiling on how long to wait for a run, in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_wait_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            model_deployment: String::new(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            max_wait_secs: None,
        }
    }
}

impl Config {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn max_wait(&self) -> Option<Duration> {
        self.max_wait_secs.map(Duration::from_secs)
    }

    /// Fails unless the fields required to reach the service are set.
    pub fn validate(&self) -> Result<()> {
        if self.endpoint.is_empty() {
            anyhow::bail!(
                "No endpoint configured. Set AGENTFLOW_ENDPOINT or add \"endpoint\" to {}",
                config_path().display()
            );
        }
        if self.model_deployment.is_empty() {
            anyhow::bail!(
                "No model deployment configured. Set AGENTFLOW_MODEL or add \"modelDeployment\" to {}",
                config_path().display()
            );
        }
        Ok(())
    }
}

/// Returns the agentflow config directory: `~/.agentflow`.
pub fn agentflow_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("/root"))
        .join(".agentflow")
}

/// Returns the full path to the config file: `~/.agentflow/agentflow.json`.
pub fn config_path() -> PathBuf {
    agentflow_dir().join(CONFIG_FILENAME)
}

/// Load the configuration: file first (if present), then environment
/// overrides. Zero-valued numeric fields fall back to defaults.
pub fn load_config() -> Result<Config> {
    let mut config = match fs::read_to_string(config_path()) {
        Ok(contents) => serde_json::from_str::<Config>(&contents)
            .with_context(|| format!("Failed to parse {}", config_path().display()))?,
        Err(_) => Config::default(),
    };

    if config.poll_interval_ms == 0 {
        config.poll_interval_ms = DEFAULT_POLL_INTERVAL_MS;
    }

    apply_env_overrides(&mut config, |name| std::env::var(name).ok());
    Ok(config)
}

/// Apply `AGENTFLOW_*` overrides from the given lookup function. Split out
/// from `load_config` so tests do not have to mutate the process env.
fn apply_env_overrides(config: &mut Config, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("AGENTFLOW_ENDPOINT") {
        config.endpoint = v;
    }
    if let Some(v) = var("AGENTFLOW_API_KEY") {
        config.api_key = v;
    }
    if let Some(v) = var("AGENTFLOW_MODEL") {
        config.model_deployment = v;
    }
    if let Some(v) = var("AGENTFLOW_POLL_INTERVAL_MS") {
        if let Ok(ms) = v.parse::<u64>() {
            if ms > 0 {
                config.poll_interval_ms = ms;
            }
        }
    }
    if let Some(v) = var("AGENTFLOW_MAX_WAIT_SECS") {
        if let Ok(secs) = v.parse::<u64>() {
            config.max_wait_secs = Some(secs);
        }
    }
}

/// Save the configuration to `~/.agentflow/agentflow.json`.
///
/// Creates the directory with mode 0o700 if needed. The file is written
/// with mode 0o600 since it may contain an API key.
pub fn save_config(config: &Config) -> Result<()> {
    let dir = agentflow_dir();
    if !dir.exists() {
        fs::create_dir_all(&dir).context("Failed to create agentflow directory")?;
        fs::set_permissions(&dir, fs::Permissions::from_mode(0o700))?;
    }

    let path = config_path();
    let json = serde_json::to_string_pretty(config).context("Failed to serialize config")?;

    fs::write(&path, &json).context("Failed to write config file")?;
    fs::set_permissions(&path, fs::Permissions::from_mode(0o600))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.poll_interval_ms, 500);
        assert!(config.max_wait_secs.is_none());
        assert!(config.validate().is_err());
    }

    #[test]
    fn env_overrides_take_precedence() {
        let mut config = Config {
            endpoint: "https://file.example".to_string(),
            ..Config::default()
        };

        let env: HashMap<&str, &str> = [
            ("AGENTFLOW_ENDPOINT", "https://env.example"),
            ("AGENTFLOW_API_KEY", "key-123"),
            ("AGENTFLOW_MODEL", "gpt-4o-mini"),
            ("AGENTFLOW_POLL_INTERVAL_MS", "250"),
            ("AGENTFLOW_MAX_WAIT_SECS", "60"),
        ]
        .into_iter()
        .collect();

        apply_env_overrides(&mut config, |name| env.get(name).map(|v| v.to_string()));

        assert_eq!(config.endpoint, "https://env.example");
        assert_eq!(config.api_key, "key-123");
        assert_eq!(config.model_deployment, "gpt-4o-mini");
        assert_eq!(config.poll_interval_ms, 250);
        assert_eq!(config.max_wait_secs, Some(60));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn bad_numeric_overrides_are_ignored() {
        let mut config = Config::default();
        let env: HashMap<&str, &str> =
            [("AGENTFLOW_POLL_INTERVAL_MS", "zero")].into_iter().collect();

        apply_env_overrides(&mut config, |name| env.get(name).map(|v| v.to_string()));
        assert_eq!(config.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS);
    }

    #[test]
    fn config_json_round_trip() {
        let config = Config {
            endpoint: "https://svc.example/api/projects/demo".to_string(),
            api_key: "key".to_string(),
            model_deployment: "gpt-4o".to_string(),
            poll_interval_ms: 500,
            max_wait_secs: Some(120),
        };

        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("modelDeployment"));

        let parsed: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.endpoint, config.endpoint);
        assert_eq!(parsed.max_wait_secs, Some(120));
    }
}
