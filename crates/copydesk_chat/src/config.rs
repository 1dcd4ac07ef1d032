//! Workspace configuration.
//!
//! Settings are read from `<workspace>/.copydesk/settings.json` when the file
//! exists, then overridden by `COPYDESK_*` environment variables.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ChatError, ChatResult};

/// Directory holding Copydesk state inside a workspace
pub const STATE_DIR: &str = ".copydesk";

const SETTINGS_FILE: &str = "settings.json";

/// Reference timeout for one generation request
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

const DEFAULT_RETRY_BACKOFF_MS: u64 = 1000;

/// Copydesk settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct CopydeskConfig {
    /// Generation webhook every chat turn is posted to
    pub webhook_url: Option<String>,
    pub request_timeout_secs: u64,
    /// Extra attempts after the first failed one (0 = single attempt)
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
    /// Base URL of the auth/profile service
    pub auth_url: Option<String>,
    pub auth_anon_key: Option<String>,
    /// Privileged key for account creation and deletion
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_service_key: Option<String>,
}

impl Default for CopydeskConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_retries: 0,
            retry_backoff_ms: DEFAULT_RETRY_BACKOFF_MS,
            auth_url: None,
            auth_anon_key: None,
            auth_service_key: None,
        }
    }
}

impl CopydeskConfig {
    /// Path of the settings file for a workspace
    pub fn settings_path(workspace_root: &Path) -> PathBuf {
        workspace_root.join(STATE_DIR).join(SETTINGS_FILE)
    }

    /// Load settings for a workspace, applying environment overrides
    pub fn load(workspace_root: impl AsRef<Path>) -> ChatResult<Self> {
        let mut config = Self::from_file(&Self::settings_path(workspace_root.as_ref()))?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Read a settings file; a missing file yields the defaults
    pub fn from_file(path: &Path) -> ChatResult<Self> {
        if !path.exists() {
            debug!("No settings file at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        let config = serde_json::from_str(&content)?;
        debug!("Loaded settings from {:?}", path);
        Ok(config)
    }

    /// Write settings to a file, creating parent directories
    pub fn save(&self, path: &Path) -> ChatResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Apply `COPYDESK_*` overrides from a variable lookup
    pub fn apply_overrides<F>(&mut self, lookup: F) -> ChatResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get("COPYDESK_WEBHOOK_URL") {
            self.webhook_url = Some(url);
        }
        if let Some(secs) = get("COPYDESK_TIMEOUT_SECS") {
            self.request_timeout_secs = parse_number("COPYDESK_TIMEOUT_SECS", &secs)?;
        }
        if let Some(retries) = get("COPYDESK_MAX_RETRIES") {
            self.max_retries = parse_number("COPYDESK_MAX_RETRIES", &retries)?;
        }
        if let Some(url) = get("COPYDESK_AUTH_URL") {
            self.auth_url = Some(url);
        }
        if let Some(key) = get("COPYDESK_AUTH_ANON_KEY") {
            self.auth_anon_key = Some(key);
        }
        if let Some(key) = get("COPYDESK_AUTH_SERVICE_KEY") {
            self.auth_service_key = Some(key);
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    /// The webhook URL, or a configuration error naming how to set it
    pub fn require_webhook_url(&self) -> ChatResult<&str> {
        self.webhook_url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| {
                ChatError::Config(
                    "generation webhook not configured. \
                     Set COPYDESK_WEBHOOK_URL or webhookUrl in .copydesk/settings.json"
                        .to_string(),
                )
            })
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> ChatResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| {
            ChatError::Config(format!(
                "{} must be a non-negative integer, got '{}'",
                key, value
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = CopydeskConfig::default();
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.max_retries, 0);
        assert!(config.require_webhook_url().is_err());
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp = tempdir().unwrap();
        let config =
            CopydeskConfig::from_file(&CopydeskConfig::settings_path(temp.path())).unwrap();
        assert_eq!(config, CopydeskConfig::default());
    }

    #[test]
    fn test_save_and_reload() {
        let temp = tempdir().unwrap();
        let path = CopydeskConfig::settings_path(temp.path());

        let config = CopydeskConfig {
            webhook_url: Some("https://hooks.example.com/agents-copy".to_string()),
            max_retries: 2,
            ..Default::default()
        };
        config.save(&path).unwrap();

        let loaded = CopydeskConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("settings.json");
        fs::write(&path, r#"{"webhookUrl": "http://localhost:9000/hook"}"#).unwrap();

        let config = CopydeskConfig::from_file(&path).unwrap();
        assert_eq!(config.require_webhook_url().unwrap(), "http://localhost:9000/hook");
        assert_eq!(config.request_timeout_secs, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = CopydeskConfig::default();
        config
            .apply_overrides(lookup(&[
                ("COPYDESK_WEBHOOK_URL", "http://env/hook"),
                ("COPYDESK_TIMEOUT_SECS", "5"),
                ("COPYDESK_MAX_RETRIES", "3"),
                ("COPYDESK_AUTH_URL", "http://auth"),
                ("COPYDESK_AUTH_ANON_KEY", ""),
            ]))
            .unwrap();

        assert_eq!(config.webhook_url.as_deref(), Some("http://env/hook"));
        assert_eq!(config.request_timeout_secs, 5);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.auth_url.as_deref(), Some("http://auth"));
        assert!(config.auth_anon_key.is_none());
    }

    #[test]
    fn test_invalid_number_override() {
        let mut config = CopydeskConfig::default();
        let result = config.apply_overrides(lookup(&[("COPYDESK_TIMEOUT_SECS", "soon")]));
        assert!(matches!(result, Err(ChatError::Config(_))));
    }
}
