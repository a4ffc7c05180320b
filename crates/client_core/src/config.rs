use std::{collections::HashMap, fs, path::Path, time::Duration};

use anyhow::Context;
use thiserror::Error;
use url::Url;

use crate::session::RedirectDelays;

pub const DEFAULT_SETTINGS_FILE: &str = "client.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub server_url: String,
    pub unauthenticated_redirect_ms: u64,
    pub expired_redirect_ms: u64,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:5296".into(),
            unauthenticated_redirect_ms: 1500,
            expired_redirect_ms: 2000,
        }
    }
}

impl ClientSettings {
    pub fn redirect_delays(&self) -> RedirectDelays {
        RedirectDelays {
            unauthenticated: Duration::from_millis(self.unauthenticated_redirect_ms),
            expired: Duration::from_millis(self.expired_redirect_ms),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    #[error("server url must not be empty")]
    EmptyServerUrl,
    #[error("server url must use http:// or https:// and include a host: {0}")]
    InvalidServerUrl(String),
}

/// Defaults, then `client.toml` in the working directory, then environment.
pub fn load_settings() -> anyhow::Result<ClientSettings> {
    let mut settings = ClientSettings::default();
    let path = Path::new(DEFAULT_SETTINGS_FILE);
    if path.exists() {
        apply_file(&mut settings, path)?;
    }
    apply_overrides(&mut settings, |key| std::env::var(key).ok());
    settings.server_url = normalize_server_url(&settings.server_url)?;
    Ok(settings)
}

pub fn apply_file(settings: &mut ClientSettings, path: &Path) -> anyhow::Result<()> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read settings file '{}'", path.display()))?;
    let file_cfg = toml::from_str::<HashMap<String, toml::Value>>(&raw)
        .with_context(|| format!("failed to parse settings file '{}'", path.display()))?;
    apply_overrides(settings, |key| {
        let key = key.strip_prefix("APP__")?.to_ascii_lowercase();
        file_cfg.get(&key).map(|value| match value {
            toml::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    });
    Ok(())
}

/// Applies `APPOINTMENTS_SERVER_URL` / `APP__*` style keys read through
/// `lookup`. Unparseable numbers are ignored.
pub fn apply_overrides(settings: &mut ClientSettings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("APPOINTMENTS_SERVER_URL") {
        settings.server_url = v;
    }
    if let Some(v) = lookup("APP__SERVER_URL") {
        settings.server_url = v;
    }

    if let Some(parsed) = lookup("APP__UNAUTHENTICATED_REDIRECT_MS").and_then(|v| v.parse().ok()) {
        settings.unauthenticated_redirect_ms = parsed;
    }
    if let Some(parsed) = lookup("APP__EXPIRED_REDIRECT_MS").and_then(|v| v.parse().ok()) {
        settings.expired_redirect_ms = parsed;
    }
}

pub fn normalize_server_url(raw: &str) -> Result<String, SettingsError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(SettingsError::EmptyServerUrl);
    }

    let parsed =
        Url::parse(trimmed).map_err(|_| SettingsError::InvalidServerUrl(trimmed.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(SettingsError::InvalidServerUrl(trimmed.to_string()));
    }

    Ok(trimmed.to_string())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
