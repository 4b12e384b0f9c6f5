//! Shared configuration for meshplan tools.
//!
//! TOML settings layered with `MESHPLAN_` environment overrides, and
//! translation into `meshplan_core::SyncConfig`. The CLI adds flag-aware
//! wrappers on top.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use meshplan_core::SyncConfig;

/// Environment variable that overrides the config file location.
pub const CONFIG_PATH_ENV: &str = "MESHPLAN_CONFIG";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Project file used when `--project` is not given.
    pub default_project: Option<PathBuf>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Backend sync side channel.
    #[serde(default)]
    pub sync: SyncSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_project: Some(PathBuf::from("meshplan.json")),
            defaults: Defaults::default(),
            sync: SyncSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}

/// Where (and whether) topology changes are mirrored.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SyncSettings {
    #[serde(default)]
    pub enabled: bool,

    /// Backend API base, e.g. "http://localhost:3000/api".
    pub url: Option<String>,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            url: None,
            timeout_secs: default_timeout(),
        }
    }
}

fn default_timeout() -> u64 {
    10
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path: `MESHPLAN_CONFIG`, else platform conventions.
pub fn config_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_PATH_ENV).filter(|p| !p.is_empty()) {
        return PathBuf::from(path);
    }
    ProjectDirs::from("com", "meshplan", "meshplan").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("meshplan");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file, still honoring `MESHPLAN_` env overrides
/// (`MESHPLAN_SYNC__URL` sets `sync.url`).
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("MESHPLAN_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist or is broken.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Runtime translation ─────────────────────────────────────────────

/// Build the sync configuration, if sync is wanted.
///
/// An explicit `url_override` (the CLI's `--sync-url`) always enables sync.
/// Otherwise sync runs only when `sync.enabled` is set, and then requires
/// `sync.url`.
pub fn resolve_sync(
    config: &Config,
    url_override: Option<&str>,
) -> Result<Option<SyncConfig>, ConfigError> {
    let url = match url_override {
        Some(url) => url,
        None if config.sync.enabled => {
            config
                .sync
                .url
                .as_deref()
                .ok_or_else(|| ConfigError::Validation {
                    field: "sync.url".into(),
                    reason: "sync is enabled but no URL is configured".into(),
                })?
        }
        None => return Ok(None),
    };

    let parsed: url::Url = url.parse().map_err(|_| ConfigError::Validation {
        field: "sync.url".into(),
        reason: format!("invalid URL: {url}"),
    })?;

    Ok(Some(
        SyncConfig::new(parsed).with_timeout(Duration::from_secs(config.sync.timeout_secs)),
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config.defaults.output, "table");
        assert_eq!(config.sync.timeout_secs, 10);
        assert!(!config.sync.enabled);
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
default_project = "/srv/plans/hq.json"

[defaults]
output = "json"

[sync]
enabled = true
url = "http://localhost:3000/api"
"#,
        )
        .unwrap();

        let config = load_config_from(&path).unwrap();
        assert_eq!(config.default_project, Some(PathBuf::from("/srv/plans/hq.json")));
        assert_eq!(config.defaults.output, "json");
        assert_eq!(config.defaults.color, "auto");
        assert!(config.sync.enabled);
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.sync.url = Some("http://backend:3000/api".into());
        config.sync.timeout_secs = 3;

        save_config_to(&config, &path).unwrap();
        assert_eq!(load_config_from(&path).unwrap(), config);
    }

    #[test]
    fn sync_disabled_resolves_to_none() {
        let config = Config::default();
        assert!(resolve_sync(&config, None).unwrap().is_none());
    }

    #[test]
    fn sync_override_wins() {
        let config = Config::default();
        let sync = resolve_sync(&config, Some("http://override:1/api"))
            .unwrap()
            .unwrap();
        assert_eq!(sync.url.as_str(), "http://override:1/api");
        assert_eq!(sync.timeout, Duration::from_secs(10));
    }

    #[test]
    fn sync_enabled_without_url_is_invalid() {
        let mut config = Config::default();
        config.sync.enabled = true;
        assert!(matches!(
            resolve_sync(&config, None),
            Err(ConfigError::Validation { .. })
        ));

        config.sync.url = Some("not a url".into());
        assert!(resolve_sync(&config, None).is_err());
    }
}
