//! Configuration module for the floodguard bot.
//!
//! Bot settings come from environment variables. Flood settings come from
//! an optional JSON file, overridden per field by environment variables,
//! and can be reloaded at runtime.

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use crate::guard::FloodSettings;

/// Errors raised while loading flood settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read flood settings from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid flood settings in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Bot running mode
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BotMode {
    #[default]
    Polling,
    Webhook,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    // Telegram
    pub bot_token: String,
    pub bot_mode: BotMode,
    pub webhook_url: Option<String>,
    pub webhook_port: u16,
    pub webhook_secret: Option<String>,

    /// Owner user IDs (comma-separated).
    /// Owners are never flood-checked and may reload settings anywhere.
    pub owner_ids: Vec<u64>,

    /// Language for system notices
    pub locale: String,

    /// How often expired mutes are swept
    pub sweep_interval: Duration,

    /// Optional JSON file with `max_messages`, `time_frame`, `mute_duration`
    pub flood_config_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Panics
    /// Panics if `BOT_TOKEN` is not set, or if webhook mode has no URL.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let bot_mode = match env::var("BOT_MODE")
            .unwrap_or_else(|_| "polling".to_string())
            .to_lowercase()
            .as_str()
        {
            "webhook" => BotMode::Webhook,
            _ => BotMode::Polling,
        };

        let webhook_url = env::var("WEBHOOK_URL").ok();

        if bot_mode == BotMode::Webhook && webhook_url.is_none() {
            panic!("WEBHOOK_URL must be set when BOT_MODE is webhook");
        }

        let owner_ids = env::var("OWNER_IDS")
            .unwrap_or_default()
            .split(',')
            .filter_map(|s| s.trim().parse::<u64>().ok())
            .collect();

        let sweep_ms = env::var("SWEEP_INTERVAL_MS")
            .ok()
            .and_then(|s| s.trim().parse::<u64>().ok())
            .filter(|ms| *ms > 0)
            .unwrap_or(1000);

        Self {
            bot_token: env::var("BOT_TOKEN").expect("BOT_TOKEN must be set"),
            bot_mode,
            webhook_url,
            webhook_port: env::var("WEBHOOK_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(8443),
            webhook_secret: env::var("WEBHOOK_SECRET").ok().filter(|s| !s.is_empty()),
            owner_ids,
            locale: env::var("BOT_LOCALE").unwrap_or_else(|_| "en".to_string()),
            sweep_interval: Duration::from_millis(sweep_ms),
            flood_config_path: env::var("FLOOD_CONFIG").ok().map(PathBuf::from),
        }
    }

    /// Load flood settings from the configured file and environment.
    ///
    /// `.env` is re-read with override semantics, so a reload picks up
    /// `FLOOD_*` edits made there since startup.
    pub fn load_flood_settings(&self) -> Result<FloodSettings, ConfigError> {
        self.load_flood_settings_with(None)
    }

    /// Same as [`Config::load_flood_settings`], reading `env_file` instead of
    /// the `.env` found from the working directory.
    fn load_flood_settings_with(
        &self,
        env_file: Option<&Path>,
    ) -> Result<FloodSettings, ConfigError> {
        // Plain `dotenv()` never replaces a variable that is already set
        let reread = match env_file {
            Some(path) => dotenvy::from_path_override(path),
            None => dotenvy::dotenv_override().map(|_| ()),
        };
        if let Err(e) = reread {
            if !e.not_found() {
                warn!("Could not re-read env file: {}", e);
            }
        }

        let base = match &self.flood_config_path {
            Some(path) => read_settings_file(path)?,
            None => FloodSettings::default(),
        };

        Ok(apply_overrides(base, |key| env::var(key).ok()))
    }
}

#[cfg(test)]
impl Config {
    /// Polling config without a settings file.
    pub(crate) fn for_tests() -> Self {
        Self {
            bot_token: "123:test".to_string(),
            bot_mode: BotMode::Polling,
            webhook_url: None,
            webhook_port: 8443,
            webhook_secret: None,
            owner_ids: Vec::new(),
            locale: "en".to_string(),
            sweep_interval: Duration::from_secs(1),
            flood_config_path: None,
        }
    }
}

/// Read a settings file. A missing file means defaults.
fn read_settings_file(path: &Path) -> Result<FloodSettings, ConfigError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            warn!("Flood settings file {} not found, using defaults", path.display());
            return Ok(FloodSettings::default());
        }
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Apply `FLOOD_*` overrides. Unparsable values keep the current one.
fn apply_overrides<F>(mut settings: FloodSettings, lookup: F) -> FloodSettings
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = parse_override(&lookup, "FLOOD_MAX_MESSAGES") {
        settings.max_messages = v;
    }
    if let Some(v) = parse_override(&lookup, "FLOOD_TIME_FRAME") {
        settings.time_frame = v;
    }
    if let Some(v) = parse_override(&lookup, "FLOOD_MUTE_DURATION") {
        settings.mute_duration = v;
    }
    settings
}

fn parse_override<F, T>(lookup: &F, key: &str) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!("Ignoring {}={:?}: not a non-negative integer", key, raw);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_overrides_replace_fields() {
        let settings = apply_overrides(
            FloodSettings::default(),
            lookup(&[("FLOOD_MAX_MESSAGES", "3"), ("FLOOD_MUTE_DURATION", " 120 ")]),
        );
        assert_eq!(settings, FloodSettings::new(3, 10, 120));
    }

    #[test]
    fn test_bad_override_is_ignored() {
        let settings = apply_overrides(
            FloodSettings::new(4, 20, 30),
            lookup(&[("FLOOD_TIME_FRAME", "-5"), ("FLOOD_MAX_MESSAGES", "lots")]),
        );
        assert_eq!(settings, FloodSettings::new(4, 20, 30));
    }

    #[test]
    fn test_missing_file_is_default() {
        let path = env::temp_dir().join("floodguard-does-not-exist.json");
        assert_eq!(read_settings_file(&path).unwrap(), FloodSettings::default());
    }

    #[test]
    fn test_file_values_and_malformed_file() {
        let dir = env::temp_dir();

        let good = dir.join(format!("floodguard-good-{}.json", std::process::id()));
        fs::write(&good, r#"{"max_messages": 2, "time_frame": 5}"#).unwrap();
        assert_eq!(read_settings_file(&good).unwrap(), FloodSettings::new(2, 5, 60));

        let bad = dir.join(format!("floodguard-bad-{}.json", std::process::id()));
        fs::write(&bad, "max_messages = 2").unwrap();
        assert!(matches!(
            read_settings_file(&bad),
            Err(ConfigError::Parse { .. })
        ));

        let _ = fs::remove_file(good);
        let _ = fs::remove_file(bad);
    }

    #[test]
    fn test_reload_picks_up_env_file_edits() {
        let env_file = env::temp_dir().join(format!("floodguard-{}.env", std::process::id()));
        let config = Config::for_tests();

        fs::write(&env_file, "FLOOD_MAX_MESSAGES=3\n").unwrap();
        let first = config.load_flood_settings_with(Some(&env_file)).unwrap();
        assert_eq!(first.max_messages, 3);

        // The variable is now set in the process, the edit must still win
        fs::write(&env_file, "FLOOD_MAX_MESSAGES=7\n").unwrap();
        let reloaded = config.load_flood_settings_with(Some(&env_file)).unwrap();
        assert_eq!(reloaded.max_messages, 7);

        let _ = fs::remove_file(env_file);
    }
}
