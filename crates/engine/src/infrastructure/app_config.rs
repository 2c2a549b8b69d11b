//! Engine configuration from environment variables.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_DATA_PATH: &str = "data/combatdesk.json";
pub const DEFAULT_SAVE_DEBOUNCE_MS: u64 = 250;

/// Runtime settings for the engine binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub server_host: String,
    pub server_port: u16,
    /// JSON file holding the whole tracker store.
    pub data_path: PathBuf,
    /// Optional JSON array of monster templates.
    pub compendium_path: Option<PathBuf>,
    pub save_debounce: Duration,
    /// `*` or a comma-separated origin list; CORS is off when unset.
    pub cors_allowed_origins: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_host: DEFAULT_HOST.to_string(),
            server_port: DEFAULT_PORT,
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            compendium_path: None,
            save_debounce: Duration::from_millis(DEFAULT_SAVE_DEBOUNCE_MS),
            cors_allowed_origins: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Blank values count as unset and
    /// unparseable numbers fall back to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        let server_port = get("SERVER_PORT")
            .or_else(|| get("PORT"))
            .map(|raw| {
                raw.parse::<u16>().unwrap_or_else(|_| {
                    tracing::warn!(value = %raw, "Invalid SERVER_PORT, using default");
                    DEFAULT_PORT
                })
            })
            .unwrap_or(DEFAULT_PORT);

        let save_debounce = get("COMBATDESK_SAVE_DEBOUNCE_MS")
            .map(|raw| {
                raw.parse::<u64>().unwrap_or_else(|_| {
                    tracing::warn!(value = %raw, "Invalid COMBATDESK_SAVE_DEBOUNCE_MS, using default");
                    DEFAULT_SAVE_DEBOUNCE_MS
                })
            })
            .map(Duration::from_millis)
            .unwrap_or(defaults.save_debounce);

        Self {
            server_host: get("SERVER_HOST").unwrap_or(defaults.server_host),
            server_port,
            data_path: get("COMBATDESK_DATA_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_path),
            compendium_path: get("COMBATDESK_COMPENDIUM_PATH").map(PathBuf::from),
            save_debounce,
            cors_allowed_origins: get("CORS_ALLOWED_ORIGINS"),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> AppConfig {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        assert_eq!(config(&[]), AppConfig::default());
        assert_eq!(config(&[]).bind_addr(), "0.0.0.0:3000");
    }

    #[test]
    fn reads_overrides() {
        let cfg = config(&[
            ("SERVER_HOST", "127.0.0.1"),
            ("PORT", "8080"),
            ("COMBATDESK_DATA_PATH", "/tmp/store.json"),
            ("COMBATDESK_COMPENDIUM_PATH", "monsters.json"),
            ("COMBATDESK_SAVE_DEBOUNCE_MS", "50"),
            ("CORS_ALLOWED_ORIGINS", "*"),
        ]);
        assert_eq!(cfg.bind_addr(), "127.0.0.1:8080");
        assert_eq!(cfg.data_path, PathBuf::from("/tmp/store.json"));
        assert_eq!(cfg.compendium_path, Some(PathBuf::from("monsters.json")));
        assert_eq!(cfg.save_debounce, Duration::from_millis(50));
        assert_eq!(cfg.cors_allowed_origins.as_deref(), Some("*"));
    }

    #[test]
    fn server_port_wins_over_port() {
        let cfg = config(&[("SERVER_PORT", "4000"), ("PORT", "5000")]);
        assert_eq!(cfg.server_port, 4000);
    }

    #[test]
    fn invalid_numbers_fall_back() {
        let cfg = config(&[("SERVER_PORT", "http"), ("COMBATDESK_SAVE_DEBOUNCE_MS", "-1")]);
        assert_eq!(cfg.server_port, DEFAULT_PORT);
        assert_eq!(cfg.save_debounce, Duration::from_millis(DEFAULT_SAVE_DEBOUNCE_MS));
    }
}
