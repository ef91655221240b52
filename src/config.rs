//! Configuration file parser for ~/.config/feedview/config.toml.
//!
//! The config file is optional; a missing file yields `Config::default()`.
//! Unknown keys are accepted by serde and logged as warnings so typos are
//! visible in the log. Command-line flags override file values in `main`.
use secrecy::SecretString;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::view::{DisplayMode, ViewOptions};

/// Environment variable holding the session cookie. Takes precedence over
/// the `session` key.
pub const SESSION_ENV_VAR: &str = "FEEDVIEW_SESSION";

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),

    /// A value parsed but is out of range.
    #[error("Invalid config value: {0}")]
    Invalid(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level application configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
/// The custom Debug impl masks `session`.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root of the yarr JSON API, e.g. `https://reader.example/yarr/api/`.
    /// Without it the client starts with the API disabled.
    pub api_url: Option<String>,

    /// Session cookie value for the server (alternative to FEEDVIEW_SESSION).
    pub session: Option<String>,

    /// Entries requested per page.
    pub page_length: usize,

    pub display_mode: DisplayMode,

    /// Rows an entry must extend below the viewport top to become current.
    pub scroll_switch_margin: i64,

    /// Rows past the viewport bottom at which the next page is requested.
    pub scroll_infinite_margin: i64,

    /// Whether selecting an unread entry marks it read.
    pub mark_read_on_open: bool,

    /// How long status messages stay visible.
    pub status_timeout_ms: u64,

    /// Upper bound on a single API request.
    pub request_timeout_secs: u64,

    /// Whether the feed sidebar is visible at start-up.
    pub show_feeds: bool,

    /// Action name to key overrides, e.g. `toggle_read = "x"`.
    pub keybindings: HashMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: None,
            session: None,
            page_length: 5,
            display_mode: DisplayMode::Expanded,
            scroll_switch_margin: 3,
            scroll_infinite_margin: 10,
            mark_read_on_open: true,
            status_timeout_ms: 3000,
            request_timeout_secs: 20,
            show_feeds: true,
            keybindings: HashMap::new(),
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_url", &self.api_url)
            .field("session", &self.session.as_ref().map(|_| "[REDACTED]"))
            .field("page_length", &self.page_length)
            .field("display_mode", &self.display_mode)
            .field("scroll_switch_margin", &self.scroll_switch_margin)
            .field("scroll_infinite_margin", &self.scroll_infinite_margin)
            .field("mark_read_on_open", &self.mark_read_on_open)
            .field("status_timeout_ms", &self.status_timeout_ms)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("show_feeds", &self.show_feeds)
            .field("keybindings", &self.keybindings)
            .finish()
    }
}

const KNOWN_KEYS: &[&str] = &[
    "api_url",
    "session",
    "page_length",
    "display_mode",
    "scroll_switch_margin",
    "scroll_infinite_margin",
    "mark_read_on_open",
    "status_timeout_ms",
    "request_timeout_secs",
    "show_feeds",
    "keybindings",
];

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Out-of-range values → `Err(ConfigError::Invalid)`
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        Self::parse(&content)
    }

    /// Parse configuration from TOML text.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            tracing::debug!("Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(content)?;
        config.validate()?;
        tracing::info!(
            api_url = ?config.api_url,
            mode = ?config.display_mode,
            page_length = config.page_length,
            "Loaded configuration"
        );
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.page_length == 0 {
            return Err(ConfigError::Invalid("page_length must be at least 1".into()));
        }
        if self.scroll_switch_margin < 0 || self.scroll_infinite_margin < 0 {
            return Err(ConfigError::Invalid("scroll margins cannot be negative".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_secs must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Session credential: the environment variable wins over the file.
    pub fn session_secret(&self) -> Option<SecretString> {
        let from_env = std::env::var(SESSION_ENV_VAR)
            .ok()
            .filter(|s| !s.trim().is_empty());
        from_env
            .or_else(|| self.session.clone())
            .map(|s| SecretString::from(s.trim().to_string()))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// View tunables; order and state filter come from the command line.
    pub fn view_options(&self) -> ViewOptions {
        ViewOptions {
            page_length: self.page_length,
            scroll_switch_margin: self.scroll_switch_margin,
            scroll_infinite_margin: self.scroll_infinite_margin,
            mark_read_on_open: self.mark_read_on_open,
            status_timeout: Duration::from_millis(self.status_timeout_ms),
            mode: self.display_mode,
            ..ViewOptions::default()
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.api_url.is_none());
        assert_eq!(config.page_length, 5);
        assert_eq!(config.display_mode, DisplayMode::Expanded);
        assert_eq!(config.scroll_switch_margin, 3);
        assert_eq!(config.scroll_infinite_margin, 10);
        assert!(config.mark_read_on_open);
        assert!(config.show_feeds);
        assert_eq!(config.request_timeout(), Duration::from_secs(20));
    }

    #[test]
    fn test_missing_file_returns_default() {
        let path = Path::new("/tmp/feedview_test_nonexistent_config.toml");
        let config = Config::load(path).unwrap();
        assert_eq!(config.page_length, 5);
    }

    #[test]
    fn test_empty_file_returns_default() {
        let dir = std::env::temp_dir().join("feedview_config_test_empty");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "   \n  ").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.display_mode, DisplayMode::Expanded);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_full_config() {
        let content = r#"
api_url = "https://reader.example/yarr/api/"
session = "abc"
page_length = 10
display_mode = "list"
scroll_switch_margin = 1
scroll_infinite_margin = 25
mark_read_on_open = false
status_timeout_ms = 1500
request_timeout_secs = 5
show_feeds = false

[keybindings]
toggle_read = "x"
"#;
        let config = Config::parse(content).unwrap();
        assert_eq!(
            config.api_url.as_deref(),
            Some("https://reader.example/yarr/api/")
        );
        assert_eq!(config.display_mode, DisplayMode::List);
        assert!(!config.show_feeds);
        assert_eq!(config.keybindings.get("toggle_read").map(String::as_str), Some("x"));

        let options = config.view_options();
        assert_eq!(options.page_length, 10);
        assert_eq!(options.scroll_switch_margin, 1);
        assert_eq!(options.scroll_infinite_margin, 25);
        assert!(!options.mark_read_on_open);
        assert_eq!(options.status_timeout, Duration::from_millis(1500));
        assert_eq!(options.mode, DisplayMode::List);
    }

    #[test]
    fn test_unknown_keys_accepted() {
        let config = Config::parse("page_length = 7\ntheme = \"dark\"\n").unwrap();
        assert_eq!(config.page_length, 7);
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let err = Config::parse("this is not [valid toml").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().contains("Invalid TOML"));
    }

    #[test]
    fn test_unknown_display_mode_rejected() {
        let err = Config::parse("display_mode = \"grid\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_out_of_range_values_rejected() {
        assert!(matches!(
            Config::parse("page_length = 0\n"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            Config::parse("scroll_infinite_margin = -1\n"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            Config::parse("request_timeout_secs = 0\n"),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_too_large_file_rejected() {
        let dir = std::env::temp_dir().join("feedview_config_test_too_large");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "a".repeat(1_048_577)).unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::TooLarge(_)));
        assert!(err.to_string().contains("too large"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_debug_masks_session() {
        let config = Config {
            session: Some("super-secret-session".to_string()),
            ..Config::default()
        };
        let debug_output = format!("{:?}", config);
        assert!(!debug_output.contains("super-secret-session"));
        assert!(debug_output.contains("[REDACTED]"));
    }
}
