//! Configuration file parser for ~/.config/folio/config.toml.
//!
//! The file is optional: a missing or blank file yields `Config::default()`,
//! which is enough to browse a `--fixture`. Reading the live store needs at
//! least `project_id`.
use secrecy::SecretString;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Environment variable that overrides `api_key`.
pub const API_KEY_ENV: &str = "FOLIO_API_KEY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("project_id is not set (add it to the config file or use --fixture)")]
    MissingProjectId,
}

/// Connection settings for the portfolio backend.
///
/// Every key is optional; missing keys take the values from
/// `Config::default()`. `Debug` masks `api_key`.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Cloud project that hosts the document store and the relay function.
    pub project_id: String,

    /// Store database id.
    pub database: String,

    /// Root of the document store REST API.
    pub firestore_base_url: String,

    /// Root of the callable functions. Derived from `region` and
    /// `project_id` when unset.
    pub functions_base_url: Option<String>,

    /// Region the relay function is deployed in.
    pub region: String,

    /// Seconds between change checks while a page is watched.
    pub poll_interval_secs: u64,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Web API key. The FOLIO_API_KEY env var takes precedence.
    pub api_key: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            database: "(default)".to_string(),
            firestore_base_url: "https://firestore.googleapis.com".to_string(),
            functions_base_url: None,
            region: "us-central1".to_string(),
            poll_interval_secs: 5,
            request_timeout_secs: 20,
            api_key: None,
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("project_id", &self.project_id)
            .field("database", &self.database)
            .field("firestore_base_url", &self.firestore_base_url)
            .field("functions_base_url", &self.functions_base_url)
            .field("region", &self.region)
            .field("poll_interval_secs", &self.poll_interval_secs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

const KNOWN_KEYS: [&str; 8] = [
    "project_id",
    "database",
    "firestore_base_url",
    "functions_base_url",
    "region",
    "poll_interval_secs",
    "request_timeout_secs",
    "api_key",
];

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Load configuration from a TOML file.
    ///
    /// - Missing, empty or blank file → `Ok(Config::default())`
    /// - Invalid TOML or wrong value types → `Err(ConfigError::Parse)`
    /// - Unknown keys → accepted, logged as a warning
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
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        Self::parse(&content, path)
    }

    fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys().filter(|k| !KNOWN_KEYS.contains(&k.as_str())) {
                tracing::warn!(key = %key, "Unknown key in config file, ignoring");
            }
        }

        let config: Config = toml::from_str(content)?;
        tracing::info!(
            path = %path.display(),
            project_id = %config.project_id,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// The project id, or an error when it was never configured.
    pub fn require_project_id(&self) -> Result<&str, ConfigError> {
        match self.project_id.trim() {
            "" => Err(ConfigError::MissingProjectId),
            id => Ok(id),
        }
    }

    /// `functions_base_url`, or `https://{region}-{project_id}.cloudfunctions.net`.
    pub fn functions_url(&self) -> Result<String, ConfigError> {
        match self.functions_base_url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => Ok(url.to_string()),
            _ => Ok(format!(
                "https://{}-{}.cloudfunctions.net",
                self.region,
                self.require_project_id()?
            )),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// The API key to send, reading FOLIO_API_KEY first.
    pub fn api_key(&self) -> Option<SecretString> {
        self.api_key_with_env(std::env::var(API_KEY_ENV).ok())
    }

    fn api_key_with_env(&self, env: Option<String>) -> Option<SecretString> {
        env.filter(|k| !k.trim().is_empty())
            .or_else(|| self.api_key.clone().filter(|k| !k.trim().is_empty()))
            .map(SecretString::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn load_str(name: &str, content: &str) -> Result<Config, ConfigError> {
        let dir = std::env::temp_dir().join(format!("folio_config_test_{name}"));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, content).unwrap();
        let result = Config::load(&path);
        std::fs::remove_dir_all(&dir).ok();
        result
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.project_id, "");
        assert_eq!(config.database, "(default)");
        assert_eq!(config.firestore_base_url, "https://firestore.googleapis.com");
        assert_eq!(config.region, "us-central1");
        assert_eq!(config.poll_interval(), Duration::from_secs(5));
        assert_eq!(config.request_timeout(), Duration::from_secs(20));
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_missing_file_returns_default() {
        let path = Path::new("/tmp/folio_test_nonexistent_config.toml");
        let config = Config::load(path).unwrap();
        assert_eq!(config.database, "(default)");
    }

    #[test]
    fn test_blank_file_returns_default() {
        let config = load_str("blank", "   \n  \n").unwrap();
        assert_eq!(config.region, "us-central1");
    }

    #[test]
    fn test_partial_config_uses_defaults_for_missing() {
        let config = load_str("partial", "project_id = \"demo\"\n").unwrap();
        assert_eq!(config.project_id, "demo");
        assert_eq!(config.poll_interval_secs, 5);
        assert_eq!(
            config.functions_url().unwrap(),
            "https://us-central1-demo.cloudfunctions.net"
        );
    }

    #[test]
    fn test_full_config() {
        let content = r#"
project_id = "portfolio-123"
database = "blog"
firestore_base_url = "http://localhost:8080"
functions_base_url = "http://localhost:5001/portfolio-123/us-central1"
region = "europe-west1"
poll_interval_secs = 2
request_timeout_secs = 7
api_key = "AIza-test"
"#;
        let config = load_str("full", content).unwrap();
        assert_eq!(config.database, "blog");
        assert_eq!(config.firestore_base_url, "http://localhost:8080");
        assert_eq!(
            config.functions_url().unwrap(),
            "http://localhost:5001/portfolio-123/us-central1"
        );
        assert_eq!(config.poll_interval(), Duration::from_secs(2));
        assert_eq!(config.request_timeout(), Duration::from_secs(7));
        assert_eq!(config.api_key.as_deref(), Some("AIza-test"));
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let err = load_str("invalid", "this is not [valid toml").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().contains("Invalid TOML"));
    }

    #[test]
    fn test_wrong_type_returns_error() {
        let err = load_str("wrongtype", "poll_interval_secs = \"often\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_unknown_keys_accepted() {
        let config = load_str("unknown", "project_id = \"x\"\ntheme = \"dark\"\n").unwrap();
        assert_eq!(config.project_id, "x");
    }

    #[test]
    fn test_too_large_file_rejected() {
        let err = load_str("too_large", &"a".repeat(1_048_577)).unwrap_err();
        assert!(matches!(err, ConfigError::TooLarge(_)));
        assert!(err.to_string().contains("too large"));
    }

    #[test]
    fn test_functions_url_needs_project() {
        let config = Config::default();
        assert!(matches!(
            config.functions_url(),
            Err(ConfigError::MissingProjectId)
        ));
        assert!(config.require_project_id().is_err());
    }

    #[test]
    fn test_env_key_takes_precedence() {
        let config = Config {
            api_key: Some("from-file".into()),
            ..Config::default()
        };
        let key = config.api_key_with_env(Some("from-env".into())).unwrap();
        assert_eq!(key.expose_secret(), "from-env");

        let key = config.api_key_with_env(None).unwrap();
        assert_eq!(key.expose_secret(), "from-file");

        let key = config.api_key_with_env(Some("  ".into())).unwrap();
        assert_eq!(key.expose_secret(), "from-file");

        assert!(Config::default().api_key_with_env(None).is_none());
    }

    #[test]
    fn test_debug_masks_api_key() {
        let config = Config {
            api_key: Some("super-secret-key-12345".into()),
            ..Config::default()
        };
        let debug_output = format!("{:?}", config);
        assert!(!debug_output.contains("super-secret-key-12345"));
        assert!(debug_output.contains("[REDACTED]"));
    }
}
