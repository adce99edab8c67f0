//! Configuration loading and root folder resolution
//!
//! Bootstrap configuration only: where the data lives, where to listen, how to
//! log, which media backend to read payloads from, the public site URL and
//! host notifications. Per-event behaviour is stored with each event
//! ([`crate::models::EventSettings`]).
//!
//! Root folder priority:
//! 1. Command-line argument
//! 2. `MEMENTO_ROOT_FOLDER` (or the shorter `MEMENTO_ROOT`)
//! 3. `root_folder` in `~/.config/memento/<module>.toml`
//! 4. OS-dependent compiled default

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Primary root folder environment variable
pub const ROOT_FOLDER_ENV: &str = "MEMENTO_ROOT_FOLDER";

/// Alternative root folder environment variable
pub const ROOT_FOLDER_ENV_SHORT: &str = "MEMENTO_ROOT";

/// Database file name inside the root folder
pub const DATABASE_FILE: &str = "memento.db";

/// Media directory name inside the root folder
pub const MEDIA_DIR: &str = "media";

/// Built-in fallbacks used when nothing else is configured
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
    pub bind_address: String,
    pub port: u16,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        let root_folder = dirs::data_local_dir()
            .map(|d| d.join("memento"))
            .unwrap_or_else(|| PathBuf::from("./memento_data"));

        Self {
            root_folder,
            log_level: "info".to_string(),
            log_file: None,
            bind_address: "127.0.0.1".to_string(),
            port: 5780,
        }
    }
}

/// Bootstrap configuration loaded from TOML
///
/// Every field is optional; a missing file is the same as an empty one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// Listen address, e.g. `0.0.0.0`
    #[serde(default)]
    pub bind_address: Option<String>,

    #[serde(default)]
    pub port: Option<u16>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub media: MediaConfig,

    #[serde(default)]
    pub wall: WallConfig,

    #[serde(default)]
    pub site: SiteConfig,

    #[serde(default)]
    pub notify: NotifyConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (logs to stdout if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Where contribution payloads are read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaBackend {
    /// Files under `<root>/media/<bucket>/`
    #[default]
    Local,
    /// Public object storage reachable over HTTP
    Http,
}

/// Media storage configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaConfig {
    #[serde(default)]
    pub backend: MediaBackend,

    /// Bucket (directory or path segment) payloads live in
    #[serde(default = "default_bucket")]
    pub bucket: String,

    /// Base URL for the HTTP backend, e.g. `https://cdn.example.com/storage/v1/object/public`
    #[serde(default)]
    pub public_base_url: Option<String>,

    /// Per-fetch timeout for the HTTP backend
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            backend: MediaBackend::default(),
            bucket: default_bucket(),
            public_base_url: None,
            fetch_timeout_secs: default_fetch_timeout_secs(),
        }
    }
}

fn default_bucket() -> String {
    "event-media".to_string()
}

fn default_fetch_timeout_secs() -> u64 {
    30
}

/// Live display configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WallConfig {
    /// Seconds each slide stays on screen
    #[serde(default = "default_slide_interval_secs")]
    pub slide_interval_secs: u64,
}

impl Default for WallConfig {
    fn default() -> Self {
        Self {
            slide_interval_secs: default_slide_interval_secs(),
        }
    }
}

fn default_slide_interval_secs() -> u64 {
    8
}

/// Public web front end
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Origin guests and hosts open, e.g. `https://memento.example.com`
    ///
    /// Guest links (`/e/<code>`), share links and QR codes are built from it.
    #[serde(default = "default_public_url")]
    pub public_url: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            public_url: default_public_url(),
        }
    }
}

fn default_public_url() -> String {
    "http://localhost:5780".to_string()
}

/// Host e-mail notifications through an HTTP mail API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Notifications are only logged unless enabled
    #[serde(default)]
    pub enabled: bool,

    /// Mail API endpoint accepting `{from, to, subject, html}`
    #[serde(default = "default_mail_endpoint")]
    pub endpoint: String,

    /// Bearer token for the mail API
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_mail_from")]
    pub from: String,

    /// Language of the mails (`en` or `de`)
    #[serde(default = "default_mail_language")]
    pub language: String,

    #[serde(default = "default_mail_timeout_secs")]
    pub timeout_secs: u64,

    /// Host user id to e-mail address
    #[serde(default)]
    pub recipients: BTreeMap<String, String>,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_mail_endpoint(),
            api_key: None,
            from: default_mail_from(),
            language: default_mail_language(),
            timeout_secs: default_mail_timeout_secs(),
            recipients: BTreeMap::new(),
        }
    }
}

fn default_mail_endpoint() -> String {
    "https://api.resend.com/emails".to_string()
}

fn default_mail_from() -> String {
    "Memento <noreply@localhost>".to_string()
}

fn default_mail_language() -> String {
    "en".to_string()
}

fn default_mail_timeout_secs() -> u64 {
    10
}

impl TomlConfig {
    /// Parse configuration text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))?;
        config.validate()
    }

    /// Load `~/.config/memento/<module>.toml`
    ///
    /// A missing or unreadable file never fails startup: a warning is logged
    /// and defaults are used.
    pub fn load_or_default(module_name: &str) -> Self {
        let Some(path) = config_file_path(module_name) else {
            debug!("No config directory on this platform, using defaults");
            return Self::default();
        };
        if !path.exists() {
            debug!("Config file {} not found, using defaults", path.display());
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!("Ignoring config file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    fn validate(self) -> Result<Self> {
        if self.wall.slide_interval_secs == 0 {
            return Err(Error::Config(
                "wall.slide_interval_secs must be at least 1".to_string(),
            ));
        }
        if self.media.backend == MediaBackend::Http && self.media.public_base_url.is_none() {
            return Err(Error::Config(
                "media.public_base_url is required for the http backend".to_string(),
            ));
        }
        if !self.site.public_url.starts_with("http://") && !self.site.public_url.starts_with("https://") {
            return Err(Error::Config(format!(
                "site.public_url must be an http(s) URL, got '{}'",
                self.site.public_url
            )));
        }
        if self.notify.enabled && self.notify.api_key.is_none() {
            return Err(Error::Config(
                "notify.api_key is required when notifications are enabled".to_string(),
            ));
        }
        if self.media.bucket.trim().is_empty() || self.media.bucket.contains(['/', '\\']) {
            return Err(Error::Config(format!(
                "media.bucket must be a single path segment, got '{}'",
                self.media.bucket
            )));
        }
        Ok(self)
    }
}

/// Per-module configuration file location
pub fn config_file_path(module_name: &str) -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("memento").join(format!("{}.toml", module_name)))
}

/// Resolves the root folder from CLI, environment, TOML and compiled defaults
pub struct RootFolderResolver {
    module_name: String,
    cli_arg: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new(module_name: &str) -> Self {
        Self {
            module_name: module_name.to_string(),
            cli_arg: None,
        }
    }

    /// Highest priority override, typically `--root-folder`
    pub fn with_cli_arg(mut self, cli_arg: Option<PathBuf>) -> Self {
        self.cli_arg = cli_arg;
        self
    }

    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            debug!("Root folder from command line: {}", path.display());
            return path.clone();
        }

        for var in [ROOT_FOLDER_ENV, ROOT_FOLDER_ENV_SHORT] {
            if let Ok(path) = std::env::var(var) {
                if !path.trim().is_empty() {
                    debug!("Root folder from {}: {}", var, path);
                    return PathBuf::from(path);
                }
            }
        }

        if let Some(path) = TomlConfig::load_or_default(&self.module_name).root_folder {
            debug!("Root folder from config file: {}", path.display());
            return path;
        }

        CompiledDefaults::for_current_platform().root_folder
    }
}

/// Creates the root folder layout and names the files inside it
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    pub fn root_folder(&self) -> &Path {
        &self.root_folder
    }

    /// Create the root and media directories (idempotent)
    pub fn ensure_directory_exists(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root_folder)?;
        std::fs::create_dir_all(self.media_root())?;
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE)
    }

    pub fn database_exists(&self) -> bool {
        self.database_path().exists()
    }

    /// Directory holding one sub-directory per media bucket
    pub fn media_root(&self) -> PathBuf {
        self.root_folder.join(MEDIA_DIR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = TomlConfig::from_toml_str("").unwrap();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.media.backend, MediaBackend::Local);
        assert_eq!(config.media.bucket, "event-media");
        assert_eq!(config.wall.slide_interval_secs, 8);
        assert!(config.root_folder.is_none());
    }

    #[test]
    fn test_http_backend_requires_base_url() {
        let err = TomlConfig::from_toml_str("[media]\nbackend = \"http\"\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let config = TomlConfig::from_toml_str(
            "[media]\nbackend = \"http\"\npublic_base_url = \"https://cdn.example.com\"\n",
        )
        .unwrap();
        assert_eq!(config.media.backend, MediaBackend::Http);
    }

    #[test]
    fn test_zero_slide_interval_rejected() {
        assert!(TomlConfig::from_toml_str("[wall]\nslide_interval_secs = 0\n").is_err());
    }

    #[test]
    fn test_site_and_notify_sections() {
        let config = TomlConfig::from_toml_str("").unwrap();
        assert_eq!(config.site.public_url, "http://localhost:5780");
        assert!(!config.notify.enabled);

        let config = TomlConfig::from_toml_str(
            "[site]\npublic_url = \"https://memento.example.com\"\n\n\
             [notify]\nenabled = true\napi_key = \"re_123\"\n\n\
             [notify.recipients]\nhost-anna = \"anna@example.com\"\n",
        )
        .unwrap();
        assert_eq!(config.site.public_url, "https://memento.example.com");
        assert_eq!(
            config.notify.recipients.get("host-anna").map(String::as_str),
            Some("anna@example.com")
        );

        assert!(TomlConfig::from_toml_str("[notify]\nenabled = true\n").is_err());
        assert!(TomlConfig::from_toml_str("[site]\npublic_url = \"memento.local\"\n").is_err());
    }

    #[test]
    fn test_bucket_must_be_single_segment() {
        assert!(TomlConfig::from_toml_str("[media]\nbucket = \"../etc\"\n").is_err());
    }
}
