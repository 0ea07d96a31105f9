//! Settings document and environment overrides
//!
//! The whole gateway is configured by one YAML document: guacd address, log
//! level, server capability flags, authentication settings, static file path
//! and the connection catalog. The document is read once at startup and the
//! resulting [`Settings`] value is passed by handle into every component;
//! re-reading requires a restart.
//!
//! Three environment variables take precedence over their file counterparts:
//! `CONFIG_PATH` (document location), `GUACD` (backend address) and
//! `LOG_LEVEL` (default level when the file leaves it unset).

use std::{
    env,
    path::{Path, PathBuf},
};

use figment::{
    Figment,
    providers::{Format, Yaml},
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::profiles::ConnectionProfile;
use crate::{Error, Result};

/// guacd address used when neither the environment nor the file names one
pub const DEFAULT_GUACD_ADDRESS: &str = "127.0.0.1:4822";

/// Log levels accepted in the settings file, most to least severe
const LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];

/// Resolve the settings file location: `CONFIG_PATH` or `config.yaml`
#[must_use]
pub fn config_path() -> PathBuf {
    env::var("CONFIG_PATH").map_or_else(|_| PathBuf::from("config.yaml"), PathBuf::from)
}

/// Main settings document
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    /// Backend daemon settings
    pub guacd: GuacdSettings,
    /// Logging settings
    pub log: LogSettings,
    /// HTTP server settings
    pub server: ServerSettings,
    /// Connection profile catalog
    pub conns: Vec<ConnectionProfile>,
}

/// Backend daemon (guacd) settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GuacdSettings {
    /// guacd address (`host:port`)
    pub address: String,
    /// Allow per-request override of the guacd address
    #[serde(rename = "override")]
    pub allow_override: bool,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LogSettings {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Profile API capability flags
    pub api: ApiSettings,
    /// Authentication settings
    pub auth: AuthSettings,
    /// Static file settings
    #[serde(rename = "static")]
    pub static_files: StaticSettings,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 4567,
            api: ApiSettings::default(),
            auth: AuthSettings::default(),
            static_files: StaticSettings::default(),
        }
    }
}

/// Per-verb capability flags for the profile API
///
/// Each flag independently enables one operation on `/config`. A disabled
/// operation answers 404.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub struct ApiSettings {
    /// Enable `GET /config?ids=all`
    pub ids: bool,
    /// Enable `GET /config`
    pub list: bool,
    /// Enable `GET /config?id=<id>`
    pub read: bool,
    /// Enable `DELETE /config?id=<id>`
    pub delete: bool,
    /// Enable `POST /config`
    pub update: bool,
}

impl ApiSettings {
    /// Enable every capability (profile management fully open)
    #[must_use]
    pub fn all_enabled() -> Self {
        Self {
            ids: true,
            list: true,
            read: true,
            delete: true,
            update: true,
        }
    }
}

/// Authentication settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AuthSettings {
    /// HTTP Basic credentials
    pub basic: BasicAuthSettings,
    /// Trusted identity header
    pub header: HeaderAuthSettings,
}

impl AuthSettings {
    /// True when no strategy is configured: every request passes unauthenticated
    #[must_use]
    pub fn is_open(&self) -> bool {
        !self.has_basic() && !self.has_header()
    }

    /// True when a Basic username is configured
    #[must_use]
    pub fn has_basic(&self) -> bool {
        !self.basic.username.is_empty()
    }

    /// True when a trusted header name is configured
    #[must_use]
    pub fn has_header(&self) -> bool {
        !self.header.name.is_empty()
    }
}

/// HTTP Basic credentials: a single configured username/password pair
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct BasicAuthSettings {
    /// Expected username (empty disables Basic auth)
    pub username: String,
    /// Expected password
    pub password: String,
    /// Realm advertised in the 401 challenge
    pub realm: String,
}

/// Trusted identity header injected by an upstream reverse proxy
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct HeaderAuthSettings {
    /// Header name (empty disables the strategy)
    pub name: String,
    /// Allowed header values; empty accepts any non-empty value
    pub values: Vec<String>,
}

/// Static file settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StaticSettings {
    /// Directory served at the router fallback (empty disables static serving)
    pub path: String,
}

impl Settings {
    /// Load settings from a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist or cannot be parsed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::Config(format!(
                "Settings file not found: {}",
                path.display()
            )));
        }

        Figment::new()
            .merge(Yaml::file(path))
            .extract()
            .map_err(|e| Error::Config(e.to_string()))
    }

    /// Load settings, falling back to defaults (and an empty catalog) on failure
    ///
    /// A missing or unparsable file is logged and never fatal.
    #[must_use]
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(settings) => settings,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to load settings, continuing with defaults");
                Self::default()
            }
        }
    }

    /// Resolve the guacd address: `GUACD` env, then the file value, then the default
    #[must_use]
    pub fn guacd_address(&self) -> String {
        self.guacd_address_from(env::var("GUACD").ok().as_deref())
    }

    fn guacd_address_from(&self, env_override: Option<&str>) -> String {
        if let Some(addr) = env_override.filter(|a| !a.is_empty()) {
            addr.to_string()
        } else if self.guacd.address.is_empty() {
            DEFAULT_GUACD_ADDRESS.to_string()
        } else {
            self.guacd.address.clone()
        }
    }

    /// Resolve the log level: `LOG_LEVEL` env, then the file value, then `error`
    ///
    /// Unrecognized names degrade to `warn` instead of failing.
    #[must_use]
    pub fn log_level(&self) -> String {
        self.log_level_from(env::var("LOG_LEVEL").ok().as_deref())
    }

    fn log_level_from(&self, env_override: Option<&str>) -> String {
        let raw = env_override
            .filter(|l| !l.is_empty())
            .map_or_else(
                || {
                    if self.log.level.is_empty() {
                        "error".to_string()
                    } else {
                        self.log.level.clone()
                    }
                },
                str::to_string,
            )
            .to_lowercase();

        if LOG_LEVELS.contains(&raw.as_str()) {
            raw
        } else {
            "warn".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.server.port, 4567);
        assert!(settings.server.auth.is_open());
        assert!(!settings.server.api.list);
        assert!(settings.conns.is_empty());
    }

    #[test]
    fn test_parse_full_document() {
        let yaml = r#"
guacd:
  address: "10.0.0.1:4822"
  override: true
log:
  level: debug
server:
  api:
    ids: true
    list: true
  auth:
    basic:
      username: admin
      password: hunter2
      realm: guacgate
    header:
      name: X-Forwarded-User
      values: [alice, bob]
  static:
    path: ./static
conns:
  - scheme: rdp
    hostname: host1
    port: "3389"
    username: alice
    access: "alice,bob"
"#;
        let settings: Settings = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(settings.guacd.address, "10.0.0.1:4822");
        assert!(settings.guacd.allow_override);
        assert_eq!(settings.log.level, "debug");
        assert!(settings.server.api.ids);
        assert!(settings.server.api.list);
        assert!(!settings.server.api.delete);
        assert!(settings.server.auth.has_basic());
        assert!(settings.server.auth.has_header());
        assert_eq!(settings.server.auth.header.values.len(), 2);
        assert_eq!(settings.server.static_files.path, "./static");
        assert_eq!(settings.conns.len(), 1);
        assert_eq!(settings.conns[0].get("hostname"), Some("host1"));
    }

    #[test]
    fn test_load_missing_file_is_config_error() {
        let err = Settings::load(Path::new("/nonexistent/config.yaml")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_load_or_default_degrades() {
        let settings = Settings::load_or_default(Path::new("/nonexistent/config.yaml"));
        assert!(settings.conns.is_empty());
        assert_eq!(settings.server.port, 4567);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "server:\n  port: 9999").unwrap();
        drop(f);

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.server.port, 9999);
        // Untouched sections keep their defaults
        assert_eq!(settings.server.host, "0.0.0.0");
    }

    #[test]
    fn test_guacd_address_precedence() {
        let mut settings = Settings::default();
        assert_eq!(settings.guacd_address_from(None), DEFAULT_GUACD_ADDRESS);

        settings.guacd.address = "10.1.1.1:4822".to_string();
        assert_eq!(settings.guacd_address_from(None), "10.1.1.1:4822");

        // Environment wins over the file value
        assert_eq!(
            settings.guacd_address_from(Some("192.168.0.9:4822")),
            "192.168.0.9:4822"
        );
        // An empty environment value does not shadow the file
        assert_eq!(settings.guacd_address_from(Some("")), "10.1.1.1:4822");
    }

    #[test]
    fn test_log_level_precedence() {
        let mut settings = Settings::default();
        assert_eq!(settings.log_level_from(None), "error");

        settings.log.level = "DEBUG".to_string();
        assert_eq!(settings.log_level_from(None), "debug");

        assert_eq!(settings.log_level_from(Some("trace")), "trace");
        // Unknown names degrade instead of failing
        assert_eq!(settings.log_level_from(Some("loud")), "warn");
    }

    #[test]
    fn test_auth_open_mode_detection() {
        let mut auth = AuthSettings::default();
        assert!(auth.is_open());

        auth.basic.username = "admin".to_string();
        assert!(!auth.is_open());

        auth.basic.username = String::new();
        auth.header.name = "X-Forwarded-User".to_string();
        assert!(!auth.is_open());
    }
}
