//! Configuration loading and data folder resolution
//!
//! Settings come from three layers, highest priority first:
//! 1. Command-line arguments (data folder, config file, bind address)
//! 2. Environment variables (`RNC_*`)
//! 3. TOML config file
//!
//! Anything still unset falls back to compiled defaults. The result is an
//! immutable [`AppConfig`] built once at startup.

use crate::db::DATABASE_FILE;
use crate::{Error, Result};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const ROOT_FOLDER_ENV: &str = "RNC_ROOT_FOLDER";
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:5780";
pub const DEFAULT_SMTP_PORT: u16 = 587;

/// Logo file name inside the data folder
pub const LOGO_FILE: &str = "logo";

/// String whose value never shows up in logs or `Debug` output
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Contents of the TOML config file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    pub bind_address: Option<String>,
    pub access_password: Option<Secret>,
    pub public_base_url: Option<String>,
    #[serde(default)]
    pub mail: MailToml,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// `[mail]` table of the TOML config file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MailToml {
    pub smtp_host: Option<String>,
    pub smtp_port: Option<u16>,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<Secret>,
    pub from: Option<String>,
    #[serde(default)]
    pub to: Vec<String>,
}

/// `[logging]` table of the TOML config file
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub root_folder: Option<PathBuf>,
    pub config_file: Option<PathBuf>,
    pub bind_address: Option<String>,
}

/// Outbound mail relay settings
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MailConfig {
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<Secret>,
    pub from: Option<String>,
    pub to: Vec<String>,
}

impl MailConfig {
    /// Relay host, sender and at least one recipient are required to send.
    /// Credentials are optional (open relays).
    pub fn is_enabled(&self) -> bool {
        self.smtp_host.as_deref().is_some_and(|h| !h.trim().is_empty())
            && self.from.as_deref().is_some_and(|f| !f.trim().is_empty())
            && !self.to.is_empty()
    }
}

/// Resolved application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub root_folder: PathBuf,
    pub bind_address: String,
    /// Password for privileged actions; `None` disables them
    pub access_password: Option<Secret>,
    pub public_base_url: Option<String>,
    pub mail: MailConfig,
    pub log_level: String,
}

impl AppConfig {
    /// Configuration rooted at `root_folder` with everything else defaulted
    pub fn with_root_folder(root_folder: impl Into<PathBuf>) -> Self {
        Self {
            root_folder: root_folder.into(),
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            access_password: None,
            public_base_url: None,
            mail: MailConfig {
                smtp_port: DEFAULT_SMTP_PORT,
                ..Default::default()
            },
            log_level: default_log_level(),
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE)
    }

    pub fn logo_path(&self) -> PathBuf {
        self.root_folder.join(LOGO_FILE)
    }

    /// Create the data folder if it doesn't exist
    pub fn ensure_root_folder(&self) -> Result<()> {
        if !self.root_folder.exists() {
            std::fs::create_dir_all(&self.root_folder)?;
            info!("Created data folder: {}", self.root_folder.display());
        }
        Ok(())
    }

    /// Load configuration from the process environment and config file
    pub fn load(cli: &CliOverrides) -> Result<Self> {
        let toml_config = match &cli.config_file {
            Some(path) => load_toml_config(path)?,
            None => match default_config_file() {
                Some(path) => load_toml_config(&path)?,
                None => {
                    warn!("No config file found, using defaults and environment");
                    TomlConfig::default()
                }
            },
        };

        Ok(Self::resolve(cli, toml_config, |key| std::env::var(key).ok()))
    }

    /// Merge the configuration layers. `env` looks up environment variables;
    /// blank values count as unset.
    pub fn resolve<F>(cli: &CliOverrides, toml_config: TomlConfig, env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let root_folder = cli
            .root_folder
            .clone()
            .or_else(|| env(ROOT_FOLDER_ENV).map(PathBuf::from))
            .or(toml_config.root_folder)
            .unwrap_or_else(default_root_folder);

        let bind_address = cli
            .bind_address
            .clone()
            .or_else(|| env("RNC_BIND"))
            .or(toml_config.bind_address)
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let access_password = env("RNC_ACCESS_PASSWORD")
            .map(Secret::new)
            .or(toml_config.access_password)
            .filter(|s| !s.expose().is_empty());

        let public_base_url = env("RNC_PUBLIC_BASE_URL").or(toml_config.public_base_url);

        let mail_toml = toml_config.mail;
        let smtp_port = match env("RNC_SMTP_PORT") {
            Some(raw) => match raw.trim().parse::<u16>() {
                Ok(port) => port,
                Err(_) => {
                    warn!("Ignoring invalid RNC_SMTP_PORT value '{}'", raw);
                    mail_toml.smtp_port.unwrap_or(DEFAULT_SMTP_PORT)
                }
            },
            None => mail_toml.smtp_port.unwrap_or(DEFAULT_SMTP_PORT),
        };

        let to = match env("RNC_EMAIL_TO") {
            Some(list) => split_recipients(&list),
            None => mail_toml
                .to
                .iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        };

        let mail = MailConfig {
            smtp_host: env("RNC_SMTP_HOST").or(mail_toml.smtp_host),
            smtp_port,
            smtp_user: env("RNC_SMTP_USER").or(mail_toml.smtp_user),
            smtp_password: env("RNC_SMTP_PASSWORD")
                .map(Secret::new)
                .or(mail_toml.smtp_password),
            from: env("RNC_EMAIL_FROM").or(mail_toml.from),
            to,
        };

        Self {
            root_folder,
            bind_address,
            access_password,
            public_base_url,
            mail,
            log_level: toml_config.logging.level,
        }
    }
}

/// Parse a comma separated recipient list
pub fn split_recipients(list: &str) -> Vec<String> {
    list.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Read and parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read {}: {}", path.display(), e))
    })?;
    let config = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))?;
    info!("Loaded config file: {}", path.display());
    Ok(config)
}

/// First existing config file among the platform locations
fn default_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("rnc").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(unix) {
        let system_config = PathBuf::from("/etc/rnc/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// OS-dependent default data folder
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("rnc"))
        .unwrap_or_else(|| PathBuf::from("./rnc_data"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_any_source() {
        let config = AppConfig::resolve(&CliOverrides::default(), TomlConfig::default(), env_from(&[]));
        assert_eq!(config.bind_address, DEFAULT_BIND_ADDRESS);
        assert!(config.access_password.is_none());
        assert_eq!(config.mail.smtp_port, DEFAULT_SMTP_PORT);
        assert!(!config.mail.is_enabled());
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_cli_beats_env_beats_toml_for_root_folder() {
        let toml_config = TomlConfig {
            root_folder: Some(PathBuf::from("/from/toml")),
            ..Default::default()
        };
        let env = env_from(&[(ROOT_FOLDER_ENV, "/from/env")]);

        let config = AppConfig::resolve(&CliOverrides::default(), toml_config.clone(), &env);
        assert_eq!(config.root_folder, PathBuf::from("/from/env"));

        let cli = CliOverrides {
            root_folder: Some(PathBuf::from("/from/cli")),
            ..Default::default()
        };
        let config = AppConfig::resolve(&cli, toml_config.clone(), &env);
        assert_eq!(config.root_folder, PathBuf::from("/from/cli"));

        let config = AppConfig::resolve(&CliOverrides::default(), toml_config, env_from(&[]));
        assert_eq!(config.root_folder, PathBuf::from("/from/toml"));
    }

    #[test]
    fn test_mail_from_env() {
        let env = env_from(&[
            ("RNC_SMTP_HOST", "smtp.example.com"),
            ("RNC_SMTP_PORT", "2525"),
            ("RNC_EMAIL_FROM", "rnc@example.com"),
            ("RNC_EMAIL_TO", "a@example.com, ,b@example.com"),
        ]);
        let config = AppConfig::resolve(&CliOverrides::default(), TomlConfig::default(), env);
        assert_eq!(config.mail.smtp_port, 2525);
        assert_eq!(config.mail.to, vec!["a@example.com", "b@example.com"]);
        assert!(config.mail.is_enabled());
    }

    #[test]
    fn test_invalid_port_falls_back() {
        let env = env_from(&[("RNC_SMTP_PORT", "not-a-port")]);
        let config = AppConfig::resolve(&CliOverrides::default(), TomlConfig::default(), env);
        assert_eq!(config.mail.smtp_port, DEFAULT_SMTP_PORT);
    }

    #[test]
    fn test_blank_password_disables_privileged_access() {
        let env = env_from(&[("RNC_ACCESS_PASSWORD", "   ")]);
        let config = AppConfig::resolve(&CliOverrides::default(), TomlConfig::default(), env);
        assert!(config.access_password.is_none());
    }

    #[test]
    fn test_secret_debug_is_redacted() {
        let secret = Secret::new("hunter2");
        assert_eq!(format!("{:?}", secret), "Secret(***)");
        assert_eq!(secret.expose(), "hunter2");
    }
}
