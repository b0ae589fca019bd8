//! Tests for configuration loading
//!
//! Tests that manipulate RNC_* environment variables are marked #[serial]
//! so they never run in parallel with each other.

use rnc_common::config::{load_toml_config, AppConfig, CliOverrides, ROOT_FOLDER_ENV};
use serial_test::serial;
use std::env;
use std::path::PathBuf;
use tempfile::TempDir;

const SAMPLE_TOML: &str = r#"
root_folder = "/srv/rnc"
bind_address = "0.0.0.0:9000"
access_password = "quality"
public_base_url = "https://rnc.example.com"

[mail]
smtp_host = "smtp.example.com"
smtp_user = "mailer"
smtp_password = "s3cret"
from = "rnc@example.com"
to = ["quality@example.com", "plant@example.com"]

[logging]
level = "debug"
"#;

fn clear_env() {
    for key in [
        ROOT_FOLDER_ENV,
        "RNC_BIND",
        "RNC_ACCESS_PASSWORD",
        "RNC_PUBLIC_BASE_URL",
        "RNC_SMTP_HOST",
        "RNC_SMTP_PORT",
        "RNC_SMTP_USER",
        "RNC_SMTP_PASSWORD",
        "RNC_EMAIL_FROM",
        "RNC_EMAIL_TO",
    ] {
        env::remove_var(key);
    }
}

#[test]
fn test_parse_full_toml_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, SAMPLE_TOML).unwrap();

    let toml_config = load_toml_config(&path).unwrap();
    assert_eq!(toml_config.root_folder, Some(PathBuf::from("/srv/rnc")));
    assert_eq!(toml_config.mail.to.len(), 2);
    assert_eq!(toml_config.mail.smtp_port, None);
    assert_eq!(toml_config.logging.level, "debug");
}

#[test]
fn test_malformed_toml_is_config_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "root_folder = [unterminated").unwrap();

    let err = load_toml_config(&path).unwrap_err();
    assert!(err.to_string().contains("Configuration error"));
}

#[test]
#[serial]
fn test_load_with_explicit_config_file() {
    clear_env();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, SAMPLE_TOML).unwrap();

    let cli = CliOverrides {
        config_file: Some(path),
        ..Default::default()
    };
    let config = AppConfig::load(&cli).unwrap();

    assert_eq!(config.root_folder, PathBuf::from("/srv/rnc"));
    assert_eq!(config.bind_address, "0.0.0.0:9000");
    assert_eq!(config.access_password.as_ref().unwrap().expose(), "quality");
    assert_eq!(config.mail.smtp_port, 587);
    assert!(config.mail.is_enabled());
    assert_eq!(config.database_path(), PathBuf::from("/srv/rnc/rnc.db"));
}

#[test]
#[serial]
fn test_env_overrides_toml() {
    clear_env();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, SAMPLE_TOML).unwrap();

    env::set_var(ROOT_FOLDER_ENV, "/env/rnc");
    env::set_var("RNC_EMAIL_TO", "ops@example.com");
    env::set_var("RNC_ACCESS_PASSWORD", "from-env");

    let cli = CliOverrides {
        config_file: Some(path),
        ..Default::default()
    };
    let config = AppConfig::load(&cli).unwrap();
    clear_env();

    assert_eq!(config.root_folder, PathBuf::from("/env/rnc"));
    assert_eq!(config.mail.to, vec!["ops@example.com".to_string()]);
    assert_eq!(config.access_password.unwrap().expose(), "from-env");
}

#[test]
#[serial]
fn test_missing_explicit_config_file_is_error() {
    clear_env();
    let cli = CliOverrides {
        config_file: Some(PathBuf::from("/nonexistent/rnc/config.toml")),
        ..Default::default()
    };
    assert!(AppConfig::load(&cli).is_err());
}

#[test]
fn test_ensure_root_folder_creates_directory() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("nested").join("rnc");
    let config = AppConfig::with_root_folder(&root);

    config.ensure_root_folder().unwrap();
    assert!(root.is_dir());
    assert_eq!(config.logo_path(), root.join("logo"));
}
