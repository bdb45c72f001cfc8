//! Configuration management for the import/export tool
//!
//! Defaults come from a bundled properties file and are overridden by
//! `key=value` command-line arguments. Unknown keys are rejected up front.

use crate::{cli::Args, error::JackError};
use std::collections::BTreeMap;
use std::path::PathBuf;
use url::Url;

/// Bundled defaults for every recognized option
const DEFAULTS: &str = include_str!("defaults.properties");

/// Every key accepted from the defaults file or as an override
const KNOWN_KEYS: &[&str] = &[
    "username",
    "password",
    "repository-base-xpath",
    "workspace",
    "transport",
    "storage",
    "jackrabbit-config",
    "jackrabbit-home",
];

/// Main configuration structure
#[derive(Debug, Clone)]
pub struct Config {
    /// Login name for the repository
    pub username: String,
    /// Password for the repository
    pub password: String,
    /// Root path for import/export (`repository-base-xpath`)
    pub base_path: String,
    /// Workspace to operate on
    pub workspace: String,
    /// How to reach the repository
    pub transport: Transport,
}

/// Connection strategy selected by the `transport` option
#[derive(Debug, Clone)]
pub enum Transport {
    /// Embedded engine bound to local filesystem paths
    Local {
        /// Engine configuration file (`jackrabbit-config`)
        config: PathBuf,
        /// Data folder holding the workspace files (`jackrabbit-home`)
        home: PathBuf,
    },
    /// Remote client bound to a remoting endpoint (`storage`)
    Davex { storage: Url },
}

impl Config {
    /// Create configuration from command line arguments
    pub fn from_args(args: &Args) -> Result<Self, JackError> {
        Self::from_overrides(args.overrides())
    }

    /// Build configuration from bundled defaults plus `key=value` overrides
    pub fn from_overrides(overrides: &[String]) -> Result<Self, JackError> {
        let mut options = parse_properties(DEFAULTS)?;

        for arg in overrides {
            let (key, value) = arg
                .split_once('=')
                .ok_or_else(|| JackError::config(format!("Invalid parameter {arg}")))?;
            if !KNOWN_KEYS.contains(&key) {
                return Err(JackError::config(format!("Unknown option {key}")));
            }
            options.insert(key.to_string(), value.to_string());
        }

        Self::from_options(&options)
    }

    fn from_options(options: &BTreeMap<String, String>) -> Result<Self, JackError> {
        let get = |key: &str| -> Result<String, JackError> {
            options
                .get(key)
                .cloned()
                .ok_or_else(|| JackError::config(format!("Missing option {key}")))
        };

        let transport = match get("transport")?.as_str() {
            "local" => Transport::Local {
                config: PathBuf::from(get("jackrabbit-config")?),
                home: PathBuf::from(get("jackrabbit-home")?),
            },
            "davex" => {
                let storage = get("storage")?;
                let storage = Url::parse(&storage).map_err(|e| {
                    JackError::config_with(format!("Invalid storage URL {storage}"), e)
                })?;
                Transport::Davex { storage }
            }
            other => {
                return Err(JackError::config(format!(
                    "Unknown transport requested: {other}"
                )));
            }
        };

        Ok(Self {
            username: get("username")?,
            password: get("password")?,
            base_path: get("repository-base-xpath")?,
            workspace: get("workspace")?,
            transport,
        })
    }
}

/// Parse `key=value` lines, skipping blanks and `#` comments
fn parse_properties(text: &str) -> Result<BTreeMap<String, String>, JackError> {
    let mut options = BTreeMap::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (key, value) = line
            .split_once('=')
            .ok_or_else(|| JackError::config(format!("Malformed defaults line: {line}")))?;
        let key = key.trim();
        if !KNOWN_KEYS.contains(&key) {
            return Err(JackError::config(format!(
                "Unknown option in defaults: {key}"
            )));
        }
        options.insert(key.to_string(), value.trim().to_string());
    }

    Ok(options)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overrides(args: &[&str]) -> Vec<String> {
        args.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_bundled_defaults_load() {
        let config = Config::from_overrides(&[]).unwrap();
        assert_eq!(config.username, "admin");
        assert_eq!(config.base_path, "/");
        assert_eq!(config.workspace, "default");
        assert!(matches!(config.transport, Transport::Local { .. }));
    }

    #[test]
    fn test_overrides_replace_defaults() {
        let config = Config::from_overrides(&overrides(&[
            "username=backup",
            "repository-base-xpath=/content",
            "workspace=staging",
        ]))
        .unwrap();
        assert_eq!(config.username, "backup");
        assert_eq!(config.base_path, "/content");
        assert_eq!(config.workspace, "staging");
        // untouched options keep their defaults
        assert_eq!(config.password, "admin");
    }

    #[test]
    fn test_davex_transport_parses_storage_url() {
        let config = Config::from_overrides(&overrides(&[
            "transport=davex",
            "storage=https://repo.example.com/server",
        ]))
        .unwrap();
        match config.transport {
            Transport::Davex { storage } => {
                assert_eq!(storage.as_str(), "https://repo.example.com/server");
            }
            other => panic!("Expected davex transport, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_transport_is_fatal() {
        let err = Config::from_overrides(&overrides(&["transport=carrier-pigeon"])).unwrap_err();
        assert!(err.to_string().contains("Unknown transport"));
    }

    #[test]
    fn test_malformed_override_is_fatal() {
        let err = Config::from_overrides(&overrides(&["username"])).unwrap_err();
        assert!(err.to_string().contains("Invalid parameter"));
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let err = Config::from_overrides(&overrides(&["colour=blue"])).unwrap_err();
        assert!(err.to_string().contains("Unknown option"));
    }

    #[test]
    fn test_value_may_contain_equals() {
        let config = Config::from_overrides(&overrides(&["password=a=b=c"])).unwrap();
        assert_eq!(config.password, "a=b=c");
    }

    #[test]
    fn test_invalid_storage_url_is_fatal() {
        let err = Config::from_overrides(&overrides(&["transport=davex", "storage=not a url"]))
            .unwrap_err();
        assert!(err.to_string().contains("Invalid storage URL"));
    }
}
