//! Application configuration
//!
//! Read from an optional YAML file, then overridden by the process
//! environment.

use bangle_sync::DEFAULT_MAX_PENDING;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

static HELP_DOCS_VERSION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+\.\d+\.\d+").expect("valid help docs version regex"));

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Invalid HELP_DOCS_VERSION: {0}")]
    InvalidHelpDocsVersion(String),

    #[error("Unknown app environment: {0}")]
    UnknownAppEnv(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppEnv {
    #[default]
    Development,
    Production,
    Test,
    Integration,
}

impl FromStr for AppEnv {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "development" => Ok(AppEnv::Development),
            "production" => Ok(AppEnv::Production),
            "test" => Ok(AppEnv::Test),
            "integration" => Ok(AppEnv::Integration),
            other => Err(ConfigError::UnknownAppEnv(other.to_string())),
        }
    }
}

impl fmt::Display for AppEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AppEnv::Development => "development",
            AppEnv::Production => "production",
            AppEnv::Test => "test",
            AppEnv::Integration => "integration",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncSettings {
    #[serde(default = "default_max_pending")]
    pub max_pending: usize,
}

fn default_max_pending() -> usize {
    DEFAULT_MAX_PENDING
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            max_pending: default_max_pending(),
        }
    }
}

/// Main configuration struct matching bangle.yml
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub app_env: AppEnv,
    pub release_id: Option<String>,
    pub deploy_env: Option<String>,
    pub help_docs_version: String,
    pub sync: SyncSettings,
    pub workspaces_root: Option<PathBuf>,

    // Per process, never read from a file
    #[serde(skip)]
    tab_id: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_env: AppEnv::default(),
            release_id: None,
            deploy_env: None,
            help_docs_version: env!("CARGO_PKG_VERSION").to_string(),
            sync: SyncSettings::default(),
            workspaces_root: None,
            tab_id: new_tab_id(),
        }
    }
}

fn new_tab_id() -> String {
    let random = uuid::Uuid::new_v4().simple().to_string();
    format!("tab_{}", &random[..4])
}

impl AppConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let config: AppConfig = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// File (if any), then environment, then validation
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Override fields from environment variables found by `lookup`
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(app_env) = lookup("APP_ENV").or_else(|| lookup("NODE_ENV")) {
            self.app_env = app_env.parse()?;
        }
        if let Some(release_id) = lookup("RELEASE_ID") {
            self.release_id = Some(release_id);
        }
        if let Some(deploy_env) = lookup("DEPLOY_ENV") {
            self.deploy_env = Some(deploy_env);
        }
        if let Some(version) = lookup("HELP_DOCS_VERSION") {
            self.help_docs_version = version;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !HELP_DOCS_VERSION_RE.is_match(&self.help_docs_version) {
            return Err(ConfigError::InvalidHelpDocsVersion(
                self.help_docs_version.clone(),
            ));
        }
        Ok(())
    }

    pub fn tab_id(&self) -> &str {
        &self.tab_id
    }

    pub fn is_test(&self) -> bool {
        self.app_env == AppEnv::Test
    }

    pub fn is_production(&self) -> bool {
        self.app_env == AppEnv::Production
    }

    pub fn is_integration(&self) -> bool {
        self.app_env == AppEnv::Integration
    }
}
