//! Runtime configuration.
//!
//! Settings come from defaults overridden by environment variables. The
//! policy rules are either the built-in disruption budget rule or a YAML
//! file named by `WEBHOOK_POLICY_FILE`.

pub mod schema;

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;

use crate::webhooks::policies::PolicySet;

pub use schema::{PolicyFile, RuleAction};

/// Default webhook server port
pub const DEFAULT_WEBHOOK_PORT: u16 = 8443;
/// Default path to webhook TLS certificate, relative to the working directory
pub const DEFAULT_CERT_PATH: &str = "tls.crt";
/// Default path to webhook TLS private key, relative to the working directory
pub const DEFAULT_KEY_PATH: &str = "tls.key";
/// Default upper bound on a review body
pub const DEFAULT_MAX_BODY_BYTES: usize = 3 * 1024 * 1024;

pub const ENV_PORT: &str = "WEBHOOK_PORT";
pub const ENV_CERT_PATH: &str = "WEBHOOK_CERT_PATH";
pub const ENV_KEY_PATH: &str = "WEBHOOK_KEY_PATH";
pub const ENV_MAX_BODY_BYTES: &str = "WEBHOOK_MAX_BODY_BYTES";
pub const ENV_POLICY_FILE: &str = "WEBHOOK_POLICY_FILE";
pub const ENV_METRICS_PORT: &str = "METRICS_PORT";

/// Errors raised while loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Environment variable present but unparsable
    #[error("invalid value {value:?} for {key}: {reason}")]
    InvalidEnv {
        key: &'static str,
        value: String,
        reason: String,
    },

    /// Policy file could not be read
    #[error("read policy file {path} failed: {source}")]
    ReadPolicyFile {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Policy file is not valid YAML for the schema
    #[error("invalid policy yaml: {0}")]
    InvalidYaml(#[from] serde_yaml::Error),

    #[error("unsupported policy file version {0}")]
    UnsupportedVersion(u32),

    /// Policy file parsed but failed validation
    #[error("invalid policy: {0}")]
    InvalidPolicy(String),
}

/// Webhook server settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookConfig {
    pub port: u16,
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
    pub max_body_bytes: usize,
    pub policy_file: Option<PathBuf>,
    /// Plaintext metrics listener; disabled when `None`
    pub metrics_port: Option<u16>,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_WEBHOOK_PORT,
            cert_path: PathBuf::from(DEFAULT_CERT_PATH),
            key_path: PathBuf::from(DEFAULT_KEY_PATH),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            policy_file: None,
            metrics_port: None,
        }
    }
}

impl WebhookConfig {
    /// Load settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(port) = parse_var(&lookup, ENV_PORT)? {
            cfg.port = port;
        }
        if let Some(path) = lookup(ENV_CERT_PATH).filter(|v| !v.is_empty()) {
            cfg.cert_path = PathBuf::from(path);
        }
        if let Some(path) = lookup(ENV_KEY_PATH).filter(|v| !v.is_empty()) {
            cfg.key_path = PathBuf::from(path);
        }
        if let Some(limit) = parse_var::<usize, _>(&lookup, ENV_MAX_BODY_BYTES)? {
            if limit == 0 {
                return Err(ConfigError::InvalidEnv {
                    key: ENV_MAX_BODY_BYTES,
                    value: limit.to_string(),
                    reason: "must be greater than zero".to_string(),
                });
            }
            cfg.max_body_bytes = limit;
        }
        cfg.policy_file = lookup(ENV_POLICY_FILE)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        cfg.metrics_port = parse_var(&lookup, ENV_METRICS_PORT)?;

        Ok(cfg)
    }

    /// Build the policy set: from the configured file, or the built-in rule.
    pub fn load_policies(&self) -> Result<PolicySet, ConfigError> {
        match &self.policy_file {
            Some(path) => load_policy_file(path),
            None => Ok(PolicySet::default()),
        }
    }
}

fn parse_var<T, F>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::InvalidEnv {
                key,
                reason: e.to_string(),
                value,
            }),
    }
}

pub fn load_policy_file(path: &Path) -> Result<PolicySet, ConfigError> {
    let s = fs::read_to_string(path).map_err(|source| ConfigError::ReadPolicyFile {
        path: path.to_path_buf(),
        source,
    })?;
    load_policies_from_str(&s)
}

pub fn load_policies_from_str(s: &str) -> Result<PolicySet, ConfigError> {
    let file: PolicyFile = serde_yaml::from_str(s)?;
    file.into_policy_set()
}
