use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::dedup::{StoreFailurePolicy, DEFAULT_RETENTION};
use crate::error::DispatchError;

/// Runtime configuration for the dispatch service.
///
/// Secret-bearing fields accept `env:NAME` references, resolved by
/// [`DispatchConfig::load`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Shared token every payload must carry.
    pub verification_token: String,
    /// Enables `x-slack-signature` checking when set.
    pub signing_secret: Option<String>,
    /// Dedup table identifier. No table disables deduplication.
    ///
    /// The shipped store is in-process: the name labels the map, and claims
    /// are not shared between replicas.
    pub dedup_table: Option<String>,
    pub dedup_failure_policy: StoreFailurePolicy,
    /// Seconds a claimed dedup key blocks redeliveries.
    pub dedup_retention_secs: u64,
    pub bind_address: String,
    pub port: u16,
    pub event_path: String,
    pub interaction_path: String,
    /// Request bodies above this size are refused before parsing.
    pub max_body_bytes: usize,
    /// Bot token (xoxb-...) for outbound Web API calls.
    pub bot_token: Option<String>,
    pub notify_unknown_commands: bool,
    /// Append dispatch records as JSON lines to this file.
    pub dispatch_log: Option<PathBuf>,
}

/// Environment variables that override file values.
pub const ENV_VERIFICATION_TOKEN: &str = "SLACK_VERIFICATION_TOKEN";
pub const ENV_SIGNING_SECRET: &str = "SLACK_SIGNING_SECRET";
pub const ENV_BOT_TOKEN: &str = "SLACK_TOKEN";
pub const ENV_DEDUP_TABLE: &str = "DEDUP_TABLE";

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            verification_token: String::new(),
            signing_secret: None,
            dedup_table: None,
            dedup_failure_policy: StoreFailurePolicy::default(),
            dedup_retention_secs: DEFAULT_RETENTION.as_secs(),
            bind_address: "0.0.0.0".to_string(),
            port: 3100,
            event_path: "/message".to_string(),
            interaction_path: "/interact".to_string(),
            max_body_bytes: 64 * 1024,
            bot_token: None,
            notify_unknown_commands: true,
            dispatch_log: None,
        }
    }
}

impl DispatchConfig {
    /// Load from an optional TOML file, overlay the process environment
    /// (including a `.env` file), resolve `env:` references and validate.
    ///
    /// A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, DispatchError> {
        if let Ok(env_file) = dotenvy::dotenv() {
            tracing::debug!(path = %env_file.display(), "Loaded .env file");
        }

        let mut config = match path {
            Some(p) if p.exists() => Self::from_file(p)?,
            Some(p) => {
                tracing::warn!(path = %p.display(), "Config file not found, using defaults");
                Self::default()
            }
            None => Self::default(),
        };
        config.apply_env_overrides(|name| std::env::var(name).ok());
        config.resolve_secrets()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, DispatchError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            DispatchError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
            .map_err(|e| DispatchError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn from_toml_str(content: &str) -> Result<Self, DispatchError> {
        toml::from_str(content)
            .map_err(|e| DispatchError::Config(format!("failed to parse config: {}", e)))
    }

    /// Overlay values from `lookup`. Empty values are ignored.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.is_empty());

        if let Some(v) = get(ENV_VERIFICATION_TOKEN) {
            self.verification_token = v;
        }
        if let Some(v) = get(ENV_SIGNING_SECRET) {
            self.signing_secret = Some(v);
        }
        if let Some(v) = get(ENV_BOT_TOKEN) {
            self.bot_token = Some(v);
        }
        if let Some(v) = get(ENV_DEDUP_TABLE) {
            self.dedup_table = Some(v);
        }
    }

    fn resolve_secrets(&mut self) -> Result<(), DispatchError> {
        self.verification_token = resolve_secret(&self.verification_token)?;
        for slot in [&mut self.signing_secret, &mut self.bot_token] {
            if let Some(value) = slot.as_mut() {
                *value = resolve_secret(value)?;
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), DispatchError> {
        if self.verification_token.trim().is_empty() {
            return Err(DispatchError::Config(format!(
                "verification token is empty (set verification_token or {})",
                ENV_VERIFICATION_TOKEN
            )));
        }
        for (name, path) in [
            ("event_path", &self.event_path),
            ("interaction_path", &self.interaction_path),
        ] {
            if !path.starts_with('/') {
                return Err(DispatchError::Config(format!(
                    "{} must start with '/': {}",
                    name, path
                )));
            }
        }
        if self.event_path == self.interaction_path {
            return Err(DispatchError::Config(
                "event_path and interaction_path must differ".to_string(),
            ));
        }
        if self.max_body_bytes == 0 {
            return Err(DispatchError::Config(
                "max_body_bytes must be positive".to_string(),
            ));
        }
        if self.dedup_retention_secs == 0 {
            return Err(DispatchError::Config(
                "dedup_retention_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

/// Resolve a value that may reference an environment variable.
///
/// `env:NAME` returns the value of `NAME`; anything else is returned as is.
pub fn resolve_secret(value: &str) -> Result<String, DispatchError> {
    if let Some(var_name) = value.strip_prefix("env:") {
        std::env::var(var_name).map_err(|_| {
            DispatchError::Config(format!("environment variable '{}' not set", var_name))
        })
    } else {
        Ok(value.to_string())
    }
}
