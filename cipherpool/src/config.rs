//! Explicit client configuration.
//!
//! The configuration is a plain value held by the client object. Defaults
//! come from the environment; call sites merge overrides through
//! [`ConfigOverrides`] instead of mutating shared state.

use crate::error::PoolError;
use serde::{Deserialize, Serialize};

pub const DEFAULT_NODE: &str = "https://testnet.collector.cipherpool.dev";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Stub,
    Testnet,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PoolConfig {
    pub mode: Mode,
    /// Collector base URL. HTTPS only.
    pub node: String,
    /// Execution-context identifier stamped into every tally.
    pub mxe_id: Option<String>,
    /// Secret material the tally signer is derived from.
    pub attester_secret: Option<String>,
    /// Collector API key, required on the remote compute path.
    pub api_key: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub mode: Option<Mode>,
    pub node: Option<String>,
    pub mxe_id: Option<String>,
    pub attester_secret: Option<String>,
    pub api_key: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigKey {
    MxeId,
    AttesterSecret,
    ApiKey,
}

impl ConfigKey {
    pub fn name(self) -> &'static str {
        match self {
            ConfigKey::MxeId => "mxe_id",
            ConfigKey::AttesterSecret => "attester_secret",
            ConfigKey::ApiKey => "api_key",
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Stub,
            node: DEFAULT_NODE.to_string(),
            mxe_id: None,
            attester_secret: None,
            api_key: None,
        }
    }
}

impl PoolConfig {
    /// Build a configuration from the environment.
    ///
    /// Reads `CIPHERPOOL_MODE`, `CIPHERPOOL_NODE`, `CIPHERPOOL_MXE_ID`,
    /// `CIPHERPOOL_ATTESTER_SECRET` and `CIPHERPOOL_API_KEY`; anything unset
    /// keeps its default.
    pub fn from_env() -> Result<Self, PoolError> {
        let mut config = Self::default();

        if let Ok(mode) = std::env::var("CIPHERPOOL_MODE") {
            config.mode = parse_mode(&mode)?;
        }
        if let Ok(node) = std::env::var("CIPHERPOOL_NODE") {
            config.node = node;
        }
        config.mxe_id = non_empty_env("CIPHERPOOL_MXE_ID");
        config.attester_secret = non_empty_env("CIPHERPOOL_ATTESTER_SECRET");
        config.api_key = non_empty_env("CIPHERPOOL_API_KEY");

        config.validate()?;
        Ok(config)
    }

    /// Merge call-site overrides over this configuration.
    pub fn merged(&self, overrides: ConfigOverrides) -> Result<Self, PoolError> {
        let merged = Self {
            mode: overrides.mode.unwrap_or(self.mode),
            node: overrides.node.unwrap_or_else(|| self.node.clone()),
            mxe_id: overrides.mxe_id.or_else(|| self.mxe_id.clone()),
            attester_secret: overrides.attester_secret.or_else(|| self.attester_secret.clone()),
            api_key: overrides.api_key.or_else(|| self.api_key.clone()),
        };
        merged.validate()?;
        Ok(merged)
    }

    /// Fail with `ConfigMissing` when any requested key is absent or empty.
    pub fn require(&self, keys: &[ConfigKey]) -> Result<(), PoolError> {
        for key in keys {
            match key {
                ConfigKey::MxeId => self.require_mxe_id().map(|_| ())?,
                ConfigKey::AttesterSecret => self.require_attester_secret().map(|_| ())?,
                ConfigKey::ApiKey => self.require_api_key().map(|_| ())?,
            }
        }
        Ok(())
    }

    pub fn require_mxe_id(&self) -> Result<&str, PoolError> {
        required(&self.mxe_id, "mxe_id")
    }

    pub fn require_attester_secret(&self) -> Result<&str, PoolError> {
        required(&self.attester_secret, "attester_secret")
    }

    pub fn require_api_key(&self) -> Result<&str, PoolError> {
        required(&self.api_key, "api_key")
    }

    fn validate(&self) -> Result<(), PoolError> {
        if !self.node.starts_with("https://") {
            return Err(PoolError::ConfigInvalid(format!(
                "collector node must use HTTPS: {}",
                self.node
            )));
        }
        Ok(())
    }
}

fn required<'a>(value: &'a Option<String>, name: &'static str) -> Result<&'a str, PoolError> {
    value
        .as_deref()
        .filter(|value| !value.is_empty())
        .ok_or(PoolError::ConfigMissing(name))
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

fn parse_mode(raw: &str) -> Result<Mode, PoolError> {
    match raw {
        "stub" => Ok(Mode::Stub),
        "testnet" => Ok(Mode::Testnet),
        other => Err(PoolError::ConfigInvalid(format!(
            "mode must be \"stub\" or \"testnet\", got \"{other}\""
        ))),
    }
}
