//! Gate configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use reval_gate::{DeliveryMode, RetryPolicy};

use crate::{LogFormat, NodeError};

/// A configuration value that must not show up in logs.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// A placeholder that shows whether a value was set, never the value.
    pub fn redacted(&self) -> Self {
        if self.0.is_empty() {
            Self::default()
        } else {
            Self::new(REDACTED)
        }
    }
}

const REDACTED: &str = "<redacted>";

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("\"\"")
        } else {
            write!(f, "\"{REDACTED}\"")
        }
    }
}

/// How proofs are checked before a record is completed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProofVerification {
    /// Accept any proof payload. Also enables the proof-less `/api/verify`.
    Trust,
    /// Require signatures from configured attestors.
    #[default]
    Attestor,
}

/// Proof-protocol settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProofConfig {
    #[serde(default)]
    pub app_id: String,

    #[serde(default)]
    pub app_secret: Secret,

    /// Category of proof members must produce.
    #[serde(default)]
    pub provider_id: String,

    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    #[serde(default)]
    pub delivery_mode: DeliveryMode,

    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Give up polling a session after this long.
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,

    #[serde(default)]
    pub proof_verification: ProofVerification,

    /// Hex Ed25519 public keys of trusted attestors.
    #[serde(default)]
    pub attestor_keys: Vec<String>,

    #[serde(default = "default_min_attestor_signatures")]
    pub min_attestor_signatures: usize,
}

/// Join-approval retry settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApprovalConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

/// Configuration for the gate process.
///
/// Can be loaded from a TOML file via [`GateConfig::from_toml_file`] or
/// built programmatically (e.g. for tests). Every field has a default, but
/// [`GateConfig::validate`] insists on the values that have no sensible one.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GateConfig {
    /// Public URL the gate is reachable at; links and callbacks hang off it.
    #[serde(default)]
    pub base_url: String,

    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default)]
    pub bot_token: Secret,

    /// Register `<base_url>/api/bot` as the Telegram webhook on start.
    #[serde(default)]
    pub register_webhook: bool,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_lmdb_map_size")]
    pub lmdb_map_size: usize,

    #[serde(default = "default_proof")]
    pub proof: ProofConfig,

    #[serde(default = "default_approval")]
    pub approval: ApprovalConfig,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_api_base_url() -> String {
    "https://api.reclaimprotocol.org".to_string()
}

fn default_poll_interval_secs() -> u64 {
    5
}

fn default_poll_timeout_secs() -> u64 {
    600
}

fn default_min_attestor_signatures() -> usize {
    1
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_listen_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./reval_data")
}

fn default_proof() -> ProofConfig {
    ProofConfig::default()
}

fn default_approval() -> ApprovalConfig {
    ApprovalConfig::default()
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_lmdb_map_size() -> usize {
    256 * 1024 * 1024
}

// ── Impl ───────────────────────────────────────────────────────────────

impl GateConfig {
    pub fn from_toml_file(path: &std::path::Path) -> Result<Self, NodeError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| NodeError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))
    }

    pub fn to_toml_string(&self) -> Result<String, NodeError> {
        toml::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// TOML for display: the bot token and app secret are replaced.
    pub fn to_redacted_toml_string(&self) -> Result<String, NodeError> {
        let mut shown = self.clone();
        shown.bot_token = self.bot_token.redacted();
        shown.proof.app_secret = self.proof.app_secret.redacted();
        shown.to_toml_string()
    }

    /// Reject configurations the gate cannot run with.
    pub fn validate(&self) -> Result<(), NodeError> {
        let missing = |what: &str| Err(NodeError::Config(format!("{what} is required")));

        if self.base_url.is_empty() {
            return missing("base_url");
        }
        if !(self.base_url.starts_with("https://") || self.base_url.starts_with("http://")) {
            return Err(NodeError::Config(format!(
                "base_url must be an http(s) URL, got {}",
                self.base_url
            )));
        }
        if self.bot_token.is_empty() {
            return missing("bot_token");
        }
        if self.proof.app_id.is_empty() {
            return missing("proof.app_id");
        }
        if self.proof.app_secret.is_empty() {
            return missing("proof.app_secret");
        }
        if self.proof.provider_id.is_empty() {
            return missing("proof.provider_id");
        }
        if self.proof.poll_interval_secs == 0 {
            return Err(NodeError::Config(
                "proof.poll_interval_secs must be positive".into(),
            ));
        }
        if self.proof.poll_timeout_secs < self.proof.poll_interval_secs {
            return Err(NodeError::Config(
                "proof.poll_timeout_secs must be at least one poll interval".into(),
            ));
        }
        if self.proof.proof_verification == ProofVerification::Attestor {
            if self.proof.attestor_keys.is_empty() {
                return Err(NodeError::Config(
                    "attestor verification needs proof.attestor_keys".into(),
                ));
            }
            if self.proof.min_attestor_signatures == 0
                || self.proof.min_attestor_signatures > self.proof.attestor_keys.len()
            {
                return Err(NodeError::Config(format!(
                    "proof.min_attestor_signatures must be between 1 and {}",
                    self.proof.attestor_keys.len()
                )));
            }
        }
        self.socket_addr()?;
        self.log_format()?;
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, NodeError> {
        self.listen_addr
            .parse()
            .map_err(|e| NodeError::Config(format!("listen_addr {}: {e}", self.listen_addr)))
    }

    pub fn log_format(&self) -> Result<LogFormat, NodeError> {
        self.log_format.parse()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.proof.poll_interval_secs)
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.proof.poll_timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.approval.max_attempts,
            Duration::from_millis(self.approval.base_delay_ms),
        )
    }
}

impl Default for ProofConfig {
    fn default() -> Self {
        Self {
            app_id: String::new(),
            app_secret: Secret::default(),
            provider_id: String::new(),
            api_base_url: default_api_base_url(),
            delivery_mode: DeliveryMode::default(),
            poll_interval_secs: default_poll_interval_secs(),
            poll_timeout_secs: default_poll_timeout_secs(),
            proof_verification: ProofVerification::default(),
            attestor_keys: Vec::new(),
            min_attestor_signatures: default_min_attestor_signatures(),
        }
    }
}

impl Default for ApprovalConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            listen_addr: default_listen_addr(),
            data_dir: default_data_dir(),
            bot_token: Secret::default(),
            register_webhook: false,
            proof: ProofConfig::default(),
            approval: ApprovalConfig::default(),
            log_format: default_log_format(),
            log_level: default_log_level(),
            lmdb_map_size: default_lmdb_map_size(),
        }
    }
}
