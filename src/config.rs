use crate::error::{AmpError, Result};
use crate::types::{DeviceEndpoint, MAX_CHANNELS};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default UDP port of the amplifier's control listener
pub const DEFAULT_PORT: u16 = 8750;

/// Default display name
pub const DEFAULT_NAME: &str = "Control4 Matrix Amp";

pub const DEFAULT_NUM_INPUTS: u8 = 6;
pub const DEFAULT_NUM_OUTPUTS: u8 = 16;

/// Default local send deadline in milliseconds
pub const DEFAULT_SEND_TIMEOUT_MS: u64 = 1000;

/// Static configuration of one amplifier.
///
/// Field names follow the integration's config entry, so a stored entry
/// deserializes directly:
///
/// ```
/// use c4_matrix_amp::AmpConfig;
///
/// let config = AmpConfig::from_json_str(r#"{"host": "192.168.1.50", "num_outputs": 8}"#).unwrap();
/// assert_eq!(config.port, 8750);
/// assert_eq!(config.num_inputs, 6);
/// assert_eq!(config.num_outputs, 8);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmpConfig {
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_name")]
    pub name: String,

    #[serde(default = "default_num_inputs")]
    pub num_inputs: u8,

    #[serde(default = "default_num_outputs")]
    pub num_outputs: u8,

    /// Bounds the local socket send only; the device never acknowledges
    #[serde(default = "default_send_timeout_ms")]
    pub send_timeout_ms: u64,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_name() -> String {
    DEFAULT_NAME.to_string()
}

fn default_num_inputs() -> u8 {
    DEFAULT_NUM_INPUTS
}

fn default_num_outputs() -> u8 {
    DEFAULT_NUM_OUTPUTS
}

fn default_send_timeout_ms() -> u64 {
    DEFAULT_SEND_TIMEOUT_MS
}

impl AmpConfig {
    /// Configuration for `host` with every other field defaulted
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            name: default_name(),
            num_inputs: DEFAULT_NUM_INPUTS,
            num_outputs: DEFAULT_NUM_OUTPUTS,
            send_timeout_ms: DEFAULT_SEND_TIMEOUT_MS,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_inputs(mut self, num_inputs: u8) -> Self {
        self.num_inputs = num_inputs;
        self
    }

    pub fn with_outputs(mut self, num_outputs: u8) -> Self {
        self.num_outputs = num_outputs;
        self
    }

    pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Parse and validate a JSON config entry
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: AmpConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a JSON config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            AmpError::InvalidConfig(format!("cannot read {}: {}", path.display(), e))
        })?;
        tracing::debug!("Loaded amp config from {}", path.display());
        Self::from_json_str(&text)
    }

    /// Check every field against the hardware limits
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(AmpError::InvalidConfig("host must not be empty".to_string()));
        }
        if self.port == 0 {
            return Err(AmpError::InvalidConfig("port must be non-zero".to_string()));
        }
        if !(1..=MAX_CHANNELS).contains(&self.num_inputs) {
            return Err(AmpError::InvalidConfig(format!(
                "num_inputs must be between 1 and {}, got {}",
                MAX_CHANNELS, self.num_inputs
            )));
        }
        if !(1..=MAX_CHANNELS).contains(&self.num_outputs) {
            return Err(AmpError::InvalidConfig(format!(
                "num_outputs must be between 1 and {}, got {}",
                MAX_CHANNELS, self.num_outputs
            )));
        }
        if self.send_timeout_ms == 0 {
            return Err(AmpError::InvalidConfig("send_timeout_ms must be >= 1".to_string()));
        }
        Ok(())
    }

    pub fn endpoint(&self) -> DeviceEndpoint {
        DeviceEndpoint::new(self.host.clone(), self.port)
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }
}
