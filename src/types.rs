use serde::{Deserialize, Serialize};
use std::fmt;

/// Output zone identifier (1-based)
pub type ZoneId = u8;

/// Input identifier (1-based)
pub type InputId = u8;

/// Normalized volume level in `0.0..=1.0`
pub type VolumeLevel = f64;

/// Highest zone or input number the hardware family supports
pub const MAX_CHANNELS: u8 = 16;

/// Top of the device-native volume scale
pub const NATIVE_VOLUME_MAX: u8 = 100;

/// Convert a normalized level to the device-native volume scale.
///
/// Callers must have range-checked `level`.
pub fn level_to_native(level: VolumeLevel) -> u8 {
    (level * f64::from(NATIVE_VOLUME_MAX)).round() as u8
}

/// Convert a device-native volume back to a normalized level
pub fn native_to_level(native: u8) -> VolumeLevel {
    f64::from(native.min(NATIVE_VOLUME_MAX)) / f64::from(NATIVE_VOLUME_MAX)
}

/// Network address of the amplifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceEndpoint {
    pub host: String,
    pub port: u16,
}

impl DeviceEndpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for DeviceEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Believed state of one output zone.
///
/// The amplifier cannot be queried, so this is what we last told it, not what
/// it reports. Input and volume survive power-off.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneState {
    pub zone: ZoneId,

    pub power: bool,

    /// Last routed input; `None` until a route is sent
    pub input: Option<InputId>,

    /// Device-native volume (`0..=NATIVE_VOLUME_MAX`)
    pub volume: u8,

    /// Set by the host when it no longer trusts this belief
    #[serde(default)]
    pub stale: bool,
}

impl ZoneState {
    /// Initial belief for a freshly configured zone
    pub fn new(zone: ZoneId) -> Self {
        Self {
            zone,
            power: false,
            input: None,
            volume: 0,
            stale: false,
        }
    }

    /// Volume as a normalized level
    pub fn volume_level(&self) -> VolumeLevel {
        native_to_level(self.volume)
    }

    /// Input currently feeding the zone, only meaningful while powered
    pub fn active_input(&self) -> Option<InputId> {
        if self.power {
            self.input
        } else {
            None
        }
    }
}
