//! Rust library for controlling Control4 matrix amplifiers
//!
//! The amplifier listens for ASCII commands on UDP and never answers. This
//! library encodes those commands, sends them, and keeps a local belief of
//! each output zone's state. It supports:
//!
//! - Routing an input to an output (which also powers the output on)
//! - Powering outputs off while remembering their input and volume
//! - Per-output volume on the device's native hex scale
//! - Media-player style zone handles with named sources
//! - Subscriptions to committed zone changes
//!
//! # Quick Start
//!
//! ```no_run
//! use c4_matrix_amp::{AmpConfig, MatrixAmp};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AmpConfig::new("192.168.1.50").with_outputs(3).with_inputs(6);
//!     let amp = MatrixAmp::connect(config).await?;
//!
//!     amp.turn_on(1, 3).await?;
//!     amp.set_volume(1, 0.5).await?;
//!     amp.turn_off(1).await?;
//!
//!     // Input 3 is remembered while the zone is off
//!     let state = amp.read_state(1)?;
//!     assert!(!state.power);
//!     assert_eq!(state.input, Some(3));
//!     Ok(())
//! }
//! ```
//!
//! # Believed state
//!
//! A command that left the local network stack without error is the
//! strongest success signal the protocol offers. The mirror is updated on
//! that signal and can drift if the amplifier drops a datagram or loses
//! power. Hosts that learn of such drift can call
//! [`MatrixAmp::mark_stale`].
//!
//! # Architecture
//!
//! - **Client**: [`MatrixAmp`], the operation set hosts call
//! - **Zone**: media-player view of one output
//! - **Mirror**: per-zone believed state with per-zone locking
//! - **Protocol**: command encoding and correlation tokens
//! - **Connection**: send-only UDP transport
//! - **Config**: static device configuration

mod client;
mod config;
mod connection;
mod error;
mod mirror;
mod protocol;
mod subscription;
mod types;
mod zone;

// Public exports
pub use client::MatrixAmp;
pub use config::{
    AmpConfig, DEFAULT_NAME, DEFAULT_NUM_INPUTS, DEFAULT_NUM_OUTPUTS, DEFAULT_PORT,
    DEFAULT_SEND_TIMEOUT_MS,
};
pub use connection::{Transport, UdpTransport};
pub use error::{AmpError, Result};
pub use mirror::ZoneMirror;
pub use protocol::{
    decode_volume_hex, encode_volume_hex, Command, CommandEncoder, CommandKind,
    CorrelationToken, TokenGenerator, TOKEN_MARKER,
};
pub use subscription::{ZoneReceiver, ZoneUpdate};
pub use types::{
    level_to_native, native_to_level, DeviceEndpoint, InputId, VolumeLevel, ZoneId, ZoneState,
    MAX_CHANNELS, NATIVE_VOLUME_MAX,
};
pub use zone::{Zone, FALLBACK_INPUT};
