//! Wire encoding for the amplifier's ASCII command protocol.
//!
//! Every datagram is a correlation token, one space, then the command:
//!
//! ```text
//! 0s2a07 c4.amp.out 3 005     route input 5 to output 3 (powers it on)
//! 0s2a08 c4.amp.out 3 00      power off output 3
//! 0s2a09 c4.amp.chvol 3 32    output 3 volume 0x32 (50 of 100)
//! ```

use crate::error::{AmpError, Result};
use crate::types::{level_to_native, native_to_level, InputId, VolumeLevel, ZoneId, NATIVE_VOLUME_MAX};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};

/// Literal marker that opens every correlation token
pub const TOKEN_MARKER: &str = "0s2a";

const ROUTE_VERB: &str = "c4.amp.out";
const VOLUME_VERB: &str = "c4.amp.chvol";

/// Input field sent to disconnect an output
const POWER_OFF_FIELD: &str = "00";

/// Per-command prefix that tells datagrams apart in logs and captures.
///
/// Not an acknowledgment handle; the device never echoes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CorrelationToken(u8);

impl CorrelationToken {
    /// Token with the given sequence number (taken modulo 100)
    pub fn new(seq: u8) -> Self {
        Self(seq % 100)
    }

    pub fn seq(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for CorrelationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:02}", TOKEN_MARKER, self.0)
    }
}

impl FromStr for CorrelationToken {
    type Err = AmpError;

    fn from_str(s: &str) -> Result<Self> {
        let digits = s
            .strip_prefix(TOKEN_MARKER)
            .ok_or_else(|| AmpError::InvalidPayload(format!("token '{}' lacks marker", s)))?;
        if digits.len() != 2 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AmpError::InvalidPayload(format!(
                "token '{}' must end in two digits",
                s
            )));
        }
        let seq = digits
            .parse::<u8>()
            .map_err(|e| AmpError::InvalidPayload(e.to_string()))?;
        Ok(Self(seq))
    }
}

/// Hands out correlation tokens `00..=99`, wrapping
#[derive(Debug, Default)]
pub struct TokenGenerator {
    next: AtomicU8,
}

impl TokenGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generator whose first token is `seq`
    pub fn starting_at(seq: u8) -> Self {
        Self {
            next: AtomicU8::new(seq % 100),
        }
    }

    pub fn next_token(&self) -> CorrelationToken {
        let seq = self
            .next
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| Some((n + 1) % 100))
            .unwrap_or_default();
        CorrelationToken::new(seq)
    }
}

/// Logical operation carried by a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// Route an input to the output; also powers the output on
    Route { input: InputId },
    /// Disconnect all inputs from the output
    PowerOff,
    /// Set output volume on the device-native scale
    SetVolume { volume: u8 },
}

/// A single encoded command, alive only between encoding and send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command {
    pub zone: ZoneId,
    pub kind: CommandKind,
    pub token: CorrelationToken,
}

impl Command {
    /// The full datagram text, token included
    pub fn payload(&self) -> String {
        self.to_string()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.payload().into_bytes()
    }

    /// Normalized volume for `SetVolume` commands
    pub fn level(&self) -> Option<VolumeLevel> {
        match self.kind {
            CommandKind::SetVolume { volume } => Some(native_to_level(volume)),
            _ => None,
        }
    }

    /// Parse a captured datagram back into a command.
    ///
    /// Only syntax is checked; zone and input ranges depend on the amplifier.
    pub fn parse(payload: &str) -> Result<Self> {
        let (token, body) = payload
            .trim_end()
            .split_once(' ')
            .ok_or_else(|| AmpError::InvalidPayload(format!("no command after token in '{}'", payload)))?;
        let token: CorrelationToken = token.parse()?;

        let mut parts = body.split_whitespace();
        let (verb, zone, operand) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(verb), Some(zone), Some(operand), None) => (verb, zone, operand),
            _ => {
                return Err(AmpError::InvalidPayload(format!(
                    "expected '<verb> <output> <operand>', got '{}'",
                    body
                )))
            }
        };

        let zone = zone
            .parse::<ZoneId>()
            .map_err(|_| AmpError::InvalidPayload(format!("bad output field '{}'", zone)))?;

        let kind = match verb {
            ROUTE_VERB => parse_route_field(operand)?,
            VOLUME_VERB => CommandKind::SetVolume {
                volume: parse_volume_hex(operand)?,
            },
            other => return Err(AmpError::InvalidPayload(format!("unknown verb '{}'", other))),
        };

        Ok(Self { zone, kind, token })
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            CommandKind::Route { input } => {
                write!(f, "{} {} {} 0{:02}", self.token, ROUTE_VERB, self.zone, input)
            }
            CommandKind::PowerOff => {
                write!(f, "{} {} {} {}", self.token, ROUTE_VERB, self.zone, POWER_OFF_FIELD)
            }
            CommandKind::SetVolume { volume } => {
                write!(f, "{} {} {} {}", self.token, VOLUME_VERB, self.zone, encode_volume_hex(volume))
            }
        }
    }
}

impl FromStr for Command {
    type Err = AmpError;

    fn from_str(s: &str) -> Result<Self> {
        Command::parse(s)
    }
}

/// Read the input field of a route: `00` is power-off, `0NN` routes input NN
fn parse_route_field(field: &str) -> Result<CommandKind> {
    if field == POWER_OFF_FIELD {
        return Ok(CommandKind::PowerOff);
    }
    let digits = field
        .strip_prefix('0')
        .filter(|d| d.len() == 2 && d.bytes().all(|b| b.is_ascii_digit()))
        .ok_or_else(|| {
            AmpError::InvalidPayload(format!("input field '{}' must be '00' or '0' + two digits", field))
        })?;
    let input = digits
        .parse::<InputId>()
        .map_err(|_| AmpError::InvalidPayload(format!("bad input field '{}'", field)))?;
    if input == 0 {
        return Err(AmpError::InvalidPayload(format!("input field '{}' routes no input", field)));
    }
    Ok(CommandKind::Route { input })
}

/// Render a native volume as the device's two-digit lowercase hex
pub fn encode_volume_hex(volume: u8) -> String {
    format!("{:02x}", volume)
}

fn parse_volume_hex(hex: &str) -> Result<u8> {
    if hex.len() != 2 {
        return Err(AmpError::InvalidPayload(format!("volume '{}' must be two hex digits", hex)));
    }
    let volume = u8::from_str_radix(hex, 16)
        .map_err(|_| AmpError::InvalidPayload(format!("bad volume hex '{}'", hex)))?;
    if volume > NATIVE_VOLUME_MAX {
        return Err(AmpError::InvalidPayload(format!(
            "volume 0x{} above device maximum 0x{:02x}",
            hex, NATIVE_VOLUME_MAX
        )));
    }
    Ok(volume)
}

/// Map device volume hex back to a normalized level
pub fn decode_volume_hex(hex: &str) -> Result<VolumeLevel> {
    parse_volume_hex(hex).map(native_to_level)
}

/// Builds range-checked commands for an amplifier of a given size.
///
/// Never touches the mirror or the transport.
#[derive(Debug)]
pub struct CommandEncoder {
    num_outputs: u8,
    num_inputs: u8,
    tokens: TokenGenerator,
}

impl CommandEncoder {
    pub fn new(num_outputs: u8, num_inputs: u8) -> Self {
        Self::with_tokens(num_outputs, num_inputs, TokenGenerator::new())
    }

    pub fn with_tokens(num_outputs: u8, num_inputs: u8, tokens: TokenGenerator) -> Self {
        Self {
            num_outputs,
            num_inputs,
            tokens,
        }
    }

    pub fn num_outputs(&self) -> u8 {
        self.num_outputs
    }

    pub fn num_inputs(&self) -> u8 {
        self.num_inputs
    }

    /// Route `input` to `output`. This is also the power-on command.
    pub fn encode_route(&self, output: ZoneId, input: InputId) -> Result<Command> {
        self.check_output(output)?;
        self.check_input(input)?;
        Ok(self.build(output, CommandKind::Route { input }))
    }

    pub fn encode_power_off(&self, output: ZoneId) -> Result<Command> {
        self.check_output(output)?;
        Ok(self.build(output, CommandKind::PowerOff))
    }

    pub fn encode_volume(&self, output: ZoneId, level: VolumeLevel) -> Result<Command> {
        self.check_output(output)?;
        check_level(level)?;
        Ok(self.build(
            output,
            CommandKind::SetVolume {
                volume: level_to_native(level),
            },
        ))
    }

    pub fn check_output(&self, output: ZoneId) -> Result<()> {
        if output == 0 || output > self.num_outputs {
            return Err(AmpError::invalid(
                "output",
                output,
                format!("expected 1..={}", self.num_outputs),
            ));
        }
        Ok(())
    }

    pub fn check_input(&self, input: InputId) -> Result<()> {
        if input == 0 || input > self.num_inputs {
            return Err(AmpError::invalid(
                "input",
                input,
                format!("expected 1..={}", self.num_inputs),
            ));
        }
        Ok(())
    }

    fn build(&self, zone: ZoneId, kind: CommandKind) -> Command {
        Command {
            zone,
            kind,
            token: self.tokens.next_token(),
        }
    }
}

fn check_level(level: VolumeLevel) -> Result<()> {
    if !(0.0..=1.0).contains(&level) {
        return Err(AmpError::invalid("volume", level, "expected 0.0..=1.0"));
    }
    Ok(())
}
