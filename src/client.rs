use crate::config::AmpConfig;
use crate::connection::{Transport, UdpTransport};
use crate::error::{AmpError, Result};
use crate::mirror::ZoneMirror;
use crate::protocol::{Command, CommandEncoder};
use crate::subscription::ZoneReceiver;
use crate::types::{DeviceEndpoint, InputId, VolumeLevel, ZoneId, ZoneState};
use crate::zone::Zone;
use futures_util::future::join_all;
use std::sync::Arc;

struct AmpInner {
    config: AmpConfig,
    endpoint: DeviceEndpoint,
    encoder: CommandEncoder,
    transport: Arc<dyn Transport>,
    mirror: ZoneMirror,
}

/// Client for one Control4 matrix amplifier
///
/// `MatrixAmp` encodes commands, sends them over UDP and keeps the believed
/// state of every output zone. The device never answers, so the state read
/// back here is what was last sent successfully, not what the amplifier
/// reports. Cloning is cheap and shares the same mirror.
#[derive(Clone)]
pub struct MatrixAmp {
    inner: Arc<AmpInner>,
}

impl MatrixAmp {
    /// Validate the configuration and bind a UDP transport
    ///
    /// # Example
    ///
    /// ```no_run
    /// use c4_matrix_amp::{AmpConfig, MatrixAmp};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let amp = MatrixAmp::connect(AmpConfig::new("192.168.1.50").with_outputs(4)).await?;
    ///     amp.turn_on(1, 3).await?;
    ///     amp.set_volume(1, 0.4).await?;
    ///     println!("{:?}", amp.read_state(1)?);
    ///     Ok(())
    /// }
    /// ```
    pub async fn connect(config: AmpConfig) -> Result<Self> {
        config.validate()?;
        let transport = UdpTransport::bind(config.send_timeout()).await?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Build a client over any transport
    pub fn with_transport(config: AmpConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        config.validate()?;
        tracing::info!(
            "Matrix amp '{}' at {} with {} zones and {} inputs",
            config.name,
            config.endpoint(),
            config.num_outputs,
            config.num_inputs
        );

        Ok(Self {
            inner: Arc::new(AmpInner {
                endpoint: config.endpoint(),
                encoder: CommandEncoder::new(config.num_outputs, config.num_inputs),
                mirror: ZoneMirror::new(config.num_outputs),
                transport,
                config,
            }),
        })
    }

    pub fn config(&self) -> &AmpConfig {
        &self.inner.config
    }

    pub fn endpoint(&self) -> &DeviceEndpoint {
        &self.inner.endpoint
    }

    // ========== Commands ==========

    /// Power a zone on by routing `input` to it
    pub async fn turn_on(&self, zone: ZoneId, input: InputId) -> Result<ZoneState> {
        let command = self.inner.encoder.encode_route(zone, input)?;
        self.dispatch(command).await
    }

    /// Power a zone off; its input and volume are remembered
    pub async fn turn_off(&self, zone: ZoneId) -> Result<ZoneState> {
        let command = self.inner.encoder.encode_power_off(zone)?;
        self.dispatch(command).await
    }

    /// Set a zone's volume (`0.0..=1.0`), whether or not it is powered
    pub async fn set_volume(&self, zone: ZoneId, level: VolumeLevel) -> Result<ZoneState> {
        let command = self.inner.encoder.encode_volume(zone, level)?;
        self.dispatch(command).await
    }

    /// Route `input` to a zone.
    ///
    /// The protocol has a single route command, so this also powers the zone on.
    pub async fn select_source(&self, zone: ZoneId, input: InputId) -> Result<ZoneState> {
        let command = self.inner.encoder.encode_route(zone, input)?;
        self.dispatch(command).await
    }

    /// Power off every zone concurrently.
    ///
    /// Returns the zones whose send failed along with the error.
    pub async fn turn_off_all(&self) -> Vec<(ZoneId, AmpError)> {
        let sends = (1..=self.inner.config.num_outputs).map(|zone| async move {
            self.turn_off(zone).await.map_err(|e| (zone, e))
        });

        join_all(sends)
            .await
            .into_iter()
            .filter_map(|result| result.err())
            .collect()
    }

    async fn dispatch(&self, command: Command) -> Result<ZoneState> {
        let payload = command.payload();
        if let Err(e) = self
            .inner
            .transport
            .send(payload.as_bytes(), &self.inner.endpoint)
            .await
        {
            tracing::warn!("Failed to send '{}' to {}: {}", payload, self.inner.endpoint, e);
            return Err(e);
        }
        tracing::debug!("Sent: {}", payload);

        self.inner.mirror.apply(&command)
    }

    // ========== State ==========

    /// Believed state of one zone
    pub fn read_state(&self, zone: ZoneId) -> Result<ZoneState> {
        self.inner.mirror.read(zone)
    }

    /// Believed state of every zone
    pub fn states(&self) -> Vec<ZoneState> {
        self.inner.mirror.read_all()
    }

    /// Flag a zone as no longer trustworthy, e.g. after a send failure or a
    /// known power cut. The next successful command clears the flag.
    pub fn mark_stale(&self, zone: ZoneId) -> Result<ZoneState> {
        self.inner.mirror.mark_stale(zone)
    }

    /// Subscribe to committed zone changes
    pub fn subscribe_state(&self) -> ZoneReceiver {
        self.inner.mirror.subscribe()
    }

    // ========== Zone handles ==========

    /// Handle for one configured zone
    pub fn zone(&self, zone: ZoneId) -> Result<Zone> {
        self.inner.mirror.read(zone)?;
        Ok(Zone::new(self.clone(), zone))
    }

    /// Handles for every configured zone
    pub fn zones(&self) -> Vec<Zone> {
        (1..=self.inner.config.num_outputs)
            .map(|zone| Zone::new(self.clone(), zone))
            .collect()
    }
}
