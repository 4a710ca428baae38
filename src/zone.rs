use crate::client::MatrixAmp;
use crate::error::{AmpError, Result};
use crate::types::{InputId, VolumeLevel, ZoneId, ZoneState};

/// Input selected when a zone is turned on before any source was ever chosen
pub const FALLBACK_INPUT: InputId = 1;

const SOURCE_PREFIX: &str = "Input";

/// One output of the amplifier, viewed as a media player
///
/// A `Zone` names its sources `"Input 1"`..`"Input N"`, reports volume as a
/// normalized level and decides which input to resend on power-on. All state
/// comes from the shared mirror in [`MatrixAmp`].
#[derive(Clone)]
pub struct Zone {
    amp: MatrixAmp,
    id: ZoneId,
}

impl Zone {
    pub(crate) fn new(amp: MatrixAmp, id: ZoneId) -> Self {
        Self { amp, id }
    }

    pub fn id(&self) -> ZoneId {
        self.id
    }

    /// Display name, e.g. `"Control4 Matrix Amp Zone 3"`
    pub fn name(&self) -> String {
        format!("{} Zone {}", self.amp.config().name, self.id)
    }

    /// Snapshot of the believed zone state
    pub fn state(&self) -> Result<ZoneState> {
        self.amp.read_state(self.id)
    }

    pub fn is_on(&self) -> Result<bool> {
        Ok(self.state()?.power)
    }

    pub fn volume_level(&self) -> Result<VolumeLevel> {
        Ok(self.state()?.volume_level())
    }

    /// Name of the last routed input, kept while the zone is off
    pub fn source(&self) -> Result<Option<String>> {
        Ok(self.state()?.input.map(source_name))
    }

    /// Selectable source names in input order
    pub fn source_list(&self) -> Vec<String> {
        (1..=self.amp.config().num_inputs).map(source_name).collect()
    }

    // ========== Power ==========

    /// Turn the zone on with the last known input, or input 1 if none was
    /// ever selected.
    ///
    /// The device has no plain power-on, so this always resends a route.
    pub async fn turn_on(&self) -> Result<ZoneState> {
        let input = self.state()?.input.unwrap_or(FALLBACK_INPUT);
        self.amp.turn_on(self.id, input).await
    }

    pub async fn turn_off(&self) -> Result<ZoneState> {
        self.amp.turn_off(self.id).await
    }

    // ========== Volume ==========

    pub async fn set_volume_level(&self, level: VolumeLevel) -> Result<ZoneState> {
        self.amp.set_volume(self.id, level).await
    }

    // ========== Sources ==========

    /// Route an input by number
    pub async fn select_input(&self, input: InputId) -> Result<ZoneState> {
        self.amp.select_source(self.id, input).await
    }

    /// Route an input by source name (`"Input 3"`)
    pub async fn select_source(&self, source: &str) -> Result<ZoneState> {
        let input = parse_source_name(source)?;
        self.select_input(input).await
    }
}

fn source_name(input: InputId) -> String {
    format!("{} {}", SOURCE_PREFIX, input)
}

/// Pull the input number out of a source name such as `"Input 3"`
fn parse_source_name(source: &str) -> Result<InputId> {
    source
        .split_whitespace()
        .last()
        .and_then(|n| n.parse::<InputId>().ok())
        .ok_or_else(|| AmpError::invalid("source", source, "expected a name like 'Input 3'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::tests::amp;

    #[test]
    fn names_follow_amp_name() {
        let (amp, _) = amp(3, 4);
        let zone = amp.zone(2).unwrap();
        assert_eq!(zone.name(), "Control4 Matrix Amp Zone 2");
        assert_eq!(zone.source_list(), vec!["Input 1", "Input 2", "Input 3", "Input 4"]);
        assert_eq!(amp.zones().len(), 3);
    }

    #[test]
    fn unknown_zone_handle_is_refused() {
        let (amp, _) = amp(3, 4);
        assert!(matches!(amp.zone(4), Err(AmpError::UnknownZone(4))));
    }

    #[test]
    fn source_names_parse() {
        assert_eq!(parse_source_name("Input 3").unwrap(), 3);
        assert_eq!(parse_source_name("Input 12").unwrap(), 12);
        assert!(parse_source_name("Tuner").unwrap_err().is_invalid_operand());
        assert!(parse_source_name("").unwrap_err().is_invalid_operand());
    }

    #[tokio::test]
    async fn turn_on_falls_back_to_first_input() {
        let (amp, transport) = amp(2, 4);
        let zone = amp.zone(1).unwrap();

        let state = zone.turn_on().await.unwrap();
        assert_eq!(state.input, Some(FALLBACK_INPUT));
        assert!(transport.payloads()[0].ends_with("c4.amp.out 1 001"));
    }

    #[tokio::test]
    async fn turn_on_resends_last_input() {
        let (amp, transport) = amp(2, 4);
        let zone = amp.zone(2).unwrap();

        zone.select_source("Input 3").await.unwrap();
        zone.turn_off().await.unwrap();
        assert!(!zone.is_on().unwrap());
        assert_eq!(zone.source().unwrap().as_deref(), Some("Input 3"));

        zone.turn_on().await.unwrap();
        assert!(zone.is_on().unwrap());
        assert!(transport.payloads()[2].ends_with("c4.amp.out 2 003"));
    }

    #[tokio::test]
    async fn bad_source_name_sends_nothing() {
        let (amp, transport) = amp(2, 4);
        let zone = amp.zone(1).unwrap();

        assert!(zone.select_source("Input 9").await.unwrap_err().is_invalid_operand());
        assert!(zone.select_source("Aux").await.unwrap_err().is_invalid_operand());
        assert!(transport.payloads().is_empty());
        assert_eq!(zone.source().unwrap(), None);
    }

    #[tokio::test]
    async fn volume_level_is_normalized() {
        let (amp, _) = amp(1, 1);
        let zone = amp.zone(1).unwrap();
        zone.set_volume_level(0.6).await.unwrap();
        assert!((zone.volume_level().unwrap() - 0.6).abs() < 1e-9);
    }
}
