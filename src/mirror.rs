use crate::error::{AmpError, Result};
use crate::protocol::{Command, CommandKind};
use crate::subscription::{ZoneReceiver, ZoneUpdate};
use crate::types::{level_to_native, InputId, VolumeLevel, ZoneId, ZoneState};
use std::sync::{PoisonError, RwLock};
use tokio::sync::broadcast;

const UPDATE_CHANNEL_CAPACITY: usize = 100;

/// Locally held belief about every zone of one amplifier.
///
/// Each zone has its own lock, so mutations to one zone are serialized
/// without blocking the others. Callers apply a mutation only after the
/// matching datagram was accepted by the transport; the order in which
/// those sends complete is the order the mutations land in.
pub struct ZoneMirror {
    zones: Vec<RwLock<ZoneState>>,
    update_tx: broadcast::Sender<ZoneUpdate>,
}

impl ZoneMirror {
    /// Mirror for zones `1..=num_outputs`, all off
    pub fn new(num_outputs: u8) -> Self {
        let (update_tx, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Self {
            zones: (1..=num_outputs).map(|zone| RwLock::new(ZoneState::new(zone))).collect(),
            update_tx,
        }
    }

    pub fn zone_count(&self) -> u8 {
        self.zones.len() as u8
    }

    fn slot(&self, zone: ZoneId) -> Result<&RwLock<ZoneState>> {
        zone.checked_sub(1)
            .and_then(|index| self.zones.get(usize::from(index)))
            .ok_or(AmpError::UnknownZone(zone))
    }

    /// Snapshot of one zone
    pub fn read(&self, zone: ZoneId) -> Result<ZoneState> {
        let slot = self.slot(zone)?;
        let state = slot.read().unwrap_or_else(PoisonError::into_inner);
        Ok(state.clone())
    }

    /// Snapshots of all zones in zone order
    pub fn read_all(&self) -> Vec<ZoneState> {
        self.zones
            .iter()
            .map(|slot| slot.read().unwrap_or_else(PoisonError::into_inner).clone())
            .collect()
    }

    /// Zone is on and fed by `input`
    pub fn apply_route(&self, zone: ZoneId, input: InputId) -> Result<ZoneState> {
        self.mutate(zone, |state| {
            state.power = true;
            state.input = Some(input);
        })
    }

    /// Zone is off; input and volume are kept
    pub fn apply_power_off(&self, zone: ZoneId) -> Result<ZoneState> {
        self.mutate(zone, |state| state.power = false)
    }

    /// Record a volume level (`0.0..=1.0`) whether or not the zone is powered
    pub fn apply_volume(&self, zone: ZoneId, level: VolumeLevel) -> Result<ZoneState> {
        if !(0.0..=1.0).contains(&level) {
            return Err(AmpError::invalid("volume", level, "expected 0.0..=1.0"));
        }
        self.apply_native_volume(zone, level_to_native(level))
    }

    fn apply_native_volume(&self, zone: ZoneId, volume: u8) -> Result<ZoneState> {
        self.mutate(zone, |state| state.volume = volume)
    }

    /// Apply the effect of a command that was just sent
    pub fn apply(&self, command: &Command) -> Result<ZoneState> {
        match command.kind {
            CommandKind::Route { input } => self.apply_route(command.zone, input),
            CommandKind::PowerOff => self.apply_power_off(command.zone),
            CommandKind::SetVolume { volume } => self.apply_native_volume(command.zone, volume),
        }
    }

    /// Flag a zone's belief as untrusted until the next successful command
    pub fn mark_stale(&self, zone: ZoneId) -> Result<ZoneState> {
        let slot = self.slot(zone)?;
        let snapshot = {
            let mut state = slot.write().unwrap_or_else(PoisonError::into_inner);
            state.stale = true;
            self.publish(state.clone());
            state.clone()
        };
        tracing::warn!("Zone {} marked stale", zone);
        Ok(snapshot)
    }

    pub fn subscribe(&self) -> ZoneReceiver {
        ZoneReceiver::new(self.update_tx.subscribe())
    }

    fn mutate(&self, zone: ZoneId, change: impl FnOnce(&mut ZoneState)) -> Result<ZoneState> {
        let slot = self.slot(zone)?;
        let snapshot = {
            let mut state = slot.write().unwrap_or_else(PoisonError::into_inner);
            change(&mut state);
            state.stale = false;
            // Publish under the lock so updates leave in commit order
            self.publish(state.clone());
            state.clone()
        };
        tracing::debug!("Zone {} now {:?}", zone, snapshot);
        Ok(snapshot)
    }

    fn publish(&self, state: ZoneState) {
        // No subscribers is fine
        let _ = self.update_tx.send(ZoneUpdate {
            zone: state.zone,
            state,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::CommandEncoder;

    #[test]
    fn zones_start_off_and_unrouted() {
        let mirror = ZoneMirror::new(3);
        assert_eq!(mirror.zone_count(), 3);
        for state in mirror.read_all() {
            assert!(!state.power);
            assert_eq!(state.input, None);
            assert_eq!(state.volume, 0);
        }
    }

    #[test]
    fn route_is_idempotent() {
        let once = ZoneMirror::new(3);
        once.apply_route(2, 4).unwrap();

        let twice = ZoneMirror::new(3);
        twice.apply_route(2, 4).unwrap();
        twice.apply_route(2, 4).unwrap();

        assert_eq!(once.read(2).unwrap(), twice.read(2).unwrap());
        assert_eq!(twice.read(2).unwrap().input, Some(4));
        assert!(twice.read(2).unwrap().power);
    }

    #[test]
    fn power_off_keeps_input_and_volume() {
        let mirror = ZoneMirror::new(3);
        mirror.apply_route(1, 3).unwrap();
        mirror.apply_volume(1, 0.4).unwrap();
        let state = mirror.apply_power_off(1).unwrap();

        assert!(!state.power);
        assert_eq!(state.input, Some(3));
        assert_eq!(state.volume, 40);
    }

    #[test]
    fn out_of_range_volume_is_rejected() {
        let mirror = ZoneMirror::new(1);
        mirror.apply_volume(1, 0.3).unwrap();
        for bad in [-0.1, 1.1, f64::NAN] {
            assert!(mirror.apply_volume(1, bad).unwrap_err().is_invalid_operand());
        }
        assert_eq!(mirror.read(1).unwrap().volume, 30);
    }

    #[test]
    fn concurrent_same_zone_updates_arrive_in_commit_order() {
        for _ in 0..200 {
            let mirror = std::sync::Arc::new(ZoneMirror::new(1));
            let mut rx = mirror.subscribe();

            let writers: Vec<_> = (1..=4)
                .map(|input| {
                    let mirror = mirror.clone();
                    std::thread::spawn(move || {
                        mirror.apply_route(1, input).unwrap();
                    })
                })
                .collect();
            for writer in writers {
                writer.join().unwrap();
            }

            let mut last = None;
            while let Some(update) = rx.try_recv().unwrap() {
                last = Some(update.state);
            }
            assert_eq!(last, Some(mirror.read(1).unwrap()));
        }
    }

    #[test]
    fn volume_applies_while_off() {
        let mirror = ZoneMirror::new(1);
        let state = mirror.apply_volume(1, 0.75).unwrap();
        assert!(!state.power);
        assert_eq!(state.volume_level(), 0.75);
    }

    #[test]
    fn zones_are_independent() {
        let mirror = ZoneMirror::new(3);
        mirror.apply_route(1, 2).unwrap();
        assert_eq!(mirror.read(2).unwrap(), ZoneState::new(2));
        assert_eq!(mirror.read(3).unwrap(), ZoneState::new(3));
    }

    #[test]
    fn unknown_zone_reads_and_writes_fail() {
        let mirror = ZoneMirror::new(3);
        assert!(matches!(mirror.read(0), Err(AmpError::UnknownZone(0))));
        assert!(matches!(mirror.read(4), Err(AmpError::UnknownZone(4))));
        assert!(matches!(mirror.apply_route(4, 1), Err(AmpError::UnknownZone(4))));
        assert!(matches!(mirror.mark_stale(9), Err(AmpError::UnknownZone(9))));
    }

    #[test]
    fn stale_flag_clears_on_next_mutation() {
        let mirror = ZoneMirror::new(2);
        mirror.apply_route(1, 1).unwrap();
        assert!(mirror.mark_stale(1).unwrap().stale);
        assert!(mirror.read(1).unwrap().stale);

        let state = mirror.apply_volume(1, 0.2).unwrap();
        assert!(!state.stale);
        assert_eq!(state.input, Some(1));
    }

    #[test]
    fn apply_follows_command_kind() {
        let encoder = CommandEncoder::new(2, 4);
        let mirror = ZoneMirror::new(2);

        mirror.apply(&encoder.encode_route(2, 4).unwrap()).unwrap();
        mirror.apply(&encoder.encode_volume(2, 0.3).unwrap()).unwrap();
        let state = mirror.apply(&encoder.encode_power_off(2).unwrap()).unwrap();

        assert!(!state.power);
        assert_eq!(state.input, Some(4));
        assert_eq!(state.volume, 30);
    }

    #[tokio::test]
    async fn subscribers_see_committed_changes() {
        let mirror = ZoneMirror::new(2);
        let mut rx = mirror.subscribe();

        mirror.apply_route(2, 3).unwrap();
        let update = rx.recv().await.unwrap();
        assert_eq!(update.zone, 2);
        assert!(update.state.power);
        assert_eq!(update.state.input, Some(3));

        assert!(rx.try_recv().unwrap().is_none());
    }

    #[tokio::test]
    async fn receiver_reports_closed_mirror() {
        let mirror = ZoneMirror::new(1);
        let mut rx = mirror.subscribe();
        drop(mirror);
        assert!(matches!(rx.recv().await, Err(AmpError::ChannelClosed)));
    }
}
