use crate::error::{AmpError, Result};
use crate::types::{ZoneId, ZoneState};
use tokio::sync::broadcast;

/// Committed change to a zone's believed state
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneUpdate {
    pub zone: ZoneId,

    /// Snapshot taken right after the change
    pub state: ZoneState,
}

/// Receiver for zone updates
pub struct ZoneReceiver {
    rx: broadcast::Receiver<ZoneUpdate>,
}

impl ZoneReceiver {
    pub(crate) fn new(rx: broadcast::Receiver<ZoneUpdate>) -> Self {
        Self { rx }
    }

    /// Receive the next zone update
    ///
    /// Fails with `ChannelClosed` once the mirror is gone.
    pub async fn recv(&mut self) -> Result<ZoneUpdate> {
        self.rx.recv().await.map_err(|e| match e {
            broadcast::error::RecvError::Closed => AmpError::ChannelClosed,
            broadcast::error::RecvError::Lagged(n) => {
                AmpError::ChannelError(format!("Lagged by {} updates", n))
            }
        })
    }

    /// Try to receive an update without blocking
    ///
    /// Returns `None` if no update is pending.
    pub fn try_recv(&mut self) -> Result<Option<ZoneUpdate>> {
        match self.rx.try_recv() {
            Ok(update) => Ok(Some(update)),
            Err(broadcast::error::TryRecvError::Empty) => Ok(None),
            Err(broadcast::error::TryRecvError::Closed) => Err(AmpError::ChannelClosed),
            Err(broadcast::error::TryRecvError::Lagged(n)) => {
                Err(AmpError::ChannelError(format!("Lagged by {} updates", n)))
            }
        }
    }
}
