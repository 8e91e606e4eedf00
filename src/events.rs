// src/events.rs

//! Events delivered to the presentation layer while a session runs.

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

use crate::session::SessionId;

/// The worker announced its first finished artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    pub session: SessionId,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeEvent {
    /// At most one per session.
    Progress(ProgressEvent),
    /// Sent by `abort()` before the worker is terminated, so a preview shown
    /// for this session can be taken down.
    PreviewCleared { session: SessionId },
}

/// Hand `event` to the presentation layer without waiting.
///
/// Session runners and `abort()` must never stall on a consumer that stopped
/// draining the channel, so a full channel drops the event.
pub(crate) fn publish(events: &mpsc::Sender<BridgeEvent>, event: BridgeEvent) {
    match events.try_send(event) {
        Ok(()) => {}
        Err(TrySendError::Full(event)) => {
            warn!(?event, "event channel full; dropping event");
        }
        Err(TrySendError::Closed(event)) => {
            debug!(?event, "no event receiver; dropping event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cleared(id: u64) -> BridgeEvent {
        BridgeEvent::PreviewCleared {
            session: SessionId::from_raw(id),
        }
    }

    #[test]
    fn publish_drops_events_when_full() {
        let (tx, mut rx) = mpsc::channel(1);
        publish(&tx, cleared(1));
        publish(&tx, cleared(2));

        assert_eq!(rx.try_recv().ok(), Some(cleared(1)));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn publish_without_receiver_is_harmless() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        publish(&tx, cleared(1));
    }
}
