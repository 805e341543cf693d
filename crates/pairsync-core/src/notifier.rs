//! Outbound notifications
//!
//! Every registry operation mutates first and publishes afterwards. The
//! notifier fans notifications out over a `tokio::sync::broadcast` channel;
//! UI, profile and achievement collaborators each hold their own receiver.
//! Publishing never blocks and never fails: with no subscribers the
//! notification is dropped, and a slow subscriber sees `Lagged`.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{trace, warn};

use crate::identity::Identity;
use crate::types::{DataKind, PresenceState};

/// Default buffer size for the broadcast channel
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// State-change notification published by the registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PairNotification {
    /// Cached profile display data for the pair is stale
    ProfileInvalidated { identity: Identity },
    /// Status-effect permissions changed for a visible pair
    PermissionsChangedForProvider { identity: Identity },
    /// The pair list should be redrawn
    UiRefreshRequested,
    PresenceChanged {
        identity: Identity,
        state: PresenceState,
    },
    /// A data slice was received or re-merged
    Informational {
        identity: Identity,
        kind: DataKind,
        description: String,
    },
    /// User-facing "is now online" toast
    OnlineNotification { identity: Identity, message: String },
    /// The pair came online; the client's own data should be pushed to it
    PairWentOnline { identity: Identity },
}

impl PairNotification {
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            PairNotification::UiRefreshRequested => None,
            PairNotification::ProfileInvalidated { identity }
            | PairNotification::PermissionsChangedForProvider { identity }
            | PairNotification::PresenceChanged { identity, .. }
            | PairNotification::Informational { identity, .. }
            | PairNotification::OnlineNotification { identity, .. }
            | PairNotification::PairWentOnline { identity } => Some(identity),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PairNotification::ProfileInvalidated { .. } => "ProfileInvalidated",
            PairNotification::PermissionsChangedForProvider { .. } => {
                "PermissionsChangedForProvider"
            }
            PairNotification::UiRefreshRequested => "UiRefreshRequested",
            PairNotification::PresenceChanged { .. } => "PresenceChanged",
            PairNotification::Informational { .. } => "Informational",
            PairNotification::OnlineNotification { .. } => "OnlineNotification",
            PairNotification::PairWentOnline { .. } => "PairWentOnline",
        }
    }
}

/// Broadcast publisher for [`PairNotification`]s
pub struct PairNotifier {
    tx: broadcast::Sender<PairNotification>,
    capacity: usize,
    published: AtomicU64,
}

impl PairNotifier {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            capacity,
            published: AtomicU64::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PairNotification> {
        self.tx.subscribe()
    }

    pub fn publish(&self, notification: PairNotification) {
        trace!(
            notification = notification.name(),
            identity = ?notification.identity(),
            "Publishing pair notification"
        );
        self.published.fetch_add(1, Ordering::Relaxed);
        // No subscribers is fine
        let _ = self.tx.send(notification);
    }

    /// Publish a burst in order.
    ///
    /// A burst larger than the channel overruns every subscriber that does
    /// not read concurrently; that is logged here and surfaces as a lost
    /// count in [`drain_with_loss`].
    pub fn publish_all(&self, notifications: impl IntoIterator<Item = PairNotification>) {
        let notifications: Vec<PairNotification> = notifications.into_iter().collect();
        if notifications.len() > self.capacity && self.subscriber_count() > 0 {
            warn!(
                burst = notifications.len(),
                capacity = self.capacity,
                "Notification burst exceeds channel capacity; slow subscribers will lag"
            );
        }
        for notification in notifications {
            self.publish(notification);
        }
    }

    /// Total notifications published since creation
    pub fn published_count(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for PairNotifier {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

/// Result of draining a receiver
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Drained {
    pub notifications: Vec<PairNotification>,
    /// Notifications overwritten before this receiver read them
    pub lost: u64,
}

/// Drain everything currently buffered on a receiver without waiting,
/// counting notifications lost to lag.
pub fn drain_with_loss(rx: &mut broadcast::Receiver<PairNotification>) -> Drained {
    let mut drained = Drained::default();
    loop {
        match rx.try_recv() {
            Ok(notification) => drained.notifications.push(notification),
            Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                warn!(skipped, "Notification receiver lagged; notifications lost");
                drained.lost += skipped;
            }
            Err(_) => break,
        }
    }
    drained
}

/// Drain everything currently buffered on a receiver without waiting.
///
/// Lag is logged by [`drain_with_loss`]; use that when the count matters.
pub fn drain(rx: &mut broadcast::Receiver<PairNotification>) -> Vec<PairNotification> {
    drain_with_loss(rx).notifications
}
