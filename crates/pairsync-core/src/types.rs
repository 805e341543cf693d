//! Core types for the pair reconciliation engine

use serde::{Deserialize, Serialize};

pub mod data;
pub mod pair;

pub use data::{
    AliasData, AliasTrigger, AppearanceData, CompositeData, DataKind, DataPayload, GagSlot,
    LastReceivedData, ShockPermissions, ToyboxData, WardrobeData,
};
pub use pair::{OnlineSession, Pair, PairHandle, PairPermissionSets};

/// Whether an active pairing exists with a peer, and from which side
///
/// `Outgoing` means the client added the peer; `Incoming` means the peer
/// added the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum RelationshipStatus {
    #[default]
    None,
    Bidirectional,
    OneSidedIncoming,
    OneSidedOutgoing,
}

impl RelationshipStatus {
    /// True when some relationship remains
    pub fn is_active(&self) -> bool {
        !matches!(self, RelationshipStatus::None)
    }

    /// Status left after the client's side of the pairing is removed.
    ///
    /// A bidirectional pair keeps the peer's incoming side; every one-sided
    /// status collapses to `None`.
    pub fn without_client_side(&self) -> RelationshipStatus {
        match self {
            RelationshipStatus::Bidirectional => RelationshipStatus::OneSidedIncoming,
            _ => RelationshipStatus::None,
        }
    }
}

impl std::fmt::Display for RelationshipStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RelationshipStatus::None => write!(f, "none"),
            RelationshipStatus::Bidirectional => write!(f, "bidirectional"),
            RelationshipStatus::OneSidedIncoming => write!(f, "one-sided (incoming)"),
            RelationshipStatus::OneSidedOutgoing => write!(f, "one-sided (outgoing)"),
        }
    }
}

/// Presence of a paired peer as reported by the relay
///
/// `Visible` is a stricter form of `Online` (the peer is also in range).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PresenceState {
    #[default]
    Offline,
    Online,
    Visible,
}

impl PresenceState {
    pub fn is_online(&self) -> bool {
        !matches!(self, PresenceState::Offline)
    }

    pub fn is_visible(&self) -> bool {
        matches!(self, PresenceState::Visible)
    }
}

impl std::fmt::Display for PresenceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PresenceState::Offline => write!(f, "offline"),
            PresenceState::Online => write!(f, "online"),
            PresenceState::Visible => write!(f, "visible"),
        }
    }
}
