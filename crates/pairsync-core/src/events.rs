//! Inbound events delivered by the transport layer

use serde::{Deserialize, Serialize};

use crate::identity::Identity;
use crate::permissions::{
    EditAccessPermissions, GlobalPermissions, PairPermissions, PermissionScope, RawValue,
};
use crate::types::{CompositeData, DataPayload, RelationshipStatus};

/// An event from the relay, already decoded
///
/// JSON form is internally tagged: `{"type": "PresenceOnline", "identity": "peer1"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum InboundEvent {
    AddPairRelationship {
        identity: Identity,
        status: RelationshipStatus,
        #[serde(default)]
        own_global: GlobalPermissions,
        #[serde(default)]
        own_permissions: PairPermissions,
        #[serde(default)]
        own_edit_access: EditAccessPermissions,
        #[serde(default)]
        other_global: GlobalPermissions,
        #[serde(default)]
        other_permissions: PairPermissions,
        #[serde(default)]
        other_edit_access: EditAccessPermissions,
        /// Part of the bulk pair list sent on connect rather than a live callback
        #[serde(default)]
        initial_load: bool,
    },
    RemovePairRelationship {
        identity: Identity,
    },
    UpdateRelationshipStatus {
        identity: Identity,
        status: RelationshipStatus,
    },
    PresenceOnline {
        identity: Identity,
        #[serde(default)]
        ident: Option<String>,
    },
    PresenceOffline {
        identity: Identity,
    },
    PresenceVisible {
        identity: Identity,
    },
    PresenceNotVisible {
        identity: Identity,
    },
    ToyboxOnline {
        identity: Identity,
    },
    ToyboxOffline {
        identity: Identity,
    },
    PermissionChange {
        identity: Identity,
        scope: PermissionScope,
        permission: String,
        value: RawValue,
    },
    /// The peer replaced all of its permissions for the client
    BulkPermissionChange {
        identity: Identity,
        #[serde(default)]
        global: GlobalPermissions,
        #[serde(default)]
        pair: PairPermissions,
        #[serde(default)]
        edit_access: EditAccessPermissions,
    },
    CompositeData {
        identity: Identity,
        requesting_client: Identity,
        payload: CompositeData,
    },
    PartialData {
        identity: Identity,
        payload: DataPayload,
    },
    SetNickname {
        identity: Identity,
        #[serde(default)]
        nickname: Option<String>,
    },
    /// Connection to the relay was lost; tear everything down
    Disconnected,
}

impl InboundEvent {
    /// Target pair, if the event addresses one
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            InboundEvent::Disconnected => None,
            InboundEvent::AddPairRelationship { identity, .. }
            | InboundEvent::RemovePairRelationship { identity }
            | InboundEvent::UpdateRelationshipStatus { identity, .. }
            | InboundEvent::PresenceOnline { identity, .. }
            | InboundEvent::PresenceOffline { identity }
            | InboundEvent::PresenceVisible { identity }
            | InboundEvent::PresenceNotVisible { identity }
            | InboundEvent::ToyboxOnline { identity }
            | InboundEvent::ToyboxOffline { identity }
            | InboundEvent::PermissionChange { identity, .. }
            | InboundEvent::BulkPermissionChange { identity, .. }
            | InboundEvent::CompositeData { identity, .. }
            | InboundEvent::PartialData { identity, .. }
            | InboundEvent::SetNickname { identity, .. } => Some(identity),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            InboundEvent::AddPairRelationship { .. } => "AddPairRelationship",
            InboundEvent::RemovePairRelationship { .. } => "RemovePairRelationship",
            InboundEvent::UpdateRelationshipStatus { .. } => "UpdateRelationshipStatus",
            InboundEvent::PresenceOnline { .. } => "PresenceOnline",
            InboundEvent::PresenceOffline { .. } => "PresenceOffline",
            InboundEvent::PresenceVisible { .. } => "PresenceVisible",
            InboundEvent::PresenceNotVisible { .. } => "PresenceNotVisible",
            InboundEvent::ToyboxOnline { .. } => "ToyboxOnline",
            InboundEvent::ToyboxOffline { .. } => "ToyboxOffline",
            InboundEvent::PermissionChange { .. } => "PermissionChange",
            InboundEvent::BulkPermissionChange { .. } => "BulkPermissionChange",
            InboundEvent::CompositeData { .. } => "CompositeData",
            InboundEvent::PartialData { .. } => "PartialData",
            InboundEvent::SetNickname { .. } => "SetNickname",
            InboundEvent::Disconnected => "Disconnected",
        }
    }
}
