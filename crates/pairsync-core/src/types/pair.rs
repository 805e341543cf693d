//! The per-peer record and its shared handle
//!
//! A [`Pair`] is plain data plus the state transitions that touch a single
//! peer. It knows nothing about the registry, the view cache or notifiers;
//! callers mutate it, look at what changed, and publish afterwards.
//!
//! [`PairHandle`] is how the registry shares a pair between threads: one
//! `parking_lot::RwLock` per peer, so writers on different peers never
//! contend and writers on the same peer are serialized.

use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde::{Deserialize, Serialize};

use crate::error::{PairError, PairResult};
use crate::identity::Identity;
use crate::permissions::{
    EditAccessPermissions, FieldUpdate, GlobalPermissions, PairPermissions, PermissionScope,
    PermissionSet, PermissionValue, RawValue,
};
use crate::types::data::LastReceivedData;
use crate::types::{PresenceState, RelationshipStatus};

/// The six permission sets of a pair
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PairPermissionSets {
    pub own_global: GlobalPermissions,
    pub own_pair: PairPermissions,
    pub own_edit_access: EditAccessPermissions,
    pub other_global: GlobalPermissions,
    pub other_pair: PairPermissions,
    pub other_edit_access: EditAccessPermissions,
}

impl PairPermissionSets {
    /// Write one named field in the given scope
    pub fn apply(
        &mut self,
        scope: PermissionScope,
        name: &str,
        raw: &RawValue,
    ) -> PairResult<FieldUpdate> {
        match scope {
            PermissionScope::OwnGlobal => self.own_global.apply(scope, name, raw),
            PermissionScope::OwnPair => self.own_pair.apply(scope, name, raw),
            PermissionScope::OwnEditAccess => self.own_edit_access.apply(scope, name, raw),
            PermissionScope::OtherGlobal => self.other_global.apply(scope, name, raw),
            PermissionScope::OtherPair => self.other_pair.apply(scope, name, raw),
            PermissionScope::OtherEditAccess => self.other_edit_access.apply(scope, name, raw),
        }
    }

    /// Read one named field in the given scope
    pub fn get(&self, scope: PermissionScope, name: &str) -> Option<PermissionValue> {
        match scope {
            PermissionScope::OwnGlobal => self.own_global.get(name),
            PermissionScope::OwnPair => self.own_pair.get(name),
            PermissionScope::OwnEditAccess => self.own_edit_access.get(name),
            PermissionScope::OtherGlobal => self.other_global.get(name),
            PermissionScope::OtherPair => self.other_pair.get(name),
            PermissionScope::OtherEditAccess => self.other_edit_access.get(name),
        }
    }
}

/// Session artifacts kept while a pair is online
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnlineSession {
    /// Relay-provided ident of the peer's current session
    pub ident: Option<String>,
    /// Unix timestamp (milliseconds) the pair came online
    pub since: i64,
}

/// Local record of one paired peer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pair {
    pub identity: Identity,
    pub status: RelationshipStatus,
    pub presence: PresenceState,
    pub permissions: PairPermissionSets,
    pub data: LastReceivedData,
    /// User-set nickname
    pub nickname: Option<String>,
    pub session: Option<OnlineSession>,
    /// Whether the peer is connected to the toybox server
    pub toybox_online: bool,
}

impl Pair {
    pub fn new(
        identity: Identity,
        status: RelationshipStatus,
        permissions: PairPermissionSets,
    ) -> Self {
        Self {
            identity,
            status,
            presence: PresenceState::Offline,
            permissions,
            data: LastReceivedData::default(),
            nickname: None,
            session: None,
            toybox_online: false,
        }
    }

    pub fn has_any_connection(&self) -> bool {
        self.status.is_active()
    }

    pub fn is_paused(&self) -> bool {
        self.permissions.other_pair.is_paused
    }

    /// Nickname when set, otherwise alias or uid
    pub fn display_name(&self) -> &str {
        match self.nickname.as_deref() {
            Some(nick) if !nick.is_empty() => nick,
            _ => self.identity.alias_or_uid(),
        }
    }

    /// Offline → Online. Returns false if the pair was already online.
    pub fn mark_online(&mut self, ident: Option<String>) -> bool {
        if self.presence.is_online() {
            if ident.is_some() {
                if let Some(session) = self.session.as_mut() {
                    session.ident = ident;
                }
            }
            return false;
        }
        self.presence = PresenceState::Online;
        self.session = Some(OnlineSession {
            ident,
            since: chrono::Utc::now().timestamp_millis(),
        });
        true
    }

    /// Any state → Offline, dropping session artifacts.
    ///
    /// Returns false if the pair was already offline.
    pub fn mark_offline(&mut self) -> bool {
        self.session = None;
        self.toybox_online = false;
        if self.presence == PresenceState::Offline {
            return false;
        }
        self.presence = PresenceState::Offline;
        true
    }

    /// Online → Visible. Fails if the pair is offline.
    pub fn mark_visible(&mut self) -> PairResult<bool> {
        match self.presence {
            PresenceState::Offline => Err(PairError::InvalidPresenceTransition {
                identity: self.identity.clone(),
                from: PresenceState::Offline,
                to: PresenceState::Visible,
            }),
            PresenceState::Visible => Ok(false),
            PresenceState::Online => {
                self.presence = PresenceState::Visible;
                Ok(true)
            }
        }
    }

    /// Visible → Online; no-op otherwise
    pub fn mark_not_visible(&mut self) -> bool {
        if self.presence == PresenceState::Visible {
            self.presence = PresenceState::Online;
            true
        } else {
            false
        }
    }

    pub fn apply_permission(
        &mut self,
        scope: PermissionScope,
        name: &str,
        raw: &RawValue,
    ) -> PairResult<FieldUpdate> {
        self.permissions.apply(scope, name, raw)
    }

    pub fn permission(&self, scope: PermissionScope, name: &str) -> Option<PermissionValue> {
        self.permissions.get(scope, name)
    }
}

/// Shared, individually locked handle to a pair in the registry
#[derive(Clone)]
pub struct PairHandle {
    identity: Identity,
    inner: Arc<RwLock<Pair>>,
}

impl PairHandle {
    pub fn new(pair: Pair) -> Self {
        Self {
            identity: pair.identity.clone(),
            inner: Arc::new(RwLock::new(pair)),
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Copy of the pair's current state
    pub fn snapshot(&self) -> Pair {
        self.inner.read().clone()
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Pair> {
        self.inner.read()
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, Pair> {
        self.inner.write()
    }

    pub fn status(&self) -> RelationshipStatus {
        self.inner.read().status
    }

    pub fn presence(&self) -> PresenceState {
        self.inner.read().presence
    }

    /// True if both handles point at the same registry entry
    pub fn same_entry(&self, other: &PairHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for PairHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PairHandle")
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}
