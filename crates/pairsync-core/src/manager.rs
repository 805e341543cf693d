//! PairManager - entry point that routes relay events into the registry
//!
//! The transport layer hands every decoded [`InboundEvent`] to
//! [`PairManager::dispatch`]. Unknown identities surface as
//! [`PairError::PairNotFound`] so the caller can resynchronize; malformed
//! permission fields and invalid presence transitions are logged and
//! absorbed by the registry.
//!
//! # Example
//!
//! ```
//! use pairsync_core::{InboundEvent, Identity, PairManager, RelationshipStatus};
//!
//! let manager = PairManager::default();
//! let mut rx = manager.subscribe();
//!
//! manager.dispatch(InboundEvent::AddPairRelationship {
//!     identity: Identity::new("peer1"),
//!     status: RelationshipStatus::Bidirectional,
//!     own_global: Default::default(),
//!     own_permissions: Default::default(),
//!     own_edit_access: Default::default(),
//!     other_global: Default::default(),
//!     other_permissions: Default::default(),
//!     other_edit_access: Default::default(),
//!     initial_load: true,
//! })?;
//! manager.dispatch(InboundEvent::PresenceOnline {
//!     identity: Identity::new("peer1"),
//!     ident: None,
//! })?;
//!
//! assert_eq!(manager.registry().direct_pairs().len(), 1);
//! assert!(!pairsync_core::drain(&mut rx).is_empty());
//! # Ok::<(), pairsync_core::PairError>(())
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::config::PairManagerConfig;
use crate::error::{PairError, PairResult};
use crate::events::InboundEvent;
use crate::notifier::PairNotification;
use crate::registry::PairRegistry;
use crate::types::PairPermissionSets;

/// Owns the registry for one connection lifecycle
pub struct PairManager {
    registry: Arc<PairRegistry>,
    disposed: AtomicBool,
}

impl PairManager {
    pub fn new(config: PairManagerConfig) -> Self {
        Self {
            registry: Arc::new(PairRegistry::new(config)),
            disposed: AtomicBool::new(false),
        }
    }

    /// Shared registry, for queries and direct calls
    pub fn registry(&self) -> &Arc<PairRegistry> {
        &self.registry
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PairNotification> {
        self.registry.subscribe()
    }

    /// Apply one inbound event.
    ///
    /// Returns `PairNotFound` when the event addresses an unknown pair.
    pub fn dispatch(&self, event: InboundEvent) -> PairResult<()> {
        debug!(event = event.name(), identity = ?event.identity(), "Dispatching inbound event");

        let result = self.route(event);
        if let Err(err @ PairError::PairNotFound(_)) = &result {
            warn!(error = %err, "Event for unknown pair; client and server are out of sync");
        }
        result
    }

    fn route(&self, event: InboundEvent) -> PairResult<()> {
        let registry = &self.registry;
        match event {
            InboundEvent::AddPairRelationship {
                identity,
                status,
                own_global,
                own_permissions,
                own_edit_access,
                other_global,
                other_permissions,
                other_edit_access,
                initial_load,
            } => {
                self.disposed.store(false, Ordering::Release);
                let permissions = PairPermissionSets {
                    own_global,
                    own_pair: own_permissions,
                    own_edit_access,
                    other_global,
                    other_pair: other_permissions,
                    other_edit_access,
                };
                if initial_load {
                    registry.add_or_update(identity, status, permissions);
                } else {
                    registry.add_from_callback(identity, status, permissions);
                }
                Ok(())
            }
            InboundEvent::RemovePairRelationship { identity } => {
                registry.remove(&identity).map(|_| ())
            }
            InboundEvent::UpdateRelationshipStatus { identity, status } => {
                registry.update_relationship_status(&identity, status)
            }
            InboundEvent::PresenceOnline { identity, ident } => {
                registry.mark_online(&identity, ident).map(|_| ())
            }
            InboundEvent::PresenceOffline { identity } => {
                registry.mark_offline(&identity).map(|_| ())
            }
            InboundEvent::PresenceVisible { identity } => {
                registry.mark_visible(&identity).map(|_| ())
            }
            InboundEvent::PresenceNotVisible { identity } => {
                registry.mark_not_visible(&identity).map(|_| ())
            }
            InboundEvent::ToyboxOnline { identity } => registry.mark_toybox_online(&identity),
            InboundEvent::ToyboxOffline { identity } => registry.mark_toybox_offline(&identity),
            InboundEvent::PermissionChange {
                identity,
                scope,
                permission,
                value,
            } => registry
                .apply_permission_change(&identity, scope, &permission, &value)
                .map(|_| ()),
            InboundEvent::BulkPermissionChange {
                identity,
                global,
                pair,
                edit_access,
            } => registry.apply_other_permissions(&identity, global, pair, edit_access),
            InboundEvent::CompositeData {
                identity,
                requesting_client,
                payload,
            } => registry
                .receive_composite_data(&identity, &requesting_client, &payload)
                .map(|_| ()),
            InboundEvent::PartialData { identity, payload } => {
                registry.receive_partial_data(&identity, payload).map(|_| ())
            }
            InboundEvent::SetNickname { identity, nickname } => {
                registry.set_nickname(&identity, nickname)
            }
            InboundEvent::Disconnected => {
                self.dispose();
                Ok(())
            }
        }
    }

    /// Clear the registry at the end of a connection lifecycle.
    ///
    /// Safe to call from several shutdown paths at once; only the first call
    /// does any work. Returns true if this call performed the teardown.
    pub fn dispose(&self) -> bool {
        if self.disposed.swap(true, Ordering::AcqRel) {
            debug!("Pair manager already disposed");
            return false;
        }
        let cleared = self.registry.clear();
        info!(cleared, "Disposed pair manager");
        true
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}

impl Default for PairManager {
    fn default() -> Self {
        Self::new(PairManagerConfig::default())
    }
}

impl Drop for PairManager {
    fn drop(&mut self) {
        self.dispose();
    }
}
