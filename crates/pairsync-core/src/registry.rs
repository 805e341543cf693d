//! Pair registry - the single source of truth for paired peers
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  PairRegistry                                                   │
//! │  ├── pairs: DashMap<Identity, PairHandle>                       │
//! │  │   └── sharded map; each handle has its own RwLock<Pair>      │
//! │  ├── view: DirectPairsView                                      │
//! │  │   └── cached pairs with an active relationship               │
//! │  ├── notifier: PairNotifier                                     │
//! │  │   └── broadcast fan-out to UI / profile collaborators        │
//! │  └── last_added: RwLock<Option<Identity>>                       │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Locking
//!
//! Map shards are only ever held while cloning a handle in or out. A pair's
//! own lock may be taken while a shard is held (view recomputation,
//! conditional removal) but never the other way round: code holding a pair
//! lock never touches the map. Operations on different identities therefore
//! never wait on each other beyond a shard lookup, and operations on the same
//! identity are serialized by that pair's lock.
//!
//! Every operation follows the same shape: mutate under the pair lock,
//! release it, invalidate the view, then publish.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use tokio::sync::broadcast;
use tracing::{debug, info, trace, warn};

use crate::config::PairManagerConfig;
use crate::error::{PairError, PairResult};
use crate::identity::Identity;
use crate::notifier::{PairNotification, PairNotifier};
use crate::permissions::StatusPermissions;
use crate::types::{
    Pair, PairHandle, PairPermissionSets, PresenceState, RelationshipStatus,
};
use crate::view::DirectPairsView;

/// Below this many pairs `clear` marks them offline on the calling thread
const PARALLEL_CLEAR_THRESHOLD: usize = 64;

/// Sweeps [`PairRegistry::clear`] makes before giving up on concurrent adds
pub const CLEAR_MAX_ROUNDS: usize = 4;

/// Concurrent map of every paired peer
pub struct PairRegistry {
    pairs: DashMap<Identity, PairHandle>,
    view: DirectPairsView,
    notifier: PairNotifier,
    config: PairManagerConfig,
    last_added: RwLock<Option<Identity>>,
}

impl PairRegistry {
    pub fn new(config: PairManagerConfig) -> Self {
        Self {
            pairs: DashMap::new(),
            view: DirectPairsView::new(),
            notifier: PairNotifier::new(config.notification_capacity),
            config,
            last_added: RwLock::new(None),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(PairManagerConfig::default())
    }

    pub fn config(&self) -> &PairManagerConfig {
        &self.config
    }

    pub fn notifier(&self) -> &PairNotifier {
        &self.notifier
    }

    /// Subscribe to notifications published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<PairNotification> {
        self.notifier.subscribe()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn contains(&self, identity: &Identity) -> bool {
        self.pairs.contains_key(identity)
    }

    /// Shared handle to a pair
    pub fn lookup(&self, identity: &Identity) -> PairResult<PairHandle> {
        self.pairs
            .get(identity)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| PairError::PairNotFound(identity.clone()))
    }

    /// Snapshot of a pair's current state
    pub fn get(&self, identity: &Identity) -> PairResult<Pair> {
        self.lookup(identity).map(|handle| handle.snapshot())
    }

    /// Every identity in the registry, in iteration order
    pub fn identities(&self) -> Vec<Identity> {
        self.pairs.iter().map(|entry| entry.key().clone()).collect()
    }

    /// The identity most recently added by a live server callback
    pub fn last_added(&self) -> Option<Identity> {
        self.last_added.read().clone()
    }

    /// Invalidate the direct-pairs view and publish `notifications`,
    /// followed by a UI refresh when `push_ui_refresh` is set.
    pub(crate) fn commit(&self, mut notifications: Vec<PairNotification>, push_ui_refresh: bool) {
        self.view.invalidate();
        if push_ui_refresh {
            notifications.push(PairNotification::UiRefreshRequested);
        }
        self.notifier.publish_all(notifications);
    }

    // ========================================================================
    // Structural operations
    // ========================================================================

    /// Create a pair, or update the relationship status of an existing one.
    ///
    /// An existing pair keeps its permissions and has its last-received data
    /// re-applied. Returns true if a new pair was created.
    pub fn add_or_update(
        &self,
        identity: Identity,
        status: RelationshipStatus,
        permissions: PairPermissionSets,
    ) -> bool {
        trace!(identity = %identity, "Checking whether pair already exists");

        let (handle, created) = match self.pairs.entry(identity.clone()) {
            Entry::Occupied(entry) => (entry.get().clone(), false),
            Entry::Vacant(entry) => {
                let handle = PairHandle::new(Pair::new(identity.clone(), status, permissions));
                entry.insert(handle.clone());
                (handle, true)
            }
        };

        let mut notifications = Vec::new();
        if created {
            debug!(identity = %identity, status = %status, "Created new pair");
        } else {
            let mut pair = handle.write();
            pair.status = status;
            for kind in pair.data.present_kinds() {
                notifications.push(PairNotification::Informational {
                    identity: identity.clone(),
                    kind,
                    description: kind.reapplied_description(),
                });
            }
            debug!(
                identity = %identity,
                status = %status,
                reapplied = notifications.len(),
                "Pair already present, updated status and re-applied last received data"
            );
        }

        self.commit(notifications, true);
        created
    }

    /// [`add_or_update`](Self::add_or_update) for a pair announced by a live
    /// server callback; a newly created pair becomes [`last_added`](Self::last_added).
    pub fn add_from_callback(
        &self,
        identity: Identity,
        status: RelationshipStatus,
        permissions: PairPermissionSets,
    ) -> bool {
        let created = self.add_or_update(identity.clone(), status, permissions);
        if created {
            *self.last_added.write() = Some(identity);
        }
        created
    }

    /// Drop the client's side of the relationship.
    ///
    /// If nothing remains the pair is marked offline and deleted; otherwise
    /// it stays with the remaining one-sided status. Returns true if the pair
    /// was deleted.
    pub fn remove(&self, identity: &Identity) -> PairResult<bool> {
        let handle = self.lookup(identity)?;

        let mut notifications = Vec::new();
        let remaining = {
            let mut pair = handle.write();
            pair.status = pair.status.without_client_side();
            if !pair.has_any_connection() && pair.mark_offline() {
                notifications.push(PairNotification::PresenceChanged {
                    identity: identity.clone(),
                    state: PresenceState::Offline,
                });
            }
            pair.status
        };

        let deleted = !remaining.is_active()
            && self
                .pairs
                .remove_if(identity, |_, current| {
                    current.same_entry(&handle) && !current.status().is_active()
                })
                .is_some();

        if deleted {
            let mut last_added = self.last_added.write();
            if last_added.as_ref() == Some(identity) {
                *last_added = None;
            }
        }

        debug!(identity = %identity, remaining = %remaining, deleted, "Removed pair relationship");
        self.commit(notifications, true);
        Ok(deleted)
    }

    /// Replace the relationship status without touching anything else
    pub fn update_relationship_status(
        &self,
        identity: &Identity,
        status: RelationshipStatus,
    ) -> PairResult<()> {
        let handle = self.lookup(identity)?;
        handle.write().status = status;
        debug!(identity = %identity, status = %status, "Updated relationship status");
        self.commit(Vec::new(), true);
        Ok(())
    }

    pub fn set_nickname(&self, identity: &Identity, nickname: Option<String>) -> PairResult<()> {
        let handle = self.lookup(identity)?;
        handle.write().nickname = nickname.filter(|n| !n.trim().is_empty());
        self.commit(Vec::new(), true);
        Ok(())
    }

    // ========================================================================
    // Presence
    // ========================================================================

    /// Mark a pair online. Returns true on an Offline → Online transition.
    ///
    /// The pair's profile is invalidated either way; only a real transition
    /// publishes presence, the optional online toast and `PairWentOnline`.
    pub fn mark_online(&self, identity: &Identity, ident: Option<String>) -> PairResult<bool> {
        let handle = self.lookup(identity)?;

        let mut notifications = vec![PairNotification::ProfileInvalidated {
            identity: identity.clone(),
        }];

        let transitioned = {
            let mut pair = handle.write();
            let transitioned = pair.mark_online(ident);
            if transitioned && self.config.notifies_online(pair.nickname.as_deref()) {
                notifications.push(PairNotification::OnlineNotification {
                    identity: identity.clone(),
                    message: online_message(&pair),
                });
            }
            transitioned
        };

        if transitioned {
            info!(identity = %identity, "Pair came online");
            notifications.insert(
                1,
                PairNotification::PresenceChanged {
                    identity: identity.clone(),
                    state: PresenceState::Online,
                },
            );
            notifications.push(PairNotification::PairWentOnline {
                identity: identity.clone(),
            });
        } else {
            debug!(identity = %identity, "Pair already online, refreshing view only");
        }

        self.commit(notifications, true);
        Ok(transitioned)
    }

    /// Mark a pair offline (which also ends visibility)
    pub fn mark_offline(&self, identity: &Identity) -> PairResult<bool> {
        let handle = self.lookup(identity)?;

        let mut notifications = vec![PairNotification::ProfileInvalidated {
            identity: identity.clone(),
        }];
        let transitioned = handle.write().mark_offline();
        if transitioned {
            info!(identity = %identity, "Pair went offline");
            notifications.push(PairNotification::PresenceChanged {
                identity: identity.clone(),
                state: PresenceState::Offline,
            });
        }

        self.commit(notifications, true);
        Ok(transitioned)
    }

    /// Mark an online pair visible.
    ///
    /// An offline pair is left alone and the rejected transition is logged.
    pub fn mark_visible(&self, identity: &Identity) -> PairResult<bool> {
        let handle = self.lookup(identity)?;

        let result = handle.write().mark_visible();
        match result {
            Ok(true) => {
                self.commit(
                    vec![PairNotification::PresenceChanged {
                        identity: identity.clone(),
                        state: PresenceState::Visible,
                    }],
                    true,
                );
                Ok(true)
            }
            Ok(false) => Ok(false),
            Err(err) => {
                warn!(identity = %identity, error = %err, "Ignoring visibility change");
                Ok(false)
            }
        }
    }

    /// Visible → Online
    pub fn mark_not_visible(&self, identity: &Identity) -> PairResult<bool> {
        let handle = self.lookup(identity)?;

        let transitioned = handle.write().mark_not_visible();
        if transitioned {
            self.commit(
                vec![PairNotification::PresenceChanged {
                    identity: identity.clone(),
                    state: PresenceState::Online,
                }],
                true,
            );
        }
        Ok(transitioned)
    }

    pub fn mark_toybox_online(&self, identity: &Identity) -> PairResult<()> {
        let handle = self.lookup(identity)?;
        handle.write().toybox_online = true;
        self.commit(Vec::new(), true);
        Ok(())
    }

    pub fn mark_toybox_offline(&self, identity: &Identity) -> PairResult<()> {
        let handle = self.lookup(identity)?;
        handle.write().toybox_online = false;
        self.commit(Vec::new(), true);
        Ok(())
    }

    // ========================================================================
    // Bulk operations
    // ========================================================================

    /// Re-merge every pair's last-received data (no re-fetch).
    ///
    /// Returns how many pairs had data to re-apply.
    pub fn reapply_all_pair_data(&self) -> usize {
        let handles: Vec<PairHandle> = self.pairs.iter().map(|e| e.value().clone()).collect();

        let mut notifications = Vec::new();
        let mut reapplied = 0;
        for handle in &handles {
            let kinds = handle.read().data.present_kinds();
            if !kinds.is_empty() {
                reapplied += 1;
            }
            notifications.extend(kinds.into_iter().map(|kind| PairNotification::Informational {
                identity: handle.identity().clone(),
                kind,
                description: kind.reapplied_description(),
            }));
        }

        debug!(pairs = reapplied, "Reapplied last received pair data");
        self.notifier.publish_all(notifications);
        reapplied
    }

    /// Mark every pair offline, then empty the registry.
    ///
    /// Offline marks fan out across threads; entries are removed only after
    /// every mark has completed. Pairs inserted concurrently are swept by a
    /// further round, up to [`CLEAR_MAX_ROUNDS`] rounds; anything added after
    /// that stays registered. Returns how many pairs were cleared.
    pub fn clear(&self) -> usize {
        debug!("Clearing all pairs");
        let mut cleared = 0;

        for _ in 0..CLEAR_MAX_ROUNDS {
            let handles: Vec<PairHandle> = self.pairs.iter().map(|e| e.value().clone()).collect();
            if handles.is_empty() {
                break;
            }

            mark_all_offline(&handles);

            for handle in &handles {
                self.pairs
                    .remove_if(handle.identity(), |_, current| current.same_entry(handle));
            }
            cleared += handles.len();

            self.notifier
                .publish_all(handles.iter().map(|handle| PairNotification::PresenceChanged {
                    identity: handle.identity().clone(),
                    state: PresenceState::Offline,
                }));
        }

        let remaining = self.pairs.len();
        if remaining > 0 {
            warn!(
                remaining,
                rounds = CLEAR_MAX_ROUNDS,
                "Pairs still being added while clearing; left in place"
            );
        }

        *self.last_added.write() = None;
        self.commit(Vec::new(), true);
        info!(cleared, "Cleared pair registry");
        cleared
    }

    // ========================================================================
    // Views and queries
    // ========================================================================

    /// Pairs with an active relationship (cached until the next mutation)
    pub fn direct_pairs(&self) -> Arc<Vec<PairHandle>> {
        self.view.get_or_compute(|| {
            trace!("Recomputing direct pairs view");
            self.pairs
                .iter()
                .filter(|entry| entry.value().status().is_active())
                .map(|entry| entry.value().clone())
                .collect()
        })
    }

    /// Whether the direct-pairs view will be recomputed on next read
    pub fn direct_pairs_dirty(&self) -> bool {
        self.view.is_dirty()
    }

    fn filter_pairs(&self, keep: impl Fn(&Pair) -> bool) -> Vec<PairHandle> {
        self.pairs
            .iter()
            .filter(|entry| keep(&entry.value().read()))
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Pairs with an online session
    pub fn online_pairs(&self) -> Vec<PairHandle> {
        self.filter_pairs(|pair| pair.presence.is_online())
    }

    pub fn online_identities(&self) -> Vec<Identity> {
        self.online_pairs()
            .iter()
            .map(|handle| handle.identity().clone())
            .collect()
    }

    pub fn visible_identities(&self) -> Vec<Identity> {
        self.filter_pairs(|pair| pair.presence.is_visible())
            .iter()
            .map(|handle| handle.identity().clone())
            .collect()
    }

    pub fn visible_count(&self) -> usize {
        self.pairs
            .iter()
            .filter(|entry| entry.value().presence().is_visible())
            .count()
    }

    /// Pairs connected to the toybox server
    pub fn online_toybox_pairs(&self) -> Vec<PairHandle> {
        self.filter_pairs(|pair| pair.toybox_online)
    }

    /// Resolve a raw uid to the registered identity (with its alias)
    pub fn identity_by_uid(&self, uid: &str) -> Option<Identity> {
        self.pairs
            .iter()
            .find(|entry| entry.key().matches_uid(uid))
            .map(|entry| entry.value().read().identity.clone())
    }

    /// Own and other status-provider permissions for a pair.
    ///
    /// Unknown pairs yield defaults for both.
    pub fn status_permissions(&self, identity: &Identity) -> (StatusPermissions, StatusPermissions) {
        match self.lookup(identity) {
            Ok(handle) => {
                let pair = handle.read();
                (
                    pair.permissions.own_pair.status_permissions(),
                    pair.permissions.other_pair.status_permissions(),
                )
            }
            Err(_) => (StatusPermissions::default(), StatusPermissions::default()),
        }
    }
}

impl Default for PairRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn online_message(pair: &Pair) -> String {
    match pair.nickname.as_deref() {
        Some(nick) if !nick.is_empty() => {
            format!("{} ({}) is now online", nick, pair.identity.alias_or_uid())
        }
        _ => format!("{} is now online", pair.identity.alias_or_uid()),
    }
}

/// Mark every handle offline, in parallel for large registries.
///
/// Returns once every mark has completed.
fn mark_all_offline(handles: &[PairHandle]) {
    let workers = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);

    if handles.len() < PARALLEL_CLEAR_THRESHOLD || workers < 2 {
        for handle in handles {
            handle.write().mark_offline();
        }
        return;
    }

    let chunk_size = handles.len().div_ceil(workers);
    std::thread::scope(|scope| {
        for chunk in handles.chunks(chunk_size) {
            scope.spawn(move || {
                for handle in chunk {
                    handle.write().mark_offline();
                }
            });
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifier::drain;

    fn id(uid: &str) -> Identity {
        Identity::new(uid)
    }

    fn registry_with(uids: &[&str]) -> PairRegistry {
        let registry = PairRegistry::with_defaults();
        for uid in uids {
            registry.add_or_update(
                id(uid),
                RelationshipStatus::Bidirectional,
                PairPermissionSets::default(),
            );
        }
        registry
    }

    #[test]
    fn test_add_then_lookup() {
        let registry = PairRegistry::with_defaults();
        let mut perms = PairPermissionSets::default();
        perms.other_pair.gag_features = true;

        assert!(registry.add_or_update(id("peer1"), RelationshipStatus::OneSidedOutgoing, perms.clone()));

        let pair = registry.get(&id("PEER1")).unwrap();
        assert_eq!(pair.status, RelationshipStatus::OneSidedOutgoing);
        assert_eq!(pair.permissions, perms);
        assert_eq!(pair.presence, PresenceState::Offline);
    }

    #[test]
    fn test_add_twice_updates_status_only() {
        let registry = registry_with(&["peer1"]);
        registry.handle_for_test("peer1").write().data.toybox = Some(Default::default());

        let mut other = PairPermissionSets::default();
        other.own_pair.is_paused = true;
        let mut rx = registry.subscribe();
        assert!(!registry.add_or_update(id("peer1"), RelationshipStatus::OneSidedIncoming, other));

        assert_eq!(registry.len(), 1);
        let pair = registry.get(&id("peer1")).unwrap();
        assert_eq!(pair.status, RelationshipStatus::OneSidedIncoming);
        assert!(!pair.permissions.own_pair.is_paused);
        assert!(pair.data.toybox.is_some());

        let notes = drain(&mut rx);
        assert!(notes.iter().any(|n| matches!(
            n,
            PairNotification::Informational { kind: crate::types::DataKind::Toybox, .. }
        )));
        assert_eq!(notes.last(), Some(&PairNotification::UiRefreshRequested));
    }

    #[test]
    fn test_last_added_only_from_callbacks() {
        let registry = PairRegistry::with_defaults();
        registry.add_or_update(id("a"), RelationshipStatus::Bidirectional, Default::default());
        assert_eq!(registry.last_added(), None);

        registry.add_from_callback(id("b"), RelationshipStatus::Bidirectional, Default::default());
        assert_eq!(registry.last_added(), Some(id("b")));

        // Existing pair does not replace last added
        registry.add_from_callback(id("a"), RelationshipStatus::Bidirectional, Default::default());
        assert_eq!(registry.last_added(), Some(id("b")));
    }

    #[test]
    fn test_unknown_identity_is_desync() {
        let registry = PairRegistry::with_defaults();
        let ghost = id("ghost");

        assert_eq!(registry.get(&ghost), Err(PairError::PairNotFound(ghost.clone())));
        assert!(registry.mark_online(&ghost, None).is_err());
        assert!(registry.mark_offline(&ghost).is_err());
        assert!(registry.mark_visible(&ghost).is_err());
        assert!(registry.mark_not_visible(&ghost).is_err());
        assert!(registry.remove(&ghost).is_err());
        assert!(registry.set_nickname(&ghost, None).is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_mark_online_notifications() {
        let registry = registry_with(&["peer1"]);
        let mut rx = registry.subscribe();

        assert!(registry.mark_online(&id("peer1"), None).unwrap());
        let names: Vec<_> = drain(&mut rx).iter().map(|n| n.name()).collect();
        assert_eq!(
            names,
            vec![
                "ProfileInvalidated",
                "PresenceChanged",
                "OnlineNotification",
                "PairWentOnline",
                "UiRefreshRequested"
            ]
        );

        assert!(!registry.mark_online(&id("peer1"), None).unwrap());
        let names: Vec<_> = drain(&mut rx).iter().map(|n| n.name()).collect();
        assert_eq!(names, vec!["ProfileInvalidated", "UiRefreshRequested"]);
    }

    #[test]
    fn test_online_message_uses_nickname() {
        let registry = registry_with(&["peer1"]);
        registry
            .set_nickname(&id("peer1"), Some("Pup".to_string()))
            .unwrap();
        let mut rx = registry.subscribe();

        registry.mark_online(&id("peer1"), None).unwrap();
        let message = drain(&mut rx).into_iter().find_map(|n| match n {
            PairNotification::OnlineNotification { message, .. } => Some(message),
            _ => None,
        });
        assert_eq!(message.as_deref(), Some("Pup (peer1) is now online"));
    }

    #[test]
    fn test_online_notification_respects_config() {
        let registry = PairRegistry::new(PairManagerConfig {
            online_notifications_only_for_named: true,
            ..Default::default()
        });
        registry.add_or_update(id("peer1"), RelationshipStatus::Bidirectional, Default::default());
        let mut rx = registry.subscribe();

        registry.mark_online(&id("peer1"), None).unwrap();
        assert!(!drain(&mut rx)
            .iter()
            .any(|n| matches!(n, PairNotification::OnlineNotification { .. })));
    }

    #[test]
    fn test_visible_requires_online() {
        let registry = registry_with(&["peer1"]);
        let mut rx = registry.subscribe();

        assert_eq!(registry.mark_visible(&id("peer1")), Ok(false));
        assert_eq!(registry.get(&id("peer1")).unwrap().presence, PresenceState::Offline);
        assert!(drain(&mut rx).is_empty());

        registry.mark_online(&id("peer1"), None).unwrap();
        assert_eq!(registry.mark_visible(&id("peer1")), Ok(true));
        assert_eq!(registry.visible_count(), 1);

        assert_eq!(registry.mark_not_visible(&id("peer1")), Ok(true));
        assert_eq!(registry.get(&id("peer1")).unwrap().presence, PresenceState::Online);
    }

    #[test]
    fn test_offline_implies_not_visible() {
        let registry = registry_with(&["peer1"]);
        registry.mark_online(&id("peer1"), Some("session".into())).unwrap();
        registry.mark_visible(&id("peer1")).unwrap();

        assert!(registry.mark_offline(&id("peer1")).unwrap());
        let pair = registry.get(&id("peer1")).unwrap();
        assert_eq!(pair.presence, PresenceState::Offline);
        assert!(pair.session.is_none());
        assert!(registry.visible_identities().is_empty());
    }

    #[test]
    fn test_remove_keeps_remaining_side() {
        let registry = registry_with(&["peer1"]);
        registry.mark_online(&id("peer1"), None).unwrap();

        assert_eq!(registry.remove(&id("peer1")), Ok(false));
        let pair = registry.get(&id("peer1")).unwrap();
        assert_eq!(pair.status, RelationshipStatus::OneSidedIncoming);
        assert_eq!(pair.presence, PresenceState::Online);

        assert_eq!(registry.remove(&id("peer1")), Ok(true));
        assert!(!registry.contains(&id("peer1")));
    }

    #[test]
    fn test_remove_one_sided_marks_offline() {
        let registry = PairRegistry::with_defaults();
        registry.add_or_update(id("peer1"), RelationshipStatus::OneSidedOutgoing, Default::default());
        let handle = registry.lookup(&id("peer1")).unwrap();
        registry.mark_online(&id("peer1"), None).unwrap();
        let mut rx = registry.subscribe();

        assert_eq!(registry.remove(&id("peer1")), Ok(true));
        assert_eq!(handle.presence(), PresenceState::Offline);
        assert!(drain(&mut rx).contains(&PairNotification::PresenceChanged {
            identity: id("peer1"),
            state: PresenceState::Offline,
        }));
    }

    #[test]
    fn test_direct_pairs_excludes_none() {
        let registry = registry_with(&["a", "b"]);
        registry.add_or_update(id("c"), RelationshipStatus::None, Default::default());

        let view = registry.direct_pairs();
        let mut uids: Vec<_> = view.iter().map(|h| h.identity().uid().to_string()).collect();
        uids.sort();
        assert_eq!(uids, vec!["a", "b"]);
        assert_eq!(registry.len(), 3);

        registry.update_relationship_status(&id("c"), RelationshipStatus::OneSidedIncoming).unwrap();
        assert!(registry.direct_pairs_dirty());
        assert_eq!(registry.direct_pairs().len(), 3);
    }

    #[test]
    fn test_clear_marks_everyone_offline() {
        let registry = registry_with(&["a", "b", "c"]);
        for uid in ["a", "b"] {
            registry.mark_online(&id(uid), None).unwrap();
        }
        registry.add_from_callback(id("d"), RelationshipStatus::Bidirectional, Default::default());
        let handles: Vec<_> = registry.identities().iter().map(|i| registry.lookup(i).unwrap()).collect();
        let mut rx = registry.subscribe();

        assert_eq!(registry.clear(), 4);
        assert!(registry.is_empty());
        assert!(registry.direct_pairs().is_empty());
        assert_eq!(registry.last_added(), None);
        assert!(handles.iter().all(|h| h.presence() == PresenceState::Offline));

        let offline = drain(&mut rx)
            .into_iter()
            .filter(|n| matches!(n, PairNotification::PresenceChanged { state: PresenceState::Offline, .. }))
            .count();
        assert_eq!(offline, 4);
    }

    #[test]
    fn test_queries() {
        let registry = registry_with(&["a", "b"]);
        registry.add_or_update(
            Identity::new("C").with_alias("Cee"),
            RelationshipStatus::Bidirectional,
            Default::default(),
        );
        registry.mark_online(&id("a"), None).unwrap();
        registry.mark_toybox_online(&id("b")).unwrap();

        assert_eq!(registry.online_identities(), vec![id("a")]);
        assert_eq!(registry.online_toybox_pairs().len(), 1);
        assert_eq!(
            registry.identity_by_uid("c").and_then(|i| i.alias().map(str::to_string)),
            Some("Cee".to_string())
        );

        registry.mark_toybox_offline(&id("b")).unwrap();
        assert!(registry.online_toybox_pairs().is_empty());
    }

    #[test]
    fn test_status_permissions_defaults_for_unknown() {
        let registry = PairRegistry::with_defaults();
        let (own, other) = registry.status_permissions(&id("nobody"));
        assert_eq!(own, StatusPermissions::default());
        assert_eq!(other, StatusPermissions::default());
    }

    #[test]
    fn test_reapply_all_pair_data() {
        let registry = registry_with(&["a", "b"]);
        {
            let handle = registry.lookup(&id("a")).unwrap();
            let mut pair = handle.write();
            pair.data.appearance = Some(Default::default());
            pair.data.wardrobe = Some(Default::default());
        }
        let mut rx = registry.subscribe();

        assert_eq!(registry.reapply_all_pair_data(), 1);
        assert_eq!(drain(&mut rx).len(), 2);
    }

    impl PairRegistry {
        fn handle_for_test(&self, uid: &str) -> PairHandle {
            self.lookup(&Identity::new(uid)).unwrap()
        }
    }
}
