//! Permission reconciliation
//!
//! Applies permission changes announced by the relay to a pair's permission
//! sets and decides which side effects each change has:
//!
//! - the pause flag changing invalidates the pair's profile
//! - a third-party status permission changing while the pair is visible
//!   notifies the status provider
//! - the direct-pairs view is always invalidated, and the UI is asked to
//!   refresh only when the change was to the peer's settings
//!
//! A malformed change (unknown name, uncoercible value) is logged and
//! reported as [`PermissionOutcome::Rejected`]; it never aborts the caller.

use tracing::{debug, warn};

use crate::error::{PairError, PairResult};
use crate::identity::Identity;
use crate::notifier::PairNotification;
use crate::permissions::{
    is_status_permission, EditAccessPermissions, FieldUpdate, GlobalPermissions,
    PairPermissions, PermissionScope, RawValue, PAUSE_PERMISSION,
};
use crate::registry::PairRegistry;

/// What happened to a single permission change
#[derive(Debug, Clone, PartialEq)]
pub enum PermissionOutcome {
    /// The field was written (possibly with an unchanged value)
    Applied(FieldUpdate),
    /// The change was logged and dropped; the field keeps its prior value
    Rejected(PairError),
}

impl PermissionOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, PermissionOutcome::Applied(_))
    }

    /// True if a field value actually changed
    pub fn changed(&self) -> bool {
        matches!(self, PermissionOutcome::Applied(update) if update.changed())
    }
}

impl PairRegistry {
    /// Apply one named permission change to a pair.
    ///
    /// Only an unknown identity is an error; a bad name or value comes back
    /// as [`PermissionOutcome::Rejected`] with nothing written.
    pub fn apply_permission_change(
        &self,
        identity: &Identity,
        scope: PermissionScope,
        name: &str,
        raw: &RawValue,
    ) -> PairResult<PermissionOutcome> {
        let handle = self.lookup(identity)?;

        let (result, visible) = {
            let mut pair = handle.write();
            let result = pair.apply_permission(scope, name, raw);
            (result, pair.presence.is_visible())
        };

        let update = match result {
            Ok(update) => update,
            Err(err) => {
                warn!(
                    identity = %identity,
                    scope = %scope,
                    permission = name,
                    value = %raw,
                    error = %err,
                    "Ignoring permission change"
                );
                return Ok(PermissionOutcome::Rejected(err));
            }
        };

        debug!(
            identity = %identity,
            scope = %scope,
            permission = update.name,
            changed = update.changed(),
            "Applied permission change"
        );

        let mut notifications = Vec::new();
        if update.changed() {
            if update.name == PAUSE_PERMISSION {
                notifications.push(PairNotification::ProfileInvalidated {
                    identity: identity.clone(),
                });
            }
            if is_status_permission(update.name) && visible {
                notifications.push(PairNotification::PermissionsChangedForProvider {
                    identity: identity.clone(),
                });
            }
        }

        self.commit(notifications, scope.pushes_ui_refresh());
        Ok(PermissionOutcome::Applied(update))
    }

    /// Replace the peer's global, pair and edit-access sets at once.
    ///
    /// Side effects match a field-by-field application of every difference.
    pub fn apply_other_permissions(
        &self,
        identity: &Identity,
        global: GlobalPermissions,
        pair_permissions: PairPermissions,
        edit_access: EditAccessPermissions,
    ) -> PairResult<()> {
        let handle = self.lookup(identity)?;

        let (pause_changed, status_changed, visible) = {
            let mut pair = handle.write();
            let previous = &pair.permissions.other_pair;
            let pause_changed = previous.is_paused != pair_permissions.is_paused;
            let status_changed =
                previous.status_permissions() != pair_permissions.status_permissions();

            pair.permissions.other_global = global;
            pair.permissions.other_pair = pair_permissions;
            pair.permissions.other_edit_access = edit_access;
            (pause_changed, status_changed, pair.presence.is_visible())
        };

        debug!(identity = %identity, pause_changed, status_changed, "Replaced other permissions");

        let mut notifications = Vec::new();
        if pause_changed {
            notifications.push(PairNotification::ProfileInvalidated {
                identity: identity.clone(),
            });
        }
        if status_changed && visible {
            notifications.push(PairNotification::PermissionsChangedForProvider {
                identity: identity.clone(),
            });
        }

        self.commit(notifications, true);
        Ok(())
    }
}
