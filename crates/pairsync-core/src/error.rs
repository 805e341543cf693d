//! Error types for the pair reconciliation core

use thiserror::Error;

use crate::identity::Identity;
use crate::permissions::{FieldKind, PermissionScope};
use crate::types::PresenceState;

/// Main error type for pair reconciliation operations
///
/// Only [`PairError::PairNotFound`] is propagated to callers by the registry.
/// The remaining variants describe a single malformed field or transition;
/// they are logged where they occur and handed back inside an outcome value
/// so the surrounding batch keeps going.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PairError {
    /// The identity is not in the registry (client and server are out of sync)
    #[error("Pair not found: {0}")]
    PairNotFound(Identity),

    /// The permission name is not part of the scope's schema
    #[error("Unknown permission '{name}' for scope {scope}")]
    UnknownPermission {
        scope: PermissionScope,
        name: String,
    },

    /// The raw value could not be converted to the field's declared type
    #[error("Cannot coerce {found} into {expected} for permission '{name}'")]
    Coercion {
        name: String,
        expected: FieldKind,
        found: String,
    },

    /// The requested presence change is not valid from the current state
    #[error("Invalid presence transition for {identity}: {from} -> {to}")]
    InvalidPresenceTransition {
        identity: Identity,
        from: PresenceState,
        to: PresenceState,
    },
}

impl PairError {
    /// True for errors that mean the client view has drifted from the server
    pub fn is_desync(&self) -> bool {
        matches!(self, PairError::PairNotFound(_))
    }
}

/// Result type alias using PairError
pub type PairResult<T> = Result<T, PairError>;
