//! Pair Sync Core Library
//!
//! Local, authoritative view of every peer the client is paired with, kept
//! in step with the event stream of a remote relay.
//!
//! ## Overview
//!
//! A relay announces pairing changes, presence, permission edits and
//! character data for each paired peer. This crate folds those events into a
//! concurrent registry of pair entities and publishes notifications for UI,
//! profile and status-provider collaborators.
//!
//! ```text
//!  transport ──InboundEvent──► PairManager::dispatch
//!                                   │
//!                                   ▼
//!                             PairRegistry ─────────────► PairNotifier ──► subscribers
//!                              ├── presence transitions      (broadcast)
//!                              ├── permission reconciler
//!                              ├── data pipeline
//!                              └── DirectPairsView (cached)
//! ```
//!
//! ## Core Principles
//!
//! - **Never invent pairs**: events for unknown identities fail with
//!   [`PairError::PairNotFound`] instead of creating an entry
//! - **Bad fields are local**: an unknown or uncoercible permission is logged
//!   and skipped; nothing else in the batch is affected
//! - **Per-pair locking**: unrelated identities never block each other
//!
//! ## Quick Start
//!
//! ```
//! use pairsync_core::{Identity, PairRegistry, PermissionScope, RawValue, RelationshipStatus};
//!
//! let registry = PairRegistry::with_defaults();
//! let peer = Identity::new("peer1");
//!
//! registry.add_or_update(peer.clone(), RelationshipStatus::Bidirectional, Default::default());
//! registry.mark_online(&peer, None)?;
//! registry.mark_visible(&peer)?;
//! registry.apply_permission_change(&peer, PermissionScope::OtherPair, "IsPaused", &RawValue::Bool(true))?;
//!
//! assert!(registry.get(&peer)?.is_paused());
//! # Ok::<(), pairsync_core::PairError>(())
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod identity;
pub mod manager;
pub mod notifier;
pub mod permissions;
pub mod pipeline;
pub mod reconciler;
pub mod registry;
pub mod types;
pub mod view;

// Re-exports
pub use config::{ConfigError, PairManagerConfig};
pub use error::{PairError, PairResult};
pub use events::InboundEvent;
pub use identity::Identity;
pub use manager::PairManager;
pub use notifier::{
    drain, drain_with_loss, Drained, PairNotification, PairNotifier, DEFAULT_CHANNEL_CAPACITY,
};
pub use permissions::{
    EditAccessPermissions, FieldKind, FieldUpdate, GlobalPermissions, PairPermissions,
    PermissionScope, PermissionSet, PermissionValue, RawValue, StatusPermissions,
};
pub use reconciler::PermissionOutcome;
pub use registry::PairRegistry;
pub use types::*;
pub use view::DirectPairsView;
