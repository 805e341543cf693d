//! Data slices received from paired peers
//!
//! A peer publishes several independent slices of character data. Each one is
//! kept as last received and replaced wholesale by the next delivery. Alias
//! and shock data differ per recipient, so the composite payload carries a
//! map keyed by recipient uid and only the client's own entry is ever stored.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// One gag slot of a peer's appearance
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GagSlot {
    pub gag_type: String,
    pub padlock: String,
    pub password: String,
    /// Unix timestamp (seconds) at which a timer lock releases
    pub timer_expires_at: Option<i64>,
    pub assigner: String,
}

/// Worn gags and their locks
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppearanceData {
    pub gag_slots: Vec<GagSlot>,
}

/// Restraint set state
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WardrobeData {
    pub outfit_names: Vec<String>,
    pub active_set: Option<String>,
    pub enabled_by: String,
    pub padlock: String,
    pub locked_by: String,
    pub lock_expires_at: Option<i64>,
}

/// A single alias rule (input phrase expands to output command)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AliasTrigger {
    pub enabled: bool,
    pub input: String,
    pub output: String,
}

/// The alias list a peer keeps for one specific recipient
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AliasData {
    pub has_name_stored: bool,
    pub listener_name: String,
    pub triggers: Vec<AliasTrigger>,
}

/// Patterns, triggers and alarms a peer exposes
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToyboxData {
    pub toy_active: bool,
    pub active_pattern: Option<String>,
    pub patterns: Vec<String>,
    pub active_triggers: Vec<String>,
    pub active_alarms: Vec<String>,
}

/// Shock collar permissions a peer grants one specific recipient
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ShockPermissions {
    pub allow_shocks: bool,
    pub allow_vibrations: bool,
    pub allow_beeps: bool,
    pub max_intensity: u8,
    pub max_duration: Duration,
}

/// Which data slice an update touched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataKind {
    Appearance,
    Wardrobe,
    Alias,
    Toybox,
    ShockPermissions,
}

impl DataKind {
    pub const ALL: [DataKind; 5] = [
        DataKind::Appearance,
        DataKind::Wardrobe,
        DataKind::Alias,
        DataKind::Toybox,
        DataKind::ShockPermissions,
    ];

    fn label(&self) -> &'static str {
        match self {
            DataKind::Appearance => "Appearance",
            DataKind::Wardrobe => "Wardrobe",
            DataKind::Alias => "Alias",
            DataKind::Toybox => "Toybox",
            DataKind::ShockPermissions => "Shock Permissions",
        }
    }

    /// Text of the informational event emitted when this slice arrives
    pub fn received_description(&self) -> String {
        format!("Received Character {} Data", self.label())
    }

    /// Text of the informational event emitted when this slice is re-merged
    pub fn reapplied_description(&self) -> String {
        format!("Reapplied Character {} Data", self.label())
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A single-slice delivery, already addressed to this client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data")]
pub enum DataPayload {
    Appearance(AppearanceData),
    Wardrobe(WardrobeData),
    Alias(AliasData),
    Toybox(ToyboxData),
    ShockPermissions(ShockPermissions),
}

impl DataPayload {
    pub fn kind(&self) -> DataKind {
        match self {
            DataPayload::Appearance(_) => DataKind::Appearance,
            DataPayload::Wardrobe(_) => DataKind::Wardrobe,
            DataPayload::Alias(_) => DataKind::Alias,
            DataPayload::Toybox(_) => DataKind::Toybox,
            DataPayload::ShockPermissions(_) => DataKind::ShockPermissions,
        }
    }
}

/// Bundled delivery of several slices for one peer
///
/// Per-recipient maps are keyed by recipient uid.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositeData {
    pub appearance: Option<AppearanceData>,
    pub wardrobe: Option<WardrobeData>,
    pub alias_data_by_recipient: Option<HashMap<String, AliasData>>,
    pub toybox: Option<ToyboxData>,
    pub shock_permissions_by_recipient: Option<HashMap<String, ShockPermissions>>,
}

/// Last-received slices of a pair; each is `None` until first delivery
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LastReceivedData {
    pub appearance: Option<AppearanceData>,
    pub wardrobe: Option<WardrobeData>,
    pub alias: Option<AliasData>,
    pub toybox: Option<ToyboxData>,
    pub shock_permissions: Option<ShockPermissions>,
    /// Unix timestamp (milliseconds) of the latest delivery
    pub updated_at: Option<i64>,
}

impl LastReceivedData {
    /// Slices that have been received at least once
    pub fn present_kinds(&self) -> Vec<DataKind> {
        DataKind::ALL
            .into_iter()
            .filter(|kind| self.has(*kind))
            .collect()
    }

    pub fn has(&self, kind: DataKind) -> bool {
        match kind {
            DataKind::Appearance => self.appearance.is_some(),
            DataKind::Wardrobe => self.wardrobe.is_some(),
            DataKind::Alias => self.alias.is_some(),
            DataKind::Toybox => self.toybox.is_some(),
            DataKind::ShockPermissions => self.shock_permissions.is_some(),
        }
    }
}
