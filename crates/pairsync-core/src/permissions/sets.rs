//! The three permission set shapes
//!
//! Global and pair sets appear twice on every pair (own and other); edit
//! access sets describe which of those fields the other side may change.
//! Wire names match what the relay sends in single-field change events.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{permission_set, state_enum};

/// Name of the pause flag in [`PairPermissions`]
pub const PAUSE_PERMISSION: &str = "IsPaused";

/// Pair permissions mirrored to the external status-effect provider
pub const STATUS_PERMISSIONS: &[&str] = &[
    "AllowPositiveStatusTypes",
    "AllowNegativeStatusTypes",
    "AllowSpecialStatusTypes",
    "PairCanApplyOwnMoodlesToYou",
    "PairCanApplyYourMoodlesToYou",
    "MaxMoodleTime",
    "AllowPermanentMoodles",
    "AllowRemovingMoodles",
];

/// True if `name` belongs to the status-provider subset
pub fn is_status_permission(name: &str) -> bool {
    STATUS_PERMISSIONS.contains(&name)
}

state_enum! {
    /// Which puppeteer requests a pair honours
    pub enum PuppeteerMode { Off, Sit, Motions, All }
}

state_enum! {
    /// Strongest shock-collar action a pair may trigger
    pub enum ShockMode { Off, Beep, Vibrate, Shock }
}

permission_set! {
    /// Account-wide settings of one side of the pair
    pub struct GlobalPermissions {
        safeword: String = String::new() => "Safeword",
        live_chat_garbler_active: bool = false => "LiveChatGarblerActive",
        live_chat_garbler_locked: bool = false => "LiveChatGarblerLocked",
        wardrobe_enabled: bool = true => "WardrobeEnabled",
        item_auto_equip: bool = false => "ItemAutoEquip",
        restraint_set_auto_equip: bool = false => "RestraintSetAutoEquip",
        puppeteer_enabled: bool = true => "PuppeteerEnabled",
        global_trigger_phrase: String = String::new() => "GlobalTriggerPhrase",
        global_puppeteer_mode: PuppeteerMode = PuppeteerMode::Off => "GlobalPuppeteerMode",
        moodles_enabled: bool = false => "MoodlesEnabled",
        toybox_enabled: bool = true => "ToyboxEnabled",
        lock_toybox_ui: bool = false => "LockToyboxUI",
        toy_intensity: i32 = 0 => "ToyIntensity",
        spatial_vibrator_audio: bool = false => "SpatialVibratorAudio",
        global_shock_share_code: String = String::new() => "GlobalShockShareCode",
        global_shock_vibrate_duration: Duration = Duration::ZERO => "GlobalShockVibrateDuration",
    }
}

permission_set! {
    /// Settings one side applies specifically to the other
    pub struct PairPermissions {
        /// A paused pair hides presence and profile data
        is_paused: bool = false => "IsPaused",
        gag_features: bool = false => "GagFeatures",
        owner_locks: bool = false => "OwnerLocks",
        extended_lock_times: bool = false => "ExtendedLockTimes",
        max_lock_time: Duration = Duration::ZERO => "MaxLockTime",
        in_hardcore: bool = false => "InHardcore",
        apply_restraint_sets: bool = false => "ApplyRestraintSets",
        lock_restraint_sets: bool = false => "LockRestraintSets",
        max_allowed_restraint_time: Duration = Duration::ZERO => "MaxAllowedRestraintTime",
        remove_restraint_sets: bool = false => "RemoveRestraintSets",
        trigger_phrase: String = String::new() => "TriggerPhrase",
        start_char: char = '(' => "StartChar",
        end_char: char = ')' => "EndChar",
        puppeteer_mode: PuppeteerMode = PuppeteerMode::Off => "PuppeteerMode",
        allow_positive_status_types: bool = false => "AllowPositiveStatusTypes",
        allow_negative_status_types: bool = false => "AllowNegativeStatusTypes",
        allow_special_status_types: bool = false => "AllowSpecialStatusTypes",
        pair_can_apply_own_moodles_to_you: bool = false => "PairCanApplyOwnMoodlesToYou",
        pair_can_apply_your_moodles_to_you: bool = false => "PairCanApplyYourMoodlesToYou",
        max_moodle_time: Duration = Duration::ZERO => "MaxMoodleTime",
        allow_permanent_moodles: bool = false => "AllowPermanentMoodles",
        allow_removing_moodles: bool = false => "AllowRemovingMoodles",
        can_toggle_toy_state: bool = false => "CanToggleToyState",
        can_use_vibe_remote: bool = false => "CanUseVibeRemote",
        can_execute_patterns: bool = false => "CanExecutePatterns",
        vibrator_alarms: bool = false => "VibratorAlarms",
        max_vibe_intensity: i32 = 100 => "MaxVibeIntensity",
        shock_mode: ShockMode = ShockMode::Off => "ShockMode",
    }
}

permission_set! {
    /// Which fields of the other side's sets this side may edit
    pub struct EditAccessPermissions {
        live_chat_garbler_active_allowed: bool = false => "LiveChatGarblerActiveAllowed",
        live_chat_garbler_locked_allowed: bool = false => "LiveChatGarblerLockedAllowed",
        gag_features_allowed: bool = false => "GagFeaturesAllowed",
        owner_locks_allowed: bool = false => "OwnerLocksAllowed",
        extended_lock_times_allowed: bool = false => "ExtendedLockTimesAllowed",
        max_lock_time_allowed: bool = false => "MaxLockTimeAllowed",
        apply_restraint_sets_allowed: bool = false => "ApplyRestraintSetsAllowed",
        lock_restraint_sets_allowed: bool = false => "LockRestraintSetsAllowed",
        remove_restraint_sets_allowed: bool = false => "RemoveRestraintSetsAllowed",
        puppeteer_mode_allowed: bool = false => "PuppeteerModeAllowed",
        moodles_enabled_allowed: bool = false => "MoodlesEnabledAllowed",
        allow_positive_status_types_allowed: bool = false => "AllowPositiveStatusTypesAllowed",
        allow_negative_status_types_allowed: bool = false => "AllowNegativeStatusTypesAllowed",
        allow_special_status_types_allowed: bool = false => "AllowSpecialStatusTypesAllowed",
        max_moodle_time_allowed: bool = false => "MaxMoodleTimeAllowed",
        toybox_enabled_allowed: bool = false => "ToyboxEnabledAllowed",
        can_toggle_toy_state_allowed: bool = false => "CanToggleToyStateAllowed",
        can_use_vibe_remote_allowed: bool = false => "CanUseVibeRemoteAllowed",
        can_execute_patterns_allowed: bool = false => "CanExecutePatternsAllowed",
    }
}

/// The status-provider subset of a [`PairPermissions`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatusPermissions {
    pub allow_positive: bool,
    pub allow_negative: bool,
    pub allow_special: bool,
    pub pair_can_apply_own: bool,
    pub pair_can_apply_yours: bool,
    pub max_duration: Duration,
    pub allow_permanent: bool,
    pub allow_removing: bool,
}

impl PairPermissions {
    pub fn status_permissions(&self) -> StatusPermissions {
        StatusPermissions {
            allow_positive: self.allow_positive_status_types,
            allow_negative: self.allow_negative_status_types,
            allow_special: self.allow_special_status_types,
            pair_can_apply_own: self.pair_can_apply_own_moodles_to_you,
            pair_can_apply_yours: self.pair_can_apply_your_moodles_to_you,
            max_duration: self.max_moodle_time,
            allow_permanent: self.allow_permanent_moodles,
            allow_removing: self.allow_removing_moodles,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::{FieldKind, PermissionScope, PermissionSet, PermissionValue, RawValue};

    #[test]
    fn test_status_permissions_exist_in_pair_schema() {
        for name in STATUS_PERMISSIONS {
            assert!(
                PairPermissions::field(name).is_some(),
                "{} missing from PairPermissions",
                name
            );
        }
        assert!(PairPermissions::field(PAUSE_PERMISSION).is_some());
    }

    #[test]
    fn test_defaults() {
        let perms = PairPermissions::default();
        assert_eq!(perms.start_char, '(');
        assert_eq!(perms.end_char, ')');
        assert_eq!(perms.max_vibe_intensity, 100);
        assert!(GlobalPermissions::default().wardrobe_enabled);
    }

    #[test]
    fn test_schema_kinds() {
        let kind = |name| PairPermissions::field(name).map(|f| f.kind);
        assert_eq!(kind("MaxLockTime"), Some(FieldKind::Duration));
        assert_eq!(kind("StartChar"), Some(FieldKind::Char));
        assert_eq!(kind("MaxVibeIntensity"), Some(FieldKind::Int));
        assert_eq!(kind("ShockMode"), Some(FieldKind::State(ShockMode::VARIANTS)));
    }

    #[test]
    fn test_apply_every_kind() {
        let mut perms = PairPermissions::default();
        let scope = PermissionScope::OtherPair;

        perms
            .apply(scope, "MaxLockTime", &RawValue::UInt(36_000_000_000))
            .unwrap();
        perms.apply(scope, "EndChar", &RawValue::Byte(b']')).unwrap();
        perms.apply(scope, "MaxVibeIntensity", &RawValue::Int(55)).unwrap();
        perms
            .apply(scope, "ShockMode", &RawValue::Text("vibrate".into()))
            .unwrap();
        perms
            .apply(scope, "TriggerPhrase", &RawValue::Text("bark".into()))
            .unwrap();

        assert_eq!(perms.max_lock_time, Duration::from_secs(3600));
        assert_eq!(perms.end_char, ']');
        assert_eq!(perms.max_vibe_intensity, 55);
        assert_eq!(perms.shock_mode, ShockMode::Vibrate);
        assert_eq!(perms.trigger_phrase, "bark");
        assert_eq!(
            perms.get("ShockMode"),
            Some(PermissionValue::State("Vibrate".into()))
        );
    }

    #[test]
    fn test_serde_uses_wire_names() {
        let json = serde_json::to_value(PairPermissions::default()).unwrap();
        assert_eq!(json["IsPaused"], serde_json::json!(false));

        let parsed: PairPermissions =
            serde_json::from_str(r#"{"IsPaused": true, "PuppeteerMode": "Sit"}"#).unwrap();
        assert!(parsed.is_paused);
        assert_eq!(parsed.puppeteer_mode, PuppeteerMode::Sit);
        assert_eq!(parsed.start_char, '(');
    }

    #[test]
    fn test_state_enum_helpers() {
        assert_eq!(PuppeteerMode::from_name("Motions"), Some(PuppeteerMode::Motions));
        assert_eq!(PuppeteerMode::from_name("motions"), None);
        assert_eq!(ShockMode::Shock.as_str(), "Shock");
    }
}
