//! Typed permission sets and the per-scope field tables
//!
//! Every pair carries six permission sets, addressed by [`PermissionScope`].
//! The relay announces single-field changes by name (`"IsPaused"`,
//! `"MaxLockTime"`, ...) with a loosely typed [`RawValue`]. Instead of looking
//! fields up at runtime, each set type declares an exhaustive table of
//! [`PermissionField`] entries (name, declared [`FieldKind`], typed getter and
//! setter). The `permission_set!` macro generates the struct and the table
//! from one declaration so the two never drift apart.
//!
//! ```text
//! PermissionChange { scope, name, raw }
//!        │
//!        ▼
//! Pair::apply_permission(scope) ──► S::field(name) ──► coerce(raw, field.kind)
//!                                      │ None               │ None
//!                                      ▼                    ▼
//!                              UnknownPermission        Coercion
//!                                                           │ Some(value)
//!                                                           ▼
//!                                               (field.set)(set, value)
//! ```

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{PairError, PairResult};

pub mod sets;
pub mod value;

pub use sets::{
    is_status_permission, EditAccessPermissions, GlobalPermissions, PairPermissions,
    PuppeteerMode, ShockMode, StatusPermissions, PAUSE_PERMISSION, STATUS_PERMISSIONS,
};
pub use value::{coerce, duration_from_ticks, duration_to_ticks, RawValue};

/// The six independently addressed permission mappings on a pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PermissionScope {
    /// The client's global settings, as applied to this pair
    OwnGlobal,
    /// The client's settings for this specific pair
    OwnPair,
    /// What the client lets this pair edit
    OwnEditAccess,
    /// The pair's global settings
    OtherGlobal,
    /// The pair's settings for the client
    OtherPair,
    /// What the pair lets the client edit
    OtherEditAccess,
}

impl PermissionScope {
    pub const ALL: [PermissionScope; 6] = [
        PermissionScope::OwnGlobal,
        PermissionScope::OwnPair,
        PermissionScope::OwnEditAccess,
        PermissionScope::OtherGlobal,
        PermissionScope::OtherPair,
        PermissionScope::OtherEditAccess,
    ];

    /// True for the client's own settings
    pub fn is_own(&self) -> bool {
        matches!(
            self,
            PermissionScope::OwnGlobal | PermissionScope::OwnPair | PermissionScope::OwnEditAccess
        )
    }

    /// Whether a single-field change in this scope asks the UI to refresh.
    ///
    /// Changes to the client's own settings update silently; changes to the
    /// peer's settings push a refresh.
    pub fn pushes_ui_refresh(&self) -> bool {
        !self.is_own()
    }

    /// Field names and kinds accepted by this scope
    pub fn schema(&self) -> Vec<(&'static str, FieldKind)> {
        match self {
            PermissionScope::OwnGlobal | PermissionScope::OtherGlobal => {
                describe::<GlobalPermissions>()
            }
            PermissionScope::OwnPair | PermissionScope::OtherPair => describe::<PairPermissions>(),
            PermissionScope::OwnEditAccess | PermissionScope::OtherEditAccess => {
                describe::<EditAccessPermissions>()
            }
        }
    }
}

impl fmt::Display for PermissionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl std::str::FromStr for PermissionScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.replace(['-', '_'], "").to_ascii_lowercase();
        PermissionScope::ALL
            .into_iter()
            .find(|scope| scope.to_string().to_ascii_lowercase() == wanted)
            .ok_or_else(|| format!("unknown permission scope: {}", s))
    }
}

fn describe<S: PermissionSet>() -> Vec<(&'static str, FieldKind)> {
    S::schema().iter().map(|f| (f.name, f.kind)).collect()
}

/// Declared type of a permission field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Bool,
    Int,
    Duration,
    Char,
    Text,
    /// Enumerated state; holds the accepted variant names
    State(&'static [&'static str]),
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Bool => write!(f, "bool"),
            FieldKind::Int => write!(f, "int"),
            FieldKind::Duration => write!(f, "duration"),
            FieldKind::Char => write!(f, "char"),
            FieldKind::Text => write!(f, "text"),
            FieldKind::State(variants) => write!(f, "state[{}]", variants.join("|")),
        }
    }
}

/// A permission value after coercion to its field's declared type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PermissionValue {
    Bool(bool),
    Int(i32),
    Duration(Duration),
    Char(char),
    Text(String),
    State(String),
}

impl fmt::Display for PermissionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionValue::Bool(v) => write!(f, "{}", v),
            PermissionValue::Int(v) => write!(f, "{}", v),
            PermissionValue::Duration(v) => write!(f, "{:?}", v),
            PermissionValue::Char(v) => write!(f, "{:?}", v),
            PermissionValue::Text(v) => write!(f, "{:?}", v),
            PermissionValue::State(v) => write!(f, "{}", v),
        }
    }
}

/// Rust types that can back a permission field
pub trait PermissionType: Sized {
    const KIND: FieldKind;

    fn to_value(&self) -> PermissionValue;

    fn from_value(value: PermissionValue) -> Option<Self>;
}

impl PermissionType for bool {
    const KIND: FieldKind = FieldKind::Bool;

    fn to_value(&self) -> PermissionValue {
        PermissionValue::Bool(*self)
    }

    fn from_value(value: PermissionValue) -> Option<Self> {
        match value {
            PermissionValue::Bool(v) => Some(v),
            _ => None,
        }
    }
}

impl PermissionType for i32 {
    const KIND: FieldKind = FieldKind::Int;

    fn to_value(&self) -> PermissionValue {
        PermissionValue::Int(*self)
    }

    fn from_value(value: PermissionValue) -> Option<Self> {
        match value {
            PermissionValue::Int(v) => Some(v),
            _ => None,
        }
    }
}

impl PermissionType for Duration {
    const KIND: FieldKind = FieldKind::Duration;

    fn to_value(&self) -> PermissionValue {
        PermissionValue::Duration(*self)
    }

    fn from_value(value: PermissionValue) -> Option<Self> {
        match value {
            PermissionValue::Duration(v) => Some(v),
            _ => None,
        }
    }
}

impl PermissionType for char {
    const KIND: FieldKind = FieldKind::Char;

    fn to_value(&self) -> PermissionValue {
        PermissionValue::Char(*self)
    }

    fn from_value(value: PermissionValue) -> Option<Self> {
        match value {
            PermissionValue::Char(v) => Some(v),
            _ => None,
        }
    }
}

impl PermissionType for String {
    const KIND: FieldKind = FieldKind::Text;

    fn to_value(&self) -> PermissionValue {
        PermissionValue::Text(self.clone())
    }

    fn from_value(value: PermissionValue) -> Option<Self> {
        match value {
            PermissionValue::Text(v) => Some(v),
            _ => None,
        }
    }
}

/// One row of a permission set's field table
pub struct PermissionField<S: 'static> {
    pub name: &'static str,
    pub kind: FieldKind,
    pub(crate) get: fn(&S) -> PermissionValue,
    pub(crate) set: fn(&mut S, PermissionValue) -> bool,
}

impl<S> fmt::Debug for PermissionField<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PermissionField")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish()
    }
}

/// Result of writing one permission field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldUpdate {
    pub name: &'static str,
    pub previous: PermissionValue,
    pub current: PermissionValue,
}

impl FieldUpdate {
    pub fn changed(&self) -> bool {
        self.previous != self.current
    }
}

/// A permission set with a static, exhaustive field table
pub trait PermissionSet: Clone + Default + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// All fields of this set, in declaration order
    fn schema() -> &'static [PermissionField<Self>];

    fn field(name: &str) -> Option<&'static PermissionField<Self>> {
        Self::schema().iter().find(|f| f.name == name)
    }

    /// Read a field by its wire name
    fn get(&self, name: &str) -> Option<PermissionValue> {
        Self::field(name).map(|f| (f.get)(self))
    }

    /// Coerce `raw` to the named field's type and store it.
    ///
    /// On error nothing is written.
    fn apply(
        &mut self,
        scope: PermissionScope,
        name: &str,
        raw: &RawValue,
    ) -> PairResult<FieldUpdate> {
        let field = Self::field(name).ok_or_else(|| PairError::UnknownPermission {
            scope,
            name: name.to_string(),
        })?;

        let coercion_error = || PairError::Coercion {
            name: field.name.to_string(),
            expected: field.kind,
            found: raw.to_string(),
        };
        let value = coerce(raw, field.kind).ok_or_else(coercion_error)?;

        let previous = (field.get)(self);
        if !(field.set)(self, value) {
            return Err(coercion_error());
        }

        Ok(FieldUpdate {
            name: field.name,
            previous,
            current: (field.get)(self),
        })
    }
}

/// Declare a permission set struct together with its field table.
///
/// Each field is written `rust_name: Type = default => "WireName"`.
macro_rules! permission_set {
    (
        $(#[$meta:meta])*
        pub struct $name:ident {
            $(
                $(#[$fmeta:meta])*
                $field:ident : $fty:ty = $default:expr => $wire:literal
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, ::serde::Serialize, ::serde::Deserialize)]
        #[serde(default)]
        pub struct $name {
            $(
                $(#[$fmeta])*
                #[serde(rename = $wire)]
                pub $field: $fty,
            )*
        }

        impl Default for $name {
            fn default() -> Self {
                Self {
                    $($field: $default,)*
                }
            }
        }

        impl $crate::permissions::PermissionSet for $name {
            fn schema() -> &'static [$crate::permissions::PermissionField<Self>] {
                const FIELDS: &[$crate::permissions::PermissionField<$name>] = &[
                    $(
                        $crate::permissions::PermissionField {
                            name: $wire,
                            kind: <$fty as $crate::permissions::PermissionType>::KIND,
                            get: |set: &$name| {
                                $crate::permissions::PermissionType::to_value(&set.$field)
                            },
                            set: |set: &mut $name, value: $crate::permissions::PermissionValue| {
                                match <$fty as $crate::permissions::PermissionType>::from_value(value) {
                                    Some(v) => {
                                        set.$field = v;
                                        true
                                    }
                                    None => false,
                                }
                            },
                        },
                    )*
                ];
                FIELDS
            }
        }
    };
}

/// Declare an enumerated permission state usable as a field type.
macro_rules! state_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident { $($variant:ident),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ::serde::Serialize, ::serde::Deserialize)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const VARIANTS: &'static [&'static str] = &[$(stringify!($variant)),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => stringify!($variant)),+
                }
            }

            pub fn from_name(name: &str) -> Option<Self> {
                $(
                    if name == stringify!($variant) {
                        return Some($name::$variant);
                    }
                )+
                None
            }
        }

        impl $crate::permissions::PermissionType for $name {
            const KIND: $crate::permissions::FieldKind =
                $crate::permissions::FieldKind::State($name::VARIANTS);

            fn to_value(&self) -> $crate::permissions::PermissionValue {
                $crate::permissions::PermissionValue::State(self.as_str().to_string())
            }

            fn from_value(value: $crate::permissions::PermissionValue) -> Option<Self> {
                match value {
                    $crate::permissions::PermissionValue::State(name) => $name::from_name(&name),
                    _ => None,
                }
            }
        }
    };
}

pub(crate) use permission_set;
pub(crate) use state_enum;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_from_str() {
        assert_eq!("OtherPair".parse::<PermissionScope>(), Ok(PermissionScope::OtherPair));
        assert_eq!("own_global".parse::<PermissionScope>(), Ok(PermissionScope::OwnGlobal));
        assert_eq!(
            "other-edit-access".parse::<PermissionScope>(),
            Ok(PermissionScope::OtherEditAccess)
        );
        assert!("sideways".parse::<PermissionScope>().is_err());
    }

    #[test]
    fn test_ui_refresh_policy() {
        for scope in PermissionScope::ALL {
            assert_eq!(scope.pushes_ui_refresh(), !scope.is_own(), "{}", scope);
        }
        assert!(!PermissionScope::OwnPair.pushes_ui_refresh());
        assert!(!PermissionScope::OwnEditAccess.pushes_ui_refresh());
        assert!(PermissionScope::OtherGlobal.pushes_ui_refresh());
    }

    #[test]
    fn test_schemas_have_unique_names() {
        for scope in PermissionScope::ALL {
            let schema = scope.schema();
            let mut names: Vec<_> = schema.iter().map(|(n, _)| *n).collect();
            names.sort_unstable();
            names.dedup();
            assert_eq!(names.len(), schema.len(), "duplicate field in {}", scope);
        }
    }

    #[test]
    fn test_apply_unknown_field() {
        let mut perms = PairPermissions::default();
        let before = perms.clone();
        let err = perms
            .apply(PermissionScope::OtherPair, "CanFly", &RawValue::Bool(true))
            .unwrap_err();
        assert!(matches!(err, PairError::UnknownPermission { .. }));
        assert_eq!(perms, before);
    }

    #[test]
    fn test_apply_reports_previous_and_current() {
        let mut perms = PairPermissions::default();
        let update = perms
            .apply(PermissionScope::OwnPair, "IsPaused", &RawValue::Bool(true))
            .unwrap();
        assert_eq!(update.previous, PermissionValue::Bool(false));
        assert_eq!(update.current, PermissionValue::Bool(true));
        assert!(update.changed());
        assert!(perms.is_paused);

        let again = perms
            .apply(PermissionScope::OwnPair, "IsPaused", &RawValue::Bool(true))
            .unwrap();
        assert!(!again.changed());
    }

    #[test]
    fn test_apply_coercion_failure_leaves_field() {
        let mut perms = PairPermissions::default();
        let err = perms
            .apply(
                PermissionScope::OtherPair,
                "StartChar",
                &RawValue::Text("too long".into()),
            )
            .unwrap_err();
        assert!(matches!(err, PairError::Coercion { expected: FieldKind::Char, .. }));
        assert_eq!(perms.start_char, PairPermissions::default().start_char);
    }

    #[test]
    fn test_field_kind_display() {
        assert_eq!(FieldKind::Duration.to_string(), "duration");
        assert_eq!(
            FieldKind::State(ShockMode::VARIANTS).to_string(),
            "state[Off|Beep|Vibrate|Shock]"
        );
    }
}
