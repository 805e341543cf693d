//! Raw permission values and the coercion rule table
//!
//! The relay serializes some field types lossily: durations travel as an
//! integral tick count (100 ns units) and single characters as one byte.
//! [`coerce`] is the only place that maps a [`RawValue`] onto a declared
//! [`FieldKind`]; anything it does not list is rejected.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{FieldKind, PermissionValue};

/// Ticks per second (one tick is 100 ns)
const TICKS_PER_SECOND: u64 = 10_000_000;

/// Permission value as delivered by the relay, before coercion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RawValue {
    Bool(bool),
    /// A single byte; used for characters
    Byte(u8),
    Int(i64),
    /// An unsigned integer; used for tick-count durations
    UInt(u64),
    Text(String),
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Bool(v) => write!(f, "bool {}", v),
            RawValue::Byte(v) => write!(f, "byte {}", v),
            RawValue::Int(v) => write!(f, "int {}", v),
            RawValue::UInt(v) => write!(f, "uint {}", v),
            RawValue::Text(v) => write!(f, "text {:?}", v),
        }
    }
}

impl From<bool> for RawValue {
    fn from(v: bool) -> Self {
        RawValue::Bool(v)
    }
}

impl From<u8> for RawValue {
    fn from(v: u8) -> Self {
        RawValue::Byte(v)
    }
}

impl From<i64> for RawValue {
    fn from(v: i64) -> Self {
        RawValue::Int(v)
    }
}

impl From<u64> for RawValue {
    fn from(v: u64) -> Self {
        RawValue::UInt(v)
    }
}

impl From<&str> for RawValue {
    fn from(v: &str) -> Self {
        RawValue::Text(v.to_string())
    }
}

/// Convert a tick count into a duration
pub fn duration_from_ticks(ticks: u64) -> Duration {
    Duration::from_secs(ticks / TICKS_PER_SECOND)
        + Duration::from_nanos((ticks % TICKS_PER_SECOND) * 100)
}

/// Convert a duration into a tick count, saturating at `u64::MAX`
pub fn duration_to_ticks(duration: Duration) -> u64 {
    let ticks = duration.as_nanos() / 100;
    u64::try_from(ticks).unwrap_or(u64::MAX)
}

/// Coerce a raw value into the declared kind, or `None` if no rule applies.
///
/// | kind     | accepted raw values                                    |
/// |----------|--------------------------------------------------------|
/// | bool     | bool, `"true"`/`"false"`, integers (non-zero is true)  |
/// | int      | byte, int/uint within `i32`, numeric text              |
/// | duration | uint or non-negative int tick count                    |
/// | char     | byte, single-character text                            |
/// | text     | text                                                   |
/// | state    | variant name (case-insensitive) or variant index       |
pub fn coerce(raw: &RawValue, kind: FieldKind) -> Option<PermissionValue> {
    match (kind, raw) {
        (FieldKind::Bool, RawValue::Bool(v)) => Some(PermissionValue::Bool(*v)),
        (FieldKind::Bool, RawValue::Byte(v)) => Some(PermissionValue::Bool(*v != 0)),
        (FieldKind::Bool, RawValue::Int(v)) => Some(PermissionValue::Bool(*v != 0)),
        (FieldKind::Bool, RawValue::UInt(v)) => Some(PermissionValue::Bool(*v != 0)),
        (FieldKind::Bool, RawValue::Text(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Some(PermissionValue::Bool(true)),
            "false" => Some(PermissionValue::Bool(false)),
            _ => None,
        },

        (FieldKind::Int, RawValue::Byte(v)) => Some(PermissionValue::Int(i32::from(*v))),
        (FieldKind::Int, RawValue::Int(v)) => i32::try_from(*v).ok().map(PermissionValue::Int),
        (FieldKind::Int, RawValue::UInt(v)) => i32::try_from(*v).ok().map(PermissionValue::Int),
        (FieldKind::Int, RawValue::Text(s)) => s.trim().parse().ok().map(PermissionValue::Int),

        (FieldKind::Duration, RawValue::UInt(ticks)) => {
            Some(PermissionValue::Duration(duration_from_ticks(*ticks)))
        }
        (FieldKind::Duration, RawValue::Int(ticks)) => u64::try_from(*ticks)
            .ok()
            .map(|t| PermissionValue::Duration(duration_from_ticks(t))),

        (FieldKind::Char, RawValue::Byte(b)) => Some(PermissionValue::Char(char::from(*b))),
        (FieldKind::Char, RawValue::Text(s)) => {
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Some(PermissionValue::Char(c)),
                _ => None,
            }
        }

        (FieldKind::Text, RawValue::Text(s)) => Some(PermissionValue::Text(s.clone())),

        (FieldKind::State(variants), RawValue::Text(s)) => variants
            .iter()
            .find(|v| v.eq_ignore_ascii_case(s.trim()))
            .map(|v| PermissionValue::State((*v).to_string())),
        (FieldKind::State(variants), index) => {
            let index = match index {
                RawValue::Byte(b) => usize::from(*b),
                RawValue::Int(i) => usize::try_from(*i).ok()?,
                RawValue::UInt(u) => usize::try_from(*u).ok()?,
                _ => return None,
            };
            variants
                .get(index)
                .map(|v| PermissionValue::State((*v).to_string()))
        }

        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODES: &[&str] = &["Off", "Sit", "All"];

    #[test]
    fn test_ticks_to_duration() {
        // 36_000_000_000 ticks is one hour
        assert_eq!(
            coerce(&RawValue::UInt(36_000_000_000), FieldKind::Duration),
            Some(PermissionValue::Duration(Duration::from_secs(3600)))
        );
        assert_eq!(duration_from_ticks(15), Duration::from_nanos(1500));
        assert_eq!(duration_to_ticks(Duration::from_secs(1)), TICKS_PER_SECOND);
    }

    #[test]
    fn test_negative_ticks_rejected() {
        assert_eq!(coerce(&RawValue::Int(-5), FieldKind::Duration), None);
    }

    #[test]
    fn test_byte_to_char() {
        assert_eq!(
            coerce(&RawValue::Byte(b'('), FieldKind::Char),
            Some(PermissionValue::Char('('))
        );
        assert_eq!(
            coerce(&RawValue::Text("]".into()), FieldKind::Char),
            Some(PermissionValue::Char(']'))
        );
        assert_eq!(coerce(&RawValue::Text("".into()), FieldKind::Char), None);
        assert_eq!(coerce(&RawValue::UInt(40), FieldKind::Char), None);
    }

    #[test]
    fn test_bool_rules() {
        assert_eq!(
            coerce(&RawValue::Text(" TRUE ".into()), FieldKind::Bool),
            Some(PermissionValue::Bool(true))
        );
        assert_eq!(
            coerce(&RawValue::Int(0), FieldKind::Bool),
            Some(PermissionValue::Bool(false))
        );
        assert_eq!(coerce(&RawValue::Text("yes".into()), FieldKind::Bool), None);
    }

    #[test]
    fn test_int_range_checked() {
        assert_eq!(
            coerce(&RawValue::Int(-7), FieldKind::Int),
            Some(PermissionValue::Int(-7))
        );
        assert_eq!(coerce(&RawValue::UInt(u64::MAX), FieldKind::Int), None);
        assert_eq!(coerce(&RawValue::Bool(true), FieldKind::Int), None);
    }

    #[test]
    fn test_state_by_name_and_index() {
        assert_eq!(
            coerce(&RawValue::Text("sit".into()), FieldKind::State(MODES)),
            Some(PermissionValue::State("Sit".into()))
        );
        assert_eq!(
            coerce(&RawValue::Byte(2), FieldKind::State(MODES)),
            Some(PermissionValue::State("All".into()))
        );
        assert_eq!(coerce(&RawValue::Int(3), FieldKind::State(MODES)), None);
        assert_eq!(coerce(&RawValue::Bool(true), FieldKind::State(MODES)), None);
    }

    #[test]
    fn test_text_is_strict() {
        assert_eq!(coerce(&RawValue::Int(1), FieldKind::Text), None);
    }

    #[test]
    fn test_raw_value_wire_format() {
        let raw: RawValue = serde_json::from_str(r#"{"UInt":36000000000}"#).unwrap();
        assert_eq!(raw, RawValue::UInt(36_000_000_000));
    }
}
