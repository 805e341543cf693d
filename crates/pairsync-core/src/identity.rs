//! Peer identity keys
//!
//! An [`Identity`] is the key every other part of the core uses to address a
//! paired peer. The relay hands us a user id (`uid`) and, optionally, a
//! vanity alias. Only the uid takes part in equality, and it is compared in
//! canonical form (surrounding whitespace trimmed, ASCII case folded), so
//! `"Abc12"`, `" abc12 "` and `"ABC12"` all address the same pair no matter
//! which alias came attached.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Canonical, comparable key for a remote peer
///
/// # Example
///
/// ```rust
/// use pairsync_core::Identity;
///
/// let a = Identity::new("Peer1").with_alias("Kitten");
/// let b = Identity::new(" PEER1 ");
///
/// assert_eq!(a, b);
/// assert_eq!(a.alias_or_uid(), "Kitten");
/// assert_eq!(b.alias_or_uid(), "PEER1");
/// ```
#[derive(Clone, Serialize, Deserialize)]
#[serde(from = "IdentityRepr", into = "IdentityRepr")]
pub struct Identity {
    uid: String,
    alias: Option<String>,
    key: String,
}

impl Identity {
    /// Create an identity from a relay user id
    pub fn new(uid: impl Into<String>) -> Self {
        let uid = uid.into().trim().to_string();
        let key = canonicalize(&uid);
        Self {
            uid,
            alias: None,
            key,
        }
    }

    /// Attach a display alias (ignored by equality)
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        let alias = alias.into();
        self.alias = if alias.trim().is_empty() {
            None
        } else {
            Some(alias)
        };
        self
    }

    /// The user id as received from the relay
    pub fn uid(&self) -> &str {
        &self.uid
    }

    /// The display alias, if any
    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// Alias when set, otherwise the uid
    pub fn alias_or_uid(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.uid)
    }

    /// The canonical key used for equality and hashing
    pub fn canonical(&self) -> &str {
        &self.key
    }

    /// Check whether a raw uid string addresses this identity
    pub fn matches_uid(&self, uid: &str) -> bool {
        canonicalize(uid) == self.key
    }
}

fn canonicalize(uid: &str) -> String {
    uid.trim().to_ascii_lowercase()
}

impl PartialEq for Identity {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Identity {}

impl Hash for Identity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.uid)
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.alias {
            Some(alias) => write!(f, "Identity({} aka {})", self.uid, alias),
            None => write!(f, "Identity({})", self.uid),
        }
    }
}

impl From<&str> for Identity {
    fn from(uid: &str) -> Self {
        Identity::new(uid)
    }
}

impl From<String> for Identity {
    fn from(uid: String) -> Self {
        Identity::new(uid)
    }
}

/// Wire form: either a bare uid string or `{ "uid": .., "alias": .. }`
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum IdentityRepr {
    Uid(String),
    Full {
        uid: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        alias: Option<String>,
    },
}

impl From<IdentityRepr> for Identity {
    fn from(repr: IdentityRepr) -> Self {
        match repr {
            IdentityRepr::Uid(uid) => Identity::new(uid),
            IdentityRepr::Full { uid, alias } => {
                let identity = Identity::new(uid);
                match alias {
                    Some(alias) => identity.with_alias(alias),
                    None => identity,
                }
            }
        }
    }
}

impl From<Identity> for IdentityRepr {
    fn from(identity: Identity) -> Self {
        match identity.alias {
            Some(alias) => IdentityRepr::Full {
                uid: identity.uid,
                alias: Some(alias),
            },
            None => IdentityRepr::Uid(identity.uid),
        }
    }
}
