//! Runtime settings for the pair registry

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::notifier::DEFAULT_CHANNEL_CAPACITY;

/// Errors loading a [`PairManagerConfig`]
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Settings that shape which notifications the registry publishes
///
/// Missing keys fall back to the defaults, so `{}` is a valid config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PairManagerConfig {
    /// Publish an "is now online" notification when a pair comes online
    pub show_online_notifications: bool,
    /// Only notify for pairs that have a nickname
    pub online_notifications_only_for_named: bool,
    /// Buffer size of the notification broadcast channel
    pub notification_capacity: usize,
}

impl Default for PairManagerConfig {
    fn default() -> Self {
        Self {
            show_online_notifications: true,
            online_notifications_only_for_named: false,
            notification_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl PairManagerConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Whether a pair with the given nickname earns an online notification
    pub fn notifies_online(&self, nickname: Option<&str>) -> bool {
        if !self.show_online_notifications {
            return false;
        }
        if self.online_notifications_only_for_named {
            return nickname.is_some_and(|n| !n.is_empty());
        }
        true
    }
}
