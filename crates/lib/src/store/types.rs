//! Records kept by the user link store.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::tracker::{Credential, TrackerProfile};

/// A single named preference value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Text(String),
}

/// Per-link preferences.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSettings {
    /// Whether the host user receives notifications for tracker activity.
    #[serde(default = "default_notifications")]
    pub notifications: bool,
    /// Any further named preferences.
    #[serde(default, flatten)]
    pub extra: BTreeMap<String, SettingValue>,
}

fn default_notifications() -> bool {
    true
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            notifications: default_notifications(),
            extra: BTreeMap::new(),
        }
    }
}

/// The tracker identity linked to one host user on one instance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerUser {
    pub profile: TrackerProfile,
    pub credential: Credential,
    #[serde(default)]
    pub settings: UserSettings,
    /// RFC 3339 timestamp of when the link was (re)established.
    #[serde(default)]
    pub connected_at: String,
}

impl TrackerUser {
    /// The username used for the reverse index.
    pub fn username(&self) -> &str {
        self.profile.username()
    }

    pub fn display_name(&self) -> &str {
        &self.profile.display_name
    }
}
