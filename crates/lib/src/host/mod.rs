//! The host collaboration platform, seen from this service.
//!
//! The host platform authenticates its users and injects the caller's id
//! into every request as a trusted header. This module describes the few
//! calls made back into the host through [`HostApi`], and provides
//! [`StaticHost`], a directory loaded from configuration.

mod errors;

use std::collections::{HashMap, HashSet};
#[cfg(any(test, feature = "testing"))]
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use errors::HostError;

use crate::Result;

/// Permissions checked against the host platform.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    /// System administration.
    ManageSystem,
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Permission::ManageSystem => f.write_str("manage_system"),
        }
    }
}

/// A host platform user.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostUser {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub nickname: String,
}

impl HostUser {
    /// Nickname, else full name, else username.
    pub fn display_name(&self) -> String {
        if !self.nickname.is_empty() {
            return self.nickname.clone();
        }
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim();
        if !full.is_empty() {
            return full.to_string();
        }
        self.username.clone()
    }
}

/// Events published to the host when a user's link changes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HostEvent {
    Connected {
        instance: String,
        tracker_username: String,
        tracker_display_name: String,
    },
    Disconnected {
        instance: String,
    },
}

/// Calls this service makes into the host platform.
#[async_trait]
pub trait HostApi: Send + Sync + std::fmt::Debug {
    /// Looks up a user by id.
    async fn get_user(&self, user_id: &str) -> Result<HostUser>;

    /// Whether the user holds `permission`.
    async fn has_permission(&self, user_id: &str, permission: Permission) -> bool;

    /// Notifies the user's clients that their link changed.
    async fn publish_event(&self, user_id: &str, event: HostEvent) -> Result<()>;
}

/// Users and administrators of a [`StaticHost`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostConfig {
    #[serde(default)]
    pub users: Vec<HostUser>,
    /// Ids of users holding [`Permission::ManageSystem`].
    #[serde(default)]
    pub admins: Vec<String>,
}

/// A host directory defined by configuration.
///
/// Published events are logged. Test builds also keep them for inspection
/// through [`StaticHost::events`].
#[derive(Debug, Default)]
pub struct StaticHost {
    users: HashMap<String, HostUser>,
    admins: HashSet<String>,
    #[cfg(any(test, feature = "testing"))]
    events: Mutex<Vec<(String, HostEvent)>>,
}

impl StaticHost {
    pub fn new(config: HostConfig) -> Self {
        Self {
            users: config
                .users
                .into_iter()
                .map(|user| (user.id.clone(), user))
                .collect(),
            admins: config.admins.into_iter().collect(),
            #[cfg(any(test, feature = "testing"))]
            events: Mutex::new(Vec::new()),
        }
    }

    /// Events published so far, oldest first.
    #[cfg(any(test, feature = "testing"))]
    pub fn events(&self) -> Vec<(String, HostEvent)> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl HostApi for StaticHost {
    async fn get_user(&self, user_id: &str) -> Result<HostUser> {
        self.users.get(user_id).cloned().ok_or_else(|| {
            HostError::UserNotFound {
                user_id: user_id.to_string(),
            }
            .into()
        })
    }

    async fn has_permission(&self, user_id: &str, permission: Permission) -> bool {
        match permission {
            Permission::ManageSystem => self.admins.contains(user_id),
        }
    }

    async fn publish_event(&self, user_id: &str, event: HostEvent) -> Result<()> {
        tracing::info!(user_id, ?event, "Published host event");
        #[cfg(any(test, feature = "testing"))]
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((user_id.to_string(), event));
        Ok(())
    }
}
