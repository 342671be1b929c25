use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::entities::users;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
        }
    }

    /// Unknown role strings degrade to the unprivileged role.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        if s == "admin" { Self::Admin } else { Self::User }
    }
}

/// Watchlist entry: a denormalized copy of the movie's display fields at the
/// time it was added. Title/poster may go stale if the movie changes later.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WatchlistEntry {
    pub movie_id: String,
    pub title: String,
    #[serde(default)]
    pub poster: Option<String>,
    pub added_at: String,
}

/// Watch-history entry, same denormalization as [`WatchlistEntry`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryEntry {
    pub movie_id: String,
    pub title: String,
    #[serde(default)]
    pub poster: Option<String>,
    pub watched_at: String,
}

pub type Preferences = BTreeMap<String, serde_json::Value>;

/// User record without the password hash.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct User {
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub preferences: Preferences,
    pub watchlist: Vec<WatchlistEntry>,
    pub watch_history: Vec<HistoryEntry>,
    pub created_at: String,
    pub updated_at: String,
    pub last_login: Option<String>,
}

impl User {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        let preferences = model
            .preferences
            .as_deref()
            .and_then(|s| serde_json::from_str(s).ok())
            .unwrap_or_default();
        let watchlist = model
            .watchlist
            .as_deref()
            .and_then(|s| serde_json::from_str(s).ok())
            .unwrap_or_default();
        let watch_history = model
            .watch_history
            .as_deref()
            .and_then(|s| serde_json::from_str(s).ok())
            .unwrap_or_default();

        Self {
            id: model.id,
            email: model.email,
            display_name: model.display_name,
            role: Role::parse(&model.role),
            preferences,
            watchlist,
            watch_history,
            created_at: model.created_at,
            updated_at: model.updated_at,
            last_login: model.last_login,
        }
    }
}
