//! User Data Structure
//!
//! The account subsystem owns users; the engine only reads identity, role
//! and activity, and writes the activity fields.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Window within which a user counts as recently online
pub const RECENT_ACTIVITY_WINDOW_SECS: i64 = 5 * 60;

/// Coarse permission class of a user
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    #[default]
    Regular,
    Admin,
}

impl UserRole {
    /// Convert to string for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Regular => "regular",
            UserRole::Admin => "admin",
        }
    }

    /// Parse from string (database, token claims); unknown roles are regular
    pub fn parse(s: &str) -> Self {
        match s {
            "admin" => UserRole::Admin,
            _ => UserRole::Regular,
        }
    }
}

/// A user as seen by the messaging engine
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserRecord {
    pub id: Uuid,
    pub username: String,
    pub role: UserRole,
    pub is_active: bool,
    pub last_active_at: Option<DateTime<Utc>>,
}

impl UserRecord {
    /// Create an active regular user with no recorded activity
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            role: UserRole::Regular,
            is_active: true,
            last_active_at: None,
        }
    }

    /// Whether the user was active within the last five minutes
    pub fn recently_active(&self, now: DateTime<Utc>) -> bool {
        self.last_active_at
            .map(|at| now - at < Duration::seconds(RECENT_ACTIVITY_WINDOW_SECS))
            .unwrap_or(false)
    }

    /// Display form embedded in message read-backs
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            username: self.username.clone(),
        }
    }
}

/// Sender identity resolved to a display form
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recently_active() {
        let now = Utc::now();
        let mut user = UserRecord::new("ada");
        assert!(!user.recently_active(now));

        user.last_active_at = Some(now - Duration::minutes(4));
        assert!(user.recently_active(now));

        user.last_active_at = Some(now - Duration::minutes(6));
        assert!(!user.recently_active(now));
    }

    #[test]
    fn test_role_parse() {
        assert_eq!(UserRole::parse("admin"), UserRole::Admin);
        assert_eq!(UserRole::parse("regular"), UserRole::Regular);
        assert_eq!(UserRole::parse("superuser"), UserRole::Regular);
        assert_eq!(UserRole::Admin.as_str(), "admin");
    }
}
