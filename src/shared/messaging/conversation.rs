//! Conversation Data Structure
//!
//! Represents a conversation between two or more users.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::error::SharedError;

/// Smallest participant set a conversation may have
pub const MIN_PARTICIPANTS: usize = 2;

/// Represents a conversation between users
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Conversation {
    /// Unique conversation ID
    pub id: Uuid,
    /// Participant user IDs, deduplicated, immutable after creation
    pub participants: Vec<Uuid>,
    /// Most recent message; a convenience cache, not an ordering source
    pub last_message_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Create a new conversation from an already-validated participant set
    pub fn new(participants: Vec<Uuid>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            participants,
            last_message_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check if user is a participant
    pub fn has_participant(&self, user_id: Uuid) -> bool {
        self.participants.contains(&user_id)
    }

    /// Participants other than `user_id`
    pub fn others(&self, user_id: Uuid) -> impl Iterator<Item = Uuid> + '_ {
        self.participants.iter().copied().filter(move |id| *id != user_id)
    }

    /// Whether this is the two-party conversation between `a` and `b`
    pub fn is_direct_between(&self, a: Uuid, b: Uuid) -> bool {
        self.participants.len() == 2 && self.has_participant(a) && self.has_participant(b)
    }
}

/// Build the participant set for a new conversation: the creator first,
/// then the requested ids in order, without duplicates.
pub fn participant_set(creator: Uuid, requested: &[Uuid]) -> Result<Vec<Uuid>, SharedError> {
    if requested.is_empty() {
        return Err(SharedError::validation(
            "participant_ids",
            "At least one participant required",
        ));
    }

    let mut participants = vec![creator];
    for id in requested {
        if !participants.contains(id) {
            participants.push(*id);
        }
    }

    if participants.len() < MIN_PARTICIPANTS {
        return Err(SharedError::validation(
            "participant_ids",
            "A conversation needs at least one other participant",
        ));
    }

    Ok(participants)
}
