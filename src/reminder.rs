use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::user::UserId;

pub type ReminderId = i64;

/// Exclusive marker tying an in-flight delivery attempt to the engine
/// instance that claimed the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClaimToken(Uuid);

impl ClaimToken {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClaimToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ClaimToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Delivery lifecycle of a reminder. The claim marker only exists while the
/// record is claimed; `Sent` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderStatus {
    Pending,
    Claimed {
        token: ClaimToken,
        claimed_at: DateTime<Utc>,
    },
    Sent,
    Failed,
}

impl ReminderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ReminderStatus::Sent | ReminderStatus::Failed)
    }
}

#[derive(Debug, Clone)]
pub struct Reminder {
    pub id: ReminderId,
    pub user_id: UserId,
    pub text: String,
    /// Absolute instant at which delivery becomes eligible. Never mutated
    /// after creation.
    pub fire_at: DateTime<Utc>,
    pub status: ReminderStatus,
    pub attempt_count: u32,
    pub created_at: DateTime<Utc>,
}
