use chrono::{DateTime, Utc};
use chrono_tz::Tz;

pub type UserId = i64;

/// Zone used for users who never configured one.
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Asia::Singapore;

#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub timezone: Tz,
    pub updated_at: DateTime<Utc>,
}
