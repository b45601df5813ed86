use chrono::{DateTime, Utc};

use crate::user::UserId;

pub struct NewReminder {
    pub user_id: UserId,
    pub text: String,
    pub fire_at: DateTime<Utc>,
}
