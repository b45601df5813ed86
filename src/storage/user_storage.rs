use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use chrono_tz::Tz;
use tokio::sync::RwLock;

use crate::user::{DEFAULT_TIMEZONE, User, UserId};

#[async_trait]
pub trait UserStorage: Send + Sync {
    /// Falls back to the default zone for users without a stored preference.
    async fn get_timezone(&self, id: UserId) -> anyhow::Result<Tz>;

    async fn set_timezone(&self, id: UserId, timezone: Tz) -> anyhow::Result<()>;
}

pub struct InMemoryUserStorage {
    store: RwLock<HashMap<UserId, User>>,
}

impl InMemoryUserStorage {
    pub fn new() -> Self {
        InMemoryUserStorage {
            store: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryUserStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserStorage for InMemoryUserStorage {
    async fn get_timezone(&self, id: UserId) -> anyhow::Result<Tz> {
        let store = self.store.read().await;
        Ok(store
            .get(&id)
            .map(|user| user.timezone)
            .unwrap_or(DEFAULT_TIMEZONE))
    }

    async fn set_timezone(&self, id: UserId, timezone: Tz) -> anyhow::Result<()> {
        let mut store = self.store.write().await;
        store.insert(
            id,
            User {
                id,
                timezone,
                updated_at: Utc::now(),
            },
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_user_gets_the_default_zone() {
        let storage = InMemoryUserStorage::new();

        assert_eq!(storage.get_timezone(42).await.unwrap(), DEFAULT_TIMEZONE);
    }

    #[tokio::test]
    async fn timezone_preference_is_persisted() {
        let storage = InMemoryUserStorage::new();
        storage
            .set_timezone(42, chrono_tz::Europe::Berlin)
            .await
            .unwrap();

        assert_eq!(
            storage.get_timezone(42).await.unwrap(),
            chrono_tz::Europe::Berlin
        );
    }
}
