use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::reminder::{ClaimToken, Reminder, ReminderId, ReminderStatus};
use crate::user::UserId;

use super::NewReminder;

/// Persistence seam for reminder records. Each status mutation is a single
/// conditional update: the check and the write happen inside one atomic
/// store operation, which is the only mutual exclusion the delivery engine
/// relies on when several instances poll the same store.
#[async_trait]
pub trait ReminderStorage: Send + Sync {
    async fn insert(&self, reminder: NewReminder) -> anyhow::Result<Reminder>;

    async fn get(&self, id: ReminderId) -> anyhow::Result<Option<Reminder>>;

    /// Atomically picks one record with `status = Pending` and
    /// `fire_at <= now`, marks it claimed with `token` and increments its
    /// attempt count. Returns the claimed snapshot.
    async fn claim_next_due(
        &self,
        now: DateTime<Utc>,
        token: ClaimToken,
    ) -> anyhow::Result<Option<Reminder>>;

    /// `Claimed(token) -> Sent`. False when the claim no longer matches.
    async fn finalize_sent(&self, id: ReminderId, token: ClaimToken) -> anyhow::Result<bool>;

    /// `Claimed(token) -> Pending`, clearing the claim marker.
    async fn release_claim(&self, id: ReminderId, token: ClaimToken) -> anyhow::Result<bool>;

    /// `Claimed(token) -> Failed` (terminal).
    async fn mark_failed(&self, id: ReminderId, token: ClaimToken) -> anyhow::Result<bool>;

    /// Reverts claims taken before `cutoff` back to `Pending`; recovery for
    /// processes that died mid-delivery.
    async fn release_stale_claims(&self, cutoff: DateTime<Utc>) -> anyhow::Result<usize>;

    async fn get_all_user_reminders(&self, user_id: UserId) -> anyhow::Result<Vec<Reminder>>;

    async fn delete_all_for_user(&self, user_id: UserId) -> anyhow::Result<usize>;
}

pub struct InMemoryReminderStorage {
    store: RwLock<(ReminderId, HashMap<ReminderId, Reminder>)>,
}

impl InMemoryReminderStorage {
    pub fn new() -> Self {
        InMemoryReminderStorage {
            store: RwLock::new((0, HashMap::new())),
        }
    }
}

impl Default for InMemoryReminderStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReminderStorage for InMemoryReminderStorage {
    async fn insert(&self, reminder: NewReminder) -> anyhow::Result<Reminder> {
        let mut store = self.store.write().await;
        let id = store.0;
        let record = Reminder {
            id,
            user_id: reminder.user_id,
            text: reminder.text,
            fire_at: reminder.fire_at,
            status: ReminderStatus::Pending,
            attempt_count: 0,
            created_at: Utc::now(),
        };

        store.1.insert(id, record.clone());
        store.0 += 1;

        Ok(record)
    }

    async fn get(&self, id: ReminderId) -> anyhow::Result<Option<Reminder>> {
        let store = self.store.read().await;
        Ok(store.1.get(&id).cloned())
    }

    async fn claim_next_due(
        &self,
        now: DateTime<Utc>,
        token: ClaimToken,
    ) -> anyhow::Result<Option<Reminder>> {
        let mut store = self.store.write().await;
        let due = store
            .1
            .values_mut()
            .find(|r| matches!(r.status, ReminderStatus::Pending) && r.fire_at <= now);

        Ok(due.map(|reminder| {
            reminder.status = ReminderStatus::Claimed {
                token,
                claimed_at: now,
            };
            reminder.attempt_count += 1;
            reminder.clone()
        }))
    }

    async fn finalize_sent(&self, id: ReminderId, token: ClaimToken) -> anyhow::Result<bool> {
        let mut store = self.store.write().await;
        Ok(conditional_transition(
            store.1.get_mut(&id),
            token,
            ReminderStatus::Sent,
        ))
    }

    async fn release_claim(&self, id: ReminderId, token: ClaimToken) -> anyhow::Result<bool> {
        let mut store = self.store.write().await;
        Ok(conditional_transition(
            store.1.get_mut(&id),
            token,
            ReminderStatus::Pending,
        ))
    }

    async fn mark_failed(&self, id: ReminderId, token: ClaimToken) -> anyhow::Result<bool> {
        let mut store = self.store.write().await;
        Ok(conditional_transition(
            store.1.get_mut(&id),
            token,
            ReminderStatus::Failed,
        ))
    }

    async fn release_stale_claims(&self, cutoff: DateTime<Utc>) -> anyhow::Result<usize> {
        let mut store = self.store.write().await;
        let mut released = 0;
        for reminder in store.1.values_mut() {
            if let ReminderStatus::Claimed { claimed_at, .. } = reminder.status {
                if claimed_at < cutoff {
                    reminder.status = ReminderStatus::Pending;
                    released += 1;
                }
            }
        }

        Ok(released)
    }

    async fn get_all_user_reminders(&self, user_id: UserId) -> anyhow::Result<Vec<Reminder>> {
        let store = self.store.read().await;
        let mut reminders: Vec<_> = store
            .1
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        reminders.sort_by_key(|r| r.fire_at);

        Ok(reminders)
    }

    async fn delete_all_for_user(&self, user_id: UserId) -> anyhow::Result<usize> {
        let mut store = self.store.write().await;
        let before = store.1.len();
        store.1.retain(|_, r| r.user_id != user_id);

        Ok(before - store.1.len())
    }
}

fn conditional_transition(
    reminder: Option<&mut Reminder>,
    expected_token: ClaimToken,
    next: ReminderStatus,
) -> bool {
    let Some(reminder) = reminder else {
        return false;
    };

    match reminder.status {
        ReminderStatus::Claimed { token, .. } if token == expected_token => {
            reminder.status = next;
            true
        }
        _ => false,
    }
}
