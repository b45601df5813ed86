use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use crate::appsettings::DeliverySettings;
use crate::reminder::{ClaimToken, Reminder};
use crate::storage::ReminderStorage;

use super::{DeliveryChannel, SendOutcome};

/// Polling engine that discovers due reminders, claims them through the
/// store's conditional update and drives each claim to `Sent` or `Failed`.
/// Safe to run as several concurrent instances against the same store: the
/// claim is the only mutual exclusion.
pub struct DeliveryEngine {
    storage: Arc<dyn ReminderStorage>,
    channel: Arc<dyn DeliveryChannel>,
    settings: DeliverySettings,
}

impl DeliveryEngine {
    pub fn new(
        storage: Arc<dyn ReminderStorage>,
        channel: Arc<dyn DeliveryChannel>,
        settings: DeliverySettings,
    ) -> Self {
        Self {
            storage,
            channel,
            settings,
        }
    }

    /// Ticks `run_cycle` on the configured cadence until cancelled.
    pub async fn run(&self, cancellation_token: CancellationToken) {
        let mut interval = tokio::time::interval(self.settings.cycle_interval());
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancellation_token.cancelled() => {
                    log::info!("Delivery engine shutting down");
                    break;
                }
                _ = interval.tick() => {
                    self.run_cycle(Utc::now()).await;
                }
            }
        }
    }

    /// One polling cycle. `now` is sampled once by the caller so every
    /// instant comparison inside the cycle sees the same value.
    pub async fn run_cycle(&self, now: DateTime<Utc>) {
        if let Err(error) = self.sweep_stale_claims(now).await {
            log::warn!("Stale claim sweep failed, skipping cycle. [error = {error:#}]");
            return;
        }

        loop {
            let token = ClaimToken::new();
            match self.storage.claim_next_due(now, token).await {
                Ok(Some(reminder)) => self.process_claimed(reminder, token).await,
                Ok(None) => break,
                Err(error) => {
                    log::warn!("Storage unavailable, aborting cycle. [error = {error:#}]");
                    break;
                }
            }
        }
    }

    async fn sweep_stale_claims(&self, now: DateTime<Utc>) -> anyhow::Result<()> {
        let cutoff = now - self.settings.claim_staleness();
        let released = self.storage.release_stale_claims(cutoff).await?;
        if released > 0 {
            log::warn!("Released {released} stale claims left by crashed deliveries");
        }

        Ok(())
    }

    async fn process_claimed(&self, reminder: Reminder, token: ClaimToken) {
        let outcome = self.attempt_send(&reminder).await;
        if let Err(error) = self.finalize(&reminder, token, outcome).await {
            // The claim stays in place; the staleness sweep recovers it.
            log::error!(
                "Could not finalize delivery attempt. [reminder_id = {}, error = {error:#}]",
                reminder.id
            );
        }
    }

    async fn attempt_send(&self, reminder: &Reminder) -> SendOutcome {
        let send = self.channel.send_reminder(reminder);
        match tokio::time::timeout(self.settings.send_timeout(), send).await {
            Ok(outcome) => outcome,
            Err(_) => SendOutcome::Transient(anyhow::anyhow!("delivery attempt timed out")),
        }
    }

    async fn finalize(
        &self,
        reminder: &Reminder,
        token: ClaimToken,
        outcome: SendOutcome,
    ) -> anyhow::Result<()> {
        match outcome {
            SendOutcome::Delivered => {
                if self.storage.finalize_sent(reminder.id, token).await? {
                    log::info!(
                        "Delivered reminder. [reminder_id = {}, user_id = {}]",
                        reminder.id,
                        reminder.user_id
                    );
                } else {
                    // The claim went stale and was re-claimed elsewhere; the
                    // record is not ours to touch anymore.
                    log::warn!(
                        "Claim token no longer matches after delivery. [reminder_id = {}]",
                        reminder.id
                    );
                }
            }
            SendOutcome::Transient(error) => {
                if reminder.attempt_count >= self.settings.max_attempts {
                    self.storage.mark_failed(reminder.id, token).await?;
                    log::error!(
                        "Giving up after {} attempts. [reminder_id = {}, error = {error:#}]",
                        reminder.attempt_count,
                        reminder.id
                    );
                } else {
                    self.storage.release_claim(reminder.id, token).await?;
                    log::warn!(
                        "Delivery failed, will retry. [reminder_id = {}, attempt = {}, error = {error:#}]",
                        reminder.id,
                        reminder.attempt_count
                    );
                }
            }
            SendOutcome::Permanent(error) => {
                self.storage.mark_failed(reminder.id, token).await?;
                log::error!(
                    "Recipient unreachable, not retrying. [reminder_id = {}, error = {error:#}]",
                    reminder.id
                );
            }
        }

        Ok(())
    }
}
