mod engine;
pub mod telegram;

pub use engine::DeliveryEngine;

use async_trait::async_trait;

use crate::reminder::Reminder;

/// Outcome of one delivery attempt, as reported by the outbound channel.
#[derive(Debug)]
pub enum SendOutcome {
    Delivered,
    /// Worth retrying on a later cycle.
    Transient(anyhow::Error),
    /// The recipient cannot be reached; retrying will not help.
    Permanent(anyhow::Error),
}

#[async_trait]
pub trait DeliveryChannel: Send + Sync {
    async fn send_reminder(&self, reminder: &Reminder) -> SendOutcome;
}
