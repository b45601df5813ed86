use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::{ApiError, RequestError};

use crate::reminder::Reminder;

use super::{DeliveryChannel, SendOutcome};

pub struct TelegramDeliveryChannel {
    bot: Bot,
}

impl TelegramDeliveryChannel {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl DeliveryChannel for TelegramDeliveryChannel {
    async fn send_reminder(&self, reminder: &Reminder) -> SendOutcome {
        let text = format!("🔔 Reminder: {}", reminder.text);
        match self
            .bot
            .send_message(ChatId(reminder.user_id), text)
            .await
        {
            Ok(_) => SendOutcome::Delivered,
            Err(error) => classify_error(error),
        }
    }
}

/// Telegram errors that mean the recipient can never be reached again are
/// terminal; everything else gets another cycle.
fn classify_error(error: RequestError) -> SendOutcome {
    let permanent = matches!(
        &error,
        RequestError::Api(
            ApiError::BotBlocked
                | ApiError::ChatNotFound
                | ApiError::UserNotFound
                | ApiError::UserDeactivated
                | ApiError::CantInitiateConversation
                | ApiError::CantTalkWithBots
        )
    );

    if permanent {
        SendOutcome::Permanent(error.into())
    } else {
        SendOutcome::Transient(error.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreachable_recipients_are_permanent() {
        let outcome = classify_error(RequestError::Api(ApiError::BotBlocked));

        assert!(matches!(outcome, SendOutcome::Permanent(_)));
    }

    #[test]
    fn other_api_errors_are_transient() {
        let outcome = classify_error(RequestError::Api(ApiError::MessageTextIsEmpty));

        assert!(matches!(outcome, SendOutcome::Transient(_)));
    }
}
