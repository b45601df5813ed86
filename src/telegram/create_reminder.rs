use chrono::Utc;
use teloxide::dispatching::UpdateHandler;
use teloxide::dptree::case;
use teloxide::prelude::*;
use teloxide::types::ChatAction;

use crate::dateparser::Unparseable;
use crate::storage::NewReminder;
use crate::timeutil;
use crate::validation;

use super::{
    GlobalDialogue, GlobalState, HandlerResult, SharedNormalizer, SharedReminderStorage,
    SharedUserStorage,
};

#[derive(Clone, Default)]
pub(super) enum CreateReminderState {
    #[default]
    Start,
    ReceiveText,
    ReceiveFireDate {
        text: String,
    },
}

pub(super) async fn start(bot: Bot, dialogue: GlobalDialogue, msg: Message) -> HandlerResult {
    bot.send_message(
        msg.chat.id,
        "What would you like to be reminded of? Use /cancel to stop.",
    )
    .await?;

    dialogue
        .update(GlobalState::CreateReminder(CreateReminderState::ReceiveText))
        .await?;

    Ok(())
}

async fn receive_text(bot: Bot, dialogue: GlobalDialogue, msg: Message) -> HandlerResult {
    let Some(text) = msg.text() else {
        bot.send_message(msg.chat.id, "Please send me the reminder text.")
            .await?;
        return Ok(());
    };

    match validation::validate_reminder_text(text) {
        Ok(text) => {
            bot.send_message(
                msg.chat.id,
                "When should I remind you? (e.g. \"tomorrow at 7pm\" or \"in two hours\")",
            )
            .await?;
            dialogue
                .update(GlobalState::CreateReminder(
                    CreateReminderState::ReceiveFireDate { text },
                ))
                .await?;
        }
        Err(error) => {
            bot.send_message(msg.chat.id, format!("{error}. Please try again."))
                .await?;
        }
    }

    Ok(())
}

async fn receive_fire_date(
    bot: Bot,
    dialogue: GlobalDialogue,
    text: String,
    msg: Message,
    normalizer: SharedNormalizer,
    reminder_storage: SharedReminderStorage,
    user_storage: SharedUserStorage,
) -> HandlerResult {
    let Some(raw_phrase) = msg.text() else {
        bot.send_message(msg.chat.id, "Please send me the date as text.")
            .await?;
        return Ok(());
    };

    let phrase = match validation::validate_date_input(raw_phrase) {
        Ok(phrase) => phrase,
        Err(error) => {
            bot.send_message(msg.chat.id, format!("{error}. Please try again."))
                .await?;
            return Ok(());
        }
    };

    let user_id = msg.chat.id.0;
    let timezone = user_storage.get_timezone(user_id).await?;

    bot.send_chat_action(msg.chat.id, ChatAction::Typing).await?;

    let fire_at = match normalizer.normalize(&phrase, Utc::now(), timezone).await {
        Ok(instant) => instant,
        Err(Unparseable::NoTemporalMeaning) => {
            bot.send_message(
                msg.chat.id,
                "I couldn't understand that as a future date. Please try again.",
            )
            .await?;
            return Ok(());
        }
        Err(Unparseable::OracleUnavailable) => {
            bot.send_message(
                msg.chat.id,
                "I can't parse dates right now. Please try again in a moment.",
            )
            .await?;
            return Ok(());
        }
    };

    let reminder = reminder_storage
        .insert(NewReminder {
            user_id,
            text,
            fire_at,
        })
        .await?;

    bot.send_message(
        msg.chat.id,
        format!(
            "Got it! Reminder set for {}.",
            timeutil::format_for_user(reminder.fire_at, timezone)
        ),
    )
    .await?;
    log::info!(
        "Created reminder. [reminder_id = {}, user_id = {user_id}]",
        reminder.id
    );

    dialogue.exit().await?;

    Ok(())
}

pub(super) fn schema() -> UpdateHandler<anyhow::Error> {
    Update::filter_message().branch(
        case![GlobalState::CreateReminder(x)]
            .branch(case![CreateReminderState::ReceiveText].endpoint(receive_text))
            .branch(case![CreateReminderState::ReceiveFireDate { text }].endpoint(receive_fire_date)),
    )
}
