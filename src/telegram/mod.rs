mod create_reminder;
mod timezone;

use std::sync::Arc;

use teloxide::dispatching::UpdateHandler;
use teloxide::dispatching::dialogue::{self, InMemStorage};
use teloxide::dptree::{self, case};
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;

use create_reminder::CreateReminderState;

use crate::dateparser::TemporalNormalizer;
use crate::storage::{ReminderStorage, UserStorage};
use crate::timeutil;

type GlobalDialogue = Dialogue<GlobalState, InMemStorage<GlobalState>>;
type HandlerResult = anyhow::Result<()>;

pub type SharedReminderStorage = Arc<dyn ReminderStorage>;
pub type SharedUserStorage = Arc<dyn UserStorage>;
pub type SharedNormalizer = Arc<TemporalNormalizer>;

#[derive(Default, Clone)]
enum GlobalState {
    #[default]
    Idle,
    CreateReminder(CreateReminderState),
    ChangeTimezone,
}

#[derive(BotCommands, Clone)]
#[command(
    rename_rule = "lowercase",
    description = "These commands are supported:"
)]
enum GlobalCommand {
    #[command(description = "start the bot.")]
    Start,
    #[command(description = "show this help message.")]
    Help,
    #[command(description = "create a new reminder.")]
    SetReminder,
    #[command(description = "list your pending reminders.")]
    ListReminders,
    #[command(description = "delete all your reminders.")]
    ClearAll,
    #[command(description = "show or change your timezone.")]
    Timezone,
    #[command(description = "cancel the current operation.")]
    Cancel,
}

pub struct TelegramInteractionInterface;

impl TelegramInteractionInterface {
    pub async fn start(
        bot: Bot,
        reminder_storage: SharedReminderStorage,
        user_storage: SharedUserStorage,
        normalizer: SharedNormalizer,
    ) {
        log::info!("Starting Telegram interaction interface");

        Dispatcher::builder(bot, Self::schema())
            .dependencies(dptree::deps![
                InMemStorage::<GlobalState>::new(),
                reminder_storage,
                user_storage,
                normalizer
            ])
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await
    }

    fn schema() -> UpdateHandler<anyhow::Error> {
        let command_handler = Update::filter_message().branch(
            teloxide::filter_command::<GlobalCommand, _>()
                .branch(case![GlobalCommand::Cancel].endpoint(cancel))
                .branch(case![GlobalCommand::Start].endpoint(start))
                .branch(case![GlobalCommand::Help].endpoint(help))
                .branch(case![GlobalCommand::ListReminders].endpoint(list_reminders))
                .branch(case![GlobalCommand::ClearAll].endpoint(clear_all))
                .branch(
                    case![GlobalState::Idle]
                        .branch(case![GlobalCommand::SetReminder].endpoint(create_reminder::start))
                        .branch(case![GlobalCommand::Timezone].endpoint(timezone::start)),
                ),
        );

        let invalid_state_handler = Update::filter_message().branch(dptree::endpoint(invalid_state));

        dialogue::enter::<Update, InMemStorage<GlobalState>, GlobalState, _>()
            .branch(command_handler)
            .branch(create_reminder::schema())
            .branch(timezone::schema())
            .branch(invalid_state_handler)
    }
}

async fn start(bot: Bot, msg: Message) -> HandlerResult {
    bot.send_message(
        msg.chat.id,
        "Hello! I can remind you about things at a time you describe in plain words.\n\
         Use /setreminder to create one, or /help to see everything I can do.",
    )
    .await?;

    Ok(())
}

async fn help(bot: Bot, msg: Message) -> HandlerResult {
    bot.send_message(msg.chat.id, GlobalCommand::descriptions().to_string())
        .await?;

    Ok(())
}

async fn list_reminders(
    bot: Bot,
    msg: Message,
    reminder_storage: SharedReminderStorage,
    user_storage: SharedUserStorage,
) -> HandlerResult {
    let user_id = msg.chat.id.0;
    let timezone = user_storage.get_timezone(user_id).await?;
    let reminders = reminder_storage.get_all_user_reminders(user_id).await?;

    let pending: Vec<_> = reminders
        .iter()
        .filter(|reminder| !reminder.status.is_terminal())
        .collect();

    if pending.is_empty() {
        bot.send_message(
            msg.chat.id,
            "You have no pending reminders. Use /setreminder to create one!",
        )
        .await?;
        return Ok(());
    }

    let mut lines = vec![format!("Your pending reminders ({}):", timezone.name())];
    for reminder in pending {
        lines.push(format!(
            "• {} — {}",
            timeutil::format_for_user(reminder.fire_at, timezone),
            reminder.text
        ));
    }

    bot.send_message(msg.chat.id, lines.join("\n")).await?;

    Ok(())
}

async fn clear_all(
    bot: Bot,
    msg: Message,
    reminder_storage: SharedReminderStorage,
) -> HandlerResult {
    let deleted = reminder_storage.delete_all_for_user(msg.chat.id.0).await?;
    log::info!(
        "Cleared reminders. [user_id = {}, deleted = {deleted}]",
        msg.chat.id.0
    );

    bot.send_message(msg.chat.id, format!("Deleted {deleted} reminder(s)."))
        .await?;

    Ok(())
}

async fn cancel(bot: Bot, dialogue: GlobalDialogue, msg: Message) -> HandlerResult {
    bot.send_message(msg.chat.id, "Cancelled current operation.")
        .await?;
    dialogue.exit().await?;

    Ok(())
}

async fn invalid_state(bot: Bot, dialogue: GlobalDialogue, msg: Message) -> HandlerResult {
    bot.send_message(msg.chat.id, "Unable to handle the message. Try /help.")
        .await?;
    dialogue.exit().await?;

    Ok(())
}
