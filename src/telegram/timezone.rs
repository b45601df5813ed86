use chrono_tz::Tz;
use teloxide::dispatching::UpdateHandler;
use teloxide::dptree::case;
use teloxide::prelude::*;

use super::{GlobalDialogue, GlobalState, HandlerResult, SharedUserStorage};

pub(super) async fn start(
    bot: Bot,
    dialogue: GlobalDialogue,
    msg: Message,
    user_storage: SharedUserStorage,
) -> HandlerResult {
    let timezone = user_storage.get_timezone(msg.chat.id.0).await?;

    bot.send_message(
        msg.chat.id,
        format!(
            "Your current timezone is {}.\n\
             Send a new IANA zone name (e.g. \"Europe/Berlin\") to change it, or /cancel to keep it.",
            timezone.name()
        ),
    )
    .await?;

    dialogue.update(GlobalState::ChangeTimezone).await?;

    Ok(())
}

async fn receive_timezone(
    bot: Bot,
    dialogue: GlobalDialogue,
    msg: Message,
    user_storage: SharedUserStorage,
) -> HandlerResult {
    let Some(text) = msg.text() else {
        bot.send_message(msg.chat.id, "Please send me the timezone as text.")
            .await?;
        return Ok(());
    };

    match text.trim().parse::<Tz>() {
        Ok(timezone) => {
            user_storage.set_timezone(msg.chat.id.0, timezone).await?;
            log::info!(
                "Changed timezone. [user_id = {}, timezone = {}]",
                msg.chat.id.0,
                timezone.name()
            );

            bot.send_message(
                msg.chat.id,
                format!("Timezone set to {}.", timezone.name()),
            )
            .await?;
            dialogue.exit().await?;
        }
        Err(_) => {
            bot.send_message(
                msg.chat.id,
                "I don't know that timezone. Please send an IANA name like \"Asia/Singapore\".",
            )
            .await?;
        }
    }

    Ok(())
}

pub(super) fn schema() -> UpdateHandler<anyhow::Error> {
    Update::filter_message()
        .branch(case![GlobalState::ChangeTimezone].endpoint(receive_timezone))
}
