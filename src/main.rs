mod appsettings;
mod dateparser;
mod delivery;
mod reminder;
mod storage;
mod telegram;
mod timeutil;
mod user;
mod validation;

use std::sync::Arc;

use teloxide::Bot;
use tokio_util::sync::CancellationToken;

use dateparser::{HttpTemporalOracle, TemporalNormalizer};
use delivery::{DeliveryEngine, telegram::TelegramDeliveryChannel};
use storage::{InMemoryReminderStorage, InMemoryUserStorage, ReminderStorage, UserStorage};
use telegram::TelegramInteractionInterface;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    pretty_env_logger::init();

    let settings = appsettings::get();

    let reminder_storage: Arc<dyn ReminderStorage> = Arc::new(InMemoryReminderStorage::new());
    let user_storage: Arc<dyn UserStorage> = Arc::new(InMemoryUserStorage::new());

    let oracle = HttpTemporalOracle::new(settings.oracle.clone())?;
    let normalizer = Arc::new(TemporalNormalizer::new(Arc::new(oracle)));

    let bot = Bot::new(settings.telegram.token.clone());

    let engine = Arc::new(DeliveryEngine::new(
        Arc::clone(&reminder_storage),
        Arc::new(TelegramDeliveryChannel::new(bot.clone())),
        settings.delivery,
    ));

    let cancellation_token = CancellationToken::new();
    let engine_token = cancellation_token.child_token();
    let engine_task = tokio::spawn(async move { engine.run(engine_token).await });

    TelegramInteractionInterface::start(bot, reminder_storage, user_storage, normalizer).await;

    cancellation_token.cancel();
    engine_task.await?;

    Ok(())
}
