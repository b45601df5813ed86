mod model;
mod reminder_storage;
mod user_storage;

pub use model::NewReminder;
pub use reminder_storage::{InMemoryReminderStorage, ReminderStorage};
pub use user_storage::{InMemoryUserStorage, UserStorage};
