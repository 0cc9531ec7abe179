use crate::database::models::PostStatus;
use thiserror::Error;

/// Error taxonomy for the bot core.
///
/// Every variant maps to a user-facing message; none of them should ever
/// crash a flow. Unexpected programming errors stay outside this enum.
#[derive(Debug, Error)]
pub enum BotError {
    /// Bad user input (datetime text, button lines, empty post). The message
    /// is already user-facing.
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("permission denied for user {0}")]
    Permission(i64),

    /// Transport failure during publish or edit.
    #[error("delivery failed: {0}")]
    Publish(#[from] teloxide::RequestError),

    #[error("invalid status transition {from} -> {to}")]
    InvalidTransition { from: PostStatus, to: PostStatus },

    #[error("scheduler error: {0}")]
    Scheduler(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl BotError {
    /// Message shown to the user in the chat.
    pub fn user_message(&self) -> String {
        match self {
            BotError::Validation(msg) => msg.clone(),
            BotError::NotFound(what) => format!("❌ {what} не найден."),
            BotError::Permission(_) => "⛔ У вас нет доступа к этой функции.".to_string(),
            BotError::Publish(_) => "❌ Ошибка при публикации. Попробуйте позже.".to_string(),
            BotError::InvalidTransition { .. } => {
                "⚠️ Действие недоступно для текущего статуса поста.".to_string()
            }
            BotError::Scheduler(_) => "❌ Ошибка планировщика. Попробуйте позже.".to_string(),
            BotError::Database(_) => "❌ Произошла ошибка. Попробуйте позже.".to_string(),
        }
    }
}
