pub mod callback;
pub mod message;
pub mod wizard;

pub use wizard::{WizardDialogue, WizardState};

use crate::bot::commands::{edit, Command};
use crate::config::Config;
use std::sync::Arc;
use teloxide::dispatching::dialogue::{self, InMemStorage};
use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::UpdateKind;

pub type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

pub struct BotHandler;

impl BotHandler {
    /// The full update handler tree: the admin allow-list gate first, then
    /// commands, then the wizard FSM states, then callback queries.
    pub fn schema() -> UpdateHandler<Box<dyn std::error::Error + Send + Sync + 'static>> {
        let message_handler = Update::filter_message()
            .branch(teloxide::filter_command::<Command, _>().endpoint(message::command_handler))
            .branch(dptree::case![WizardState::AwaitingContent].endpoint(wizard::receive_content))
            .branch(
                dptree::case![WizardState::AwaitingMoreMedia { draft }]
                    .endpoint(wizard::receive_more_media),
            )
            .branch(
                dptree::case![WizardState::AwaitingButtons { draft }]
                    .endpoint(wizard::receive_buttons),
            )
            .branch(
                dptree::case![WizardState::AwaitingSchedule { draft }]
                    .endpoint(wizard::receive_schedule),
            )
            .branch(
                dptree::case![WizardState::SchedulingPost { post_id }]
                    .endpoint(wizard::receive_schedule_for_post),
            )
            .branch(
                dptree::case![WizardState::EditingText { post_id }]
                    .endpoint(edit::receive_new_text),
            )
            .branch(
                dptree::case![WizardState::EditingButtons { post_id }]
                    .endpoint(edit::receive_new_buttons),
            )
            // Anything else outside a flow is silently ignored
            .endpoint(message::ignore_message);

        let callback_handler =
            Update::filter_callback_query().endpoint(callback::callback_handler);

        dialogue::enter::<Update, InMemStorage<WizardState>, WizardState, _>()
            .branch(
                dptree::filter(|update: Update, config: Arc<Config>| {
                    match update.user() {
                        Some(user) => !config.is_admin(user.id.0 as i64),
                        None => true,
                    }
                })
                .endpoint(reject_non_admin),
            )
            .branch(message_handler)
            .branch(callback_handler)
    }
}

/// Boundary filter: non-admin updates never reach the core.
async fn reject_non_admin(bot: Bot, update: Update) -> HandlerResult {
    if let Some(user) = update.user() {
        tracing::warn!(
            "Unauthorized access attempt by user {} ({:?})",
            user.id.0,
            user.username
        );
    }
    match &update.kind {
        UpdateKind::Message(msg) => {
            bot.send_message(
                msg.chat.id,
                "⛔ У вас нет доступа к этому боту.\nОбратитесь к администратору.",
            )
            .await?;
        }
        UpdateKind::CallbackQuery(q) => {
            bot.answer_callback_query(q.id.clone())
                .text("⛔ У вас нет доступа")
                .show_alert(true)
                .await?;
        }
        _ => {}
    }
    Ok(())
}
