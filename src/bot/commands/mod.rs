pub mod edit;
pub mod info;
pub mod posts;

use teloxide::utils::command::BotCommands;

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Команды бота:")]
pub enum Command {
    #[command(description = "начать работу с ботом")]
    Start,
    #[command(description = "справка")]
    Help,
    #[command(description = "создать новый пост")]
    New,
    #[command(description = "отменить текущее действие")]
    Cancel,
    #[command(description = "все мои посты")]
    Posts,
    #[command(description = "черновики")]
    Drafts,
    #[command(description = "запланированные посты")]
    Scheduled,
    #[command(description = "посты всех пользователей (админ)")]
    AllPosts,
    #[command(description = "редактировать пост")]
    Edit { id: i64 },
    #[command(description = "информация о вас")]
    Whoami,
    #[command(description = "информация о канале")]
    ChannelInfo,
}
