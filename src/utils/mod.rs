/// Button line parsing and URL validation
pub mod buttons;
/// Schedule input parsing and datetime formatting
pub mod datetime;
/// Error taxonomy for the bot core
pub mod errors;
/// Uniform reply helpers for command outcomes
pub mod feedback;
/// HTML escaping and text previews for Telegram messages
pub mod html;
