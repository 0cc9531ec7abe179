/// Bot command definitions and command implementations
pub mod commands;
/// Update handler tree: admin gate, commands, wizard FSM, callbacks
pub mod handlers;
/// Inline keyboard builders for the bot UI
pub mod keyboards;
/// In-memory accumulator for the composition wizard
pub mod wizard_draft;
