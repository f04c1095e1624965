mod command_registry;
mod intent_parser;
mod quick_actions;
mod transcript;

pub use command_registry::CHAT_HELP_COMMANDS;
pub use intent_parser::{parse_intent, Intent};
pub use quick_actions::{find_quick_action, QuickAction, QUICK_ACTIONS};
pub use transcript::{Message, Role, Transcript, WELCOME_TEXT};
