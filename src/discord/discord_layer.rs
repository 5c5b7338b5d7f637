// Discord layer - commands and event handlers.

#[path = "commands/command_catalog.rs"]
pub mod commands;

#[path = "chatter/message_handler.rs"]
pub mod chatter;

#[path = "moderation/commands.rs"]
pub mod moderation;

// Re-export command types for convenience
pub use commands::economy::{Data, Error};
