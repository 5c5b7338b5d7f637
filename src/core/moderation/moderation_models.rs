// Moderation domain models - data structures for moderator actions.
//
// These are pure domain types with no Discord dependencies.
// The Discord layer converts these into actual API calls.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A moderator action to be carried out against a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModCommand {
    /// Remove the user and optionally delete their recent messages.
    Ban { delete_message_days: u8 },
    Kick,
    /// Mute the user for a number of minutes.
    Timeout { minutes: u32 },
    /// Bulk-delete messages in a channel.
    Clear { count: u8 },
}

impl fmt::Display for ModCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModCommand::Ban { .. } => write!(f, "Ban"),
            ModCommand::Kick => write!(f, "Kick"),
            ModCommand::Timeout { minutes } => write!(f, "Timeout ({minutes}m)"),
            ModCommand::Clear { count } => write!(f, "Clear ({count} messages)"),
        }
    }
}

/// An executed moderation action, for webhook notifications and logs.
#[derive(Debug, Clone)]
pub struct CaseRecord {
    pub guild_id: u64,
    pub moderator_id: u64,
    /// None for channel-scoped actions like Clear.
    pub target_id: Option<u64>,
    pub command: ModCommand,
    pub reason: String,
    pub at: DateTime<Utc>,
}

/// A user whose messages are removed on sight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockedUser {
    pub user_id: u64,
    pub reason: String,
    pub added_by: u64,
    pub added_at: DateTime<Utc>,
}

/// Limits moderator input is validated against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationConfig {
    /// Longest reason accepted. Discord audit-log reasons cap at 512; we
    /// stay under to leave room for the moderator tag prefix.
    pub max_reason_len: usize,
    /// Discord's own timeout ceiling is 28 days.
    pub max_timeout_minutes: u32,
    pub max_clear_count: u8,
    /// Ban message deletion window accepted by the API.
    pub max_delete_message_days: u8,
    /// Bulk deletion silently skips messages older than this.
    pub bulk_delete_max_age_days: i64,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            max_reason_len: 450,
            max_timeout_minutes: 40_320, // 28 days
            max_clear_count: 100,
            max_delete_message_days: 7,
            bulk_delete_max_age_days: 14,
        }
    }
}
