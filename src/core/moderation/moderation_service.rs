// Moderation service - validation and blocklist logic for moderator actions.
//
// This service handles:
// - Validating targets (no self-moderation, no acting on the bot)
// - Validating reasons and numeric ranges before anything hits the API
// - The blocklist of users whose messages are removed on sight
//
// NO Discord dependencies here - just pure domain logic.

use super::moderation_models::{BlockedUser, CaseRecord, ModCommand, ModerationConfig};
use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum ModerationError {
    #[error("You cannot moderate yourself")]
    SelfTarget,

    #[error("I will not act against myself")]
    BotTarget,

    #[error("Reason is too long (max {max} characters)")]
    ReasonTooLong { max: usize },

    #[error("Timeout must be between 1 and {max} minutes")]
    TimeoutOutOfRange { max: u32 },

    #[error("Message deletion window must be at most {max} days")]
    DeleteDaysOutOfRange { max: u8 },

    #[error("Clear count must be between 1 and {max}")]
    ClearCountOutOfRange { max: u8 },

    #[error("Storage error: {0}")]
    StorageError(String),
}

// ============================================================================
// STORAGE TRAIT (PORT)
// ============================================================================

/// Persistence for the per-guild blocklist.
#[async_trait]
pub trait BlocklistStore: Send + Sync {
    /// Add a user. Returns false if they were already listed.
    async fn add(
        &self,
        guild_id: u64,
        user_id: u64,
        reason: &str,
        added_by: u64,
    ) -> Result<bool, ModerationError>;

    /// Remove a user. Returns false if they were not listed.
    async fn remove(&self, guild_id: u64, user_id: u64) -> Result<bool, ModerationError>;

    async fn list(&self, guild_id: u64) -> Result<Vec<BlockedUser>, ModerationError>;

    async fn is_blocked(&self, guild_id: u64, user_id: u64) -> Result<bool, ModerationError>;
}

// ============================================================================
// CORE SERVICE
// ============================================================================

/// Validates moderator input and manages the blocklist.
pub struct ModerationService<S: BlocklistStore> {
    store: S,
    config: ModerationConfig,
}

impl<S: BlocklistStore> ModerationService<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, ModerationConfig::default())
    }

    pub fn with_config(store: S, config: ModerationConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &ModerationConfig {
        &self.config
    }

    /// Check a requested action before the Discord layer performs it.
    /// `target_id` is None for channel-scoped actions like Clear.
    pub fn validate(
        &self,
        moderator_id: u64,
        target_id: Option<u64>,
        bot_id: u64,
        command: &ModCommand,
        reason: &str,
    ) -> Result<(), ModerationError> {
        if let Some(target) = target_id {
            if target == moderator_id {
                return Err(ModerationError::SelfTarget);
            }
            if target == bot_id {
                return Err(ModerationError::BotTarget);
            }
        }

        if reason.chars().count() > self.config.max_reason_len {
            return Err(ModerationError::ReasonTooLong {
                max: self.config.max_reason_len,
            });
        }

        match *command {
            ModCommand::Ban {
                delete_message_days,
            } => {
                if delete_message_days > self.config.max_delete_message_days {
                    return Err(ModerationError::DeleteDaysOutOfRange {
                        max: self.config.max_delete_message_days,
                    });
                }
            }
            ModCommand::Timeout { minutes } => {
                if minutes == 0 || minutes > self.config.max_timeout_minutes {
                    return Err(ModerationError::TimeoutOutOfRange {
                        max: self.config.max_timeout_minutes,
                    });
                }
            }
            ModCommand::Clear { count } => {
                if count == 0 || count > self.config.max_clear_count {
                    return Err(ModerationError::ClearCountOutOfRange {
                        max: self.config.max_clear_count,
                    });
                }
            }
            ModCommand::Kick => {}
        }

        Ok(())
    }

    /// Normalize an optional reason into audit-trail text.
    pub fn sanitize_reason(&self, reason: Option<String>) -> String {
        match reason {
            Some(r) => {
                let trimmed = r.trim();
                if trimmed.is_empty() {
                    "No reason given".to_string()
                } else {
                    trimmed.to_string()
                }
            }
            None => "No reason given".to_string(),
        }
    }

    /// Assemble the record handed to notifications once an action succeeded.
    pub fn build_case(
        &self,
        guild_id: u64,
        moderator_id: u64,
        target_id: Option<u64>,
        command: ModCommand,
        reason: String,
    ) -> CaseRecord {
        CaseRecord {
            guild_id,
            moderator_id,
            target_id,
            command,
            reason,
            at: Utc::now(),
        }
    }

    // ------------------------------------------------------------------
    // Blocklist
    // ------------------------------------------------------------------

    pub async fn block_user(
        &self,
        guild_id: u64,
        user_id: u64,
        reason: &str,
        added_by: u64,
    ) -> Result<bool, ModerationError> {
        if reason.chars().count() > self.config.max_reason_len {
            return Err(ModerationError::ReasonTooLong {
                max: self.config.max_reason_len,
            });
        }
        self.store.add(guild_id, user_id, reason, added_by).await
    }

    pub async fn unblock_user(&self, guild_id: u64, user_id: u64) -> Result<bool, ModerationError> {
        self.store.remove(guild_id, user_id).await
    }

    pub async fn blocklist(&self, guild_id: u64) -> Result<Vec<BlockedUser>, ModerationError> {
        self.store.list(guild_id).await
    }

    pub async fn is_blocked(&self, guild_id: u64, user_id: u64) -> Result<bool, ModerationError> {
        self.store.is_blocked(guild_id, user_id).await
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use dashmap::DashMap;

    /// In-memory store for testing
    struct MockBlocklistStore {
        entries: DashMap<(u64, u64), BlockedUser>,
    }

    impl MockBlocklistStore {
        fn new() -> Self {
            Self {
                entries: DashMap::new(),
            }
        }
    }

    #[async_trait]
    impl BlocklistStore for MockBlocklistStore {
        async fn add(
            &self,
            guild_id: u64,
            user_id: u64,
            reason: &str,
            added_by: u64,
        ) -> Result<bool, ModerationError> {
            if self.entries.contains_key(&(guild_id, user_id)) {
                return Ok(false);
            }
            self.entries.insert(
                (guild_id, user_id),
                BlockedUser {
                    user_id,
                    reason: reason.to_string(),
                    added_by,
                    added_at: Utc::now(),
                },
            );
            Ok(true)
        }

        async fn remove(&self, guild_id: u64, user_id: u64) -> Result<bool, ModerationError> {
            Ok(self.entries.remove(&(guild_id, user_id)).is_some())
        }

        async fn list(&self, guild_id: u64) -> Result<Vec<BlockedUser>, ModerationError> {
            Ok(self
                .entries
                .iter()
                .filter(|e| e.key().0 == guild_id)
                .map(|e| e.value().clone())
                .collect())
        }

        async fn is_blocked(&self, guild_id: u64, user_id: u64) -> Result<bool, ModerationError> {
            Ok(self.entries.contains_key(&(guild_id, user_id)))
        }
    }

    fn service() -> ModerationService<MockBlocklistStore> {
        ModerationService::new(MockBlocklistStore::new())
    }

    #[test]
    fn self_and_bot_targets_are_rejected() {
        let svc = service();

        let err = svc
            .validate(1, Some(1), 99, &ModCommand::Kick, "reason")
            .unwrap_err();
        assert!(matches!(err, ModerationError::SelfTarget));

        let err = svc
            .validate(1, Some(99), 99, &ModCommand::Kick, "reason")
            .unwrap_err();
        assert!(matches!(err, ModerationError::BotTarget));

        // Channel-scoped action with no target passes those checks
        svc.validate(1, None, 99, &ModCommand::Clear { count: 10 }, "")
            .unwrap();
    }

    #[test]
    fn overlong_reason_is_rejected() {
        let svc = service();
        let long = "a".repeat(451);
        let err = svc
            .validate(1, Some(2), 99, &ModCommand::Kick, &long)
            .unwrap_err();
        assert!(matches!(err, ModerationError::ReasonTooLong { max: 450 }));

        let ok = "a".repeat(450);
        svc.validate(1, Some(2), 99, &ModCommand::Kick, &ok).unwrap();
    }

    #[test]
    fn numeric_ranges_are_enforced() {
        let svc = service();

        assert!(matches!(
            svc.validate(
                1,
                Some(2),
                99,
                &ModCommand::Ban {
                    delete_message_days: 8
                },
                ""
            )
            .unwrap_err(),
            ModerationError::DeleteDaysOutOfRange { max: 7 }
        ));

        assert!(matches!(
            svc.validate(1, Some(2), 99, &ModCommand::Timeout { minutes: 0 }, "")
                .unwrap_err(),
            ModerationError::TimeoutOutOfRange { .. }
        ));
        assert!(matches!(
            svc.validate(
                1,
                Some(2),
                99,
                &ModCommand::Timeout { minutes: 40_321 },
                ""
            )
            .unwrap_err(),
            ModerationError::TimeoutOutOfRange { .. }
        ));
        svc.validate(1, Some(2), 99, &ModCommand::Timeout { minutes: 60 }, "")
            .unwrap();

        assert!(matches!(
            svc.validate(1, None, 99, &ModCommand::Clear { count: 0 }, "")
                .unwrap_err(),
            ModerationError::ClearCountOutOfRange { .. }
        ));
        svc.validate(1, None, 99, &ModCommand::Clear { count: 100 }, "")
            .unwrap();
    }

    #[test]
    fn reasons_are_sanitized() {
        let svc = service();
        assert_eq!(svc.sanitize_reason(None), "No reason given");
        assert_eq!(svc.sanitize_reason(Some("   ".into())), "No reason given");
        assert_eq!(svc.sanitize_reason(Some("  spam  ".into())), "spam");
    }

    #[tokio::test]
    async fn blocklist_add_remove_list() {
        let svc = service();

        assert!(svc.block_user(1, 10, "spammer", 5).await.unwrap());
        // Second add reports already-listed
        assert!(!svc.block_user(1, 10, "again", 5).await.unwrap());

        assert!(svc.is_blocked(1, 10).await.unwrap());
        assert!(!svc.is_blocked(1, 11).await.unwrap());
        assert!(!svc.is_blocked(2, 10).await.unwrap());

        let list = svc.blocklist(1).await.unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].user_id, 10);
        assert_eq!(list[0].reason, "spammer");

        assert!(svc.unblock_user(1, 10).await.unwrap());
        assert!(!svc.unblock_user(1, 10).await.unwrap());
        assert!(!svc.is_blocked(1, 10).await.unwrap());
    }

    #[tokio::test]
    async fn blocklist_reason_length_is_checked() {
        let svc = service();
        let long = "a".repeat(451);
        assert!(matches!(
            svc.block_user(1, 10, &long, 5).await.unwrap_err(),
            ModerationError::ReasonTooLong { .. }
        ));
    }

    #[test]
    fn case_record_carries_the_command() {
        let svc = service();
        let case = svc.build_case(
            1,
            5,
            Some(10),
            ModCommand::Timeout { minutes: 30 },
            "cooling off".into(),
        );
        assert_eq!(case.guild_id, 1);
        assert_eq!(case.target_id, Some(10));
        assert_eq!(case.command.to_string(), "Timeout (30m)");
    }
}
