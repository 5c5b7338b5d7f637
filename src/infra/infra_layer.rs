// The infra module contains implementations of core traits.
// Each feature implementation goes in its own submodule.

#[path = "catalogs/yaml_catalogs.rs"]
pub mod catalogs;

#[path = "chatter/sqlite_memory_store.rs"]
pub mod chatter;

#[path = "economy/mod.rs"]
pub mod economy;

#[path = "moderation/sqlite_blocklist_store.rs"]
pub mod moderation;

#[path = "webhook/webhook_notifier.rs"]
pub mod webhook;
