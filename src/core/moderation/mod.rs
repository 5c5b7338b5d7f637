// Core moderation module - validation and blocklist business logic.
// Models live in their own file so the Discord layer can import types alone.

pub mod moderation_models;
pub mod moderation_service;

pub use moderation_models::*;
pub use moderation_service::*;
