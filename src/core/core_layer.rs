// The core module contains all business logic.
// Each feature gets its own submodule.

#[path = "chatter/chatter_service.rs"]
pub mod chatter;

#[path = "economy/economy_service.rs"]
pub mod economy;

#[path = "games/mod.rs"]
pub mod games;

#[path = "moderation/mod.rs"]
pub mod moderation;
