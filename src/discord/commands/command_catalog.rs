// Discord commands module.
// Each feature gets its own command file.

pub mod about;

pub mod bank;

pub mod blackjack;

pub mod economy;

pub mod fishing;

pub mod help;

// Bot presence management
pub mod presence;

pub mod quiz;

pub mod vault;
