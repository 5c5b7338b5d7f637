// Games module - card tables, fishing and quizzes.
// Pure game rules; the Discord layer drives them with buttons.

pub mod blackjack;
pub mod cards;
pub mod duel;
pub mod fishing;
pub mod quiz;
pub mod table_registry;

pub use blackjack::{BlackjackRound, PlayerMove, RoundOutcome, RoundPhase};
pub use cards::{Card, Deck, Hand, Rank, Suit};
pub use duel::{BlackjackDuel, DuelError, DuelOutcome, DuelPhase, Seat};
pub use fishing::{Catch, CatchEntry, FishingCatalog, FishingError, FishingService};
pub use quiz::{QuizCatalog, QuizError, QuizQuestion, QuizService};
pub use table_registry::{TableError, TableKind, TableRegistry, TableTicket};
