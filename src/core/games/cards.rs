// Playing card primitives shared by the blackjack tables.
//
// Pure types with no async and no Discord dependencies, so the game rules
// can be tested as plain functions.

use rand::seq::SliceRandom;
use rand::Rng;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suit {
    Spades,
    Hearts,
    Diamonds,
    Clubs,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Spades, Suit::Hearts, Suit::Diamonds, Suit::Clubs];

    pub fn symbol(&self) -> char {
        match self {
            Suit::Spades => '♠',
            Suit::Hearts => '♥',
            Suit::Diamonds => '♦',
            Suit::Clubs => '♣',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rank {
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Ten,
    Jack,
    Queen,
    King,
    Ace,
}

impl Rank {
    pub const ALL: [Rank; 13] = [
        Rank::Two,
        Rank::Three,
        Rank::Four,
        Rank::Five,
        Rank::Six,
        Rank::Seven,
        Rank::Eight,
        Rank::Nine,
        Rank::Ten,
        Rank::Jack,
        Rank::Queen,
        Rank::King,
        Rank::Ace,
    ];

    /// Blackjack value. Aces count as 11 here; `Hand::value` demotes them
    /// to 1 as needed.
    pub fn base_value(&self) -> u32 {
        match self {
            Rank::Two => 2,
            Rank::Three => 3,
            Rank::Four => 4,
            Rank::Five => 5,
            Rank::Six => 6,
            Rank::Seven => 7,
            Rank::Eight => 8,
            Rank::Nine => 9,
            Rank::Ten | Rank::Jack | Rank::Queen | Rank::King => 10,
            Rank::Ace => 11,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Rank::Two => "2",
            Rank::Three => "3",
            Rank::Four => "4",
            Rank::Five => "5",
            Rank::Six => "6",
            Rank::Seven => "7",
            Rank::Eight => "8",
            Rank::Nine => "9",
            Rank::Ten => "10",
            Rank::Jack => "J",
            Rank::Queen => "Q",
            Rank::King => "K",
            Rank::Ace => "A",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Card {
    pub rank: Rank,
    pub suit: Suit,
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.rank.label(), self.suit.symbol())
    }
}

/// A single 52-card deck. One deck is plenty for a round: no blackjack hand
/// can exceed 11 cards before busting.
#[derive(Debug, Clone)]
pub struct Deck {
    cards: Vec<Card>,
}

impl Deck {
    pub fn shuffled(rng: &mut impl Rng) -> Self {
        let mut cards = Vec::with_capacity(52);
        for suit in Suit::ALL {
            for rank in Rank::ALL {
                cards.push(Card { rank, suit });
            }
        }
        cards.shuffle(rng);
        Self { cards }
    }

    pub fn draw(&mut self) -> Option<Card> {
        self.cards.pop()
    }

    pub fn remaining(&self) -> usize {
        self.cards.len()
    }
}

/// A hand of cards with blackjack scoring.
#[derive(Debug, Clone, Default)]
pub struct Hand {
    cards: Vec<Card>,
}

impl Hand {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, card: Card) {
        self.cards.push(card);
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Best total without busting when possible: aces start at 11 and drop
    /// to 1 one at a time while the hand is over 21.
    pub fn value(&self) -> u32 {
        let mut total: u32 = self.cards.iter().map(|c| c.rank.base_value()).sum();
        let mut soft_aces = self
            .cards
            .iter()
            .filter(|c| c.rank == Rank::Ace)
            .count() as u32;
        while total > 21 && soft_aces > 0 {
            total -= 10;
            soft_aces -= 1;
        }
        total
    }

    pub fn is_bust(&self) -> bool {
        self.value() > 21
    }

    /// An ace and a ten-card as the first two cards.
    pub fn is_natural(&self) -> bool {
        self.cards.len() == 2 && self.value() == 21
    }
}

impl fmt::Display for Hand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for card in &self.cards {
            if !first {
                write!(f, " ")?;
            }
            write!(f, "{card}")?;
            first = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn card(rank: Rank) -> Card {
        Card {
            rank,
            suit: Suit::Spades,
        }
    }

    #[test]
    fn shuffled_deck_has_52_unique_cards() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut deck = Deck::shuffled(&mut rng);
        assert_eq!(deck.remaining(), 52);

        let mut seen = Vec::new();
        while let Some(c) = deck.draw() {
            assert!(!seen.contains(&c));
            seen.push(c);
        }
        assert_eq!(seen.len(), 52);
    }

    #[test]
    fn hand_value_hard_totals() {
        let mut hand = Hand::new();
        hand.push(card(Rank::King));
        hand.push(card(Rank::Seven));
        assert_eq!(hand.value(), 17);
        assert!(!hand.is_bust());
    }

    #[test]
    fn aces_demote_from_11_to_1() {
        let mut hand = Hand::new();
        hand.push(card(Rank::Ace));
        hand.push(card(Rank::Seven));
        assert_eq!(hand.value(), 18); // soft 18

        hand.push(card(Rank::Ten));
        assert_eq!(hand.value(), 18); // ace drops to 1

        hand.push(card(Rank::Ace));
        assert_eq!(hand.value(), 19); // second ace is 1 too
    }

    #[test]
    fn natural_is_exactly_two_cards() {
        let mut hand = Hand::new();
        hand.push(card(Rank::Ace));
        hand.push(card(Rank::Queen));
        assert!(hand.is_natural());

        // 21 in three cards is not a natural
        let mut hand = Hand::new();
        hand.push(card(Rank::Seven));
        hand.push(card(Rank::Seven));
        hand.push(card(Rank::Seven));
        assert_eq!(hand.value(), 21);
        assert!(!hand.is_natural());
    }

    #[test]
    fn bust_detection() {
        let mut hand = Hand::new();
        hand.push(card(Rank::King));
        hand.push(card(Rank::Queen));
        hand.push(card(Rank::Five));
        assert!(hand.is_bust());
    }

    #[test]
    fn display_renders_rank_and_suit() {
        let c = Card {
            rank: Rank::Ace,
            suit: Suit::Hearts,
        };
        assert_eq!(c.to_string(), "A♥");

        let mut hand = Hand::new();
        hand.push(c);
        hand.push(Card {
            rank: Rank::Ten,
            suit: Suit::Clubs,
        });
        assert_eq!(hand.to_string(), "A♥ 10♣");
    }
}
