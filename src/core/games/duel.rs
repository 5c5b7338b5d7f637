// Player-versus-player blackjack duel.
//
// Two players stake the same amount and play the same deck, challenger
// first. A bust hands the win to the other seat; otherwise the higher
// total takes the pot and a tie pushes. The challenge itself can be
// declined or can expire before it is accepted, in which case only the
// challenger's escrow exists to refund.

use super::cards::{Deck, Hand};
use rand::Rng;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Seat {
    Challenger,
    Opponent,
}

impl Seat {
    pub fn other(self) -> Seat {
        match self {
            Seat::Challenger => Seat::Opponent,
            Seat::Opponent => Seat::Challenger,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuelOutcome {
    Won { winner: Seat },
    Push,
    /// The opponent turned the challenge down.
    Declined,
    /// Nobody accepted in time.
    Expired,
    /// The table went stale mid-play; both stakes come back.
    Abandoned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuelPhase {
    AwaitingAccept,
    InPlay { turn: Seat },
    Finished(DuelOutcome),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DuelError {
    #[error("It is not your turn")]
    NotYourTurn,
    #[error("That cannot be done right now")]
    WrongPhase,
}

#[derive(Debug)]
pub struct BlackjackDuel {
    pub challenger: u64,
    pub opponent: u64,
    pub stake: i64,
    deck: Deck,
    challenger_hand: Hand,
    opponent_hand: Hand,
    phase: DuelPhase,
}

impl BlackjackDuel {
    pub fn new(rng: &mut impl Rng, challenger: u64, opponent: u64, stake: i64) -> Self {
        Self {
            challenger,
            opponent,
            stake,
            deck: Deck::shuffled(rng),
            challenger_hand: Hand::new(),
            opponent_hand: Hand::new(),
            phase: DuelPhase::AwaitingAccept,
        }
    }

    pub fn phase(&self) -> DuelPhase {
        self.phase
    }

    pub fn seat_of(&self, user_id: u64) -> Option<Seat> {
        if user_id == self.challenger {
            Some(Seat::Challenger)
        } else if user_id == self.opponent {
            Some(Seat::Opponent)
        } else {
            None
        }
    }

    pub fn player_id(&self, seat: Seat) -> u64 {
        match seat {
            Seat::Challenger => self.challenger,
            Seat::Opponent => self.opponent,
        }
    }

    pub fn hand(&self, seat: Seat) -> &Hand {
        match seat {
            Seat::Challenger => &self.challenger_hand,
            Seat::Opponent => &self.opponent_hand,
        }
    }

    /// Opponent accepts: both hands are dealt and the challenger acts first.
    pub fn accept(&mut self) -> Result<(), DuelError> {
        if self.phase != DuelPhase::AwaitingAccept {
            return Err(DuelError::WrongPhase);
        }
        for _ in 0..2 {
            if let Some(c) = self.deck.draw() {
                self.challenger_hand.push(c);
            }
            if let Some(c) = self.deck.draw() {
                self.opponent_hand.push(c);
            }
        }
        self.phase = DuelPhase::InPlay {
            turn: Seat::Challenger,
        };
        Ok(())
    }

    pub fn decline(&mut self) -> Result<(), DuelError> {
        if self.phase != DuelPhase::AwaitingAccept {
            return Err(DuelError::WrongPhase);
        }
        self.phase = DuelPhase::Finished(DuelOutcome::Declined);
        Ok(())
    }

    /// Close the duel because time ran out. What that means depends on how
    /// far it got.
    pub fn expire(&mut self) {
        self.phase = match self.phase {
            DuelPhase::AwaitingAccept => DuelPhase::Finished(DuelOutcome::Expired),
            DuelPhase::InPlay { .. } => DuelPhase::Finished(DuelOutcome::Abandoned),
            finished @ DuelPhase::Finished(_) => finished,
        };
    }

    pub fn hit(&mut self, seat: Seat) -> Result<DuelPhase, DuelError> {
        self.check_turn(seat)?;
        if let Some(c) = self.deck.draw() {
            self.hand_mut(seat).push(c);
        }
        if self.hand(seat).is_bust() {
            self.phase = DuelPhase::Finished(DuelOutcome::Won {
                winner: seat.other(),
            });
        }
        Ok(self.phase)
    }

    /// Stand: the challenger hands the turn over; the opponent triggers the
    /// showdown.
    pub fn stand(&mut self, seat: Seat) -> Result<DuelPhase, DuelError> {
        self.check_turn(seat)?;
        self.phase = match seat {
            Seat::Challenger => DuelPhase::InPlay {
                turn: Seat::Opponent,
            },
            Seat::Opponent => DuelPhase::Finished(self.showdown()),
        };
        Ok(self.phase)
    }

    /// The whole pot both players paid in.
    pub fn pot(&self) -> i64 {
        self.stake * 2
    }

    /// Petals owed to a player for the finished duel. Declined and expired
    /// challenges only ever escrowed the challenger's stake.
    pub fn payout_for(&self, seat: Seat) -> i64 {
        let DuelPhase::Finished(outcome) = self.phase else {
            return 0;
        };
        match outcome {
            DuelOutcome::Won { winner } => {
                if winner == seat {
                    self.pot()
                } else {
                    0
                }
            }
            DuelOutcome::Push | DuelOutcome::Abandoned => self.stake,
            DuelOutcome::Declined | DuelOutcome::Expired => {
                if seat == Seat::Challenger {
                    self.stake
                } else {
                    0
                }
            }
        }
    }

    fn showdown(&self) -> DuelOutcome {
        let c = self.challenger_hand.value();
        let o = self.opponent_hand.value();
        if c > o {
            DuelOutcome::Won {
                winner: Seat::Challenger,
            }
        } else if o > c {
            DuelOutcome::Won {
                winner: Seat::Opponent,
            }
        } else {
            DuelOutcome::Push
        }
    }

    fn check_turn(&self, seat: Seat) -> Result<(), DuelError> {
        match self.phase {
            DuelPhase::InPlay { turn } if turn == seat => Ok(()),
            DuelPhase::InPlay { .. } => Err(DuelError::NotYourTurn),
            _ => Err(DuelError::WrongPhase),
        }
    }

    fn hand_mut(&mut self, seat: Seat) -> &mut Hand {
        match seat {
            Seat::Challenger => &mut self.challenger_hand,
            Seat::Opponent => &mut self.opponent_hand,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn duel(seed: u64) -> BlackjackDuel {
        let mut rng = StdRng::seed_from_u64(seed);
        BlackjackDuel::new(&mut rng, 100, 200, 50)
    }

    fn accepted(seed: u64) -> BlackjackDuel {
        let mut d = duel(seed);
        d.accept().unwrap();
        d
    }

    #[test]
    fn accept_deals_both_hands_and_challenger_starts() {
        let d = accepted(1);
        assert_eq!(d.hand(Seat::Challenger).len(), 2);
        assert_eq!(d.hand(Seat::Opponent).len(), 2);
        assert_eq!(
            d.phase(),
            DuelPhase::InPlay {
                turn: Seat::Challenger
            }
        );
    }

    #[test]
    fn declined_challenge_refunds_only_challenger() {
        let mut d = duel(1);
        d.decline().unwrap();
        assert_eq!(d.phase(), DuelPhase::Finished(DuelOutcome::Declined));
        assert_eq!(d.payout_for(Seat::Challenger), 50);
        assert_eq!(d.payout_for(Seat::Opponent), 0);

        // Cannot accept a declined duel
        assert_eq!(d.accept(), Err(DuelError::WrongPhase));
    }

    #[test]
    fn expiry_before_accept_refunds_challenger() {
        let mut d = duel(1);
        d.expire();
        assert_eq!(d.phase(), DuelPhase::Finished(DuelOutcome::Expired));
        assert_eq!(d.payout_for(Seat::Challenger), 50);
        assert_eq!(d.payout_for(Seat::Opponent), 0);
    }

    #[test]
    fn expiry_mid_play_refunds_both() {
        let mut d = accepted(1);
        d.expire();
        assert_eq!(d.phase(), DuelPhase::Finished(DuelOutcome::Abandoned));
        assert_eq!(d.payout_for(Seat::Challenger), 50);
        assert_eq!(d.payout_for(Seat::Opponent), 50);
    }

    #[test]
    fn turn_order_is_enforced() {
        let mut d = accepted(1);
        assert_eq!(d.hit(Seat::Opponent), Err(DuelError::NotYourTurn));
        assert_eq!(d.stand(Seat::Opponent), Err(DuelError::NotYourTurn));

        d.stand(Seat::Challenger).unwrap();
        assert_eq!(
            d.phase(),
            DuelPhase::InPlay {
                turn: Seat::Opponent
            }
        );
        assert_eq!(d.hit(Seat::Challenger), Err(DuelError::NotYourTurn));
    }

    #[test]
    fn moves_rejected_before_accept() {
        let mut d = duel(1);
        assert_eq!(d.hit(Seat::Challenger), Err(DuelError::WrongPhase));
        assert_eq!(d.stand(Seat::Challenger), Err(DuelError::WrongPhase));
    }

    #[test]
    fn bust_hands_the_win_to_the_other_seat() {
        // Find a seed where the challenger busts by hitting repeatedly
        for seed in 0..200 {
            let mut d = accepted(seed);
            for _ in 0..10 {
                match d.hit(Seat::Challenger) {
                    Ok(DuelPhase::Finished(outcome)) => {
                        assert_eq!(
                            outcome,
                            DuelOutcome::Won {
                                winner: Seat::Opponent
                            }
                        );
                        assert_eq!(d.payout_for(Seat::Opponent), 100);
                        assert_eq!(d.payout_for(Seat::Challenger), 0);
                        return;
                    }
                    Ok(_) => continue,
                    Err(e) => panic!("unexpected error: {e}"),
                }
            }
        }
        panic!("no challenger bust in 200 seeds");
    }

    #[test]
    fn showdown_compares_totals() {
        for seed in 0..200 {
            let mut d = accepted(seed);
            d.stand(Seat::Challenger).unwrap();
            d.stand(Seat::Opponent).unwrap();

            let c = d.hand(Seat::Challenger).value();
            let o = d.hand(Seat::Opponent).value();
            let DuelPhase::Finished(outcome) = d.phase() else {
                panic!("duel must be finished after both stands");
            };
            match outcome {
                DuelOutcome::Won { winner: Seat::Challenger } => assert!(c > o),
                DuelOutcome::Won { winner: Seat::Opponent } => assert!(o > c),
                DuelOutcome::Push => {
                    assert_eq!(c, o);
                    assert_eq!(d.payout_for(Seat::Challenger), 50);
                    assert_eq!(d.payout_for(Seat::Opponent), 50);
                }
                other => panic!("unexpected outcome {other:?}"),
            }
        }
    }

    #[test]
    fn seats_resolve_by_user_id() {
        let d = duel(1);
        assert_eq!(d.seat_of(100), Some(Seat::Challenger));
        assert_eq!(d.seat_of(200), Some(Seat::Opponent));
        assert_eq!(d.seat_of(300), None);
        assert_eq!(d.player_id(Seat::Opponent), 200);
    }
}
