// Tracks which channel is running which game, and who has petals on the
// table.
//
// Settlement discipline: whoever removes a ticket (the command loop closing
// it, or the stale sweep) owns the escrowed stakes on it. Removal happens
// exactly once, so a bet can never be paid out twice.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TableError {
    #[error("A game is already running in this channel")]
    ChannelBusy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Blackjack,
    Duel,
    Quiz,
}

impl TableKind {
    pub fn label(&self) -> &'static str {
        match self {
            TableKind::Blackjack => "blackjack",
            TableKind::Duel => "duel",
            TableKind::Quiz => "quiz",
        }
    }
}

/// One open table. The stakes list carries everything that must be refunded
/// if the table is swept instead of settled.
#[derive(Debug, Clone)]
pub struct TableTicket {
    pub kind: TableKind,
    pub guild_id: u64,
    /// user_id and the petals they have escrowed so far.
    pub stakes: Vec<(u64, i64)>,
    pub opened_at: DateTime<Utc>,
    pub last_action_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct TableRegistry {
    tables: DashMap<u64, TableTicket>,
}

impl TableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim a channel for a game. Fails if any table is already open there.
    pub fn open(
        &self,
        channel_id: u64,
        guild_id: u64,
        kind: TableKind,
        stakes: Vec<(u64, i64)>,
    ) -> Result<(), TableError> {
        use dashmap::mapref::entry::Entry;
        match self.tables.entry(channel_id) {
            Entry::Occupied(_) => Err(TableError::ChannelBusy),
            Entry::Vacant(slot) => {
                let now = Utc::now();
                slot.insert(TableTicket {
                    kind,
                    guild_id,
                    stakes,
                    opened_at: now,
                    last_action_at: now,
                });
                Ok(())
            }
        }
    }

    /// Record activity so the sweep leaves a live table alone.
    pub fn touch(&self, channel_id: u64) {
        if let Some(mut ticket) = self.tables.get_mut(&channel_id) {
            ticket.last_action_at = Utc::now();
        }
    }

    /// Add to a player's escrow on an open table (double downs, an opponent
    /// paying in on accept).
    pub fn add_stake(&self, channel_id: u64, user_id: u64, amount: i64) {
        if let Some(mut ticket) = self.tables.get_mut(&channel_id) {
            ticket.last_action_at = Utc::now();
            if let Some(entry) = ticket.stakes.iter_mut().find(|(id, _)| *id == user_id) {
                entry.1 += amount;
            } else {
                ticket.stakes.push((user_id, amount));
            }
        }
    }

    /// Take the ticket for settlement. Returns None if someone else (the
    /// sweep, usually) already took it.
    pub fn close(&self, channel_id: u64) -> Option<TableTicket> {
        self.tables.remove(&channel_id).map(|(_, ticket)| ticket)
    }

    /// Remove tables idle longer than `max_idle` and hand them back so the
    /// caller can refund the stakes.
    pub fn sweep_stale(&self, max_idle: Duration) -> Vec<(u64, TableTicket)> {
        let cutoff = Utc::now() - max_idle;
        let stale: Vec<u64> = self
            .tables
            .iter()
            .filter(|entry| entry.value().last_action_at < cutoff)
            .map(|entry| *entry.key())
            .collect();

        let mut removed = Vec::new();
        for channel_id in stale {
            // Re-check under the removal so a just-touched table survives
            if let Some((id, ticket)) = self
                .tables
                .remove_if(&channel_id, |_, t| t.last_action_at < cutoff)
            {
                removed.push((id, ticket));
            }
        }
        removed
    }

    pub fn open_count(&self) -> usize {
        self.tables.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_admits_one_table_at_a_time() {
        let registry = TableRegistry::new();
        registry
            .open(5, 1, TableKind::Blackjack, vec![(10, 50)])
            .unwrap();

        assert_eq!(
            registry.open(5, 1, TableKind::Quiz, vec![]),
            Err(TableError::ChannelBusy)
        );

        // A different channel is fine
        registry.open(6, 1, TableKind::Quiz, vec![]).unwrap();
        assert_eq!(registry.open_count(), 2);
    }

    #[test]
    fn close_returns_the_ticket_exactly_once() {
        let registry = TableRegistry::new();
        registry
            .open(5, 1, TableKind::Duel, vec![(10, 50)])
            .unwrap();

        let ticket = registry.close(5).unwrap();
        assert_eq!(ticket.stakes, vec![(10, 50)]);
        assert!(registry.close(5).is_none());
    }

    #[test]
    fn add_stake_accumulates_per_player() {
        let registry = TableRegistry::new();
        registry
            .open(5, 1, TableKind::Blackjack, vec![(10, 50)])
            .unwrap();
        registry.add_stake(5, 10, 50); // double down
        registry.add_stake(5, 20, 75); // second player joins

        let ticket = registry.close(5).unwrap();
        assert_eq!(ticket.stakes, vec![(10, 100), (20, 75)]);
    }

    #[test]
    fn sweep_only_removes_idle_tables() {
        let registry = TableRegistry::new();
        registry
            .open(5, 1, TableKind::Duel, vec![(10, 50)])
            .unwrap();
        registry.open(6, 1, TableKind::Quiz, vec![]).unwrap();

        // Backdate channel 5's activity
        registry.tables.get_mut(&5).unwrap().last_action_at = Utc::now() - Duration::minutes(10);

        let swept = registry.sweep_stale(Duration::minutes(5));
        assert_eq!(swept.len(), 1);
        assert_eq!(swept[0].0, 5);
        assert_eq!(swept[0].1.stakes, vec![(10, 50)]);

        // Channel 6 was recently active and survives
        assert_eq!(registry.open_count(), 1);
        assert!(registry.close(6).is_some());
    }
}
