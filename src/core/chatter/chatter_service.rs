// Chatter core - keyword-triggered replies and the bot's short-term memory
// of conversations.
//
// Response rules come from a YAML catalog: each rule lists trigger keywords,
// a pool of replies, a firing chance and a per-guild cooldown so the bot
// chimes in without flooding a channel. Message memory is kept behind a
// store trait and expires after a TTL.
//
// No Discord-specific code in this module.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// DOMAIN MODELS
// ============================================================================

/// One keyword-triggered response rule.
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseRule {
    /// Words or phrases that trigger the rule, matched on word boundaries,
    /// case-insensitively.
    pub keywords: Vec<String>,
    /// Reply pool; one is picked at random.
    pub responses: Vec<String>,
    /// Chance (0.0 to 1.0) that a matching message actually gets a reply.
    #[serde(default = "default_chance")]
    pub chance: f64,
    /// Per-guild cooldown before this rule may fire again.
    #[serde(default = "default_cooldown")]
    pub cooldown_secs: i64,
}

fn default_chance() -> f64 {
    1.0
}

fn default_cooldown() -> i64 {
    30
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponseCatalog {
    pub rules: Vec<ResponseRule>,
}

/// What the bot remembers about one observed message.
#[derive(Debug, Clone)]
pub struct MemoryEntry {
    pub guild_id: u64,
    pub channel_id: u64,
    pub user_id: u64,
    pub content: String,
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum ChatterError {
    #[error("Memory store error: {0}")]
    StorageError(String),
}

// ============================================================================
// STORAGE TRAIT (PORT)
// ============================================================================

/// Persistence for observed messages.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    async fn record(&self, entry: MemoryEntry) -> Result<(), ChatterError>;

    async fn message_count(&self, guild_id: u64) -> Result<u64, ChatterError>;

    /// Delete entries older than the cutoff. Returns how many went.
    async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, ChatterError>;
}

// ============================================================================
// CORE SERVICE
// ============================================================================

/// Lines used when someone mentions the bot directly. `{count}` is replaced
/// with how many messages the bot has drifted past in that guild.
const MENTION_REPLIES: &[&str] = &[
    "Hm? Did you call me, or was it just the petals on the wind?",
    "I was only drifting by. Is there something sweet to eat?",
    "{count} conversations have floated past me here. Yours was the loveliest, of course.",
    "The cherry blossoms are falling. So is my attention span~",
    "Yes, yes, I am listening. Mostly. {count} whispers and counting.",
    "You called? I hope it involves dinner.",
];

pub struct ChatterService<M: MemoryStore> {
    catalog: ResponseCatalog,
    memory: M,
    memory_ttl_days: i64,
    /// (guild_id, rule index) -> when that rule last fired there.
    rule_cooldowns: DashMap<(u64, usize), DateTime<Utc>>,
}

impl<M: MemoryStore> ChatterService<M> {
    pub fn new(catalog: ResponseCatalog, memory: M, memory_ttl_days: i64) -> Self {
        Self {
            catalog,
            memory,
            memory_ttl_days,
            rule_cooldowns: DashMap::new(),
        }
    }

    pub fn rule_count(&self) -> usize {
        self.catalog.rules.len()
    }

    /// Remember a message for the mention counter and future TTL purges.
    pub async fn observe(&self, entry: MemoryEntry) -> Result<(), ChatterError> {
        self.memory.record(entry).await
    }

    /// Find a flavor reply for a message, honoring per-rule chance and the
    /// per-guild cooldown. Returns None when the bot should stay quiet.
    pub fn respond_to(
        &self,
        guild_id: u64,
        content: &str,
        rng: &mut impl Rng,
    ) -> Option<String> {
        let lowered = content.to_lowercase();
        let now = Utc::now();

        for (index, rule) in self.catalog.rules.iter().enumerate() {
            let matched = rule
                .keywords
                .iter()
                .any(|k| contains_word(&lowered, &k.to_lowercase()));
            if !matched {
                continue;
            }

            if let Some(last) = self.rule_cooldowns.get(&(guild_id, index)) {
                if now < *last + Duration::seconds(rule.cooldown_secs) {
                    continue;
                }
            }

            if rng.gen::<f64>() >= rule.chance {
                continue;
            }

            let reply = rule.responses.choose(rng)?.clone();
            self.rule_cooldowns.insert((guild_id, index), now);
            return Some(reply);
        }
        None
    }

    /// What to say when mentioned directly. The guild's memory count picks
    /// the line, so the reply shifts as the bot listens.
    pub async fn mention_reply(&self, guild_id: u64) -> Result<String, ChatterError> {
        let count = self.memory.message_count(guild_id).await?;
        let line = MENTION_REPLIES[(count % MENTION_REPLIES.len() as u64) as usize];
        Ok(line.replace("{count}", &count.to_string()))
    }

    /// Drop memories past their TTL. Returns how many were purged.
    pub async fn purge_expired(&self) -> Result<u64, ChatterError> {
        let cutoff = Utc::now() - Duration::days(self.memory_ttl_days);
        self.memory.purge_older_than(cutoff).await
    }
}

/// Case-sensitive word-boundary search; callers lowercase both sides.
/// Handles multi-word needles by checking the characters around the match.
fn contains_word(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    let mut start = 0;
    while let Some(pos) = haystack[start..].find(needle) {
        let begin = start + pos;
        let end = begin + needle.len();

        let ok_before = haystack[..begin]
            .chars()
            .next_back()
            .map(|c| !c.is_alphanumeric())
            .unwrap_or(true);
        let ok_after = haystack[end..]
            .chars()
            .next()
            .map(|c| !c.is_alphanumeric())
            .unwrap_or(true);
        if ok_before && ok_after {
            return true;
        }

        start = begin + needle.len();
        if start >= haystack.len() {
            break;
        }
    }
    false
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::atomic::{AtomicU64, Ordering};

    struct MockMemoryStore {
        recorded: AtomicU64,
        count: u64,
    }

    impl MockMemoryStore {
        fn with_count(count: u64) -> Self {
            Self {
                recorded: AtomicU64::new(0),
                count,
            }
        }
    }

    #[async_trait]
    impl MemoryStore for MockMemoryStore {
        async fn record(&self, _entry: MemoryEntry) -> Result<(), ChatterError> {
            self.recorded.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn message_count(&self, _guild_id: u64) -> Result<u64, ChatterError> {
            Ok(self.count)
        }

        async fn purge_older_than(&self, _cutoff: DateTime<Utc>) -> Result<u64, ChatterError> {
            Ok(3)
        }
    }

    fn catalog() -> ResponseCatalog {
        ResponseCatalog {
            rules: vec![
                ResponseRule {
                    keywords: vec!["ghost".into(), "spirit".into()],
                    responses: vec!["Boo~".into()],
                    chance: 1.0,
                    cooldown_secs: 300,
                },
                ResponseRule {
                    keywords: vec!["cherry blossom".into()],
                    responses: vec!["They fall so beautifully.".into()],
                    chance: 1.0,
                    cooldown_secs: 0,
                },
            ],
        }
    }

    fn service(count: u64) -> ChatterService<MockMemoryStore> {
        ChatterService::new(catalog(), MockMemoryStore::with_count(count), 7)
    }

    #[test]
    fn keyword_matches_on_word_boundaries() {
        assert!(contains_word("a ghost appeared", "ghost"));
        assert!(contains_word("ghost", "ghost"));
        assert!(contains_word("the ghost!", "ghost"));
        assert!(!contains_word("ghostly figure", "ghost"));
        assert!(!contains_word("aghost", "ghost"));
        assert!(contains_word("ghostly, a real ghost", "ghost"));
    }

    #[test]
    fn phrases_match_across_spaces() {
        assert!(contains_word("the cherry blossom falls", "cherry blossom"));
        assert!(!contains_word("cherry blossoming", "cherry blossom"));
    }

    #[test]
    fn respond_is_case_insensitive() {
        let svc = service(0);
        let mut rng = StdRng::seed_from_u64(1);
        let reply = svc.respond_to(1, "I saw a GHOST today", &mut rng);
        assert_eq!(reply.as_deref(), Some("Boo~"));
    }

    #[test]
    fn unmatched_messages_stay_quiet() {
        let svc = service(0);
        let mut rng = StdRng::seed_from_u64(1);
        assert!(svc.respond_to(1, "just a normal day", &mut rng).is_none());
    }

    #[test]
    fn rule_cooldown_suppresses_repeat_fires() {
        let svc = service(0);
        let mut rng = StdRng::seed_from_u64(1);

        assert!(svc.respond_to(1, "ghost", &mut rng).is_some());
        // 300s cooldown: same guild stays quiet
        assert!(svc.respond_to(1, "ghost", &mut rng).is_none());
        // Another guild has its own cooldown clock
        assert!(svc.respond_to(2, "ghost", &mut rng).is_some());
        // Zero-cooldown rule fires every time
        assert!(svc.respond_to(1, "cherry blossom", &mut rng).is_some());
        assert!(svc.respond_to(1, "cherry blossom", &mut rng).is_some());
    }

    #[test]
    fn zero_chance_never_fires() {
        let mut cat = catalog();
        cat.rules[0].chance = 0.0;
        let svc = ChatterService::new(cat, MockMemoryStore::with_count(0), 7);
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..50 {
            assert!(svc.respond_to(1, "ghost", &mut rng).is_none());
        }
    }

    #[tokio::test]
    async fn mention_reply_tracks_memory_count() {
        let svc = service(2);
        let reply = svc.mention_reply(1).await.unwrap();
        // Index 2 of the pool carries the count placeholder
        assert!(reply.contains('2'), "reply was: {reply}");

        let svc = service(0);
        let reply = svc.mention_reply(1).await.unwrap();
        assert!(!reply.contains("{count}"));
    }

    #[tokio::test]
    async fn observe_and_purge_delegate_to_the_store() {
        let svc = service(0);
        svc.observe(MemoryEntry {
            guild_id: 1,
            channel_id: 2,
            user_id: 3,
            content: "hello".into(),
        })
        .await
        .unwrap();
        assert_eq!(svc.memory.recorded.load(Ordering::SeqCst), 1);

        assert_eq!(svc.purge_expired().await.unwrap(), 3);
    }
}
