// Fishing minigame: weighted random catches on a per-user cooldown.
//
// The catch table is loaded from a YAML catalog at startup, so servers can
// stock their own pond without recompiling.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use rand::Rng;
use serde::Deserialize;
use thiserror::Error;

/// One possible catch. Heavier weights surface more often; a zero or
/// negative value range makes for junk catches that pay nothing.
#[derive(Debug, Clone, Deserialize)]
pub struct CatchEntry {
    pub name: String,
    #[serde(default = "default_emoji")]
    pub emoji: String,
    pub min_value: i64,
    pub max_value: i64,
    pub weight: u32,
    #[serde(default)]
    pub flavor: Option<String>,
}

fn default_emoji() -> String {
    "🐟".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct FishingCatalog {
    pub catches: Vec<CatchEntry>,
}

/// What actually came out of the water.
#[derive(Debug, Clone)]
pub struct Catch {
    pub name: String,
    pub emoji: String,
    pub value: i64,
    pub flavor: Option<String>,
}

#[derive(Debug, Error)]
pub enum FishingError {
    #[error("The pond needs to settle before you cast again")]
    OnCooldown { retry_at: DateTime<Utc> },

    #[error("The pond is empty: no catches configured")]
    EmptyCatalog,
}

pub struct FishingService {
    catalog: FishingCatalog,
    cooldown: Duration,
    last_cast: DashMap<(u64, u64), DateTime<Utc>>,
}

impl FishingService {
    pub fn new(catalog: FishingCatalog, cooldown_secs: i64) -> Self {
        Self {
            catalog,
            cooldown: Duration::seconds(cooldown_secs),
            last_cast: DashMap::new(),
        }
    }

    /// Cast the line. Enforces the per-user cooldown, then rolls a catch
    /// from the weighted table.
    pub fn cast(
        &self,
        guild_id: u64,
        user_id: u64,
        rng: &mut impl Rng,
    ) -> Result<Catch, FishingError> {
        let now = Utc::now();
        let key = (guild_id, user_id);

        if let Some(last) = self.last_cast.get(&key) {
            let retry_at = *last + self.cooldown;
            if now < retry_at {
                return Err(FishingError::OnCooldown { retry_at });
            }
        }

        let entry = self.roll_entry(rng)?;
        let value = if entry.max_value > entry.min_value {
            rng.gen_range(entry.min_value..=entry.max_value)
        } else {
            entry.min_value
        };

        // Only start the cooldown once a catch was actually rolled
        self.last_cast.insert(key, now);

        Ok(Catch {
            name: entry.name.clone(),
            emoji: entry.emoji.clone(),
            value: value.max(0),
            flavor: entry.flavor.clone(),
        })
    }

    pub fn cooldown_remaining(&self, guild_id: u64, user_id: u64) -> Option<Duration> {
        let last = *self.last_cast.get(&(guild_id, user_id))?;
        let remaining = (last + self.cooldown) - Utc::now();
        (remaining > Duration::zero()).then_some(remaining)
    }

    fn roll_entry(&self, rng: &mut impl Rng) -> Result<&CatchEntry, FishingError> {
        let total: u64 = self.catalog.catches.iter().map(|c| c.weight as u64).sum();
        if total == 0 {
            return Err(FishingError::EmptyCatalog);
        }

        let mut pick = rng.gen_range(0..total);
        for entry in &self.catalog.catches {
            let w = entry.weight as u64;
            if pick < w {
                return Ok(entry);
            }
            pick -= w;
        }
        // Unreachable with total > 0; fall back to the last entry
        self.catalog
            .catches
            .last()
            .ok_or(FishingError::EmptyCatalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn catalog() -> FishingCatalog {
        FishingCatalog {
            catches: vec![
                CatchEntry {
                    name: "Minnow".into(),
                    emoji: "🐟".into(),
                    min_value: 5,
                    max_value: 15,
                    weight: 80,
                    flavor: None,
                },
                CatchEntry {
                    name: "Golden Koi".into(),
                    emoji: "🎏".into(),
                    min_value: 200,
                    max_value: 400,
                    weight: 5,
                    flavor: Some("It shimmers.".into()),
                },
                CatchEntry {
                    name: "Old Boot".into(),
                    emoji: "🥾".into(),
                    min_value: 0,
                    max_value: 0,
                    weight: 15,
                    flavor: None,
                },
            ],
        }
    }

    #[test]
    fn cast_rolls_a_catch_within_its_value_range() {
        let svc = FishingService::new(catalog(), 30);
        let mut rng = StdRng::seed_from_u64(1);

        let c = svc.cast(1, 10, &mut rng).unwrap();
        match c.name.as_str() {
            "Minnow" => assert!((5..=15).contains(&c.value)),
            "Golden Koi" => assert!((200..=400).contains(&c.value)),
            "Old Boot" => assert_eq!(c.value, 0),
            other => panic!("unknown catch {other}"),
        }
    }

    #[test]
    fn second_cast_hits_the_cooldown() {
        let svc = FishingService::new(catalog(), 30);
        let mut rng = StdRng::seed_from_u64(1);

        svc.cast(1, 10, &mut rng).unwrap();
        let err = svc.cast(1, 10, &mut rng).unwrap_err();
        assert!(matches!(err, FishingError::OnCooldown { .. }));
        assert!(svc.cooldown_remaining(1, 10).is_some());

        // A different user in the same guild is unaffected
        assert!(svc.cast(1, 11, &mut rng).is_ok());
    }

    #[test]
    fn zero_cooldown_allows_back_to_back_casts() {
        let svc = FishingService::new(catalog(), 0);
        let mut rng = StdRng::seed_from_u64(1);
        svc.cast(1, 10, &mut rng).unwrap();
        svc.cast(1, 10, &mut rng).unwrap();
        assert!(svc.cooldown_remaining(1, 10).is_none());
    }

    #[test]
    fn weighted_roll_respects_the_table() {
        let svc = FishingService::new(catalog(), 0);
        let mut rng = StdRng::seed_from_u64(42);

        let mut minnows = 0;
        let mut kois = 0;
        for _ in 0..2_000 {
            let c = svc.cast(1, 10, &mut rng).unwrap();
            match c.name.as_str() {
                "Minnow" => minnows += 1,
                "Golden Koi" => kois += 1,
                _ => {}
            }
        }
        // 80% vs 5% by weight; leave generous slack for the seed
        assert!(minnows > 1_200, "minnows: {minnows}");
        assert!(kois < 300, "kois: {kois}");
        assert!(kois > 0);
    }

    #[test]
    fn empty_catalog_is_an_error() {
        let svc = FishingService::new(FishingCatalog { catches: vec![] }, 0);
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            svc.cast(1, 10, &mut rng).unwrap_err(),
            FishingError::EmptyCatalog
        ));
    }
}
