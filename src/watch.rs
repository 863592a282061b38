//! Simulated watch telemetry
//!
//! Produces a randomized snapshot of biometric, location and activity data
//! for a character, sampled from the character's watch data pool. The random
//! source is always injected so tests can seed it.

use crate::catalog::{Catalog, LogEntry, WatchDataPool};
use rand::seq::{IndexedRandom, SliceRandom};
use rand::Rng;
use serde::Serialize;
use std::ops::RangeInclusive;

/// Heart rate bounds (bpm)
pub const HEART_RATE: RangeInclusive<u32> = 65..=110;
/// Respiration rate bounds (breaths per minute)
pub const RESPIRATION_RATE: RangeInclusive<u32> = 14..=22;
/// Body temperature bounds (°C)
pub const TEMPERATURE: RangeInclusive<f64> = 36.1..=37.2;

/// Maximum entries sampled from the call pool
pub const CALL_SAMPLE: usize = 2;
/// Maximum entries sampled from the message pool
pub const MESSAGE_SAMPLE: usize = 2;
/// Maximum entries sampled from the search pool
pub const SEARCH_SAMPLE: usize = 4;

/// An ephemeral telemetry snapshot shown beside a chat
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WatchSnapshot {
    pub heart_rate: u32,
    pub respiration_rate: u32,
    /// Rounded to one decimal place
    pub temperature: f64,
    pub location: Option<String>,
    pub calls: Vec<LogEntry>,
    pub messages: Vec<LogEntry>,
    pub searches: Vec<String>,
}

/// Generate a snapshot from a pool
///
/// Subsets are drawn without replacement; a pool smaller than the sample
/// size yields all of its entries.
///
/// # Examples
///
/// ```
/// use pwice::catalog::Catalog;
/// use pwice::watch::generate;
///
/// let catalog = Catalog::embedded().unwrap();
/// let snapshot = generate(catalog.pool_for("jo-jun-jae"), &mut rand::rng());
/// assert!(snapshot.calls.len() <= 2);
/// ```
pub fn generate<R: Rng + ?Sized>(pool: &WatchDataPool, rng: &mut R) -> WatchSnapshot {
    let heart_rate = rng.random_range(HEART_RATE);
    let respiration_rate = rng.random_range(RESPIRATION_RATE);
    let temperature = round_tenths(rng.random_range(TEMPERATURE));
    let location = pool.locations.choose(rng).cloned();

    WatchSnapshot {
        heart_rate,
        respiration_rate,
        temperature,
        location,
        calls: sample(&pool.calls, CALL_SAMPLE, rng),
        messages: sample(&pool.messages, MESSAGE_SAMPLE, rng),
        searches: sample(&pool.searches, SEARCH_SAMPLE, rng),
    }
}

/// Generate a snapshot for a character id
///
/// Unknown ids and characters without a pool use the catalog's default pool.
pub fn snapshot_for<R: Rng + ?Sized>(
    catalog: &Catalog,
    character_id: &str,
    rng: &mut R,
) -> WatchSnapshot {
    if !catalog.has_pool(character_id) {
        tracing::debug!(character_id, "No watch pool, using default");
    }
    generate(catalog.pool_for(character_id), rng)
}

fn sample<T: Clone, R: Rng + ?Sized>(pool: &[T], amount: usize, rng: &mut R) -> Vec<T> {
    let mut shuffled = pool.to_vec();
    shuffled.shuffle(rng);
    shuffled.truncate(amount);
    shuffled
}

// Clamped because rounding 37.2x up must not leave the range.
fn round_tenths(value: f64) -> f64 {
    let rounded = (value * 10.0).round() / 10.0;
    rounded.clamp(*TEMPERATURE.start(), *TEMPERATURE.end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Direction;
    use crate::test_utils::test_catalog;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn entry(name: &str) -> LogEntry {
        LogEntry {
            name: name.to_string(),
            direction: Direction::Incoming,
            content: "c".to_string(),
        }
    }

    #[test]
    fn test_snapshot_values_within_bounds() {
        let catalog = test_catalog();
        let mut rng = StdRng::seed_from_u64(7);
        for c in catalog.characters() {
            for _ in 0..200 {
                let s = snapshot_for(&catalog, &c.id, &mut rng);
                assert!(HEART_RATE.contains(&s.heart_rate));
                assert!(RESPIRATION_RATE.contains(&s.respiration_rate));
                assert!(TEMPERATURE.contains(&s.temperature));
                assert_eq!((s.temperature * 10.0).round() / 10.0, s.temperature);
                assert!(s.calls.len() <= CALL_SAMPLE);
                assert!(s.messages.len() <= MESSAGE_SAMPLE);
                assert!(s.searches.len() <= SEARCH_SAMPLE);
            }
        }
    }

    #[test]
    fn test_samples_come_from_character_pool() {
        let catalog = test_catalog();
        let pool = catalog.pool_for("im-se-chan");
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..50 {
            let s = snapshot_for(&catalog, "im-se-chan", &mut rng);
            assert!(pool.locations.contains(s.location.as_ref().unwrap()));
            assert!(s.calls.iter().all(|c| pool.calls.contains(c)));
            assert!(s.messages.iter().all(|m| pool.messages.contains(m)));
            assert!(s.searches.iter().all(|q| pool.searches.contains(q)));
        }
    }

    #[test]
    fn test_unknown_character_uses_default_pool() {
        let catalog = test_catalog();
        let default = catalog.pool_for("pil-do-seop");
        let mut rng = StdRng::seed_from_u64(3);
        let s = snapshot_for(&catalog, "ghost", &mut rng);
        assert!(default.locations.contains(s.location.as_ref().unwrap()));
        assert!(s.searches.iter().all(|q| default.searches.contains(q)));
    }

    #[test]
    fn test_sampling_without_replacement() {
        let pool = WatchDataPool {
            calls: vec![entry("a"), entry("b"), entry("c")],
            searches: (0..10).map(|i| i.to_string()).collect(),
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..100 {
            let s = generate(&pool, &mut rng);
            assert_eq!(s.calls.len(), 2);
            assert_ne!(s.calls[0], s.calls[1]);
            let mut searches = s.searches.clone();
            searches.sort();
            searches.dedup();
            assert_eq!(searches.len(), SEARCH_SAMPLE);
        }
    }

    #[test]
    fn test_small_pool_returns_everything() {
        let pool = WatchDataPool {
            messages: vec![entry("only")],
            searches: vec!["one".to_string(), "two".to_string()],
            ..Default::default()
        };
        let s = generate(&pool, &mut StdRng::seed_from_u64(1));
        assert_eq!(s.messages, vec![entry("only")]);
        assert_eq!(s.searches.len(), 2);
        assert!(s.calls.is_empty());
        assert_eq!(s.location, None);
    }

    #[test]
    fn test_round_tenths() {
        assert_eq!(round_tenths(36.14), 36.1);
        assert_eq!(round_tenths(36.96), 37.0);
        assert_eq!(round_tenths(37.2), 37.2);
    }
}
