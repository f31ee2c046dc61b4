#![deny(warnings)]

//! Rival company behavior.
//!
//! Each quarter every rival takes exactly one move against the player:
//! squeezing market share, stealing the spotlight, or poaching talent. All
//! draws come from the caller's RNG so rival turns replay deterministically
//! under a fixed seed.

use rand::Rng;
use sim_core::{GameState, LogEvent, SCORE_MAX};
use tracing::debug;

/// Rival valuations never drift below this floor.
pub const RIVAL_VALUATION_FLOOR: i64 = 1_500_000;

/// Runs one move per rival, in roster order, appending narrative events to
/// `log`. Mutates the targeted market, the player's reputation/morale, and
/// the acting rival's stats.
pub fn rival_turns<R: Rng>(state: &mut GameState, rng: &mut R, log: &mut Vec<LogEvent>) {
    for i in 0..state.rivals.len() {
        let roll: f64 = rng.gen();
        let target = rng.gen_range(0..state.markets.len());

        if roll < 0.33 {
            let squeeze = rng.gen_range(1.5..3.8);
            state.markets[target].adjust_player_share(-squeeze, 95.0);
            let factor = rng.gen_range(1.02..1.05);
            let market_name = state.markets[target].name.clone();
            let rival = &mut state.rivals[i];
            rival.valuation = (rival.valuation as f64 * factor).round() as i64;
            rival.narrative = format!("Flooded {market_name} with promos.");
            debug!(rival = %rival.name, market = %market_name, squeeze, "rival squeezed share");
            log.push(LogEvent::negative(format!(
                "{} floods {market_name} with promotions.",
                rival.name
            )));
        } else if roll < 0.66 {
            let steal = rng.gen_range(1.2..2.4);
            state.adjust_reputation(-2.0);
            state.markets[target].adjust_player_share(-steal, 95.0);
            let rival = &mut state.rivals[i];
            rival.reputation = (rival.reputation + 3.0).clamp(0.0, SCORE_MAX);
            rival.narrative = "Captured headlines with a flashy reveal.".to_string();
            debug!(rival = %rival.name, steal, "rival stole the spotlight");
            log.push(LogEvent::warning(format!(
                "{} steals your spotlight with a retro-futuristic reveal.",
                rival.name
            )));
        } else {
            let morale_hit = rng.gen_range(3.0..6.0);
            state.adjust_morale(-morale_hit);
            let rival = &mut state.rivals[i];
            rival.morale = (rival.morale + 2.0).clamp(0.0, SCORE_MAX);
            rival.narrative = "Poached a key technomancer from your labs.".to_string();
            debug!(rival = %rival.name, morale_hit, "rival poached talent");
            log.push(LogEvent::negative(format!(
                "{} poaches a key technomancer. Morale suffers.",
                rival.name
            )));
        }

        // Independent valuation drift on top of whatever the move did.
        let drift = 1.0 + (rng.gen::<f64>() - 0.45) * 0.08;
        let rival = &mut state.rivals[i];
        rival.valuation = ((rival.valuation as f64 * drift).round() as i64).max(RIVAL_VALUATION_FLOOR);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use sim_core::validate_state;

    fn fresh(seed: u64) -> (GameState, ChaCha8Rng) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let state = GameState::new(&mut rng);
        (state, rng)
    }

    #[test]
    fn turns_are_deterministic_for_a_seed() {
        let (mut a, mut rng_a) = fresh(42);
        let (mut b, mut rng_b) = fresh(42);
        let mut log_a = Vec::new();
        let mut log_b = Vec::new();
        rival_turns(&mut a, &mut rng_a, &mut log_a);
        rival_turns(&mut b, &mut rng_b, &mut log_b);
        assert_eq!(a, b);
        assert_eq!(log_a, log_b);
    }

    #[test]
    fn every_rival_moves_once() {
        let (mut state, mut rng) = fresh(7);
        let mut log = Vec::new();
        rival_turns(&mut state, &mut rng, &mut log);
        assert_eq!(log.len(), state.rivals.len());
        for rival in &state.rivals {
            assert_ne!(rival.narrative, "Scheming in the neon shadows...");
        }
    }

    proptest! {
        #[test]
        fn invariants_survive_rival_turns(seed in 0u64..500) {
            let (mut state, mut rng) = fresh(seed);
            let mut log = Vec::new();
            for _ in 0..8 {
                rival_turns(&mut state, &mut rng, &mut log);
            }
            prop_assert!(validate_state(&state).is_ok());
            for rival in &state.rivals {
                prop_assert!(rival.valuation >= RIVAL_VALUATION_FLOOR);
                prop_assert!((0.0..=SCORE_MAX).contains(&rival.reputation));
                prop_assert!((0.0..=SCORE_MAX).contains(&rival.morale));
            }
            prop_assert!((0.0..=SCORE_MAX).contains(&state.morale));
            prop_assert!((0.0..=SCORE_MAX).contains(&state.reputation));
        }
    }
}
