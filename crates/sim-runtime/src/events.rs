//! The random event deck.
//!
//! Once per quarter, with 60% probability, one of seven global events fires
//! and perturbs the state. Events draw from the caller's RNG so quarters
//! stay reproducible.

use rand::Rng;
use serde::{Deserialize, Serialize};
use sim_core::{GameState, LogEvent};
use tracing::debug;

/// The seven global events that can hit the company.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    DotMatrixBuzz,
    ArcadeExpoTriumph,
    HardwareShortage,
    TalentExodus,
    CollectorCraze,
    RetroRegulations,
    ArcReactorBreakthrough,
}

/// Draw order for the uniform pick.
pub const EVENT_DECK: [EventKind; 7] = [
    EventKind::DotMatrixBuzz,
    EventKind::ArcadeExpoTriumph,
    EventKind::HardwareShortage,
    EventKind::TalentExodus,
    EventKind::CollectorCraze,
    EventKind::RetroRegulations,
    EventKind::ArcReactorBreakthrough,
];

impl EventKind {
    pub fn name(self) -> &'static str {
        match self {
            EventKind::DotMatrixBuzz => "Dot Matrix Buzz",
            EventKind::ArcadeExpoTriumph => "Arcade Expo Triumph",
            EventKind::HardwareShortage => "Hardware Shortage",
            EventKind::TalentExodus => "Talent Exodus",
            EventKind::CollectorCraze => "Collector Craze",
            EventKind::RetroRegulations => "Retro Regulations",
            EventKind::ArcReactorBreakthrough => "Arc Reactor Breakthrough",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            EventKind::DotMatrixBuzz => "RetroTech magazine features your founder on the cover.",
            EventKind::ArcadeExpoTriumph => "Your booth steals the spotlight with neon vapor trails.",
            EventKind::HardwareShortage => "A supply chain hiccup limits chip availability.",
            EventKind::TalentExodus => "Rival recruiters stalk your break room.",
            EventKind::CollectorCraze => "Collectors bid on your limited edition hardware.",
            EventKind::RetroRegulations => "New compliance paperwork bogs everyone down.",
            EventKind::ArcReactorBreakthrough => "Your labs pioneer a dazzling power efficiency trick.",
        }
    }
}

/// Rolls the 60% trigger and, when it fires, draws one event uniformly and
/// applies it.
pub(crate) fn process_random_event<R: Rng>(
    state: &mut GameState,
    rng: &mut R,
    log: &mut Vec<LogEvent>,
) {
    if rng.gen::<f64>() < 0.6 {
        let kind = EVENT_DECK[rng.gen_range(0..EVENT_DECK.len())];
        debug!(event = kind.name(), "random event fired");
        log.push(LogEvent::system(format!(
            "[Event] {}: {}",
            kind.name(),
            kind.description()
        )));
        apply_event(kind, state, rng, log);
    }
}

/// Applies one event's effect to the state.
pub fn apply_event<R: Rng>(
    kind: EventKind,
    state: &mut GameState,
    rng: &mut R,
    log: &mut Vec<LogEvent>,
) {
    match kind {
        EventKind::DotMatrixBuzz => {
            state.adjust_reputation(7.0);
            state.adjust_morale(4.0);
            log.push(LogEvent::positive("RetroTech cover story boosts your brand aura."));
        }
        EventKind::ArcadeExpoTriumph => {
            for market in &mut state.markets {
                let gain = 1.8 + rng.gen_range(0.0..2.0);
                market.adjust_player_share(gain, 95.0);
            }
            state.revenue += 120_000;
            log.push(LogEvent::positive("Arcade Expo crowds chant your name. Orders spike."));
        }
        EventKind::HardwareShortage => {
            // The one event with a guard: nothing to disrupt without products.
            if state.products.is_empty() {
                log.push(LogEvent::warning(
                    "Hardware shortage looms, but you have no hardware products yet.",
                ));
                return;
            }
            let penalty = (90_000.0 + rng.gen_range(0.0_f64..60_000.0)).round() as i64;
            state.expenses += penalty;
            state.cash -= penalty;
            state.adjust_innovation(-4.0);
            log.push(LogEvent::negative("Component shortage hikes costs and slows R&D."));
        }
        EventKind::TalentExodus => {
            state.adjust_morale(-6.0);
            state.adjust_reputation(-3.0);
            log.push(LogEvent::negative("A rival poaches a beloved engineer. Team morale dips."));
        }
        EventKind::CollectorCraze => {
            let bonus = (100_000.0 + rng.gen_range(0.0_f64..90_000.0)).round() as i64;
            state.cash += bonus;
            state.revenue += (bonus as f64 * 0.4).round() as i64;
            log.push(LogEvent::positive("Collectors flock to your neon hardware. Cash surges."));
        }
        EventKind::RetroRegulations => {
            let drag = (60_000.0 + rng.gen_range(0.0_f64..40_000.0)).round() as i64;
            state.expenses += drag;
            state.cash -= drag;
            log.push(LogEvent::warning("Regulators demand extra filings. Expenses climb."));
        }
        EventKind::ArcReactorBreakthrough => {
            state.adjust_innovation(9.0);
            state.revenue += 90_000;
            log.push(LogEvent::positive("Breakthrough tech electrifies investors."));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use sim_core::{validate_state, LogTone, Product};

    fn fresh(seed: u64) -> (GameState, ChaCha8Rng) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let state = GameState::new(&mut rng);
        (state, rng)
    }

    #[test]
    fn hardware_shortage_is_a_noop_without_products() {
        let (mut state, mut rng) = fresh(1);
        let snapshot = state.clone();
        let mut log = Vec::new();
        apply_event(EventKind::HardwareShortage, &mut state, &mut rng, &mut log);
        assert_eq!(state, snapshot);
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].tone, LogTone::Warning);
    }

    #[test]
    fn hardware_shortage_bites_with_products() {
        let (mut state, mut rng) = fresh(2);
        state.products.push(Product {
            id: 1,
            name: "Neon Nexus OS".into(),
            market: "Cloud Computing".into(),
            quality: 80,
            base_revenue: 400_000,
            launched_turn: 0,
        });
        let cash_before = state.cash;
        let innovation_before = state.innovation;
        let mut log = Vec::new();
        apply_event(EventKind::HardwareShortage, &mut state, &mut rng, &mut log);
        assert!(state.cash < cash_before);
        assert!(state.expenses > 0);
        assert_eq!(state.innovation, innovation_before - 4.0);
        assert_eq!(log.last().unwrap().tone, LogTone::Negative);
    }

    #[test]
    fn expo_triumph_lifts_every_market() {
        let (mut state, mut rng) = fresh(3);
        let shares: Vec<f64> = state.markets.iter().map(|m| m.player_share).collect();
        let mut log = Vec::new();
        apply_event(EventKind::ArcadeExpoTriumph, &mut state, &mut rng, &mut log);
        for (market, before) in state.markets.iter().zip(shares) {
            assert!(market.player_share > before);
            assert!(market.player_share <= 95.0);
        }
        assert_eq!(state.revenue, 120_000);
        validate_state(&state).unwrap();
    }

    #[test]
    fn collector_craze_books_partial_revenue() {
        let (mut state, mut rng) = fresh(4);
        let cash_before = state.cash;
        let mut log = Vec::new();
        apply_event(EventKind::CollectorCraze, &mut state, &mut rng, &mut log);
        let bonus = state.cash - cash_before;
        assert!((100_000..=190_000).contains(&bonus));
        assert_eq!(state.revenue, (bonus as f64 * 0.4).round() as i64);
    }

    #[test]
    fn deck_events_keep_state_valid() {
        for kind in EVENT_DECK {
            let (mut state, mut rng) = fresh(5);
            let mut log = Vec::new();
            apply_event(kind, &mut state, &mut rng, &mut log);
            validate_state(&state).unwrap();
            assert!(!log.is_empty());
        }
    }
}
