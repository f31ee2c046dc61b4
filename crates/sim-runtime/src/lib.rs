#![deny(warnings)]

//! Simulation engine for Technopoly.
//!
//! Owns the [`GameState`] aggregate and a seeded RNG stream, exposes the
//! player actions through a two-phase validate/perform contract, and runs
//! the quarterly advance that composes the market model, the finances, the
//! event deck, and the rival AI. Everything is synchronous: one action or
//! quarter advance runs to completion before the next may begin.

mod actions;
mod events;

pub use actions::{Action, HIRE_COST, LAUNCH_COST, MARKETING_COST, RESEARCH_COST};
pub use events::{apply_event, EventKind, EVENT_DECK};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use sim_core::{
    format_money, update_market_narratives, GameState, LogEvent, Outcome, ACTIONS_PER_QUARTER,
};
use sim_econ::FinanceError;
use thiserror::Error;
use tracing::info;

/// Losing cash floor: drop to or below this and the company collapses.
pub const LOSS_CASH_FLOOR: i64 = -350_000;
/// Losing morale floor.
pub const LOSS_MORALE_FLOOR: f64 = 5.0;
/// Losing debt ceiling.
pub const LOSS_DEBT_CEILING: i64 = 1_500_000;
/// Winning valuation threshold.
pub const WIN_VALUATION: i64 = 75_000_000;
/// Winning reputation threshold.
pub const WIN_REPUTATION: f64 = 92.0;

/// Engine configuration.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct SimConfig {
    /// Seed for the deterministic RNG stream.
    pub rng_seed: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self { rng_seed: 0 }
    }
}

/// Why an action was refused. Rejections never mutate state and none are
/// fatal; the presentation layer surfaces the message and moves on.
#[derive(Debug, Error, PartialEq)]
pub enum Rejection {
    #[error("simulation concluded; restart to continue")]
    GameOver,
    #[error("no command cycles remain this quarter; advance the clock")]
    NoActionsRemaining,
    #[error("insufficient cash: need {required}, have {available}")]
    InsufficientCash { required: i64, available: i64 },
    #[error("unknown market: {0}")]
    UnknownMarket(String),
    #[error("loan amount {0} outside 50,000..=500,000")]
    LoanOutOfRange(i64),
    #[error("invalid payment amount {0}")]
    InvalidPayment(i64),
    #[error("no outstanding debt to service")]
    NoOutstandingDebt,
}

impl From<FinanceError> for Rejection {
    fn from(err: FinanceError) -> Self {
        match err {
            FinanceError::LoanOutOfRange(amount) => Rejection::LoanOutOfRange(amount),
            FinanceError::InvalidPayment(amount) => Rejection::InvalidPayment(amount),
        }
    }
}

/// The simulation engine: state plus the seeded RNG stream that feeds every
/// randomized formula. Cloning yields an independent replayable copy.
#[derive(Clone, Debug)]
pub struct Engine {
    state: GameState,
    rng: ChaCha8Rng,
}

impl Engine {
    /// Builds a fresh engine; the config seed makes whole runs reproducible.
    pub fn new(config: SimConfig) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(config.rng_seed);
        let state = GameState::new(&mut rng);
        Self { state, rng }
    }

    /// Read-only snapshot of the full current state.
    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// JSON snapshot of the full current state, for display layers that
    /// prefer a serialized view.
    pub fn state_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.state)
    }

    /// Checks whether `action` would be accepted, committing nothing. This
    /// is the half of the contract a confirmation dialog calls before the
    /// player has confirmed anything.
    pub fn validate(&self, action: &Action) -> Result<(), Rejection> {
        actions::validate(&self.state, action)
    }

    /// Validates and applies `action`, returning the narrative events it
    /// produced. On rejection the state is left untouched.
    pub fn perform(&mut self, action: Action) -> Result<Vec<LogEvent>, Rejection> {
        actions::validate(&self.state, &action)?;
        let mut log = Vec::new();
        match &action {
            Action::AdvanceQuarter => advance_quarter(&mut self.state, &mut self.rng, &mut log),
            other => actions::apply(&mut self.state, &mut self.rng, other, &mut log)?,
        }
        Ok(log)
    }

    /// Discards the current run and reconstructs a fresh state. The only
    /// mutation permitted once the simulation has concluded.
    pub fn restart(&mut self) -> Vec<LogEvent> {
        self.state = GameState::new(&mut self.rng);
        info!("simulation restarted");
        vec![LogEvent::system(
            "Simulation rebooted. Technopoly returns to the neon frontier.",
        )]
    }
}

/// Resolves one fiscal quarter. The step order is normative; identical
/// state plus an identical RNG stream reproduces the identical result.
pub fn advance_quarter<R: Rng>(state: &mut GameState, rng: &mut R, log: &mut Vec<LogEvent>) {
    let unused = state.actions_remaining;
    if unused > 0 {
        log.push(LogEvent::system(format!(
            "Advancing with {unused} unused action(s)."
        )));
    }
    state.actions_remaining = ACTIONS_PER_QUARTER;
    state.quarter += 1;
    if state.quarter > 4 {
        state.quarter = 1;
        state.year += 1;
    }
    state.turn += 1;

    let mut total_revenue = 0.0;
    let mut total_expenses = 0.0;

    // Revenue and upkeep read the pre-erosion share; erosion and hype drift
    // follow within the same pass since markets are independent.
    for index in 0..state.markets.len() {
        let active = state
            .products
            .iter()
            .filter(|product| product.market == state.markets[index].name)
            .count();
        if active > 0 {
            total_revenue += sim_econ::market_revenue(&state.markets[index], state.innovation, rng);
            total_expenses += sim_econ::market_upkeep(active, state.markets[index].player_share);
        }

        let erosion_base = rng.gen_range(0.6..2.4) * state.markets[index].volatility * 2.6;
        let erosion = (erosion_base - state.reputation / 70.0).max(0.0);
        let innovation_drag = state.innovation / 240.0;
        let market = &mut state.markets[index];
        let previous_share = market.player_share;
        market.player_share =
            (market.player_share - erosion + innovation_drag).clamp(0.0, sim_core::PLAYER_SHARE_MAX);
        market.ai_share = (100.0 - market.player_share).max(0.0);
        market.last_delta = market.player_share - previous_share;

        let hype_drift = (rng.gen::<f64>() - 0.45) * market.volatility * 0.22;
        market.hype = (market.hype + hype_drift).clamp(0.35, 1.35);
    }

    let turn = state.turn;
    for product in &mut state.products {
        let jitter = rng.gen_range(0.98..1.06);
        let maturity = sim_econ::maturity_factor(turn, product.launched_turn);
        product.base_revenue = (product.base_revenue as f64 * jitter * maturity).round() as i64;
    }

    total_expenses += sim_econ::payroll(state.products.len(), state.morale);
    total_expenses += sim_econ::research_burn(state.innovation);

    let debt_service = sim_econ::quarterly_debt_service(&state.loans);
    total_expenses += debt_service as f64;
    state.last_debt_service = debt_service;

    state.revenue = total_revenue.round() as i64;
    state.expenses = total_expenses.round() as i64;
    state.cash += (total_revenue - total_expenses).round() as i64;

    if state.debt > 0 {
        state.recompute_debt();
    }

    state.adjust_morale(
        rng.gen_range(-4.0..3.0) + state.revenue as f64 / 600_000.0
            - debt_service as f64 / 90_000.0,
    );
    state.adjust_innovation(rng.gen_range(-2.0..3.0) + state.products.len() as f64 * 0.3);
    state.adjust_reputation(rng.gen_range(-1.0..2.0));

    events::process_random_event(state, rng, log);
    sim_ai::rival_turns(state, rng, log);

    state.valuation = sim_econ::company_valuation(state);
    update_market_narratives(state);
    state.recompute_debt();
    state.record_valuation();

    log.push(LogEvent::system(format!(
        "Quarter {} of {} processed. Revenue {} · Expenses {}.",
        state.quarter,
        state.year,
        format_money(state.revenue),
        format_money(state.expenses)
    )));
    info!(
        quarter = state.quarter,
        year = state.year,
        revenue = state.revenue,
        expenses = state.expenses,
        cash = state.cash,
        valuation = state.valuation,
        "quarter resolved"
    );

    evaluate_end_conditions(state, log);
}

/// Evaluates the terminal conditions. Collapse is checked before victory
/// and wins ties; short-circuits once the simulation has already concluded.
pub fn evaluate_end_conditions(state: &mut GameState, log: &mut Vec<LogEvent>) -> Option<Outcome> {
    if state.game_over {
        return state.outcome;
    }
    if state.cash <= LOSS_CASH_FLOOR
        || state.morale <= LOSS_MORALE_FLOOR
        || state.debt >= LOSS_DEBT_CEILING
    {
        state.game_over = true;
        state.outcome = Some(Outcome::Collapse);
        log.push(LogEvent::negative(
            "Cash reserves depleted and morale collapsed. The neon lights flicker out at Technopoly HQ.",
        ));
        return state.outcome;
    }
    if state.valuation >= WIN_VALUATION || state.reputation >= WIN_REPUTATION {
        state.game_over = true;
        state.outcome = Some(Outcome::Victory);
        log.push(LogEvent::positive(
            "Your retro-futuristic empire now dominates the silicon skyline. Investors chant your name.",
        ));
    }
    state.outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use sim_core::{validate_state, LOAN_RATE, MARKET_BLUEPRINT, STARTING_CASH};

    fn engine(seed: u64) -> Engine {
        Engine::new(SimConfig { rng_seed: seed })
    }

    #[test]
    fn launch_costs_exactly_and_consumes_one_action() {
        let mut engine = engine(42);
        let log = engine
            .perform(Action::LaunchProduct { market: "Cloud Computing".into() })
            .unwrap();
        assert_eq!(engine.state().cash, STARTING_CASH - LAUNCH_COST);
        assert_eq!(engine.state().actions_remaining, 1);
        assert_eq!(engine.state().products.len(), 1);
        assert!(!log.is_empty());
        validate_state(engine.state()).unwrap();
    }

    #[test]
    fn exhausted_budget_rejects_with_cash_unchanged() {
        let mut engine = engine(42);
        engine
            .perform(Action::LaunchProduct { market: "FinTech".into() })
            .unwrap();
        engine
            .perform(Action::LaunchProduct { market: "Cybersecurity".into() })
            .unwrap();
        assert_eq!(engine.state().actions_remaining, 0);
        let cash = engine.state().cash;
        let err = engine.perform(Action::LaunchProduct { market: "E-Commerce".into() });
        assert_eq!(err.unwrap_err(), Rejection::NoActionsRemaining);
        assert_eq!(engine.state().cash, cash);
    }

    #[test]
    fn loan_bounds_and_exact_credit() {
        let mut engine = engine(7);
        let err = engine.perform(Action::SecureLoan { amount: 600_000 });
        assert_eq!(err.unwrap_err(), Rejection::LoanOutOfRange(600_000));
        assert_eq!(engine.state().debt, 0);

        engine.perform(Action::SecureLoan { amount: 150_000 }).unwrap();
        assert_eq!(engine.state().cash, STARTING_CASH + 150_000);
        assert_eq!(engine.state().debt, 150_000);
        assert_eq!(engine.state().loans[0].rate, LOAN_RATE);
        validate_state(engine.state()).unwrap();
    }

    #[test]
    fn repayment_is_fifo_across_loans() {
        let mut engine = engine(9);
        engine.perform(Action::SecureLoan { amount: 50_000 }).unwrap();
        engine.perform(Action::SecureLoan { amount: 60_000 }).unwrap();
        engine.perform(Action::AdvanceQuarter).unwrap();
        engine.perform(Action::ServiceDebt { amount: 70_000 }).unwrap();
        assert_eq!(engine.state().loans.len(), 1);
        assert_eq!(engine.state().loans[0].amount, 40_000);
        assert_eq!(engine.state().debt, 40_000);
        validate_state(engine.state()).unwrap();
    }

    #[test]
    fn advance_resets_budget_and_rolls_calendar() {
        let mut engine = engine(3);
        engine.perform(Action::MarketingBlitz).unwrap();
        engine.perform(Action::HireTalent).unwrap();
        let log = engine.perform(Action::AdvanceQuarter).unwrap();
        assert_eq!(engine.state().actions_remaining, ACTIONS_PER_QUARTER);
        assert_eq!(engine.state().turn, 1);
        assert_eq!(engine.state().quarter, 2);
        assert!(log.iter().any(|e| e.message.contains("processed")));
        validate_state(engine.state()).unwrap();
    }

    #[test]
    fn year_wraps_after_fourth_quarter() {
        let mut engine = engine(4);
        for _ in 0..4 {
            engine.perform(Action::AdvanceQuarter).unwrap();
        }
        assert_eq!(engine.state().quarter, 1);
        assert_eq!(engine.state().year, 1985);
    }

    #[test]
    fn advance_with_unused_actions_notes_them() {
        let mut engine = engine(5);
        let log = engine.perform(Action::AdvanceQuarter).unwrap();
        assert!(log[0].message.contains("unused action"));
    }

    #[test]
    fn seeded_runs_are_deterministic() {
        let script = [
            Action::LaunchProduct { market: "Artificial Intelligence".into() },
            Action::MarketingBlitz,
            Action::AdvanceQuarter,
            Action::SecureLoan { amount: 200_000 },
            Action::AdvanceQuarter,
            Action::HireTalent,
            Action::AdvanceQuarter,
        ];
        let mut a = engine(1234);
        let mut b = engine(1234);
        for action in &script {
            let ra = a.perform(action.clone());
            let rb = b.perform(action.clone());
            assert_eq!(ra, rb);
        }
        assert_eq!(a.state(), b.state());
    }

    #[test]
    fn advance_quarter_is_a_pure_function_of_state_and_stream() {
        let mut seed_rng = rand_chacha::ChaCha8Rng::seed_from_u64(77);
        let base = GameState::new(&mut seed_rng);
        let mut state_a = base.clone();
        let mut state_b = base;
        let mut rng_a = rand_chacha::ChaCha8Rng::seed_from_u64(99);
        let mut rng_b = rand_chacha::ChaCha8Rng::seed_from_u64(99);
        let mut log_a = Vec::new();
        let mut log_b = Vec::new();
        advance_quarter(&mut state_a, &mut rng_a, &mut log_a);
        advance_quarter(&mut state_b, &mut rng_b, &mut log_b);
        assert_eq!(state_a, state_b);
        assert_eq!(log_a, log_b);
    }

    #[test]
    fn collapse_on_depleted_cash_then_rejects_everything() {
        let mut engine = engine(21);
        engine.state.cash = -400_000;
        engine.perform(Action::AdvanceQuarter).unwrap();
        assert!(engine.state().game_over);
        assert_eq!(engine.state().outcome, Some(Outcome::Collapse));

        let err = engine.perform(Action::AdvanceQuarter);
        assert_eq!(err.unwrap_err(), Rejection::GameOver);
        let err = engine.perform(Action::MarketingBlitz);
        assert_eq!(err.unwrap_err(), Rejection::GameOver);

        engine.restart();
        assert!(!engine.state().game_over);
        assert_eq!(engine.state().cash, STARTING_CASH);
    }

    #[test]
    fn victory_on_high_valuation() {
        let mut engine = engine(22);
        engine.state.cash = 100_000_000;
        engine.perform(Action::AdvanceQuarter).unwrap();
        assert!(engine.state().game_over);
        assert_eq!(engine.state().outcome, Some(Outcome::Victory));
    }

    #[test]
    fn loss_takes_priority_over_win() {
        let mut engine = engine(23);
        engine.state.cash = 100_000_000;
        engine.state.loans = vec![
            sim_core::Loan { amount: 500_000, rate: LOAN_RATE },
            sim_core::Loan { amount: 500_000, rate: LOAN_RATE },
            sim_core::Loan { amount: 500_000, rate: LOAN_RATE },
        ];
        engine.state.recompute_debt();
        engine.state.valuation = 80_000_000;
        let mut log = Vec::new();
        let outcome = evaluate_end_conditions(&mut engine.state, &mut log);
        assert_eq!(outcome, Some(Outcome::Collapse));
    }

    #[test]
    fn state_snapshot_serializes() {
        let engine = engine(31);
        let json = engine.state_json().unwrap();
        let back: GameState = serde_json::from_str(&json).unwrap();
        assert_eq!(&back, engine.state());
    }

    #[test]
    fn validate_commits_nothing() {
        let engine = engine(33);
        let snapshot = engine.state().clone();
        engine.validate(&Action::LaunchProduct { market: "FinTech".into() }).unwrap();
        engine
            .validate(&Action::SecureLoan { amount: 10 })
            .unwrap_err();
        assert_eq!(engine.state(), &snapshot);
    }

    fn arbitrary_action() -> impl Strategy<Value = Action> {
        (0usize..7, 0usize..MARKET_BLUEPRINT.len(), 25_000i64..600_000).prop_map(
            |(kind, market, amount)| match kind {
                0 => Action::LaunchProduct {
                    market: MARKET_BLUEPRINT[market].name.to_string(),
                },
                1 => Action::MarketingBlitz,
                2 => Action::HireTalent,
                3 => Action::ResearchSprint,
                4 => Action::SecureLoan { amount },
                5 => Action::ServiceDebt { amount },
                _ => Action::AdvanceQuarter,
            },
        )
    }

    proptest! {
        #[test]
        fn invariants_hold_under_arbitrary_action_sequences(
            seed in 0u64..200,
            script in proptest::collection::vec(arbitrary_action(), 1..30),
        ) {
            let mut engine = engine(seed);
            for action in script {
                let _ = engine.perform(action);
                prop_assert!(engine.state().actions_remaining <= ACTIONS_PER_QUARTER);
                prop_assert!(validate_state(engine.state()).is_ok());
            }
        }
    }
}
