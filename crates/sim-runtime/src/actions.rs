//! Player action handlers.
//!
//! Every action follows the two-phase contract: [`validate`] commits nothing
//! and [`apply`] mutates the state only after validation has passed. A
//! rejected action leaves the state untouched.

use rand::Rng;
use serde::{Deserialize, Serialize};
use sim_core::{format_money, GameState, Loan, LogEvent, Product, LOAN_RATE, PLAYER_SHARE_MAX};
use tracing::debug;

use crate::Rejection;

/// Cash cost of launching a product.
pub const LAUNCH_COST: i64 = 200_000;
/// Cash cost of a marketing blitz.
pub const MARKETING_COST: i64 = 100_000;
/// Cash cost of hiring elite talent.
pub const HIRE_COST: i64 = 75_000;
/// Cash cost of an R&D sprint.
pub const RESEARCH_COST: i64 = 60_000;

/// A discrete player-invoked operation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Action {
    /// Launch a product into the named market.
    LaunchProduct { market: String },
    MarketingBlitz,
    HireTalent,
    ResearchSprint,
    /// Borrow `amount` from the retro bank at the fixed rate.
    SecureLoan { amount: i64 },
    /// Pay `amount` toward outstanding loans, FIFO.
    ServiceDebt { amount: i64 },
    /// Resolve the quarter. The only action allowed with an empty budget.
    AdvanceQuarter,
}

fn ensure_budget(state: &GameState) -> Result<(), Rejection> {
    if state.actions_remaining == 0 {
        return Err(Rejection::NoActionsRemaining);
    }
    Ok(())
}

fn ensure_cash(state: &GameState, required: i64) -> Result<(), Rejection> {
    if state.cash < required {
        return Err(Rejection::InsufficientCash { required, available: state.cash });
    }
    Ok(())
}

/// Checks whether `action` may be applied to `state` without changing it.
pub fn validate(state: &GameState, action: &Action) -> Result<(), Rejection> {
    if state.game_over {
        return Err(Rejection::GameOver);
    }
    match action {
        Action::AdvanceQuarter => Ok(()),
        Action::LaunchProduct { market } => {
            ensure_budget(state)?;
            if state.market(market).is_none() {
                return Err(Rejection::UnknownMarket(market.clone()));
            }
            ensure_cash(state, LAUNCH_COST)
        }
        Action::MarketingBlitz => {
            ensure_budget(state)?;
            ensure_cash(state, MARKETING_COST)
        }
        Action::HireTalent => {
            ensure_budget(state)?;
            ensure_cash(state, HIRE_COST)
        }
        Action::ResearchSprint => {
            ensure_budget(state)?;
            ensure_cash(state, RESEARCH_COST)
        }
        Action::SecureLoan { amount } => {
            ensure_budget(state)?;
            sim_econ::validate_loan_amount(*amount)?;
            Ok(())
        }
        Action::ServiceDebt { amount } => {
            if state.debt <= 0 {
                return Err(Rejection::NoOutstandingDebt);
            }
            ensure_budget(state)?;
            sim_econ::validate_payment(*amount)?;
            // Payments clamp to the outstanding total before the cash check.
            ensure_cash(state, (*amount).min(state.debt))
        }
    }
}

fn spend_action(state: &mut GameState, log: &mut Vec<LogEvent>) {
    state.actions_remaining = state.actions_remaining.saturating_sub(1);
    if state.actions_remaining == 0 {
        log.push(LogEvent::system(
            "Command console cooling down. Advance the quarter to refresh actions.",
        ));
    }
}

/// Applies a previously validated action. Market lookups are still checked
/// so the function stays total even on a stale action.
pub(crate) fn apply<R: Rng>(
    state: &mut GameState,
    rng: &mut R,
    action: &Action,
    log: &mut Vec<LogEvent>,
) -> Result<(), Rejection> {
    match action {
        Action::LaunchProduct { market } => launch_product(state, rng, market, log),
        Action::MarketingBlitz => {
            marketing_blitz(state, rng, log);
            Ok(())
        }
        Action::HireTalent => {
            hire_talent(state, rng, log);
            Ok(())
        }
        Action::ResearchSprint => {
            research_sprint(state, rng, log);
            Ok(())
        }
        Action::SecureLoan { amount } => {
            secure_loan(state, *amount, log);
            Ok(())
        }
        Action::ServiceDebt { amount } => {
            service_debt(state, *amount, log);
            Ok(())
        }
        // Handled by the engine; kept unreachable-free by doing nothing.
        Action::AdvanceQuarter => Ok(()),
    }
}

fn launch_product<R: Rng>(
    state: &mut GameState,
    rng: &mut R,
    market_name: &str,
    log: &mut Vec<LogEvent>,
) -> Result<(), Rejection> {
    let base_value = state
        .market(market_name)
        .map(|m| m.base_value)
        .ok_or_else(|| Rejection::UnknownMarket(market_name.to_string()))?;

    state.cash -= LAUNCH_COST;
    let quality = (60.0 + rng.gen_range(0.0..30.0) + state.innovation * 0.25).round() as i64;
    let base_revenue = (base_value as f64 * rng.gen_range(0.05..0.11)).round() as i64;
    let id = state.next_product_id();
    let name = state.draw_product_name(rng);
    state.products.push(Product {
        id,
        name: name.clone(),
        market: market_name.to_string(),
        quality,
        base_revenue,
        launched_turn: state.turn,
    });

    let share_gain = 6.0 + quality as f64 / 18.0 + state.reputation / 25.0;
    if let Some(market) = state.market_mut(market_name) {
        market.adjust_player_share(share_gain, PLAYER_SHARE_MAX);
    }
    state.adjust_innovation(5.0 + rng.gen_range(0.0..3.0));
    state.adjust_reputation(4.0 + rng.gen_range(0.0..2.0));

    debug!(product = %name, market = market_name, quality, "launched product");
    log.push(LogEvent::positive(format!(
        "Product launch success! {name} hits {market_name}."
    )));
    spend_action(state, log);
    Ok(())
}

fn marketing_blitz<R: Rng>(state: &mut GameState, rng: &mut R, log: &mut Vec<LogEvent>) {
    state.cash -= MARKETING_COST;
    let rep_gain = rng.gen_range(6.0_f64..11.0).round();
    let morale_gain = rng.gen_range(3.0_f64..6.0).round();
    state.adjust_reputation(rep_gain);
    state.adjust_morale(morale_gain);
    for market in &mut state.markets {
        let boost = rng.gen_range(0.6..1.6);
        market.adjust_player_share(boost, 95.0);
    }
    log.push(LogEvent::positive(format!(
        "Marketing blitz dazzles the airwaves. Reputation +{rep_gain}, morale +{morale_gain}."
    )));
    spend_action(state, log);
}

fn hire_talent<R: Rng>(state: &mut GameState, rng: &mut R, log: &mut Vec<LogEvent>) {
    state.cash -= HIRE_COST;
    let innovation_boost = rng.gen_range(5.0..9.0);
    let morale_boost = rng.gen_range(5.0..8.0);
    state.adjust_innovation(innovation_boost);
    state.adjust_morale(morale_boost);
    // Better engineers lift every shipped product's revenue base.
    for product in &mut state.products {
        product.base_revenue =
            (product.base_revenue as f64 * (1.0 + innovation_boost / 140.0)).round() as i64;
    }
    log.push(LogEvent::positive(
        "Legendary engineers join Technopoly. Innovation soars.",
    ));
    spend_action(state, log);
}

fn research_sprint<R: Rng>(state: &mut GameState, rng: &mut R, log: &mut Vec<LogEvent>) {
    state.cash -= RESEARCH_COST;
    let innovation_gain = rng.gen_range(7.0..12.0);
    let hype_boost = rng.gen_range(0.03..0.08);
    state.adjust_innovation(innovation_gain);
    for market in &mut state.markets {
        market.hype = (market.hype + hype_boost - market.volatility * 0.02).clamp(0.35, 1.4);
    }
    log.push(LogEvent::positive(
        "R&D labs glow electric blue. Innovation leaps forward.",
    ));
    spend_action(state, log);
}

fn secure_loan(state: &mut GameState, amount: i64, log: &mut Vec<LogEvent>) {
    state.cash += amount;
    state.loans.push(Loan { amount, rate: LOAN_RATE });
    state.recompute_debt();
    log.push(LogEvent::system(format!(
        "Loan secured for {} at 8% APR.",
        format_money(amount)
    )));
    spend_action(state, log);
}

fn service_debt(state: &mut GameState, amount: i64, log: &mut Vec<LogEvent>) {
    let payment = amount.min(state.debt);
    state.cash -= payment;
    let applied = sim_econ::repay_fifo(&mut state.loans, payment);
    state.recompute_debt();
    log.push(LogEvent::positive(format!(
        "Paid {} toward outstanding loans.",
        format_money(applied)
    )));
    spend_action(state, log);
}
