#![deny(warnings)]

//! Financial models for the Technopoly simulation.
//!
//! Pure money math used by the quarterly advance and the action handlers:
//! per-market revenue with seeded noise, upkeep and payroll formulas, the
//! loan ledger, and company valuation scoring.

use rand::Rng;
use sim_core::{GameState, Loan, Market, VALUATION_FLOOR};
use thiserror::Error;
use tracing::debug;

/// Smallest loan the retro bank will write.
pub const LOAN_MIN: i64 = 50_000;
/// Largest loan the retro bank will write.
pub const LOAN_MAX: i64 = 500_000;

/// Errors produced by the financial helpers.
#[derive(Debug, Error, PartialEq)]
pub enum FinanceError {
    /// Loan principal must lie within [LOAN_MIN, LOAN_MAX].
    #[error("loan amount {0} outside 50,000..=500,000")]
    LoanOutOfRange(i64),
    /// Payments must be strictly positive.
    #[error("invalid payment amount {0}")]
    InvalidPayment(i64),
}

/// Revenue contributed by one market this quarter, given the player holds at
/// least one active product there. Reads the pre-erosion share. The noise
/// factor is drawn from `rng` so a seeded stream reproduces the quarter.
pub fn market_revenue<R: Rng>(market: &Market, innovation: f64, rng: &mut R) -> f64 {
    let hype_multiplier = 0.8 + market.hype * 0.6;
    let innovation_bonus = 0.6 + innovation / 160.0;
    let noise = rng.gen_range(0.82..1.14);
    let share_factor = market.player_share / 100.0;
    (market.base_value as f64 / 4.0) * share_factor * hype_multiplier * innovation_bonus * noise
}

/// Quarterly upkeep for one market with `active_products` player products.
pub fn market_upkeep(active_products: usize, player_share: f64) -> f64 {
    active_products as f64 * 52_000.0 + (player_share / 100.0) * 38_000.0
}

/// Quarterly payroll: a fixed base plus per-product staffing plus a morale
/// premium (happier teams cost more in perks).
pub fn payroll(product_count: usize, morale: f64) -> f64 {
    140_000.0 + product_count as f64 * 22_000.0 + morale * 600.0
}

/// Quarterly research burn, charged only above the 40-point innovation line.
pub fn research_burn(innovation: f64) -> f64 {
    ((innovation - 40.0) * 2_600.0).max(0.0)
}

/// Revenue maturity multiplier for a product: ramps 3% per quarter since
/// launch and saturates after six quarters.
pub fn maturity_factor(turn: u32, launched_turn: u32) -> f64 {
    let age = turn.saturating_sub(launched_turn).min(6);
    1.0 + age as f64 * 0.03
}

/// Total interest charged across the loan ledger for one quarter.
pub fn quarterly_debt_service(loans: &[Loan]) -> i64 {
    loans.iter().map(Loan::quarterly_interest).sum()
}

/// Validates a requested loan principal against the bank's bounds.
pub fn validate_loan_amount(amount: i64) -> Result<(), FinanceError> {
    if !(LOAN_MIN..=LOAN_MAX).contains(&amount) {
        return Err(FinanceError::LoanOutOfRange(amount));
    }
    Ok(())
}

/// Validates a debt payment for positivity. Clamping against outstanding
/// debt is the caller's concern since it needs the current ledger total.
pub fn validate_payment(amount: i64) -> Result<(), FinanceError> {
    if amount <= 0 {
        return Err(FinanceError::InvalidPayment(amount));
    }
    Ok(())
}

/// Applies a payment across the loan ledger in FIFO order, removing loans
/// that reach zero principal. Returns the amount actually applied, which is
/// at most the outstanding total.
pub fn repay_fifo(loans: &mut Vec<Loan>, payment: i64) -> i64 {
    let mut remaining = payment.max(0);
    for loan in loans.iter_mut() {
        if remaining == 0 {
            break;
        }
        let pay = loan.amount.min(remaining);
        loan.amount -= pay;
        remaining -= pay;
    }
    loans.retain(|loan| loan.amount > 0);
    let applied = payment.max(0) - remaining;
    debug!(applied, "applied debt payment");
    applied
}

/// Scores the company valuation from the current state: cash and revenue
/// weight, product book value, intangibles, and market positions. Floored
/// at [`VALUATION_FLOOR`] and deterministic given the state.
pub fn company_valuation(state: &GameState) -> i64 {
    let baseline = state.cash as f64 * 1.1 + state.revenue as f64 * 4.0;
    let product_value: f64 = state
        .products
        .iter()
        .map(|product| product.base_revenue as f64 * 6.0)
        .sum();
    let intangible = (state.reputation + state.innovation) * 9_500.0;
    let market_bonus: f64 = state
        .markets
        .iter()
        .map(|market| market.player_share * (market.base_value as f64 / 16.0))
        .sum();
    let score = (baseline + product_value + intangible + market_bonus).round() as i64;
    score.max(VALUATION_FLOOR)
}
