#![deny(warnings)]

//! Core domain models and invariants for the Technopoly simulation.
//!
//! This crate defines the serializable state aggregate shared across the
//! simulation, the fixed blueprints the world is built from, and validation
//! helpers that guarantee the basic invariants hold after every mutation.

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Number of player actions granted at the start of each quarter.
pub const ACTIONS_PER_QUARTER: u8 = 2;

/// Hard ceiling on the player's market share in any single market.
pub const PLAYER_SHARE_MAX: f64 = 96.0;

/// Upper bound for morale and reputation scores.
pub const SCORE_MAX: f64 = 100.0;

/// Upper bound for innovation. The various effects in the game all clamp
/// against this single ceiling.
pub const INNOVATION_MAX: f64 = 130.0;

/// Company valuation never drops below this floor.
pub const VALUATION_FLOOR: i64 = 1_000_000;

/// Valuation snapshots retained for the display trend; oldest drop first.
pub const HISTORY_CAP: usize = 96;

/// Annual interest rate for every loan the retro bank writes.
pub const LOAN_RATE: f64 = 0.08;

/// Cash on hand at the start of a fresh simulation.
pub const STARTING_CASH: i64 = 750_000;

/// Valuation of a freshly founded company.
pub const STARTING_VALUATION: i64 = 2_500_000;

/// Static description of a market before randomized setup.
pub struct MarketBlueprint {
    /// Unique market name, used as the foreign key from products.
    pub name: &'static str,
    /// Currency scale factor for the market's revenue potential.
    pub base_value: i64,
    /// Initial excitement multiplier.
    pub hype: f64,
    /// Drives the magnitude of random share erosion and hype drift.
    pub volatility: f64,
}

/// The eight markets the simulation is played across. Fixed after init.
pub const MARKET_BLUEPRINT: [MarketBlueprint; 8] = [
    MarketBlueprint { name: "Artificial Intelligence", base_value: 8_000_000, hype: 0.95, volatility: 0.35 },
    MarketBlueprint { name: "Cloud Computing", base_value: 6_500_000, hype: 0.82, volatility: 0.30 },
    MarketBlueprint { name: "Cybersecurity", base_value: 5_600_000, hype: 0.74, volatility: 0.28 },
    MarketBlueprint { name: "Enterprise SaaS", base_value: 5_000_000, hype: 0.68, volatility: 0.24 },
    MarketBlueprint { name: "E-Commerce", base_value: 5_400_000, hype: 0.71, volatility: 0.22 },
    MarketBlueprint { name: "Consumer Hardware", base_value: 4_700_000, hype: 0.62, volatility: 0.32 },
    MarketBlueprint { name: "FinTech", base_value: 5_900_000, hype: 0.77, volatility: 0.27 },
    MarketBlueprint { name: "Social Media", base_value: 5_200_000, hype: 0.70, volatility: 0.26 },
];

/// Pool of product names drawn without replacement at launch time.
pub const PRODUCT_NAMES: [&str; 20] = [
    "Neon Nexus OS",
    "HyperDrive Cloud",
    "SynthWave Console",
    "Circuit City CRM",
    "LaserLink Modem",
    "Chromatic AI Suite",
    "Quantum Pulse Chipset",
    "Midnight Matrix VR",
    "PixelPay Network",
    "RetroVision HUD",
    "Arcade Analytics",
    "Flux Capacitor Drive",
    "VaporChat Social",
    "TurboTape Backup",
    "Celestial Compute Grid",
    "IonBeam Robotics",
    "ByteRider Drone",
    "HoloSynth Entertainment",
    "Lumen Ledger",
    "Photon Courier Platform",
];

/// Static description of a rival company before randomized setup.
pub struct RivalBlueprint {
    pub name: &'static str,
    /// Flavor label shown next to the company.
    pub style: &'static str,
    /// Display color, opaque to the engine.
    pub color: &'static str,
}

/// The five AI-controlled competitors. Fixed after init.
pub const RIVAL_BLUEPRINT: [RivalBlueprint; 5] = [
    RivalBlueprint { name: "SynthDyne Systems", style: "Cutthroat", color: "#ff5db1" },
    RivalBlueprint { name: "NovaGrid Labs", style: "Visionary", color: "#00d7ff" },
    RivalBlueprint { name: "ByteForge Dynamics", style: "Efficient", color: "#ffd166" },
    RivalBlueprint { name: "Omnitech Verse", style: "Experimental", color: "#95ff8f" },
    RivalBlueprint { name: "Hyperion Signal", style: "Aggressive", color: "#ff8b5f" },
];

/// Tone tag attached to every narrative log event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogTone {
    System,
    Positive,
    Negative,
    Warning,
}

/// A human-readable narrative event emitted by the engine for display.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogEvent {
    pub message: String,
    pub tone: LogTone,
}

impl LogEvent {
    pub fn system(message: impl Into<String>) -> Self {
        Self { message: message.into(), tone: LogTone::System }
    }
    pub fn positive(message: impl Into<String>) -> Self {
        Self { message: message.into(), tone: LogTone::Positive }
    }
    pub fn negative(message: impl Into<String>) -> Self {
        Self { message: message.into(), tone: LogTone::Negative }
    }
    pub fn warning(message: impl Into<String>) -> Self {
        Self { message: message.into(), tone: LogTone::Warning }
    }
}

/// How a concluded simulation ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Victory,
    Collapse,
}

/// One of the abstract markets the player competes in.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Market {
    /// Unique name, stable for the lifetime of the simulation.
    pub name: String,
    /// Currency scale factor for revenue potential.
    pub base_value: i64,
    /// Excitement multiplier, nominally within [0.35, 1.4].
    pub hype: f64,
    /// Magnitude driver for random erosion and hype drift.
    pub volatility: f64,
    /// Player's share of the market, in [0, 96] percent.
    pub player_share: f64,
    /// Rivals' collective share, always derived as `max(0, 100 - player_share)`.
    pub ai_share: f64,
    /// Share change over the previous quarter, drives the trend indicator.
    pub last_delta: f64,
    /// Derived descriptive string, regenerated each quarter.
    pub narrative: String,
}

impl Market {
    /// Shifts the player's share by `delta`, clamps to `[0, cap]`, and
    /// rederives the rival share. Every share mutation goes through here so
    /// the `player_share + ai_share == 100` invariant cannot drift.
    pub fn adjust_player_share(&mut self, delta: f64, cap: f64) {
        self.player_share = (self.player_share + delta).clamp(0.0, cap);
        self.ai_share = (100.0 - self.player_share).max(0.0);
    }
}

/// A launched player product tied to a single market.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Unique id drawn from the state's monotonic counter.
    pub id: u64,
    pub name: String,
    /// Name of the market this product sells into.
    pub market: String,
    /// Build quality fixed at launch; feeds the initial share gain.
    pub quality: i64,
    /// Quarterly revenue base, grows via maturity bonus and jitter.
    pub base_revenue: i64,
    /// Turn index at creation, used for the maturity ramp.
    pub launched_turn: u32,
}

/// An outstanding debt instrument.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    /// Principal outstanding.
    pub amount: i64,
    /// Annual interest fraction.
    pub rate: f64,
}

impl Loan {
    /// Interest charged against this loan each quarter.
    pub fn quarterly_interest(&self) -> i64 {
        (self.amount as f64 * self.rate / 4.0).round() as i64
    }
}

/// An AI-controlled competitor with independently evolving stats.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rival {
    pub name: String,
    pub style: String,
    pub color: String,
    pub valuation: i64,
    pub reputation: f64,
    pub morale: f64,
    /// Description of the rival's most recent move.
    pub narrative: String,
}

/// The full mutable simulation aggregate. Constructed by [`GameState::new`]
/// and replaced wholesale on restart; never a hidden static.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub year: i32,
    /// Fiscal quarter in 1..=4.
    pub quarter: u8,
    /// Monotonic count of resolved quarters.
    pub turn: u32,
    /// Cash on hand; may go negative before the collapse threshold hits.
    pub cash: i64,
    /// Revenue booked by the most recent quarter advance.
    pub revenue: i64,
    /// Expenses booked by the most recent quarter advance.
    pub expenses: i64,
    /// Derived company valuation, floored at [`VALUATION_FLOOR`].
    pub valuation: i64,
    /// Derived sum of outstanding loan principals.
    pub debt: i64,
    /// Interest charged on the most recent advance.
    pub last_debt_service: i64,
    pub morale: f64,
    pub innovation: f64,
    pub reputation: f64,
    pub actions_remaining: u8,
    pub products: Vec<Product>,
    pub loans: Vec<Loan>,
    pub markets: Vec<Market>,
    pub rivals: Vec<Rival>,
    /// Name pool consumed without replacement; only ever shrinks.
    pub available_product_names: Vec<String>,
    /// Valuation trend, capped at [`HISTORY_CAP`] entries.
    pub history: Vec<i64>,
    pub game_over: bool,
    pub outcome: Option<Outcome>,
    next_product_id: u64,
}

impl GameState {
    /// Builds a fresh simulation start. Market shares and rival stats take
    /// their randomized setup draws from `rng`.
    pub fn new<R: Rng>(rng: &mut R) -> Self {
        let markets = MARKET_BLUEPRINT
            .iter()
            .map(|bp| {
                let player_share = rng.gen_range(3.0..9.0);
                Market {
                    name: bp.name.to_string(),
                    base_value: bp.base_value,
                    hype: bp.hype,
                    volatility: bp.volatility,
                    player_share,
                    ai_share: (100.0 - player_share).max(0.0),
                    last_delta: 0.0,
                    narrative: "Awaiting disruption...".to_string(),
                }
            })
            .collect();

        let rivals = RIVAL_BLUEPRINT
            .iter()
            .enumerate()
            .map(|(index, bp)| Rival {
                name: bp.name.to_string(),
                style: bp.style.to_string(),
                color: bp.color.to_string(),
                valuation: (3_500_000.0 + index as f64 * 950_000.0 + rng.gen_range(0.0..500_000.0))
                    .round() as i64,
                reputation: 55.0 + rng.gen_range(0.0..20.0),
                morale: 60.0 + rng.gen_range(0.0..20.0),
                narrative: "Scheming in the neon shadows...".to_string(),
            })
            .collect();

        debug!("constructed fresh simulation state");

        Self {
            year: 1984,
            quarter: 1,
            turn: 0,
            cash: STARTING_CASH,
            revenue: 0,
            expenses: 0,
            valuation: STARTING_VALUATION,
            debt: 0,
            last_debt_service: 0,
            morale: 68.0,
            innovation: 55.0,
            reputation: 48.0,
            actions_remaining: ACTIONS_PER_QUARTER,
            products: Vec::new(),
            loans: Vec::new(),
            markets,
            rivals,
            available_product_names: PRODUCT_NAMES.iter().map(|s| s.to_string()).collect(),
            history: vec![STARTING_VALUATION],
            game_over: false,
            outcome: None,
            next_product_id: 1,
        }
    }

    /// Looks up a market by its unique name.
    pub fn market(&self, name: &str) -> Option<&Market> {
        self.markets.iter().find(|m| m.name == name)
    }

    /// Mutable market lookup.
    pub fn market_mut(&mut self, name: &str) -> Option<&mut Market> {
        self.markets.iter_mut().find(|m| m.name == name)
    }

    /// Sum of outstanding loan principals.
    pub fn total_debt(&self) -> i64 {
        self.loans.iter().map(|loan| loan.amount).sum()
    }

    /// Rederives the `debt` field from the loan ledger.
    pub fn recompute_debt(&mut self) {
        self.debt = self.total_debt();
    }

    /// Hands out the next unique product id.
    pub fn next_product_id(&mut self) -> u64 {
        let id = self.next_product_id;
        self.next_product_id += 1;
        id
    }

    /// Draws a product name from the pool without replacement, falling back
    /// to a generated model number once the pool runs dry.
    pub fn draw_product_name<R: Rng>(&mut self, rng: &mut R) -> String {
        if self.available_product_names.is_empty() {
            return format!("Technopoly MK-{}", rng.gen_range(10..100));
        }
        let index = rng.gen_range(0..self.available_product_names.len());
        self.available_product_names.remove(index)
    }

    /// Appends a valuation snapshot, dropping the oldest past the cap.
    pub fn record_valuation(&mut self) {
        self.history.push(self.valuation);
        if self.history.len() > HISTORY_CAP {
            self.history.remove(0);
        }
    }

    pub fn adjust_morale(&mut self, delta: f64) {
        self.morale = (self.morale + delta).clamp(0.0, SCORE_MAX);
    }

    pub fn adjust_reputation(&mut self, delta: f64) {
        self.reputation = (self.reputation + delta).clamp(0.0, SCORE_MAX);
    }

    pub fn adjust_innovation(&mut self, delta: f64) {
        self.innovation = (self.innovation + delta).clamp(0.0, INNOVATION_MAX);
    }
}

/// Classifies a hype value into its display label. Boundary values resolve
/// to the higher bucket.
pub fn describe_hype(hype: f64) -> &'static str {
    if hype >= 1.05 {
        "Explosive"
    } else if hype >= 0.85 {
        "High"
    } else if hype >= 0.6 {
        "Steady"
    } else {
        "Cooling"
    }
}

/// Classifies a volatility value into its display label.
pub fn describe_volatility(volatility: f64) -> &'static str {
    if volatility >= 0.35 {
        "Wild"
    } else if volatility >= 0.28 {
        "Active"
    } else if volatility >= 0.22 {
        "Calm"
    } else {
        "Stable"
    }
}

/// Regenerates every market's narrative from its numeric state. Purely a
/// display derivation; touches nothing but the narrative fields.
pub fn update_market_narratives(state: &mut GameState) {
    for market in &mut state.markets {
        let hype_descriptor = describe_hype(market.hype);
        let share_descriptor = if market.player_share > 35.0 {
            "Your neon signage dominates expo floors."
        } else if market.player_share > 20.0 {
            "Growing cult following among enthusiasts."
        } else if market.player_share > 8.0 {
            "Rumblings of interest echo through forums."
        } else {
            "Presence minimal."
        };
        let movement = if market.last_delta > 0.3 {
            "Momentum rising."
        } else if market.last_delta < -0.3 {
            "Competitors press harder."
        } else {
            "Holding the line."
        };
        market.narrative = format!("{hype_descriptor} hype. {movement} {share_descriptor}");
    }
}

/// Formats a signed whole-dollar amount with thousands separators.
pub fn format_money(value: i64) -> String {
    let sign = if value < 0 { "-" } else { "" };
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{sign}${grouped}")
}

/// Violations of the state invariants.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// Player share must stay within [0, 96].
    #[error("market {0}: player share out of bounds")]
    ShareOutOfBounds(String),
    /// Rival share must equal `max(0, 100 - player_share)`.
    #[error("market {0}: ai share not derived from player share")]
    ShareSumMismatch(String),
    /// Recorded debt must equal the sum of loan principals.
    #[error("debt mismatch: recorded {recorded}, ledger {ledger}")]
    DebtMismatch { recorded: i64, ledger: i64 },
    /// Action budget must stay within {0, 1, 2}.
    #[error("action budget {0} out of range")]
    ActionBudgetOutOfRange(u8),
    /// Quarter must stay within 1..=4.
    #[error("quarter {0} out of range")]
    QuarterOutOfRange(u8),
    /// Valuation history must stay within its cap.
    #[error("history length {0} exceeds cap")]
    HistoryOverflow(usize),
}

/// Checks every structural invariant of the aggregate. Called from tests
/// after arbitrary mutation sequences.
pub fn validate_state(state: &GameState) -> Result<(), ValidationError> {
    for market in &state.markets {
        if !(0.0..=PLAYER_SHARE_MAX).contains(&market.player_share) {
            return Err(ValidationError::ShareOutOfBounds(market.name.clone()));
        }
        let expected = (100.0 - market.player_share).max(0.0);
        if (market.ai_share - expected).abs() > 1e-9 {
            return Err(ValidationError::ShareSumMismatch(market.name.clone()));
        }
    }
    let ledger = state.total_debt();
    if state.debt != ledger {
        return Err(ValidationError::DebtMismatch { recorded: state.debt, ledger });
    }
    if state.actions_remaining > ACTIONS_PER_QUARTER {
        return Err(ValidationError::ActionBudgetOutOfRange(state.actions_remaining));
    }
    if !(1..=4).contains(&state.quarter) {
        return Err(ValidationError::QuarterOutOfRange(state.quarter));
    }
    if state.history.len() > HISTORY_CAP {
        return Err(ValidationError::HistoryOverflow(state.history.len()));
    }
    Ok(())
}
