#![deny(warnings)]

//! Headless CLI for the Technopoly simulation.
//!
//! Runs a seeded engine with a small scripted policy, prints the narrative
//! log as it unfolds, and finishes with a KPI summary line.

use anyhow::Result;
use sim_core::{format_money, LogEvent, LogTone};
use sim_runtime::{Action, Engine, SimConfig};
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

fn parse_args() -> (u64, u32) {
    let mut seed = 42u64;
    let mut quarters = 40u32;
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--seed" => {
                if let Some(value) = it.next().and_then(|s| s.parse().ok()) {
                    seed = value;
                }
            }
            "--quarters" => {
                if let Some(value) = it.next().and_then(|s| s.parse().ok()) {
                    quarters = value;
                }
            }
            _ => {}
        }
    }
    (seed, quarters)
}

fn tone_tag(tone: LogTone) -> &'static str {
    match tone {
        LogTone::System => "  ",
        LogTone::Positive => "++",
        LogTone::Negative => "--",
        LogTone::Warning => "!!",
    }
}

fn print_log(events: &[LogEvent]) {
    for event in events {
        println!("{} {}", tone_tag(event.tone), event.message);
    }
}

/// Tiny scripted policy: expand while flush, tend debt, market otherwise.
fn choose_action(engine: &Engine) -> Option<Action> {
    let state = engine.state();
    if state.actions_remaining == 0 || state.game_over {
        return None;
    }
    if state.cash >= 400_000 {
        let market = state
            .markets
            .iter()
            .max_by(|a, b| a.hype.total_cmp(&b.hype))?;
        return Some(Action::LaunchProduct { market: market.name.clone() });
    }
    if state.debt > 0 && state.cash >= 250_000 {
        return Some(Action::ServiceDebt { amount: 50_000 });
    }
    if state.cash >= 200_000 {
        return Some(Action::MarketingBlitz);
    }
    if state.cash >= 150_000 {
        return Some(Action::HireTalent);
    }
    if state.cash < 100_000 && state.debt == 0 {
        return Some(Action::SecureLoan { amount: 200_000 });
    }
    None
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::INFO)
        .init();

    let (seed, quarters) = parse_args();
    info!(seed, quarters, "starting headless run");

    let mut engine = Engine::new(SimConfig { rng_seed: seed });
    for _ in 0..quarters {
        while let Some(action) = choose_action(&engine) {
            match engine.perform(action) {
                Ok(events) => print_log(&events),
                Err(rejection) => {
                    info!(%rejection, "action rejected");
                    break;
                }
            }
        }
        match engine.perform(Action::AdvanceQuarter) {
            Ok(events) => print_log(&events),
            Err(rejection) => {
                info!(%rejection, "run concluded");
                break;
            }
        }
        if engine.state().game_over {
            break;
        }
    }

    let state = engine.state();
    println!(
        "KPI | Y{} Q{} | cash {} | valuation {} | debt {} | morale {:.0} | innovation {:.0} | reputation {:.0} | products {} | outcome {:?}",
        state.year,
        state.quarter,
        format_money(state.cash),
        format_money(state.valuation),
        format_money(state.debt),
        state.morale,
        state.innovation,
        state.reputation,
        state.products.len(),
        state.outcome
    );

    Ok(())
}
