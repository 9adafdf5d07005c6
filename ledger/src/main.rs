//! BloodTrack ledger demo.
//!
//! Walks three units through the ledger against the in-memory store:
//!
//! - U1: all screening passes and the unit is released
//! - U2: one screening fails and the unit is quarantined
//! - U3: never tested, expires once its expiration has passed
//!
//! # Running
//!
//! ```bash
//! RUST_LOG=info,bloodtrack_ledger=debug cargo run --bin bloodtrack-demo
//! ```
//!
//! Configuration is read from `LEDGER_*` environment variables (see
//! [`LedgerConfig::from_env`]). Prometheus metrics are printed at the end.

#![allow(missing_docs)]

use anyhow::Context;
use bloodtrack_core::environment::Clock;
use bloodtrack_ledger::metrics::install_prometheus;
use bloodtrack_ledger::{
    AboGroup, Actor, BloodType, ComponentType, Donation, FacilityId, InMemoryDonationRegistry,
    LedgerConfig, PersonId, Provenance, ResultStatus, RhFactor, ScreeningResult, StaffId, TestCode,
    TypingResult, UnitId, UnitLedger, retry_on_conflict,
};
use bloodtrack_testing::{InMemoryEventBus, InMemoryEventStore, ManualClock};
use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const SCREENING_PANEL: [&str; 4] = ["HBsAg", "HCV", "HIV", "Syphilis"];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,bloodtrack_ledger=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let metrics = install_prometheus().context("installing Prometheus recorder")?;

    let config = LedgerConfig::from_env();
    tracing::info!(?config, "Starting BloodTrack ledger demo");

    let clock = ManualClock::new(Utc::now());
    let donations = InMemoryDonationRegistry::new();
    let bus = InMemoryEventBus::new();
    let retry = config.retry.policy();
    let topic = config.event_topic.clone();

    let ledger = UnitLedger::new(
        Arc::new(InMemoryEventStore::new()),
        Arc::new(clock.clone()),
        Arc::new(donations.clone()),
        config,
    )
    .with_event_bus(Arc::new(bus.clone()));

    let ping = ledger.ping();
    tracing::info!(status = %ping.status, service = %ping.service, "Ping");

    let facility = FacilityId::new();
    let technologist = StaffId::new();
    let provenance = || Provenance::new(facility, technologist, clock.now());
    let donation = donations.insert(Donation::new(PersonId::new(), facility, clock.now()));

    // U1: released
    let u1 = ledger
        .register_unit(donation, ComponentType::RedCells, clock.now() + Duration::days(42))
        .await?;
    ledger.begin_testing(u1, technologist.into()).await?;
    ledger
        .record_typing_result(
            u1,
            TypingResult::new(
                "gel-card",
                BloodType::new(AboGroup::O, RhFactor::Negative),
                ResultStatus::Passed,
                provenance(),
            ),
        )
        .await?;
    for code in SCREENING_PANEL {
        ledger
            .record_screening_result(u1, ScreeningResult::new(TestCode::new(code)?, ResultStatus::Passed, provenance()))
            .await?;
    }
    let outcome = retry_on_conflict(&retry, || ledger.evaluate_and_transition(u1, Actor::System)).await?;
    tracing::info!(?outcome, "U1 evaluated");

    // U2: quarantined
    let u2 = ledger
        .register_unit(donation, ComponentType::Plasma, clock.now() + Duration::days(365))
        .await?;
    ledger.begin_testing(u2, technologist.into()).await?;
    for code in SCREENING_PANEL {
        let status = if code == "HBsAg" { ResultStatus::Failed } else { ResultStatus::Passed };
        ledger
            .record_screening_result(u2, ScreeningResult::new(TestCode::new(code)?, status, provenance()))
            .await?;
    }
    let outcome = retry_on_conflict(&retry, || ledger.evaluate_and_transition(u2, Actor::System)).await?;
    tracing::info!(?outcome, "U2 evaluated");

    // U3: expired before testing started
    let u3 = ledger
        .register_unit(donation, ComponentType::Platelets, clock.now() + Duration::days(5))
        .await?;
    if let Err(error) = ledger.expire(u3).await {
        tracing::info!(%error, "U3 not yet expirable");
    }
    clock.advance(Duration::days(6));
    ledger.expire(u3).await?;

    for (label, unit_id) in [("U1", u1), ("U2", u2), ("U3", u3)] {
        print_history(&ledger, label, unit_id).await?;
    }

    println!("\nPublished to {topic}: {} events", bus.published_to(&topic).len());
    println!("\n{}", metrics.render());
    Ok(())
}

async fn print_history(ledger: &UnitLedger, label: &str, unit_id: UnitId) -> anyhow::Result<()> {
    let status = ledger.current_status(unit_id).await?;
    println!("\n{label} ({unit_id}) is {status}");
    for event in ledger.history(unit_id).await? {
        let from = event.from_status.map_or_else(|| "-".to_string(), |s| s.to_string());
        let note = event.note.as_deref().unwrap_or("");
        println!(
            "  {}  {from:>11} -> {:<11} {:<11} by {}  {note}",
            event.occurred_at.format("%Y-%m-%d %H:%M:%S"),
            event.to_status.as_str(),
            event.reason.as_str(),
            event.actor,
        );
    }
    Ok(())
}
