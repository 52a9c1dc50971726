//! Shared harness for engine integration tests.
// Not every test binary uses every helper.
#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use smartbox_core::mocks::{MemoryStore, RecordingNotifier, StaticTiers};
use smartbox_core::{EngineCfg, SmartBoxEngine};
use smartbox_traits::TestClock;
use smartbox_traits::model::{BagSize, BoxId, CompanyId, SmartBox};

pub type Engine = SmartBoxEngine<MemoryStore, RecordingNotifier, StaticTiers>;

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
}

pub fn engine_at(now: DateTime<Utc>) -> (Engine, TestClock) {
    engine_with(now, EngineCfg::default())
}

pub fn engine_with(now: DateTime<Utc>, cfg: EngineCfg) -> (Engine, TestClock) {
    let clock = TestClock::at(now);
    let engine = SmartBoxEngine::builder()
        .with_store(MemoryStore::default())
        .with_notifier(RecordingNotifier::default())
        .with_tiers(StaticTiers::default())
        .with_config(cfg)
        .with_clock(Arc::new(clock.clone()))
        .build()
        .unwrap();
    (engine, clock)
}

pub struct BoxSpec {
    pub fill_pct: f64,
    pub threshold_pct: f64,
    pub auto_reorder: bool,
    pub activated_at: DateTime<Utc>,
}

pub fn seed_box(engine: &Engine, spec: BoxSpec) -> SmartBox {
    let mut bx = SmartBox::new(CompanyId::new(), 2.0, BagSize::G500, spec.activated_at);
    bx.fill_pct = spec.fill_pct;
    bx.threshold_pct = spec.threshold_pct;
    bx.auto_reorder = spec.auto_reorder;
    engine.store().seed_box(bx.clone());
    bx
}

/// Ingest one reading per day starting at `start`. The clock is left at the
/// last sample's timestamp.
pub fn feed_daily(engine: &Engine, clock: &TestClock, box_id: BoxId, start: DateTime<Utc>, fills: &[f64]) {
    for (i, &fill) in fills.iter().enumerate() {
        let at = start + Duration::days(i as i64);
        clock.set(at);
        engine
            .ingest_reading(box_id, fill, Some(90.0), at)
            .expect("ingest");
    }
}
