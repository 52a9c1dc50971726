//! Estimator behavior through the engine: mode transitions, holiday
//! excision, refill resets.

mod common;

use chrono::Duration;
use common::{BoxSpec, engine_at, feed_daily, seed_box, t0};
use smartbox_core::{Confidence, EstimateMode};

fn spec_active_since(days_ago: i64) -> BoxSpec {
    BoxSpec {
        fill_pct: 100.0,
        threshold_pct: 20.0,
        auto_reorder: false,
        activated_at: t0() - Duration::days(days_ago),
    }
}

#[test]
fn young_box_stays_in_learning_mode() {
    let (engine, clock) = engine_at(t0());
    let bx = seed_box(&engine, spec_active_since(0));
    feed_daily(&engine, &clock, bx.id, t0(), &[100.0, 97.0, 94.0, 91.0]);

    let est = engine.estimate_box(bx.id).unwrap();
    assert_eq!(est.mode, EstimateMode::Learning);
    assert_eq!(est.confidence, Confidence::Low);
    assert!((est.rate_pct_per_day - 3.0).abs() < 1e-6, "ols rate {}", est.rate_pct_per_day);
}

#[test]
fn fourteen_days_of_data_leaves_learning_mode() {
    let (engine, clock) = engine_at(t0());
    let bx = seed_box(&engine, spec_active_since(0));
    // 15 samples spanning exactly 14 days, steady 2%/day, no refills.
    let fills: Vec<f64> = (0..15).map(|i| 100.0 - 2.0 * i as f64).collect();
    feed_daily(&engine, &clock, bx.id, t0(), &fills);

    let est = engine.estimate_box(bx.id).unwrap();
    assert_eq!(est.mode, EstimateMode::SteadyState);
    assert_eq!(est.confidence, Confidence::High);
    assert!((est.rate_pct_per_day - 2.0).abs() < 1e-6);
}

#[test]
fn short_history_is_medium_confidence_in_steady_state() {
    let (engine, clock) = engine_at(t0());
    // Box activated long ago, but only a week of post-refill history.
    let bx = seed_box(&engine, spec_active_since(60));
    let fills: Vec<f64> = (0..8).map(|i| 90.0 - 2.0 * i as f64).collect();
    feed_daily(&engine, &clock, bx.id, t0(), &fills);

    let est = engine.estimate_box(bx.id).unwrap();
    assert_eq!(est.mode, EstimateMode::SteadyState);
    assert_eq!(est.confidence, Confidence::Medium);
}

#[test]
fn no_consumption_yields_no_depletion_date() {
    let (engine, clock) = engine_at(t0());
    let bx = seed_box(&engine, spec_active_since(60));
    feed_daily(&engine, &clock, bx.id, t0(), &[80.0; 10]);

    let est = engine.estimate_box(bx.id).unwrap();
    assert_eq!(est.rate_pct_per_day, 0.0);
    assert_eq!(est.days_to_threshold, None);
}

#[test]
fn refill_restarts_the_window() {
    let (engine, clock) = engine_at(t0());
    let bx = seed_box(&engine, spec_active_since(60));
    // 4%/day before the refill, 1%/day after it. Only the post-refill
    // stretch may inform the rate.
    let fills = [
        40.0, 36.0, 32.0, 28.0, // old regime
        100.0, 99.0, 98.0, 97.0, 96.0, 95.0, 94.0, // post-refill regime
    ];
    feed_daily(&engine, &clock, bx.id, t0(), &fills);

    let est = engine.estimate_box(bx.id).unwrap();
    assert!(
        (est.rate_pct_per_day - 1.0).abs() < 0.05,
        "post-refill rate {}",
        est.rate_pct_per_day
    );
}

#[test]
fn holiday_days_are_excised_from_rate_estimation() {
    use chrono::{TimeZone, Utc};

    // Midnight-aligned samples so each interval covers exactly one calendar
    // day; the five holiday-day intervals are then excised whole.
    let start = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
    let (engine, clock) = engine_at(start);
    let bx = seed_box(
        &engine,
        BoxSpec {
            fill_pct: 100.0,
            threshold_pct: 20.0,
            auto_reorder: false,
            activated_at: start - Duration::days(60),
        },
    );

    // 2%/day outside the holiday; 10% drains during the Mar 7-11 closure
    // anyway (deep clean plus staff tasting).
    let with_holiday = [
        90.0, 88.0, 86.0, 84.0, 82.0, 80.0, 78.0, // Mar 1-7, 2%/day
        75.0, 73.0, 71.0, 69.0, 68.0, // Mar 8-12: 10% inside the holiday
        66.0, 64.0, 62.0, 60.0, // Mar 13-16, 2%/day again
    ];
    engine
        .add_holiday(
            bx.company_id,
            None,
            start.date_naive() + Duration::days(6),
            start.date_naive() + Duration::days(10),
            "deep clean",
        )
        .unwrap();

    feed_daily(&engine, &clock, bx.id, start, &with_holiday);
    let est = engine.estimate_box(bx.id).unwrap();

    // Equal to the rate with those 5 days and their 10% drop removed from
    // the series entirely.
    assert!(
        (est.rate_pct_per_day - 2.0).abs() < 1e-6,
        "excised rate {}",
        est.rate_pct_per_day
    );
    assert_eq!(est.mode, EstimateMode::SteadyState);
}
