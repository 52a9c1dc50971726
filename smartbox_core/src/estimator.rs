//! Two-phase consumption estimation over a box's reading history.
//!
//! Learning mode fits an ordinary least-squares line of fill percent against
//! effective elapsed days. Steady-state mode takes an exponentially weighted
//! mean of per-interval daily rates (half-life configurable, ~7 days). Both
//! operate on a window that restarts at the most recent inferred refill, and
//! both excise holiday days from the time axis: an interval wholly inside
//! holiday days is dropped together with its fill delta, a partially covered
//! interval keeps its delta over the shrunken time span.

use chrono::{DateTime, Utc};
use smartbox_traits::model::{BoxId, HolidayPeriod, Reading, SmartBox};

use crate::config::EstimatorCfg;
use crate::engine::SmartBoxEngine;
use crate::error::Result;
use crate::holiday;

const EPS: f64 = 1e-9;
const SECS_PER_DAY: f64 = 86_400.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Confidence {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EstimateMode {
    Learning,
    SteadyState,
}

/// Derived consumption state for one box. Recomputed on demand, never stored.
#[derive(Debug, Clone)]
pub struct ConsumptionEstimate {
    /// Daily depletion rate, percent of a bag per day. Never negative.
    pub rate_pct_per_day: f64,
    /// Estimated days until the fill reaches the reorder threshold. `None`
    /// when no consumption is detected (rate ~ 0); negative when the fill is
    /// already at or past the threshold.
    pub days_to_threshold: Option<f64>,
    pub confidence: Confidence,
    pub mode: EstimateMode,
}

impl ConsumptionEstimate {
    fn idle(mode: EstimateMode, confidence: Confidence) -> Self {
        Self {
            rate_pct_per_day: 0.0,
            days_to_threshold: None,
            confidence,
            mode,
        }
    }
}

/// Whether the step from `prev` to `next` looks like a refill (restock).
///
/// A refill has no explicit event in the telemetry; any fill rise of at least
/// `jump_pct` points between consecutive readings is taken as one. Smaller
/// rises are left in place (the detector flags them as anomalies).
pub fn is_refill_jump(prev: &Reading, next: &Reading, jump_pct: f64) -> bool {
    next.fill_pct - prev.fill_pct >= jump_pct
}

/// Index of the first reading after the most recent refill jump, i.e. the
/// start of the current consumption window.
fn post_refill_start(readings: &[Reading], jump_pct: f64) -> usize {
    let mut start = 0;
    for i in 1..readings.len() {
        if is_refill_jump(&readings[i - 1], &readings[i], jump_pct) {
            start = i;
        }
    }
    start
}

/// One consecutive-reading interval after holiday excision.
#[derive(Debug, Clone, Copy)]
struct Segment {
    end_at: DateTime<Utc>,
    /// Elapsed days with holiday overlap removed. Always > 0.
    eff_days: f64,
    /// Fill drop over the interval, percent points. Negative for a sub-refill
    /// rise.
    drop_pct: f64,
}

fn segments(
    readings: &[Reading],
    holidays: &[HolidayPeriod],
    box_id: BoxId,
) -> Vec<Segment> {
    let mut out = Vec::with_capacity(readings.len().saturating_sub(1));
    for pair in readings.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        let raw_days = (b.recorded_at - a.recorded_at).num_seconds() as f64 / SECS_PER_DAY;
        if raw_days <= EPS {
            // Duplicate or out-of-order timestamps carry no usable interval.
            continue;
        }
        let suppressed =
            holiday::suppressed_overlap_days(holidays, box_id, a.recorded_at, b.recorded_at);
        let eff_days = raw_days - suppressed;
        if eff_days <= EPS {
            // Interval wholly inside holiday days: excised, delta and all.
            continue;
        }
        out.push(Segment {
            end_at: b.recorded_at,
            eff_days,
            drop_pct: a.fill_pct - b.fill_pct,
        });
    }
    out
}

/// OLS slope of fill percent vs effective elapsed days, f64 for stability.
/// Returns the non-negative consumption rate (fill only decreases between
/// top-ups; a positive fitted slope clamps to zero).
fn regression_rate(first_fill: f64, segs: &[Segment]) -> f64 {
    // Rebuild the excised series: (cumulative effective days, adjusted fill).
    let mut t = 0.0;
    let mut f = first_fill;
    let mut pts = Vec::with_capacity(segs.len() + 1);
    pts.push((t, f));
    for s in segs {
        t += s.eff_days;
        f -= s.drop_pct;
        pts.push((t, f));
    }
    if pts.len() < 2 {
        return 0.0;
    }

    let n = pts.len() as f64;
    let mean_x: f64 = pts.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y: f64 = pts.iter().map(|p| p.1).sum::<f64>() / n;
    let mut sxx = 0.0;
    let mut sxy = 0.0;
    for (x, y) in &pts {
        let dx = x - mean_x;
        sxx += dx * dx;
        sxy += dx * (y - mean_y);
    }
    if !sxx.is_finite() || sxx <= EPS {
        return 0.0;
    }
    let slope = sxy / sxx;
    (-slope).max(0.0)
}

/// Exponentially weighted mean of per-interval daily rates, newest weighted
/// highest. Sub-refill rises count as zero consumption.
fn ewma_rate(segs: &[Segment], now: DateTime<Utc>, half_life_days: f64) -> f64 {
    let mut num = 0.0;
    let mut den = 0.0;
    for s in segs {
        let age_days = ((now - s.end_at).num_seconds() as f64 / SECS_PER_DAY).max(0.0);
        let w = 0.5_f64.powf(age_days / half_life_days) * s.eff_days;
        let rate = (s.drop_pct / s.eff_days).max(0.0);
        num += w * rate;
        den += w;
    }
    if den <= EPS { 0.0 } else { num / den }
}

/// Compute the consumption estimate for one box.
///
/// `readings` must be ordered oldest to newest (the store contract). The
/// caller windows them to the configured rolling horizon.
pub fn estimate(
    bx: &SmartBox,
    readings: &[Reading],
    holidays: &[HolidayPeriod],
    now: DateTime<Utc>,
    cfg: &EstimatorCfg,
) -> ConsumptionEstimate {
    let start = post_refill_start(readings, cfg.refill_jump_pct);
    let window = &readings[start..];
    if window.len() < 2 {
        return ConsumptionEstimate::idle(EstimateMode::Learning, Confidence::Low);
    }

    let segs = segments(window, holidays, bx.id);
    let eff_span: f64 = segs.iter().map(|s| s.eff_days).sum();

    let age_days = (now - bx.activated_at).num_days();
    let learning = age_days < cfg.learning_days
        || window.len() < cfg.min_readings
        || eff_span < cfg.min_span_days;

    let (mode, confidence, rate) = if learning {
        let rate = regression_rate(window[0].fill_pct, &segs);
        (EstimateMode::Learning, Confidence::Low, rate)
    } else {
        let rate = ewma_rate(&segs, now, cfg.ewma_half_life_days);
        let confidence = if eff_span >= cfg.high_confidence_days {
            Confidence::High
        } else {
            Confidence::Medium
        };
        (EstimateMode::SteadyState, confidence, rate)
    };

    let days_to_threshold = if rate > EPS {
        Some((bx.fill_pct - bx.threshold_pct) / rate)
    } else {
        // No consumption detected: no depletion date, threshold-crossing
        // triggers only.
        None
    };

    ConsumptionEstimate {
        rate_pct_per_day: rate,
        days_to_threshold,
        confidence,
        mode,
    }
}

impl<S, N, T> SmartBoxEngine<S, N, T>
where
    S: smartbox_traits::Store,
    N: smartbox_traits::Notifier,
    T: smartbox_traits::TierLookup,
{
    /// Recompute the consumption estimate for a box from its stored history.
    pub fn estimate_box(&self, box_id: BoxId) -> Result<ConsumptionEstimate> {
        let bx = self.load_box(box_id)?;
        let (readings, holidays) = self.history_for(&bx)?;
        Ok(estimate(
            &bx,
            &readings,
            &holidays,
            self.now(),
            &self.cfg.estimator,
        ))
    }
}
