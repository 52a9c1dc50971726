//! Reading ingest: validate one telemetry sample, append it, and advance the
//! box's cached current-state fields.
//!
//! The cache (`fill_pct`, `battery_pct`, `last_reading_at`) is a materialized
//! view over the reading stream with a monotonicity guard: out-of-order
//! samples land in history but only a newer `recorded_at` moves the cache.
//! Ingest never invokes the decision engine; callers evaluate explicitly (or
//! the daily sweep does), so bulk backfills cannot storm the ledger.

use chrono::{DateTime, Duration, Utc};
use smartbox_traits::model::{AlertKind, BoxStatus, Reading, ReadingId};
use smartbox_traits::{Notifier, Store, TierLookup};

use crate::engine::SmartBoxEngine;
use crate::error::{EngineError, Report, Result, collab_err};

/// Tolerated clock skew for `recorded_at` timestamps ahead of now.
pub const CLOCK_SKEW_TOLERANCE: Duration = Duration::minutes(5);

fn validate_sample(
    fill_pct: f64,
    battery_pct: Option<f64>,
    recorded_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<()> {
    let reject = |msg: String| Err(Report::new(EngineError::Validation(msg)));
    if !(0.0..=100.0).contains(&fill_pct) || !fill_pct.is_finite() {
        return reject(format!("fill percent {fill_pct} outside [0, 100]"));
    }
    if let Some(b) = battery_pct
        && (!(0.0..=100.0).contains(&b) || !b.is_finite())
    {
        return reject(format!("battery percent {b} outside [0, 100]"));
    }
    if recorded_at > now + CLOCK_SKEW_TOLERANCE {
        return reject(format!(
            "recorded_at {recorded_at} is in the future beyond skew tolerance"
        ));
    }
    Ok(())
}

impl<S, N, T> SmartBoxEngine<S, N, T>
where
    S: Store,
    N: Notifier,
    T: TierLookup,
{
    /// Store one telemetry sample for a box and return it.
    ///
    /// Fails with `Validation` on out-of-range percents or a timestamp beyond
    /// the clock-skew tolerance, and with `NotFound` for an unknown box; in
    /// both cases nothing is written.
    pub fn ingest_reading(
        &self,
        box_id: smartbox_traits::model::BoxId,
        fill_pct: f64,
        battery_pct: Option<f64>,
        recorded_at: DateTime<Utc>,
    ) -> Result<Reading> {
        let now = self.now();
        validate_sample(fill_pct, battery_pct, recorded_at, now)?;
        let mut bx = self.load_box(box_id)?;

        let reading = Reading {
            id: ReadingId::new(),
            box_id,
            fill_pct,
            battery_pct,
            recorded_at,
        };
        self.store.append_reading(&reading).map_err(collab_err)?;

        // Monotonicity guard: last write wins by recorded_at.
        let newer = bx.last_reading_at.is_none_or(|t| recorded_at > t);
        if newer {
            bx.fill_pct = fill_pct;
            if battery_pct.is_some() {
                bx.battery_pct = battery_pct;
            }
            bx.last_reading_at = Some(recorded_at);
            if bx.status == BoxStatus::Offline {
                // Fresh telemetry brings an offline box back.
                bx.status = BoxStatus::Active;
                tracing::info!(%box_id, "box back online");
                self.auto_resolve_alert(box_id, AlertKind::Offline, "reading received")?;
            }
            self.store.put_box(&bx).map_err(collab_err)?;
        } else {
            tracing::debug!(%box_id, %recorded_at, "out-of-order reading; cache not advanced");
        }

        tracing::debug!(%box_id, fill_pct, cache_advanced = newer, "reading ingested");
        Ok(reading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn accepts_boundary_fill_values() {
        let now = Utc::now();
        validate_sample(0.0, None, now, now).unwrap();
        validate_sample(100.0, Some(0.0), now, now).unwrap();
    }

    #[test]
    fn rejects_out_of_range_and_non_finite() {
        let now = Utc::now();
        assert!(validate_sample(-0.1, None, now, now).is_err());
        assert!(validate_sample(100.1, None, now, now).is_err());
        assert!(validate_sample(f64::NAN, None, now, now).is_err());
        assert!(validate_sample(50.0, Some(101.0), now, now).is_err());
    }

    #[test]
    fn future_timestamp_allowed_within_skew_only() {
        let now = Utc::now();
        validate_sample(50.0, None, now + Duration::minutes(4), now).unwrap();
        assert!(validate_sample(50.0, None, now + Duration::minutes(6), now).is_err());
    }
}
