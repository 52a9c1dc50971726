//! Offline and anomaly detection.
//!
//! Offline: an active box whose last reading (or activation, if it never
//! reported) is older than the configured window transitions to `Offline`,
//! gets a deduplicated warning alert, and the notification collaborator is
//! told once per new detection. Anomaly: the newest fill delta is compared
//! against the box's own history; an unexplained rise or an outlier beyond
//! the sigma gate raises an info alert without touching box status.

use chrono::Duration;
use smartbox_traits::model::{AlertKind, BoxId, BoxStatus, Severity};
use smartbox_traits::{Notifier, Store, TierLookup};

use crate::engine::SmartBoxEngine;
use crate::error::{EngineError, Report, Result, collab_err};

/// Mean and (population) standard deviation of a slice, f64 for stability.
fn mean_std(xs: &[f64]) -> (f64, f64) {
    if xs.is_empty() {
        return (0.0, 0.0);
    }
    let n = xs.len() as f64;
    let mean = xs.iter().sum::<f64>() / n;
    let var = xs.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}

impl<S, N, T> SmartBoxEngine<S, N, T>
where
    S: Store,
    N: Notifier,
    T: TierLookup,
{
    /// Check one active box for staleness. Returns true when the box newly
    /// transitioned to `Offline` in this call.
    pub fn check_offline(&self, box_id: BoxId) -> Result<bool> {
        // Detection mutates status and opens alerts, so it claims the same
        // per-box slot as reorder evaluation. Overlapping sweeps back off.
        let _guard = self
            .locks
            .try_acquire(box_id)
            .ok_or_else(|| Report::new(EngineError::ConcurrencyConflict(box_id.to_string())))?;

        let mut bx = self.load_box(box_id)?;
        if bx.status != BoxStatus::Active {
            return Ok(false);
        }
        let last_seen = bx.last_reading_at.unwrap_or(bx.activated_at);
        let now = self.now();
        let silent = now - last_seen;
        if silent <= Duration::hours(self.cfg.detector.offline_after_hours) {
            return Ok(false);
        }

        bx.status = BoxStatus::Offline;
        self.store.put_box(&bx).map_err(collab_err)?;
        tracing::warn!(%box_id, silent_hours = silent.num_hours(), "box offline");

        let (_, created) = self.open_or_touch_alert(
            &bx,
            AlertKind::Offline,
            Severity::Warning,
            "Box offline",
            &format!("no reading for {} hours", silent.num_hours()),
            serde_json::json!({
                "last_reading_at": bx.last_reading_at.map(|t| t.to_rfc3339()),
                "silent_hours": silent.num_hours(),
            }),
        )?;
        if created && let Err(e) = self.notifier.notify_offline(&bx) {
            tracing::warn!(%box_id, error = %e, "offline notification failed");
        }
        Ok(true)
    }

    /// Scan the newest reading delta of a box for anomalies. Returns true
    /// when an anomaly alert was opened or refreshed.
    pub fn check_anomalies(&self, box_id: BoxId) -> Result<bool> {
        let _guard = self
            .locks
            .try_acquire(box_id)
            .ok_or_else(|| Report::new(EngineError::ConcurrencyConflict(box_id.to_string())))?;

        let bx = self.load_box(box_id)?;
        let (readings, _) = self.history_for(&bx)?;
        let deltas: Vec<f64> = readings
            .windows(2)
            .map(|p| p[1].fill_pct - p[0].fill_pct)
            .collect();
        let Some((&last, history)) = deltas.split_last() else {
            return Ok(false);
        };

        let mut findings = Vec::new();
        if last > 0.0 && last < self.cfg.estimator.refill_jump_pct {
            findings.push(format!(
                "fill rose {last:.1} pct points without a refill-sized jump"
            ));
        }
        if history.len() >= self.cfg.detector.anomaly_min_deltas {
            let (mean, std) = mean_std(history);
            if std > f64::EPSILON && (last - mean).abs() > self.cfg.detector.anomaly_sigma * std {
                findings.push(format!(
                    "delta {last:.1} deviates more than {:.0} sigma from history",
                    self.cfg.detector.anomaly_sigma
                ));
            }
        }
        if findings.is_empty() {
            return Ok(false);
        }

        let message = findings.join("; ");
        tracing::info!(%box_id, %message, "reading anomaly");
        self.open_or_touch_alert(
            &bx,
            AlertKind::Anomaly,
            Severity::Info,
            "Reading anomaly",
            &message,
            serde_json::json!({ "last_delta_pct": last }),
        )?;
        Ok(true)
    }
}
