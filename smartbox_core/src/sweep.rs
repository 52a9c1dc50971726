//! Scheduled daily sweep: offline detection plus predictive reorder
//! evaluation over all active boxes.
//!
//! Boxes are independent units of work, so the sweep fans them out to a
//! bounded pool of worker threads over a crossbeam channel. A failure on one
//! box never stops the others; cancellation is honored between boxes, never
//! mid-evaluation.

use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam_channel as xch;
use smartbox_traits::model::BoxId;
use smartbox_traits::{Notifier, Store, TierLookup};

use crate::decision::Evaluation;
use crate::engine::SmartBoxEngine;
use crate::error::{EngineError, Result, collab_err};

/// Aggregate outcome of one sweep run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    /// Boxes a worker actually processed.
    pub scanned: usize,
    /// Boxes that newly transitioned to offline.
    pub went_offline: usize,
    /// Boxes with an anomaly alert opened or refreshed.
    pub anomalies: usize,
    /// Shipment triggers created.
    pub triggers: usize,
    /// Boxes skipped because an evaluation was already in flight.
    pub skipped: usize,
    /// Boxes whose evaluation failed; retried on the next cycle.
    pub failures: usize,
    /// True when the run stopped early at a cancellation checkpoint.
    pub cancelled: bool,
}

#[derive(Debug, Default)]
struct BoxOutcome {
    went_offline: bool,
    anomaly: bool,
    triggered: bool,
    skipped: bool,
    failed: bool,
}

impl<S, N, T> SmartBoxEngine<S, N, T>
where
    S: Store,
    N: Notifier,
    T: TierLookup,
{
    /// Run the daily sweep over all active boxes.
    pub fn run_daily_sweep(&self) -> Result<SweepReport> {
        self.run_daily_sweep_with_cancel(&AtomicBool::new(false))
    }

    /// Run the daily sweep, checking `cancel` between boxes.
    pub fn run_daily_sweep_with_cancel(&self, cancel: &AtomicBool) -> Result<SweepReport> {
        let ids = self.store.active_box_ids().map_err(collab_err)?;
        if ids.is_empty() {
            return Ok(SweepReport::default());
        }
        let workers = self.cfg.sweep.workers.min(ids.len()).max(1);
        tracing::info!(boxes = ids.len(), workers, "daily sweep start");

        let (tx, rx) = xch::bounded::<BoxId>(workers * 2);
        let (res_tx, res_rx) = xch::unbounded::<BoxOutcome>();

        let report = std::thread::scope(|scope| {
            for _ in 0..workers {
                let rx = rx.clone();
                let res_tx = res_tx.clone();
                scope.spawn(move || {
                    while let Ok(id) = rx.recv() {
                        // Checkpoint: a cancelled sweep finishes nothing more,
                        // but never interrupts a box mid-evaluation.
                        if cancel.load(Ordering::Relaxed) {
                            break;
                        }
                        if res_tx.send(self.sweep_one(id)).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(res_tx);

            for id in ids {
                if cancel.load(Ordering::Relaxed) {
                    break;
                }
                if tx.send(id).is_err() {
                    break;
                }
            }
            drop(tx);

            // `scanned` counts delivered outcomes, so an id a worker dropped
            // at its cancellation checkpoint is never reported as processed.
            let mut report = SweepReport::default();
            for out in res_rx.iter() {
                report.scanned += 1;
                report.went_offline += usize::from(out.went_offline);
                report.anomalies += usize::from(out.anomaly);
                report.triggers += usize::from(out.triggered);
                report.skipped += usize::from(out.skipped);
                report.failures += usize::from(out.failed);
            }
            report.cancelled = cancel.load(Ordering::Relaxed);
            report
        });

        tracing::info!(?report, "daily sweep done");
        Ok(report)
    }

    /// One box's share of the sweep. Errors are contained here so a bad box
    /// cannot fail the run.
    fn sweep_one(&self, id: BoxId) -> BoxOutcome {
        let mut out = BoxOutcome::default();

        match self.check_offline(id) {
            Ok(true) => {
                // A box that just went dark has nothing fresh to evaluate.
                out.went_offline = true;
                return out;
            }
            Ok(false) => {}
            Err(e) => {
                if is_busy(&e) {
                    // Another evaluation holds the box; leave it for that one.
                    out.skipped = true;
                } else {
                    tracing::warn!(box_id = %id, error = %e, "offline check failed");
                    out.failed = true;
                }
                return out;
            }
        }

        match self.check_anomalies(id) {
            Ok(found) => out.anomaly = found,
            Err(e) => {
                if is_busy(&e) {
                    out.skipped = true;
                    return out;
                }
                tracing::warn!(box_id = %id, error = %e, "anomaly check failed");
                out.failed = true;
            }
        }

        match self.evaluate_box(id) {
            Ok(Evaluation::Triggered(_)) => out.triggered = true,
            Ok(_) => {}
            Err(e) => {
                if is_busy(&e) {
                    out.skipped = true;
                } else {
                    tracing::warn!(box_id = %id, error = %e, "evaluation failed");
                    out.failed = true;
                }
            }
        }
        out
    }
}

fn is_busy(e: &crate::error::Report) -> bool {
    matches!(
        e.downcast_ref::<EngineError>(),
        Some(EngineError::ConcurrencyConflict(_))
    )
}
