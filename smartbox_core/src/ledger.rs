//! Alert & shipment ledger: append-only records with controlled lifecycle
//! transitions, used for deduplication and audit.
//!
//! Invariants enforced here:
//! - at most one open alert per (box, kind); repeat detections fold into the
//!   open alert (message/payload refreshed, `last_seen_at` bumped);
//! - at most one pending or shipped-but-undelivered shipment trigger per box;
//! - alert resolution is idempotent: resolving a resolved alert is a
//!   successful no-op that leaves `resolved_at` and resolver untouched.

use smartbox_traits::model::{
    Alert, AlertId, AlertKind, BoxId, FulfillmentStatus, OrderItem, Severity, ShipmentTrigger,
    SmartBox, TriggerId, TriggerKind,
};
use smartbox_traits::{Notifier, Store, TierLookup};

use crate::engine::SmartBoxEngine;
use crate::error::{EngineError, Report, Result, collab_err};

impl<S, N, T> SmartBoxEngine<S, N, T>
where
    S: Store,
    N: Notifier,
    T: TierLookup,
{
    /// Record a detected condition. Returns the alert and whether it is a new
    /// row (false means an existing open alert absorbed the detection, with
    /// its message/payload refreshed and `last_seen_at` bumped).
    pub fn open_or_touch_alert(
        &self,
        bx: &SmartBox,
        kind: AlertKind,
        severity: Severity,
        title: &str,
        message: &str,
        payload: serde_json::Value,
    ) -> Result<(Alert, bool)> {
        let now = self.now();
        if let Some(mut open) = self.store.open_alert(bx.id, kind).map_err(collab_err)? {
            open.message = message.to_string();
            open.payload = payload;
            open.last_seen_at = now;
            self.store.put_alert(&open).map_err(collab_err)?;
            tracing::debug!(alert = %open.id, box_id = %bx.id, ?kind, "open alert refreshed");
            return Ok((open, false));
        }
        let alert = Alert {
            id: AlertId::new(),
            box_id: bx.id,
            company_id: bx.company_id,
            kind,
            severity,
            title: title.to_string(),
            message: message.to_string(),
            payload,
            created_at: now,
            last_seen_at: now,
            resolved_at: None,
            resolved_by: None,
            resolution_notes: None,
        };
        self.store.put_alert(&alert).map_err(collab_err)?;
        tracing::info!(alert = %alert.id, box_id = %bx.id, ?kind, ?severity, "alert opened");
        Ok((alert, true))
    }

    /// Resolve an alert. Fails with `NotFound` for an unknown id; resolving an
    /// already-resolved alert returns it unchanged, since resolution requests
    /// may be retried.
    pub fn resolve_alert(
        &self,
        alert_id: AlertId,
        resolved_by: &str,
        notes: Option<&str>,
    ) -> Result<Alert> {
        let mut alert = self
            .store
            .get_alert(alert_id)
            .map_err(collab_err)?
            .ok_or_else(|| Report::new(EngineError::NotFound("alert", alert_id.to_string())))?;
        if !alert.is_open() {
            tracing::debug!(alert = %alert_id, "resolve on already-resolved alert; no-op");
            return Ok(alert);
        }
        alert.resolved_at = Some(self.now());
        alert.resolved_by = Some(resolved_by.to_string());
        alert.resolution_notes = notes.map(str::to_string);
        self.store.put_alert(&alert).map_err(collab_err)?;
        tracing::info!(alert = %alert_id, resolved_by, "alert resolved");
        Ok(alert)
    }

    /// Resolve the open alert of the given kind for a box, if one exists.
    pub(crate) fn auto_resolve_alert(
        &self,
        box_id: BoxId,
        kind: AlertKind,
        notes: &str,
    ) -> Result<()> {
        if let Some(open) = self.store.open_alert(box_id, kind).map_err(collab_err)? {
            self.resolve_alert(open.id, "system", Some(notes))?;
        }
        Ok(())
    }

    /// Record a shipment trigger under the outstanding-trigger invariant.
    ///
    /// Callers must hold the box's evaluation slot. If an outstanding trigger
    /// slipped in anyway, the new one is suppressed and the existing record is
    /// returned with `false`.
    pub(crate) fn record_trigger(
        &self,
        bx: &SmartBox,
        kind: TriggerKind,
        items: Vec<OrderItem>,
    ) -> Result<(ShipmentTrigger, bool)> {
        if let Some(existing) = self.store.outstanding_trigger(bx.id).map_err(collab_err)? {
            tracing::warn!(
                box_id = %bx.id,
                existing = %existing.id,
                ?kind,
                "trigger suppressed: outstanding shipment exists"
            );
            return Ok((existing, false));
        }
        let total_weight_kg = items.iter().map(OrderItem::weight_kg).sum();
        let trigger = ShipmentTrigger {
            id: TriggerId::new(),
            box_id: bx.id,
            kind,
            fill_pct_at_trigger: bx.fill_pct,
            items,
            total_weight_kg,
            created_at: self.now(),
            status: FulfillmentStatus::Pending,
        };
        self.store.put_trigger(&trigger).map_err(collab_err)?;
        tracing::info!(
            trigger = %trigger.id,
            box_id = %bx.id,
            ?kind,
            fill_pct = bx.fill_pct,
            total_weight_kg,
            "shipment trigger created"
        );
        Ok((trigger, true))
    }

    /// Fire a manual reorder for a box, subject to the same outstanding-
    /// trigger invariant as automatic triggers.
    pub fn trigger_manual_reorder(&self, box_id: BoxId) -> Result<ShipmentTrigger> {
        let _guard = self.locks.try_acquire(box_id).ok_or_else(|| {
            Report::new(EngineError::ConcurrencyConflict(box_id.to_string()))
        })?;
        let bx = self.load_box(box_id)?;
        let tier = self.tiers.tier_for(bx.company_id).map_err(collab_err)?;
        let items = crate::decision::order_items(&bx, tier, None, &self.cfg.decision);
        let (trigger, created) = self.record_trigger(&bx, TriggerKind::Manual, items)?;
        if created {
            self.notify_reorder(&trigger, &bx);
        }
        Ok(trigger)
    }

    /// Advance a trigger's fulfillment status.
    ///
    /// Legal transitions: pending → shipped | cancelled, shipped → delivered |
    /// cancelled. Delivered and cancelled are terminal.
    pub fn update_fulfillment(
        &self,
        trigger_id: TriggerId,
        status: FulfillmentStatus,
    ) -> Result<ShipmentTrigger> {
        let mut trigger = self
            .store
            .get_trigger(trigger_id)
            .map_err(collab_err)?
            .ok_or_else(|| Report::new(EngineError::NotFound("trigger", trigger_id.to_string())))?;
        let legal = matches!(
            (trigger.status, status),
            (
                FulfillmentStatus::Pending,
                FulfillmentStatus::Shipped | FulfillmentStatus::Cancelled
            ) | (
                FulfillmentStatus::Shipped,
                FulfillmentStatus::Delivered | FulfillmentStatus::Cancelled
            )
        );
        if !legal {
            return Err(Report::new(EngineError::Validation(format!(
                "illegal fulfillment transition {:?} -> {:?}",
                trigger.status, status
            ))));
        }
        trigger.status = status;
        self.store.put_trigger(&trigger).map_err(collab_err)?;
        tracing::info!(trigger = %trigger_id, ?status, "fulfillment updated");
        Ok(trigger)
    }

    /// Fire-and-forget reorder notification; failures are logged, never
    /// propagated.
    pub(crate) fn notify_reorder(&self, trigger: &ShipmentTrigger, bx: &SmartBox) {
        if let Err(e) = self.notifier.notify_reorder_triggered(trigger, bx) {
            tracing::warn!(trigger = %trigger.id, error = %e, "reorder notification failed");
        }
    }
}
