//! Reorder decision engine.
//!
//! Evaluated per box, on demand after an ingest batch or from the daily
//! sweep, always under the box's evaluation slot. Guard order matters:
//! status and outstanding-trigger checks come first, then the threshold
//! condition (ground truth) ahead of the predictive one (advisory).

use smartbox_traits::model::{
    AlertKind, BoxId, BoxStatus, OrderItem, Severity, ShipmentTrigger, SmartBox, Tier, TriggerId,
    TriggerKind,
};
use smartbox_traits::{Notifier, Store, TierLookup};

use crate::config::DecisionCfg;
use crate::engine::SmartBoxEngine;
use crate::error::{EngineError, Report, Result, collab_err};
use crate::estimator::{self, Confidence};

/// Outcome of one reorder evaluation.
#[derive(Debug, Clone)]
pub enum Evaluation {
    /// Preconditions ruled the box out before any estimation ran.
    Skipped(SkipReason),
    /// Evaluated; neither trigger condition held.
    NoAction,
    /// A shipment trigger was created.
    Triggered(ShipmentTrigger),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Box is inactive or in maintenance.
    Status(BoxStatus),
    /// An earlier trigger is still pending or shipped.
    OutstandingTrigger(TriggerId),
}

/// Compute the reorder item list for a box.
///
/// Flex ships the fixed tier default (one bag). Smart tiers size the order to
/// cover `supply_days` of historical consumption, never below the tier
/// minimum. `rate_pct_per_day = None` (manual reorder, or no usable history)
/// falls back to the tier default.
pub(crate) fn order_items(
    bx: &SmartBox,
    tier: Tier,
    rate_pct_per_day: Option<f64>,
    cfg: &DecisionCfg,
) -> Vec<OrderItem> {
    let base = tier.default_order_bags();
    let bags = match rate_pct_per_day {
        Some(rate) if tier.uses_recommendation() && rate > 0.0 => {
            // Fill percent is relative to the current bag, so the daily rate
            // converts to kg through the bag weight.
            let needed_kg = rate / 100.0 * bx.bag_size.kg() * cfg.supply_days;
            let recommended = (needed_kg / bx.bag_size.kg()).ceil() as u32;
            recommended.max(base)
        }
        _ => base,
    };
    vec![OrderItem {
        bag_size: bx.bag_size,
        bags,
    }]
}

impl<S, N, T> SmartBoxEngine<S, N, T>
where
    S: Store,
    N: Notifier,
    T: TierLookup,
{
    /// Evaluate the reorder decision for one box.
    ///
    /// Fails with `ConcurrencyConflict` when another evaluation for the same
    /// box is in flight; callers skip or retry later. At most one shipment
    /// trigger can be outstanding per box, so concurrent callers can never
    /// both create one.
    pub fn evaluate_box(&self, box_id: BoxId) -> Result<Evaluation> {
        let _guard = self
            .locks
            .try_acquire(box_id)
            .ok_or_else(|| Report::new(EngineError::ConcurrencyConflict(box_id.to_string())))?;

        let bx = self.load_box(box_id)?;
        if matches!(bx.status, BoxStatus::Inactive | BoxStatus::Maintenance) {
            return Ok(Evaluation::Skipped(SkipReason::Status(bx.status)));
        }
        if let Some(outstanding) = self.store.outstanding_trigger(box_id).map_err(collab_err)? {
            return Ok(Evaluation::Skipped(SkipReason::OutstandingTrigger(
                outstanding.id,
            )));
        }

        let (readings, holidays) = self.history_for(&bx)?;
        let est = estimator::estimate(&bx, &readings, &holidays, self.now(), &self.cfg.estimator);
        let suppressed = crate::holiday::is_suppressed(&holidays, bx.id, self.today());

        // Threshold reflects ground truth and wins over the predictive check.
        if bx.fill_pct <= bx.threshold_pct && !suppressed {
            let trigger = self.fire(&bx, TriggerKind::Threshold, est.rate_pct_per_day)?;
            return Ok(Evaluation::Triggered(trigger));
        }

        let predictive_due = bx.auto_reorder
            && est.confidence >= Confidence::Medium
            && est
                .days_to_threshold
                .is_some_and(|d| d <= self.cfg.decision.lead_time_buffer_days);
        if predictive_due && !suppressed {
            let trigger = self.fire(&bx, TriggerKind::Predictive, est.rate_pct_per_day)?;
            return Ok(Evaluation::Triggered(trigger));
        }

        tracing::debug!(
            %box_id,
            fill_pct = bx.fill_pct,
            rate = est.rate_pct_per_day,
            days_to_threshold = est.days_to_threshold,
            suppressed,
            "no reorder action"
        );
        Ok(Evaluation::NoAction)
    }

    fn fire(&self, bx: &SmartBox, kind: TriggerKind, rate: f64) -> Result<ShipmentTrigger> {
        let tier = self.tiers.tier_for(bx.company_id).map_err(collab_err)?;
        let rate = (rate > 0.0).then_some(rate);
        let items = order_items(bx, tier, rate, &self.cfg.decision);
        let (trigger, _) = self.record_trigger(bx, kind, items)?;

        // The shipment supersedes any standing low-stock alert; the state
        // after the trigger decides whether a fresh one is warranted.
        self.auto_resolve_alert(bx.id, AlertKind::LowStock, "shipment triggered")?;
        if bx.fill_pct < 2.0 * bx.threshold_pct {
            self.open_or_touch_alert(
                bx,
                AlertKind::LowStock,
                Severity::Info,
                "Low stock",
                &format!(
                    "fill at {:.1}% with threshold {:.0}%; reorder underway",
                    bx.fill_pct, bx.threshold_pct
                ),
                serde_json::json!({
                    "fill_pct": bx.fill_pct,
                    "threshold_pct": bx.threshold_pct,
                    "trigger_id": trigger.id.to_string(),
                }),
            )?;
        }

        self.notify_reorder(&trigger, bx);
        Ok(trigger)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use smartbox_traits::model::{BagSize, CompanyId};

    fn test_box(capacity_kg: f64, bag: BagSize) -> SmartBox {
        SmartBox::new(CompanyId::new(), capacity_kg, bag, Utc::now())
    }

    #[test]
    fn flex_tier_ships_one_bag_regardless_of_rate() {
        let bx = test_box(2.0, BagSize::G500);
        let cfg = DecisionCfg::default();
        let items = order_items(&bx, Tier::Flex, Some(5.0), &cfg);
        assert_eq!(items, vec![OrderItem { bag_size: BagSize::G500, bags: 1 }]);
    }

    #[test]
    fn smart_tier_sizes_order_from_consumption() {
        // 10%/day of a 500g bag = 0.05 kg/day; 30 days = 1.5 kg = 3 x 500g bags.
        let bx = test_box(2.0, BagSize::G500);
        let cfg = DecisionCfg::default();
        let items = order_items(&bx, Tier::Smart, Some(10.0), &cfg);
        assert_eq!(items[0].bags, 3);
    }

    #[test]
    fn order_size_tracks_the_bag_not_the_hopper() {
        // The daily rate is a percentage of the current bag, so two boxes
        // with the same bag and rate order the same amount no matter how
        // much hopper capacity sits around it.
        let cfg = DecisionCfg::default();
        let small = order_items(&test_box(2.0, BagSize::G500), Tier::Smart, Some(10.0), &cfg);
        let large = order_items(&test_box(10.0, BagSize::G500), Tier::Smart, Some(10.0), &cfg);
        assert_eq!(small, large);
        // 2%/day stays at the Smart floor: 0.01 kg/day x 30 days = 0.3 kg = 1 bag.
        let slow = order_items(&test_box(2.0, BagSize::G500), Tier::Smart, Some(2.0), &cfg);
        assert_eq!(slow[0].bags, 2);
    }

    #[test]
    fn smart_tier_never_drops_below_tier_minimum() {
        let bx = test_box(2.0, BagSize::G1000);
        let cfg = DecisionCfg::default();
        // Tiny rate rounds to one bag; SmartPlus floor is 3.
        let items = order_items(&bx, Tier::SmartPlus, Some(0.1), &cfg);
        assert_eq!(items[0].bags, 3);
    }

    #[test]
    fn manual_reorder_uses_tier_default() {
        let bx = test_box(2.0, BagSize::G250);
        let cfg = DecisionCfg::default();
        let items = order_items(&bx, Tier::Smart, None, &cfg);
        assert_eq!(items[0].bags, Tier::Smart.default_order_bags());
    }
}
