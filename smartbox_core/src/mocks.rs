//! In-memory collaborator implementations for tests and host bring-up.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use smartbox_traits::model::{
    Alert, AlertId, AlertKind, BoxId, BoxStatus, CompanyId, HolidayId, HolidayPeriod, Reading,
    ShipmentTrigger, SmartBox, Tier, TriggerId,
};
use smartbox_traits::{DynError, Notifier, Store, TierLookup};

fn io_err(msg: &str) -> DynError {
    Box::new(std::io::Error::other(msg.to_string()))
}

#[derive(Debug, Default)]
struct StoreInner {
    boxes: HashMap<BoxId, SmartBox>,
    readings: Vec<Reading>,
    holidays: HashMap<HolidayId, HolidayPeriod>,
    alerts: HashMap<AlertId, Alert>,
    triggers: HashMap<TriggerId, ShipmentTrigger>,
    /// When set, any access touching this box fails, to exercise
    /// collaborator-failure paths.
    fail_box: Option<BoxId>,
}

/// Hash-map backed `Store`. Shared freely across threads.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<StoreInner>,
}

impl MemoryStore {
    fn lock(&self) -> std::sync::MutexGuard<'_, StoreInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seed a box directly, bypassing validation.
    pub fn seed_box(&self, bx: SmartBox) {
        self.lock().boxes.insert(bx.id, bx);
    }

    /// Make every access for `id` fail until cleared with `None`.
    pub fn fail_box(&self, id: Option<BoxId>) {
        self.lock().fail_box = id;
    }

    pub fn alerts_for(&self, box_id: BoxId) -> Vec<Alert> {
        let mut out: Vec<Alert> = self
            .lock()
            .alerts
            .values()
            .filter(|a| a.box_id == box_id)
            .cloned()
            .collect();
        out.sort_by_key(|a| a.created_at);
        out
    }

    pub fn triggers_for(&self, box_id: BoxId) -> Vec<ShipmentTrigger> {
        let mut out: Vec<ShipmentTrigger> = self
            .lock()
            .triggers
            .values()
            .filter(|t| t.box_id == box_id)
            .cloned()
            .collect();
        out.sort_by_key(|t| t.created_at);
        out
    }

    pub fn reading_count(&self, box_id: BoxId) -> usize {
        self.lock()
            .readings
            .iter()
            .filter(|r| r.box_id == box_id)
            .count()
    }
}

impl Store for MemoryStore {
    fn get_box(&self, id: BoxId) -> Result<Option<SmartBox>, DynError> {
        let inner = self.lock();
        if inner.fail_box == Some(id) {
            return Err(io_err("store down"));
        }
        Ok(inner.boxes.get(&id).cloned())
    }

    fn put_box(&self, b: &SmartBox) -> Result<(), DynError> {
        let mut inner = self.lock();
        if inner.fail_box == Some(b.id) {
            return Err(io_err("store down"));
        }
        inner.boxes.insert(b.id, b.clone());
        Ok(())
    }

    fn active_box_ids(&self) -> Result<Vec<BoxId>, DynError> {
        let inner = self.lock();
        let mut ids: Vec<BoxId> = inner
            .boxes
            .values()
            .filter(|b| b.status == BoxStatus::Active)
            .map(|b| b.id)
            .collect();
        ids.sort();
        Ok(ids)
    }

    fn append_reading(&self, r: &Reading) -> Result<(), DynError> {
        let mut inner = self.lock();
        if inner.fail_box == Some(r.box_id) {
            return Err(io_err("store down"));
        }
        inner.readings.push(r.clone());
        Ok(())
    }

    fn readings_for(
        &self,
        box_id: BoxId,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Reading>, DynError> {
        let inner = self.lock();
        if inner.fail_box == Some(box_id) {
            return Err(io_err("store down"));
        }
        let mut rs: Vec<Reading> = inner
            .readings
            .iter()
            .filter(|r| r.box_id == box_id && r.recorded_at >= since)
            .cloned()
            .collect();
        rs.sort_by_key(|r| r.recorded_at);
        if rs.len() > limit {
            rs.drain(..rs.len() - limit);
        }
        Ok(rs)
    }

    fn holidays_for(&self, company_id: CompanyId) -> Result<Vec<HolidayPeriod>, DynError> {
        Ok(self
            .lock()
            .holidays
            .values()
            .filter(|h| h.company_id == company_id)
            .cloned()
            .collect())
    }

    fn put_holiday(&self, h: &HolidayPeriod) -> Result<(), DynError> {
        self.lock().holidays.insert(h.id, h.clone());
        Ok(())
    }

    fn delete_holiday(&self, id: HolidayId) -> Result<bool, DynError> {
        Ok(self.lock().holidays.remove(&id).is_some())
    }

    fn get_alert(&self, id: AlertId) -> Result<Option<Alert>, DynError> {
        Ok(self.lock().alerts.get(&id).cloned())
    }

    fn open_alert(&self, box_id: BoxId, kind: AlertKind) -> Result<Option<Alert>, DynError> {
        Ok(self
            .lock()
            .alerts
            .values()
            .find(|a| a.box_id == box_id && a.kind == kind && a.is_open())
            .cloned())
    }

    fn put_alert(&self, a: &Alert) -> Result<(), DynError> {
        self.lock().alerts.insert(a.id, a.clone());
        Ok(())
    }

    fn get_trigger(&self, id: TriggerId) -> Result<Option<ShipmentTrigger>, DynError> {
        Ok(self.lock().triggers.get(&id).cloned())
    }

    fn outstanding_trigger(&self, box_id: BoxId) -> Result<Option<ShipmentTrigger>, DynError> {
        Ok(self
            .lock()
            .triggers
            .values()
            .find(|t| t.box_id == box_id && t.is_outstanding())
            .cloned())
    }

    fn put_trigger(&self, t: &ShipmentTrigger) -> Result<(), DynError> {
        self.lock().triggers.insert(t.id, t.clone());
        Ok(())
    }
}

/// Notifier that records every call; can be told to fail to exercise the
/// fire-and-forget contract.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    offline: Mutex<Vec<BoxId>>,
    reorders: Mutex<Vec<TriggerId>>,
    failures: AtomicUsize,
    pub fail: AtomicBool,
}

impl RecordingNotifier {
    pub fn offline_count(&self) -> usize {
        self.offline
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn reorder_count(&self) -> usize {
        self.reorders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn attempted_failures(&self) -> usize {
        self.failures.load(Ordering::Relaxed)
    }
}

impl Notifier for RecordingNotifier {
    fn notify_offline(&self, b: &SmartBox) -> Result<(), DynError> {
        if self.fail.load(Ordering::Relaxed) {
            self.failures.fetch_add(1, Ordering::Relaxed);
            return Err(io_err("mail gateway down"));
        }
        self.offline
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(b.id);
        Ok(())
    }

    fn notify_reorder_triggered(&self, t: &ShipmentTrigger, _b: &SmartBox) -> Result<(), DynError> {
        if self.fail.load(Ordering::Relaxed) {
            self.failures.fetch_add(1, Ordering::Relaxed);
            return Err(io_err("mail gateway down"));
        }
        self.reorders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(t.id);
        Ok(())
    }
}

/// Fixed tier table with a fallback for unknown companies.
#[derive(Debug)]
pub struct StaticTiers {
    tiers: Mutex<HashMap<CompanyId, Tier>>,
    pub fallback: Tier,
}

impl Default for StaticTiers {
    fn default() -> Self {
        Self {
            tiers: Mutex::new(HashMap::new()),
            fallback: Tier::Flex,
        }
    }
}

impl StaticTiers {
    pub fn set(&self, company_id: CompanyId, tier: Tier) {
        self.tiers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(company_id, tier);
    }
}

impl TierLookup for StaticTiers {
    fn tier_for(&self, company_id: CompanyId) -> Result<Tier, DynError> {
        Ok(self
            .tiers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&company_id)
            .copied()
            .unwrap_or(self.fallback))
    }
}
