//! Boundary contracts for the SmartBox engine.
//!
//! The engine is an in-process library; persistence, notification dispatch,
//! and company/tier lookup are external collaborators behind the traits in
//! this crate. Implementations return boxed errors; the engine maps them to
//! its own taxonomy.

pub mod clock;
pub mod model;

pub use clock::{SystemClock, TestClock, WallClock};

use chrono::{DateTime, Utc};
use model::{
    Alert, AlertId, AlertKind, BoxId, CompanyId, HolidayId, HolidayPeriod, Reading, ShipmentTrigger,
    SmartBox, Tier, TriggerId,
};

pub type DynError = Box<dyn std::error::Error + Send + Sync>;

/// Persistence collaborator.
///
/// Implementations must be safe to share across sweep worker threads. The
/// engine serializes writes per box itself; the store only needs plain CRUD.
pub trait Store: Send + Sync {
    fn get_box(&self, id: BoxId) -> Result<Option<SmartBox>, DynError>;
    fn put_box(&self, b: &SmartBox) -> Result<(), DynError>;
    /// Ids of all boxes with status `Active`, the sweep's work list.
    fn active_box_ids(&self) -> Result<Vec<BoxId>, DynError>;

    fn append_reading(&self, r: &Reading) -> Result<(), DynError>;
    /// Readings for a box recorded at or after `since`, oldest to newest,
    /// capped to the newest `limit` samples.
    fn readings_for(
        &self,
        box_id: BoxId,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Reading>, DynError>;

    fn holidays_for(&self, company_id: CompanyId) -> Result<Vec<HolidayPeriod>, DynError>;
    fn put_holiday(&self, h: &HolidayPeriod) -> Result<(), DynError>;
    /// Returns false when no such period existed.
    fn delete_holiday(&self, id: HolidayId) -> Result<bool, DynError>;

    fn get_alert(&self, id: AlertId) -> Result<Option<Alert>, DynError>;
    /// The open alert of the given kind for the box, if any. The engine keeps
    /// at most one open per (box, kind).
    fn open_alert(&self, box_id: BoxId, kind: AlertKind) -> Result<Option<Alert>, DynError>;
    fn put_alert(&self, a: &Alert) -> Result<(), DynError>;

    fn get_trigger(&self, id: TriggerId) -> Result<Option<ShipmentTrigger>, DynError>;
    /// The pending or shipped-but-undelivered trigger for the box, if any.
    fn outstanding_trigger(&self, box_id: BoxId) -> Result<Option<ShipmentTrigger>, DynError>;
    fn put_trigger(&self, t: &ShipmentTrigger) -> Result<(), DynError>;
}

/// Notification collaborator. Fire-and-forget: the engine logs failures and
/// never propagates them.
pub trait Notifier: Send + Sync {
    fn notify_offline(&self, b: &SmartBox) -> Result<(), DynError>;
    fn notify_reorder_triggered(&self, t: &ShipmentTrigger, b: &SmartBox) -> Result<(), DynError>;
}

/// Read-only company tier lookup.
pub trait TierLookup: Send + Sync {
    fn tier_for(&self, company_id: CompanyId) -> Result<Tier, DynError>;
}
