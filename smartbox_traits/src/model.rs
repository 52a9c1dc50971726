//! Domain entities shared across the engine and its collaborators.
//!
//! Entities mirror the persisted shape one-to-one. `Reading` is append-only
//! and never mutated; `HolidayPeriod` is delete+recreate, never edited in
//! place. The cached current-state fields on `SmartBox` (`fill_pct`,
//! `battery_pct`, `last_reading_at`) are a materialized view over the reading
//! stream: they only advance when a newer `recorded_at` arrives.

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

macro_rules! id_type {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub Uuid);

        impl $name {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

id_type!(BoxId);
id_type!(CompanyId);
id_type!(ReadingId);
id_type!(HolidayId);
id_type!(AlertId);
id_type!(TriggerId);

/// Bag size categories the boxes dispense from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BagSize {
    G250,
    G500,
    G750,
    G1000,
}

impl BagSize {
    pub fn grams(self) -> u32 {
        match self {
            Self::G250 => 250,
            Self::G500 => 500,
            Self::G750 => 750,
            Self::G1000 => 1000,
        }
    }

    pub fn kg(self) -> f64 {
        f64::from(self.grams()) / 1000.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoxStatus {
    Active,
    Inactive,
    Maintenance,
    Offline,
}

/// Lower bound for a configurable reorder threshold (percent).
pub const THRESHOLD_MIN_PCT: f64 = 5.0;
/// Upper bound for a configurable reorder threshold (percent).
pub const THRESHOLD_MAX_PCT: f64 = 50.0;
/// Default reorder threshold (percent).
pub const THRESHOLD_DEFAULT_PCT: f64 = 20.0;

/// A physical dispensing unit monitored by telemetry.
#[derive(Debug, Clone)]
pub struct SmartBox {
    pub id: BoxId,
    pub company_id: CompanyId,
    pub capacity_kg: f64,
    pub bag_size: BagSize,
    /// Cached current fill, percent of the current bag remaining [0, 100].
    pub fill_pct: f64,
    /// Cached battery level [0, 100], `None` when the device never reported one.
    pub battery_pct: Option<f64>,
    pub last_reading_at: Option<DateTime<Utc>>,
    pub status: BoxStatus,
    pub threshold_pct: f64,
    pub auto_reorder: bool,
    pub activated_at: DateTime<Utc>,
}

impl SmartBox {
    pub fn new(
        company_id: CompanyId,
        capacity_kg: f64,
        bag_size: BagSize,
        activated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: BoxId::new(),
            company_id,
            capacity_kg,
            bag_size,
            fill_pct: 100.0,
            battery_pct: None,
            last_reading_at: None,
            status: BoxStatus::Active,
            threshold_pct: THRESHOLD_DEFAULT_PCT,
            auto_reorder: false,
            activated_at,
        }
    }
}

/// An immutable telemetry sample.
#[derive(Debug, Clone)]
pub struct Reading {
    pub id: ReadingId,
    pub box_id: BoxId,
    pub fill_pct: f64,
    pub battery_pct: Option<f64>,
    pub recorded_at: DateTime<Utc>,
}

/// A date range during which consumption is not expected for a company or a
/// single box. `box_id = None` means company-wide.
#[derive(Debug, Clone)]
pub struct HolidayPeriod {
    pub id: HolidayId,
    pub company_id: CompanyId,
    pub box_id: Option<BoxId>,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub reason: String,
}

impl HolidayPeriod {
    /// Whether the period applies to the given box and covers the given date.
    pub fn covers(&self, box_id: BoxId, date: NaiveDate) -> bool {
        self.box_id.is_none_or(|scoped| scoped == box_id)
            && (self.start..=self.end).contains(&date)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlertKind {
    LowStock,
    Offline,
    Anomaly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// A detected condition with an open → resolved lifecycle.
#[derive(Debug, Clone)]
pub struct Alert {
    pub id: AlertId,
    pub box_id: BoxId,
    pub company_id: CompanyId,
    pub kind: AlertKind,
    pub severity: Severity,
    pub title: String,
    pub message: String,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
    /// Bumped when a repeat detection is folded into this open alert.
    pub last_seen_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<String>,
    pub resolution_notes: Option<String>,
}

impl Alert {
    pub fn is_open(&self) -> bool {
        self.resolved_at.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerKind {
    Predictive,
    Threshold,
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FulfillmentStatus {
    Pending,
    Shipped,
    Delivered,
    Cancelled,
}

/// One line of a reorder shipment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderItem {
    pub bag_size: BagSize,
    pub bags: u32,
}

impl OrderItem {
    pub fn weight_kg(&self) -> f64 {
        self.bag_size.kg() * f64::from(self.bags)
    }
}

/// Record that a reorder condition fired for a box.
#[derive(Debug, Clone)]
pub struct ShipmentTrigger {
    pub id: TriggerId,
    pub box_id: BoxId,
    pub kind: TriggerKind,
    pub fill_pct_at_trigger: f64,
    pub items: Vec<OrderItem>,
    pub total_weight_kg: f64,
    pub created_at: DateTime<Utc>,
    pub status: FulfillmentStatus,
}

impl ShipmentTrigger {
    /// Pending or shipped-but-undelivered: blocks any new trigger for the box.
    pub fn is_outstanding(&self) -> bool {
        matches!(
            self.status,
            FulfillmentStatus::Pending | FulfillmentStatus::Shipped
        )
    }
}

/// Company subscription tiers, a closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Flex,
    Smart,
    SmartPlus,
}

impl Tier {
    /// Minimum bags per reorder for this tier.
    pub fn default_order_bags(self) -> u32 {
        match self {
            Self::Flex => 1,
            Self::Smart => 2,
            Self::SmartPlus => 3,
        }
    }

    /// Smart tiers size orders from historical consumption; Flex ships a
    /// fixed single bag.
    pub fn uses_recommendation(self) -> bool {
        !matches!(self, Self::Flex)
    }
}
