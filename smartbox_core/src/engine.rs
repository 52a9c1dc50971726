//! Engine facade and builder.
//!
//! `SmartBoxEngine` owns the collaborators and fans operations out to the
//! per-concern modules (`ingest`, `estimator`, `decision`, `detector`,
//! `ledger`, `sweep`), each of which adds an `impl` block.

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use smartbox_traits::clock::{SystemClock, WallClock};
use smartbox_traits::model::{
    BoxId, CompanyId, HolidayId, HolidayPeriod, Reading, SmartBox, THRESHOLD_MAX_PCT,
    THRESHOLD_MIN_PCT,
};
use smartbox_traits::{Notifier, Store, TierLookup};

use crate::config::EngineCfg;
use crate::error::{BuildError, EngineError, Report, Result, collab_err};
use crate::locks::BoxLocks;

pub struct SmartBoxEngine<S, N, T> {
    pub(crate) store: S,
    pub(crate) notifier: N,
    pub(crate) tiers: T,
    pub(crate) cfg: EngineCfg,
    pub(crate) clock: Arc<dyn WallClock + Send + Sync>,
    pub(crate) locks: BoxLocks,
}

impl<S, N, T> core::fmt::Debug for SmartBoxEngine<S, N, T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SmartBoxEngine")
            .field("cfg", &self.cfg)
            .finish_non_exhaustive()
    }
}

impl<S, N, T> SmartBoxEngine<S, N, T>
where
    S: Store,
    N: Notifier,
    T: TierLookup,
{
    /// Start building an engine.
    pub fn builder() -> EngineBuilder<S, N, T> {
        EngineBuilder::default()
    }

    #[inline]
    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    #[inline]
    pub(crate) fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub(crate) fn load_box(&self, id: BoxId) -> Result<SmartBox> {
        self.store
            .get_box(id)
            .map_err(collab_err)?
            .ok_or_else(|| Report::new(EngineError::NotFound("box", id.to_string())))
    }

    /// Reading history (windowed, oldest to newest) and applicable holiday
    /// periods for a box.
    pub(crate) fn history_for(&self, bx: &SmartBox) -> Result<(Vec<Reading>, Vec<HolidayPeriod>)> {
        let since = self.now() - Duration::days(self.cfg.estimator.window_days);
        let readings = self
            .store
            .readings_for(bx.id, since, self.cfg.estimator.max_readings)
            .map_err(collab_err)?;
        let holidays = self.store.holidays_for(bx.company_id).map_err(collab_err)?;
        Ok((readings, holidays))
    }

    /// Update a box's reorder threshold. The allowed range is
    /// [`THRESHOLD_MIN_PCT`, `THRESHOLD_MAX_PCT`].
    pub fn set_reorder_threshold(&self, box_id: BoxId, pct: f64) -> Result<SmartBox> {
        if !pct.is_finite() || !(THRESHOLD_MIN_PCT..=THRESHOLD_MAX_PCT).contains(&pct) {
            return Err(Report::new(EngineError::Validation(format!(
                "threshold {pct} outside [{THRESHOLD_MIN_PCT}, {THRESHOLD_MAX_PCT}]"
            ))));
        }
        let mut bx = self.load_box(box_id)?;
        bx.threshold_pct = pct;
        self.store.put_box(&bx).map_err(collab_err)?;
        tracing::info!(%box_id, pct, "reorder threshold updated");
        Ok(bx)
    }

    /// Enable or disable predictive auto-reordering for a box.
    pub fn set_auto_reorder(&self, box_id: BoxId, enabled: bool) -> Result<SmartBox> {
        let mut bx = self.load_box(box_id)?;
        bx.auto_reorder = enabled;
        self.store.put_box(&bx).map_err(collab_err)?;
        tracing::info!(%box_id, enabled, "auto-reorder updated");
        Ok(bx)
    }

    /// Record a holiday period. Periods are immutable: edits are delete +
    /// recreate.
    pub fn add_holiday(
        &self,
        company_id: CompanyId,
        box_id: Option<BoxId>,
        start: NaiveDate,
        end: NaiveDate,
        reason: &str,
    ) -> Result<HolidayPeriod> {
        if end < start {
            return Err(Report::new(EngineError::Validation(format!(
                "holiday end {end} precedes start {start}"
            ))));
        }
        if reason.trim().is_empty() {
            return Err(Report::new(EngineError::Validation(
                "holiday reason must not be empty".into(),
            )));
        }
        let period = HolidayPeriod {
            id: HolidayId::new(),
            company_id,
            box_id,
            start,
            end,
            reason: reason.trim().to_string(),
        };
        self.store.put_holiday(&period).map_err(collab_err)?;
        tracing::info!(%period.id, %company_id, %start, %end, "holiday period added");
        Ok(period)
    }

    pub fn remove_holiday(&self, id: HolidayId) -> Result<()> {
        if self.store.delete_holiday(id).map_err(collab_err)? {
            tracing::info!(%id, "holiday period removed");
            Ok(())
        } else {
            Err(Report::new(EngineError::NotFound("holiday", id.to_string())))
        }
    }

    /// Borrow the store, for hosts that need read access alongside the engine.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Borrow the notifier (tests observe dispatched notifications through it).
    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Borrow the tier lookup.
    pub fn tiers(&self) -> &T {
        &self.tiers
    }
}

/// Builder for `SmartBoxEngine`. Collaborators are required; config and clock
/// have defaults. All config invariants are checked on `build()`.
pub struct EngineBuilder<S, N, T> {
    store: Option<S>,
    notifier: Option<N>,
    tiers: Option<T>,
    cfg: EngineCfg,
    clock: Option<Arc<dyn WallClock + Send + Sync>>,
}

impl<S, N, T> Default for EngineBuilder<S, N, T> {
    fn default() -> Self {
        Self {
            store: None,
            notifier: None,
            tiers: None,
            cfg: EngineCfg::default(),
            clock: None,
        }
    }
}

impl<S, N, T> EngineBuilder<S, N, T>
where
    S: Store,
    N: Notifier,
    T: TierLookup,
{
    pub fn with_store(mut self, store: S) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_notifier(mut self, notifier: N) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_tiers(mut self, tiers: T) -> Self {
        self.tiers = Some(tiers);
        self
    }

    pub fn with_config(mut self, cfg: EngineCfg) -> Self {
        self.cfg = cfg;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn WallClock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn build(self) -> Result<SmartBoxEngine<S, N, T>> {
        let store = self
            .store
            .ok_or_else(|| Report::new(BuildError::MissingStore))?;
        let notifier = self
            .notifier
            .ok_or_else(|| Report::new(BuildError::MissingNotifier))?;
        let tiers = self
            .tiers
            .ok_or_else(|| Report::new(BuildError::MissingTierLookup))?;
        validate_cfg(&self.cfg)?;
        Ok(SmartBoxEngine {
            store,
            notifier,
            tiers,
            cfg: self.cfg,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock::new())),
            locks: BoxLocks::default(),
        })
    }
}

fn validate_cfg(cfg: &EngineCfg) -> Result<()> {
    let invalid = |msg: &'static str| Report::new(BuildError::InvalidConfig(msg));
    if cfg.estimator.learning_days < 1 {
        return Err(invalid("estimator.learning_days must be >= 1"));
    }
    if cfg.estimator.min_readings < 2 {
        return Err(invalid("estimator.min_readings must be >= 2"));
    }
    if cfg.estimator.min_span_days <= 0.0 {
        return Err(invalid("estimator.min_span_days must be > 0"));
    }
    if cfg.estimator.ewma_half_life_days <= 0.0 {
        return Err(invalid("estimator.ewma_half_life_days must be > 0"));
    }
    if cfg.estimator.high_confidence_days <= 0.0 {
        return Err(invalid("estimator.high_confidence_days must be > 0"));
    }
    if cfg.estimator.refill_jump_pct <= 0.0 || cfg.estimator.refill_jump_pct > 100.0 {
        return Err(invalid("estimator.refill_jump_pct must be in (0, 100]"));
    }
    if cfg.estimator.window_days < 1 {
        return Err(invalid("estimator.window_days must be >= 1"));
    }
    if cfg.estimator.max_readings == 0 {
        return Err(invalid("estimator.max_readings must be >= 1"));
    }
    if cfg.decision.lead_time_buffer_days < 0.0 {
        return Err(invalid("decision.lead_time_buffer_days must be >= 0"));
    }
    if cfg.decision.supply_days <= 0.0 {
        return Err(invalid("decision.supply_days must be > 0"));
    }
    if cfg.detector.offline_after_hours < 1 {
        return Err(invalid("detector.offline_after_hours must be >= 1"));
    }
    if cfg.detector.anomaly_sigma <= 0.0 {
        return Err(invalid("detector.anomaly_sigma must be > 0"));
    }
    if cfg.detector.anomaly_min_deltas < 1 {
        return Err(invalid("detector.anomaly_min_deltas must be >= 1"));
    }
    if cfg.sweep.workers == 0 {
        return Err(invalid("sweep.workers must be >= 1"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{MemoryStore, RecordingNotifier, StaticTiers};

    #[test]
    fn build_requires_all_collaborators() {
        let err = SmartBoxEngine::<MemoryStore, RecordingNotifier, StaticTiers>::builder()
            .build()
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BuildError>(),
            Some(BuildError::MissingStore)
        ));
    }

    #[test]
    fn build_rejects_invalid_config() {
        let mut cfg = EngineCfg::default();
        cfg.sweep.workers = 0;
        let err = SmartBoxEngine::builder()
            .with_store(MemoryStore::default())
            .with_notifier(RecordingNotifier::default())
            .with_tiers(StaticTiers::default())
            .with_config(cfg)
            .build()
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BuildError>(),
            Some(BuildError::InvalidConfig(_))
        ));
    }

    // The builder and the TOML schema enforce the same bounds, so a config
    // rejected by one path is rejected by the other.
    #[test]
    fn builder_and_toml_validation_agree() {
        let mutations: [(&str, fn(&mut EngineCfg)); 3] = [
            ("[estimator]\nhigh_confidence_days = 0.0\n", |c| {
                c.estimator.high_confidence_days = 0.0;
            }),
            ("[estimator]\nmax_readings = 0\n", |c| {
                c.estimator.max_readings = 0;
            }),
            ("[detector]\nanomaly_min_deltas = 0\n", |c| {
                c.detector.anomaly_min_deltas = 0;
            }),
        ];
        for (toml_src, mutate) in mutations {
            let toml_cfg = smartbox_config::load_toml(toml_src).unwrap();
            assert!(toml_cfg.validate().is_err(), "{toml_src}");

            let mut cfg = EngineCfg::default();
            mutate(&mut cfg);
            let err = SmartBoxEngine::builder()
                .with_store(MemoryStore::default())
                .with_notifier(RecordingNotifier::default())
                .with_tiers(StaticTiers::default())
                .with_config(cfg)
                .build()
                .unwrap_err();
            assert!(
                matches!(
                    err.downcast_ref::<BuildError>(),
                    Some(BuildError::InvalidConfig(_))
                ),
                "{toml_src}"
            );
        }
    }
}
