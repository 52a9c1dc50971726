//! Engine tuning knobs. Plain structs; the serde/TOML side lives in
//! `smartbox_config` and converts into these.

/// Consumption estimator configuration.
#[derive(Debug, Clone)]
pub struct EstimatorCfg {
    /// Days since box activation before steady-state mode is allowed.
    pub learning_days: i64,
    /// Minimum reading count before leaving learning mode.
    pub min_readings: usize,
    /// Minimum effective (holiday-excised) data span in days before leaving
    /// learning mode.
    pub min_span_days: f64,
    /// Half-life of the steady-state EWMA over daily rates.
    pub ewma_half_life_days: f64,
    /// Continuous post-refill effective days required for high confidence.
    pub high_confidence_days: f64,
    /// Minimum positive fill jump (pct points) treated as a refill.
    pub refill_jump_pct: f64,
    /// Rolling reading-history window in days.
    pub window_days: i64,
    /// Cap on readings considered per box (newest kept).
    pub max_readings: usize,
}

impl Default for EstimatorCfg {
    fn default() -> Self {
        Self {
            learning_days: 14,
            min_readings: 3,
            min_span_days: 2.0,
            ewma_half_life_days: 7.0,
            high_confidence_days: 14.0,
            refill_jump_pct: 5.0,
            window_days: 30,
            max_readings: 100,
        }
    }
}

/// Reorder decision configuration.
#[derive(Debug, Clone)]
pub struct DecisionCfg {
    /// Predictive triggers fire when days-to-threshold drops to this buffer.
    pub lead_time_buffer_days: f64,
    /// Days of supply a Smart-tier reorder should cover.
    pub supply_days: f64,
}

impl Default for DecisionCfg {
    fn default() -> Self {
        Self {
            lead_time_buffer_days: 3.0,
            supply_days: 30.0,
        }
    }
}

/// Offline/anomaly detector configuration.
#[derive(Debug, Clone)]
pub struct DetectorCfg {
    /// A box is offline once no reading arrived for this long.
    pub offline_after_hours: i64,
    /// Delta magnitudes beyond this many standard deviations of the box's
    /// historical deltas raise an anomaly alert.
    pub anomaly_sigma: f64,
    /// Minimum historical delta count before the sigma check applies.
    pub anomaly_min_deltas: usize,
}

impl Default for DetectorCfg {
    fn default() -> Self {
        Self {
            offline_after_hours: 48,
            anomaly_sigma: 3.0,
            anomaly_min_deltas: 5,
        }
    }
}

/// Daily sweep configuration.
#[derive(Debug, Clone)]
pub struct SweepCfg {
    /// Worker threads evaluating boxes in parallel.
    pub workers: usize,
}

impl Default for SweepCfg {
    fn default() -> Self {
        Self { workers: 4 }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EngineCfg {
    pub estimator: EstimatorCfg,
    pub decision: DecisionCfg,
    pub detector: DetectorCfg,
    pub sweep: SweepCfg,
}

impl From<smartbox_config::EngineToml> for EngineCfg {
    fn from(t: smartbox_config::EngineToml) -> Self {
        Self {
            estimator: EstimatorCfg {
                learning_days: t.estimator.learning_days,
                min_readings: t.estimator.min_readings,
                min_span_days: t.estimator.min_span_days,
                ewma_half_life_days: t.estimator.ewma_half_life_days,
                high_confidence_days: t.estimator.high_confidence_days,
                refill_jump_pct: t.estimator.refill_jump_pct,
                window_days: t.estimator.window_days,
                max_readings: t.estimator.max_readings,
            },
            decision: DecisionCfg {
                lead_time_buffer_days: t.decision.lead_time_buffer_days,
                supply_days: t.decision.supply_days,
            },
            detector: DetectorCfg {
                offline_after_hours: t.detector.offline_after_hours,
                anomaly_sigma: t.detector.anomaly_sigma,
                anomaly_min_deltas: t.detector.anomaly_min_deltas,
            },
            sweep: SweepCfg {
                workers: t.sweep.workers,
            },
        }
    }
}
