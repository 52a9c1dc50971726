#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schemas for the SmartBox engine.
//!
//! `EngineToml` and sub-structs are deserialized from TOML and validated.
//! The host converts them into `smartbox_core` config structs via `From`.

use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EstimatorToml {
    /// Days since box activation before steady-state estimation is allowed.
    pub learning_days: i64,
    /// Minimum reading count before leaving learning mode.
    pub min_readings: usize,
    /// Minimum effective data span in days before leaving learning mode.
    pub min_span_days: f64,
    /// EWMA half-life over daily rates (days).
    pub ewma_half_life_days: f64,
    /// Continuous post-refill days required for high confidence.
    pub high_confidence_days: f64,
    /// Minimum positive fill jump (pct points) treated as a refill.
    pub refill_jump_pct: f64,
    /// Rolling reading-history window (days).
    pub window_days: i64,
    /// Cap on readings considered per box.
    pub max_readings: usize,
}

impl Default for EstimatorToml {
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

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DecisionToml {
    /// Predictive triggers fire when days-to-threshold drops to this buffer.
    /// Also accepts alias "lead_time_days".
    #[serde(alias = "lead_time_days")]
    pub lead_time_buffer_days: f64,
    /// Days of supply a Smart-tier reorder should cover.
    pub supply_days: f64,
}

impl Default for DecisionToml {
    fn default() -> Self {
        Self {
            lead_time_buffer_days: 3.0,
            supply_days: 30.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DetectorToml {
    /// A box is offline once no reading arrived for this long (hours).
    pub offline_after_hours: i64,
    /// Sigma multiplier for the anomaly delta check.
    pub anomaly_sigma: f64,
    /// Minimum historical delta count before the sigma check applies.
    pub anomaly_min_deltas: usize,
}

impl Default for DetectorToml {
    fn default() -> Self {
        Self {
            offline_after_hours: 48,
            anomaly_sigma: 3.0,
            anomaly_min_deltas: 5,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SweepToml {
    /// Worker threads evaluating boxes in parallel during the daily sweep.
    pub workers: usize,
}

impl Default for SweepToml {
    fn default() -> Self {
        Self { workers: 4 }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct EngineToml {
    pub estimator: EstimatorToml,
    pub decision: DecisionToml,
    pub detector: DetectorToml,
    pub sweep: SweepToml,
}

pub fn load_toml(s: &str) -> Result<EngineToml, toml::de::Error> {
    toml::from_str::<EngineToml>(s)
}

impl EngineToml {
    pub fn validate(&self) -> eyre::Result<()> {
        // Estimator
        if self.estimator.learning_days < 1 {
            eyre::bail!("estimator.learning_days must be >= 1");
        }
        if self.estimator.min_readings < 2 {
            eyre::bail!("estimator.min_readings must be >= 2");
        }
        if self.estimator.min_span_days <= 0.0 {
            eyre::bail!("estimator.min_span_days must be > 0");
        }
        if self.estimator.ewma_half_life_days <= 0.0 {
            eyre::bail!("estimator.ewma_half_life_days must be > 0");
        }
        if self.estimator.high_confidence_days <= 0.0 {
            eyre::bail!("estimator.high_confidence_days must be > 0");
        }
        if self.estimator.refill_jump_pct <= 0.0 || self.estimator.refill_jump_pct > 100.0 {
            eyre::bail!("estimator.refill_jump_pct must be in (0, 100]");
        }
        if self.estimator.window_days < 1 {
            eyre::bail!("estimator.window_days must be >= 1");
        }
        if self.estimator.max_readings < 1 {
            eyre::bail!("estimator.max_readings must be >= 1");
        }

        // Decision
        if self.decision.lead_time_buffer_days < 0.0 {
            eyre::bail!("decision.lead_time_buffer_days must be >= 0");
        }
        if self.decision.supply_days <= 0.0 {
            eyre::bail!("decision.supply_days must be > 0");
        }

        // Detector
        if self.detector.offline_after_hours < 1 {
            eyre::bail!("detector.offline_after_hours must be >= 1");
        }
        if self.detector.anomaly_sigma <= 0.0 {
            eyre::bail!("detector.anomaly_sigma must be > 0");
        }
        if self.detector.anomaly_min_deltas < 1 {
            eyre::bail!("detector.anomaly_min_deltas must be >= 1");
        }

        // Sweep
        if self.sweep.workers == 0 {
            eyre::bail!("sweep.workers must be >= 1");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn defaults_validate() {
        EngineToml::default().validate().unwrap();
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let cfg = load_toml(
            r#"
            [decision]
            lead_time_days = 5.0
            "#,
        )
        .unwrap();
        assert_eq!(cfg.decision.lead_time_buffer_days, 5.0);
        assert_eq!(cfg.estimator.learning_days, 14);
        cfg.validate().unwrap();
    }

    #[rstest]
    #[case("[sweep]\nworkers = 0\n", "workers")]
    #[case("[estimator]\nmax_readings = 0\n", "max_readings")]
    #[case("[estimator]\nmin_readings = 1\n", "min_readings")]
    #[case("[estimator]\nrefill_jump_pct = 0.0\n", "refill_jump_pct")]
    #[case("[estimator]\nhigh_confidence_days = 0.0\n", "high_confidence_days")]
    #[case("[detector]\noffline_after_hours = 0\n", "offline_after_hours")]
    #[case("[detector]\nanomaly_min_deltas = 0\n", "anomaly_min_deltas")]
    #[case("[decision]\nsupply_days = 0.0\n", "supply_days")]
    fn rejects_out_of_range_values(#[case] toml_src: &str, #[case] field: &str) {
        let cfg = load_toml(toml_src).unwrap();
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains(field), "{err}");
    }

    #[test]
    fn small_reading_caps_pass_validation() {
        let cfg = load_toml("[estimator]\nmax_readings = 10\n").unwrap();
        cfg.validate().unwrap();
    }
}
