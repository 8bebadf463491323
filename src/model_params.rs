use std::env;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::score_model::{MAX_TRUNCATION_LIMIT, MIN_TRUNCATION_LIMIT};

/// Every tunable the engine consumes, in one explicit structure. Nothing in
/// the model code reads the environment or hides a magic number; deployments
/// override these via `MODEL_*` variables loaded from `.env`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ModelParams {
    /// Scoreline grid bound K; the grid costs O(K^2) and the discarded tail
    /// shrinks as K grows.
    pub truncation_limit: usize,
    /// Dixon-Coles low-score dependence; `None` means pure independence.
    pub dc_rho: Option<f64>,
    /// Share of an implied match total credited to the home side.
    pub home_share: f64,
    /// Price-to-total calibration constants.
    pub inv_c1: f64,
    pub inv_c2: f64,
    pub inv_c3: f64,
    /// Fractional Kelly multiplier applied to every stake.
    pub kelly_fraction: f64,
    /// Bankroll the stake sizing draws against.
    pub bankroll: f64,
    /// Advisory ceiling on acceptable truncated tail mass.
    pub tail_tolerance: f64,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            truncation_limit: 10,
            dc_rho: Some(-0.10),
            home_share: 0.53,
            inv_c1: 2.48,
            inv_c2: 0.25,
            inv_c3: 0.08,
            kelly_fraction: 0.25,
            bankroll: 100.0,
            tail_tolerance: 0.005,
        }
    }
}

impl ModelParams {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            truncation_limit: env_usize("MODEL_MAX_GOALS", d.truncation_limit)
                .clamp(MIN_TRUNCATION_LIMIT, MAX_TRUNCATION_LIMIT),
            dc_rho: match env::var("MODEL_DC_RHO").ok().as_deref() {
                Some("off") => None,
                Some(raw) => raw.trim().parse::<f64>().ok().map(|v| v.clamp(-0.5, 0.5)).or(d.dc_rho),
                None => d.dc_rho,
            },
            home_share: env_f64("MODEL_HOME_SHARE", d.home_share).clamp(0.35, 0.65),
            inv_c1: env_f64("MODEL_CALIB_C1", d.inv_c1),
            inv_c2: env_f64("MODEL_CALIB_C2", d.inv_c2),
            inv_c3: env_f64("MODEL_CALIB_C3", d.inv_c3),
            kelly_fraction: env_f64("KELLY_FRACTION", d.kelly_fraction).clamp(0.0, 1.0),
            bankroll: env_f64("BANKROLL", d.bankroll).max(0.0),
            tail_tolerance: env_f64("TAIL_TOLERANCE", d.tail_tolerance).clamp(1e-6, 0.05),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(MIN_TRUNCATION_LIMIT..=MAX_TRUNCATION_LIMIT).contains(&self.truncation_limit) {
            anyhow::bail!(
                "MODEL_MAX_GOALS must lie in {MIN_TRUNCATION_LIMIT}..={MAX_TRUNCATION_LIMIT}"
            );
        }
        if !(0.0..1.0).contains(&self.home_share) || self.home_share <= 0.0 {
            anyhow::bail!("MODEL_HOME_SHARE must lie strictly inside (0, 1)");
        }
        if self.inv_c2 <= 0.0 {
            anyhow::bail!("MODEL_CALIB_C2 must be positive");
        }
        if !(0.0..=1.0).contains(&self.kelly_fraction) {
            anyhow::bail!("KELLY_FRACTION must lie in [0, 1]");
        }
        if self.bankroll < 0.0 {
            anyhow::bail!("BANKROLL must be non-negative");
        }
        Ok(())
    }
}

fn env_f64(name: &str, default: f64) -> f64 {
    env::var(name)
        .ok()
        .and_then(|raw| raw.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(default)
}

fn env_usize(name: &str, default: usize) -> usize {
    env::var(name)
        .ok()
        .and_then(|raw| raw.trim().parse::<usize>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(ModelParams::default().validate().is_ok());
    }

    #[test]
    fn busted_share_fails_validation() {
        let params = ModelParams {
            home_share: 1.0,
            ..ModelParams::default()
        };
        assert!(params.validate().is_err());
    }
}
