use std::env;

use serde::{Deserialize, Serialize};

use crate::score_model::{DistributionHealth, OutcomeProbabilities};

/// How a match should be surfaced by the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalGrade {
    /// Model beats a quoted price by the configured margin.
    ValueEdge,
    /// One outcome dominates outright.
    HighConfidence,
    /// Home-or-draw combined dominates.
    DoubleChance,
    /// Nothing worth highlighting.
    Flat,
}

/// Alerting thresholds in one named, tunable object. The engine modules
/// only produce numbers; every decision about what counts as a signal
/// lives here, outside the model.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SignalPolicy {
    /// Minimum model-minus-market edge to flag a quote.
    pub min_edge: f64,
    /// Minimum single-outcome probability for a confidence flag.
    pub min_model_prob: f64,
    /// Minimum home-or-draw probability for a double-chance flag.
    pub min_double_chance: f64,
    /// Distributions more concentrated than this are treated as suspect,
    /// not as signals.
    pub max_top3_mass: f64,
    /// Distributions flatter than this entropy floor are likewise suspect.
    pub min_entropy: f64,
    /// Quotes outside this price band are ignored for value flags.
    pub min_price: f64,
    pub max_price: f64,
}

impl Default for SignalPolicy {
    fn default() -> Self {
        Self {
            min_edge: 0.04,
            min_model_prob: 0.75,
            min_double_chance: 0.85,
            max_top3_mass: 0.95,
            min_entropy: 0.50,
            min_price: 1.10,
            max_price: 12.0,
        }
    }
}

impl SignalPolicy {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            min_edge: env_f64("SIGNAL_MIN_EDGE", d.min_edge).clamp(0.0, 0.5),
            min_model_prob: env_f64("SIGNAL_MIN_MODEL_PROB", d.min_model_prob).clamp(0.5, 1.0),
            min_double_chance: env_f64("SIGNAL_MIN_DOUBLE_CHANCE", d.min_double_chance)
                .clamp(0.5, 1.0),
            max_top3_mass: env_f64("SIGNAL_MAX_TOP3_MASS", d.max_top3_mass).clamp(0.3, 1.0),
            min_entropy: env_f64("SIGNAL_MIN_ENTROPY", d.min_entropy).clamp(0.0, 3.0),
            min_price: env_f64("SIGNAL_MIN_PRICE", d.min_price).max(1.01),
            max_price: env_f64("SIGNAL_MAX_PRICE", d.max_price).max(1.10),
        }
    }

    /// Whether a quote is even eligible for a value flag.
    pub fn price_in_band(&self, price: f64) -> bool {
        price >= self.min_price && price <= self.max_price
    }

    /// Whether the distribution behind a result looks numerically healthy
    /// enough to alert on at all.
    pub fn health_ok(&self, health: DistributionHealth) -> bool {
        health.entropy >= self.min_entropy && health.top3_mass <= self.max_top3_mass
    }

    pub fn classify(
        &self,
        outcome: &OutcomeProbabilities,
        health: DistributionHealth,
        best_edge: Option<(f64, f64)>,
    ) -> SignalGrade {
        if !self.health_ok(health) {
            return SignalGrade::Flat;
        }
        if let Some((edge, price)) = best_edge {
            if edge >= self.min_edge && self.price_in_band(price) {
                return SignalGrade::ValueEdge;
            }
        }
        let strongest = outcome.home_win.max(outcome.draw).max(outcome.away_win);
        if strongest >= self.min_model_prob {
            return SignalGrade::HighConfidence;
        }
        if outcome.home_win + outcome.draw >= self.min_double_chance {
            return SignalGrade::DoubleChance;
        }
        SignalGrade::Flat
    }
}

fn env_f64(name: &str, default: f64) -> f64 {
    env::var(name)
        .ok()
        .and_then(|raw| raw.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn healthy() -> DistributionHealth {
        DistributionHealth {
            top3_mass: 0.31,
            entropy: 3.0,
        }
    }

    fn outcome(home: f64, draw: f64, away: f64) -> OutcomeProbabilities {
        OutcomeProbabilities {
            home_win: home,
            draw,
            away_win: away,
            over_lines: Vec::new(),
        }
    }

    #[test]
    fn degenerate_distribution_never_signals() {
        let policy = SignalPolicy::default();
        let spike = DistributionHealth {
            top3_mass: 0.999,
            entropy: 0.01,
        };
        let grade = policy.classify(&outcome(0.95, 0.03, 0.02), spike, Some((0.30, 2.0)));
        assert_eq!(grade, SignalGrade::Flat);
    }

    #[test]
    fn value_edge_outranks_confidence() {
        let policy = SignalPolicy::default();
        let grade = policy.classify(&outcome(0.80, 0.12, 0.08), healthy(), Some((0.06, 2.2)));
        assert_eq!(grade, SignalGrade::ValueEdge);
    }

    #[test]
    fn dominant_outcome_flags_confidence() {
        let policy = SignalPolicy::default();
        let grade = policy.classify(&outcome(0.78, 0.14, 0.08), healthy(), None);
        assert_eq!(grade, SignalGrade::HighConfidence);
    }

    #[test]
    fn home_or_draw_flags_double_chance() {
        let policy = SignalPolicy::default();
        let grade = policy.classify(&outcome(0.62, 0.25, 0.13), healthy(), None);
        assert_eq!(grade, SignalGrade::DoubleChance);
    }

    #[test]
    fn out_of_band_price_cannot_flag_value() {
        let policy = SignalPolicy::default();
        let grade = policy.classify(&outcome(0.40, 0.30, 0.30), healthy(), Some((0.20, 30.0)));
        assert_eq!(grade, SignalGrade::Flat);
    }
}
