//! Bridges a single bookmaker quote to the scoreline model: price to
//! implied total goals, model-vs-market edge, and fractional-Kelly staking.

use crate::score_model::{ExpectedGoals, ModelError};

/// Comparison of the model against one quoted price.
///
/// `stake_fraction` is the raw Kelly fraction clamped at zero; a caller
/// sizes actual money via [`kelly_stake`], which applies the fractional
/// multiplier and bankroll.
#[derive(Debug, Clone, Copy)]
pub struct EdgeAssessment {
    pub model_probability: f64,
    pub market_probability: f64,
    pub edge: f64,
    pub stake_fraction: f64,
}

/// Map a decimal price for the reference total-goals market to an implied
/// match total, `c1 + c2 / ln(price + c3)`.
///
/// This is a fitted heuristic, not an inversion of the Poisson model; the
/// constants are deployment configuration and are not assumed to transfer
/// across leagues or seasons. A price at or below 1.0 is not a payout quote
/// and is rejected, as is any configuration that drives the log argument
/// to 1.0 or below.
pub fn implied_total_goals(price: f64, c1: f64, c2: f64, c3: f64) -> Result<f64, ModelError> {
    if !price.is_finite() || price <= 1.0 {
        return Err(ModelError::InvalidInput(format!(
            "decimal price must be finite and greater than 1.0, got {price}"
        )));
    }
    if !c1.is_finite() || !c2.is_finite() || !c3.is_finite() || c2 <= 0.0 {
        return Err(ModelError::InvalidInput(
            "calibration constants must be finite with c2 > 0".into(),
        ));
    }
    let arg = price + c3;
    if arg <= 1.0 {
        return Err(ModelError::InvalidInput(format!(
            "log argument {arg} is degenerate for price {price}"
        )));
    }
    let total = c1 + c2 / arg.ln();
    if !total.is_finite() || total <= 0.0 {
        return Err(ModelError::InvalidInput(format!(
            "implied total {total} is not a usable goals estimate"
        )));
    }
    Ok(total)
}

/// Split an implied match total between the sides using a fixed share for
/// the home team. The share is configuration, not fitted. Each side is
/// clamped to the same sane band the rating path uses.
pub fn split_total(total: f64, home_share: f64) -> Result<ExpectedGoals, ModelError> {
    if !total.is_finite() || total < 0.0 {
        return Err(ModelError::InvalidInput(format!(
            "total expected goals must be non-negative, got {total}"
        )));
    }
    if !home_share.is_finite() || home_share <= 0.0 || home_share >= 1.0 {
        return Err(ModelError::InvalidInput(format!(
            "home share must lie strictly inside (0, 1), got {home_share}"
        )));
    }
    Ok(ExpectedGoals {
        home: (total * home_share).clamp(0.05, 3.80),
        away: (total * (1.0 - home_share)).clamp(0.05, 3.80),
    })
}

/// Edge of the model against the market-implied probability `1 / price`.
///
/// No overround normalization across the full market is applied; quotes are
/// compared one at a time against their vig-inclusive implied probability.
pub fn evaluate_edge(model_probability: f64, price: f64) -> Result<EdgeAssessment, ModelError> {
    if !model_probability.is_finite() || !(0.0..=1.0).contains(&model_probability) {
        return Err(ModelError::InvalidInput(format!(
            "model probability must lie in [0, 1], got {model_probability}"
        )));
    }
    if !price.is_finite() || price <= 1.0 {
        return Err(ModelError::InvalidInput(format!(
            "decimal price must be finite and greater than 1.0, got {price}"
        )));
    }
    let market_probability = 1.0 / price;
    let edge = model_probability - market_probability;
    Ok(EdgeAssessment {
        model_probability,
        market_probability,
        edge,
        stake_fraction: raw_kelly_fraction(model_probability, price),
    })
}

/// Stake for one bet under fractional Kelly.
///
/// `b = price - 1`, `f* = (b·p - (1 - p)) / b`; a negative `f*` means no
/// bet, never a negative stake. The result is
/// `max(0, f*) · kelly_fraction · bankroll` rounded to cents.
pub fn kelly_stake(
    model_probability: f64,
    price: f64,
    bankroll: f64,
    kelly_fraction: f64,
) -> Result<f64, ModelError> {
    if !model_probability.is_finite() || !(0.0..=1.0).contains(&model_probability) {
        return Err(ModelError::InvalidInput(format!(
            "model probability must lie in [0, 1], got {model_probability}"
        )));
    }
    if !price.is_finite() || price <= 1.0 {
        return Err(ModelError::InvalidInput(format!(
            "Kelly needs positive net odds, price {price} gives none"
        )));
    }
    if !bankroll.is_finite() || bankroll < 0.0 {
        return Err(ModelError::InvalidInput(format!(
            "bankroll must be non-negative, got {bankroll}"
        )));
    }
    if !kelly_fraction.is_finite() || !(0.0..=1.0).contains(&kelly_fraction) {
        return Err(ModelError::InvalidInput(format!(
            "Kelly multiplier must lie in [0, 1], got {kelly_fraction}"
        )));
    }
    let stake = raw_kelly_fraction(model_probability, price) * kelly_fraction * bankroll;
    Ok(round_cents(stake))
}

fn raw_kelly_fraction(p: f64, price: f64) -> f64 {
    let b = price - 1.0;
    let raw = (b * p - (1.0 - p)) / b;
    raw.max(0.0)
}

fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn implied_total_decreases_as_over_price_rises() {
        let cheap = implied_total_goals(1.36, 2.48, 0.25, 0.08).unwrap();
        let mid = implied_total_goals(1.90, 2.48, 0.25, 0.08).unwrap();
        let long = implied_total_goals(3.00, 2.48, 0.25, 0.08).unwrap();
        assert!(cheap > mid && mid > long);
        assert!(long > 2.0, "even long over prices imply a playable total");
    }

    #[test]
    fn implied_total_rejects_unit_price() {
        assert!(implied_total_goals(1.0, 2.48, 0.25, 0.08).is_err());
        assert!(implied_total_goals(0.95, 2.48, 0.25, 0.08).is_err());
    }

    #[test]
    fn implied_total_rejects_degenerate_log() {
        // A negative offset can pull the argument under 1.0 even for a
        // price above it.
        assert!(implied_total_goals(1.2, 2.48, 0.25, -0.5).is_err());
    }

    #[test]
    fn split_respects_share_and_clamp() {
        let xg = split_total(2.8, 0.53).unwrap();
        assert_relative_eq!(xg.home, 2.8 * 0.53, epsilon = 1e-12);
        assert_relative_eq!(xg.away, 2.8 * 0.47, epsilon = 1e-12);
        let extreme = split_total(12.0, 0.53).unwrap();
        assert!(extreme.home <= 3.80 && extreme.away <= 3.80);
        assert!(split_total(2.8, 1.0).is_err());
    }

    #[test]
    fn edge_is_model_minus_implied() {
        let a = evaluate_edge(0.60, 2.00).unwrap();
        assert_relative_eq!(a.market_probability, 0.50, epsilon = 1e-12);
        assert_relative_eq!(a.edge, 0.10, epsilon = 1e-12);
        assert_relative_eq!(a.stake_fraction, 0.20, epsilon = 1e-12);
    }

    #[test]
    fn fair_price_has_no_edge_and_no_stake() {
        let a = evaluate_edge(0.50, 2.00).unwrap();
        assert_relative_eq!(a.edge, 0.0, epsilon = 1e-12);
        assert_relative_eq!(a.stake_fraction, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn negative_kelly_clamps_to_zero_stake() {
        let stake = kelly_stake(0.30, 1.50, 1000.0, 0.25).unwrap();
        assert_eq!(stake, 0.0);
    }

    #[test]
    fn quarter_kelly_stake_rounds_to_cents() {
        // b = 1.0, f* = 0.2, quarter Kelly on 100 is 5.00.
        let stake = kelly_stake(0.60, 2.00, 100.0, 0.25).unwrap();
        assert_relative_eq!(stake, 5.00, epsilon = 1e-12);
        let odd = kelly_stake(0.60, 2.00, 33.333, 0.25).unwrap();
        assert_relative_eq!(odd, 1.67, epsilon = 1e-12);
    }

    #[test]
    fn kelly_rejects_busted_inputs() {
        assert!(kelly_stake(0.5, 1.0, 100.0, 0.25).is_err());
        assert!(kelly_stake(1.5, 2.0, 100.0, 0.25).is_err());
        assert!(kelly_stake(0.5, 2.0, -1.0, 0.25).is_err());
        assert!(kelly_stake(0.5, 2.0, 100.0, 1.5).is_err());
    }
}
