use approx::assert_relative_eq;

use goalmetric::model_params::ModelParams;
use goalmetric::odds_model::{evaluate_edge, implied_total_goals, kelly_stake, split_total};
use goalmetric::score_model::{aggregate, compute_distribution};

fn implied_with_defaults(price: f64) -> f64 {
    let p = ModelParams::default();
    implied_total_goals(price, p.inv_c1, p.inv_c2, p.inv_c3).unwrap()
}

#[test]
fn reference_price_implies_a_realistic_total() {
    let total = implied_with_defaults(1.90);
    assert!(
        (2.6..=3.1).contains(&total),
        "implied total {total} outside the calibrated band"
    );
}

#[test]
fn shorter_over_prices_imply_more_goals() {
    let steps = [1.30, 1.55, 1.90, 2.40, 3.20];
    let totals: Vec<f64> = steps.iter().map(|&p| implied_with_defaults(p)).collect();
    for pair in totals.windows(2) {
        assert!(pair[0] > pair[1]);
    }
}

#[test]
fn inversion_rejects_non_payout_prices() {
    let p = ModelParams::default();
    assert!(implied_total_goals(1.0, p.inv_c1, p.inv_c2, p.inv_c3).is_err());
    assert!(implied_total_goals(0.5, p.inv_c1, p.inv_c2, p.inv_c3).is_err());
    assert!(implied_total_goals(f64::NAN, p.inv_c1, p.inv_c2, p.inv_c3).is_err());
    // A degenerate log argument must error rather than yield nonsense.
    assert!(implied_total_goals(1.2, p.inv_c1, p.inv_c2, -0.4).is_err());
}

// Inverting a price, rebuilding the distribution, and reading the same
// market back should land near the price's own implied probability; the
// gap is the model's deliberate edge, not an inconsistency.
#[test]
fn price_survives_the_round_trip_within_model_edge() {
    let params = ModelParams::default();
    let price = 1.90;

    let total = implied_with_defaults(price);
    let expected = split_total(total, params.home_share).unwrap();
    let dist = compute_distribution(
        expected.home,
        expected.away,
        params.truncation_limit,
        params.dc_rho,
    )
    .unwrap();
    let agg = aggregate(&dist, &[2.5]).unwrap();

    let model_over = agg.over(2.5).unwrap();
    let market_over = 1.0 / price;
    assert!(
        (model_over - market_over).abs() < 0.05,
        "model {model_over} strayed from market {market_over}"
    );
}

#[test]
fn edge_and_stake_agree_on_sign() {
    let value = evaluate_edge(0.60, 2.00).unwrap();
    assert!(value.edge > 0.0);
    assert!(kelly_stake(0.60, 2.00, 100.0, 0.25).unwrap() > 0.0);

    let dead = evaluate_edge(0.40, 2.00).unwrap();
    assert!(dead.edge < 0.0);
    assert_eq!(kelly_stake(0.40, 2.00, 100.0, 0.25).unwrap(), 0.0);
}

#[test]
fn negative_kelly_is_a_zero_stake_not_a_short() {
    let stake = kelly_stake(0.30, 1.50, 500.0, 0.25).unwrap();
    assert_eq!(stake, 0.0);
}

#[test]
fn full_kelly_known_value() {
    // p = 0.55 at evens: f* = 0.10 of bankroll.
    let stake = kelly_stake(0.55, 2.00, 1000.0, 1.0).unwrap();
    assert_relative_eq!(stake, 100.0, epsilon = 1e-9);
}

#[test]
fn stake_scales_with_the_fractional_multiplier() {
    let full = kelly_stake(0.60, 2.00, 100.0, 1.0).unwrap();
    let quarter = kelly_stake(0.60, 2.00, 100.0, 0.25).unwrap();
    assert_relative_eq!(quarter * 4.0, full, epsilon = 1e-9);
}

#[test]
fn kelly_rejects_unit_price() {
    assert!(kelly_stake(0.5, 1.0, 100.0, 0.25).is_err());
}
