use approx::assert_relative_eq;

use goalmetric::score_model::{
    aggregate, compute_distribution, distribution_health, top_scorelines,
};

#[test]
fn covered_mass_plus_tail_is_unity() {
    for &(home, away) in &[(1.8, 1.1), (0.4, 0.3), (2.9, 2.4), (0.0, 1.5)] {
        for limit in [6, 8, 10, 12] {
            let dist = compute_distribution(home, away, limit, None).unwrap();
            assert_relative_eq!(
                dist.total_mass() + dist.tail_mass(),
                1.0,
                epsilon = 1e-6
            );
        }
    }
}

#[test]
fn tail_mass_strictly_decreases_with_limit() {
    let mut prev = f64::INFINITY;
    for limit in [6, 8, 10, 12, 14] {
        let dist = compute_distribution(1.8, 1.1, limit, None).unwrap();
        assert!(
            dist.tail_mass() < prev,
            "tail at K={limit} did not shrink: {} vs {}",
            dist.tail_mass(),
            prev
        );
        prev = dist.tail_mass();
    }
}

#[test]
fn outcome_sum_matches_grid_mass() {
    for rho in [None, Some(-0.10), Some(-0.15)] {
        let dist = compute_distribution(1.8, 1.1, 10, rho).unwrap();
        let agg = aggregate(&dist, &[1.5, 2.5, 3.5, 4.5]).unwrap();
        assert_relative_eq!(
            agg.home_win + agg.draw + agg.away_win,
            dist.total_mass(),
            epsilon = 1e-9
        );
    }
}

#[test]
fn over_probability_is_monotone_in_the_line() {
    let dist = compute_distribution(1.6, 1.3, 12, Some(-0.1)).unwrap();
    let agg = aggregate(&dist, &[0.5, 1.5, 2.5, 3.5, 4.5, 5.5]).unwrap();
    for pair in agg.over_lines.windows(2) {
        assert!(
            pair[0].1 >= pair[1].1,
            "over({}) < over({})",
            pair[0].0,
            pair[1].0
        );
    }
}

#[test]
fn identical_inputs_give_identical_grids() {
    let a = compute_distribution(1.73, 0.94, 10, Some(-0.12)).unwrap();
    let b = compute_distribution(1.73, 0.94, 10, Some(-0.12)).unwrap();
    for h in 0..10 {
        for away in 0..10 {
            assert_eq!(a.prob(h, away), b.prob(h, away));
        }
    }
}

#[test]
fn swapping_sides_transposes_the_grid() {
    let ab = compute_distribution(1.8, 1.1, 10, None).unwrap();
    let ba = compute_distribution(1.1, 1.8, 10, None).unwrap();
    for h in 0..10 {
        for away in 0..10 {
            assert_relative_eq!(ab.prob(h, away), ba.prob(away, h), epsilon = 1e-12);
        }
    }
}

// Baseline figures for lambda 1.8 vs 1.1 on a 10x10 grid, computed once
// from the independent bivariate Poisson table and pinned.
#[test]
fn independent_poisson_baseline() {
    let dist = compute_distribution(1.8, 1.1, 10, None).unwrap();
    let agg = aggregate(&dist, &[2.5]).unwrap();
    assert_relative_eq!(agg.home_win, 0.537580, epsilon = 1e-4);
    assert_relative_eq!(agg.draw, 0.231353, epsilon = 1e-4);
    assert_relative_eq!(agg.away_win, 0.231048, epsilon = 1e-4);
    assert_relative_eq!(agg.over(2.5).unwrap(), 0.554017, epsilon = 1e-4);
}

// Same fixture with the low-score correction: draws gain mass, mostly from
// the home side, and markets above the corrected cells are untouched.
#[test]
fn low_score_correction_baseline() {
    let dist = compute_distribution(1.8, 1.1, 10, Some(-0.10)).unwrap();
    let agg = aggregate(&dist, &[2.5]).unwrap();
    assert_relative_eq!(agg.home_win, 0.526685, epsilon = 1e-4);
    assert_relative_eq!(agg.draw, 0.253142, epsilon = 1e-4);
    assert_relative_eq!(agg.away_win, 0.220153, epsilon = 1e-4);
    assert_relative_eq!(agg.over(2.5).unwrap(), 0.554017, epsilon = 1e-4);
}

#[test]
fn truncation_warning_fires_only_for_small_grids() {
    let coarse = compute_distribution(1.8, 1.1, 6, None).unwrap();
    let fine = compute_distribution(1.8, 1.1, 10, None).unwrap();
    assert!(coarse.truncation_warning(0.005));
    assert!(!fine.truncation_warning(0.005));
}

#[test]
fn diagnostics_baseline() {
    let dist = compute_distribution(1.8, 1.1, 10, None).unwrap();
    let health = distribution_health(&dist);
    assert_relative_eq!(health.entropy, 3.004, epsilon = 1e-2);
    assert_relative_eq!(health.top3_mass, 0.306, epsilon = 1e-2);
}

#[test]
fn most_likely_scoreline_for_home_favourite() {
    let dist = compute_distribution(1.8, 1.1, 10, None).unwrap();
    let top = top_scorelines(&dist, 3);
    assert_eq!(top.len(), 3);
    assert_eq!((top[0].home, top[0].away), (1, 1));
    assert!(top[0].probability >= top[1].probability);
    assert!(top[1].probability >= top[2].probability);
}
