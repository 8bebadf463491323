use thiserror::Error;

/// Engine failures are a single kind: a numeric precondition was violated.
/// Low or zero probabilities are ordinary results, never errors.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExpectedGoals {
    pub home: f64,
    pub away: f64,
}

/// Joint scoreline probabilities over `[0, K) x [0, K)` goals, row-major by
/// home goals. Immutable once built. The Poisson mass beyond the grid is
/// recorded in `tail_mass` instead of being folded into the edge cells.
#[derive(Debug, Clone)]
pub struct ScoreDistribution {
    limit: usize,
    cells: Vec<f64>,
    tail_mass: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct Scoreline {
    pub home: u8,
    pub away: u8,
    pub probability: f64,
}

#[derive(Debug, Clone)]
pub struct OutcomeProbabilities {
    pub home_win: f64,
    pub draw: f64,
    pub away_win: f64,
    /// `(line, P(total goals > line))` per requested half-integer line,
    /// ascending by line.
    pub over_lines: Vec<(f64, f64)>,
}

#[derive(Debug, Clone, Copy)]
pub struct DistributionHealth {
    /// Combined probability of the three most likely scorelines.
    pub top3_mass: f64,
    /// Shannon entropy over nonzero cells, in nats.
    pub entropy: f64,
}

pub const MIN_TRUNCATION_LIMIT: usize = 4;
pub const MAX_TRUNCATION_LIMIT: usize = 16;

pub fn compute_distribution(
    home_exp: f64,
    away_exp: f64,
    truncation_limit: usize,
    dc_rho: Option<f64>,
) -> Result<ScoreDistribution, ModelError> {
    if !home_exp.is_finite() || !away_exp.is_finite() {
        return Err(ModelError::InvalidInput(format!(
            "expected goals must be finite, got ({home_exp}, {away_exp})"
        )));
    }
    if home_exp < 0.0 || away_exp < 0.0 {
        return Err(ModelError::InvalidInput(format!(
            "expected goals must be non-negative, got ({home_exp}, {away_exp})"
        )));
    }
    if !(MIN_TRUNCATION_LIMIT..=MAX_TRUNCATION_LIMIT).contains(&truncation_limit) {
        return Err(ModelError::InvalidInput(format!(
            "truncation limit {truncation_limit} outside {MIN_TRUNCATION_LIMIT}..={MAX_TRUNCATION_LIMIT}"
        )));
    }
    if let Some(rho) = dc_rho {
        if !rho.is_finite() {
            return Err(ModelError::InvalidInput("dependence adjustment must be finite".into()));
        }
    }

    let pmf_home = poisson_pmf(home_exp, truncation_limit);
    let pmf_away = poisson_pmf(away_exp, truncation_limit);

    let mut cells = vec![0.0; truncation_limit * truncation_limit];
    for (h, ph) in pmf_home.iter().enumerate() {
        for (a, pa) in pmf_away.iter().enumerate() {
            cells[h * truncation_limit + a] = ph * pa;
        }
    }
    let covered: f64 = cells.iter().sum();

    if let Some(rho) = dc_rho {
        apply_low_score_correction(&mut cells, truncation_limit, home_exp, away_exp, rho);
        // The tau factors redistribute mass among the four low-score cells
        // and cancel exactly on an uncorrected product grid; rescaling makes
        // that explicit and also absorbs any clamped-negative cell.
        let corrected: f64 = cells.iter().sum();
        if corrected > 0.0 {
            let scale = covered / corrected;
            for cell in cells.iter_mut() {
                *cell *= scale;
            }
        }
    }

    Ok(ScoreDistribution {
        limit: truncation_limit,
        cells,
        tail_mass: (1.0 - covered).max(0.0),
    })
}

/// Dixon-Coles low-score factors: draws at 0-0 and 1-1 occur more often than
/// independent Poisson scoring predicts, 1-0 and 0-1 less often. `rho` is
/// typically a small negative number.
fn apply_low_score_correction(cells: &mut [f64], limit: usize, lambda: f64, mu: f64, rho: f64) {
    debug_assert!(limit >= 2);
    let tau = |h: usize, a: usize| -> f64 {
        match (h, a) {
            (0, 0) => 1.0 - lambda * mu * rho,
            (0, 1) => 1.0 + lambda * rho,
            (1, 0) => 1.0 + mu * rho,
            (1, 1) => 1.0 - rho,
            _ => 1.0,
        }
    };
    for h in 0..2 {
        for a in 0..2 {
            let idx = h * limit + a;
            cells[idx] = (cells[idx] * tau(h, a)).max(0.0);
        }
    }
}

impl ScoreDistribution {
    pub fn truncation_limit(&self) -> usize {
        self.limit
    }

    pub fn prob(&self, home: usize, away: usize) -> f64 {
        if home < self.limit && away < self.limit {
            self.cells[home * self.limit + away]
        } else {
            0.0
        }
    }

    pub fn total_mass(&self) -> f64 {
        self.cells.iter().sum()
    }

    /// Poisson mass lost to the grid boundary. Strictly shrinks as the
    /// truncation limit grows.
    pub fn tail_mass(&self) -> f64 {
        self.tail_mass
    }

    /// Advisory check: the discarded tail exceeds `tolerance`. Callers may
    /// log and proceed, or recompute with a larger truncation limit.
    pub fn truncation_warning(&self, tolerance: f64) -> bool {
        self.tail_mass > tolerance
    }

    pub fn cells(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .map(|(idx, &p)| (idx / self.limit, idx % self.limit, p))
    }
}

/// Sum grid regions into 1X2 and over-line probabilities. Lines must be
/// half-integers: a total can never tie one, so `>` vs `>=` is immaterial
/// and push/void handling never arises.
pub fn aggregate(
    dist: &ScoreDistribution,
    lines: &[f64],
) -> Result<OutcomeProbabilities, ModelError> {
    for &line in lines {
        if !line.is_finite() || line < 0.0 || (line.fract() - 0.5).abs() > 1e-9 {
            return Err(ModelError::InvalidInput(format!(
                "goal line {line} is not a half-integer"
            )));
        }
    }

    let mut sorted_lines: Vec<f64> = lines.to_vec();
    sorted_lines.sort_by(|a, b| a.partial_cmp(b).expect("lines are finite"));
    sorted_lines.dedup();

    let mut home_win = 0.0;
    let mut draw = 0.0;
    let mut away_win = 0.0;
    let mut over: Vec<f64> = vec![0.0; sorted_lines.len()];

    for (h, a, p) in dist.cells() {
        if h > a {
            home_win += p;
        } else if h == a {
            draw += p;
        } else {
            away_win += p;
        }
        let total = (h + a) as f64;
        for (slot, &line) in over.iter_mut().zip(sorted_lines.iter()) {
            if total > line {
                *slot += p;
            }
        }
    }

    Ok(OutcomeProbabilities {
        home_win,
        draw,
        away_win,
        over_lines: sorted_lines.into_iter().zip(over).collect(),
    })
}

impl OutcomeProbabilities {
    pub fn over(&self, line: f64) -> Option<f64> {
        self.over_lines
            .iter()
            .find(|(l, _)| (l - line).abs() < 1e-9)
            .map(|&(_, p)| p)
    }

    /// `P(total < line)` relative to the grid's covered mass.
    pub fn under(&self, line: f64, total_mass: f64) -> Option<f64> {
        self.over(line).map(|p| (total_mass - p).max(0.0))
    }
}

/// The `n` most likely scorelines, descending. Ties break toward fewer total
/// goals, then fewer home goals, so output order is reproducible.
pub fn top_scorelines(dist: &ScoreDistribution, n: usize) -> Vec<Scoreline> {
    let mut all: Vec<Scoreline> = dist
        .cells()
        .map(|(h, a, p)| Scoreline {
            home: h as u8,
            away: a as u8,
            probability: p,
        })
        .collect();
    all.sort_by(|x, y| {
        y.probability
            .partial_cmp(&x.probability)
            .expect("cell probabilities are finite")
            .then_with(|| {
                let (tx, ty) = (x.home as u16 + x.away as u16, y.home as u16 + y.away as u16);
                tx.cmp(&ty).then(x.home.cmp(&y.home))
            })
    });
    all.truncate(n);
    all
}

/// Concentration and entropy diagnostics. Raw numbers only: whether they
/// gate an alert is the presentation layer's policy, not the model's.
pub fn distribution_health(dist: &ScoreDistribution) -> DistributionHealth {
    let top3_mass = top_scorelines(dist, 3)
        .iter()
        .map(|s| s.probability)
        .sum();
    let entropy = -dist
        .cells()
        .filter(|&(_, _, p)| p > 0.0)
        .map(|(_, _, p)| p * p.ln())
        .sum::<f64>();
    DistributionHealth { top3_mass, entropy }
}

/// Poisson mass function for k = 0..limit via the multiplicative recurrence.
/// Mass above the grid is intentionally left out; see `tail_mass`.
fn poisson_pmf(lambda: f64, limit: usize) -> Vec<f64> {
    let mut out = Vec::with_capacity(limit);
    out.push((-lambda).exp());
    for k in 1..limit {
        let prev = out[k - 1];
        out.push(prev * lambda / k as f64);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn pmf_matches_closed_form() {
        let pmf = poisson_pmf(1.8, 6);
        assert_relative_eq!(pmf[0], (-1.8_f64).exp(), epsilon = 1e-12);
        assert_relative_eq!(pmf[3], (-1.8_f64).exp() * 1.8_f64.powi(3) / 6.0, epsilon = 1e-12);
    }

    #[test]
    fn zero_rate_shuts_out_scoring() {
        let dist = compute_distribution(0.0, 1.3, 10, None).unwrap();
        for a in 0..10 {
            assert_eq!(dist.prob(1, a), 0.0);
        }
        assert!(dist.prob(0, 1) > 0.0);
    }

    #[test]
    fn negative_rate_is_rejected() {
        assert!(matches!(
            compute_distribution(-0.1, 1.0, 10, None),
            Err(ModelError::InvalidInput(_))
        ));
    }

    #[test]
    fn non_finite_rate_is_rejected() {
        assert!(compute_distribution(f64::NAN, 1.0, 10, None).is_err());
        assert!(compute_distribution(1.0, f64::INFINITY, 10, None).is_err());
    }

    #[test]
    fn out_of_range_limit_is_rejected() {
        assert!(compute_distribution(1.5, 1.1, 3, None).is_err());
        assert!(compute_distribution(1.5, 1.1, 17, None).is_err());
    }

    #[test]
    fn correction_raises_draws_and_lowers_near_misses() {
        let plain = compute_distribution(1.4, 1.2, 10, None).unwrap();
        let adjusted = compute_distribution(1.4, 1.2, 10, Some(-0.12)).unwrap();
        assert!(adjusted.prob(0, 0) > plain.prob(0, 0));
        assert!(adjusted.prob(1, 1) > plain.prob(1, 1));
        assert!(adjusted.prob(0, 1) < plain.prob(0, 1));
        assert!(adjusted.prob(1, 0) < plain.prob(1, 0));
        assert_relative_eq!(adjusted.prob(2, 2), plain.prob(2, 2), epsilon = 1e-12);
    }

    #[test]
    fn correction_preserves_covered_mass() {
        let plain = compute_distribution(1.8, 1.1, 10, None).unwrap();
        let adjusted = compute_distribution(1.8, 1.1, 10, Some(-0.10)).unwrap();
        assert_relative_eq!(adjusted.total_mass(), plain.total_mass(), epsilon = 1e-12);
    }

    #[test]
    fn extreme_rho_never_leaves_negative_cells() {
        let dist = compute_distribution(3.0, 3.0, 10, Some(-0.5)).unwrap();
        for (_, _, p) in dist.cells() {
            assert!(p >= 0.0);
        }
    }

    #[test]
    fn integer_line_is_rejected() {
        let dist = compute_distribution(1.5, 1.1, 10, None).unwrap();
        assert!(aggregate(&dist, &[2.0]).is_err());
    }

    #[test]
    fn under_complements_over() {
        let dist = compute_distribution(1.5, 1.1, 10, None).unwrap();
        let agg = aggregate(&dist, &[2.5]).unwrap();
        let over = agg.over(2.5).unwrap();
        let under = agg.under(2.5, dist.total_mass()).unwrap();
        assert_relative_eq!(over + under, dist.total_mass(), epsilon = 1e-12);
    }

    #[test]
    fn top_scorelines_tie_break_is_deterministic() {
        // Symmetric rates make (1,0) and (0,1) exact ties; fewer home goals
        // must come last between them only via the home-goals rule.
        let dist = compute_distribution(1.0, 1.0, 10, None).unwrap();
        let top = top_scorelines(&dist, 4);
        let pairs: Vec<(u8, u8)> = top.iter().map(|s| (s.home, s.away)).collect();
        let p01 = pairs.iter().position(|&p| p == (0, 1)).unwrap();
        let p10 = pairs.iter().position(|&p| p == (1, 0)).unwrap();
        assert!(p01 < p10);
    }

    #[test]
    fn top_scorelines_handles_small_grids() {
        let dist = compute_distribution(1.0, 1.0, 4, None).unwrap();
        assert_eq!(top_scorelines(&dist, 100).len(), 16);
    }

    #[test]
    fn degenerate_inputs_produce_low_entropy() {
        let sharp = compute_distribution(0.01, 0.01, 10, None).unwrap();
        let diffuse = compute_distribution(1.8, 1.4, 10, None).unwrap();
        let sharp_health = distribution_health(&sharp);
        let diffuse_health = distribution_health(&diffuse);
        assert!(sharp_health.entropy < diffuse_health.entropy);
        assert!(sharp_health.top3_mass > diffuse_health.top3_mass);
        assert!(sharp_health.top3_mass > 0.99);
    }
}
