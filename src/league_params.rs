use serde::{Deserialize, Serialize};

use crate::state::LeagueMode;

/// Per-league scoring baselines. These are configuration, not fitted values:
/// the engine never estimates them from history.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LeagueParams {
    pub league_id: u32,
    /// Average total goals per match in this league.
    pub goals_total_base: f64,
    /// Average home-minus-away goal difference.
    pub home_adv_goals: f64,
    /// Dixon-Coles rho suited to this league's draw rate.
    pub dc_rho: f64,
}

impl LeagueParams {
    pub fn defaults(league_id: u32) -> Self {
        Self {
            league_id,
            goals_total_base: 2.60,
            home_adv_goals: 0.25,
            dc_rho: -0.10,
        }
    }

    pub fn for_mode(mode: LeagueMode) -> Self {
        let (league_id, goals_total_base, home_adv_goals) = match mode {
            LeagueMode::PremierLeague => (39, 2.85, 0.25),
            LeagueMode::LaLiga => (140, 2.55, 0.30),
            LeagueMode::BrazilSerieA => (71, 2.30, 0.38),
            LeagueMode::BrazilSerieB => (72, 2.15, 0.35),
            LeagueMode::Bundesliga => (78, 3.10, 0.24),
        };
        Self {
            league_id,
            goals_total_base,
            home_adv_goals,
            ..Self::defaults(league_id)
        }
    }

    /// Baseline expected goals for an average home side in this league.
    pub fn home_baseline(&self) -> f64 {
        ((self.goals_total_base + self.home_adv_goals) / 2.0).clamp(0.20, 3.80)
    }

    /// Baseline expected goals for an average away side in this league.
    pub fn away_baseline(&self) -> f64 {
        ((self.goals_total_base - self.home_adv_goals) / 2.0).clamp(0.20, 3.80)
    }
}
