use serde::{Deserialize, Serialize};

use crate::league_params::LeagueParams;
use crate::score_model::ExpectedGoals;

/// Aggregate scoring record for one team, as reported by the standings
/// provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandingsRow {
    pub team: String,
    pub played: u32,
    pub goals_for: u32,
    pub goals_against: u32,
}

/// Multiplicative strengths relative to the league average: attack above 1.0
/// scores more than a typical side, defense above 1.0 concedes more.
#[derive(Debug, Clone, Copy)]
pub struct TeamStrength {
    pub attack: f64,
    pub defense: f64,
}

const NEUTRAL: TeamStrength = TeamStrength {
    attack: 1.0,
    defense: 1.0,
};

// Records shorter than this get shrunk toward neutral so a 2-0 opening day
// does not read as a juggernaut.
const FULL_WEIGHT_MATCHES: f64 = 6.0;

pub fn team_strength(row: &StandingsRow, league: &LeagueParams) -> Option<TeamStrength> {
    if row.played == 0 {
        return None;
    }
    let per_side = (league.goals_total_base / 2.0).max(0.1);
    let raw_attack = (row.goals_for as f64 / row.played as f64) / per_side;
    let raw_defense = (row.goals_against as f64 / row.played as f64) / per_side;
    let w = (row.played as f64 / FULL_WEIGHT_MATCHES).clamp(0.0, 1.0);
    Some(TeamStrength {
        attack: shrink(raw_attack, w),
        defense: shrink(raw_defense, w),
    })
}

fn shrink(raw: f64, weight: f64) -> f64 {
    (weight * raw + (1.0 - weight) * NEUTRAL.attack).clamp(0.25, 4.0)
}

/// Compose two teams' strengths with the league baselines into per-side
/// expected goals. Lambdas stay inside the same band the live model uses.
pub fn expected_goals(
    home: &TeamStrength,
    away: &TeamStrength,
    league: &LeagueParams,
) -> ExpectedGoals {
    ExpectedGoals {
        home: (league.home_baseline() * home.attack * away.defense).clamp(0.20, 3.80),
        away: (league.away_baseline() * away.attack * home.defense).clamp(0.20, 3.80),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::LeagueMode;
    use approx::assert_relative_eq;

    fn league() -> LeagueParams {
        LeagueParams::for_mode(LeagueMode::PremierLeague)
    }

    fn row(team: &str, played: u32, gf: u32, ga: u32) -> StandingsRow {
        StandingsRow {
            team: team.to_string(),
            played,
            goals_for: gf,
            goals_against: ga,
        }
    }

    #[test]
    fn unplayed_team_has_no_strength() {
        assert!(team_strength(&row("NEW", 0, 0, 0), &league()).is_none());
    }

    #[test]
    fn average_team_is_neutral() {
        // 2.85 goals/match league: an average side scores 1.425 per match.
        let s = team_strength(&row("AVG", 20, 28, 29), &league()).unwrap();
        assert!((s.attack - 1.0).abs() < 0.05);
        assert!((s.defense - 1.0).abs() < 0.05);
    }

    #[test]
    fn short_record_shrinks_toward_neutral() {
        let hot = team_strength(&row("HOT", 2, 8, 0), &league()).unwrap();
        let full = TeamStrength {
            attack: (8.0 / 2.0) / (2.85 / 2.0),
            defense: 0.0,
        };
        assert!(hot.attack < full.attack);
        assert!(hot.attack > 1.0);
        assert!(hot.defense > 0.25);
    }

    #[test]
    fn strong_home_side_outscores_baseline() {
        let strong = TeamStrength {
            attack: 1.3,
            defense: 0.8,
        };
        let xg = expected_goals(&strong, &NEUTRAL, &league());
        assert_relative_eq!(xg.home, league().home_baseline() * 1.3, epsilon = 1e-12);
        assert!(xg.away < league().away_baseline() + 1e-12);
    }

    #[test]
    fn lambdas_stay_in_band() {
        let monster = TeamStrength {
            attack: 4.0,
            defense: 4.0,
        };
        let xg = expected_goals(&monster, &monster, &league());
        assert!(xg.home <= 3.80 && xg.away <= 3.80);
    }
}
