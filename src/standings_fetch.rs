use anyhow::{Context, Result};
use serde::Deserialize;

use crate::http_cache::fetch_json_cached;
use crate::http_client::http_client;
use crate::team_ratings::StandingsRow;
use crate::upcoming_fetch::ApiFootballConfig;

/// Current league table, reduced to the scoring aggregates the rating path
/// needs.
pub fn fetch_standings(league_id: u32, cfg: &ApiFootballConfig) -> Result<Vec<StandingsRow>> {
    let url = format!(
        "{}/standings?league={}&season={}",
        cfg.base_url, league_id, cfg.season
    );
    let client = http_client()?;
    let body =
        fetch_json_cached(client, &url, &cfg.headers()?).context("standings request failed")?;
    parse_standings_json(&body)
}

#[derive(Debug, Deserialize)]
struct StandingsEnvelope {
    #[serde(default)]
    response: Vec<StandingsItem>,
}

#[derive(Debug, Deserialize)]
struct StandingsItem {
    league: StandingsLeague,
}

#[derive(Debug, Deserialize)]
struct StandingsLeague {
    // Groups of rows; a plain league has a single group.
    #[serde(default)]
    standings: Vec<Vec<StandingsEntry>>,
}

#[derive(Debug, Deserialize)]
struct StandingsEntry {
    team: StandingsTeam,
    all: StandingsSplit,
}

#[derive(Debug, Deserialize)]
struct StandingsTeam {
    name: String,
}

#[derive(Debug, Deserialize)]
struct StandingsSplit {
    #[serde(default)]
    played: u32,
    goals: StandingsGoals,
}

#[derive(Debug, Deserialize)]
struct StandingsGoals {
    #[serde(rename = "for", default)]
    scored: u32,
    #[serde(default)]
    against: u32,
}

pub fn parse_standings_json(raw: &str) -> Result<Vec<StandingsRow>> {
    let parsed: StandingsEnvelope = serde_json::from_str(raw).context("invalid standings json")?;
    let mut out = Vec::new();
    for item in parsed.response {
        for group in item.league.standings {
            for entry in group {
                let team = entry.team.name.trim().to_string();
                if team.is_empty() {
                    continue;
                }
                out.push(StandingsRow {
                    team,
                    played: entry.all.played,
                    goals_for: entry.all.goals.scored,
                    goals_against: entry.all.goals.against,
                });
            }
        }
    }
    Ok(out)
}

/// Case/punctuation-insensitive lookup of a team's standings row. Provider
/// spellings differ ("Man City" vs "Manchester City"), so a one-sided
/// containment match is accepted.
pub fn find_team<'a>(rows: &'a [StandingsRow], name: &str) -> Option<&'a StandingsRow> {
    let want = team_key(name);
    if want.is_empty() {
        return None;
    }
    rows.iter()
        .find(|row| team_key(&row.team) == want)
        .or_else(|| {
            rows.iter().find(|row| {
                let have = team_key(&row.team);
                have.contains(&want) || want.contains(&have)
            })
        })
}

pub fn team_key(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "response": [
            {
                "league": {
                    "standings": [[
                        {
                            "team": {"name": "Arsenal"},
                            "all": {"played": 20, "goals": {"for": 44, "against": 18}}
                        },
                        {
                            "team": {"name": "Manchester City"},
                            "all": {"played": 20, "goals": {"for": 48, "against": 21}}
                        }
                    ]]
                }
            }
        ]
    }"#;

    #[test]
    fn parses_standings_rows() {
        let rows = parse_standings_json(SAMPLE).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].team, "Arsenal");
        assert_eq!(rows[0].goals_for, 44);
        assert_eq!(rows[1].goals_against, 21);
    }

    #[test]
    fn team_lookup_survives_spelling_differences() {
        let rows = parse_standings_json(SAMPLE).unwrap();
        assert!(find_team(&rows, "Man City").is_none());
        assert!(find_team(&rows, "Manchester City FC").is_some());
        assert!(find_team(&rows, "arsenal").is_some());
        assert!(find_team(&rows, "Chelsea").is_none());
    }
}
