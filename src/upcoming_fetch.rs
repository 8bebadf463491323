use std::env;

use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, Utc};
use serde::Deserialize;

use crate::http_cache::fetch_json_cached;
use crate::http_client::http_client;

/// One scheduled match from the fixtures provider.
#[derive(Debug, Clone)]
pub struct UpcomingFixture {
    pub id: String,
    pub league_id: u32,
    pub league_name: String,
    pub kickoff: Option<String>,
    pub home: String,
    pub away: String,
}

impl UpcomingFixture {
    pub fn kickoff_ts(&self) -> Option<i64> {
        let raw = self.kickoff.as_deref()?;
        parse_timestamp(raw)
    }
}

#[derive(Debug, Clone)]
pub struct ApiFootballConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub season: u32,
    pub next_count: u32,
}

impl ApiFootballConfig {
    pub fn from_env() -> Self {
        let base_url = env::var("FOOTBALL_API_BASE")
            .unwrap_or_else(|_| "https://v3.football.api-sports.io".to_string())
            .trim_end_matches('/')
            .to_string();
        let api_key = env::var("FOOTBALL_API_KEY")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        let season = env::var("FOOTBALL_SEASON")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or_else(|| Utc::now().year() as u32);
        let next_count = env::var("UPCOMING_COUNT")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(10)
            .clamp(1, 30);
        Self {
            base_url,
            api_key,
            season,
            next_count,
        }
    }

    pub fn headers(&self) -> Result<Vec<(&'static str, &str)>> {
        let Some(key) = self.api_key.as_deref() else {
            return Err(anyhow::anyhow!("FOOTBALL_API_KEY missing"));
        };
        Ok(vec![
            ("x-rapidapi-host", "v3.football.api-sports.io"),
            ("x-rapidapi-key", key),
        ])
    }
}

/// Next scheduled fixtures for one league.
pub fn fetch_upcoming_fixtures(
    league_id: u32,
    cfg: &ApiFootballConfig,
) -> Result<Vec<UpcomingFixture>> {
    let url = format!(
        "{}/fixtures?league={}&season={}&next={}",
        cfg.base_url, league_id, cfg.season, cfg.next_count
    );
    let client = http_client()?;
    let body =
        fetch_json_cached(client, &url, &cfg.headers()?).context("fixtures request failed")?;
    parse_fixtures_json(&body)
}

#[derive(Debug, Deserialize)]
struct FixturesEnvelope {
    #[serde(default)]
    response: Vec<FixtureItem>,
}

#[derive(Debug, Deserialize)]
struct FixtureItem {
    fixture: FixtureCore,
    league: FixtureLeague,
    teams: FixtureTeams,
}

#[derive(Debug, Deserialize)]
struct FixtureCore {
    id: u64,
    #[serde(default)]
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FixtureLeague {
    id: u32,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct FixtureTeams {
    home: FixtureTeam,
    away: FixtureTeam,
}

#[derive(Debug, Deserialize)]
struct FixtureTeam {
    name: String,
}

pub fn parse_fixtures_json(raw: &str) -> Result<Vec<UpcomingFixture>> {
    let parsed: FixturesEnvelope = serde_json::from_str(raw).context("invalid fixtures json")?;
    let mut out = Vec::with_capacity(parsed.response.len());
    for item in parsed.response {
        let home = item.teams.home.name.trim().to_string();
        let away = item.teams.away.name.trim().to_string();
        if home.is_empty() || away.is_empty() {
            continue;
        }
        out.push(UpcomingFixture {
            id: item.fixture.id.to_string(),
            league_id: item.league.id,
            league_name: item.league.name,
            kickoff: item.fixture.date,
            home,
            away,
        });
    }
    Ok(out)
}

pub fn parse_timestamp(raw: &str) -> Option<i64> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.timestamp())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "response": [
            {
                "fixture": {"id": 868023, "date": "2026-08-15T14:00:00+00:00"},
                "league": {"id": 39, "name": "Premier League"},
                "teams": {"home": {"name": "Liverpool"}, "away": {"name": "Everton"}}
            },
            {
                "fixture": {"id": 868024, "date": null},
                "league": {"id": 39, "name": "Premier League"},
                "teams": {"home": {"name": "  "}, "away": {"name": "Fulham"}}
            }
        ]
    }"#;

    #[test]
    fn parses_fixtures_and_drops_nameless_rows() {
        let rows = parse_fixtures_json(SAMPLE).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, "868023");
        assert_eq!(rows[0].home, "Liverpool");
        assert_eq!(rows[0].league_id, 39);
        assert!(rows[0].kickoff_ts().is_some());
    }

    #[test]
    fn empty_envelope_is_fine() {
        assert!(parse_fixtures_json(r#"{"response": []}"#).unwrap().is_empty());
    }

    #[test]
    fn timestamp_parse_tolerates_offsets() {
        let a = parse_timestamp("2026-08-15T14:00:00+00:00").unwrap();
        let b = parse_timestamp("2026-08-15T15:00:00+01:00").unwrap();
        assert_eq!(a, b);
    }
}
