use std::collections::{BTreeMap, HashMap, HashSet};
use std::env;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::http_cache::fetch_json_cached;
use crate::http_client::http_client;
use crate::standings_fetch::team_key;
use crate::state::LeagueMode;
use crate::upcoming_fetch::{UpcomingFixture, parse_timestamp};

const DEFAULT_TIME_TOLERANCE_MIN: i64 = 90;

/// Which side of which market a price belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuoteOutcome {
    HomeWin,
    Draw,
    AwayWin,
    Over,
    Under,
}

impl QuoteOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            QuoteOutcome::HomeWin => "Home",
            QuoteOutcome::Draw => "Draw",
            QuoteOutcome::AwayWin => "Away",
            QuoteOutcome::Over => "Over",
            QuoteOutcome::Under => "Under",
        }
    }
}

/// A bookmaker decimal price for one side of one market; totals markets
/// carry their goal line.
#[derive(Debug, Clone, Copy)]
pub struct MarketQuote {
    pub outcome: QuoteOutcome,
    pub line: Option<f64>,
    pub price: f64,
}

#[derive(Debug, Clone)]
pub struct OddsFetchConfig {
    pub enabled: bool,
    pub api_key: Option<String>,
    pub base_url: String,
    pub regions: String,
    pub time_tolerance_secs: i64,
}

impl OddsFetchConfig {
    pub fn from_env() -> Self {
        let enabled = env_bool("ODDS_ENABLED", true);
        let api_key = env::var("ODDS_API_KEY")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        let base_url = env::var("ODDS_API_BASE")
            .unwrap_or_else(|_| "https://api.the-odds-api.com".to_string())
            .trim_end_matches('/')
            .to_string();
        let regions = env::var("ODDS_REGIONS")
            .unwrap_or_else(|_| "uk,eu".to_string())
            .trim()
            .to_ascii_lowercase();
        let time_tolerance_min = env::var("ODDS_MATCH_TIME_TOLERANCE_MIN")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(DEFAULT_TIME_TOLERANCE_MIN)
            .clamp(5, 360);
        Self {
            enabled,
            api_key,
            base_url,
            regions,
            time_tolerance_secs: time_tolerance_min * 60,
        }
    }
}

fn sport_key_for_mode(mode: LeagueMode) -> &'static str {
    match mode {
        LeagueMode::PremierLeague => "soccer_epl",
        LeagueMode::LaLiga => "soccer_spain_la_liga",
        LeagueMode::BrazilSerieA => "soccer_brazil_campeonato",
        LeagueMode::BrazilSerieB => "soccer_brazil_serie_b",
        LeagueMode::Bundesliga => "soccer_germany_bundesliga",
    }
}

/// Fetch quotes for a league and attach them to the given fixtures by team
/// names and kickoff proximity. Returns fixture id -> quotes.
pub fn fetch_quotes_for_fixtures(
    fixtures: &[UpcomingFixture],
    mode: LeagueMode,
    cfg: &OddsFetchConfig,
) -> Result<HashMap<String, Vec<MarketQuote>>> {
    if !cfg.enabled || fixtures.is_empty() {
        return Ok(HashMap::new());
    }
    let Some(api_key) = cfg.api_key.as_ref() else {
        return Err(anyhow::anyhow!("ODDS_API_KEY missing"));
    };

    let url = format!(
        "{}/v4/sports/{}/odds?apiKey={}&regions={}&markets=h2h,totals&oddsFormat=decimal&dateFormat=iso",
        cfg.base_url,
        sport_key_for_mode(mode),
        api_key,
        cfg.regions
    );
    let client = http_client()?;
    let body = fetch_json_cached(client, &url, &[]).context("odds request failed")?;
    let events = parse_odds_events_json(&body)?;
    Ok(match_events_to_fixtures(
        fixtures,
        &events,
        cfg.time_tolerance_secs,
    ))
}

#[derive(Debug, Deserialize)]
struct OddsEvent {
    #[serde(default)]
    commence_time: Option<String>,
    home_team: String,
    away_team: String,
    #[serde(default)]
    bookmakers: Vec<OddsBookmaker>,
}

#[derive(Debug, Deserialize)]
struct OddsBookmaker {
    #[serde(default)]
    markets: Vec<OddsMarket>,
}

#[derive(Debug, Deserialize)]
struct OddsMarket {
    key: String,
    #[serde(default)]
    outcomes: Vec<OddsOutcome>,
}

#[derive(Debug, Deserialize)]
struct OddsOutcome {
    name: String,
    price: f64,
    #[serde(default)]
    point: Option<f64>,
}

/// A parsed odds event: consensus quotes plus the identity used to attach
/// it to a fixture.
#[derive(Debug, Clone)]
pub struct OddsEventQuotes {
    pub home_key: String,
    pub away_key: String,
    pub kickoff_ts: Option<i64>,
    pub quotes: Vec<MarketQuote>,
}

pub fn parse_odds_events_json(raw: &str) -> Result<Vec<OddsEventQuotes>> {
    let parsed: Vec<OddsEvent> = serde_json::from_str(raw).context("invalid odds json")?;
    Ok(parsed.iter().filter_map(event_to_quotes).collect())
}

fn event_to_quotes(event: &OddsEvent) -> Option<OddsEventQuotes> {
    let home_key = team_key(&event.home_team);
    let away_key = team_key(&event.away_team);
    if home_key.is_empty() || away_key.is_empty() {
        return None;
    }

    // Collect every bookmaker's price per (outcome, line); the published
    // quote is the median across books.
    let mut by_slot: BTreeMap<(u8, i64), Vec<f64>> = BTreeMap::new();
    let slot = |outcome: QuoteOutcome, line: Option<f64>| -> (u8, i64) {
        let tag = match outcome {
            QuoteOutcome::HomeWin => 0,
            QuoteOutcome::Draw => 1,
            QuoteOutcome::AwayWin => 2,
            QuoteOutcome::Over => 3,
            QuoteOutcome::Under => 4,
        };
        // Tenths of a goal keep half-integer lines exact as map keys.
        (tag, line.map(|l| (l * 10.0).round() as i64).unwrap_or(-1))
    };

    for bookmaker in &event.bookmakers {
        for market in &bookmaker.markets {
            match market.key.as_str() {
                "h2h" => {
                    for outcome in &market.outcomes {
                        let name = outcome.name.trim();
                        if outcome.price <= 1.0 {
                            continue;
                        }
                        let side = if name.eq_ignore_ascii_case("draw") {
                            QuoteOutcome::Draw
                        } else if team_key(name) == home_key {
                            QuoteOutcome::HomeWin
                        } else if team_key(name) == away_key {
                            QuoteOutcome::AwayWin
                        } else {
                            continue;
                        };
                        by_slot.entry(slot(side, None)).or_default().push(outcome.price);
                    }
                }
                "totals" => {
                    for outcome in &market.outcomes {
                        let Some(point) = outcome.point else { continue };
                        if outcome.price <= 1.0 || (point.fract() - 0.5).abs() > 1e-9 {
                            continue;
                        }
                        let side = if outcome.name.eq_ignore_ascii_case("over") {
                            QuoteOutcome::Over
                        } else if outcome.name.eq_ignore_ascii_case("under") {
                            QuoteOutcome::Under
                        } else {
                            continue;
                        };
                        by_slot
                            .entry(slot(side, Some(point)))
                            .or_default()
                            .push(outcome.price);
                    }
                }
                _ => {}
            }
        }
    }

    if by_slot.is_empty() {
        return None;
    }

    let quotes = by_slot
        .into_iter()
        .filter_map(|((tag, line_tenths), prices)| {
            let price = median_f64(&prices)?;
            let outcome = match tag {
                0 => QuoteOutcome::HomeWin,
                1 => QuoteOutcome::Draw,
                2 => QuoteOutcome::AwayWin,
                3 => QuoteOutcome::Over,
                _ => QuoteOutcome::Under,
            };
            let line = (line_tenths >= 0).then(|| line_tenths as f64 / 10.0);
            Some(MarketQuote {
                outcome,
                line,
                price,
            })
        })
        .collect();

    Some(OddsEventQuotes {
        home_key,
        away_key,
        kickoff_ts: event.commence_time.as_deref().and_then(parse_timestamp),
        quotes,
    })
}

fn match_events_to_fixtures(
    fixtures: &[UpcomingFixture],
    events: &[OddsEventQuotes],
    time_tolerance_secs: i64,
) -> HashMap<String, Vec<MarketQuote>> {
    let mut out = HashMap::new();
    let mut used: HashSet<usize> = HashSet::new();

    for fixture in fixtures {
        let f_home = team_key(&fixture.home);
        let f_away = team_key(&fixture.away);
        let fixture_ts = fixture.kickoff_ts();

        let mut best: Option<(usize, i64)> = None;
        for (idx, event) in events.iter().enumerate() {
            if used.contains(&idx) {
                continue;
            }
            if !keys_match(&f_home, &event.home_key) || !keys_match(&f_away, &event.away_key) {
                continue;
            }
            let score = match (fixture_ts, event.kickoff_ts) {
                (Some(f), Some(c)) => {
                    let diff = (f - c).abs();
                    if diff > time_tolerance_secs {
                        continue;
                    }
                    diff
                }
                _ => time_tolerance_secs / 2,
            };
            if let Some((_, best_score)) = best {
                if score >= best_score {
                    continue;
                }
            }
            best = Some((idx, score));
        }

        if let Some((idx, _)) = best {
            used.insert(idx);
            out.insert(fixture.id.clone(), events[idx].quotes.clone());
        }
    }

    out
}

fn keys_match(a: &str, b: &str) -> bool {
    !a.is_empty() && !b.is_empty() && (a == b || a.contains(b) || b.contains(a))
}

fn median_f64(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).expect("prices are finite"));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        Some(sorted[mid])
    } else {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    }
}

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .map(|v| {
            let t = v.trim().to_ascii_lowercase();
            !(t.is_empty() || t == "0" || t == "false" || t == "off" || t == "no")
        })
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"[
        {
            "commence_time": "2026-08-15T14:00:00Z",
            "home_team": "Liverpool",
            "away_team": "Everton",
            "bookmakers": [
                {"markets": [
                    {"key": "h2h", "outcomes": [
                        {"name": "Liverpool", "price": 1.55},
                        {"name": "Draw", "price": 4.2},
                        {"name": "Everton", "price": 6.0}
                    ]},
                    {"key": "totals", "outcomes": [
                        {"name": "Over", "price": 1.85, "point": 2.5},
                        {"name": "Under", "price": 1.95, "point": 2.5}
                    ]}
                ]},
                {"markets": [
                    {"key": "h2h", "outcomes": [
                        {"name": "Liverpool", "price": 1.60},
                        {"name": "Draw", "price": 4.0},
                        {"name": "Everton", "price": 5.8}
                    ]},
                    {"key": "totals", "outcomes": [
                        {"name": "Over", "price": 1.90, "point": 2.5},
                        {"name": "Over", "price": 1.30, "point": 2.0}
                    ]}
                ]}
            ]
        }
    ]"#;

    #[test]
    fn parses_quotes_and_takes_medians() {
        let events = parse_odds_events_json(SAMPLE).unwrap();
        assert_eq!(events.len(), 1);
        let quotes = &events[0].quotes;

        let home = quotes
            .iter()
            .find(|q| q.outcome == QuoteOutcome::HomeWin)
            .unwrap();
        assert!((home.price - 1.575).abs() < 1e-9);

        let over = quotes
            .iter()
            .find(|q| q.outcome == QuoteOutcome::Over && q.line == Some(2.5))
            .unwrap();
        assert!((over.price - 1.875).abs() < 1e-9);

        // Integer totals lines are not half-integer and are dropped.
        assert!(!quotes.iter().any(|q| q.line == Some(2.0)));
    }

    #[test]
    fn matches_events_to_fixtures_by_name_and_time() {
        let events = parse_odds_events_json(SAMPLE).unwrap();
        let fixture = UpcomingFixture {
            id: "868023".into(),
            league_id: 39,
            league_name: "Premier League".into(),
            kickoff: Some("2026-08-15T14:30:00+00:00".into()),
            home: "Liverpool FC".into(),
            away: "Everton FC".into(),
        };
        let map = match_events_to_fixtures(std::slice::from_ref(&fixture), &events, 5400);
        assert!(map.contains_key("868023"));

        let far = UpcomingFixture {
            kickoff: Some("2026-08-16T20:00:00+00:00".into()),
            ..fixture
        };
        let map = match_events_to_fixtures(&[far], &events, 5400);
        assert!(map.is_empty());
    }

    #[test]
    fn median_of_even_count_averages_middle_pair() {
        assert_eq!(median_f64(&[1.0, 2.0, 4.0, 10.0]), Some(3.0));
        assert_eq!(median_f64(&[]), None);
    }
}
