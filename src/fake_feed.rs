use std::sync::mpsc::{Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};

use chrono::{Duration as ChronoDuration, Utc};
use rand::Rng;
use rand::seq::SliceRandom;

use crate::league_params::LeagueParams;
use crate::model_params::ModelParams;
use crate::odds_fetch::{MarketQuote, QuoteOutcome};
use crate::score_model;
use crate::signal_policy::SignalPolicy;
use crate::state::{Delta, LeagueMode, ProviderCommand, league_label};
use crate::team_ratings::StandingsRow;
use crate::upcoming_fetch::UpcomingFixture;
use crate::value_scan::{ScanInput, scan_fixtures};

// Bookmaker margin baked into simulated prices.
const BOOK_MARGIN: f64 = 0.05;

/// Offline provider: fabricates plausible standings and quotes per league
/// so the whole pipeline and UI run with no network or API keys. Quotes are
/// derived from a jittered copy of the model itself plus a margin, so some
/// fixtures genuinely carry edges and most do not.
pub fn spawn_fake_provider(tx: Sender<Delta>, cmd_rx: Receiver<ProviderCommand>) {
    thread::spawn(move || {
        let mut rng = rand::thread_rng();
        let model = ModelParams::from_env();
        let policy = SignalPolicy::from_env();

        let mut mode = LeagueMode::PremierLeague;
        let requote_interval = Duration::from_secs(45);
        let mut last_scan = Instant::now() - requote_interval;

        loop {
            let mut want_scan = false;
            while let Ok(cmd) = cmd_rx.try_recv() {
                match cmd {
                    ProviderCommand::Scan(requested) => {
                        if requested != mode {
                            mode = requested;
                        }
                        want_scan = true;
                    }
                }
            }

            if want_scan || last_scan.elapsed() >= requote_interval {
                let _ = tx.send(Delta::ScanStarted(mode));
                let league = LeagueParams::for_mode(mode);
                let inputs = simulate_league(mode, &league, &model, &mut rng);
                let report = scan_fixtures(&inputs, &model, &league, &policy);
                let _ = tx.send(Delta::Log(format!(
                    "[INFO] {} (simulated): {} matches, {} skipped",
                    league_label(mode),
                    report.rows.len(),
                    report.skipped.len()
                )));
                let _ = tx.send(Delta::SetRows {
                    mode,
                    rows: report.rows,
                    skipped: report.skipped.len(),
                });
                last_scan = Instant::now();
            }

            thread::sleep(Duration::from_millis(250));
        }
    });
}

fn league_teams(mode: LeagueMode) -> &'static [&'static str] {
    match mode {
        LeagueMode::PremierLeague => &[
            "Arsenal",
            "Manchester City",
            "Liverpool",
            "Aston Villa",
            "Tottenham",
            "Newcastle",
            "Brighton",
            "West Ham",
            "Everton",
            "Fulham",
        ],
        LeagueMode::LaLiga => &[
            "Real Madrid",
            "Barcelona",
            "Atletico Madrid",
            "Athletic Club",
            "Real Sociedad",
            "Real Betis",
            "Villarreal",
            "Sevilla",
            "Valencia",
            "Girona",
        ],
        LeagueMode::BrazilSerieA => &[
            "Flamengo",
            "Palmeiras",
            "Botafogo",
            "Fluminense",
            "Sao Paulo",
            "Internacional",
            "Gremio",
            "Corinthians",
            "Atletico Mineiro",
            "Cruzeiro",
        ],
        LeagueMode::BrazilSerieB => &[
            "Santos",
            "Sport Recife",
            "Ceara",
            "Goias",
            "Vila Nova",
            "Novorizontino",
            "America Mineiro",
            "Avai",
            "Coritiba",
            "Ponte Preta",
        ],
        LeagueMode::Bundesliga => &[
            "Bayern Munich",
            "Leverkusen",
            "Dortmund",
            "RB Leipzig",
            "Stuttgart",
            "Frankfurt",
            "Freiburg",
            "Wolfsburg",
            "Mainz",
            "Augsburg",
        ],
    }
}

fn simulate_league(
    mode: LeagueMode,
    league: &LeagueParams,
    model: &ModelParams,
    rng: &mut impl Rng,
) -> Vec<ScanInput> {
    let teams = league_teams(mode);
    let standings: Vec<StandingsRow> = teams
        .iter()
        .enumerate()
        .map(|(rank, team)| simulate_record(team, rank, teams.len(), league, rng))
        .collect();

    let mut order: Vec<usize> = (0..teams.len()).collect();
    order.shuffle(rng);

    let now = Utc::now();
    order
        .chunks_exact(2)
        .enumerate()
        .map(|(idx, pair)| {
            let home = &standings[pair[0]];
            let away = &standings[pair[1]];
            let kickoff = now + ChronoDuration::hours(20 + 7 * idx as i64);
            let fixture = UpcomingFixture {
                id: format!("sim-{}-{idx}", league.league_id),
                league_id: league.league_id,
                league_name: league_label(mode).to_string(),
                kickoff: Some(kickoff.to_rfc3339()),
                home: home.team.clone(),
                away: away.team.clone(),
            };
            let quotes = simulate_quotes(home, away, league, model, rng);
            // A couple of rows per scan arrive without standings so the
            // market-implied path stays visible in the demo.
            let blind = idx == 3;
            ScanInput {
                fixture,
                quotes,
                home_form: (!blind).then(|| home.clone()),
                away_form: (!blind).then(|| away.clone()),
            }
        })
        .collect()
}

fn simulate_record(
    team: &str,
    rank: usize,
    total: usize,
    league: &LeagueParams,
    rng: &mut impl Rng,
) -> StandingsRow {
    let played: u32 = rng.gen_range(16..=24);
    // Table position drives quality: top sides out-score the baseline,
    // bottom sides leak goals.
    let spread = 0.45;
    let quality = 1.0 + spread * (0.5 - rank as f64 / (total.max(2) - 1) as f64) * 2.0;
    let per_side = league.goals_total_base / 2.0;
    let gf = (played as f64 * per_side * quality * rng.gen_range(0.85..1.15)).round();
    let ga = (played as f64 * per_side / quality * rng.gen_range(0.85..1.15)).round();
    StandingsRow {
        team: team.to_string(),
        played,
        goals_for: gf.max(0.0) as u32,
        goals_against: ga.max(0.0) as u32,
    }
}

/// Price a fixture the way a simulated bookmaker would: run the same model
/// on jittered expected goals, add margin, and publish 1X2 plus totals.
fn simulate_quotes(
    home: &StandingsRow,
    away: &StandingsRow,
    league: &LeagueParams,
    model: &ModelParams,
    rng: &mut impl Rng,
) -> Vec<MarketQuote> {
    use crate::team_ratings::{expected_goals, team_strength};

    let (Some(home_strength), Some(away_strength)) =
        (team_strength(home, league), team_strength(away, league))
    else {
        return Vec::new();
    };
    let fair = expected_goals(&home_strength, &away_strength, league);

    // The book's opinion differs from ours by a few percent per side.
    let book_home = (fair.home * rng.gen_range(0.88..1.12)).clamp(0.20, 3.80);
    let book_away = (fair.away * rng.gen_range(0.88..1.12)).clamp(0.20, 3.80);

    let Ok(dist) =
        score_model::compute_distribution(book_home, book_away, model.truncation_limit, model.dc_rho)
    else {
        return Vec::new();
    };
    let Ok(outcome) = score_model::aggregate(&dist, &[2.5]) else {
        return Vec::new();
    };
    let total_mass = dist.total_mass();
    let over = outcome.over(2.5).unwrap_or(0.5);
    let under = outcome.under(2.5, total_mass).unwrap_or(0.5);

    let price = |p: f64| -> Option<f64> {
        if p <= 0.01 {
            return None;
        }
        Some(((1.0 / (p * (1.0 + BOOK_MARGIN))) * 100.0).round() / 100.0)
    };

    let mut quotes = Vec::new();
    for (side, p) in [
        (QuoteOutcome::HomeWin, outcome.home_win),
        (QuoteOutcome::Draw, outcome.draw),
        (QuoteOutcome::AwayWin, outcome.away_win),
    ] {
        if let Some(price) = price(p).filter(|p| *p > 1.0) {
            quotes.push(MarketQuote {
                outcome: side,
                line: None,
                price,
            });
        }
    }
    for (side, p) in [(QuoteOutcome::Over, over), (QuoteOutcome::Under, under)] {
        if let Some(price) = price(p).filter(|p| *p > 1.0) {
            quotes.push(MarketQuote {
                outcome: side,
                line: Some(2.5),
                price,
            });
        }
    }
    quotes
}
