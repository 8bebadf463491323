use std::env;
use std::sync::mpsc::{Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;

use crate::league_params::LeagueParams;
use crate::model_params::ModelParams;
use crate::odds_fetch::{OddsFetchConfig, fetch_quotes_for_fixtures};
use crate::signal_policy::SignalPolicy;
use crate::standings_fetch::{fetch_standings, find_team};
use crate::state::{Delta, LeagueMode, ProviderCommand, league_label};
use crate::upcoming_fetch::{ApiFootballConfig, fetch_upcoming_fixtures};
use crate::value_scan::{ScanInput, scan_fixtures};

const MIN_SCAN_GAP_SECS: u64 = 30;

/// Background provider: fetches fixtures, standings and quotes for the
/// active league, runs the scan, and streams results to the UI. All I/O
/// failures become log lines; the thread itself never dies on them.
pub fn spawn_live_provider(tx: Sender<Delta>, cmd_rx: Receiver<ProviderCommand>) {
    thread::spawn(move || {
        let api_cfg = ApiFootballConfig::from_env();
        let odds_cfg = OddsFetchConfig::from_env();
        let model = ModelParams::from_env();
        let policy = SignalPolicy::from_env();

        let rescan_interval = Duration::from_secs(
            env::var("SCAN_POLL_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(180)
                .max(MIN_SCAN_GAP_SECS),
        );

        let mut mode = LeagueMode::PremierLeague;
        let mut last_scan = Instant::now() - rescan_interval;

        loop {
            let mut want_scan = false;
            while let Ok(cmd) = cmd_rx.try_recv() {
                match cmd {
                    ProviderCommand::Scan(requested) => {
                        if requested != mode {
                            mode = requested;
                            last_scan = Instant::now() - rescan_interval;
                        }
                        want_scan = true;
                    }
                }
            }

            let due = last_scan.elapsed() >= rescan_interval;
            let throttled = last_scan.elapsed() < Duration::from_secs(MIN_SCAN_GAP_SECS);
            if (want_scan || due) && !throttled {
                run_scan(mode, &api_cfg, &odds_cfg, &model, &policy, &tx);
                last_scan = Instant::now();
            } else if want_scan && throttled {
                let _ = tx.send(Delta::Log(format!(
                    "[INFO] Scan throttled ({MIN_SCAN_GAP_SECS}s)"
                )));
            }

            thread::sleep(Duration::from_millis(250));
        }
    });
}

fn run_scan(
    mode: LeagueMode,
    api_cfg: &ApiFootballConfig,
    odds_cfg: &OddsFetchConfig,
    model: &ModelParams,
    policy: &SignalPolicy,
    tx: &Sender<Delta>,
) {
    let _ = tx.send(Delta::ScanStarted(mode));
    let league = LeagueParams::for_mode(mode);

    let inputs = match gather_inputs(mode, &league, api_cfg, odds_cfg, tx) {
        Ok(inputs) => inputs,
        Err(err) => {
            let _ = tx.send(Delta::Log(format!(
                "[WARN] {} fetch failed: {err}",
                league_label(mode)
            )));
            let _ = tx.send(Delta::SetRows {
                mode,
                rows: Vec::new(),
                skipped: 0,
            });
            return;
        }
    };

    let report = scan_fixtures(&inputs, model, &league, policy);
    for (label, reason) in &report.skipped {
        let _ = tx.send(Delta::Log(format!("[WARN] Skipped {label}: {reason}")));
    }
    let _ = tx.send(Delta::Log(format!(
        "[INFO] {}: {} matches assessed, {} skipped",
        league_label(mode),
        report.rows.len(),
        report.skipped.len()
    )));
    let _ = tx.send(Delta::SetRows {
        mode,
        rows: report.rows,
        skipped: report.skipped.len(),
    });
}

fn gather_inputs(
    mode: LeagueMode,
    league: &LeagueParams,
    api_cfg: &ApiFootballConfig,
    odds_cfg: &OddsFetchConfig,
    tx: &Sender<Delta>,
) -> Result<Vec<ScanInput>> {
    let fixtures = fetch_upcoming_fixtures(league.league_id, api_cfg)?;
    if fixtures.is_empty() {
        return Ok(Vec::new());
    }

    // Standings and odds are each optional: without standings the scan
    // falls back to market-implied goals, without odds it still grades
    // model confidence.
    let standings = match fetch_standings(league.league_id, api_cfg) {
        Ok(rows) => rows,
        Err(err) => {
            let _ = tx.send(Delta::Log(format!("[WARN] Standings unavailable: {err}")));
            Vec::new()
        }
    };
    let mut quotes_by_fixture = match fetch_quotes_for_fixtures(&fixtures, mode, odds_cfg) {
        Ok(map) => map,
        Err(err) => {
            let _ = tx.send(Delta::Log(format!("[WARN] Odds unavailable: {err}")));
            Default::default()
        }
    };

    Ok(fixtures
        .into_iter()
        .map(|fixture| {
            let quotes = quotes_by_fixture.remove(&fixture.id).unwrap_or_default();
            let home_form = find_team(&standings, &fixture.home).cloned();
            let away_form = find_team(&standings, &fixture.away).cloned();
            ScanInput {
                fixture,
                quotes,
                home_form,
                away_form,
            }
        })
        .collect())
}
