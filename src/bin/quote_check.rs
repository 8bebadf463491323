use std::fs;
use std::path::PathBuf;

use goalmetric::model_params::ModelParams;
use goalmetric::odds_fetch::{MarketQuote, QuoteOutcome};
use goalmetric::odds_model;
use goalmetric::score_model;

#[derive(Debug, serde::Deserialize)]
struct QuoteCheckCase {
    #[serde(default)]
    home: Option<String>,
    #[serde(default)]
    away: Option<String>,
    #[serde(default)]
    home_exp: Option<f64>,
    #[serde(default)]
    away_exp: Option<f64>,
    #[serde(default)]
    quotes: Vec<CaseQuote>,
}

#[derive(Debug, serde::Deserialize)]
struct CaseQuote {
    outcome: String,
    #[serde(default)]
    line: Option<f64>,
    price: f64,
}

fn parse_outcome(raw: &str) -> Option<QuoteOutcome> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "home" | "1" => Some(QuoteOutcome::HomeWin),
        "draw" | "x" => Some(QuoteOutcome::Draw),
        "away" | "2" => Some(QuoteOutcome::AwayWin),
        "over" => Some(QuoteOutcome::Over),
        "under" => Some(QuoteOutcome::Under),
        _ => None,
    }
}

// This binary is intentionally simple: it loads one snapshot and prints the
// model output. It avoids network calls and is meant for quick manual
// calibration/tuning iterations.
fn main() -> anyhow::Result<()> {
    let _ = dotenvy::from_filename(".env");

    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("tests/fixtures/quote_check_case.json"));

    let raw = fs::read_to_string(&path)?;
    let case: QuoteCheckCase = serde_json::from_str(&raw)?;
    let params = ModelParams::from_env();
    params.validate()?;

    let quotes: Vec<MarketQuote> = case
        .quotes
        .iter()
        .filter_map(|q| {
            Some(MarketQuote {
                outcome: parse_outcome(&q.outcome)?,
                line: q.line,
                price: q.price,
            })
        })
        .collect();

    let expected = match (case.home_exp, case.away_exp) {
        (Some(home), Some(away)) => score_model::ExpectedGoals { home, away },
        _ => {
            let reference = quotes
                .iter()
                .find(|q| q.outcome == QuoteOutcome::Over && q.line == Some(2.5))
                .ok_or_else(|| {
                    anyhow::anyhow!("case needs home_exp/away_exp or an over 2.5 quote")
                })?;
            let total = odds_model::implied_total_goals(
                reference.price,
                params.inv_c1,
                params.inv_c2,
                params.inv_c3,
            )?;
            odds_model::split_total(total, params.home_share)?
        }
    };

    println!(
        "{} vs {}",
        case.home.as_deref().unwrap_or("Home"),
        case.away.as_deref().unwrap_or("Away")
    );
    println!("xG: {:.2} - {:.2}", expected.home, expected.away);

    let dist = score_model::compute_distribution(
        expected.home,
        expected.away,
        params.truncation_limit,
        params.dc_rho,
    )?;
    let outcome = score_model::aggregate(&dist, &[1.5, 2.5, 3.5, 4.5])?;

    println!(
        "1X2: H {:.1}%  D {:.1}%  A {:.1}%",
        outcome.home_win * 100.0,
        outcome.draw * 100.0,
        outcome.away_win * 100.0
    );
    for (line, over) in &outcome.over_lines {
        println!("Over {line}: {:.1}%", over * 100.0);
    }

    let top = score_model::top_scorelines(&dist, 3);
    let top = top
        .iter()
        .map(|s| format!("{}-{} {:.1}%", s.home, s.away, s.probability * 100.0))
        .collect::<Vec<_>>()
        .join("  ");
    println!("Top scorelines: {top}");

    let health = score_model::distribution_health(&dist);
    println!(
        "Diagnostics: entropy {:.2}, top3 mass {:.1}%, tail {:.5}{}",
        health.entropy,
        health.top3_mass * 100.0,
        dist.tail_mass(),
        if dist.truncation_warning(params.tail_tolerance) {
            " (above tolerance)"
        } else {
            ""
        }
    );

    let total_mass = dist.total_mass();
    for quote in &quotes {
        let model_prob = match (quote.outcome, quote.line) {
            (QuoteOutcome::HomeWin, _) => Some(outcome.home_win),
            (QuoteOutcome::Draw, _) => Some(outcome.draw),
            (QuoteOutcome::AwayWin, _) => Some(outcome.away_win),
            (QuoteOutcome::Over, Some(line)) => outcome.over(line),
            (QuoteOutcome::Under, Some(line)) => outcome.under(line, total_mass),
            _ => None,
        };
        let Some(model_prob) = model_prob else { continue };
        let assessment = odds_model::evaluate_edge(model_prob, quote.price)?;
        let stake = odds_model::kelly_stake(
            model_prob,
            quote.price,
            params.bankroll,
            params.kelly_fraction,
        )?;
        let target = match quote.line {
            Some(line) => format!("{} {line}", quote.outcome.label()),
            None => quote.outcome.label().to_string(),
        };
        println!(
            "{target}@{:.2}: model {:.1}% market {:.1}% edge {:+.1}% stake ${:.2}",
            quote.price,
            assessment.model_probability * 100.0,
            assessment.market_probability * 100.0,
            assessment.edge * 100.0,
            stake
        );
    }

    Ok(())
}
