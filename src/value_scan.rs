use rayon::prelude::*;

use crate::league_params::LeagueParams;
use crate::model_params::ModelParams;
use crate::odds_fetch::{MarketQuote, QuoteOutcome};
use crate::odds_model::{self, EdgeAssessment};
use crate::score_model::{
    self, DistributionHealth, ExpectedGoals, ModelError, OutcomeProbabilities, Scoreline,
};
use crate::signal_policy::{SignalGrade, SignalPolicy};
use crate::team_ratings::{self, StandingsRow};
use crate::upcoming_fetch::UpcomingFixture;

/// Goal line whose price the total-goals inversion is calibrated against.
pub const REFERENCE_LINE: f64 = 2.5;

const DEFAULT_LINES: [f64; 4] = [1.5, 2.5, 3.5, 4.5];

/// Everything known about one fixture before the model runs.
#[derive(Debug, Clone)]
pub struct ScanInput {
    pub fixture: UpcomingFixture,
    pub quotes: Vec<MarketQuote>,
    pub home_form: Option<StandingsRow>,
    pub away_form: Option<StandingsRow>,
}

/// Where the expected-goals inputs came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalSource {
    TeamRatings,
    MarketImplied,
}

impl GoalSource {
    pub fn label(&self) -> &'static str {
        match self {
            GoalSource::TeamRatings => "form",
            GoalSource::MarketImplied => "market",
        }
    }
}

/// Model-vs-market verdict for one quoted price.
#[derive(Debug, Clone, Copy)]
pub struct QuoteEdge {
    pub outcome: QuoteOutcome,
    pub line: Option<f64>,
    pub price: f64,
    pub assessment: EdgeAssessment,
    pub stake: f64,
}

/// Full model output for one fixture.
#[derive(Debug, Clone)]
pub struct MatchAssessment {
    pub fixture_id: String,
    pub league_name: String,
    pub kickoff: Option<String>,
    pub home: String,
    pub away: String,
    pub source: GoalSource,
    pub expected: ExpectedGoals,
    pub outcome: OutcomeProbabilities,
    pub top_scorelines: Vec<Scoreline>,
    pub health: DistributionHealth,
    pub truncation_flagged: bool,
    pub edges: Vec<QuoteEdge>,
    pub grade: SignalGrade,
}

impl MatchAssessment {
    /// The most favorable model-vs-market comparison, if any quote existed.
    pub fn best_edge(&self) -> Option<&QuoteEdge> {
        self.edges
            .iter()
            .max_by(|a, b| {
                a.assessment
                    .edge
                    .partial_cmp(&b.assessment.edge)
                    .expect("edges are finite")
            })
    }

    pub fn strongest_outcome(&self) -> f64 {
        self.outcome
            .home_win
            .max(self.outcome.draw)
            .max(self.outcome.away_win)
    }

    pub fn kickoff_ts(&self) -> Option<i64> {
        self.kickoff
            .as_deref()
            .and_then(crate::upcoming_fetch::parse_timestamp)
    }
}

#[derive(Debug, Default)]
pub struct ScanReport {
    pub rows: Vec<MatchAssessment>,
    /// `(fixture label, reason)` for every match the scan had to skip.
    pub skipped: Vec<(String, String)>,
}

/// Assess one fixture. Expected goals come from standings-derived ratings
/// when both teams have a record, otherwise from inverting the reference
/// over/under quote; a fixture offering neither is not assessable.
pub fn assess_fixture(
    input: &ScanInput,
    model: &ModelParams,
    league: &LeagueParams,
    policy: &SignalPolicy,
) -> Result<MatchAssessment, ModelError> {
    let (expected, source) = expected_goals_for(input, model, league)?;

    let dist = score_model::compute_distribution(
        expected.home,
        expected.away,
        model.truncation_limit,
        model.dc_rho,
    )?;

    let mut lines: Vec<f64> = DEFAULT_LINES.to_vec();
    for quote in &input.quotes {
        if let Some(line) = quote.line {
            if !lines.iter().any(|l| (l - line).abs() < 1e-9) {
                lines.push(line);
            }
        }
    }
    let outcome = score_model::aggregate(&dist, &lines)?;
    let total_mass = dist.total_mass();

    let mut edges = Vec::with_capacity(input.quotes.len());
    for quote in &input.quotes {
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
            model.bankroll,
            model.kelly_fraction,
        )?;
        edges.push(QuoteEdge {
            outcome: quote.outcome,
            line: quote.line,
            price: quote.price,
            assessment,
            stake,
        });
    }

    let health = score_model::distribution_health(&dist);
    let truncation_flagged = dist.truncation_warning(model.tail_tolerance);

    let best = edges
        .iter()
        .max_by(|a, b| {
            a.assessment
                .edge
                .partial_cmp(&b.assessment.edge)
                .expect("edges are finite")
        })
        .map(|q| (q.assessment.edge, q.price));
    let grade = policy.classify(&outcome, health, best);

    Ok(MatchAssessment {
        fixture_id: input.fixture.id.clone(),
        league_name: input.fixture.league_name.clone(),
        kickoff: input.fixture.kickoff.clone(),
        home: input.fixture.home.clone(),
        away: input.fixture.away.clone(),
        source,
        expected,
        outcome,
        top_scorelines: score_model::top_scorelines(&dist, 3),
        health,
        truncation_flagged,
        edges,
        grade,
    })
}

fn expected_goals_for(
    input: &ScanInput,
    model: &ModelParams,
    league: &LeagueParams,
) -> Result<(ExpectedGoals, GoalSource), ModelError> {
    let home_strength = input
        .home_form
        .as_ref()
        .and_then(|row| team_ratings::team_strength(row, league));
    let away_strength = input
        .away_form
        .as_ref()
        .and_then(|row| team_ratings::team_strength(row, league));

    if let (Some(home), Some(away)) = (home_strength, away_strength) {
        return Ok((
            team_ratings::expected_goals(&home, &away, league),
            GoalSource::TeamRatings,
        ));
    }

    let reference = input.quotes.iter().find(|q| {
        q.outcome == QuoteOutcome::Over
            && q.line
                .is_some_and(|line| (line - REFERENCE_LINE).abs() < 1e-9)
    });
    if let Some(quote) = reference {
        let total =
            odds_model::implied_total_goals(quote.price, model.inv_c1, model.inv_c2, model.inv_c3)?;
        let expected = odds_model::split_total(total, model.home_share)?;
        return Ok((expected, GoalSource::MarketImplied));
    }

    Err(ModelError::InvalidInput(
        "no standings record and no reference over/under quote".into(),
    ))
}

/// Assess every fixture independently and in parallel. A fixture that fails
/// lands in `skipped` with its reason; one bad feed row never aborts the
/// scan.
pub fn scan_fixtures(
    inputs: &[ScanInput],
    model: &ModelParams,
    league: &LeagueParams,
    policy: &SignalPolicy,
) -> ScanReport {
    let results: Vec<(String, Result<MatchAssessment, ModelError>)> = inputs
        .par_iter()
        .map(|input| {
            let label = format!("{} vs {}", input.fixture.home, input.fixture.away);
            (label, assess_fixture(input, model, league, policy))
        })
        .collect();

    let mut report = ScanReport::default();
    for (label, result) in results {
        match result {
            Ok(row) => report.rows.push(row),
            Err(err) => report.skipped.push((label, err.to_string())),
        }
    }
    // Strongest edges first; quote-less rows keep kickoff order at the end.
    report.rows.sort_by(|a, b| {
        let ea = a.best_edge().map(|q| q.assessment.edge);
        let eb = b.best_edge().map(|q| q.assessment.edge);
        eb.partial_cmp(&ea)
            .expect("edges are finite")
            .then_with(|| a.kickoff_ts().cmp(&b.kickoff_ts()))
    });
    report
}
