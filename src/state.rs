use std::collections::VecDeque;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::value_scan::MatchAssessment;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LeagueMode {
    PremierLeague,
    LaLiga,
    BrazilSerieA,
    BrazilSerieB,
    Bundesliga,
}

impl LeagueMode {
    pub const ALL: [LeagueMode; 5] = [
        LeagueMode::PremierLeague,
        LeagueMode::LaLiga,
        LeagueMode::BrazilSerieA,
        LeagueMode::BrazilSerieB,
        LeagueMode::Bundesliga,
    ];
}

pub fn league_label(mode: LeagueMode) -> &'static str {
    match mode {
        LeagueMode::PremierLeague => "Premier League",
        LeagueMode::LaLiga => "La Liga",
        LeagueMode::BrazilSerieA => "Brazil Serie A",
        LeagueMode::BrazilSerieB => "Brazil Serie B",
        LeagueMode::Bundesliga => "Bundesliga",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortMode {
    Edge,
    Kickoff,
    Confidence,
}

pub fn sort_label(sort: SortMode) -> &'static str {
    match sort {
        SortMode::Edge => "Edge",
        SortMode::Kickoff => "Kickoff",
        SortMode::Confidence => "Confidence",
    }
}

/// Messages the provider thread pushes into the UI loop.
#[derive(Debug)]
pub enum Delta {
    ScanStarted(LeagueMode),
    SetRows {
        mode: LeagueMode,
        rows: Vec<MatchAssessment>,
        skipped: usize,
    },
    Log(String),
}

/// Requests the UI sends back to the provider thread.
#[derive(Debug, Clone, Copy)]
pub enum ProviderCommand {
    Scan(LeagueMode),
}

#[derive(Debug)]
pub struct AppState {
    pub league_mode: LeagueMode,
    pub sort: SortMode,
    pub selected: usize,
    pub rows: Vec<MatchAssessment>,
    pub skipped: usize,
    pub scanning: bool,
    pub last_scan: Option<SystemTime>,
    pub feed_label: String,
    pub logs: VecDeque<String>,
    pub help_overlay: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            league_mode: LeagueMode::PremierLeague,
            sort: SortMode::Edge,
            selected: 0,
            rows: Vec::new(),
            skipped: 0,
            scanning: false,
            last_scan: None,
            feed_label: String::new(),
            logs: VecDeque::new(),
            help_overlay: false,
        }
    }

    pub fn cycle_league_mode(&mut self) {
        self.league_mode = match self.league_mode {
            LeagueMode::PremierLeague => LeagueMode::LaLiga,
            LeagueMode::LaLiga => LeagueMode::BrazilSerieA,
            LeagueMode::BrazilSerieA => LeagueMode::BrazilSerieB,
            LeagueMode::BrazilSerieB => LeagueMode::Bundesliga,
            LeagueMode::Bundesliga => LeagueMode::PremierLeague,
        };
        self.rows.clear();
        self.skipped = 0;
        self.selected = 0;
        self.last_scan = None;
        self.push_log(format!("[INFO] League: {}", league_label(self.league_mode)));
    }

    pub fn cycle_sort(&mut self) {
        self.sort = match self.sort {
            SortMode::Edge => SortMode::Kickoff,
            SortMode::Kickoff => SortMode::Confidence,
            SortMode::Confidence => SortMode::Edge,
        };
        self.sort_rows();
    }

    pub fn sort_rows(&mut self) {
        let selected_id = self.selected_fixture_id();
        match self.sort {
            SortMode::Edge => self.rows.sort_by(|a, b| {
                let ea = a.best_edge().map(|q| q.assessment.edge);
                let eb = b.best_edge().map(|q| q.assessment.edge);
                eb.partial_cmp(&ea)
                    .expect("edges are finite")
                    .then_with(|| a.kickoff_ts().cmp(&b.kickoff_ts()))
            }),
            SortMode::Kickoff => self
                .rows
                .sort_by(|a, b| a.kickoff_ts().cmp(&b.kickoff_ts())),
            SortMode::Confidence => self.rows.sort_by(|a, b| {
                b.strongest_outcome()
                    .partial_cmp(&a.strongest_outcome())
                    .expect("probabilities are finite")
            }),
        }
        // Keep the cursor on the row it was on before re-sorting.
        if let Some(id) = selected_id {
            if let Some(idx) = self.rows.iter().position(|r| r.fixture_id == id) {
                self.selected = idx;
            }
        }
        self.clamp_selection();
    }

    pub fn selected_fixture_id(&self) -> Option<String> {
        self.rows.get(self.selected).map(|r| r.fixture_id.clone())
    }

    pub fn selected_row(&self) -> Option<&MatchAssessment> {
        self.rows.get(self.selected)
    }

    pub fn select_next(&mut self) {
        if !self.rows.is_empty() {
            self.selected = (self.selected + 1).min(self.rows.len() - 1);
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    fn clamp_selection(&mut self) {
        if self.rows.is_empty() {
            self.selected = 0;
        } else {
            self.selected = self.selected.min(self.rows.len() - 1);
        }
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        const MAX_LOGS: usize = 200;
        self.logs.push_back(msg.into());
        while self.logs.len() > MAX_LOGS {
            self.logs.pop_front();
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

pub fn apply_delta(state: &mut AppState, delta: Delta) {
    match delta {
        Delta::ScanStarted(mode) => {
            if mode == state.league_mode {
                state.scanning = true;
            }
        }
        Delta::SetRows {
            mode,
            rows,
            skipped,
        } => {
            // A slow scan for a league the user already left is stale.
            if mode != state.league_mode {
                return;
            }
            state.rows = rows;
            state.skipped = skipped;
            state.scanning = false;
            state.last_scan = Some(SystemTime::now());
            state.sort_rows();
        }
        Delta::Log(msg) => state.push_log(msg),
    }
}
