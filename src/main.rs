use std::io;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use chrono::DateTime;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use goalmetric::model_params::ModelParams;
use goalmetric::signal_policy::SignalGrade;
use goalmetric::state::{
    self, AppState, ProviderCommand, apply_delta, league_label, sort_label,
};
use goalmetric::value_scan::{MatchAssessment, QuoteEdge};
use goalmetric::{fake_feed, feed};

struct App {
    state: AppState,
    should_quit: bool,
    cmd_tx: mpsc::Sender<ProviderCommand>,
}

impl App {
    fn new(cmd_tx: mpsc::Sender<ProviderCommand>, feed_label: String) -> Self {
        let mut state = AppState::new();
        state.feed_label = feed_label;
        Self {
            state,
            should_quit: false,
            cmd_tx,
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('j') | KeyCode::Down => self.state.select_next(),
            KeyCode::Char('k') | KeyCode::Up => self.state.select_prev(),
            KeyCode::Char('s') => self.state.cycle_sort(),
            KeyCode::Char('l') | KeyCode::Char('L') => {
                self.state.cycle_league_mode();
                self.request_scan();
            }
            KeyCode::Char('r') | KeyCode::Char('R') => {
                self.state.push_log("[INFO] Refresh requested");
                self.request_scan();
            }
            KeyCode::Char('?') => self.state.help_overlay = !self.state.help_overlay,
            _ => {}
        }
    }

    fn request_scan(&mut self) {
        if self
            .cmd_tx
            .send(ProviderCommand::Scan(self.state.league_mode))
            .is_err()
        {
            self.state.push_log("[WARN] Provider thread is gone");
        }
    }
}

fn main() -> io::Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let model = ModelParams::from_env();
    if let Err(err) = model.validate() {
        eprintln!("config error: {err}");
        std::process::exit(2);
    }

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let (tx, rx) = mpsc::channel();
    let (cmd_tx, cmd_rx) = mpsc::channel();

    let source = std::env::var("FEED_SOURCE").unwrap_or_else(|_| "auto".to_string());
    let live = match source.trim().to_ascii_lowercase().as_str() {
        "live" => true,
        "offline" => false,
        _ => std::env::var("FOOTBALL_API_KEY").is_ok_and(|v| !v.trim().is_empty()),
    };
    let feed_label = if live {
        feed::spawn_live_provider(tx, cmd_rx);
        "live".to_string()
    } else {
        fake_feed::spawn_fake_provider(tx, cmd_rx);
        "simulated".to_string()
    };

    let mut app = App::new(cmd_tx, feed_label);
    app.request_scan();
    let res = run_app(&mut terminal, &mut app, rx);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("error: {err}");
    }
    Ok(())
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    rx: mpsc::Receiver<state::Delta>,
) -> io::Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();

    loop {
        while let Ok(delta) = rx.try_recv() {
            apply_delta(&mut app.state, delta);
        }

        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.on_key(key);
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn ui(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(5),
            Constraint::Length(6),
            Constraint::Length(5),
            Constraint::Length(1),
        ])
        .split(frame.size());

    let header =
        Paragraph::new(header_text(&app.state)).block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    render_rows(frame, chunks[1], &app.state);
    render_detail(frame, chunks[2], &app.state);
    render_logs(frame, chunks[3], &app.state);

    let footer =
        Paragraph::new(footer_text()).block(Block::default().borders(Borders::TOP));
    frame.render_widget(footer, chunks[4]);

    if app.state.help_overlay {
        render_help_overlay(frame, frame.size());
    }
}

fn header_text(state: &AppState) -> String {
    let status = if state.scanning {
        "scanning..."
    } else if state.rows.is_empty() {
        "no matches"
    } else {
        "ready"
    };
    format!(
        "GOAL METRIC | {} | feed: {} | sort: {} | {} matches, {} skipped | {}",
        league_label(state.league_mode),
        state.feed_label,
        sort_label(state.sort),
        state.rows.len(),
        state.skipped,
        status
    )
}

fn footer_text() -> String {
    "j/k/up/down Move | l League | s Sort | r Refresh | ? Help | q Quit".to_string()
}

fn row_columns() -> [Constraint; 8] {
    [
        Constraint::Length(13),
        Constraint::Min(26),
        Constraint::Length(7),
        Constraint::Length(10),
        Constraint::Length(13),
        Constraint::Length(7),
        Constraint::Length(17),
        Constraint::Length(8),
    ]
}

fn render_rows(frame: &mut Frame, area: Rect, state: &AppState) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(1)])
        .split(area);

    let widths = row_columns();
    let header_cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(widths)
        .split(sections[0]);
    let header_style = Style::default()
        .fg(Color::Gray)
        .add_modifier(Modifier::BOLD);
    let titles = ["KICKOFF", "MATCH", "SRC", "XG", "H/D/A %", "O2.5%", "BEST EDGE", "GRADE"];
    for (col, title) in header_cols.iter().zip(titles) {
        frame.render_widget(Paragraph::new(title).style(header_style), *col);
    }

    let list_area = sections[1];
    if state.rows.is_empty() {
        let hint = if state.scanning {
            "Scanning league..."
        } else {
            "No assessable matches (r to refresh)"
        };
        frame.render_widget(
            Paragraph::new(hint).style(Style::default().fg(Color::DarkGray)),
            list_area,
        );
        return;
    }

    let visible = list_area.height as usize;
    let (start, end) = visible_range(state.selected, state.rows.len(), visible);

    for (i, idx) in (start..end).enumerate() {
        let row_area = Rect {
            x: list_area.x,
            y: list_area.y + i as u16,
            width: list_area.width,
            height: 1,
        };
        let selected = idx == state.selected;
        let row_style = if selected {
            Style::default().fg(Color::White).bg(Color::DarkGray)
        } else {
            Style::default()
        };
        if selected {
            frame.render_widget(Block::default().style(row_style), row_area);
        }

        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(widths)
            .split(row_area);

        let m = &state.rows[idx];
        let cells = [
            format_kickoff(m.kickoff.as_deref()),
            format!("{} vs {}", m.home, m.away),
            m.source.label().to_string(),
            format!("{:.2}-{:.2}", m.expected.home, m.expected.away),
            format!(
                "{:>2.0}/{:>2.0}/{:>2.0}",
                m.outcome.home_win * 100.0,
                m.outcome.draw * 100.0,
                m.outcome.away_win * 100.0
            ),
            m.outcome
                .over(2.5)
                .map(|p| format!("{:>4.1}", p * 100.0))
                .unwrap_or_else(|| "-".to_string()),
            best_edge_cell(m),
            grade_label(m.grade).to_string(),
        ];
        for (ci, (col, text)) in cols.iter().zip(cells.iter()).enumerate() {
            // Last column is the grade; color it even when unselected.
            let style = if !selected && ci == cells.len() - 1 {
                grade_style(m.grade)
            } else {
                row_style
            };
            frame.render_widget(Paragraph::new(text.as_str()).style(style), *col);
        }
    }
}

fn best_edge_cell(m: &MatchAssessment) -> String {
    match m.best_edge() {
        Some(q) => format!(
            "{:+.1}% {}@{:.2}",
            q.assessment.edge * 100.0,
            edge_target(q),
            q.price
        ),
        None => "-".to_string(),
    }
}

fn edge_target(q: &QuoteEdge) -> String {
    match q.line {
        Some(line) => format!("{} {line}", q.outcome.label()),
        None => q.outcome.label().to_string(),
    }
}

fn grade_label(grade: SignalGrade) -> &'static str {
    match grade {
        SignalGrade::ValueEdge => "VALUE",
        SignalGrade::HighConfidence => "HIGH",
        SignalGrade::DoubleChance => "DC",
        SignalGrade::Flat => "-",
    }
}

fn grade_style(grade: SignalGrade) -> Style {
    match grade {
        SignalGrade::ValueEdge => Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        SignalGrade::HighConfidence => Style::default().fg(Color::Cyan),
        SignalGrade::DoubleChance => Style::default().fg(Color::Yellow),
        SignalGrade::Flat => Style::default().fg(Color::DarkGray),
    }
}

fn render_detail(frame: &mut Frame, area: Rect, state: &AppState) {
    let block = Block::default().borders(Borders::TOP).title(" selection ");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let Some(m) = state.selected_row() else {
        frame.render_widget(
            Paragraph::new("Nothing selected").style(Style::default().fg(Color::DarkGray)),
            inner,
        );
        return;
    };

    let top = m
        .top_scorelines
        .iter()
        .map(|s| format!("{}-{} {:.1}%", s.home, s.away, s.probability * 100.0))
        .collect::<Vec<_>>()
        .join("  ");
    let tail_note = if m.truncation_flagged {
        "  [tail loss above tolerance]"
    } else {
        ""
    };

    let mut lines = vec![
        format!(
            "{} vs {}  |  xG {:.2}-{:.2} ({})  |  top: {}",
            m.home,
            m.away,
            m.expected.home,
            m.expected.away,
            m.source.label(),
            top
        ),
        format!(
            "entropy {:.2}  top3 mass {:.0}%{}",
            m.health.entropy,
            m.health.top3_mass * 100.0,
            tail_note
        ),
    ];
    if m.edges.is_empty() {
        lines.push("no market quotes attached".to_string());
    } else {
        let quotes = m
            .edges
            .iter()
            .map(|q| {
                format!(
                    "{}@{:.2} model {:.0}% edge {:+.1}% stake ${:.2}",
                    edge_target(q),
                    q.price,
                    q.assessment.model_probability * 100.0,
                    q.assessment.edge * 100.0,
                    q.stake
                )
            })
            .collect::<Vec<_>>()
            .join("  |  ");
        lines.push(quotes);
    }

    frame.render_widget(Paragraph::new(lines.join("\n")), inner);
}

fn render_logs(frame: &mut Frame, area: Rect, state: &AppState) {
    let block = Block::default().borders(Borders::TOP).title(" log ");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let take = inner.height as usize;
    let text = state
        .logs
        .iter()
        .rev()
        .take(take)
        .rev()
        .cloned()
        .collect::<Vec<_>>()
        .join("\n");
    frame.render_widget(
        Paragraph::new(text).style(Style::default().fg(Color::Gray)),
        inner,
    );
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let width = area.width.min(56);
    let height = area.height.min(12);
    let popup = Rect {
        x: area.x + (area.width.saturating_sub(width)) / 2,
        y: area.y + (area.height.saturating_sub(height)) / 2,
        width,
        height,
    };
    frame.render_widget(Clear, popup);
    let text = [
        "Goal Metric keys",
        "",
        "j/k or arrows  move selection",
        "l              cycle league",
        "s              cycle sort (edge/kickoff/confidence)",
        "r              rescan current league",
        "?              toggle this help",
        "q              quit",
    ]
    .join("\n");
    let help = Paragraph::new(text).block(Block::default().borders(Borders::ALL).title(" help "));
    frame.render_widget(help, popup);
}

fn format_kickoff(raw: Option<&str>) -> String {
    let Some(raw) = raw else {
        return "TBD".to_string();
    };
    match DateTime::parse_from_rfc3339(raw.trim()) {
        Ok(dt) => dt.format("%d %b %H:%M").to_string(),
        Err(_) => raw.chars().take(12).collect(),
    }
}

fn visible_range(selected: usize, total: usize, visible: usize) -> (usize, usize) {
    if visible == 0 || total == 0 {
        return (0, 0);
    }
    let half = visible / 2;
    let start = selected.saturating_sub(half).min(total.saturating_sub(visible));
    let end = (start + visible).min(total);
    (start, end)
}
