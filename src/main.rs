use std::io;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::mpsc;
use std::time::{Duration, Instant};

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

use crease_live::api::HttpMatchSource;
use crease_live::broadcast::{BroadcastHub, BroadcastPublisher, Subscription};
use crease_live::config::AppConfig;
use crease_live::fake_feed;
use crease_live::feed::{self, FeedUpdate, PollerHandle};
use crease_live::overlay::{FieldMap, MemoryDocument, OverlayRenderer};
use crease_live::persist::{MatchSource, SqliteScoreStore};
use crease_live::scoring::{OutType, ScoreAction};
use crease_live::session::ScoringSession;
use crease_live::state::{Batsman, TeamInnings, TeamKey, TossChoice};
use crease_live::wire::ExtraType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputMode {
    Normal,
    TossWinner,
    TossChoice(TeamKey),
    Extra(ExtraType),
    Wicket,
    ConfirmReset,
}

struct App {
    session: ScoringSession,
    overlay: OverlayRenderer<MemoryDocument>,
    overlay_sub: Subscription,
    field_map: FieldMap,
    store: Option<Arc<SqliteScoreStore>>,
    mode: InputMode,
    follow: bool,
    help_overlay: bool,
    should_quit: bool,
}

impl App {
    fn on_key(&mut self, key: KeyEvent) {
        match self.mode {
            InputMode::Normal => self.on_normal_key(key),
            InputMode::TossWinner => match key.code {
                KeyCode::Char('1') => self.mode = InputMode::TossChoice(TeamKey::Team1),
                KeyCode::Char('2') => self.mode = InputMode::TossChoice(TeamKey::Team2),
                KeyCode::Esc => self.mode = InputMode::Normal,
                _ => {}
            },
            InputMode::TossChoice(winner) => {
                let choice = match key.code {
                    KeyCode::Char('b') => Some(TossChoice::Bat),
                    KeyCode::Char('f') => Some(TossChoice::Field),
                    _ => None,
                };
                if let Some(choice) = choice {
                    self.dispatch(ScoreAction::Toss { winner, choice });
                }
                if choice.is_some() || key.code == KeyCode::Esc {
                    self.mode = InputMode::Normal;
                }
            }
            InputMode::Extra(kind) => {
                if let Some(runs_run) = digit(key.code) {
                    self.dispatch(ScoreAction::Extra { kind, runs_run });
                    self.mode = InputMode::Normal;
                } else if key.code == KeyCode::Esc {
                    self.mode = InputMode::Normal;
                }
            }
            InputMode::Wicket => {
                let out = match key.code {
                    KeyCode::Char('c') => Some(OutType::Caught),
                    KeyCode::Char('b') => Some(OutType::Bowled),
                    KeyCode::Char('l') => Some(OutType::Lbw),
                    KeyCode::Char('s') => Some(OutType::Stumped),
                    KeyCode::Char('r') => Some(OutType::RunOut),
                    KeyCode::Char('h') => Some(OutType::HitWicket),
                    KeyCode::Char('d') => Some(OutType::HandledBall),
                    KeyCode::Char('t') => Some(OutType::TimedOut),
                    _ => None,
                };
                if let Some(out) = out {
                    self.dispatch(ScoreAction::Wicket(out));
                }
                if out.is_some() || key.code == KeyCode::Esc {
                    self.mode = InputMode::Normal;
                }
            }
            InputMode::ConfirmReset => {
                match key.code {
                    KeyCode::Char('y') | KeyCode::Char('Y') => {
                        if let Err(err) = self.session.confirm_reset() {
                            self.session.push_log(format!("[WARN] {err}"));
                        }
                    }
                    _ => self.session.cancel_reset(),
                }
                self.mode = InputMode::Normal;
            }
        }
    }

    fn on_normal_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => {
                self.should_quit = true;
                return;
            }
            KeyCode::Char('?') => {
                self.help_overlay = !self.help_overlay;
                return;
            }
            _ => {}
        }
        if self.follow {
            self.session
                .push_log("[INFO] Following a stored match; scoring keys are disabled");
            return;
        }
        if key.code == KeyCode::Char('f') {
            let reached = self.session.publish_state();
            self.session
                .push_log(format!("[INFO] Refresh sent to {reached} overlay(s)"));
            return;
        }
        if let Some(runs) = digit(key.code) {
            self.dispatch(ScoreAction::Runs(runs));
            return;
        }
        match key.code {
            KeyCode::Char('t') => self.mode = InputMode::TossWinner,
            KeyCode::Char('w') => self.mode = InputMode::Extra(ExtraType::Wide),
            KeyCode::Char('n') => self.mode = InputMode::Extra(ExtraType::NoBall),
            KeyCode::Char('b') => self.mode = InputMode::Extra(ExtraType::Bye),
            KeyCode::Char('l') => self.mode = InputMode::Extra(ExtraType::LegBye),
            KeyCode::Char('x') => self.mode = InputMode::Wicket,
            KeyCode::Char('i') => self.dispatch(ScoreAction::SwitchBatting),
            KeyCode::Char('e') => self.dispatch(ScoreAction::PushEvent {
                event_type: "break".to_string(),
                message: "DRINKS BREAK".to_string(),
            }),
            KeyCode::Char('r') => {
                let batting = self.session.scores().batting_team;
                self.session.request_reset(Some(batting));
                self.mode = InputMode::ConfirmReset;
            }
            KeyCode::Char('R') => {
                self.session.request_reset(None);
                self.mode = InputMode::ConfirmReset;
            }
            KeyCode::Char('u') => {
                self.session.undo();
            }
            KeyCode::Char('S') => self.save(),
            KeyCode::Char('L') => self.restore(),
            _ => {}
        }
    }

    fn dispatch(&mut self, action: ScoreAction) {
        // The session already logs rejections.
        let _ = self.session.apply(action);
    }

    fn save(&mut self) {
        let Some(store) = self.store.clone() else {
            self.session.push_log("[WARN] No checkpoint store configured");
            return;
        };
        let _ = self.session.save(&*store);
    }

    fn restore(&mut self) {
        let Some(store) = self.store.clone() else {
            self.session.push_log("[WARN] No checkpoint store configured");
            return;
        };
        let _ = self.session.restore(&*store);
    }

    fn pump_overlay(&mut self, now: Instant) {
        self.overlay.drain(&mut self.overlay_sub, now);
    }
}

fn digit(code: KeyCode) -> Option<u32> {
    match code {
        KeyCode::Char(c) => c.to_digit(10).filter(|d| *d <= 6),
        _ => None,
    }
}

fn main() -> io::Result<()> {
    let cfg = AppConfig::from_env();
    let follow = std::env::args().any(|arg| arg == "--follow");

    let hub = BroadcastHub::new();
    let channel = hub.channel(&cfg.channel);
    let publisher = BroadcastPublisher::new(channel.clone(), cfg.wire_format);

    let mut session =
        ScoringSession::new(&cfg.match_id, cfg.meta.clone(), cfg.max_overs, publisher.clone());

    let field_map = match cfg.template_file.as_deref().map(FieldMap::load) {
        Some(Ok(map)) => map,
        Some(Err(err)) => {
            session.push_log(format!("[WARN] {err:#}; using classic template"));
            FieldMap::classic()
        }
        None => FieldMap::builtin(&cfg.template).unwrap_or_else(|| {
            session.push_log(format!(
                "[WARN] Unknown template {}; using classic",
                cfg.template
            ));
            FieldMap::classic()
        }),
    };

    let store = match cfg.db_path.as_deref().map(SqliteScoreStore::open) {
        Some(Ok(store)) => Some(Arc::new(store)),
        Some(Err(err)) => {
            session.push_log(format!("[WARN] Checkpoint store unavailable: {err:#}"));
            None
        }
        None => None,
    };

    let overlay_sub = channel.subscribe();
    let mut overlay = OverlayRenderer::new(MemoryDocument::for_template(&field_map), &field_map)
        .with_notification_ttl(cfg.notification_ttl);

    let source: Option<Arc<dyn MatchSource>> = match (&cfg.api_base, &store) {
        (Some(base), _) => Some(Arc::new(HttpMatchSource::new(base)) as Arc<dyn MatchSource>),
        (None, Some(store)) => Some(store.clone() as Arc<dyn MatchSource>),
        (None, None) => None,
    };
    if let Some(source) = source.as_ref() {
        overlay.load_initial(source.as_ref(), &cfg.meta, &cfg.match_id);
    }

    let (feed_tx, feed_rx) = mpsc::channel();
    let _poller: Option<PollerHandle> = match (&source, follow) {
        (Some(source), true) => Some(feed::spawn_match_poller(
            source.clone(),
            cfg.meta.clone(),
            cfg.match_id.clone(),
            publisher.clone(),
            cfg.poll_interval,
            feed_tx,
        )),
        _ => None,
    };

    let stop_operator = Arc::new(AtomicBool::new(false));
    let action_rx = if cfg.fake_operator && !follow {
        let (tx, rx) = mpsc::channel();
        let _operator =
            fake_feed::spawn_fake_operator(tx, Duration::from_millis(700), stop_operator.clone());
        session.push_log("[INFO] Fake operator driving the console");
        Some(rx)
    } else {
        None
    };

    session.publish_state();
    let mut app = App {
        session,
        overlay,
        overlay_sub,
        field_map,
        store,
        mode: InputMode::Normal,
        follow,
        help_overlay: false,
        should_quit: false,
    };

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app, feed_rx, action_rx);

    stop_operator.store(true, std::sync::atomic::Ordering::Relaxed);
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
    feed_rx: mpsc::Receiver<FeedUpdate>,
    action_rx: Option<mpsc::Receiver<ScoreAction>>,
) -> io::Result<()> {
    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    loop {
        while let Ok(update) = feed_rx.try_recv() {
            match update {
                FeedUpdate::Log(line) => app.session.push_log(line),
                other => app
                    .overlay
                    .apply_feed_update(app.session.meta(), other, Instant::now()),
            }
        }
        if let Some(rx) = action_rx.as_ref() {
            while let Ok(action) = rx.try_recv() {
                app.dispatch(action);
            }
        }
        app.pump_overlay(Instant::now());

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
            Constraint::Min(1),
            Constraint::Length(2),
        ])
        .split(frame.size());

    let header = Paragraph::new(header_text(app))
        .style(Style::default().add_modifier(Modifier::BOLD))
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(chunks[1]);
    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(10), Constraint::Length(10)])
        .split(body[0]);

    let console = Paragraph::new(console_text(app))
        .block(Block::default().borders(Borders::ALL).title("Scoring"));
    frame.render_widget(console, left[0]);

    let logs = Paragraph::new(log_text(app, left[1].height.saturating_sub(2) as usize))
        .style(Style::default().fg(Color::DarkGray))
        .block(Block::default().borders(Borders::ALL).title("Log"));
    frame.render_widget(logs, left[1]);

    render_overlay_preview(frame, body[1], app);

    let footer = Paragraph::new(footer_text(app)).block(Block::default().borders(Borders::TOP));
    frame.render_widget(footer, chunks[2]);

    if app.help_overlay {
        let area = frame.size();
        render_help_overlay(frame, area);
    }
}

fn header_text(app: &App) -> String {
    let meta = app.session.meta();
    let tournament = if meta.tournament_name.is_empty() {
        "Live Scoring"
    } else {
        meta.tournament_name.as_str()
    };
    let dirty = if app.session.is_dirty() { " *" } else { "" };
    let notice = app
        .session
        .notice()
        .map(|n| format!(" | {n}"))
        .unwrap_or_default();
    format!(
        "{tournament} | match {}{dirty} | channel {}{notice}",
        app.session.match_id(),
        app.session.publisher().channel().name()
    )
}

fn console_text(app: &App) -> String {
    let scores = app.session.scores();
    let payload = app.session.payload();
    let batting = scores.batting();
    let mut out = String::new();

    out.push_str(&format!("{}\n\n", payload.status));
    for (key, line) in [(TeamKey::Team1, &payload.team1), (TeamKey::Team2, &payload.team2)] {
        let marker = if key == scores.batting_team { ">" } else { " " };
        out.push_str(&format!(
            "{marker} {:<20} {:>3}/{:<2} ({} ov)\n",
            line.name, line.score, line.wickets, line.overs_display
        ));
    }
    out.push('\n');
    for batsman in &batting.batsmen {
        out.push_str(&batsman_row(batsman));
    }
    out.push_str(&bowler_row(batting));
    out.push_str(&format!(
        "\nCRR {:.2}  RRR {:.2}  Target {}\n",
        scores.current_run_rate, scores.required_run_rate, scores.target
    ));
    out.push_str(&format!("Recent: {}\n", scores.last_five_overs));
    out.push_str(&format!("Listeners: {}\n", app.session.publisher().channel().listener_count()));
    out
}

fn batsman_row(b: &Batsman) -> String {
    let mark = if b.is_striker { "*" } else { " " };
    format!(
        "{mark} {:<18} {:>3} ({:>3})  4s {:<2} 6s {:<2} SR {:.1}\n",
        b.name,
        b.runs,
        b.balls,
        b.fours,
        b.sixes,
        b.strike_rate()
    )
}

fn bowler_row(team: &TeamInnings) -> String {
    match team.bowler.as_ref() {
        Some(b) => format!(
            "  {:<18} {}-{}-{}-{}\n",
            b.name, b.overs, b.maidens, b.runs, b.wickets
        ),
        None => "  (no bowler)\n".to_string(),
    }
}

fn log_text(app: &App, rows: usize) -> String {
    let logs = app.session.logs();
    let skip = logs.len().saturating_sub(rows);
    logs.iter().skip(skip).cloned().collect::<Vec<_>>().join("\n")
}

fn render_overlay_preview(frame: &mut Frame, area: Rect, app: &App) {
    let title = format!("Overlay ({})", app.overlay.template());
    let block = Block::default().borders(Borders::ALL).title(title);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(1),
            Constraint::Length(3),
        ])
        .split(inner);

    let banner = match app.overlay.notification() {
        Some(text) => Paragraph::new(text.to_string()).style(
            Style::default()
                .fg(Color::White)
                .bg(Color::Red)
                .add_modifier(Modifier::BOLD),
        ),
        None => Paragraph::new(""),
    };
    frame.render_widget(banner, sections[0]);

    let doc = app.overlay.document();
    let lines: Vec<Line> = app
        .field_map
        .fields
        .values()
        .map(|id| {
            let text = doc.text(id).unwrap_or("");
            Line::from(vec![
                Span::styled(format!("{id:<18}"), Style::default().fg(Color::DarkGray)),
                Span::raw(text.to_string()),
            ])
        })
        .collect();
    frame.render_widget(Paragraph::new(lines), sections[1]);

    let logs = app.overlay.logs();
    let tail: Vec<String> = logs.iter().skip(logs.len().saturating_sub(3)).cloned().collect();
    frame.render_widget(
        Paragraph::new(tail.join("\n")).style(Style::default().fg(Color::DarkGray)),
        sections[2],
    );
}

fn footer_text(app: &App) -> String {
    match app.mode {
        InputMode::Normal if app.follow => "Following | ? Help | q Quit".to_string(),
        InputMode::Normal if !app.session.toss_recorded() => {
            "t Toss | R Reset | L Load | ? Help | q Quit".to_string()
        }
        InputMode::Normal => "0-6 Runs | w/n/b/l Extra | x Wicket | i Switch | u Undo | S Save | f Refresh | ? Help | q Quit".to_string(),
        InputMode::TossWinner => "Toss won by: 1 / 2 | Esc Cancel".to_string(),
        InputMode::TossChoice(_) => "Chose to: b Bat / f Field | Esc Cancel".to_string(),
        InputMode::Extra(kind) => format!("{}: runs run 0-6 | Esc Cancel", kind.label()),
        InputMode::Wicket => {
            "c Caught b Bowled l LBW s Stumped r Run out h Hit wkt d Handled t Timed out | Esc"
                .to_string()
        }
        InputMode::ConfirmReset => "Reset scores? y Confirm / any key Cancel".to_string(),
    }
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let popup = centered_rect(60, 60, area);
    let text = [
        "t        record toss (winner, then bat/field)",
        "0-6      runs off the bat",
        "w n b l  wide / no-ball / bye / leg-bye, then runs run",
        "x        wicket, then dismissal type",
        "i        switch innings",
        "e        push a drinks-break notification",
        "r / R    reset batting side / whole match (confirm)",
        "u        undo last action",
        "S / L    save / load checkpoint",
        "f        force overlay refresh",
        "q        quit",
    ]
    .join("\n");
    frame.render_widget(Clear, popup);
    let help = Paragraph::new(text).block(Block::default().borders(Borders::ALL).title("Help"));
    frame.render_widget(help, popup);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
