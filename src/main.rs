use std::fs::OpenOptions;
use std::io;
use std::sync::Mutex;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols;
use ratatui::widgets::{Axis, Block, Borders, Chart, Clear, Dataset, GraphType, Paragraph};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use lol_match_analyzer::config::{AnalyzerConfig, Source};
use lol_match_analyzer::error::AnalyzeError;
use lol_match_analyzer::metrics::Metric;
use lol_match_analyzer::provider::spawn_provider;
use lol_match_analyzer::series::ChartSeries;
use lol_match_analyzer::state::{
    AnalysisState, Delta, InputFocus, ProviderCommand, apply_delta, status_label,
};

const ACTUAL_COLOR: Color = Color::Rgb(0x88, 0x84, 0xd8);
const FORECAST_COLOR: Color = Color::Rgb(0x82, 0xca, 0x9d);
const BAND_COLOR: Color = Color::Rgb(0x4a, 0x72, 0x5a);

struct App {
    state: AnalysisState,
    should_quit: bool,
    cmd_tx: mpsc::Sender<ProviderCommand>,
    source: Source,
}

impl App {
    fn new(cmd_tx: mpsc::Sender<ProviderCommand>, config: &AnalyzerConfig) -> Self {
        let mut state = AnalysisState::new();
        if let Some(player) = config.player.as_deref() {
            state.prefill_player(player);
        }
        Self {
            state,
            should_quit: false,
            cmd_tx,
            source: config.source,
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('c') if ctrl => self.should_quit = true,
            KeyCode::Char('r') if ctrl => {
                self.state.clear_results();
                self.state.push_log("[INFO] Results cleared");
            }
            KeyCode::F(1) => self.state.help_overlay = !self.state.help_overlay,
            KeyCode::Tab | KeyCode::BackTab => self.state.toggle_focus(),
            KeyCode::Enter => self.analyze(),
            KeyCode::Left => self.state.select_prev_metric(),
            KeyCode::Right => self.state.select_next_metric(),
            KeyCode::Backspace => {
                self.state.focused_input_mut().pop();
            }
            KeyCode::Char(c) if !ctrl => self.state.focused_input_mut().push(c),
            _ => {}
        }
    }

    fn analyze(&mut self) {
        if self.state.is_loading() {
            self.state.push_log("[INFO] Analysis already running");
            return;
        }
        match self.state.begin_analysis() {
            Ok(request) => {
                let request_id = request.id;
                if self.cmd_tx.send(ProviderCommand::Analyze(request)).is_err() {
                    self.state.finish_analysis(
                        request_id,
                        Err(AnalyzeError::Transport(
                            "analysis worker is not running".to_string(),
                        )),
                    );
                }
            }
            Err(err) => {
                let message = err.user_message();
                self.state.push_log(format!("[WARN] {message}"));
                self.state.error_message = Some(message);
            }
        }
    }
}

fn main() -> io::Result<()> {
    let config = AnalyzerConfig::load();
    init_tracing(&config);
    tracing::info!(api = %config.api_url, source = ?config.source, "starting analyzer");

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let (tx, rx) = mpsc::channel();
    let (cmd_tx, cmd_rx) = mpsc::channel();
    spawn_provider(config.clone(), tx, cmd_rx);

    let mut app = App::new(cmd_tx, &config);
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

/// Diagnostics go to `ANALYZER_LOG` only; stdout belongs to the terminal UI.
fn init_tracing(config: &AnalyzerConfig) {
    let Some(path) = config.log_file.as_ref() else {
        return;
    };
    let file = match OpenOptions::new().create(true).append(true).open(path) {
        Ok(file) => file,
        Err(err) => {
            eprintln!("warning: cannot open log file {}: {err}", path.display());
            return;
        }
    };
    let _ = tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lol_match_analyzer=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .try_init();
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    rx: mpsc::Receiver<Delta>,
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
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(8),
            Constraint::Length(5),
            Constraint::Length(1),
        ])
        .split(frame.size());

    let header = Paragraph::new(header_text(app))
        .style(Style::default().add_modifier(Modifier::BOLD))
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    render_inputs(frame, chunks[1], &app.state);

    let error = Paragraph::new(app.state.error_message.clone().unwrap_or_default())
        .style(Style::default().fg(Color::Red))
        .alignment(Alignment::Center);
    frame.render_widget(error, chunks[2]);

    frame.render_widget(Paragraph::new(metric_strip(app.state.selected_metric)), chunks[3]);

    if app.state.has_results() {
        render_chart(frame, chunks[4], &app.state.chart());
    } else {
        let hint = if app.state.is_loading() {
            "Analyzing..."
        } else {
            "Enter a summoner name and tag, then press Enter"
        };
        let empty = Paragraph::new(hint)
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center)
            .block(Block::default().title("Metric Analysis").borders(Borders::ALL));
        frame.render_widget(empty, chunks[4]);
    }

    let console = Paragraph::new(console_text(&app.state))
        .block(Block::default().title("Console").borders(Borders::ALL));
    frame.render_widget(console, chunks[5]);

    frame.render_widget(Paragraph::new(footer_text()), chunks[6]);

    if app.state.help_overlay {
        render_help_overlay(frame, frame.size());
    }
}

fn header_text(app: &App) -> String {
    let source = match app.source {
        Source::Backend => "BACKEND",
        Source::Demo => "DEMO",
    };
    format!(
        "LoL Match Analyzer | {} | {} | Metric: {}",
        status_label(app.state.status),
        source,
        app.state.selected_metric.label()
    )
}

fn footer_text() -> &'static str {
    "Enter Analyze | Tab Switch field | ←/→ Metric | Ctrl-R Clear | F1 Help | Esc Quit"
}

fn render_inputs(frame: &mut Frame, area: Rect, state: &AnalysisState) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(45),
            Constraint::Percentage(30),
            Constraint::Min(20),
        ])
        .split(area);

    let focused = Style::default().fg(Color::Yellow);
    let name_style = if state.focus == InputFocus::Name {
        focused
    } else {
        Style::default()
    };
    let tag_style = if state.focus == InputFocus::Tag {
        focused
    } else {
        Style::default()
    };

    let name = Paragraph::new(state.player_name.as_str()).block(
        Block::default()
            .title("Summoner Name")
            .borders(Borders::ALL)
            .border_style(name_style),
    );
    frame.render_widget(name, cols[0]);

    let tag = Paragraph::new(state.player_tag.as_str()).block(
        Block::default()
            .title("Player Tag")
            .borders(Borders::ALL)
            .border_style(tag_style),
    );
    frame.render_widget(tag, cols[1]);

    let (label, style) = if state.is_loading() {
        ("Analyzing...", Style::default().fg(Color::DarkGray))
    } else {
        ("Analyze Matches", Style::default().fg(Color::Cyan))
    };
    let button = Paragraph::new(label)
        .style(style)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(button, cols[2]);
}

fn metric_strip(selected: Metric) -> Line<'static> {
    let mut spans = Vec::new();
    for metric in Metric::ALL {
        let style = if metric == selected {
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        };
        spans.push(Span::styled(format!(" {} ", metric.label()), style));
        spans.push(Span::raw(" "));
    }
    Line::from(spans)
}

fn render_chart(frame: &mut Frame, area: Rect, series: &ChartSeries) {
    let block = Block::default()
        .title("Metric Analysis with Predictions")
        .borders(Borders::ALL);

    let Some((y_min, y_max)) = series.y_bounds() else {
        let empty = Paragraph::new(format!("No {} values to plot", series.metric.key()))
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(empty, area);
        return;
    };

    let actual = series.actual_xy();
    let predicted = series.predicted_xy();
    let upper = series.upper_xy();
    let lower = series.lower_xy();

    let mut datasets = vec![
        Dataset::default()
            .name("Actual Data")
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(ACTUAL_COLOR))
            .data(&actual),
    ];
    if series.has_forecast {
        datasets.push(
            Dataset::default()
                .name("Prediction")
                .marker(symbols::Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(FORECAST_COLOR))
                .data(&predicted),
        );
        datasets.push(
            Dataset::default()
                .name("Upper Confidence")
                .marker(symbols::Marker::Dot)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(BAND_COLOR))
                .data(&upper),
        );
        datasets.push(
            Dataset::default()
                .name("Lower Confidence")
                .marker(symbols::Marker::Dot)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(BAND_COLOR))
                .data(&lower),
        );
    }

    let x_max = series.points.len().saturating_sub(1).max(1) as f64;
    let x_labels = x_axis_labels(series);
    let y_labels = vec![
        Span::raw(format!("{y_min:.1}")),
        Span::raw(format!("{:.1}", (y_min + y_max) / 2.0)),
        Span::raw(format!("{y_max:.1}")),
    ];

    let chart = Chart::new(datasets)
        .block(block)
        .x_axis(
            Axis::default()
                .style(Style::default().fg(Color::Gray))
                .bounds([0.0, x_max])
                .labels(x_labels),
        )
        .y_axis(
            Axis::default()
                .title(series.metric.label())
                .style(Style::default().fg(Color::Gray))
                .bounds([y_min, y_max])
                .labels(y_labels),
        );
    frame.render_widget(chart, area);
}

/// First, middle and last point labels along the x axis.
fn x_axis_labels(series: &ChartSeries) -> Vec<Span<'static>> {
    let points = &series.points;
    let Some(first) = points.first() else {
        return Vec::new();
    };
    let mut labels = vec![Span::raw(first.label().to_string())];
    if points.len() > 2 {
        labels.push(Span::raw(points[points.len() / 2].label().to_string()));
    }
    if let Some(last) = points.last().filter(|_| points.len() > 1) {
        labels.push(Span::raw(last.label().to_string()));
    }
    labels
}

fn console_text(state: &AnalysisState) -> String {
    if state.logs.is_empty() {
        return "No messages yet".to_string();
    }
    let start = state.logs.len().saturating_sub(3);
    state
        .logs
        .iter()
        .skip(start)
        .cloned()
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let popup_area = popup_rect(60, 60, area);
    frame.render_widget(Clear, popup_area);

    let text = [
        "LoL Match Analyzer - Help",
        "",
        "Input:",
        "  type         Edit focused field",
        "  Tab          Switch name / tag",
        "  Enter        Analyze matches",
        "",
        "Chart:",
        "  ← / →        Previous / next metric",
        "  Ctrl-R       Clear results",
        "",
        "  F1           Toggle help",
        "  Esc/Ctrl-C   Quit",
    ]
    .join("\n");

    let help = Paragraph::new(text)
        .block(Block::default().title("Help").borders(Borders::ALL))
        .style(Style::default());
    frame.render_widget(help, popup_area);
}

/// `percent_x` by `percent_y` of `area`, centered within it.
fn popup_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let scale = |len: u16, pct: u16| (u32::from(len) * u32::from(pct.min(100)) / 100) as u16;
    let width = scale(area.width, percent_x);
    let height = scale(area.height, percent_y);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
