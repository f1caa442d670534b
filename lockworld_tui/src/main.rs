use anyhow::{Context, Result};
use clap::Parser;
use lockworld_core::{
    Command, Position, SnapshotHandle, World, WorldConfig, WorldSnapshot,
    snapshot::ItemKind,
};
use ratatui::{
    crossterm::{
        self,
        event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
        execute,
        terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
    },
    prelude::*,
    widgets::*,
};
use std::{
    fs::File,
    io::{self, Stdout},
    path::{Path, PathBuf},
    sync::{
        Mutex,
        mpsc::{self, Receiver, Sender},
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// World configuration (JSON)
    #[arg(short, long, value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Seed for item placement, overrides the configuration
    #[arg(short, long)]
    seed: Option<u64>,

    /// Pause after every agent step in milliseconds, overrides the configuration
    #[arg(long, value_name = "MS")]
    step_delay_ms: Option<u64>,

    /// Commands to run at start, one per line
    #[arg(long, value_name = "SCRIPT_FILE")]
    script: Option<PathBuf>,

    /// Where to write the log; the terminal belongs to the UI
    #[arg(long, value_name = "LOG_FILE", default_value = "lockworld.log")]
    log: PathBuf,
}

/// A line in the transcript panel.
enum LogEntry {
    Command(String),
    Reply(String),
    Failure(String),
}

struct App {
    /// Latest published world state.
    snapshots: SnapshotHandle,
    /// Lines for the control thread.
    commands: Sender<String>,
    /// Results coming back from the control thread.
    replies: Receiver<LogEntry>,
    log: Vec<LogEntry>,
    input: String,
    /// Flag to control the main loop.
    should_quit: bool,
}

impl App {
    fn new(world: World) -> Self {
        let snapshots = world.snapshots();
        let (commands, command_rx) = mpsc::channel();
        let (reply_tx, replies) = mpsc::channel();
        // Detached: a walk in progress runs to completion or dies with the process.
        let _controller = spawn_controller(world, command_rx, reply_tx);

        App {
            snapshots,
            commands,
            replies,
            log: Vec::new(),
            input: String::new(),
            should_quit: false,
        }
    }

    /// Queues a command for the control thread.
    fn send(&mut self, line: String) {
        let line = line.trim().to_string();
        if line.is_empty() {
            return;
        }
        self.log.push(LogEntry::Command(line.clone()));
        if self.commands.send(line).is_err() {
            self.log
                .push(LogEntry::Failure("control thread has stopped".to_string()));
        }
    }

    fn submit(&mut self) {
        let line = std::mem::take(&mut self.input);
        self.send(line);
    }

    /// Collects finished command results.
    fn tick(&mut self) {
        while let Ok(entry) = self.replies.try_recv() {
            self.log.push(entry);
        }
    }

    /// Sets the quit flag.
    fn quit(&mut self) {
        self.should_quit = true;
    }
}

/// Runs commands strictly one after another on a thread that owns the world.
fn spawn_controller(
    mut world: World,
    commands: Receiver<String>,
    replies: Sender<LogEntry>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        for line in commands {
            let entry = match line.parse::<Command>() {
                Ok(command) => match world.execute(&command) {
                    Ok(message) => LogEntry::Reply(message),
                    Err(err) => LogEntry::Failure(err.to_string()),
                },
                Err(err) => LogEntry::Failure(err.to_string()),
            };
            if replies.send(entry).is_err() {
                break;
            }
        }
    })
}

fn init_logging(path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create log file {}", path.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lockworld_core=info,lockworld_tui=info".into()),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn load_config(args: &Args) -> Result<WorldConfig> {
    // If no config file is provided, use the default layout
    let path = args
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from("configs/simple_room.json"));
    if !path.exists() {
        return Err(anyhow::anyhow!(
            "Config file does not exist: {}",
            path.display()
        ));
    }
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let mut config = WorldConfig::from_json_str(&json)?;
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }
    if let Some(delay) = args.step_delay_ms {
        config.step_delay_ms = delay;
    }
    Ok(config)
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log)?;

    let config = load_config(&args)?;
    let world = World::new(&config).context("Failed to build world")?;
    info!(rooms = config.rooms.len(), "starting lockworld");

    let script = match &args.script {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read script {}", path.display()))?,
        None => String::new(),
    };

    // Set up the terminal
    let mut terminal = setup_terminal()?;

    // Create the application state
    let mut app = App::new(world);
    for line in script.lines() {
        app.send(line.to_string());
    }

    // Run the main application loop
    let result = run_app(&mut terminal, &mut app);

    // Restore the terminal state
    restore_terminal(&mut terminal)?;

    result
}

/// Configures the terminal for TUI interaction.
fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    let mut stdout = io::stdout();
    enable_raw_mode()?;
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).map_err(Into::into)
}

/// Restores the terminal to its original state.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

/// Polls input and redraws from the latest snapshot at a fixed rate.
fn run_app(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    let tick_rate = Duration::from_millis(50);
    let mut last_tick = Instant::now();

    loop {
        let snapshot = app.snapshots.latest();
        terminal.draw(|f| ui(f, app, &snapshot))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if crossterm::event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Esc => app.quit(),
                        KeyCode::Enter => app.submit(),
                        KeyCode::Backspace => {
                            app.input.pop();
                        }
                        KeyCode::Char(c) => app.input.push(c),
                        _ => {}
                    }
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            app.tick();
            last_tick = Instant::now();
        }

        if app.should_quit {
            break;
        }
    }
    Ok(())
}

/// Renders the user interface.
fn ui(frame: &mut Frame, app: &App, snapshot: &WorldSnapshot) {
    let map_height = u16::try_from(snapshot.size)
        .unwrap_or(u16::MAX)
        .saturating_add(2);
    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(map_height),   // Area for the map
            Constraint::Percentage(30),    // Area for the transcript
            Constraint::Length(3),         // Area for the prompt
        ])
        .split(frame.area());

    render_map(frame, main_layout[0], snapshot);
    render_log(frame, main_layout[1], app, snapshot);

    let prompt = Paragraph::new(format!("> {}", app.input)).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Command (e.g. MOVETO(key_a), OPENDOOR(room_a, key_a)) - Esc to quit"),
    );
    frame.render_widget(prompt, main_layout[2]);
}

/// Renders the transcript of commands and replies.
fn render_log(frame: &mut Frame, area: Rect, app: &App, snapshot: &WorldSnapshot) {
    let held: Vec<&str> = snapshot
        .items
        .iter()
        .filter(|item| item.position.is_none())
        .map(|item| item.name.as_str())
        .collect();
    let title = format!(
        "Agent ({}, {})  Holding: {}",
        snapshot.agent.x,
        snapshot.agent.y,
        if held.is_empty() {
            "nothing".to_string()
        } else {
            held.join(", ")
        }
    );

    let visible_rows = area.height.saturating_sub(2) as usize;
    let lines: Vec<ListItem> = app
        .log
        .iter()
        .flat_map(|entry| {
            let (prefix, text, style) = match entry {
                LogEntry::Command(text) => ("> ", text, Style::default().bold()),
                LogEntry::Reply(text) => ("  ", text, Style::default().fg(Color::Green)),
                LogEntry::Failure(text) => ("! ", text, Style::default().fg(Color::Red)),
            };
            text.lines()
                .map(move |line| ListItem::new(Span::styled(format!("{prefix}{line}"), style)))
                .collect::<Vec<_>>()
        })
        .collect();
    let skip = lines.len().saturating_sub(visible_rows);
    let transcript = List::new(lines.into_iter().skip(skip))
        .block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(transcript, area);
}

/// Renders the world grid onto the frame.
fn render_map(frame: &mut Frame, area: Rect, snapshot: &WorldSnapshot) {
    let mut lines: Vec<Line> = Vec::with_capacity(snapshot.size);

    for y in 0..snapshot.size {
        let mut spans: Vec<Span> = Vec::with_capacity(snapshot.size);
        for x in 0..snapshot.size {
            spans.push(render_cell(snapshot, Position { x, y }));
        }
        lines.push(Line::from(spans));
    }

    let map_paragraph = Paragraph::new(lines)
        .block(Block::default().title("Lock World").borders(Borders::ALL))
        .alignment(Alignment::Center);

    frame.render_widget(map_paragraph, area);
}

fn render_cell(snapshot: &WorldSnapshot, pos: Position) -> Span<'static> {
    if snapshot.agent == pos {
        return Span::styled("@", Style::default().fg(Color::Red).bold());
    }
    if let Some(item) = snapshot.visible_item_at(pos) {
        return match item.kind {
            ItemKind::Key => Span::styled("k", Style::default().fg(Color::Yellow)),
            ItemKind::Object => Span::styled("o", Style::default().fg(Color::Cyan)),
        };
    }
    if let Some(door) = snapshot.doors.iter().skip(1).find(|door| door.position == pos) {
        return if door.open {
            Span::styled("+", Style::default().fg(Color::Green))
        } else {
            Span::styled("|", Style::default().fg(Color::Yellow))
        };
    }
    match snapshot.sub_room_at(pos) {
        Some(room) if room.open => Span::styled(".", Style::default().fg(Color::Blue)),
        Some(_) => Span::styled("#", Style::default().fg(Color::DarkGray)),
        None => Span::raw(" "),
    }
}
