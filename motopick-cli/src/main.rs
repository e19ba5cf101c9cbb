mod app;
mod ui;

use crate::app::{App, CurrentScreen, MonitorSettings};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use motopick_client::{
    DeclaredType, MAX_CONVEYORS, MAX_ROBOTS, ReadResult, RemoteVariableClient, SharedProvider,
    VariableProvider, VariableStore, VariableValue, read_conveyors, read_robots, read_system,
};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::path::PathBuf;
use std::{io, sync::Arc, time::Duration};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const DEFAULT_ADDRESS: &str = "unix:///run/plcnext/grpc.sock";

#[derive(Debug, Parser)]
#[command(name = "motopick", version, about = "MotoPick PLC port console")]
struct Cli {
    /// Data-access endpoint: `unix:///path/to.sock` or `host:port`
    #[arg(long, env = "GRPC_ADDRESS", default_value = DEFAULT_ADDRESS, global = true)]
    address: String,

    /// Directory for the daily log file
    #[arg(long, default_value = "logs", global = true)]
    log_dir: PathBuf,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Interactive dashboard (default)
    Monitor {
        /// Robots to poll
        #[arg(long, default_value_t = 2)]
        robots: usize,
        /// Conveyors to poll
        #[arg(long, default_value_t = 2)]
        conveyors: usize,
        /// Refresh period in milliseconds
        #[arg(long, default_value_t = 1000)]
        refresh_ms: u64,
    },
    /// Print address, mode, and a system snapshot
    Status,
    /// Read one or more ports
    Read {
        #[arg(required = true)]
        ports: Vec<String>,
    },
    /// Write one port
    Write {
        port: String,
        value: String,
        /// Declared PLC type (BOOL, INT, DINT, UINT, UDINT, REAL, LREAL, STRING, AUTO)
        #[arg(long = "type", default_value = "AUTO")]
        declared: DeclaredType,
    },
    /// Read every port of the default topology
    Dump,
}

impl Command {
    fn monitor_settings(robots: usize, conveyors: usize, refresh_ms: u64) -> MonitorSettings {
        MonitorSettings {
            robots: robots.min(MAX_ROBOTS),
            conveyors: conveyors.min(MAX_CONVEYORS),
            refresh_interval: Duration::from_millis(refresh_ms.max(100)),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    std::fs::create_dir_all(&cli.log_dir)
        .with_context(|| format!("Failed to create log directory {}", cli.log_dir.display()))?;
    let file_appender = tracing_appender::rolling::daily(&cli.log_dir, "motopick.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(filter),
        )
        .init();

    tracing::info!(address = %cli.address, "Starting MotoPick console");

    let mut client = RemoteVariableClient::new(cli.address.clone());

    match cli.command.unwrap_or(Command::Monitor {
        robots: 2,
        conveyors: 2,
        refresh_ms: 1000,
    }) {
        Command::Monitor {
            robots,
            conveyors,
            refresh_ms,
        } => {
            let settings = Command::monitor_settings(robots, conveyors, refresh_ms);
            run_monitor(client, cli.address, settings).await
        }
        Command::Status => {
            print_status(&client).await;
            Ok(())
        }
        Command::Read { ports } => {
            let results = if let [port] = ports.as_slice() {
                vec![client.read_single(port).await]
            } else {
                client.read_multiple(&ports).await
            };
            results.iter().for_each(print_result);
            Ok(())
        }
        Command::Write {
            port,
            value,
            declared,
        } => {
            let parsed = VariableValue::infer(&value);
            if client.write_single(&port, parsed, declared).await {
                println!("ok: {port} <- {value} ({declared}, {})", client.mode());
                Ok(())
            } else {
                anyhow::bail!("write to {port} failed (see log in {})", cli.log_dir.display())
            }
        }
        Command::Dump => {
            let names: Vec<String> = VariableStore::initialize().snapshot().into_keys().collect();
            client
                .read_multiple(&names)
                .await
                .iter()
                .for_each(print_result);
            Ok(())
        }
    }
}

fn print_result(result: &ReadResult) {
    let value = result
        .value
        .as_ref()
        .map_or_else(|| "<absent>".to_string(), ToString::to_string);
    match &result.error {
        Some(e) => println!("{}\tERROR\t{e}", result.name),
        None if !result.succeeded => println!("{}\tMISSING", result.name),
        None => println!("{}\t{value}", result.name),
    }
}

async fn print_status(client: &RemoteVariableClient) {
    println!("address:   {}", client.address());
    println!("mode:      {}", client.mode());
    println!("simulated: {}", !client.is_connected());

    let system = read_system(client).await;
    let robots = read_robots(client, MAX_ROBOTS).await;
    let conveyors = read_conveyors(client, MAX_CONVEYORS).await;
    for view in [&system, &robots, &conveyors] {
        for (unit, fields) in &view.units {
            let line: Vec<String> = fields
                .iter()
                .map(|(field, value)| match value {
                    Some(v) => format!("{field}={v}"),
                    None => format!("{field}=<absent>"),
                })
                .collect();
            println!("{unit:<12}{}", line.join(" "));
        }
    }
}

async fn run_monitor(
    client: RemoteVariableClient,
    address: String,
    settings: MonitorSettings,
) -> Result<()> {
    let mode = client.mode();
    let provider: SharedProvider = Arc::new(tokio::sync::Mutex::new(client));

    // Setup terminal
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
        .context("Failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(provider, address, mode, settings);
    app.add_message(format!("Started in {mode} mode"));
    let res = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        tracing::error!(error = ?err, "Application error");
    }

    Ok(())
}

async fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    // Clear any leftover events (like the Enter key used to start the app)
    while event::poll(Duration::from_millis(0))? {
        let _ = event::read()?;
    }

    app.start_refresh();

    loop {
        // Poll background task progress
        app.poll_refresh_result();
        app.poll_write_result();
        app.maybe_auto_refresh();

        terminal.draw(|f| ui::render(f, app))?;

        // Crossterm polling blocks; yield so spawned tasks make progress.
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                handle_key_event(app, key);
            }
        } else {
            tokio::task::yield_now().await;
        }

        if let CurrentScreen::Exiting = app.current_screen {
            return Ok(());
        }
    }
}

fn handle_key_event(app: &mut App, key: event::KeyEvent) {
    if key.kind != event::KeyEventKind::Press {
        return;
    }

    match app.current_screen {
        CurrentScreen::Dashboard => match key.code {
            KeyCode::Tab | KeyCode::Right => app.next_tab(),
            KeyCode::BackTab | KeyCode::Left => app.prev_tab(),
            KeyCode::Down => app.select_next(),
            KeyCode::Up => app.select_prev(),
            KeyCode::Enter => app.enter_write_mode(),
            KeyCode::Char('r' | 'R') => app.request_refresh(),
            KeyCode::Esc | KeyCode::Char('q' | 'Q') => {
                app.current_screen = CurrentScreen::Exiting;
            }
            _ => {}
        },
        CurrentScreen::WriteInput => match key.code {
            KeyCode::Enter => app.start_write_value(),
            KeyCode::Tab => app.cycle_write_type(),
            KeyCode::Char(c) => app.write_value_input.push(c),
            KeyCode::Backspace => {
                app.write_value_input.pop();
            }
            KeyCode::Esc => app.go_back(),
            _ => {}
        },
        CurrentScreen::Loading | CurrentScreen::Exiting => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyEvent, KeyEventKind, KeyEventState, KeyModifiers};
    use motopick_client::{ClientMode, MockVariableProvider};

    fn key(code: KeyCode, kind: KeyEventKind) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::empty(),
            kind,
            state: KeyEventState::empty(),
        }
    }

    fn test_app() -> App {
        let provider: SharedProvider = Arc::new(tokio::sync::Mutex::new(MockVariableProvider::new()));
        App::new(
            provider,
            DEFAULT_ADDRESS.into(),
            ClientMode::Simulated,
            MonitorSettings::default(),
        )
    }

    #[test]
    fn test_handle_key_event_press_release() {
        let mut app = test_app();
        app.current_screen = CurrentScreen::WriteInput;
        app.write_port = Some("X.Y".into());

        handle_key_event(&mut app, key(KeyCode::Char('4'), KeyEventKind::Press));
        assert_eq!(app.write_value_input, "4");

        // Releases are ignored
        handle_key_event(&mut app, key(KeyCode::Char('2'), KeyEventKind::Release));
        assert_eq!(app.write_value_input, "4");

        handle_key_event(&mut app, key(KeyCode::Tab, KeyEventKind::Press));
        assert_eq!(app.write_type, DeclaredType::Bool);

        handle_key_event(&mut app, key(KeyCode::Backspace, KeyEventKind::Press));
        assert!(app.write_value_input.is_empty());
    }

    #[test]
    fn test_quit_logic_on_all_screens() {
        let mut app = test_app();

        // Write prompt: 'q' is input, Esc cancels
        app.current_screen = CurrentScreen::WriteInput;
        app.write_port = Some("X.Y".into());
        handle_key_event(&mut app, key(KeyCode::Char('q'), KeyEventKind::Press));
        assert_eq!(app.current_screen, CurrentScreen::WriteInput);
        assert!(app.write_value_input.ends_with('q'));
        handle_key_event(&mut app, key(KeyCode::Esc, KeyEventKind::Press));
        assert_eq!(app.current_screen, CurrentScreen::Dashboard);

        // Dashboard: 'q' quits
        handle_key_event(&mut app, key(KeyCode::Char('q'), KeyEventKind::Press));
        assert_eq!(app.current_screen, CurrentScreen::Exiting);
    }

    #[test]
    fn test_tab_keys_switch_views() {
        let mut app = test_app();
        handle_key_event(&mut app, key(KeyCode::Tab, KeyEventKind::Press));
        assert_eq!(app.tab, crate::app::Tab::Robots);
        handle_key_event(&mut app, key(KeyCode::Left, KeyEventKind::Press));
        assert_eq!(app.tab, crate::app::Tab::System);
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["motopick"]).unwrap();
        assert_eq!(cli.log_dir, PathBuf::from("logs"));
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_cli_write_parses_declared_type() {
        let cli = Cli::try_parse_from([
            "motopick",
            "--address",
            "192.168.1.10:50051",
            "write",
            "Arp.Plc.Eclr/MotoPick.Conveyor01.Speed",
            "0.75",
            "--type",
            "real",
        ])
        .unwrap();
        assert_eq!(cli.address, "192.168.1.10:50051");
        match cli.command {
            Some(Command::Write { declared, value, .. }) => {
                assert_eq!(declared, DeclaredType::Float);
                assert_eq!(value, "0.75");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_monitor_settings_are_clamped() {
        let settings = Command::monitor_settings(20, 40, 10);
        assert_eq!(settings.robots, MAX_ROBOTS);
        assert_eq!(settings.conveyors, MAX_CONVEYORS);
        assert_eq!(settings.refresh_interval, Duration::from_millis(100));
    }
}
