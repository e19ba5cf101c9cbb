use chrono::Local;
use motopick_client::{
    CONVEYOR_VIEW_FIELDS, ClientMode, DEFAULT_ENABLED_UNITS, DeclaredType, LiveView,
    ROBOT_VIEW_FIELDS, SYSTEM_VIEW_FIELDS, SharedProvider, VariableError, VariableResult,
    VariableValue, friendly_status_hint, read_conveyors, read_robots, read_system, unit_port,
};
use ratatui::widgets::TableState;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;

/// Upper bound for one dashboard refresh (three batched reads).
const REFRESH_TIMEOUT_SECS: u64 = 5;

/// Upper bound for a single write.
const WRITE_TIMEOUT_SECS: u64 = 10;

/// Status log capacity.
const MAX_MESSAGES: usize = 10;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum CurrentScreen {
    Dashboard,
    Loading,
    WriteInput,
    Exiting,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Tab {
    System,
    Robots,
    Conveyors,
}

impl Tab {
    pub const ALL: [Self; 3] = [Self::System, Self::Robots, Self::Conveyors];

    pub const fn title(self) -> &'static str {
        match self {
            Self::System => "System",
            Self::Robots => "Robots",
            Self::Conveyors => "Conveyors",
        }
    }

    pub const fn index(self) -> usize {
        match self {
            Self::System => 0,
            Self::Robots => 1,
            Self::Conveyors => 2,
        }
    }

    pub const fn next(self) -> Self {
        match self {
            Self::System => Self::Robots,
            Self::Robots => Self::Conveyors,
            Self::Conveyors => Self::System,
        }
    }

    pub const fn prev(self) -> Self {
        match self {
            Self::System => Self::Conveyors,
            Self::Robots => Self::System,
            Self::Conveyors => Self::Robots,
        }
    }

    const fn fields(self) -> &'static [&'static str] {
        match self {
            Self::System => &SYSTEM_VIEW_FIELDS,
            Self::Robots => &ROBOT_VIEW_FIELDS,
            Self::Conveyors => &CONVEYOR_VIEW_FIELDS,
        }
    }
}

/// The three views behind the dashboard tabs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dashboard {
    pub system: LiveView,
    pub robots: LiveView,
    pub conveyors: LiveView,
}

impl Dashboard {
    pub const fn view(&self, tab: Tab) -> &LiveView {
        match tab {
            Tab::System => &self.system,
            Tab::Robots => &self.robots,
            Tab::Conveyors => &self.conveyors,
        }
    }
}

/// One table row: a unit's field and its last value.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardRow {
    pub unit: String,
    pub field: String,
    pub value: Option<VariableValue>,
}

impl DashboardRow {
    pub fn port(&self) -> String {
        unit_port(&self.unit, &self.field)
    }
}

/// What the dashboard polls and how often.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorSettings {
    pub robots: usize,
    pub conveyors: usize,
    pub refresh_interval: Duration,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            robots: DEFAULT_ENABLED_UNITS,
            conveyors: DEFAULT_ENABLED_UNITS,
            refresh_interval: Duration::from_secs(1),
        }
    }
}

/// Main application state for the MotoPick operator console.
///
/// Every provider call runs in a spawned task under a timeout; results come
/// back through oneshot receivers polled from the draw loop.
pub struct App {
    pub current_screen: CurrentScreen,
    pub tab: Tab,
    pub provider: SharedProvider,
    pub address: String,
    pub mode: ClientMode,
    pub settings: MonitorSettings,
    pub dashboard: Dashboard,
    pub messages: Vec<String>,
    pub table_state: TableState,
    pub selected_index: Option<usize>,
    pub refresh_result_rx: Option<oneshot::Receiver<VariableResult<Dashboard>>>,
    /// Set when the user asked for the refresh, so its outcome is logged.
    pub manual_refresh: bool,
    /// When the last refresh finished, successful or not.
    pub last_refresh_time: Option<Instant>,

    /// Port being edited in the write prompt.
    pub write_port: Option<String>,
    /// User-entered value string for writing.
    pub write_value_input: String,
    /// Declared type sent with the write. Cycled from the prompt.
    pub write_type: DeclaredType,
    pub write_result_rx: Option<oneshot::Receiver<VariableResult<bool>>>,
}

impl App {
    pub fn new(
        provider: SharedProvider,
        address: String,
        mode: ClientMode,
        settings: MonitorSettings,
    ) -> Self {
        Self {
            current_screen: CurrentScreen::Dashboard,
            tab: Tab::System,
            provider,
            address,
            mode,
            settings,
            dashboard: Dashboard::default(),
            messages: Vec::new(),
            table_state: TableState::default(),
            selected_index: None,
            refresh_result_rx: None,
            manual_refresh: false,
            last_refresh_time: None,

            write_port: None,
            write_value_input: String::new(),
            write_type: DeclaredType::Auto,
            write_result_rx: None,
        }
    }

    pub fn is_simulated(&self) -> bool {
        self.mode == ClientMode::Simulated
    }

    pub fn add_message(&mut self, message: String) {
        let stamped = format!("[{}] {message}", Local::now().format("%H:%M:%S"));
        self.messages.push(stamped);
        if self.messages.len() > MAX_MESSAGES {
            self.messages.remove(0);
        }
    }

    /// Rows of the active tab, units in port order and fields in poll order.
    pub fn rows(&self) -> Vec<DashboardRow> {
        let view = self.dashboard.view(self.tab);
        view.units
            .keys()
            .flat_map(|unit| {
                self.tab.fields().iter().map(move |field| DashboardRow {
                    unit: unit.clone(),
                    field: (*field).to_string(),
                    value: view.value(unit, field).cloned(),
                })
            })
            .collect()
    }

    /// Kick off a refresh of all three views. No-op while one is in flight.
    pub fn start_refresh(&mut self) {
        if self.refresh_result_rx.is_some() {
            return;
        }

        let provider = Arc::clone(&self.provider);
        let settings = self.settings;
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let result = tokio::time::timeout(Duration::from_secs(REFRESH_TIMEOUT_SECS), async {
                let guard = provider.lock().await;
                Dashboard {
                    system: read_system(&*guard).await,
                    robots: read_robots(&*guard, settings.robots).await,
                    conveyors: read_conveyors(&*guard, settings.conveyors).await,
                }
            })
            .await;

            let final_result = result.map_err(|_| {
                tracing::error!("Dashboard refresh timed out ({REFRESH_TIMEOUT_SECS}s)");
                VariableError::Internal(format!("Refresh timed out ({REFRESH_TIMEOUT_SECS}s)"))
            });

            let _ = tx.send(final_result);
        });

        self.refresh_result_rx = Some(rx);
    }

    /// User-triggered refresh; its outcome goes to the status log.
    pub fn request_refresh(&mut self) {
        if self.refresh_result_rx.is_some() {
            return;
        }
        self.manual_refresh = true;
        self.add_message("Refreshing...".into());
        self.start_refresh();
    }

    pub fn poll_refresh_result(&mut self) {
        if let Some(rx) = &mut self.refresh_result_rx {
            match rx.try_recv() {
                Ok(Ok(dashboard)) => {
                    self.dashboard = dashboard;
                    self.refresh_result_rx = None;
                    self.last_refresh_time = Some(Instant::now());
                    self.clamp_selection();

                    if std::mem::take(&mut self.manual_refresh) {
                        let absent = Tab::ALL
                            .iter()
                            .flat_map(|tab| self.dashboard.view(*tab).units.values())
                            .flat_map(|fields| fields.values())
                            .filter(|value| value.is_none())
                            .count();
                        if absent > 0 {
                            self.add_message(format!("Refreshed (⚠ {absent} values absent)"));
                        } else {
                            self.add_message("Refreshed".into());
                        }
                    }
                }
                Ok(Err(e)) => {
                    tracing::error!(error = %e, "Dashboard refresh failed");
                    let msg = match friendly_status_hint(&e) {
                        Some(h) => format!("Refresh error: {h} ({e})"),
                        None => format!("Refresh error: {e}"),
                    };
                    self.add_message(msg);
                    self.refresh_result_rx = None;
                    self.manual_refresh = false;
                    self.last_refresh_time = Some(Instant::now());
                }
                Err(oneshot::error::TryRecvError::Empty) => {
                    // Still running
                }
                Err(oneshot::error::TryRecvError::Closed) => {
                    tracing::error!("Refresh background task terminated unexpectedly (sender dropped)");
                    self.add_message("Refresh task terminated unexpectedly".into());
                    self.refresh_result_rx = None;
                    self.manual_refresh = false;
                    self.last_refresh_time = Some(Instant::now());
                }
            }
        }
    }

    pub fn maybe_auto_refresh(&mut self) {
        if self.current_screen != CurrentScreen::Dashboard {
            return;
        }
        if self.refresh_result_rx.is_some() {
            return;
        }
        if let Some(t) = self.last_refresh_time
            && t.elapsed() < self.settings.refresh_interval
        {
            return;
        }

        tracing::trace!(tab = self.tab.title(), "Auto-refreshing dashboard");
        self.start_refresh();
    }

    pub fn next_tab(&mut self) {
        self.set_tab(self.tab.next());
    }

    pub fn prev_tab(&mut self) {
        self.set_tab(self.tab.prev());
    }

    fn set_tab(&mut self, tab: Tab) {
        self.tab = tab;
        let first = if self.rows().is_empty() { None } else { Some(0) };
        self.selected_index = first;
        self.table_state.select(first);
    }

    fn clamp_selection(&mut self) {
        let count = self.rows().len();
        let clamped = match self.selected_index {
            _ if count == 0 => None,
            Some(idx) => Some(idx.min(count - 1)),
            None => Some(0),
        };
        self.selected_index = clamped;
        self.table_state.select(clamped);
    }

    pub fn select_next(&mut self) {
        let count = self.rows().len();
        if count == 0 {
            return;
        }

        let new_idx = match self.selected_index {
            Some(idx) if idx < count - 1 => idx + 1,
            Some(idx) => idx,
            None => 0,
        };
        self.selected_index = Some(new_idx);
        self.table_state.select(Some(new_idx));
    }

    pub fn select_prev(&mut self) {
        if let Some(idx) = self.selected_index
            && idx > 0
        {
            let new_idx = idx - 1;
            self.selected_index = Some(new_idx);
            self.table_state.select(Some(new_idx));
        }
    }

    /// Open the write prompt for the highlighted row.
    pub fn enter_write_mode(&mut self) {
        if self.current_screen != CurrentScreen::Dashboard {
            return;
        }

        let port = self
            .selected_index
            .and_then(|idx| self.rows().get(idx).map(DashboardRow::port));

        if let Some(port) = port {
            tracing::debug!(port = %port, "enter_write_mode: entering write mode for port");
            self.write_port = Some(port);
            self.write_value_input.clear();
            self.write_type = DeclaredType::Auto;
            self.current_screen = CurrentScreen::WriteInput;
        } else {
            tracing::debug!("enter_write_mode: no port selected");
            self.add_message("No port selected to write.".into());
        }
    }

    pub fn cycle_write_type(&mut self) {
        self.write_type = self.write_type.next();
    }

    /// Start writing the prompt's value to `write_port`.
    pub fn start_write_value(&mut self) {
        let Some(port) = self.write_port.clone() else {
            return;
        };
        let value_str = self.write_value_input.trim().to_string();
        if value_str.is_empty() {
            self.add_message("Value cannot be empty.".into());
            return;
        }

        let value = VariableValue::infer(&value_str);
        let declared = self.write_type;

        tracing::info!(
            port = %port,
            value = %value_str,
            parsed_type = value.kind(),
            declared = %declared,
            "start_write_value: initiating write"
        );

        self.current_screen = CurrentScreen::Loading;
        self.add_message(format!("Writing '{value_str}' to {port} as {declared}..."));

        let provider = Arc::clone(&self.provider);
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let result = tokio::time::timeout(Duration::from_secs(WRITE_TIMEOUT_SECS), async {
                let mut guard = provider.lock().await;
                guard.write_single(&port, value, declared).await
            })
            .await;

            let final_result = result.map_err(|_| {
                tracing::error!("Write timed out ({WRITE_TIMEOUT_SECS}s)");
                VariableError::Internal(format!("Write timed out ({WRITE_TIMEOUT_SECS}s)"))
            });
            let _ = tx.send(final_result);
        });

        self.write_result_rx = Some(rx);
    }

    pub fn poll_write_result(&mut self) {
        if let Some(rx) = &mut self.write_result_rx {
            let port = self.write_port.clone().unwrap_or_default();
            match rx.try_recv() {
                Ok(Ok(true)) => {
                    tracing::info!(port = %port, "poll_write_result: write succeeded");
                    self.add_message(format!("✓ Write to '{port}' succeeded"));
                    self.finish_write();
                    // Show the new value
                    self.request_refresh();
                }
                Ok(Ok(false)) => {
                    self.add_message(format!("✗ Write to '{port}' failed (see log)"));
                    self.finish_write();
                }
                Ok(Err(e)) => {
                    tracing::error!(port = %port, error = %e, "Write failed");
                    self.add_message(format!("✗ Write to '{port}' failed: {e}"));
                    self.finish_write();
                }
                Err(oneshot::error::TryRecvError::Empty) => {}
                Err(oneshot::error::TryRecvError::Closed) => {
                    tracing::error!("Write background task terminated unexpectedly");
                    self.add_message("Write task terminated unexpectedly".into());
                    self.finish_write();
                }
            }
        }
    }

    fn finish_write(&mut self) {
        self.current_screen = CurrentScreen::Dashboard;
        self.write_result_rx = None;
        self.write_port = None;
        self.write_value_input.clear();
    }

    pub fn go_back(&mut self) {
        match self.current_screen {
            CurrentScreen::WriteInput => {
                self.current_screen = CurrentScreen::Dashboard;
                self.write_port = None;
                self.write_value_input.clear();
            }
            CurrentScreen::Dashboard => {
                self.current_screen = CurrentScreen::Exiting;
            }
            _ => {}
        }
    }
}
