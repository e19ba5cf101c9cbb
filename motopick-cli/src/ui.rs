use crate::app::{App, CurrentScreen, Tab};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Row, Table, Tabs, Wrap},
};

pub fn render(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(3),
                Constraint::Length(1),
            ]
            .as_ref(),
        )
        .split(f.area());

    let header_area = chunks[0];
    let main_area = chunks[1];
    let status_area = chunks[2];
    let help_area = chunks[3];

    render_header(f, app, header_area);
    render_dashboard(f, app, main_area);

    match app.current_screen {
        CurrentScreen::WriteInput => render_write_popup(f, app, main_area),
        CurrentScreen::Loading => render_loading_popup(f, main_area),
        CurrentScreen::Dashboard | CurrentScreen::Exiting => {}
    }

    render_status_bar(f, app, status_area);
    render_help(f, app, help_area);
}

fn render_help(f: &mut Frame, app: &App, area: Rect) {
    let msg = match app.current_screen {
        CurrentScreen::Dashboard => {
            "Tab/←/→: View | ↑/↓: Nav | Enter: Write | r: Refresh | Esc/q: Quit"
        }
        CurrentScreen::WriteInput => "Type: Value | Tab: Cycle type | Enter: Write | Esc: Cancel",
        CurrentScreen::Loading => "Please wait...",
        CurrentScreen::Exiting => "Exiting...",
    };

    let span = Span::styled(msg, Style::default().fg(Color::DarkGray));
    f.render_widget(Paragraph::new(span), area);
}

fn render_header(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(0), Constraint::Length(40)])
        .split(area);

    let titles: Vec<Line> = Tab::ALL.iter().map(|t| Line::from(t.title())).collect();
    let tabs = Tabs::new(titles)
        .select(app.tab.index())
        .block(Block::default().borders(Borders::ALL).title(" MotoPick "))
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );
    f.render_widget(tabs, chunks[0]);

    let badge = if app.is_simulated() {
        Span::styled(
            "[SIMULATED]",
            Style::default()
                .fg(Color::Black)
                .bg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
    } else {
        Span::styled("[LIVE]", Style::default().fg(Color::Green))
    };
    let endpoint = Paragraph::new(Line::from(vec![badge, Span::raw(" "), Span::raw(&app.address)]))
        .block(Block::default().borders(Borders::ALL).title(" Controller "));
    f.render_widget(endpoint, chunks[1]);
}

fn render_dashboard(f: &mut Frame, app: &mut App, area: Rect) {
    let header = Row::new(vec!["Unit", "Field", "Value"]).style(
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    );

    let rows: Vec<Row> = app
        .rows()
        .into_iter()
        .map(|row| {
            let value = row
                .value
                .as_ref()
                .map_or_else(|| "n/a".to_string(), ToString::to_string);
            Row::new(vec![row.unit, row.field, value])
        })
        .collect();

    let widths = [
        Constraint::Percentage(30),
        Constraint::Percentage(30),
        Constraint::Percentage(40),
    ];

    let title = match app.last_refresh_time {
        Some(_) => format!(" {} ", app.tab.title()),
        None => format!(" {} (waiting for first read) ", app.tab.title()),
    };

    let table = Table::new(rows, widths)
        .header(header)
        .block(Block::default().borders(Borders::ALL).title(title))
        .row_highlight_style(Style::default().bg(Color::Blue).fg(Color::White))
        .highlight_symbol(">> ");

    f.render_stateful_widget(table, area, &mut app.table_state);
}

fn render_write_popup(f: &mut Frame, app: &App, area: Rect) {
    let port = app.write_port.as_deref().unwrap_or_default();
    let lines = vec![
        Line::from(vec![
            Span::styled("Port: ", Style::default().fg(Color::DarkGray)),
            Span::raw(port),
        ]),
        Line::from(vec![
            Span::styled("Type: ", Style::default().fg(Color::DarkGray)),
            Span::styled(app.write_type.to_string(), Style::default().fg(Color::Cyan)),
        ]),
        Line::from(Span::styled(
            format!("> {}_", app.write_value_input),
            Style::default().fg(Color::Yellow),
        )),
    ];

    let block = Block::default()
        .title(" Write Value ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let area = centered_rect(70, 40, area);
    f.render_widget(Clear, area);
    f.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        area,
    );
}

fn render_status_bar(f: &mut Frame, app: &App, area: Rect) {
    let display_messages: Vec<Line> = app
        .messages
        .last()
        .map(|m| {
            vec![Line::from(vec![
                Span::styled("- ", Style::default().fg(Color::DarkGray)),
                Span::raw(m),
            ])]
        })
        .unwrap_or_default();

    let paragraph = Paragraph::new(display_messages)
        .block(Block::default().borders(Borders::ALL).title(" Status Log "))
        .wrap(Wrap { trim: true });
    f.render_widget(paragraph, area);
}

fn render_loading_popup(f: &mut Frame, area: Rect) {
    let block = Block::default()
        .title(" Loading ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));

    let area = centered_rect(60, 20, area);
    f.render_widget(Clear, area);
    f.render_widget(
        Paragraph::new("Communicating with controller...").block(block),
        area,
    );
}

/// Centered rect taking the given percentages of `r`.
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
