use anyhow::Result;
use crossterm::event::{self, Event, KeyCode};
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    widgets::{Block, Borders, Cell, Row, Table},
    Frame,
};

use crate::models::{ClientStats, ReportFormat, ReportStats};
use crate::ui::render_help;

pub struct StatisticsState {
    clients: ClientStats,
    reports: ReportStats,
}

impl StatisticsState {
    pub fn new(clients: ClientStats, reports: ReportStats) -> Self {
        Self { clients, reports }
    }
}

pub enum StatisticsAction {
    Back,
    /// Save the figures as a statistics report
    Generate(ReportFormat),
}

fn counts_table<'a>(title: String, label: &'a str, counts: &'a [(String, i64)]) -> Table<'a> {
    let header = Row::new(vec![
        Cell::from(label).style(Style::default().fg(Color::Yellow)),
        Cell::from("Count").style(Style::default().fg(Color::Yellow)),
    ])
    .bottom_margin(1);

    let rows = counts
        .iter()
        .map(|(name, count)| Row::new(vec![Cell::from(name.as_str()), Cell::from(count.to_string())]));

    Table::new(rows)
        .header(header)
        .block(Block::default().title(title).borders(Borders::ALL))
        .widths(&[Constraint::Percentage(70), Constraint::Percentage(30)])
}

pub fn render_statistics<B: Backend>(frame: &mut Frame<B>, area: Rect, state: &mut StatisticsState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(3)].as_ref())
        .split(area);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)].as_ref())
        .split(chunks[0]);

    let client_panels = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)].as_ref())
        .split(columns[0]);
    let report_panels = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)].as_ref())
        .split(columns[1]);

    frame.render_widget(
        counts_table(
            format!("Clients by country (total {})", state.clients.total_clients),
            "Country",
            &state.clients.by_country,
        ),
        client_panels[0],
    );
    frame.render_widget(
        counts_table("Top cities".to_string(), "City", &state.clients.by_city),
        client_panels[1],
    );
    frame.render_widget(
        counts_table(
            format!("Reports by kind (total {})", state.reports.total_reports),
            "Kind",
            &state.reports.by_kind,
        ),
        report_panels[0],
    );
    frame.render_widget(
        counts_table("Reports by format".to_string(), "Format", &state.reports.by_format),
        report_panels[1],
    );

    render_help(
        frame,
        chunks[1],
        "<P> Save as PDF | <X> Save as Excel | <C> Save as CSV | <Esc> Back",
    );
}

pub fn handle_input(_state: &mut StatisticsState) -> Result<Option<StatisticsAction>> {
    if let Event::Key(key) = event::read()? {
        let action = match key.code {
            KeyCode::Char('q') | KeyCode::Esc => Some(StatisticsAction::Back),
            KeyCode::Char('p') => Some(StatisticsAction::Generate(ReportFormat::Pdf)),
            KeyCode::Char('x') => Some(StatisticsAction::Generate(ReportFormat::Xlsx)),
            KeyCode::Char('c') => Some(StatisticsAction::Generate(ReportFormat::Csv)),
            _ => None,
        };
        return Ok(action);
    }
    Ok(None)
}
