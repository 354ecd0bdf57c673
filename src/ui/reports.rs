use anyhow::Result;
use crossterm::event::{self, Event, KeyCode};
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::Spans,
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap},
    Frame,
};

use crate::models::{Report, ReportFormat, ReportKind, ReportQuery};
use crate::ui::components::text_input::TextInputState;
use crate::ui::{centered_rect, next_index, previous_index, render_help};

/// Title and description being edited for the selected report
struct DetailsForm {
    report_id: i64,
    title: TextInputState,
    description: TextInputState,
    on_description: bool,
}

impl DetailsForm {
    fn new(report: &Report) -> Self {
        Self {
            report_id: report.id,
            title: TextInputState::new("Title").with_value(report.title.clone()),
            description: TextInputState::new("Description")
                .with_value(report.description.clone().unwrap_or_default()),
            on_description: false,
        }
    }

    fn action(&self) -> ReportAction {
        let description = self.description.value.trim();
        ReportAction::UpdateDetails {
            report_id: self.report_id,
            title: self.title.value.trim().to_string(),
            description: (!description.is_empty()).then(|| description.to_string()),
        }
    }
}

// Represents the state of the report table screen
pub struct ReportsState {
    reports: Vec<Report>,
    query: ReportQuery,
    table_state: TableState,
    /// Opened from the export entry of the dashboard
    export_mode: bool,
    show_delete_confirmation: bool,
    details_form: Option<DetailsForm>,
}

impl ReportsState {
    pub fn new(reports: Vec<Report>, query: ReportQuery, export_mode: bool) -> Self {
        let mut table_state = TableState::default();
        if !reports.is_empty() {
            table_state.select(Some(0));
        }

        Self {
            reports,
            query,
            table_state,
            export_mode,
            show_delete_confirmation: false,
            details_form: None,
        }
    }

    pub fn next(&mut self) {
        self.table_state.select(next_index(self.table_state.selected(), self.reports.len()));
    }

    pub fn previous(&mut self) {
        self.table_state
            .select(previous_index(self.table_state.selected(), self.reports.len()));
    }

    pub fn selected_report(&self) -> Option<&Report> {
        self.table_state.selected().and_then(|i| self.reports.get(i))
    }

    pub fn selected_report_id(&self) -> Option<i64> {
        self.selected_report().map(|r| r.id)
    }

    pub fn query(&self) -> &ReportQuery {
        &self.query
    }

    pub fn export_mode(&self) -> bool {
        self.export_mode
    }

    /// Next kind filter: all, then each kind in turn
    fn cycle_kind(&self) -> ReportQuery {
        let kind = match self.query.kind {
            None => Some(ReportKind::ALL[0]),
            Some(current) => ReportKind::ALL
                .iter()
                .position(|k| *k == current)
                .and_then(|i| ReportKind::ALL.get(i + 1))
                .copied(),
        };
        ReportQuery {
            kind,
            ..self.query.clone()
        }
    }
}

pub enum ReportAction {
    Back,
    Generate,
    Export(i64, ReportFormat),
    Delete(i64),
    Filter(ReportQuery),
    UpdateDetails {
        report_id: i64,
        title: String,
        description: Option<String>,
    },
}

pub fn render_reports<B: Backend>(frame: &mut Frame<B>, area: Rect, state: &mut ReportsState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),
            Constraint::Length(7),
            Constraint::Length(3),
        ].as_ref())
        .split(area);

    let header_cells = ["ID", "Kind", "Title", "Format", "Clients", "Created"]
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(Color::Yellow)));
    let header = Row::new(header_cells).height(1).bottom_margin(1);

    let rows = state.reports.iter().map(|report| {
        let clients = if report.client_ids.is_empty() {
            "-".to_string()
        } else {
            report.client_ids.len().to_string()
        };
        Row::new(vec![
            Cell::from(report.id.to_string()),
            Cell::from(report.kind.as_str()),
            Cell::from(report.title.clone()),
            Cell::from(report.format.as_str()),
            Cell::from(clients),
            Cell::from(report.created_at.format("%Y-%m-%d %H:%M").to_string()),
        ])
    });

    let mut filter = String::new();
    if let Some(kind) = state.query.kind {
        filter.push_str(&format!(" [{}]", kind));
    }
    if let Some(client_id) = state.query.client_id {
        filter.push_str(&format!(" [client {}]", client_id));
    }
    let title = if state.export_mode {
        format!("Export a report{}", filter)
    } else {
        format!("Reports ({}){}", state.reports.len(), filter)
    };
    let table = Table::new(rows)
        .header(header)
        .block(Block::default().title(title).borders(Borders::ALL))
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .widths(&[
            Constraint::Percentage(6),
            Constraint::Percentage(12),
            Constraint::Percentage(38),
            Constraint::Percentage(8),
            Constraint::Percentage(10),
            Constraint::Percentage(26),
        ]);

    frame.render_stateful_widget(table, chunks[0], &mut state.table_state);

    let details: Vec<Spans> = match state.selected_report() {
        Some(report) => vec![
            Spans::from(format!("Title: {}", report.title)),
            Spans::from(format!(
                "Description: {}",
                report.description.as_deref().unwrap_or("N/A")
            )),
            Spans::from(format!("Client ids: {}", join_ids(&report.client_ids))),
            Spans::from(format!("File: {}", report.file_path)),
        ],
        None => vec![Spans::from("No reports yet")],
    };
    let details = Paragraph::new(details)
        .wrap(Wrap { trim: true })
        .block(Block::default().title("Details").borders(Borders::ALL));
    frame.render_widget(details, chunks[1]);

    let help = match (state.selected_report().is_some(), state.export_mode) {
        (true, true) => "<P> PDF | <X> Excel | <C> CSV | <F> Filter kind | <A> All | <Esc> Back",
        (true, false) => {
            "<G> Generate | <P/X/C> Export PDF/Excel/CSV | <E> Edit details | <D> Delete | <F> Filter | <A> All | <Esc> Back"
        }
        (false, _) => "<G> Generate | <F> Filter kind | <A> All | <Esc> Back",
    };
    render_help(frame, chunks[2], help);

    if state.show_delete_confirmation {
        let popup_area = centered_rect(50, 20, area);
        let popup = Paragraph::new(vec![
            Spans::from(""),
            Spans::from("Delete this report and its snapshot?"),
            Spans::from(""),
            Spans::from("The generated file is left on disk."),
            Spans::from(""),
            Spans::from("<Y> Yes  <N> No"),
        ])
        .block(Block::default().title("Confirm Delete").borders(Borders::ALL))
        .style(Style::default().fg(Color::White).bg(Color::Black));
        frame.render_widget(Clear, popup_area);
        frame.render_widget(popup, popup_area);
    }

    if let Some(form) = &state.details_form {
        let popup_area = centered_rect(60, 30, area);
        let popup = Paragraph::new(vec![
            Spans::from(""),
            form.title.to_spans(!form.on_description),
            form.description.to_spans(form.on_description),
            Spans::from(""),
            Spans::from("<Tab> Switch field | <Enter> Save | <Esc> Cancel"),
        ])
        .block(Block::default().title("Edit report details").borders(Borders::ALL))
        .style(Style::default().fg(Color::White).bg(Color::Black));
        frame.render_widget(Clear, popup_area);
        frame.render_widget(popup, popup_area);
    }
}

fn join_ids(ids: &[i64]) -> String {
    if ids.is_empty() {
        return "N/A".to_string();
    }
    ids.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(", ")
}

pub fn handle_input(state: &mut ReportsState) -> Result<Option<ReportAction>> {
    if let Event::Key(key) = event::read()? {
        if let Some(form) = &mut state.details_form {
            match key.code {
                KeyCode::Esc => state.details_form = None,
                KeyCode::Enter => {
                    let action = form.action();
                    state.details_form = None;
                    return Ok(Some(action));
                }
                KeyCode::Tab | KeyCode::Up | KeyCode::Down => {
                    form.on_description = !form.on_description;
                }
                code => {
                    if form.on_description {
                        form.description.handle_input(code);
                    } else {
                        form.title.handle_input(code);
                    }
                }
            }
            return Ok(None);
        }

        if state.show_delete_confirmation {
            match key.code {
                KeyCode::Char('y') => {
                    state.show_delete_confirmation = false;
                    if let Some(id) = state.selected_report_id() {
                        return Ok(Some(ReportAction::Delete(id)));
                    }
                }
                KeyCode::Char('n') | KeyCode::Esc => state.show_delete_confirmation = false,
                _ => {}
            }
            return Ok(None);
        }

        let format = match key.code {
            KeyCode::Char('p') => Some(ReportFormat::Pdf),
            KeyCode::Char('x') => Some(ReportFormat::Xlsx),
            KeyCode::Char('c') => Some(ReportFormat::Csv),
            _ => None,
        };
        if let Some(format) = format {
            if let Some(id) = state.selected_report_id() {
                return Ok(Some(ReportAction::Export(id, format)));
            }
            return Ok(None);
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return Ok(Some(ReportAction::Back)),
            KeyCode::Char('g') => return Ok(Some(ReportAction::Generate)),
            KeyCode::Char('f') => return Ok(Some(ReportAction::Filter(state.cycle_kind()))),
            KeyCode::Char('a') if state.query != ReportQuery::default() => {
                return Ok(Some(ReportAction::Filter(ReportQuery::default())));
            }
            KeyCode::Char('e') if !state.export_mode => {
                state.details_form = state.selected_report().map(DetailsForm::new);
            }
            KeyCode::Char('d') if !state.export_mode => {
                if state.selected_report().is_some() {
                    state.show_delete_confirmation = true;
                }
            }
            KeyCode::Down => state.next(),
            KeyCode::Up => state.previous(),
            _ => {}
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_filter_cycles_back_to_all() {
        let mut query = ReportQuery::default();
        let mut seen = Vec::new();
        for _ in 0..=ReportKind::ALL.len() {
            query = ReportsState::new(vec![], query, false).cycle_kind();
            seen.push(query.kind);
        }

        assert_eq!(seen.first(), Some(&Some(ReportKind::Individual)));
        assert_eq!(seen.last(), Some(&None));
    }

    #[test]
    fn test_kind_filter_keeps_client() {
        let query = ReportQuery {
            kind: None,
            client_id: Some(3),
        };
        let next = ReportsState::new(vec![], query, false).cycle_kind();
        assert_eq!(next.kind, Some(ReportKind::Individual));
        assert_eq!(next.client_id, Some(3));
    }

    #[test]
    fn test_details_form_action() {
        let report = Report {
            id: 4,
            kind: ReportKind::FullList,
            title: "Client list".into(),
            description: None,
            client_ids: vec![1, 2],
            format: ReportFormat::Csv,
            file_path: "reports/full_list_all_r4.csv".into(),
            created_at: chrono::Utc::now(),
        };
        let mut form = DetailsForm::new(&report);
        form.title.value = " Board list ".into();
        form.description.value = "   ".into();

        match form.action() {
            ReportAction::UpdateDetails { report_id, title, description } => {
                assert_eq!(report_id, 4);
                assert_eq!(title, "Board list");
                assert_eq!(description, None);
            }
            _ => panic!("expected an update"),
        }
    }

    #[test]
    fn test_join_ids() {
        assert_eq!(join_ids(&[]), "N/A");
        assert_eq!(join_ids(&[3, 5]), "3, 5");
    }
}
