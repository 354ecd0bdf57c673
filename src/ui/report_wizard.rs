use anyhow::Result;
use crossterm::event::{self, Event, KeyCode};
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::models::{ClientColumn, ClientQuery, ReportFormat, ReportKind};
use crate::reports::ReportRequest;
use crate::ui::components::text_input::TextInputState;

pub enum ReportWizardAction {
    Cancel,
    Generate(ReportRequest, ReportFormat),
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum ReportField {
    Kind,
    Format,
    Clients,
    Search,
    Columns,
}

impl ReportField {
    const ALL: [ReportField; 5] = [
        ReportField::Kind,
        ReportField::Format,
        ReportField::Clients,
        ReportField::Search,
        ReportField::Columns,
    ];
}

pub struct ReportWizardState {
    pub kind: ReportKind,
    pub format: ReportFormat,
    pub clients: TextInputState,
    pub search: TextInputState,
    pub columns: Vec<(ClientColumn, bool)>,
    pub column_cursor: usize,
    pub current_field: ReportField,
    pub error: Option<String>,
    /// Country and order carried into a full list report
    list_query: ClientQuery,
}

impl ReportWizardState {
    pub fn new() -> Self {
        Self {
            kind: ReportKind::Individual,
            format: ReportFormat::Pdf,
            clients: TextInputState::new("Client ids"),
            search: TextInputState::new("Search"),
            columns: ClientColumn::ALL.iter().map(|c| (*c, true)).collect(),
            column_cursor: 0,
            current_field: ReportField::Kind,
            error: None,
            list_query: ClientQuery::default(),
        }
    }

    /// Preselect an individual report for one client
    pub fn for_client(client_id: i64) -> Self {
        let mut state = Self::new();
        state.clients.value = client_id.to_string();
        state.current_field = ReportField::Format;
        state
    }

    /// Preselect a full list report with the given filter
    pub fn for_query(query: &ClientQuery) -> Self {
        let mut state = Self::new();
        state.kind = ReportKind::FullList;
        state.search.value = query.search.clone().unwrap_or_default();
        state.list_query = query.clone();
        state.current_field = ReportField::Format;
        state
    }

    /// Fields that apply to the selected kind
    fn visible_fields(&self) -> Vec<ReportField> {
        ReportField::ALL
            .iter()
            .copied()
            .filter(|field| match field {
                ReportField::Kind | ReportField::Format => true,
                ReportField::Clients => {
                    matches!(self.kind, ReportKind::Individual | ReportKind::Custom)
                }
                ReportField::Search => self.kind == ReportKind::FullList,
                ReportField::Columns => self.kind == ReportKind::Custom,
            })
            .collect()
    }

    pub fn next_field(&mut self) {
        let fields = self.visible_fields();
        let index = fields.iter().position(|f| *f == self.current_field).unwrap_or(0);
        self.current_field = fields[(index + 1) % fields.len()];
    }

    pub fn previous_field(&mut self) {
        let fields = self.visible_fields();
        let index = fields.iter().position(|f| *f == self.current_field).unwrap_or(0);
        self.current_field = fields[(index + fields.len() - 1) % fields.len()];
    }

    /// Left/Right on a choice field
    pub fn cycle(&mut self, forward: bool) {
        match self.current_field {
            ReportField::Kind => self.kind = cycle_value(&ReportKind::ALL, self.kind, forward),
            ReportField::Format => self.format = cycle_value(&ReportFormat::ALL, self.format, forward),
            ReportField::Columns => {
                let len = self.columns.len();
                self.column_cursor = if forward {
                    (self.column_cursor + 1) % len
                } else {
                    (self.column_cursor + len - 1) % len
                };
            }
            _ => {}
        }
        self.error = None;
    }

    pub fn toggle_column(&mut self) {
        if let Some((_, enabled)) = self.columns.get_mut(self.column_cursor) {
            *enabled = !*enabled;
        }
    }

    fn edit_text(&mut self, key: KeyCode) {
        let changed = match self.current_field {
            ReportField::Clients => self.clients.handle_input(key),
            ReportField::Search => self.search.handle_input(key),
            _ => false,
        };
        if changed {
            self.error = None;
        }
    }

    /// Turn the form into a report request
    pub fn request(&self) -> std::result::Result<ReportRequest, String> {
        match self.kind {
            ReportKind::Individual => {
                let ids = parse_ids(&self.clients.value)?;
                match ids.as_slice() {
                    [client_id] => Ok(ReportRequest::Individual { client_id: *client_id }),
                    _ => Err("an individual report needs exactly one client id".to_string()),
                }
            }
            ReportKind::FullList => {
                let term = self.search.value.trim();
                let query = ClientQuery {
                    search: (!term.is_empty()).then(|| term.to_string()),
                    ..self.list_query.clone()
                };
                Ok(ReportRequest::FullList { query })
            }
            ReportKind::Statistics => Ok(ReportRequest::Statistics),
            ReportKind::Custom => {
                let client_ids = parse_ids(&self.clients.value)?;
                if client_ids.is_empty() {
                    return Err("list at least one client id".to_string());
                }
                let columns: Vec<ClientColumn> = self
                    .columns
                    .iter()
                    .filter(|(_, enabled)| *enabled)
                    .map(|(column, _)| *column)
                    .collect();
                if columns.is_empty() {
                    return Err("select at least one column".to_string());
                }
                Ok(ReportRequest::Custom { client_ids, columns })
            }
        }
    }
}

impl Default for ReportWizardState {
    fn default() -> Self {
        Self::new()
    }
}

fn cycle_value<T: Copy + PartialEq>(values: &[T], current: T, forward: bool) -> T {
    let index = values.iter().position(|v| *v == current).unwrap_or(0);
    let len = values.len();
    if forward {
        values[(index + 1) % len]
    } else {
        values[(index + len - 1) % len]
    }
}

/// Comma or space separated client ids, duplicates dropped
fn parse_ids(text: &str) -> std::result::Result<Vec<i64>, String> {
    let mut ids = Vec::new();
    for part in text.split(|c: char| c == ',' || c.is_whitespace()) {
        if part.is_empty() {
            continue;
        }
        let id: i64 = part
            .parse()
            .map_err(|_| format!("'{}' is not a client id", part))?;
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    Ok(ids)
}

pub fn render_report_wizard<B: Backend>(f: &mut Frame<B>, area: Rect, state: &mut ReportWizardState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Min(8),
                Constraint::Length(3),
            ]
            .as_ref(),
        )
        .split(area);

    let title = Paragraph::new("Generate Report")
        .style(Style::default().fg(Color::Cyan))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(title, chunks[0]);

    let mut lines = Vec::new();
    for field in state.visible_fields() {
        let focused = field == state.current_field;
        let label_style = if focused {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        };

        match field {
            ReportField::Kind => lines.push(Spans::from(vec![
                Span::styled("Kind: ", label_style),
                Span::raw(format!("< {} >", state.kind)),
            ])),
            ReportField::Format => lines.push(Spans::from(vec![
                Span::styled("Format: ", label_style),
                Span::raw(format!("< {} >", state.format)),
            ])),
            ReportField::Clients => lines.push(state.clients.to_spans(focused)),
            ReportField::Search => lines.push(state.search.to_spans(focused)),
            ReportField::Columns => {
                lines.push(Spans::from(Span::styled("Columns:", label_style)));
                for (i, (column, enabled)) in state.columns.iter().enumerate() {
                    let mark = if *enabled { "[x]" } else { "[ ]" };
                    let style = if focused && i == state.column_cursor {
                        Style::default().add_modifier(Modifier::BOLD).fg(Color::Yellow)
                    } else {
                        Style::default()
                    };
                    lines.push(Spans::from(Span::styled(
                        format!("  {} {}", mark, column.header()),
                        style,
                    )));
                }
            }
        }
    }

    let form = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Options"));
    f.render_widget(form, chunks[1]);

    let (help_text, help_style) = match &state.error {
        Some(error) => (format!("{} | Esc - Cancel", error), Style::default().fg(Color::Red)),
        None => (
            "Up/Down - Field | Left/Right - Change | Space - Toggle column | Enter - Generate | Esc - Cancel"
                .to_string(),
            Style::default().fg(Color::Gray),
        ),
    };
    let help = Paragraph::new(help_text)
        .style(help_style)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(help, chunks[2]);
}

pub fn handle_input(state: &mut ReportWizardState) -> Result<Option<ReportWizardAction>> {
    if let Event::Key(key) = event::read()? {
        match key.code {
            KeyCode::Esc => return Ok(Some(ReportWizardAction::Cancel)),
            KeyCode::Enter => match state.request() {
                Ok(request) => return Ok(Some(ReportWizardAction::Generate(request, state.format))),
                Err(message) => state.error = Some(message),
            },
            KeyCode::Down | KeyCode::Tab => state.next_field(),
            KeyCode::Up | KeyCode::BackTab => state.previous_field(),
            KeyCode::Right => state.cycle(true),
            KeyCode::Left => state.cycle(false),
            KeyCode::Char(' ') if state.current_field == ReportField::Columns => state.toggle_column(),
            code => state.edit_text(code),
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ClientSort;

    #[test]
    fn test_parse_ids() {
        assert_eq!(parse_ids("1, 2 3,,2"), Ok(vec![1, 2, 3]));
        assert_eq!(parse_ids(""), Ok(vec![]));
        assert!(parse_ids("1,x").is_err());
    }

    #[test]
    fn test_individual_needs_one_id() {
        let mut state = ReportWizardState::new();
        assert!(state.request().is_err());

        state.clients.value = "7".into();
        assert_eq!(state.request(), Ok(ReportRequest::Individual { client_id: 7 }));

        state.clients.value = "7,8".into();
        assert!(state.request().is_err());
    }

    #[test]
    fn test_custom_uses_enabled_columns() {
        let mut state = ReportWizardState::new();
        state.kind = ReportKind::Custom;
        state.clients.value = "1 2".into();
        for (column, enabled) in state.columns.iter_mut() {
            *enabled = matches!(column, ClientColumn::Name | ClientColumn::Email);
        }

        assert_eq!(
            state.request(),
            Ok(ReportRequest::Custom {
                client_ids: vec![1, 2],
                columns: vec![ClientColumn::Name, ClientColumn::Email],
            })
        );
    }

    #[test]
    fn test_full_list_from_query() {
        let state = ReportWizardState::for_query(&ClientQuery::search("acme"));
        assert_eq!(
            state.request(),
            Ok(ReportRequest::FullList { query: ClientQuery::search("acme") })
        );
    }

    #[test]
    fn test_full_list_keeps_country_and_sort() {
        let query = ClientQuery {
            search: Some("acme".into()),
            country: Some("Chile".into()),
            sort: ClientSort::Name,
        };
        let mut state = ReportWizardState::for_query(&query);
        assert_eq!(state.request(), Ok(ReportRequest::FullList { query: query.clone() }));

        state.search.value.clear();
        let expected = ClientQuery {
            search: None,
            ..query
        };
        assert_eq!(state.request(), Ok(ReportRequest::FullList { query: expected }));
    }

    #[test]
    fn test_fields_follow_kind() {
        let mut state = ReportWizardState::new();
        state.kind = ReportKind::Statistics;
        state.current_field = ReportField::Format;
        state.next_field();
        assert_eq!(state.current_field, ReportField::Kind);

        state.cycle(true);
        assert_eq!(state.kind, ReportKind::Custom);
        state.cycle(true);
        assert_eq!(state.kind, ReportKind::Individual);
    }
}
