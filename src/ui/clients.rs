use anyhow::Result;
use crossterm::event::{self, Event, KeyCode};
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::Spans,
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState},
    Frame,
};

use crate::models::{Client, ClientQuery, ClientSort};
use crate::ui::components::text_input::TextInputState;
use crate::ui::{centered_rect, next_index, previous_index, render_help};

// Represents the state of the client list screen
pub struct ClientsState {
    clients: Vec<Client>,
    query: ClientQuery,
    table_state: TableState,
    search: TextInputState,
    searching: bool,
    show_delete_confirmation: bool,
}

impl ClientsState {
    pub fn new(clients: Vec<Client>, query: ClientQuery) -> Self {
        let mut table_state = TableState::default();
        if !clients.is_empty() {
            table_state.select(Some(0));
        }
        let search = TextInputState::new("Search").with_value(query.search.clone().unwrap_or_default());

        Self {
            clients,
            query,
            table_state,
            search,
            searching: false,
            show_delete_confirmation: false,
        }
    }

    pub fn next(&mut self) {
        self.table_state.select(next_index(self.table_state.selected(), self.clients.len()));
    }

    pub fn previous(&mut self) {
        self.table_state
            .select(previous_index(self.table_state.selected(), self.clients.len()));
    }

    pub fn toggle_delete_confirmation(&mut self) {
        self.show_delete_confirmation = !self.show_delete_confirmation;
    }

    pub fn selected_client(&self) -> Option<&Client> {
        self.table_state.selected().and_then(|i| self.clients.get(i))
    }

    pub fn selected_client_id(&self) -> Option<i64> {
        self.selected_client().map(|c| c.id)
    }

    pub fn query(&self) -> &ClientQuery {
        &self.query
    }

    /// The query with the typed search term applied
    fn search_query(&self) -> ClientQuery {
        let term = self.search.value.trim();
        ClientQuery {
            search: (!term.is_empty()).then(|| term.to_string()),
            ..self.query.clone()
        }
    }

    fn cycle_sort(&self) -> ClientQuery {
        let sort = match self.query.sort {
            ClientSort::Newest => ClientSort::Name,
            ClientSort::Name => ClientSort::Id,
            ClientSort::Id => ClientSort::Newest,
        };
        self.query.clone().sorted_by(sort)
    }

    /// Clear the country filter, or restrict to the selected client's country
    fn toggle_country(&self) -> Option<ClientQuery> {
        let country = match &self.query.country {
            Some(_) => None,
            None => Some(self.selected_client()?.country.clone()?),
        };
        Some(ClientQuery {
            country,
            ..self.query.clone()
        })
    }
}

pub enum ClientAction {
    Back,
    NewClient,
    EditClient(i64),
    DeleteClient(i64),
    /// Reload the list with a different filter or order
    Query(ClientQuery),
    /// Open the report wizard for one client
    Report(i64),
    /// Full client list report using the current filter
    ListReport(ClientQuery),
    /// Reports that include one client
    History(i64),
}

fn sort_label(sort: ClientSort) -> &'static str {
    match sort {
        ClientSort::Newest => "newest first",
        ClientSort::Name => "by name",
        ClientSort::Id => "by id",
    }
}

pub fn render_clients<B: Backend>(frame: &mut Frame<B>, area: Rect, state: &mut ClientsState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(3),
        ].as_ref())
        .split(area);

    let search_block = Block::default()
        .title(match &state.query.country {
            Some(country) => format!("Filter ({}, country {})", sort_label(state.query.sort), country),
            None => format!("Filter ({})", sort_label(state.query.sort)),
        })
        .borders(Borders::ALL);
    let search = Paragraph::new(state.search.to_spans(state.searching)).block(search_block);
    frame.render_widget(search, chunks[0]);

    let header_cells = ["ID", "Name", "Email", "Company", "City", "Country"]
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(Color::Yellow)));
    let header = Row::new(header_cells).height(1).bottom_margin(1);

    let rows = state.clients.iter().map(|client| {
        Row::new(vec![
            Cell::from(client.id.to_string()),
            Cell::from(client.name.clone()),
            Cell::from(client.email.clone()),
            Cell::from(client.company.clone().unwrap_or_default()),
            Cell::from(client.city.clone().unwrap_or_default()),
            Cell::from(client.country.clone().unwrap_or_default()),
        ])
    });

    let title = format!("Clients ({})", state.clients.len());
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
            Constraint::Percentage(22),
            Constraint::Percentage(28),
            Constraint::Percentage(18),
            Constraint::Percentage(13),
            Constraint::Percentage(13),
        ]);

    frame.render_stateful_widget(table, chunks[1], &mut state.table_state);

    let help = if state.searching {
        "Type to search name, email or company | <Enter> Apply | <Esc> Cancel"
    } else if state.selected_client().is_some() {
        "<N> New | <E> Edit | <D> Delete | <R> Report | <H> History | </> Search | <S> Sort | <C> Country | <L> List report | <Esc> Back"
    } else {
        "<N> New Client | </> Search | <Esc> Back"
    };
    render_help(frame, chunks[2], help);

    if state.show_delete_confirmation {
        render_delete_confirmation(frame, area);
    }
}

fn render_delete_confirmation<B: Backend>(frame: &mut Frame<B>, size: Rect) {
    let popup_area = centered_rect(50, 20, size);

    let popup = Paragraph::new(vec![
        Spans::from(""),
        Spans::from("Are you sure you want to delete this client?"),
        Spans::from(""),
        Spans::from("Reports that include it are kept."),
        Spans::from(""),
        Spans::from("<Y> Yes  <N> No"),
    ])
    .block(Block::default().title("Confirm Delete").borders(Borders::ALL))
    .style(Style::default().fg(Color::White).bg(Color::Black));

    frame.render_widget(Clear, popup_area);
    frame.render_widget(popup, popup_area);
}

pub fn handle_input(state: &mut ClientsState) -> Result<Option<ClientAction>> {
    if let Event::Key(key) = event::read()? {
        if state.searching {
            match key.code {
                KeyCode::Esc => {
                    state.searching = false;
                    state.search.value = state.query.search.clone().unwrap_or_default();
                }
                KeyCode::Enter => {
                    state.searching = false;
                    return Ok(Some(ClientAction::Query(state.search_query())));
                }
                code => {
                    state.search.handle_input(code);
                }
            }
            return Ok(None);
        }

        if state.show_delete_confirmation {
            match key.code {
                KeyCode::Char('y') => {
                    state.toggle_delete_confirmation();
                    if let Some(id) = state.selected_client_id() {
                        return Ok(Some(ClientAction::DeleteClient(id)));
                    }
                }
                KeyCode::Char('n') | KeyCode::Char('q') | KeyCode::Esc => {
                    state.toggle_delete_confirmation();
                }
                _ => {}
            }
            return Ok(None);
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => {
                return Ok(Some(ClientAction::Back));
            }
            KeyCode::Char('n') => {
                return Ok(Some(ClientAction::NewClient));
            }
            KeyCode::Char('e') | KeyCode::Enter => {
                if let Some(id) = state.selected_client_id() {
                    return Ok(Some(ClientAction::EditClient(id)));
                }
            }
            KeyCode::Char('d') => {
                if state.selected_client().is_some() {
                    state.toggle_delete_confirmation();
                }
            }
            KeyCode::Char('r') => {
                if let Some(id) = state.selected_client_id() {
                    return Ok(Some(ClientAction::Report(id)));
                }
            }
            KeyCode::Char('h') => {
                if let Some(id) = state.selected_client_id() {
                    return Ok(Some(ClientAction::History(id)));
                }
            }
            KeyCode::Char('c') => {
                if let Some(query) = state.toggle_country() {
                    return Ok(Some(ClientAction::Query(query)));
                }
            }
            KeyCode::Char('l') => {
                return Ok(Some(ClientAction::ListReport(state.query.clone())));
            }
            KeyCode::Char('/') => {
                state.searching = true;
            }
            KeyCode::Char('s') => {
                return Ok(Some(ClientAction::Query(state.cycle_sort())));
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
    use chrono::Utc;

    use super::*;

    fn client(id: i64, name: &str) -> Client {
        let now = Utc::now();
        Client {
            id,
            name: name.into(),
            email: format!("{}@example.com", name.to_lowercase()),
            phone: None,
            company: None,
            address: None,
            city: None,
            country: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_selection_moves_and_wraps() {
        let mut state = ClientsState::new(vec![client(1, "Ana"), client(2, "Bea")], ClientQuery::default());
        assert_eq!(state.selected_client_id(), Some(1));
        state.next();
        assert_eq!(state.selected_client_id(), Some(2));
        state.next();
        assert_eq!(state.selected_client_id(), Some(1));
        state.previous();
        assert_eq!(state.selected_client_id(), Some(2));
    }

    #[test]
    fn test_empty_list_has_no_selection() {
        let mut state = ClientsState::new(vec![], ClientQuery::default());
        state.next();
        assert_eq!(state.selected_client_id(), None);
    }

    #[test]
    fn test_search_query_keeps_sort() {
        let mut state = ClientsState::new(vec![], ClientQuery::default().sorted_by(ClientSort::Name));
        state.search.value = "  acme ".into();
        let query = state.search_query();
        assert_eq!(query.search.as_deref(), Some("acme"));
        assert_eq!(query.sort, ClientSort::Name);

        state.search.value = "   ".into();
        assert_eq!(state.search_query().search, None);
    }

    #[test]
    fn test_sort_cycles() {
        let state = ClientsState::new(vec![], ClientQuery::default());
        assert_eq!(state.cycle_sort().sort, ClientSort::Name);
    }

    #[test]
    fn test_country_filter_toggles() {
        let mut chilean = client(1, "Ana");
        chilean.country = Some("Chile".into());
        let state = ClientsState::new(
            vec![chilean, client(2, "Bea")],
            ClientQuery::search("a").sorted_by(ClientSort::Name),
        );

        let filtered = state.toggle_country().unwrap();
        assert_eq!(filtered.country.as_deref(), Some("Chile"));
        assert_eq!(filtered.search.as_deref(), Some("a"));
        assert_eq!(filtered.sort, ClientSort::Name);

        let cleared = ClientsState::new(vec![], filtered).toggle_country().unwrap();
        assert_eq!(cleared.country, None);

        let mut no_country = ClientsState::new(vec![client(1, "Ana"), client(2, "Bea")], ClientQuery::default());
        no_country.next();
        assert_eq!(no_country.toggle_country(), None);
    }
}
