use anyhow::Result;
use crossterm::event::{self, Event, KeyCode};
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

use crate::models::{Client, ClientDraft};

pub enum ClientWizardAction {
    Cancel,
    /// Client id when editing, `None` when creating
    Save(Option<i64>, ClientDraft),
}

#[derive(Clone, PartialEq, Copy, Debug)]
pub enum ClientField {
    Name,
    Email,
    Phone,
    Company,
    Address,
    City,
    Country,
}

impl ClientField {
    const ALL: [ClientField; 7] = [
        ClientField::Name,
        ClientField::Email,
        ClientField::Phone,
        ClientField::Company,
        ClientField::Address,
        ClientField::City,
        ClientField::Country,
    ];

    fn label(&self) -> &'static str {
        match self {
            ClientField::Name => "Name",
            ClientField::Email => "Email",
            ClientField::Phone => "Phone",
            ClientField::Company => "Company",
            ClientField::Address => "Address",
            ClientField::City => "City",
            ClientField::Country => "Country",
        }
    }
}

pub struct ClientWizardState {
    pub client_id: Option<i64>,
    pub draft: ClientDraft,
    pub current_field: ClientField,
    pub editing: bool,
    pub error: Option<String>,
}

impl ClientWizardState {
    pub fn new() -> Self {
        Self {
            client_id: None,
            draft: ClientDraft::default(),
            current_field: ClientField::Name,
            editing: false,
            error: None,
        }
    }

    pub fn from_existing(client: &Client) -> Self {
        Self {
            client_id: Some(client.id),
            draft: ClientDraft::from(client),
            current_field: ClientField::Name,
            editing: false,
            error: None,
        }
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    pub fn toggle_editing(&mut self) {
        self.editing = !self.editing;
    }

    pub fn next_field(&mut self) {
        let index = self.current_field as usize;
        self.current_field = ClientField::ALL[(index + 1) % ClientField::ALL.len()];
    }

    pub fn previous_field(&mut self) {
        let index = self.current_field as usize;
        self.current_field =
            ClientField::ALL[(index + ClientField::ALL.len() - 1) % ClientField::ALL.len()];
    }

    fn field_value(&self, field: ClientField) -> &str {
        let value = match field {
            ClientField::Name => return &self.draft.name,
            ClientField::Email => return &self.draft.email,
            ClientField::Phone => &self.draft.phone,
            ClientField::Company => &self.draft.company,
            ClientField::Address => &self.draft.address,
            ClientField::City => &self.draft.city,
            ClientField::Country => &self.draft.country,
        };
        value.as_deref().unwrap_or("")
    }

    pub fn edit_current_field(&mut self, key: KeyCode) {
        if !self.editing {
            return;
        }

        let field_value = match self.current_field {
            ClientField::Name => &mut self.draft.name,
            ClientField::Email => &mut self.draft.email,
            ClientField::Phone => self.draft.phone.get_or_insert_with(String::new),
            ClientField::Company => self.draft.company.get_or_insert_with(String::new),
            ClientField::Address => self.draft.address.get_or_insert_with(String::new),
            ClientField::City => self.draft.city.get_or_insert_with(String::new),
            ClientField::Country => self.draft.country.get_or_insert_with(String::new),
        };

        match key {
            KeyCode::Char(c) => {
                field_value.push(c);
            }
            KeyCode::Backspace => {
                field_value.pop();
            }
            _ => {}
        }
        self.error = None;
    }

    /// The normalized draft, or the validation message to show
    pub fn validated(&self) -> std::result::Result<ClientDraft, String> {
        let draft = self.draft.clone().normalized();
        draft.validate().map_err(|e| e.to_string())?;
        Ok(draft)
    }
}

impl Default for ClientWizardState {
    fn default() -> Self {
        Self::new()
    }
}

pub fn render_client_wizard<B: Backend>(f: &mut Frame<B>, area: Rect, state: &mut ClientWizardState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Min(10),
                Constraint::Length(3),
            ]
            .as_ref(),
        )
        .split(area);

    // Title with appropriate text based on whether we're editing or creating
    let title_text = if state.client_id.is_none() {
        "New Client"
    } else {
        "Edit Client"
    };

    let title = Paragraph::new(title_text)
        .style(Style::default().fg(Color::Cyan))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(title, chunks[0]);

    render_form(f, state, chunks[1]);

    let help_text = match (&state.error, state.editing) {
        (_, true) => "Enter - Save field | Esc - Stop editing".to_string(),
        (Some(error), false) => format!("{} | S - Save | Esc - Cancel", error),
        (None, false) => {
            "Enter - Edit field | Up/Down - Navigate fields | S - Save client | Esc - Cancel".to_string()
        }
    };
    let help_style = if state.error.is_some() && !state.editing {
        Style::default().fg(Color::Red)
    } else {
        Style::default().fg(Color::Gray)
    };

    let help = Paragraph::new(help_text)
        .style(help_style)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(help, chunks[2]);
}

fn render_form<B: Backend>(f: &mut Frame<B>, state: &ClientWizardState, area: Rect) {
    let items: Vec<ListItem> = ClientField::ALL
        .iter()
        .map(|field| {
            let value = state.field_value(*field);
            let required = matches!(field, ClientField::Name | ClientField::Email);
            let label = if required {
                format!("{}*: ", field.label())
            } else {
                format!("{}: ", field.label())
            };

            let content = if *field == state.current_field && state.editing {
                Spans::from(vec![
                    Span::styled(label, Style::default().fg(Color::Yellow)),
                    Span::styled(
                        format!("{}|", value),
                        Style::default().add_modifier(Modifier::BOLD),
                    ),
                ])
            } else {
                let style = if *field == state.current_field {
                    Style::default().fg(Color::Yellow)
                } else {
                    Style::default()
                };

                Spans::from(vec![
                    Span::styled(label, style),
                    Span::raw(value.to_string()),
                ])
            };

            ListItem::new(content)
        })
        .collect();

    let form_list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title("Client Details"));

    f.render_widget(form_list, area);
}

pub fn handle_input(state: &mut ClientWizardState) -> Result<Option<ClientWizardAction>> {
    if let Event::Key(key) = event::read()? {
        match key.code {
            KeyCode::Esc => {
                if state.editing {
                    state.toggle_editing();
                } else {
                    return Ok(Some(ClientWizardAction::Cancel));
                }
            }
            KeyCode::Enter => {
                state.toggle_editing();
            }
            KeyCode::Up if !state.editing => {
                state.previous_field();
            }
            KeyCode::Down | KeyCode::Tab if !state.editing => {
                state.next_field();
            }
            KeyCode::Char('s') if !state.editing => match state.validated() {
                Ok(draft) => return Ok(Some(ClientWizardAction::Save(state.client_id, draft))),
                Err(message) => state.set_error(message),
            },
            _ if state.editing => {
                state.edit_current_field(key.code);
            }
            _ => {}
        }
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn type_text(state: &mut ClientWizardState, text: &str) {
        state.toggle_editing();
        for c in text.chars() {
            state.edit_current_field(KeyCode::Char(c));
        }
        state.toggle_editing();
    }

    #[test]
    fn test_fields_wrap() {
        let mut state = ClientWizardState::new();
        state.previous_field();
        assert_eq!(state.current_field, ClientField::Country);
        state.next_field();
        assert_eq!(state.current_field, ClientField::Name);
    }

    #[test]
    fn test_editing_builds_draft() {
        let mut state = ClientWizardState::new();
        type_text(&mut state, "Ana ");
        state.next_field();
        type_text(&mut state, "ana@example.com");
        state.next_field();
        state.next_field();
        type_text(&mut state, "Acme");

        let draft = state.validated().unwrap();
        assert_eq!(draft.name, "Ana");
        assert_eq!(draft.email, "ana@example.com");
        assert_eq!(draft.company.as_deref(), Some("Acme"));
        assert_eq!(draft.phone, None);
    }

    #[test]
    fn test_invalid_email_is_reported() {
        let mut state = ClientWizardState::new();
        type_text(&mut state, "Ana");
        state.next_field();
        type_text(&mut state, "not-an-email");

        assert!(state.validated().is_err());
    }

    #[test]
    fn test_typing_ignored_when_not_editing() {
        let mut state = ClientWizardState::new();
        state.edit_current_field(KeyCode::Char('x'));
        assert!(state.draft.name.is_empty());
    }
}
