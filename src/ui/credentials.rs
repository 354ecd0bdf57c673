use anyhow::Result;
use crossterm::event::{self, Event, KeyCode};
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::Spans,
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::ui::components::text_input::TextInputState;
use crate::ui::render_help;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialsMode {
    Login,
    Register,
    /// First run: creates the administrator
    Bootstrap,
    ChangePassword,
}

impl CredentialsMode {
    fn title(&self) -> &'static str {
        match self {
            CredentialsMode::Login => "Log in",
            CredentialsMode::Register => "Register",
            CredentialsMode::Bootstrap => "Create the administrator account",
            CredentialsMode::ChangePassword => "Change password",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialsAction {
    Cancel,
    Submit { username: String, password: String },
    ChangePassword { current: String, new: String },
}

pub struct CredentialsState {
    mode: CredentialsMode,
    fields: Vec<TextInputState>,
    current: usize,
    error: Option<String>,
}

impl CredentialsState {
    pub fn new(mode: CredentialsMode) -> Self {
        let fields = match mode {
            CredentialsMode::Login => vec![
                TextInputState::new("Username"),
                TextInputState::masked("Password"),
            ],
            CredentialsMode::Register | CredentialsMode::Bootstrap => vec![
                TextInputState::new("Username"),
                TextInputState::masked("Password"),
                TextInputState::masked("Confirm password"),
            ],
            CredentialsMode::ChangePassword => vec![
                TextInputState::masked("Current password"),
                TextInputState::masked("New password"),
                TextInputState::masked("Confirm new password"),
            ],
        };

        Self {
            mode,
            fields,
            current: 0,
            error: None,
        }
    }

    pub fn mode(&self) -> CredentialsMode {
        self.mode
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    pub fn next_field(&mut self) {
        self.current = (self.current + 1) % self.fields.len();
    }

    pub fn previous_field(&mut self) {
        self.current = (self.current + self.fields.len() - 1) % self.fields.len();
    }

    fn value(&self, index: usize) -> &str {
        self.fields.get(index).map(|f| f.value.as_str()).unwrap_or("")
    }

    /// Check that the confirmation matches and build the action to run
    pub fn submission(&self) -> std::result::Result<CredentialsAction, String> {
        match self.mode {
            CredentialsMode::Login => Ok(CredentialsAction::Submit {
                username: self.value(0).to_string(),
                password: self.value(1).to_string(),
            }),
            CredentialsMode::Register | CredentialsMode::Bootstrap => {
                if self.value(1) != self.value(2) {
                    return Err("passwords do not match".to_string());
                }
                Ok(CredentialsAction::Submit {
                    username: self.value(0).to_string(),
                    password: self.value(1).to_string(),
                })
            }
            CredentialsMode::ChangePassword => {
                if self.value(1) != self.value(2) {
                    return Err("new passwords do not match".to_string());
                }
                Ok(CredentialsAction::ChangePassword {
                    current: self.value(0).to_string(),
                    new: self.value(1).to_string(),
                })
            }
        }
    }
}

pub fn render_credentials<B: Backend>(frame: &mut Frame<B>, area: Rect, state: &mut CredentialsState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Min(5),
                Constraint::Length(3),
            ]
            .as_ref(),
        )
        .split(area);

    let title = Paragraph::new(state.mode.title())
        .style(Style::default().fg(Color::Cyan))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(title, chunks[0]);

    let mut lines: Vec<Spans> = state
        .fields
        .iter()
        .enumerate()
        .map(|(i, field)| field.to_spans(i == state.current))
        .collect();
    if let Some(error) = &state.error {
        lines.push(Spans::from(""));
        lines.push(Spans::from(error.as_str()));
    }
    let form = Paragraph::new(lines).block(Block::default().borders(Borders::ALL));
    frame.render_widget(form, chunks[1]);

    let help = if state.mode == CredentialsMode::Bootstrap {
        "Tab/Down - Next field | Up - Previous field | Enter - Create | Esc - Quit"
    } else {
        "Tab/Down - Next field | Up - Previous field | Enter - Submit | Esc - Cancel"
    };
    render_help(frame, chunks[2], help);
}

pub fn handle_input(state: &mut CredentialsState) -> Result<Option<CredentialsAction>> {
    if let Event::Key(key) = event::read()? {
        match key.code {
            KeyCode::Esc => return Ok(Some(CredentialsAction::Cancel)),
            KeyCode::Tab | KeyCode::Down => state.next_field(),
            KeyCode::BackTab | KeyCode::Up => state.previous_field(),
            KeyCode::Enter => {
                if state.current + 1 < state.fields.len() {
                    state.next_field();
                } else {
                    match state.submission() {
                        Ok(action) => return Ok(Some(action)),
                        Err(message) => state.set_error(message),
                    }
                }
            }
            code => {
                let current = state.current;
                if let Some(field) = state.fields.get_mut(current) {
                    if field.handle_input(code) {
                        state.error = None;
                    }
                }
            }
        }
    }
    Ok(None)
}
