use anyhow::Result;
use crossterm::event::{self, Event, KeyCode};
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    text::Spans,
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::config::Config;
use crate::models::{Principal, User};
use crate::ui::render_help;

pub struct SettingsState {
    lines: Vec<String>,
}

impl SettingsState {
    pub fn new(config: &Config, principal: &Principal, users: &[User]) -> Self {
        let mut lines = settings_lines(config, principal);
        if !users.is_empty() {
            lines.push(String::new());
            lines.push(format!("Accounts ({}):", users.len()));
            lines.extend(users.iter().map(|user| {
                format!(
                    "  {:<20} {:<14} since {}",
                    user.username,
                    user.role().label(),
                    user.created_at.format("%Y-%m-%d")
                )
            }));
        }
        Self { lines }
    }
}

pub enum SettingsAction {
    Back,
    ChangePassword,
}

fn settings_lines(config: &Config, principal: &Principal) -> Vec<String> {
    vec![
        format!("Signed in as:      {} ({})", principal.username, principal.role.label()),
        String::new(),
        format!("Database:          {}", config.database_path().display()),
        format!("Reports directory: {}", config.reports_dir().display()),
        format!("Log file:          {}", config.log_file.display()),
        format!("Log level:         {}", config.log_level),
        String::new(),
        "Values come from CRM_* environment variables, a .env file".to_string(),
        "or the command line, and apply from the next start.".to_string(),
    ]
}

pub fn render_settings<B: Backend>(frame: &mut Frame<B>, area: Rect, state: &mut SettingsState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(3)].as_ref())
        .split(area);

    let lines: Vec<Spans> = state.lines.iter().map(|l| Spans::from(l.as_str())).collect();
    let body = Paragraph::new(lines)
        .block(Block::default().title("Configuration").borders(Borders::ALL));
    frame.render_widget(body, chunks[0]);

    render_help(frame, chunks[1], "<P> Change password | <Esc> Back");
}

pub fn handle_input(_state: &mut SettingsState) -> Result<Option<SettingsAction>> {
    if let Event::Key(key) = event::read()? {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return Ok(Some(SettingsAction::Back)),
            KeyCode::Char('p') => return Ok(Some(SettingsAction::ChangePassword)),
            _ => {}
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    #[test]
    fn test_lines_show_configuration() {
        let principal = Principal {
            user_id: 1,
            username: "ana".into(),
            role: Role::Standard,
        };
        let config = Config::default();

        let lines = settings_lines(&config, &principal);
        assert!(lines[0].contains("ana (standard)"));
        assert!(lines.iter().any(|l| l.ends_with("data/clients.db")));
    }

    #[test]
    fn test_account_list_for_admins() {
        let principal = Principal {
            user_id: 1,
            username: "root".into(),
            role: Role::Admin,
        };
        let user = User {
            id: 1,
            username: "root".into(),
            password_hash: String::new(),
            is_admin: true,
            created_at: chrono::Utc::now(),
        };

        let state = SettingsState::new(&Config::default(), &principal, &[user]);
        assert!(state.lines.iter().any(|l| l == "Accounts (1):"));
        assert!(state.lines.iter().any(|l| l.contains("administrator")));
    }
}
