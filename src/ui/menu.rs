use anyhow::Result;
use crossterm::event::{self, Event, KeyCode};
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use crate::config::Config;
use crate::db::Database;
use crate::error::Result as CrmResult;
use crate::models::Principal;
use crate::ui::{centered_rect, next_index, previous_index, render_help};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MainAction {
    Login,
    Register,
    About,
    Help,
    SystemInfo,
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardAction {
    Clients,
    Reports,
    Statistics,
    Export,
    Configuration,
    Logout,
    Exit,
}

struct MenuItem<A> {
    key: char,
    label: &'static str,
    action: A,
}

/// A numbered menu. Items can be picked with their digit or with Enter.
pub struct MenuState<A> {
    title: String,
    items: Vec<MenuItem<A>>,
    list_state: ListState,
    summary: Vec<String>,
    popup: Option<(String, Vec<String>)>,
}

impl<A: Copy> MenuState<A> {
    fn new(title: impl Into<String>, items: Vec<(char, &'static str, A)>) -> Self {
        let mut list_state = ListState::default();
        list_state.select(Some(0));

        Self {
            title: title.into(),
            items: items
                .into_iter()
                .map(|(key, label, action)| MenuItem { key, label, action })
                .collect(),
            list_state,
            summary: Vec::new(),
            popup: None,
        }
    }

    pub fn next(&mut self) {
        self.list_state.select(next_index(self.list_state.selected(), self.items.len()));
    }

    pub fn previous(&mut self) {
        self.list_state.select(previous_index(self.list_state.selected(), self.items.len()));
    }

    pub fn set_summary(&mut self, lines: Vec<String>) {
        self.summary = lines;
    }

    pub fn show_popup(&mut self, title: impl Into<String>, lines: Vec<String>) {
        self.popup = Some((title.into(), lines));
    }

    pub fn close_popup(&mut self) {
        self.popup = None;
    }

    pub fn has_popup(&self) -> bool {
        self.popup.is_some()
    }

    /// The action bound to a digit key, if any
    pub fn action_for_key(&self, key: char) -> Option<A> {
        self.items.iter().find(|item| item.key == key).map(|item| item.action)
    }

    pub fn selected_action(&self) -> Option<A> {
        self.list_state
            .selected()
            .and_then(|i| self.items.get(i))
            .map(|item| item.action)
    }
}

impl MenuState<MainAction> {
    pub fn main_menu() -> Self {
        Self::new(
            "Client Reports",
            vec![
                ('1', "Log in", MainAction::Login),
                ('2', "Register", MainAction::Register),
                ('3', "About", MainAction::About),
                ('4', "Help", MainAction::Help),
                ('5', "System information", MainAction::SystemInfo),
                ('0', "Exit", MainAction::Exit),
            ],
        )
    }
}

impl MenuState<DashboardAction> {
    pub fn dashboard(principal: &Principal) -> Self {
        Self::new(
            format!("Dashboard - {} ({})", principal.username, principal.role.label()),
            vec![
                ('1', "Clients", DashboardAction::Clients),
                ('2', "Reports", DashboardAction::Reports),
                ('3', "Statistics", DashboardAction::Statistics),
                ('4', "Export", DashboardAction::Export),
                ('5', "Configuration", DashboardAction::Configuration),
                ('6', "Log out", DashboardAction::Logout),
                ('0', "Exit", DashboardAction::Exit),
            ],
        )
    }
}

pub fn about_lines() -> Vec<String> {
    vec![
        format!("Client Reports v{}", env!("CARGO_PKG_VERSION")),
        String::new(),
        "Keeps a register of clients and produces PDF, Excel and CSV".to_string(),
        "reports from it. Every report stores a snapshot of its data,".to_string(),
        "so it can be exported again later exactly as it was generated.".to_string(),
    ]
}

pub fn help_lines() -> Vec<String> {
    vec![
        "Use the digit keys or Up/Down and Enter to pick a menu entry.".to_string(),
        "Esc goes back from any screen.".to_string(),
        String::new(),
        "Clients:  N new, E edit, D delete, / search, C country, H history, R report".to_string(),
        "Reports:  G generate, P/X/C export as PDF/Excel/CSV, F filter, A all, D delete".to_string(),
        "Forms:    Tab/Down next field, Up previous field, Enter submit".to_string(),
        String::new(),
        "The first account created on a new database is the administrator.".to_string(),
    ]
}

/// Paths in use and record counts
pub async fn system_info_lines(db: &Database, config: &Config) -> CrmResult<Vec<String>> {
    let users = db.count_users().await?;
    let clients = db.client_stats().await?;
    let reports = db.report_stats().await?;

    Ok(vec![
        format!("Version:           {}", env!("CARGO_PKG_VERSION")),
        format!("Database:          {}", db.path().display()),
        format!("Reports directory: {}", config.reports_dir().display()),
        format!("Log file:          {}", config.log_file.display()),
        format!("Log level:         {}", config.log_level),
        String::new(),
        format!("Users:   {}", users),
        format!("Clients: {}", clients.total_clients),
        format!("Reports: {}", reports.total_reports),
    ])
}

pub fn render_menu<B: Backend, A: Copy>(frame: &mut Frame<B>, area: Rect, state: &mut MenuState<A>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(3)].as_ref())
        .split(area);

    let body = if state.summary.is_empty() {
        vec![chunks[0]]
    } else {
        Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)].as_ref())
            .split(chunks[0])
    };

    let items: Vec<ListItem> = state
        .items
        .iter()
        .map(|item| {
            ListItem::new(Spans::from(vec![
                Span::styled(format!("{}  ", item.key), Style::default().fg(Color::Yellow)),
                Span::raw(item.label),
            ]))
        })
        .collect();

    let menu = List::new(items)
        .block(Block::default().title(state.title.clone()).borders(Borders::ALL))
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        );
    frame.render_stateful_widget(menu, body[0], &mut state.list_state);

    if let Some(summary_area) = body.get(1) {
        let lines: Vec<Spans> = state.summary.iter().map(|l| Spans::from(l.as_str())).collect();
        let summary = Paragraph::new(lines)
            .block(Block::default().title("Overview").borders(Borders::ALL));
        frame.render_widget(summary, *summary_area);
    }

    render_help(frame, chunks[1], "<0-9> Choose | <Up/Down> Move | <Enter> Select");

    if let Some((title, lines)) = &state.popup {
        let popup_area = centered_rect(70, 60, area);
        let mut text: Vec<Spans> = lines.iter().map(|l| Spans::from(l.as_str())).collect();
        text.push(Spans::from(""));
        text.push(Spans::from("<Esc> Close"));

        let popup = Paragraph::new(text)
            .wrap(Wrap { trim: false })
            .block(Block::default().title(title.clone()).borders(Borders::ALL))
            .style(Style::default().fg(Color::White).bg(Color::Black));
        frame.render_widget(Clear, popup_area);
        frame.render_widget(popup, popup_area);
    }
}

pub fn handle_input<A: Copy>(state: &mut MenuState<A>) -> Result<Option<A>> {
    if let Event::Key(key) = event::read()? {
        if state.has_popup() {
            if matches!(key.code, KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q')) {
                state.close_popup();
            }
            return Ok(None);
        }

        match key.code {
            KeyCode::Char(c) => return Ok(state.action_for_key(c)),
            KeyCode::Enter => return Ok(state.selected_action()),
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
    use crate::models::Role;

    #[test]
    fn test_main_menu_keys() {
        let menu = MenuState::main_menu();
        assert_eq!(menu.action_for_key('1'), Some(MainAction::Login));
        assert_eq!(menu.action_for_key('5'), Some(MainAction::SystemInfo));
        assert_eq!(menu.action_for_key('0'), Some(MainAction::Exit));
        assert_eq!(menu.action_for_key('9'), None);
    }

    #[test]
    fn test_dashboard_navigation() {
        let principal = Principal {
            user_id: 1,
            username: "admin".into(),
            role: Role::Admin,
        };
        let mut menu = MenuState::dashboard(&principal);
        assert_eq!(menu.selected_action(), Some(DashboardAction::Clients));

        menu.previous();
        assert_eq!(menu.selected_action(), Some(DashboardAction::Exit));
        menu.next();
        menu.next();
        assert_eq!(menu.selected_action(), Some(DashboardAction::Reports));
        assert_eq!(menu.action_for_key('6'), Some(DashboardAction::Logout));
    }

    #[test]
    fn test_popup_toggles() {
        let mut menu = MenuState::main_menu();
        menu.show_popup("About", about_lines());
        assert!(menu.has_popup());
        menu.close_popup();
        assert!(!menu.has_popup());
    }

    #[tokio::test]
    async fn test_system_info_counts_records() {
        let (_dir, db) = crate::db::test_support::open_temp_db().await;
        let lines = system_info_lines(&db, &Config::default()).await.unwrap();
        assert!(lines.iter().any(|l| l == "Clients: 0"));
        assert!(lines.iter().any(|l| l == "Users:   0"));
    }
}
