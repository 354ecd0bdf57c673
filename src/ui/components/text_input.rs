use crossterm::event::KeyCode;
use tui::{
    style::{Color, Modifier, Style},
    text::{Span, Spans},
};

/// A single-line text field. Masked fields show one `*` per character.
#[derive(Debug, Clone, Default)]
pub struct TextInputState {
    pub label: &'static str,
    pub value: String,
    pub masked: bool,
}

impl TextInputState {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            ..Default::default()
        }
    }

    pub fn masked(label: &'static str) -> Self {
        Self {
            label,
            masked: true,
            ..Default::default()
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    /// Apply a key press. Returns true if the value changed.
    pub fn handle_input(&mut self, key: KeyCode) -> bool {
        match key {
            KeyCode::Char(c) => {
                self.value.push(c);
                true
            }
            KeyCode::Backspace => self.value.pop().is_some(),
            _ => false,
        }
    }

    pub fn get_display_string(&self) -> String {
        if self.masked {
            "*".repeat(self.value.chars().count())
        } else {
            self.value.clone()
        }
    }

    /// The `label: value` line, highlighted with a cursor while focused
    pub fn to_spans(&self, focused: bool) -> Spans<'static> {
        if focused {
            Spans::from(vec![
                Span::styled(format!("{}: ", self.label), Style::default().fg(Color::Yellow)),
                Span::styled(
                    format!("{}|", self.get_display_string()),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
            ])
        } else {
            Spans::from(vec![
                Span::raw(format!("{}: ", self.label)),
                Span::raw(self.get_display_string()),
            ])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typing_and_backspace() {
        let mut input = TextInputState::new("Name");
        assert!(input.handle_input(KeyCode::Char('A')));
        assert!(input.handle_input(KeyCode::Char('n')));
        assert!(input.handle_input(KeyCode::Backspace));
        assert!(!input.handle_input(KeyCode::Up));
        assert_eq!(input.value, "A");

        input.value.clear();
        assert!(!input.handle_input(KeyCode::Backspace));
    }

    #[test]
    fn test_masked_display() {
        let input = TextInputState::masked("Password").with_value("secret");
        assert_eq!(input.get_display_string(), "******");
        assert_eq!(input.value, "secret");
    }
}
