use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{prelude::*, widgets::*};
use tokio::sync::mpsc::UnboundedSender;

use super::Component;
use crate::{action::AppAction, config::Config, store::Settings};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsAction {
    Saved(Settings),
    Discarded,
}

const FIELDS: [&str; 3] = ["Server URL", "Username", "Password"];

/// Modal credentials form. Edits a copy of the settings; nothing is applied
/// or persisted until the user saves.
#[derive(Default)]
pub struct SettingsForm {
    command_tx: Option<UnboundedSender<AppAction>>,
    config: Config,
    open: bool,
    focus: usize,
    url: String,
    username: String,
    password: String,
}

impl SettingsForm {
    pub fn open_with(&mut self, settings: &Settings) {
        self.open = true;
        self.focus = 0;
        self.url = settings.url.clone();
        self.username = settings.username.clone();
        self.password = settings.password.clone();
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    fn focused_field_mut(&mut self) -> &mut String {
        match self.focus {
            0 => &mut self.url,
            1 => &mut self.username,
            _ => &mut self.password,
        }
    }

    fn collect(&self) -> Settings {
        Settings {
            url: self.url.trim().to_string(),
            username: self.username.trim().to_string(),
            password: self.password.clone(),
        }
    }
}

impl Component for SettingsForm {
    fn register_action_handler(&mut self, tx: UnboundedSender<AppAction>) -> Result<()> {
        self.command_tx = Some(tx);
        Ok(())
    }

    fn register_config_handler(&mut self, config: Config) -> Result<()> {
        self.config = config;
        Ok(())
    }

    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<AppAction>> {
        if !self.open {
            return Ok(None);
        }
        let action = match key.code {
            KeyCode::Esc => {
                self.open = false;
                Some(SettingsAction::Discarded.into())
            }
            KeyCode::Enter => {
                self.open = false;
                Some(SettingsAction::Saved(self.collect()).into())
            }
            KeyCode::Tab | KeyCode::Down => {
                self.focus = (self.focus + 1) % FIELDS.len();
                None
            }
            KeyCode::BackTab | KeyCode::Up => {
                self.focus = (self.focus + FIELDS.len() - 1) % FIELDS.len();
                None
            }
            KeyCode::Backspace => {
                self.focused_field_mut().pop();
                None
            }
            KeyCode::Char(c) => {
                self.focused_field_mut().push(c);
                None
            }
            _ => None,
        };
        Ok(action)
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect) -> Result<()> {
        if !self.open {
            return Ok(());
        }
        let area = centered_rect(area, 60, 9);
        frame.render_widget(Clear, area);
        let block = Block::bordered().title("Settings").fg(Color::Green);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let [url_area, username_area, password_area, _, hint_area] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Fill(1),
            Constraint::Length(1),
        ])
        .areas(inner);

        let values = [
            self.url.clone(),
            self.username.clone(),
            "*".repeat(self.password.chars().count()),
        ];
        for (idx, (field_area, label)) in [url_area, username_area, password_area]
            .into_iter()
            .zip(FIELDS)
            .enumerate()
        {
            let style = if idx == self.focus {
                Style::new().add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
            } else {
                Style::new()
            };
            let line = Line::from(vec![
                Span::raw(format!("{label:<11} ")),
                Span::styled(values[idx].clone(), style),
            ]);
            frame.render_widget(Paragraph::new(line), field_area);
        }

        frame.render_widget(
            Paragraph::new("Tab next field, Enter save, Esc discard").centered(),
            hint_area,
        );
        Ok(())
    }
}

fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
    let [_, vertical, _] = Layout::vertical([
        Constraint::Fill(1),
        Constraint::Length(height),
        Constraint::Fill(1),
    ])
    .areas(area);
    let [_, centered, _] = Layout::horizontal([
        Constraint::Fill(1),
        Constraint::Length(width),
        Constraint::Fill(1),
    ])
    .areas(vertical);
    centered
}

#[cfg(test)]
mod tests {
    use crossterm::event::KeyModifiers;
    use pretty_assertions::assert_eq;

    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(form: &mut SettingsForm, text: &str) {
        for c in text.chars() {
            form.handle_key_event(key(KeyCode::Char(c))).unwrap();
        }
    }

    #[test]
    fn closed_form_ignores_keys() {
        let mut form = SettingsForm::default();
        assert_eq!(form.handle_key_event(key(KeyCode::Enter)).unwrap(), None);
    }

    #[test]
    fn enter_saves_all_three_fields() {
        let mut form = SettingsForm::default();
        form.open_with(&Settings::default());
        type_text(&mut form, "http://localhost:7086/webdav");
        form.handle_key_event(key(KeyCode::Tab)).unwrap();
        type_text(&mut form, "user");
        form.handle_key_event(key(KeyCode::Tab)).unwrap();
        type_text(&mut form, "secret");
        let action = form.handle_key_event(key(KeyCode::Enter)).unwrap();
        assert_eq!(
            action,
            Some(
                SettingsAction::Saved(Settings {
                    url: "http://localhost:7086/webdav".to_string(),
                    username: "user".to_string(),
                    password: "secret".to_string(),
                })
                .into()
            )
        );
        assert!(!form.is_open());
    }

    #[test]
    fn escape_discards_edits() {
        let mut form = SettingsForm::default();
        form.open_with(&Settings {
            url: "http://old".to_string(),
            ..Default::default()
        });
        type_text(&mut form, "junk");
        let action = form.handle_key_event(key(KeyCode::Esc)).unwrap();
        assert_eq!(action, Some(SettingsAction::Discarded.into()));
        assert!(!form.is_open());
    }

    #[test]
    fn focus_wraps_both_ways() {
        let mut form = SettingsForm::default();
        form.open_with(&Settings::default());
        form.handle_key_event(key(KeyCode::BackTab)).unwrap();
        assert_eq!(form.focus, 2);
        form.handle_key_event(key(KeyCode::Tab)).unwrap();
        assert_eq!(form.focus, 0);
    }
}
