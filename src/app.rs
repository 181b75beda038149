use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::prelude::Rect;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, info};

use crate::{
    action::{AppAction, GlobalAction},
    cli::Cli,
    components::{
        Component,
        browser::{Browser, BrowserAction},
        settings::{SettingsAction, SettingsForm},
    },
    config::{self, Config},
    dav::DavClient,
    store::{FileStore, KvStore, Settings},
    terminal::{Terminal, events::TermEvent},
};

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Browser,
    Settings,
}

pub struct App {
    config: Config,
    tick_rate: f64,
    frame_rate: f64,
    store: Box<dyn KvStore>,
    settings: Settings,
    browser: Browser,
    settings_form: SettingsForm,
    mode: Mode,
    should_quit: bool,
    should_suspend: bool,
    action_tx: UnboundedSender<AppAction>,
    action_rx: UnboundedReceiver<AppAction>,
}

impl App {
    pub fn new(cli: Cli, config: Config) -> Result<Self> {
        let (action_tx, action_rx) = mpsc::unbounded_channel();
        let store = FileStore::open(config::get_data_dir())?;
        let mut settings = Settings::load(&store)?;
        // One-shot overrides for this run, never written back.
        if let Some(url) = cli.url {
            settings.url = url;
        }
        if let Some(username) = cli.username {
            settings.username = username;
        }
        if let Some(password) = cli.password {
            settings.password = password;
        }

        let client = match DavClient::connect(&settings) {
            Ok(client) => Some(client),
            Err(err) => {
                info!("starting without a client: {err}");
                None
            }
        };

        Ok(Self {
            tick_rate: cli.tick_rate.unwrap_or(config.tick_rate),
            frame_rate: cli.frame_rate.unwrap_or(config.frame_rate),
            config,
            store: Box::new(store),
            settings,
            browser: Browser::new(cli.path, client),
            settings_form: SettingsForm::default(),
            mode: Mode::default(),
            should_quit: false,
            should_suspend: false,
            action_tx,
            action_rx,
        })
    }

    pub async fn run(&mut self) -> Result<()> {
        let mut terminal = Terminal::new(self.tick_rate, self.frame_rate)?;
        terminal.enter()?;

        let action_tx = self.action_tx.clone();
        let config = self.config.clone();
        for component in [&mut self.browser as &mut dyn Component, &mut self.settings_form] {
            component.register_action_handler(action_tx.clone())?;
            component.register_config_handler(config.clone())?;
        }

        // First listing for the start path.
        self.action_tx.send(BrowserAction::Refresh.into())?;

        loop {
            self.handle_events(&mut terminal).await?;
            self.handle_actions(&mut terminal)?;
            if self.should_suspend {
                terminal.suspend()?;
                self.should_suspend = false;
                self.action_tx.send(GlobalAction::ClearScreen.into())?;
                terminal.resume()?;
            } else if self.should_quit {
                terminal.stop()?;
                break;
            }
        }
        terminal.exit()?;
        Ok(())
    }

    async fn handle_events(&mut self, terminal: &mut Terminal) -> Result<()> {
        let Some(event) = terminal.next_event().await else {
            return Ok(());
        };
        match event {
            TermEvent::Tick => self.action_tx.send(GlobalAction::Tick.into())?,
            TermEvent::Render => self.action_tx.send(GlobalAction::Render.into())?,
            TermEvent::Resize(x, y) => self.action_tx.send(GlobalAction::Resize(x, y).into())?,
            TermEvent::Key(key) => self.handle_key_event(key)?,
            _ => {}
        }
        Ok(())
    }

    fn handle_key_event(&mut self, key: KeyEvent) -> Result<()> {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            match key.code {
                KeyCode::Char('c') => {
                    self.action_tx.send(GlobalAction::Quit.into())?;
                    return Ok(());
                }
                KeyCode::Char('z') => {
                    self.action_tx.send(GlobalAction::Suspend.into())?;
                    return Ok(());
                }
                _ => {}
            }
        }
        // Only the active view sees key input.
        let component: &mut dyn Component = match self.mode {
            Mode::Browser => &mut self.browser,
            Mode::Settings => &mut self.settings_form,
        };
        if let Some(action) = component.handle_key_event(key)? {
            self.action_tx.send(action)?;
        }
        Ok(())
    }

    fn handle_actions(&mut self, terminal: &mut Terminal) -> Result<()> {
        while let Ok(action) = self.action_rx.try_recv() {
            if !matches!(
                action,
                AppAction::Global(GlobalAction::Tick | GlobalAction::Render)
            ) {
                debug!("{action:?}");
            }
            match &action {
                AppAction::Global(global) => match global {
                    GlobalAction::Tick => {}
                    GlobalAction::Quit => self.should_quit = true,
                    GlobalAction::Suspend => self.should_suspend = true,
                    GlobalAction::Resume => self.should_suspend = false,
                    GlobalAction::ClearScreen => terminal.clear()?,
                    GlobalAction::Resize(w, h) => self.handle_resize(terminal, *w, *h)?,
                    GlobalAction::Render => self.render(terminal)?,
                    GlobalAction::Error(msg) => error!("{msg}"),
                    GlobalAction::Help => {}
                },
                AppAction::Browser(BrowserAction::OpenSettings) => self.open_settings(),
                AppAction::Browser(BrowserAction::SaveFile { basename, bytes }) => {
                    self.save_download(basename, bytes)?;
                }
                AppAction::Settings(SettingsAction::Saved(settings)) => {
                    self.mode = Mode::Browser;
                    self.apply_settings(settings.clone())?;
                }
                AppAction::Settings(SettingsAction::Discarded) => self.mode = Mode::Browser,
                _ => {}
            }
            for component in [&mut self.browser as &mut dyn Component, &mut self.settings_form] {
                if let Some(follow_up) = component.update(action.clone())? {
                    self.action_tx.send(follow_up)?;
                }
            }
        }
        Ok(())
    }

    fn open_settings(&mut self) {
        self.mode = Mode::Settings;
        self.settings_form.open_with(&self.settings);
    }

    /// Persists the new settings and swaps the active client. The browser
    /// re-lists its current path as soon as the client changes.
    fn apply_settings(&mut self, settings: Settings) -> Result<()> {
        settings.save(self.store.as_ref())?;
        self.settings = settings;
        let client = match DavClient::connect(&self.settings) {
            Ok(client) => Some(client),
            Err(err) => {
                self.action_tx
                    .send(GlobalAction::Error(err.to_string()).into())?;
                None
            }
        };
        self.action_tx
            .send(BrowserAction::ClientChanged(client).into())?;
        Ok(())
    }

    fn save_download(&mut self, basename: &str, bytes: &[u8]) -> Result<()> {
        let dir = self.config.download_dir();
        std::fs::create_dir_all(&dir)?;
        let path = dir.join(basename);
        std::fs::write(&path, bytes)?;
        info!(path = %path.display(), "saved download");
        self.action_tx.send(BrowserAction::Saved(path).into())?;
        Ok(())
    }

    fn handle_resize(&mut self, terminal: &mut Terminal, w: u16, h: u16) -> Result<()> {
        terminal.resize(Rect::new(0, 0, w, h))?;
        self.render(terminal)?;
        Ok(())
    }

    fn render(&mut self, terminal: &mut Terminal) -> Result<()> {
        terminal.draw(|frame| {
            let area = frame.area();
            if let Err(err) = self.browser.draw(frame, area) {
                let _ = self
                    .action_tx
                    .send(GlobalAction::Error(format!("failed to draw: {err:?}")).into());
            }
            // The settings form draws on top of the browser when open.
            if let Err(err) = self.settings_form.draw(frame, area) {
                let _ = self
                    .action_tx
                    .send(GlobalAction::Error(format!("failed to draw: {err:?}")).into());
            }
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn cli() -> Cli {
        Cli {
            tick_rate: None,
            frame_rate: None,
            path: "/".to_string(),
            url: None,
            username: None,
            password: None,
        }
    }

    #[tokio::test]
    async fn saving_settings_builds_a_client_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        unsafe { std::env::set_var("DAVTUI_DATA", dir.path()) };
        let mut app = App::new(cli(), Config::default()).unwrap();

        let settings = Settings {
            url: "http://127.0.0.1:1/dav".to_string(),
            username: "user".to_string(),
            password: "secret".to_string(),
        };
        app.apply_settings(settings.clone()).unwrap();

        let action = app.action_rx.recv().await.unwrap();
        assert!(matches!(
            action,
            AppAction::Browser(BrowserAction::ClientChanged(Some(_)))
        ));
        assert_eq!(Settings::load(app.store.as_ref()).unwrap(), settings);

        app.open_settings();
        assert_eq!(app.mode, Mode::Settings);
        assert!(app.settings_form.is_open());
    }
}
