use std::path::PathBuf;

use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{prelude::*, style::palette::tailwind::SLATE, widgets::*};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, warn};

use super::Component;
use crate::{
    action::{AppAction, GlobalAction},
    config::Config,
    dav::{DavClient, DavError},
    entry::{self, DirEntry},
};

const SELECTED_STYLE: Style = Style::new().bg(SLATE.c800).add_modifier(Modifier::BOLD);

#[derive(Debug, Clone, PartialEq)]
pub enum BrowserAction {
    Refresh,
    NavigateTo(String),
    NavigateUp,
    OpenSettings,
    /// The active client configuration changed, `None` when the settings no
    /// longer yield a usable client.
    ClientChanged(Option<DavClient>),
    ListingLoaded(Vec<DirEntry>),
    ListingFailed(DavError),
    DownloadProgress {
        loaded: u64,
        total: u64,
    },
    DownloadFinished {
        basename: String,
        bytes: Vec<u8>,
    },
    DownloadFailed(String),
    /// Handed to the app layer, which owns the download directory.
    SaveFile {
        basename: String,
        bytes: Vec<u8>,
    },
    Saved(PathBuf),
}

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
enum InputMode {
    #[default]
    Normal,
    EditPath,
}

#[derive(Debug, Clone)]
struct Download {
    basename: String,
    progress: f64,
}

/// Listing view over the remote share: a committed path, the entries last
/// returned for it, and an uncommitted path edit buffer.
#[derive(Default)]
pub struct Browser {
    command_tx: Option<UnboundedSender<AppAction>>,
    config: Config,
    client: Option<DavClient>,
    path: String,
    path_input: String,
    input_mode: InputMode,
    entries: Vec<DirEntry>,
    state: ListState,
    loading: bool,
    error: Option<String>,
    status: Option<String>,
    download: Option<Download>,
}

impl Browser {
    pub fn new(path: String, client: Option<DavClient>) -> Self {
        Self {
            path: path.clone(),
            path_input: path,
            client,
            ..Default::default()
        }
    }

    fn selected_entry(&self) -> Option<&DirEntry> {
        self.state.selected().and_then(|i| self.entries.get(i))
    }

    /// Commits a new path. Committing the current path again is a no-op;
    /// an explicit refresh goes through [`Self::refresh`] instead.
    fn commit_path(&mut self, path: String) {
        let path = if path.is_empty() {
            "/".to_string()
        } else {
            path
        };
        if self.path != path {
            self.path = path;
            self.path_input = self.path.clone();
            self.refresh();
        }
    }

    /// Issues one listing request for the committed path. Entries are
    /// cleared up front and a loading indicator shown until a response
    /// lands. In-flight requests are never cancelled; whichever response
    /// resolves last wins.
    fn refresh(&mut self) {
        self.entries.clear();
        self.state.select(None);
        self.error = None;
        self.status = None;
        let Some(client) = self.client.clone() else {
            self.loading = false;
            self.error = Some("no server configured, press s to add one".to_string());
            return;
        };
        self.loading = true;
        let Some(tx) = self.command_tx.clone() else {
            return;
        };
        let path = self.path.clone();
        tokio::spawn(async move {
            let action = match client.list_dir(&path).await {
                Ok(entries) => BrowserAction::ListingLoaded(entries),
                Err(err) => BrowserAction::ListingFailed(err),
            };
            let _ = tx.send(action.into());
        });
    }

    fn open_selected(&mut self) -> Option<AppAction> {
        let entry = self.selected_entry().cloned()?;
        if entry.is_dir() {
            Some(BrowserAction::NavigateTo(entry.filename).into())
        } else {
            self.start_download(&entry);
            None
        }
    }

    fn start_download(&mut self, entry: &DirEntry) {
        if self.download.is_some() {
            self.status = Some("a download is already running".to_string());
            return;
        }
        let Some(client) = self.client.clone() else {
            return;
        };
        let Some(tx) = self.command_tx.clone() else {
            return;
        };
        self.download = Some(Download {
            basename: entry.basename.clone(),
            progress: 0.0,
        });
        let filename = entry.filename.clone();
        let basename = entry.basename.clone();
        let size_hint = entry.size;
        info!(%filename, "starting download");
        tokio::spawn(async move {
            let progress_tx = tx.clone();
            let result = client
                .fetch_file(&filename, size_hint, move |loaded, total| {
                    let _ = progress_tx.send(BrowserAction::DownloadProgress { loaded, total }.into());
                })
                .await;
            let action = match result {
                Ok(bytes) => BrowserAction::DownloadFinished { basename, bytes },
                Err(err) => BrowserAction::DownloadFailed(err.to_string()),
            };
            let _ = tx.send(action.into());
        });
    }

    fn apply_listing_failure(&mut self, err: DavError) {
        warn!("listing failed: {err}");
        if err.is_not_found() {
            if self.path != "/" {
                self.path = "/".to_string();
                self.path_input = self.path.clone();
                self.refresh();
            } else {
                self.loading = false;
            }
            self.error = Some("path not found, returned to root; check the server settings".to_string());
        } else {
            self.loading = false;
            self.error = Some(err.to_string());
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent) -> Option<AppAction> {
        match key.code {
            KeyCode::Char('q') => return Some(GlobalAction::Quit.into()),
            KeyCode::Char('j') | KeyCode::Down => self.state.select_next(),
            KeyCode::Char('k') | KeyCode::Up => self.state.select_previous(),
            KeyCode::Char('g') => self.state.select_first(),
            KeyCode::Char('G') => self.state.select_last(),
            KeyCode::Char('l') | KeyCode::Right | KeyCode::Enter => return self.open_selected(),
            KeyCode::Char('h') | KeyCode::Left | KeyCode::Backspace => {
                return Some(BrowserAction::NavigateUp.into());
            }
            KeyCode::Char('r') => return Some(BrowserAction::Refresh.into()),
            KeyCode::Char('e') | KeyCode::Char('/') => self.input_mode = InputMode::EditPath,
            KeyCode::Char('s') => return Some(BrowserAction::OpenSettings.into()),
            _ => {}
        }
        None
    }

    fn handle_edit_key(&mut self, key: KeyEvent) -> Option<AppAction> {
        match key.code {
            KeyCode::Enter => {
                self.input_mode = InputMode::Normal;
                return Some(BrowserAction::NavigateTo(self.path_input.clone()).into());
            }
            KeyCode::Esc => {
                self.input_mode = InputMode::Normal;
                self.path_input = self.path.clone();
            }
            KeyCode::Backspace => {
                self.path_input.pop();
            }
            KeyCode::Char(c) => self.path_input.push(c),
            _ => {}
        }
        None
    }

    fn render_header(&self, frame: &mut Frame, area: Rect) {
        let line = match self.input_mode {
            InputMode::EditPath => Line::from(vec![
                Span::raw("path: "),
                Span::styled(
                    self.path_input.clone(),
                    Style::new().add_modifier(Modifier::UNDERLINED),
                ),
                Span::styled("\u{2590}", Style::new().add_modifier(Modifier::SLOW_BLINK)),
            ]),
            InputMode::Normal => {
                let mut spans = vec![Span::styled(self.path.clone(), Style::new().bold())];
                if self.loading {
                    spans.push(Span::raw("  (loading)"));
                }
                Line::from(spans)
            }
        };
        frame.render_widget(Paragraph::new(line), area);
    }

    fn render_list(&mut self, frame: &mut Frame, area: Rect) {
        let block = Block::bordered().fg(Color::Green).title("Remote files");

        let width = area.width;
        let items: Vec<ListItem> = self
            .entries
            .iter()
            .map(|entry| ListItem::new(render_row(entry, width)))
            .collect();

        let list = List::new(items)
            .block(block)
            .highlight_style(SELECTED_STYLE)
            .highlight_symbol(">")
            .highlight_spacing(HighlightSpacing::Always);

        frame.render_stateful_widget(list, area, &mut self.state);
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        // The bar is only on screen while a download is in flight and
        // incomplete.
        if let Some(download) = &self.download
            && download.progress < 1.0
        {
            let gauge = Gauge::default()
                .ratio(download.progress.clamp(0.0, 1.0))
                .label(format!(
                    "downloading {} {:.0}%",
                    download.basename,
                    download.progress * 100.0
                ));
            frame.render_widget(gauge, area);
            return;
        }
        let line = if let Some(error) = &self.error {
            Line::styled(error.clone(), Style::new().fg(Color::Red))
        } else if let Some(status) = &self.status {
            Line::styled(status.clone(), Style::new().fg(Color::Green))
        } else if self.loading {
            Line::raw("loading...")
        } else {
            Line::raw(format!("{} entries", self.entries.len()))
        };
        frame.render_widget(Paragraph::new(line), area);
    }
}

impl Component for Browser {
    fn register_action_handler(&mut self, tx: UnboundedSender<AppAction>) -> Result<()> {
        self.command_tx = Some(tx);
        Ok(())
    }

    fn register_config_handler(&mut self, config: Config) -> Result<()> {
        self.config = config;
        Ok(())
    }

    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<AppAction>> {
        let action = match self.input_mode {
            InputMode::Normal => self.handle_normal_key(key),
            InputMode::EditPath => self.handle_edit_key(key),
        };
        Ok(action)
    }

    fn update(&mut self, action: AppAction) -> Result<Option<AppAction>> {
        let AppAction::Browser(action) = action else {
            return Ok(None);
        };
        match action {
            BrowserAction::Refresh => self.refresh(),
            BrowserAction::NavigateTo(path) => self.commit_path(path),
            BrowserAction::NavigateUp => self.commit_path(entry::dirname(&self.path)),
            BrowserAction::ClientChanged(client) => {
                self.client = client;
                self.refresh();
            }
            BrowserAction::ListingLoaded(mut entries) => {
                entry::sort_entries(&mut entries);
                self.loading = false;
                self.error = None;
                self.state
                    .select(if entries.is_empty() { None } else { Some(0) });
                self.entries = entries;
            }
            BrowserAction::ListingFailed(err) => self.apply_listing_failure(err),
            BrowserAction::DownloadProgress { loaded, total } => {
                if let Some(download) = &mut self.download {
                    download.progress = if total == 0 {
                        0.0
                    } else {
                        loaded as f64 / total as f64
                    };
                }
            }
            BrowserAction::DownloadFinished { basename, bytes } => {
                self.download = None;
                return Ok(Some(BrowserAction::SaveFile { basename, bytes }.into()));
            }
            BrowserAction::DownloadFailed(msg) => {
                self.download = None;
                self.error = Some(format!("download failed: {msg}"));
            }
            BrowserAction::Saved(path) => {
                self.status = Some(format!("saved to {}", path.display()));
            }
            // Performed by the app layer.
            BrowserAction::OpenSettings | BrowserAction::SaveFile { .. } => {}
        }
        Ok(None)
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect) -> Result<()> {
        let [header_area, main_area, status_area, footer_area] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Fill(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .areas(area);

        self.render_header(frame, header_area);
        self.render_list(frame, main_area);
        self.render_status(frame, status_area);
        render_footer(frame, footer_area);
        Ok(())
    }
}

fn render_row(entry: &DirEntry, width: u16) -> String {
    let (icon, name) = if entry.is_dir() {
        ("\u{e5ff}", format!("{}/", entry.basename))
    } else {
        ("\u{f01a7}", entry.basename.clone())
    };
    let size = if entry.is_dir() {
        String::new()
    } else {
        entry::format_size(entry.size)
    };
    let modified = entry::format_modified(entry.modified);
    let name_width = (width as usize).saturating_sub(34).max(10);
    format!("{icon} {name:<name_width$} {size:>10} {modified:>16}")
}

fn render_footer(frame: &mut Frame, area: Rect) {
    frame.render_widget(
        Paragraph::new(
            "Use ↓↑ to move, Enter to open or download, Backspace for parent, e to edit the path, r to refresh, s for settings, q to quit.",
        )
        .centered(),
        area,
    );
}

#[cfg(test)]
mod tests {
    use crossterm::event::KeyModifiers;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::entry::EntryKind;
    use crate::store::Settings;

    fn file(name: &str) -> DirEntry {
        DirEntry {
            filename: format!("/{name}"),
            basename: name.to_string(),
            kind: EntryKind::File,
            size: 200,
            modified: None,
        }
    }

    fn dir(name: &str) -> DirEntry {
        DirEntry {
            filename: format!("/{name}"),
            basename: name.to_string(),
            kind: EntryKind::Directory,
            size: 0,
            modified: None,
        }
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn listing_partitions_directories_first() {
        let mut browser = Browser::new("/".to_string(), None);
        browser
            .update(BrowserAction::ListingLoaded(vec![file("a.txt"), dir("music")]).into())
            .unwrap();
        let names: Vec<&str> = browser
            .entries
            .iter()
            .map(|e| e.basename.as_str())
            .collect();
        assert_eq!(names, vec!["music", "a.txt"]);
        assert_eq!(browser.state.selected(), Some(0));
        assert!(!browser.loading);
    }

    #[test]
    fn not_found_resets_committed_path_to_root() {
        let mut browser = Browser::new("/docs/old".to_string(), None);
        browser
            .update(
                BrowserAction::ListingFailed(DavError::Status {
                    status: 404,
                    message: "not found".to_string(),
                })
                .into(),
            )
            .unwrap();
        assert_eq!(browser.path, "/");
        assert_eq!(browser.path_input, "/");
        assert!(browser.error.as_deref().unwrap().contains("not found"));
    }

    #[test]
    fn not_found_at_root_does_not_rerequest() {
        let mut browser = Browser::new("/".to_string(), None);
        browser
            .update(
                BrowserAction::ListingFailed(DavError::Status {
                    status: 404,
                    message: "not found".to_string(),
                })
                .into(),
            )
            .unwrap();
        assert_eq!(browser.path, "/");
        assert!(!browser.loading);
    }

    #[test]
    fn other_failures_surface_and_stop_loading() {
        let mut browser = Browser::new("/docs".to_string(), None);
        browser.loading = true;
        browser
            .update(
                BrowserAction::ListingFailed(DavError::Status {
                    status: 500,
                    message: "boom".to_string(),
                })
                .into(),
            )
            .unwrap();
        assert_eq!(browser.path, "/docs");
        assert!(!browser.loading);
        assert!(browser.error.as_deref().unwrap().contains("500"));
    }

    #[test]
    fn download_progress_is_fractional() {
        let mut browser = Browser::new("/".to_string(), None);
        browser.download = Some(Download {
            basename: "a.txt".to_string(),
            progress: 0.0,
        });
        browser
            .update(
                BrowserAction::DownloadProgress {
                    loaded: 50,
                    total: 200,
                }
                .into(),
            )
            .unwrap();
        assert_eq!(browser.download.as_ref().unwrap().progress, 0.25);
    }

    #[test]
    fn download_completion_emits_exactly_one_save() {
        let mut browser = Browser::new("/".to_string(), None);
        browser.download = Some(Download {
            basename: "a.txt".to_string(),
            progress: 0.5,
        });
        let follow_up = browser
            .update(
                BrowserAction::DownloadFinished {
                    basename: "a.txt".to_string(),
                    bytes: vec![1, 2, 3],
                }
                .into(),
            )
            .unwrap();
        assert_eq!(
            follow_up,
            Some(
                BrowserAction::SaveFile {
                    basename: "a.txt".to_string(),
                    bytes: vec![1, 2, 3],
                }
                .into()
            )
        );
        assert!(browser.download.is_none());
    }

    #[test]
    fn editing_the_path_commits_on_enter() {
        let mut browser = Browser::new("/".to_string(), None);
        browser.handle_key_event(key(KeyCode::Char('e'))).unwrap();
        for c in "docs".chars() {
            browser.handle_key_event(key(KeyCode::Char(c))).unwrap();
        }
        let action = browser
            .handle_key_event(key(KeyCode::Enter))
            .unwrap()
            .unwrap();
        assert_eq!(
            action,
            BrowserAction::NavigateTo("/docs".to_string()).into()
        );
        browser.update(action).unwrap();
        assert_eq!(browser.path, "/docs");
        assert_eq!(browser.input_mode, InputMode::Normal);
    }

    #[test]
    fn escape_discards_the_uncommitted_path() {
        let mut browser = Browser::new("/docs".to_string(), None);
        browser.handle_key_event(key(KeyCode::Char('e'))).unwrap();
        browser.handle_key_event(key(KeyCode::Char('x'))).unwrap();
        browser.handle_key_event(key(KeyCode::Esc)).unwrap();
        assert_eq!(browser.path, "/docs");
        assert_eq!(browser.path_input, "/docs");
    }

    #[tokio::test]
    async fn client_change_issues_a_listing_for_the_current_path() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let mut browser = Browser::new("/docs".to_string(), None);
        browser.register_action_handler(tx).unwrap();

        let client = DavClient::connect(&Settings {
            url: "http://127.0.0.1:1/dav".to_string(),
            username: "user".to_string(),
            password: "secret".to_string(),
        })
        .unwrap();
        browser
            .update(BrowserAction::ClientChanged(Some(client)).into())
            .unwrap();
        assert!(browser.loading);

        // Nothing listens on that port, so the issued request comes back as
        // a failure, which is proof enough that it was sent.
        let response = rx.recv().await.unwrap();
        assert!(matches!(
            response,
            AppAction::Browser(BrowserAction::ListingFailed(_))
        ));
    }
}
