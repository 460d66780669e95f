//! Full-screen terminal interface.
//!
//! Three tabbed views over the same core state: the conversation, the
//! primary-key settings, and the capability toggles. The event loop is
//! single-threaded; the only work that leaves it is the network call,
//! spawned per send, whose one completion message comes back through an
//! unbounded channel and is applied between input polls.

mod render;

use std::error::Error;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use ratatui::backend::CrosstermBackend;
use ratatui::crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseEventKind,
};
use ratatui::crossterm::execute;
use ratatui::crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::Terminal;
use tokio::sync::mpsc;

use crate::api::ApiError;
use crate::auth::mask_key;
use crate::core::session::ChatSession;
use crate::core::store::{keys, SettingsStore};

/// One notification surface for every failure class, per design: status
/// codes and transport details stay in the logs.
const REQUEST_FAILED_NOTICE: &str =
    "Failed to send message. Please check your API key and try again.";

type Completion = (u64, Result<String, ApiError>);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Tab {
    Chat,
    Settings,
    Tools,
}

impl Tab {
    pub(crate) const ALL: [Tab; 3] = [Tab::Chat, Tab::Settings, Tab::Tools];

    pub(crate) fn title(self) -> &'static str {
        match self {
            Tab::Chat => "Chat",
            Tab::Settings => "Settings",
            Tab::Tools => "Tools",
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Tab::Chat => 0,
            Tab::Settings => 1,
            Tab::Tools => 2,
        }
    }

    fn next(self) -> Tab {
        Tab::ALL[(self.index() + 1) % Tab::ALL.len()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NoticeKind {
    Info,
    Error,
}

pub(crate) struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

pub(crate) struct App {
    pub session: ChatSession,
    pub store: Arc<dyn SettingsStore>,
    pub tab: Tab,
    /// Chat input buffer.
    pub input: String,
    /// Settings tab: new-key field.
    pub key_input: String,
    /// Tools tab: selected capability.
    pub tools_cursor: usize,
    /// Tools tab: key buffer while editing, `None` otherwise.
    pub key_edit: Option<String>,
    pub notice: Option<Notice>,
    /// Masked primary key, cached so drawing never hits the keyring.
    pub key_display: Option<String>,
    pub scroll_offset: u16,
    pub auto_scroll: bool,
}

impl App {
    fn new(session: ChatSession, store: Arc<dyn SettingsStore>) -> Self {
        let key_display = match store.get(keys::API_KEY) {
            Ok(Some(key)) => Some(mask_key(&key)),
            _ => None,
        };
        let mut app = Self {
            session,
            store,
            tab: Tab::Chat,
            input: String::new(),
            key_input: String::new(),
            tools_cursor: 0,
            key_edit: None,
            notice: None,
            key_display,
            scroll_offset: 0,
            auto_scroll: true,
        };
        if app.key_display.is_none() {
            app.info("No API key set. Open the Settings tab to add one.");
        }
        app
    }

    fn info(&mut self, text: impl Into<String>) {
        self.notice = Some(Notice {
            kind: NoticeKind::Info,
            text: text.into(),
        });
    }

    fn error(&mut self, text: impl Into<String>) {
        self.notice = Some(Notice {
            kind: NoticeKind::Error,
            text: text.into(),
        });
    }

    /// Accept the chat input and spawn its request.
    ///
    /// On rejection the input buffer is left alone so nothing typed is
    /// lost; on acceptance the user turn is already in the transcript.
    fn send_current_input(&mut self, tx: &mpsc::UnboundedSender<Completion>) {
        let text = self.input.clone();
        match self.session.begin_submit(&text) {
            Ok(Some(pending)) => {
                self.input.clear();
                self.notice = None;
                self.auto_scroll = true;
                let backend = self.session.backend();
                let tx = tx.clone();
                tokio::spawn(async move {
                    let generation = pending.generation();
                    let result = backend.complete(&pending.api_key, &pending.request).await;
                    let _ = tx.send((generation, result));
                });
            }
            Ok(None) => {}
            Err(err) => self.error(err.to_string()),
        }
    }

    fn apply_completion(&mut self, generation: u64, result: Result<String, ApiError>) {
        match self.session.finish_submit(generation, result) {
            Some(Ok(())) => self.auto_scroll = true,
            Some(Err(_)) => self.error(REQUEST_FAILED_NOTICE),
            None => {}
        }
    }

    fn save_primary_key(&mut self) {
        let trimmed = self.key_input.trim().to_string();
        if trimmed.is_empty() {
            self.error("Please enter a valid API key.");
            return;
        }
        match self.store.set(keys::API_KEY, &trimmed) {
            Ok(()) => {
                self.key_input.clear();
                self.key_display = Some(mask_key(&trimmed));
                self.info(format!("API key saved ({}).", mask_key(&trimmed)));
            }
            Err(err) => self.error(err.to_string()),
        }
    }

    fn clear_primary_key(&mut self) {
        match self.store.remove(keys::API_KEY) {
            Ok(()) => {
                // An environment key can still back the store after the
                // stored entry is gone; keep the display honest.
                self.key_display = match self.store.get(keys::API_KEY) {
                    Ok(Some(key)) => Some(mask_key(&key)),
                    _ => None,
                };
                self.info("API key cleared.");
            }
            Err(err) => self.error(err.to_string()),
        }
    }

    fn selected_capability(&self) -> (&'static str, &'static str, bool, bool) {
        let capability = &self.session.capabilities().entries()[self.tools_cursor];
        (
            capability.def.id,
            capability.def.display_name,
            capability.enabled,
            capability.def.requires_key,
        )
    }

    fn toggle_selected_tool(&mut self) {
        let (id, name, enabled, _) = self.selected_capability();
        match self.session.capabilities_mut().set_enabled(id, !enabled) {
            Ok(true) => self.info(format!("{name} enabled.")),
            Ok(false) => self.info(format!("{name} disabled.")),
            Err(err) => self.error(err.to_string()),
        }
    }

    fn begin_key_edit(&mut self) {
        let (id, name, _, requires_key) = self.selected_capability();
        if !requires_key {
            self.info(format!("{name} needs no API key."));
            return;
        }
        let current = match self.session.capabilities().saved_key(id) {
            Ok(value) => value.unwrap_or_default(),
            Err(err) => {
                self.error(err.to_string());
                String::new()
            }
        };
        self.key_edit = Some(current);
    }

    fn save_tool_key(&mut self) {
        let Some(buffer) = self.key_edit.clone() else {
            return;
        };
        let (id, name, _, _) = self.selected_capability();
        match self.session.capabilities_mut().save_key(id, &buffer) {
            Ok(()) => {
                self.key_edit = None;
                self.info(format!("{name} API key saved."));
            }
            // Keep editing so the rejection is visible but recoverable.
            Err(err) => self.error(err.to_string()),
        }
    }

    /// Handle one key press. Returns true when the app should exit.
    fn on_key(&mut self, key: KeyEvent, tx: &mpsc::UnboundedSender<Completion>) -> bool {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        if ctrl && key.code == KeyCode::Char('c') {
            return true;
        }
        if ctrl && key.code == KeyCode::Char('n') {
            self.session.reset();
            self.scroll_offset = 0;
            self.auto_scroll = true;
            self.info("Started a new conversation.");
            return false;
        }
        if key.code == KeyCode::Tab {
            self.key_edit = None;
            self.tab = self.tab.next();
            return false;
        }

        match self.tab {
            Tab::Chat => match key.code {
                KeyCode::Enter => self.send_current_input(tx),
                KeyCode::Char(c) if !ctrl => self.input.push(c),
                KeyCode::Backspace => {
                    self.input.pop();
                }
                KeyCode::Up => {
                    self.scroll_offset = self.scroll_offset.saturating_sub(1);
                    self.auto_scroll = false;
                }
                KeyCode::Down => {
                    self.scroll_offset = self.scroll_offset.saturating_add(1);
                }
                _ => {}
            },
            Tab::Settings => match key.code {
                KeyCode::Enter => self.save_primary_key(),
                KeyCode::Char('d') if ctrl => self.clear_primary_key(),
                KeyCode::Char(c) if !ctrl => self.key_input.push(c),
                KeyCode::Backspace => {
                    self.key_input.pop();
                }
                _ => {}
            },
            Tab::Tools => {
                if self.key_edit.is_some() {
                    match key.code {
                        KeyCode::Enter => self.save_tool_key(),
                        KeyCode::Esc => self.key_edit = None,
                        KeyCode::Char(c) if !ctrl => {
                            if let Some(buffer) = self.key_edit.as_mut() {
                                buffer.push(c);
                            }
                        }
                        KeyCode::Backspace => {
                            if let Some(buffer) = self.key_edit.as_mut() {
                                buffer.pop();
                            }
                        }
                        _ => {}
                    }
                } else {
                    let last = self.session.capabilities().entries().len() - 1;
                    match key.code {
                        KeyCode::Up => self.tools_cursor = self.tools_cursor.saturating_sub(1),
                        KeyCode::Down => self.tools_cursor = (self.tools_cursor + 1).min(last),
                        KeyCode::Char(' ') => self.toggle_selected_tool(),
                        KeyCode::Enter => self.begin_key_edit(),
                        _ => {}
                    }
                }
            }
        }
        false
    }
}

pub async fn run(
    session: ChatSession,
    store: Arc<dyn SettingsStore>,
) -> Result<(), Box<dyn Error>> {
    let mut app = App::new(session, store);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let (tx, mut rx) = mpsc::unbounded_channel::<Completion>();

    let result = loop {
        if let Err(err) = terminal.draw(|f| render::draw(f, &mut app)) {
            break Err(err.into());
        }

        match event::poll(Duration::from_millis(50)) {
            Ok(true) => match event::read() {
                Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                    if app.on_key(key, &tx) {
                        break Ok(());
                    }
                }
                Ok(Event::Mouse(mouse)) => match mouse.kind {
                    MouseEventKind::ScrollUp => {
                        app.scroll_offset = app.scroll_offset.saturating_sub(3);
                        app.auto_scroll = false;
                    }
                    MouseEventKind::ScrollDown => {
                        app.scroll_offset = app.scroll_offset.saturating_add(3);
                    }
                    _ => {}
                },
                Ok(_) => {}
                Err(err) => break Err(err.into()),
            },
            Ok(false) => {}
            Err(err) => break Err(err.into()),
        }

        // Apply finished requests between input polls.
        while let Ok((generation, result)) = rx.try_recv() {
            app.apply_completion(generation, result);
        }
    };

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tabs_cycle_in_order() {
        assert_eq!(Tab::Chat.next(), Tab::Settings);
        assert_eq!(Tab::Settings.next(), Tab::Tools);
        assert_eq!(Tab::Tools.next(), Tab::Chat);
    }
}
