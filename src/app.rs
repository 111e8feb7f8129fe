use crate::{
    config::{ConfigStore, PersistedConfig},
    countdown::{Countdown, DEFAULT_TARGET},
    display::DisplayState,
    error::FormatError,
};
use chrono::NaiveDateTime;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use notify_rust::{Notification, Urgency};
use ratatui::layout::Rect;

pub const PANEL_WIDTH: u16 = 44;
pub const PANEL_HEIGHT: u16 = 9;
pub const CLOCK_ROW: u16 = 1;
pub const COUNTDOWN_ROW: u16 = 4;
pub const TARGET_ROW: u16 = 7;
const TARGET_LABEL_WIDTH: u16 = 10;
const DIALOG_PREFILL: &str = "11:29";

// ============================================================================
// Geometry
// ============================================================================

/// Top-left corner of the panel in terminal cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

/// Panel rectangle for `pos`, pushed back inside `screen` when it would not fit.
pub fn panel_rect(pos: Position, screen: Rect) -> Rect {
    let width = PANEL_WIDTH.min(screen.width);
    let height = PANEL_HEIGHT.min(screen.height);
    let x = clamp_axis(pos.x, screen.width - width);
    let y = clamp_axis(pos.y, screen.height - height);
    Rect::new(screen.x + x, screen.y + y, width, height)
}

pub fn target_label_rect(panel: Rect) -> Rect {
    let width = TARGET_LABEL_WIDTH.min(panel.width);
    let label = Rect::new(panel.x + (panel.width - width) / 2, panel.y + TARGET_ROW, width, 1);
    label.intersection(panel)
}

fn clamp_axis(v: i32, max: u16) -> u16 {
    v.clamp(0, i32::from(max)) as u16
}

fn contains(r: Rect, column: u16, row: u16) -> bool {
    column >= r.x && column < r.x + r.width && row >= r.y && row < r.y + r.height
}

#[derive(Clone, Copy, Debug)]
struct Drag {
    offset_x: u16,
    offset_y: u16,
}

// ============================================================================
// Target dialog & modals
// ============================================================================

#[derive(Debug, PartialEq, Eq)]
pub enum DialogAction {
    Pending,
    Submit(String),
    Cancel,
}

#[derive(Clone, Debug)]
pub struct TimeDialog {
    pub input: String,
    /// The prefilled text is selected; typing replaces it.
    pub selected: bool,
}

impl TimeDialog {
    pub fn new() -> Self {
        Self { input: DIALOG_PREFILL.into(), selected: true }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> DialogAction {
        match key.code {
            KeyCode::Enter => return DialogAction::Submit(self.input.trim().to_string()),
            KeyCode::Esc => return DialogAction::Cancel,
            KeyCode::Char(c) => {
                if self.selected {
                    self.input.clear();
                }
                self.input.push(c);
            }
            KeyCode::Backspace | KeyCode::Delete => {
                if self.selected {
                    self.input.clear();
                } else {
                    self.input.pop();
                }
            }
            _ => {}
        }
        self.selected = false;
        DialogAction::Pending
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Modal {
    InvalidFormat(FormatError),
    Finished,
}

impl Modal {
    pub fn title(&self) -> &str {
        match self {
            Self::InvalidFormat(_) => "Invalid Format",
            Self::Finished => "Time's up!",
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::InvalidFormat(e) => e.to_string(),
            Self::Finished => "Countdown finished!".into(),
        }
    }
}

// ============================================================================
// Application State
// ============================================================================

pub struct AppState {
    pub countdown: Countdown,
    pub display: DisplayState,
    pub position: Position,
    pub dialog: Option<TimeDialog>,
    pub modal: Option<Modal>,
    /// Terminal area as of the last draw; mouse hits are resolved against it.
    pub screen: Rect,
    drag: Option<Drag>,
    store: ConfigStore,
    notifications: bool,
}

impl AppState {
    pub fn new(store: ConfigStore, notifications: bool, now: NaiveDateTime) -> Self {
        let config = store.load();
        log::info!("Loaded config from {}: {:?}", store.path().display(), config);

        let mut countdown = Countdown::new();
        countdown.initialize_default(now);
        if let Some(saved) = config.target_time {
            countdown.arm(saved, now);
        }
        log::info!("Counting down to {:?} (default {})", countdown.target(), DEFAULT_TARGET);

        Self {
            display: DisplayState::new(&countdown, now),
            countdown,
            position: Position { x: config.x, y: config.y },
            dialog: None,
            modal: None,
            screen: Rect::default(),
            drag: None,
            store,
            notifications,
        }
    }

    pub fn panel(&self) -> Rect {
        panel_rect(self.position, self.screen)
    }

    /// One display refresh.
    pub fn update(&mut self, now: NaiveDateTime) {
        if self.display.refresh(&mut self.countdown, now) {
            self.on_finished();
        }
    }

    fn on_finished(&mut self) {
        log::info!("Countdown to {} finished", self.display.target);
        self.modal = Some(Modal::Finished);
        if self.notifications {
            notify("Time's up!", "Countdown finished!");
        }
    }

    /// Re-arms the countdown from user text and persists the new target.
    pub fn set_target(&mut self, text: &str, now: NaiveDateTime) -> Result<(), FormatError> {
        let target = self.countdown.set_target(text, now)?;
        log::info!("Target set to {} from {:?}", target, text);
        self.save_config();
        self.display.sync(&self.countdown, now);
        Ok(())
    }

    pub fn persisted(&self) -> PersistedConfig {
        PersistedConfig {
            x: self.position.x,
            y: self.position.y,
            target_time: self.countdown.target_time(),
        }
    }

    pub fn save_config(&self) {
        self.store.save(&self.persisted());
    }

    pub fn save_on_quit(&self) {
        log::info!("Shutting down");
        self.save_config();
    }

    pub fn open_dialog(&mut self) {
        self.drag = None;
        self.dialog = Some(TimeDialog::new());
    }

    // ------------------------------------------------------------------------
    // Event handlers
    // ------------------------------------------------------------------------

    /// Returns `true` when the app should exit.
    pub fn handle_key(&mut self, key: KeyEvent, now: NaiveDateTime) -> bool {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return true;
        }

        if self.modal.is_some() {
            if matches!(key.code, KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ')) {
                self.modal = None;
            }
            return false;
        }

        if let Some(dialog) = self.dialog.as_mut() {
            match dialog.handle_key(key) {
                DialogAction::Pending => {}
                DialogAction::Cancel => self.dialog = None,
                DialogAction::Submit(text) => match self.set_target(&text, now) {
                    Ok(()) => self.dialog = None,
                    Err(e) => {
                        log::info!("Rejected target {:?}", e.input);
                        self.modal = Some(Modal::InvalidFormat(e));
                    }
                },
            }
            return false;
        }

        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => return true,
            KeyCode::Char('t') | KeyCode::Enter => self.open_dialog(),
            _ => {}
        }
        false
    }

    pub fn handle_mouse(&mut self, mouse: MouseEvent) {
        if self.modal.is_some() || self.dialog.is_some() {
            return;
        }

        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                let panel = self.panel();
                if contains(target_label_rect(panel), mouse.column, mouse.row) {
                    self.open_dialog();
                } else if contains(panel, mouse.column, mouse.row) {
                    self.drag = Some(Drag {
                        offset_x: mouse.column - panel.x,
                        offset_y: mouse.row - panel.y,
                    });
                }
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                if let Some(drag) = self.drag {
                    let x = i32::from(mouse.column) - i32::from(drag.offset_x) - i32::from(self.screen.x);
                    let y = i32::from(mouse.row) - i32::from(drag.offset_y) - i32::from(self.screen.y);
                    let moved = panel_rect(Position { x, y }, self.screen);
                    self.position = Position {
                        x: i32::from(moved.x - self.screen.x),
                        y: i32::from(moved.y - self.screen.y),
                    };
                }
            }
            MouseEventKind::Up(MouseButton::Left) => {
                if self.drag.take().is_some() {
                    log::debug!("Panel moved to {:?}", self.position);
                    self.save_config();
                }
            }
            _ => {}
        }
    }
}

// ============================================================================
// Utilities
// ============================================================================

fn notify(title: &str, body: &str) {
    let result = Notification::new()
        .summary(title)
        .body(body)
        .appname("deskclock")
        .icon("alarm-clock")
        .urgency(Urgency::Critical)
        .show();

    if let Err(e) = result {
        log::warn!("Desktop notification failed: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::countdown::{TimeOfDay, Tone};
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn at(h: u32, m: u32, s: u32, ms: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 15)
            .and_then(|d| d.and_hms_milli_opt(h, m, s, ms))
            .unwrap()
    }

    fn store(dir: &TempDir) -> ConfigStore {
        ConfigStore::new(dir.path().join("clock.json"))
    }

    fn app(dir: &TempDir, now: NaiveDateTime) -> AppState {
        let mut app = AppState::new(store(dir), false, now);
        app.screen = Rect::new(0, 0, 120, 40);
        app
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn mouse(kind: MouseEventKind, column: u16, row: u16) -> MouseEvent {
        MouseEvent { kind, column, row, modifiers: KeyModifiers::NONE }
    }

    fn type_text(app: &mut AppState, text: &str, now: NaiveDateTime) {
        for c in text.chars() {
            app.handle_key(key(KeyCode::Char(c)), now);
        }
    }

    #[test]
    fn test_startup_uses_default_target() {
        let dir = TempDir::new().unwrap();
        let app = app(&dir, at(9, 0, 0, 0));
        assert_eq!(app.countdown.target(), Some(at(11, 29, 0, 0)));
        assert_eq!(app.position, Position { x: 100, y: 100 });
        assert_eq!(app.display.target, "11:29:00");
        assert_eq!(app.display.countdown, "02:29:00.000");
    }

    #[test]
    fn test_startup_restores_saved_state() {
        let dir = TempDir::new().unwrap();
        store(&dir).save(&PersistedConfig { x: 12, y: 3, target_time: TimeOfDay::new(8, 15, 0) });

        let app = app(&dir, at(9, 0, 0, 0));
        assert_eq!(app.position, Position { x: 12, y: 3 });
        assert_eq!(app.countdown.format_target(), "08:15:00");
        // 08:15 already passed, so it is tomorrow's.
        assert_eq!(app.countdown.remaining(at(9, 0, 0, 0)).as_secs(), 23 * 3600 + 15 * 60);
    }

    #[test]
    fn test_dialog_submit_sets_and_persists_target() {
        let dir = TempDir::new().unwrap();
        let now = at(9, 0, 0, 0);
        let mut app = app(&dir, now);

        app.handle_key(key(KeyCode::Char('t')), now);
        assert_eq!(app.dialog.as_ref().map(|d| d.input.as_str()), Some("11:29"));

        type_text(&mut app, "10:30:15", now);
        assert_eq!(app.dialog.as_ref().map(|d| d.input.as_str()), Some("10:30:15"));
        app.handle_key(key(KeyCode::Enter), now);

        assert!(app.dialog.is_none());
        assert!(app.modal.is_none());
        assert_eq!(app.display.target, "10:30:15");
        assert_eq!(app.display.countdown, "01:30:15.000");
        assert_eq!(store(&dir).load().target_time, TimeOfDay::new(10, 30, 15));
    }

    #[test]
    fn test_dialog_prefill_submits_as_is() {
        let dir = TempDir::new().unwrap();
        let now = at(12, 0, 0, 0);
        let mut app = app(&dir, now);
        app.open_dialog();
        app.handle_key(key(KeyCode::Enter), now);
        assert_eq!(app.countdown.target(), Some(at(11, 29, 0, 0) + chrono::Days::new(1)));
    }

    #[test]
    fn test_invalid_input_shows_error_and_keeps_target() {
        let dir = TempDir::new().unwrap();
        let now = at(9, 0, 0, 0);
        let mut app = app(&dir, now);
        let before = app.countdown.target();

        app.open_dialog();
        type_text(&mut app, "7pm", now);
        app.handle_key(key(KeyCode::Enter), now);

        let modal = app.modal.clone().unwrap();
        assert_eq!(modal.title(), "Invalid Format");
        assert_eq!(modal.message(), "Please enter time in HH:MM or HH:MM:SS format (24-hour)");
        assert_eq!(app.countdown.target(), before);
        assert!(!store(&dir).path().exists());

        // Dismissing the error returns to the still-open dialog.
        assert!(!app.handle_key(key(KeyCode::Esc), now));
        assert!(app.modal.is_none());
        assert_eq!(app.dialog.as_ref().map(|d| d.input.as_str()), Some("7pm"));
    }

    #[test]
    fn test_dialog_cancel() {
        let dir = TempDir::new().unwrap();
        let now = at(9, 0, 0, 0);
        let mut app = app(&dir, now);
        app.open_dialog();
        assert!(!app.handle_key(key(KeyCode::Esc), now));
        assert!(app.dialog.is_none());
        assert!(app.handle_key(key(KeyCode::Esc), now));
    }

    #[test]
    fn test_dialog_backspace_clears_selection() {
        let mut dialog = TimeDialog::new();
        assert_eq!(dialog.handle_key(key(KeyCode::Backspace)), DialogAction::Pending);
        assert_eq!(dialog.input, "");
        dialog.handle_key(key(KeyCode::Char('1')));
        dialog.handle_key(key(KeyCode::Char('2')));
        dialog.handle_key(key(KeyCode::Backspace));
        assert_eq!(dialog.handle_key(key(KeyCode::Enter)), DialogAction::Submit("1".into()));
    }

    #[test]
    fn test_exit_keys() {
        let dir = TempDir::new().unwrap();
        let now = at(9, 0, 0, 0);
        let mut app = app(&dir, now);
        assert!(app.handle_key(key(KeyCode::Esc), now));
        assert!(app.handle_key(key(KeyCode::Char('q')), now));
        assert!(app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL), now));
        assert!(!app.handle_key(key(KeyCode::Char('x')), now));
    }

    #[test]
    fn test_finished_modal_raised_once() {
        let dir = TempDir::new().unwrap();
        let now = at(11, 28, 59, 0);
        let mut app = app(&dir, now);

        app.update(at(11, 28, 59, 500));
        assert!(app.modal.is_none());
        app.update(at(11, 29, 0, 20));
        assert_eq!(app.modal, Some(Modal::Finished));
        assert_eq!(app.modal.as_ref().map(Modal::message), Some("Countdown finished!".to_string()));

        app.handle_key(key(KeyCode::Enter), now);
        assert!(app.modal.is_none());
        for i in 1..30 {
            app.update(at(11, 29, 1, 0) + chrono::TimeDelta::milliseconds(i * 100));
            assert!(app.modal.is_none());
        }
        assert_eq!(app.display.countdown, "00:00:00.000");
        assert_eq!(app.display.tone, Tone::Normal);
    }

    #[test]
    fn test_new_target_after_finish_counts_again() {
        let dir = TempDir::new().unwrap();
        let mut app = app(&dir, at(11, 28, 59, 0));
        app.update(at(11, 29, 0, 0));
        app.modal = None;

        app.set_target("11:30", at(11, 29, 0, 0)).unwrap();
        app.update(at(11, 29, 30, 0));
        assert_eq!(app.display.countdown, "00:00:30.000");
        app.update(at(11, 30, 0, 0));
        assert_eq!(app.modal, Some(Modal::Finished));
    }

    #[test]
    fn test_panel_rect_clamps_into_screen() {
        let screen = Rect::new(0, 0, 80, 24);
        assert_eq!(panel_rect(Position { x: 100, y: 100 }, screen), Rect::new(36, 15, 44, 9));
        assert_eq!(panel_rect(Position { x: -5, y: 2 }, screen), Rect::new(0, 2, 44, 9));
        assert_eq!(panel_rect(Position { x: 0, y: 0 }, Rect::new(0, 0, 20, 5)), Rect::new(0, 0, 20, 5));
    }

    #[test]
    fn test_drag_moves_and_persists_position() {
        let dir = TempDir::new().unwrap();
        let now = at(9, 0, 0, 0);
        let mut app = app(&dir, now);
        app.position = Position { x: 10, y: 5 };

        app.handle_mouse(mouse(MouseEventKind::Down(MouseButton::Left), 12, 6));
        app.handle_mouse(mouse(MouseEventKind::Drag(MouseButton::Left), 30, 20));
        assert_eq!(app.position, Position { x: 28, y: 19 });
        assert!(!store(&dir).path().exists());

        app.handle_mouse(mouse(MouseEventKind::Up(MouseButton::Left), 30, 20));
        let saved = store(&dir).load();
        assert_eq!((saved.x, saved.y), (28, 19));
    }

    #[test]
    fn test_drag_stops_at_screen_edge() {
        let dir = TempDir::new().unwrap();
        let mut app = app(&dir, at(9, 0, 0, 0));
        app.position = Position { x: 0, y: 0 };

        app.handle_mouse(mouse(MouseEventKind::Down(MouseButton::Left), 20, 2));
        app.handle_mouse(mouse(MouseEventKind::Drag(MouseButton::Left), 119, 39));
        assert_eq!(app.position, Position { x: 120 - 44, y: 40 - 9 });
        app.handle_mouse(mouse(MouseEventKind::Drag(MouseButton::Left), 0, 0));
        assert_eq!(app.position, Position { x: 0, y: 0 });
    }

    #[test]
    fn test_click_on_target_opens_dialog() {
        let dir = TempDir::new().unwrap();
        let mut app = app(&dir, at(9, 0, 0, 0));
        app.position = Position { x: 10, y: 5 };

        let label = target_label_rect(app.panel());
        assert_eq!(label, Rect::new(27, 12, 10, 1));
        app.handle_mouse(mouse(MouseEventKind::Down(MouseButton::Left), 30, 12));
        assert!(app.dialog.is_some());

        // Dragging is ignored while the dialog is up.
        app.handle_mouse(mouse(MouseEventKind::Drag(MouseButton::Left), 50, 20));
        assert_eq!(app.position, Position { x: 10, y: 5 });
    }

    #[test]
    fn test_click_outside_panel_does_nothing() {
        let dir = TempDir::new().unwrap();
        let mut app = app(&dir, at(9, 0, 0, 0));
        app.position = Position { x: 10, y: 5 };

        app.handle_mouse(mouse(MouseEventKind::Down(MouseButton::Left), 2, 2));
        app.handle_mouse(mouse(MouseEventKind::Drag(MouseButton::Left), 50, 20));
        app.handle_mouse(mouse(MouseEventKind::Up(MouseButton::Left), 50, 20));
        assert_eq!(app.position, Position { x: 10, y: 5 });
        assert!(!store(&dir).path().exists());
    }

    #[test]
    fn test_save_on_quit_writes_everything() {
        let dir = TempDir::new().unwrap();
        let mut app = app(&dir, at(9, 0, 0, 0));
        app.position = Position { x: 7, y: 8 };
        app.save_on_quit();
        assert_eq!(
            store(&dir).load(),
            PersistedConfig { x: 7, y: 8, target_time: TimeOfDay::new(11, 29, 0) }
        );
    }
}
