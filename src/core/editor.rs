//! The services a mode works with, bundled behind one handle.
//!
//! Modes and commands never reach into the host directly. They go through
//! the [`EditorAdaptor`], which hands out the text content, cursor, history
//! and user-interface capabilities as trait objects and owns the registers
//! and settings for the session.

use tracing::{debug, warn};

use super::buffer::Buffer;
use super::content::TextContent;
use super::cursor::{Cursor, CursorService};
use super::history::HistoryService;
use super::keymap::KeyMapRegistry;
use super::mode::ModeArgs;
use super::position::Position;
use super::register::RegisterManager;
use super::settings::Settings;
use super::view::{View, ViewContent};

/// Error and status reporting of the host.
pub trait UserInterfaceService {
    fn set_error_message(&mut self, message: &str);
    fn set_info_message(&mut self, message: &str);
    fn error_message(&self) -> Option<&str>;
    fn info_message(&self) -> Option<&str>;
    fn mode_label(&self) -> &str;
    fn set_mode_label(&mut self, label: &str);
}

/// The status line of the bundled host.
#[derive(Debug, Clone, Default)]
pub struct StatusLine {
    error: Option<String>,
    info: Option<String>,
    mode_label: String,
}

impl StatusLine {
    pub fn clear(&mut self) {
        self.error = None;
        self.info = None;
    }
}

impl UserInterfaceService for StatusLine {
    fn set_error_message(&mut self, message: &str) {
        warn!("{message}");
        self.error = Some(message.to_string());
    }

    fn set_info_message(&mut self, message: &str) {
        self.info = Some(message.to_string());
    }

    fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }

    fn info_message(&self) -> Option<&str> {
        self.info.as_deref()
    }

    fn mode_label(&self) -> &str {
        &self.mode_label
    }

    fn set_mode_label(&mut self, label: &str) {
        self.mode_label = label.to_string();
    }
}

/// A transition a mode asked for while handling a key. The engine applies
/// it once the handler has returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeChange {
    pub name: &'static str,
    pub args: ModeArgs,
}

pub struct EditorAdaptor {
    buffer: Buffer,
    view: View,
    cursor: Cursor,
    registers: RegisterManager,
    status: StatusLine,
    settings: Settings,
    key_maps: KeyMapRegistry,
    selection_anchor: Option<usize>,
    pending_mode: Option<ModeChange>,
}

impl EditorAdaptor {
    pub fn new(text: &str, settings: Settings) -> Self {
        let mut buffer = Buffer::from_text(text);
        buffer.auto_indent = settings.auto_indent;
        buffer.history_mut().set_limit(settings.undo_levels);
        Self {
            buffer,
            view: View::new(),
            cursor: Cursor::new(),
            registers: RegisterManager::new(),
            status: StatusLine::default(),
            key_maps: KeyMapRegistry::from_settings(&settings),
            settings,
            selection_anchor: None,
            pending_mode: None,
        }
    }

    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut View {
        &mut self.view
    }

    /// Model-space text content.
    pub fn model(&self) -> &dyn TextContent {
        &self.buffer
    }

    pub fn model_content(&mut self) -> &mut dyn TextContent {
        &mut self.buffer
    }

    /// View-space text content (folded lines hidden).
    pub fn view_content(&mut self) -> ViewContent<'_> {
        ViewContent::new(&mut self.buffer, &self.view)
    }

    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    pub fn cursor_service(&mut self) -> &mut dyn CursorService {
        &mut self.cursor
    }

    pub fn history(&mut self) -> &mut dyn HistoryService {
        self.buffer.history_mut()
    }

    pub fn user_interface(&mut self) -> &mut dyn UserInterfaceService {
        &mut self.status
    }

    pub fn status(&self) -> &StatusLine {
        &self.status
    }

    pub fn status_mut(&mut self) -> &mut StatusLine {
        &mut self.status
    }

    pub fn registers(&self) -> &RegisterManager {
        &self.registers
    }

    pub fn registers_mut(&mut self) -> &mut RegisterManager {
        &mut self.registers
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Replaces the settings and rebuilds everything derived from them.
    pub fn set_settings(&mut self, settings: Settings) {
        self.buffer.auto_indent = settings.auto_indent;
        self.buffer.history_mut().set_limit(settings.undo_levels);
        self.key_maps = KeyMapRegistry::from_settings(&settings);
        self.settings = settings;
    }

    pub fn key_maps(&self) -> &KeyMapRegistry {
        &self.key_maps
    }

    pub fn text(&self) -> String {
        self.buffer.to_string()
    }

    pub fn position(&self) -> Position {
        self.cursor.position()
    }

    /// A position for `model_offset` with its view offset filled in.
    pub fn position_at(&self, model_offset: usize) -> Position {
        self.view.position(&self.buffer.content, model_offset)
    }

    /// Moves the cursor, clamped to the text. With `update_sticky_column`
    /// the column vertical motions aim for becomes the new column.
    pub fn set_position(&mut self, position: Position, update_sticky_column: bool) {
        let offset = position.model_offset().min(self.buffer.len_chars());
        let position = self.position_at(offset);
        self.cursor.set_position(position, update_sticky_column);
        if update_sticky_column {
            let line = self.buffer.line_information_of_offset(offset);
            self.cursor.set_sticky_column(offset - line.begin_offset);
        }
    }

    pub fn move_to(&mut self, model_offset: usize, update_sticky_column: bool) {
        self.set_position(Position::at(model_offset), update_sticky_column);
    }

    pub fn sticky_column(&self) -> usize {
        self.cursor.sticky_column()
    }

    pub fn set_sticky_column(&mut self, column: usize) {
        self.cursor.set_sticky_column(column);
    }

    /// The fixed end of the visual selection, if one is shown.
    pub fn selection_anchor(&self) -> Option<usize> {
        self.selection_anchor
    }

    pub fn set_selection_anchor(&mut self, anchor: Option<usize>) {
        self.selection_anchor = anchor;
    }

    /// The selected model range as `(first, last)`, both ends included.
    pub fn selection(&self) -> Option<(usize, usize)> {
        let anchor = self.selection_anchor?;
        let cursor = self.position().model_offset();
        Some((anchor.min(cursor), anchor.max(cursor)))
    }

    pub fn undo(&mut self) -> Option<usize> {
        self.buffer.undo()
    }

    pub fn redo(&mut self) -> Option<usize> {
        self.buffer.redo()
    }

    /// Asks for a switch to the mode called `name`. Takes effect after the
    /// current key has been handled; a later request replaces an earlier one.
    pub fn change_mode(&mut self, name: &'static str, args: ModeArgs) {
        debug!(mode = name, "mode change requested");
        self.pending_mode = Some(ModeChange { name, args });
    }

    pub fn mode_change_pending(&self) -> bool {
        self.pending_mode.is_some()
    }

    pub fn take_mode_change(&mut self) -> Option<ModeChange> {
        self.pending_mode.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_position_tracks_sticky_column() {
        let mut editor = EditorAdaptor::new("abc\ndefgh", Settings::default());
        editor.move_to(7, true);
        assert_eq!(editor.sticky_column(), 3);
        editor.move_to(1, false);
        assert_eq!(editor.sticky_column(), 3);
        editor.move_to(99, true);
        assert_eq!(editor.position().model_offset(), 9);
    }

    #[test]
    fn test_position_at_accounts_for_folds() {
        let mut editor = EditorAdaptor::new("aa\nbb\ncc\ndd", Settings::default());
        editor.view_mut().close_fold(0, 2);
        editor.move_to(10, true);
        assert_eq!(editor.position(), Position::new(10, 4));
        assert_eq!(editor.view_content().text_length(), 5);
    }

    #[test]
    fn test_status_line_messages() {
        let mut editor = EditorAdaptor::new("", Settings::default());
        editor.user_interface().set_error_message("boom");
        editor.user_interface().set_mode_label("-- INSERT --");
        assert_eq!(editor.status().error_message(), Some("boom"));
        assert_eq!(editor.status().mode_label(), "-- INSERT --");
        editor.status_mut().clear();
        assert_eq!(editor.status().error_message(), None);
    }

    #[test]
    fn test_selection_is_ordered() {
        let mut editor = EditorAdaptor::new("abcdef", Settings::default());
        assert_eq!(editor.selection(), None);
        editor.set_selection_anchor(Some(4));
        editor.move_to(1, true);
        assert_eq!(editor.selection(), Some((1, 4)));
    }

    #[test]
    fn test_mode_change_is_deferred() {
        let mut editor = EditorAdaptor::new("", Settings::default());
        assert!(editor.take_mode_change().is_none());
        editor.change_mode("insert mode", ModeArgs::default());
        editor.change_mode("normal mode", ModeArgs::default());
        let change = editor.take_mode_change().unwrap();
        assert_eq!(change.name, "normal mode");
        assert!(editor.take_mode_change().is_none());
    }
}
