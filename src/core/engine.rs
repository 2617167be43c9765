//! The modal state machine.
//!
//! The engine owns the editor services and one instance of every mode. Each
//! keystroke goes through the active mode's keymap, is handled by exactly
//! one mode, and only then are any mode transitions applied. Strokes a mode
//! does not consume fall through to the bundled host's own editing, which
//! stands in for the text widget a real host would have.

use std::collections::HashMap;

use tracing::{debug, trace, warn};

use super::content::TextContent;
use super::editor::{EditorAdaptor, StatusLine};
use super::key::{parse_keys, KeyParseError, KeyStroke, Modifiers, SpecialKey};
use super::keymap::KeyMapMatch;
use super::mode::{
    InsertMode, Mode, ModeArgs, NormalMode, VisualMode, INSERT_MODE, NORMAL_MODE,
};
use super::register::RegisterManager;
use super::settings::Settings;

/// Upper bound on transitions applied after one stroke.
const MAX_TRANSITIONS: usize = 8;

enum Resolution {
    /// The pending keys start a longer mapping.
    Wait,
    Mapped(Vec<KeyStroke>),
    Unmapped,
}

pub struct Engine {
    editor: EditorAdaptor,
    modes: HashMap<&'static str, Box<dyn Mode>>,
    current: &'static str,
    /// Typed keys held back while they may still complete a mapping.
    pending_keys: Vec<KeyStroke>,
}

impl Engine {
    pub fn new(settings: Settings) -> Self {
        Self::with_text("", settings)
    }

    pub fn with_text(text: &str, settings: Settings) -> Self {
        let mut modes: HashMap<&'static str, Box<dyn Mode>> = HashMap::new();
        let all: [Box<dyn Mode>; 4] = [
            Box::new(NormalMode::new()),
            Box::new(InsertMode::new()),
            Box::new(VisualMode::characterwise()),
            Box::new(VisualMode::linewise()),
        ];
        for mode in all {
            modes.insert(mode.name(), mode);
        }
        let mut engine = Self {
            editor: EditorAdaptor::new(text, settings),
            modes,
            current: NORMAL_MODE,
            pending_keys: Vec::new(),
        };
        if let Some(mode) = engine.modes.get_mut(NORMAL_MODE) {
            mode.enter_mode(&mut engine.editor, ModeArgs::new());
        }
        engine
    }

    pub fn mode_name(&self) -> &'static str {
        self.current
    }

    pub fn mode(&self) -> Option<&dyn Mode> {
        self.modes.get(self.current).map(|m| m.as_ref())
    }

    pub fn text(&self) -> String {
        self.editor.text()
    }

    pub fn cursor_offset(&self) -> usize {
        self.editor.position().model_offset()
    }

    pub fn registers(&self) -> &RegisterManager {
        self.editor.registers()
    }

    pub fn status(&self) -> &StatusLine {
        self.editor.status()
    }

    pub fn editor(&self) -> &EditorAdaptor {
        &self.editor
    }

    pub fn editor_mut(&mut self) -> &mut EditorAdaptor {
        &mut self.editor
    }

    pub fn set_settings(&mut self, settings: Settings) {
        self.editor.set_settings(settings);
    }

    pub fn pending_keys(&self) -> &[KeyStroke] {
        &self.pending_keys
    }

    /// Parses `notation` and handles every stroke in it.
    pub fn feed_keys(&mut self, notation: &str) -> Result<(), KeyParseError> {
        for stroke in parse_keys(notation)? {
            self.handle_key(stroke);
        }
        Ok(())
    }

    /// Types `text` as virtual strokes, bypassing keymaps.
    pub fn insert_virtual(&mut self, text: &str) {
        for c in text.chars() {
            self.handle_key(KeyStroke::char(c).into_virtual());
        }
    }

    pub fn handle_key(&mut self, stroke: KeyStroke) {
        if stroke.is_virtual() {
            self.dispatch(stroke);
            return;
        }
        self.editor.status_mut().clear();
        self.pending_keys.push(stroke);
        self.resolve_pending();
    }

    /// Sends held-back keys on unmapped, as when a mapping times out.
    pub fn flush_pending_keys(&mut self) {
        for stroke in std::mem::take(&mut self.pending_keys) {
            self.dispatch(stroke);
        }
    }

    fn resolve(&self) -> Resolution {
        let Some(mode) = self.modes.get(self.current) else {
            return Resolution::Unmapped;
        };
        let Some(key_map) = mode.resolve_key_map(self.editor.key_maps()) else {
            return Resolution::Unmapped;
        };
        match key_map.lookup(&self.pending_keys) {
            KeyMapMatch::Prefix => Resolution::Wait,
            KeyMapMatch::Mapped(rhs) => Resolution::Mapped(rhs.to_vec()),
            KeyMapMatch::None => Resolution::Unmapped,
        }
    }

    fn resolve_pending(&mut self) {
        while !self.pending_keys.is_empty() {
            match self.resolve() {
                Resolution::Wait => return,
                Resolution::Mapped(rhs) => {
                    trace!(keys = ?self.pending_keys, "mapping matched");
                    self.pending_keys.clear();
                    for stroke in rhs {
                        self.dispatch(stroke.into_virtual());
                    }
                }
                Resolution::Unmapped => {
                    let stroke = self.pending_keys.remove(0);
                    self.dispatch(stroke);
                }
            }
        }
    }

    fn dispatch(&mut self, stroke: KeyStroke) {
        let consumed = match self.modes.get_mut(self.current) {
            Some(mode) => mode.handle_key(&mut self.editor, stroke),
            None => false,
        };
        // Virtual characters are the mode's to insert; the host never sees
        // them twice.
        if !consumed && !(stroke.is_virtual() && stroke.character().is_some()) {
            self.host_key(stroke);
            if let Some(mode) = self.modes.get_mut(self.current) {
                mode.after_host_key(&mut self.editor);
            }
        }
        self.apply_mode_changes();
    }

    fn apply_mode_changes(&mut self) {
        for _ in 0..MAX_TRANSITIONS {
            let Some(change) = self.editor.take_mode_change() else {
                return;
            };
            if change.name == self.current {
                trace!(mode = change.name, "already active");
                continue;
            }
            if !self.modes.contains_key(change.name) {
                warn!(mode = change.name, "no such mode");
                continue;
            }
            if let Some(mode) = self.modes.get_mut(self.current) {
                mode.leave_mode(&mut self.editor);
            }
            debug!(from = self.current, to = change.name, "mode transition");
            self.current = change.name;
            if let Some(mode) = self.modes.get_mut(self.current) {
                mode.enter_mode(&mut self.editor, change.args);
            }
        }
        warn!("mode transitions did not settle");
    }

    /// Native editing of the bundled host, for strokes no mode consumed.
    fn host_key(&mut self, stroke: KeyStroke) {
        let editor = &mut self.editor;
        let pos = editor.position().model_offset();
        let line = editor.model().line_information_of_offset(pos);

        if let Some(c) = stroke.character() {
            let mut buf = [0u8; 4];
            editor.model_content().replace(pos, 0, c.encode_utf8(&mut buf));
            editor.move_to(pos + 1, true);
            return;
        }
        if !(stroke.modifiers - Modifiers::SHIFT).is_empty() {
            trace!(%stroke, "host ignores modified key");
            return;
        }
        let Some(key) = stroke.special_key() else {
            return;
        };
        match key {
            SpecialKey::Return => {
                let before = editor.model().text_length();
                editor.model_content().insert_preferring_smart_indent(pos, "\n");
                let inserted = editor.model().text_length() - before;
                editor.move_to(pos + inserted, true);
            }
            SpecialKey::Backspace => {
                if pos > 0 {
                    editor.model_content().replace(pos - 1, 1, "");
                    editor.move_to(pos - 1, true);
                }
            }
            SpecialKey::Delete => {
                if pos < editor.model().text_length() {
                    editor.model_content().replace(pos, 1, "");
                }
            }
            SpecialKey::Tab => {
                let settings = editor.settings();
                let text = if settings.expand_tab {
                    let tabstop = usize::from(settings.tabstop.max(1));
                    let column = pos - line.begin_offset;
                    " ".repeat(tabstop - column % tabstop)
                } else {
                    "\t".to_string()
                };
                editor.model_content().replace(pos, 0, &text);
                editor.move_to(pos + text.chars().count(), true);
            }
            SpecialKey::Left => editor.move_to(pos.saturating_sub(1).max(line.begin_offset), true),
            SpecialKey::Right => editor.move_to((pos + 1).min(line.end_offset()), true),
            SpecialKey::Up | SpecialKey::Down => {
                let target = if key == SpecialKey::Up {
                    line.number.checked_sub(1)
                } else {
                    Some(line.number + 1).filter(|n| *n < editor.model().number_of_lines())
                };
                if let Some(target) = target {
                    let info = editor.model().line_information(target);
                    let column = editor.sticky_column().min(info.length);
                    editor.move_to(info.begin_offset + column, false);
                }
            }
            SpecialKey::Home => editor.move_to(line.begin_offset, true),
            SpecialKey::End => editor.move_to(line.end_offset(), true),
            other => trace!(key = ?other, "host ignores key"),
        }
    }

    /// Whether the current mode is insert mode.
    pub fn is_inserting(&self) -> bool {
        self.current == INSERT_MODE
    }
}
