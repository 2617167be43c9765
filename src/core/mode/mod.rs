//! Editor modes. Exactly one is enabled at a time; the engine routes every
//! keystroke to it and applies the transitions it asks for.

pub mod insert;
pub mod normal;
pub mod visual;

use super::command::Command;
use super::editor::EditorAdaptor;
use super::key::KeyStroke;
use super::keymap::{KeyMap, KeyMapProvider};

pub use insert::InsertMode;
pub use normal::NormalMode;
pub use visual::VisualMode;

pub const NORMAL_MODE: &str = "normal mode";
pub const INSERT_MODE: &str = "insert mode";
pub const VISUAL_MODE: &str = "visual mode";
pub const LINE_VISUAL_MODE: &str = "linewise visual mode";

/// Arguments for entering a mode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModeArgs {
    /// Runs on entry, before the mode starts tracking the session (the
    /// `cw` in `cwfoo<Esc>`).
    pub pre_command: Option<Command>,
    pub count: Option<usize>,
}

impl ModeArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pre_command(mut self, command: Command) -> Self {
        self.pre_command = Some(command);
        self
    }

    pub fn with_count(mut self, count: Option<usize>) -> Self {
        self.count = count;
        self
    }
}

pub trait Mode {
    fn name(&self) -> &'static str;

    fn is_enabled(&self) -> bool;

    fn enter_mode(&mut self, editor: &mut EditorAdaptor, args: ModeArgs);

    fn leave_mode(&mut self, editor: &mut EditorAdaptor);

    /// Returns `true` when the stroke was fully consumed. Unconsumed strokes
    /// go to the host's native key handling.
    fn handle_key(&mut self, editor: &mut EditorAdaptor, stroke: KeyStroke) -> bool;

    /// Name of the keymap this mode's strokes are remapped through.
    fn key_map_name(&self) -> &'static str;

    fn resolve_key_map<'a>(&self, provider: &'a dyn KeyMapProvider) -> Option<&'a KeyMap> {
        provider.key_map(self.key_map_name())
    }

    /// Called after the host handled a stroke this mode did not consume.
    fn after_host_key(&mut self, _editor: &mut EditorAdaptor) {}
}
