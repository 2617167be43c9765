//! Registers: named slots for yanked, deleted and inserted text.
//!
//! Besides the usual Vim registers the store keeps the last-edit pair: the
//! text of the last insert session (register `.`) and the command that
//! replays it for `.` (repeat last change).

use std::collections::HashMap;

use tracing::trace;

use super::command::{Command, CommandExecutionError};

pub const UNNAMED: char = '"';
pub const YANK: char = '0';
pub const SMALL_DELETE: char = '-';
pub const BLACK_HOLE: char = '_';
pub const LAST_INSERT: char = '.';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentType {
    #[default]
    Text,
    /// Whole lines, each terminated by a newline.
    Lines,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RegisterContent {
    pub content_type: ContentType,
    pub text: String,
}

impl RegisterContent {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content_type: ContentType::Text,
            text: text.into(),
        }
    }

    pub fn lines(text: impl Into<String>) -> Self {
        let mut text = text.into();
        if !text.ends_with('\n') {
            text.push('\n');
        }
        Self {
            content_type: ContentType::Lines,
            text,
        }
    }

    fn is_multiline(&self) -> bool {
        self.content_type == ContentType::Lines || self.text.contains('\n')
    }
}

pub fn is_valid_register(name: char) -> bool {
    name.is_ascii_alphanumeric()
        || matches!(name, UNNAMED | SMALL_DELETE | BLACK_HOLE | LAST_INSERT)
}

#[derive(Debug, Clone)]
pub struct RegisterManager {
    registers: HashMap<char, RegisterContent>,
    active: char,
    last_edit: Option<Command>,
}

impl Default for RegisterManager {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterManager {
    pub fn new() -> Self {
        Self {
            registers: HashMap::new(),
            active: UNNAMED,
            last_edit: None,
        }
    }

    /// Reads a register. Uppercase names read their lowercase register.
    pub fn get(&self, name: char) -> Result<&RegisterContent, CommandExecutionError> {
        if !is_valid_register(name) {
            return Err(CommandExecutionError::new(format!(
                "Invalid register name: {name}"
            )));
        }
        self.registers
            .get(&name.to_ascii_lowercase())
            .ok_or_else(|| CommandExecutionError::new(format!("Nothing in register {name}")))
    }

    /// Writes a register. Uppercase names append to their lowercase register;
    /// the black hole register discards everything.
    pub fn set_content(&mut self, name: char, content: RegisterContent) {
        match name {
            BLACK_HOLE => {}
            'A'..='Z' => {
                let slot = self
                    .registers
                    .entry(name.to_ascii_lowercase())
                    .or_default();
                if content.content_type == ContentType::Lines
                    && slot.content_type == ContentType::Text
                    && !slot.text.is_empty()
                {
                    slot.text.push('\n');
                }
                if content.content_type == ContentType::Lines {
                    slot.content_type = ContentType::Lines;
                }
                slot.text.push_str(&content.text);
            }
            _ => {
                trace!(register = %name, len = content.text.len(), "set register");
                self.registers.insert(name, content);
            }
        }
    }

    pub fn active_register(&self) -> char {
        self.active
    }

    pub fn set_active_register(&mut self, name: char) -> Result<(), CommandExecutionError> {
        if !is_valid_register(name) {
            return Err(CommandExecutionError::new(format!(
                "Invalid register name: {name}"
            )));
        }
        self.active = name;
        Ok(())
    }

    pub fn reset_active_register(&mut self) {
        self.active = UNNAMED;
    }

    /// Returns the selected register and resets the selection, which only
    /// ever applies to one command.
    pub fn take_active_register(&mut self) -> char {
        std::mem::replace(&mut self.active, UNNAMED)
    }

    /// The register the text of the last insert session lives in.
    pub fn last_edit_register(&self) -> char {
        LAST_INSERT
    }

    pub fn last_edit(&self) -> Option<&Command> {
        self.last_edit.as_ref()
    }

    pub fn set_last_edit(&mut self, command: Command) {
        trace!(?command, "set last edit");
        self.last_edit = Some(command);
    }

    /// Stores yanked text in the active register, or in `0` and the unnamed
    /// register when none was selected.
    pub fn record_yank(&mut self, content: RegisterContent) {
        match self.take_active_register() {
            BLACK_HOLE => {}
            UNNAMED => {
                self.set_content(YANK, content.clone());
                self.set_content(UNNAMED, content);
            }
            name => {
                self.set_content(name, content);
                self.sync_unnamed(name);
            }
        }
    }

    /// Stores deleted text. Without an explicit register, multi-line deletes
    /// shift `1`..`9` and small deletes go to `-`.
    pub fn record_delete(&mut self, content: RegisterContent) {
        match self.take_active_register() {
            BLACK_HOLE => {}
            UNNAMED => {
                if content.is_multiline() {
                    for n in (1..9u32).rev() {
                        let from = char::from_digit(n, 10).unwrap_or('1');
                        let to = char::from_digit(n + 1, 10).unwrap_or('9');
                        if let Some(shifted) = self.registers.remove(&from) {
                            self.registers.insert(to, shifted);
                        }
                    }
                    self.set_content('1', content.clone());
                } else {
                    self.set_content(SMALL_DELETE, content.clone());
                }
                self.set_content(UNNAMED, content);
            }
            name => {
                self.set_content(name, content);
                self.sync_unnamed(name);
            }
        }
    }

    fn sync_unnamed(&mut self, name: char) {
        if let Some(content) = self.registers.get(&name.to_ascii_lowercase()).cloned() {
            self.registers.insert(UNNAMED, content);
        }
    }
}
