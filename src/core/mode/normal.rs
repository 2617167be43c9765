use tracing::{debug, trace};

use super::{Mode, ModeArgs, INSERT_MODE, LINE_VISUAL_MODE, NORMAL_MODE, VISUAL_MODE};
use crate::core::command::{Command, CommandExecutionError, TextTarget};
use crate::core::cursor::CaretType;
use crate::core::editor::EditorAdaptor;
use crate::core::key::{KeyStroke, SpecialKey};
use crate::core::keymap::NORMAL_KEYMAP;
use crate::core::motion::{clamp_to_normal, Motion, MotionCommand};

/// Outcome of parsing the keys typed so far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum Parse<T> {
    Incomplete,
    Invalid,
    Complete(T),
}

/// What a complete normal-mode key sequence asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
enum NormalCommand {
    /// Runs without becoming the last change (motions, yanks, undo).
    Execute(Command),
    /// Runs and becomes what `.` repeats.
    Change(Command),
    EnterInsert(ModeArgs),
    /// `.` with an optional count replacing the recorded one.
    Repeat(Option<usize>),
    EnterVisual(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ParsedCommand {
    register: Option<char>,
    command: NormalCommand,
}

/// Reads a count starting at `keys[i]`. A leading `0` is a motion, not a
/// count.
pub(super) fn parse_count(keys: &[KeyStroke], mut i: usize) -> (Option<usize>, usize) {
    let mut count: Option<usize> = None;
    while let Some(d) = keys.get(i).and_then(|k| k.character()).and_then(|c| c.to_digit(10)) {
        if count.is_none() && d == 0 {
            break;
        }
        count = Some(count.unwrap_or(0).saturating_mul(10).saturating_add(d as usize));
        i += 1;
    }
    (count, i)
}

/// Parses a motion at `keys[i]`, returning it with the number of keys used.
pub(super) fn parse_motion(keys: &[KeyStroke], i: usize) -> Parse<(Motion, usize)> {
    let Some(stroke) = keys.get(i) else {
        return Parse::Incomplete;
    };
    let motion = match (stroke.character(), stroke.special_key()) {
        (Some('h'), _) | (_, Some(SpecialKey::Left)) | (_, Some(SpecialKey::Backspace)) => {
            Motion::Left
        }
        (Some('l'), _) | (Some(' '), _) | (_, Some(SpecialKey::Right)) => Motion::Right,
        (Some('j'), _) | (_, Some(SpecialKey::Down)) => Motion::Down,
        (Some('k'), _) | (_, Some(SpecialKey::Up)) => Motion::Up,
        (Some('w'), _) => Motion::WordForward,
        (Some('b'), _) => Motion::WordBackward,
        (Some('e'), _) => Motion::WordEnd,
        (Some('0'), _) | (_, Some(SpecialKey::Home)) => Motion::LineStart,
        (Some('^'), _) => Motion::FirstNonBlank,
        (Some('$'), _) | (_, Some(SpecialKey::End)) => Motion::LineEnd,
        (Some('G'), _) => Motion::DocumentEnd,
        (Some('g'), _) => {
            return match keys.get(i + 1).and_then(|k| k.character()) {
                None if keys.len() <= i + 1 => Parse::Incomplete,
                Some('g') => Parse::Complete((Motion::DocumentStart, 2)),
                _ => Parse::Invalid,
            };
        }
        _ => return Parse::Invalid,
    };
    Parse::Complete((motion, 1))
}

fn multiply(a: Option<usize>, b: Option<usize>) -> Option<usize> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.saturating_mul(b)),
        (a, b) => a.or(b),
    }
}

fn insert_with(pre_command: Command, count: Option<usize>) -> NormalCommand {
    NormalCommand::EnterInsert(
        ModeArgs::new()
            .with_pre_command(pre_command)
            .with_count(count),
    )
}

fn parse_operator(
    keys: &[KeyStroke],
    operator: char,
    count: Option<usize>,
    i: usize,
) -> Parse<NormalCommand> {
    let (motion_count, i) = parse_count(keys, i);
    let count = multiply(count, motion_count);
    let Some(stroke) = keys.get(i) else {
        return Parse::Incomplete;
    };
    if stroke.character() == Some(operator) {
        let lines = TextTarget::Lines {
            count: count.unwrap_or(1),
        };
        return Parse::Complete(match operator {
            'd' => NormalCommand::Change(Command::Delete(lines)),
            'y' => NormalCommand::Execute(Command::Yank(lines)),
            _ => insert_with(Command::ChangeLines(lines), None),
        });
    }
    let motion = match parse_motion(keys, i) {
        Parse::Complete((motion, _)) => motion,
        Parse::Incomplete => return Parse::Incomplete,
        Parse::Invalid => return Parse::Invalid,
    };
    let target = MotionCommand::with_count(motion, count);
    Parse::Complete(match operator {
        'd' => NormalCommand::Change(Command::Delete(TextTarget::Motion(target))),
        'y' => NormalCommand::Execute(Command::Yank(TextTarget::Motion(target))),
        _ if target.is_linewise() => insert_with(Command::ChangeLines(TextTarget::Motion(target)), None),
        _ => {
            let motion = if motion == Motion::WordForward {
                Motion::ChangeWord
            } else {
                motion
            };
            let target = MotionCommand::with_count(motion, count);
            insert_with(Command::Delete(TextTarget::Motion(target)), None)
        }
    })
}

fn parse(keys: &[KeyStroke]) -> Parse<ParsedCommand> {
    let mut i = 0;
    let mut register = None;
    if keys.first().and_then(|k| k.character()) == Some('"') {
        match keys.get(1).and_then(|k| k.character()) {
            Some(name) => register = Some(name),
            None if keys.len() < 2 => return Parse::Incomplete,
            None => return Parse::Invalid,
        }
        i = 2;
    }
    let (count, i) = parse_count(keys, i);
    let Some(stroke) = keys.get(i) else {
        return Parse::Incomplete;
    };

    let command = if *stroke == KeyStroke::ctrl('r') {
        NormalCommand::Execute(Command::Redo.with_count(count.unwrap_or(1)))
    } else {
        let delete = |motion| Command::delete_motion(motion, count);
        match stroke.character() {
            Some('x') => NormalCommand::Change(delete(Motion::Right)),
            Some('X') => NormalCommand::Change(delete(Motion::Left)),
            Some('D') => NormalCommand::Change(delete(Motion::LineEnd)),
            Some('C') => insert_with(delete(Motion::LineEnd), None),
            Some('s') => insert_with(delete(Motion::Right), None),
            Some('S') => insert_with(
                Command::ChangeLines(TextTarget::Lines {
                    count: count.unwrap_or(1),
                }),
                None,
            ),
            Some('p') => NormalCommand::Change(Command::PasteAfter {
                count: count.unwrap_or(1),
            }),
            Some('P') => NormalCommand::Change(Command::PasteBefore {
                count: count.unwrap_or(1),
            }),
            Some('i') => NormalCommand::EnterInsert(ModeArgs::new().with_count(count)),
            Some('a') => insert_with(Command::motion(Motion::RightForAppend), count),
            Some('A') => insert_with(Command::motion(Motion::LineEndForAppend), count),
            Some('I') => insert_with(Command::motion(Motion::FirstNonBlank), count),
            Some('o') => insert_with(Command::OpenLine { above: false }, count),
            Some('O') => insert_with(Command::OpenLine { above: true }, count),
            Some('.') => NormalCommand::Repeat(count),
            Some('u') => NormalCommand::Execute(Command::Undo.with_count(count.unwrap_or(1))),
            Some('v') => NormalCommand::EnterVisual(VISUAL_MODE),
            Some('V') => NormalCommand::EnterVisual(LINE_VISUAL_MODE),
            Some(op @ ('d' | 'c' | 'y')) => match parse_operator(keys, op, count, i + 1) {
                Parse::Complete(command) => command,
                Parse::Incomplete => return Parse::Incomplete,
                Parse::Invalid => return Parse::Invalid,
            },
            _ => match parse_motion(keys, i) {
                Parse::Complete((motion, _)) => NormalCommand::Execute(Command::Motion(
                    MotionCommand::with_count(motion, count),
                )),
                Parse::Incomplete => return Parse::Incomplete,
                Parse::Invalid => return Parse::Invalid,
            },
        }
    };
    Parse::Complete(ParsedCommand { register, command })
}

/// Command mode: keys are commands, counts and operators. Every key is
/// consumed.
#[derive(Debug, Default)]
pub struct NormalMode {
    enabled: bool,
    pending: Vec<KeyStroke>,
}

impl NormalMode {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys typed towards a command that is not complete yet.
    pub fn pending_keys(&self) -> &[KeyStroke] {
        &self.pending
    }

    fn run(
        editor: &mut EditorAdaptor,
        parsed: ParsedCommand,
    ) -> Result<(), CommandExecutionError> {
        if let Some(name) = parsed.register {
            editor.registers_mut().set_active_register(name)?;
        }
        match parsed.command {
            NormalCommand::Execute(command) => command.execute(editor),
            NormalCommand::Change(command) => {
                command.execute(editor)?;
                if let Some(repetition) = command.repetition() {
                    let repeat = match parsed.register {
                        Some(name) => {
                            Command::Sequence(vec![Command::SwitchRegister(name), repetition])
                        }
                        None => repetition,
                    };
                    editor.registers_mut().set_last_edit(repeat);
                }
                Ok(())
            }
            NormalCommand::EnterInsert(mut args) => {
                // The pre-command runs after this key, once the register
                // selection has been reset.
                if let Some(name) = parsed.register {
                    args.pre_command = args
                        .pre_command
                        .take()
                        .map(|pre| Command::Sequence(vec![Command::SwitchRegister(name), pre]));
                }
                editor.change_mode(INSERT_MODE, args);
                Ok(())
            }
            NormalCommand::Repeat(count) => {
                let last = editor
                    .registers()
                    .last_edit()
                    .cloned()
                    .ok_or_else(|| CommandExecutionError::new("No previous change to repeat"))?;
                let last = match count {
                    Some(n) => {
                        let scaled = last.with_count(n);
                        editor.registers_mut().set_last_edit(scaled.clone());
                        scaled
                    }
                    None => last,
                };
                debug!(command = ?last, "repeat last change");
                last.execute(editor)
            }
            NormalCommand::EnterVisual(name) => {
                editor.change_mode(name, ModeArgs::new());
                Ok(())
            }
        }
    }

    fn settle_cursor(editor: &mut EditorAdaptor) {
        let pos = editor.position().model_offset();
        let clamped = clamp_to_normal(editor.model(), pos);
        if clamped != pos {
            editor.move_to(clamped, false);
        }
    }
}

impl Mode for NormalMode {
    fn name(&self) -> &'static str {
        NORMAL_MODE
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn enter_mode(&mut self, editor: &mut EditorAdaptor, _args: ModeArgs) {
        self.enabled = true;
        self.pending.clear();
        editor.cursor_service().set_caret(CaretType::Rectangular);
        editor.user_interface().set_mode_label("");
        Self::settle_cursor(editor);
    }

    fn leave_mode(&mut self, _editor: &mut EditorAdaptor) {
        self.enabled = false;
        self.pending.clear();
    }

    fn handle_key(&mut self, editor: &mut EditorAdaptor, stroke: KeyStroke) -> bool {
        if stroke.is_escape() {
            self.pending.clear();
            editor.registers_mut().reset_active_register();
            return true;
        }
        self.pending.push(stroke);
        let parsed = match parse(&self.pending) {
            Parse::Incomplete => return true,
            Parse::Invalid => {
                trace!(keys = ?self.pending, "no such command");
                self.pending.clear();
                return true;
            }
            Parse::Complete(parsed) => parsed,
        };
        self.pending.clear();

        editor.history().begin_compound_change();
        let result = Self::run(editor, parsed);
        editor.history().end_compound_change();
        if let Err(e) = result {
            editor.user_interface().set_error_message(e.message());
        }
        editor.registers_mut().reset_active_register();
        if !editor.mode_change_pending() {
            Self::settle_cursor(editor);
        }
        true
    }

    fn key_map_name(&self) -> &'static str {
        NORMAL_KEYMAP
    }
}
