//! Executable editing commands.
//!
//! Commands are plain data so that a finished edit can be stored, scaled by
//! a count and replayed later by `.` without holding on to the positions it
//! was first run at.

use thiserror::Error;
use tracing::debug;

use super::content::TextContent;
use super::editor::EditorAdaptor;
use super::motion::{first_non_blank, last_line, Motion, MotionCommand};
use super::register::{ContentType, RegisterContent};

/// The one runtime failure of command execution. Modes report the message
/// and carry on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct CommandExecutionError {
    message: String,
}

impl CommandExecutionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// What an operator acts on, relative to the cursor at execution time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextTarget {
    Motion(MotionCommand),
    /// `len` characters starting at the cursor.
    Span { len: usize },
    /// `count` whole lines starting with the cursor line.
    Lines { count: usize },
}

impl TextTarget {
    fn with_count(self, count: usize) -> Option<Self> {
        match self {
            TextTarget::Motion(m) => Some(TextTarget::Motion(MotionCommand::with_count(
                m.motion,
                Some(count),
            ))),
            TextTarget::Lines { .. } => Some(TextTarget::Lines { count }),
            TextTarget::Span { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Cursor movement. Not an edit on its own, so it repeats as itself.
    Motion(MotionCommand),
    /// Runs members in order, stopping at the first failure.
    Sequence(Vec<Command>),
    /// Runs `base` `count` times back to back.
    Counted { base: Box<Command>, count: usize },
    /// Runs `body`, then `count - 1` times moves one right and runs it again.
    /// Scaling replaces the count instead of nesting.
    SimpleInsert { body: Box<Command>, count: usize },
    SwitchRegister(char),
    /// Puts the active register before the cursor. Charwise text leaves the
    /// cursor on its first character, lines on the first non-blank.
    PasteBefore { count: usize },
    PasteAfter { count: usize },
    /// Moves `n` characters, crossing line breaks. Negative moves left.
    MoveRightOverLineBreak(isize),
    Delete(TextTarget),
    Yank(TextTarget),
    /// Replaces whole lines with the first line's indentation (`cc`, `S`).
    ChangeLines(TextTarget),
    OpenLine { above: bool },
    Undo,
    Redo,
}

impl Command {
    pub fn motion(motion: Motion) -> Self {
        Command::Motion(MotionCommand::new(motion))
    }

    pub fn delete_motion(motion: Motion, count: Option<usize>) -> Self {
        Command::Delete(TextTarget::Motion(MotionCommand::with_count(motion, count)))
    }

    pub fn execute(&self, editor: &mut EditorAdaptor) -> Result<(), CommandExecutionError> {
        match self {
            Command::Motion(motion) => {
                let from = editor.position().model_offset();
                let dest = motion.destination(editor.model(), from, editor.sticky_column(), false);
                editor.move_to(dest, motion.updates_sticky_column());
                if motion.motion == Motion::LineEnd {
                    editor.set_sticky_column(usize::MAX);
                }
                Ok(())
            }
            Command::Sequence(commands) => {
                for command in commands {
                    command.execute(editor)?;
                }
                Ok(())
            }
            Command::Counted { base, count } => {
                for _ in 0..*count {
                    base.execute(editor)?;
                }
                Ok(())
            }
            Command::SimpleInsert { body, count } => {
                body.execute(editor)?;
                for _ in 1..*count {
                    Command::MoveRightOverLineBreak(1).execute(editor)?;
                    body.execute(editor)?;
                }
                Ok(())
            }
            Command::SwitchRegister(name) => editor.registers_mut().set_active_register(*name),
            Command::PasteBefore { count } => paste(editor, true, *count),
            Command::PasteAfter { count } => paste(editor, false, *count),
            Command::MoveRightOverLineBreak(n) => {
                let pos = editor.position().add_offset(*n).model_offset();
                let dest = pos.min(editor.model().text_length());
                editor.move_to(dest, true);
                Ok(())
            }
            Command::Delete(target) => {
                let range = target_range(editor, target)?;
                if range.is_empty() {
                    return Ok(());
                }
                let content = range.register_content(editor.model());
                editor.registers_mut().record_delete(content);
                editor
                    .model_content()
                    .replace(range.start, range.end - range.start, "");
                let dest = if range.is_linewise() {
                    let line = editor.model().line_information_of_offset(range.start);
                    first_non_blank(editor.model(), &line)
                } else {
                    range.start
                };
                editor.move_to(dest, true);
                Ok(())
            }
            Command::Yank(target) => {
                let range = target_range(editor, target)?;
                if range.is_empty() {
                    return Ok(());
                }
                let content = range.register_content(editor.model());
                editor.registers_mut().record_yank(content);
                let pos = editor.position().model_offset();
                if range.start < pos {
                    let dest = if range.is_linewise() {
                        let line = editor.model().line_information_of_offset(range.start);
                        first_non_blank(editor.model(), &line)
                    } else {
                        range.start
                    };
                    editor.move_to(dest, true);
                }
                Ok(())
            }
            Command::ChangeLines(target) => change_lines(editor, target),
            Command::OpenLine { above } => open_line(editor, *above),
            Command::Undo => {
                let offset = editor
                    .undo()
                    .ok_or_else(|| CommandExecutionError::new("Already at oldest change"))?;
                editor.move_to(offset, true);
                Ok(())
            }
            Command::Redo => {
                let offset = editor
                    .redo()
                    .ok_or_else(|| CommandExecutionError::new("Already at newest change"))?;
                editor.move_to(offset, true);
                Ok(())
            }
        }
    }

    /// A command reproducing this one's effect later, from wherever the
    /// cursor is then. `None` for commands that are not changes.
    pub fn repetition(&self) -> Option<Command> {
        match self {
            Command::Undo | Command::Redo | Command::Yank(_) => None,
            Command::Sequence(commands) => Some(Command::Sequence(
                commands
                    .iter()
                    .map(|c| c.repetition().unwrap_or_else(|| c.clone()))
                    .collect(),
            )),
            Command::Counted { base, count } => Some(Command::Counted {
                base: Box::new(base.repetition().unwrap_or_else(|| (**base).clone())),
                count: *count,
            }),
            _ => Some(self.clone()),
        }
    }

    /// This command scaled to `count`.
    pub fn with_count(&self, count: usize) -> Command {
        let count = count.max(1);
        match self {
            Command::Motion(m) => Command::Motion(MotionCommand::with_count(m.motion, Some(count))),
            Command::Counted { base, .. } => Command::Counted {
                base: base.clone(),
                count,
            },
            Command::SimpleInsert { body, .. } => Command::SimpleInsert {
                body: body.clone(),
                count,
            },
            Command::Sequence(commands)
                if matches!(commands.last(), Some(Command::SimpleInsert { .. })) =>
            {
                let mut commands = commands.clone();
                if let Some(insert) = commands.pop() {
                    commands.push(insert.with_count(count));
                }
                Command::Sequence(commands)
            }
            Command::PasteBefore { .. } => Command::PasteBefore { count },
            Command::PasteAfter { .. } => Command::PasteAfter { count },
            Command::Delete(target) | Command::Yank(target) | Command::ChangeLines(target) => {
                match target.with_count(count) {
                    Some(scaled) => match self {
                        Command::Delete(_) => Command::Delete(scaled),
                        Command::Yank(_) => Command::Yank(scaled),
                        _ => Command::ChangeLines(scaled),
                    },
                    None => self.counted(count),
                }
            }
            _ => self.counted(count),
        }
    }

    /// Whether running this starts a fresh line to type on (`o`, `O`).
    pub fn opens_line(&self) -> bool {
        match self {
            Command::OpenLine { .. } => true,
            Command::Sequence(commands) => commands.iter().any(Command::opens_line),
            _ => false,
        }
    }

    fn counted(&self, count: usize) -> Command {
        if count == 1 {
            self.clone()
        } else {
            Command::Counted {
                base: Box::new(self.clone()),
                count,
            }
        }
    }
}

/// A resolved operator range in model offsets. Linewise ranges also keep
/// the line numbers they cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OperatorRange {
    start: usize,
    end: usize,
    lines: Option<(usize, usize)>,
}

impl OperatorRange {
    fn is_linewise(&self) -> bool {
        self.lines.is_some()
    }

    fn is_empty(&self) -> bool {
        self.lines.is_none() && self.start == self.end
    }

    fn register_content(&self, content: &dyn TextContent) -> RegisterContent {
        match self.lines {
            Some((first, last)) => {
                let begin = content.line_information(first).begin_offset;
                let end = content.line_information(last).end_offset();
                RegisterContent::lines(content.text(begin, end - begin))
            }
            None => RegisterContent::text(content.text(self.start, self.end - self.start)),
        }
    }
}

fn target_range(
    editor: &EditorAdaptor,
    target: &TextTarget,
) -> Result<OperatorRange, CommandExecutionError> {
    let content = editor.model();
    let pos = editor.position().model_offset().min(content.text_length());
    match target {
        TextTarget::Motion(motion) => {
            let dest = motion.destination(content, pos, editor.sticky_column(), true);
            if motion.is_linewise() {
                let first = content.line_information_of_offset(pos.min(dest)).number;
                let last = content.line_information_of_offset(pos.max(dest)).number;
                return Ok(line_range(content, first, last));
            }
            let (start, mut end) = (pos.min(dest), pos.max(dest));
            if motion.is_inclusive()
                && end < content.text_length()
                && content.char_at(end) != Some('\n')
            {
                end += 1;
            }
            Ok(OperatorRange {
                start,
                end,
                lines: None,
            })
        }
        TextTarget::Span { len } => Ok(OperatorRange {
            start: pos,
            end: (pos + len).min(content.text_length()),
            lines: None,
        }),
        TextTarget::Lines { count } => {
            let first = content.line_information_of_offset(pos).number;
            let last = (first + (*count).max(1) - 1).min(last_line(content));
            Ok(line_range(content, first, last))
        }
    }
}

/// Whole lines `first..=last`, terminators included. When the last line has
/// no terminator the preceding newline goes instead.
fn line_range(content: &dyn TextContent, first: usize, last: usize) -> OperatorRange {
    let begin = content.line_information(first).begin_offset;
    let after_last = content.line_information(last).end_offset();
    let (start, end) = if after_last < content.text_length() {
        (begin, content.line_information(last + 1).begin_offset)
    } else {
        (begin.saturating_sub(1), content.text_length())
    };
    OperatorRange {
        start,
        end,
        lines: Some((first, last)),
    }
}

fn indentation(content: &dyn TextContent, line: usize) -> String {
    let info = content.line_information(line);
    content
        .text(info.begin_offset, info.length)
        .chars()
        .take_while(|c| *c == ' ' || *c == '\t')
        .collect()
}

fn paste(editor: &mut EditorAdaptor, before: bool, count: usize) -> Result<(), CommandExecutionError> {
    let name = editor.registers_mut().take_active_register();
    let content = editor.registers().get(name)?.clone();
    let text = content.text.repeat(count.max(1));
    let pos = editor.position().model_offset();
    let line = editor.model().line_information_of_offset(pos);
    debug!(register = %name, before, count, "paste");

    match content.content_type {
        ContentType::Text => {
            let at = if before || line.length == 0 {
                pos
            } else {
                (pos + 1).min(line.end_offset())
            };
            editor.model_content().replace(at, 0, &text);
            editor.move_to(at, true);
        }
        ContentType::Lines => {
            let first_line = if before {
                editor.model_content().replace(line.begin_offset, 0, &text);
                line.number
            } else if line.end_offset() < editor.model().text_length() {
                let next = editor.model().line_information(line.number + 1).begin_offset;
                editor.model_content().replace(next, 0, &text);
                line.number + 1
            } else {
                let body = text.strip_suffix('\n').unwrap_or(&text);
                let end = editor.model().text_length();
                editor.model_content().replace(end, 0, &format!("\n{body}"));
                line.number + 1
            };
            let info = editor.model().line_information(first_line);
            let dest = first_non_blank(editor.model(), &info);
            editor.move_to(dest, true);
        }
    }
    Ok(())
}

fn change_lines(editor: &mut EditorAdaptor, target: &TextTarget) -> Result<(), CommandExecutionError> {
    let (first, last) = match target {
        TextTarget::Span { .. } => {
            return Err(CommandExecutionError::new("Cannot change lines of a span"));
        }
        TextTarget::Motion(motion) if !motion.is_linewise() => {
            let pos = editor.position().model_offset();
            let line = editor.model().line_information_of_offset(pos).number;
            (line, line)
        }
        _ => target_range(editor, target)?.lines.unwrap_or((0, 0)),
    };
    let content = editor.model();
    let begin = content.line_information(first).begin_offset;
    let end = content.line_information(last).end_offset();

    let deleted = RegisterContent::lines(content.text(begin, end - begin));
    let indent = if editor.settings().auto_indent {
        indentation(content, first)
    } else {
        String::new()
    };
    editor.registers_mut().record_delete(deleted);
    editor.model_content().replace(begin, end - begin, &indent);
    editor.move_to(begin + indent.chars().count(), true);
    Ok(())
}

fn open_line(editor: &mut EditorAdaptor, above: bool) -> Result<(), CommandExecutionError> {
    let pos = editor.position().model_offset();
    let line = editor.model().line_information_of_offset(pos);
    let indent = if editor.settings().auto_indent {
        indentation(editor.model(), line.number)
    } else {
        String::new()
    };
    let dest = if above {
        editor
            .model_content()
            .replace(line.begin_offset, 0, &format!("{indent}\n"));
        line.begin_offset + indent.chars().count()
    } else {
        editor
            .model_content()
            .replace(line.end_offset(), 0, &format!("\n{indent}"));
        line.end_offset() + 1 + indent.chars().count()
    };
    editor.move_to(dest, true);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::position::Position;
    use crate::core::register::UNNAMED;
    use crate::core::settings::Settings;

    fn editor(text: &str, cursor: usize) -> EditorAdaptor {
        let mut editor = EditorAdaptor::new(text, Settings::default());
        editor.move_to(cursor, true);
        editor
    }

    #[test]
    fn test_sequence_stops_at_first_failure() {
        let mut ed = editor("abc", 0);
        let seq = Command::Sequence(vec![
            Command::motion(Motion::Right),
            Command::SwitchRegister('z'),
            Command::PasteBefore { count: 1 },
            Command::motion(Motion::Right),
        ]);
        let err = seq.execute(&mut ed).unwrap_err();
        assert_eq!(err.message(), "Nothing in register z");
        assert_eq!(ed.position(), Position::at(1));
    }

    #[test]
    fn test_counted_runs_base_back_to_back() {
        let mut ed = editor("abc", 0);
        ed.registers_mut()
            .set_content('a', RegisterContent::text("xy"));
        let paste = Command::Sequence(vec![
            Command::SwitchRegister('a'),
            Command::PasteBefore { count: 1 },
        ]);
        Command::Counted {
            base: Box::new(paste),
            count: 3,
        }
        .execute(&mut ed)
        .unwrap();
        assert_eq!(ed.text(), "xyxyxyabc");
    }

    #[test]
    fn test_simple_insert_advances_between_runs() {
        let mut ed = editor("abc", 0);
        ed.registers_mut()
            .set_content('a', RegisterContent::text("xy"));
        let body = Command::Sequence(vec![
            Command::SwitchRegister('a'),
            Command::PasteBefore { count: 1 },
        ]);
        Command::SimpleInsert {
            body: Box::new(body.clone()),
            count: 3,
        }
        .execute(&mut ed)
        .unwrap();
        // Without settling on the last pasted character each advance lands
        // inside the previous copy.
        assert_eq!(ed.text(), "xxxyyyabc");

        let mut ed = editor("abc", 0);
        ed.registers_mut()
            .set_content('a', RegisterContent::text("xy"));
        let settled = Command::Sequence(vec![body, Command::MoveRightOverLineBreak(1)]);
        Command::SimpleInsert {
            body: Box::new(settled),
            count: 3,
        }
        .execute(&mut ed)
        .unwrap();
        assert_eq!(ed.text(), "xyxyxyabc");
        assert_eq!(ed.position().model_offset(), 5);
    }

    #[test]
    fn test_with_count_replaces_simple_insert_count() {
        let body = Box::new(Command::PasteBefore { count: 1 });
        let cmd = Command::SimpleInsert { body, count: 2 };
        match cmd.with_count(5) {
            Command::SimpleInsert { count, .. } => assert_eq!(count, 5),
            other => panic!("unexpected {other:?}"),
        }
        let append = Command::Sequence(vec![
            Command::motion(Motion::RightForAppend),
            Command::SimpleInsert {
                body: Box::new(Command::PasteBefore { count: 1 }),
                count: 1,
            },
        ]);
        match append.with_count(4) {
            Command::Sequence(commands) => {
                assert_eq!(commands.len(), 2);
                assert!(matches!(commands[1], Command::SimpleInsert { count: 4, .. }));
            }
            other => panic!("unexpected {other:?}"),
        }
        let counted = Command::OpenLine { above: false }.with_count(3);
        assert!(matches!(counted, Command::Counted { count: 3, .. }));
        assert_eq!(Command::Undo.with_count(1), Command::Undo);
    }

    #[test]
    fn test_repetition() {
        let motion = Command::motion(Motion::WordForward);
        assert_eq!(motion.repetition(), Some(motion.clone()));
        assert_eq!(Command::Undo.repetition(), None);
        let seq = Command::Sequence(vec![Command::Redo, motion.clone()]);
        assert_eq!(seq.repetition(), Some(seq.clone()));
    }

    #[test]
    fn test_opens_line_looks_through_register_switch() {
        let open = Command::OpenLine { above: true };
        assert!(open.opens_line());
        assert!(Command::Sequence(vec![Command::SwitchRegister('a'), open]).opens_line());
        assert!(!Command::motion(Motion::RightForAppend).opens_line());
    }

    #[test]
    fn test_move_right_over_line_break_clamps() {
        let mut ed = editor("ab\ncd", 1);
        Command::MoveRightOverLineBreak(2).execute(&mut ed).unwrap();
        assert_eq!(ed.position().model_offset(), 3);
        Command::MoveRightOverLineBreak(10).execute(&mut ed).unwrap();
        assert_eq!(ed.position().model_offset(), 5);
        Command::MoveRightOverLineBreak(-10).execute(&mut ed).unwrap();
        assert_eq!(ed.position().model_offset(), 0);
    }

    #[test]
    fn test_delete_word_fills_registers() {
        let mut ed = editor("foo bar baz", 4);
        Command::delete_motion(Motion::WordForward, None)
            .execute(&mut ed)
            .unwrap();
        assert_eq!(ed.text(), "foo baz");
        assert_eq!(ed.registers().get(UNNAMED).unwrap().text, "bar ");
        assert_eq!(ed.position().model_offset(), 4);
    }

    #[test]
    fn test_delete_to_line_end_is_inclusive() {
        let mut ed = editor("abc\ndef", 1);
        Command::delete_motion(Motion::LineEnd, None)
            .execute(&mut ed)
            .unwrap();
        assert_eq!(ed.text(), "a\ndef");
    }

    #[test]
    fn test_delete_lines() {
        let mut ed = editor("one\n  two\nthree", 0);
        Command::Delete(TextTarget::Lines { count: 1 })
            .execute(&mut ed)
            .unwrap();
        assert_eq!(ed.text(), "  two\nthree");
        assert_eq!(ed.position().model_offset(), 2);
        let reg = ed.registers().get('1').unwrap();
        assert_eq!(
            (reg.content_type, reg.text.as_str()),
            (ContentType::Lines, "one\n")
        );

        // Deleting the last line takes the newline before it.
        let mut ed = editor("one\ntwo", 5);
        Command::Delete(TextTarget::Lines { count: 1 })
            .execute(&mut ed)
            .unwrap();
        assert_eq!(ed.text(), "one");
        assert_eq!(ed.registers().get(UNNAMED).unwrap().text, "two\n");
    }

    #[test]
    fn test_delete_on_empty_line_is_a_no_op() {
        let mut ed = editor("ab\n\ncd", 3);
        Command::delete_motion(Motion::Right, None)
            .execute(&mut ed)
            .unwrap();
        assert_eq!(ed.text(), "ab\n\ncd");
        assert!(ed.registers().get(UNNAMED).is_err());
    }

    #[test]
    fn test_paste_lines_after_last_line() {
        let mut ed = editor("one\ntwo", 0);
        Command::Yank(TextTarget::Lines { count: 1 })
            .execute(&mut ed)
            .unwrap();
        ed.move_to(5, true);
        Command::PasteAfter { count: 1 }.execute(&mut ed).unwrap();
        assert_eq!(ed.text(), "one\ntwo\none");
        assert_eq!(ed.position().model_offset(), 8);

        Command::PasteBefore { count: 2 }.execute(&mut ed).unwrap();
        assert_eq!(ed.text(), "one\ntwo\none\none\none");
    }

    #[test]
    fn test_change_lines_keeps_indent() {
        let mut ed = editor("a\n    foo\nb", 6);
        Command::ChangeLines(TextTarget::Lines { count: 1 })
            .execute(&mut ed)
            .unwrap();
        assert_eq!(ed.text(), "a\n    \nb");
        assert_eq!(ed.position().model_offset(), 6);
        assert_eq!(ed.registers().get(UNNAMED).unwrap().text, "    foo\n");
    }

    #[test]
    fn test_open_line_below_and_above() {
        let mut ed = editor("  ab\ncd", 2);
        Command::OpenLine { above: false }.execute(&mut ed).unwrap();
        assert_eq!(ed.text(), "  ab\n  \ncd");
        assert_eq!(ed.position().model_offset(), 7);

        let mut ed = editor("  ab", 2);
        Command::OpenLine { above: true }.execute(&mut ed).unwrap();
        assert_eq!(ed.text(), "  \n  ab");
        assert_eq!(ed.position().model_offset(), 2);
    }

    #[test]
    fn test_undo_without_history_fails() {
        let mut ed = editor("abc", 0);
        assert!(Command::Undo.execute(&mut ed).is_err());
        Command::delete_motion(Motion::Right, None)
            .execute(&mut ed)
            .unwrap();
        Command::Undo.execute(&mut ed).unwrap();
        assert_eq!(ed.text(), "abc");
        Command::Redo.execute(&mut ed).unwrap();
        assert_eq!(ed.text(), "bc");
    }
}
