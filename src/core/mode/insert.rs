use tracing::debug;

use super::{Mode, ModeArgs, INSERT_MODE, NORMAL_MODE};
use crate::core::command::Command;
use crate::core::cursor::CaretType;
use crate::core::editor::EditorAdaptor;
use crate::core::key::{KeyStroke, SpecialKey};
use crate::core::keymap::INSERT_KEYMAP;
use crate::core::motion::Motion;
use crate::core::position::Position;
use crate::core::register::RegisterContent;

/// State of one insert session, from `enter_mode` to `leave_mode`.
#[derive(Debug, Clone)]
struct InsertSession {
    pre_command: Option<Command>,
    count: usize,
    /// Where the text that `.` will replay starts.
    start_edit_position: Position,
    /// Whether the session opened a locked compound change.
    atomic: bool,
}

/// Typing mode. The host inserts the characters; this mode only tracks
/// where the session's text starts so that leaving can record it for `.`
/// and replay it for a count.
#[derive(Debug, Default)]
pub struct InsertMode {
    enabled: bool,
    session: Option<InsertSession>,
    /// The last stroke went to the host without being tracked, so the edit
    /// start follows wherever the host left the cursor.
    resync_after_host: bool,
}

impl InsertMode {
    pub fn new() -> Self {
        Self::default()
    }

    fn allowed(editor: &EditorAdaptor, stroke: &KeyStroke) -> bool {
        match stroke.special_key() {
            Some(key) => {
                SpecialKey::ALLOWED_FOR_INSERT.contains(&key)
                    || (editor.settings().allow_arrows_in_insert
                        && SpecialKey::ARROWS.contains(&key))
            }
            None => !stroke.is_ctrl(),
        }
    }

    fn reset_start_edit_position(&mut self, editor: &EditorAdaptor) {
        if let Some(session) = self.session.as_mut() {
            session.start_edit_position = editor.position();
        }
    }

    /// Text between the session start and the cursor.
    fn typed_text(editor: &EditorAdaptor, start: Position) -> String {
        let start = start.model_offset();
        let end = editor.position().model_offset();
        if end <= start {
            return String::new();
        }
        editor.model().text(start, end - start)
    }

    /// Replays the last insert: put the recorded text before the cursor and
    /// settle on its last character.
    fn paste_typed_text(editor: &EditorAdaptor, len: usize) -> Vec<Command> {
        vec![
            Command::SwitchRegister(editor.registers().last_edit_register()),
            Command::PasteBefore { count: 1 },
            Command::MoveRightOverLineBreak(len as isize - 1),
        ]
    }

    /// Stores the command `.` repeats and replays the text for the count.
    ///
    /// `stepped_back` is how far the exit move went left. It is zero when the
    /// text ends in a line break, since the cursor already sits at a line
    /// start.
    fn repeat_insert(
        editor: &mut EditorAdaptor,
        session: &InsertSession,
        typed: &str,
        stepped_back: usize,
    ) {
        let len = typed.chars().count();
        let body = Self::paste_typed_text(editor, len);
        let count = session.count;

        let pre = session
            .pre_command
            .as_ref()
            .map(|pre| pre.repetition().unwrap_or_else(|| pre.clone()));
        let replay = match pre {
            // Each copy gets a line of its own.
            Some(pre) if pre.opens_line() => {
                let mut steps = vec![pre];
                steps.extend(body);
                let recipe = Command::Sequence(steps);
                editor.registers_mut().set_last_edit(recipe.with_count(count));
                Command::Counted {
                    base: Box::new(recipe),
                    count: count.saturating_sub(1),
                }
            }
            pre => {
                let body = Box::new(Command::Sequence(body));
                let insert = Command::SimpleInsert {
                    body: body.clone(),
                    count,
                };
                let recorded = match pre {
                    Some(pre) => Command::Sequence(vec![pre, insert]),
                    None => insert,
                };
                editor.registers_mut().set_last_edit(recorded);
                if typed.is_empty() {
                    return;
                }
                Command::Sequence(vec![
                    Command::MoveRightOverLineBreak(stepped_back as isize),
                    Command::SimpleInsert {
                        body,
                        count: count.saturating_sub(1),
                    },
                ])
            }
        };

        if count > 1 {
            debug!(count, "replaying insert");
            if let Err(e) = replay.execute(editor) {
                editor.user_interface().set_error_message(e.message());
            }
        }
    }
}

impl Mode for InsertMode {
    fn name(&self) -> &'static str {
        INSERT_MODE
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn enter_mode(&mut self, editor: &mut EditorAdaptor, args: ModeArgs) {
        if self.enabled {
            return;
        }
        let ModeArgs { pre_command, count } = args;
        if let Some(command) = &pre_command {
            if let Err(e) = command.execute(editor) {
                editor.user_interface().set_error_message(e.message());
            }
        }

        let atomic = editor.settings().atomic_inserts;
        self.enabled = true;
        if atomic {
            editor.history().begin_compound_change();
            editor.history().lock();
        }
        editor.cursor_service().set_caret(CaretType::VerticalBar);
        editor.user_interface().set_mode_label("-- INSERT --");
        self.resync_after_host = false;
        self.session = Some(InsertSession {
            pre_command,
            count: count.unwrap_or(1).max(1),
            start_edit_position: editor.position(),
            atomic,
        });
        debug!(position = ?editor.position(), "entered insert mode");
    }

    fn leave_mode(&mut self, editor: &mut EditorAdaptor) {
        if !self.enabled {
            return;
        }
        self.enabled = false;
        let Some(session) = self.session.take() else {
            return;
        };

        let typed = Self::typed_text(editor, session.start_edit_position);
        let register = editor.registers().last_edit_register();
        editor
            .registers_mut()
            .set_content(register, RegisterContent::text(typed.clone()));

        let exit = editor.position().model_offset();
        if let Err(e) = Command::motion(Motion::Left).execute(editor) {
            editor.user_interface().set_error_message(e.message());
        }
        let stepped_back = exit.saturating_sub(editor.position().model_offset());

        Self::repeat_insert(editor, &session, &typed, stepped_back);

        if session.atomic {
            editor.history().unlock();
            editor.history().end_compound_change();
        }
        debug!(typed = %typed, count = session.count, "left insert mode");
    }

    fn handle_key(&mut self, editor: &mut EditorAdaptor, stroke: KeyStroke) -> bool {
        if stroke.is_escape() {
            editor.change_mode(NORMAL_MODE, ModeArgs::default());
            return true;
        }
        if !Self::allowed(editor, &stroke) {
            self.reset_start_edit_position(editor);
            self.resync_after_host = true;
        } else if stroke.is_virtual() {
            if let Some(c) = stroke.character() {
                let pos = editor.position();
                let mut buf = [0u8; 4];
                editor
                    .model_content()
                    .replace(pos.model_offset(), 0, c.encode_utf8(&mut buf));
                editor.set_position(pos.add_offset(1), false);
                return true;
            }
        }
        false
    }

    fn key_map_name(&self) -> &'static str {
        INSERT_KEYMAP
    }

    fn after_host_key(&mut self, editor: &mut EditorAdaptor) {
        if std::mem::take(&mut self.resync_after_host) {
            self.reset_start_edit_position(editor);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::command::TextTarget;
    use crate::core::content::TextContent;
    use crate::core::cursor::CursorService;
    use crate::core::editor::UserInterfaceService;
    use crate::core::key::parse_keys;
    use crate::core::register::LAST_INSERT;
    use crate::core::settings::Settings;

    fn editor(text: &str, cursor: usize) -> EditorAdaptor {
        let mut editor = EditorAdaptor::new(text, Settings::default());
        editor.move_to(cursor, true);
        editor
    }

    /// Stands in for the host inserting typed characters.
    fn type_text(editor: &mut EditorAdaptor, text: &str) {
        let pos = editor.position().model_offset();
        editor.model_content().replace(pos, 0, text);
        editor.move_to(pos + text.chars().count(), true);
    }

    fn last_insert(editor: &EditorAdaptor) -> String {
        editor.registers().get(LAST_INSERT).unwrap().text.clone()
    }

    #[test]
    fn test_single_insert_records_text() {
        let mut ed = editor("hello world", 5);
        let mut mode = InsertMode::new();
        mode.enter_mode(&mut ed, ModeArgs::new());
        assert!(mode.is_enabled());
        assert_eq!(ed.cursor().caret(), CaretType::VerticalBar);

        type_text(&mut ed, "ab");
        mode.leave_mode(&mut ed);
        assert!(!mode.is_enabled());
        assert_eq!(ed.text(), "helloab world");
        assert_eq!(last_insert(&ed), "ab");
        assert_eq!(ed.position().model_offset(), 6);
    }

    #[test]
    fn test_count_replays_contiguously() {
        let mut ed = editor("hello world", 5);
        let mut mode = InsertMode::new();
        mode.enter_mode(&mut ed, ModeArgs::new().with_count(Some(3)));
        type_text(&mut ed, "ab");
        mode.leave_mode(&mut ed);
        assert_eq!(ed.text(), "helloababab world");
        assert_eq!(ed.position().model_offset(), 10);
        assert_eq!(last_insert(&ed), "ab");
        assert!(matches!(
            ed.registers().last_edit(),
            Some(Command::SimpleInsert { count: 3, .. })
        ));
    }

    #[test]
    fn test_count_with_append_pre_command() {
        let mut ed = editor("xyz", 0);
        let mut mode = InsertMode::new();
        let args = ModeArgs::new()
            .with_pre_command(Command::motion(Motion::RightForAppend))
            .with_count(Some(3));
        mode.enter_mode(&mut ed, args);
        assert_eq!(ed.position().model_offset(), 1);
        type_text(&mut ed, "ab");
        mode.leave_mode(&mut ed);
        assert_eq!(ed.text(), "xabababyz");
        assert_eq!(ed.position().model_offset(), 6);
        match ed.registers().last_edit() {
            Some(Command::Sequence(steps)) => {
                assert_eq!(steps[0], Command::motion(Motion::RightForAppend));
                assert!(matches!(steps[1], Command::SimpleInsert { count: 3, .. }));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_count_copies_stay_contiguous_after_line_break() {
        let mut ed = editor("abc", 0);
        let mut mode = InsertMode::new();
        mode.enter_mode(&mut ed, ModeArgs::new().with_count(Some(3)));
        type_text(&mut ed, "x\n");
        mode.leave_mode(&mut ed);
        assert_eq!(ed.text(), "x\nx\nx\nabc");

        let mut ed = editor("abc", 0);
        let args = ModeArgs::new()
            .with_pre_command(Command::motion(Motion::RightForAppend))
            .with_count(Some(3));
        mode.enter_mode(&mut ed, args);
        type_text(&mut ed, "x\n");
        mode.leave_mode(&mut ed);
        assert_eq!(ed.text(), "ax\nx\nx\nbc");
    }

    #[test]
    fn test_open_line_reopens_for_each_copy() {
        let mut ed = editor("a\nb", 0);
        let mut mode = InsertMode::new();
        let args = ModeArgs::new()
            .with_pre_command(Command::OpenLine { above: false })
            .with_count(Some(2));
        mode.enter_mode(&mut ed, args);
        type_text(&mut ed, "hi");
        mode.leave_mode(&mut ed);
        assert_eq!(ed.text(), "a\nhi\nhi\nb");
        assert!(matches!(
            ed.registers().last_edit(),
            Some(Command::Counted { count: 2, .. })
        ));
    }

    #[test]
    fn test_repeating_empty_insert_steps_left() {
        let mut ed = editor("abc", 2);
        let mut mode = InsertMode::new();
        mode.enter_mode(&mut ed, ModeArgs::new());
        mode.leave_mode(&mut ed);
        assert_eq!(ed.position().model_offset(), 1);
        let repeat = ed.registers().last_edit().cloned().unwrap();
        repeat.execute(&mut ed).unwrap();
        assert_eq!(ed.text(), "abc");
        assert_eq!(ed.position().model_offset(), 0);
    }

    #[test]
    fn test_reentry_is_a_noop() {
        let mut ed = editor("hello", 2);
        let mut mode = InsertMode::new();
        mode.enter_mode(&mut ed, ModeArgs::new());
        type_text(&mut ed, "X");
        let again = ModeArgs::new()
            .with_pre_command(Command::motion(Motion::LineStart))
            .with_count(Some(4));
        mode.enter_mode(&mut ed, again);
        assert_eq!(ed.position().model_offset(), 3);
        mode.leave_mode(&mut ed);
        assert_eq!(ed.text(), "heXllo");
        assert_eq!(last_insert(&ed), "X");
    }

    #[test]
    fn test_escape_and_ctrl_bracket_request_normal_mode() {
        for notation in ["<Esc>", "<C-[>"] {
            let mut ed = editor("abc", 0);
            let mut mode = InsertMode::new();
            mode.enter_mode(&mut ed, ModeArgs::new());
            let stroke = parse_keys(notation).unwrap()[0];
            assert!(mode.handle_key(&mut ed, stroke));
            assert_eq!(ed.take_mode_change().unwrap().name, NORMAL_MODE);
        }
    }

    #[test]
    fn test_disallowed_stroke_resets_anchor() {
        let mut settings = Settings::default();
        settings.allow_arrows_in_insert = false;
        let mut ed = EditorAdaptor::new("hello world", settings);
        ed.move_to(0, true);
        let mut mode = InsertMode::new();
        mode.enter_mode(&mut ed, ModeArgs::new());
        type_text(&mut ed, "zz");

        let right = KeyStroke::special(SpecialKey::Right);
        assert!(!mode.handle_key(&mut ed, right));
        // The host moves the cursor, then the anchor follows it.
        ed.move_to(8, true);
        mode.after_host_key(&mut ed);

        type_text(&mut ed, "ab");
        mode.leave_mode(&mut ed);
        assert_eq!(last_insert(&ed), "ab");
    }

    #[test]
    fn test_ctrl_strokes_are_not_allowed() {
        let mut ed = editor("abc", 1);
        let mut mode = InsertMode::new();
        mode.enter_mode(&mut ed, ModeArgs::new());
        type_text(&mut ed, "q");
        assert!(!mode.handle_key(&mut ed, KeyStroke::ctrl('w')));
        mode.after_host_key(&mut ed);
        mode.leave_mode(&mut ed);
        assert_eq!(last_insert(&ed), "");
    }

    #[test]
    fn test_allowed_keys_are_left_to_the_host() {
        let mut ed = editor("abc", 1);
        let mut mode = InsertMode::new();
        mode.enter_mode(&mut ed, ModeArgs::new());
        assert!(!mode.handle_key(&mut ed, KeyStroke::char('x')));
        assert!(!mode.handle_key(&mut ed, KeyStroke::special(SpecialKey::Return)));
        assert_eq!(ed.text(), "abc");
    }

    #[test]
    fn test_virtual_characters_are_inserted_directly() {
        let mut ed = editor("ac", 1);
        let mut mode = InsertMode::new();
        mode.enter_mode(&mut ed, ModeArgs::new());
        assert!(mode.handle_key(&mut ed, KeyStroke::char('b').into_virtual()));
        assert_eq!(ed.text(), "abc");
        assert_eq!(ed.position().model_offset(), 2);
        assert_eq!(ed.sticky_column(), 1);
        mode.leave_mode(&mut ed);
        assert_eq!(last_insert(&ed), "b");
    }

    #[test]
    fn test_failing_pre_command_still_enters() {
        let mut ed = editor("abc", 0);
        let mut mode = InsertMode::new();
        let failing = Command::Sequence(vec![
            Command::SwitchRegister('q'),
            Command::PasteBefore { count: 1 },
        ]);
        mode.enter_mode(&mut ed, ModeArgs::new().with_pre_command(failing));
        assert!(mode.is_enabled());
        assert_eq!(ed.cursor().caret(), CaretType::VerticalBar);
        assert_eq!(ed.status().error_message(), Some("Nothing in register q"));
    }

    #[test]
    fn test_change_pre_command_is_replayable() {
        let mut ed = editor("foo bar", 0);
        let mut mode = InsertMode::new();
        let change = Command::Delete(TextTarget::Motion(
            crate::core::motion::MotionCommand::new(Motion::ChangeWord),
        ));
        mode.enter_mode(&mut ed, ModeArgs::new().with_pre_command(change));
        type_text(&mut ed, "baz");
        mode.leave_mode(&mut ed);
        assert_eq!(ed.text(), "baz bar");
        assert_eq!(ed.position().model_offset(), 2);

        ed.move_to(4, true);
        let repeat = ed.registers().last_edit().cloned().unwrap();
        repeat.execute(&mut ed).unwrap();
        assert_eq!(ed.text(), "baz baz");
    }

    #[test]
    fn test_atomic_session_is_one_undo_step() {
        let mut ed = editor("abc", 0);
        let mut mode = InsertMode::new();
        mode.enter_mode(&mut ed, ModeArgs::new().with_count(Some(2)));
        type_text(&mut ed, "x");
        type_text(&mut ed, "y");
        mode.leave_mode(&mut ed);
        assert_eq!(ed.text(), "xyxyabc");
        assert_eq!(ed.buffer().history().undo_count(), 1);
        assert!(!ed.buffer().history().is_locked());
        assert_eq!(ed.undo(), Some(0));
        assert_eq!(ed.text(), "abc");
    }

    #[test]
    fn test_leaving_at_line_start_keeps_cursor() {
        let mut ed = editor("ab\ncd", 3);
        let mut mode = InsertMode::new();
        mode.enter_mode(&mut ed, ModeArgs::new());
        mode.leave_mode(&mut ed);
        assert_eq!(ed.position().model_offset(), 3);
        assert_eq!(ed.model().text_length(), 5);
    }
}
