use tracing::trace;

use super::normal::{parse_count, parse_motion, Parse};
use super::{Mode, ModeArgs, INSERT_MODE, LINE_VISUAL_MODE, NORMAL_MODE, VISUAL_MODE};
use crate::core::command::{Command, CommandExecutionError, TextTarget};
use crate::core::cursor::CaretType;
use crate::core::editor::EditorAdaptor;
use crate::core::key::KeyStroke;
use crate::core::keymap::VISUAL_KEYMAP;
use crate::core::motion::{clamp_to_normal, MotionCommand};
use crate::core::register::UNNAMED;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    Delete,
    Yank,
    Change,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum VisualCommand {
    Move(MotionCommand),
    SwapEnds,
    Operate(Operator),
    /// `v` or `V`: `true` asks for the linewise flavour.
    Switch(bool),
}

fn parse(keys: &[KeyStroke]) -> Parse<(Option<char>, VisualCommand)> {
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
    let command = match stroke.character() {
        Some('o') => VisualCommand::SwapEnds,
        Some('d' | 'x') => VisualCommand::Operate(Operator::Delete),
        Some('y') => VisualCommand::Operate(Operator::Yank),
        Some('c' | 's') => VisualCommand::Operate(Operator::Change),
        Some('v') => VisualCommand::Switch(false),
        Some('V') => VisualCommand::Switch(true),
        _ => match parse_motion(keys, i) {
            Parse::Complete((motion, _)) => {
                VisualCommand::Move(MotionCommand::with_count(motion, count))
            }
            Parse::Incomplete => return Parse::Incomplete,
            Parse::Invalid => return Parse::Invalid,
        },
    };
    Parse::Complete((register, command))
}

/// Selection mode. The same type serves characterwise and linewise
/// selection; each flavour is registered under its own name.
#[derive(Debug)]
pub struct VisualMode {
    linewise: bool,
    enabled: bool,
    pending: Vec<KeyStroke>,
    /// Set when switching to the other flavour, so the selection survives.
    keep_selection: bool,
}

impl VisualMode {
    pub fn characterwise() -> Self {
        Self::new(false)
    }

    pub fn linewise() -> Self {
        Self::new(true)
    }

    fn new(linewise: bool) -> Self {
        Self {
            linewise,
            enabled: false,
            pending: Vec::new(),
            keep_selection: false,
        }
    }

    /// The operator target covering the selection, with the cursor moved to
    /// where that target starts.
    fn select_target(&self, editor: &mut EditorAdaptor) -> Option<TextTarget> {
        let (first, last) = editor.selection()?;
        if self.linewise {
            let content = editor.model();
            let first_line = content.line_information_of_offset(first);
            let last_line = content.line_information_of_offset(last).number;
            editor.move_to(first_line.begin_offset, true);
            Some(TextTarget::Lines {
                count: last_line - first_line.number + 1,
            })
        } else {
            let end = (last + 1).min(editor.model().text_length());
            editor.move_to(first, true);
            Some(TextTarget::Span { len: end - first })
        }
    }

    fn operate(
        &self,
        editor: &mut EditorAdaptor,
        operator: Operator,
    ) -> Result<(), CommandExecutionError> {
        let Some(target) = self.select_target(editor) else {
            return Ok(());
        };
        match operator {
            Operator::Delete => {
                let command = Command::Delete(target);
                command.execute(editor)?;
                if let Some(repetition) = command.repetition() {
                    editor.registers_mut().set_last_edit(repetition);
                }
                editor.change_mode(NORMAL_MODE, ModeArgs::new());
            }
            Operator::Yank => {
                let result = Command::Yank(target).execute(editor);
                editor.change_mode(NORMAL_MODE, ModeArgs::new());
                result?;
            }
            Operator::Change => {
                let mut pre_command = match target {
                    TextTarget::Lines { .. } => Command::ChangeLines(target),
                    _ => Command::Delete(target),
                };
                // The register has to outlive this key; insert mode runs the
                // deletion on entry.
                let register = editor.registers().active_register();
                if register != UNNAMED {
                    pre_command =
                        Command::Sequence(vec![Command::SwitchRegister(register), pre_command]);
                }
                editor.change_mode(INSERT_MODE, ModeArgs::new().with_pre_command(pre_command));
            }
        }
        Ok(())
    }

    fn run(
        &mut self,
        editor: &mut EditorAdaptor,
        register: Option<char>,
        command: VisualCommand,
    ) -> Result<(), CommandExecutionError> {
        if let Some(name) = register {
            editor.registers_mut().set_active_register(name)?;
        }
        match command {
            VisualCommand::Move(motion) => {
                Command::Motion(motion).execute(editor)?;
                let pos = editor.position().model_offset();
                let clamped = clamp_to_normal(editor.model(), pos);
                if clamped != pos {
                    editor.move_to(clamped, false);
                }
                Ok(())
            }
            VisualCommand::SwapEnds => {
                if let Some(anchor) = editor.selection_anchor() {
                    let cursor = editor.position().model_offset();
                    editor.set_selection_anchor(Some(cursor));
                    editor.move_to(anchor, true);
                }
                Ok(())
            }
            VisualCommand::Operate(operator) => self.operate(editor, operator),
            VisualCommand::Switch(linewise) if linewise == self.linewise => {
                editor.change_mode(NORMAL_MODE, ModeArgs::new());
                Ok(())
            }
            VisualCommand::Switch(linewise) => {
                self.keep_selection = true;
                let name = if linewise { LINE_VISUAL_MODE } else { VISUAL_MODE };
                editor.change_mode(name, ModeArgs::new());
                Ok(())
            }
        }
    }
}

impl Mode for VisualMode {
    fn name(&self) -> &'static str {
        if self.linewise {
            LINE_VISUAL_MODE
        } else {
            VISUAL_MODE
        }
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn enter_mode(&mut self, editor: &mut EditorAdaptor, _args: ModeArgs) {
        self.enabled = true;
        self.pending.clear();
        if editor.selection_anchor().is_none() {
            let pos = editor.position().model_offset();
            editor.set_selection_anchor(Some(pos));
        }
        editor.cursor_service().set_caret(CaretType::Rectangular);
        let label = if self.linewise {
            "-- VISUAL LINE --"
        } else {
            "-- VISUAL --"
        };
        editor.user_interface().set_mode_label(label);
    }

    fn leave_mode(&mut self, editor: &mut EditorAdaptor) {
        self.enabled = false;
        self.pending.clear();
        if !std::mem::take(&mut self.keep_selection) {
            editor.set_selection_anchor(None);
        }
    }

    fn handle_key(&mut self, editor: &mut EditorAdaptor, stroke: KeyStroke) -> bool {
        if stroke.is_escape() {
            self.pending.clear();
            editor.registers_mut().reset_active_register();
            editor.change_mode(NORMAL_MODE, ModeArgs::new());
            return true;
        }
        self.pending.push(stroke);
        let (register, command) = match parse(&self.pending) {
            Parse::Incomplete => return true,
            Parse::Invalid => {
                trace!(keys = ?self.pending, "no such visual command");
                self.pending.clear();
                return true;
            }
            Parse::Complete(parsed) => parsed,
        };
        self.pending.clear();

        editor.history().begin_compound_change();
        let result = self.run(editor, register, command);
        editor.history().end_compound_change();
        if let Err(e) = result {
            editor.user_interface().set_error_message(e.message());
        }
        editor.registers_mut().reset_active_register();
        true
    }

    fn key_map_name(&self) -> &'static str {
        VISUAL_KEYMAP
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::editor::UserInterfaceService;
    use crate::core::key::parse_keys;
    use crate::core::register::ContentType;
    use crate::core::settings::Settings;

    fn press(mode: &mut VisualMode, editor: &mut EditorAdaptor, notation: &str) {
        for key in parse_keys(notation).unwrap() {
            mode.handle_key(editor, key);
        }
    }

    fn setup(mode: &mut VisualMode, text: &str, cursor: usize) -> EditorAdaptor {
        let mut editor = EditorAdaptor::new(text, Settings::default());
        editor.move_to(cursor, true);
        mode.enter_mode(&mut editor, ModeArgs::new());
        editor
    }

    #[test]
    fn test_enter_anchors_at_cursor() {
        let mut mode = VisualMode::characterwise();
        let mut ed = setup(&mut mode, "hello world", 2);
        assert_eq!(ed.selection(), Some((2, 2)));
        assert_eq!(ed.status().mode_label(), "-- VISUAL --");
        press(&mut mode, &mut ed, "w");
        assert_eq!(ed.selection(), Some((2, 6)));
        mode.leave_mode(&mut ed);
        assert_eq!(ed.selection(), None);
    }

    #[test]
    fn test_delete_selection() {
        let mut mode = VisualMode::characterwise();
        let mut ed = setup(&mut mode, "hello world", 0);
        press(&mut mode, &mut ed, "ed");
        assert_eq!(ed.text(), " world");
        assert_eq!(ed.registers().get(UNNAMED).unwrap().text, "hello");
        assert_eq!(ed.take_mode_change().unwrap().name, NORMAL_MODE);
        assert_eq!(
            ed.registers().last_edit(),
            Some(&Command::Delete(TextTarget::Span { len: 5 }))
        );
    }

    #[test]
    fn test_swap_ends_then_extend_backwards() {
        let mut mode = VisualMode::characterwise();
        let mut ed = setup(&mut mode, "abcdef", 2);
        press(&mut mode, &mut ed, "lo");
        assert_eq!(ed.position().model_offset(), 2);
        assert_eq!(ed.selection_anchor(), Some(3));
        press(&mut mode, &mut ed, "hy");
        assert_eq!(ed.registers().get(UNNAMED).unwrap().text, "bcd");
        assert_eq!(ed.position().model_offset(), 1);
    }

    #[test]
    fn test_linewise_delete() {
        let mut mode = VisualMode::linewise();
        let mut ed = setup(&mut mode, "one\ntwo\nthree", 1);
        assert_eq!(ed.status().mode_label(), "-- VISUAL LINE --");
        press(&mut mode, &mut ed, "jd");
        assert_eq!(ed.text(), "three");
        let reg = ed.registers().get(UNNAMED).unwrap();
        assert_eq!(
            (reg.content_type, reg.text.as_str()),
            (ContentType::Lines, "one\ntwo\n")
        );
    }

    #[test]
    fn test_change_hands_selection_to_insert() {
        let mut mode = VisualMode::characterwise();
        let mut ed = setup(&mut mode, "abcdef", 1);
        press(&mut mode, &mut ed, "lc");
        let change = ed.take_mode_change().unwrap();
        assert_eq!(change.name, INSERT_MODE);
        assert_eq!(
            change.args.pre_command,
            Some(Command::Delete(TextTarget::Span { len: 2 }))
        );
        assert_eq!(ed.position().model_offset(), 1);
        assert_eq!(ed.text(), "abcdef");
    }

    #[test]
    fn test_change_into_register() {
        let mut mode = VisualMode::characterwise();
        let mut ed = setup(&mut mode, "abcdef", 0);
        press(&mut mode, &mut ed, "\"qc");
        let pre = ed.take_mode_change().unwrap().args.pre_command.unwrap();
        assert_eq!(ed.registers().active_register(), UNNAMED);
        pre.execute(&mut ed).unwrap();
        assert_eq!(ed.registers().get('q').unwrap().text, "a");
        assert_eq!(ed.text(), "bcdef");
    }

    #[test]
    fn test_switching_flavour_keeps_selection() {
        let mut mode = VisualMode::characterwise();
        let mut ed = setup(&mut mode, "abc\ndef", 1);
        press(&mut mode, &mut ed, "V");
        assert_eq!(ed.take_mode_change().unwrap().name, LINE_VISUAL_MODE);
        mode.leave_mode(&mut ed);
        assert_eq!(ed.selection_anchor(), Some(1));

        let mut line_mode = VisualMode::linewise();
        line_mode.enter_mode(&mut ed, ModeArgs::new());
        press(&mut line_mode, &mut ed, "V");
        assert_eq!(ed.take_mode_change().unwrap().name, NORMAL_MODE);
    }

    #[test]
    fn test_escape_returns_to_normal() {
        let mut mode = VisualMode::characterwise();
        let mut ed = setup(&mut mode, "abc", 0);
        press(&mut mode, &mut ed, "l<Esc>");
        assert_eq!(ed.take_mode_change().unwrap().name, NORMAL_MODE);
        assert_eq!(ed.text(), "abc");
    }
}
