//! Cursor motions, evaluated against model-space text content.

use super::content::{LineInformation, TextContent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Motion {
    Left,
    Right,
    Up,
    Down,
    WordForward,
    WordBackward,
    WordEnd,
    /// `cw`: to the end of the word under the cursor rather than the start
    /// of the next one.
    ChangeWord,
    LineStart,
    FirstNonBlank,
    LineEnd,
    DocumentStart,
    DocumentEnd,
    /// One right, allowed to land past the last character (`a`).
    RightForAppend,
    /// Past the last character of the line (`A`).
    LineEndForAppend,
}

/// A motion with an optional count, as typed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MotionCommand {
    pub motion: Motion,
    pub count: Option<usize>,
}

impl MotionCommand {
    pub fn new(motion: Motion) -> Self {
        Self {
            motion,
            count: None,
        }
    }

    pub fn with_count(motion: Motion, count: Option<usize>) -> Self {
        Self { motion, count }
    }

    pub fn count(&self) -> usize {
        self.count.unwrap_or(1).max(1)
    }

    /// Operators over this motion act on whole lines.
    pub fn is_linewise(&self) -> bool {
        matches!(
            self.motion,
            Motion::Up | Motion::Down | Motion::DocumentStart | Motion::DocumentEnd
        )
    }

    /// Operators over this motion include the destination character.
    pub fn is_inclusive(&self) -> bool {
        matches!(
            self.motion,
            Motion::WordEnd | Motion::ChangeWord | Motion::LineEnd
        )
    }

    /// Vertical motions keep aiming for the remembered column.
    pub fn updates_sticky_column(&self) -> bool {
        !matches!(self.motion, Motion::Up | Motion::Down)
    }

    /// Where the motion lands when started at `from`.
    ///
    /// With `for_operator` the cursor may reach the end of a line (so `x`
    /// on the last character still has something to delete) and `w` stops at
    /// the end of the line its last word is on.
    pub fn destination(
        &self,
        content: &dyn TextContent,
        from: usize,
        sticky_column: usize,
        for_operator: bool,
    ) -> usize {
        let count = self.count();
        let from = from.min(content.text_length());
        let line = content.line_information_of_offset(from);
        match self.motion {
            Motion::Left => from.saturating_sub(count).max(line.begin_offset),
            Motion::Right => {
                let limit = if for_operator {
                    line.end_offset()
                } else {
                    last_column_offset(&line)
                };
                from.saturating_add(count).min(limit.max(from))
            }
            Motion::RightForAppend => {
                if line.length == 0 {
                    from
                } else {
                    (from + 1).min(line.end_offset())
                }
            }
            Motion::Up => {
                let target = line.number.saturating_sub(count);
                column_on_line(content, target, sticky_column)
            }
            Motion::Down => {
                let target = (line.number + count).min(last_line(content));
                column_on_line(content, target, sticky_column)
            }
            Motion::LineStart => line.begin_offset,
            Motion::FirstNonBlank => first_non_blank(content, &line),
            Motion::LineEnd => {
                let target = (line.number + count - 1).min(last_line(content));
                last_column_offset(&content.line_information(target))
            }
            Motion::LineEndForAppend => line.end_offset(),
            Motion::DocumentStart | Motion::DocumentEnd => {
                let target = match self.count {
                    Some(n) => n.max(1) - 1,
                    None if self.motion == Motion::DocumentStart => 0,
                    None => last_line(content),
                }
                .min(last_line(content));
                first_non_blank(content, &content.line_information(target))
            }
            Motion::WordForward | Motion::WordBackward | Motion::WordEnd | Motion::ChangeWord => {
                let chars: Vec<char> = content.text(0, content.text_length()).chars().collect();
                word_destination(content, &chars, self.motion, from, count, for_operator)
            }
        }
    }
}

fn word_destination(
    content: &dyn TextContent,
    chars: &[char],
    motion: Motion,
    from: usize,
    count: usize,
    for_operator: bool,
) -> usize {
    let mut pos = from;
    for i in 0..count {
        let last = i + 1 == count;
        let prev = pos;
        pos = match motion {
            Motion::WordForward => word_forward(chars, pos, for_operator),
            Motion::WordBackward => word_backward(chars, pos),
            Motion::WordEnd => word_end(chars, pos),
            _ if i == 0 => change_word_end(chars, pos),
            _ => word_end(chars, pos),
        };
        if motion == Motion::WordForward && for_operator && last {
            let prev_line = content.line_information_of_offset(prev);
            if pos > prev_line.end_offset() && prev < prev_line.end_offset() {
                pos = prev_line.end_offset();
            }
        }
    }
    pos
}

pub fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

fn word_forward(chars: &[char], mut pos: usize, for_operator: bool) -> usize {
    let total = chars.len();
    if pos >= total {
        return total;
    }

    let first = chars[pos];
    if is_word_char(first) {
        while pos < total && is_word_char(chars[pos]) {
            pos += 1;
        }
    } else if !first.is_whitespace() {
        while pos < total && !is_word_char(chars[pos]) && !chars[pos].is_whitespace() {
            pos += 1;
        }
    }

    while pos < total && chars[pos].is_whitespace() {
        pos += 1;
    }

    if pos >= total && !for_operator {
        total.saturating_sub(1)
    } else {
        pos
    }
}

fn word_backward(chars: &[char], mut pos: usize) -> usize {
    if pos == 0 {
        return 0;
    }
    pos = (pos - 1).min(chars.len().saturating_sub(1));

    while pos > 0 && chars[pos].is_whitespace() {
        pos -= 1;
    }

    if is_word_char(chars[pos]) {
        while pos > 0 && is_word_char(chars[pos - 1]) {
            pos -= 1;
        }
    } else {
        while pos > 0 && !is_word_char(chars[pos - 1]) && !chars[pos - 1].is_whitespace() {
            pos -= 1;
        }
    }
    pos
}

fn word_end(chars: &[char], mut pos: usize) -> usize {
    let total = chars.len();
    if pos + 1 >= total {
        return pos.min(total.saturating_sub(1));
    }
    pos += 1;

    while pos + 1 < total && chars[pos].is_whitespace() {
        pos += 1;
    }

    if is_word_char(chars[pos]) {
        while pos + 1 < total && is_word_char(chars[pos + 1]) {
            pos += 1;
        }
    } else {
        while pos + 1 < total && !is_word_char(chars[pos + 1]) && !chars[pos + 1].is_whitespace()
        {
            pos += 1;
        }
    }
    pos
}

/// End of the run of same-class characters under `pos`.
fn change_word_end(chars: &[char], pos: usize) -> usize {
    let Some(&first) = chars.get(pos) else {
        return pos;
    };
    let same_class = |c: char| {
        if first.is_whitespace() {
            c.is_whitespace() && c != '\n'
        } else if is_word_char(first) {
            is_word_char(c)
        } else {
            !is_word_char(c) && !c.is_whitespace()
        }
    };
    let mut end = pos;
    while end + 1 < chars.len() && same_class(chars[end + 1]) {
        end += 1;
    }
    end
}

/// Index of the last line that holds content; a trailing newline does not
/// start a line of its own.
pub fn last_line(content: &dyn TextContent) -> usize {
    let lines = content.number_of_lines();
    if lines > 1 && content.line_information(lines - 1).length == 0 {
        let len = content.text_length();
        if len > 0 && content.char_at(len - 1) == Some('\n') {
            return lines - 2;
        }
    }
    lines.saturating_sub(1)
}

/// The rightmost offset the normal-mode cursor may sit on in `line`.
pub fn last_column_offset(line: &LineInformation) -> usize {
    if line.length == 0 {
        line.begin_offset
    } else {
        line.end_offset() - 1
    }
}

/// Clamps `offset` to a position the normal-mode cursor may occupy.
pub fn clamp_to_normal(content: &dyn TextContent, offset: usize) -> usize {
    let line = content.line_information_of_offset(offset.min(content.text_length()));
    offset.clamp(line.begin_offset, last_column_offset(&line))
}

pub fn first_non_blank(content: &dyn TextContent, line: &LineInformation) -> usize {
    let text = content.text(line.begin_offset, line.length);
    let indent = text.chars().take_while(|c| *c == ' ' || *c == '\t').count();
    (line.begin_offset + indent).min(last_column_offset(line))
}

fn column_on_line(content: &dyn TextContent, line: usize, column: usize) -> usize {
    let info = content.line_information(line);
    info.begin_offset.saturating_add(column).min(last_column_offset(&info))
}
