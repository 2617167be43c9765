use std::fmt;

use regex::RegexBuilder;
use ropey::Rope;
use tracing::warn;

use super::content::{LineInformation, Search, SearchResult, TextContent};
use super::history::History;
use super::position::{Position, Space};

/// Rope-backed document in model space.
///
/// Every change goes through [`TextContent::replace`], which snapshots the
/// previous text into the buffer's [`History`].
#[derive(Debug, Clone)]
pub struct Buffer {
    pub content: Rope,
    history: History,
    /// Copy the current line's indentation after inserted newlines.
    pub auto_indent: bool,
}

impl Buffer {
    pub fn new() -> Self {
        Self {
            content: Rope::new(),
            history: History::default(),
            auto_indent: true,
        }
    }

    pub fn from_text(text: &str) -> Self {
        Self {
            content: Rope::from_str(text),
            ..Self::new()
        }
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut History {
        &mut self.history
    }

    pub fn len_chars(&self) -> usize {
        self.content.len_chars()
    }

    /// Restores the text before the last undo step. Returns the offset the
    /// cursor should go to.
    pub fn undo(&mut self) -> Option<usize> {
        let snapshot = self.history.undo(&self.content)?;
        self.content = snapshot.text;
        Some(snapshot.offset.min(self.content.len_chars()))
    }

    pub fn redo(&mut self) -> Option<usize> {
        let snapshot = self.history.redo(&self.content)?;
        self.content = snapshot.text;
        Some(snapshot.offset.min(self.content.len_chars()))
    }

    fn clamp_span(&self, offset: usize, length: usize) -> (usize, usize) {
        let len = self.content.len_chars();
        let start = offset.min(len);
        let end = start.saturating_add(length).min(len);
        (start, end)
    }

    /// Leading whitespace of the line containing `offset`, up to `offset`.
    fn indentation_at(&self, offset: usize) -> String {
        let line = self.content.char_to_line(offset.min(self.content.len_chars()));
        let start = self.content.line_to_char(line);
        self.content
            .slice(start..offset.max(start))
            .chars()
            .take_while(|c| *c == ' ' || *c == '\t')
            .collect()
    }
}

impl Default for Buffer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.content)
    }
}

/// Line information for `line` of `rope`, without the terminator.
pub(crate) fn rope_line_information(rope: &Rope, line: usize) -> LineInformation {
    let line = line.min(rope.len_lines().saturating_sub(1));
    let begin_offset = rope.line_to_char(line);
    let slice = rope.line(line);
    let mut length = slice.len_chars();
    if length > 0 && slice.char(length - 1) == '\n' {
        length -= 1;
        if length > 0 && slice.char(length - 1) == '\r' {
            length -= 1;
        }
    }
    LineInformation {
        number: line,
        begin_offset,
        length,
    }
}

/// Runs `search` over `text`, reporting char offsets relative to `base`.
pub(crate) fn search_text(
    text: &str,
    base: usize,
    search: &Search,
    forward_from: usize,
) -> Option<SearchResult> {
    let pattern = if search.regex {
        search.keyword.clone()
    } else {
        regex::escape(&search.keyword)
    };
    let re = match RegexBuilder::new(&pattern)
        .case_insensitive(!search.case_sensitive)
        .multi_line(true)
        .build()
    {
        Ok(re) => re,
        Err(e) => {
            warn!(pattern = %search.keyword, error = %e, "invalid search pattern");
            return None;
        }
    };
    let to_chars = |byte: usize| text[..byte].chars().count();
    let found = if search.backward {
        re.find_iter(text)
            .filter(|m| to_chars(m.start()) < forward_from)
            .last()
    } else {
        let from_byte = text
            .char_indices()
            .nth(forward_from)
            .map(|(b, _)| b)
            .unwrap_or(text.len());
        re.find_at(text, from_byte)
    }?;
    Some(SearchResult {
        start: base + to_chars(found.start()),
        end: base + to_chars(found.end()),
    })
}

impl TextContent for Buffer {
    fn space(&self) -> Space {
        Space::Model
    }

    fn line_information(&self, line: usize) -> LineInformation {
        rope_line_information(&self.content, line)
    }

    fn line_information_of_offset(&self, offset: usize) -> LineInformation {
        let offset = offset.min(self.content.len_chars());
        rope_line_information(&self.content, self.content.char_to_line(offset))
    }

    fn number_of_lines(&self) -> usize {
        self.content.len_lines()
    }

    fn text(&self, offset: usize, length: usize) -> String {
        let (start, end) = self.clamp_span(offset, length);
        self.content.slice(start..end).to_string()
    }

    fn replace(&mut self, offset: usize, length: usize, replacement: &str) {
        let (start, end) = self.clamp_span(offset, length);
        if start == end && replacement.is_empty() {
            return;
        }
        self.history.record(&self.content, start);
        if start < end {
            self.content.remove(start..end);
        }
        if !replacement.is_empty() {
            self.content.insert(start, replacement);
        }
    }

    fn insert_preferring_smart_indent(&mut self, offset: usize, text: &str) {
        if self.auto_indent && text.contains('\n') {
            let indent = self.indentation_at(offset);
            let indented = text.replace('\n', &format!("\n{indent}"));
            self.replace(offset, 0, &indented);
        } else {
            self.replace(offset, 0, text);
        }
    }

    fn text_length(&self) -> usize {
        self.content.len_chars()
    }

    fn find(&self, search: &Search, start: Position) -> Option<SearchResult> {
        let text = self.content.to_string();
        let from = start.model_offset().min(self.content.len_chars());
        search_text(&text, 0, search, from)
    }
}
