//! The text content contract the modes and commands work against.
//!
//! Hosts own the actual storage. All offsets passed through one
//! `TextContent` belong to that content's [`Space`]; callers never mix model
//! and view offsets in a single call.

use super::position::{Position, Space};

/// Where a line starts and how long it is, excluding its terminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineInformation {
    /// Zero-based line number.
    pub number: usize,
    pub begin_offset: usize,
    pub length: usize,
}

impl LineInformation {
    pub fn end_offset(&self) -> usize {
        self.begin_offset + self.length
    }
}

/// Parameters of a search through text content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Search {
    pub keyword: String,
    pub backward: bool,
    /// Treat `keyword` as a regular expression.
    pub regex: bool,
    pub case_sensitive: bool,
}

impl Search {
    pub fn forward(keyword: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            backward: false,
            regex: false,
            case_sensitive: true,
        }
    }

    pub fn backward(keyword: impl Into<String>) -> Self {
        Self {
            backward: true,
            ..Self::forward(keyword)
        }
    }
}

/// A match found by [`TextContent::find`], as `[start, end)` offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchResult {
    pub start: usize,
    pub end: usize,
}

/// Read/write/search surface over a line-oriented buffer.
///
/// `replace` with `length == 0` is a pure insertion. Implementations do not
/// move any cursor; whoever edits repositions the cursor afterwards.
pub trait TextContent {
    fn space(&self) -> Space;

    fn line_information(&self, line: usize) -> LineInformation;

    fn line_information_of_offset(&self, offset: usize) -> LineInformation;

    fn number_of_lines(&self) -> usize;

    fn text(&self, offset: usize, length: usize) -> String;

    fn replace(&mut self, offset: usize, length: usize, replacement: &str);

    /// Inserts `text` at `offset`, letting the implementation re-indent
    /// after newlines when it knows how to.
    fn insert_preferring_smart_indent(&mut self, offset: usize, text: &str);

    fn text_length(&self) -> usize;

    /// Searches from `start`: forward searches match at or after it, backward
    /// searches strictly before it. There is no wrap-around.
    fn find(&self, search: &Search, start: Position) -> Option<SearchResult>;

    /// The character at `offset`, if any.
    fn char_at(&self, offset: usize) -> Option<char> {
        self.text(offset, 1).chars().next()
    }
}
