use ropey::Rope;

use super::buffer::{rope_line_information, search_text, Buffer};
use super::content::{LineInformation, Search, SearchResult, TextContent};
use super::position::{Position, Space};

/// A closed fold region. Lines `start+1 ..= end` are hidden; `start` is the
/// visible header line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoldRegion {
    /// Fold header line (always visible).
    pub start: usize,
    /// Last hidden line (inclusive). Must satisfy `end > start`.
    pub end: usize,
}

/// Per-window presentation state that defines the view offset space.
///
/// Hidden lines (and their terminators) do not exist in view space, so a
/// view offset counts only characters the host actually shows.
#[derive(Debug, Clone, Default)]
pub struct View {
    /// Closed fold regions, sorted by `start`, non-overlapping.
    pub folds: Vec<FoldRegion>,
}

impl View {
    pub fn new() -> Self {
        Self { folds: Vec::new() }
    }

    /// Returns `true` if `line_idx` is hidden inside a fold body (not the header).
    pub fn is_line_hidden(&self, line_idx: usize) -> bool {
        self.folds
            .iter()
            .any(|f| line_idx > f.start && line_idx <= f.end)
    }

    /// Returns a reference to the `FoldRegion` whose header is `line_idx`, if any.
    pub fn fold_at(&self, line_idx: usize) -> Option<&FoldRegion> {
        self.folds.iter().find(|f| f.start == line_idx)
    }

    /// Close a fold spanning `start..=end`.
    /// Merges or discards any existing overlapping folds to keep `folds` sorted
    /// and non-overlapping.
    pub fn close_fold(&mut self, start: usize, end: usize) {
        if end <= start {
            return;
        }
        self.folds.retain(|f| !(f.start >= start && f.end <= end));
        let pos = self.folds.partition_point(|f| f.start < start);
        self.folds.insert(pos, FoldRegion { start, end });
    }

    /// Open (remove) the fold whose header is `start`.
    pub fn open_fold(&mut self, start: usize) {
        self.folds.retain(|f| f.start != start);
    }

    /// Remove all folds in this window.
    pub fn open_all_folds(&mut self) {
        self.folds.clear();
    }

    /// Visible lines as `(line, model_start, model_end)`, terminators included.
    fn segments(&self, rope: &Rope) -> Vec<(usize, usize, usize)> {
        (0..rope.len_lines())
            .filter(|line| !self.is_line_hidden(*line))
            .map(|line| {
                let start = rope.line_to_char(line);
                (line, start, start + rope.line(line).len_chars())
            })
            .collect()
    }

    /// Maps a model offset into view space. Offsets inside hidden lines map
    /// to the start of the next visible line.
    pub fn model_to_view(&self, rope: &Rope, model_offset: usize) -> usize {
        if self.folds.is_empty() {
            return model_offset;
        }
        let mut view = 0;
        for (_, start, end) in self.segments(rope) {
            if model_offset < start {
                break;
            }
            if model_offset < end {
                return view + (model_offset - start);
            }
            view += end - start;
        }
        view
    }

    pub fn view_to_model(&self, rope: &Rope, view_offset: usize) -> usize {
        if self.folds.is_empty() {
            return view_offset;
        }
        let mut view = 0;
        let mut last_end = 0;
        for (_, start, end) in self.segments(rope) {
            let len = end - start;
            if view_offset < view + len {
                return start + (view_offset - view);
            }
            view += len;
            last_end = end;
        }
        last_end
    }

    /// Builds a position carrying both offsets for `model_offset`.
    pub fn position(&self, rope: &Rope, model_offset: usize) -> Position {
        Position::new(model_offset, self.model_to_view(rope, model_offset))
    }
}

/// Text content in view space: a [`Buffer`] seen through a [`View`].
pub struct ViewContent<'a> {
    buffer: &'a mut Buffer,
    view: &'a View,
}

impl<'a> ViewContent<'a> {
    pub fn new(buffer: &'a mut Buffer, view: &'a View) -> Self {
        Self { buffer, view }
    }

    fn visible_text(&self) -> String {
        let rope = &self.buffer.content;
        self.view
            .segments(rope)
            .into_iter()
            .map(|(_, start, end)| rope.slice(start..end).to_string())
            .collect()
    }

    fn to_model(&self, view_offset: usize) -> usize {
        self.view.view_to_model(&self.buffer.content, view_offset)
    }

    fn visible_lines(&self) -> Vec<usize> {
        self.view
            .segments(&self.buffer.content)
            .into_iter()
            .map(|(line, _, _)| line)
            .collect()
    }

    fn view_line_information(&self, view_line: usize, model_line: usize) -> LineInformation {
        let rope = &self.buffer.content;
        let model = rope_line_information(rope, model_line);
        LineInformation {
            number: view_line,
            begin_offset: self.view.model_to_view(rope, model.begin_offset),
            length: model.length,
        }
    }
}

impl TextContent for ViewContent<'_> {
    fn space(&self) -> Space {
        Space::View
    }

    fn line_information(&self, line: usize) -> LineInformation {
        let lines = self.visible_lines();
        let view_line = line.min(lines.len().saturating_sub(1));
        let model_line = lines.get(view_line).copied().unwrap_or(0);
        self.view_line_information(view_line, model_line)
    }

    fn line_information_of_offset(&self, offset: usize) -> LineInformation {
        let rope = &self.buffer.content;
        let model_offset = self.to_model(offset).min(rope.len_chars());
        let model_line = rope.char_to_line(model_offset);
        let view_line = self
            .visible_lines()
            .iter()
            .position(|line| *line == model_line)
            .unwrap_or(0);
        self.view_line_information(view_line, model_line)
    }

    fn number_of_lines(&self) -> usize {
        self.visible_lines().len()
    }

    fn text(&self, offset: usize, length: usize) -> String {
        self.visible_text().chars().skip(offset).take(length).collect()
    }

    fn replace(&mut self, offset: usize, length: usize, replacement: &str) {
        let start = self.to_model(offset);
        let end = self.to_model(offset + length).max(start);
        self.buffer.replace(start, end - start, replacement);
    }

    fn insert_preferring_smart_indent(&mut self, offset: usize, text: &str) {
        let start = self.to_model(offset);
        self.buffer.insert_preferring_smart_indent(start, text);
    }

    fn text_length(&self) -> usize {
        self.visible_text().chars().count()
    }

    fn find(&self, search: &Search, start: Position) -> Option<SearchResult> {
        let text = self.visible_text();
        search_text(&text, 0, search, start.view_offset())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn folded() -> (Buffer, View) {
        // Lines: "aa\n" (0..3), "bb\n" (3..6), "cc\n" (6..9), "dd" (9..11)
        let buffer = Buffer::from_text("aa\nbb\ncc\ndd");
        let mut view = View::new();
        view.close_fold(0, 2);
        (buffer, view)
    }

    #[test]
    fn test_fold_is_line_hidden() {
        let mut view = View::new();
        view.close_fold(2, 5);
        assert!(!view.is_line_hidden(2));
        assert!(view.is_line_hidden(3));
        assert!(view.is_line_hidden(4));
        assert!(view.is_line_hidden(5));
        assert!(!view.is_line_hidden(1));
        assert!(!view.is_line_hidden(6));
    }

    #[test]
    fn test_fold_at() {
        let mut view = View::new();
        view.close_fold(2, 5);
        assert!(view.fold_at(2).is_some());
        assert!(view.fold_at(3).is_none()); // body, not header
        assert!(view.fold_at(1).is_none());
    }

    #[test]
    fn test_open_fold() {
        let mut view = View::new();
        view.close_fold(2, 5);
        view.open_fold(2);
        assert!(view.fold_at(2).is_none());
        assert!(!view.is_line_hidden(3));
    }

    #[test]
    fn test_close_fold_sorted() {
        let mut view = View::new();
        view.close_fold(5, 8);
        view.close_fold(1, 3);
        assert_eq!(view.folds[0].start, 1);
        assert_eq!(view.folds[1].start, 5);
        view.open_all_folds();
        assert!(view.folds.is_empty());
    }

    #[test]
    fn test_offsets_agree_without_folds() {
        let buffer = Buffer::from_text("abc\ndef");
        let view = View::new();
        let pos = view.position(&buffer.content, 5);
        assert_eq!(pos.model_offset(), 5);
        assert_eq!(pos.view_offset(), 5);
    }

    #[test]
    fn test_offsets_skip_hidden_lines() {
        let (buffer, view) = folded();
        let rope = &buffer.content;
        assert_eq!(view.model_to_view(rope, 1), 1);
        assert_eq!(view.model_to_view(rope, 10), 4);
        assert_eq!(view.view_to_model(rope, 4), 10);
        // Inside the fold body: snaps to the next visible line.
        assert_eq!(view.model_to_view(rope, 4), 3);
    }

    #[test]
    fn test_view_content_reads_visible_text() {
        let (mut buffer, view) = folded();
        let content = ViewContent::new(&mut buffer, &view);
        assert_eq!(content.space(), Space::View);
        assert_eq!(content.text_length(), 5);
        assert_eq!(content.text(0, 5), "aa\ndd");
        assert_eq!(content.number_of_lines(), 2);
        let line = content.line_information_of_offset(4);
        assert_eq!((line.number, line.begin_offset, line.length), (1, 3, 2));
    }

    #[test]
    fn test_view_content_replace_maps_to_model() {
        let (mut buffer, view) = folded();
        {
            let mut content = ViewContent::new(&mut buffer, &view);
            content.replace(3, 1, "X");
        }
        assert_eq!(buffer.to_string(), "aa\nbb\ncc\nXd");
    }
}
