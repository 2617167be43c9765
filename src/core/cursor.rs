use super::position::Position;

/// How the host should draw the caret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaretType {
    /// Block caret of normal mode.
    #[default]
    Rectangular,
    /// Thin bar of insert mode.
    VerticalBar,
    HalfRect,
    Underline,
}

/// Cursor/caret capability of the host.
pub trait CursorService {
    fn position(&self) -> Position;

    /// Moves the cursor. With `update_sticky_column` the column remembered
    /// for vertical motions is refreshed by the caller through
    /// [`CursorService::set_sticky_column`].
    fn set_position(&mut self, position: Position, update_sticky_column: bool);

    fn sticky_column(&self) -> usize;

    fn set_sticky_column(&mut self, column: usize);

    fn set_caret(&mut self, caret: CaretType);

    fn caret(&self) -> CaretType;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Cursor {
    pub position: Position,
    /// Column `j`/`k` try to return to.
    pub sticky_column: usize,
    pub caret: CaretType,
}

impl Cursor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CursorService for Cursor {
    fn position(&self) -> Position {
        self.position
    }

    fn set_position(&mut self, position: Position, _update_sticky_column: bool) {
        self.position = position;
    }

    fn sticky_column(&self) -> usize {
        self.sticky_column
    }

    fn set_sticky_column(&mut self, column: usize) {
        self.sticky_column = column;
    }

    fn set_caret(&mut self, caret: CaretType) {
        self.caret = caret;
    }

    fn caret(&self) -> CaretType {
        self.caret
    }
}
