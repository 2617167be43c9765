use std::cmp::Ordering;

/// Which offset space an offset belongs to.
///
/// Model offsets index the full document. View offsets index what the host
/// shows, which differs from the model when lines are folded away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Space {
    Model,
    View,
}

/// An immutable location inside text content, carrying both offsets.
///
/// Arithmetic returns a new position; ordering follows the model offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Position {
    model_offset: usize,
    view_offset: usize,
}

impl Position {
    pub fn new(model_offset: usize, view_offset: usize) -> Self {
        Self {
            model_offset,
            view_offset,
        }
    }

    /// A position in unfolded text, where both spaces agree.
    pub fn at(offset: usize) -> Self {
        Self::new(offset, offset)
    }

    pub fn model_offset(&self) -> usize {
        self.model_offset
    }

    pub fn view_offset(&self) -> usize {
        self.view_offset
    }

    pub fn offset(&self, space: Space) -> usize {
        match space {
            Space::Model => self.model_offset,
            Space::View => self.view_offset,
        }
    }

    /// Moves `delta` characters (negative means backward), saturating at 0.
    ///
    /// Both offsets shift together; callers moving across a fold boundary
    /// must rebuild the position through the view instead.
    pub fn add_offset(&self, delta: isize) -> Self {
        Self {
            model_offset: shift(self.model_offset, delta),
            view_offset: shift(self.view_offset, delta),
        }
    }

    pub fn add_model_offset(&self, delta: isize) -> Self {
        self.add_offset(delta)
    }

    pub fn add_view_offset(&self, delta: isize) -> Self {
        self.add_offset(delta)
    }
}

impl PartialOrd for Position {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Position {
    fn cmp(&self, other: &Self) -> Ordering {
        self.model_offset
            .cmp(&other.model_offset)
            .then(self.view_offset.cmp(&other.view_offset))
    }
}

fn shift(offset: usize, delta: isize) -> usize {
    if delta >= 0 {
        offset.saturating_add(delta as usize)
    } else {
        offset.saturating_sub(delta.unsigned_abs())
    }
}

/// A `[left, right)` span between two positions.
///
/// The constructor normalises the ends so `left <= right` regardless of the
/// order they were given in (a backward selection yields the same range as a
/// forward one).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextRange {
    left: Position,
    right: Position,
    linewise: bool,
}

impl TextRange {
    pub fn new(start: Position, end: Position) -> Self {
        let (left, right) = if end < start {
            (end, start)
        } else {
            (start, end)
        };
        Self {
            left,
            right,
            linewise: false,
        }
    }

    /// A range covering whole lines; `left`/`right` must already sit on
    /// line boundaries.
    pub fn lines(start: Position, end: Position) -> Self {
        Self {
            linewise: true,
            ..Self::new(start, end)
        }
    }

    pub fn left_bound(&self) -> Position {
        self.left
    }

    pub fn right_bound(&self) -> Position {
        self.right
    }

    pub fn length(&self, space: Space) -> usize {
        self.right.offset(space).saturating_sub(self.left.offset(space))
    }

    pub fn model_length(&self) -> usize {
        self.length(Space::Model)
    }

    pub fn is_empty(&self) -> bool {
        self.left.model_offset == self.right.model_offset
    }

    pub fn is_linewise(&self) -> bool {
        self.linewise
    }

    pub fn contains(&self, pos: Position) -> bool {
        pos >= self.left && pos < self.right
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_offset_produces_new_position() {
        let p = Position::at(5);
        let q = p.add_model_offset(3);
        assert_eq!(p.model_offset(), 5);
        assert_eq!(q.model_offset(), 8);
        assert_eq!(q.view_offset(), 8);
    }

    #[test]
    fn test_add_offset_saturates_at_zero() {
        let p = Position::new(2, 1);
        let q = p.add_view_offset(-4);
        assert_eq!(q.model_offset(), 0);
        assert_eq!(q.view_offset(), 0);
    }

    #[test]
    fn test_range_normalises_ends() {
        let r = TextRange::new(Position::at(9), Position::at(4));
        assert_eq!(r.left_bound().model_offset(), 4);
        assert_eq!(r.right_bound().model_offset(), 9);
        assert_eq!(r.model_length(), 5);
        assert!(!r.is_linewise());
    }

    #[test]
    fn test_range_lengths_per_space() {
        let r = TextRange::new(Position::new(10, 4), Position::new(20, 6));
        assert_eq!(r.length(Space::Model), 10);
        assert_eq!(r.length(Space::View), 2);
    }

    #[test]
    fn test_range_contains_is_half_open() {
        let r = TextRange::new(Position::at(2), Position::at(4));
        assert!(r.contains(Position::at(2)));
        assert!(r.contains(Position::at(3)));
        assert!(!r.contains(Position::at(4)));
        assert!(TextRange::new(Position::at(3), Position::at(3)).is_empty());
    }
}
