//! Lockstep cursor walking two sequences from their last element backwards.

/// The elements under both cursors, with their positions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pair<'a, A, B> {
    pub left_index: usize,
    pub left: &'a A,
    pub right_index: usize,
    pub right: &'a B,
}

/// Walks `left` and `right` from the end, one step on each side at a time.
///
/// The walk ends as soon as either side runs out. Everything not yet visited
/// stays available through [`remaining_left`](Self::remaining_left) and
/// [`remaining_right`](Self::remaining_right).
#[derive(Debug)]
pub struct BackwardPairs<'a, A, B> {
    left: &'a [A],
    right: &'a [B],
    // Number of unvisited elements on each side; the cursor sits at `len - 1`
    left_len: usize,
    right_len: usize,
}

impl<'a, A, B> BackwardPairs<'a, A, B> {
    pub fn new(left: &'a [A], right: &'a [B]) -> Self {
        Self {
            left,
            right,
            left_len: left.len(),
            right_len: right.len(),
        }
    }

    /// The pair under the cursors, without moving them.
    pub fn peek(&self) -> Option<Pair<'a, A, B>> {
        let left_index = self.left_len.checked_sub(1)?;
        let right_index = self.right_len.checked_sub(1)?;
        Some(Pair {
            left_index,
            left: &self.left[left_index],
            right_index,
            right: &self.right[right_index],
        })
    }

    /// Move both cursors one step back. Does nothing once either side is exhausted.
    pub fn advance(&mut self) {
        if self.left_len > 0 && self.right_len > 0 {
            self.left_len -= 1;
            self.right_len -= 1;
        }
    }

    /// Element under the left cursor, if the left side is not exhausted.
    pub fn left_current(&self) -> Option<&'a A> {
        self.left_len.checked_sub(1).map(|i| &self.left[i])
    }

    /// Unvisited prefix of the left sequence, cursor element included.
    pub fn remaining_left(&self) -> &'a [A] {
        &self.left[..self.left_len]
    }

    /// Unvisited prefix of the right sequence, cursor element included.
    pub fn remaining_right(&self) -> &'a [B] {
        &self.right[..self.right_len]
    }
}

impl<'a, A, B> Iterator for BackwardPairs<'a, A, B> {
    type Item = Pair<'a, A, B>;

    fn next(&mut self) -> Option<Self::Item> {
        let pair = self.peek()?;
        self.advance();
        Some(pair)
    }
}
