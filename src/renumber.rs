//! Stable relabeling of bit indices after structural edits.
//!
//! Removing bits from an instance leaves holes in the index range. A
//! [`Renumbering`] closes them monotonically: indices below the lowest removed
//! index keep their value, every other surviving index shifts down by the
//! number of removed indices below it. The surviving indices always occupy
//! the contiguous range `0..len()`.
//!
//! Removals can be recorded one at a time, either in the original numbering
//! ([`Renumbering::remove`]) or in the numbering that is current after the
//! earlier removals ([`Renumbering::remove_current`]). Both forms describe the
//! same relabeling as a single batched [`Renumbering::from_removed`].
//!
//! The same renumbering is applied to everything that still references
//! pre-removal positions: coefficient keys (see
//! [`Qubo::renumbered`][crate::qubo::Qubo::renumbered]), solution vectors
//! ([`Renumbering::compact`]) and index lists ([`Renumbering::indices`]).

/// Monotone old-to-new index mapping over `0..original_len()`.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Renumbering {
    original_len: usize,
    /// Removed indices in the original numbering, sorted ascending.
    removed: Vec<usize>,
}

impl Renumbering {
    /// Creates the identity renumbering over `n` indices.
    pub fn new(n: usize) -> Self {
        Self {
            original_len: n,
            removed: Vec::new(),
        }
    }

    /// Creates a renumbering with all `removed` (original) indices removed at once.
    pub fn from_removed(n: usize, removed: impl IntoIterator<Item = usize>) -> Self {
        let mut renumbering = Self::new(n);
        for index in removed {
            renumbering.remove(index);
        }
        renumbering
    }

    /// Number of indices before any removal.
    pub fn original_len(&self) -> usize {
        self.original_len
    }

    /// Number of surviving indices.
    pub fn len(&self) -> usize {
        self.original_len - self.removed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removed indices (original numbering), ascending.
    pub fn removed(&self) -> &[usize] {
        &self.removed
    }

    pub fn is_removed(&self, original: usize) -> bool {
        self.removed.binary_search(&original).is_ok()
    }

    /// Removes the bit with the given original index.
    ///
    /// Returns `false` if it was already removed.
    pub fn remove(&mut self, original: usize) -> bool {
        assert!(
            original < self.original_len,
            "Index {} is out of range 0..{}",
            original,
            self.original_len
        );
        match self.removed.binary_search(&original) {
            Ok(_) => false,
            Err(pos) => {
                self.removed.insert(pos, original);
                true
            }
        }
    }

    /// Removes the bit that currently sits at position `current`, i.e. the
    /// position after all earlier removals were applied.
    ///
    /// Returns the original index of the removed bit.
    pub fn remove_current(&mut self, current: usize) -> usize {
        let original = self.original_of(current);
        self.remove(original);
        original
    }

    /// Original index of the surviving bit at position `current`.
    pub fn original_of(&self, current: usize) -> usize {
        assert!(
            current < self.len(),
            "Position {} is out of range 0..{}",
            current,
            self.len()
        );
        let mut original = current;
        for &r in &self.removed {
            if r <= original {
                original += 1;
            } else {
                break;
            }
        }
        original
    }

    /// New index of the bit with the given original index, or `None` if it
    /// was removed.
    pub fn get(&self, original: usize) -> Option<usize> {
        match self.removed.binary_search(&original) {
            Ok(_) => None,
            // `shift` is the number of removed indices below `original`.
            Err(shift) => Some(original - shift),
        }
    }

    /// Drops the entries of removed bits from a per-bit vector.
    pub fn compact<T: Clone>(&self, values: &[T]) -> Vec<T> {
        assert_eq!(
            values.len(),
            self.original_len,
            "Expected {} values, got {}",
            self.original_len,
            values.len()
        );
        let mut removed = self.removed.iter().peekable();
        let mut res = Vec::with_capacity(self.len());
        for (i, value) in values.iter().enumerate() {
            if removed.peek() == Some(&&i) {
                removed.next();
            } else {
                res.push(value.clone());
            }
        }
        res
    }

    /// Renumbers a list of original indices, dropping the removed ones.
    pub fn indices(&self, list: &[usize]) -> Vec<usize> {
        list.iter().filter_map(|&i| self.get(i)).collect()
    }

    /// Full old-to-new table.
    pub fn table(&self) -> Vec<Option<usize>> {
        (0..self.original_len).map(|i| self.get(i)).collect()
    }
}
