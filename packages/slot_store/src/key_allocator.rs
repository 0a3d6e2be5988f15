use crate::{Error, Key};

/// Issues and recycles integer ids within a closed range `[frontier, max_id]`.
///
/// Fresh ids are handed out in ascending order starting from the bottom of the range. Ids
/// given back via [`push()`][1] are kept on a LIFO stack and preferred over fresh ids, but only
/// if they lie within the not-yet-issued part of the range, i.e. `frontier <= id <= max_id`.
/// Anything else is silently dropped.
///
/// That rule means an id that was issued by ordinary fresh allocation is always below the
/// frontier by the time it comes back, so it is never issued again until the allocator is
/// [reset][2].
///
/// # Examples
///
/// ```
/// use slot_store::KeyAllocator;
///
/// let mut allocator = KeyAllocator::new(2);
///
/// assert_eq!(allocator.pop().unwrap(), 0);
/// assert_eq!(allocator.pop().unwrap(), 1);
///
/// // Below the frontier, so this is dropped rather than recycled.
/// allocator.push(0);
///
/// assert_eq!(allocator.pop().unwrap(), 2);
/// assert!(allocator.is_empty());
/// ```
///
/// [1]: Self::push
/// [2]: Self::reset
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct KeyAllocator {
    /// The next id that has never been issued.
    frontier: Key,

    /// Inclusive upper bound of the range.
    max_id: Key,

    /// Ids available for reuse, most recently pushed on top.
    recycled: Vec<Key>,
}

impl KeyAllocator {
    /// Creates an allocator for the range `[0, max_id]`.
    ///
    /// A negative `max_id` creates an allocator that is empty from the start.
    #[must_use]
    pub fn new(max_id: Key) -> Self {
        Self {
            frontier: 0,
            max_id,
            recycled: Vec::new(),
        }
    }

    /// Creates an allocator for the range between `a` and `b` (inclusive), in either order.
    #[must_use]
    pub fn with_range(a: Key, b: Key) -> Self {
        Self {
            frontier: a.min(b),
            max_id: a.max(b),
            recycled: Vec::new(),
        }
    }

    /// Takes the next available id.
    ///
    /// Recycled ids are preferred, most recently pushed first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PoolExhausted`] if there are no recycled ids and the whole range has
    /// already been issued.
    pub fn pop(&mut self) -> crate::Result<Key> {
        if let Some(id) = self.recycled.pop() {
            return Ok(id);
        }

        if self.frontier > self.max_id {
            return Err(Error::PoolExhausted);
        }

        let id = self.frontier;
        self.frontier = self
            .frontier
            .checked_add(1)
            .expect("frontier cannot overflow because it is at most max_id before the increment");

        Ok(id)
    }

    /// The id the next [`pop()`][1] would return, if any.
    ///
    /// [1]: Self::pop
    #[must_use]
    pub fn peek(&self) -> Option<Key> {
        self.recycled
            .last()
            .copied()
            .or_else(|| (self.frontier <= self.max_id).then_some(self.frontier))
    }

    /// Gives an id back to the allocator.
    ///
    /// The id is only kept for reuse if `frontier <= id <= max_id`. Any other id is dropped.
    pub fn push(&mut self, id: Key) {
        if id >= self.frontier && id <= self.max_id {
            self.recycled.push(id);
        }
    }

    /// Whether every id in the range has been issued and none are waiting for reuse.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.recycled.is_empty() && self.frontier > self.max_id
    }

    /// Doubles the inclusive upper bound of the range.
    ///
    /// # Panics
    ///
    /// Panics if the doubled bound does not fit in a [`Key`].
    pub fn double_max_id(&mut self) {
        self.max_id = self
            .max_id
            .checked_mul(2)
            .expect("doubling the key range overflowed the key type");
    }

    /// Forgets all recycled ids and starts over with the range between `start` and `end`
    /// (inclusive), in either order.
    pub fn reset(&mut self, start: Key, end: Key) {
        self.recycled.clear();
        self.frontier = start.min(end);
        self.max_id = start.max(end);
    }

    /// The next id that has never been issued.
    #[must_use]
    pub fn frontier(&self) -> Key {
        self.frontier
    }

    /// The inclusive upper bound of the range.
    #[must_use]
    pub fn max_id(&self) -> Key {
        self.max_id
    }

    /// The number of ids waiting for reuse.
    #[must_use]
    pub fn recycled_len(&self) -> usize {
        self.recycled.len()
    }

    #[cfg_attr(test, mutants::skip)] // This is essentially test logic, mutation is meaningless.
    #[cfg(debug_assertions)]
    pub(crate) fn integrity_check(&self) {
        for id in &self.recycled {
            assert!(
                *id >= self.frontier && *id <= self.max_id,
                "recycled id {id} is outside the unissued range [{}, {}]",
                self.frontier,
                self.max_id
            );
        }
    }
}

impl Default for KeyAllocator {
    /// An allocator for the range `[0, 99]`.
    fn default() -> Self {
        Self::new(99)
    }
}
