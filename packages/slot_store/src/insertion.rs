use crate::Key;

/// Where [`OffsetSlotStore::insert()`][1] put a value.
///
/// # Examples
///
/// ```
/// use slot_store::{Insertion, OffsetSlotStore};
///
/// let mut store = OffsetSlotStore::builder().capacity(1).buffer(true).build();
///
/// assert_eq!(store.insert("first").unwrap(), Insertion::Stored(0));
///
/// // The store is full and cannot grow, so the value waits in the overflow buffer.
/// let outcome = store.insert("second").unwrap();
/// assert!(outcome.is_buffered());
/// assert_eq!(outcome.key(), None);
/// ```
///
/// [1]: crate::OffsetSlotStore::insert
#[expect(
    clippy::exhaustive_enums,
    reason = "a value is either stored or buffered, there is no third place for it"
)]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[must_use]
pub enum Insertion {
    /// The value was stored and can be accessed with this key.
    Stored(Key),

    /// The store was full, so the value was appended to the overflow buffer. It has no key.
    Buffered,
}

impl Insertion {
    /// The key of the stored value, or `None` if the value was buffered.
    #[must_use]
    pub fn key(self) -> Option<Key> {
        match self {
            Self::Stored(key) => Some(key),
            Self::Buffered => None,
        }
    }

    /// Whether the value ended up in the overflow buffer.
    #[must_use]
    pub fn is_buffered(self) -> bool {
        matches!(self, Self::Buffered)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn stored_has_key() {
        let outcome = Insertion::Stored(-5);

        assert_eq!(outcome.key(), Some(-5));
        assert!(!outcome.is_buffered());
    }

    #[test]
    fn buffered_has_no_key() {
        assert_eq!(Insertion::Buffered.key(), None);
        assert!(Insertion::Buffered.is_buffered());
    }
}
