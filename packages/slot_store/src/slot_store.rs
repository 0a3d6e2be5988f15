use std::any::type_name;

use crate::{Error, Key, KeyAllocator};

/// A fixed-capacity collection of slots, each either holding a value or vacant, with the keys
/// of new items assigned by an owned [`KeyAllocator`].
///
/// Works similar to a `Vec<Option<T>>` that picks the index for you: when you insert an item,
/// you get back the key to use for accessing or removing the item. Keys are the physical slot
/// indexes, so the valid key range is `[0, capacity - 1]`.
///
/// Removed keys are handed back to the allocator, which only reuses keys it has never issued
/// (see [`KeyAllocator::push()`]). A store that has been filled once therefore stays full until
/// it is [cleared][1], no matter how many items are removed.
///
/// # Examples
///
/// ```
/// use slot_store::SlotStore;
///
/// let mut store = SlotStore::with_capacity(3);
///
/// let a = store.insert("alpha").unwrap();
/// let b = store.insert("beta").unwrap();
///
/// assert_eq!(*store.get(a).unwrap(), "alpha");
/// assert_eq!(store.remove(b).unwrap(), "beta");
/// assert_eq!(store.len(), 1);
/// ```
///
/// [1]: Self::clear
#[derive(Clone, Debug)]
pub struct SlotStore<T> {
    /// `None` means the slot is vacant.
    slots: Vec<Option<T>>,

    /// The number of occupied slots.
    count: usize,

    allocator: KeyAllocator,
}

impl<T> SlotStore<T> {
    /// Creates a store with `capacity` vacant slots and keys `[0, capacity - 1]` available.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let allocator = KeyAllocator::new(to_key(capacity).checked_sub(1).expect(
            "subtracting one from a non-negative key cannot overflow",
        ));

        Self::with_allocator(capacity, allocator)
    }

    /// Creates a store with `capacity` vacant slots whose keys come from `allocator`.
    ///
    /// Keys the allocator issues that fall outside the slots are skipped on insert.
    #[must_use]
    pub(crate) fn with_allocator(capacity: usize, allocator: KeyAllocator) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);

        Self {
            slots,
            count: 0,
            allocator,
        }
    }

    /// The number of items in the store.
    #[must_use]
    #[cfg_attr(test, mutants::skip)] // Can be mutated to infinitely growing memory use.
    pub fn len(&self) -> usize {
        self.count
    }

    /// Whether the store holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// The number of slots in the store.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// The highest key the store can hold. This is `-1` for a zero-capacity store.
    #[must_use]
    pub fn last_key(&self) -> Key {
        to_key(self.slots.len())
            .checked_sub(1)
            .expect("subtracting one from a non-negative key cannot overflow")
    }

    /// Whether the allocator has no keys left to hand out, i.e. the next insert will fail.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.allocator.is_empty()
    }

    /// The allocator that assigns keys to new items.
    #[must_use]
    pub fn allocator(&self) -> &KeyAllocator {
        &self.allocator
    }

    /// Inserts a value and returns the key assigned to it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PoolExhausted`] if the allocator has no keys left.
    pub fn insert(&mut self, value: T) -> crate::Result<Key> {
        #[cfg(debug_assertions)]
        self.integrity_check();

        let key = self.allocator.pop()?;

        let slot = self
            .slot_mut(key)
            .expect("the allocator only offers keys of vacant slots");
        debug_assert!(slot.is_none(), "allocated key {key} points at an occupied slot");

        *slot = Some(value);
        self.increment_count();

        self.skip_unusable_keys();

        Ok(key)
    }

    /// Removes the item with the given key and returns it. The key is handed back to the
    /// allocator, which decides whether it can be reused.
    ///
    /// # Errors
    ///
    /// Returns [`Error::KeyNotFound`] if the key is out of range or not associated with an item.
    pub fn remove(&mut self, key: Key) -> crate::Result<T> {
        let value = self
            .slot_mut(key)
            .and_then(Option::take)
            .ok_or(Error::KeyNotFound { key })?;

        self.decrement_count();
        self.allocator.push(key);

        Ok(value)
    }

    /// Whether the key is in range and associated with an item.
    #[must_use]
    pub fn has_key(&self, key: Key) -> bool {
        matches!(self.slot(key), Some(Some(_)))
    }

    /// Whether any item in the store is equal to `value`.
    ///
    /// This is a linear scan over all slots.
    #[must_use]
    pub fn contains(&self, value: &T) -> bool
    where
        T: PartialEq,
    {
        self.slots.iter().flatten().any(|item| item == value)
    }

    /// Gets a reference to the item with the given key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::KeyNotFound`] if the key is out of range or not associated with an item.
    pub fn get(&self, key: Key) -> crate::Result<&T> {
        self.slot(key)
            .and_then(Option::as_ref)
            .ok_or(Error::KeyNotFound { key })
    }

    /// Gets an exclusive reference to the item with the given key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::KeyNotFound`] if the key is out of range or not associated with an item.
    pub fn get_mut(&mut self, key: Key) -> crate::Result<&mut T> {
        self.slot_mut(key)
            .and_then(Option::as_mut)
            .ok_or(Error::KeyNotFound { key })
    }

    /// Removes all items and makes the full key range `[0, last_key]` available again.
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }

        self.count = 0;
        self.allocator.reset(0, self.last_key());
    }

    /// Iterates over the items in ascending key order.
    pub fn iter(&self) -> impl Iterator<Item = (Key, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|value| (to_key(index), value)))
    }

    /// Reads a slot by physical index, bypassing the allocator.
    pub(crate) fn slot_at(&self, index: usize) -> Option<&T> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    /// Overwrites a slot by physical index, bypassing the allocator. Used to copy items between
    /// generations of storage without consuming keys.
    ///
    /// # Panics
    ///
    /// Panics if the index is out of bounds.
    pub(crate) fn put_at(&mut self, index: usize, value: Option<T>) {
        let slot = self.slots.get_mut(index).unwrap_or_else(|| {
            panic!(
                "slot {index} index out of bounds in store of {}",
                type_name::<T>()
            )
        });

        let was_occupied = slot.is_some();
        let is_occupied = value.is_some();
        *slot = value;

        match (was_occupied, is_occupied) {
            (false, true) => self.increment_count(),
            (true, false) => self.decrement_count(),
            _ => {}
        }
    }

    /// Replaces the allocator with a fresh one over the part of `[start, end]` (in either order)
    /// that lies within the slots. Keys of occupied slots at the front of the range are skipped.
    ///
    /// Used when the slots are filled by other means than `insert()`, e.g. from a snapshot.
    pub(crate) fn reset_allocator(&mut self, start: Key, end: Key) {
        let low = start.min(end).max(0);
        let high = start.max(end).min(self.last_key());

        self.allocator = if low <= high {
            KeyAllocator::with_range(low, high)
        } else {
            KeyAllocator::new(-1)
        };

        self.skip_unusable_keys();
    }

    /// Drops keys from the allocator until the next one points at a vacant slot.
    ///
    /// Only an allocator range that disagrees with the slots (e.g. one rebuilt from a snapshot)
    /// can offer keys of occupied slots. The allocator range never exceeds the slots, so this
    /// skips at most `capacity` keys.
    fn skip_unusable_keys(&mut self) {
        while let Some(key) = self.allocator.peek() {
            if matches!(self.slot(key), Some(None)) {
                return;
            }

            tracing::trace!(key, "skipping allocated key that does not point at a vacant slot");
            _ = self.allocator.pop();
        }
    }

    fn slot(&self, key: Key) -> Option<&Option<T>> {
        usize::try_from(key).ok().and_then(|index| self.slots.get(index))
    }

    fn slot_mut(&mut self, key: Key) -> Option<&mut Option<T>> {
        usize::try_from(key)
            .ok()
            .and_then(|index| self.slots.get_mut(index))
    }

    fn increment_count(&mut self) {
        self.count = self
            .count
            .checked_add(1)
            .expect("count cannot exceed the number of slots");
    }

    fn decrement_count(&mut self) {
        self.count = self
            .count
            .checked_sub(1)
            .expect("a slot was occupied so count must be non-zero");
    }

    #[cfg_attr(test, mutants::skip)] // This is essentially test logic, mutation is meaningless.
    #[cfg(debug_assertions)]
    pub(crate) fn integrity_check(&self) {
        let observed_occupied_count = self.slots.iter().flatten().count();

        assert!(
            self.count == observed_occupied_count,
            "self.count {} does not match the observed occupied count {} in store of {}",
            self.count,
            observed_occupied_count,
            type_name::<T>()
        );

        self.allocator.integrity_check();

        if let Some(key) = self.allocator.peek() {
            assert!(
                matches!(self.slot(key), Some(None)),
                "next allocated key {key} does not point at a vacant slot in store of {}",
                type_name::<T>()
            );
        }
    }
}

impl<T> Default for SlotStore<T> {
    /// A store with 100 slots.
    fn default() -> Self {
        Self::with_capacity(100)
    }
}

pub(crate) fn to_key(index: usize) -> Key {
    Key::try_from(index).expect("slot counts are bounded by memory and always fit in a key")
}
