use std::marker::PhantomData;

use crate::{Key, OffsetSlotStore};

/// Builder for creating an instance of [`OffsetSlotStore`].
///
/// You only need to use this builder if you want to customize the store configuration.
/// The default configuration used by [`OffsetSlotStore::new()`][1] is a store of 100 slots
/// keyed from 0, with resizing and buffering disabled.
///
/// # Examples
///
/// ```
/// use slot_store::OffsetSlotStore;
///
/// let store = OffsetSlotStore::<u32>::builder()
///     .key_range(1000, 1010)
///     .name("tickets")
///     .resizing(true)
///     .build();
///
/// assert_eq!(store.offset(), 1000);
/// assert_eq!(store.max_key_bound(), 1009);
/// ```
///
/// [1]: OffsetSlotStore::new
#[must_use]
pub struct OffsetSlotStoreBuilder<T> {
    capacity: usize,
    offset: Key,
    name: Option<String>,
    resizing: bool,
    buffer: bool,

    _item: PhantomData<T>,
}

impl<T> std::fmt::Debug for OffsetSlotStoreBuilder<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OffsetSlotStoreBuilder")
            .field(
                "item_type",
                &std::format_args!("{}", std::any::type_name::<T>()),
            )
            .field("capacity", &self.capacity)
            .field("offset", &self.offset)
            .field("name", &self.name)
            .field("resizing", &self.resizing)
            .field("buffer", &self.buffer)
            .finish()
    }
}

impl<T> OffsetSlotStoreBuilder<T> {
    pub(crate) fn new() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            offset: 0,
            name: None,
            resizing: false,
            buffer: false,
            _item: PhantomData,
        }
    }

    /// Sets the number of slots, i.e. how many items fit before the store is full.
    ///
    /// The default is 100.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the first key of the store. Keys run from `offset` to `offset + capacity - 1`.
    ///
    /// The default is 0.
    pub fn offset(mut self, offset: Key) -> Self {
        self.offset = offset;
        self
    }

    /// Sets the offset and capacity from two bounds given in either order: the lower bound
    /// becomes the offset and the distance between them becomes the capacity.
    ///
    /// The upper bound itself is not a usable key.
    ///
    /// # Examples
    ///
    /// ```
    /// use slot_store::OffsetSlotStore;
    ///
    /// let store = OffsetSlotStore::<u8>::builder().key_range(20, -5).build();
    ///
    /// assert_eq!(store.offset(), -5);
    /// assert_eq!(store.capacity(), 25);
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if the distance between the bounds does not fit in `usize`.
    pub fn key_range(mut self, a: Key, b: Key) -> Self {
        let (low, high) = (a.min(b), a.max(b));

        self.offset = low;
        self.capacity = usize::try_from(high.abs_diff(low))
            .expect("key range is too large to be backed by memory");
        self
    }

    /// Sets a human-readable name for the store, which is kept in snapshots.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets whether the store starts out with incremental resizing enabled.
    ///
    /// The default is `false`.
    pub fn resizing(mut self, enabled: bool) -> Self {
        self.resizing = enabled;
        self
    }

    /// Sets whether the store starts out with the overflow buffer enabled.
    ///
    /// The default is `false`.
    pub fn buffer(mut self, enabled: bool) -> Self {
        self.buffer = enabled;
        self
    }

    /// Builds the store with the specified configuration.
    ///
    /// # Panics
    ///
    /// Panics if the capacity is zero or the key range does not fit in [`Key`].
    #[must_use]
    pub fn build(self) -> OffsetSlotStore<T>
    where
        T: Clone,
    {
        assert!(self.capacity > 0, "OffsetSlotStore must have non-zero capacity");

        let capacity_as_key = Key::try_from(self.capacity)
            .expect("capacity must fit in the key type");
        assert!(
            self.offset.checked_add(capacity_as_key).is_some(),
            "key range starting at {} with capacity {} overflows the key type",
            self.offset,
            self.capacity
        );

        OffsetSlotStore::new_inner(
            self.capacity,
            self.offset,
            self.name,
            self.resizing,
            self.buffer,
        )
    }
}

const DEFAULT_CAPACITY: usize = 100;

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let store = OffsetSlotStore::<u32>::builder().build();

        assert_eq!(store.capacity(), 100);
        assert_eq!(store.offset(), 0);
        assert_eq!(store.name(), None);
        assert!(!store.is_resizing_enabled());
        assert!(!store.is_buffer_enabled());
    }

    #[test]
    fn key_range_is_order_independent() {
        let a = OffsetSlotStore::<u32>::builder().key_range(10, 30).build();
        let b = OffsetSlotStore::<u32>::builder().key_range(30, 10).build();

        assert_eq!(a.offset(), 10);
        assert_eq!(b.offset(), 10);
        assert_eq!(a.capacity(), 20);
        assert_eq!(b.capacity(), 20);
        assert_eq!(a.max_key_bound(), 29);
    }

    #[test]
    fn flags_are_applied() {
        let store = OffsetSlotStore::<u32>::builder()
            .name("flags")
            .resizing(true)
            .buffer(true)
            .build();

        assert_eq!(store.name(), Some("flags"));
        assert!(store.is_resizing_enabled());
        assert!(store.is_buffer_enabled());
    }

    #[test]
    #[should_panic]
    fn zero_capacity_is_panic() {
        drop(OffsetSlotStore::<u32>::builder().capacity(0).build());
    }

    #[test]
    #[should_panic]
    fn empty_key_range_is_panic() {
        drop(OffsetSlotStore::<u32>::builder().key_range(5, 5).build());
    }

    #[test]
    #[should_panic]
    fn overflowing_key_range_is_panic() {
        drop(
            OffsetSlotStore::<u32>::builder()
                .offset(Key::MAX)
                .capacity(2)
                .build(),
        );
    }

    #[test]
    fn debug_names_item_type() {
        let builder = OffsetSlotStore::<u32>::builder().capacity(3);

        let output = format!("{builder:?}");
        assert!(output.contains("u32"));
        assert!(output.contains("capacity: 3"));
    }
}
