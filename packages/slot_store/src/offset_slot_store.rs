use std::collections::VecDeque;

use crate::{Error, Insertion, Key, KeyAllocator, OffsetSlotStoreBuilder, Resizer, SlotStore};

/// A slot container that hands out stable integer keys from a configurable key range, with
/// optional incremental growth and an optional overflow buffer.
///
/// Keys are logical: the physical slot index plus a fixed offset. A store built with
/// `key_range(1000, 1100)` hands out keys 1000 through 1099.
///
/// When the store is full, what happens on insert depends on configuration:
///
/// 1. If [resizing][1] is enabled, the store switches to storage of double the capacity and
///    the insert succeeds. This takes precedence over the overflow buffer.
/// 2. Otherwise, if the [overflow buffer][2] is enabled, the value is appended to the buffer
///    and the insert returns [`Insertion::Buffered`].
/// 3. Otherwise, the insert fails with [`Error::PoolExhausted`].
///
/// Keys of removed items are not reused until the store is [cleared][3], so a store that has
/// been filled once stays full even after removals.
///
/// # Incremental resizing
///
/// Growing does not copy everything at once. While resizing is enabled, a shadow store of
/// double capacity exists and every insert copies one more slot into it. By the time the
/// active store is full, most or all of the copying has been done. Any remainder is completed
/// in one go before switching over, after which a new shadow store is prepared for the next
/// doubling.
///
/// # Examples
///
/// ```
/// use slot_store::OffsetSlotStore;
///
/// let mut store = OffsetSlotStore::new();
///
/// let apple = store.insert("apple").unwrap().key().unwrap();
/// let banana = store.insert("banana").unwrap().key().unwrap();
///
/// assert_eq!(*store.get(banana).unwrap(), "banana");
///
/// store.swap(apple, banana).unwrap();
/// assert_eq!(*store.get(apple).unwrap(), "banana");
///
/// store.remove(apple).unwrap();
/// assert_eq!(store.len(), 1);
/// ```
///
/// [1]: Self::enable_resizing
/// [2]: Self::enable_buffer
/// [3]: Self::clear
#[derive(Clone, Debug)]
pub struct OffsetSlotStore<T> {
    name: Option<String>,

    /// Added to physical keys to obtain the keys seen by callers.
    offset: Key,

    /// The active storage generation.
    store: SlotStore<T>,

    resizing_enabled: bool,

    /// The next storage generation, if one is being prepared. This may outlive
    /// `resizing_enabled` if resizing was disabled without purging.
    resizer: Option<Resizer<T>>,

    buffer_enabled: bool,

    /// Values that arrived while the store was full and unable to grow, oldest first.
    buffer: VecDeque<T>,
}

impl<T> OffsetSlotStore<T> {
    /// Starts building a new [`OffsetSlotStore`].
    ///
    /// Use this when you want to customize the key range or other configuration.
    ///
    /// # Example
    ///
    /// ```rust
    /// use slot_store::OffsetSlotStore;
    ///
    /// let store = OffsetSlotStore::<u32>::builder()
    ///     .capacity(10)
    ///     .offset(500)
    ///     .build();
    ///
    /// assert_eq!(store.offset(), 500);
    /// assert_eq!(store.max_key_bound(), 509);
    /// ```
    pub fn builder() -> OffsetSlotStoreBuilder<T> {
        OffsetSlotStoreBuilder::new()
    }

    /// The name of the store, if it has one.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Renames the store. An empty name removes the name.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into()).filter(|name| !name.is_empty());
    }

    /// The lowest key of the store.
    #[must_use]
    pub fn offset(&self) -> Key {
        self.offset
    }

    /// The highest key of the store (inclusive). This grows when the store is resized.
    #[must_use]
    pub fn max_key_bound(&self) -> Key {
        self.to_logical(self.store.last_key())
    }

    /// The number of slots in the active storage.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.store.capacity()
    }

    /// The number of items in the store. Buffered values are not included.
    #[must_use]
    #[cfg_attr(test, mutants::skip)] // Can be mutated to infinitely growing memory use.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Whether the store holds no items. Buffered values are not considered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Whether the key is in the key range and associated with an item.
    #[must_use]
    pub fn has_key(&self, key: Key) -> bool {
        self.to_physical(key)
            .is_ok_and(|physical| self.store.has_key(physical))
    }

    /// Whether any item in the store is equal to `value`. Buffered values are not considered.
    ///
    /// This is a linear scan over all slots.
    #[must_use]
    pub fn contains(&self, value: &T) -> bool
    where
        T: PartialEq,
    {
        self.store.contains(value)
    }

    /// Gets a reference to the item with the given key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`] if the key is outside the key range, or
    /// [`Error::KeyNotFound`] if it is not associated with an item.
    pub fn get(&self, key: Key) -> crate::Result<&T> {
        let physical = self.to_physical(key)?;

        self.store
            .get(physical)
            .map_err(|_| Error::KeyNotFound { key })
    }

    /// Iterates over the items in ascending key order.
    pub fn iter(&self) -> impl Iterator<Item = (Key, &T)> {
        self.store
            .iter()
            .map(|(physical, value)| (self.to_logical(physical), value))
    }

    /// The allocator assigning keys in the active storage. Its ids are physical keys, i.e.
    /// without the offset applied.
    #[must_use]
    pub fn allocator(&self) -> &KeyAllocator {
        self.store.allocator()
    }

    /// Whether incremental resizing is enabled.
    #[must_use]
    pub fn is_resizing_enabled(&self) -> bool {
        self.resizing_enabled
    }

    /// Whether a shadow store exists that has not yet received a copy of every slot.
    #[must_use]
    pub fn is_migration_in_progress(&self) -> bool {
        self.resizer
            .as_ref()
            .is_some_and(|resizer| !resizer.is_complete())
    }

    /// Stops growing the store when it is full.
    ///
    /// With `purge` the partially prepared next storage generation is discarded. Without it,
    /// the preparation is kept and resumes from where it stopped if resizing is enabled again.
    pub fn disable_resizing(&mut self, purge: bool) {
        self.resizing_enabled = false;

        if purge {
            self.resizer = None;
        }
    }

    /// Makes full-store inserts go to the overflow buffer, unless resizing is enabled.
    pub fn enable_buffer(&mut self) {
        self.buffer_enabled = true;
    }

    /// Makes full-store inserts fail, unless resizing is enabled. Values already in the buffer
    /// stay there.
    pub fn disable_buffer(&mut self) {
        self.buffer_enabled = false;
    }

    /// Whether the overflow buffer is enabled.
    #[must_use]
    pub fn is_buffer_enabled(&self) -> bool {
        self.buffer_enabled
    }

    /// Drops every value in the overflow buffer.
    pub fn clear_buffer(&mut self) {
        self.buffer.clear();
    }

    /// The number of values in the overflow buffer.
    #[must_use]
    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }

    /// The overflow buffer, oldest value first.
    #[must_use]
    pub fn buffer(&self) -> &VecDeque<T> {
        &self.buffer
    }

    /// The overflow buffer, oldest value first.
    #[must_use]
    pub fn buffer_mut(&mut self) -> &mut VecDeque<T> {
        &mut self.buffer
    }

    /// Takes the oldest value out of the overflow buffer.
    pub fn pop_buffered(&mut self) -> Option<T> {
        self.buffer.pop_front()
    }

    /// Translates a caller-visible key into a physical key of the active storage.
    fn to_physical(&self, key: Key) -> crate::Result<Key> {
        if key < self.offset || key > self.max_key_bound() {
            return Err(Error::InvalidKey { key });
        }

        key.checked_sub(self.offset)
            .ok_or(Error::InvalidKey { key })
    }

    fn to_logical(&self, physical: Key) -> Key {
        physical
            .checked_add(self.offset)
            .expect("key range was validated to fit in the key type")
    }

    pub(crate) fn store(&self) -> &SlotStore<T> {
        &self.store
    }
}

impl<T: Clone> OffsetSlotStore<T> {
    /// Creates a new [`OffsetSlotStore`] with the default configuration: 100 slots keyed from
    /// 0, with resizing and buffering disabled.
    ///
    /// # Example
    ///
    /// ```rust
    /// use slot_store::OffsetSlotStore;
    ///
    /// let mut store = OffsetSlotStore::<String>::new();
    ///
    /// assert!(store.is_empty());
    /// assert_eq!(store.capacity(), 100);
    ///
    /// let key = store.insert("Hello".to_string()).unwrap().key().unwrap();
    /// assert_eq!(store.get(key).unwrap(), "Hello");
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub(crate) fn new_inner(
        capacity: usize,
        offset: Key,
        name: Option<String>,
        resizing: bool,
        buffer: bool,
    ) -> Self {
        let mut result = Self {
            name: name.filter(|name| !name.is_empty()),
            offset,
            store: SlotStore::with_capacity(capacity),
            resizing_enabled: false,
            resizer: None,
            buffer_enabled: buffer,
            buffer: VecDeque::new(),
        };

        if resizing {
            result.enable_resizing();
        }

        result
    }

    /// Inserts a value and reports where it went.
    ///
    /// If the store is full, it grows when resizing is enabled or the value goes to the
    /// overflow buffer when buffering is enabled, in that order of preference. While a resize
    /// is being prepared, each insert also copies one slot into the next storage generation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PoolExhausted`] if the store is full and neither resizing nor
    /// buffering is enabled.
    pub fn insert(&mut self, value: T) -> crate::Result<Insertion> {
        if self.store.is_exhausted() {
            if self.resizing_enabled {
                self.grow()?;
            } else if self.buffer_enabled {
                self.buffer.push_back(value);

                tracing::trace!(
                    buffer_len = self.buffer.len(),
                    "store is full, buffered value"
                );

                return Ok(Insertion::Buffered);
            } else {
                return Err(Error::PoolExhausted);
            }
        }

        let physical = self.store.insert(value)?;

        if let Some(resizer) = &mut self.resizer {
            let index = to_index(physical);

            if let Some(value) = self.store.slot_at(index) {
                resizer.mirror_value(index, value);
            }

            if self.resizing_enabled {
                resizer.step(&self.store);
            }
        }

        Ok(Insertion::Stored(self.to_logical(physical)))
    }

    /// Removes the item with the given key and returns it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`] if the key is outside the key range, or
    /// [`Error::KeyNotFound`] if it is not associated with an item.
    pub fn remove(&mut self, key: Key) -> crate::Result<T> {
        let physical = self.to_physical(key)?;

        let value = self
            .store
            .remove(physical)
            .map_err(|_| Error::KeyNotFound { key })?;

        if let Some(resizer) = &mut self.resizer {
            resizer.mirror_removal(to_index(physical));
        }

        Ok(value)
    }

    /// Gets an exclusive reference to the item with the given key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`] if the key is outside the key range, or
    /// [`Error::KeyNotFound`] if it is not associated with an item.
    pub fn get_mut(&mut self, key: Key) -> crate::Result<&mut T> {
        let physical = self.to_physical(key)?;

        let value = self
            .store
            .get_mut(physical)
            .map_err(|_| Error::KeyNotFound { key })?;

        if let Some(resizer) = &mut self.resizer {
            resizer.mirror_borrow_mut(to_index(physical));
        }

        Ok(value)
    }

    /// Replaces the item with the given key and returns the previous value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`] if the key is outside the key range, or
    /// [`Error::KeyNotFound`] if it is not associated with an item.
    pub fn set(&mut self, key: Key, value: T) -> crate::Result<T> {
        let physical = self.to_physical(key)?;

        let slot = self
            .store
            .get_mut(physical)
            .map_err(|_| Error::KeyNotFound { key })?;

        let previous = std::mem::replace(slot, value);

        if let Some(resizer) = &mut self.resizer {
            resizer.mirror_value(to_index(physical), slot);
        }

        Ok(previous)
    }

    /// Exchanges the items of two keys. The keys stay in use, only the values move.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`] if either key is not associated with an item.
    pub fn swap(&mut self, key1: Key, key2: Key) -> crate::Result<()> {
        for key in [key1, key2] {
            if !self.has_key(key) {
                return Err(Error::InvalidKey { key });
            }
        }

        let physical1 = self.to_physical(key1)?;
        let physical2 = self.to_physical(key2)?;

        if physical1 == physical2 {
            return Ok(());
        }

        let value1 = self.store.get(physical1)?.clone();
        let value2 = std::mem::replace(self.store.get_mut(physical2)?, value1);
        *self.store.get_mut(physical1)? = value2;

        if let Some(resizer) = &mut self.resizer {
            for physical in [physical1, physical2] {
                let index = to_index(physical);

                if let Some(value) = self.store.slot_at(index) {
                    resizer.mirror_value(index, value);
                }
            }
        }

        Ok(())
    }

    /// Removes all items and makes the full key range available again.
    ///
    /// The capacity is kept, including any growth from resizing. The overflow buffer is not
    /// affected; use [`clear_buffer()`][1] for that. A resize in preparation starts over.
    ///
    /// [1]: Self::clear_buffer
    pub fn clear(&mut self) {
        self.store.clear();
        self.rearm();
    }

    /// Makes the store grow when it is full, instead of buffering or failing.
    ///
    /// This prepares a shadow store of double the current capacity, which is filled one slot
    /// per insert. Does nothing if resizing is already enabled.
    ///
    /// # Example
    ///
    /// ```rust
    /// use slot_store::OffsetSlotStore;
    ///
    /// let mut store = OffsetSlotStore::builder().capacity(2).build();
    /// store.enable_resizing();
    ///
    /// for value in 0..5 {
    ///     _ = store.insert(value).unwrap();
    /// }
    ///
    /// assert_eq!(store.len(), 5);
    /// assert_eq!(store.capacity(), 8);
    /// ```
    pub fn enable_resizing(&mut self) {
        if self.resizing_enabled {
            return;
        }

        self.resizing_enabled = true;

        if self.resizer.is_none() {
            self.resizer = Some(Resizer::arm(&self.store));
        }
    }

    /// Copies one more slot into the shadow store, if resizing is enabled and copying is not
    /// yet complete. Inserts do this automatically.
    pub fn continue_migration(&mut self) {
        if !self.resizing_enabled {
            return;
        }

        if let Some(resizer) = &mut self.resizer {
            resizer.step(&self.store);
        }
    }

    /// Makes the shadow store the active storage and, if resizing stays enabled, starts
    /// preparing the next one.
    ///
    /// Inserts into a full store do this automatically after completing the migration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ResizeNotReady`] if resizing is disabled or the shadow store has not
    /// yet received a copy of every slot.
    pub fn switch_to_resized(&mut self) -> crate::Result<()> {
        if !self.resizing_enabled {
            return Err(Error::ResizeNotReady);
        }

        let resizer = match self.resizer.take() {
            Some(resizer) if resizer.is_complete() => resizer,
            other => {
                self.resizer = other;
                return Err(Error::ResizeNotReady);
            }
        };

        self.store = resizer.into_shadow();

        tracing::debug!(
            capacity = self.store.capacity(),
            len = self.store.len(),
            "switched to resized storage"
        );

        self.rearm();

        Ok(())
    }

    /// Completes the migration in one go and switches to the shadow store.
    fn grow(&mut self) -> crate::Result<()> {
        let resizer = self
            .resizer
            .get_or_insert_with(|| Resizer::arm(&self.store));

        resizer.finish(&self.store);

        self.switch_to_resized()
    }

    /// Replaces any resize preparation with a fresh one for the current storage, or with none
    /// if resizing is disabled.
    fn rearm(&mut self) {
        self.resizer = self
            .resizing_enabled
            .then(|| Resizer::arm(&self.store));
    }

    pub(crate) fn restore(&mut self, state: RestoredState<T>) {
        let RestoredState {
            name,
            offset,
            store,
            resizing_enabled,
            buffer_enabled,
            buffer,
        } = state;

        self.name = name;
        self.offset = offset;
        self.store = store;
        self.resizing_enabled = resizing_enabled;
        self.buffer_enabled = buffer_enabled;
        self.buffer = buffer;

        self.rearm();
    }
}

impl<T: Clone> Default for OffsetSlotStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything a snapshot restores, assembled before the store is touched.
#[derive(Debug)]
pub(crate) struct RestoredState<T> {
    pub(crate) name: Option<String>,
    pub(crate) offset: Key,
    pub(crate) store: SlotStore<T>,
    pub(crate) resizing_enabled: bool,
    pub(crate) buffer_enabled: bool,
    pub(crate) buffer: VecDeque<T>,
}

/// Physical keys come from the active store, which only hands out keys of its own slots.
fn to_index(physical: Key) -> usize {
    usize::try_from(physical).expect("physical keys issued by the store are slot indexes")
}
