use crate::slot_store::to_key;
use crate::{KeyAllocator, SlotStore};

/// The next generation of storage for an [`OffsetSlotStore`][1] that is growing, plus the
/// progress of copying the current generation into it.
///
/// The shadow store has double the capacity of the active store. Its allocator only manages the
/// keys beyond the active store's last key, as the keys below it are already spoken for by the
/// items being migrated.
///
/// Migration walks the active store front to back, one slot per [`step()`][2]. The cursor never
/// moves backwards. Slots behind the cursor that change after being copied must be reported
/// via the `mirror_*` methods so the shadow stays identical to the active store.
///
/// [1]: crate::OffsetSlotStore
/// [2]: Self::step
#[derive(Clone, Debug)]
pub(crate) struct Resizer<T> {
    shadow: SlotStore<T>,

    /// Index of the next active slot to copy.
    cursor: usize,

    /// Capacity of the active store at the time the resizer was armed. Migration is done once
    /// the cursor reaches this.
    migrate_until: usize,

    /// Already-copied slots that were handed out for mutation and must be copied again.
    recopy: Vec<usize>,
}

impl<T> Resizer<T> {
    /// Whether every slot of the active store has been copied and nothing is awaiting a recopy.
    #[must_use]
    pub(crate) fn is_complete(&self) -> bool {
        self.cursor >= self.migrate_until && self.recopy.is_empty()
    }
}

impl<T: Clone> Resizer<T> {
    /// # Panics
    ///
    /// Panics if the doubled capacity does not fit in memory.
    #[must_use]
    pub(crate) fn arm(active: &SlotStore<T>) -> Self {
        let capacity = active.capacity();
        let new_capacity = capacity
            .checked_mul(2)
            .expect("doubling the capacity overflowed - the store cannot grow any further");

        let new_last_key = to_key(new_capacity)
            .checked_sub(1)
            .expect("subtracting one from a non-negative key cannot overflow");

        let allocator = KeyAllocator::with_range(to_key(capacity), new_last_key);

        tracing::debug!(capacity, new_capacity, "armed incremental resize");

        Self {
            shadow: SlotStore::with_allocator(new_capacity, allocator),
            cursor: 0,
            migrate_until: capacity,
            recopy: Vec::new(),
        }
    }

    /// Copies one slot of the active store into the shadow store. Does nothing if migration is
    /// already complete.
    pub(crate) fn step(&mut self, active: &SlotStore<T>) {
        let index = if self.cursor < self.migrate_until {
            let index = self.cursor;
            self.cursor = self
                .cursor
                .checked_add(1)
                .expect("cursor is below a capacity so it cannot overflow");
            index
        } else if let Some(index) = self.recopy.pop() {
            index
        } else {
            return;
        };

        self.shadow.put_at(index, active.slot_at(index).cloned());
    }

    /// Runs migration steps until migration is complete.
    pub(crate) fn finish(&mut self, active: &SlotStore<T>) {
        // Each step either advances the cursor or drains one recopy entry, and nothing adds
        // recopy entries in here, so this terminates after at most capacity + recopy steps.
        while !self.is_complete() {
            self.step(active);
        }
    }

    /// Reflects a changed slot value into the shadow store if the slot was already copied.
    pub(crate) fn mirror_value(&mut self, index: usize, value: &T) {
        if index < self.cursor {
            self.shadow.put_at(index, Some(value.clone()));
        }
    }

    /// Reflects a vacated slot into the shadow store if the slot was already copied.
    pub(crate) fn mirror_removal(&mut self, index: usize) {
        if index < self.cursor {
            self.shadow.put_at(index, None);
        }
    }

    /// Marks an already-copied slot for copying again, as its value may change out of sight.
    pub(crate) fn mirror_borrow_mut(&mut self, index: usize) {
        if index < self.cursor && !self.recopy.contains(&index) {
            self.recopy.push(index);
        }
    }

    /// Gives up the shadow store so it can become the active one.
    #[must_use]
    pub(crate) fn into_shadow(self) -> SlotStore<T> {
        debug_assert!(self.is_complete(), "switched to an incomplete shadow store");

        self.shadow
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn full_store(capacity: usize) -> SlotStore<u32> {
        let mut store = SlotStore::with_capacity(capacity);

        for value in 0..capacity {
            _ = store.insert(u32::try_from(value).unwrap()).unwrap();
        }

        store
    }

    #[test]
    fn arm_doubles_capacity_with_new_key_range() {
        let active = full_store(4);
        let resizer = Resizer::arm(&active);

        assert_eq!(resizer.shadow.capacity(), 8);
        assert_eq!(resizer.shadow.allocator().frontier(), 4);
        assert_eq!(resizer.shadow.allocator().max_id(), 7);
        assert!(!resizer.is_complete());
    }

    #[test]
    fn one_slot_per_step() {
        let active = full_store(3);
        let mut resizer = Resizer::arm(&active);

        resizer.step(&active);
        assert_eq!(resizer.shadow.len(), 1);
        assert_eq!(resizer.shadow.slot_at(0), Some(&0));
        assert_eq!(resizer.shadow.slot_at(1), None);

        resizer.step(&active);
        resizer.step(&active);
        assert!(resizer.is_complete());

        // Extra steps are harmless.
        resizer.step(&active);

        let shadow = resizer.into_shadow();
        let items: Vec<_> = shadow.iter().map(|(key, value)| (key, *value)).collect();
        assert_eq!(items, vec![(0, 0), (1, 1), (2, 2)]);
    }

    #[test]
    fn vacant_slots_stay_vacant() {
        let mut active = full_store(3);
        active.remove(1).unwrap();

        let mut resizer = Resizer::arm(&active);
        resizer.finish(&active);

        let shadow = resizer.into_shadow();
        assert_eq!(shadow.len(), 2);
        assert!(!shadow.has_key(1));
    }

    #[test]
    fn mirror_only_touches_copied_slots() {
        let active = full_store(3);
        let mut resizer = Resizer::arm(&active);
        resizer.step(&active);

        resizer.mirror_value(0, &100);
        resizer.mirror_value(2, &200);
        assert_eq!(resizer.shadow.slot_at(0), Some(&100));
        assert_eq!(resizer.shadow.slot_at(2), None);

        resizer.mirror_removal(0);
        assert_eq!(resizer.shadow.slot_at(0), None);
        assert_eq!(resizer.shadow.len(), 0);
    }

    #[test]
    fn borrowed_slots_are_copied_again() {
        let mut active = full_store(2);
        let mut resizer = Resizer::arm(&active);
        resizer.finish(&active);

        resizer.mirror_borrow_mut(1);
        resizer.mirror_borrow_mut(1);
        *active.get_mut(1).unwrap() = 77;

        assert!(!resizer.is_complete());

        resizer.step(&active);
        assert!(resizer.is_complete());
        assert_eq!(resizer.shadow.slot_at(1), Some(&77));
    }

    #[test]
    fn finish_is_bounded_for_empty_store() {
        let active = SlotStore::<u32>::with_capacity(0);
        let mut resizer = Resizer::arm(&active);

        resizer.finish(&active);

        assert!(resizer.is_complete());
        assert_eq!(resizer.into_shadow().capacity(), 0);
    }
}
