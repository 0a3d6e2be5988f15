//! Text snapshots of an [`OffsetSlotStore`].
//!
//! A snapshot is a line-oriented text document with a fixed field order:
//!
//! ```text
//! version: 2.0
//! name: inventory
//! offset: 10
//! lastKey: 3
//! dynamicResizing: false
//! queueEnabled: true
//! queueSize: 1
//! entries:
//! 10 apple
//! 12 cherry
//! queueEntries:
//! durian
//! ```
//!
//! Entries are listed in ascending key order, each as the key, a single space and the value.
//! Buffered values follow one per line, oldest first. Values are written with [`Display`] and
//! read back with [`FromStr`], so they must not contain line breaks and must survive that round
//! trip. A store without a name is written as `(unnamed)`.

use std::collections::VecDeque;
use std::fmt::{self, Display};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::str::{FromStr, Lines};

use crate::offset_slot_store::RestoredState;
use crate::{Error, Key, OffsetSlotStore, SlotStore};

const VERSION: &str = "2.0";
const UNNAMED: &str = "(unnamed)";

impl<T: Display> OffsetSlotStore<T> {
    /// Returns a value that formats the store as a snapshot.
    ///
    /// # Example
    ///
    /// ```rust
    /// use slot_store::OffsetSlotStore;
    ///
    /// let mut store = OffsetSlotStore::builder().capacity(2).name("small").build();
    /// _ = store.insert(42).unwrap();
    ///
    /// let text = store.snapshot().to_string();
    /// assert!(text.starts_with("version: 2.0\nname: small\n"));
    /// assert!(text.contains("entries:\n0 42\nqueueEntries:\n"));
    /// ```
    pub fn snapshot(&self) -> impl Display + '_ {
        SnapshotDisplay { store: self }
    }

    /// Writes a snapshot of the store to a file, replacing the file if it exists.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be created or written.
    pub fn save_to_path(&self, path: impl AsRef<Path>) -> crate::Result<()> {
        let path = path.as_ref();
        let io_error = |source| Error::Io {
            path: path.to_path_buf(),
            source,
        };

        let file = File::create(path).map_err(io_error)?;
        let mut writer = BufWriter::new(file);

        write!(writer, "{}", self.snapshot()).map_err(io_error)?;
        writer.flush().map_err(io_error)?;

        tracing::debug!(
            path = %path.display(),
            entries = self.len(),
            buffered = self.buffer_len(),
            "saved snapshot"
        );

        Ok(())
    }
}

impl<T> OffsetSlotStore<T>
where
    T: Clone + FromStr,
    T::Err: Display,
{
    /// Replaces the contents and configuration of the store with those of a snapshot.
    ///
    /// The snapshot is parsed in full before anything is replaced, so on error the store is
    /// left as it was. Callers must not expect a failed restore to have applied any part of the
    /// snapshot.
    ///
    /// The key allocator is rebuilt fresh over the range `[offset, lastKey]` of the snapshot,
    /// limited to the physical slots and starting at the first vacant one. What it had
    /// recycled before saving is not part of the snapshot, so a restored store may hand out
    /// keys the saved store would not have. A restored store without a vacant slot in that
    /// range is full: inserts grow the store or go to the overflow buffer as configured.
    /// Entries whose keys fall outside the snapshot's key range are ignored and the
    /// `queueSize` field is not checked.
    ///
    /// # Example
    ///
    /// ```rust
    /// use slot_store::OffsetSlotStore;
    ///
    /// let mut original = OffsetSlotStore::builder().key_range(5, 8).build();
    /// _ = original.insert(String::from("five")).unwrap();
    ///
    /// let mut restored = OffsetSlotStore::<String>::new();
    /// restored.restore_snapshot(&original.snapshot().to_string()).unwrap();
    ///
    /// assert_eq!(restored.offset(), 5);
    /// assert_eq!(restored.get(5).unwrap(), "five");
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedSnapshot`] if the text does not follow the snapshot format.
    pub fn restore_snapshot(&mut self, snapshot: &str) -> crate::Result<()> {
        let state = parse(snapshot)?;
        self.restore(state);
        Ok(())
    }

    /// Replaces the contents and configuration of the store with those of a snapshot file.
    ///
    /// See [`restore_snapshot()`][1] for how the snapshot is applied.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read, or [`Error::MalformedSnapshot`] if
    /// its contents do not follow the snapshot format. The store is unchanged in both cases.
    ///
    /// [1]: Self::restore_snapshot
    pub fn load_from_path(&mut self, path: impl AsRef<Path>) -> crate::Result<()> {
        let path = path.as_ref();

        let text = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;

        self.restore_snapshot(&text)?;

        tracing::debug!(
            path = %path.display(),
            entries = self.len(),
            buffered = self.buffer_len(),
            "loaded snapshot"
        );

        Ok(())
    }
}

struct SnapshotDisplay<'a, T> {
    store: &'a OffsetSlotStore<T>,
}

impl<T: Display> Display for SnapshotDisplay<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let store = self.store;

        writeln!(f, "version: {VERSION}")?;
        writeln!(f, "name: {}", store.name().unwrap_or(UNNAMED))?;
        writeln!(f, "offset: {}", store.offset())?;
        writeln!(f, "lastKey: {}", store.store().last_key())?;
        writeln!(f, "dynamicResizing: {}", store.is_resizing_enabled())?;
        writeln!(f, "queueEnabled: {}", store.is_buffer_enabled())?;
        writeln!(f, "queueSize: {}", store.buffer_len())?;

        writeln!(f, "entries:")?;
        for (key, value) in store.iter() {
            writeln!(f, "{key} {value}")?;
        }

        writeln!(f, "queueEntries:")?;
        for value in store.buffer() {
            writeln!(f, "{value}")?;
        }

        Ok(())
    }
}

/// Walks the snapshot line by line, keeping track of line numbers for error reporting.
struct Cursor<'a> {
    lines: Lines<'a>,

    /// One-based number of the line most recently returned, 0 before the first.
    number: usize,
}

impl<'a> Cursor<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            lines: text.lines(),
            number: 0,
        }
    }

    /// Returns the next line and its one-based number.
    fn next_line(&mut self) -> Option<(usize, &'a str)> {
        let line = self.lines.next()?;

        self.number = self
            .number
            .checked_add(1)
            .expect("line count cannot reach usize::MAX");

        Some((self.number, line))
    }

    fn premature_end(&self, expected: &str) -> Error {
        Error::malformed(
            self.number.saturating_add(1),
            format!("snapshot ends before '{expected}'"),
        )
    }

    /// Reads a `label: value` line and returns the value.
    fn field(&mut self, label: &str) -> crate::Result<(usize, &'a str)> {
        let (number, line) = self
            .next_line()
            .ok_or_else(|| self.premature_end(label))?;

        let value = line
            .strip_prefix(label)
            .and_then(|rest| rest.strip_prefix(':'))
            .ok_or_else(|| Error::malformed(number, format!("expected '{label}:'")))?;

        Ok((number, value.strip_prefix(' ').unwrap_or(value)))
    }

    /// Reads a `label: value` line and parses the value, returning it with its line number.
    fn parsed_field<V>(&mut self, label: &str) -> crate::Result<(usize, V)>
    where
        V: FromStr,
        V::Err: Display,
    {
        let (number, value) = self.field(label)?;

        let parsed = value.trim().parse().map_err(|inner| {
            Error::malformed(number, format!("'{label}' value '{value}' is invalid: {inner}"))
        })?;

        Ok((number, parsed))
    }

    /// Reads a line that must consist of exactly the given section header.
    fn section(&mut self, header: &str) -> crate::Result<()> {
        match self.next_line() {
            Some((_, line)) if line.trim_end() == header => Ok(()),
            Some((number, _)) => Err(Error::malformed(number, format!("expected '{header}'"))),
            None => Err(self.premature_end(header)),
        }
    }
}

fn parse<T>(text: &str) -> crate::Result<RestoredState<T>>
where
    T: FromStr,
    T::Err: Display,
{
    let mut cursor = Cursor::new(text);

    let (_, version) = cursor.field("version")?;
    if version.trim() != VERSION {
        tracing::debug!(version, "reading snapshot of unexpected version");
    }

    let (_, name) = cursor.field("name")?;
    let (_, offset): (_, Key) = cursor.parsed_field("offset")?;
    let (last_key_line, last_key): (_, Key) = cursor.parsed_field("lastKey")?;
    let (_, resizing_enabled): (_, bool) = cursor.parsed_field("dynamicResizing")?;
    let (_, buffer_enabled): (_, bool) = cursor.parsed_field("queueEnabled")?;

    // Informational only.
    _ = cursor.field("queueSize")?;

    let capacity = last_key
        .checked_add(1)
        .and_then(|capacity| usize::try_from(capacity).ok())
        .ok_or_else(|| Error::malformed(last_key_line, "'lastKey' must be at least -1"))?;

    let max_key_bound = offset.checked_add(last_key).ok_or_else(|| {
        Error::malformed(last_key_line, "'offset' + 'lastKey' overflows the key type")
    })?;

    let mut store = SlotStore::with_capacity(capacity);

    cursor.section("entries:")?;

    loop {
        let (number, line) = cursor
            .next_line()
            .ok_or_else(|| cursor.premature_end("queueEntries:"))?;

        if line.trim_end() == "queueEntries:" {
            break;
        }

        let (key, value) = line
            .split_once(' ')
            .ok_or_else(|| Error::malformed(number, "expected '<key> <value>'"))?;

        let key: Key = key.parse().map_err(|inner| {
            Error::malformed(number, format!("entry key '{key}' is invalid: {inner}"))
        })?;

        let value: T = value.parse().map_err(|inner| {
            Error::malformed(number, format!("entry value '{value}' is invalid: {inner}"))
        })?;

        if key < offset || key > max_key_bound {
            tracing::trace!(key, "ignoring snapshot entry outside of key range");
            continue;
        }

        let index = key
            .checked_sub(offset)
            .and_then(|physical| usize::try_from(physical).ok())
            .expect("key was checked to be within the key range");

        store.put_at(index, Some(value));
    }

    let mut buffer = VecDeque::new();

    while let Some((number, line)) = cursor.next_line() {
        let value: T = line.parse().map_err(|inner| {
            Error::malformed(number, format!("buffered value '{line}' is invalid: {inner}"))
        })?;

        buffer.push_back(value);
    }

    store.reset_allocator(offset, last_key);

    Ok(RestoredState {
        name: Some(name.to_string()).filter(|name| !name.is_empty() && name != UNNAMED),
        offset,
        store,
        resizing_enabled,
        buffer_enabled,
        buffer,
    })
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::Insertion;

    fn fruit_store() -> OffsetSlotStore<String> {
        let mut store = OffsetSlotStore::builder()
            .key_range(10, 14)
            .name("fruit")
            .buffer(true)
            .build();

        for fruit in ["apple", "banana", "cherry", "date"] {
            _ = store.insert(fruit.to_string()).unwrap();
        }
        store.remove(11).unwrap();

        // Full, so this goes to the buffer.
        assert!(store.insert("elder berry".to_string()).unwrap().is_buffered());

        store
    }

    #[test]
    fn writes_fields_in_order() {
        let text = fruit_store().snapshot().to_string();

        assert_eq!(
            text,
            "version: 2.0\n\
             name: fruit\n\
             offset: 10\n\
             lastKey: 3\n\
             dynamicResizing: false\n\
             queueEnabled: true\n\
             queueSize: 1\n\
             entries:\n\
             10 apple\n\
             12 cherry\n\
             13 date\n\
             queueEntries:\n\
             elder berry\n"
        );
    }

    #[test]
    fn unnamed_store_is_marked() {
        let store = OffsetSlotStore::<u8>::builder().capacity(1).build();
        let text = store.snapshot().to_string();

        assert!(text.contains("\nname: (unnamed)\n"));

        let mut restored = OffsetSlotStore::<u8>::builder().name("old").build();
        restored.restore_snapshot(&text).unwrap();
        assert_eq!(restored.name(), None);
    }

    #[test]
    fn restore_reproduces_contents() {
        let original = fruit_store();

        let mut restored = OffsetSlotStore::<String>::new();
        restored
            .restore_snapshot(&original.snapshot().to_string())
            .unwrap();

        assert_eq!(restored.name(), Some("fruit"));
        assert_eq!(restored.offset(), 10);
        assert_eq!(restored.max_key_bound(), 13);
        assert!(restored.is_buffer_enabled());
        assert!(!restored.is_resizing_enabled());

        let original_items: Vec<_> = original.iter().collect();
        let restored_items: Vec<_> = restored.iter().collect();
        assert_eq!(original_items, restored_items);

        assert_eq!(restored.buffer(), original.buffer());
        assert_eq!(restored.len(), 3);
    }

    #[test]
    fn restore_resets_allocator_range() {
        let mut original = OffsetSlotStore::builder().capacity(3).build();
        for value in 0..3 {
            _ = original.insert(value).unwrap();
        }
        original.remove(1).unwrap();
        assert!(original.allocator().is_empty());

        let mut restored = OffsetSlotStore::<i32>::new();
        restored
            .restore_snapshot(&original.snapshot().to_string())
            .unwrap();

        // Key 0 is in use, so the allocator starts past it.
        assert_eq!(restored.allocator().frontier(), 1);
        assert_eq!(restored.allocator().max_id(), 2);

        // Key 1 could never be reissued by the original, but the restored store hands it out.
        assert_eq!(restored.insert(7).unwrap().key(), Some(1));
    }

    fn restored_full_store(resizing: bool, buffer: bool) -> OffsetSlotStore<i32> {
        let mut original = OffsetSlotStore::builder()
            .capacity(3)
            .resizing(resizing)
            .buffer(buffer)
            .build();
        for value in 0..3 {
            _ = original.insert(value).unwrap();
        }

        let mut restored = OffsetSlotStore::<i32>::new();
        restored
            .restore_snapshot(&original.snapshot().to_string())
            .unwrap();

        restored
    }

    #[test]
    fn restored_full_store_buffers() {
        let mut restored = restored_full_store(false, true);

        assert!(restored.allocator().is_empty());
        assert_eq!(restored.insert(99).unwrap(), Insertion::Buffered);
        assert_eq!(restored.buffer_len(), 1);
        assert_eq!(restored.len(), 3);
    }

    #[test]
    fn restored_full_store_grows() {
        let mut restored = restored_full_store(true, true);

        assert_eq!(restored.insert(99).unwrap(), Insertion::Stored(3));
        assert_eq!(restored.capacity(), 6);
        assert_eq!(restored.buffer_len(), 0);

        for value in 0..3 {
            assert_eq!(*restored.get(Key::from(value)).unwrap(), value);
        }
    }

    #[test]
    fn restored_full_store_without_growth_or_buffer_is_error() {
        let mut restored = restored_full_store(false, false);

        assert!(matches!(restored.insert(99), Err(Error::PoolExhausted)));
        assert_eq!(restored.len(), 3);
    }

    #[test]
    fn restore_with_large_offset_keeps_inserts_bounded() {
        let text = "version: 2.0\n\
                    name: far\n\
                    offset: 1000000000000\n\
                    lastKey: 0\n\
                    dynamicResizing: false\n\
                    queueEnabled: true\n\
                    queueSize: 0\n\
                    entries:\n\
                    1000000000000 7\n\
                    queueEntries:\n";

        let mut store = OffsetSlotStore::<u32>::new();
        store.restore_snapshot(text).unwrap();

        assert!(store.allocator().is_empty());
        assert_eq!(store.insert(1).unwrap(), Insertion::Buffered);

        store.enable_resizing();
        assert_eq!(
            store.insert(2).unwrap(),
            Insertion::Stored(1_000_000_000_001)
        );
        assert_eq!(*store.get(1_000_000_000_000).unwrap(), 7);
    }

    #[test]
    fn restore_with_resizing_arms_migration() {
        let original = OffsetSlotStore::<u8>::builder()
            .capacity(2)
            .resizing(true)
            .build();

        let mut restored = OffsetSlotStore::<u8>::new();
        restored
            .restore_snapshot(&original.snapshot().to_string())
            .unwrap();

        assert!(restored.is_resizing_enabled());
        assert!(restored.is_migration_in_progress());
        assert_eq!(restored.capacity(), 2);
    }

    #[test]
    fn out_of_range_entries_are_ignored() {
        let text = "version: 2.0\n\
                    name: x\n\
                    offset: 5\n\
                    lastKey: 1\n\
                    dynamicResizing: false\n\
                    queueEnabled: false\n\
                    queueSize: 99\n\
                    entries:\n\
                    4 low\n\
                    5 five\n\
                    7 high\n\
                    queueEntries:\n";

        let mut store = OffsetSlotStore::<String>::new();
        store.restore_snapshot(text).unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.get(5).unwrap(), "five");
        assert_eq!(store.buffer_len(), 0);
    }

    #[test]
    fn malformed_snapshot_leaves_store_untouched() {
        let mut store = fruit_store();
        let before = store.snapshot().to_string();

        let broken = before.replace("offset: 10", "offset: ten");
        let error = store.restore_snapshot(&broken).unwrap_err();

        assert!(matches!(error, Error::MalformedSnapshot { line: 3, .. }));
        assert_eq!(store.snapshot().to_string(), before);
    }

    #[test]
    fn truncated_snapshot_is_error() {
        let text = fruit_store().snapshot().to_string();
        let truncated = text.split("queueEntries:").next().unwrap();

        let mut store = OffsetSlotStore::<String>::new();
        let error = store.restore_snapshot(truncated).unwrap_err();

        assert!(matches!(error, Error::MalformedSnapshot { line: 12, .. }));
    }

    #[test]
    fn wrong_label_is_error() {
        let text = fruit_store()
            .snapshot()
            .to_string()
            .replace("lastKey:", "last_key:");

        let mut store = OffsetSlotStore::<String>::new();

        assert!(matches!(
            store.restore_snapshot(&text),
            Err(Error::MalformedSnapshot { line: 4, .. })
        ));
    }

    #[test]
    fn unparseable_entry_is_error() {
        let text = "version: 2.0\n\
                    name: x\n\
                    offset: 0\n\
                    lastKey: 1\n\
                    dynamicResizing: false\n\
                    queueEnabled: false\n\
                    queueSize: 0\n\
                    entries:\n\
                    0 zero\n\
                    queueEntries:\n";

        let mut store = OffsetSlotStore::<u32>::new();

        assert!(matches!(
            store.restore_snapshot(text),
            Err(Error::MalformedSnapshot { line: 9, .. })
        ));
    }

    #[test]
    fn negative_capacity_is_error() {
        let text = "version: 2.0\n\
                    name: x\n\
                    offset: 0\n\
                    lastKey: -2\n\
                    dynamicResizing: false\n\
                    queueEnabled: false\n\
                    queueSize: 0\n\
                    entries:\n\
                    queueEntries:\n";

        let mut store = OffsetSlotStore::<u32>::new();

        assert!(matches!(
            store.restore_snapshot(text),
            Err(Error::MalformedSnapshot { line: 4, .. })
        ));
    }

    #[test]
    fn empty_string_values_survive() {
        let mut store = OffsetSlotStore::builder().capacity(1).buffer(true).build();
        _ = store.insert(String::new()).unwrap();
        _ = store.insert(String::new()).unwrap();

        let mut restored = OffsetSlotStore::<String>::new();
        restored
            .restore_snapshot(&store.snapshot().to_string())
            .unwrap();

        assert_eq!(restored.get(0).unwrap(), "");
        assert_eq!(restored.buffer_len(), 1);
    }
}
