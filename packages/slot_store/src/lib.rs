#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! A slot container that hands out stable integer keys for stored values over a bounded key
//! range, with optional incremental growth and an optional overflow buffer.
//!
//! The crate is layered, leaf first:
//!
//! * [`KeyAllocator`] issues integer ids from a closed range and takes back ids for reuse.
//! * [`SlotStore`] is a fixed-capacity array of slots whose keys come from a [`KeyAllocator`].
//! * [`OffsetSlotStore`] wraps a [`SlotStore`] with a key offset, incremental resizing, an
//!   overflow buffer and text snapshots. This is the type most callers want.
//!
//! # Key reuse
//!
//! Removing an item does not make its key available again. The allocator only reuses ids it
//! has never issued, so keys stay unique until the store is cleared. Once every key has been
//! issued the store is full, regardless of how many items have since been removed.
//!
//! # Example
//!
//! ```
//! use slot_store::{Insertion, OffsetSlotStore};
//!
//! let mut store = OffsetSlotStore::builder()
//!     .key_range(100, 102)
//!     .buffer(true)
//!     .build();
//!
//! let first = store.insert("first").unwrap();
//! let second = store.insert("second").unwrap();
//! assert_eq!(first, Insertion::Stored(100));
//! assert_eq!(second, Insertion::Stored(101));
//!
//! // The store is full and resizing is disabled, so the value is buffered instead.
//! assert_eq!(store.insert("third").unwrap(), Insertion::Buffered);
//! assert_eq!(store.buffer_len(), 1);
//!
//! // With resizing enabled, a full store doubles its capacity instead.
//! store.enable_resizing();
//! assert_eq!(store.insert("fourth").unwrap(), Insertion::Stored(102));
//! assert_eq!(store.capacity(), 4);
//! ```
//!
//! # Snapshots
//!
//! An [`OffsetSlotStore`] can be saved to and restored from a line-oriented text format, see
//! [`OffsetSlotStore::snapshot()`] and [`OffsetSlotStore::restore_snapshot()`].
//!
//! # Thread safety
//!
//! The types in this crate are plain single-owner data structures. They can be moved between
//! threads if the items can, but sharing requires external synchronization such as a `Mutex`.

mod builder;
mod error;
mod insertion;
mod key_allocator;
mod offset_slot_store;
mod resizer;
mod slot_store;
mod snapshot;

pub use builder::*;
pub use error::*;
pub use insertion::*;
pub use key_allocator::*;
pub use offset_slot_store::OffsetSlotStore;
pub(crate) use resizer::*;
pub use slot_store::SlotStore;

/// A key identifying an item in a store.
///
/// Keys are signed because an [`OffsetSlotStore`] may use a key range that starts below zero.
pub type Key = i64;
