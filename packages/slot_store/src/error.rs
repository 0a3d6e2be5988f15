use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::Key;

/// Errors that can occur when operating on a slot store.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// No key is available for a new item, resizing is disabled and the item could not be
    /// placed in the overflow buffer either.
    #[error("no more keys available: the store is full")]
    PoolExhausted,

    /// The key is not associated with an item.
    #[error("key {key} is not associated with an item")]
    KeyNotFound {
        /// The key that was looked up.
        key: Key,
    },

    /// The key falls outside the key range of the store, or an operation that requires a
    /// key in use was given one that is not.
    #[error("key {key} is outside the key range of the store or not in use")]
    InvalidKey {
        /// The key that was looked up.
        key: Key,
    },

    /// A switch to the resized storage was requested before the migration into it finished,
    /// or while resizing was disabled.
    #[error("cannot switch to resized storage: resizing is disabled or migration is not finished")]
    ResizeNotReady,

    /// A snapshot file could not be opened, read or written.
    #[error("snapshot I/O failed for '{}'", .path.display())]
    Io {
        /// The snapshot file involved.
        path: PathBuf,

        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A snapshot did not match the expected text format.
    #[error("malformed snapshot at line {line}: {problem}")]
    MalformedSnapshot {
        /// One-based line number at which the problem was detected.
        line: usize,

        /// A human-readable description of the problem.
        problem: String,
    },
}

impl Error {
    pub(crate) fn malformed(line: usize, problem: impl Into<String>) -> Self {
        Self::MalformedSnapshot {
            line,
            problem: problem.into(),
        }
    }
}

/// A specialized `Result` type for slot store operations, returning the crate's
/// [`Error`] type as the error value.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::fmt::Debug;

    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(Error: Send, Sync, Debug);

    #[test]
    fn messages_name_the_key() {
        assert_eq!(
            Error::InvalidKey { key: 42 }.to_string(),
            "key 42 is outside the key range of the store or not in use"
        );
        assert_eq!(
            Error::KeyNotFound { key: -3 }.to_string(),
            "key -3 is not associated with an item"
        );
    }

    #[test]
    fn malformed_reports_line() {
        let error = Error::malformed(7, "expected 'queueSize:'");

        assert_eq!(
            error.to_string(),
            "malformed snapshot at line 7: expected 'queueSize:'"
        );
    }

    #[test]
    fn io_error_exposes_source() {
        let error = Error::Io {
            path: PathBuf::from("missing.txt"),
            source: io::Error::new(io::ErrorKind::NotFound, "gone"),
        };

        let source = std::error::Error::source(&error).unwrap();
        assert_eq!(source.to_string(), "gone");
        assert!(error.to_string().contains("missing.txt"));
    }
}
