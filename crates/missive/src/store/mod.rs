//! Ordered message storage.
//!
//! [`MessageStore`] is the contract every backend honors:
//!
//! - records are keyed by their identifier and iterate in ascending order;
//! - [`MessageStore::next_id`] hands out strictly increasing identifiers
//!   starting at `1` and never reissues one, deletions included;
//! - single-record reads and writes are atomic, but a scan is not a snapshot,
//!   so writes landing in the unread part of a scan may or may not show up.
//!
//! ## Backends
//!
//! - [`RedbStore`] - file-backed, durable across restarts.
//! - [`MemoryStore`] - process-local, for tests and throwaway instances.

mod memory;
mod redb_store;

pub use self::memory::*;
pub use self::redb_store::*;

use crate::{DetailedMessage, Error, Result};

/// Ordered, identifier-keyed storage for [`DetailedMessage`] records.
pub trait MessageStore {
    /// Forward iterator returned by [`Self::scan_from`].
    type Scan<'a>: Iterator<Item = Result<DetailedMessage>>
    where
        Self: 'a;

    /// Allocates the next identifier.
    ///
    /// The allocation is recorded before it is returned, so the identifier is
    /// never handed out again, even after a restart.
    fn next_id(&self) -> Result<u64>;

    /// Returns the record stored under `id`.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if no record exists.
    fn get(&self, id: u64) -> Result<DetailedMessage>;

    /// Inserts or overwrites `record` under its own identifier.
    ///
    /// # Errors
    ///
    /// [`Error::ReservedId`] if the record's identifier is `0`.
    fn put(&self, record: &DetailedMessage) -> Result<()>;

    /// Removes the record stored under `id`.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if no record exists.
    fn delete(&self, id: u64) -> Result<()>;

    /// Iterates records with identifiers `>= start`, ascending.
    ///
    /// The iterator is lazy and can be opened at any identifier, not only at
    /// one previously yielded.
    fn scan_from(&self, start: u64) -> Result<Self::Scan<'_>>;

    /// Removes every record. The identifier sequence is left untouched.
    fn clear(&self) -> Result<()>;

    /// Allocates an identifier and stores a new record for `payload`.
    fn create(&self, payload: &str) -> Result<DetailedMessage> {
        let record = DetailedMessage::new(self.next_id()?, payload);
        self.put(&record)?;
        Ok(record)
    }

    /// Replaces the payload of the existing record `id` and re-derives its
    /// metadata.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if no record exists; nothing is created.
    fn update(&self, id: u64, payload: &str) -> Result<DetailedMessage> {
        let record = self.get(id)?.with_payload(payload);
        self.put(&record)?;
        Ok(record)
    }
}

/// Rejects the reserved identifier before it reaches a backend.
pub(crate) fn check_key(id: u64) -> Result<()> {
    if id == 0 {
        return Err(Error::ReservedId);
    }
    Ok(())
}
