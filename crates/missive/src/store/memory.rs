use crate::{DetailedMessage, Error, MessageStore, Result, store::check_key};
use parking_lot::Mutex;
use portable_atomic::{AtomicU64, Ordering};
use std::collections::BTreeMap;
#[cfg(feature = "tracing")]
use tracing::instrument;

/// A process-local [`MessageStore`] backed by a [`BTreeMap`].
///
/// Records live behind a single mutex; the identifier sequence is a separate
/// atomic counter so allocation never waits on readers. Nothing survives the
/// process, which makes this store a fit for tests and scratch instances.
///
/// ## See Also
/// - [`RedbStore`]
///
/// [`RedbStore`]: crate::RedbStore
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<BTreeMap<u64, DetailedMessage>>,
    last_id: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    fn allocate(&self) -> u64 {
        self.last_id.fetch_add(1, Ordering::AcqRel) + 1
    }
}

impl MessageStore for MemoryStore {
    type Scan<'a> = MemoryScan<'a>;

    fn next_id(&self) -> Result<u64> {
        Ok(self.allocate())
    }

    fn get(&self, id: u64) -> Result<DetailedMessage> {
        self.records
            .lock()
            .get(&id)
            .cloned()
            .ok_or(Error::NotFound { id })
    }

    fn put(&self, record: &DetailedMessage) -> Result<()> {
        check_key(record.id())?;
        self.records.lock().insert(record.id(), record.rederived());
        Ok(())
    }

    fn delete(&self, id: u64) -> Result<()> {
        match self.records.lock().remove(&id) {
            Some(_) => Ok(()),
            None => Err(Error::NotFound { id }),
        }
    }

    fn scan_from(&self, start: u64) -> Result<Self::Scan<'_>> {
        Ok(MemoryScan {
            store: self,
            next: Some(start),
        })
    }

    fn clear(&self) -> Result<()> {
        self.records.lock().clear();
        Ok(())
    }

    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self, payload)))]
    fn create(&self, payload: &str) -> Result<DetailedMessage> {
        // Allocate under the lock so records become visible in id order.
        let mut records = self.records.lock();
        let record = DetailedMessage::new(self.allocate(), payload);
        records.insert(record.id(), record.clone());
        Ok(record)
    }

    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self, payload)))]
    fn update(&self, id: u64, payload: &str) -> Result<DetailedMessage> {
        let mut records = self.records.lock();
        let slot = records.get_mut(&id).ok_or(Error::NotFound { id })?;
        *slot = slot.with_payload(payload);
        Ok(slot.clone())
    }
}

/// Lazy forward scan over a [`MemoryStore`].
///
/// Each step re-seeks past the last yielded identifier under a short lock, so
/// the scan never holds the store while the caller processes a record.
pub struct MemoryScan<'a> {
    store: &'a MemoryStore,
    next: Option<u64>,
}

impl Iterator for MemoryScan<'_> {
    type Item = Result<DetailedMessage>;

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.next?;
        let record = self
            .store
            .records
            .lock()
            .range(start..)
            .next()
            .map(|(_, record)| record.clone());

        // Once exhausted the scan stays exhausted, even if records land
        // behind it later.
        self.next = record.as_ref().and_then(|r| r.id().checked_add(1));
        record.map(Ok)
    }
}
