use crate::{DetailedMessage, Error, MessageStore, Result, StoreKey, store::check_key};
use redb::{Database, ReadTransaction, ReadableTable, TableDefinition, WriteTransaction};
use std::path::{Path, PathBuf};
#[cfg(feature = "tracing")]
use tracing::instrument;

/// Name of the record table used by [`RedbStore::open`].
pub const DEFAULT_TABLE: &str = "messages";

/// Last allocated identifier per record table.
///
/// Key: record table name, Value: highest identifier ever handed out.
const SEQUENCES: TableDefinition<&str, u64> = TableDefinition::new("missive_sequences");

/// Key: [`StoreKey`] bytes, Value: JSON-encoded [`DetailedMessage`].
type Records<'a> = TableDefinition<'a, &'static [u8], &'static [u8]>;

type RecordRange = redb::Range<'static, &'static [u8], &'static [u8]>;

/// A durable [`MessageStore`] backed by a [redb](https://docs.rs/redb)
/// database file.
///
/// Records are kept in a named table keyed by big-endian identifiers, so the
/// B-tree order is the identifier order. The identifier sequence lives in a
/// sibling table of the same file and is bumped inside a committed write
/// transaction before the identifier is returned, which is what keeps
/// identifiers unique across restarts.
///
/// redb allows a single writer at a time; that is the only serialization
/// point. Readers run concurrently against the last committed state.
///
/// ## See Also
/// - [`MemoryStore`]
///
/// [`MemoryStore`]: crate::MemoryStore
pub struct RedbStore {
    db: Database,
    table: String,
    path: PathBuf,
}

impl RedbStore {
    /// Creates or opens a store at `path` using [`DEFAULT_TABLE`].
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_table(path, DEFAULT_TABLE)
    }

    /// Creates or opens a store at `path` whose records live in `table`.
    ///
    /// Several stores can share one file under different table names; each
    /// table has its own identifier sequence.
    pub fn open_table(path: impl AsRef<Path>, table: impl Into<String>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let table = table.into();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| Error::Storage(redb::Error::Io(e)))?;
        }

        let db = Database::create(&path)?;

        let txn = db.begin_write()?;
        {
            txn.open_table(Records::new(&table))?;
            txn.open_table(SEQUENCES)?;
        }
        txn.commit()?;

        Ok(Self { db, table, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    fn records(&self) -> Records<'_> {
        Records::new(&self.table)
    }

    fn read(&self) -> Result<ReadTransaction> {
        Ok(self.db.begin_read()?)
    }

    fn write(&self) -> Result<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    /// Bumps the sequence for this table inside `txn`.
    fn allocate(&self, txn: &WriteTransaction) -> Result<u64> {
        let mut sequences = txn.open_table(SEQUENCES)?;
        let last = sequences.get(self.table.as_str())?.map(|v| v.value());
        let next = last
            .unwrap_or(0)
            .checked_add(1)
            .ok_or_else(|| Error::integrity("identifier space exhausted"))?;
        sequences.insert(self.table.as_str(), next)?;
        Ok(next)
    }
}

impl MessageStore for RedbStore {
    type Scan<'a> = RedbScan;

    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    fn next_id(&self) -> Result<u64> {
        let txn = self.write()?;
        let id = self.allocate(&txn)?;
        txn.commit()?;
        Ok(id)
    }

    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    fn get(&self, id: u64) -> Result<DetailedMessage> {
        let txn = self.read()?;
        let table = txn.open_table(self.records())?;
        let key = StoreKey::new(id);

        let value = table.get(key.as_bytes())?;
        match value {
            Some(value) => decode(key.as_bytes(), value.value()),
            None => Err(Error::NotFound { id }),
        }
    }

    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip_all, fields(id = record.id())))]
    fn put(&self, record: &DetailedMessage) -> Result<()> {
        check_key(record.id())?;
        let value = encode(&record.rederived())?;

        let txn = self.write()?;
        {
            let mut table = txn.open_table(self.records())?;
            table.insert(StoreKey::new(record.id()).as_bytes(), value.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    fn delete(&self, id: u64) -> Result<()> {
        let txn = self.write()?;
        let mut table = txn.open_table(self.records())?;
        let removed = table.remove(StoreKey::new(id).as_bytes())?.is_some();
        drop(table);

        if !removed {
            txn.abort()?;
            return Err(Error::NotFound { id });
        }
        txn.commit()?;
        Ok(())
    }

    fn scan_from(&self, start: u64) -> Result<Self::Scan<'_>> {
        let txn = self.read()?;
        let table = txn.open_table(self.records())?;
        let start = StoreKey::new(start);
        let range = table.range::<&[u8]>(start.as_bytes()..)?;

        Ok(RedbScan { range, _txn: txn })
    }

    fn clear(&self) -> Result<()> {
        let txn = self.write()?;
        txn.delete_table(self.records())?;
        txn.open_table(self.records())?;
        txn.commit()?;
        Ok(())
    }

    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip_all))]
    fn create(&self, payload: &str) -> Result<DetailedMessage> {
        let txn = self.write()?;
        let record = DetailedMessage::new(self.allocate(&txn)?, payload);
        let value = encode(&record)?;
        {
            let mut table = txn.open_table(self.records())?;
            table.insert(StoreKey::new(record.id()).as_bytes(), value.as_slice())?;
        }
        txn.commit()?;
        Ok(record)
    }

    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self, payload)))]
    fn update(&self, id: u64, payload: &str) -> Result<DetailedMessage> {
        let key = StoreKey::new(id);
        let txn = self.write()?;
        let updated = {
            let mut table = txn.open_table(self.records())?;
            let existing = table
                .get(key.as_bytes())?
                .map(|value| decode(key.as_bytes(), value.value()))
                .transpose()?;

            match existing {
                Some(existing) => {
                    let record = existing.with_payload(payload);
                    table.insert(key.as_bytes(), encode(&record)?.as_slice())?;
                    Some(record)
                }
                None => None,
            }
        };

        match updated {
            Some(record) => {
                txn.commit()?;
                Ok(record)
            }
            None => {
                txn.abort()?;
                Err(Error::NotFound { id })
            }
        }
    }
}

/// Lazy forward scan over a [`RedbStore`].
///
/// Reads from the snapshot of the read transaction opened by
/// [`MessageStore::scan_from`].
pub struct RedbScan {
    range: RecordRange,
    _txn: ReadTransaction,
}

impl Iterator for RedbScan {
    type Item = Result<DetailedMessage>;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.range.next()?;
        Some(
            entry
                .map_err(Error::from)
                .and_then(|(key, value)| decode(key.value(), value.value())),
        )
    }
}

fn encode(record: &DetailedMessage) -> Result<Vec<u8>> {
    serde_json::to_vec(record).map_err(Error::Encode)
}

/// Decodes a persisted entry. Anything unexpected here is an integrity
/// fault, never a missing record.
fn decode(key: &[u8], value: &[u8]) -> Result<DetailedMessage> {
    let id = StoreKey::decode(key)
        .ok_or_else(|| Error::integrity(format!("malformed {}-byte key", key.len())))?;

    let record: DetailedMessage = serde_json::from_slice(value)
        .map_err(|e| Error::integrity(format!("record {id} is unreadable: {e}")))?;

    if record.id() != id {
        return Err(Error::integrity(format!(
            "record stored under {id} claims id {}",
            record.id()
        )));
    }
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn sequence_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("messages.redb");

        {
            let store = RedbStore::open(&path).unwrap();
            assert_eq!(store.create("first").unwrap().id(), 1);
            assert_eq!(store.next_id().unwrap(), 2);
            store.delete(1).unwrap();
        }

        let store = RedbStore::open(&path).unwrap();
        assert_eq!(store.path(), path.as_path());
        assert_eq!(store.create("second").unwrap().id(), 3);
        assert!(store.get(1).unwrap_err().is_not_found());
    }

    #[test]
    fn tables_keep_independent_sequences() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("shared.redb");

        let a = RedbStore::open_table(&path, "a").unwrap();
        assert_eq!(a.table_name(), "a");
        assert_eq!(a.create("x").unwrap().id(), 1);
        assert_eq!(a.create("y").unwrap().id(), 2);
        drop(a);

        let b = RedbStore::open_table(&path, "b").unwrap();
        assert_eq!(b.create("z").unwrap().id(), 1);
        assert!(b.get(2).unwrap_err().is_not_found());
    }

    #[test]
    fn creates_missing_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/deeper/messages.redb");
        let store = RedbStore::open(&path).unwrap();
        assert_eq!(store.create("hi").unwrap().id(), 1);
    }

    fn write_raw(store: &RedbStore, key: &[u8], value: &[u8]) {
        let txn = store.db.begin_write().unwrap();
        {
            let mut table = txn.open_table(store.records()).unwrap();
            table.insert(key, value).unwrap();
        }
        txn.commit().unwrap();
    }

    #[test]
    fn unreadable_record_is_an_integrity_fault() {
        let dir = TempDir::new().unwrap();
        let store = RedbStore::open(dir.path().join("corrupt.redb")).unwrap();
        store.create("fine").unwrap();
        write_raw(&store, StoreKey::new(2).as_bytes(), b"not json");

        let err = store.get(2).unwrap_err();
        assert!(err.is_fatal(), "{err}");
        assert!(!err.is_not_found());

        let scanned: Vec<_> = store.scan_from(0).unwrap().collect();
        assert_eq!(scanned.len(), 2);
        assert!(scanned[0].is_ok());
        assert!(scanned[1].as_ref().unwrap_err().is_fatal());
    }

    #[test]
    fn mismatched_id_is_an_integrity_fault() {
        let dir = TempDir::new().unwrap();
        let store = RedbStore::open(dir.path().join("mismatch.redb")).unwrap();
        let value = serde_json::to_vec(&DetailedMessage::new(9, "moved")).unwrap();
        write_raw(&store, StoreKey::new(4).as_bytes(), &value);

        assert!(store.get(4).unwrap_err().is_fatal());
        assert!(store.update(4, "again").unwrap_err().is_fatal());
    }

    #[test]
    fn missing_table_is_an_integrity_fault() {
        let dir = TempDir::new().unwrap();
        let store = RedbStore::open(dir.path().join("dropped.redb")).unwrap();

        let txn = store.db.begin_write().unwrap();
        txn.delete_table(store.records()).unwrap();
        txn.commit().unwrap();

        assert!(store.get(1).unwrap_err().is_fatal());
        assert!(store.scan_from(0).err().unwrap().is_fatal());
    }
}
