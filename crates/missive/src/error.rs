//! Error types for the message store.
//!
//! [`Error`] separates the outcomes a caller is expected to handle locally
//! from the ones it must not paper over:
//!
//! - `NotFound`: the identifier has no current record. An ordinary result.
//! - `ReservedId`: identifier `0` was used as a record key. `0` is the "no
//!   cursor" sentinel and is never allocated.
//! - `Storage`: the backing database failed for a reason other than key
//!   absence. Nothing was written; retrying is the caller's decision.
//! - `Encode`: a record could not be serialized; nothing was written.
//! - `Integrity`: persisted data is malformed or a required table is gone.
//!   The process should stop rather than guess.

/// Store result type.
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// All errors a [`MessageStore`](crate::MessageStore) can produce.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// No record is stored under `id`.
    #[error("message {id} not found")]
    NotFound { id: u64 },

    /// Identifier `0` cannot key a record.
    #[error("identifier 0 is reserved and cannot key a record")]
    ReservedId,

    /// The underlying storage engine failed.
    #[error("storage error: {0}")]
    Storage(#[from] redb::Error),

    /// A record could not be serialized for storage.
    #[error("failed to encode record: {0}")]
    Encode(#[source] serde_json::Error),

    /// Persisted state violates a store invariant.
    #[error("integrity fault: {reason}")]
    Integrity { reason: String },
}

impl Error {
    pub(crate) fn integrity(reason: impl Into<String>) -> Self {
        Self::Integrity {
            reason: reason.into(),
        }
    }

    /// Returns `true` for [`Error::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` for faults that must terminate the process.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Integrity { .. })
    }
}

// redb reports each phase of a transaction with its own error type. All of
// them funnel into `Storage` except a missing table, which can only happen if
// something outside the store dropped it.
macro_rules! storage_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Error {
                fn from(err: $ty) -> Self {
                    Self::Storage(redb::Error::from(err))
                }
            }
        )*
    };
}

storage_from!(
    redb::DatabaseError,
    redb::TransactionError,
    redb::StorageError,
    redb::CommitError,
);

impl From<redb::TableError> for Error {
    fn from(err: redb::TableError) -> Self {
        match err {
            redb::TableError::TableDoesNotExist(name) => {
                Self::integrity(format!("table `{name}` is missing"))
            }
            other => Self::Storage(redb::Error::from(other)),
        }
    }
}
