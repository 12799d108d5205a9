//! # missive
//!
//! A persistent, ordered message store.
//!
//! Every message is stored together with metadata derived from its payload,
//! keyed by an identifier the store allocates. Identifiers start at `1`,
//! only ever increase, and are never reused, not even after a deletion or a
//! restart. Records iterate in identifier order, which is what makes cursor
//! pagination stable across calls.
//!
//! ## Crate Layout
//!
//! - [`MessageStore`] - the storage contract, with the durable [`RedbStore`]
//!   and the process-local [`MemoryStore`] backends.
//! - [`list_page`] / [`pages`] - bounded pages with a continuation cursor.
//! - [`derive`] / [`is_palindrome`] - payload metadata.
//! - [`StoreKey`] - the order-preserving key encoding.
//!
//! ## Example
//!
//! ```
//! use missive::{MemoryStore, MessageStore, list_page};
//!
//! let store = MemoryStore::new();
//! let created = store.create("never odd or even").unwrap();
//! assert_eq!(created.id(), 1);
//! assert!(created.metadata().palindrome);
//!
//! let page = list_page(&store, 20, 0).unwrap();
//! assert_eq!(page.records, vec![created]);
//! assert!(page.is_last());
//! ```
//!
//! ## Features
//!
//! - `tracing`: emit `trace`/`debug` spans around store and pagination calls.

mod error;
mod key;
mod metadata;
mod model;
mod pagination;
mod store;

pub use crate::error::*;
pub use crate::key::*;
pub use crate::metadata::*;
pub use crate::model::*;
pub use crate::pagination::*;
pub use crate::store::*;
