//! Cursor pagination over a [`MessageStore`].
//!
//! A page is read by opening a forward scan at the cursor, taking up to
//! `limit` records and then peeking at most one more. If the peek finds a
//! record, its identifier becomes the cursor for the following page; if it
//! finds nothing, the listing is exhausted. The cursor therefore always names
//! the first record of the next page, not the last record of this one.
//!
//! Identifier `0` is never allocated, so [`NO_CURSOR`] doubles as "start
//! from the beginning" on input and "no further pages" on output.

use crate::{DetailedMessage, MessageStore, Result};
#[cfg(feature = "tracing")]
use tracing::instrument;

/// Cursor value meaning "from the beginning" / "no next page".
pub const NO_CURSOR: u64 = 0;

/// One page of records plus the cursor for the page after it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Page {
    /// Records in ascending identifier order.
    pub records: Vec<DetailedMessage>,
    /// First identifier of the next page, or `None` once exhausted.
    pub next_id: Option<u64>,
}

impl Page {
    pub fn is_last(&self) -> bool {
        self.next_id.is_none()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The continuation cursor with `None` flattened to [`NO_CURSOR`].
    pub fn cursor(&self) -> u64 {
        self.next_id.unwrap_or(NO_CURSOR)
    }

    pub fn into_parts(self) -> (Vec<DetailedMessage>, Option<u64>) {
        (self.records, self.next_id)
    }
}

/// Reads up to `limit` records with identifiers `>= start`.
///
/// A `limit` of zero returns an empty, final page without opening a scan.
///
/// # Example
///
/// ```
/// use missive::{MemoryStore, MessageStore, list_page};
///
/// let store = MemoryStore::new();
/// for payload in ["foo", "bar", "baz"] {
///     store.create(payload).unwrap();
/// }
///
/// let page = list_page(&store, 2, 1).unwrap();
/// assert_eq!(page.len(), 2);
/// assert_eq!(page.next_id, Some(3));
///
/// let page = list_page(&store, 2, 3).unwrap();
/// assert_eq!(page.len(), 1);
/// assert!(page.is_last());
/// ```
#[cfg_attr(feature = "tracing", instrument(level = "debug", skip(store)))]
pub fn list_page<S>(store: &S, limit: usize, start: u64) -> Result<Page>
where
    S: MessageStore + ?Sized,
{
    if limit == 0 {
        return Ok(Page::default());
    }

    let mut scan = store.scan_from(start)?;
    let mut records = Vec::with_capacity(limit.min(128));

    while records.len() < limit {
        match scan.next() {
            Some(record) => records.push(record?),
            None => return Ok(Page { records, next_id: None }),
        }
    }

    let next_id = scan.next().transpose()?.map(|peeked| peeked.id());
    Ok(Page { records, next_id })
}

/// Iterates every page of `store`, following cursors from the beginning.
pub fn pages<S>(store: &S, limit: usize) -> Pages<'_, S>
where
    S: MessageStore + ?Sized,
{
    Pages {
        store,
        limit,
        cursor: Some(NO_CURSOR),
    }
}

/// Iterator returned by [`pages`].
///
/// Yields at least one page and stops after the first page without a
/// cursor, or after the first error.
pub struct Pages<'a, S: ?Sized> {
    store: &'a S,
    limit: usize,
    cursor: Option<u64>,
}

impl<S> Iterator for Pages<'_, S>
where
    S: MessageStore + ?Sized,
{
    type Item = Result<Page>;

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.cursor.take()?;
        let page = list_page(self.store, self.limit, start);
        if let Ok(page) = &page {
            self.cursor = page.next_id;
        }
        Some(page)
    }
}
