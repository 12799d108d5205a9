/// Size in bytes of an encoded [`StoreKey`].
pub const STORE_KEY_SIZE: usize = core::mem::size_of::<u64>();

/// Order-preserving byte encoding of a message identifier.
///
/// Identifiers are stored big-endian so that the byte-wise (lexicographic)
/// order used by the storage engine is the same as numeric order. Cursor
/// pagination relies on this: a range scan starting at `StoreKey::new(n)`
/// visits exactly the identifiers `>= n`, ascending.
///
/// ```
/// use missive::StoreKey;
///
/// let low = StoreKey::new(255);
/// let high = StoreKey::new(256);
/// assert!(low.as_bytes() < high.as_bytes());
/// assert_eq!(StoreKey::decode(high.as_bytes()), Some(256));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StoreKey([u8; STORE_KEY_SIZE]);

impl StoreKey {
    pub const fn new(id: u64) -> Self {
        Self(id.to_be_bytes())
    }

    pub const fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub const fn id(&self) -> u64 {
        u64::from_be_bytes(self.0)
    }

    /// Decodes a raw key read back from storage.
    ///
    /// Returns `None` if `bytes` is not exactly [`STORE_KEY_SIZE`] long.
    pub fn decode(bytes: &[u8]) -> Option<u64> {
        let raw: [u8; STORE_KEY_SIZE] = bytes.try_into().ok()?;
        Some(u64::from_be_bytes(raw))
    }
}

impl From<u64> for StoreKey {
    fn from(id: u64) -> Self {
        Self::new(id)
    }
}
