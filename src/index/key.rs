//! Index key types.
//!
//! - [`IndexKey`]: bound for fixed-size, totally ordered key types
//! - [`DocumentId`]: 16-byte document identifier, the value stored in
//!   secondary and unique index trees
//! - [`CompositeKey`]: `(field, id)` pair letting a secondary index hold
//!   several documents with the same field value

use std::fmt;

use serde::{Deserialize, Serialize};

use super::definition::FieldType;

/// A key type an index tree can be ordered by.
///
/// Implementors have a fixed in-memory size (`Copy`) and a total order.
/// `Default` is the lower bound of an open-ended range scan and
/// [`upper_bound`](IndexKey::upper_bound) the upper one.
pub trait IndexKey: Copy + Ord + Default + fmt::Debug + Send + Sync + 'static {
    /// Type tag recorded in the index definition.
    const FIELD_TYPE: FieldType;

    /// Usable byte width of fixed-width string keys, 0 otherwise.
    const STRING_WIDTH: usize = 0;

    /// Largest value of the type, if the index layer knows it.
    ///
    /// Only `i32`, `i64` and [`DocumentId`] provide one; open-ended range
    /// scans over any other key type are rejected.
    fn upper_bound() -> Option<Self> {
        None
    }
}

impl IndexKey for i32 {
    const FIELD_TYPE: FieldType = FieldType::Int32;

    fn upper_bound() -> Option<Self> {
        Some(i32::MAX)
    }
}

impl IndexKey for i64 {
    const FIELD_TYPE: FieldType = FieldType::Int64;

    fn upper_bound() -> Option<Self> {
        Some(i64::MAX)
    }
}

impl IndexKey for u32 {
    const FIELD_TYPE: FieldType = FieldType::UInt32;
}

impl IndexKey for u64 {
    const FIELD_TYPE: FieldType = FieldType::UInt64;
}

impl IndexKey for DocumentId {
    const FIELD_TYPE: FieldType = FieldType::Guid;

    fn upper_bound() -> Option<Self> {
        Some(DocumentId::MAX)
    }
}

/// A 16-byte document identifier, ordered bytewise.
#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct DocumentId([u8; 16]);

impl DocumentId {
    /// The smallest id (all zero bytes).
    pub const MIN: DocumentId = DocumentId([0; 16]);

    /// The largest id (all 0xFF bytes).
    pub const MAX: DocumentId = DocumentId([0xFF; 16]);

    /// Creates an id from raw bytes.
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Creates an id from an integer. Numeric order equals id order.
    pub const fn from_u128(value: u128) -> Self {
        Self(value.to_be_bytes())
    }

    /// Returns the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Returns the id as an integer.
    pub const fn as_u128(&self) -> u128 {
        u128::from_be_bytes(self.0)
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02x}{:02x}{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7], b[8], b[9], b[10], b[11], b[12], b[13],
            b[14], b[15]
        )
    }
}

impl fmt::Debug for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DocumentId({})", self)
    }
}

/// A document that can be indexed.
pub trait Document: Send + Sync + 'static {
    /// Identifier of the document.
    fn id(&self) -> DocumentId;
}

/// Key of a secondary index tree: the field value plus the owning document.
///
/// Ordered by `field`, then `id`, so all entries for one field value are
/// contiguous and bounded by [`range_lo`](Self::range_lo) and
/// [`range_hi`](Self::range_hi).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct CompositeKey<K> {
    /// Indexed field value.
    pub field: K,
    /// Document holding the value.
    pub id: DocumentId,
}

impl<K> CompositeKey<K> {
    /// Creates a composite key.
    pub fn new(field: K, id: DocumentId) -> Self {
        Self { field, id }
    }

    /// Smallest key with the given field value.
    pub fn range_lo(field: K) -> Self {
        Self::new(field, DocumentId::MIN)
    }

    /// Largest key with the given field value.
    pub fn range_hi(field: K) -> Self {
        Self::new(field, DocumentId::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_id_order_follows_integer_order() {
        let a = DocumentId::from_u128(1);
        let b = DocumentId::from_u128(256);
        assert!(DocumentId::MIN < a);
        assert!(a < b);
        assert!(b < DocumentId::MAX);
        assert_eq!(b.as_u128(), 256);
        assert_eq!(DocumentId::default(), DocumentId::MIN);
    }

    #[test]
    fn test_document_id_display() {
        let id = DocumentId::from_u128(0x0123_4567_89ab_cdef_0011_2233_4455_6677);
        assert_eq!(id.to_string(), "01234567-89ab-cdef-0011-223344556677");
    }

    #[test]
    fn test_composite_key_ordering() {
        let id1 = DocumentId::from_u128(1);
        let id2 = DocumentId::from_u128(2);

        assert!(CompositeKey::new(1, id2) < CompositeKey::new(2, id1));
        assert!(CompositeKey::new(1, id1) < CompositeKey::new(1, id2));
    }

    #[test]
    fn test_composite_key_range_bounds() {
        let id = DocumentId::from_u128(77);
        let key = CompositeKey::new(5i32, id);

        assert!(CompositeKey::range_lo(5) <= key);
        assert!(key <= CompositeKey::range_hi(5));
        assert!(CompositeKey::range_hi(4) < CompositeKey::range_lo(5));
        assert!(CompositeKey::range_hi(5) < CompositeKey::new(6, DocumentId::MIN));
    }

    #[test]
    fn test_upper_bounds() {
        assert_eq!(<i32 as IndexKey>::upper_bound(), Some(i32::MAX));
        assert_eq!(<i64 as IndexKey>::upper_bound(), Some(i64::MAX));
        assert_eq!(DocumentId::upper_bound(), Some(DocumentId::MAX));
        assert_eq!(<u32 as IndexKey>::upper_bound(), None);
        assert_eq!(<u64 as IndexKey>::upper_bound(), None);
    }
}
