//! Index metadata.

use std::fmt;

use super::key::{DocumentId, IndexKey};
use crate::storage::PageId;

/// Role of an index within a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexKind {
    /// Document id to record handle.
    Primary,
    /// Non-unique field index over `(field, id)` composite keys.
    Secondary,
    /// Field value to a single document id.
    Unique,
    /// Multi-column composite index.
    Composite,
}

/// Type tag of the indexed field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Int32,
    Int64,
    UInt32,
    UInt64,
    Guid,
    String,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::Int32 => "i32",
            FieldType::Int64 => "i64",
            FieldType::UInt32 => "u32",
            FieldType::UInt64 => "u64",
            FieldType::Guid => "guid",
            FieldType::String => "string",
        };
        f.write_str(name)
    }
}

/// Immutable description of one index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDefinition {
    name: String,
    kind: IndexKind,
    unique: bool,
    descending: bool,
    field_type: FieldType,
    field_name: String,
    root_page: Option<PageId>,
    string_key_width: usize,
}

impl IndexDefinition {
    fn for_key<K: IndexKey>(
        name: impl Into<String>,
        field_name: impl Into<String>,
        kind: IndexKind,
        unique: bool,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            unique,
            descending: false,
            field_type: K::FIELD_TYPE,
            field_name: field_name.into(),
            root_page: None,
            string_key_width: K::STRING_WIDTH,
        }
    }

    /// Non-unique index on `field_name` with key type `K`.
    pub fn secondary<K: IndexKey>(name: impl Into<String>, field_name: impl Into<String>) -> Self {
        Self::for_key::<K>(name, field_name, IndexKind::Secondary, false)
    }

    /// Unique index on `field_name` with key type `K`.
    pub fn unique<K: IndexKey>(name: impl Into<String>, field_name: impl Into<String>) -> Self {
        Self::for_key::<K>(name, field_name, IndexKind::Unique, true)
    }

    /// Multi-column index on `field_name` with key type `K`.
    pub fn composite<K: IndexKey>(name: impl Into<String>, field_name: impl Into<String>) -> Self {
        Self::for_key::<K>(name, field_name, IndexKind::Composite, false)
    }

    /// Primary index over document ids.
    pub fn primary(name: impl Into<String>) -> Self {
        Self::for_key::<DocumentId>(name, "id", IndexKind::Primary, true)
    }

    /// Sets the sort direction.
    pub fn with_descending(mut self, descending: bool) -> Self {
        self.descending = descending;
        self
    }

    /// Sets the persisted root page of the backing tree.
    pub fn with_root_page(mut self, root_page: PageId) -> Self {
        self.root_page = Some(root_page);
        self
    }

    /// Index name, unique within a registry.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// What the index maps and how it is maintained.
    pub fn kind(&self) -> IndexKind {
        self.kind
    }

    /// Whether a value may belong to at most one document.
    pub fn is_unique(&self) -> bool {
        self.unique
    }

    /// Whether executors return matches in descending key order.
    pub fn is_descending(&self) -> bool {
        self.descending
    }

    /// Type tag of the indexed field.
    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    /// Name of the indexed document field.
    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    /// Root page of a persisted tree, if any.
    pub fn root_page(&self) -> Option<PageId> {
        self.root_page
    }

    /// Usable width of string keys, 0 for other field types.
    pub fn string_key_width(&self) -> usize {
        self.string_key_width
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::StringKey64;

    #[test]
    fn test_secondary_definition() {
        let def = IndexDefinition::secondary::<i32>("by_age", "age");
        assert_eq!(def.name(), "by_age");
        assert_eq!(def.field_name(), "age");
        assert_eq!(def.kind(), IndexKind::Secondary);
        assert!(!def.is_unique());
        assert!(!def.is_descending());
        assert_eq!(def.field_type(), FieldType::Int32);
        assert_eq!(def.root_page(), None);
        assert_eq!(def.string_key_width(), 0);
    }

    #[test]
    fn test_unique_string_definition() {
        let def = IndexDefinition::unique::<StringKey64>("by_email", "email")
            .with_descending(true)
            .with_root_page(PageId::new(9));

        assert_eq!(def.kind(), IndexKind::Unique);
        assert!(def.is_unique());
        assert!(def.is_descending());
        assert_eq!(def.field_type(), FieldType::String);
        assert_eq!(def.string_key_width(), 64);
        assert_eq!(def.root_page(), Some(PageId::new(9)));
    }

    #[test]
    fn test_primary_definition() {
        let def = IndexDefinition::primary("pk");
        assert_eq!(def.kind(), IndexKind::Primary);
        assert!(def.is_unique());
        assert_eq!(def.field_type(), FieldType::Guid);
        assert_eq!(def.field_name(), "id");
    }
}
