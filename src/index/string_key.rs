//! Fixed-width string keys.
//!
//! A [`StringKey<N>`] holds the UTF-8 bytes of a string truncated to `N`
//! bytes and zero-padded, plus a flag recording whether truncation happened.
//! Ordering and equality look at the byte buffer only, so two strings sharing
//! their first `N` bytes are the same key.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use super::definition::FieldType;
use super::key::IndexKey;

/// Key over the first `N` UTF-8 bytes of a string.
#[derive(Clone, Copy)]
pub struct StringKey<const N: usize> {
    bytes: [u8; N],
    truncated: bool,
}

/// String key over 32 bytes.
pub type StringKey32 = StringKey<32>;
/// String key over 64 bytes.
pub type StringKey64 = StringKey<64>;
/// String key over 128 bytes.
pub type StringKey128 = StringKey<128>;
/// String key over 256 bytes.
pub type StringKey256 = StringKey<256>;

impl<const N: usize> StringKey<N> {
    /// Usable byte width.
    pub const WIDTH: usize = N;

    /// Builds a key from a string.
    ///
    /// Strings longer than `N` bytes are cut at the last character boundary
    /// that fits and the truncation flag is set.
    pub fn new(s: &str) -> Self {
        let mut end = s.len().min(N);
        while !s.is_char_boundary(end) {
            end -= 1;
        }

        let mut bytes = [0u8; N];
        bytes[..end].copy_from_slice(&s.as_bytes()[..end]);
        Self {
            bytes,
            truncated: end < s.len(),
        }
    }

    /// Returns the zero-padded byte buffer.
    pub fn as_bytes(&self) -> &[u8; N] {
        &self.bytes
    }

    /// Returns `true` if the source string did not fit.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Returns the stored prefix without the zero padding.
    pub fn to_string_lossy(&self) -> String {
        let len = self
            .bytes
            .iter()
            .rposition(|&b| b != 0)
            .map_or(0, |pos| pos + 1);
        String::from_utf8_lossy(&self.bytes[..len]).into_owned()
    }
}

impl<const N: usize> Default for StringKey<N> {
    fn default() -> Self {
        Self {
            bytes: [0; N],
            truncated: false,
        }
    }
}

impl<const N: usize> From<&str> for StringKey<N> {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl<const N: usize> PartialEq for StringKey<N> {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl<const N: usize> Eq for StringKey<N> {}

impl<const N: usize> PartialOrd for StringKey<N> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<const N: usize> Ord for StringKey<N> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.bytes.cmp(&other.bytes)
    }
}

impl<const N: usize> Hash for StringKey<N> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bytes.hash(state);
    }
}

impl<const N: usize> fmt::Debug for StringKey<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StringKey{}({:?}", N, self.to_string_lossy())?;
        if self.truncated {
            write!(f, ", truncated")?;
        }
        write!(f, ")")
    }
}

impl<const N: usize> IndexKey for StringKey<N> {
    const FIELD_TYPE: FieldType = FieldType::String;
    const STRING_WIDTH: usize = N;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_string_is_padded() {
        let key = StringKey32::new("abc");
        assert!(!key.is_truncated());
        assert_eq!(&key.as_bytes()[..3], b"abc");
        assert!(key.as_bytes()[3..].iter().all(|&b| b == 0));
        assert_eq!(key.to_string_lossy(), "abc");
    }

    #[test]
    fn test_truncated_strings_compare_equal() {
        let a = StringKey32::new(&"a".repeat(40));
        let b = StringKey32::new(&format!("{}{}", "a".repeat(32), "b".repeat(8)));

        assert!(a.is_truncated());
        assert!(b.is_truncated());
        assert_eq!(a, b);
        assert_eq!(a.cmp(&b), Ordering::Equal);
        assert_eq!(a.to_string_lossy(), "a".repeat(32));
    }

    #[test]
    fn test_exact_width_is_not_truncated() {
        let key = StringKey32::new(&"x".repeat(32));
        assert!(!key.is_truncated());
        assert_eq!(key.to_string_lossy().len(), 32);
    }

    #[test]
    fn test_truncation_respects_char_boundary() {
        // 31 ASCII bytes followed by a 2-byte character
        let s = format!("{}é", "a".repeat(31));
        let key = StringKey32::new(&s);
        assert!(key.is_truncated());
        assert_eq!(key.to_string_lossy(), "a".repeat(31));
    }

    #[test]
    fn test_ordering_is_bytewise() {
        let apple = StringKey64::from("apple");
        let banana = StringKey64::from("banana");
        let app = StringKey64::from("app");

        assert!(app < apple);
        assert!(apple < banana);
        assert!(StringKey64::default() < app);
    }

    #[test]
    fn test_flag_does_not_affect_equality() {
        let exact = StringKey::<4>::new("abcd");
        let cut = StringKey::<4>::new("abcde");
        assert!(!exact.is_truncated());
        assert!(cut.is_truncated());
        assert_eq!(exact, cut);
    }

    #[test]
    fn test_index_key_metadata() {
        assert_eq!(StringKey256::FIELD_TYPE, FieldType::String);
        assert_eq!(StringKey256::STRING_WIDTH, 256);
        assert_eq!(StringKey256::upper_bound(), None);
    }
}
