// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::Display;

use bytes::Bytes;
use peercache_lru::ByteLen;

/// An immutable view over a cached value.
///
/// A `ByteView` owns its bytes: constructing one from a slice copies it, and constructing one
/// from a `Vec<u8>` takes the vector over, so a view never aliases a buffer its creator can
/// still modify. Clones share the same immutable buffer.
///
/// Callers read the value through [`as_bytes`](Self::as_bytes), or take a private copy with
/// [`to_vec`](Self::to_vec) that they are free to mutate.
///
/// # Examples
///
/// ```
/// use peercache::ByteView;
///
/// let view = ByteView::copy_from_slice(b"630");
/// assert_eq!(view.len(), 3);
/// assert_eq!(view.as_string(), "630");
///
/// let mut copy = view.to_vec();
/// copy[0] = b'9';
/// assert_eq!(view.as_bytes(), b"630");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ByteView {
    bytes: Bytes,
}

impl ByteView {
    /// Creates a view holding a copy of `data`.
    #[must_use]
    pub fn copy_from_slice(data: &[u8]) -> Self {
        Self {
            bytes: Bytes::copy_from_slice(data),
        }
    }

    /// Returns the length of the value in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` if the value is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Returns a fresh copy of the value.
    #[must_use]
    pub fn to_vec(&self) -> Vec<u8> {
        self.bytes.to_vec()
    }

    /// Returns the value as a string, replacing invalid UTF-8 sequences.
    #[must_use]
    pub fn as_string(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }

    /// Borrows the value.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl From<Vec<u8>> for ByteView {
    fn from(value: Vec<u8>) -> Self {
        Self { bytes: Bytes::from(value) }
    }
}

impl From<&[u8]> for ByteView {
    fn from(value: &[u8]) -> Self {
        Self::copy_from_slice(value)
    }
}

impl From<String> for ByteView {
    fn from(value: String) -> Self {
        Self::from(value.into_bytes())
    }
}

impl From<&str> for ByteView {
    fn from(value: &str) -> Self {
        Self::copy_from_slice(value.as_bytes())
    }
}

impl AsRef<[u8]> for ByteView {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl ByteLen for ByteView {
    fn byte_len(&self) -> usize {
        self.bytes.len()
    }
}

impl Display for ByteView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.bytes))
    }
}

#[cfg(test)]
mod tests {
    use static_assertions::assert_impl_all;

    use super::*;

    #[test]
    fn thread_safe_type() {
        assert_impl_all!(ByteView: Send, Sync);
    }

    #[test]
    fn copies_are_independent() {
        let view = ByteView::from("value");

        let mut first = view.to_vec();
        let second = view.to_vec();
        first[0] = b'V';

        assert_eq!(first, b"Value");
        assert_eq!(second, b"value");
        assert_eq!(view.as_bytes(), b"value");
    }

    #[test]
    fn copy_from_slice_does_not_alias_source() {
        let mut source = b"abc".to_vec();
        let view = ByteView::copy_from_slice(&source);
        source[0] = b'x';

        assert_eq!(view.as_bytes(), b"abc");
    }

    #[test]
    fn string_accessor_is_lossy_for_invalid_utf8() {
        let view = ByteView::from(vec![b'o', b'k', 0xFF]);
        assert_eq!(view.as_string(), "ok\u{FFFD}");
        assert_eq!(view.to_string(), "ok\u{FFFD}");
    }

    #[test]
    fn length_and_byte_accounting_agree() {
        let view = ByteView::from(String::from("twelve bytes"));
        assert_eq!(view.len(), 12);
        assert_eq!(view.byte_len(), 12);
        assert!(!view.is_empty());
        assert!(ByteView::default().is_empty());
    }
}
