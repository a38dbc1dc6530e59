// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

/// Reports how many bytes a value occupies for budget accounting.
///
/// The store charges each entry `key.len() + value.byte_len()` bytes. The figure does not
/// need to match the allocation exactly, but it must be stable for as long as the value
/// is stored, otherwise the accounted total drifts.
///
/// # Examples
///
/// ```
/// use peercache_lru::ByteLen;
///
/// struct Blob(Vec<u8>);
///
/// impl ByteLen for Blob {
///     fn byte_len(&self) -> usize {
///         self.0.len()
///     }
/// }
///
/// assert_eq!(Blob(vec![0; 16]).byte_len(), 16);
/// ```
pub trait ByteLen {
    /// Returns the number of bytes charged for this value.
    fn byte_len(&self) -> usize;
}

impl ByteLen for [u8] {
    fn byte_len(&self) -> usize {
        self.len()
    }
}

impl ByteLen for Vec<u8> {
    fn byte_len(&self) -> usize {
        self.len()
    }
}

impl ByteLen for str {
    fn byte_len(&self) -> usize {
        self.len()
    }
}

impl ByteLen for String {
    fn byte_len(&self) -> usize {
        self.len()
    }
}

impl<T: ByteLen + ?Sized> ByteLen for &T {
    fn byte_len(&self) -> usize {
        (**self).byte_len()
    }
}

impl<T: ByteLen + ?Sized> ByteLen for Box<T> {
    fn byte_len(&self) -> usize {
        (**self).byte_len()
    }
}
