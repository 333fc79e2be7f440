//! Immutable byte views.
//!
//! A [`ByteView`] is a cheaply clonable, immutable handle over a byte
//! payload. Views are what the cache stores and what sinks freeze into;
//! the payload behind a view never changes for the view's lifetime.
//!
//! Internally a view wraps [`bytes::Bytes`], so cloning and slicing share
//! the underlying buffer. Exporting to a caller-owned buffer always
//! produces a defensive copy.

use std::io::{Cursor, Write};

use bytes::Bytes;

/// An immutable view over a byte payload.
///
/// `ByteView` is meant to be used as a value type, not behind a pointer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ByteView {
    data: Bytes,
}

impl ByteView {
    /// A view over a static byte slice, without copying.
    pub const fn from_static(data: &'static [u8]) -> Self {
        Self {
            data: Bytes::from_static(data),
        }
    }

    /// The length of the view in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the view is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The byte at index `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i` is out of bounds, like slice indexing.
    pub fn at(&self, i: usize) -> u8 {
        self.data[i]
    }

    /// A sub-view between `from` and `to`, sharing the same payload.
    ///
    /// # Panics
    ///
    /// Panics if the range is out of bounds.
    pub fn slice(&self, from: usize, to: usize) -> Self {
        Self {
            data: self.data.slice(from..to),
        }
    }

    /// A sub-view from `from` to the end, sharing the same payload.
    pub fn slice_from(&self, from: usize) -> Self {
        Self {
            data: self.data.slice(from..),
        }
    }

    /// Copy the view into `dest`, returning the number of bytes copied:
    /// `min(dest.len(), self.len())`.
    pub fn copy_to(&self, dest: &mut [u8]) -> usize {
        let n = dest.len().min(self.data.len());
        dest[..n].copy_from_slice(&self.data[..n]);
        n
    }

    /// Read into `buf` starting at byte offset `off`.
    ///
    /// Returns the number of bytes read; an offset at or past the end
    /// reads zero bytes.
    pub fn read_at(&self, buf: &mut [u8], off: usize) -> usize {
        if off >= self.data.len() {
            return 0;
        }
        self.slice_from(off).copy_to(buf)
    }

    /// A `Read + Seek` over the view's bytes.
    pub fn reader(&self) -> Cursor<Bytes> {
        Cursor::new(self.data.clone())
    }

    /// Write the whole view to `w`.
    pub fn write_to<W: Write>(&self, w: &mut W) -> std::io::Result<usize> {
        w.write_all(&self.data)?;
        Ok(self.data.len())
    }

    /// The view's bytes as a slice.
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// A copy of the view's bytes as an owned vector.
    pub fn to_vec(&self) -> Vec<u8> {
        self.data.to_vec()
    }

    /// The view's payload as shared bytes, without copying.
    pub fn into_bytes(self) -> Bytes {
        self.data
    }
}

impl From<Bytes> for ByteView {
    fn from(data: Bytes) -> Self {
        Self { data }
    }
}

impl From<Vec<u8>> for ByteView {
    fn from(data: Vec<u8>) -> Self {
        Self { data: data.into() }
    }
}

impl From<String> for ByteView {
    fn from(data: String) -> Self {
        Self {
            data: Bytes::from(data.into_bytes()),
        }
    }
}

impl From<&[u8]> for ByteView {
    fn from(data: &[u8]) -> Self {
        Self {
            data: Bytes::copy_from_slice(data),
        }
    }
}

impl From<&str> for ByteView {
    fn from(data: &str) -> Self {
        data.as_bytes().into()
    }
}

impl PartialEq<[u8]> for ByteView {
    fn eq(&self, other: &[u8]) -> bool {
        self.data.as_ref() == other
    }
}

impl PartialEq<&[u8]> for ByteView {
    fn eq(&self, other: &&[u8]) -> bool {
        self.data.as_ref() == *other
    }
}

impl PartialEq<str> for ByteView {
    fn eq(&self, other: &str) -> bool {
        self.data.as_ref() == other.as_bytes()
    }
}

impl PartialEq<&str> for ByteView {
    fn eq(&self, other: &&str) -> bool {
        self.data.as_ref() == other.as_bytes()
    }
}
