// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::io::{Cursor, Write};
use std::sync::Arc;

use bytes::Bytes;

use crate::ByteViewError;

/// An immutable view over a sequence of bytes or over a string.
///
/// A `ByteView` is the unit in which cached values are handed around. Cloning a view and
/// slicing it only adjust reference counts and bounds; the underlying storage is shared and
/// never copied or mutated. Any operation that hands out mutable data, such as [`to_vec`][Self::to_vec],
/// makes a copy first.
///
/// A view is backed either by [`Bytes`] or by a shared string. Both representations compare
/// equal when their contents do.
#[derive(Clone)]
pub struct ByteView {
    repr: Repr,
}

#[derive(Clone)]
enum Repr {
    Bytes(Bytes),
    Str { text: Arc<str>, start: usize, end: usize },
}

impl ByteView {
    /// Returns a view over a zero-sized byte sequence.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            repr: Repr::Bytes(Bytes::new()),
        }
    }

    /// Creates a view over static bytes without copying them.
    #[must_use]
    pub const fn from_static(bytes: &'static [u8]) -> Self {
        Self {
            repr: Repr::Bytes(Bytes::from_static(bytes)),
        }
    }

    /// The number of bytes in the view.
    #[must_use]
    pub fn len(&self) -> usize {
        match &self.repr {
            Repr::Bytes(bytes) => bytes.len(),
            Repr::Str { start, end, .. } => end - start,
        }
    }

    /// Whether the view is of a zero-sized byte sequence.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the view is backed by a string rather than by raw bytes.
    #[must_use]
    pub const fn is_string(&self) -> bool {
        matches!(self.repr, Repr::Str { .. })
    }

    /// Borrows the contents of the view.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match &self.repr {
            Repr::Bytes(bytes) => bytes,
            Repr::Str { text, start, end } => &text.as_bytes()[*start..*end],
        }
    }

    /// Borrows the contents as a string slice if they are valid UTF-8.
    ///
    /// A string-backed view that was sliced in the middle of a multi-byte character is
    /// no longer valid UTF-8 and yields `None`.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match &self.repr {
            Repr::Bytes(bytes) => std::str::from_utf8(bytes).ok(),
            Repr::Str { text, start, end } => text.get(*start..*end),
        }
    }

    /// Returns the byte at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not smaller than [`len`][Self::len].
    #[must_use]
    pub fn at(&self, index: usize) -> u8 {
        self.get(index).expect("index out of byte view bounds")
    }

    /// Returns the byte at `index` or `None` if out of bounds.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<u8> {
        self.as_bytes().get(index).copied()
    }

    /// Returns a view over `[from, to)` that shares storage with this one.
    ///
    /// # Panics
    ///
    /// Panics if `from > to` or if `to` exceeds the length of the view.
    #[must_use]
    pub fn slice(&self, from: usize, to: usize) -> Self {
        assert!(from <= to, "byte view slice starts at {from} but ends at {to}");
        assert!(to <= self.len(), "byte view slice end {to} out of bounds for length {}", self.len());

        let repr = match &self.repr {
            Repr::Bytes(bytes) => Repr::Bytes(bytes.slice(from..to)),
            Repr::Str { text, start, .. } => Repr::Str {
                text: Arc::clone(text),
                start: start + from,
                end: start + to,
            },
        };

        Self { repr }
    }

    /// Returns a view over `[from, len)` that shares storage with this one.
    ///
    /// # Panics
    ///
    /// Panics if `from` exceeds the length of the view.
    #[must_use]
    pub fn slice_from(&self, from: usize) -> Self {
        self.slice(from, self.len())
    }

    /// Copies as many bytes as fit into `dest` and returns how many were copied.
    pub fn copy_to(&self, dest: &mut [u8]) -> usize {
        let src = self.as_bytes();
        let count = src.len().min(dest.len());
        dest[..count].copy_from_slice(&src[..count]);
        count
    }

    /// Returns a fresh, independently mutable copy of the contents.
    #[must_use]
    pub fn to_vec(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }

    /// Returns the contents as [`Bytes`] without copying.
    #[must_use]
    pub fn to_bytes(&self) -> Bytes {
        match &self.repr {
            Repr::Bytes(bytes) => bytes.clone(),
            Repr::Str { text, start, end } => Bytes::from_owner(StrOwner(Arc::clone(text))).slice(*start..*end),
        }
    }

    /// Reads bytes starting at `offset` into `buf`, returning how many bytes were copied.
    ///
    /// # Errors
    ///
    /// * [`ByteViewError::OutOfRange`] if `offset` is negative.
    /// * [`ByteViewError::EndOfData`] if `offset` is at or past the end of the view, or if fewer
    ///   than `buf.len()` bytes remained. The error carries the count of bytes that were copied.
    pub fn read_at(&self, buf: &mut [u8], offset: i64) -> Result<usize, ByteViewError> {
        let Ok(start) = usize::try_from(offset) else {
            return Err(ByteViewError::OutOfRange { offset });
        };

        let src = self.as_bytes();
        if start >= src.len() {
            return Err(ByteViewError::EndOfData { read: 0 });
        }

        let remaining = &src[start..];
        let read = remaining.len().min(buf.len());
        buf[..read].copy_from_slice(&remaining[..read]);

        if read < buf.len() {
            Err(ByteViewError::EndOfData { read })
        } else {
            Ok(read)
        }
    }

    /// Writes the whole view to `sink` in a single write call.
    ///
    /// # Errors
    ///
    /// * [`ByteViewError::Io`] if the sink fails.
    /// * [`ByteViewError::ShortWrite`] if the sink accepted fewer bytes than the view holds.
    pub fn write_to<W>(&self, sink: &mut W) -> Result<usize, ByteViewError>
    where
        W: Write + ?Sized,
    {
        let src = self.as_bytes();
        let written = sink.write(src)?;

        if written < src.len() {
            return Err(ByteViewError::ShortWrite {
                written,
                expected: src.len(),
            });
        }

        Ok(written)
    }

    /// Returns a reader over the view that also supports seeking.
    ///
    /// The reader holds its own clone of the view, so no bytes are copied.
    #[must_use]
    pub fn reader(&self) -> Cursor<Self> {
        Cursor::new(self.clone())
    }
}

/// Keeps a shared string alive for as long as a [`Bytes`] created from it.
struct StrOwner(Arc<str>);

impl AsRef<[u8]> for StrOwner {
    fn as_ref(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl Default for ByteView {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ByteView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_str() {
            Some(text) if self.is_string() => f.debug_tuple("ByteView").field(&text).finish(),
            _ => f.debug_tuple("ByteView").field(&Bytes::copy_from_slice(self.as_bytes())).finish(),
        }
    }
}

impl AsRef<[u8]> for ByteView {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl PartialEq for ByteView {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for ByteView {}

impl Hash for ByteView {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_bytes().hash(state);
    }
}

impl PartialEq<[u8]> for ByteView {
    fn eq(&self, other: &[u8]) -> bool {
        self.as_bytes() == other
    }
}

impl PartialEq<&[u8]> for ByteView {
    fn eq(&self, other: &&[u8]) -> bool {
        self.as_bytes() == *other
    }
}

impl PartialEq<Vec<u8>> for ByteView {
    fn eq(&self, other: &Vec<u8>) -> bool {
        self.as_bytes() == other.as_slice()
    }
}

impl PartialEq<str> for ByteView {
    fn eq(&self, other: &str) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl PartialEq<&str> for ByteView {
    fn eq(&self, other: &&str) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl From<Bytes> for ByteView {
    fn from(bytes: Bytes) -> Self {
        Self {
            repr: Repr::Bytes(bytes),
        }
    }
}

impl From<Vec<u8>> for ByteView {
    fn from(bytes: Vec<u8>) -> Self {
        Bytes::from(bytes).into()
    }
}

impl From<&'static [u8]> for ByteView {
    fn from(bytes: &'static [u8]) -> Self {
        Self::from_static(bytes)
    }
}

impl From<Arc<str>> for ByteView {
    fn from(text: Arc<str>) -> Self {
        let end = text.len();
        Self {
            repr: Repr::Str { text, start: 0, end },
        }
    }
}

impl From<String> for ByteView {
    fn from(text: String) -> Self {
        Arc::<str>::from(text).into()
    }
}

impl From<&str> for ByteView {
    fn from(text: &str) -> Self {
        Arc::<str>::from(text).into()
    }
}

impl From<ByteView> for Bytes {
    fn from(view: ByteView) -> Self {
        match view.repr {
            Repr::Bytes(bytes) => bytes,
            Repr::Str { .. } => view.to_bytes(),
        }
    }
}
