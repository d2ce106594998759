//! Bounds-checked little-endian cursor over a byte slice.

use memchr::memchr;

/// A forward-only cursor over borrowed bytes.
///
/// Every read is checked against the end of the slice: a read that would run
/// past it returns `None` and leaves the cursor where it was.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    bytes: &'a [u8],
    position: usize,
}
impl<'a> Reader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, position: 0 }
    }

    /// Start reading at `position`; positions past the end yield an empty reader.
    pub fn at(bytes: &'a [u8], position: usize) -> Self {
        Self {
            bytes,
            position: position.min(bytes.len()),
        }
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.position
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.position
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn bytes(&mut self, len: usize) -> Option<&'a [u8]> {
        let bytes: &'a [u8] = self.bytes;
        let end = self.position.checked_add(len)?;
        let slice = bytes.get(self.position..end)?;
        self.position = end;
        Some(slice)
    }

    pub fn array<const N: usize>(&mut self) -> Option<[u8; N]> {
        let slice = self.bytes(N)?;
        slice.try_into().ok()
    }

    pub fn u8(&mut self) -> Option<u8> {
        self.array::<1>().map(|[b]| b)
    }

    pub fn u32_le(&mut self) -> Option<u32> {
        self.array().map(u32::from_le_bytes)
    }

    pub fn i32_le(&mut self) -> Option<i32> {
        self.array().map(i32::from_le_bytes)
    }

    pub fn u64_le(&mut self) -> Option<u64> {
        self.array().map(u64::from_le_bytes)
    }

    pub fn i64_le(&mut self) -> Option<i64> {
        self.array().map(i64::from_le_bytes)
    }

    /// Reads up to (and consumes) the next NUL byte, returning the bytes before it.
    pub fn cstr(&mut self) -> Option<&'a [u8]> {
        let bytes: &'a [u8] = self.bytes;
        let rest = bytes.get(self.position..)?;
        let len = memchr(0, rest)?;
        let value = &rest[..len];
        self.position += len + 1;
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_little_endian_integers() {
        let bytes = [0x2a, 0, 0, 0, 0xff, 0xff, 0xff, 0xff, 1, 0, 0, 0, 0, 0, 0, 0];
        let mut reader = Reader::new(&bytes);
        assert_eq!(reader.u32_le(), Some(42));
        assert_eq!(reader.i32_le(), Some(-1));
        assert_eq!(reader.u64_le(), Some(1));
        assert!(reader.is_empty());
    }

    #[test]
    fn short_read_does_not_advance() {
        let bytes = [1, 2, 3];
        let mut reader = Reader::new(&bytes);
        assert_eq!(reader.u32_le(), None);
        assert_eq!(reader.position(), 0);
        assert_eq!(reader.u8(), Some(1));
    }

    #[test]
    fn cstr_requires_terminator() {
        let mut reader = Reader::new(b"name\0rest");
        assert_eq!(reader.cstr(), Some(&b"name"[..]));
        assert_eq!(reader.position(), 5);
        assert_eq!(reader.cstr(), None);
        assert_eq!(reader.remaining(), 4);
    }

    #[test]
    fn at_clamps_to_end() {
        let reader = Reader::at(b"abc", 10);
        assert!(reader.is_empty());
    }
}
