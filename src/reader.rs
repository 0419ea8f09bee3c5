//! Bounds-checked cursor over an in-memory byte buffer.
//!
//! Every decode stage works on buffers that are already fully resident, but the
//! contents come from an untrusted meter. All reads go through [`ByteReader`] so an
//! offset that runs past the end surfaces as [`OutOfBounds`] instead of a panic.

use nom::{
    IResult, Parser,
    bytes::complete::take,
    number::complete::{be_u16, be_u32, u8},
};
use thiserror::Error;

/// A read ran past the end of the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("read of {wanted} byte(s) at offset {offset} exceeds buffer of {len} byte(s)")]
pub struct OutOfBounds {
    pub offset: usize,
    pub wanted: usize,
    pub len: usize,
}

#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    /// `true` while the cursor points at a readable byte.
    pub fn has_remaining(&self) -> bool {
        self.pos < self.data.len()
    }

    /// Moves the cursor to an absolute offset. Positions past the end are allowed;
    /// the next read will fail.
    pub fn seek(&mut self, pos: usize) {
        self.pos = pos;
    }

    /// Moves the cursor forward without reading. May leave it past the end.
    pub fn advance(&mut self, n: usize) {
        self.pos = self.pos.saturating_add(n);
    }

    /// Byte at an absolute offset, independent of the cursor.
    pub fn byte_at(&self, offset: usize) -> Option<u8> {
        self.data.get(offset).copied()
    }

    pub fn peek(&self) -> Option<u8> {
        self.byte_at(self.pos)
    }

    pub fn read_u8(&mut self) -> Result<u8, OutOfBounds> {
        self.read_with(1, u8)
    }

    pub fn read_u16_be(&mut self) -> Result<u16, OutOfBounds> {
        self.read_with(2, be_u16)
    }

    pub fn read_u32_be(&mut self) -> Result<u32, OutOfBounds> {
        self.read_with(4, be_u32)
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], OutOfBounds> {
        self.read_with(n, |input| take(n).parse(input))
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], OutOfBounds> {
        let mut array = [0u8; N];
        array.copy_from_slice(self.read_bytes(N)?);
        Ok(array)
    }

    fn read_with<T, P>(&mut self, wanted: usize, parser: P) -> Result<T, OutOfBounds>
    where
        P: FnOnce(&'a [u8]) -> IResult<&'a [u8], T>,
    {
        let out_of_bounds = OutOfBounds { offset: self.pos, wanted, len: self.data.len() };

        let input = self.data.get(self.pos..).ok_or(out_of_bounds)?;
        let (rest, value) = parser(input).map_err(|_| out_of_bounds)?;

        self.pos = self.data.len() - rest.len();
        Ok(value)
    }
}
