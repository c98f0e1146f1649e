//! # Memory primitives
//! Address ranges, byte-addressable devices, flat blocks and mirrors.

use crate::{NesError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Byte-addressable device seen by the CPU.
///
/// `peek` must return what `read` would return without triggering any read
/// side effect (status latches, shift registers, ...).
pub trait Memory {
    fn read(&mut self, address: u16) -> Result<u8>;

    fn write(&mut self, address: u16, value: u8) -> Result<()>;

    fn peek(&self, address: u16) -> Result<u8>;

    fn read_noncontinuous_word(&mut self, lo: u16, hi: u16) -> Result<u16> {
        let lo = self.read(lo)? as u16;
        let hi = self.read(hi)? as u16;
        Ok((hi << 8) | lo)
    }

    fn read_word(&mut self, address: u16) -> Result<u16> {
        self.read_noncontinuous_word(address, address.wrapping_add(1))
    }

    fn peek_word(&self, address: u16) -> Result<u16> {
        let lo = self.peek(address)? as u16;
        let hi = self.peek(address.wrapping_add(1))? as u16;
        Ok((hi << 8) | lo)
    }
}

impl<M: Memory + ?Sized> Memory for Box<M> {
    fn read(&mut self, address: u16) -> Result<u8> {
        (**self).read(address)
    }

    fn write(&mut self, address: u16, value: u8) -> Result<()> {
        (**self).write(address, value)
    }

    fn peek(&self, address: u16) -> Result<u8> {
        (**self).peek(address)
    }
}

/// Inclusive 16-bit address range.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemoryRange {
    start: u16,
    end: u16,
}

impl MemoryRange {
    pub fn new(start: u16, end: u16) -> Result<Self> {
        if start > end {
            return Err(NesError::InvalidRange { start, end });
        }
        Ok(MemoryRange { start, end })
    }

    /// For ranges whose ordering is known at compile time.
    pub(crate) const fn fixed(start: u16, end: u16) -> Self {
        assert!(start <= end);
        MemoryRange { start, end }
    }

    pub fn start(&self) -> u16 {
        self.start
    }

    pub fn end(&self) -> u16 {
        self.end
    }

    /// Number of addresses covered; a full 64 KB range does not fit in a `u16`.
    pub fn len(&self) -> usize {
        (self.end - self.start) as usize + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn contains(&self, address: u16) -> bool {
        (self.start..=self.end).contains(&address)
    }

    pub fn contains_range(&self, other: &MemoryRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn intersects(&self, other: &MemoryRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// Re-checks the ordering. Deserialized ranges never went through `new`.
    pub fn validate(&self) -> Result<()> {
        MemoryRange::new(self.start, self.end).map(|_| ())
    }

    pub(crate) fn out_of_range(&self, address: u16) -> NesError {
        NesError::AddressOutOfRange {
            address,
            start: self.start,
            end: self.end,
        }
    }

    fn offset_of(&self, address: u16) -> Result<usize> {
        if self.contains(address) {
            Ok((address - self.start) as usize)
        } else {
            Err(self.out_of_range(address))
        }
    }
}

impl fmt::Display for MemoryRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:04X}-${:04X}", self.start, self.end)
    }
}

/// Flat byte storage addressed by offset from the start of its range.
#[derive(Debug, Clone)]
pub struct MemoryBlock {
    range: MemoryRange,
    data: Vec<u8>,
}

impl MemoryBlock {
    pub fn new(range: MemoryRange) -> Self {
        MemoryBlock {
            range,
            data: vec![0; range.len()],
        }
    }

    pub fn from_bytes(range: MemoryRange, data: Vec<u8>) -> Result<Self> {
        if data.len() != range.len() {
            return Err(NesError::InvalidRom(format!(
                "{} bytes cannot back {} ({} bytes)",
                data.len(),
                range,
                range.len()
            )));
        }
        Ok(MemoryBlock { range, data })
    }

    pub fn range(&self) -> MemoryRange {
        self.range
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }
}

impl Memory for MemoryBlock {
    fn read(&mut self, address: u16) -> Result<u8> {
        self.peek(address)
    }

    fn write(&mut self, address: u16, value: u8) -> Result<()> {
        let offset = self.range.offset_of(address)?;
        self.data[offset] = value;
        Ok(())
    }

    fn peek(&self, address: u16) -> Result<u8> {
        let offset = self.range.offset_of(address)?;
        Ok(self.data[offset])
    }
}

/// Redirects accesses in `mirror` onto `source` of the wrapped device.
#[derive(Debug, Clone)]
pub struct MirroredMemory<M> {
    inner: M,
    source: MemoryRange,
    mirror: MemoryRange,
}

impl<M: Memory> MirroredMemory<M> {
    pub fn new(inner: M, source: MemoryRange, mirror: MemoryRange) -> Result<Self> {
        source.validate()?;
        mirror.validate()?;
        if source.intersects(&mirror) {
            return Err(NesError::OverlappingRanges {
                first: source,
                second: mirror,
            });
        }
        Ok(MirroredMemory {
            inner,
            source,
            mirror,
        })
    }

    pub fn source(&self) -> MemoryRange {
        self.source
    }

    pub fn mirror(&self) -> MemoryRange {
        self.mirror
    }

    pub fn inner(&self) -> &M {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut M {
        &mut self.inner
    }

    pub fn map_address(&self, address: u16) -> Result<u16> {
        if self.mirror.contains(address) {
            let offset = (address - self.mirror.start()) as usize % self.source.len();
            Ok(self.source.start() + offset as u16)
        } else if self.source.contains(address) {
            Ok(address)
        } else {
            Err(self.source.out_of_range(address))
        }
    }
}

impl<M: Memory> Memory for MirroredMemory<M> {
    fn read(&mut self, address: u16) -> Result<u8> {
        let address = self.map_address(address)?;
        self.inner.read(address)
    }

    fn write(&mut self, address: u16, value: u8) -> Result<()> {
        let address = self.map_address(address)?;
        self.inner.write(address, value)
    }

    fn peek(&self, address: u16) -> Result<u8> {
        self.inner.peek(self.map_address(address)?)
    }
}
