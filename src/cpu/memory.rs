//! 8080 memory subsystem.
//!
//! A flat, byte-addressable space of 64 KiB. Every address is a `u16`,
//! so there is no such thing as an out-of-range access; word accesses
//! wrap from `0xFFFF` back to `0x0000`.

use serde::{Serialize, Deserialize};
use thiserror::Error;

/// The number of addressable bytes.
pub const MEMORY_SIZE: usize = 0x1_0000;

/// 8080 memory: 65 536 bytes.
#[derive(Clone, Serialize, Deserialize)]
#[serde(into = "Vec<u8>", try_from = "Vec<u8>")]
pub struct Memory {
    cells: Vec<u8>,
}

impl Memory {
    /// Create a new memory with all bytes zeroed.
    pub fn new() -> Self {
        Self {
            cells: vec![0; MEMORY_SIZE],
        }
    }

    /// Read a byte.
    #[inline]
    pub fn read(&self, addr: u16) -> u8 {
        self.cells[addr as usize]
    }

    /// Write a byte.
    #[inline]
    pub fn write(&mut self, addr: u16, value: u8) {
        self.cells[addr as usize] = value;
    }

    /// Read a little-endian word; the high byte comes from `addr + 1`.
    pub fn read_word(&self, addr: u16) -> u16 {
        let lo = self.read(addr);
        let hi = self.read(addr.wrapping_add(1));
        u16::from_le_bytes([lo, hi])
    }

    /// Write a little-endian word.
    pub fn write_word(&mut self, addr: u16, value: u16) {
        let [lo, hi] = value.to_le_bytes();
        self.write(addr, lo);
        self.write(addr.wrapping_add(1), hi);
    }

    /// Clear all memory to zeros.
    pub fn clear(&mut self) {
        self.cells.fill(0);
    }

    /// Copy an image into memory starting at `base`.
    ///
    /// Nothing is written when the image would run past `0xFFFF`.
    pub fn load(&mut self, base: u16, image: &[u8]) -> Result<(), MemoryError> {
        let start = base as usize;
        if start + image.len() > MEMORY_SIZE {
            return Err(MemoryError::ImageTooLarge {
                base,
                size: image.len(),
                available: MEMORY_SIZE - start,
            });
        }

        self.cells[start..start + image.len()].copy_from_slice(image);
        Ok(())
    }

    /// Dump a range of memory (for debugging). Clamped at the top of memory.
    pub fn dump(&self, start: u16, count: usize) -> &[u8] {
        let start = start as usize;
        let end = (start + count).min(MEMORY_SIZE);
        &self.cells[start..end]
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Memory> for Vec<u8> {
    fn from(mem: Memory) -> Self {
        mem.cells
    }
}

impl TryFrom<Vec<u8>> for Memory {
    type Error = MemoryError;

    fn try_from(cells: Vec<u8>) -> Result<Self, Self::Error> {
        if cells.len() != MEMORY_SIZE {
            return Err(MemoryError::WrongSize(cells.len()));
        }
        Ok(Self { cells })
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let non_zero = self.cells.iter().filter(|&&b| b != 0).count();

        f.debug_struct("Memory")
            .field("non_zero_bytes", &non_zero)
            .field("total_bytes", &MEMORY_SIZE)
            .finish()
    }
}

/// Errors that can occur during memory operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    /// Image does not fit between its base address and the top of memory.
    #[error("image of {size} bytes at {base:#06x} exceeds available space {available}")]
    ImageTooLarge { base: u16, size: usize, available: usize },

    /// A memory snapshot that is not exactly 64 KiB.
    #[error("memory snapshot has {0} bytes, expected 65536")]
    WrongSize(usize),
}
