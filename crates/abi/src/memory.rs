use std::fmt::Write as _;

use crate::error::{Result, VmError};

/// Capacity of the reference configuration.
pub const DEFAULT_CAPACITY: usize = 160;

/// Fixed-capacity byte buffer with a single forward-only cursor.
///
/// Every access is checked against the capacity. The cursor satisfies
/// `cursor <= capacity` at all times; a failed move leaves it untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Memory {
    bytes: Box<[u8]>,
    cursor: usize,
}

impl Memory {
    pub fn new(capacity: usize) -> Self {
        Self {
            bytes: vec![0; capacity].into_boxed_slice(),
            cursor: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Zero the whole buffer and rewind the cursor.
    pub fn reset(&mut self) {
        self.bytes.fill(0);
        self.cursor = 0;
    }

    /// Copy a program image to offset 0. Shorter images leave the tail as is.
    pub fn load(&mut self, image: &[u8]) -> Result<()> {
        if image.len() > self.capacity() {
            return Err(VmError::OutOfBounds {
                cursor: 0,
                len: image.len(),
                capacity: self.capacity(),
            });
        }
        self.bytes[..image.len()].copy_from_slice(image);
        Ok(())
    }

    /// Byte under the cursor, without moving it.
    pub fn read_byte(&self) -> Result<u8> {
        self.peek(0)
    }

    /// Byte `offset` positions past the cursor, without moving it.
    pub fn peek(&self, offset: usize) -> Result<u8> {
        self.cursor
            .checked_add(offset)
            .and_then(|at| self.bytes.get(at))
            .copied()
            .ok_or(VmError::OutOfBounds {
                cursor: self.cursor,
                len: offset.saturating_add(1),
                capacity: self.capacity(),
            })
    }

    pub fn advance(&mut self, n: usize) -> Result<()> {
        match self.cursor.checked_add(n) {
            Some(next) if next <= self.capacity() => {
                self.cursor = next;
                Ok(())
            }
            _ => Err(VmError::OutOfBounds {
                cursor: self.cursor,
                len: n,
                capacity: self.capacity(),
            }),
        }
    }

    /// `read_byte` then `advance(1)`.
    pub fn next_byte(&mut self) -> Result<u8> {
        let byte = self.read_byte()?;
        self.advance(1)?;
        Ok(byte)
    }

    /// Classic 16-bytes-per-row dump of the whole buffer.
    pub fn hexdump(&self) -> String {
        hexdump(&self.bytes)
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

pub fn hexdump(bytes: &[u8]) -> String {
    let mut out = String::new();
    for (row, chunk) in bytes.chunks(16).enumerate() {
        let _ = write!(out, "{:08x} ", row * 16);
        for byte in chunk {
            let _ = write!(out, " {byte:02x}");
        }
        out.push('\n');
    }
    out
}
