//! LSB-first bit packing for DEFLATE streams.

use std::io::{self, Write};

/// Accumulates bits least-significant first and collects whole bytes.
#[derive(Debug, Default)]
pub(crate) struct BitWriter {
    out: Vec<u8>,
    acc: u64,
    nbits: u32,
}

impl BitWriter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Append the low `count` bits of `value` (count <= 32).
    #[inline]
    pub(crate) fn write_bits(&mut self, value: u32, count: u32) {
        debug_assert!(count <= 32);
        if count == 0 {
            return;
        }
        let mask = (1u64 << count) - 1;
        self.acc |= (value as u64 & mask) << self.nbits;
        self.nbits += count;
        while self.nbits >= 8 {
            self.out.push(self.acc as u8);
            self.acc >>= 8;
            self.nbits -= 8;
        }
    }

    /// Pad with zero bits up to the next byte boundary.
    pub(crate) fn align(&mut self) {
        if self.nbits > 0 {
            self.out.push(self.acc as u8);
            self.acc = 0;
            self.nbits = 0;
        }
    }

    /// Append raw bytes; the writer must be byte aligned.
    pub(crate) fn write_bytes(&mut self, bytes: &[u8]) {
        debug_assert_eq!(self.nbits, 0, "unaligned byte write");
        self.out.extend_from_slice(bytes);
    }

    /// Bits written since the last byte boundary.
    pub(crate) fn pending_bits(&self) -> u32 {
        self.nbits
    }

    /// Move every completed byte into `sink`. Pending bits stay buffered.
    pub(crate) fn flush_to<W: Write>(&mut self, sink: &mut W) -> io::Result<()> {
        if !self.out.is_empty() {
            sink.write_all(&self.out)?;
            self.out.clear();
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn finish(mut self) -> Vec<u8> {
        self.align();
        self.out
    }
}
