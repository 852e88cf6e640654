//! DEFLATE block serialization: dynamic Huffman blocks and stored blocks.

use super::bits::BitWriter;
use super::huffman::{HuffmanTable, MAX_CODE_LEN, MAX_CODE_LENGTH_CODE_LEN};
use super::lz77::Token;

/// Largest payload of a stored block.
pub const MAX_STORED_LEN: usize = 65_535;

/// End-of-block symbol in the literal/length alphabet.
const END_OF_BLOCK: usize = 256;

/// Literal/length alphabet size (286 and 287 are never used).
const NUM_LIT_LEN: usize = 286;
const NUM_DIST: usize = 30;
const NUM_CODE_LEN: usize = 19;

/// Base lengths for symbols 257-285.
const LENGTH_BASE: [u16; 29] = [
    3, 4, 5, 6, 7, 8, 9, 10, 11, 13, 15, 17, 19, 23, 27, 31, 35, 43, 51, 59, 67, 83, 99, 115,
    131, 163, 195, 227, 258,
];

const LENGTH_EXTRA: [u8; 29] = [
    0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3, 4, 4, 4, 4, 5, 5, 5, 5, 0,
];

/// Base distances for distance symbols 0-29.
const DIST_BASE: [u16; 30] = [
    1, 2, 3, 4, 5, 7, 9, 13, 17, 25, 33, 49, 65, 97, 129, 193, 257, 385, 513, 769, 1025, 1537,
    2049, 3073, 4097, 6145, 8193, 12289, 16385, 24577,
];

const DIST_EXTRA: [u8; 30] = [
    0, 0, 0, 0, 1, 1, 2, 2, 3, 3, 4, 4, 5, 5, 6, 6, 7, 7, 8, 8, 9, 9, 10, 10, 11, 11, 12, 12, 13,
    13,
];

/// Order in which code-length code lengths are transmitted.
const CODE_LEN_ORDER: [usize; NUM_CODE_LEN] =
    [16, 17, 18, 0, 8, 7, 9, 6, 10, 5, 11, 4, 12, 3, 13, 2, 14, 1, 15];

/// Which encoding a block ended up using.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Stored,
    Dynamic,
}

/// (symbol index, extra bit count, extra value)
#[inline]
fn length_symbol(length: u16) -> (usize, u32, u32) {
    debug_assert!((3..=258).contains(&length));
    let i = LENGTH_BASE.partition_point(|&base| base <= length) - 1;
    (257 + i, LENGTH_EXTRA[i] as u32, (length - LENGTH_BASE[i]) as u32)
}

#[inline]
fn distance_symbol(distance: u16) -> (usize, u32, u32) {
    debug_assert!(distance >= 1);
    let i = DIST_BASE.partition_point(|&base| base <= distance) - 1;
    (i, DIST_EXTRA[i] as u32, (distance - DIST_BASE[i]) as u32)
}

/// One symbol of the run-length coded code-length sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CodeLenSymbol {
    symbol: u8,
    extra_bits: u8,
    extra: u8,
}

impl CodeLenSymbol {
    fn plain(len: u8) -> Self {
        Self {
            symbol: len,
            extra_bits: 0,
            extra: 0,
        }
    }
}

/// Run-length code a sequence of code lengths with symbols 16, 17 and 18.
fn run_length_code(lengths: &[u8]) -> Vec<CodeLenSymbol> {
    let mut out = Vec::new();
    let mut i = 0;

    while i < lengths.len() {
        let value = lengths[i];
        let mut run = lengths[i..].iter().take_while(|&&l| l == value).count();
        i += run;

        if value == 0 {
            while run >= 11 {
                let n = run.min(138);
                out.push(CodeLenSymbol {
                    symbol: 18,
                    extra_bits: 7,
                    extra: (n - 11) as u8,
                });
                run -= n;
            }
            if run >= 3 {
                out.push(CodeLenSymbol {
                    symbol: 17,
                    extra_bits: 3,
                    extra: (run - 3) as u8,
                });
                run = 0;
            }
        } else {
            out.push(CodeLenSymbol::plain(value));
            run -= 1;
            while run >= 3 {
                let n = run.min(6);
                out.push(CodeLenSymbol {
                    symbol: 16,
                    extra_bits: 2,
                    extra: (n - 3) as u8,
                });
                run -= n;
            }
        }

        out.extend(std::iter::repeat(CodeLenSymbol::plain(value)).take(run));
    }

    out
}

/// Everything needed to emit a dynamic block, computed up front so its
/// size can be compared with a stored block.
struct DynamicPlan {
    lit: HuffmanTable,
    dist: HuffmanTable,
    code_len: HuffmanTable,
    hlit: usize,
    hdist: usize,
    hclen: usize,
    header_symbols: Vec<CodeLenSymbol>,
    bits: u64,
}

impl DynamicPlan {
    fn new(tokens: &[Token]) -> Self {
        let mut lit_freq = [0u32; NUM_LIT_LEN];
        let mut dist_freq = [0u32; NUM_DIST];
        for token in tokens {
            match *token {
                Token::Literal(b) => lit_freq[b as usize] += 1,
                Token::Match { length, distance } => {
                    lit_freq[length_symbol(length).0] += 1;
                    dist_freq[distance_symbol(distance).0] += 1;
                }
            }
        }
        lit_freq[END_OF_BLOCK] = 1;

        let lit = HuffmanTable::from_freqs(&lit_freq, MAX_CODE_LEN);
        let dist = HuffmanTable::from_freqs(&dist_freq, MAX_CODE_LEN);

        let hlit = last_used(lit.lengths()).max(257);
        let hdist = last_used(dist.lengths()).max(1);

        let mut all_lengths = Vec::with_capacity(hlit + hdist);
        all_lengths.extend_from_slice(&lit.lengths()[..hlit]);
        all_lengths.extend_from_slice(&dist.lengths()[..hdist]);
        let header_symbols = run_length_code(&all_lengths);

        let mut cl_freq = [0u32; NUM_CODE_LEN];
        for sym in &header_symbols {
            cl_freq[sym.symbol as usize] += 1;
        }
        let code_len = HuffmanTable::from_freqs(&cl_freq, MAX_CODE_LENGTH_CODE_LEN);
        let hclen = CODE_LEN_ORDER
            .iter()
            .rposition(|&sym| code_len.lengths()[sym] > 0)
            .map_or(0, |i| i + 1)
            .max(4);

        let mut bits: u64 = 3 + 5 + 5 + 4 + 3 * hclen as u64;
        for sym in &header_symbols {
            bits += (code_len.len_of(sym.symbol as usize) + sym.extra_bits as u32) as u64;
        }
        for (symbol, &freq) in lit_freq.iter().enumerate() {
            bits += freq as u64 * lit.len_of(symbol) as u64;
        }
        for (symbol, &freq) in dist_freq.iter().enumerate() {
            bits += freq as u64 * dist.len_of(symbol) as u64;
        }
        for token in tokens {
            if let Token::Match { length, distance } = *token {
                bits += (length_symbol(length).1 + distance_symbol(distance).1) as u64;
            }
        }

        Self {
            lit,
            dist,
            code_len,
            hlit,
            hdist,
            hclen,
            header_symbols,
            bits,
        }
    }

    fn write(&self, bw: &mut BitWriter, tokens: &[Token], is_final: bool) {
        bw.write_bits(is_final as u32, 1);
        bw.write_bits(2, 2);
        bw.write_bits((self.hlit - 257) as u32, 5);
        bw.write_bits((self.hdist - 1) as u32, 5);
        bw.write_bits((self.hclen - 4) as u32, 4);

        for &sym in &CODE_LEN_ORDER[..self.hclen] {
            bw.write_bits(self.code_len.len_of(sym), 3);
        }
        for sym in &self.header_symbols {
            self.code_len.write(bw, sym.symbol as usize);
            bw.write_bits(sym.extra as u32, sym.extra_bits as u32);
        }

        for token in tokens {
            match *token {
                Token::Literal(b) => self.lit.write(bw, b as usize),
                Token::Match { length, distance } => {
                    let (symbol, extra_bits, extra) = length_symbol(length);
                    self.lit.write(bw, symbol);
                    bw.write_bits(extra, extra_bits);

                    let (symbol, extra_bits, extra) = distance_symbol(distance);
                    self.dist.write(bw, symbol);
                    bw.write_bits(extra, extra_bits);
                }
            }
        }
        self.lit.write(bw, END_OF_BLOCK);
    }
}

/// Number of entries up to and including the last nonzero length.
fn last_used(lengths: &[u8]) -> usize {
    lengths.iter().rposition(|&l| l > 0).map_or(0, |i| i + 1)
}

/// Size in bits of `len` bytes as a stored block, given the writer's
/// current bit offset.
fn stored_bits(pending_bits: u32, len: usize) -> u64 {
    let header_end = (pending_bits + 3) % 8;
    let padding = (8 - header_end) % 8;
    3 + padding as u64 + 32 + 8 * len as u64
}

/// Write a stored block holding `raw` (at most 65 535 bytes).
pub(crate) fn write_stored(bw: &mut BitWriter, raw: &[u8], is_final: bool) {
    debug_assert!(raw.len() <= MAX_STORED_LEN);
    let len = raw.len() as u16;
    bw.write_bits(is_final as u32, 1);
    bw.write_bits(0, 2);
    bw.align();
    bw.write_bits(len as u32, 16);
    bw.write_bits(!len as u32, 16);
    bw.write_bytes(raw);
}

/// Write one block for `tokens`, whichever of dynamic Huffman or stored is
/// smaller. `raw` must be the bytes the tokens expand to.
pub(crate) fn write_block(bw: &mut BitWriter, tokens: &[Token], raw: &[u8], is_final: bool) -> BlockKind {
    let plan = DynamicPlan::new(tokens);
    let stored = stored_bits(bw.pending_bits(), raw.len());

    if raw.len() <= MAX_STORED_LEN && stored < plan.bits {
        log::trace!(
            "stored block: {} bytes ({} bits, dynamic would be {} bits)",
            raw.len(),
            stored,
            plan.bits
        );
        write_stored(bw, raw, is_final);
        BlockKind::Stored
    } else {
        log::trace!(
            "dynamic block: {} bytes in {} tokens -> {} bits",
            raw.len(),
            tokens.len(),
            plan.bits
        );
        plan.write(bw, tokens, is_final);
        BlockKind::Dynamic
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deflate::lz77::tokenize;
    use flate2::read::DeflateDecoder;
    use std::io::Read;

    fn inflate(bytes: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        DeflateDecoder::new(bytes).read_to_end(&mut out).unwrap();
        out
    }

    fn single_block(data: &[u8], effort: u8) -> (Vec<u8>, BlockKind) {
        let tokens = tokenize(data, effort);
        let mut bw = BitWriter::new();
        let kind = write_block(&mut bw, &tokens, data, true);
        (bw.finish(), kind)
    }

    #[test]
    fn test_length_symbols() {
        assert_eq!(length_symbol(3), (257, 0, 0));
        assert_eq!(length_symbol(10), (264, 0, 0));
        assert_eq!(length_symbol(11), (265, 1, 0));
        assert_eq!(length_symbol(12), (265, 1, 1));
        assert_eq!(length_symbol(257), (284, 5, 30));
        assert_eq!(length_symbol(258), (285, 0, 0));
    }

    #[test]
    fn test_distance_symbols() {
        assert_eq!(distance_symbol(1), (0, 0, 0));
        assert_eq!(distance_symbol(4), (3, 0, 0));
        assert_eq!(distance_symbol(6), (4, 1, 1));
        assert_eq!(distance_symbol(32768), (29, 13, 8191));
    }

    #[test]
    fn test_run_length_coding() {
        let coded = run_length_code(&[0; 140]);
        assert_eq!(
            coded,
            vec![
                CodeLenSymbol {
                    symbol: 18,
                    extra_bits: 7,
                    extra: 127
                },
                CodeLenSymbol::plain(0),
                CodeLenSymbol::plain(0),
            ]
        );

        let coded = run_length_code(&[8, 8, 8, 8, 8, 8, 8, 8]);
        assert_eq!(
            coded,
            vec![
                CodeLenSymbol::plain(8),
                CodeLenSymbol {
                    symbol: 16,
                    extra_bits: 2,
                    extra: 3
                },
                CodeLenSymbol::plain(8),
            ]
        );

        let coded = run_length_code(&[5, 0, 0, 0, 0, 3, 3]);
        assert_eq!(
            coded,
            vec![
                CodeLenSymbol::plain(5),
                CodeLenSymbol {
                    symbol: 17,
                    extra_bits: 3,
                    extra: 1
                },
                CodeLenSymbol::plain(3),
                CodeLenSymbol::plain(3),
            ]
        );
    }

    #[test]
    fn test_stored_block_layout() {
        let mut bw = BitWriter::new();
        write_stored(&mut bw, b"hi", true);
        assert_eq!(bw.finish(), vec![0x01, 0x02, 0x00, 0xFD, 0xFF, b'h', b'i']);
    }

    #[test]
    fn test_empty_final_block_inflates() {
        let (bytes, _) = single_block(b"", 6);
        assert!(inflate(&bytes).is_empty());
    }

    #[test]
    fn test_text_uses_dynamic_block() {
        let data = b"the quick brown fox jumps over the lazy dog; the quick brown fox again".repeat(20);
        let (bytes, kind) = single_block(&data, 6);
        assert_eq!(kind, BlockKind::Dynamic);
        assert!(bytes.len() < data.len() / 4);
        assert_eq!(inflate(&bytes), data);
    }

    #[test]
    fn test_incompressible_data_falls_back_to_stored() {
        // xorshift noise has no structure to exploit
        let mut state = 0x2545_F491u32;
        let data: Vec<u8> = (0..4096)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                (state >> 24) as u8
            })
            .collect();
        let (bytes, kind) = single_block(&data, 6);
        assert_eq!(kind, BlockKind::Stored);
        assert_eq!(bytes.len(), data.len() + 5);
        assert_eq!(inflate(&bytes), data);
    }

    #[test]
    fn test_single_literal_block() {
        let (bytes, _) = single_block(b"a", 6);
        assert_eq!(inflate(&bytes), b"a");
    }

    #[test]
    fn test_all_literal_values() {
        let data: Vec<u8> = (0..=255u8).cycle().take(2048).collect();
        let (bytes, _) = single_block(&data, 9);
        assert_eq!(inflate(&bytes), data);
    }

    #[test]
    fn test_stored_bits_accounts_for_padding() {
        assert_eq!(stored_bits(0, 0), 3 + 5 + 32);
        assert_eq!(stored_bits(5, 0), 3 + 0 + 32);
        assert_eq!(stored_bits(6, 10), 3 + 7 + 32 + 80);
    }
}
