//! Length-limited Huffman code construction and canonical code assignment.
//!
//! Code lengths come from a classic two-queue Huffman build over the
//! symbols sorted by frequency. When the tree is deeper than the limit the
//! length histogram is repaired until the Kraft sum is exactly one again,
//! then lengths are handed out so that rarer symbols get longer codes.

use super::bits::BitWriter;

/// Longest code allowed for the literal/length and distance alphabets.
pub const MAX_CODE_LEN: u8 = 15;

/// Longest code allowed for the code-length alphabet.
pub const MAX_CODE_LENGTH_CODE_LEN: u8 = 7;

/// Compute code lengths for `freqs`, none longer than `max_len`.
///
/// Symbols with zero frequency get length 0. If fewer than two symbols are
/// used, the lowest unused symbols are added so the result is always a
/// complete prefix code of at least two entries.
pub fn code_lengths(freqs: &[u32], max_len: u8) -> Vec<u8> {
    debug_assert!(max_len >= 1 && max_len <= 15);
    let mut lengths = vec![0u8; freqs.len()];

    let mut leaves: Vec<(u32, usize)> = freqs
        .iter()
        .enumerate()
        .filter(|&(_, &freq)| freq > 0)
        .map(|(sym, &freq)| (freq, sym))
        .collect();

    if leaves.len() < 2 {
        for sym in 0..freqs.len() {
            if leaves.len() >= 2 {
                break;
            }
            if !leaves.iter().any(|&(_, used)| used == sym) {
                leaves.push((0, sym));
            }
        }
        for &(_, sym) in &leaves {
            lengths[sym] = 1;
        }
        return lengths;
    }

    leaves.sort_unstable();
    let n = leaves.len();

    // Nodes 0..n are leaves, n.. are internal nodes in creation order
    let mut weight: Vec<u64> = leaves.iter().map(|&(freq, _)| freq as u64).collect();
    weight.reserve(n - 1);
    let mut parent = vec![0usize; 2 * n - 1];
    let mut next_leaf = 0;
    let mut next_node = n;

    for _ in 0..n - 1 {
        let a = take_lightest(&weight, n, &mut next_leaf, &mut next_node);
        let b = take_lightest(&weight, n, &mut next_leaf, &mut next_node);
        let id = weight.len();
        weight.push(weight[a] + weight[b]);
        parent[a] = id;
        parent[b] = id;
    }

    // Parents are always created after their children
    let root = 2 * n - 2;
    let mut depth = vec![0u32; 2 * n - 1];
    for node in (0..root).rev() {
        depth[node] = depth[parent[node]] + 1;
    }

    let max = max_len as usize;
    let mut bl_count = vec![0u32; max + 1];
    let mut overflow = false;
    for &d in &depth[..n] {
        let d = d as usize;
        if d > max {
            overflow = true;
        }
        bl_count[d.min(max)] += 1;
    }

    if overflow {
        // Clamping over-subscribes the code; shorten the deficit one leaf
        // at a time by splitting a shorter code.
        let mut total: u32 = (1..=max).map(|len| bl_count[len] << (max - len)).sum();
        while total > 1 << max {
            bl_count[max] -= 1;
            for len in (1..max).rev() {
                if bl_count[len] != 0 {
                    bl_count[len] -= 1;
                    bl_count[len + 1] += 2;
                    break;
                }
            }
            total -= 1;
        }
    }

    // Leaves are sorted by ascending frequency: longest codes first
    let mut leaf = 0;
    for len in (1..=max).rev() {
        for _ in 0..bl_count[len] {
            lengths[leaves[leaf].1] = len as u8;
            leaf += 1;
        }
    }

    lengths
}

fn take_lightest(weight: &[u64], leaf_end: usize, next_leaf: &mut usize, next_node: &mut usize) -> usize {
    let node_available = *next_node < weight.len();
    let use_leaf =
        *next_leaf < leaf_end && (!node_available || weight[*next_leaf] <= weight[*next_node]);
    if use_leaf {
        *next_leaf += 1;
        *next_leaf - 1
    } else {
        *next_node += 1;
        *next_node - 1
    }
}

/// Assign canonical codes (MSB-first) from code lengths, as in RFC 1951
/// section 3.2.2.
pub fn canonical_codes(lengths: &[u8]) -> Vec<u16> {
    let max = lengths.iter().copied().max().unwrap_or(0) as usize;
    let mut bl_count = vec![0u16; max + 1];
    for &len in lengths {
        if len > 0 {
            bl_count[len as usize] += 1;
        }
    }

    let mut next_code = vec![0u16; max + 2];
    let mut code = 0u16;
    for bits in 1..=max {
        code = (code + bl_count[bits - 1]) << 1;
        next_code[bits] = code;
    }

    lengths
        .iter()
        .map(|&len| {
            if len == 0 {
                return 0;
            }
            let assigned = next_code[len as usize];
            next_code[len as usize] += 1;
            assigned
        })
        .collect()
}

#[inline]
fn reverse_bits(code: u16, len: u8) -> u16 {
    if len == 0 {
        return 0;
    }
    code.reverse_bits() >> (16 - len as u32)
}

/// A prefix code ready for emission: lengths plus bit-reversed codes, since
/// DEFLATE packs Huffman codes starting from their most significant bit.
#[derive(Debug, Clone)]
pub(crate) struct HuffmanTable {
    lengths: Vec<u8>,
    codes: Vec<u16>,
}

impl HuffmanTable {
    pub(crate) fn from_freqs(freqs: &[u32], max_len: u8) -> Self {
        Self::from_lengths(code_lengths(freqs, max_len))
    }

    pub(crate) fn from_lengths(lengths: Vec<u8>) -> Self {
        let codes = canonical_codes(&lengths)
            .into_iter()
            .zip(&lengths)
            .map(|(code, &len)| reverse_bits(code, len))
            .collect();
        Self { lengths, codes }
    }

    pub(crate) fn lengths(&self) -> &[u8] {
        &self.lengths
    }

    #[inline]
    pub(crate) fn len_of(&self, symbol: usize) -> u32 {
        self.lengths[symbol] as u32
    }

    #[inline]
    pub(crate) fn write(&self, bw: &mut BitWriter, symbol: usize) {
        debug_assert!(self.lengths[symbol] > 0, "symbol {symbol} has no code");
        bw.write_bits(self.codes[symbol] as u32, self.lengths[symbol] as u32);
    }
}


// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: Lengths respect the limit and form a complete code.
        #[test]
        fn prop_lengths_form_complete_code(
            freqs in prop::collection::vec(0u32..=100_000, 2..=286),
            max_len in 9u8..=15,
        ) {
            let lengths = code_lengths(&freqs, max_len);
            prop_assert_eq!(lengths.len(), freqs.len());

            let mut kraft = 0u64;
            for (&freq, &len) in freqs.iter().zip(&lengths) {
                prop_assert!(len <= max_len);
                if freq > 0 {
                    prop_assert!(len > 0, "used symbol without a code");
                }
                if len > 0 {
                    kraft += 1u64 << (max_len - len);
                }
            }
            prop_assert_eq!(kraft, 1u64 << max_len);
        }

        /// Property: Canonical codes are prefix-free.
        #[test]
        fn prop_canonical_codes_prefix_free(
            freqs in prop::collection::vec(0u32..=1000, 2..=40),
        ) {
            let lengths = code_lengths(&freqs, MAX_CODE_LEN);
            let codes = canonical_codes(&lengths);
            let used: Vec<(u16, u8)> = codes
                .iter()
                .zip(&lengths)
                .filter(|&(_, &len)| len > 0)
                .map(|(&code, &len)| (code, len))
                .collect();

            for (i, &(code_a, len_a)) in used.iter().enumerate() {
                for &(code_b, len_b) in &used[i + 1..] {
                    let shared = len_a.min(len_b);
                    let prefix_a = code_a >> (len_a - shared);
                    let prefix_b = code_b >> (len_b - shared);
                    prop_assert_ne!(prefix_a, prefix_b);
                }
            }
        }
    }
}
