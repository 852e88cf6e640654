//! LZ77 match finding over a sliding window with hash chains.
//!
//! Every position whose next three bytes are known is linked into a chain
//! keyed by a hash of those bytes. A search walks the chain from the most
//! recent position backwards, so among equally long matches the closest one
//! wins.

/// Shortest back-reference DEFLATE can express.
pub const MIN_MATCH: usize = 3;

/// Longest back-reference DEFLATE can express.
pub const MAX_MATCH: usize = 258;

/// Maximum back-reference distance (32 KiB).
pub const WINDOW_SIZE: usize = 32 * 1024;

const HASH_BITS: u32 = 15;
const HASH_SIZE: usize = 1 << HASH_BITS;
const NIL: u32 = u32::MAX;

/// Output of the match finder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    /// A byte copied to the output as-is.
    Literal(u8),
    /// Copy `length` bytes starting `distance` bytes back.
    Match { length: u16, distance: u16 },
}

/// How hard the match finder searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchParams {
    /// Maximum number of chain entries visited per position
    pub max_chain: usize,
    /// Stop searching once a match this long is found
    pub nice_length: usize,
}

impl SearchParams {
    /// Search parameters for a compression effort (0-9).
    ///
    /// Effort 0 returns `None`: no match search, literals only.
    pub fn for_effort(effort: u8) -> Option<Self> {
        let (max_chain, nice_length) = match effort.min(9) {
            0 => return None,
            1 => (4, 8),
            2 => (8, 16),
            3 => (16, 32),
            4 => (32, 64),
            5 => (64, 128),
            6 => (128, 128),
            7 => (256, MAX_MATCH),
            8 => (1024, MAX_MATCH),
            _ => (4096, MAX_MATCH),
        };
        Some(Self {
            max_chain,
            nice_length,
        })
    }
}

#[inline]
fn hash3(bytes: &[u8]) -> usize {
    let v = bytes[0] as u32 | (bytes[1] as u32) << 8 | (bytes[2] as u32) << 16;
    (v.wrapping_mul(0x9E37_79B1) >> (32 - HASH_BITS)) as usize
}

/// Hash-chain index over a buffer that grows at the end and is trimmed at
/// the front.
///
/// Positions are offsets into the caller's buffer. `prev[p]` links position
/// `p` to the previous position with the same hash; `head` holds the most
/// recent position for each hash.
#[derive(Debug)]
pub(crate) struct MatchFinder {
    params: Option<SearchParams>,
    head: Vec<u32>,
    prev: Vec<u32>,
    next_insert: usize,
}

impl MatchFinder {
    pub(crate) fn new(effort: u8) -> Self {
        let params = SearchParams::for_effort(effort);
        Self {
            params,
            head: if params.is_some() { vec![NIL; HASH_SIZE] } else { Vec::new() },
            prev: Vec::new(),
            next_insert: 0,
        }
    }

    /// Tokenize `data[start..end]`, using everything before `start` as
    /// history. Matches never extend past `end`.
    pub(crate) fn tokenize(&mut self, data: &[u8], start: usize, end: usize, tokens: &mut Vec<Token>) {
        debug_assert!(start <= end && end <= data.len());

        let Some(params) = self.params else {
            tokens.extend(data[start..end].iter().map(|&b| Token::Literal(b)));
            return;
        };

        let mut pos = start;
        while pos < end {
            self.insert_until(data, pos);

            let found = if end - pos >= MIN_MATCH {
                self.longest_match(data, pos, end, params)
            } else {
                None
            };

            match found {
                Some((length, distance)) => {
                    tokens.push(Token::Match {
                        length: length as u16,
                        distance: distance as u16,
                    });
                    pos += length;
                }
                None => {
                    tokens.push(Token::Literal(data[pos]));
                    pos += 1;
                }
            }
        }
    }

    /// Forget the first `shift` bytes of the buffer; every stored position
    /// moves down by `shift` and positions that fall off become empty.
    pub(crate) fn slide(&mut self, shift: usize) {
        if self.params.is_none() || shift == 0 {
            return;
        }
        debug_assert!(shift <= self.next_insert, "sliding past unindexed data");

        self.prev.drain(..shift);
        self.next_insert -= shift;

        let shift = shift as u32;
        for slot in self.head.iter_mut().chain(self.prev.iter_mut()) {
            *slot = if *slot == NIL || *slot < shift {
                NIL
            } else {
                *slot - shift
            };
        }
    }

    /// Link every position before `pos` that has three known bytes.
    fn insert_until(&mut self, data: &[u8], pos: usize) {
        while self.next_insert < pos && self.next_insert + MIN_MATCH <= data.len() {
            let p = self.next_insert;
            let h = hash3(&data[p..]);
            self.prev.push(self.head[h]);
            self.head[h] = p as u32;
            self.next_insert += 1;
        }
    }

    fn longest_match(
        &self,
        data: &[u8],
        pos: usize,
        end: usize,
        params: SearchParams,
    ) -> Option<(usize, usize)> {
        let max_len = (end - pos).min(MAX_MATCH);
        let target = &data[pos..pos + max_len];
        let nice = params.nice_length.min(max_len);

        let mut best_len = MIN_MATCH - 1;
        let mut best_dist = 0;
        let mut candidate = self.head[hash3(target)];
        let mut chain = params.max_chain;

        while candidate != NIL && chain > 0 {
            let cand = candidate as usize;
            let distance = pos - cand;
            if distance > WINDOW_SIZE {
                break;
            }

            // A longer match must at least agree at the current best length
            if data[cand + best_len] == target[best_len] {
                let len = data[cand..]
                    .iter()
                    .zip(target)
                    .take_while(|(a, b)| a == b)
                    .count();
                // Strictly longer only: earlier (closer) candidates win ties
                if len > best_len {
                    best_len = len;
                    best_dist = distance;
                    if len >= nice {
                        break;
                    }
                }
            }

            candidate = self.prev[cand];
            chain -= 1;
        }

        (best_len >= MIN_MATCH).then_some((best_len, best_dist))
    }
}

/// Tokenize a whole buffer at once.
pub fn tokenize(data: &[u8], effort: u8) -> Vec<Token> {
    let mut finder = MatchFinder::new(effort);
    let mut tokens = Vec::new();
    finder.tokenize(data, 0, data.len(), &mut tokens);
    tokens
}

#[cfg(test)]
pub(crate) fn expand(tokens: &[Token]) -> Vec<u8> {
    let mut out: Vec<u8> = Vec::new();
    for token in tokens {
        match *token {
            Token::Literal(b) => out.push(b),
            Token::Match { length, distance } => {
                let start = out.len() - distance as usize;
                for i in 0..length as usize {
                    let b = out[start + i];
                    out.push(b);
                }
            }
        }
    }
    out
}


// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: Expanding the tokens reproduces the input.
        #[test]
        fn prop_tokens_expand_to_input(
            data in prop::collection::vec(0u8..4, 0..2000),
            effort in 0u8..=9,
        ) {
            let tokens = tokenize(&data, effort);
            prop_assert_eq!(expand(&tokens), data);
        }
    }
}
