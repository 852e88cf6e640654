//! Scanline prediction filters.
//!
//! Each row is transformed by one of five predictors before compression.
//! The adaptive selector tries all of them and keeps the one whose output,
//! read as signed bytes, has the smallest sum of absolute values. Rows close
//! to zero tend to compress better.
//!
//! # Example
//!
//! ```ignore
//! use rasterpress_core::filter::{select_filter, FilterType};
//!
//! let prev = [10u8, 20, 30];
//! let row = [10u8, 20, 30];
//! let filtered = select_filter(&row, &prev, 3);
//! assert_eq!(filtered.filter, FilterType::Up);
//! assert_eq!(filtered.bytes, vec![2, 0, 0, 0]);
//! ```

use serde::{Deserialize, Serialize};

/// Prediction filter applied to one scanline.
///
/// The discriminant is the tag byte written in front of the filtered row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum FilterType {
    /// Bytes are stored unchanged.
    None = 0,
    /// Difference from the byte one pixel to the left.
    Sub = 1,
    /// Difference from the byte directly above.
    Up = 2,
    /// Difference from the mean of left and above.
    Average = 3,
    /// Difference from the Paeth predictor of left, above and upper-left.
    Paeth = 4,
}

impl FilterType {
    /// All filters in tie-break order.
    pub const ALL: [FilterType; 5] = [
        FilterType::None,
        FilterType::Sub,
        FilterType::Up,
        FilterType::Average,
        FilterType::Paeth,
    ];

    /// Tag byte written before the filtered row.
    pub fn tag(self) -> u8 {
        self as u8
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        Self::ALL.get(tag as usize).copied()
    }
}

/// A filtered scanline together with the filter that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilteredRow {
    pub filter: FilterType,
    /// Tag byte followed by the transformed row
    pub bytes: Vec<u8>,
}

/// Paeth predictor: whichever of left, above, upper-left is closest to
/// `left + above - upper_left`, preferring left, then above.
#[inline]
pub fn paeth_predictor(left: u8, above: u8, upper_left: u8) -> u8 {
    let p = left as i16 + above as i16 - upper_left as i16;
    let pa = (p - left as i16).abs();
    let pb = (p - above as i16).abs();
    let pc = (p - upper_left as i16).abs();

    if pa <= pb && pa <= pc {
        left
    } else if pb <= pc {
        above
    } else {
        upper_left
    }
}

/// Apply `filter` to `row`, appending the transformed bytes (without tag) to
/// `out`.
///
/// # Arguments
///
/// * `row` - Current scanline
/// * `prev` - Previous scanline, all zeros for the first row
/// * `bpp` - Bytes per complete pixel (the "left" distance)
pub fn apply_filter(filter: FilterType, row: &[u8], prev: &[u8], bpp: usize, out: &mut Vec<u8>) {
    debug_assert_eq!(row.len(), prev.len(), "scanline length mismatch");
    let bpp = bpp.max(1);
    out.reserve(row.len());

    match filter {
        FilterType::None => out.extend_from_slice(row),
        FilterType::Sub => {
            out.extend(row.iter().enumerate().map(|(i, &x)| {
                let left = if i >= bpp { row[i - bpp] } else { 0 };
                x.wrapping_sub(left)
            }));
        }
        FilterType::Up => {
            out.extend(row.iter().zip(prev).map(|(&x, &above)| x.wrapping_sub(above)));
        }
        FilterType::Average => {
            out.extend(row.iter().enumerate().map(|(i, &x)| {
                let left = if i >= bpp { row[i - bpp] as u16 } else { 0 };
                let mean = ((left + prev[i] as u16) / 2) as u8;
                x.wrapping_sub(mean)
            }));
        }
        FilterType::Paeth => {
            out.extend(row.iter().enumerate().map(|(i, &x)| {
                let (left, upper_left) = if i >= bpp {
                    (row[i - bpp], prev[i - bpp])
                } else {
                    (0, 0)
                };
                x.wrapping_sub(paeth_predictor(left, prev[i], upper_left))
            }));
        }
    }
}

/// Sum of absolute values of the bytes read as `i8`.
pub fn filter_score(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .map(|&b| (b as i8).unsigned_abs() as u64)
        .sum()
}

/// Filter one scanline with every predictor and keep the lowest scoring.
///
/// Ties go to the filter that comes first in [`FilterType::ALL`].
pub fn select_filter(row: &[u8], prev: &[u8], bpp: usize) -> FilteredRow {
    let mut selector = FilterSelector::new(row.len());
    let filter = selector.choose(row, prev, bpp);
    let mut bytes = Vec::with_capacity(row.len() + 1);
    bytes.push(filter.tag());
    bytes.extend_from_slice(selector.best());
    FilteredRow { filter, bytes }
}

/// Reusable scratch space for adaptive filter selection.
///
/// The pipeline filters every row of an image; keeping the candidate
/// buffers alive avoids five allocations per row.
#[derive(Debug, Default)]
pub(crate) struct FilterSelector {
    candidate: Vec<u8>,
    best: Vec<u8>,
}

impl FilterSelector {
    pub(crate) fn new(row_bytes: usize) -> Self {
        Self {
            candidate: Vec::with_capacity(row_bytes),
            best: Vec::with_capacity(row_bytes),
        }
    }

    /// Run every filter and remember the winner's bytes.
    pub(crate) fn choose(&mut self, row: &[u8], prev: &[u8], bpp: usize) -> FilterType {
        let mut best_filter = FilterType::None;
        let mut best_score = u64::MAX;

        for filter in FilterType::ALL {
            self.candidate.clear();
            apply_filter(filter, row, prev, bpp, &mut self.candidate);
            let score = filter_score(&self.candidate);
            // Strict comparison keeps the earliest filter on ties
            if score < best_score {
                best_score = score;
                best_filter = filter;
                std::mem::swap(&mut self.best, &mut self.candidate);
            }
        }

        best_filter
    }

    /// Apply a single filter, bypassing selection.
    pub(crate) fn apply(&mut self, filter: FilterType, row: &[u8], prev: &[u8], bpp: usize) {
        self.best.clear();
        apply_filter(filter, row, prev, bpp, &mut self.best);
    }

    /// Bytes of the last chosen or applied filter.
    pub(crate) fn best(&self) -> &[u8] {
        &self.best
    }
}


// ============================================================================
// Property-Based Tests
// ============================================================================
