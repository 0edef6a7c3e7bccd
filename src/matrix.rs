// The dense 2D array backing every encoder. Laid out as a single flat,
// row-major `Vec<u64>` rather than a `Vec<Vec<u64>>` so the whole thing is
// one contiguous allocation and round-trips to a row-major, little-endian,
// unpadded binary layout without any reshaping. Metadata elsewhere in this
// codebase is kept in flat `Vec<T>` columns per field; this is the same
// idea applied to a single 2D array instead of several parallel ones.

use crate::error::{corrupted, out_of_bounds, Result};
use serde::{Deserialize, Serialize};

// Rightmost column: the inclusive global sample index a row's run ends at.
// Rows are sorted strictly ascending on it.
pub const LAST_SEEN_INDEX_COLUMN_FROM_END: usize = 1;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedMatrix {
    cols: usize,
    data: Vec<u64>,
}

impl EncodedMatrix {
    pub fn new(cols: usize) -> Self {
        assert!(cols >= 1, "encoded matrix needs at least a last-seen-index column");
        EncodedMatrix {
            cols,
            data: Vec::new(),
        }
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn num_rows(&self) -> usize {
        self.data.len() / self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn nbytes(&self) -> usize {
        self.data.len() * std::mem::size_of::<u64>()
    }

    pub fn row(&self, row_index: usize) -> &[u64] {
        let start = row_index * self.cols;
        &self.data[start..start + self.cols]
    }

    pub fn row_mut(&mut self, row_index: usize) -> &mut [u64] {
        let start = row_index * self.cols;
        &mut self.data[start..start + self.cols]
    }

    pub fn last_seen_index(&self, row_index: usize) -> u64 {
        self.row(row_index)[self.cols - 1]
    }

    pub fn set_last_seen_index(&mut self, row_index: usize, value: u64) {
        let cols = self.cols;
        self.row_mut(row_index)[cols - 1] = value;
    }

    // One past the previous row's last-seen index, or 0 for row 0.
    pub fn run_first_index(&self, row_index: usize) -> u64 {
        if row_index == 0 {
            0
        } else {
            self.last_seen_index(row_index - 1) + 1
        }
    }

    pub fn num_samples_in_row(&self, row_index: usize) -> u64 {
        self.last_seen_index(row_index) - self.run_first_index(row_index) + 1
    }

    pub fn push_row(&mut self, row: &[u64]) {
        assert_eq!(row.len(), self.cols);
        self.data.extend_from_slice(row);
    }

    pub fn replace_row(&mut self, row_index: usize, row: &[u64]) {
        assert_eq!(row.len(), self.cols);
        self.row_mut(row_index).copy_from_slice(row);
    }

    // Replaces one row with zero or more rows, reallocating the backing
    // storage. Used by the split/squeeze overwrite actions.
    pub fn splice_row(&mut self, row_index: usize, rows: &[&[u64]]) {
        let cols = self.cols;
        let start = row_index * cols;
        let end = start + cols;
        let mut replacement = Vec::with_capacity(rows.len() * cols);
        for row in rows {
            assert_eq!(row.len(), cols);
            replacement.extend_from_slice(row);
        }
        self.data.splice(start..end, replacement);
    }

    pub fn remove_row(&mut self, row_index: usize) {
        let cols = self.cols;
        let start = row_index * cols;
        self.data.drain(start..start + cols);
    }

    // Smallest row index whose last-seen index is >= target_index, or
    // None if target_index exceeds every row.
    pub fn binary_search_last_seen_index(&self, target_index: u64) -> Option<usize> {
        let n = self.num_rows();
        let mut lo = 0usize;
        let mut hi = n;
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if self.last_seen_index(mid) < target_index {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        if lo < n {
            Some(lo)
        } else {
            None
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.nbytes());
        for v in &self.data {
            out.extend_from_slice(&v.to_le_bytes());
        }
        out
    }

    pub fn from_bytes(cols: usize, bytes: &[u8]) -> Result<Self> {
        if bytes.len() % 8 != 0 {
            return Err(corrupted("encoded matrix byte length not a multiple of 8"));
        }
        let n_u64 = bytes.len() / 8;
        if n_u64 % cols != 0 {
            return Err(corrupted("encoded matrix byte length does not divide evenly by column count"));
        }
        let mut data = Vec::with_capacity(n_u64);
        for chunk in bytes.chunks_exact(8) {
            data.push(u64::from_le_bytes(chunk.try_into().unwrap()));
        }
        Ok(EncodedMatrix { cols, data })
    }
}

// Translates a possibly-negative index (-1 means "last sample") into an
// absolute index, bounds-checking against num_samples.
pub fn resolve_index(index: i64, num_samples: u64) -> Result<u64> {
    if num_samples == 0 {
        return Err(out_of_bounds(format!(
            "index {index} is out of bounds for an empty encoder"
        )));
    }
    let resolved = if index < 0 {
        (num_samples as i64) + index
    } else {
        index
    };
    if resolved < 0 || resolved as u64 >= num_samples {
        return Err(out_of_bounds(format!(
            "index {index} is out of bounds for {num_samples} samples"
        )));
    }
    Ok(resolved as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn test_push_and_binary_search() {
        let mut m = EncodedMatrix::new(2);
        m.push_row(&[10, 4]);
        m.push_row(&[20, 6]);
        assert_eq!(m.num_rows(), 2);
        assert_eq!(m.binary_search_last_seen_index(0), Some(0));
        assert_eq!(m.binary_search_last_seen_index(4), Some(0));
        assert_eq!(m.binary_search_last_seen_index(5), Some(1));
        assert_eq!(m.binary_search_last_seen_index(6), Some(1));
        assert_eq!(m.binary_search_last_seen_index(7), None);
    }

    #[test]
    fn test_splice_row_split_middle() {
        let mut m = EncodedMatrix::new(2);
        m.push_row(&[10, 6]);
        m.splice_row(0, &[&[10, 1], &[20, 2], &[10, 6]]);
        assert_eq!(m.num_rows(), 3);
        assert_eq!(m.row(0), &[10, 1]);
        assert_eq!(m.row(1), &[20, 2]);
        assert_eq!(m.row(2), &[10, 6]);
    }

    #[test]
    fn test_byte_round_trip() {
        let mut m = EncodedMatrix::new(3);
        m.push_row(&[1, 2, 3]);
        m.push_row(&[4, 5, 9]);
        let bytes = m.to_bytes();
        assert_eq!(bytes.len(), 6 * 8);
        let back = EncodedMatrix::from_bytes(3, &bytes).unwrap();
        assert_eq!(m, back);
    }

    #[test]
    fn test_resolve_index_negative() {
        assert_eq!(resolve_index(-1, 5).unwrap(), 4);
        assert_eq!(resolve_index(0, 5).unwrap(), 0);
        assert!(resolve_index(5, 5).is_err());
        assert!(resolve_index(-6, 5).is_err());
        assert!(resolve_index(0, 0).is_err());
    }
}
