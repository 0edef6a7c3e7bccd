// Maps a sample index to one or more chunk identifiers, tracking which
// chunk boundaries a sample straddles. Diverges from the generic
// skeleton: a chunk boundary is a decision the writer makes explicitly
// (`generate_chunk_id`), never inferred from an item's value, so there is
// no `combine_condition`/`make_decomposable` pair here.

use crate::error::{invalid_argument, invalid_state, Result};
use crate::matrix::{resolve_index, EncodedMatrix};
use tracing::trace;
use uuid::Uuid;

const CHUNK_ID_COLUMN: usize = 0;

pub struct ChunkIdEncoder {
    ids: EncodedMatrix,
    connectivity: Vec<bool>,
}

impl ChunkIdEncoder {
    pub fn new() -> Self {
        ChunkIdEncoder {
            ids: EncodedMatrix::new(2),
            connectivity: Vec::new(),
        }
    }

    pub(crate) fn from_parts(ids: EncodedMatrix, connectivity: Vec<bool>) -> Self {
        ChunkIdEncoder { ids, connectivity }
    }

    pub fn num_chunks(&self) -> usize {
        self.ids.num_rows()
    }

    // Relies on unsigned wraparound: an empty encoder's implicit seed is
    // last_seen_index = -1, represented as u64::MAX, so MAX + 1 wraps to 0.
    pub fn num_samples(&self) -> u64 {
        if self.ids.is_empty() {
            0
        } else {
            self.ids.last_seen_index(self.ids.num_rows() - 1).wrapping_add(1)
        }
    }

    pub fn array(&self) -> &EncodedMatrix {
        &self.ids
    }

    pub fn connectivity(&self) -> &[bool] {
        &self.connectivity
    }

    pub fn nbytes(&self) -> usize {
        self.ids.nbytes() + self.connectivity.len()
    }

    // Mints a fresh chunk id and opens a new, currently-empty chunk row.
    pub fn generate_chunk_id(&mut self) -> u64 {
        let id = mint_chunk_id();
        let previous_last = if self.ids.is_empty() {
            u64::MAX
        } else {
            self.ids.last_seen_index(self.ids.num_rows() - 1)
        };
        self.ids.push_row(&[id, previous_last]);
        self.connectivity.push(false);
        trace!(target: "sample_index", chunk = %name_from_id(id), "generated chunk id");
        id
    }

    pub fn register_samples_to_last_chunk_id(&mut self, n: u64) -> Result<()> {
        if self.ids.is_empty() {
            return Err(invalid_state(
                "cannot register samples because no chunk ids exist",
            ));
        }
        if n == 0 && self.ids.num_rows() < 2 {
            return Err(invalid_state(
                "cannot register 0 samples (a partial continuing sample) when no prior chunk exists",
            ));
        }
        let tail = self.ids.num_rows() - 1;
        let cur = self.ids.last_seen_index(tail);
        self.ids.set_last_seen_index(tail, cur.wrapping_add(n));
        trace!(target: "sample_index", n, "registered samples to last chunk id");
        Ok(())
    }

    // Marks the second-to-last chunk as straddling into the last one.
    pub fn register_connection_to_last_chunk_id(&mut self) -> Result<String> {
        if self.ids.num_rows() < 2 {
            return Err(invalid_state(
                "cannot register connection because at least two chunk ids must exist",
            ));
        }
        let idx = self.ids.num_rows() - 2;
        self.connectivity[idx] = true;
        let id = self.ids.row(idx)[CHUNK_ID_COLUMN];
        trace!(target: "sample_index", chunk = %name_from_id(id), "registered connection");
        Ok(name_from_id(id))
    }

    pub fn get(&self, index: i64) -> Result<Vec<u64>> {
        let (ids, _) = self.get_with_row_indices(index)?;
        Ok(ids)
    }

    pub fn get_with_row_indices(&self, index: i64) -> Result<(Vec<u64>, Vec<usize>)> {
        let num_samples = self.num_samples();
        let local = resolve_index(index, num_samples)?;
        let mut row_index = self
            .ids
            .binary_search_last_seen_index(local)
            .expect("local index was bounds-checked against num_samples above");

        let mut ids = vec![self.ids.row(row_index)[CHUNK_ID_COLUMN]];
        let mut rows = vec![row_index];

        while self.ids.last_seen_index(row_index) == local
            && self.connectivity[row_index]
            && row_index + 1 < self.ids.num_rows()
        {
            row_index += 1;
            ids.push(self.ids.row(row_index)[CHUNK_ID_COLUMN]);
            rows.push(row_index);
        }

        Ok((ids, rows))
    }

    pub fn get_local_sample_index(&self, global: i64) -> Result<u64> {
        let num_samples = self.num_samples();
        let local = resolve_index(global, num_samples)?;
        let row_index = self
            .ids
            .binary_search_last_seen_index(local)
            .expect("local index was bounds-checked against num_samples above");
        Ok(local - self.ids.run_first_index(row_index))
    }
}

impl Default for ChunkIdEncoder {
    fn default() -> Self {
        Self::new()
    }
}

fn mint_chunk_id() -> u64 {
    let id = Uuid::new_v4();
    let bytes = id.as_bytes();
    u64::from_be_bytes(bytes[0..8].try_into().expect("uuid is 16 bytes"))
}

// Lowercase hex, no 0x prefix, no leading zeros.
pub fn name_from_id(id: u64) -> String {
    format!("{id:x}")
}

// Inverse of name_from_id; case-insensitive, rejects non-hex input.
pub fn id_from_name(name: &str) -> Result<u64> {
    u64::from_str_radix(name, 16)
        .map_err(|e| invalid_argument(format!("invalid hex chunk name {name:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn test_first_chunk_wraps_correctly() {
        let mut enc = ChunkIdEncoder::new();
        enc.generate_chunk_id();
        assert_eq!(enc.num_samples(), 0);
        enc.register_samples_to_last_chunk_id(3).unwrap();
        assert_eq!(enc.num_samples(), 3);
    }

    #[test]
    fn test_straddle_scenario() {
        let mut enc = ChunkIdEncoder::new();
        let a = enc.generate_chunk_id();
        enc.register_samples_to_last_chunk_id(3).unwrap();
        let b = enc.generate_chunk_id();
        enc.register_samples_to_last_chunk_id(0).unwrap();
        let connecting_name = enc.register_connection_to_last_chunk_id().unwrap();
        assert_eq!(connecting_name, name_from_id(a));
        enc.register_samples_to_last_chunk_id(2).unwrap();

        assert_eq!(enc.num_samples(), 5);
        // sample 2 is the last sample counted in A's run and connectivity[A]
        // is set, so it straddles into B.
        assert_eq!(enc.get(2).unwrap(), vec![a, b]);
        assert_eq!(enc.get(3).unwrap(), vec![b]);
        assert_eq!(enc.get(4).unwrap(), vec![b]);
        assert_eq!(enc.get_local_sample_index(3).unwrap(), 1);
    }

    #[test]
    fn test_register_samples_requires_a_chunk() {
        let mut enc = ChunkIdEncoder::new();
        let err = enc.register_samples_to_last_chunk_id(1).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidState);
    }

    #[test]
    fn test_register_zero_samples_requires_two_chunks() {
        let mut enc = ChunkIdEncoder::new();
        enc.generate_chunk_id();
        let err = enc.register_samples_to_last_chunk_id(0).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidState);
    }

    #[test]
    fn test_register_connection_requires_two_chunks() {
        let mut enc = ChunkIdEncoder::new();
        enc.generate_chunk_id();
        let err = enc.register_connection_to_last_chunk_id().unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidState);
    }

    #[test]
    fn test_name_from_id_matches_examples() {
        assert_eq!(name_from_id(0), "0");
        assert_eq!(name_from_id(255), "ff");
    }

    #[test]
    fn test_id_from_name_is_case_insensitive_and_rejects_non_hex() {
        assert_eq!(id_from_name("ff").unwrap(), 255);
        assert_eq!(id_from_name("FF").unwrap(), 255);
        assert!(id_from_name("zz").is_err());
    }
}
