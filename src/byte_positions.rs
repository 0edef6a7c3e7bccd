// Maps a sample index to its (start, end) byte range inside its chunk's
// payload. Columns: [num_bytes_per_sample, start_byte, last_seen_index].

use crate::error::{invalid_argument, Result};
use crate::matrix::EncodedMatrix;
use crate::skeleton::{Encoder, EncoderSchema};

// What the caller supplies when registering a run of fixed-width samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BytePositionsItem {
    pub num_bytes_per_sample: u64,
}

// End-exclusive byte range for a single sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

pub struct BytePositionsSchema;

impl EncoderSchema for BytePositionsSchema {
    type Item = BytePositionsItem;
    type Value = ByteRange;

    fn num_leading_columns(&self) -> usize {
        2
    }

    fn combine_condition(&self, item: &BytePositionsItem, matrix: &EncodedMatrix, row_index: usize) -> bool {
        matrix.row(row_index)[0] == item.num_bytes_per_sample
    }

    // start_byte is left at a placeholder; fixup_from derives the real
    // value once the row's neighbors are known.
    fn make_decomposable(&self, item: &BytePositionsItem) -> Vec<u64> {
        vec![item.num_bytes_per_sample, 0]
    }

    fn derive_value(&self, matrix: &EncodedMatrix, row_index: usize, local_sample_index: u64) -> ByteRange {
        let row = matrix.row(row_index);
        let num_bytes = row[0];
        let start_byte = row[1];
        let run_first = matrix.run_first_index(row_index);
        let offset = (local_sample_index - run_first) * num_bytes;
        ByteRange {
            start: start_byte + offset,
            end: start_byte + offset + num_bytes,
        }
    }

    fn validate_incoming_item(&self, _item: &BytePositionsItem, num_samples: u64) -> Result<()> {
        if num_samples == 0 {
            return Err(invalid_argument(format!(
                "num_samples should be > 0, got {num_samples}"
            )));
        }
        Ok(())
    }

    fn fixup_from(&self, matrix: &mut EncodedMatrix, from_row_index: usize) {
        let mut start_byte = if from_row_index == 0 {
            0
        } else {
            let prev = matrix.row(from_row_index - 1);
            prev[1] + matrix.num_samples_in_row(from_row_index - 1) * prev[0]
        };
        for row_index in from_row_index..matrix.num_rows() {
            let num_bytes = matrix.row(row_index)[0];
            let num_samples = matrix.num_samples_in_row(row_index);
            matrix.row_mut(row_index)[1] = start_byte;
            start_byte += num_samples * num_bytes;
        }
    }
}

pub type BytePositionsEncoder = Encoder<BytePositionsSchema>;

impl BytePositionsEncoder {
    pub fn new_byte_positions() -> Self {
        Encoder::new(BytePositionsSchema)
    }
}
