// Maps a sample index to the fixed-arity tuple of dimension sizes its
// tensor was stored with. Columns: [d0, d1, ..., d_{k-1}, last_seen_index].

use crate::error::{invalid_argument, Result};
use crate::matrix::EncodedMatrix;
use crate::skeleton::{Encoder, EncoderSchema};

pub struct ShapeSchema {
    arity: usize,
}

impl ShapeSchema {
    // Fixed on construction, checked on every append/overwrite; normally
    // learned from the first register_samples call (see ShapeEncoder::new).
    pub fn new(arity: usize) -> Self {
        ShapeSchema { arity }
    }

    pub fn arity(&self) -> usize {
        self.arity
    }
}

impl EncoderSchema for ShapeSchema {
    type Item = Vec<u64>;
    type Value = Vec<u64>;

    fn num_leading_columns(&self) -> usize {
        self.arity
    }

    fn combine_condition(&self, item: &Vec<u64>, matrix: &EncodedMatrix, row_index: usize) -> bool {
        let row = matrix.row(row_index);
        &row[..self.arity] == item.as_slice()
    }

    fn make_decomposable(&self, item: &Vec<u64>) -> Vec<u64> {
        item.clone()
    }

    fn derive_value(&self, matrix: &EncodedMatrix, row_index: usize, _local_sample_index: u64) -> Vec<u64> {
        matrix.row(row_index)[..self.arity].to_vec()
    }

    fn validate_incoming_item(&self, item: &Vec<u64>, num_samples: u64) -> Result<()> {
        if num_samples == 0 {
            return Err(invalid_argument(format!(
                "num_samples should be > 0, got {num_samples}"
            )));
        }
        if item.len() != self.arity {
            return Err(invalid_argument(format!(
                "shape arity mismatch: encoder fixed at {}, got {}",
                self.arity,
                item.len()
            )));
        }
        Ok(())
    }
}

// Wraps Encoder<ShapeSchema> with arity learned from the first append
// rather than fixed at construction: a writer never knows a dataset's
// tensor rank in advance.
pub struct ShapeEncoder {
    inner: Option<Encoder<ShapeSchema>>,
}

impl ShapeEncoder {
    pub fn new() -> Self {
        ShapeEncoder { inner: None }
    }

    pub(crate) fn from_parts(arity: usize, matrix: EncodedMatrix) -> Self {
        ShapeEncoder {
            inner: Some(Encoder::from_parts(ShapeSchema::new(arity), matrix)),
        }
    }

    pub fn num_samples(&self) -> u64 {
        self.inner.as_ref().map_or(0, |e| e.num_samples())
    }

    pub fn nbytes(&self) -> usize {
        self.inner.as_ref().map_or(0, |e| e.nbytes())
    }

    pub fn arity(&self) -> Option<usize> {
        self.inner.as_ref().map(|e| e.schema().arity())
    }

    pub fn array(&self) -> Option<&EncodedMatrix> {
        self.inner.as_ref().map(|e| e.array())
    }

    pub fn get(&self, index: i64) -> Result<Vec<u64>> {
        match &self.inner {
            Some(e) => e.get(index),
            None => Err(crate::error::out_of_bounds(format!(
                "index {index} is out of bounds for an empty encoder"
            ))),
        }
    }

    pub fn register_samples(&mut self, shape: &[u64], num_samples: u64) -> Result<()> {
        if self.inner.is_none() {
            self.inner = Some(Encoder::new(ShapeSchema::new(shape.len())));
        }
        self.inner
            .as_mut()
            .expect("just initialized above")
            .register_samples(&shape.to_vec(), num_samples)
    }

    pub fn set(&mut self, index: i64, shape: &[u64]) -> Result<()> {
        match &mut self.inner {
            Some(e) => e.set(index, &shape.to_vec()),
            None => Err(crate::error::out_of_bounds(format!(
                "index {index} is out of bounds for an empty encoder"
            ))),
        }
    }
}

impl Default for ShapeEncoder {
    fn default() -> Self {
        Self::new()
    }
}
