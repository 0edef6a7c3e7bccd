// One algorithmic skeleton shared by all three encoders: binary-search
// lookup, tail-combine-or-append, and an eight-action overwrite dispatch.
// `EncoderSchema` is a closed, compile-time-known set of hooks rather than
// an open-ended trait-object hierarchy. `Encoder<S>` supplies the
// mechanism once; byte_positions/shape/chunk_id supply the policy.

use crate::error::{invalid_argument, Result};
use crate::matrix::{resolve_index, EncodedMatrix};
use tracing::trace;

// `Item` is whatever the caller passes to `register_samples`/`set`;
// `Value` is what `get` hands back.
pub trait EncoderSchema {
    type Item;
    type Value;

    // Columns in a row besides `last_seen_index`.
    fn num_leading_columns(&self) -> usize;

    // Can `item` be folded into the run already occupying `row_index`?
    fn combine_condition(&self, item: &Self::Item, matrix: &EncodedMatrix, row_index: usize) -> bool;

    // Leading columns for a fresh row built from `item`.
    fn make_decomposable(&self, item: &Self::Item) -> Vec<u64>;

    fn derive_value(&self, matrix: &EncodedMatrix, row_index: usize, local_sample_index: u64) -> Self::Value;

    // chunk_id overrides this; the two skeleton-based encoders never do.
    fn derive_next_last_index(&self, last: u64, num_samples: u64) -> u64 {
        last + num_samples
    }

    // Called after a mutation inserts, replaces, or shrinks a row whose
    // leading columns depend on position (byte positions' `start_byte`).
    // No-op for schemas where they don't (shape, chunk-id).
    fn fixup_from(&self, _matrix: &mut EncodedMatrix, _from_row_index: usize) {}

    // Default only checks num_samples > 0; byte positions and shape add
    // their own width/arity checks via an override.
    fn validate_incoming_item(&self, _item: &Self::Item, num_samples: u64) -> Result<()> {
        if num_samples == 0 {
            return Err(invalid_argument(format!(
                "num_samples should be > 0, got {num_samples}"
            )));
        }
        Ok(())
    }
}

pub struct Encoder<S: EncoderSchema> {
    schema: S,
    encoded: EncodedMatrix,
}

impl<S: EncoderSchema> Encoder<S> {
    pub fn new(schema: S) -> Self {
        let cols = schema.num_leading_columns() + 1;
        Encoder {
            schema,
            encoded: EncodedMatrix::new(cols),
        }
    }

    pub fn from_parts(schema: S, encoded: EncodedMatrix) -> Self {
        Encoder { schema, encoded }
    }

    pub fn schema(&self) -> &S {
        &self.schema
    }

    pub fn array(&self) -> &EncodedMatrix {
        &self.encoded
    }

    pub fn nbytes(&self) -> usize {
        self.encoded.nbytes()
    }

    pub fn num_samples(&self) -> u64 {
        if self.encoded.is_empty() {
            0
        } else {
            self.encoded.last_seen_index(self.encoded.num_rows() - 1) + 1
        }
    }

    // Accepts negative indices Python-style (`-1` is the last sample).
    pub fn get(&self, index: i64) -> Result<S::Value> {
        let (value, _) = self.get_with_row_index(index)?;
        Ok(value)
    }

    pub fn get_with_row_index(&self, index: i64) -> Result<(S::Value, usize)> {
        let num_samples = self.num_samples();
        let local = resolve_index(index, num_samples)?;
        let row_index = self
            .encoded
            .binary_search_last_seen_index(local)
            .expect("local index was bounds-checked against num_samples above");
        let value = self.schema.derive_value(&self.encoded, row_index, local);
        Ok((value, row_index))
    }

    // Extends the tail run if it combines, otherwise opens a new row.
    pub fn register_samples(&mut self, item: &S::Item, num_samples: u64) -> Result<()> {
        self.schema.validate_incoming_item(item, num_samples)?;
        trace!(target: "sample_index", num_samples, "registering samples");

        if self.encoded.is_empty() {
            let mut row = self.schema.make_decomposable(item);
            row.push(num_samples - 1);
            self.encoded.push_row(&row);
            self.schema.fixup_from(&mut self.encoded, 0);
            return Ok(());
        }

        let tail = self.encoded.num_rows() - 1;
        let last = self.encoded.last_seen_index(tail);
        let next_last = self.schema.derive_next_last_index(last, num_samples);

        if self.schema.combine_condition(item, &self.encoded, tail) {
            self.encoded.set_last_seen_index(tail, next_last);
        } else {
            let mut row = self.schema.make_decomposable(item);
            row.push(next_last);
            self.encoded.push_row(&row);
            self.schema.fixup_from(&mut self.encoded, tail + 1);
        }
        Ok(())
    }

    // Applies the cheapest legal action from the eight-action table below.
    pub fn set(&mut self, index: i64, item: &S::Item) -> Result<()> {
        let num_samples = self.num_samples();
        let local = resolve_index(index, num_samples)?;
        self.schema.validate_incoming_item(item, 1)?;
        trace!(target: "sample_index", index = local, "overwriting sample");
        let row_index = self
            .encoded
            .binary_search_last_seen_index(local)
            .expect("local index was bounds-checked against num_samples above");

        // Scratch state, computed once and used by every candidate action;
        // no hidden fields are mutated to pass it between them.
        let has_above = row_index > 0;
        let has_below = row_index + 1 < self.encoded.num_rows();
        let can_combine_above =
            has_above && self.schema.combine_condition(item, &self.encoded, row_index - 1);
        let can_combine_below =
            has_below && self.schema.combine_condition(item, &self.encoded, row_index + 1);

        let run_first = self.encoded.run_first_index(row_index);
        let last = self.encoded.last_seen_index(row_index);
        let at_run_start = local == run_first;
        let at_run_end = local == last;
        let is_singleton = run_first == last;

        // 0. no-op
        if self.schema.combine_condition(item, &self.encoded, row_index) {
            return Ok(());
        }

        // 1. squeeze: both neighbors combine, run is exactly one sample wide.
        if has_above && has_below && can_combine_above && can_combine_below && is_singleton {
            let absorbed_last = self.encoded.last_seen_index(row_index + 1);
            self.encoded.set_last_seen_index(row_index - 1, absorbed_last);
            self.encoded.remove_row(row_index + 1);
            self.encoded.remove_row(row_index);
            return Ok(());
        }

        // 2. move up: upper neighbor combines, target is at run start.
        if has_above && can_combine_above && at_run_start {
            if is_singleton {
                let absorbed_last = self.encoded.last_seen_index(row_index);
                self.encoded.set_last_seen_index(row_index - 1, absorbed_last);
                self.encoded.remove_row(row_index);
            } else {
                let cur = self.encoded.last_seen_index(row_index - 1);
                self.encoded.set_last_seen_index(row_index - 1, cur + 1);
            }
            return Ok(());
        }

        // 3. move down: lower neighbor combines, target is at run end.
        if has_below && can_combine_below && at_run_end {
            if is_singleton {
                self.encoded.remove_row(row_index);
            } else {
                let cur = self.encoded.last_seen_index(row_index);
                self.encoded.set_last_seen_index(row_index, cur - 1);
            }
            return Ok(());
        }

        // 4. replace whole row: run is exactly one sample wide and neither
        // neighbor combines (guaranteed by falling through 1-3 above).
        if is_singleton {
            let mut row = self.schema.make_decomposable(item);
            row.push(last);
            self.encoded.replace_row(row_index, &row);
            self.schema.fixup_from(&mut self.encoded, row_index);
            return Ok(());
        }

        // 5. split upward: target at run start, upper neighbor does not combine.
        if at_run_start {
            let mut new_row = self.schema.make_decomposable(item);
            new_row.push(local);
            let old_row = self.encoded_row_owned(row_index);
            self.encoded.splice_row(row_index, &[&new_row, &old_row]);
            self.schema.fixup_from(&mut self.encoded, row_index);
            return Ok(());
        }

        // 6. split downward: target at run end, lower neighbor does not combine.
        if at_run_end {
            let old_row = self.encoded_row_owned(row_index);
            let mut shrunk = old_row.clone();
            let cols = shrunk.len();
            shrunk[cols - 1] = local - 1;
            let mut new_row = self.schema.make_decomposable(item);
            new_row.push(last);
            self.encoded.splice_row(row_index, &[&shrunk, &new_row]);
            self.schema.fixup_from(&mut self.encoded, row_index);
            return Ok(());
        }

        // 7. split middle: strictly interior to its run.
        let old_row = self.encoded_row_owned(row_index);
        let cols = old_row.len();
        let mut left = old_row.clone();
        left[cols - 1] = local - 1;
        let mut mid = self.schema.make_decomposable(item);
        mid.push(local);
        let right = old_row;
        self.encoded.splice_row(row_index, &[&left, &mid, &right]);
        self.schema.fixup_from(&mut self.encoded, row_index);
        Ok(())
    }

    fn encoded_row_owned(&self, row_index: usize) -> Vec<u64> {
        self.encoded.row(row_index).to_vec()
    }
}
