// Sample-index metadata layer for a chunked tensor/dataset store: three
// run-length-compressed, append-optimized, random-access encoders sharing
// one algorithmic skeleton (see `skeleton`).
//
// - byte_positions: sample index -> byte range inside its chunk.
// - shape: sample index -> fixed-arity tuple of dimension sizes.
// - chunk_id: sample index -> chunk id(s), with straddle connectivity.

pub mod byte_positions;
pub mod chunk_id;
pub mod error;
pub mod matrix;
pub mod serialize;
pub mod shape;
pub mod skeleton;
pub mod storage;


pub use byte_positions::{ByteRange, BytePositionsEncoder, BytePositionsItem, BytePositionsSchema};
pub use chunk_id::{id_from_name, name_from_id, ChunkIdEncoder};
pub use error::{Error, ErrorKind, Result};
pub use matrix::EncodedMatrix;
pub use shape::{ShapeEncoder, ShapeSchema};
pub use skeleton::{Encoder, EncoderSchema};
pub use storage::{MemoryStorageProvider, StorageProvider};
