// Compact binary round-trip for each encoder. A self-describing archive:
// a version tag followed by a MessagePack payload, built on `serde` +
// `rmp-serde`. `rmp_serde` alone won't enforce "reject a future version"
// or "connectivity length must match ids length", so those are checked
// explicitly after decode.

use crate::byte_positions::{BytePositionsEncoder, BytePositionsSchema};
use crate::chunk_id::ChunkIdEncoder;
use crate::error::{corrupted, Result};
use crate::matrix::EncodedMatrix;
use crate::shape::ShapeEncoder;
use crate::skeleton::Encoder;
use serde::{Deserialize, Serialize};

pub const ARCHIVE_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct MatrixArchive {
    version: u32,
    matrix: EncodedMatrix,
}

#[derive(Debug, Serialize, Deserialize)]
struct ShapeArchive {
    version: u32,
    arity: usize,
    matrix: EncodedMatrix,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChunkIdArchive {
    version: u32,
    ids: EncodedMatrix,
    connectivity: Vec<bool>,
}

fn check_version(version: u32) -> Result<()> {
    if version > ARCHIVE_VERSION {
        return Err(corrupted(format!(
            "archive version {version} exceeds this implementation's version {ARCHIVE_VERSION}"
        )));
    }
    Ok(())
}

fn encode<T: Serialize>(payload: &T) -> Result<Vec<u8>> {
    rmp_serde::to_vec(payload).map_err(|e| corrupted(format!("failed to encode archive: {e}")))
}

fn decode<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> Result<T> {
    rmp_serde::from_slice(bytes).map_err(|e| corrupted(format!("failed to decode archive: {e}")))
}

pub fn encode_byte_positions(encoder: &BytePositionsEncoder) -> Result<Vec<u8>> {
    encode(&MatrixArchive {
        version: ARCHIVE_VERSION,
        matrix: encoder.array().clone(),
    })
}

pub fn decode_byte_positions(bytes: &[u8]) -> Result<BytePositionsEncoder> {
    let archive: MatrixArchive = decode(bytes)?;
    check_version(archive.version)?;
    if archive.matrix.cols() != 2 {
        return Err(corrupted(format!(
            "byte positions archive should have 2 columns, got {}",
            archive.matrix.cols()
        )));
    }
    Ok(Encoder::from_parts(BytePositionsSchema, archive.matrix))
}

pub fn encode_shape(encoder: &ShapeEncoder) -> Result<Vec<u8>> {
    let (arity, matrix) = match (encoder.arity(), encoder.array()) {
        (Some(arity), Some(matrix)) => (arity, matrix.clone()),
        _ => (0, EncodedMatrix::new(2)),
    };
    encode(&ShapeArchive {
        version: ARCHIVE_VERSION,
        arity,
        matrix,
    })
}

pub fn decode_shape(bytes: &[u8]) -> Result<ShapeEncoder> {
    let archive: ShapeArchive = decode(bytes)?;
    check_version(archive.version)?;
    if archive.matrix.is_empty() {
        return Ok(ShapeEncoder::new());
    }
    if archive.matrix.cols() != archive.arity + 1 {
        return Err(corrupted(format!(
            "shape archive column count {} inconsistent with arity {}",
            archive.matrix.cols(),
            archive.arity
        )));
    }
    Ok(ShapeEncoder::from_parts(archive.arity, archive.matrix))
}

pub fn encode_chunk_id(encoder: &ChunkIdEncoder) -> Result<Vec<u8>> {
    encode(&ChunkIdArchive {
        version: ARCHIVE_VERSION,
        ids: encoder.array().clone(),
        connectivity: encoder.connectivity().to_vec(),
    })
}

pub fn decode_chunk_id(bytes: &[u8]) -> Result<ChunkIdEncoder> {
    let archive: ChunkIdArchive = decode(bytes)?;
    check_version(archive.version)?;
    if archive.connectivity.len() != archive.ids.num_rows() {
        return Err(corrupted(format!(
            "connectivity length {} does not match chunk count {}",
            archive.connectivity.len(),
            archive.ids.num_rows()
        )));
    }
    Ok(ChunkIdEncoder::from_parts(archive.ids, archive.connectivity))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn test_byte_positions_round_trip() {
        let mut enc = BytePositionsEncoder::new_byte_positions();
        enc.register_samples(&crate::byte_positions::BytePositionsItem { num_bytes_per_sample: 4 }, 3)
            .unwrap();
        let bytes = encode_byte_positions(&enc).unwrap();
        let back = decode_byte_positions(&bytes).unwrap();
        assert_eq!(enc.array(), back.array());
    }

    #[test]
    fn test_shape_round_trip_including_empty() {
        let empty = ShapeEncoder::new();
        let bytes = encode_shape(&empty).unwrap();
        let back = decode_shape(&bytes).unwrap();
        assert_eq!(back.num_samples(), 0);

        let mut enc = ShapeEncoder::new();
        enc.register_samples(&[10, 10, 3], 5).unwrap();
        let bytes = encode_shape(&enc).unwrap();
        let back = decode_shape(&bytes).unwrap();
        assert_eq!(enc.array(), back.array());
        assert_eq!(back.get(0).unwrap(), vec![10, 10, 3]);
    }

    #[test]
    fn test_chunk_id_round_trip() {
        let mut enc = ChunkIdEncoder::new();
        let a = enc.generate_chunk_id();
        enc.register_samples_to_last_chunk_id(3).unwrap();
        let bytes = encode_chunk_id(&enc).unwrap();
        let back = decode_chunk_id(&bytes).unwrap();
        assert_eq!(back.array(), enc.array());
        assert_eq!(back.connectivity(), enc.connectivity());
        assert_eq!(back.get(0).unwrap(), vec![a]);
    }

    #[test]
    fn test_future_version_is_rejected() {
        let enc = ChunkIdEncoder::new();
        let archive = ChunkIdArchive {
            version: ARCHIVE_VERSION + 1,
            ids: enc.array().clone(),
            connectivity: enc.connectivity().to_vec(),
        };
        let bytes = rmp_serde::to_vec(&archive).unwrap();
        let err = decode_chunk_id(&bytes).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::CorruptedSerialization);
    }

    #[test]
    fn test_connectivity_length_mismatch_is_corrupted() {
        let archive = ChunkIdArchive {
            version: ARCHIVE_VERSION,
            ids: {
                let mut m = EncodedMatrix::new(2);
                m.push_row(&[1, 0]);
                m
            },
            connectivity: vec![],
        };
        let bytes = rmp_serde::to_vec(&archive).unwrap();
        let err = decode_chunk_id(&bytes).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::CorruptedSerialization);
    }
}
