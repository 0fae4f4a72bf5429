//! Exact squared-L2 index stored in the FAISS `IndexFlatL2` file layout.
//!
//! Layout (little-endian):
//!
//! ```text
//! fourcc       "IxF2" | "IxFl"
//! d            i32
//! ntotal       i64
//! (unused)     i64, i64
//! is_trained   u8
//! metric_type  i32          1 = L2
//! metric_arg   f32          only when metric_type > 1
//! n            u64          == d * ntotal
//! codes        n x f32
//! ```

use std::path::Path;

use ndarray::Array2;

use crate::detection::infrastructure::math::squared_l2;
use crate::gallery::domain::nearest_neighbor_index::{Neighbor, NearestNeighborIndex};

const FOURCC_FLAT_L2: &[u8; 4] = b"IxF2";
const FOURCC_FLAT: &[u8; 4] = b"IxFl";
const METRIC_L2: i32 = 1;

/// Sanity bound on the vector payload, matching what FAISS itself accepts.
const MAX_CODES: u64 = 1 << 40;

pub struct FlatL2Index {
    dimension: usize,
    /// One row per stored vector.
    vectors: Array2<f32>,
}

impl FlatL2Index {
    pub fn from_vectors(dimension: usize, rows: Vec<Vec<f32>>) -> Result<Self, String> {
        if dimension == 0 {
            return Err("dimension must be positive".into());
        }
        let count = rows.len();
        let mut flat = Vec::with_capacity(count * dimension);
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != dimension {
                return Err(format!(
                    "vector {i} has {} components, expected {dimension}",
                    row.len()
                ));
            }
            flat.extend(row);
        }
        let vectors = Array2::from_shape_vec((count, dimension), flat).map_err(|e| e.to_string())?;
        Ok(Self { dimension, vectors })
    }

    pub fn read(path: &Path) -> Result<Self, String> {
        let bytes = std::fs::read(path).map_err(|e| e.to_string())?;
        Self::parse(&bytes)
    }

    pub fn parse(bytes: &[u8]) -> Result<Self, String> {
        let mut r = ByteReader::new(bytes);

        let fourcc = r.take(4)?;
        let is_generic_flat = fourcc == FOURCC_FLAT;
        if fourcc != FOURCC_FLAT_L2 && !is_generic_flat {
            return Err(format!(
                "unsupported index type {:?}, expected a flat L2 index",
                String::from_utf8_lossy(fourcc)
            ));
        }

        let d = r.i32()?;
        let ntotal = r.i64()?;
        r.i64()?;
        r.i64()?;
        let _is_trained = r.u8()?;
        let metric_type = r.i32()?;
        if metric_type > 1 {
            r.f32()?;
        }
        if metric_type != METRIC_L2 {
            return Err(format!("index metric {metric_type} is not L2"));
        }
        if d <= 0 {
            return Err(format!("invalid dimension {d}"));
        }
        if ntotal < 0 {
            return Err(format!("invalid vector count {ntotal}"));
        }

        let n = r.u64()?;
        if n >= MAX_CODES {
            return Err(format!("vector payload of {n} floats is too large"));
        }
        let expected = (d as u64).checked_mul(ntotal as u64).ok_or_else(|| {
            format!("header declares {ntotal} vectors of dimension {d}, which overflows")
        })?;
        if n != expected {
            return Err(format!(
                "payload holds {n} floats but header declares {ntotal} vectors of dimension {d}"
            ));
        }
        let dimension = d as usize;
        let count = ntotal as usize;

        let payload = r.take(n as usize * 4)?;
        let flat: Vec<f32> = payload
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        if r.remaining() > 0 {
            log::debug!("Ignoring {} trailing bytes after index payload", r.remaining());
        }

        let vectors = Array2::from_shape_vec((count, dimension), flat).map_err(|e| e.to_string())?;
        Ok(Self { dimension, vectors })
    }
}

impl NearestNeighborIndex for FlatL2Index {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn len(&self) -> usize {
        self.vectors.nrows()
    }

    fn nearest(&self, query: &[f32]) -> Option<Neighbor> {
        debug_assert_eq!(query.len(), self.dimension);
        let mut best: Option<Neighbor> = None;
        for (position, row) in self.vectors.outer_iter().enumerate() {
            let distance = match row.as_slice() {
                Some(slice) => squared_l2(slice, query),
                None => row
                    .iter()
                    .zip(query)
                    .map(|(a, b)| (a - b) * (a - b))
                    .sum(),
            };
            // Strict comparison keeps the lowest position on ties.
            if best.map_or(true, |b| distance < b.distance) {
                best = Some(Neighbor { distance, position });
            }
        }
        best
    }
}

struct ByteReader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> ByteReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.offset
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], String> {
        if self.remaining() < len {
            return Err(format!(
                "file truncated at byte {} (needed {len} more)",
                self.offset
            ));
        }
        let slice = &self.bytes[self.offset..self.offset + len];
        self.offset += len;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], String> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8, String> {
        Ok(self.array::<1>()?[0])
    }

    fn i32(&mut self) -> Result<i32, String> {
        Ok(i32::from_le_bytes(self.array()?))
    }

    fn i64(&mut self) -> Result<i64, String> {
        Ok(i64::from_le_bytes(self.array()?))
    }

    fn u64(&mut self) -> Result<u64, String> {
        Ok(u64::from_le_bytes(self.array()?))
    }

    fn f32(&mut self) -> Result<f32, String> {
        Ok(f32::from_le_bytes(self.array()?))
    }
}

/// Serializes vectors in the flat L2 layout. Test fixture helper.
#[cfg(test)]
pub(crate) fn encode_flat_l2(dimension: usize, rows: &[Vec<f32>]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(FOURCC_FLAT_L2);
    out.extend_from_slice(&(dimension as i32).to_le_bytes());
    out.extend_from_slice(&(rows.len() as i64).to_le_bytes());
    out.extend_from_slice(&(1i64 << 20).to_le_bytes());
    out.extend_from_slice(&(1i64 << 20).to_le_bytes());
    out.push(1);
    out.extend_from_slice(&METRIC_L2.to_le_bytes());
    out.extend_from_slice(&((dimension * rows.len()) as u64).to_le_bytes());
    for value in rows.iter().flatten() {
        out.extend_from_slice(&value.to_le_bytes());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn sample() -> Vec<Vec<f32>> {
        vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0], vec![0.0, 0.0, 1.0]]
    }

    #[test]
    fn test_parse_reads_vectors() {
        let index = FlatL2Index::parse(&encode_flat_l2(3, &sample())).unwrap();
        assert_eq!(index.dimension(), 3);
        assert_eq!(index.len(), 3);
        let hit = index.nearest(&[0.1, 0.9, 0.0]).unwrap();
        assert_eq!(hit.position, 1);
        assert_relative_eq!(hit.distance, 0.02, epsilon = 1e-6);
    }

    #[test]
    fn test_parse_generic_flat_with_l2_metric() {
        let mut bytes = encode_flat_l2(3, &sample());
        bytes[..4].copy_from_slice(FOURCC_FLAT);
        assert!(FlatL2Index::parse(&bytes).is_ok());
    }

    #[test]
    fn test_parse_empty_index() {
        let index = FlatL2Index::parse(&encode_flat_l2(512, &[])).unwrap();
        assert!(index.is_empty());
        assert_eq!(index.nearest(&[0.0; 512]), None);
    }

    #[test]
    fn test_parse_rejects_inner_product_index() {
        let mut bytes = encode_flat_l2(3, &sample());
        bytes[..4].copy_from_slice(b"IxFI");
        let err = FlatL2Index::parse(&bytes).err().unwrap();
        assert!(err.contains("unsupported index type"));
    }

    #[test]
    fn test_parse_rejects_non_l2_metric() {
        let mut bytes = encode_flat_l2(3, &sample());
        // metric_type sits after fourcc, d, ntotal, two dummies and is_trained
        let metric_offset = 4 + 4 + 8 + 8 + 8 + 1;
        bytes[metric_offset..metric_offset + 4].copy_from_slice(&0i32.to_le_bytes());
        let err = FlatL2Index::parse(&bytes).err().unwrap();
        assert!(err.contains("not L2"));
    }

    #[rstest]
    #[case::header_only(20)]
    #[case::missing_payload(45)]
    #[case::half_vector(45 + 8 + 6)]
    fn test_parse_rejects_truncated_file(#[case] keep: usize) {
        let bytes = encode_flat_l2(3, &sample());
        let err = FlatL2Index::parse(&bytes[..keep]).err().unwrap();
        assert!(err.contains("truncated"), "{err}");
    }

    #[test]
    fn test_parse_rejects_count_mismatch() {
        let mut bytes = encode_flat_l2(3, &sample());
        // claim 4 vectors while the payload holds 3
        bytes[8..16].copy_from_slice(&4i64.to_le_bytes());
        let err = FlatL2Index::parse(&bytes).err().unwrap();
        assert!(err.contains("header declares 4 vectors"));
    }

    #[test]
    fn test_parse_rejects_overflowing_vector_count() {
        let mut bytes = encode_flat_l2(4, &[]);
        bytes[8..16].copy_from_slice(&(1i64 << 62).to_le_bytes());
        let err = FlatL2Index::parse(&bytes).err().unwrap();
        assert!(err.contains("overflows"), "{err}");
    }

    #[test]
    fn test_nearest_prefers_lowest_position_on_tie() {
        let index = FlatL2Index::from_vectors(2, vec![vec![1.0, 0.0], vec![1.0, 0.0]]).unwrap();
        assert_eq!(index.nearest(&[1.0, 0.0]).unwrap().position, 0);
    }

    #[test]
    fn test_from_vectors_rejects_ragged_rows() {
        assert!(FlatL2Index::from_vectors(2, vec![vec![1.0, 0.0], vec![1.0]]).is_err());
    }
}
