// SPDX-License-Identifier: MIT OR Apache-2.0

//! Exact inner-product vector index.
//!
//! A brute-force scan over row vectors. The corpus here is a single document
//! set, not web-scale, so exact top-k is both affordable and required for
//! reproducible rankings. Vectors are expected to be L2-normalized by the
//! embedding adapter, making inner product equal to cosine similarity.
//!
//! Rows persist to a small binary format: a magic/version header followed by
//! little-endian f32 rows.

use std::fs;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use crate::errors::StoreError;

const MAGIC: &[u8; 4] = b"DRNK";
const FORMAT_VERSION: u32 = 1;

/// In-memory dense vector index with exact search.
#[derive(Debug, Clone, Default)]
pub struct DenseIndex {
    dim: usize,
    rows: Vec<Vec<f32>>,
}

impl DenseIndex {
    /// Creates an empty index for vectors of the given dimension.
    pub fn new(dim: usize) -> Self {
        Self { dim, rows: Vec::new() }
    }

    /// Vector dimensionality.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when the index holds no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Appends a row. Rows keep call order; row index is the insertion
    /// position. Vectors shorter or longer than `dim` are resized with
    /// zero padding so a misbehaving provider cannot skew the layout.
    pub fn push(&mut self, mut vector: Vec<f32>) {
        if vector.len() != self.dim {
            vector.resize(self.dim, 0.0);
        }
        self.rows.push(vector);
    }

    /// Returns up to `k` rows with the highest inner-product score against
    /// the query, descending by score, ties broken by ascending row index.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<(usize, f32)> {
        if self.rows.is_empty() || k == 0 {
            return Vec::new();
        }

        let mut scored: Vec<(usize, f32)> = self
            .rows
            .iter()
            .enumerate()
            .map(|(i, row)| (i, dot(query, row)))
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        scored.truncate(k);
        scored
    }

    /// Serializes the index to `path`, via a temp sibling and rename so a
    /// failed write cannot leave a half-written loadable file.
    pub fn write_to(&self, path: &Path) -> Result<(), StoreError> {
        let tmp = path.with_extension("bin.tmp");
        {
            let file = fs::File::create(&tmp).map_err(|e| StoreError::io(&tmp, e))?;
            let mut w = BufWriter::new(file);
            let io_err = |e| StoreError::io(&tmp, e);

            w.write_all(MAGIC).map_err(io_err)?;
            w.write_all(&FORMAT_VERSION.to_le_bytes()).map_err(io_err)?;
            w.write_all(&(self.dim as u32).to_le_bytes()).map_err(io_err)?;
            w.write_all(&(self.rows.len() as u32).to_le_bytes()).map_err(io_err)?;
            for row in &self.rows {
                for value in row {
                    w.write_all(&value.to_le_bytes()).map_err(io_err)?;
                }
            }
            w.flush().map_err(io_err)?;
        }
        fs::rename(&tmp, path).map_err(|e| StoreError::io(path, e))
    }

    /// Reads an index previously written with [`DenseIndex::write_to`].
    ///
    /// A missing file is a load error here; callers decide "not yet indexed"
    /// up front via [`crate::collection::is_indexed`].
    pub fn read_from(path: &Path) -> Result<Self, StoreError> {
        let mut file = fs::File::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StoreError::load(path, "missing index file")
            } else {
                StoreError::io(path, e)
            }
        })?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes).map_err(|e| StoreError::io(path, e))?;

        if bytes.len() < 16 {
            return Err(StoreError::load(path, "file too short for header"));
        }
        if &bytes[0..4] != MAGIC {
            return Err(StoreError::load(path, "bad magic bytes"));
        }
        let version = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        if version != FORMAT_VERSION {
            return Err(StoreError::load(path, format!("unsupported format version {}", version)));
        }
        let dim = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as usize;
        let count = u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]) as usize;

        let body = &bytes[16..];
        let expected = dim
            .checked_mul(count)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| StoreError::load(path, "header dimensions overflow"))?;
        if body.len() != expected {
            return Err(StoreError::load(
                path,
                format!("expected {} vector bytes, found {}", expected, body.len()),
            ));
        }

        let mut rows = Vec::with_capacity(count);
        for row_bytes in body.chunks_exact(dim * 4) {
            let row: Vec<f32> = row_bytes
                .chunks_exact(4)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect();
            rows.push(row);
        }

        Ok(Self { dim, rows })
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_empty_index_search() {
        let index = DenseIndex::new(3);
        assert!(index.search(&[1.0, 0.0, 0.0], 5).is_empty());
    }

    #[test]
    fn test_search_orders_by_inner_product() {
        let mut index = DenseIndex::new(3);
        index.push(vec![0.0, 1.0, 0.0]);
        index.push(vec![1.0, 0.0, 0.0]);
        index.push(vec![0.7, 0.7, 0.0]);

        let results = index.search(&[1.0, 0.0, 0.0], 3);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].0, 1);
        assert!((results[0].1 - 1.0).abs() < 1e-6);
        assert_eq!(results[1].0, 2);
        assert_eq!(results[2].0, 0);
    }

    #[test]
    fn test_ties_break_by_row_index() {
        let mut index = DenseIndex::new(2);
        index.push(vec![1.0, 0.0]);
        index.push(vec![1.0, 0.0]);
        index.push(vec![1.0, 0.0]);

        let results = index.search(&[1.0, 0.0], 3);
        let rows: Vec<usize> = results.iter().map(|r| r.0).collect();
        assert_eq!(rows, vec![0, 1, 2]);
    }

    #[test]
    fn test_k_truncation() {
        let mut index = DenseIndex::new(1);
        for i in 0..10 {
            index.push(vec![i as f32]);
        }
        let results = index.search(&[1.0], 3);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].0, 9);
    }

    #[test]
    fn test_wrong_length_rows_padded() {
        let mut index = DenseIndex::new(3);
        index.push(vec![1.0]);
        index.push(vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(index.len(), 2);
        let results = index.search(&[0.0, 0.0, 1.0], 2);
        assert!((results[0].1 - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_write_read_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("index.bin");

        let mut index = DenseIndex::new(4);
        index.push(vec![0.1, 0.2, 0.3, 0.4]);
        index.push(vec![-1.0, 0.0, 1.0, 0.5]);
        index.write_to(&path).unwrap();

        let loaded = DenseIndex::read_from(&path).unwrap();
        assert_eq!(loaded.dim(), 4);
        assert_eq!(loaded.len(), 2);

        let before = index.search(&[1.0, 1.0, 1.0, 1.0], 2);
        let after = loaded.search(&[1.0, 1.0, 1.0, 1.0], 2);
        assert_eq!(before.len(), after.len());
        for (b, a) in before.iter().zip(after.iter()) {
            assert_eq!(b.0, a.0);
            assert!((b.1 - a.1).abs() < 1e-6);
        }
    }

    #[test]
    fn test_read_missing_file() {
        let dir = tempdir().unwrap();
        let err = DenseIndex::read_from(&dir.path().join("absent.bin")).unwrap_err();
        assert!(matches!(err, StoreError::Load { .. }));
    }

    #[test]
    fn test_read_truncated_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("index.bin");

        let mut index = DenseIndex::new(4);
        index.push(vec![0.1, 0.2, 0.3, 0.4]);
        index.write_to(&path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..bytes.len() - 3]).unwrap();

        let err = DenseIndex::read_from(&path).unwrap_err();
        assert!(matches!(err, StoreError::Load { .. }));
    }

    #[test]
    fn test_read_bad_magic() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("index.bin");
        std::fs::write(&path, b"NOPE\x01\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00").unwrap();

        let err = DenseIndex::read_from(&path).unwrap_err();
        assert!(matches!(err, StoreError::Load { .. }));
    }
}
