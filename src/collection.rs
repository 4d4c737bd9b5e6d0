// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collection identifiers and on-disk index layout.
//!
//! A collection is the unit of indexing: one set of uploaded documents. Its
//! identifier hashes the sorted (filename, byte length) pairs, so the same
//! upload always maps to the same on-disk index regardless of file order,
//! and a changed file set maps elsewhere.

use std::path::{Path, PathBuf};

/// File holding the dense index rows.
pub const DENSE_INDEX_FILE: &str = "index.bin";

/// File holding the id list and chunk metadata map.
pub const META_FILE: &str = "meta.json";

/// Length of a collection id in hex characters.
const COLLECTION_ID_LEN: usize = 16;

/// Derives the stable collection id from (document name, byte length) pairs.
///
/// Pairs are sorted before hashing, so upload order does not matter.
pub fn collection_id(file_infos: &[(String, u64)]) -> String {
    let mut sorted: Vec<&(String, u64)> = file_infos.iter().collect();
    sorted.sort();

    let mut hasher = blake3::Hasher::new();
    for (name, size) in sorted {
        hasher.update(name.as_bytes());
        hasher.update(size.to_string().as_bytes());
    }
    hasher.finalize().to_hex()[..COLLECTION_ID_LEN].to_string()
}

/// Directory holding one collection's persisted index.
pub fn collection_dir(base: &Path, id: &str) -> PathBuf {
    base.join(id)
}

/// Path of the dense index file for a collection.
pub fn dense_index_path(base: &Path, id: &str) -> PathBuf {
    collection_dir(base, id).join(DENSE_INDEX_FILE)
}

/// Path of the metadata file for a collection.
pub fn meta_path(base: &Path, id: &str) -> PathBuf {
    collection_dir(base, id).join(META_FILE)
}

/// True only when both index files exist. A missing file means "not yet
/// indexed" and triggers a rebuild, never a corruption error.
pub fn is_indexed(base: &Path, id: &str) -> bool {
    dense_index_path(base, id).is_file() && meta_path(base, id).is_file()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn infos(pairs: &[(&str, u64)]) -> Vec<(String, u64)> {
        pairs.iter().map(|(n, s)| (n.to_string(), *s)).collect()
    }

    #[test]
    fn test_id_is_order_independent() {
        let a = collection_id(&infos(&[("a.pdf", 100), ("b.pdf", 200)]));
        let b = collection_id(&infos(&[("b.pdf", 200), ("a.pdf", 100)]));
        assert_eq!(a, b);
    }

    #[test]
    fn test_id_length_and_stability() {
        let id = collection_id(&infos(&[("notes.pdf", 12345)]));
        assert_eq!(id.len(), 16);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(id, collection_id(&infos(&[("notes.pdf", 12345)])));
    }

    #[test]
    fn test_different_sets_differ() {
        let a = collection_id(&infos(&[("a.pdf", 100)]));
        let b = collection_id(&infos(&[("a.pdf", 101)]));
        let c = collection_id(&infos(&[("b.pdf", 100)]));
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_is_indexed_requires_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path();
        let id = "abcd1234abcd1234";

        assert!(!is_indexed(base, id));

        std::fs::create_dir_all(collection_dir(base, id)).unwrap();
        std::fs::write(dense_index_path(base, id), b"x").unwrap();
        assert!(!is_indexed(base, id));

        std::fs::write(meta_path(base, id), b"{}").unwrap();
        assert!(is_indexed(base, id));
    }
}
