// SPDX-License-Identifier: MIT OR Apache-2.0

//! docrank - Local hybrid passage retrieval library
//!
//! Splits documents into bounded overlapping chunks, indexes them both
//! densely (embedding inner product) and lexically (BM25), and answers
//! queries by fusing the two rankings.

pub mod chunker;
pub mod collection;
pub mod config;
pub mod dense;
pub mod embedding;
pub mod errors;
pub mod lexical;
pub mod store;

pub use chunker::{Chunk, ChunkConfig, Chunker};
pub use errors::StoreError;
pub use store::{FusionWeights, HybridStore};
