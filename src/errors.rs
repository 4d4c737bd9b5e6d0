// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error taxonomy for the retrieval engine.
//!
//! Per-item embedding failures never surface here; the embedding adapter
//! absorbs them into zero vectors. Everything the store can fail with is a
//! distinguishable kind so callers can choose between rebuild, retry and a
//! user-visible message.

use std::path::PathBuf;
use thiserror::Error;

/// Failures surfaced by [`crate::store::HybridStore`] operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// `build` was called with an empty chunk set. The caller should report
    /// "no extractable text" upstream instead of retrying.
    #[error("no chunks to index")]
    EmptyBuild,

    /// A persistence write or read failed at the I/O level. If the store was
    /// already built it remains usable in memory.
    #[error("index I/O failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A persisted index is missing, truncated or inconsistent. Callers
    /// should treat this as "rebuild from scratch".
    #[error("cannot load index from {path}: {reason}")]
    Load { path: PathBuf, reason: String },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn load(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        StoreError::Load {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
