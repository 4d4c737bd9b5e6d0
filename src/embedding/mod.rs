// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedding provider interface and the adapter that makes providers safe
//! to use for indexing: per-item failures become zero vectors and every
//! vector is L2-normalized.

pub mod adapter;
pub mod provider;

pub use adapter::EmbeddingAdapter;
pub use provider::{CommandProvider, DummyProvider, EmbeddingProvider};
