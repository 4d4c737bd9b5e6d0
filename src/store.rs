// SPDX-License-Identifier: MIT OR Apache-2.0

//! Hybrid store: the retrieval engine for one collection.
//!
//! Owns the dense index, the lexical index, the ordered chunk id list and
//! the chunk metadata map. Row *i* of the dense index and row *i* of the
//! lexical index both refer to `ids[i]` at all times.
//!
//! Query fusion: dense and lexical top-k run independently, each result set
//! is min-max normalized to [0, 1] (a degenerate set with fewer than two
//! distinct values maps to all zeros), and candidates score
//! `dense_weight * dense_norm + lexical_weight * lexical_norm`.
//!
//! The store is synchronous and single-owner per collection; callers must
//! not interleave build/load with searches on the same instance.

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::chunker::Chunk;
use crate::collection::{DENSE_INDEX_FILE, META_FILE};
use crate::dense::DenseIndex;
use crate::embedding::EmbeddingAdapter;
use crate::errors::StoreError;
use crate::lexical::{tokenize, LexicalIndex};

/// Default number of candidates fetched from each sub-index.
pub const DEFAULT_TOPK_DENSE: usize = 20;

/// Default number of fused results returned.
pub const DEFAULT_FINAL_K: usize = 5;

/// A `top_dense_score` below this suggests the collection does not cover
/// the query; callers may fall back to a degraded answer.
pub const LOW_CONFIDENCE_THRESHOLD: f32 = 0.25;

/// Spread below which a score set is treated as degenerate ("no signal").
const MINMAX_EPSILON: f32 = 1e-9;

/// Fusion weights for the two sub-rankings.
///
/// Conventionally they sum to 1.0, but that is not enforced.
#[derive(Debug, Clone, Copy)]
pub struct FusionWeights {
    pub dense: f32,
    pub lexical: f32,
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self { dense: 0.6, lexical: 0.4 }
    }
}

/// Persisted record for one chunk, keyed by chunk id in the metadata map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMeta {
    pub text: String,
    pub page: u32,
    pub doc: String,
}

#[derive(Serialize)]
struct PersistedMetaRef<'a> {
    ids: &'a [String],
    meta: &'a HashMap<String, ChunkMeta>,
}

#[derive(Deserialize)]
struct PersistedMeta {
    ids: Vec<String>,
    meta: HashMap<String, ChunkMeta>,
}

/// Hybrid retrieval store for a single collection.
pub struct HybridStore {
    adapter: EmbeddingAdapter,
    weights: FusionWeights,
    dense: DenseIndex,
    lexical: LexicalIndex,
    ids: Vec<String>,
    meta: HashMap<String, ChunkMeta>,
}

impl HybridStore {
    /// Creates an empty store over the given embedding adapter.
    pub fn new(adapter: EmbeddingAdapter) -> Self {
        Self {
            adapter,
            weights: FusionWeights::default(),
            dense: DenseIndex::default(),
            lexical: LexicalIndex::default(),
            ids: Vec::new(),
            meta: HashMap::new(),
        }
    }

    /// Sets the fusion weights.
    pub fn with_weights(mut self, weights: FusionWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Number of indexed chunks.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// True when nothing has been built or loaded.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Ordered chunk ids (row order of both sub-indexes).
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Looks up the metadata record for a chunk id.
    pub fn chunk(&self, id: &str) -> Option<&ChunkMeta> {
        self.meta.get(id)
    }

    /// Builds the store from a chunk sequence.
    ///
    /// Embeds every chunk text through the adapter and constructs the dense
    /// and lexical indexes over the same row order as `chunks`. Replaces any
    /// previously built state.
    pub fn build(&mut self, chunks: &[Chunk]) -> Result<(), StoreError> {
        if chunks.is_empty() {
            return Err(StoreError::EmptyBuild);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.adapter.encode(&texts);

        let mut dense = DenseIndex::new(self.adapter.dimension());
        for vector in vectors {
            dense.push(vector);
        }

        self.ids = chunks.iter().map(|c| c.id.clone()).collect();
        self.meta = chunks
            .iter()
            .map(|c| {
                (
                    c.id.clone(),
                    ChunkMeta {
                        text: c.text.clone(),
                        page: c.page,
                        doc: c.doc.clone(),
                    },
                )
            })
            .collect();
        self.lexical = LexicalIndex::build(&texts);
        self.dense = dense;

        debug!(chunks = self.ids.len(), dim = self.dense.dim(), "built hybrid store");
        Ok(())
    }

    /// Serializes the dense index and metadata to `dir`.
    ///
    /// Writes `index.bin` and `meta.json`, each via a temp sibling and
    /// rename, so a failed write never leaves a silently-loadable
    /// half-index. The lexical index is not persisted; it is rebuilt
    /// deterministically on load.
    pub fn persist(&self, dir: &Path) -> Result<(), StoreError> {
        if self.ids.is_empty() {
            return Err(StoreError::EmptyBuild);
        }

        fs::create_dir_all(dir).map_err(|e| StoreError::io(dir, e))?;
        self.dense.write_to(&dir.join(DENSE_INDEX_FILE))?;

        let meta_file = dir.join(META_FILE);
        let payload = serde_json::to_string(&PersistedMetaRef {
            ids: &self.ids,
            meta: &self.meta,
        })
        .map_err(|e| StoreError::io(&meta_file, e.into()))?;

        let tmp = meta_file.with_extension("json.tmp");
        fs::write(&tmp, payload).map_err(|e| StoreError::io(&tmp, e))?;
        fs::rename(&tmp, &meta_file).map_err(|e| StoreError::io(&meta_file, e))?;
        Ok(())
    }

    /// Loads a store persisted with [`HybridStore::persist`].
    ///
    /// Validates the row invariant and rebuilds the lexical index from the
    /// loaded chunk texts in `ids` order. Any mismatch is a
    /// [`StoreError::Load`]; callers should treat that as "rebuild from
    /// scratch".
    pub fn load(&mut self, dir: &Path) -> Result<(), StoreError> {
        let dense = DenseIndex::read_from(&dir.join(DENSE_INDEX_FILE))?;

        let meta_file = dir.join(META_FILE);
        let raw = fs::read_to_string(&meta_file).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StoreError::load(&meta_file, "missing metadata file")
            } else {
                StoreError::io(&meta_file, e)
            }
        })?;
        let parsed: PersistedMeta = serde_json::from_str(&raw)
            .map_err(|e| StoreError::load(&meta_file, format!("malformed JSON: {}", e)))?;

        if parsed.ids.len() != dense.len() {
            return Err(StoreError::load(
                &meta_file,
                format!("{} ids but {} dense rows", parsed.ids.len(), dense.len()),
            ));
        }
        if parsed.ids.len() != parsed.meta.len() {
            return Err(StoreError::load(
                &meta_file,
                format!("{} ids but {} metadata records", parsed.ids.len(), parsed.meta.len()),
            ));
        }

        let mut texts = Vec::with_capacity(parsed.ids.len());
        for id in &parsed.ids {
            let record = parsed.meta.get(id).ok_or_else(|| {
                StoreError::load(&meta_file, format!("id {} has no metadata record", id))
            })?;
            texts.push(record.text.as_str());
        }

        self.lexical = LexicalIndex::build(&texts);
        self.dense = dense;
        self.ids = parsed.ids;
        self.meta = parsed.meta;

        debug!(chunks = self.ids.len(), "loaded hybrid store");
        Ok(())
    }

    /// Hybrid retrieval: fuses dense and lexical rankings.
    ///
    /// Each sub-index contributes up to `topk_dense` candidates; the fused
    /// top `final_k` come back as `(chunk_id, fused_score)`, descending.
    /// An empty or never-built store returns an empty list; an empty query
    /// degrades to a zero query vector and an empty token set.
    pub fn search_hybrid(
        &mut self,
        query: &str,
        topk_dense: usize,
        final_k: usize,
    ) -> Vec<(String, f32)> {
        if self.ids.is_empty() {
            return Vec::new();
        }

        let query_vector = self.adapter.encode_one(query);
        let dense_hits = self.dense.search(&query_vector, topk_dense);
        let lexical_hits = self.lexical.search(&tokenize(query), topk_dense);

        fuse(&dense_hits, &lexical_hits, self.weights, final_k)
            .into_iter()
            // Defensive bound: a sub-index row outside the id list is
            // dropped rather than faulting.
            .filter(|(row, _)| *row < self.ids.len())
            .map(|(row, score)| (self.ids[row].clone(), score))
            .collect()
    }

    /// Highest dense similarity for the query across the whole index.
    ///
    /// Returns 0.0 for an empty store. Callers use this as a confidence
    /// signal (see [`LOW_CONFIDENCE_THRESHOLD`]).
    pub fn top_dense_score(&mut self, query: &str) -> f32 {
        if self.ids.is_empty() {
            return 0.0;
        }
        let query_vector = self.adapter.encode_one(query);
        self.dense
            .search(&query_vector, 1)
            .first()
            .map(|(_, score)| *score)
            .unwrap_or(0.0)
    }
}

/// Min-max normalizes a result set to [0, 1].
///
/// A set with fewer than two distinct values carries no ranking signal and
/// maps to 0.0 for every member; this also rules out division by zero.
fn minmax(results: &[(usize, f32)]) -> HashMap<usize, f32> {
    if results.is_empty() {
        return HashMap::new();
    }
    let mut min = f32::INFINITY;
    let mut max = f32::NEG_INFINITY;
    for &(_, score) in results {
        min = min.min(score);
        max = max.max(score);
    }
    let spread = max - min;
    results
        .iter()
        .map(|&(row, score)| {
            let norm = if spread < MINMAX_EPSILON {
                0.0
            } else {
                (score - min) / spread
            };
            (row, norm)
        })
        .collect()
}

/// Fuses two independently normalized result sets into one ranking.
///
/// Candidates are the union of rows from either side; a row missing from one
/// side contributes 0.0 there. Descending by fused score, ties broken by
/// ascending row index (the corpus-encounter order).
fn fuse(
    dense: &[(usize, f32)],
    lexical: &[(usize, f32)],
    weights: FusionWeights,
    final_k: usize,
) -> Vec<(usize, f32)> {
    let dense_norm = minmax(dense);
    let lexical_norm = minmax(lexical);

    let candidates: BTreeSet<usize> = dense_norm.keys().chain(lexical_norm.keys()).copied().collect();

    let mut fused: Vec<(usize, f32)> = candidates
        .into_iter()
        .map(|row| {
            let score = weights.dense * dense_norm.get(&row).copied().unwrap_or(0.0)
                + weights.lexical * lexical_norm.get(&row).copied().unwrap_or(0.0);
            (row, score)
        })
        .collect();

    fused.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    fused.truncate(final_k);
    fused
}
