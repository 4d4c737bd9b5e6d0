// SPDX-License-Identifier: MIT OR Apache-2.0

//! BM25 lexical index over chunk text.
//!
//! Tokenization is exactly lowercase + whitespace split, with no stemming or
//! stop words; the same function runs at build and query time so scores are
//! reproducible. The index is cheap to rebuild and is never persisted.

use std::collections::HashMap;

const K1: f32 = 1.5;
const B: f32 = 0.75;

/// Lowercases and whitespace-splits text into query/corpus tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_lowercase).collect()
}

/// Inverted index with BM25 ranking, built once over the full corpus.
///
/// Row indices follow the order the texts were given in, matching the dense
/// index row order.
#[derive(Debug, Clone, Default)]
pub struct LexicalIndex {
    /// term -> (row, term frequency) postings.
    postings: HashMap<String, Vec<(usize, u32)>>,
    doc_lens: Vec<u32>,
    avg_len: f32,
}

impl LexicalIndex {
    /// Builds the index from the ordered corpus of chunk texts.
    pub fn build<S: AsRef<str>>(texts: &[S]) -> Self {
        let mut postings: HashMap<String, Vec<(usize, u32)>> = HashMap::new();
        let mut doc_lens = Vec::with_capacity(texts.len());

        for (row, text) in texts.iter().enumerate() {
            let tokens = tokenize(text.as_ref());
            doc_lens.push(tokens.len() as u32);

            let mut freqs: HashMap<String, u32> = HashMap::new();
            for token in tokens {
                *freqs.entry(token).or_insert(0) += 1;
            }
            for (term, freq) in freqs {
                postings.entry(term).or_default().push((row, freq));
            }
        }

        let avg_len = if doc_lens.is_empty() {
            0.0
        } else {
            doc_lens.iter().sum::<u32>() as f32 / doc_lens.len() as f32
        };

        Self { postings, doc_lens, avg_len }
    }

    /// Number of indexed rows.
    pub fn len(&self) -> usize {
        self.doc_lens.len()
    }

    /// True when nothing is indexed.
    pub fn is_empty(&self) -> bool {
        self.doc_lens.is_empty()
    }

    /// Ranks rows by BM25 relevance to the query tokens.
    ///
    /// Returns up to `k` `(row, score)` pairs, descending by score, ties
    /// broken by ascending row index. An empty query yields no results.
    pub fn search(&self, query_tokens: &[String], k: usize) -> Vec<(usize, f32)> {
        if query_tokens.is_empty() || self.doc_lens.is_empty() || k == 0 {
            return Vec::new();
        }

        let n = self.doc_lens.len() as f32;
        let mut scores: HashMap<usize, f32> = HashMap::new();

        for term in query_tokens {
            let Some(postings) = self.postings.get(term) else {
                continue;
            };
            let df = postings.len() as f32;
            let idf = (1.0 + (n - df + 0.5) / (df + 0.5)).ln();

            for &(row, tf) in postings {
                let doc_len = self.doc_lens[row] as f32;
                let tf = tf as f32;
                let denom = tf + K1 * (1.0 - B + B * doc_len / self.avg_len.max(f32::EPSILON));
                *scores.entry(row).or_insert(0.0) += idf * (tf * (K1 + 1.0)) / denom;
            }
        }

        let mut results: Vec<(usize, f32)> = scores.into_iter().collect();
        results.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        results.truncate(k);
        results
    }
}
