// SPDX-License-Identifier: MIT OR Apache-2.0

//! Paragraph-aware text chunker.
//!
//! Splits per-page document text into bounded, overlapping passages. The
//! chunker preserves paragraph boundaries where possible and hard-splits
//! oversize paragraphs with a character overlap carried between slices.
//! Output is fully deterministic for a given input and configuration.

use anyhow::{bail, Result};

/// Default maximum chunk length in characters.
pub const DEFAULT_MAX_CHARS: usize = 900;

/// Default character overlap between adjacent chunks.
pub const DEFAULT_OVERLAP: usize = 120;

/// Length of a chunk id in hex characters.
const CHUNK_ID_LEN: usize = 12;

/// Configuration for the chunker.
#[derive(Debug, Clone)]
pub struct ChunkConfig {
    /// Maximum chunk length in characters.
    pub max_chars: usize,
    /// Character overlap carried between adjacent chunks.
    pub overlap: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            max_chars: DEFAULT_MAX_CHARS,
            overlap: DEFAULT_OVERLAP,
        }
    }
}

impl ChunkConfig {
    /// Creates a validated configuration.
    pub fn new(max_chars: usize, overlap: usize) -> Result<Self> {
        if max_chars == 0 {
            bail!("max_chars must be greater than 0");
        }
        if overlap >= max_chars {
            bail!("overlap ({}) must be less than max_chars ({})", overlap, max_chars);
        }
        Ok(Self { max_chars, overlap })
    }
}

/// A bounded slice of a document's text, the atomic unit of retrieval.
///
/// Created once during chunking and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Stable short fingerprint of (doc, page, position within page).
    pub id: String,
    /// Chunk content, non-empty after trimming.
    pub text: String,
    /// 1-based page number within the source document.
    pub page: u32,
    /// Source document name.
    pub doc: String,
}

/// Splits page text into bounded overlapping chunks.
pub struct Chunker {
    config: ChunkConfig,
}

impl Chunker {
    /// Creates a new chunker with the given configuration.
    pub fn new(config: ChunkConfig) -> Self {
        Self { config }
    }

    /// Creates a chunker with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(ChunkConfig::default())
    }

    /// Returns the current configuration.
    pub fn config(&self) -> &ChunkConfig {
        &self.config
    }

    /// Splits one page of text into chunk strings.
    ///
    /// Paragraphs are delimited by blank lines and greedily accumulated into
    /// a buffer while the combined length stays within `max_chars`. On
    /// overflow the buffer is flushed and the trailing `overlap` characters
    /// seed the next buffer. A buffer that still exceeds `max_chars` (one
    /// huge paragraph) is hard-split into `max_chars` slices with `overlap`
    /// carry-over.
    pub fn chunk_page(&self, page_text: &str) -> Vec<String> {
        let max_chars = self.config.max_chars;
        let overlap = self.config.overlap;

        let paras: Vec<&str> = page_text
            .split("\n\n")
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();

        let mut chunks: Vec<String> = Vec::new();
        let mut buff = String::new();

        for para in paras {
            // 2 accounts for the blank-line separator inserted on join.
            let fits = if buff.is_empty() {
                char_len(para) <= max_chars
            } else {
                char_len(&buff) + char_len(para) + 2 <= max_chars
            };
            if fits {
                if buff.is_empty() {
                    buff = para.to_string();
                } else {
                    buff.push_str("\n\n");
                    buff.push_str(para);
                }
            } else {
                if !buff.is_empty() {
                    chunks.push(buff.clone());
                }
                let carry = tail_chars(&buff, overlap);
                buff = format!("{}\n\n{}", carry, para).trim().to_string();
                while char_len(&buff) > max_chars {
                    chunks.push(prefix_chars(&buff, max_chars).to_string());
                    buff = skip_chars(&buff, max_chars - overlap).trim().to_string();
                }
            }
        }
        if !buff.is_empty() {
            chunks.push(buff);
        }
        chunks
    }

    /// Chunks a whole document given its ordered (page number, page text)
    /// pairs, assigning stable ids.
    pub fn chunk_document(&self, doc: &str, pages: &[(u32, String)]) -> Vec<Chunk> {
        let mut out = Vec::new();
        for (page, text) in pages {
            for (pos, piece) in self.chunk_page(text).into_iter().enumerate() {
                out.push(Chunk {
                    id: chunk_id(doc, *page, pos),
                    text: piece,
                    page: *page,
                    doc: doc.to_string(),
                });
            }
        }
        out
    }
}

/// Derives the stable chunk fingerprint from (doc, page, position).
///
/// Truncated blake3; collisions at this length are acceptable for the scale
/// of a single collection.
pub fn chunk_id(doc: &str, page: u32, pos: usize) -> String {
    let input = format!("{}:{}:{}", doc, page, pos);
    let hash = blake3::hash(input.as_bytes());
    hash.to_hex()[..CHUNK_ID_LEN].to_string()
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Byte offset of the n-th character, clamped to the end of the string.
fn char_boundary(s: &str, n: usize) -> usize {
    s.char_indices().nth(n).map(|(i, _)| i).unwrap_or(s.len())
}

fn prefix_chars(s: &str, n: usize) -> &str {
    &s[..char_boundary(s, n)]
}

fn skip_chars(s: &str, n: usize) -> &str {
    &s[char_boundary(s, n)..]
}

fn tail_chars(s: &str, n: usize) -> &str {
    let total = char_len(s);
    skip_chars(s, total.saturating_sub(n))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunker(max_chars: usize, overlap: usize) -> Chunker {
        Chunker::new(ChunkConfig::new(max_chars, overlap).unwrap())
    }

    #[test]
    fn test_config_validation() {
        assert!(ChunkConfig::new(900, 120).is_ok());
        assert!(ChunkConfig::new(0, 0).is_err());
        assert!(ChunkConfig::new(100, 100).is_err());
        assert!(ChunkConfig::new(100, 200).is_err());
    }

    #[test]
    fn test_empty_page() {
        let c = Chunker::with_defaults();
        assert!(c.chunk_page("").is_empty());
    }

    #[test]
    fn test_whitespace_only_page() {
        let c = Chunker::with_defaults();
        assert!(c.chunk_page("   \n\n \t \n\n  ").is_empty());
    }

    #[test]
    fn test_single_paragraph_fits() {
        let c = chunker(100, 20);
        let chunks = c.chunk_page("hello world");
        assert_eq!(chunks, vec!["hello world".to_string()]);
    }

    #[test]
    fn test_paragraphs_accumulate() {
        let c = chunker(100, 10);
        let chunks = c.chunk_page("first para\n\nsecond para");
        assert_eq!(chunks, vec!["first para\n\nsecond para".to_string()]);
    }

    #[test]
    fn test_overflow_flushes_with_overlap() {
        let c = chunker(20, 5);
        let chunks = c.chunk_page("aaaaaaaaaaaaaaa\n\nbbbbbbbbbb");
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], "aaaaaaaaaaaaaaa");
        // Second chunk is seeded with the 5-char tail of the first.
        assert_eq!(chunks[1], "aaaaa\n\nbbbbbbbbbb");
    }

    #[test]
    fn test_huge_paragraph_hard_split() {
        let c = chunker(50, 10);
        let text = "x".repeat(200);
        let chunks = c.chunk_page(&text);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 50);
        }
        // Every character of the input survives in some chunk.
        let total: usize = chunks.iter().map(|c| c.chars().count()).sum();
        assert!(total >= 200);
    }

    #[test]
    fn test_length_bound_holds() {
        let c = chunker(80, 15);
        let text = "para one is fairly short\n\npara two goes on and on and on and on and on\n\n"
            .repeat(10);
        for chunk in c.chunk_page(&text) {
            assert!(chunk.chars().count() <= 80, "chunk too long: {}", chunk.len());
        }
    }

    #[test]
    fn test_deterministic_output() {
        let c = chunker(60, 12);
        let text = "alpha beta gamma\n\ndelta epsilon zeta\n\n".repeat(8);
        let a = c.chunk_page(&text);
        let b = c.chunk_page(&text);
        assert_eq!(a, b);
    }

    #[test]
    fn test_multibyte_safe() {
        let c = chunker(30, 8);
        let text = "héllo wörld ünïcode çhärs\n\n".repeat(5);
        for chunk in c.chunk_page(&text) {
            assert!(chunk.chars().count() <= 30);
        }
    }

    #[test]
    fn test_chunk_id_stability() {
        let a = chunk_id("notes.pdf", 3, 0);
        let b = chunk_id("notes.pdf", 3, 0);
        assert_eq!(a, b);
        assert_eq!(a.len(), 12);

        assert_ne!(chunk_id("notes.pdf", 3, 1), a);
        assert_ne!(chunk_id("notes.pdf", 4, 0), a);
        assert_ne!(chunk_id("other.pdf", 3, 0), a);
    }

    #[test]
    fn test_chunk_document_ordering() {
        let c = chunker(40, 8);
        let pages = vec![
            (1, "page one alpha\n\npage one beta".to_string()),
            (2, "page two gamma".to_string()),
        ];
        let chunks = c.chunk_document("doc.pdf", &pages);
        assert!(!chunks.is_empty());
        assert_eq!(chunks[0].page, 1);
        assert_eq!(chunks.last().unwrap().page, 2);
        for chunk in &chunks {
            assert_eq!(chunk.doc, "doc.pdf");
            assert!(!chunk.text.trim().is_empty());
        }
        // Ids are unique across the document.
        let mut ids: Vec<_> = chunks.iter().map(|c| c.id.clone()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), chunks.len());
    }

    #[test]
    fn test_empty_pages_yield_no_chunks() {
        let c = Chunker::with_defaults();
        let pages = vec![(1, String::new()), (2, "  \n\n ".to_string())];
        assert!(c.chunk_document("empty.pdf", &pages).is_empty());
    }
}
