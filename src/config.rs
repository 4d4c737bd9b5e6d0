// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration file support for docrank
//!
//! Loads configuration from .docrankrc.toml in the current directory or
//! ~/.config/docrank/config.toml.

use serde::Deserialize;
use std::path::PathBuf;

use crate::chunker::{DEFAULT_MAX_CHARS, DEFAULT_OVERLAP};
use crate::embedding::adapter::FALLBACK_DIMENSION;
use crate::store::{DEFAULT_FINAL_K, DEFAULT_TOPK_DENSE};

/// Search configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Candidates fetched from each sub-index before fusion
    pub topk_dense: Option<usize>,
    /// Fused results returned
    pub final_k: Option<usize>,
    /// Weight for the dense/embedding ranking (0.0-1.0)
    pub weight_dense: Option<f32>,
    /// Weight for the lexical/BM25 ranking (0.0-1.0)
    pub weight_lexical: Option<f32>,
}

impl SearchConfig {
    /// Get candidate count per sub-index (defaults to 20)
    pub fn topk_dense(&self) -> usize {
        self.topk_dense.unwrap_or(DEFAULT_TOPK_DENSE)
    }

    /// Get fused result count (defaults to 5)
    pub fn final_k(&self) -> usize {
        self.final_k.unwrap_or(DEFAULT_FINAL_K)
    }

    /// Get dense weight (defaults to 0.6)
    pub fn weight_dense(&self) -> f32 {
        self.weight_dense.unwrap_or(0.6)
    }

    /// Get lexical weight (defaults to 0.4)
    pub fn weight_lexical(&self) -> f32 {
        self.weight_lexical.unwrap_or(0.4)
    }
}

/// Chunking configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum chunk length in characters
    pub max_chars: Option<usize>,
    /// Character overlap between adjacent chunks
    pub overlap: Option<usize>,
}

impl ChunkingConfig {
    /// Get max chunk length (defaults to 900)
    pub fn max_chars(&self) -> usize {
        self.max_chars.unwrap_or(DEFAULT_MAX_CHARS)
    }

    /// Get chunk overlap (defaults to 120)
    pub fn overlap(&self) -> usize {
        self.overlap.unwrap_or(DEFAULT_OVERLAP)
    }
}

/// Embedding configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Model identifier passed to the provider
    pub model: Option<String>,
    /// Command to execute for the command provider
    pub command: Option<String>,
    /// Dimension used when no provider call succeeds
    pub fallback_dimension: Option<usize>,
}

impl EmbeddingConfig {
    /// Get model identifier (defaults to "text-embedding-004")
    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or("text-embedding-004")
    }

    /// Get provider command, if configured
    pub fn command(&self) -> Option<&str> {
        self.command.as_deref()
    }

    /// Get fallback dimension (defaults to 768)
    pub fn fallback_dimension(&self) -> usize {
        self.fallback_dimension.unwrap_or(FALLBACK_DIMENSION)
    }
}

/// Configuration loaded from .docrankrc.toml or ~/.config/docrank/config.toml
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base directory for persisted collection indexes
    pub store_dir: Option<PathBuf>,

    /// Search configuration
    #[serde(default)]
    pub search: SearchConfig,

    /// Chunking configuration
    #[serde(default)]
    pub chunking: ChunkingConfig,

    /// Embedding configuration
    #[serde(default)]
    pub embeddings: EmbeddingConfig,
}

impl Config {
    /// Load configuration from files
    ///
    /// Precedence (highest to lowest):
    /// 1. .docrankrc.toml in current directory
    /// 2. ~/.config/docrank/config.toml
    pub fn load() -> Self {
        if let Some(config) = Self::load_from_path(&PathBuf::from(".docrankrc.toml")) {
            return config;
        }

        if let Some(home) = dirs::home_dir() {
            let config_path = home.join(".config").join("docrank").join("config.toml");
            if let Some(config) = Self::load_from_path(&config_path) {
                return config;
            }
        }

        Self::default()
    }

    fn load_from_path(path: &PathBuf) -> Option<Self> {
        let content = std::fs::read_to_string(path).ok()?;
        match toml::from_str(&content) {
            Ok(config) => Some(config),
            Err(e) => {
                eprintln!("Warning: Failed to parse {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Get the store base directory (defaults to ./.docrank/store)
    pub fn store_dir(&self) -> PathBuf {
        self.store_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(".docrank").join("store"))
    }
}
