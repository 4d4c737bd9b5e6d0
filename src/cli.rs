// SPDX-License-Identifier: MIT OR Apache-2.0

//! CLI argument parsing using clap

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// docrank - Local hybrid passage retrieval tool
///
/// Indexes plain-text documents into a per-collection hybrid index
/// (dense embeddings + BM25) and retrieves the best-matching passages
/// for a query.
#[derive(Parser, Debug)]
#[command(name = "docrank")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Base directory for persisted collection indexes
    #[arg(long, global = true)]
    pub store_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Index documents into a collection
    Index {
        /// Files or directories of plain-text documents
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Maximum chunk length in characters
        #[arg(long)]
        max_chars: Option<usize>,

        /// Character overlap between adjacent chunks
        #[arg(long)]
        overlap: Option<usize>,

        /// Rebuild even if the collection is already indexed
        #[arg(long)]
        force: bool,
    },

    /// Search a collection for the best-matching passages
    Search {
        /// Natural-language query
        query: String,

        /// Collection id (optional when exactly one collection exists)
        #[arg(short, long)]
        collection: Option<String>,

        /// Number of results to return
        #[arg(short = 'k', long)]
        final_k: Option<usize>,
    },

    /// List indexed collections
    Status,
}
