// SPDX-License-Identifier: MIT OR Apache-2.0

//! docrank - Local hybrid passage retrieval tool
//!
//! Thin shell around the library: walks plain-text documents, chunks and
//! indexes them per collection, and prints ranked passages for a query.
//! Text extraction for richer formats (PDF etc.) is an external concern;
//! here every file is treated as a single page.

mod cli;

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

use cli::{Cli, Commands};
use docrank::chunker::{ChunkConfig, Chunker};
use docrank::collection;
use docrank::config::Config;
use docrank::embedding::{CommandProvider, DummyProvider, EmbeddingAdapter, EmbeddingProvider};
use docrank::store::{FusionWeights, HybridStore, LOW_CONFIDENCE_THRESHOLD};

fn main() -> Result<()> {
    // Initialize tracing with DOCRANK_LOG env var (e.g., DOCRANK_LOG=debug docrank search "query")
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("DOCRANK_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load();
    let store_dir = cli.store_dir.unwrap_or_else(|| config.store_dir());

    match cli.command {
        Commands::Index {
            paths,
            max_chars,
            overlap,
            force,
        } => run_index(&paths, max_chars, overlap, force, &store_dir, &config),
        Commands::Search {
            query,
            collection,
            final_k,
        } => run_search(&query, collection, final_k, &store_dir, &config),
        Commands::Status => run_status(&store_dir),
    }
}

fn make_adapter(config: &Config) -> EmbeddingAdapter {
    let provider: Box<dyn EmbeddingProvider> = match config.embeddings.command() {
        Some(command) => Box::new(CommandProvider::new(
            command.to_string(),
            Some(config.embeddings.model().to_string()),
        )),
        None => {
            tracing::warn!(
                "no embedding command configured; dense ranking degrades to zero vectors"
            );
            Box::new(DummyProvider::new(config.embeddings.fallback_dimension()))
        }
    };
    EmbeddingAdapter::new(provider).with_fallback_dimension(config.embeddings.fallback_dimension())
}

fn fusion_weights(config: &Config) -> FusionWeights {
    FusionWeights {
        dense: config.search.weight_dense(),
        lexical: config.search.weight_lexical(),
    }
}

/// Expands file and directory arguments into a sorted list of text files.
fn collect_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_file() {
            files.push(path.clone());
        } else if path.is_dir() {
            for entry in WalkDir::new(path).into_iter().filter_map(|e| e.ok()) {
                if entry.file_type().is_file() && is_text_file(entry.path()) {
                    files.push(entry.path().to_path_buf());
                }
            }
        } else {
            bail!("path does not exist: {}", path.display());
        }
    }
    files.sort();
    files.dedup();
    if files.is_empty() {
        bail!("no documents found under the given paths");
    }
    Ok(files)
}

fn is_text_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("txt" | "md" | "text")
    )
}

fn document_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn run_index(
    paths: &[PathBuf],
    max_chars: Option<usize>,
    overlap: Option<usize>,
    force: bool,
    store_dir: &Path,
    config: &Config,
) -> Result<()> {
    let files = collect_files(paths)?;

    let mut file_infos = Vec::with_capacity(files.len());
    for file in &files {
        let size = fs::metadata(file)
            .with_context(|| format!("Failed to stat {}", file.display()))?
            .len();
        file_infos.push((document_name(file), size));
    }
    let id = collection::collection_id(&file_infos);

    if !force && collection::is_indexed(store_dir, &id) {
        println!("collection {} is already indexed ({} documents)", id, files.len());
        return Ok(());
    }

    let chunk_config = ChunkConfig::new(
        max_chars.unwrap_or_else(|| config.chunking.max_chars()),
        overlap.unwrap_or_else(|| config.chunking.overlap()),
    )?;
    let chunker = Chunker::new(chunk_config);

    let mut chunks = Vec::new();
    for file in &files {
        let text = fs::read_to_string(file)
            .with_context(|| format!("Failed to read {}", file.display()))?;
        let pages = vec![(1, text)];
        chunks.extend(chunker.chunk_document(&document_name(file), &pages));
    }
    if chunks.is_empty() {
        bail!("no extractable text in the given documents");
    }

    let mut store = HybridStore::new(make_adapter(config)).with_weights(fusion_weights(config));
    store.build(&chunks)?;
    store.persist(&collection::collection_dir(store_dir, &id))?;

    println!(
        "indexed {} chunks from {} documents into collection {}",
        store.len(),
        files.len(),
        id
    );
    Ok(())
}

fn run_search(
    query: &str,
    collection_arg: Option<String>,
    final_k: Option<usize>,
    store_dir: &Path,
    config: &Config,
) -> Result<()> {
    let id = match collection_arg {
        Some(id) => id,
        None => sole_collection(store_dir)?,
    };
    let dir = collection::collection_dir(store_dir, &id);

    let mut store = HybridStore::new(make_adapter(config)).with_weights(fusion_weights(config));
    store.load(&dir)?;

    let results = store.search_hybrid(
        query,
        config.search.topk_dense(),
        final_k.unwrap_or_else(|| config.search.final_k()),
    );
    let confidence = store.top_dense_score(query);

    if results.is_empty() {
        println!("no matching passages");
        return Ok(());
    }

    for (rank, (chunk_id, score)) in results.iter().enumerate() {
        if let Some(meta) = store.chunk(chunk_id) {
            println!(
                "{:>2}. [{:.4}] {} (page {})\n    {}",
                rank + 1,
                score,
                meta.doc,
                meta.page,
                snippet(&meta.text)
            );
        }
    }
    if confidence < LOW_CONFIDENCE_THRESHOLD {
        println!("(low confidence: best dense score {:.4})", confidence);
    }
    Ok(())
}

fn run_status(store_dir: &Path) -> Result<()> {
    let entries = match fs::read_dir(store_dir) {
        Ok(entries) => entries,
        Err(_) => {
            println!("no collections indexed yet");
            return Ok(());
        }
    };

    let mut any = false;
    for entry in entries.filter_map(|e| e.ok()) {
        if !entry.path().is_dir() {
            continue;
        }
        let id = entry.file_name().to_string_lossy().into_owned();
        let state = if collection::is_indexed(store_dir, &id) {
            "indexed"
        } else {
            "incomplete"
        };
        println!("{}  {}", id, state);
        any = true;
    }
    if !any {
        println!("no collections indexed yet");
    }
    Ok(())
}

/// Finds the only indexed collection, or explains what to do.
fn sole_collection(store_dir: &Path) -> Result<String> {
    let mut found = Vec::new();
    if let Ok(entries) = fs::read_dir(store_dir) {
        for entry in entries.filter_map(|e| e.ok()) {
            let id = entry.file_name().to_string_lossy().into_owned();
            if entry.path().is_dir() && collection::is_indexed(store_dir, &id) {
                found.push(id);
            }
        }
    }
    match found.len() {
        0 => bail!("nothing indexed yet; run `docrank index` first"),
        1 => Ok(found.remove(0)),
        _ => bail!("multiple collections exist; pass --collection <id>"),
    }
}

/// First line of the chunk, clipped to a readable width.
fn snippet(text: &str) -> String {
    let first_line = text.lines().next().unwrap_or_default();
    let clipped: String = first_line.chars().take(100).collect();
    if clipped.len() < first_line.len() {
        format!("{}...", clipped)
    } else {
        clipped
    }
}
