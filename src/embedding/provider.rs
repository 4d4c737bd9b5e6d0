// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedding provider implementations.
//!
//! A provider is an opaque external capability: one text in, one vector out.
//! Failures are ordinary `anyhow` errors; the adapter decides what to do
//! with them (it substitutes zero vectors and keeps going).

use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::io::Write;
use std::process::{Command, Stdio};

const DEFAULT_COMMAND_MODEL: &str = "text-embedding-004";

/// Trait for embedding providers.
pub trait EmbeddingProvider: Send {
    /// Returns the model identifier.
    fn model_id(&self) -> &str;

    /// Generates an embedding for a single text.
    fn embed_one(&mut self, text: &str) -> Result<Vec<f32>>;
}

/// Provider that shells out to an external embedding command.
///
/// The command receives `{"model": ..., "text": ...}` on stdin and must print
/// a JSON float array, or an object with an `embedding` field, on stdout.
pub struct CommandProvider {
    command: String,
    model: String,
}

impl CommandProvider {
    pub fn new(command: String, model: Option<String>) -> Self {
        Self {
            command,
            model: model.unwrap_or_else(|| DEFAULT_COMMAND_MODEL.to_string()),
        }
    }

    fn run_command(&self, text: &str) -> Result<Vec<f32>> {
        let payload = serde_json::json!({
            "model": self.model,
            "text": text,
        });

        let mut child = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to spawn embedding command: {}", self.command))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(payload.to_string().as_bytes())
                .context("Failed to write embedding payload to stdin")?;
        }

        let output = child
            .wait_with_output()
            .context("Failed to read embedding command output")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "Embedding command failed (status {}): {}",
                output.status,
                stderr.trim()
            );
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let parsed: Value = serde_json::from_str(stdout.trim())
            .context("Failed to parse embedding command output as JSON")?;

        let vector_value = match parsed {
            Value::Array(arr) => Value::Array(arr),
            Value::Object(ref obj) => obj
                .get("embedding")
                .or_else(|| obj.get("vector"))
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("Embedding output missing 'embedding' field"))?,
            _ => bail!("Embedding output must be a JSON array or object"),
        };

        vector_value
            .as_array()
            .ok_or_else(|| anyhow::anyhow!("Embedding must be a JSON array"))?
            .iter()
            .map(|value| {
                value
                    .as_f64()
                    .ok_or_else(|| anyhow::anyhow!("Embedding value must be a number"))
                    .map(|v| v as f32)
            })
            .collect()
    }
}

impl EmbeddingProvider for CommandProvider {
    fn model_id(&self) -> &str {
        &self.model
    }

    fn embed_one(&mut self, text: &str) -> Result<Vec<f32>> {
        self.run_command(text)
    }
}

/// Provider that returns zero vectors (for testing/fallback).
pub struct DummyProvider {
    model: String,
    dimension: usize,
}

impl DummyProvider {
    /// Creates a new dummy provider with the specified dimension.
    pub fn new(dimension: usize) -> Self {
        Self {
            model: "dummy".to_string(),
            dimension,
        }
    }
}

impl EmbeddingProvider for DummyProvider {
    fn model_id(&self) -> &str {
        &self.model
    }

    fn embed_one(&mut self, _text: &str) -> Result<Vec<f32>> {
        Ok(vec![0.0; self.dimension])
    }
}
