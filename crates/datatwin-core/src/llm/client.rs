//! # LLM-Assisted Similar-Data Source
//!
//! Columns declared `llm_gen` delegate to an external generation
//! capability: given a handful of sample values, produce a batch of new
//! values with the same shape but different content. The engine talks to
//! it through [`SimilarValueSource`] so tests (and callers without a
//! model endpoint) can inject their own.
//!
//! The shipped implementation targets an Ollama `/api/generate` endpoint.
//! Calls are synchronous and bounded by an explicit timeout; transport
//! failures surface to the caller as-is — the engine never retries them.

use std::time::Duration;

use crate::error::{DataTwinError, Result};

/// External capability that produces values similar to the given samples.
pub trait SimilarValueSource {
    fn generate_similar(&self, samples: &[String], count: usize) -> Result<Vec<String>>;
}

/// Default request timeout. Generation of a 20-item batch on a small
/// local model comfortably fits; anything slower should fail loudly
/// rather than stall the whole run.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(45);

pub const DEFAULT_MODEL: &str = "gemma2:latest";

/// Blocking client for an Ollama-compatible `/api/generate` endpoint.
pub struct OllamaClient {
    url: String,
    model: String,
    client: reqwest::blocking::Client,
}

impl OllamaClient {
    pub fn new(url: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::blocking::Client::new());
        Self {
            url: url.into(),
            model: model.into(),
            client,
        }
    }

    fn build_prompt(samples: &[String], count: usize) -> String {
        format!(
            "Given the sample data below, generate {count} similar items.\n\
             1. Match the format and structure of the samples, but with different content.\n\
             2. Do not produce sequential or repeated values, and do not repeat the samples.\n\
             3. Do not wrap strings in quotes.\n\n\
             Sample data:\n{samples}\n\n\
             Return exactly {count} items, one per line, with no extra explanation or markup.",
            count = count,
            samples = serde_json::to_string(samples).unwrap_or_default(),
        )
    }
}

impl SimilarValueSource for OllamaClient {
    fn generate_similar(&self, samples: &[String], count: usize) -> Result<Vec<String>> {
        let body = serde_json::json!({
            "model": self.model,
            "prompt": Self::build_prompt(samples, count),
            "stream": false,
            "options": { "temperature": 0 }
        });

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .map_err(|e| DataTwinError::Llm {
                message: format!("request to {} failed: {}", self.url, e),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DataTwinError::Llm {
                message: format!("{} returned {}", self.url, status),
            });
        }

        let parsed: serde_json::Value = response.json().map_err(|e| DataTwinError::Llm {
            message: format!("invalid response JSON: {}", e),
        })?;
        let text = parsed["response"]
            .as_str()
            .ok_or_else(|| DataTwinError::Llm {
                message: "response missing 'response' field".to_string(),
            })?;

        Ok(parse_batch(text, count))
    }
}

/// Split a model response into value lines, tolerating code fences and
/// surrounding blank lines. Truncates to `count`.
pub(crate) fn parse_batch(text: &str, count: usize) -> Vec<String> {
    text.lines()
        .map(|line| line.trim().trim_matches('`'))
        .filter(|line| !line.is_empty() && *line != "```")
        .map(|line| line.to_string())
        .take(count)
        .collect()
}
