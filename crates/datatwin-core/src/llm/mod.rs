pub mod client;

pub use client::{OllamaClient, SimilarValueSource, DEFAULT_MODEL, DEFAULT_TIMEOUT};
