pub mod classify;
pub mod config;
pub mod error;
pub mod generate;
pub mod graph;
pub mod llm;
pub mod output;
pub mod profile;

// Re-export key types for convenience
pub use error::{DataTwinError, Result};
pub use generate::{synthesize, synthesize_document, SynthesisOptions, SynthesisResult};
pub use profile::{load_profile, load_profile_str, SchemaProfile};
