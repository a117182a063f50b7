//! # Error Types
//!
//! Defines `DataTwinError`, the unified error enum for every fatal failure
//! mode in the synthesis pipeline. Every variant carries enough context
//! (table name, column name, cycle path) to debug immediately.
//!
//! Record-local failures — a key retry bound exhausted, an empty parent
//! table at generation time — are *not* errors. Column synthesis signals
//! them as `Ok(None)` and the record generator abandons just that record.

use thiserror::Error;

/// All fatal errors that can abort a synthesis run.
#[derive(Error, Debug)]
pub enum DataTwinError {
    #[error("Malformed statistics document: {message}")]
    Stats { message: String },

    #[error("Table '{referenced_by}' references unknown table '{table}'")]
    UnknownTable {
        table: String,
        referenced_by: String,
    },

    #[error("Circular dependency between tables: {cycle}")]
    CircularDependency { cycle: String },

    #[error("Unparseable date bound '{value}' in stats for {table}.{column}")]
    DateBound {
        value: String,
        table: String,
        column: String,
    },

    #[error("Unknown transform function '{name}' for dependency column {table}.{column}\n  Known transforms: {known}")]
    UnknownTransform {
        name: String,
        table: String,
        column: String,
        known: String,
    },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("LLM generation failed: {message}")]
    Llm { message: String },

    #[error("Output error: {message}: {source}")]
    Output {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, DataTwinError>;
