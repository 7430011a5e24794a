//! Error types for SQL extraction

use sqlparser::tokenizer::TokenizerError;
use thiserror::Error;

/// Errors that can occur while building or querying an [`Extractor`](super::extractors::Extractor)
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Failed to tokenize SQL: {0}")]
    Tokenize(#[from] TokenizerError),

    #[error("Unknown SQL dialect: {name}")]
    UnknownDialect { name: String },

    #[error("Malformed identifier '{text}': expected a name at segment {index}")]
    MalformedIdentifier { text: String, index: usize },

    #[error("LIMIT keyword at token {position} has no value")]
    MissingLimitValue { position: usize },

    #[error("Invalid LIMIT value: {value}")]
    InvalidLimitValue { value: String },

    #[error("First statement has no LIMIT clause to rewrite")]
    MissingLimitClause,
}

/// Result alias used across the SQL engine
pub type Result<T> = std::result::Result<T, ExtractError>;

/// Errors raised by the table lineage graph
#[derive(Error, Debug, PartialEq, Eq)]
pub enum LineageError {
    #[error("Lineage graph contains a cycle through: {}", tables.join(" -> "))]
    Cycle { tables: Vec<String> },
}
