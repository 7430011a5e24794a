//! SQL engine: tokenizing, grouping and table extraction

pub mod error;
pub mod extractors;
pub mod grouping;
pub mod keywords;
pub mod lexer;
pub mod lineage;
pub mod script;
pub mod token_tree;

pub use error::{ExtractError, LineageError};
pub use extractors::{Extractor, ExtractorOptions, Flavor};
pub use lineage::{LineageGraph, TableLineage};
pub use token_tree::StatementType;

#[cfg(test)]
mod tests;
