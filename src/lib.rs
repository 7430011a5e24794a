//! Table-level lineage extraction for SQL scripts

pub mod commands;
pub mod logging;
pub mod sql_engine;
