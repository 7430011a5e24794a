//! Command implementations behind the sqll CLI

pub mod config;
pub mod inspect;
pub mod lineage;
