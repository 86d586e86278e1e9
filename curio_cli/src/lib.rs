//! Shared pieces of the curio command line interface

pub mod output;
pub mod pipelines;
pub mod prompt;
pub mod registry;
pub mod store;
