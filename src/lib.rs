//! Resumable batch translation of a CSV text column.
//!
//! The output CSV is the progress record: rows already present are skipped on
//! the next run, new rows are appended one at a time as they are translated.

pub mod cli;
pub mod config;
pub mod error;
pub mod gemini;
pub mod normalize;
pub mod retry;
pub mod runner;
pub mod source;
pub mod store;
pub mod translator;
