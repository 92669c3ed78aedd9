use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::cli::Args;
use crate::retry::RetryConfig;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Run configuration, built once at startup and passed down by reference
#[derive(Debug, Clone)]
pub struct Config {
    // Gemini
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_api_url: String,

    // Files
    pub input_file: PathBuf,
    pub output_file: PathBuf,

    // Row range
    pub start: usize,
    pub end: Option<usize>,

    // Languages
    pub source_language: String,
    pub target_language: String,

    // Failure handling
    pub skip_failed_rows: bool,
    pub retries: u32,
}

impl Config {
    /// Merge command line arguments with the environment.
    /// Command line values win over GEMINI_API_KEY / GEMINI_MODEL.
    pub fn from_args(args: Args) -> Result<Self> {
        let gemini_api_key = args
            .api_key
            .or_else(|| std::env::var("GEMINI_API_KEY").ok())
            .filter(|key| !key.trim().is_empty())
            .context("Gemini API key not provided. Use --api-key or set GEMINI_API_KEY in .env file")?;

        Ok(Self {
            gemini_api_key,
            gemini_model: args
                .model
                .or_else(|| std::env::var("GEMINI_MODEL").ok())
                .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            gemini_api_url: std::env::var("GEMINI_API_URL")
                .unwrap_or_else(|_| DEFAULT_GEMINI_API_URL.to_string()),

            input_file: args.input_file,
            output_file: args.output_file,

            start: args.start,
            end: args.end,

            source_language: args.source,
            target_language: args.target,

            skip_failed_rows: args.skip_failed_rows,
            retries: args.retries,
        })
    }

    pub fn retry_config(&self) -> RetryConfig {
        if self.retries == 0 {
            RetryConfig::single_attempt()
        } else {
            RetryConfig::transient(self.retries)
        }
    }
}
