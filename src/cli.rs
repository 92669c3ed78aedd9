use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "batch-translate",
    version,
    about = "Translate a CSV text column with the Gemini API, resuming where the last run stopped"
)]
pub struct Args {
    /// Path to input CSV file (columns: context, ids)
    pub input_file: PathBuf,

    /// Path to output CSV file (created if missing, appended to otherwise)
    pub output_file: PathBuf,

    /// Gemini API key (falls back to GEMINI_API_KEY from the environment or .env)
    #[arg(long)]
    pub api_key: Option<String>,

    /// Start row index (inclusive)
    #[arg(long, default_value_t = 0)]
    pub start: usize,

    /// End row index (exclusive), defaults to the number of rows
    #[arg(long)]
    pub end: Option<usize>,

    /// Source language
    #[arg(long, default_value = "English")]
    pub source: String,

    /// Target language
    #[arg(long, default_value = "Myanmar")]
    pub target: String,

    /// Gemini model (falls back to GEMINI_MODEL, then gemini-2.5-flash)
    #[arg(long)]
    pub model: Option<String>,

    /// Skip rows whose translation fails instead of stopping the run.
    /// Quota exhaustion always stops the run.
    #[arg(long)]
    pub skip_failed_rows: bool,

    /// Extra attempts for transient failures (5xx, network errors)
    #[arg(long, default_value_t = 0)]
    pub retries: u32,
}
