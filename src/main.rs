use anyhow::Result;
use batch_translate::{
    cli::Args, config::Config, gemini::GeminiTranslator, runner::BatchRunner,
    source::SourceTable, store::ProgressStore,
};
use clap::Parser;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored when absent)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("batch_translate=info".parse()?),
        )
        .init();

    let config = Config::from_args(Args::parse())?;

    let table = SourceTable::load(&config.input_file)?;
    info!("Loaded {} rows from {}", table.len(), config.input_file.display());

    let (store, completed) = ProgressStore::bootstrap(&config.output_file)?;

    let translator = GeminiTranslator::new(&config);
    info!(
        "Translating {} -> {} via {}",
        config.source_language,
        config.target_language,
        translator.endpoint()
    );

    let mut runner = BatchRunner::new(&config, &translator, &store, completed);
    if let Err(aborted) = runner.run(&table).await {
        error!(
            "Stopped at row {} after {} newly processed rows ({} skipped, {} tokens). Rerun to resume.",
            aborted.row, aborted.stats.processed, aborted.stats.skipped, aborted.stats.total_tokens
        );
        if aborted.source.is_quota_exhausted() {
            error!("Quota exceeded (HTTP 429 - RESOURCE_EXHAUSTED). Progress is saved; rerun the same command once the quota resets.");
            error!("More info: https://ai.google.dev/gemini-api/docs/rate-limits");
        }
        return Err(aborted.into());
    }

    Ok(())
}
