use std::collections::HashSet;
use std::ops::Range;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::RunAborted;
use crate::normalize::normalize;
use crate::source::SourceTable;
use crate::store::{ProgressStore, TranslatedRow};
use crate::translator::Translator;

/// Counters for one invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Rows translated during this run
    pub processed: usize,
    /// Rows whose text was already in the output
    pub skipped: usize,
    /// Rows with empty source text, never sent
    pub empty: usize,
    /// Rows dropped after a translation error (only with skip_failed_rows)
    pub failed: usize,
    /// Rows translated but not written; these need a rerun
    pub write_failures: usize,
    pub total_tokens: u64,
}

/// Clamp `[start, end)` to the table. `end` defaults to the row count and an
/// inverted range is empty.
pub fn resolve_range(start: usize, end: Option<usize>, total_rows: usize) -> Range<usize> {
    let end = end.unwrap_or(total_rows).min(total_rows);
    start.min(end)..end
}

/// First line of the run summary
fn summary_heading(stopped_at: Option<usize>) -> String {
    match stopped_at {
        Some(row) => format!("Translation stopped at row {}", row),
        None => "Translation complete!".to_string(),
    }
}

/// Drives one pass over the selected rows: skip completed, translate, normalize, append.
pub struct BatchRunner<'a, T: Translator + ?Sized> {
    config: &'a Config,
    translator: &'a T,
    store: &'a ProgressStore,
    completed: HashSet<String>,
    stats: RunStats,
}

impl<'a, T: Translator + ?Sized> BatchRunner<'a, T> {
    pub fn new(
        config: &'a Config,
        translator: &'a T,
        store: &'a ProgressStore,
        completed: HashSet<String>,
    ) -> Self {
        Self {
            config,
            translator,
            store,
            completed,
            stats: RunStats::default(),
        }
    }

    /// Process the configured range in order.
    ///
    /// Quota exhaustion always aborts. Other translation errors abort unless
    /// `skip_failed_rows` is set. The summary is logged either way.
    pub async fn run(&mut self, table: &SourceTable) -> Result<RunStats, RunAborted> {
        let total_rows = table.len();
        let range = resolve_range(self.config.start, self.config.end, total_rows);

        if range.is_empty() {
            warn!(
                "Nothing to do: range {}..{} is empty for {} rows",
                self.config.start,
                self.config.end.unwrap_or(total_rows),
                total_rows
            );
        }

        for (offset, row) in table.rows()[range.clone()].iter().enumerate() {
            let index = range.start + offset;

            if self.completed.contains(&row.text) {
                self.stats.skipped += 1;
                continue;
            }

            if row.text.trim().is_empty() {
                warn!("Row {} (id {}) has no text, skipping", index, row.id);
                self.stats.empty += 1;
                continue;
            }

            let translation = match self
                .translator
                .translate(
                    &row.text,
                    &self.config.source_language,
                    &self.config.target_language,
                )
                .await
            {
                Ok(translation) => translation,
                Err(e) if e.is_quota_exhausted() || !self.config.skip_failed_rows => {
                    error!("Error translating row {}: {}", index, e);
                    self.log_summary(Some(index), total_rows, &range);
                    return Err(RunAborted {
                        row: index,
                        stats: self.stats.clone(),
                        source: e,
                    });
                }
                Err(e) => {
                    error!("Error translating row {}, skipping: {}", index, e);
                    self.stats.failed += 1;
                    continue;
                }
            };

            self.stats.processed += 1;
            self.stats.total_tokens += translation.token_count;
            // Counted as done even if the append below fails, so a duplicate
            // source text later in this run is not translated twice.
            self.completed.insert(row.text.clone());

            let translated = TranslatedRow {
                source_text: row.text.clone(),
                id: row.id.clone(),
                translated_text: normalize(&translation.text),
            };

            match self.store.append(&translated) {
                Ok(()) => info!(
                    "Row {}/{} translated and written. Token Usage: {}. Total Token Usage: {} (Processed: {}, Skipped: {})",
                    index + 1,
                    total_rows,
                    translation.token_count,
                    self.stats.total_tokens,
                    self.stats.processed,
                    self.stats.skipped
                ),
                Err(e) => {
                    error!("Error writing row {}: {:#}", index, e);
                    self.stats.write_failures += 1;
                }
            }
        }

        self.log_summary(None, total_rows, &range);
        Ok(self.stats.clone())
    }

    fn log_summary(&self, stopped_at: Option<usize>, total_rows: usize, range: &Range<usize>) {
        info!("{}", summary_heading(stopped_at));
        info!("Total rows: {} (range {}..{})", total_rows, range.start, range.end);
        info!("Newly processed: {}", self.stats.processed);
        info!("Skipped (already processed): {}", self.stats.skipped);
        if self.stats.empty > 0 {
            info!("Skipped (empty text): {}", self.stats.empty);
        }
        if self.stats.failed > 0 {
            warn!("Failed (translation error): {}", self.stats.failed);
        }
        if self.stats.write_failures > 0 {
            warn!(
                "{} translated rows could not be written; rerun to translate them again",
                self.stats.write_failures
            );
        }
        info!("Total token usage: {}", self.stats.total_tokens);
        info!("Output saved to: {}", self.store.path().display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TranslateError;
    use crate::source::SourceRow;
    use crate::translator::Translation;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;
    use tempfile::TempDir;

    // ==================== Helper Functions ====================

    #[derive(Clone, Copy)]
    enum Failure {
        Quota,
        Generic,
    }

    /// Translator that records every call and fails on configured texts
    #[derive(Default)]
    struct FakeTranslator {
        calls: Mutex<Vec<String>>,
        failures: HashMap<String, Failure>,
    }

    impl FakeTranslator {
        fn failing(text: &str, failure: Failure) -> Self {
            let mut failures = HashMap::new();
            failures.insert(text.to_string(), failure);
            Self {
                failures,
                ..Default::default()
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Translator for FakeTranslator {
        async fn translate(
            &self,
            text: &str,
            _source_language: &str,
            target_language: &str,
        ) -> Result<Translation, TranslateError> {
            self.calls.lock().unwrap().push(text.to_string());
            match self.failures.get(text) {
                Some(Failure::Quota) => Err(TranslateError::QuotaExhausted {
                    status: 429,
                    body: "RESOURCE_EXHAUSTED".to_string(),
                }),
                Some(Failure::Generic) => Err(TranslateError::Api {
                    status: 500,
                    body: "internal".to_string(),
                }),
                None => Ok(Translation {
                    text: format!("[{}]\n  {}\n", target_language, text),
                    token_count: 10,
                }),
            }
        }
    }

    fn create_test_config(output_file: &Path) -> Config {
        Config {
            gemini_api_key: "test-key".to_string(),
            gemini_model: "gemini-2.5-flash".to_string(),
            gemini_api_url: "http://localhost".to_string(),
            input_file: PathBuf::from("in.csv"),
            output_file: output_file.to_path_buf(),
            start: 0,
            end: None,
            source_language: "English".to_string(),
            target_language: "Myanmar".to_string(),
            skip_failed_rows: false,
            retries: 0,
        }
    }

    fn create_table(n: usize) -> SourceTable {
        SourceTable::from_rows(
            (0..n)
                .map(|i| SourceRow::new(format!("id{}", i), format!("text {}", i)))
                .collect(),
        )
    }

    fn read_output(path: &Path) -> Vec<Vec<String>> {
        let mut reader = csv::Reader::from_path(path).unwrap();
        reader
            .records()
            .map(|r| r.unwrap().iter().map(str::to_string).collect())
            .collect()
    }

    async fn run_once(
        config: &Config,
        translator: &FakeTranslator,
        table: &SourceTable,
    ) -> Result<RunStats, RunAborted> {
        let (store, completed) = ProgressStore::bootstrap(&config.output_file).unwrap();
        let mut runner = BatchRunner::new(config, translator, &store, completed);
        runner.run(table).await
    }

    // ==================== Range Tests ====================

    #[test]
    fn test_resolve_range_defaults_to_all_rows() {
        assert_eq!(resolve_range(0, None, 10), 0..10);
    }

    #[test]
    fn test_resolve_range_clamps_end() {
        assert_eq!(resolve_range(2, Some(50), 10), 2..10);
    }

    #[test]
    fn test_resolve_range_start_past_end_is_empty() {
        assert!(resolve_range(7, Some(3), 10).is_empty());
        assert!(resolve_range(12, None, 10).is_empty());
    }

    #[test]
    fn test_summary_heading() {
        assert_eq!(summary_heading(None), "Translation complete!");
        assert_eq!(summary_heading(Some(3)), "Translation stopped at row 3");
    }

    // ==================== Run Tests ====================

    #[tokio::test]
    async fn test_run_translates_all_rows() {
        let dir = TempDir::new().unwrap();
        let config = create_test_config(&dir.path().join("out.csv"));
        let translator = FakeTranslator::default();

        let stats = run_once(&config, &translator, &create_table(3)).await.unwrap();

        assert_eq!(stats.processed, 3);
        assert_eq!(stats.skipped, 0);
        assert_eq!(stats.total_tokens, 30);

        let rows = read_output(&config.output_file);
        assert_eq!(
            rows[0],
            vec!["text 0", "id0", "[Myanmar] text 0"],
            "translated text is normalized, source text is not"
        );
        assert_eq!(rows.len(), 3);
    }

    #[tokio::test]
    async fn test_run_respects_range() {
        let dir = TempDir::new().unwrap();
        let mut config = create_test_config(&dir.path().join("out.csv"));
        config.start = 2;
        config.end = Some(5);
        let translator = FakeTranslator::default();

        let stats = run_once(&config, &translator, &create_table(10)).await.unwrap();

        assert_eq!(stats.processed, 3);
        assert_eq!(translator.calls(), vec!["text 2", "text 3", "text 4"]);
        let ids: Vec<String> = read_output(&config.output_file)
            .into_iter()
            .map(|r| r[1].clone())
            .collect();
        assert_eq!(ids, vec!["id2", "id3", "id4"]);
    }

    #[tokio::test]
    async fn test_second_run_is_noop() {
        let dir = TempDir::new().unwrap();
        let config = create_test_config(&dir.path().join("out.csv"));
        let table = create_table(5);

        let first = run_once(&config, &FakeTranslator::default(), &table).await.unwrap();
        let before = std::fs::read_to_string(&config.output_file).unwrap();

        let translator = FakeTranslator::default();
        let second = run_once(&config, &translator, &table).await.unwrap();

        assert_eq!(second.processed, 0);
        assert_eq!(second.skipped, first.processed);
        assert!(translator.calls().is_empty());
        assert_eq!(std::fs::read_to_string(&config.output_file).unwrap(), before);
    }

    #[tokio::test]
    async fn test_generic_error_aborts_and_resumes() {
        let dir = TempDir::new().unwrap();
        let config = create_test_config(&dir.path().join("out.csv"));
        let table = create_table(5);

        let failing = FakeTranslator::failing("text 3", Failure::Generic);
        let aborted = run_once(&config, &failing, &table).await.unwrap_err();

        assert_eq!(aborted.row, 3);
        assert!(!aborted.source.is_quota_exhausted());
        assert_eq!(aborted.stats.processed, 3);
        assert_eq!(read_output(&config.output_file).len(), 3);

        let translator = FakeTranslator::default();
        let stats = run_once(&config, &translator, &table).await.unwrap();

        assert_eq!(stats.skipped, 3);
        assert_eq!(stats.processed, 2);
        assert_eq!(translator.calls(), vec!["text 3", "text 4"]);

        let sources: Vec<String> = read_output(&config.output_file)
            .into_iter()
            .map(|r| r[0].clone())
            .collect();
        assert_eq!(sources, vec!["text 0", "text 1", "text 2", "text 3", "text 4"]);
    }

    #[tokio::test]
    async fn test_quota_exhaustion_stops_immediately() {
        let dir = TempDir::new().unwrap();
        let config = create_test_config(&dir.path().join("out.csv"));

        let translator = FakeTranslator::failing("text 1", Failure::Quota);
        let aborted = run_once(&config, &translator, &create_table(4)).await.unwrap_err();

        assert!(aborted.source.is_quota_exhausted());
        assert_eq!(aborted.row, 1);
        assert_eq!(translator.calls(), vec!["text 0", "text 1"]);
        assert_eq!(read_output(&config.output_file).len(), 1);
    }

    #[tokio::test]
    async fn test_skip_failed_rows_continues() {
        let dir = TempDir::new().unwrap();
        let mut config = create_test_config(&dir.path().join("out.csv"));
        config.skip_failed_rows = true;

        let translator = FakeTranslator::failing("text 1", Failure::Generic);
        let stats = run_once(&config, &translator, &create_table(3)).await.unwrap();

        assert_eq!(stats.processed, 2);
        assert_eq!(stats.failed, 1);
        assert_eq!(translator.calls().len(), 3);
        assert_eq!(read_output(&config.output_file).len(), 2);
    }

    #[tokio::test]
    async fn test_skip_failed_rows_still_stops_on_quota() {
        let dir = TempDir::new().unwrap();
        let mut config = create_test_config(&dir.path().join("out.csv"));
        config.skip_failed_rows = true;

        let translator = FakeTranslator::failing("text 0", Failure::Quota);
        let aborted = run_once(&config, &translator, &create_table(3)).await.unwrap_err();

        assert!(aborted.source.is_quota_exhausted());
        assert_eq!(translator.calls(), vec!["text 0"]);
    }

    #[tokio::test]
    async fn test_duplicate_source_text_written_once() {
        let dir = TempDir::new().unwrap();
        let config = create_test_config(&dir.path().join("out.csv"));
        let table = SourceTable::from_rows(vec![
            SourceRow::new("1", "same"),
            SourceRow::new("2", "other"),
            SourceRow::new("3", "same"),
        ]);
        let translator = FakeTranslator::default();

        let stats = run_once(&config, &translator, &table).await.unwrap();

        assert_eq!(stats.processed, 2);
        assert_eq!(stats.skipped, 1);
        let sources: Vec<String> = read_output(&config.output_file)
            .into_iter()
            .map(|r| r[0].clone())
            .collect();
        assert_eq!(sources, vec!["same", "other"]);
    }

    #[tokio::test]
    async fn test_empty_text_not_sent() {
        let dir = TempDir::new().unwrap();
        let config = create_test_config(&dir.path().join("out.csv"));
        let table = SourceTable::from_rows(vec![
            SourceRow::new("1", ""),
            SourceRow::new("2", "  "),
            SourceRow::new("3", "real"),
        ]);
        let translator = FakeTranslator::default();

        let stats = run_once(&config, &translator, &table).await.unwrap();

        assert_eq!(stats.empty, 2);
        assert_eq!(stats.processed, 1);
        assert_eq!(translator.calls(), vec!["real"]);
    }

    #[tokio::test]
    async fn test_write_failure_is_not_fatal() {
        let dir = TempDir::new().unwrap();
        let config = create_test_config(&dir.path().join("out.csv"));
        let (store, completed) = ProgressStore::bootstrap(&config.output_file).unwrap();
        std::fs::remove_file(&config.output_file).unwrap();

        let translator = FakeTranslator::default();
        let mut runner = BatchRunner::new(&config, &translator, &store, completed);
        let stats = runner.run(&create_table(2)).await.unwrap();

        assert_eq!(stats.processed, 2);
        assert_eq!(stats.write_failures, 2);
    }
}
