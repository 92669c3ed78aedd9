use anyhow::{Context, Result};
use std::path::Path;

/// Column holding the text to translate
pub const TEXT_COLUMN: &str = "context";
/// Column holding the row identifier
pub const ID_COLUMN: &str = "ids";

/// One row of the input table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRow {
    pub id: String,
    /// Source text exactly as read; empty when the cell is missing
    pub text: String,
}

impl SourceRow {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// Input rows in file order. Never mutated after loading.
#[derive(Debug, Clone, Default)]
pub struct SourceTable {
    rows: Vec<SourceRow>,
}

impl SourceTable {
    pub fn from_rows(rows: Vec<SourceRow>) -> Self {
        Self { rows }
    }

    /// Load a CSV file with `context` and `ids` columns. Other columns are ignored.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            anyhow::bail!("Input file '{}' does not exist", path.display());
        }

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path)
            .with_context(|| format!("Failed to open input file '{}'", path.display()))?;

        let headers = reader
            .headers()
            .with_context(|| {
                format!(
                    "Failed to read header of '{}'. Please make sure it is a CSV file",
                    path.display()
                )
            })?
            .clone();

        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h == name)
                .with_context(|| format!("Input file '{}' has no '{}' column", path.display(), name))
        };
        let text_idx = column(TEXT_COLUMN)?;
        let id_idx = column(ID_COLUMN)?;

        let mut rows = Vec::new();
        for (index, record) in reader.records().enumerate() {
            let record = record.with_context(|| {
                format!("Failed to read row {} of '{}'", index, path.display())
            })?;
            rows.push(SourceRow {
                id: record.get(id_idx).unwrap_or_default().to_string(),
                text: record.get(text_idx).unwrap_or_default().to_string(),
            });
        }

        Ok(Self { rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[SourceRow] {
        &self.rows
    }
}
