use async_trait::async_trait;

use crate::error::TranslateError;

/// Result of one successful remote translation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    /// Response text as returned by the service, not yet normalized
    pub text: String,
    /// Total tokens reported for the call, 0 when the service reported none
    pub token_count: u64,
}

/// One remote call per invocation: translate `text` between two named languages.
#[async_trait]
pub trait Translator {
    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<Translation, TranslateError>;
}

/// Build the instruction sent to the model
pub fn build_translation_prompt(text: &str, source_language: &str, target_language: &str) -> String {
    format!(
        "Translate the following {} text to {}:\n\n\"{}\"",
        source_language, target_language, text
    )
}
