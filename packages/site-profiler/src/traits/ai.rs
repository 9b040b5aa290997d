//! LanguageModel trait — the model-call capability.

use async_trait::async_trait;

use crate::error::ModelResult;

/// Language-model capability used by the ranking and synthesis stages.
///
/// Implementations wrap a specific provider and carry their own per-call
/// timeout. The pipeline treats every call as fallible: transport errors
/// are retried with backoff, contract violations in the returned text are
/// handled by the calling component's corrective-retry-then-fallback path.
/// Prompt construction and response validation live with the callers, so a
/// provider implementation stays a thin text-in/text-out client.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Run one chat completion and return the raw response text.
    async fn complete(&self, system: &str, user: &str) -> ModelResult<String>;

    /// Model identifier recorded in run metadata.
    fn model_name(&self) -> &str;
}
