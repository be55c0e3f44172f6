//! Boundary classification for batched page snippets.
//!
//! The classifier is an external capability: given one batch of page
//! snippets plus continuation state, it returns the sub-documents it
//! sees in that batch. This crate defines the [`BoundaryClassifier`]
//! trait the stitcher calls, the prompt the Gemini adapter sends, and
//! the adapter itself ([`gemini::GeminiClassifier`]).
//!
//! The stitcher is responsible for retry/fallback policy; adapters make
//! exactly one attempt per call.

pub mod gemini;
pub mod prompt;

use async_trait::async_trait;
use pagepull_core::{ContinuationHint, DocumentCandidate};
use thiserror::Error;

/// Errors surfaced by classifier adapters.
///
/// All of these are batch-level and therefore recoverable: the stitcher
/// retries once against a fallback classifier and then logs a coverage
/// gap.
#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error: {status} - {body}")]
    Api { status: u16, body: String },
    #[error("failed to parse response: {0}")]
    Parse(String),
    #[error("classifier not configured: {0}")]
    NotConfigured(String),
}

/// Groups a batch of page snippets into logical sub-documents.
///
/// `start_page` is the 1-based index of the batch's first page.
/// `next_id` is the first fresh id the classifier should assign.
/// `hint`, when present, names the document that was still open at the
/// end of the previous batch; an implementation reuses `hint.id` for its
/// first candidate if and only if that candidate continues the same
/// document.
#[async_trait]
pub trait BoundaryClassifier: Send + Sync {
    async fn classify(
        &self,
        snippets: &[String],
        start_page: u32,
        next_id: u32,
        hint: Option<&ContinuationHint>,
    ) -> Result<Vec<DocumentCandidate>, ClassifyError>;
}
