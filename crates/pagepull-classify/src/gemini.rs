//! Gemini adapter for boundary classification.

use async_trait::async_trait;
use pagepull_core::{protocol, ContinuationHint, DocumentCandidate};
use serde_json::json;
use tracing::debug;

use crate::prompt::build_prompt;
use crate::{BoundaryClassifier, ClassifyError};

/// Default model for first-attempt classification.
pub const PRIMARY_MODEL: &str = "gemini-3-flash-preview";

/// Model used for the single retry after a primary failure.
pub const FALLBACK_MODEL: &str = "gemini-2.5-flash";

pub struct GeminiClassifier {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiClassifier {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model,
        }
    }

    pub fn primary(api_key: String) -> Self {
        Self::new(api_key, PRIMARY_MODEL.to_string())
    }

    pub fn fallback(api_key: String) -> Self {
        Self::new(api_key, FALLBACK_MODEL.to_string())
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Build the request body for the Gemini generateContent API.
    fn build_request_body(prompt: &str) -> serde_json::Value {
        json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": prompt }],
            }],
            "generationConfig": {
                "temperature": 0.0,
            },
        })
    }
}

#[async_trait]
impl BoundaryClassifier for GeminiClassifier {
    async fn classify(
        &self,
        snippets: &[String],
        start_page: u32,
        next_id: u32,
        hint: Option<&ContinuationHint>,
    ) -> Result<Vec<DocumentCandidate>, ClassifyError> {
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
            self.model, self.api_key,
        );

        let prompt = build_prompt(snippets, start_page, next_id, hint);
        let body = Self::build_request_body(&prompt);

        debug!(model = %self.model, pages = snippets.len(), start_page, "Gemini classify request");

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status().as_u16();
        if status != 200 {
            let body = response.text().await.unwrap_or_default();
            return Err(ClassifyError::Api { status, body });
        }

        let resp: serde_json::Value = response.json().await?;
        let content = resp["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .ok_or_else(|| {
                ClassifyError::Parse("missing candidates[0].content.parts[0].text".into())
            })?;

        Ok(protocol::parse_candidates(content))
    }
}
