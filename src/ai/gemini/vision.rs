use super::client::GeminiHttpClient;
use super::types::{
    Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, InlineData, Part,
};
use crate::ai::{VisionRequest, VisionService};
use crate::{Error, Result};
use async_trait::async_trait;
use std::time::Duration;

pub struct GeminiVisionClient {
    http: GeminiHttpClient,
}

impl GeminiVisionClient {
    pub fn new(api_key: String, model: String, timeout: Duration) -> Self {
        Self::new_with_client(api_key, model, timeout, reqwest::Client::new())
    }

    pub fn new_with_client(
        api_key: String,
        model: String,
        timeout: Duration,
        client: reqwest::Client,
    ) -> Self {
        Self {
            http: GeminiHttpClient::new_with_client(api_key, model, timeout, client),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.http = self.http.with_base_url(base_url);
        self
    }

    fn build_request(request: &VisionRequest) -> GenerateContentRequest {
        let mut parts: Vec<Part> = request
            .images
            .iter()
            .map(|image| Part::InlineData {
                inline_data: InlineData {
                    mime_type: image.mime_type.to_string(),
                    data: image.base64.clone(),
                },
            })
            .collect();
        parts.push(Part::Text {
            text: request.user_prompt.clone(),
        });

        GenerateContentRequest {
            system_instruction: Some(Content {
                role: None,
                parts: vec![Part::Text {
                    text: request.system_prompt.clone(),
                }],
            }),
            contents: vec![Content {
                role: Some("user".to_string()),
                parts,
            }],
            generation_config: Some(GenerationConfig {
                max_output_tokens: Some(request.max_output_tokens),
                response_mime_type: Some("application/json".to_string()),
            }),
        }
    }
}

#[async_trait]
impl VisionService for GeminiVisionClient {
    async fn describe(&self, request: &VisionRequest) -> Result<String> {
        tracing::debug!(
            "Sending {} image(s) to Gemini model {}",
            request.images.len(),
            self.http.model()
        );

        let response: GenerateContentResponse = self
            .http
            .generate_content(&Self::build_request(request))
            .await?;

        if let Some(reason) = response
            .prompt_feedback
            .as_ref()
            .and_then(|feedback| feedback.block_reason.as_deref())
        {
            tracing::warn!("Gemini blocked caption request: {}", reason);
            return Err(Error::UpstreamRejected(format!(
                "Gemini blocked the request: {}",
                reason
            )));
        }

        let candidate = response
            .candidates
            .first()
            .ok_or_else(|| Error::AiProvider("No candidates in Gemini response".to_string()))?;

        if candidate.finish_reason.as_deref() == Some("MAX_TOKENS") {
            tracing::warn!("Gemini reply hit the output token budget; it may be truncated");
        }

        let text: String = candidate
            .content
            .iter()
            .flat_map(|content| content.parts.iter())
            .filter_map(|part| match part {
                Part::Text { text } => Some(text.as_str()),
                Part::InlineData { .. } => None,
            })
            .collect();

        if text.trim().is_empty() {
            return Err(Error::AiProvider(
                "Empty response from Gemini vision API".to_string(),
            ));
        }

        Ok(text)
    }
}
