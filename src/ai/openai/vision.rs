use super::client::OpenAiHttpClient;
use super::types::{
    ChatCompletionRequest, ChatMessage, ChatMessageContent, MessagePart, ResponseFormat,
};
use crate::ai::{VisionRequest, VisionService};
use crate::{Error, Result};
use async_trait::async_trait;
use std::time::Duration;

pub struct OpenAiVisionClient {
    http: OpenAiHttpClient,
    model: String,
}

impl OpenAiVisionClient {
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
            http: OpenAiHttpClient::new_with_client(api_key, timeout, client),
            model,
        }
    }

    /// Point the client at an OpenAI-compatible endpoint.
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.http = self.http.with_base_url(base_url);
        self
    }

    fn build_request(&self, request: &VisionRequest) -> ChatCompletionRequest {
        let system_message = ChatMessage {
            role: "system".to_string(),
            content: Some(ChatMessageContent::Text(request.system_prompt.clone())),
            refusal: None,
        };

        let mut parts = vec![MessagePart::text(request.user_prompt.clone())];
        parts.extend(
            request
                .images
                .iter()
                .map(|image| MessagePart::image(image.data_url())),
        );

        let user_message = ChatMessage {
            role: "user".to_string(),
            content: Some(ChatMessageContent::Parts(parts)),
            refusal: None,
        };

        // JSON mode is always on; a schema upgrades it to strict structured output.
        let response_format = match &request.response_schema {
            Some(schema) => ResponseFormat::json_schema("captions", schema.clone()),
            None => ResponseFormat::json_object(),
        };

        ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![system_message, user_message],
            max_completion_tokens: request.max_output_tokens,
            response_format: Some(response_format),
        }
    }
}

#[async_trait]
impl VisionService for OpenAiVisionClient {
    async fn describe(&self, request: &VisionRequest) -> Result<String> {
        tracing::debug!(
            "Sending {} image(s) to OpenAI model {}",
            request.images.len(),
            self.model
        );

        let response = self.http.chat_completion(&self.build_request(request)).await?;

        let choice = response
            .choices
            .first()
            .ok_or_else(|| Error::AiProvider("No response from OpenAI vision API".to_string()))?;

        if let Some(refusal) = &choice.message.refusal {
            tracing::warn!("OpenAI refused caption request: {}", refusal);
            return Err(Error::UpstreamRejected(format!(
                "OpenAI refused the request: {}",
                refusal
            )));
        }

        if choice.finish_reason.as_deref() == Some("length") {
            tracing::warn!("OpenAI reply hit the output token budget; it may be truncated");
        }

        match &choice.message.content {
            Some(ChatMessageContent::Text(text)) if !text.trim().is_empty() => Ok(text.clone()),
            _ => Err(Error::AiProvider(
                "Empty response from OpenAI vision API".to_string(),
            )),
        }
    }
}
