//! Vision model integration for caption generation
//!
//! Provides a provider-neutral interface over OpenAI's chat completions and
//! Gemini's `generateContent` APIs. Both receive a system instruction, the
//! user's images and an output token budget, and hand back the model's raw
//! text reply for the caption normalizer to interpret.

pub mod gemini;
pub mod mock;
pub mod openai;

pub use gemini::GeminiVisionClient;
pub use mock::MockVisionClient;
pub use openai::OpenAiVisionClient;

use crate::image::EncodedImage;
use crate::Result;
use async_trait::async_trait;

/// One multimodal prompt sent to a vision model.
#[derive(Debug, Clone)]
pub struct VisionRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub images: Vec<EncodedImage>,
    pub max_output_tokens: u32,
    /// JSON schema for providers that support schema-constrained output.
    pub response_schema: Option<serde_json::Value>,
}

#[async_trait]
pub trait VisionService: Send + Sync {
    /// Send the prompt and images, returning the model's raw text reply.
    async fn describe(&self, request: &VisionRequest) -> Result<String>;
}
