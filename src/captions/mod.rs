//! Caption generation pipeline
//!
//! Validates the uploaded images, applies the cost limits (image cap, output
//! token budget), builds the multimodal prompt, consults the response cache
//! and normalizes whatever the vision model sends back.

pub mod cache;
pub mod normalize;

pub use cache::{Fingerprint, ResponseCache};
pub use normalize::normalize_reply;

use crate::ai::{VisionRequest, VisionService};
use crate::image::decode_images;
use crate::models::{Caption, Config, GenerateCaptionsRequest, GenerationOptions};
use crate::{prompts, Error, Result};
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

/// Cost-control limits applied to every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptionLimits {
    pub max_images: usize,
    pub max_output_tokens: u32,
    pub max_captions: usize,
}

impl Default for CaptionLimits {
    fn default() -> Self {
        Self {
            max_images: 3,
            max_output_tokens: 1000,
            max_captions: 10,
        }
    }
}

impl From<&Config> for CaptionLimits {
    fn from(config: &Config) -> Self {
        Self {
            max_images: config.max_images,
            max_output_tokens: config.max_output_tokens,
            max_captions: config.max_captions,
        }
    }
}

pub struct CaptionGenerator {
    vision: Arc<dyn VisionService>,
    cache: Arc<ResponseCache>,
    limits: CaptionLimits,
    /// Send a JSON schema to providers that can enforce it.
    structured_output: bool,
}

impl CaptionGenerator {
    pub fn new(
        vision: Arc<dyn VisionService>,
        cache: Arc<ResponseCache>,
        limits: CaptionLimits,
    ) -> Self {
        Self {
            vision,
            cache,
            limits,
            structured_output: true,
        }
    }

    pub fn with_structured_output(mut self, enabled: bool) -> Self {
        self.structured_output = enabled;
        self
    }

    pub fn structured_output(&self) -> bool {
        self.structured_output
    }

    pub fn limits(&self) -> CaptionLimits {
        self.limits
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// Generate captions for one upload.
    pub async fn generate(&self, request: &GenerateCaptionsRequest) -> Result<Vec<Caption>> {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("generate_captions", %request_id);
        self.generate_inner(request).instrument(span).await
    }

    async fn generate_inner(&self, request: &GenerateCaptionsRequest) -> Result<Vec<Caption>> {
        if request.image_data.is_empty() {
            return Err(Error::InvalidInput("No image data provided".to_string()));
        }

        let mut payloads = request.image_data.as_slice();
        if payloads.len() > self.limits.max_images {
            tracing::warn!(
                "Received {} images, keeping the first {} and discarding {}",
                payloads.len(),
                self.limits.max_images,
                payloads.len() - self.limits.max_images
            );
            payloads = &payloads[..self.limits.max_images];
        }
        if payloads.is_empty() {
            return Err(Error::InvalidInput(
                "Image uploads are disabled on this server".to_string(),
            ));
        }

        let images = decode_images(payloads)?;
        let options = GenerationOptions::from(request);

        tracing::info!(
            "Generating captions for {} image(s) ({} bytes), tone '{}', categories [{}]",
            images.len(),
            images.iter().map(|i| i.byte_len).sum::<usize>(),
            options.tone,
            options.categories.join(", ")
        );

        let fingerprint = Fingerprint::new(&images, &options, self.limits.max_output_tokens);
        let vision_request = VisionRequest {
            system_prompt: prompts::CAPTION_SYSTEM.to_string(),
            user_prompt: prompts::caption_user_prompt(&options, images.len()),
            images,
            max_output_tokens: self.limits.max_output_tokens,
            response_schema: self
                .structured_output
                .then(prompts::caption_response_schema),
        };

        let raw = self
            .cache
            .get_or_try_insert_with(&fingerprint, || self.vision.describe(&vision_request))
            .await
            .inspect_err(|e| tracing::error!("Caption generation failed: {}", e))?;

        let captions = normalize_reply(&raw, &options, self.limits.max_captions);
        tracing::info!("Returning {} caption(s)", captions.len());
        Ok(captions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::MockVisionClient;
    use crate::models::DEFAULT_CATEGORY;
    use base64::Engine as _;
    use std::time::Duration;

    const PNG_HEADER: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

    fn png(seed: u8) -> String {
        let mut bytes = PNG_HEADER.to_vec();
        bytes.push(seed);
        format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(bytes)
        )
    }

    fn request(images: Vec<String>) -> GenerateCaptionsRequest {
        GenerateCaptionsRequest {
            image_data: images,
            tone: Some("cool".to_string()),
            include_hashtags: true,
            include_emojis: true,
            categories: None,
        }
    }

    fn generator(mock: &MockVisionClient) -> CaptionGenerator {
        CaptionGenerator::new(
            Arc::new(mock.clone()),
            Arc::new(ResponseCache::new(16, Duration::from_secs(60))),
            CaptionLimits::default(),
        )
    }

    #[tokio::test]
    async fn test_empty_image_list_rejected_before_upstream_call() {
        let mock = MockVisionClient::new();
        let err = generator(&mock).generate(&request(vec![])).await.unwrap_err();

        assert!(matches!(err, Error::InvalidInput(_)));
        assert_eq!(mock.get_call_count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_image_rejected_before_upstream_call() {
        let mock = MockVisionClient::new();
        let err = generator(&mock)
            .generate(&request(vec!["data:image/png;base64,AAAA".to_string()]))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::InvalidInput(_)));
        assert_eq!(mock.get_call_count(), 0);
    }

    #[tokio::test]
    async fn test_extra_images_are_silently_capped() {
        let mock = MockVisionClient::new();
        let images = (0..5).map(png).collect();

        let captions = generator(&mock).generate(&request(images)).await.unwrap();
        assert!(!captions.is_empty());

        let sent = mock.requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].images.len(), 3);
        assert!(sent[0].user_prompt.contains("3 image(s)"));
    }

    #[tokio::test]
    async fn test_images_past_the_cap_are_not_validated() {
        let mock = MockVisionClient::new();
        let mut images: Vec<String> = (0..3).map(png).collect();
        images.push("not an image".to_string());

        assert!(generator(&mock).generate(&request(images)).await.is_ok());
    }

    #[tokio::test]
    async fn test_identical_requests_hit_cache() {
        let mock = MockVisionClient::new();
        let generator = generator(&mock);

        let first = generator.generate(&request(vec![png(1)])).await.unwrap();
        let second = generator.generate(&request(vec![png(1)])).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(mock.get_call_count(), 1);

        generator.generate(&request(vec![png(2)])).await.unwrap();
        assert_eq!(mock.get_call_count(), 2);
    }

    #[tokio::test]
    async fn test_sends_budget_and_prompts() {
        let mock = MockVisionClient::new();
        generator(&mock)
            .generate(&request(vec![png(1)]))
            .await
            .unwrap();

        let sent = &mock.requests()[0];
        assert_eq!(sent.max_output_tokens, 1000);
        assert_eq!(sent.system_prompt, prompts::CAPTION_SYSTEM);
        assert!(sent.user_prompt.contains("Tone: cool."));
        assert!(sent.response_schema.is_some());
    }

    #[tokio::test]
    async fn test_structured_output_off_sends_no_schema() {
        let mock = MockVisionClient::new();
        generator(&mock)
            .with_structured_output(false)
            .generate(&request(vec![png(1)]))
            .await
            .unwrap();

        assert!(mock.requests()[0].response_schema.is_none());
    }

    #[tokio::test]
    async fn test_plain_text_reply_degrades_to_single_caption() {
        let mock = MockVisionClient::new().with_reply("Just vibes");
        let captions = generator(&mock)
            .generate(&request(vec![png(1)]))
            .await
            .unwrap();

        assert_eq!(captions.len(), 1);
        assert_eq!(captions[0].text, "Just vibes");
        assert_eq!(captions[0].category, DEFAULT_CATEGORY);
    }

    #[tokio::test]
    async fn test_provider_errors_propagate_and_are_not_cached() {
        let mock = MockVisionClient::new()
            .with_rate_limit()
            .with_reply(r#"{"captions": [{"text": "ok", "category": "Funny"}]}"#);
        let generator = generator(&mock);

        let err = generator
            .generate(&request(vec![png(1)]))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::RateLimited(_)));

        let captions = generator.generate(&request(vec![png(1)])).await.unwrap();
        assert_eq!(captions[0].text, "ok");
        assert_eq!(mock.get_call_count(), 2);
    }

    #[tokio::test]
    async fn test_zero_image_cap_rejects_request() {
        let mock = MockVisionClient::new();
        let generator = CaptionGenerator::new(
            Arc::new(mock.clone()),
            Arc::new(ResponseCache::disabled()),
            CaptionLimits {
                max_images: 0,
                ..CaptionLimits::default()
            },
        );

        let err = generator.generate(&request(vec![png(1)])).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert_eq!(mock.get_call_count(), 0);
    }
}
