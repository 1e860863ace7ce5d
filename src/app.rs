//! Application wiring for the caption service.

use crate::ai::{GeminiVisionClient, OpenAiVisionClient, VisionService};
use crate::captions::{CaptionGenerator, CaptionLimits, ResponseCache};
use crate::models::{AiProvider, Config};
use crate::server::{self, AppState};
use crate::Result;
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

/// Owns the caption pipeline and serves it over HTTP.
pub struct App {
    generator: Arc<CaptionGenerator>,
    max_body_bytes: usize,
}

/// Injectable service bundle used to construct [`App`] in tests/harnesses.
pub struct AppServices {
    pub vision: Arc<dyn VisionService>,
    pub cache: Arc<ResponseCache>,
    pub limits: CaptionLimits,
}

impl App {
    /// Build an app from concrete service dependencies.
    pub fn with_services(services: AppServices, max_body_bytes: usize) -> Self {
        let generator = CaptionGenerator::new(services.vision, services.cache, services.limits);
        Self {
            generator: Arc::new(generator),
            max_body_bytes,
        }
    }

    fn build_vision_client(config: &Config) -> Arc<dyn VisionService> {
        let http_client = reqwest::Client::new();
        match config.provider {
            AiProvider::OpenAi => {
                info!("Vision provider: OpenAI (model: {})", config.model);
                let client = OpenAiVisionClient::new_with_client(
                    config.api_key.clone(),
                    config.model.clone(),
                    config.request_timeout,
                    http_client,
                );
                match &config.base_url {
                    Some(base_url) => Arc::new(client.with_base_url(base_url.clone())),
                    None => Arc::new(client),
                }
            }
            AiProvider::Gemini => {
                info!("Vision provider: Gemini (model: {})", config.model);
                let client = GeminiVisionClient::new_with_client(
                    config.api_key.clone(),
                    config.model.clone(),
                    config.request_timeout,
                    http_client,
                );
                match &config.base_url {
                    Some(base_url) => Arc::new(client.with_base_url(base_url.clone())),
                    None => Arc::new(client),
                }
            }
        }
    }

    /// Construct an app from a loaded [`Config`].
    pub fn new(config: &Config) -> Self {
        let cache = ResponseCache::new(config.cache_max_entries, config.cache_ttl);
        if cache.is_enabled() {
            info!(
                "Response cache: {} entries, TTL {}s",
                config.cache_max_entries,
                config.cache_ttl.as_secs()
            );
        } else {
            info!("Response cache disabled");
        }

        if !config.structured_output {
            info!("Structured output disabled, using plain JSON mode");
        }

        let generator = CaptionGenerator::new(
            Self::build_vision_client(config),
            Arc::new(cache),
            CaptionLimits::from(config),
        )
        .with_structured_output(config.structured_output);

        Self {
            generator: Arc::new(generator),
            max_body_bytes: config.max_body_bytes,
        }
    }

    pub fn generator(&self) -> Arc<CaptionGenerator> {
        Arc::clone(&self.generator)
    }

    pub fn router(&self) -> Router {
        server::router(
            AppState {
                generator: self.generator(),
            },
            self.max_body_bytes,
        )
    }

    /// Serve on an already-bound listener until Ctrl-C.
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        info!("HTTP listening on http://{}", listener.local_addr()?);
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        info!("Server shut down");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
