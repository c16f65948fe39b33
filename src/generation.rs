//! Text-to-image generation client
//!
//! Talks to an image-generation HTTP API that answers with the URL of the
//! rendered image. The [`ImageGenerator`] trait is what the design pipeline
//! depends on, so tests can swap in a canned generator.

use crate::error::{ImageGenError, Result};
use async_trait::async_trait;
use futures::future::try_join_all;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Environment variable holding the API key
pub const API_KEY_ENV: &str = "BUILT_IN_FORGE_API_KEY";

/// Environment variable holding the API base URL
pub const API_URL_ENV: &str = "BUILT_IN_FORGE_API_URL";

pub const DEFAULT_IMAGE_SIZE: u32 = 1024;
pub const DEFAULT_INFERENCE_STEPS: u32 = 30;
pub const DEFAULT_GUIDANCE_SCALE: f32 = 7.5;
pub const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(120);

/// Suffix appended to prompts asking for a cut-out design
pub const TRANSPARENT_PROMPT_SUFFIX: &str =
    ", transparent background, PNG, no background, isolated design";

const GENERATE_PATH: &str = "/v1/images/generate";

/// Connection and default sampling settings for the generation API
#[derive(Clone)]
pub struct GenerationConfig {
    pub api_key: String,
    /// Base URL without trailing slashes
    pub base_url: String,
    pub timeout: Duration,
    pub num_inference_steps: u32,
    pub guidance_scale: f32,
}

impl std::fmt::Debug for GenerationConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("num_inference_steps", &self.num_inference_steps)
            .field("guidance_scale", &self.guidance_scale)
            .finish()
    }
}

impl GenerationConfig {
    #[must_use]
    pub fn new(api_key: impl Into<String>, base_url: &str) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: DEFAULT_GENERATION_TIMEOUT,
            num_inference_steps: DEFAULT_INFERENCE_STEPS,
            guidance_scale: DEFAULT_GUIDANCE_SCALE,
        }
    }

    /// Read credentials from `BUILT_IN_FORGE_API_KEY` / `BUILT_IN_FORGE_API_URL`
    ///
    /// # Errors
    /// - `InvalidConfig` if either variable is unset or empty
    pub fn from_env() -> Result<Self> {
        let api_key = read_env(API_KEY_ENV)?;
        let base_url = read_env(API_URL_ENV)?;
        Ok(Self::new(api_key, &base_url))
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_inference_steps(mut self, steps: u32) -> Self {
        self.num_inference_steps = steps;
        self
    }

    #[must_use]
    pub fn with_guidance_scale(mut self, scale: f32) -> Self {
        self.guidance_scale = scale;
        self
    }

    /// Full URL of the generate endpoint
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("{}{}", self.base_url, GENERATE_PATH)
    }

    /// # Errors
    /// - `InvalidConfig` for an empty key, a non-HTTP base URL, zero steps
    ///   or a non-positive guidance scale
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(ImageGenError::invalid_config("API key must not be empty"));
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ImageGenError::invalid_config(format!(
                "API base URL must be http(s), got '{}'",
                self.base_url
            )));
        }
        if self.num_inference_steps == 0 {
            return Err(ImageGenError::invalid_config(
                "num_inference_steps must be at least 1",
            ));
        }
        if !self.guidance_scale.is_finite() || self.guidance_scale <= 0.0 {
            return Err(ImageGenError::invalid_config(format!(
                "guidance_scale must be positive, got {}",
                self.guidance_scale
            )));
        }
        Ok(())
    }
}

fn read_env(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ImageGenError::invalid_config(format!(
            "environment variable {} is not set",
            name
        ))),
    }
}

/// One generation request
///
/// Unset sampling fields fall back to the client's [`GenerationConfig`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateImageRequest {
    pub prompt: String,
    pub width: u32,
    pub height: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_inference_steps: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guidance_scale: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for GenerateImageRequest {
    fn default() -> Self {
        Self {
            prompt: String::new(),
            width: DEFAULT_IMAGE_SIZE,
            height: DEFAULT_IMAGE_SIZE,
            num_inference_steps: None,
            guidance_scale: None,
            seed: None,
        }
    }
}

impl GenerateImageRequest {
    #[must_use]
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    /// Copy of this request with a different prompt
    #[must_use]
    pub fn with_prompt(&self, prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..self.clone()
        }
    }

    #[must_use]
    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// A generated image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateImageResponse {
    pub image_url: String,
    /// Seed reported by the API, if any
    pub seed: Option<u64>,
    /// Prompt as sent, including any suffix
    pub prompt: String,
}

#[derive(Debug, Serialize)]
struct GenerateBody<'a> {
    prompt: &'a str,
    width: u32,
    height: u32,
    num_inference_steps: u32,
    guidance_scale: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u64>,
}

/// Prompt variant asking for an isolated design on no background
#[must_use]
pub fn transparent_prompt(prompt: &str) -> String {
    format!("{}{}", prompt, TRANSPARENT_PROMPT_SUFFIX)
}

/// Pull the image URL and seed out of an API response body
///
/// Accepts both `{"data": [{"url", "seed"}]}` and a flat `{"url", "seed"}`.
///
/// # Errors
/// - `Generation` if no URL is present
pub fn parse_generation_response(prompt: &str, body: &Value) -> Result<GenerateImageResponse> {
    let first = body.get("data").and_then(|data| data.get(0));
    let field = |name: &str| {
        first
            .and_then(|item| item.get(name))
            .filter(|v| !v.is_null())
            .or_else(|| body.get(name))
    };

    let image_url = field("url")
        .and_then(Value::as_str)
        .filter(|url| !url.is_empty())
        .ok_or_else(|| ImageGenError::generation("No image URL in response"))?
        .to_string();

    let seed = field("seed").and_then(|v| {
        v.as_u64()
            .or_else(|| v.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
    });

    Ok(GenerateImageResponse {
        image_url,
        seed,
        prompt: prompt.to_string(),
    })
}

/// Anything that turns prompts into hosted images
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Generate a single image
    ///
    /// # Errors
    /// - `Network` / `Generation` failures
    async fn generate_image(&self, request: &GenerateImageRequest)
        -> Result<GenerateImageResponse>;

    /// Generate one image per prompt concurrently, preserving input order
    ///
    /// # Errors
    /// - The first failure among the requests
    async fn generate_images(
        &self,
        prompts: &[String],
        template: &GenerateImageRequest,
    ) -> Result<Vec<GenerateImageResponse>> {
        let requests = prompts.iter().map(|prompt| {
            let request = template.with_prompt(prompt.as_str());
            async move { self.generate_image(&request).await }
        });
        try_join_all(requests).await
    }

    /// Generate with the transparent-background prompt suffix
    ///
    /// # Errors
    /// - `Network` / `Generation` failures
    async fn generate_transparent_image(
        &self,
        prompt: &str,
        template: &GenerateImageRequest,
    ) -> Result<GenerateImageResponse> {
        let request = template.with_prompt(transparent_prompt(prompt));
        self.generate_image(&request).await
    }
}

/// HTTP client for the generation API
#[derive(Debug, Clone)]
pub struct ImageGenerationClient {
    client: Client,
    config: GenerationConfig,
}

impl ImageGenerationClient {
    /// # Errors
    /// - `InvalidConfig` if the config does not validate
    /// - `Network` if the HTTP client cannot be built
    pub fn new(config: GenerationConfig) -> Result<Self> {
        config.validate()?;
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ImageGenError::network_error("Failed to create HTTP client", e))?;
        Ok(Self { client, config })
    }

    /// Client configured from the environment
    ///
    /// # Errors
    /// - See [`GenerationConfig::from_env`] and [`Self::new`]
    pub fn from_env() -> Result<Self> {
        Self::new(GenerationConfig::from_env()?)
    }

    #[must_use]
    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }
}

#[async_trait]
impl ImageGenerator for ImageGenerationClient {
    #[instrument(skip(self, request), fields(width = request.width, height = request.height))]
    async fn generate_image(
        &self,
        request: &GenerateImageRequest,
    ) -> Result<GenerateImageResponse> {
        let body = GenerateBody {
            prompt: &request.prompt,
            width: request.width,
            height: request.height,
            num_inference_steps: request
                .num_inference_steps
                .unwrap_or(self.config.num_inference_steps),
            guidance_scale: request.guidance_scale.unwrap_or(self.config.guidance_scale),
            seed: request.seed,
        };

        debug!(prompt = %request.prompt, "Requesting image generation");

        let response = self
            .client
            .post(self.config.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ImageGenError::network_error("Image generation request failed", e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ImageGenError::network_error("Failed to read generation response", e))?;
        let payload: Option<Value> = serde_json::from_str(&text).ok();

        if !status.is_success() {
            let message = payload
                .as_ref()
                .and_then(|p| p.get("message"))
                .and_then(Value::as_str)
                .map_or_else(
                    || status.canonical_reason().unwrap_or("unknown error").to_string(),
                    str::to_string,
                );
            return Err(ImageGenError::generation(format!(
                "Image generation error: {} - {}",
                status.as_u16(),
                message
            )));
        }

        let payload = payload.ok_or_else(|| {
            ImageGenError::generation("Image generation response is not valid JSON")
        })?;
        let generated = parse_generation_response(&request.prompt, &payload)?;

        info!(url = %generated.image_url, seed = ?generated.seed, "Image generated");
        Ok(generated)
    }
}
