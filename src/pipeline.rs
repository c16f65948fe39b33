//! Prompt → transparent design → t-shirt mockup
//!
//! The pipeline generates an image from a prompt, downloads it, strips the
//! light background and pastes the result onto a shirt-coloured canvas.

use crate::{
    config::{OutputFormat, RemovalConfig},
    error::Result,
    generation::{GenerateImageRequest, ImageGenerator},
    mockup::{MockupCompositor, MockupConfig, TshirtColor},
    processor::{run_blocking, BackgroundRemovalProcessor},
    services::ImageSource,
    types::ProcessingMetadata,
};
use futures::future::try_join_all;
use image::DynamicImage;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};

/// Everything produced for one prompt
#[derive(Debug, Clone, Serialize)]
pub struct DesignOutcome {
    /// URL of the generated image before background removal
    pub logo_url: String,
    pub seed: Option<u64>,
    /// Prompt as given by the caller
    pub prompt: String,
    /// Design with its background removed, PNG encoded
    #[serde(skip)]
    pub transparent_png: Vec<u8>,
    /// Finished mockup, PNG encoded
    #[serde(skip)]
    pub mockup_png: Vec<u8>,
    pub metadata: ProcessingMetadata,
}

/// Generation, background removal and mockup composition in one place
pub struct DesignPipeline<G: ImageGenerator, S: ImageSource> {
    generator: G,
    source: Arc<S>,
    processor: BackgroundRemovalProcessor,
    mockup: MockupConfig,
    template: GenerateImageRequest,
}

impl<G, S> DesignPipeline<G, S>
where
    G: ImageGenerator,
    S: ImageSource + 'static,
{
    /// # Errors
    /// - Invalid removal or mockup configuration
    pub fn new(generator: G, source: S, removal: RemovalConfig, mockup: MockupConfig) -> Result<Self> {
        mockup.validate()?;
        let source = Arc::new(source);
        let processor = BackgroundRemovalProcessor::with_source(removal, source.clone())?;
        Ok(Self {
            generator,
            source,
            processor,
            mockup,
            template: GenerateImageRequest::default(),
        })
    }

    /// Use `template` for size, seed and sampling fields of every request
    #[must_use]
    pub fn with_request_template(mut self, template: GenerateImageRequest) -> Self {
        self.template = template;
        self
    }

    #[must_use]
    pub fn generator(&self) -> &G {
        &self.generator
    }

    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Run the whole flow for one prompt
    ///
    /// # Errors
    /// - Generation, download, decode, composition or codec failures, in
    ///   the order the stages run
    #[instrument(skip(self), fields(color = %color))]
    pub async fn create_design(&self, prompt: &str, color: TshirtColor) -> Result<DesignOutcome> {
        let generated = self
            .generator
            .generate_transparent_image(prompt, &self.template)
            .await?;
        info!(url = %generated.image_url, "Design generated, removing background");

        let removal = self.processor.process_url(&generated.image_url).await?;
        let mockup = self.mockup.clone().with_color(color);

        let (transparent_png, mockup_png, metadata) = run_blocking("compose", move || {
            let transparent_png = removal.to_bytes(OutputFormat::Png, 1.0)?;
            let compositor = MockupCompositor::new(mockup)?;
            let design = DynamicImage::ImageRgba8(removal.buffer.into_rgba_image());
            let mockup_png = compositor.compose_png(&design)?;
            Ok((transparent_png, mockup_png, removal.metadata))
        })
        .await?;

        info!(
            transparent_bytes = transparent_png.len(),
            mockup_bytes = mockup_png.len(),
            "Mockup ready"
        );

        Ok(DesignOutcome {
            logo_url: generated.image_url,
            seed: generated.seed,
            prompt: prompt.to_string(),
            transparent_png,
            mockup_png,
            metadata,
        })
    }

    /// Run [`Self::create_design`] for every prompt concurrently
    ///
    /// Results keep the order of `prompts`; the first failure aborts the batch.
    ///
    /// # Errors
    /// - The first failing design
    pub async fn create_designs(
        &self,
        prompts: &[String],
        color: TshirtColor,
    ) -> Result<Vec<DesignOutcome>> {
        try_join_all(prompts.iter().map(|prompt| self.create_design(prompt, color))).await
    }
}
