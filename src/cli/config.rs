//! Conversion from CLI arguments to library configuration

use crate::cli::main_impl::{CliOutputFormat, GenerateArgs, MockupArgs, RemovalArgs};
use crate::{
    config::{AlphaPolicy, FeatherScope, RemovalConfig, MAX_SMOOTHING_RADIUS},
    generation::GenerateImageRequest,
    mockup::{MockupConfig, TshirtColor},
    services::OutputFormatHandler,
};
use anyhow::{Context, Result};

pub(crate) struct CliConfigBuilder;

impl CliConfigBuilder {
    /// Build a validated `RemovalConfig` from removal flags
    ///
    /// Out-of-range values are rejected here rather than clamped, so a typo
    /// on the command line does not silently change the result.
    pub(crate) fn removal_config(
        args: &RemovalArgs,
        format: CliOutputFormat,
        quality: f32,
    ) -> Result<RemovalConfig> {
        Self::validate_removal(args, quality)?;

        let alpha_policy = if args.force_opaque {
            AlphaPolicy::ForceOpaque
        } else {
            AlphaPolicy::Preserve
        };
        let feather_scope = if args.edge_only_feathering {
            FeatherScope::EdgeOnly
        } else {
            FeatherScope::Visible
        };

        RemovalConfig::builder()
            .threshold(args.threshold)
            .smoothing_radius(args.smoothing)
            .feathering(!args.no_feathering)
            .alpha_policy(alpha_policy)
            .feather_scope(feather_scope)
            .output_format(format.into())
            .quality(quality)
            .skip_dark_backgrounds(args.skip_dark)
            .build()
            .context("Invalid configuration")
    }

    pub(crate) fn validate_removal(args: &RemovalArgs, quality: f32) -> Result<()> {
        if args.smoothing > MAX_SMOOTHING_RADIUS {
            anyhow::bail!(
                "--smoothing must be between 0 and {}, got {}",
                MAX_SMOOTHING_RADIUS,
                args.smoothing
            );
        }
        OutputFormatHandler::validate_quality(quality).context("Invalid --quality")?;
        Ok(())
    }

    pub(crate) fn mockup_config(args: &MockupArgs) -> MockupConfig {
        MockupConfig {
            canvas_width: args.canvas_width,
            canvas_height: args.canvas_height,
            design_width: args.design_width,
            design_height: args.design_height,
            top: args.top,
            left: args.left,
            color: TshirtColor::from_name(&args.color),
        }
    }

    pub(crate) fn generation_request(args: &GenerateArgs) -> GenerateImageRequest {
        GenerateImageRequest {
            prompt: String::new(),
            width: args.width,
            height: args.height,
            num_inference_steps: args.steps,
            guidance_scale: args.guidance,
            seed: args.seed,
        }
    }
}
