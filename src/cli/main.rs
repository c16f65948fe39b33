//! T-shirt image CLI tool
//!
//! Subcommands for background removal, mockup composition, image generation
//! and the full prompt-to-mockup flow.

use super::config::CliConfigBuilder;
use crate::{
    generation::{ImageGenerationClient, ImageGenerator},
    mockup::{MockupCompositor, TshirtColor},
    pipeline::DesignPipeline,
    processor::BackgroundRemovalProcessor,
    services::{HttpImageFetcher, ImageIOService, ImageSource, OutputFormatHandler},
    tracing_config::{init_cli_tracing, spans},
    types::RemovalResult,
    OutputFormat,
};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::info;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::Instrument;

/// Generate t-shirt designs and mockups
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "tshirt-image-gen")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging (-v: DEBUG, -vv: TRACE, -vvv: TRACE including HTTP internals)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Remove the white or light background from an image
    RemoveBg(RemoveBgArgs),
    /// Place a design on a t-shirt coloured canvas
    Mockup(MockupArgs),
    /// Generate images from prompts and print the results as JSON
    Generate(GenerateArgs),
    /// Generate a design, remove its background and build a mockup
    Design(DesignArgs),
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Self::RemoveBg(_) => "remove-bg",
            Self::Mockup(_) => "mockup",
            Self::Generate(_) => "generate",
            Self::Design(_) => "design",
        }
    }
}

/// Options shared by every command that runs background removal
#[derive(Args, Debug, Clone)]
#[allow(clippy::struct_excessive_bools)]
pub struct RemovalArgs {
    /// Brightness above which pixels become transparent (0-255)
    #[arg(long, default_value_t = crate::DEFAULT_THRESHOLD)]
    pub threshold: u8,

    /// Smoothing radius for partially transparent pixels (0 disables, max 10)
    #[arg(long, default_value_t = 1)]
    pub smoothing: u32,

    /// Disable alpha feathering next to transparent pixels
    #[arg(long)]
    pub no_feathering: bool,

    /// Make every kept pixel fully opaque
    #[arg(long)]
    pub force_opaque: bool,

    /// Feather only partially transparent pixels
    #[arg(long)]
    pub edge_only_feathering: bool,

    /// Leave images alone unless most of their pixels are light
    #[arg(long)]
    pub skip_dark: bool,
}

#[derive(Args, Debug, Clone)]
pub struct RemoveBgArgs {
    /// Input image path, http(s) URL, or "-" for stdin
    #[arg(value_name = "INPUT")]
    pub input: String,

    /// Output file. Use "-" for stdout
    #[arg(short, long, value_name = "OUTPUT")]
    pub output: Option<String>,

    #[command(flatten)]
    pub removal: RemovalArgs,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = CliOutputFormat::Png)]
    pub format: CliOutputFormat,

    /// Encoder quality (0.0-1.0)
    #[arg(long, default_value_t = crate::config::DEFAULT_QUALITY)]
    pub quality: f32,
}

#[derive(Args, Debug, Clone)]
pub struct MockupArgs {
    /// Design image path, http(s) URL, or "-" for stdin
    #[arg(value_name = "DESIGN")]
    pub design: String,

    /// Output PNG file. Use "-" for stdout
    #[arg(short, long, value_name = "OUTPUT")]
    pub output: Option<String>,

    /// Shirt colour: black, white, navy, gray, red, blue or #rrggbb
    #[arg(short, long, default_value = "black")]
    pub color: String,

    /// Top edge of the design box in pixels
    #[arg(long, default_value_t = crate::mockup::DEFAULT_DESIGN_TOP)]
    pub top: i64,

    /// Left edge of the design box [default: centred]
    #[arg(long)]
    pub left: Option<i64>,

    #[arg(long, default_value_t = crate::mockup::DEFAULT_DESIGN_WIDTH)]
    pub design_width: u32,

    #[arg(long, default_value_t = crate::mockup::DEFAULT_DESIGN_HEIGHT)]
    pub design_height: u32,

    #[arg(long, default_value_t = crate::mockup::DEFAULT_CANVAS_WIDTH)]
    pub canvas_width: u32,

    #[arg(long, default_value_t = crate::mockup::DEFAULT_CANVAS_HEIGHT)]
    pub canvas_height: u32,

    /// Remove the design's light background before compositing
    #[arg(long)]
    pub remove_bg: bool,

    #[command(flatten)]
    pub removal: RemovalArgs,
}

#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    /// One or more prompts, generated concurrently
    #[arg(value_name = "PROMPT", required = true)]
    pub prompts: Vec<String>,

    #[arg(long, default_value_t = crate::generation::DEFAULT_IMAGE_SIZE)]
    pub width: u32,

    #[arg(long, default_value_t = crate::generation::DEFAULT_IMAGE_SIZE)]
    pub height: u32,

    #[arg(long)]
    pub seed: Option<u64>,

    /// Number of inference steps [default: 30]
    #[arg(long)]
    pub steps: Option<u32>,

    /// Guidance scale [default: 7.5]
    #[arg(long)]
    pub guidance: Option<f32>,

    /// Ask for an isolated design on a transparent background
    #[arg(long)]
    pub transparent: bool,
}

#[derive(Args, Debug, Clone)]
pub struct DesignArgs {
    /// What to put on the shirt
    #[arg(value_name = "PROMPT")]
    pub prompt: String,

    /// Shirt colour: black, white, navy, gray, red, blue or #rrggbb
    #[arg(short, long, default_value = "black")]
    pub color: String,

    /// Directory receiving logo.png and mockup.png
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    pub output: PathBuf,

    #[arg(long)]
    pub seed: Option<u64>,

    #[command(flatten)]
    pub removal: RemovalArgs,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
pub enum CliOutputFormat {
    Png,
    Webp,
}

impl From<CliOutputFormat> for OutputFormat {
    fn from(format: CliOutputFormat) -> Self {
        match format {
            CliOutputFormat::Png => Self::Png,
            CliOutputFormat::Webp => Self::WebP,
        }
    }
}

pub async fn main() -> Result<()> {
    let cli = Cli::parse();

    let session_id = init_cli_tracing(cli.verbose).context("Failed to initialize tracing")?;
    let span = spans::session(&session_id, cli.command.name());

    run(cli).instrument(span).await
}

async fn run(cli: Cli) -> Result<()> {
    let outcome = match cli.command {
        Command::RemoveBg(args) => remove_background(&args).await,
        Command::Mockup(args) => compose_mockup(&args).await,
        Command::Generate(args) => generate(&args).await,
        Command::Design(args) => design(&args).await,
    };
    outcome.context("processing failed")
}

async fn remove_background(args: &RemoveBgArgs) -> Result<()> {
    let config = CliConfigBuilder::removal_config(&args.removal, args.format, args.quality)
        .context("Invalid background removal options")?;
    let processor = BackgroundRemovalProcessor::new(config)?;
    let format = OutputFormat::from(args.format);

    let stdin_bytes = if args.input == "-" {
        Some(read_stdin()?)
    } else {
        None
    };

    let span = spans::file_processing(&args.input, &format.to_string());
    let result = async {
        match &stdin_bytes {
            Some(bytes) => processor.process_bytes(bytes),
            None if HttpImageFetcher::is_remote(&args.input) => {
                processor.process_url(&args.input).await
            },
            None => processor.process_file(&args.input),
        }
    }
    .instrument(span)
    .await
    .with_context(|| format!("Failed to remove background from {}", args.input))?;

    report_timings(&args.input, &result);

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&args.input, "bg_removed", format));
    if output == "-" {
        write_stdout(&processor.encode(&result)?)?;
        info!("Image written to stdout");
    } else {
        let encode_ms = result
            .save(&output, format, args.quality)
            .with_context(|| format!("Failed to save {}", output))?;
        info!("  ├─ Image Encode: {}ms", encode_ms);
        info!("  └─ Saved to {}", output);
    }
    Ok(())
}

async fn compose_mockup(args: &MockupArgs) -> Result<()> {
    let fetcher = HttpImageFetcher::new()?;
    let bytes = read_input(&args.design, &fetcher).await?;

    let design = if args.remove_bg {
        let config =
            CliConfigBuilder::removal_config(&args.removal, CliOutputFormat::Png, 1.0)?;
        let result = BackgroundRemovalProcessor::new(config)?.process_bytes(&bytes)?;
        report_timings(&args.design, &result);
        image::DynamicImage::ImageRgba8(result.buffer.into_rgba_image())
    } else {
        ImageIOService::decode_bytes(&bytes)?
    };

    let compositor = MockupCompositor::new(CliConfigBuilder::mockup_config(args))
        .context("Invalid mockup layout")?;
    let png = compositor.compose_png(&design)?;

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&args.design, "mockup", OutputFormat::Png));
    write_output(&output, &png)?;
    Ok(())
}

async fn generate(args: &GenerateArgs) -> Result<()> {
    let client = ImageGenerationClient::from_env().context("Generation API is not configured")?;
    let template = CliConfigBuilder::generation_request(args);

    let prompts: Vec<String> = if args.transparent {
        args.prompts
            .iter()
            .map(|p| crate::generation::transparent_prompt(p))
            .collect()
    } else {
        args.prompts.clone()
    };

    let results = client.generate_images(&prompts, &template).await?;
    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}

async fn design(args: &DesignArgs) -> Result<()> {
    let removal = CliConfigBuilder::removal_config(&args.removal, CliOutputFormat::Png, 1.0)?;
    let mut template = crate::GenerateImageRequest::default();
    template.seed = args.seed;

    let pipeline = DesignPipeline::new(
        ImageGenerationClient::from_env().context("Generation API is not configured")?,
        HttpImageFetcher::new()?,
        removal,
        crate::MockupConfig::default(),
    )?
    .with_request_template(template);

    let color = TshirtColor::from_name(&args.color);
    let outcome = pipeline
        .create_design(&args.prompt, color)
        .instrument(spans::design(&args.prompt, &color.to_string()))
        .await?;

    let logo_path = args.output.join("logo.png");
    let mockup_path = args.output.join("mockup.png");
    ImageIOService::write_bytes(&outcome.transparent_png, &logo_path)?;
    ImageIOService::write_bytes(&outcome.mockup_png, &mockup_path)?;
    info!("Design saved to {}", logo_path.display());
    info!("Mockup saved to {}", mockup_path.display());

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

async fn read_input(input: &str, source: &dyn ImageSource) -> Result<Vec<u8>> {
    if input == "-" {
        read_stdin()
    } else if HttpImageFetcher::is_remote(input) {
        Ok(source.fetch(input).await?)
    } else {
        tokio::fs::read(input)
            .await
            .with_context(|| format!("Failed to read {}", input))
    }
}

fn report_timings(input: &str, result: &RemovalResult) {
    let timings = &result.metadata.timings;
    info!("Processing breakdown for {}:", input);
    if let Some(fetch_ms) = timings.fetch_ms {
        info!("  ├─ Download: {}ms", fetch_ms);
    }
    info!("  ├─ Image Decode: {}ms", timings.image_decode_ms);
    info!(
        "  ├─ Transform: {}ms ({:.1}%)",
        timings.transform_ms,
        timings.transform_ratio() * 100.0
    );
    info!(
        "  ├─ Light pixels: {:.1}%{}",
        result.metadata.light_pixel_ratio * 100.0,
        if result.metadata.background_removed {
            ""
        } else {
            " (background kept)"
        }
    );
    info!("  ├─ Total: {}ms", timings.total_ms);
}

fn write_output(target: &str, data: &[u8]) -> Result<()> {
    if target == "-" {
        write_stdout(data)?;
        info!("Image written to stdout");
    } else {
        ImageIOService::write_bytes(data, target)?;
        info!("Image saved to: {}", target);
    }
    Ok(())
}

/// Read image data from stdin
fn read_stdin() -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    io::stdin()
        .read_to_end(&mut buffer)
        .context("Failed to read image data from stdin")?;
    Ok(buffer)
}

/// Write image data to stdout
fn write_stdout(data: &[u8]) -> Result<()> {
    io::stdout()
        .write_all(data)
        .context("Failed to write image data to stdout")?;
    io::stdout().flush().context("Failed to flush stdout")?;
    Ok(())
}

/// `{stem}_{suffix}.{ext}` next to a file input, in the working directory
/// for URLs, and stdout for stdin
fn default_output_path(input: &str, suffix: &str, format: OutputFormat) -> String {
    if input == "-" {
        return "-".to_string();
    }
    let extension = OutputFormatHandler::get_extension(format);

    if HttpImageFetcher::is_remote(input) {
        let name = input
            .split(['?', '#'])
            .next()
            .and_then(|path| path.rsplit('/').next())
            .map(|segment| Path::new(segment).file_stem().unwrap_or_default())
            .map(|stem| stem.to_string_lossy().to_string())
            .filter(|stem| !stem.is_empty())
            .unwrap_or_else(|| "image".to_string());
        return format!("{}_{}.{}", name, suffix, extension);
    }

    let path = Path::new(input);
    let stem = path.file_stem().unwrap_or_default();
    let dir = path.parent().unwrap_or(Path::new(""));
    dir.join(format!("{}_{}.{}", stem.to_string_lossy(), suffix, extension))
        .to_string_lossy()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[tokio::test]
    async fn test_failures_are_reported_as_processing_failed() {
        let dir = tempfile::TempDir::new().unwrap();
        let missing = dir.path().join("missing.png");
        let cli = Cli::try_parse_from([
            "tshirt-image-gen",
            "remove-bg",
            missing.to_str().unwrap(),
        ])
        .unwrap();

        let err = run(cli).await.unwrap_err();
        assert_eq!(err.to_string(), "processing failed");
        let chain: Vec<String> = err.chain().map(ToString::to_string).collect();
        assert!(chain.len() > 1);
        assert!(chain[1].contains("missing.png"));
    }

    #[test]
    fn test_parse_remove_bg() {
        let cli = Cli::try_parse_from([
            "tshirt-image-gen",
            "-vv",
            "remove-bg",
            "logo.jpg",
            "--threshold",
            "230",
            "--smoothing",
            "0",
            "--no-feathering",
            "-f",
            "webp",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        let Command::RemoveBg(args) = cli.command else {
            panic!("expected remove-bg");
        };
        assert_eq!(args.input, "logo.jpg");
        assert_eq!(args.removal.threshold, 230);
        assert_eq!(args.removal.smoothing, 0);
        assert!(args.removal.no_feathering);
        assert_eq!(args.format, CliOutputFormat::Webp);
        assert!((args.quality - 0.95).abs() < f32::EPSILON);
    }

    #[test]
    fn test_parse_mockup_defaults() {
        let cli = Cli::try_parse_from(["tshirt-image-gen", "mockup", "design.png", "-c", "navy"])
            .unwrap();
        let Command::Mockup(args) = cli.command else {
            panic!("expected mockup");
        };
        assert_eq!(args.color, "navy");
        assert_eq!(args.top, 300);
        assert_eq!(args.left, None);
        assert_eq!((args.design_width, args.design_height), (800, 800));
        assert!(!args.remove_bg);
    }

    #[test]
    fn test_parse_generate_requires_prompt() {
        assert!(Cli::try_parse_from(["tshirt-image-gen", "generate"]).is_err());
        let cli = Cli::try_parse_from([
            "tshirt-image-gen",
            "generate",
            "a cat",
            "a dog",
            "--seed",
            "5",
            "--transparent",
        ])
        .unwrap();
        let Command::Generate(args) = cli.command else {
            panic!("expected generate");
        };
        assert_eq!(args.prompts, vec!["a cat", "a dog"]);
        assert_eq!(args.seed, Some(5));
        assert!(args.transparent);
    }

    #[test]
    fn test_threshold_out_of_range_rejected() {
        assert!(
            Cli::try_parse_from(["tshirt-image-gen", "remove-bg", "a.png", "--threshold", "256"])
                .is_err()
        );
    }

    #[test]
    fn test_default_output_path_for_files() {
        assert_eq!(
            default_output_path("shots/logo.jpg", "bg_removed", OutputFormat::Png),
            Path::new("shots").join("logo_bg_removed.png").to_string_lossy()
        );
        assert_eq!(
            default_output_path("logo.jpg", "mockup", OutputFormat::Png),
            "logo_mockup.png"
        );
        assert_eq!(default_output_path("-", "mockup", OutputFormat::Png), "-");
    }

    #[test]
    fn test_default_output_path_for_urls() {
        assert_eq!(
            default_output_path(
                "https://cdn.example.com/a/design.png?sig=1",
                "bg_removed",
                OutputFormat::WebP
            ),
            "design_bg_removed.webp"
        );
        assert_eq!(
            default_output_path("https://cdn.example.com/", "mockup", OutputFormat::Png),
            "image_mockup.png"
        );
    }
}
